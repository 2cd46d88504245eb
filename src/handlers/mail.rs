//! `/api/mail`: admin-composed mail

use axum::{extract::State, middleware, response::IntoResponse, routing::post, Router};
use serde::Deserialize;
use validator::Validate;

use crate::auth::guard::admin_guard;
use crate::error::Result;
use crate::mailer::Mail;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMailRequest {
    #[validate(email(message = "Invalid from email address"))]
    pub from: String,
    #[validate(email(message = "Invalid to email address"))]
    pub to: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl From<SendMailRequest> for Mail {
    fn from(req: SendMailRequest) -> Self {
        Self { from: Some(req.from), to: req.to, subject: req.subject, text: req.text.unwrap_or_default(), html: req.html }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(send))
        .route_layer(middleware::from_fn_with_state(state, admin_guard))
}

async fn send(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<SendMailRequest>) -> Result<impl IntoResponse> {
    let to = req.to.clone();
    s.mailer.send(req.into()).await?;
    tracing::info!(to = %to, "Admin mail sent");
    Ok(ApiResponse::message("Mail sent successfully"))
}
