//! `/api/user`: the signed-in account

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Extension, Router};

use crate::auth::guard::require_auth;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::response::{ApiResponse, Keyed};
use crate::services::users;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn info(State(s): State<AppState>, Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse> {
    let user = users::get(&s.db, user.user_id).await?;
    Ok(ApiResponse::success("User fetched successfully", Keyed::new("user", user)))
}
