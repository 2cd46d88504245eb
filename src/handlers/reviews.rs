//! `/api/reviews`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::guard::{admin_guard, require_auth};
use crate::error::Result;
use crate::models::review::{CreateReviewRequest, ReviewListQuery, UpdateReviewRequest};
use crate::response::{ApiResponse, Keyed};
use crate::services::reviews as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let signed_in = Router::new()
        .route("/", get(list).post(create))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));
    let admin = Router::new()
        .route("/:id", get(show).put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(state, admin_guard));
    signed_in.merge(admin)
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<ReviewListQuery>) -> Result<impl IntoResponse> {
    let reviews = service::list(&s.db, &q).await?;
    Ok(ApiResponse::success("Reviews fetched successfully", Keyed::new("reviews", reviews)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let review = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Review fetched successfully", Keyed::new("review", review)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateReviewRequest>) -> Result<impl IntoResponse> {
    let review = service::create(&s.db, &req).await?;
    Ok(ApiResponse::success("Review created successfully", Keyed::new("review", review)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateReviewRequest>,
) -> Result<impl IntoResponse> {
    let review = service::update(&s.db, id, &req).await?;
    Ok(ApiResponse::success("Review updated successfully", Keyed::new("review", review)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Review deleted successfully"))
}
