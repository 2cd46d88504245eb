//! `/api/users`: user administration

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::guard::admin_guard;
use crate::error::Result;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, UserSearchQuery};
use crate::response::{ApiResponse, Keyed};
use crate::services::users as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(state, admin_guard))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<UserSearchQuery>) -> Result<impl IntoResponse> {
    let users = service::list(&s.db, &q).await?;
    Ok(ApiResponse::success("Users fetched successfully", Keyed::new("users", users)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let user = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("User fetched successfully", Keyed::new("user", user)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateUserRequest>) -> Result<impl IntoResponse> {
    let user = service::create(&s.db, &req).await?;
    Ok(ApiResponse::success("User created successfully", Keyed::new("user", user)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    let user = service::update(&s.db, id, &req).await?;
    Ok(ApiResponse::success("User updated successfully", Keyed::new("user", user)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
