//! `/api/events`: clearance events

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Router};
use uuid::Uuid;

use crate::auth::guard::admin_or_seller_guard;
use crate::error::Result;
use crate::models::promotion::{CreateEventRequest, EventListQuery, UpdateEventRequest};
use crate::response::{ApiResponse, Keyed};
use crate::services::events as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(state, admin_or_seller_guard))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<EventListQuery>) -> Result<impl IntoResponse> {
    let events = service::list(&s.db, &q).await?;
    Ok(ApiResponse::success("Events fetched successfully", Keyed::new("events", events)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let event = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Event fetched successfully", Keyed::new("event", event)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateEventRequest>) -> Result<impl IntoResponse> {
    let event = service::create(&s.db, req.promotion_id, req.clearance_level).await?;
    Ok(ApiResponse::success("Event created successfully", Keyed::new("event", event)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEventRequest>,
) -> Result<impl IntoResponse> {
    let event = service::update(&s.db, id, req.clearance_level).await?;
    Ok(ApiResponse::success("Event updated successfully", Keyed::new("event", event)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Event deleted successfully"))
}
