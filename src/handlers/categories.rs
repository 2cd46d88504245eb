//! `/api/categories`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use crate::auth::guard::admin_guard;
use crate::error::Result;
use crate::models::category::{CategoryListQuery, CreateCategoryRequest, UpdateCategoryRequest};
use crate::response::{ApiResponse, Keyed, PageRequest, Paginated};
use crate::services::categories as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = middleware::from_fn_with_state(state, admin_guard);
    Router::new()
        .route("/", get(list).merge(post(create).route_layer(admin.clone())))
        .route("/all/simple", get(all_simple))
        .route("/name/:name", get(by_name))
        .route("/:id", get(show).merge(put(update).delete(remove).route_layer(admin)))
}

async fn all_simple(State(s): State<AppState>) -> Result<impl IntoResponse> {
    let categories = service::all_simple(&s.db).await?;
    Ok(ApiResponse::success("Categories fetched successfully", Keyed::new("categories", categories)))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<CategoryListQuery>) -> Result<impl IntoResponse> {
    let (categories, page) = service::list(&s.db, PageRequest::new(q.skip, q.take), q.search.as_deref()).await?;
    Ok(ApiResponse::success("Categories fetched successfully", Paginated::new("categories", categories, page)))
}

async fn by_name(State(s): State<AppState>, ApiPath(name): ApiPath<String>) -> Result<impl IntoResponse> {
    let category = service::get_by_name(&s.db, &name).await?;
    Ok(ApiResponse::success("Category fetched successfully", Keyed::new("category", category)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let category = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Category fetched successfully", Keyed::new("category", category)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateCategoryRequest>) -> Result<impl IntoResponse> {
    let category = service::create(&s.db, &req).await?;
    Ok(ApiResponse::success("Category created successfully", Keyed::new("category", category)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse> {
    let category = service::update(&s.db, id, &req).await?;
    Ok(ApiResponse::success("Category updated successfully", Keyed::new("category", category)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Category deleted successfully"))
}
