//! `/api/promotions`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::guard::admin_guard;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::product::PageQuery;
use crate::models::promotion::{
    CategoryIdsRequest, ClearanceEventInput, CouponInput, CreatePromotionRequest, ProductIdsRequest, PromotionListQuery,
    UpdatePromotionRequest,
};
use crate::response::{ApiResponse, Keyed, PageRequest, Paginated};
use crate::services::promotions as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = middleware::from_fn_with_state(state, admin_guard);
    Router::new()
        .route("/", get(list).merge(post(create).route_layer(admin.clone())))
        .route("/active", get(active))
        .route("/:id", get(show).merge(put(update).delete(remove).route_layer(admin.clone())))
        .route("/:id/products", post(apply_products).delete(remove_products).route_layer(admin.clone()))
        .route("/:id/categories", post(apply_categories).delete(remove_categories).route_layer(admin.clone()))
        .route("/:id/coupons", post(add_coupon).route_layer(admin.clone()))
        .route("/:id/clearance-events", post(add_clearance_event).route_layer(admin))
}

async fn active(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<PageQuery>) -> Result<impl IntoResponse> {
    let (promotions, page) = service::list_active(&s.db, PageRequest::new(q.skip, q.take)).await?;
    Ok(ApiResponse::success("Active promotions fetched successfully", Paginated::new("promotions", promotions, page)))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<PromotionListQuery>) -> Result<impl IntoResponse> {
    let page = PageRequest::new(q.skip, q.take);
    let (promotions, page) = service::list(&s.db, page, q.status, q.search.as_deref()).await?;
    Ok(ApiResponse::success("Promotions fetched successfully", Paginated::new("promotions", promotions, page)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let promotion = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Promotion fetched successfully", Keyed::new("promotion", promotion)))
}

async fn create(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreatePromotionRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::create(&s, &user, &req).await?;
    Ok(ApiResponse::success("Promotion created successfully", Keyed::new("promotion", promotion)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePromotionRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::update(&s.db, id, &req).await?;
    Ok(ApiResponse::success("Promotion updated successfully", Keyed::new("promotion", promotion)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Promotion deleted successfully"))
}

async fn apply_products(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<ProductIdsRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::apply_products(&s.db, id, &req.product_ids).await?;
    Ok(ApiResponse::success("Products applied to promotion successfully", Keyed::new("promotion", promotion)))
}

async fn remove_products(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<ProductIdsRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::remove_products(&s.db, id, &req.product_ids).await?;
    Ok(ApiResponse::success("Products removed from promotion successfully", Keyed::new("promotion", promotion)))
}

async fn apply_categories(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CategoryIdsRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::apply_categories(&s.db, id, &req.category_ids).await?;
    Ok(ApiResponse::success("Categories applied to promotion successfully", Keyed::new("promotion", promotion)))
}

async fn remove_categories(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CategoryIdsRequest>,
) -> Result<impl IntoResponse> {
    let promotion = service::remove_categories(&s.db, id, &req.category_ids).await?;
    Ok(ApiResponse::success("Categories removed from promotion successfully", Keyed::new("promotion", promotion)))
}

async fn add_coupon(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CouponInput>,
) -> Result<impl IntoResponse> {
    let coupon = service::add_coupon(&s.db, id, &req).await?;
    Ok(ApiResponse::success("Coupon added to promotion successfully", Keyed::new("coupon", coupon)))
}

async fn add_clearance_event(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<ClearanceEventInput>,
) -> Result<impl IntoResponse> {
    let event = service::add_clearance_event(&s.db, id, req.clearance_level).await?;
    Ok(ApiResponse::success("Clearance event added to promotion successfully", Keyed::new("event", event)))
}
