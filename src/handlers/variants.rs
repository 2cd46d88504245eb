//! `/api/product-variants`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::guard::{admin_or_seller_guard, seller_guard};
use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::product::{CreateVariantRequest, UpdateQuantityRequest, UpdateVariantRequest, VariantListQuery};
use crate::response::{ApiResponse, Keyed, PageRequest, Paginated};
use crate::services::variants as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let seller = middleware::from_fn_with_state(state.clone(), seller_guard);
    let owner = middleware::from_fn_with_state(state, admin_or_seller_guard);
    Router::new()
        .route("/", get(list).merge(post(create).route_layer(seller)))
        .route("/product/:product_id", get(for_product))
        .route("/:id", get(show).merge(put(update).delete(remove).route_layer(owner.clone())))
        .route("/:id/quantity", patch(set_quantity).route_layer(owner))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<VariantListQuery>) -> Result<impl IntoResponse> {
    let (variants, page) = service::list(&s.db, PageRequest::new(q.skip, q.take), q.product_id).await?;
    Ok(ApiResponse::success("Product variants fetched successfully", Paginated::new("productVariants", variants, page)))
}

async fn for_product(State(s): State<AppState>, ApiPath(product_id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let variants = service::for_product(&s.db, product_id).await?;
    Ok(ApiResponse::success("Product variants fetched successfully", Keyed::new("productVariants", variants)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let variant = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Product variant fetched successfully", Keyed::new("productVariant", variant)))
}

async fn create(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreateVariantRequest>,
) -> Result<impl IntoResponse> {
    let variant = service::create(&s.db, &user, &req).await?;
    Ok(ApiResponse::success("Product variant created successfully", Keyed::new("productVariant", variant)))
}

async fn update(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateVariantRequest>,
) -> Result<impl IntoResponse> {
    let variant = service::update(&s.db, &user, id, &req).await?;
    Ok(ApiResponse::success("Product variant updated successfully", Keyed::new("productVariant", variant)))
}

async fn remove(State(s): State<AppState>, Extension(user): Extension<AuthUser>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, &user, id).await?;
    Ok(ApiResponse::message("Product variant deleted successfully"))
}

async fn set_quantity(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateQuantityRequest>,
) -> Result<impl IntoResponse> {
    let variant = service::set_quantity(&s, &user, id, req.quantity).await?;
    Ok(ApiResponse::success("Product variant quantity updated successfully", Keyed::new("productVariant", variant)))
}
