//! `/api/products`

use axum::{
    extract::{Query, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::guard::{admin_or_seller_guard, seller_guard};
use crate::auth::AuthUser;
use crate::domain::variant_match::Attributes;
use crate::error::Result;
use crate::models::product::{CreateProductRequest, PageQuery, ProductListQuery, UpdateProductRequest};
use crate::response::{ApiResponse, Keyed, PageRequest, Paginated};
use crate::services::products::{self as service, ProductFilter};
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let seller = middleware::from_fn_with_state(state.clone(), seller_guard);
    let owner = middleware::from_fn_with_state(state, admin_or_seller_guard);
    Router::new()
        .route("/", get(list).merge(post(create).route_layer(seller.clone())))
        .route("/category/:category_id", get(by_category))
        .route("/seller/:seller_id", get(by_seller))
        .route(
            "/:id",
            get(show)
                .merge(put(update).route_layer(seller))
                .merge(delete(remove).route_layer(owner)),
        )
        .route("/:id/reviews", get(reviews))
        .route("/:id/variant-selection", get(variant_selection))
}

async fn listing(s: &AppState, page: PageRequest, filter: ProductFilter) -> Result<impl IntoResponse> {
    let (products, page) = service::list(&s.db, page, &filter).await?;
    Ok(ApiResponse::success("Products fetched successfully", Paginated::new("products", products, page)))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<ProductListQuery>) -> Result<impl IntoResponse> {
    let filter = ProductFilter { category_id: q.category_id, search: q.search, ..Default::default() };
    listing(&s, PageRequest::new(q.skip, q.take), filter).await
}

async fn by_category(
    State(s): State<AppState>,
    ApiPath(category_id): ApiPath<Uuid>,
    ValidatedQuery(q): ValidatedQuery<PageQuery>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter { category_id: Some(category_id), ..Default::default() };
    listing(&s, PageRequest::new(q.skip, q.take), filter).await
}

async fn by_seller(
    State(s): State<AppState>,
    ApiPath(seller_id): ApiPath<Uuid>,
    ValidatedQuery(q): ValidatedQuery<PageQuery>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter { seller_id: Some(seller_id), ..Default::default() };
    listing(&s, PageRequest::new(q.skip, q.take), filter).await
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let product = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Product fetched successfully", Keyed::new("product", product)))
}

async fn reviews(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let reviews = service::reviews(&s.db, id).await?;
    Ok(ApiResponse::success("Product reviews fetched successfully", reviews))
}

async fn variant_selection(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Query(selection): Query<Attributes>,
) -> Result<impl IntoResponse> {
    let selection = service::variant_selection(&s.db, id, selection).await?;
    Ok(ApiResponse::success("Variant selection resolved", selection))
}

async fn create(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse> {
    let product = service::create(&s, &user, &req).await?;
    Ok(ApiResponse::success("Product created successfully", Keyed::new("product", product)))
}

async fn update(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<impl IntoResponse> {
    let product = service::update(&s.db, &user, id, &req).await?;
    Ok(ApiResponse::success("Product updated successfully", Keyed::new("product", product)))
}

async fn remove(State(s): State<AppState>, Extension(user): Extension<AuthUser>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s, &user, id).await?;
    Ok(ApiResponse::message("Product deleted successfully"))
}
