//! `/api/cart`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::guard::require_auth;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::cart::{AddCartItemRequest, CartListQuery, CreateCartRequest, UpdateCartItemRequest};
use crate::response::{ApiResponse, Keyed};
use crate::services::cart as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).delete(remove))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", get(show_item).put(update_item).delete(remove_item))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<CartListQuery>) -> Result<impl IntoResponse> {
    let carts = service::list(&s.db, q.customer_id).await?;
    Ok(ApiResponse::success("Carts fetched successfully", Keyed::new("carts", carts)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let cart = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Cart fetched successfully", Keyed::new("carts", cart)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateCartRequest>) -> Result<impl IntoResponse> {
    let cart = service::create(&s.db, req.customer_id).await?;
    Ok(ApiResponse::success("Cart created successfully", Keyed::new("cart", cart)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Cart deleted successfully"))
}

async fn add_item(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(cart_id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<AddCartItemRequest>,
) -> Result<impl IntoResponse> {
    let item = service::add_item(&s.db, &user, cart_id, &req).await?;
    Ok(ApiResponse::success("Item added to cart successfully", Keyed::new("cartItem", item)))
}

async fn show_item(State(s): State<AppState>, ApiPath((cart_id, item_id)): ApiPath<(Uuid, Uuid)>) -> Result<impl IntoResponse> {
    let item = service::get_item(&s.db, cart_id, item_id).await?;
    Ok(ApiResponse::success("Cart item fetched successfully", Keyed::new("cartItem", item)))
}

async fn update_item(
    State(s): State<AppState>,
    ApiPath((cart_id, item_id)): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateCartItemRequest>,
) -> Result<impl IntoResponse> {
    let item = service::update_item(&s.db, cart_id, item_id, req.quantity).await?;
    Ok(ApiResponse::success("Cart item updated successfully", Keyed::new("cartItem", item)))
}

async fn remove_item(State(s): State<AppState>, ApiPath((cart_id, item_id)): ApiPath<(Uuid, Uuid)>) -> Result<impl IntoResponse> {
    service::delete_item(&s.db, cart_id, item_id).await?;
    Ok(ApiResponse::message("Item removed from cart successfully"))
}
