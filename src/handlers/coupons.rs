//! `/api/coupons`

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::guard::{admin_or_seller_guard, require_auth};
use crate::error::Result;
use crate::models::promotion::{CouponListQuery, CreateCouponRequest, UpdateCouponRequest};
use crate::response::{ApiResponse, Keyed};
use crate::services::coupons as service;
use crate::state::AppState;
use crate::validation::{ApiPath, ValidatedJson, ValidatedQuery};

pub fn routes(state: AppState) -> Router<AppState> {
    let manage = Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_or_seller_guard));
    let redeem_route = Router::new()
        .route("/:id/redeem", post(redeem))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    manage.merge(redeem_route)
}

async fn list(State(s): State<AppState>, ValidatedQuery(q): ValidatedQuery<CouponListQuery>) -> Result<impl IntoResponse> {
    let coupons = service::list(&s.db, &q).await?;
    Ok(ApiResponse::success("Coupons fetched successfully", Keyed::new("coupons", coupons)))
}

async fn show(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let coupon = service::get(&s.db, id).await?;
    Ok(ApiResponse::success("Coupon fetched successfully", Keyed::new("coupon", coupon)))
}

async fn create(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateCouponRequest>) -> Result<impl IntoResponse> {
    let coupon = service::create(&s.db, req.promotion_id, &req.coupon).await?;
    Ok(ApiResponse::success("Coupon created successfully", Keyed::new("coupon", coupon)))
}

async fn update(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCouponRequest>,
) -> Result<impl IntoResponse> {
    let coupon = service::update(&s.db, id, &req).await?;
    Ok(ApiResponse::success("Coupon updated successfully", Keyed::new("coupon", coupon)))
}

async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    service::delete(&s.db, id).await?;
    Ok(ApiResponse::message("Coupon deleted successfully"))
}

async fn redeem(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<impl IntoResponse> {
    let coupon = service::redeem(&s, id).await?;
    Ok(ApiResponse::success("Coupon redeemed successfully", Keyed::new("coupon", coupon)))
}
