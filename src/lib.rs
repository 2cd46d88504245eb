//! Marketplace backend
//!
//! Multi-vendor marketplace REST API.
//!
//! ## Features
//! - Cookie-based JWT sessions with role guards (customer, seller, admin)
//! - Categories, products and product variants with attribute matching
//! - Customer carts
//! - Promotions, coupons and clearance events
//! - Order item reviews
//! - Image uploads to S3

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod response;
pub mod services;
pub mod state;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod testing;

use axum::{middleware, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{ApiError, Result};
pub use state::AppState;

/// Credentialed CORS that echoes the caller's origin.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Every route, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", handlers::auth::routes(state.clone()))
        .nest("/user", handlers::user::routes(state.clone()))
        .nest("/users", handlers::users::routes(state.clone()))
        .nest("/categories", handlers::categories::routes(state.clone()))
        .nest("/products", handlers::products::routes(state.clone()))
        .nest("/product-variants", handlers::variants::routes(state.clone()))
        .nest("/cart", handlers::cart::routes(state.clone()))
        .nest("/promotions", handlers::promotions::routes(state.clone()))
        .nest("/coupons", handlers::coupons::routes(state.clone()))
        .nest("/events", handlers::events::routes(state.clone()))
        .nest("/reviews", handlers::reviews::routes(state.clone()))
        .nest("/upload", handlers::upload::routes(state.clone()))
        .nest("/mail", handlers::mail::routes(state.clone()))
        .merge(handlers::health::routes());

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(middleware::map_response(handlers::method_not_allowed))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::domain::Role;

    fn cookie_for(state: &AppState, role: Role) -> String {
        let token = state.tokens.access_token(Uuid::now_v7(), role).unwrap();
        format!("accessToken={token}")
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let request = Request::get("/api/nothing-here").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "ok": false, "message": "Endpoint not found", "data": null }));
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let request = Request::get("/api/user/info").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let request = Request::get("/api/cart").header(header::COOKIE, "accessToken=not-a-jwt").body(Body::empty()).unwrap();
        let (status, _) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_customer_cannot_create_category() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Customer);
        let request = json_request(Method::POST, "/api/categories", Some(&cookie), json!({ "name": "Garden" }));
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access required: ADMIN");
    }

    #[tokio::test]
    async fn test_customer_cannot_manage_coupons() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Customer);
        let request = Request::get("/api/coupons").header(header::COOKIE, cookie).body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access required: ADMIN or SELLER");
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let request = json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "username": "12345678",
                "email": "not-an-email",
                "password": "Password1!",
                "password_confirmation": "Password2!"
            }),
        );
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        let errors = &body["data"]["errors"];
        assert!(errors["username"].is_array());
        assert!(errors["email"].is_array());
        assert_eq!(errors["password_confirmation"][0], "Passwords do not match");
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let request = Request::post("/api/auth/refresh-token").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No refresh token provided");
    }

    #[tokio::test]
    async fn test_refresh_with_access_token_is_rejected() {
        let state = AppState::for_tests();
        let access = state.tokens.access_token(Uuid::now_v7(), Role::Customer).unwrap();
        let request = Request::post("/api/auth/refresh-token")
            .header(header::COOKIE, format!("refreshToken={access}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Seller);
        let uri = format!("/api/product-variants/{}/quantity", Uuid::now_v7());
        let request = json_request(Method::PATCH, &uri, Some(&cookie), json!({ "quantity": -3 }));
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["errors"]["quantity"][0], "Quantity must be a non-negative number");
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let request = Request::get("/api/products/not-a-uuid").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    fn inverted_promotion() -> Value {
        json!({ "name": "Winter", "startDate": "2025-01-02T00:00:00Z", "endDate": "2025-01-01T00:00:00Z" })
    }

    #[tokio::test]
    async fn test_seller_cannot_create_promotion() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Seller);
        let request = json_request(Method::POST, "/api/promotions", Some(&cookie), inverted_promotion());
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_promotion_end_must_follow_start() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Admin);
        let request = json_request(Method::POST, "/api/promotions", Some(&cookie), inverted_promotion());
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["errors"]["endDate"][0], "End date must be after start date");
    }

    #[tokio::test]
    async fn test_upload_without_store() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Customer);
        let request = Request::post("/api/upload").header(header::COOKIE, cookie).body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Object storage is not configured");
    }

    #[tokio::test]
    async fn test_unsupported_method_is_not_guarded() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Admin);
        let request = json_request(Method::PATCH, "/api/products", Some(&cookie), json!({}));
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "ok": false, "message": "Method not allowed", "data": null }));
    }

    #[tokio::test]
    async fn test_unsupported_method_without_session() {
        let uri = format!("/api/categories/{}", Uuid::now_v7());
        let request = json_request(Method::PATCH, &uri, None, json!({}));
        let (status, _) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_mirrors_origin_with_credentials() {
        let request = Request::get("/api/health")
            .header(header::ORIGIN, "http://shop.example")
            .body(Body::empty())
            .unwrap();
        let response = router(AppState::for_tests()).oneshot(request).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://shop.example");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
