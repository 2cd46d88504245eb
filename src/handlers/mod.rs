//! HTTP handlers, one router per resource
pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod events;
pub mod health;
pub mod mail;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod upload;
pub mod user;
pub mod users;
pub mod variants;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".into())
}

/// Gives axum's bare 405 answers the JSON envelope, keeping the `Allow` header.
pub async fn method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut enveloped = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}
