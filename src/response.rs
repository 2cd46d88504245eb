//! Uniform `{ ok, message, data }` envelope and pagination helpers

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{ser::SerializeMap, Serialize, Serializer};

pub const DEFAULT_TAKE: i64 = 10;
pub const MAX_TAKE: i64 = 100;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self { ok: true, message: message.into(), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into(), data: None }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn failure(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self { ok: false, message: message.into(), data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Offset pagination resolved from `skip`/`take` query values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: i64,
    pub take: i64,
}

impl PageRequest {
    pub fn new(skip: Option<i64>, take: Option<i64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            take: take.unwrap_or(DEFAULT_TAKE).clamp(1, MAX_TAKE),
        }
    }

    pub fn page(&self, total: i64) -> Page {
        Page::new(total, self.skip, self.take)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub total: i64,
    pub skip: i64,
    pub take: i64,
    pub pages: i64,
}

impl Page {
    pub fn new(total: i64, skip: i64, take: i64) -> Self {
        let pages = if take > 0 { (total + take - 1) / take } else { 0 };
        Self { total, skip, take, pages }
    }
}

/// Renders as `{ <key>: [...], "pagination": {...} }`.
#[derive(Debug)]
pub struct Paginated<T> {
    key: &'static str,
    items: Vec<T>,
    pagination: Page,
}

impl<T> Paginated<T> {
    pub fn new(key: &'static str, items: Vec<T>, pagination: Page) -> Self {
        Self { key, items, pagination }
    }
}

impl<T: Serialize> Serialize for Paginated<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

/// Renders a single value under a named key, e.g. `{ "user": {...} }`.
#[derive(Debug)]
pub struct Keyed<T> {
    key: &'static str,
    value: T,
}

impl<T> Keyed<T> {
    pub fn new(key: &'static str, value: T) -> Self {
        Self { key, value }
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.value)?;
        map.end()
    }
}
