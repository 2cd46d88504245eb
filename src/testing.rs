//! Helpers for router tests that run against a migrated database

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{EventPublisher, Role};
use crate::mailer::LogMailer;
use crate::{router, AppState};

pub fn state(db: PgPool) -> AppState {
    AppState::new(db, Config::for_tests(), None, Arc::new(LogMailer), EventPublisher::default())
}

pub fn session(state: &AppState, user_id: Uuid, role: Role) -> String {
    format!("accessToken={}", state.tokens.access_token(user_id, role).unwrap())
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// A signed-in account as stored: user row and its role profile row.
#[derive(Debug, Clone, Copy)]
pub struct Account {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub role: Role,
}

pub async fn account(db: &PgPool, role: Role) -> Account {
    let user_id = Uuid::now_v7();
    let profile_id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id, username, email, password, role, email_verified) VALUES ($1, $2, $3, 'x', $4, NOW())")
        .bind(user_id)
        .bind(format!("user_{}", &user_id.simple().to_string()[..8]))
        .bind(format!("{}@example.com", user_id.simple()))
        .bind(role)
        .execute(db)
        .await
        .unwrap();
    let profile = match role {
        Role::Customer => "INSERT INTO customers (id, user_id) VALUES ($1, $2)",
        Role::Seller => "INSERT INTO sellers (id, user_id) VALUES ($1, $2)",
        Role::Admin => "INSERT INTO admins (id, user_id) VALUES ($1, $2)",
    };
    sqlx::query(profile).bind(profile_id).bind(user_id).execute(db).await.unwrap();
    Account { user_id, profile_id, role }
}

impl Account {
    pub fn cookie(&self, state: &AppState) -> String {
        session(state, self.user_id, self.role)
    }
}

pub async fn category(db: &PgPool, name: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(db)
        .await
        .unwrap();
    id
}

pub async fn product(db: &PgPool, seller: &Account, category_id: Uuid) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO products (id, name, description, price, stock_quantity, category_id, created_by, variant_types) \
         VALUES ($1, 'Linen shirt', 'Breathable summer shirt', 29.90, 10, $2, $3, ARRAY['COLOR'])",
    )
    .bind(id)
    .bind(category_id)
    .bind(seller.profile_id)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn variant(db: &PgPool, product_id: Uuid) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO product_variants (id, product_id, quantity, variant_attributes) VALUES ($1, $2, 5, '{\"COLOR\": \"red\"}')",
    )
    .bind(id)
    .bind(product_id)
    .execute(db)
    .await
    .unwrap();
    id
}

/// An ACTIVE promotion running from yesterday until tomorrow.
pub async fn promotion(db: &PgPool, admin: &Account) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO promotions (id, name, start_date, end_date, created_by) \
         VALUES ($1, 'Spring sale', NOW() - INTERVAL '1 day', NOW() + INTERVAL '1 day', $2)",
    )
    .bind(id)
    .bind(admin.profile_id)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn coupon(db: &PgPool, promotion_id: Uuid, code: &str, max_usage: i32) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO coupons (id, promotion_id, code, discount_percentage, max_usage) VALUES ($1, $2, $3, 10, $4)",
    )
    .bind(id)
    .bind(promotion_id)
    .bind(code)
    .bind(max_usage)
    .execute(db)
    .await
    .unwrap();
    id
}

/// One order by `customer` holding one unit of `variant_id`; returns the order item.
pub async fn order_item(db: &PgPool, customer: &Account, variant_id: Uuid) -> Uuid {
    let order_id = Uuid::now_v7();
    sqlx::query("INSERT INTO orders (id, customer_id, phone_number) VALUES ($1, $2, '0123456789')")
        .bind(order_id)
        .bind(customer.profile_id)
        .execute(db)
        .await
        .unwrap();
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO order_items (id, order_id, product_variant_id, quantity) VALUES ($1, $2, $3, 1)")
        .bind(id)
        .bind(order_id)
        .bind(variant_id)
        .execute(db)
        .await
        .unwrap();
    id
}

pub async fn count(db: &PgPool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(db).await.unwrap();
    n
}
