//! Promotions, coupons and clearance events

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::category::CategorySummary;
use super::product::ProductSummary;
use crate::domain::{ClearanceLevel, PromotionStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: PromotionStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSummary {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: PromotionStatus,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub code: String,
    pub discount_percentage: Decimal,
    pub max_usage: i32,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceEvent {
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub clearance_level: ClearanceLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDetail {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub admin: Option<AdminSummary>,
    pub coupons: Vec<Coupon>,
    pub clearance_events: Vec<ClearanceEvent>,
    pub applied_products: Vec<ProductSummary>,
    pub applied_categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionListing {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub coupons: Vec<Coupon>,
    pub clearance_events: Vec<ClearanceEvent>,
    pub product_count: i64,
    pub category_count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PromotionListQuery {
    #[validate(range(min = 0, message = "Skip must be non-negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Take must be between 1 and 100"))]
    pub take: Option<i64>,
    pub status: Option<PromotionStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    #[validate(length(min = 3, max = 50, message = "Code must be between 3 and 50 characters"))]
    pub code: String,
    #[validate(custom = "crate::validation::percentage")]
    pub discount_percentage: Decimal,
    #[validate(range(min = 1, message = "Max usage must be at least 1"))]
    pub max_usage: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceEventInput {
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: PromotionStatus,
    #[serde(default)]
    pub applied_products: Vec<Uuid>,
    #[serde(default)]
    pub applied_categories: Vec<Uuid>,
    #[validate]
    #[serde(default)]
    pub coupons: Vec<CouponInput>,
    #[validate(length(max = 1, message = "A promotion can have at most one clearance event"))]
    #[serde(default)]
    pub clearance_events: Vec<ClearanceEventInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromotionRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<PromotionStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductIdsRequest {
    #[validate(length(min = 1, message = "At least one product ID is required"))]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIdsRequest {
    #[validate(length(min = 1, message = "At least one category ID is required"))]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponListQuery {
    pub q: Option<String>,
    pub promotion_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub promotion_id: Uuid,
    #[validate]
    #[serde(flatten)]
    pub coupon: CouponInput,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub promotion_id: Option<Uuid>,
    #[validate(length(min = 3, max = 50, message = "Code must be between 3 and 50 characters"))]
    pub code: Option<String>,
    #[validate(custom = "crate::validation::percentage")]
    pub discount_percentage: Option<Decimal>,
    #[validate(range(min = 1, message = "Max usage must be at least 1"))]
    pub max_usage: Option<i32>,
    #[validate(range(min = 0, message = "Usage count cannot be negative"))]
    pub usage_count: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    pub promotion_id: Option<Uuid>,
    pub clearance_level: Option<ClearanceLevel>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub promotion_id: Uuid,
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub clearance_level: Option<ClearanceLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_promotion_defaults() {
        let req: CreatePromotionRequest = serde_json::from_value(json!({
            "name": "Summer Sale",
            "startDate": "2025-06-01T00:00:00Z",
            "endDate": "2025-08-31T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(req.status, PromotionStatus::Active);
        assert!(req.coupons.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_nested_coupon_errors_are_reported() {
        let req: CreatePromotionRequest = serde_json::from_value(json!({
            "name": "Summer Sale",
            "startDate": "2025-06-01T00:00:00Z",
            "endDate": "2025-08-31T00:00:00Z",
            "coupons": [{ "code": "SUMMER20", "discountPercentage": 120, "maxUsage": 0 }],
            "clearanceEvents": [{ "clearanceLevel": "HIGH" }, { "clearanceLevel": "LOW" }]
        }))
        .unwrap();
        let errs = req.validate().unwrap_err();
        assert!(errs.errors().contains_key("coupons"));
        assert!(errs.errors().contains_key("clearance_events"));
    }

    #[test]
    fn test_create_coupon_flattened_body() {
        let req: CreateCouponRequest = serde_json::from_value(json!({
            "promotionId": Uuid::nil(),
            "code": "WELCOME10",
            "discountPercentage": 10,
            "maxUsage": 50
        }))
        .unwrap();
        assert_eq!(req.coupon.code, "WELCOME10");
        assert!(req.validate().is_ok());
    }
}
