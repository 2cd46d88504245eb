//! Products and their variants

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::category::CategorySummary;
use super::promotion::PromotionSummary;
use crate::domain::variant_match::{AttributeState, Attributes, OptionMap};
use crate::domain::VariantType;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: Uuid,
    pub created_by: Uuid,
    pub images: Vec<String>,
    pub variant_types: Vec<String>,
    pub variant_options: Json<OptionMap>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub variant_attributes: Json<Attributes>,
    pub images: Vec<String>,
    pub price_adjustment: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<CategorySummary>,
    pub seller: Option<SellerSummary>,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub listing: ProductListing,
    pub promotions: Vec<PromotionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantWithProduct {
    #[serde(flatten)]
    pub variant: ProductVariant,
    pub product: ProductSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSelection {
    pub product_id: Uuid,
    pub attributes: Vec<AttributeState>,
    pub selected: Attributes,
    pub matched_variant: Option<ProductVariant>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    #[validate(range(min = 0, message = "Skip must be non-negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Take must be between 1 and 100"))]
    pub take: Option<i64>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 0, message = "Skip must be non-negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Take must be between 1 and 100"))]
    pub take: Option<i64>,
}

fn known_variant_types(types: &Vec<String>) -> Result<(), ValidationError> {
    for t in types {
        if t.parse::<VariantType>().is_err() {
            let mut err = ValidationError::new("variant_type");
            err.message = Some("Variant types must be COLOR, SIZE, MATERIAL or STYLE".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Upper-cases variant type names so they are stored in canonical form.
pub fn canonical_variant_types(types: &[String]) -> Vec<String> {
    types
        .iter()
        .filter_map(|t| t.parse::<VariantType>().ok())
        .map(|t| t.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    pub name: String,
    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: String,
    #[validate(custom = "crate::validation::price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    #[serde(default)]
    pub stock_quantity: i32,
    pub category_id: Uuid,
    #[validate(custom = "crate::validation::image_urls")]
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(custom = "known_variant_types")]
    #[serde(default)]
    pub variant_types: Vec<String>,
    #[serde(default)]
    pub variant_options: OptionMap,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "at_least_one_product_field", skip_on_field_errors = false))]
pub struct UpdateProductRequest {
    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: Option<String>,
    #[validate(custom = "crate::validation::price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: Option<i32>,
    pub category_id: Option<Uuid>,
    #[validate(custom = "crate::validation::image_urls")]
    pub images: Option<Vec<String>>,
    #[validate(custom = "known_variant_types")]
    pub variant_types: Option<Vec<String>>,
    pub variant_options: Option<OptionMap>,
}

fn at_least_one_product_field(req: &UpdateProductRequest) -> Result<(), ValidationError> {
    let any = req.name.is_some()
        || req.description.is_some()
        || req.price.is_some()
        || req.stock_quantity.is_some()
        || req.category_id.is_some()
        || req.images.is_some()
        || req.variant_types.is_some()
        || req.variant_options.is_some();
    if !any {
        let mut err = ValidationError::new("empty_update");
        err.message = Some("At least one field must be provided for update".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantListQuery {
    #[validate(range(min = 0, message = "Skip must be non-negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Take must be between 1 and 100"))]
    pub take: Option<i64>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0, message = "Quantity must be a non-negative number"))]
    pub quantity: i32,
    #[validate(custom = "crate::validation::attributes")]
    pub variant_attributes: BTreeMap<String, String>,
    #[validate(custom = "crate::validation::image_urls")]
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price_adjustment: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVariantRequest {
    #[validate(range(min = 0, message = "Quantity must be a non-negative number"))]
    pub quantity: Option<i32>,
    #[validate(custom = "crate::validation::attributes")]
    pub variant_attributes: Option<BTreeMap<String, String>>,
    #[validate(custom = "crate::validation::image_urls")]
    pub images: Option<Vec<String>>,
    pub price_adjustment: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 0, message = "Quantity must be a non-negative number"))]
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> CreateProductRequest {
        CreateProductRequest {
            name: "Wireless Earbuds Pro".into(),
            description: "Premium wireless earbuds with noise cancellation".into(),
            price: Decimal::new(19999, 2),
            stock_quantity: 150,
            category_id: Uuid::now_v7(),
            images: vec!["https://cdn.example.com/earbuds.jpg".into()],
            variant_types: vec!["COLOR".into()],
            variant_options: OptionMap::from([("colors".to_string(), vec!["Black".to_string()])]),
        }
    }

    #[test]
    fn test_create_product_valid() {
        assert!(create().validate().is_ok());
    }

    #[test]
    fn test_create_product_rejects_bad_fields() {
        let mut req = create();
        req.price = Decimal::ZERO;
        req.variant_types = vec!["WEIGHT".into()];
        req.images = vec!["earbuds.jpg".into()];
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("variant_types"));
        assert!(fields.contains_key("images"));
    }

    #[test]
    fn test_create_product_from_camel_case_json() {
        let body = serde_json::json!({
            "name": "Casual T-Shirt",
            "description": "100% cotton comfortable t-shirt",
            "price": 29.99,
            "stockQuantity": 200,
            "categoryId": Uuid::nil(),
            "variantTypes": ["SIZE", "color"],
            "variantOptions": { "sizes": ["S", "M"], "colors": ["Red"] }
        });
        let req: CreateProductRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.stock_quantity, 200);
        assert!(req.validate().is_ok());
        assert_eq!(canonical_variant_types(&req.variant_types), vec!["SIZE", "COLOR"]);
    }

    #[test]
    fn test_update_product_requires_a_field() {
        let req: UpdateProductRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_quantity_must_be_non_negative() {
        let errs = UpdateQuantityRequest { quantity: -1 }.validate().unwrap_err();
        let fields = errs.field_errors();
        assert_eq!(
            fields["quantity"][0].message.as_deref(),
            Some("Quantity must be a non-negative number")
        );
    }
}
