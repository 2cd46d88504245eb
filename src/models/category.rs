//! Product categories

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<CategoryProduct>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryListQuery {
    #[validate(range(min = 0, message = "Skip must be non-negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Take must be between 1 and 100"))]
    pub take: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "at_least_one_category_field", skip_on_field_errors = false))]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,
}

fn at_least_one_category_field(req: &UpdateCategoryRequest) -> Result<(), ValidationError> {
    if req.name.is_none() && req.description.is_none() {
        let mut err = ValidationError::new("empty_update");
        err.message = Some("At least one field must be provided for update".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_requires_a_field() {
        let empty = UpdateCategoryRequest { name: None, description: None };
        let errs = empty.validate().unwrap_err();
        assert!(errs.errors().contains_key("__all__"));
        let named = UpdateCategoryRequest { name: Some("Books".into()), description: None };
        assert!(named.validate().is_ok());
    }

    #[test]
    fn test_create_bounds() {
        let short = CreateCategoryRequest { name: "B".into(), description: None };
        assert!(short.validate().is_err());
        let ok = CreateCategoryRequest { name: "Books".into(), description: Some("Printed books".into()) };
        assert!(ok.validate().is_ok());
    }
}
