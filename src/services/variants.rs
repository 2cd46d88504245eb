//! Product variants and their stock

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::events::ProductEvent;
use crate::domain::DomainEvent;
use crate::error::{ApiError, Result};
use crate::models::product::{
    CreateVariantRequest, ProductSummary, ProductVariant, UpdateVariantRequest, VariantWithProduct,
};
use crate::response::{Page, PageRequest};
use crate::state::AppState;

use super::products::{get_live, seller_id_for};

fn not_found() -> ApiError {
    ApiError::NotFound("Product variant not found".into())
}

pub async fn list(db: &PgPool, page: PageRequest, product_id: Option<Uuid>) -> Result<(Vec<ProductVariant>, Page)> {
    let variants = sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE ($1::uuid IS NULL OR product_id = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(page.take)
    .bind(page.skip)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_variants WHERE ($1::uuid IS NULL OR product_id = $1)")
            .bind(product_id)
            .fetch_one(db)
            .await?;
    Ok((variants, page.page(total)))
}

pub async fn for_product(db: &PgPool, product_id: Uuid) -> Result<Vec<ProductVariant>> {
    get_live(db, product_id).await?;
    Ok(sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY created_at",
    )
    .bind(product_id)
    .fetch_all(db)
    .await?)
}

async fn find(db: &PgPool, id: Uuid) -> Result<ProductVariant> {
    sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

pub(crate) async fn product_summary(db: &PgPool, product_id: Uuid) -> Result<ProductSummary> {
    sqlx::query_as::<_, ProductSummary>("SELECT id, name, price, images, created_by FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<VariantWithProduct> {
    let variant = find(db, id).await?;
    let product = product_summary(db, variant.product_id).await?;
    Ok(VariantWithProduct { variant, product })
}

/// Sellers may only touch variants of their own products; admins pass.
async fn ensure_owner(db: &PgPool, user: &AuthUser, product_owner: Uuid, message: &str) -> Result<()> {
    if user.is_admin() {
        return Ok(());
    }
    if seller_id_for(db, user.user_id).await? != Some(product_owner) {
        return Err(ApiError::Forbidden(message.into()));
    }
    Ok(())
}

pub async fn create(db: &PgPool, user: &AuthUser, req: &CreateVariantRequest) -> Result<ProductVariant> {
    let product = get_live(db, req.product_id).await?;
    if seller_id_for(db, user.user_id).await? != Some(product.created_by) {
        return Err(ApiError::Forbidden("You can only create variants for your own products".into()));
    }
    let variant = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, quantity, variant_attributes, images, price_adjustment) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(req.product_id)
    .bind(req.quantity)
    .bind(Json(&req.variant_attributes))
    .bind(&req.images)
    .bind(req.price_adjustment)
    .fetch_one(db)
    .await?;
    tracing::info!(variant_id = %variant.id, product_id = %variant.product_id, "Variant created");
    Ok(variant)
}

pub async fn update(db: &PgPool, user: &AuthUser, id: Uuid, req: &UpdateVariantRequest) -> Result<ProductVariant> {
    let variant = find(db, id).await?;
    let product = product_summary(db, variant.product_id).await?;
    ensure_owner(db, user, product.created_by, "You can only update variants of your own products").await?;

    sqlx::query_as::<_, ProductVariant>(
        "UPDATE product_variants SET quantity = COALESCE($2, quantity), \
         variant_attributes = COALESCE($3, variant_attributes), images = COALESCE($4, images), \
         price_adjustment = COALESCE($5, price_adjustment), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.quantity)
    .bind(req.variant_attributes.as_ref().map(Json))
    .bind(&req.images)
    .bind(req.price_adjustment)
    .fetch_optional(db)
    .await?
    .ok_or_else(not_found)
}

pub async fn delete(db: &PgPool, user: &AuthUser, id: Uuid) -> Result<()> {
    let variant = find(db, id).await?;
    let product = product_summary(db, variant.product_id).await?;
    ensure_owner(db, user, product.created_by, "You can only delete variants of your own products").await?;
    sqlx::query("DELETE FROM product_variants WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    tracing::info!(variant_id = %id, "Variant deleted");
    Ok(())
}

/// Ownership check and write are a single statement.
pub async fn set_quantity(state: &AppState, user: &AuthUser, id: Uuid, quantity: i64) -> Result<ProductVariant> {
    let quantity = i32::try_from(quantity)
        .map_err(|_| ApiError::BadRequest("Quantity must be a non-negative number".into()))?;
    if quantity < 0 {
        return Err(ApiError::BadRequest("Quantity must be a non-negative number".into()));
    }

    let updated = sqlx::query_as::<_, ProductVariant>(
        "UPDATE product_variants pv SET quantity = $2, updated_at = NOW() \
         FROM products p \
         WHERE pv.id = $1 AND p.id = pv.product_id \
           AND ($3 OR p.created_by = (SELECT id FROM sellers WHERE user_id = $4)) \
         RETURNING pv.*",
    )
    .bind(id)
    .bind(quantity)
    .bind(user.is_admin())
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?;

    let variant = match updated {
        Some(v) => v,
        // Nothing written: tell a missing variant apart from a foreign one.
        None => {
            find(&state.db, id).await?;
            return Err(ApiError::Forbidden("You can only update stock of your own products".into()));
        }
    };

    state
        .events
        .publish(DomainEvent::Product(ProductEvent::VariantQuantityChanged { variant_id: id, quantity }))
        .await;
    tracing::info!(variant_id = %id, quantity, "Variant quantity updated");
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::domain::Role;
    use crate::testing::{self, account, request, send};

    #[sqlx::test(migrations = "./migrations")]
    async fn test_quantity_write_checks_ownership(db: PgPool) {
        let state = testing::state(db);
        let owner = account(&state.db, Role::Seller).await;
        let other = account(&state.db, Role::Seller).await;
        let category_id = testing::category(&state.db, "Shirts").await;
        let product_id = testing::product(&state.db, &owner, category_id).await;
        let variant_id = testing::variant(&state.db, product_id).await;
        let uri = format!("/api/product-variants/{variant_id}/quantity");

        let cookie = other.cookie(&state);
        let (status, body) =
            send(&state, request(Method::PATCH, &uri, Some(&cookie), Some(json!({ "quantity": 9 })))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You can only update stock of your own products");

        let missing = format!("/api/product-variants/{}/quantity", Uuid::now_v7());
        let (status, body) =
            send(&state, request(Method::PATCH, &missing, Some(&cookie), Some(json!({ "quantity": 9 })))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product variant not found");

        let cookie = owner.cookie(&state);
        let (status, body) =
            send(&state, request(Method::PATCH, &uri, Some(&cookie), Some(json!({ "quantity": 9 })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["productVariant"]["quantity"], 9);
    }
}
