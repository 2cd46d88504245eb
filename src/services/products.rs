//! Product catalogue with soft deletion

use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::events::ProductEvent;
use crate::domain::variant_match::{self, Attributes};
use crate::domain::DomainEvent;
use crate::error::{ApiError, Result};
use crate::models::category::CategorySummary;
use crate::models::product::{
    canonical_variant_types, CreateProductRequest, Product, ProductDetail, ProductListing, ProductVariant,
    SellerSummary, UpdateProductRequest, VariantSelection,
};
use crate::models::promotion::PromotionSummary;
use crate::models::review::{ProductReviews, ReviewWithAuthor};
use crate::response::{Page, PageRequest};
use crate::state::AppState;

use super::categories;

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".into())
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Seller profile of the calling user, if any.
pub(crate) async fn seller_id_for(db: &PgPool, user_id: Uuid) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM sellers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(id,)| id))
}

/// A product that exists and is not soft-deleted.
pub(crate) async fn get_live(db: &PgPool, id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

/// Attaches category, seller and variants with one query per relation.
async fn hydrate(db: &PgPool, products: Vec<Product>) -> Result<Vec<ProductListing>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
    let seller_ids: Vec<Uuid> = products.iter().map(|p| p.created_by).collect();

    let categories: HashMap<Uuid, CategorySummary> =
        sqlx::query_as::<_, CategorySummary>("SELECT id, name FROM categories WHERE id = ANY($1)")
            .bind(&category_ids)
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
    let sellers: HashMap<Uuid, SellerSummary> = sqlx::query_as::<_, SellerSummary>(
        "SELECT s.id, s.user_id, u.username FROM sellers s JOIN users u ON u.id = s.user_id WHERE s.id = ANY($1)",
    )
    .bind(&seller_ids)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(|s| (s.id, s))
    .collect();
    let mut variants: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for v in sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = ANY($1) ORDER BY created_at",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?
    {
        variants.entry(v.product_id).or_default().push(v);
    }

    Ok(products
        .into_iter()
        .map(|product| ProductListing {
            category: categories.get(&product.category_id).cloned(),
            seller: sellers.get(&product.created_by).cloned(),
            variants: variants.remove(&product.id).unwrap_or_default(),
            product,
        })
        .collect())
}

pub async fn list(db: &PgPool, page: PageRequest, filter: &ProductFilter) -> Result<(Vec<ProductListing>, Page)> {
    let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let clause = "NOT is_deleted \
        AND ($1::uuid IS NULL OR category_id = $1) \
        AND ($2::uuid IS NULL OR created_by = $2) \
        AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%')";

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT * FROM products WHERE {clause} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
    ))
    .bind(filter.category_id)
    .bind(filter.seller_id)
    .bind(search)
    .bind(page.take)
    .bind(page.skip)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {clause}"))
        .bind(filter.category_id)
        .bind(filter.seller_id)
        .bind(search)
        .fetch_one(db)
        .await?;

    Ok((hydrate(db, products).await?, page.page(total)))
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<ProductDetail> {
    let product = get_live(db, id).await?;
    let category_id = product.category_id;
    let listing = hydrate(db, vec![product]).await?.pop().ok_or_else(not_found)?;
    let promotions = sqlx::query_as::<_, PromotionSummary>(
        "SELECT id, name, start_date, end_date, status FROM promotions WHERE id IN ( \
             SELECT promotion_id FROM promotion_products WHERE product_id = $1 \
             UNION SELECT promotion_id FROM promotion_categories WHERE category_id = $2) \
         ORDER BY start_date DESC",
    )
    .bind(id)
    .bind(category_id)
    .fetch_all(db)
    .await?;
    Ok(ProductDetail { listing, promotions })
}

/// Reviews left on any order item of any variant of the product.
pub async fn reviews(db: &PgPool, id: Uuid) -> Result<ProductReviews> {
    let product = get_live(db, id).await?;
    let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
        "SELECT r.*, u.username AS customer_name FROM reviews r \
         JOIN order_items oi ON oi.id = r.order_item_id \
         JOIN product_variants pv ON pv.id = oi.product_variant_id \
         JOIN customers c ON c.id = r.customer_id \
         JOIN users u ON u.id = c.user_id \
         WHERE pv.product_id = $1 ORDER BY r.created_at DESC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    Ok(ProductReviews {
        product_id: product.id,
        product_name: product.name,
        total_reviews: reviews.len(),
        reviews,
    })
}

pub async fn variant_selection(db: &PgPool, id: Uuid, selection: Attributes) -> Result<VariantSelection> {
    let product = get_live(db, id).await?;
    let variants = sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let selection = variant_match::normalize_selection(selection);
    let attrs: Vec<&Attributes> = variants.iter().map(|v| &v.variant_attributes.0).collect();
    let attributes =
        variant_match::selection_state(&product.variant_types, &product.variant_options.0, &attrs, &selection);
    let matched_variant = variant_match::matching_variant(&attrs, &selection).map(|i| variants[i].clone());

    Ok(VariantSelection { product_id: product.id, attributes, selected: selection, matched_variant })
}

pub async fn create(state: &AppState, user: &AuthUser, req: &CreateProductRequest) -> Result<Product> {
    let seller_id = seller_id_for(&state.db, user.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Seller profile not found".into()))?;
    if !categories::exists(&state.db, req.category_id).await? {
        return Err(ApiError::BadRequest("Category not found".into()));
    }

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock_quantity, category_id, created_by, \
         images, variant_types, variant_options) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock_quantity)
    .bind(req.category_id)
    .bind(seller_id)
    .bind(&req.images)
    .bind(canonical_variant_types(&req.variant_types))
    .bind(Json(&req.variant_options))
    .fetch_one(&state.db)
    .await?;

    state
        .events
        .publish(DomainEvent::Product(ProductEvent::Created {
            product_id: product.id,
            seller_id,
            price: product.price,
        }))
        .await;
    tracing::info!(product_id = %product.id, seller_id = %seller_id, "Product created");
    Ok(product)
}

pub async fn update(db: &PgPool, user: &AuthUser, id: Uuid, req: &UpdateProductRequest) -> Result<Product> {
    let product = get_live(db, id).await?;
    let seller_id = seller_id_for(db, user.user_id).await?;
    if seller_id != Some(product.created_by) {
        return Err(ApiError::Forbidden("You are not authorized to update this product".into()));
    }
    if let Some(category_id) = req.category_id {
        if !categories::exists(db, category_id).await? {
            return Err(ApiError::BadRequest("Category not found".into()));
        }
    }

    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
         price = COALESCE($4, price), stock_quantity = COALESCE($5, stock_quantity), \
         category_id = COALESCE($6, category_id), images = COALESCE($7, images), \
         variant_types = COALESCE($8, variant_types), variant_options = COALESCE($9, variant_options), \
         updated_at = NOW() WHERE id = $1 AND NOT is_deleted RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock_quantity)
    .bind(req.category_id)
    .bind(&req.images)
    .bind(req.variant_types.as_deref().map(canonical_variant_types))
    .bind(req.variant_options.as_ref().map(Json))
    .fetch_optional(db)
    .await?
    .ok_or_else(not_found)
}

/// Admins may delete any product, sellers only their own.
pub async fn delete(state: &AppState, user: &AuthUser, id: Uuid) -> Result<()> {
    let product = get_live(&state.db, id).await?;
    if !user.is_admin() {
        let seller_id = seller_id_for(&state.db, user.user_id).await?;
        if seller_id != Some(product.created_by) {
            return Err(ApiError::Forbidden("You are not authorized to delete this product".into()));
        }
    }
    sqlx::query("UPDATE products SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    state.events.publish(DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
    tracing::info!(product_id = %id, by = %user.user_id, "Product soft-deleted");
    Ok(())
}
