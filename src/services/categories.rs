//! Category catalogue

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError, Result};
use crate::models::category::{
    Category, CategoryDetail, CategoryProduct, CategoryWithCount, CreateCategoryRequest, UpdateCategoryRequest,
};
use crate::response::{Page, PageRequest};

const DUPLICATE_NAME: &str = "A category with this name already exists";
const HAS_PRODUCTS: &str = "Cannot delete category with existing products. Please move or delete products first.";

fn not_found() -> ApiError {
    ApiError::NotFound("Category not found".into())
}

fn map_duplicate(e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::BadRequest(DUPLICATE_NAME.into())
    } else {
        e.into()
    }
}

pub async fn all_simple(db: &PgPool) -> Result<Vec<Category>> {
    Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(db)
        .await?)
}

pub async fn list(db: &PgPool, page: PageRequest, search: Option<&str>) -> Result<(Vec<CategoryWithCount>, Page)> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let filter = "($1::text IS NULL OR c.name ILIKE '%' || $1 || '%' OR c.description ILIKE '%' || $1 || '%')";

    let categories = sqlx::query_as::<_, CategoryWithCount>(&format!(
        "SELECT c.*, (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id AND NOT p.is_deleted) AS product_count \
         FROM categories c WHERE {filter} ORDER BY c.created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(search)
    .bind(page.take)
    .bind(page.skip)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM categories c WHERE {filter}"))
        .bind(search)
        .fetch_one(db)
        .await?;

    Ok((categories, page.page(total)))
}

pub async fn get_by_name(db: &PgPool, name: &str) -> Result<Category> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<CategoryDetail> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)?;
    let products = sqlx::query_as::<_, CategoryProduct>(
        "SELECT id, name, price, description FROM products \
         WHERE category_id = $1 AND NOT is_deleted ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    Ok(CategoryDetail { category, products })
}

pub async fn exists(db: &PgPool, id: Uuid) -> Result<bool> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(found)
}

async fn name_taken(db: &PgPool, name: &str, except: Option<Uuid>) -> Result<bool> {
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub async fn create(db: &PgPool, req: &CreateCategoryRequest) -> Result<Category> {
    if name_taken(db, &req.name, None).await? {
        return Err(ApiError::BadRequest(DUPLICATE_NAME.into()));
    }
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(db)
    .await
    .map_err(map_duplicate)?;
    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(category)
}

pub async fn update(db: &PgPool, id: Uuid, req: &UpdateCategoryRequest) -> Result<Category> {
    if let Some(name) = &req.name {
        if name_taken(db, name, Some(id)).await? {
            return Err(ApiError::BadRequest(DUPLICATE_NAME.into()));
        }
    }
    sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = COALESCE($2, name), description = COALESCE($3, description), \
         updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_optional(db)
    .await
    .map_err(map_duplicate)?
    .ok_or_else(not_found)
}

/// Soft-deleted products still block deletion.
pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    if !exists(db, id).await? {
        return Err(not_found());
    }
    let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
        .bind(id)
        .fetch_one(db)
        .await?;
    if products > 0 {
        return Err(ApiError::BadRequest(HAS_PRODUCTS.into()));
    }
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::BadRequest(HAS_PRODUCTS.into())
            } else {
                e.into()
            }
        })?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use sqlx::PgPool;

    use super::HAS_PRODUCTS;
    use crate::domain::Role;
    use crate::testing::{self, account, request, send};

    #[sqlx::test(migrations = "./migrations")]
    async fn test_soft_deleted_product_blocks_category_delete(db: PgPool) {
        let state = testing::state(db);
        let admin = account(&state.db, Role::Admin).await;
        let seller = account(&state.db, Role::Seller).await;
        let category_id = testing::category(&state.db, "Shirts").await;
        let product_id = testing::product(&state.db, &seller, category_id).await;
        sqlx::query("UPDATE products SET is_deleted = TRUE WHERE id = $1")
            .bind(product_id)
            .execute(&state.db)
            .await
            .unwrap();

        let cookie = admin.cookie(&state);
        let uri = format!("/api/categories/{category_id}");
        let (status, body) = send(&state, request(Method::DELETE, &uri, Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], HAS_PRODUCTS);
        assert_eq!(testing::count(&state.db, "categories").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_empty_category_is_removed(db: PgPool) {
        let state = testing::state(db);
        let admin = account(&state.db, Role::Admin).await;
        let category_id = testing::category(&state.db, "Garden").await;

        let cookie = admin.cookie(&state);
        let uri = format!("/api/categories/{category_id}");
        let (status, _) = send(&state, request(Method::DELETE, &uri, Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Category not found");
    }
}
