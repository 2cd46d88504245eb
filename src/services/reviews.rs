//! Reviews of purchased order items

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_unique_violation, ApiError, Result};
use crate::models::review::{CreateReviewRequest, Review, ReviewListQuery, UpdateReviewRequest};

const DUPLICATE: &str = "Review already exists for this order item";

fn not_found() -> ApiError {
    ApiError::NotFound("Review not found".into())
}

pub async fn list(db: &PgPool, query: &ReviewListQuery) -> Result<Vec<Review>> {
    let q = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE ($1::text IS NULL OR comment ILIKE '%' || $1 || '%') \
         AND ($2::uuid IS NULL OR customer_id = $2) \
         AND ($3::smallint IS NULL OR rating >= $3) \
         AND ($4::smallint IS NULL OR rating <= $4) \
         ORDER BY created_at DESC",
    )
    .bind(q)
    .bind(query.customer_id)
    .bind(query.min_rating)
    .bind(query.max_rating)
    .fetch_all(db)
    .await?)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Review> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

/// The review is attributed to the customer who placed the order.
pub async fn create(db: &PgPool, req: &CreateReviewRequest) -> Result<Review> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM reviews WHERE order_item_id = $1")
        .bind(req.order_item_id)
        .fetch_optional(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::BadRequest(DUPLICATE.into()));
    }
    let owner: Option<(Uuid,)> = sqlx::query_as(
        "SELECT o.customer_id FROM order_items oi JOIN orders o ON o.id = oi.order_id WHERE oi.id = $1",
    )
    .bind(req.order_item_id)
    .fetch_optional(db)
    .await?;
    let (customer_id,) = owner.ok_or_else(|| ApiError::NotFound("Order item not found".into()))?;

    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, rating, comment, images, order_item_id, customer_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(req.rating)
    .bind(&req.comment)
    .bind(&req.images)
    .bind(req.order_item_id)
    .bind(customer_id)
    .fetch_one(db)
    .await
    .map_err(|e| if is_unique_violation(&e) { ApiError::BadRequest(DUPLICATE.into()) } else { e.into() })?;
    tracing::info!(review_id = %review.id, order_item_id = %review.order_item_id, "Review created");
    Ok(review)
}

pub async fn update(db: &PgPool, id: Uuid, req: &UpdateReviewRequest) -> Result<Review> {
    sqlx::query_as::<_, Review>(
        "UPDATE reviews SET rating = COALESCE($2, rating), comment = COALESCE($3, comment), \
         images = COALESCE($4, images), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.rating)
    .bind(&req.comment)
    .bind(&req.images)
    .fetch_optional(db)
    .await?
    .ok_or_else(not_found)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;

    use crate::domain::Role;
    use crate::testing::{self, account, request, send};

    #[sqlx::test(migrations = "./migrations")]
    async fn test_one_review_per_order_item(db: PgPool) {
        let state = testing::state(db);
        let customer = account(&state.db, Role::Customer).await;
        let seller = account(&state.db, Role::Seller).await;
        let category_id = testing::category(&state.db, "Shirts").await;
        let product_id = testing::product(&state.db, &seller, category_id).await;
        let variant_id = testing::variant(&state.db, product_id).await;
        let order_item_id = testing::order_item(&state.db, &customer, variant_id).await;

        let cookie = customer.cookie(&state);
        let body = json!({ "rating": 5, "comment": "Fits well", "orderItemId": order_item_id });
        let (status, created) = send(&state, request(Method::POST, "/api/reviews", Some(&cookie), Some(body.clone()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["data"]["review"]["customerId"], customer.profile_id.to_string());

        let (status, body) = send(&state, request(Method::POST, "/api/reviews", Some(&cookie), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Review already exists for this order item");
    }
}
