//! Promotions and their product/category links

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::events::PromotionEvent;
use crate::domain::{ClearanceLevel, DomainEvent, PromotionStatus};
use crate::error::{is_unique_violation, ApiError, Result};
use crate::models::category::CategorySummary;
use crate::models::product::ProductSummary;
use crate::models::promotion::{
    AdminSummary, ClearanceEvent, Coupon, CouponInput, CreatePromotionRequest, Promotion, PromotionDetail,
    PromotionListing, UpdatePromotionRequest,
};
use crate::response::{Page, PageRequest};
use crate::state::AppState;

use super::coupons::insert_coupon;

fn not_found() -> ApiError {
    ApiError::NotFound("Promotion not found".into())
}

pub(crate) fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(ApiError::field("endDate", "End date must be after start date"));
    }
    Ok(())
}

fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

pub(crate) async fn find(db: &PgPool, id: Uuid) -> Result<Promotion> {
    sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

/// One count query per id set; a short count means some id is unknown.
async fn ensure_products(conn: &mut PgConnection, ids: &[Uuid]) -> Result<()> {
    let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE id = ANY($1) AND NOT is_deleted")
        .bind(ids)
        .fetch_one(&mut *conn)
        .await?;
    if found != ids.len() as i64 {
        return Err(ApiError::BadRequest("One or more products not found".into()));
    }
    Ok(())
}

async fn ensure_categories(conn: &mut PgConnection, ids: &[Uuid]) -> Result<()> {
    let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(&mut *conn)
        .await?;
    if found != ids.len() as i64 {
        return Err(ApiError::BadRequest("One or more categories not found".into()));
    }
    Ok(())
}

async fn link_products(conn: &mut PgConnection, promotion_id: Uuid, ids: &[Uuid]) -> Result<()> {
    sqlx::query(
        "INSERT INTO promotion_products (promotion_id, product_id) SELECT $1, UNNEST($2::uuid[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(promotion_id)
    .bind(ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn link_categories(conn: &mut PgConnection, promotion_id: Uuid, ids: &[Uuid]) -> Result<()> {
    sqlx::query(
        "INSERT INTO promotion_categories (promotion_id, category_id) SELECT $1, UNNEST($2::uuid[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(promotion_id)
    .bind(ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_event(conn: &mut PgConnection, promotion_id: Uuid, level: ClearanceLevel) -> Result<ClearanceEvent> {
    sqlx::query_as::<_, ClearanceEvent>(
        "INSERT INTO clearance_events (id, promotion_id, clearance_level) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(promotion_id)
    .bind(level)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::BadRequest("Event already exists for this promotion".into())
        } else {
            e.into()
        }
    })
}

async fn hydrate(db: &PgPool, promotions: Vec<Promotion>) -> Result<Vec<PromotionListing>> {
    let ids: Vec<Uuid> = promotions.iter().map(|p| p.id).collect();

    let mut coupons: HashMap<Uuid, Vec<Coupon>> = HashMap::new();
    for c in sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE promotion_id = ANY($1) ORDER BY created_at")
        .bind(&ids)
        .fetch_all(db)
        .await?
    {
        coupons.entry(c.promotion_id).or_default().push(c);
    }
    let mut events: HashMap<Uuid, Vec<ClearanceEvent>> = HashMap::new();
    for e in sqlx::query_as::<_, ClearanceEvent>("SELECT * FROM clearance_events WHERE promotion_id = ANY($1)")
        .bind(&ids)
        .fetch_all(db)
        .await?
    {
        events.entry(e.promotion_id).or_default().push(e);
    }
    let product_counts: HashMap<Uuid, i64> = sqlx::query_as::<_, (Uuid, i64)>(
        "SELECT promotion_id, COUNT(*) FROM promotion_products WHERE promotion_id = ANY($1) GROUP BY promotion_id",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?
    .into_iter()
    .collect();
    let category_counts: HashMap<Uuid, i64> = sqlx::query_as::<_, (Uuid, i64)>(
        "SELECT promotion_id, COUNT(*) FROM promotion_categories WHERE promotion_id = ANY($1) GROUP BY promotion_id",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?
    .into_iter()
    .collect();

    Ok(promotions
        .into_iter()
        .map(|promotion| PromotionListing {
            coupons: coupons.remove(&promotion.id).unwrap_or_default(),
            clearance_events: events.remove(&promotion.id).unwrap_or_default(),
            product_count: product_counts.get(&promotion.id).copied().unwrap_or(0),
            category_count: category_counts.get(&promotion.id).copied().unwrap_or(0),
            promotion,
        })
        .collect())
}

pub async fn list(
    db: &PgPool,
    page: PageRequest,
    status: Option<PromotionStatus>,
    search: Option<&str>,
) -> Result<(Vec<PromotionListing>, Page)> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let clause = "($1::promotion_status IS NULL OR status = $1) \
        AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%')";
    let promotions = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT * FROM promotions WHERE {clause} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(status)
    .bind(search)
    .bind(page.take)
    .bind(page.skip)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM promotions WHERE {clause}"))
        .bind(status)
        .bind(search)
        .fetch_one(db)
        .await?;
    Ok((hydrate(db, promotions).await?, page.page(total)))
}

/// ACTIVE promotions whose window contains the current time.
pub async fn list_active(db: &PgPool, page: PageRequest) -> Result<(Vec<PromotionListing>, Page)> {
    let clause = "status = 'ACTIVE' AND start_date <= NOW() AND end_date >= NOW()";
    let promotions = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT * FROM promotions WHERE {clause} ORDER BY end_date ASC LIMIT $1 OFFSET $2"
    ))
    .bind(page.take)
    .bind(page.skip)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM promotions WHERE {clause}"))
        .fetch_one(db)
        .await?;
    Ok((hydrate(db, promotions).await?, page.page(total)))
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<PromotionDetail> {
    let promotion = find(db, id).await?;
    let admin = sqlx::query_as::<_, AdminSummary>(
        "SELECT a.id, a.user_id, u.username FROM admins a JOIN users u ON u.id = a.user_id WHERE a.id = $1",
    )
    .bind(promotion.created_by)
    .fetch_optional(db)
    .await?;
    let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE promotion_id = $1 ORDER BY created_at")
        .bind(id)
        .fetch_all(db)
        .await?;
    let clearance_events = sqlx::query_as::<_, ClearanceEvent>("SELECT * FROM clearance_events WHERE promotion_id = $1")
        .bind(id)
        .fetch_all(db)
        .await?;
    let applied_products = sqlx::query_as::<_, ProductSummary>(
        "SELECT p.id, p.name, p.price, p.images, p.created_by FROM products p \
         JOIN promotion_products pp ON pp.product_id = p.id WHERE pp.promotion_id = $1 ORDER BY p.name",
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    let applied_categories = sqlx::query_as::<_, CategorySummary>(
        "SELECT c.id, c.name FROM categories c \
         JOIN promotion_categories pc ON pc.category_id = c.id WHERE pc.promotion_id = $1 ORDER BY c.name",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(PromotionDetail { promotion, admin, coupons, clearance_events, applied_products, applied_categories })
}

/// Creates the promotion with its links, coupons and clearance event in one transaction.
pub async fn create(state: &AppState, user: &AuthUser, req: &CreatePromotionRequest) -> Result<PromotionDetail> {
    check_window(req.start_date, req.end_date)?;
    let admin: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM admins WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.db)
        .await?;
    let (admin_id,) = admin.ok_or_else(|| ApiError::Forbidden("Admin profile not found".into()))?;

    let codes: BTreeSet<&str> = req.coupons.iter().map(|c| c.code.as_str()).collect();
    if codes.len() != req.coupons.len() {
        return Err(ApiError::BadRequest("Coupon code already exists".into()));
    }
    let products = distinct(&req.applied_products);
    let categories = distinct(&req.applied_categories);

    let mut tx = state.db.begin().await?;
    if !products.is_empty() {
        ensure_products(&mut tx, &products).await?;
    }
    if !categories.is_empty() {
        ensure_categories(&mut tx, &categories).await?;
    }
    let promotion = sqlx::query_as::<_, Promotion>(
        "INSERT INTO promotions (id, name, description, start_date, end_date, status, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.status)
    .bind(admin_id)
    .fetch_one(&mut *tx)
    .await?;
    link_products(&mut tx, promotion.id, &products).await?;
    link_categories(&mut tx, promotion.id, &categories).await?;
    for coupon in &req.coupons {
        insert_coupon(&mut tx, promotion.id, coupon).await?;
    }
    if let Some(event) = req.clearance_events.first() {
        insert_event(&mut tx, promotion.id, event.clearance_level).await?;
    }
    tx.commit().await?;

    state
        .events
        .publish(DomainEvent::Promotion(PromotionEvent::Created {
            promotion_id: promotion.id,
            coupons: req.coupons.len(),
        }))
        .await;
    tracing::info!(promotion_id = %promotion.id, "Promotion created");
    get(&state.db, promotion.id).await
}

/// A single new date is checked against the stored counterpart.
pub async fn update(db: &PgPool, id: Uuid, req: &UpdatePromotionRequest) -> Result<Promotion> {
    let current = find(db, id).await?;
    let start = req.start_date.unwrap_or(current.start_date);
    let end = req.end_date.unwrap_or(current.end_date);
    if req.start_date.is_some() || req.end_date.is_some() {
        check_window(start, end)?;
    }
    sqlx::query_as::<_, Promotion>(
        "UPDATE promotions SET name = COALESCE($2, name), description = COALESCE($3, description), \
         start_date = $4, end_date = $5, status = COALESCE($6, status), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(start)
    .bind(end)
    .bind(req.status)
    .fetch_optional(db)
    .await?
    .ok_or_else(not_found)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM promotions WHERE id = $1").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    tracing::info!(promotion_id = %id, "Promotion deleted");
    Ok(())
}

pub async fn apply_products(db: &PgPool, id: Uuid, product_ids: &[Uuid]) -> Result<PromotionDetail> {
    find(db, id).await?;
    let ids = distinct(product_ids);
    let mut tx = db.begin().await?;
    ensure_products(&mut tx, &ids).await?;
    link_products(&mut tx, id, &ids).await?;
    tx.commit().await?;
    get(db, id).await
}

pub async fn remove_products(db: &PgPool, id: Uuid, product_ids: &[Uuid]) -> Result<PromotionDetail> {
    find(db, id).await?;
    sqlx::query("DELETE FROM promotion_products WHERE promotion_id = $1 AND product_id = ANY($2)")
        .bind(id)
        .bind(product_ids)
        .execute(db)
        .await?;
    get(db, id).await
}

pub async fn apply_categories(db: &PgPool, id: Uuid, category_ids: &[Uuid]) -> Result<PromotionDetail> {
    find(db, id).await?;
    let ids = distinct(category_ids);
    let mut tx = db.begin().await?;
    ensure_categories(&mut tx, &ids).await?;
    link_categories(&mut tx, id, &ids).await?;
    tx.commit().await?;
    get(db, id).await
}

pub async fn remove_categories(db: &PgPool, id: Uuid, category_ids: &[Uuid]) -> Result<PromotionDetail> {
    find(db, id).await?;
    sqlx::query("DELETE FROM promotion_categories WHERE promotion_id = $1 AND category_id = ANY($2)")
        .bind(id)
        .bind(category_ids)
        .execute(db)
        .await?;
    get(db, id).await
}

pub async fn add_coupon(db: &PgPool, id: Uuid, input: &CouponInput) -> Result<Coupon> {
    find(db, id).await?;
    let mut conn = db.acquire().await?;
    insert_coupon(&mut conn, id, input).await
}

/// One clearance event per promotion.
pub async fn add_clearance_event(db: &PgPool, id: Uuid, level: ClearanceLevel) -> Result<ClearanceEvent> {
    find(db, id).await?;
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM clearance_events WHERE promotion_id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;
    if exists {
        return Err(ApiError::BadRequest("Event already exists for this promotion".into()));
    }
    let mut conn = db.acquire().await?;
    insert_event(&mut conn, id, level).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_must_move_forward() {
        let start = Utc::now();
        assert!(check_window(start, start + Duration::days(1)).is_ok());
        match check_window(start, start) {
            Err(ApiError::Validation(fields)) => assert!(fields.contains_key("endDate")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_window(start, start - Duration::hours(1)).is_err());
    }

    #[test]
    fn test_distinct_ids() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let ids = distinct(&[a, b, a]);
        assert_eq!(ids.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_clashing_coupon_rolls_back_promotion(db: sqlx::PgPool) {
        use axum::http::{Method, StatusCode};
        use serde_json::json;

        use crate::domain::Role;
        use crate::testing::{self, account, request, send};

        let state = testing::state(db);
        let admin = account(&state.db, Role::Admin).await;
        let existing = testing::promotion(&state.db, &admin).await;
        testing::coupon(&state.db, existing, "SPRING10", 5).await;

        let start = Utc::now();
        let body = json!({
            "name": "Autumn sale",
            "startDate": start,
            "endDate": start + Duration::days(7),
            "coupons": [{ "code": "SPRING10", "discountPercentage": 10, "maxUsage": 5 }],
            "clearanceEvents": [{ "clearanceLevel": "LOW" }]
        });
        let cookie = admin.cookie(&state);
        let (status, body) = send(&state, request(Method::POST, "/api/promotions", Some(&cookie), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Coupon code already exists");
        assert_eq!(testing::count(&state.db, "promotions").await, 1);
        assert_eq!(testing::count(&state.db, "coupons").await, 1);
        assert_eq!(testing::count(&state.db, "clearance_events").await, 0);
    }
}
