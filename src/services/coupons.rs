//! Coupons and redemption

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::events::CouponEvent;
use crate::domain::DomainEvent;
use crate::error::{is_check_violation, is_unique_violation, ApiError, Result};
use crate::models::promotion::{Coupon, CouponInput, CouponListQuery, UpdateCouponRequest};
use crate::state::AppState;

const DUPLICATE_CODE: &str = "Coupon code already exists";
const USAGE_OVER_MAX: &str = "Usage count cannot exceed max usage";

fn not_found() -> ApiError {
    ApiError::NotFound("Coupon not found".into())
}

fn map_write_error(e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::BadRequest(DUPLICATE_CODE.into())
    } else if is_check_violation(&e) {
        ApiError::BadRequest(USAGE_OVER_MAX.into())
    } else {
        e.into()
    }
}

async fn code_taken(conn: &mut PgConnection, code: &str, except: Option<Uuid>) -> Result<bool> {
    let (taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM coupons WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))")
            .bind(code)
            .bind(except)
            .fetch_one(&mut *conn)
            .await?;
    Ok(taken)
}

async fn ensure_promotion(conn: &mut PgConnection, promotion_id: Uuid) -> Result<()> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM promotions WHERE id = $1)")
        .bind(promotion_id)
        .fetch_one(&mut *conn)
        .await?;
    if !found {
        return Err(ApiError::NotFound("Promotion not found".into()));
    }
    Ok(())
}

/// Inserts a coupon; codes are globally unique.
pub(crate) async fn insert_coupon(conn: &mut PgConnection, promotion_id: Uuid, input: &CouponInput) -> Result<Coupon> {
    if code_taken(conn, &input.code, None).await? {
        return Err(ApiError::BadRequest(DUPLICATE_CODE.into()));
    }
    sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (id, promotion_id, code, discount_percentage, max_usage) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(promotion_id)
    .bind(&input.code)
    .bind(input.discount_percentage)
    .bind(input.max_usage)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_write_error)
}

pub async fn list(db: &PgPool, query: &CouponListQuery) -> Result<Vec<Coupon>> {
    let q = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(sqlx::query_as::<_, Coupon>(
        "SELECT * FROM coupons WHERE ($1::text IS NULL OR code ILIKE '%' || $1 || '%') \
         AND ($2::uuid IS NULL OR promotion_id = $2) ORDER BY created_at DESC",
    )
    .bind(q)
    .bind(query.promotion_id)
    .fetch_all(db)
    .await?)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Coupon> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

pub async fn create(db: &PgPool, promotion_id: Uuid, input: &CouponInput) -> Result<Coupon> {
    let mut conn = db.acquire().await?;
    ensure_promotion(&mut conn, promotion_id).await?;
    let coupon = insert_coupon(&mut conn, promotion_id, input).await?;
    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
    Ok(coupon)
}

pub async fn update(db: &PgPool, id: Uuid, req: &UpdateCouponRequest) -> Result<Coupon> {
    let current = get(db, id).await?;
    let max_usage = req.max_usage.unwrap_or(current.max_usage);
    let usage_count = req.usage_count.unwrap_or(current.usage_count);
    if usage_count > max_usage {
        return Err(ApiError::BadRequest(USAGE_OVER_MAX.into()));
    }

    let mut conn = db.acquire().await?;
    if let Some(code) = &req.code {
        if code_taken(&mut conn, code, Some(id)).await? {
            return Err(ApiError::BadRequest(DUPLICATE_CODE.into()));
        }
    }
    if let Some(promotion_id) = req.promotion_id {
        ensure_promotion(&mut conn, promotion_id).await?;
    }
    sqlx::query_as::<_, Coupon>(
        "UPDATE coupons SET promotion_id = COALESCE($2, promotion_id), code = COALESCE($3, code), \
         discount_percentage = COALESCE($4, discount_percentage), max_usage = COALESCE($5, max_usage), \
         usage_count = COALESCE($6, usage_count), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.promotion_id)
    .bind(&req.code)
    .bind(req.discount_percentage)
    .bind(req.max_usage)
    .bind(req.usage_count)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_write_error)?
    .ok_or_else(not_found)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(())
}

/// Counts one use of the coupon. Guard and increment are one statement;
/// `usage_count` never passes `max_usage`.
pub async fn redeem(state: &AppState, id: Uuid) -> Result<Coupon> {
    let redeemed = sqlx::query_as::<_, Coupon>(
        "UPDATE coupons c SET usage_count = c.usage_count + 1, updated_at = NOW() \
         FROM promotions p \
         WHERE c.id = $1 AND p.id = c.promotion_id AND c.usage_count < c.max_usage \
           AND p.status = 'ACTIVE' AND p.start_date <= NOW() AND p.end_date >= NOW() \
         RETURNING c.*",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let coupon = match redeemed {
        Some(c) => c,
        None => {
            get(&state.db, id).await?;
            return Err(ApiError::BadRequest("Coupon is no longer available".into()));
        }
    };

    state
        .events
        .publish(DomainEvent::Coupon(CouponEvent::Redeemed {
            coupon_id: coupon.id,
            code: coupon.code.clone(),
            usage_count: coupon.usage_count,
        }))
        .await;
    tracing::info!(coupon_id = %coupon.id, usage = coupon.usage_count, max = coupon.max_usage, "Coupon redeemed");
    Ok(coupon)
}
