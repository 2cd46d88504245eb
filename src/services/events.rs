//! Clearance events attached to promotions

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::ClearanceLevel;
use crate::error::{is_unique_violation, ApiError, Result};
use crate::models::promotion::{ClearanceEvent, EventListQuery};

fn not_found() -> ApiError {
    ApiError::NotFound("Event not found".into())
}

pub async fn list(db: &PgPool, query: &EventListQuery) -> Result<Vec<ClearanceEvent>> {
    Ok(sqlx::query_as::<_, ClearanceEvent>(
        "SELECT * FROM clearance_events WHERE ($1::uuid IS NULL OR promotion_id = $1) \
         AND ($2::clearance_level IS NULL OR clearance_level = $2) ORDER BY created_at DESC",
    )
    .bind(query.promotion_id)
    .bind(query.clearance_level)
    .fetch_all(db)
    .await?)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<ClearanceEvent> {
    sqlx::query_as::<_, ClearanceEvent>("SELECT * FROM clearance_events WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

pub async fn create(db: &PgPool, promotion_id: Uuid, level: ClearanceLevel) -> Result<ClearanceEvent> {
    let (promotion,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM promotions WHERE id = $1)")
        .bind(promotion_id)
        .fetch_one(db)
        .await?;
    if !promotion {
        return Err(ApiError::NotFound("Promotion not found".into()));
    }
    let duplicate = || ApiError::BadRequest("Event already exists for this promotion".into());
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM clearance_events WHERE promotion_id = $1")
        .bind(promotion_id)
        .fetch_optional(db)
        .await?;
    if existing.is_some() {
        return Err(duplicate());
    }
    let event = sqlx::query_as::<_, ClearanceEvent>(
        "INSERT INTO clearance_events (id, promotion_id, clearance_level) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(promotion_id)
    .bind(level)
    .fetch_one(db)
    .await
    .map_err(|e| if is_unique_violation(&e) { duplicate() } else { e.into() })?;
    tracing::info!(event_id = %event.id, promotion_id = %promotion_id, "Clearance event created");
    Ok(event)
}

pub async fn update(db: &PgPool, id: Uuid, level: Option<ClearanceLevel>) -> Result<ClearanceEvent> {
    sqlx::query_as::<_, ClearanceEvent>(
        "UPDATE clearance_events SET clearance_level = COALESCE($2, clearance_level), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(level)
    .fetch_optional(db)
    .await?
    .ok_or_else(not_found)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM clearance_events WHERE id = $1").bind(id).execute(db).await?;
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
    async fn test_one_clearance_event_per_promotion(db: PgPool) {
        let state = testing::state(db);
        let admin = account(&state.db, Role::Admin).await;
        let promotion_id = testing::promotion(&state.db, &admin).await;
        let cookie = admin.cookie(&state);
        let body = json!({ "promotionId": promotion_id, "clearanceLevel": "HIGH" });

        let (status, _) = send(&state, request(Method::POST, "/api/events", Some(&cookie), Some(body.clone()))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, request(Method::POST, "/api/events", Some(&cookie), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Event already exists for this promotion");
        assert_eq!(testing::count(&state.db, "clearance_events").await, 1);
    }
}
