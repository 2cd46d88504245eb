//! Account lookups and admin user management

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::domain::Role;
use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError, Result};
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User, UserSearchQuery, USER_COLUMNS};

fn not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}

/// Creates the role profile row for a user; an existing profile is left untouched.
pub(crate) async fn insert_profile(tx: &mut Transaction<'_, Postgres>, role: Role, user_id: Uuid, email: &str) -> Result<()> {
    let id = Uuid::now_v7();
    match role {
        Role::Customer => {
            sqlx::query("INSERT INTO customers (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
                .bind(id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
        Role::Seller => {
            sqlx::query("INSERT INTO sellers (id, user_id, email) VALUES ($1, $2, $3) ON CONFLICT (user_id) DO NOTHING")
                .bind(id)
                .bind(user_id)
                .bind(email)
                .execute(&mut **tx)
                .await?;
        }
        Role::Admin => {
            sqlx::query("INSERT INTO admins (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
                .bind(id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
}

pub async fn list(db: &PgPool, query: &UserSearchQuery) -> Result<Vec<User>> {
    let q = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%') \
           AND ($2::user_role IS NULL OR role = $2) \
         ORDER BY created_at DESC"
    ))
    .bind(q)
    .bind(query.role)
    .fetch_all(db)
    .await?)
}

async fn email_taken(db: &PgPool, email: &str, except: Option<Uuid>) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)")
        .bind(email)
        .bind(except)
        .fetch_optional(db)
        .await?;
    Ok(row.is_some())
}

/// Admin-created accounts are verified immediately.
pub async fn create(db: &PgPool, req: &CreateUserRequest) -> Result<User> {
    if email_taken(db, &req.email, None).await? {
        return Err(ApiError::BadRequest("Email is already in use".into()));
    }
    let hash = hash_password(&req.password).await?;
    let id = Uuid::now_v7();

    let mut tx = db.begin().await?;
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, email, password, role, email_verified) \
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&req.username)
    .bind(&req.email)
    .bind(&hash)
    .bind(req.role)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        e if is_unique_violation(&e) => ApiError::BadRequest("Email is already in use".into()),
        e => e.into(),
    })?;
    insert_profile(&mut tx, req.role, id, &req.email).await?;
    tx.commit().await?;

    tracing::info!(user_id = %id, role = %req.role, "User created by admin");
    Ok(user)
}

pub async fn update(db: &PgPool, id: Uuid, req: &UpdateUserRequest) -> Result<User> {
    let current = get(db, id).await?;
    if let Some(email) = &req.email {
        if email_taken(db, email, Some(id)).await? {
            return Err(ApiError::BadRequest("Email is already in use".into()));
        }
    }
    let hash = match &req.password {
        Some(p) => Some(hash_password(p).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
         password = COALESCE($4, password), role = COALESCE($5, role), updated_at = NOW() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&req.username)
    .bind(&req.email)
    .bind(&hash)
    .bind(req.role)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(not_found)?;
    if user.role != current.role {
        insert_profile(&mut tx, user.role, id, &user.email).await?;
    }
    tx.commit().await?;
    Ok(user)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| match e {
            e if is_foreign_key_violation(&e) => {
                ApiError::BadRequest("User still owns products or promotions and cannot be deleted".into())
            }
            e => e.into(),
        })?;
    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(())
}
