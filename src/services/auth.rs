//! Registration, sessions, email verification and password management

use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{RefreshSession, TokenError};
use crate::domain::events::UserEvent;
use crate::domain::{DomainEvent, Role};
use crate::error::{is_unique_violation, ApiError, Result};
use crate::mailer::Mail;
use crate::models::user::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, RegisteredUser, ResetPasswordRequest, SessionUser, UserRow,
};
use crate::state::AppState;

use super::users::insert_profile;

/// Tokens issued by a successful login.
#[derive(Debug)]
pub struct Session {
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
}

pub(crate) async fn find_by_email(db: &sqlx::PgPool, email: &str) -> Result<Option<UserRow>> {
    Ok(sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(db)
        .await?)
}

pub(crate) async fn find_by_id(db: &sqlx::PgPool, id: Uuid) -> Result<Option<UserRow>> {
    Ok(sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn register(state: &AppState, req: &RegisterRequest) -> Result<RegisteredUser> {
    if find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::BadRequest("Email is already in use".into()));
    }
    let hash = hash_password(&req.password).await?;
    let id = Uuid::now_v7();

    let mut tx = state.db.begin().await?;
    sqlx::query("INSERT INTO users (id, username, email, password, role) VALUES ($1, $2, $3, $4, 'CUSTOMER')")
        .bind(id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            e if is_unique_violation(&e) => ApiError::BadRequest("Email is already in use".into()),
            e => e.into(),
        })?;
    insert_profile(&mut tx, Role::Customer, id, &req.email).await?;
    tx.commit().await?;

    let token = state.tokens.verification_token(id)?;
    let mail = Mail::verification(&req.email, &state.config.public_url, &token);
    if let Err(e) = state.mailer.send(mail).await {
        tracing::warn!(user_id = %id, error = %e, "Verification mail not sent");
    }
    state.events.publish(DomainEvent::User(UserEvent::Registered { user_id: id, role: Role::Customer })).await;
    tracing::info!(user_id = %id, "User registered");

    Ok(RegisteredUser { id, username: req.username.clone(), email: req.email.clone() })
}

pub async fn login(state: &AppState, req: &LoginRequest) -> Result<Session> {
    let invalid = || ApiError::BadRequest("Invalid email or password.".into());
    let user = find_by_email(&state.db, &req.email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password).await? {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(invalid());
    }
    if user.email_verified.is_none() {
        return Err(ApiError::BadRequest(
            "Email not verified. Please check your inbox for the verification link.".into(),
        ));
    }

    let access_token = state.tokens.access_token(user.id, user.role)?;
    let refresh_token = state.tokens.refresh_token(user.id, user.role)?;
    sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&refresh_token)
        .execute(&state.db)
        .await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Session {
        user: SessionUser { id: user.id, username: user.username, email: user.email, role: user.role },
        access_token,
        refresh_token,
    })
}

pub async fn logout(state: &AppState, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// New access token for a stored, matching refresh token.
pub async fn refresh(state: &AppState, session: &RefreshSession) -> Result<String> {
    let user = find_by_id(&state.db, session.user_id).await?;
    match user {
        Some(u) if u.refresh_token.as_deref() == Some(session.token.as_str()) => {
            Ok(state.tokens.access_token(u.id, u.role)?)
        }
        _ => {
            tracing::warn!(user_id = %session.user_id, "Refresh token does not match stored token");
            Err(ApiError::Unauthorized("Invalid refresh token".into()))
        }
    }
}

fn token_rejection(err: TokenError, purpose: &str) -> ApiError {
    match err {
        TokenError::Expired => ApiError::BadRequest(format!("{purpose} token has expired.")),
        TokenError::Invalid => ApiError::BadRequest(format!("Invalid {} token.", purpose.to_lowercase())),
        other => other.into(),
    }
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<()> {
    let claims = state
        .tokens
        .verify_email_token(token)
        .map_err(|e| token_rejection(e, "Email verification"))?;
    let updated = sqlx::query("UPDATE users SET email_verified = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(claims.user_id)
        .execute(&state.db)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %claims.user_id, "Email verified");
    Ok(())
}

/// Mails a reset link when the account exists. Unknown addresses are not revealed.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<()> {
    let Some(user) = find_by_email(&state.db, email).await? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(());
    };
    let token = state.tokens.reset_token(user.id)?;
    let mail = Mail::password_reset(&user.email, &state.config.public_url, &token);
    if let Err(e) = state.mailer.send(mail).await {
        tracing::warn!(user_id = %user.id, error = %e, "Reset mail not sent");
    }
    Ok(())
}

pub async fn reset_password(state: &AppState, req: &ResetPasswordRequest) -> Result<()> {
    let claims = state
        .tokens
        .verify_reset_token(&req.token)
        .map_err(|e| token_rejection(e, "Password reset"))?;
    let hash = hash_password(&req.new_password).await?;
    let updated = sqlx::query(
        "UPDATE users SET password = $2, email_verified = COALESCE(email_verified, NOW()), \
         refresh_token = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(claims.user_id)
    .bind(&hash)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %claims.user_id, "Password reset");
    Ok(())
}

pub async fn change_password(state: &AppState, user_id: Uuid, req: &ChangePasswordRequest) -> Result<()> {
    let user = find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if !verify_password(&req.old_password, &user.password).await? {
        return Err(ApiError::BadRequest("Old password not matching.".into()));
    }
    if req.old_password == req.new_password {
        return Err(ApiError::BadRequest("New password must be different from the old password.".into()));
    }
    let hash = hash_password(&req.new_password).await?;
    sqlx::query("UPDATE users SET password = $2, refresh_token = NULL, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(&hash)
        .execute(&state.db)
        .await?;
    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use sqlx::PgPool;

    use crate::mailer::memory::RecordingMailer;
    use crate::testing::{self, request, send};

    fn registration(email: &str) -> Value {
        json!({
            "username": "jane_doe",
            "email": email,
            "password": "Secret1!x",
            "password_confirmation": "Secret1!x"
        })
    }

    fn credentials(email: &str) -> Value {
        json!({ "email": email, "password": "Secret1!x" })
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_email_is_rejected(db: PgPool) {
        let state = testing::state(db);
        let register = || request(Method::POST, "/api/auth/register", None, Some(registration("jane@example.com")));

        let (status, _) = send(&state, register()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, register()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is already in use");
        assert_eq!(testing::count(&state.db, "users").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_mailed_link_unlocks_login(db: PgPool) {
        let mailer = Arc::new(RecordingMailer::default());
        let state = testing::state(db).with_mailer(mailer.clone());

        let (status, _) =
            send(&state, request(Method::POST, "/api/auth/register", None, Some(registration("kim@example.com")))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&state, request(Method::POST, "/api/auth/login", None, Some(credentials("kim@example.com")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let token = {
            let sent = mailer.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to, "kim@example.com");
            sent[0].text.rsplit("token=").next().unwrap().to_string()
        };
        let (status, body) =
            send(&state, request(Method::GET, &format!("/api/auth/verify?token={token}"), None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified successfully.");

        let (status, body) =
            send(&state, request(Method::POST, "/api/auth/login", None, Some(credentials("kim@example.com")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
