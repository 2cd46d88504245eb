//! Cookie-based guards installed with `middleware::from_fn_with_state`

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
use super::{AuthUser, RefreshSession};
use crate::domain::Role;
use crate::error::ApiError;
use crate::state::AppState;

fn authenticate(state: &AppState, jar: &CookieJar) -> Result<AuthUser, ApiError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
    let claims = state.tokens.verify_access(token).map_err(|e| {
        tracing::debug!("Access token rejected: {e}");
        ApiError::Unauthorized("Unauthorized".into())
    })?;
    let role = claims.role.ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
    Ok(AuthUser { user_id: claims.user_id, role })
}

fn authorize(state: &AppState, jar: &CookieJar, allowed: &[Role]) -> Result<AuthUser, ApiError> {
    let user = authenticate(state, jar)?;
    if !allowed.contains(&user.role) {
        let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
        tracing::warn!(user_id = %user.user_id, role = %user.role, "Role not permitted");
        return Err(ApiError::Forbidden(format!("Access required: {}", names.join(" or "))));
    }
    Ok(user)
}

pub async fn require_auth(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = authenticate(&state, &jar)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn admin_guard(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = authorize(&state, &jar, &[Role::Admin])?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn seller_guard(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = authorize(&state, &jar, &[Role::Seller])?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn admin_or_seller_guard(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = authorize(&state, &jar, &[Role::Admin, Role::Seller])?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn require_refresh(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No refresh token provided".into()))?;
    let claims = state.tokens.verify_refresh(&token).map_err(|e| {
        tracing::warn!("Refresh token rejected: {e}");
        ApiError::Unauthorized("Invalid or expired refresh token".into())
    })?;
    request.extensions_mut().insert(RefreshSession { user_id: claims.user_id, token });
    Ok(next.run(request).await)
}
