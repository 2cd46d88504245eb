//! `/api/auth`: registration, sessions and password flows

use axum::{
    extract::{Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::cookies::{session_cookie, with_session, without_session, ACCESS_COOKIE};
use crate::auth::guard::{require_auth, require_refresh};
use crate::auth::{AuthUser, RefreshSession};
use crate::error::Result;
use crate::models::user::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, TokenQuery,
};
use crate::response::ApiResponse;
use crate::services::auth as service;
use crate::state::AppState;
use crate::validation::ValidatedJson;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password));
    let refresh = Router::new()
        .route("/refresh-token", post(refresh_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_refresh));
    let signed_in = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    public.merge(refresh).merge(signed_in)
}

async fn register(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<RegisterRequest>) -> Result<impl IntoResponse> {
    let user = service::register(&s, &req).await?;
    Ok(ApiResponse::success("User successfully registered.", user))
}

async fn login(State(s): State<AppState>, jar: CookieJar, ValidatedJson(req): ValidatedJson<LoginRequest>) -> Result<impl IntoResponse> {
    let session = service::login(&s, &req).await?;
    let jar = with_session(
        jar,
        session.access_token,
        s.tokens.access_ttl(),
        session.refresh_token,
        s.tokens.refresh_ttl(),
        s.secure_cookies(),
    );
    Ok((jar, ApiResponse::success("Logged in successfully.", session.user)))
}

async fn logout(State(s): State<AppState>, Extension(user): Extension<AuthUser>, jar: CookieJar) -> Result<impl IntoResponse> {
    service::logout(&s, user.user_id).await?;
    Ok((without_session(jar, s.secure_cookies()), ApiResponse::message("Logged out successfully.")))
}

async fn refresh_token(State(s): State<AppState>, Extension(session): Extension<RefreshSession>, jar: CookieJar) -> Result<impl IntoResponse> {
    let token = service::refresh(&s, &session).await?;
    let jar = jar.add(session_cookie(ACCESS_COOKIE, token, s.tokens.access_ttl(), s.secure_cookies()));
    Ok((jar, ApiResponse::message("Access token refreshed successfully")))
}

async fn verify_email(State(s): State<AppState>, Query(q): Query<TokenQuery>) -> Result<impl IntoResponse> {
    service::verify_email(&s, &q.token).await?;
    Ok(ApiResponse::message("Email verified successfully."))
}

async fn forgot_password(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>) -> Result<impl IntoResponse> {
    service::forgot_password(&s, &req.email).await?;
    Ok(ApiResponse::message("Password reset email sent"))
}

async fn reset_password(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<ResetPasswordRequest>) -> Result<impl IntoResponse> {
    service::reset_password(&s, &req).await?;
    Ok(ApiResponse::message("Password has been reset successfully."))
}

async fn change_password(
    State(s): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    service::change_password(&s, user.user_id, &req).await?;
    Ok((without_session(jar, s.secure_cookies()), ApiResponse::message("Password changed successfully. Please log in again.")))
}
