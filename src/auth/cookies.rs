//! Session cookies

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// HttpOnly, SameSite=Strict cookie scoped to `/`. `Secure` only in production.
pub fn session_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    session_cookie(name, String::new(), 0, secure)
}

pub fn with_session(jar: CookieJar, access: String, access_ttl: i64, refresh: String, refresh_ttl: i64, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access, access_ttl, secure))
        .add(session_cookie(REFRESH_COOKIE, refresh, refresh_ttl, secure))
}

pub fn without_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE, secure))
        .add(expired_cookie(REFRESH_COOKIE, secure))
}
