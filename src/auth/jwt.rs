//! HS256 tokens for sessions, email verification and password reset

use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    VerifyEmail,
    ResetPassword,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub kind: TokenKind,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

impl From<TokenError> for crate::error::ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid => Self::Unauthorized("Unauthorized".into()),
            TokenError::Sign(e) => Self::Internal(format!("token signing failed: {e}")),
        }
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies every token the service hands out. Access, verification
/// and reset tokens share the access secret and are told apart by `kind`.
#[derive(Clone)]
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access: KeyPair::new(&config.auth_secret),
            refresh: KeyPair::new(&config.auth_refresh_secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    pub fn access_ttl(&self) -> i64 { self.access_ttl }
    pub fn refresh_ttl(&self) -> i64 { self.refresh_ttl }

    pub fn access_token(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        sign(&self.access, user_id, Some(role), TokenKind::Access, self.access_ttl)
    }

    pub fn refresh_token(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        sign(&self.refresh, user_id, Some(role), TokenKind::Refresh, self.refresh_ttl)
    }

    pub fn verification_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        sign(&self.access, user_id, None, TokenKind::VerifyEmail, self.access_ttl)
    }

    pub fn reset_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        sign(&self.access, user_id, None, TokenKind::ResetPassword, self.access_ttl)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access, token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.refresh, token, TokenKind::Refresh)
    }

    pub fn verify_email_token(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access, token, TokenKind::VerifyEmail)
    }

    pub fn verify_reset_token(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access, token, TokenKind::ResetPassword)
    }

    #[cfg(test)]
    fn sign_with_ttl(&self, user_id: Uuid, kind: TokenKind, ttl: i64) -> Result<String, TokenError> {
        sign(&self.access, user_id, Some(Role::Customer), kind, ttl)
    }
}

fn sign(keys: &KeyPair, user_id: Uuid, role: Option<Role>, kind: TokenKind, ttl: i64) -> Result<String, TokenError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        user_id,
        role,
        kind,
        exp: (now + chrono::Duration::seconds(ttl)).timestamp().max(0) as usize,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding).map_err(TokenError::Sign)
}

fn verify(keys: &KeyPair, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
    let data = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &Validation::default()).map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    })?;
    if data.claims.kind != expected {
        tracing::debug!(kind = ?data.claims.kind, ?expected, "Token used for the wrong purpose");
        return Err(TokenError::Invalid);
    }
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&Config::for_tests())
    }

    #[test]
    fn test_access_token_roundtrip() {
        let svc = service();
        let id = Uuid::now_v7();
        let token = svc.access_token(id, Role::Seller).unwrap();
        let claims = svc.verify_access(&token).unwrap();
        assert_eq!(claims.user_id, id);
        assert_eq!(claims.role, Some(Role::Seller));
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn test_refresh_token_needs_refresh_secret() {
        let svc = service();
        let token = svc.refresh_token(Uuid::now_v7(), Role::Customer).unwrap();
        assert!(matches!(svc.verify_access(&token), Err(TokenError::Invalid)));
        assert!(svc.verify_refresh(&token).is_ok());
    }

    #[test]
    fn test_verification_token_is_not_an_access_token() {
        let svc = service();
        let token = svc.verification_token(Uuid::now_v7()).unwrap();
        assert!(matches!(svc.verify_access(&token), Err(TokenError::Invalid)));
        assert!(svc.verify_email_token(&token).is_ok());
        assert!(svc.verify_reset_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let svc = service();
        let token = svc.sign_with_ttl(Uuid::now_v7(), TokenKind::VerifyEmail, -3600).unwrap();
        assert!(matches!(svc.verify_email_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(service().verify_access("not.a.jwt"), Err(TokenError::Invalid)));
    }
}
