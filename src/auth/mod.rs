//! Authentication: password hashing, JWT cookies and role guards
pub mod cookies;
pub mod guard;
pub mod jwt;
pub mod password;

use uuid::Uuid;

use crate::domain::Role;

pub use jwt::{TokenError, TokenService};

/// Authenticated caller, inserted into request extensions by the guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Verified refresh cookie, inserted by `guard::require_refresh`.
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub user_id: Uuid,
    pub token: String,
}
