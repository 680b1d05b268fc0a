//! Session and role management.
//!
//! ARCHITECTURE
//! ============
//! Clients authenticate every request with a long-lived bearer token created
//! at login. Tokens are random 32-byte hex strings stored server-side, so
//! revocation is a row delete and validation is a single indexed join.

use std::fmt::Write;

use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Account-level role attached to every user.
///
/// `Admin` unlocks user administration, `GlobalAdmin` additionally role
/// changes, `Developer` the diagnostic endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
    GlobalAdmin,
    Developer,
}

impl UserRole {
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "global_admin" => Some(Self::GlobalAdmin),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::GlobalAdmin => "global_admin",
            Self::Developer => "developer",
        }
    }

    /// Admin console access: admins and global admins.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::GlobalAdmin)
    }

    /// Diagnostic endpoints: developers plus anyone with admin access.
    #[must_use]
    pub fn can_diagnose(self) -> bool {
        matches!(self, Self::Developer) || self.is_admin()
    }
}

/// User row returned from session validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionUser {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login email.
    pub email: Option<String>,
    /// Display name.
    pub name: String,
    /// Assigned presence color (hex).
    pub color: String,
    /// Account role string (`user`, `admin`, `global_admin`, `developer`).
    pub role: String,
}

impl SessionUser {
    /// Parsed account role; unknown strings fall back to `User`.
    #[must_use]
    pub fn user_role(&self) -> UserRole {
        UserRole::from_str(&self.role).unwrap_or(UserRole::User)
    }
}

/// Create a session for the given user, returning the bearer token.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a bearer token and return the associated user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.email, u.name, u.color, u.role
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionUser {
        id: r.get("id"),
        email: r.get("email"),
        name: r.get("name"),
        color: r.get("color"),
        role: r.get("role"),
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
