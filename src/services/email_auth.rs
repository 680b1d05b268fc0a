//! Email access-code login service.
//!
//! Creates and verifies short-lived six-character codes linked to an email.
//! Verification consumes the newest live code; repeated failures burn it so
//! codes cannot be brute-forced.

use rand::Rng;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::state::MailerConfig;

const CODE_LEN: usize = 6;
// No I/O/L/1 to keep codes unambiguous when read aloud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const MAX_FAILED_ATTEMPTS: i32 = 5;
const MEMBER_COLORS: &[&str] = &["#4CAF50", "#2196F3", "#FF9800", "#9C27B0", "#E91E63", "#00BCD4"];
const LOGIN_CODE_TEMPLATE: &str = include_str!("../../templates/login_code.html");

#[derive(Debug, thiserror::Error)]
pub enum EmailAuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("email delivery failed: {0}")]
    EmailDelivery(String),
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Some(normalized.clone()),
        _ => None,
    }
}

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN
        || !normalized
            .chars()
            .all(|c| CODE_ALPHABET.contains(&(c as u8)))
    {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_access_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[must_use]
pub fn hash_access_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    crate::services::session::bytes_to_hex(&hasher.finalize())
}

fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("member")
        .to_owned()
}

fn pick_color(email: &str) -> &'static str {
    let sum: usize = email.bytes().map(usize::from).sum();
    MEMBER_COLORS[sum % MEMBER_COLORS.len()]
}

/// Upsert the user for `email`, mint a fresh access code, and store its hash.
/// Any previous unconsumed codes for the email are invalidated first.
///
/// Returns the plaintext code for delivery (or for dev-mode echo).
pub async fn request_access_code(pool: &PgPool, email: &str) -> Result<String, EmailAuthError> {
    let normalized = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;

    sqlx::query(
        r"INSERT INTO users (email, name, color)
          VALUES ($1, $2, $3)
          ON CONFLICT (email) DO NOTHING",
    )
    .bind(&normalized)
    .bind(name_from_email(&normalized))
    .bind(pick_color(&normalized))
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM email_login_codes WHERE email = $1 AND consumed_at IS NULL")
        .bind(&normalized)
        .execute(pool)
        .await?;

    let code = generate_access_code();
    sqlx::query("INSERT INTO email_login_codes (email, code_hash) VALUES ($1, $2)")
        .bind(&normalized)
        .bind(hash_access_code(&code))
        .execute(pool)
        .await?;

    Ok(code)
}

/// Verify an access code for `email`. On success the code is consumed and the
/// user's id is returned; on failure the attempt counter is bumped and the
/// code is burned after `MAX_FAILED_ATTEMPTS`.
pub async fn verify_access_code(pool: &PgPool, email: &str, code: &str) -> Result<Uuid, EmailAuthError> {
    let normalized_email = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;
    let normalized_code = normalize_code(code).ok_or(EmailAuthError::InvalidCode)?;
    let code_hash = hash_access_code(&normalized_code);

    let consumed = sqlx::query(
        r"UPDATE email_login_codes
          SET consumed_at = now()
          WHERE id = (
              SELECT id
              FROM email_login_codes
              WHERE email = $1
                AND consumed_at IS NULL
                AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(&normalized_email)
    .bind(&code_hash)
    .fetch_optional(pool)
    .await?;

    if consumed.is_none() {
        sqlx::query(
            r"UPDATE email_login_codes
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id
                  FROM email_login_codes
                  WHERE email = $1
                    AND consumed_at IS NULL
                    AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(&normalized_email)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(pool)
        .await?;
        return Err(EmailAuthError::VerificationFailed);
    }

    let user_row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&normalized_email)
        .fetch_optional(pool)
        .await?
        .ok_or(EmailAuthError::VerificationFailed)?;

    Ok(user_row.get("id"))
}

/// Deliver the access code by email through the configured mailer.
pub async fn send_access_code_email(
    mailer: &MailerConfig,
    to_email: &str,
    code: &str,
) -> Result<(), EmailAuthError> {
    let resend = Resend::new(&mailer.api_key);
    let to = [to_email];
    let subject = "Your kinboard sign-in code";
    let html = render_login_code_template(to_email, code);

    let email = CreateEmailBaseOptions::new(&mailer.from, to, subject).with_html(&html);
    resend
        .emails
        .send(email)
        .await
        .map_err(|e| EmailAuthError::EmailDelivery(e.to_string()))?;
    Ok(())
}

#[must_use]
pub fn render_login_code_template(email: &str, code: &str) -> String {
    LOGIN_CODE_TEMPLATE
        .replace("{{EMAIL}}", email)
        .replace("{{CODE}}", code)
}

#[cfg(test)]
#[path = "email_auth_test.rs"]
mod tests;
