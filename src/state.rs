//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool, the request rate limiter, and the optional mailer
//! configuration. Everything inside is cheaply cloneable; no locks are held
//! across await points because services talk straight to the pool.

use sqlx::PgPool;

use crate::rate_limit::RateLimiter;

/// Outbound email configuration, loaded from environment.
/// Absent configuration disables email delivery rather than failing startup.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub api_key: String,
    pub from: String,
}

impl MailerConfig {
    /// Load from `RESEND_API_KEY` and `RESEND_FROM`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok()?;
        let from = std::env::var("RESEND_FROM").ok()?;
        Some(Self { api_key, from })
    }
}

/// Shared state for all request handlers and background workers.
#[derive(Clone)]
pub struct AppState {
    /// Postgres connection pool.
    pub pool: PgPool,
    /// Sliding-window request limiter, checked per authenticated request.
    pub rate_limiter: RateLimiter,
    /// Mailer configuration; `None` disables login-code email delivery.
    pub mailer: Option<MailerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, mailer: Option<MailerConfig>) -> Self {
        Self { pool, rate_limiter: RateLimiter::new(), mailer }
    }
}
