//! Auth routes — email access-code login, session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::services::{email_auth, session};
use crate::state::AppState;

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Dev mode echoes access codes in the request-code response so local
/// environments work without a mailer.
fn dev_mode_enabled() -> bool {
    env_bool("AUTH_DEV_MODE").unwrap_or(false)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let rest = header.strip_prefix("Bearer ")?;
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the `Authorization` header.
/// Use as a handler parameter to require authentication. The rate limiter
/// runs here so every authenticated endpoint is covered uniformly.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if let Err(e) = app_state.rate_limiter.check_and_record(user.id) {
            tracing::warn!(user_id = %user.id, error = %e, "request rate limited");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RequestCodeBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct RequestCodeResponse {
    pub ok: bool,
    /// Populated only when `AUTH_DEV_MODE` is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

/// `POST /api/v1/auth/request-code` — create an access code and email it.
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeBody>,
) -> Result<Json<RequestCodeResponse>, StatusCode> {
    let code = email_auth::request_access_code(&state.pool, &body.email)
        .await
        .map_err(email_auth_error_to_status)?;

    if let Some(mailer) = &state.mailer {
        if let Err(e) = email_auth::send_access_code_email(mailer, body.email.trim(), &code).await {
            tracing::error!(error = %e, "access code email delivery failed");
            if !dev_mode_enabled() {
                return Err(StatusCode::BAD_GATEWAY);
            }
        }
    } else if !dev_mode_enabled() {
        tracing::warn!("no mailer configured and AUTH_DEV_MODE is off; code is unreachable");
    }

    let dev_code = dev_mode_enabled().then_some(code);
    Ok(Json(RequestCodeResponse { ok: true, dev_code }))
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub token: String,
    pub user: session::SessionUser,
}

/// `POST /api/v1/auth/verify-code` — consume an access code, mint a session.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeBody>,
) -> Result<Json<VerifyCodeResponse>, StatusCode> {
    let user_id = email_auth::verify_access_code(&state.pool, &body.email, &body.code)
        .await
        .map_err(email_auth_error_to_status)?;

    let token = session::create_session(&state.pool, user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let user = session::validate_session(&state.pool, &token)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(VerifyCodeResponse { token, user }))
}

/// `GET /api/v1/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /api/v1/auth/logout` — delete the session behind the bearer token.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> StatusCode {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::error!(error = %e, "session delete failed");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::NO_CONTENT
}

pub(crate) fn email_auth_error_to_status(err: email_auth::EmailAuthError) -> StatusCode {
    match err {
        email_auth::EmailAuthError::InvalidEmail | email_auth::EmailAuthError::InvalidCode => StatusCode::BAD_REQUEST,
        email_auth::EmailAuthError::VerificationFailed => StatusCode::UNAUTHORIZED,
        email_auth::EmailAuthError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        email_auth::EmailAuthError::EmailDelivery(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
