//! Analytics routes — summaries, breakdowns, achievements.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::achievement::{self, AchievementRow};
use crate::services::analytics::{self, CategoryStat, DailyCount, MemberStat, Summary};
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct DailyQuery {
    pub days: Option<i64>,
}

/// `GET /api/v1/analytics/summary` — status totals, overdue, recent
/// completions, completion rate.
pub async fn summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Summary>, StatusCode> {
    let summary = analytics::summary(&state.pool, auth.user.id)
        .await
        .map_err(analytics_error_to_status)?;
    Ok(Json(summary))
}

/// `GET /api/v1/analytics/categories` — per-category totals.
pub async fn by_category(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CategoryStat>>, StatusCode> {
    let rows = analytics::by_category(&state.pool, auth.user.id)
        .await
        .map_err(analytics_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/analytics/daily` — completions per day (default 14, max 90).
pub async fn daily(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<DailyCount>>, StatusCode> {
    let rows = analytics::daily_completions(&state.pool, auth.user.id, query.days)
        .await
        .map_err(analytics_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/families/{id}/analytics` — per-member open/done counts.
pub async fn family_breakdown(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
) -> Result<Json<Vec<MemberStat>>, StatusCode> {
    let rows = analytics::family_breakdown(&state.pool, family_id, auth.user.id)
        .await
        .map_err(analytics_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/achievements` — the caller's earned milestones.
pub async fn list_achievements(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AchievementRow>>, StatusCode> {
    let rows = achievement::list_achievements(&state.pool, auth.user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(rows))
}

pub(crate) fn analytics_error_to_status(err: analytics::AnalyticsError) -> StatusCode {
    match err {
        analytics::AnalyticsError::FamilyNotFound(_) => StatusCode::NOT_FOUND,
        analytics::AnalyticsError::Forbidden(_) => StatusCode::FORBIDDEN,
        analytics::AnalyticsError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
