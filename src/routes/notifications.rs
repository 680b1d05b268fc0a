//! Notification routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::notification::{self, NotificationRow};
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct ListNotificationsQuery {
    /// `unread=true` returns only unread notifications.
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/v1/notifications` — the caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationRow>>, StatusCode> {
    let rows = notification::list_notifications(
        &state.pool,
        auth.user.id,
        query.unread,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )
    .await
    .map_err(notification_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/notifications/unread-count` — badge counter.
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let count = notification::unread_count(&state.pool, auth.user.id)
        .await
        .map_err(notification_error_to_status)?;
    Ok(Json(serde_json::json!({ "unread": count })))
}

/// `POST /api/v1/notifications/{id}/read` — mark one read; repeat calls keep
/// the original read time.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    notification::mark_read(&state.pool, notification_id, auth.user.id)
        .await
        .map_err(notification_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/notifications/read-all` — mark everything read.
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let updated = notification::mark_all_read(&state.pool, auth.user.id)
        .await
        .map_err(notification_error_to_status)?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// `DELETE /api/v1/notifications/{id}` — dismiss a notification.
pub async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    notification::delete_notification(&state.pool, notification_id, auth.user.id)
        .await
        .map_err(notification_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn notification_error_to_status(err: notification::NotificationError) -> StatusCode {
    match err {
        notification::NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
        notification::NotificationError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
