//! Reminder routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::double_option;
use crate::services::reminder::{self, ReminderRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateReminderBody {
    pub task_id: Uuid,
    pub remind_at_ms: i64,
    pub message: Option<String>,
}

/// Patch body; `"message": null` clears the message.
#[derive(Deserialize)]
pub struct UpdateReminderBody {
    pub remind_at_ms: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub message: Option<Option<String>>,
}

#[derive(Deserialize, Default)]
pub struct ListRemindersQuery {
    /// `upcoming=true` hides sent and past-due reminders.
    #[serde(default)]
    pub upcoming: bool,
}

/// `POST /api/v1/reminders` — schedule a reminder on a visible task.
pub async fn create_reminder(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateReminderBody>,
) -> Result<(StatusCode, Json<ReminderRow>), StatusCode> {
    let row = reminder::create_reminder(&state.pool, auth.user.id, body.task_id, body.remind_at_ms, body.message)
        .await
        .map_err(reminder_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/reminders` — the caller's reminders, soonest first.
pub async fn list_reminders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListRemindersQuery>,
) -> Result<Json<Vec<ReminderRow>>, StatusCode> {
    let rows = reminder::list_reminders(&state.pool, auth.user.id, query.upcoming)
        .await
        .map_err(reminder_error_to_status)?;
    Ok(Json(rows))
}

/// `PATCH /api/v1/reminders/{id}` — reschedule or edit; sent reminders are frozen.
pub async fn update_reminder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reminder_id): Path<Uuid>,
    Json(body): Json<UpdateReminderBody>,
) -> Result<Json<ReminderRow>, StatusCode> {
    let row = reminder::update_reminder(&state.pool, reminder_id, auth.user.id, body.remind_at_ms, body.message)
        .await
        .map_err(reminder_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/reminders/{id}` — cancel a reminder.
pub async fn delete_reminder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reminder_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    reminder::delete_reminder(&state.pool, reminder_id, auth.user.id)
        .await
        .map_err(reminder_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn reminder_error_to_status(err: reminder::ReminderError) -> StatusCode {
    match err {
        reminder::ReminderError::NotFound(_) => StatusCode::NOT_FOUND,
        reminder::ReminderError::Forbidden(_) => StatusCode::FORBIDDEN,
        reminder::ReminderError::Invalid(_) => StatusCode::BAD_REQUEST,
        reminder::ReminderError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
