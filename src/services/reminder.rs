//! Reminder service — per-task reminders and the background dispatcher.
//!
//! DESIGN
//! ======
//! A background task claims due reminders and fans them out as notifications,
//! then sleeps before the next cycle. Claims are atomic
//! (`UPDATE ... RETURNING` over a `SKIP LOCKED` subselect) so multiple server
//! instances never double-send.
//!
//! ERROR HANDLING
//! ==============
//! Claim-then-notify ordering means a crash between the two can drop a
//! notification but never duplicate one; reminders favor at-most-once
//! delivery.

use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::notification::{self, NotificationKind};
use crate::services::task::{self, TaskAccess, now_ms};
use crate::state::AppState;

const DEFAULT_REMINDER_POLL_INTERVAL_MS: u64 = 30_000;
const DEFAULT_REMINDER_CLAIM_BATCH: i64 = 100;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reminder not found: {0}")]
    NotFound(Uuid),
    #[error("invalid reminder: {0}")]
    Invalid(String),
    #[error("no access to task: {0}")]
    Forbidden(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderRow {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub remind_at_ms: i64,
    pub message: Option<String>,
    pub sent_at_ms: Option<i64>,
}

/// A reminder claimed for dispatch, joined with its task title.
#[derive(Debug, Clone)]
pub struct ClaimedReminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub message: Option<String>,
    pub task_title: String,
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a reminder on a task the caller can see.
pub async fn create_reminder(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
    remind_at_ms: i64,
    message: Option<String>,
) -> Result<ReminderRow, ReminderError> {
    if remind_at_ms <= 0 {
        return Err(ReminderError::Invalid("remind_at_ms must be a positive epoch timestamp".into()));
    }
    task::ensure_task_access(pool, task_id, user_id, TaskAccess::View)
        .await
        .map_err(|e| match e {
            task::TaskError::NotFound(id) => ReminderError::Invalid(format!("task not found: {id}")),
            task::TaskError::Forbidden(id) => ReminderError::Forbidden(id),
            task::TaskError::Invalid(msg) => ReminderError::Invalid(msg),
            task::TaskError::Database(db) => ReminderError::Database(db),
        })?;

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO reminders (id, task_id, user_id, remind_at_ms, message) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(task_id)
        .bind(user_id)
        .bind(remind_at_ms)
        .bind(&message)
        .execute(pool)
        .await?;

    Ok(ReminderRow { id, task_id, user_id, remind_at_ms, message, sent_at_ms: None })
}

/// The caller's reminders, soonest first. `upcoming_only` hides sent and
/// past-due rows.
pub async fn list_reminders(
    pool: &PgPool,
    user_id: Uuid,
    upcoming_only: bool,
) -> Result<Vec<ReminderRow>, ReminderError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, i64, Option<String>, Option<i64>)>(
        "SELECT id, task_id, user_id, remind_at_ms, message, sent_at_ms
         FROM reminders
         WHERE user_id = $1 AND ($2 = false OR (sent_at_ms IS NULL AND remind_at_ms > $3))
         ORDER BY remind_at_ms ASC",
    )
    .bind(user_id)
    .bind(upcoming_only)
    .bind(now_ms())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, task_id, user_id, remind_at_ms, message, sent_at_ms)| ReminderRow {
            id,
            task_id,
            user_id,
            remind_at_ms,
            message,
            sent_at_ms,
        })
        .collect())
}

/// Reschedule or reword an unsent reminder.
pub async fn update_reminder(
    pool: &PgPool,
    reminder_id: Uuid,
    user_id: Uuid,
    remind_at_ms: Option<i64>,
    message: Option<Option<String>>,
) -> Result<ReminderRow, ReminderError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, i64, Option<String>, Option<i64>)>(
        "SELECT id, task_id, user_id, remind_at_ms, message, sent_at_ms FROM reminders WHERE id = $1 AND user_id = $2",
    )
    .bind(reminder_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ReminderError::NotFound(reminder_id))?;

    let mut reminder = ReminderRow {
        id: row.0,
        task_id: row.1,
        user_id: row.2,
        remind_at_ms: row.3,
        message: row.4,
        sent_at_ms: row.5,
    };
    if reminder.sent_at_ms.is_some() {
        return Err(ReminderError::Invalid("reminder was already sent".into()));
    }
    if let Some(remind_at_ms) = remind_at_ms {
        if remind_at_ms <= 0 {
            return Err(ReminderError::Invalid("remind_at_ms must be a positive epoch timestamp".into()));
        }
        reminder.remind_at_ms = remind_at_ms;
    }
    if let Some(message) = message {
        reminder.message = message;
    }

    sqlx::query("UPDATE reminders SET remind_at_ms = $2, message = $3 WHERE id = $1")
        .bind(reminder.id)
        .bind(reminder.remind_at_ms)
        .bind(&reminder.message)
        .execute(pool)
        .await?;
    Ok(reminder)
}

/// Delete a reminder.
pub async fn delete_reminder(pool: &PgPool, reminder_id: Uuid, user_id: Uuid) -> Result<(), ReminderError> {
    let result = sqlx::query("DELETE FROM reminders WHERE id = $1 AND user_id = $2")
        .bind(reminder_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ReminderError::NotFound(reminder_id));
    }
    Ok(())
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Atomically claim up to `batch` due reminders, stamping `sent_at_ms`.
pub async fn claim_due_reminders(pool: &PgPool, now: i64, batch: i64) -> Result<Vec<ClaimedReminder>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, Option<String>, String)>(
        "UPDATE reminders r
         SET sent_at_ms = $1
         FROM tasks t
         WHERE t.id = r.task_id
           AND r.id IN (
               SELECT id FROM reminders
               WHERE sent_at_ms IS NULL AND remind_at_ms <= $1
               ORDER BY remind_at_ms ASC
               LIMIT $2
               FOR UPDATE SKIP LOCKED
           )
         RETURNING r.id, r.user_id, r.task_id, r.message, t.title",
    )
    .bind(now)
    .bind(batch)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, user_id, task_id, message, task_title)| ClaimedReminder {
            id,
            user_id,
            task_id,
            message,
            task_title,
        })
        .collect())
}

/// Build the notification body for a claimed reminder.
#[must_use]
pub fn reminder_body(claimed: &ClaimedReminder) -> String {
    match claimed.message.as_deref() {
        Some(message) if !message.trim().is_empty() => format!("{}: {message}", claimed.task_title),
        _ => format!("Reminder: {}", claimed.task_title),
    }
}

/// One dispatch cycle: claim due reminders and turn each into a notification.
pub async fn dispatch_due_reminders(state: &AppState) {
    let batch = env_parse("REMINDER_CLAIM_BATCH", DEFAULT_REMINDER_CLAIM_BATCH);
    let claimed = match claim_due_reminders(&state.pool, now_ms(), batch).await {
        Ok(claimed) => claimed,
        Err(e) => {
            error!(error = %e, "reminder claim failed");
            return;
        }
    };
    if claimed.is_empty() {
        return;
    }
    info!(count = claimed.len(), "dispatching due reminders");

    for reminder in &claimed {
        let body = reminder_body(reminder);
        if let Err(e) = notification::notify(
            &state.pool,
            reminder.user_id,
            NotificationKind::Reminder,
            &body,
            Some(reminder.task_id),
            None,
        )
        .await
        {
            // The claim already stamped sent_at_ms; log and move on.
            error!(error = %e, reminder_id = %reminder.id, "reminder notification insert failed");
        }
    }
}

/// Spawn the background reminder dispatcher. Returns a handle for shutdown.
pub fn spawn_reminder_worker(state: AppState) -> JoinHandle<()> {
    let poll_interval_ms = env_parse("REMINDER_POLL_INTERVAL_MS", DEFAULT_REMINDER_POLL_INTERVAL_MS);
    info!(poll_interval_ms, "reminder dispatcher configured");
    tokio::spawn(async move {
        loop {
            dispatch_due_reminders(&state).await;
            tokio::time::sleep(Duration::from_millis(poll_interval_ms)).await;
        }
    })
}

#[cfg(test)]
#[path = "reminder_test.rs"]
mod tests;
