//! Notification service — per-user inbox rows.
//!
//! Notifications are created by other services (reminder dispatch, task
//! assignment/completion, family membership) and only ever read or cleared by
//! their owner. Failed notification inserts are logged by callers and never
//! fail the triggering operation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::services::task::now_ms;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Kind discriminator stored with every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Reminder,
    TaskAssigned,
    TaskCompleted,
    FamilyAdded,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::TaskAssigned => "task_assigned",
            Self::TaskCompleted => "task_completed",
            Self::FamilyAdded => "family_added",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    pub task_id: Option<Uuid>,
    pub family_id: Option<Uuid>,
    pub read_at_ms: Option<i64>,
}

/// Insert a notification for `user_id`.
pub async fn notify(
    pool: &PgPool,
    user_id: Uuid,
    kind: NotificationKind,
    body: &str,
    task_id: Option<Uuid>,
    family_id: Option<Uuid>,
) -> Result<Uuid, NotificationError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, body, task_id, family_id) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(user_id)
    .bind(kind.as_str())
    .bind(body)
    .bind(task_id)
    .bind(family_id)
    .execute(pool)
    .await?;
    Ok(id)
}

/// List the caller's notifications, newest first.
pub async fn list_notifications(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<NotificationRow>, NotificationError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, Option<Uuid>, Option<Uuid>, Option<i64>)>(
        "SELECT id, user_id, kind, body, task_id, family_id, read_at_ms
         FROM notifications
         WHERE user_id = $1 AND ($2 = false OR read_at_ms IS NULL)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit.clamp(1, 200))
    .bind(offset.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, user_id, kind, body, task_id, family_id, read_at_ms)| NotificationRow {
            id,
            user_id,
            kind,
            body,
            task_id,
            family_id,
            read_at_ms,
        })
        .collect())
}

/// Count unread notifications.
pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, NotificationError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at_ms IS NULL")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Mark one notification read. Already-read rows are left untouched.
pub async fn mark_read(pool: &PgPool, notification_id: Uuid, user_id: Uuid) -> Result<(), NotificationError> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at_ms = COALESCE(read_at_ms, $3) WHERE id = $1 AND user_id = $2",
    )
    .bind(notification_id)
    .bind(user_id)
    .bind(now_ms())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(NotificationError::NotFound(notification_id));
    }
    Ok(())
}

/// Mark all of the caller's notifications read; returns the number affected.
pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, NotificationError> {
    let result = sqlx::query("UPDATE notifications SET read_at_ms = $2 WHERE user_id = $1 AND read_at_ms IS NULL")
        .bind(user_id)
        .bind(now_ms())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Delete one notification.
pub async fn delete_notification(pool: &PgPool, notification_id: Uuid, user_id: Uuid) -> Result<(), NotificationError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(NotificationError::NotFound(notification_id));
    }
    Ok(())
}
