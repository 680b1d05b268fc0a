//! Analytics service — aggregate reporting over tasks.
//!
//! DESIGN
//! ======
//! All reports run as single aggregate queries over the caller's tasks (owned
//! or assigned). Family reports additionally require membership and group by
//! member. Daily buckets come from `to_char` over `completed_at_ms`, so the
//! bucketing lives in SQL and the service just shapes rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::services::family::{self, FamilyError};
use crate::services::task::now_ms;

pub const DEFAULT_DAILY_DAYS: i64 = 14;
pub const MAX_DAILY_DAYS: i64 = 90;

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("family not found: {0}")]
    FamilyNotFound(Uuid),
    #[error("not a member of family {0}")]
    Forbidden(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub done: i64,
    pub archived: i64,
    pub overdue: i64,
    pub completed_last_7d: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryStat {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub total: i64,
    pub done: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DailyCount {
    pub day: String,
    pub completed: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MemberStat {
    pub user_id: Uuid,
    pub name: String,
    pub role: String,
    pub open: i64,
    pub done: i64,
}

/// Completed share of non-archived tasks, in [0, 1].
#[must_use]
pub fn completion_rate(done: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = done as f64 / total as f64;
    rate
}

/// Clamp the requested day span for daily buckets.
#[must_use]
pub fn clamp_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_DAILY_DAYS).clamp(1, MAX_DAILY_DAYS)
}

/// Status totals, overdue count, recent completions and completion rate over
/// the caller's tasks.
pub async fn summary(pool: &PgPool, user_id: Uuid) -> Result<Summary, AnalyticsError> {
    let now = now_ms();
    let week_ago = now - 7 * MS_PER_DAY;

    let (total, todo, in_progress, done, archived, overdue, completed_last_7d) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64)>(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'todo'),
                    COUNT(*) FILTER (WHERE status = 'in_progress'),
                    COUNT(*) FILTER (WHERE status = 'done'),
                    COUNT(*) FILTER (WHERE status = 'archived'),
                    COUNT(*) FILTER (WHERE status IN ('todo', 'in_progress') AND due_at_ms IS NOT NULL AND due_at_ms < $2),
                    COUNT(*) FILTER (WHERE status = 'done' AND completed_at_ms >= $3)
             FROM tasks
             WHERE owner_id = $1 OR assignee_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .bind(week_ago)
        .fetch_one(pool)
        .await?;

    Ok(Summary {
        total,
        todo,
        in_progress,
        done,
        archived,
        overdue,
        completed_last_7d,
        completion_rate: completion_rate(done, total - archived),
    })
}

/// Per-category totals for the caller's tasks. Uncategorized tasks appear as
/// a row with null category.
pub async fn by_category(pool: &PgPool, user_id: Uuid) -> Result<Vec<CategoryStat>, AnalyticsError> {
    let rows = sqlx::query_as::<_, (Option<Uuid>, Option<String>, i64, i64)>(
        "SELECT c.id, c.name,
                COUNT(t.id),
                COUNT(t.id) FILTER (WHERE t.status = 'done')
         FROM tasks t
         LEFT JOIN categories c ON c.id = t.category_id
         WHERE t.owner_id = $1 OR t.assignee_id = $1
         GROUP BY c.id, c.name
         ORDER BY COUNT(t.id) DESC, c.name ASC NULLS LAST",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(category_id, category_name, total, done)| CategoryStat { category_id, category_name, total, done })
        .collect())
}

/// Completions per calendar day over the last `days` days, most recent last.
/// Days with no completions are omitted.
pub async fn daily_completions(
    pool: &PgPool,
    user_id: Uuid,
    days: Option<i64>,
) -> Result<Vec<DailyCount>, AnalyticsError> {
    let days = clamp_days(days);
    let since = now_ms() - days * MS_PER_DAY;

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT to_char(to_timestamp(completed_at_ms / 1000), 'YYYY-MM-DD') AS day, COUNT(*)
         FROM tasks
         WHERE (owner_id = $1 OR assignee_id = $1)
           AND status = 'done'
           AND completed_at_ms >= $2
         GROUP BY day
         ORDER BY day ASC",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(day, completed)| DailyCount { day, completed }).collect())
}

/// Per-member open/done counts for a family. Caller must be a member.
pub async fn family_breakdown(
    pool: &PgPool,
    family_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<MemberStat>, AnalyticsError> {
    let family_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM families WHERE id = $1)")
        .bind(family_id)
        .fetch_one(pool)
        .await?;
    if !family_exists {
        return Err(AnalyticsError::FamilyNotFound(family_id));
    }

    match family::member_role(pool, family_id, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(AnalyticsError::Forbidden(family_id)),
        Err(FamilyError::Database(e)) => return Err(AnalyticsError::Database(e)),
        Err(_) => return Err(AnalyticsError::Forbidden(family_id)),
    }

    let rows = sqlx::query_as::<_, (Uuid, String, String, i64, i64)>(
        "SELECT u.id, u.name, fm.role,
                COUNT(t.id) FILTER (WHERE t.status IN ('todo', 'in_progress')),
                COUNT(t.id) FILTER (WHERE t.status = 'done')
         FROM family_members fm
         JOIN users u ON u.id = fm.user_id
         LEFT JOIN tasks t ON t.family_id = fm.family_id AND t.assignee_id = fm.user_id
         WHERE fm.family_id = $1
         GROUP BY u.id, u.name, fm.role
         ORDER BY u.name ASC",
    )
    .bind(family_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user_id, name, role, open, done)| MemberStat { user_id, name, role, open, done })
        .collect())
}

#[cfg(test)]
#[path = "analytics_test.rs"]
mod tests;
