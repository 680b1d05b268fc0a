//! Achievement service — completion milestones.
//!
//! Awarding is idempotent (`ON CONFLICT DO NOTHING`), so re-running the check
//! after any completion is safe and the newly-earned set comes straight from
//! the insert's `RETURNING`.

use sqlx::PgPool;
use uuid::Uuid;

/// Milestone codes and the completed-task count that earns them.
const THRESHOLDS: &[(&str, i64)] = &[
    ("first_done", 1),
    ("ten_done", 10),
    ("fifty_done", 50),
    ("hundred_done", 100),
];

#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AchievementRow {
    pub code: String,
    pub earned_at: String,
}

/// Codes earned at a given completed-task count.
#[must_use]
pub fn earned_codes(completed: i64) -> Vec<&'static str> {
    THRESHOLDS
        .iter()
        .filter(|(_, threshold)| completed >= *threshold)
        .map(|(code, _)| *code)
        .collect()
}

/// Count tasks the user has completed (owned or assigned).
async fn completed_count(pool: &PgPool, user_id: Uuid) -> Result<i64, AchievementError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE status = 'done' AND (owner_id = $1 OR assignee_id = $1)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Re-evaluate milestones after a completion. Returns only codes that were
/// newly awarded by this call.
pub async fn award_for_completion(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, AchievementError> {
    let completed = completed_count(pool, user_id).await?;
    let earned = earned_codes(completed);
    if earned.is_empty() {
        return Ok(Vec::new());
    }

    let mut newly = Vec::new();
    for code in earned {
        let inserted: Option<String> = sqlx::query_scalar(
            "INSERT INTO achievements (user_id, code) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING code",
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(pool)
        .await?;
        if let Some(code) = inserted {
            newly.push(code);
        }
    }
    Ok(newly)
}

/// The caller's earned achievements, oldest first.
pub async fn list_achievements(pool: &PgPool, user_id: Uuid) -> Result<Vec<AchievementRow>, AchievementError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT code, to_char(earned_at, 'YYYY-MM-DD HH24:MI') AS earned_at
         FROM achievements
         WHERE user_id = $1
         ORDER BY earned_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(code, earned_at)| AchievementRow { code, earned_at })
        .collect())
}

#[cfg(test)]
#[path = "achievement_test.rs"]
mod tests;
