//! Tag service — per-user labels attachable to tasks.

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag not found: {0}")]
    NotFound(Uuid),
    #[error("invalid tag: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TagRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Number of tasks currently carrying the tag.
    pub task_count: i64,
}

/// Create a tag for `owner_id`. Names are unique per owner.
pub async fn create_tag(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<TagRow, TagError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::Invalid("name must not be empty".into()));
    }

    let row = sqlx::query_as::<_, (Uuid,)>("INSERT INTO tags (owner_id, name) VALUES ($1, $2) RETURNING id")
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
            if unique {
                TagError::Invalid(format!("tag already exists: {name}"))
            } else {
                TagError::Database(e)
            }
        })?;

    Ok(TagRow { id: row.0, owner_id, name: name.to_owned(), task_count: 0 })
}

/// List the caller's tags with usage counts, most used first.
pub async fn list_tags(pool: &PgPool, owner_id: Uuid) -> Result<Vec<TagRow>, TagError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, i64)>(
        "SELECT tg.id, tg.owner_id, tg.name, COUNT(tt.task_id) AS task_count
         FROM tags tg
         LEFT JOIN task_tags tt ON tt.tag_id = tg.id
         WHERE tg.owner_id = $1
         GROUP BY tg.id, tg.owner_id, tg.name
         ORDER BY task_count DESC, tg.name ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, owner_id, name, task_count)| TagRow { id, owner_id, name, task_count })
        .collect())
}

/// Delete a tag. Join rows cascade; tasks are untouched.
pub async fn delete_tag(pool: &PgPool, tag_id: Uuid, owner_id: Uuid) -> Result<(), TagError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND owner_id = $2")
        .bind(tag_id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TagError::NotFound(tag_id));
    }
    Ok(())
}

/// Verify the tag exists and belongs to the caller.
pub async fn ensure_owned_tag(pool: &PgPool, tag_id: Uuid, owner_id: Uuid) -> Result<(), TagError> {
    let owned: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE id = $1 AND owner_id = $2)")
        .bind(tag_id)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
    if !owned {
        return Err(TagError::NotFound(tag_id));
    }
    Ok(())
}
