//! Category service — per-user task categories.

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("category not found: {0}")]
    NotFound(Uuid),
    #[error("invalid category: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub color: String,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// Create a category for `owner_id`. Names are unique per owner.
pub async fn create_category(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    color: Option<&str>,
) -> Result<CategoryRow, CategoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryError::Invalid("name must not be empty".into()));
    }
    let color = color.unwrap_or("#9E9E9E");

    let row = sqlx::query_as::<_, (Uuid,)>(
        "INSERT INTO categories (owner_id, name, color) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(owner_id)
    .bind(name)
    .bind(color)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            CategoryError::Invalid(format!("category already exists: {name}"))
        } else {
            CategoryError::Database(e)
        }
    })?;

    Ok(CategoryRow { id: row.0, owner_id, name: name.to_owned(), color: color.to_owned() })
}

/// List the caller's categories, alphabetically.
pub async fn list_categories(pool: &PgPool, owner_id: Uuid) -> Result<Vec<CategoryRow>, CategoryError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String)>(
        "SELECT id, owner_id, name, color FROM categories WHERE owner_id = $1 ORDER BY name ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, owner_id, name, color)| CategoryRow { id, owner_id, name, color })
        .collect())
}

/// Rename or recolor a category.
pub async fn update_category(
    pool: &PgPool,
    category_id: Uuid,
    owner_id: Uuid,
    name: Option<&str>,
    color: Option<&str>,
) -> Result<CategoryRow, CategoryError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, String, String)>(
        "SELECT id, owner_id, name, color FROM categories WHERE id = $1 AND owner_id = $2",
    )
    .bind(category_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(CategoryError::NotFound(category_id))?;

    let mut category = CategoryRow { id: row.0, owner_id: row.1, name: row.2, color: row.3 };
    if let Some(name) = name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CategoryError::Invalid("name must not be empty".into()));
        }
        category.name = trimmed.to_owned();
    }
    if let Some(color) = color {
        category.color = color.to_owned();
    }

    sqlx::query("UPDATE categories SET name = $3, color = $4 WHERE id = $1 AND owner_id = $2")
        .bind(category.id)
        .bind(owner_id)
        .bind(&category.name)
        .bind(&category.color)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CategoryError::Invalid(format!("category already exists: {}", category.name))
            } else {
                CategoryError::Database(e)
            }
        })?;

    Ok(category)
}

/// Delete a category. Tasks keep existing with `category_id` cleared.
pub async fn delete_category(pool: &PgPool, category_id: Uuid, owner_id: Uuid) -> Result<(), CategoryError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND owner_id = $2")
        .bind(category_id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CategoryError::NotFound(category_id));
    }
    Ok(())
}
