//! Board service — kanban boards and their columns.
//!
//! DESIGN
//! ======
//! A board is either personal (owner only) or attached to a family (every
//! member views, family admins manage). Tasks are placed on a board by
//! pointing their `column_id` at one of its columns; deleting a column or
//! board never deletes tasks, it only unplaces them.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::family::{self, FamilyRole};
use crate::services::task::{self, TaskAccess, TaskRow};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board not found: {0}")]
    NotFound(Uuid),
    #[error("no access to board: {0}")]
    Forbidden(Uuid),
    #[error("invalid board operation: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Access level required for a board operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPermission {
    View,
    Manage,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BoardRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub family_id: Option<Uuid>,
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ColumnRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
}

// =============================================================================
// ACCESS CONTROL
// =============================================================================

/// Load a board and verify the caller holds `permission` on it.
pub async fn ensure_board_permission(
    pool: &PgPool,
    board_id: Uuid,
    user_id: Uuid,
    permission: BoardPermission,
) -> Result<BoardRow, BoardError> {
    let row = sqlx::query("SELECT id, owner_id, family_id, name FROM boards WHERE id = $1")
        .bind(board_id)
        .fetch_optional(pool)
        .await?
        .ok_or(BoardError::NotFound(board_id))?;

    let board = BoardRow {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        family_id: row.get("family_id"),
        name: row.get("name"),
    };

    if board.owner_id == user_id {
        return Ok(board);
    }
    let Some(family_id) = board.family_id else {
        return Err(BoardError::Forbidden(board_id));
    };

    let role = family::member_role(pool, family_id, user_id)
        .await
        .map_err(|e| match e {
            family::FamilyError::Database(db) => BoardError::Database(db),
            _ => BoardError::Forbidden(board_id),
        })?;
    let allowed = match permission {
        BoardPermission::View => role.is_some(),
        BoardPermission::Manage => role == Some(FamilyRole::Admin),
    };
    if !allowed {
        return Err(BoardError::Forbidden(board_id));
    }
    Ok(board)
}

// =============================================================================
// BOARD CRUD
// =============================================================================

/// Create a board. With a `family_id` the creator must be a member.
pub async fn create_board(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    family_id: Option<Uuid>,
) -> Result<BoardRow, BoardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::Invalid("name must not be empty".into()));
    }
    if let Some(family_id) = family_id {
        let role = family::member_role(pool, family_id, owner_id)
            .await
            .map_err(|e| match e {
                family::FamilyError::Database(db) => BoardError::Database(db),
                _ => BoardError::Invalid("unknown family".into()),
            })?;
        if role.is_none() {
            return Err(BoardError::Invalid("not a member of that family".into()));
        }
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO boards (id, owner_id, family_id, name) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(owner_id)
        .bind(family_id)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(BoardRow { id, owner_id, family_id, name: name.to_owned() })
}

/// Boards the caller owns or shares through a family.
pub async fn list_boards(pool: &PgPool, user_id: Uuid) -> Result<Vec<BoardRow>, BoardError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Option<Uuid>, String)>(
        "SELECT b.id, b.owner_id, b.family_id, b.name
         FROM boards b
         WHERE b.owner_id = $1
            OR EXISTS(SELECT 1 FROM family_members fm WHERE fm.family_id = b.family_id AND fm.user_id = $1)
         ORDER BY b.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, owner_id, family_id, name)| BoardRow { id, owner_id, family_id, name })
        .collect())
}

/// Rename a board.
pub async fn rename_board(pool: &PgPool, board_id: Uuid, user_id: Uuid, name: &str) -> Result<BoardRow, BoardError> {
    let mut board = ensure_board_permission(pool, board_id, user_id, BoardPermission::Manage).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::Invalid("name must not be empty".into()));
    }

    sqlx::query("UPDATE boards SET name = $2 WHERE id = $1")
        .bind(board_id)
        .bind(name)
        .execute(pool)
        .await?;
    board.name = name.to_owned();
    Ok(board)
}

/// Delete a board. Columns cascade; tasks lose their placement.
pub async fn delete_board(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<(), BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::Manage).await?;
    sqlx::query("DELETE FROM boards WHERE id = $1")
        .bind(board_id)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// COLUMNS
// =============================================================================

/// Columns of a board in display order.
pub async fn list_columns(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<Vec<ColumnRow>, BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::View).await?;

    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, i32)>(
        "SELECT id, board_id, name, position FROM board_columns WHERE board_id = $1 ORDER BY position ASC, created_at ASC",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, board_id, name, position)| ColumnRow { id, board_id, name, position })
        .collect())
}

/// Add a column. Omitted positions append to the end.
pub async fn create_column(
    pool: &PgPool,
    board_id: Uuid,
    user_id: Uuid,
    name: &str,
    position: Option<i32>,
) -> Result<ColumnRow, BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::Manage).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::Invalid("name must not be empty".into()));
    }

    let position = match position {
        Some(value) => value,
        None => {
            let max: Option<i32> =
                sqlx::query_scalar("SELECT MAX(position) FROM board_columns WHERE board_id = $1")
                    .bind(board_id)
                    .fetch_one(pool)
                    .await?;
            max.unwrap_or(-1) + 1
        }
    };

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO board_columns (id, board_id, name, position) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(board_id)
        .bind(name)
        .bind(position)
        .execute(pool)
        .await?;

    Ok(ColumnRow { id, board_id, name: name.to_owned(), position })
}

/// Rename or reposition a column.
pub async fn update_column(
    pool: &PgPool,
    board_id: Uuid,
    column_id: Uuid,
    user_id: Uuid,
    name: Option<&str>,
    position: Option<i32>,
) -> Result<ColumnRow, BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::Manage).await?;

    let row = sqlx::query_as::<_, (Uuid, Uuid, String, i32)>(
        "SELECT id, board_id, name, position FROM board_columns WHERE id = $1 AND board_id = $2",
    )
    .bind(column_id)
    .bind(board_id)
    .fetch_optional(pool)
    .await?
    .ok_or(BoardError::NotFound(column_id))?;

    let mut column = ColumnRow { id: row.0, board_id: row.1, name: row.2, position: row.3 };
    if let Some(name) = name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BoardError::Invalid("name must not be empty".into()));
        }
        column.name = trimmed.to_owned();
    }
    if let Some(position) = position {
        column.position = position;
    }

    sqlx::query("UPDATE board_columns SET name = $2, position = $3 WHERE id = $1")
        .bind(column.id)
        .bind(&column.name)
        .bind(column.position)
        .execute(pool)
        .await?;
    Ok(column)
}

/// Delete a column. Its tasks stay, unplaced.
pub async fn delete_column(pool: &PgPool, board_id: Uuid, column_id: Uuid, user_id: Uuid) -> Result<(), BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::Manage).await?;

    let result = sqlx::query("DELETE FROM board_columns WHERE id = $1 AND board_id = $2")
        .bind(column_id)
        .bind(board_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(BoardError::NotFound(column_id));
    }
    Ok(())
}

// =============================================================================
// TASK PLACEMENT
// =============================================================================

/// Place a task in a column of this board. The task must be editable by the
/// caller and live in the board's sharing scope.
pub async fn place_task(
    pool: &PgPool,
    board_id: Uuid,
    column_id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<TaskRow, BoardError> {
    let board = ensure_board_permission(pool, board_id, user_id, BoardPermission::View).await?;

    let column_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM board_columns WHERE id = $1 AND board_id = $2)")
            .bind(column_id)
            .bind(board_id)
            .fetch_one(pool)
            .await?;
    if !column_exists {
        return Err(BoardError::NotFound(column_id));
    }

    let mut task = task::ensure_task_access(pool, task_id, user_id, TaskAccess::Edit)
        .await
        .map_err(task_error_to_board_error)?;

    let in_scope = match board.family_id {
        Some(family_id) => task.family_id == Some(family_id),
        None => task.owner_id == board.owner_id,
    };
    if !in_scope {
        return Err(BoardError::Invalid("task is outside the board's sharing scope".into()));
    }

    task.column_id = Some(column_id);
    task.version = task.version.saturating_add(1);
    sqlx::query("UPDATE tasks SET column_id = $2, version = $3, updated_at = now() WHERE id = $1")
        .bind(task.id)
        .bind(column_id)
        .bind(task.version)
        .execute(pool)
        .await?;
    Ok(task)
}

/// Take a task off the board.
pub async fn unplace_task(pool: &PgPool, board_id: Uuid, task_id: Uuid, user_id: Uuid) -> Result<(), BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::View).await?;
    let task = task::ensure_task_access(pool, task_id, user_id, TaskAccess::Edit)
        .await
        .map_err(task_error_to_board_error)?;

    let on_board: bool = match task.column_id {
        Some(column_id) => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM board_columns WHERE id = $1 AND board_id = $2)")
                .bind(column_id)
                .bind(board_id)
                .fetch_one(pool)
                .await?
        }
        None => false,
    };
    if !on_board {
        return Err(BoardError::Invalid("task is not on this board".into()));
    }

    sqlx::query("UPDATE tasks SET column_id = NULL, updated_at = now() WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Tasks placed in a given column, by due date then recency.
pub async fn list_column_tasks(
    pool: &PgPool,
    board_id: Uuid,
    column_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<TaskRow>, BoardError> {
    ensure_board_permission(pool, board_id, user_id, BoardPermission::View).await?;

    let filter = task::TaskFilter {
        column_id: Some(column_id),
        limit: 500,
        ..task::TaskFilter::default()
    };
    task::list_tasks(pool, user_id, &filter)
        .await
        .map_err(task_error_to_board_error)
}

fn task_error_to_board_error(err: task::TaskError) -> BoardError {
    match err {
        task::TaskError::NotFound(id) => BoardError::Invalid(format!("task not found: {id}")),
        task::TaskError::Forbidden(id) => BoardError::Forbidden(id),
        task::TaskError::Invalid(msg) => BoardError::Invalid(msg),
        task::TaskError::Database(e) => BoardError::Database(e),
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
