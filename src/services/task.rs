//! Task service — CRUD, visibility rules, completion, and assignment.
//!
//! DESIGN
//! ======
//! A task is visible to its owner, its assignee, and any member of its family
//! (when one is set). Mutation additionally requires the family member to be
//! an `admin` or `adult`; children can only view and complete tasks assigned
//! to them. All checks run against the database on every call, so there is no
//! cached authorization state to invalidate.

use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(Uuid),
    #[error("no access to task: {0}")]
    Forbidden(Uuid),
    #[error("invalid task data: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Archived,
}

impl TaskStatus {
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Access level required for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAccess {
    View,
    Edit,
}

/// Full task row as stored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub family_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub column_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub version: i32,
}

/// Fields for task creation. Optional fields fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub family_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_at_ms: Option<i64>,
}

/// Partial update. `Option<Option<_>>` distinguishes "leave alone" from
/// "clear the value".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_at_ms: Option<Option<i64>>,
}

/// List/search filters shared with the search service.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub category_id: Option<Uuid>,
    pub family_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub column_id: Option<Uuid>,
    pub tag: Option<String>,
    pub due_before_ms: Option<i64>,
    pub due_after_ms: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

pub(crate) fn now_ms() -> i64 {
    let Ok(duration) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

const TASK_COLUMNS: &str = "t.id, t.owner_id, t.family_id, t.category_id, t.column_id, t.assignee_id, \
     t.title, t.description, t.status, t.priority, t.due_at_ms, t.completed_at_ms, t.version";

type TaskTuple = (
    Uuid,
    Uuid,
    Option<Uuid>,
    Option<Uuid>,
    Option<Uuid>,
    Option<Uuid>,
    String,
    Option<String>,
    String,
    String,
    Option<i64>,
    Option<i64>,
    i32,
);

fn row_from_tuple(t: TaskTuple) -> TaskRow {
    let (
        id,
        owner_id,
        family_id,
        category_id,
        column_id,
        assignee_id,
        title,
        description,
        status,
        priority,
        due_at_ms,
        completed_at_ms,
        version,
    ) = t;
    TaskRow {
        id,
        owner_id,
        family_id,
        category_id,
        column_id,
        assignee_id,
        title,
        description,
        status,
        priority,
        due_at_ms,
        completed_at_ms,
        version,
    }
}

// =============================================================================
// ACCESS CONTROL
// =============================================================================

/// Load a task and verify the caller may perform `access`-level operations.
///
/// # Errors
///
/// `NotFound` if the task does not exist, `Forbidden` if it exists but the
/// caller lacks the required access.
pub async fn ensure_task_access(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
    access: TaskAccess,
) -> Result<TaskRow, TaskError> {
    let row = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS}, fm.role AS member_role
         FROM tasks t
         LEFT JOIN family_members fm ON fm.family_id = t.family_id AND fm.user_id = $2
         WHERE t.id = $1"
    ))
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(TaskError::NotFound(task_id))?;

    let task = TaskRow {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        family_id: row.get("family_id"),
        category_id: row.get("category_id"),
        column_id: row.get("column_id"),
        assignee_id: row.get("assignee_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        priority: row.get("priority"),
        due_at_ms: row.get("due_at_ms"),
        completed_at_ms: row.get("completed_at_ms"),
        version: row.get("version"),
    };
    let member_role: Option<String> = row.get("member_role");

    let is_owner = task.owner_id == user_id;
    let is_assignee = task.assignee_id == Some(user_id);
    let allowed = match access {
        TaskAccess::View => is_owner || is_assignee || member_role.is_some(),
        TaskAccess::Edit => {
            is_owner
                || is_assignee
                || matches!(member_role.as_deref(), Some("admin" | "adult"))
        }
    };

    if !allowed {
        return Err(TaskError::Forbidden(task_id));
    }
    Ok(task)
}

async fn ensure_family_member(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<(), TaskError> {
    let is_member: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM family_members WHERE family_id = $1 AND user_id = $2)",
    )
    .bind(family_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if !is_member {
        return Err(TaskError::Invalid("not a member of that family".into()));
    }
    Ok(())
}

async fn ensure_owned_category(pool: &PgPool, category_id: Uuid, owner_id: Uuid) -> Result<(), TaskError> {
    let owned: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND owner_id = $2)")
        .bind(category_id)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
    if !owned {
        return Err(TaskError::Invalid("unknown category".into()));
    }
    Ok(())
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a task owned by `owner_id`.
///
/// # Errors
///
/// `Invalid` for bad field values or references the owner cannot use.
pub async fn create_task(pool: &PgPool, owner_id: Uuid, new: NewTask) -> Result<TaskRow, TaskError> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(TaskError::Invalid("title must not be empty".into()));
    }
    let status = match new.status.as_deref() {
        None => TaskStatus::Todo,
        Some(raw) => TaskStatus::from_str(raw).ok_or_else(|| TaskError::Invalid(format!("unknown status: {raw}")))?,
    };
    let priority = match new.priority.as_deref() {
        None => TaskPriority::Medium,
        Some(raw) => {
            TaskPriority::from_str(raw).ok_or_else(|| TaskError::Invalid(format!("unknown priority: {raw}")))?
        }
    };
    if let Some(family_id) = new.family_id {
        ensure_family_member(pool, family_id, owner_id).await?;
        if let Some(assignee_id) = new.assignee_id {
            ensure_family_member(pool, family_id, assignee_id)
                .await
                .map_err(|_| TaskError::Invalid("assignee is not in that family".into()))?;
        }
    } else if new.assignee_id.is_some_and(|a| a != owner_id) {
        return Err(TaskError::Invalid("assignee requires a family task".into()));
    }
    if let Some(category_id) = new.category_id {
        ensure_owned_category(pool, category_id, owner_id).await?;
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tasks (id, owner_id, family_id, category_id, assignee_id, title, description, status, priority, due_at_ms)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(owner_id)
    .bind(new.family_id)
    .bind(new.category_id)
    .bind(new.assignee_id)
    .bind(title)
    .bind(&new.description)
    .bind(status.as_str())
    .bind(priority.as_str())
    .bind(new.due_at_ms)
    .execute(pool)
    .await?;

    Ok(TaskRow {
        id,
        owner_id,
        family_id: new.family_id,
        category_id: new.category_id,
        column_id: None,
        assignee_id: new.assignee_id,
        title: title.to_owned(),
        description: new.description,
        status: status.as_str().to_owned(),
        priority: priority.as_str().to_owned(),
        due_at_ms: new.due_at_ms,
        completed_at_ms: None,
        version: 1,
    })
}

/// Append `filter` conditions to a task query. The builder must already hold
/// a complete `WHERE` visibility clause; every condition here is `AND`-ed on.
pub(crate) fn apply_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &TaskFilter) {
    if let Some(status) = &filter.status {
        builder.push(" AND t.status = ").push_bind(status.clone());
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND t.category_id = ").push_bind(category_id);
    }
    if let Some(family_id) = filter.family_id {
        builder.push(" AND t.family_id = ").push_bind(family_id);
    }
    if let Some(assignee_id) = filter.assignee_id {
        builder.push(" AND t.assignee_id = ").push_bind(assignee_id);
    }
    if let Some(column_id) = filter.column_id {
        builder.push(" AND t.column_id = ").push_bind(column_id);
    }
    if let Some(tag) = &filter.tag {
        builder
            .push(" AND EXISTS(SELECT 1 FROM task_tags tt JOIN tags tg ON tg.id = tt.tag_id WHERE tt.task_id = t.id AND tg.name = ")
            .push_bind(tag.clone())
            .push(")");
    }
    if let Some(due_before_ms) = filter.due_before_ms {
        builder.push(" AND t.due_at_ms <= ").push_bind(due_before_ms);
    }
    if let Some(due_after_ms) = filter.due_after_ms {
        builder.push(" AND t.due_at_ms >= ").push_bind(due_after_ms);
    }
}

/// Visibility clause fragment: tasks the user owns, is assigned, or shares a
/// family with.
pub(crate) fn push_visibility_clause(builder: &mut QueryBuilder<'_, sqlx::Postgres>, user_id: Uuid) {
    builder
        .push(" WHERE (t.owner_id = ")
        .push_bind(user_id)
        .push(" OR t.assignee_id = ")
        .push_bind(user_id)
        .push(" OR EXISTS(SELECT 1 FROM family_members fm WHERE fm.family_id = t.family_id AND fm.user_id = ")
        .push_bind(user_id)
        .push("))");
}

/// List tasks visible to `user_id`, newest first, honoring `filter`.
pub async fn list_tasks(pool: &PgPool, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<TaskRow>, TaskError> {
    let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"));
    push_visibility_clause(&mut builder, user_id);
    apply_filters(&mut builder, filter);
    builder.push(" ORDER BY t.created_at DESC");
    builder.push(" LIMIT ").push_bind(filter.limit.clamp(1, 500));
    builder.push(" OFFSET ").push_bind(filter.offset.max(0));

    let rows = builder.build_query_as::<TaskTuple>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(row_from_tuple).collect())
}

/// Fetch one task with view access.
pub async fn get_task(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<TaskRow, TaskError> {
    ensure_task_access(pool, task_id, user_id, TaskAccess::View).await
}

/// Apply a partial update. Archived tasks only accept a status change (to
/// unarchive); anything else is rejected.
pub async fn update_task(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
    patch: TaskPatch,
) -> Result<TaskRow, TaskError> {
    let mut task = ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;

    if task.status == TaskStatus::Archived.as_str() && patch.status.is_none() {
        return Err(TaskError::Invalid("task is archived; unarchive it first".into()));
    }

    if let Some(title) = patch.title {
        let trimmed = title.trim().to_owned();
        if trimmed.is_empty() {
            return Err(TaskError::Invalid("title must not be empty".into()));
        }
        task.title = trimmed;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(category_id) = patch.category_id {
        if let Some(category_id) = category_id {
            ensure_owned_category(pool, category_id, task.owner_id).await?;
        }
        task.category_id = category_id;
    }
    if let Some(raw) = patch.status {
        let status = TaskStatus::from_str(&raw).ok_or_else(|| TaskError::Invalid(format!("unknown status: {raw}")))?;
        if status == TaskStatus::Done && task.completed_at_ms.is_none() {
            task.completed_at_ms = Some(now_ms());
        }
        if status != TaskStatus::Done && status != TaskStatus::Archived {
            task.completed_at_ms = None;
        }
        task.status = status.as_str().to_owned();
    }
    if let Some(raw) = patch.priority {
        let priority =
            TaskPriority::from_str(&raw).ok_or_else(|| TaskError::Invalid(format!("unknown priority: {raw}")))?;
        task.priority = priority.as_str().to_owned();
    }
    if let Some(due_at_ms) = patch.due_at_ms {
        task.due_at_ms = due_at_ms;
    }
    task.version = task.version.saturating_add(1);

    sqlx::query(
        "UPDATE tasks
         SET title = $2, description = $3, category_id = $4, status = $5, priority = $6,
             due_at_ms = $7, completed_at_ms = $8, version = $9, updated_at = now()
         WHERE id = $1",
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.category_id)
    .bind(&task.status)
    .bind(&task.priority)
    .bind(task.due_at_ms)
    .bind(task.completed_at_ms)
    .bind(task.version)
    .execute(pool)
    .await?;

    Ok(task)
}

/// Delete a task.
pub async fn delete_task(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<(), TaskError> {
    ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;
    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// COMPLETION / ASSIGNMENT
// =============================================================================

/// Mark a task done. Idempotent: completing an already-done task returns the
/// row unchanged with `newly_completed = false`. Completion is a mutation, so
/// it needs edit access: owner, assignee, or an adult/admin family member.
pub async fn complete_task(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<(TaskRow, bool), TaskError> {
    let mut task = ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;
    if task.status == TaskStatus::Done.as_str() {
        return Ok((task, false));
    }
    if task.status == TaskStatus::Archived.as_str() {
        return Err(TaskError::Invalid("task is archived".into()));
    }

    task.status = TaskStatus::Done.as_str().to_owned();
    task.completed_at_ms = Some(now_ms());
    task.version = task.version.saturating_add(1);

    sqlx::query(
        "UPDATE tasks SET status = $2, completed_at_ms = $3, version = $4, updated_at = now() WHERE id = $1",
    )
    .bind(task.id)
    .bind(&task.status)
    .bind(task.completed_at_ms)
    .bind(task.version)
    .execute(pool)
    .await?;

    Ok((task, true))
}

/// Assign a task to a user. The assignee must be the owner or a member of the
/// task's family.
pub async fn assign_task(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
    assignee_id: Uuid,
) -> Result<TaskRow, TaskError> {
    let mut task = ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;

    if assignee_id != task.owner_id {
        let Some(family_id) = task.family_id else {
            return Err(TaskError::Invalid("assignee requires a family task".into()));
        };
        ensure_family_member(pool, family_id, assignee_id)
            .await
            .map_err(|_| TaskError::Invalid("assignee is not in that family".into()))?;
    }

    task.assignee_id = Some(assignee_id);
    task.version = task.version.saturating_add(1);
    sqlx::query("UPDATE tasks SET assignee_id = $2, version = $3, updated_at = now() WHERE id = $1")
        .bind(task.id)
        .bind(assignee_id)
        .bind(task.version)
        .execute(pool)
        .await?;

    Ok(task)
}

// =============================================================================
// TAGS ON TASKS
// =============================================================================

/// Attach one of the caller's tags to a task. Re-attaching is a no-op.
pub async fn attach_tag(pool: &PgPool, task_id: Uuid, user_id: Uuid, tag_id: Uuid) -> Result<(), TaskError> {
    ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;
    let owned: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE id = $1 AND owner_id = $2)")
        .bind(tag_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if !owned {
        return Err(TaskError::Invalid("unknown tag".into()));
    }

    sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(task_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Detach a tag from a task.
pub async fn detach_tag(pool: &PgPool, task_id: Uuid, user_id: Uuid, tag_id: Uuid) -> Result<(), TaskError> {
    ensure_task_access(pool, task_id, user_id, TaskAccess::Edit).await?;
    sqlx::query("DELETE FROM task_tags WHERE task_id = $1 AND tag_id = $2")
        .bind(task_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// EXPORT
// =============================================================================

/// All tasks owned by `owner_id`, oldest first, for JSONL export.
pub async fn list_owned_tasks(pool: &PgPool, owner_id: Uuid) -> Result<Vec<TaskRow>, TaskError> {
    let rows = sqlx::query_as::<_, TaskTuple>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.owner_id = $1 ORDER BY t.created_at ASC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_from_tuple).collect())
}

/// Bulk insert imported tasks in one transaction.
pub async fn insert_imported_tasks(pool: &PgPool, tasks: &[TaskRow]) -> Result<(), TaskError> {
    let mut tx = pool.begin().await?;
    for task in tasks {
        sqlx::query(
            "INSERT INTO tasks (id, owner_id, family_id, category_id, assignee_id, title, description,
                                status, priority, due_at_ms, completed_at_ms, version)
             VALUES ($1, $2, NULL, NULL, NULL, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(task.id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.status)
        .bind(&task.priority)
        .bind(task.due_at_ms)
        .bind(task.completed_at_ms)
        .bind(task.version)
        .execute(tx.as_mut())
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
