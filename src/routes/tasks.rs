//! Task routes — CRUD, completion, assignment, tags, JSONL export/import.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::double_option;
use crate::services::notification::{self, NotificationKind};
use crate::services::task::{self, NewTask, TaskFilter, TaskPatch, TaskPriority, TaskRow, TaskStatus};
use crate::services::{achievement, tag};
use crate::state::AppState;

// =============================================================================
// BODIES
// =============================================================================

#[derive(Deserialize)]
pub struct CreateTaskBody {
    pub title: String,
    pub description: Option<String>,
    pub family_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_at_ms: Option<i64>,
}

/// Patch body. Nullable fields distinguish "absent" from "explicit null":
/// sending `"due_at_ms": null` clears the due date, omitting it leaves it.
#[derive(Deserialize, Default)]
pub struct UpdateTaskBody {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at_ms: Option<Option<i64>>,
}

#[derive(Deserialize, Default)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub category_id: Option<Uuid>,
    pub family_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub tag: Option<String>,
    pub due_before_ms: Option<i64>,
    pub due_after_ms: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskListQuery {
    fn filter(self) -> TaskFilter {
        TaskFilter {
            status: self.status,
            category_id: self.category_id,
            family_id: self.family_id,
            assignee_id: self.assignee_id,
            column_id: None,
            tag: self.tag,
            due_before_ms: self.due_before_ms,
            due_after_ms: self.due_after_ms,
            limit: self.limit.unwrap_or(100),
            offset: self.offset.unwrap_or(0),
        }
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// `GET /api/v1/tasks` — list tasks visible to the caller.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    let rows = task::list_tasks(&state.pool, auth.user.id, &query.filter())
        .await
        .map_err(task_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/v1/tasks` — create a task owned by the caller.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<TaskRow>), StatusCode> {
    let new = NewTask {
        title: body.title,
        description: body.description,
        family_id: body.family_id,
        category_id: body.category_id,
        assignee_id: body.assignee_id,
        status: body.status,
        priority: body.priority,
        due_at_ms: body.due_at_ms,
    };
    let row = task::create_task(&state.pool, auth.user.id, new)
        .await
        .map_err(task_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/tasks/{id}` — fetch one task.
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskRow>, StatusCode> {
    let row = task::get_task(&state.pool, task_id, auth.user.id)
        .await
        .map_err(task_error_to_status)?;
    Ok(Json(row))
}

/// `PATCH /api/v1/tasks/{id}` — partial update.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskBody>,
) -> Result<Json<TaskRow>, StatusCode> {
    let patch = TaskPatch {
        title: body.title,
        description: body.description,
        category_id: body.category_id,
        status: body.status,
        priority: body.priority,
        due_at_ms: body.due_at_ms,
    };
    let row = task::update_task(&state.pool, task_id, auth.user.id, patch)
        .await
        .map_err(task_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/tasks/{id}` — delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    task::delete_task(&state.pool, task_id, auth.user.id)
        .await
        .map_err(task_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// COMPLETION AND ASSIGNMENT
// =============================================================================

#[derive(Serialize)]
pub struct CompleteTaskResponse {
    pub task: TaskRow,
    pub newly_completed: bool,
    pub achievements_awarded: Vec<String>,
}

/// `POST /api/v1/tasks/{id}/complete` — mark done, award milestones, notify
/// the owner when someone else completed their task. Idempotent.
pub async fn complete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<CompleteTaskResponse>, StatusCode> {
    let (row, newly_completed) = task::complete_task(&state.pool, task_id, auth.user.id)
        .await
        .map_err(task_error_to_status)?;

    let mut achievements_awarded = Vec::new();
    if newly_completed {
        match achievement::award_for_completion(&state.pool, auth.user.id).await {
            Ok(newly) => achievements_awarded = newly,
            Err(e) => tracing::error!(error = %e, "achievement award failed"),
        }

        if row.owner_id != auth.user.id {
            let body = format!("{} completed: {}", auth.user.name, row.title);
            if let Err(e) =
                notification::notify(&state.pool, row.owner_id, NotificationKind::TaskCompleted, &body, Some(row.id), row.family_id)
                    .await
            {
                tracing::error!(error = %e, "completion notification failed");
            }
        }
    }

    Ok(Json(CompleteTaskResponse { task: row, newly_completed, achievements_awarded }))
}

#[derive(Deserialize)]
pub struct AssignTaskBody {
    pub user_id: Uuid,
}

/// `POST /api/v1/tasks/{id}/assign` — assign to a family member and notify them.
pub async fn assign_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(body): Json<AssignTaskBody>,
) -> Result<Json<TaskRow>, StatusCode> {
    let row = task::assign_task(&state.pool, task_id, auth.user.id, body.user_id)
        .await
        .map_err(task_error_to_status)?;

    if body.user_id != auth.user.id {
        let text = format!("{} assigned you: {}", auth.user.name, row.title);
        if let Err(e) =
            notification::notify(&state.pool, body.user_id, NotificationKind::TaskAssigned, &text, Some(row.id), row.family_id)
                .await
        {
            tracing::error!(error = %e, "assignment notification failed");
        }
    }

    Ok(Json(row))
}

// =============================================================================
// TAGS
// =============================================================================

/// `POST /api/v1/tasks/{id}/tags/{tag_id}` — attach one of the caller's tags.
pub async fn attach_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((task_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    task::attach_tag(&state.pool, task_id, auth.user.id, tag_id)
        .await
        .map_err(task_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/tasks/{id}/tags/{tag_id}` — detach a tag.
pub async fn detach_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((task_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    task::detach_tag(&state.pool, task_id, auth.user.id, tag_id)
        .await
        .map_err(task_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn task_error_to_status(err: task::TaskError) -> StatusCode {
    match err {
        task::TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        task::TaskError::Forbidden(_) => StatusCode::FORBIDDEN,
        task::TaskError::Invalid(_) => StatusCode::BAD_REQUEST,
        task::TaskError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn tag_error_to_status(err: tag::TagError) -> StatusCode {
    match err {
        tag::TagError::NotFound(_) => StatusCode::NOT_FOUND,
        tag::TagError::Invalid(_) => StatusCode::BAD_REQUEST,
        tag::TagError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// =============================================================================
// JSONL EXPORT / IMPORT
// =============================================================================

#[derive(Serialize)]
struct TaskExportMetaLine {
    #[serde(rename = "type")]
    line_type: &'static str,
    version: u8,
    exported_at_ms: i64,
    task_count: usize,
}

#[derive(Serialize)]
struct TaskExportLine {
    #[serde(rename = "type")]
    line_type: &'static str,
    #[serde(flatten)]
    task: TaskRow,
}

#[derive(Deserialize)]
pub struct ImportJsonlBody {
    pub jsonl: String,
}

#[derive(Serialize)]
pub struct ImportJsonlResponse {
    pub imported: usize,
    pub skipped: usize,
}

/// `GET /api/v1/tasks/export.jsonl` — download the caller's owned tasks as
/// NDJSON/JSONL, one meta line then one line per task.
pub async fn export_jsonl(State(state): State<AppState>, auth: AuthUser) -> Result<Response, StatusCode> {
    let tasks = task::list_owned_tasks(&state.pool, auth.user.id)
        .await
        .map_err(task_error_to_status)?;

    let mut lines = Vec::with_capacity(tasks.len() + 1);
    let meta = TaskExportMetaLine {
        line_type: "task_export_meta",
        version: 1,
        exported_at_ms: crate::services::task::now_ms(),
        task_count: tasks.len(),
    };
    let meta_line = serde_json::to_string(&meta).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    lines.push(format!("{meta_line}\n"));

    for row in tasks {
        let line = TaskExportLine { line_type: "task", task: row };
        let serialized = serde_json::to_string(&line).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        lines.push(format!("{serialized}\n"));
    }

    let stream = futures::stream::iter(
        lines
            .into_iter()
            .map(|line| Ok::<axum::body::Bytes, std::convert::Infallible>(axum::body::Bytes::from(line))),
    );
    let body = axum::body::Body::from_stream(stream);
    let filename = format!("tasks-{}.jsonl", auth.user.id);

    Ok((
        [
            (CONTENT_TYPE, "application/x-ndjson; charset=utf-8"),
            (CONTENT_DISPOSITION, &format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}

/// Parse one import line into a task owned by `owner_id`. Meta lines and
/// non-task lines yield `Ok(None)`. Imported tasks get fresh ids, drop
/// family/category/assignee references from the source account, and fall
/// back to `todo`/`medium` on unknown status or priority.
pub(crate) fn parse_import_task_line(line: &str, owner_id: Uuid) -> Result<Option<TaskRow>, serde_json::Error> {
    let value = serde_json::from_str::<serde_json::Value>(line)?;
    let Some(map) = value.as_object() else {
        return Ok(None);
    };

    let line_type = map.get("type").and_then(serde_json::Value::as_str);
    if line_type == Some("task_export_meta") {
        return Ok(None);
    }
    if line_type != Some("task") && !map.contains_key("title") {
        return Ok(None);
    }

    let Some(title) = map
        .get("title")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return Ok(None);
    };

    let status = map
        .get("status")
        .and_then(serde_json::Value::as_str)
        .and_then(TaskStatus::from_str)
        .unwrap_or(TaskStatus::Todo);
    let priority = map
        .get("priority")
        .and_then(serde_json::Value::as_str)
        .and_then(TaskPriority::from_str)
        .unwrap_or(TaskPriority::Medium);
    let description = map
        .get("description")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);
    let due_at_ms = map.get("due_at_ms").and_then(serde_json::Value::as_i64);
    let completed_at_ms = map.get("completed_at_ms").and_then(serde_json::Value::as_i64);

    Ok(Some(TaskRow {
        id: Uuid::new_v4(),
        owner_id,
        family_id: None,
        category_id: None,
        column_id: None,
        assignee_id: None,
        title: title.to_owned(),
        description,
        status: status.as_str().to_owned(),
        priority: priority.as_str().to_owned(),
        due_at_ms,
        completed_at_ms: (status == TaskStatus::Done).then_some(completed_at_ms).flatten(),
        version: 1,
    }))
}

/// `POST /api/v1/tasks/import.jsonl` — import NDJSON/JSONL task lines.
pub async fn import_jsonl(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ImportJsonlBody>,
) -> Result<Json<ImportJsonlResponse>, StatusCode> {
    let mut tasks = Vec::new();
    let mut skipped = 0_usize;

    for raw_line in body.jsonl.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_import_task_line(line, auth.user.id) {
            Ok(Some(row)) => tasks.push(row),
            Ok(None) | Err(_) => skipped = skipped.saturating_add(1),
        }
    }

    if tasks.is_empty() {
        return Ok(Json(ImportJsonlResponse { imported: 0, skipped }));
    }

    task::insert_imported_tasks(&state.pool, &tasks)
        .await
        .map_err(task_error_to_status)?;

    Ok(Json(ImportJsonlResponse { imported: tasks.len(), skipped }))
}

#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;
