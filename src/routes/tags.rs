//! Tag routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::tasks::{tag_error_to_status, task_error_to_status};
use crate::services::tag::{self, TagRow};
use crate::services::task::{self, TaskFilter, TaskRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateTagBody {
    pub name: String,
}

/// `POST /api/v1/tags` — create a tag.
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTagBody>,
) -> Result<(StatusCode, Json<TagRow>), StatusCode> {
    let row = tag::create_tag(&state.pool, auth.user.id, &body.name)
        .await
        .map_err(tag_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/tags` — list the caller's tags with usage counts.
pub async fn list_tags(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<TagRow>>, StatusCode> {
    let rows = tag::list_tags(&state.pool, auth.user.id)
        .await
        .map_err(tag_error_to_status)?;
    Ok(Json(rows))
}

/// `DELETE /api/v1/tags/{id}` — delete a tag; attachments go with it.
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tag_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    tag::delete_tag(&state.pool, tag_id, auth.user.id)
        .await
        .map_err(tag_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/tags/{id}/tasks` — tasks carrying the tag, visible to the caller.
pub async fn list_tag_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    tag::ensure_owned_tag(&state.pool, tag_id, auth.user.id)
        .await
        .map_err(tag_error_to_status)?;

    let name: String = sqlx::query_scalar("SELECT name FROM tags WHERE id = $1")
        .bind(tag_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let filter = TaskFilter { tag: Some(name), limit: 500, ..TaskFilter::default() };
    let rows = task::list_tasks(&state.pool, auth.user.id, &filter)
        .await
        .map_err(task_error_to_status)?;
    Ok(Json(rows))
}
