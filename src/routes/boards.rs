//! Board routes — boards, columns, and task placement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::board::{self, BoardRow, ColumnRow};
use crate::services::task::TaskRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBoardBody {
    pub name: String,
    pub family_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct RenameBoardBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateColumnBody {
    pub name: String,
    pub position: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateColumnBody {
    pub name: Option<String>,
    pub position: Option<i32>,
}

/// `POST /api/v1/boards` — create a personal or family board.
pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateBoardBody>,
) -> Result<(StatusCode, Json<BoardRow>), StatusCode> {
    let row = board::create_board(&state.pool, auth.user.id, &body.name, body.family_id)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/boards` — boards the caller can see.
pub async fn list_boards(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<BoardRow>>, StatusCode> {
    let rows = board::list_boards(&state.pool, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(rows))
}

/// `PATCH /api/v1/boards/{id}` — rename.
pub async fn rename_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
    Json(body): Json<RenameBoardBody>,
) -> Result<Json<BoardRow>, StatusCode> {
    let row = board::rename_board(&state.pool, board_id, auth.user.id, &body.name)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/boards/{id}` — delete a board and its columns.
pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    board::delete_board(&state.pool, board_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// COLUMNS
// =============================================================================

/// `GET /api/v1/boards/{id}/columns` — columns in position order.
pub async fn list_columns(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Vec<ColumnRow>>, StatusCode> {
    let rows = board::list_columns(&state.pool, board_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/v1/boards/{id}/columns` — append or insert a column.
pub async fn create_column(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
    Json(body): Json<CreateColumnBody>,
) -> Result<(StatusCode, Json<ColumnRow>), StatusCode> {
    let row = board::create_column(&state.pool, board_id, auth.user.id, &body.name, body.position)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/v1/boards/{id}/columns/{column_id}` — rename or reposition.
pub async fn update_column(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateColumnBody>,
) -> Result<Json<ColumnRow>, StatusCode> {
    let row = board::update_column(&state.pool, board_id, column_id, auth.user.id, body.name.as_deref(), body.position)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/boards/{id}/columns/{column_id}` — delete; placed tasks
/// fall off the board but survive.
pub async fn delete_column(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    board::delete_column(&state.pool, board_id, column_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TASK PLACEMENT
// =============================================================================

/// `GET /api/v1/boards/{id}/columns/{column_id}/tasks` — tasks in a column.
pub async fn list_column_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    let rows = board::list_column_tasks(&state.pool, board_id, column_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/v1/boards/{id}/columns/{column_id}/tasks/{task_id}` — place a task.
pub async fn place_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((board_id, column_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<TaskRow>, StatusCode> {
    let row = board::place_task(&state.pool, board_id, column_id, task_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/boards/{id}/columns/{column_id}/tasks/{task_id}` — take a
/// task off the board.
pub async fn unplace_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((board_id, _column_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    board::unplace_task(&state.pool, board_id, task_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn board_error_to_status(err: board::BoardError) -> StatusCode {
    match err {
        board::BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        board::BoardError::Forbidden(_) => StatusCode::FORBIDDEN,
        board::BoardError::Invalid(_) => StatusCode::BAD_REQUEST,
        board::BoardError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
