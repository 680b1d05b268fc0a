//! Search routes — free-text task search and saved searches.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::search::{self, SavedSearchRow, SearchQuery};
use crate::services::task::TaskRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateSavedSearchBody {
    pub name: String,
    pub query: serde_json::Value,
}

/// `GET /api/v1/search/tasks` — search tasks visible to the caller.
pub async fn search_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    let rows = search::search_tasks(&state.pool, auth.user.id, &query)
        .await
        .map_err(search_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/v1/searches` — save a named query.
pub async fn create_saved_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateSavedSearchBody>,
) -> Result<(StatusCode, Json<SavedSearchRow>), StatusCode> {
    let row = search::create_saved_search(&state.pool, auth.user.id, &body.name, body.query)
        .await
        .map_err(search_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/searches` — the caller's saved searches.
pub async fn list_saved_searches(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<SavedSearchRow>>, StatusCode> {
    let rows = search::list_saved_searches(&state.pool, auth.user.id)
        .await
        .map_err(search_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/searches/{id}/run` — re-execute a saved search.
pub async fn run_saved_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(search_id): Path<Uuid>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    let rows = search::run_saved_search(&state.pool, search_id, auth.user.id)
        .await
        .map_err(search_error_to_status)?;
    Ok(Json(rows))
}

/// `DELETE /api/v1/searches/{id}` — delete a saved search.
pub async fn delete_saved_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(search_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    search::delete_saved_search(&state.pool, search_id, auth.user.id)
        .await
        .map_err(search_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn search_error_to_status(err: search::SearchError) -> StatusCode {
    match err {
        search::SearchError::NotFound(_) => StatusCode::NOT_FOUND,
        search::SearchError::Invalid(_) => StatusCode::BAD_REQUEST,
        search::SearchError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
