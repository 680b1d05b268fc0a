//! Category routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::category::{self, CategoryRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// `POST /api/v1/categories` — create a category.
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateCategoryBody>,
) -> Result<(StatusCode, Json<CategoryRow>), StatusCode> {
    let row = category::create_category(&state.pool, auth.user.id, &body.name, body.color.as_deref())
        .await
        .map_err(category_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/categories` — list the caller's categories.
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CategoryRow>>, StatusCode> {
    let rows = category::list_categories(&state.pool, auth.user.id)
        .await
        .map_err(category_error_to_status)?;
    Ok(Json(rows))
}

/// `PATCH /api/v1/categories/{id}` — rename or recolor.
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(category_id): Path<Uuid>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<Json<CategoryRow>, StatusCode> {
    let row = category::update_category(
        &state.pool,
        category_id,
        auth.user.id,
        body.name.as_deref(),
        body.color.as_deref(),
    )
    .await
    .map_err(category_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/v1/categories/{id}` — delete; tasks keep running uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    category::delete_category(&state.pool, category_id, auth.user.id)
        .await
        .map_err(category_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn category_error_to_status(err: category::CategoryError) -> StatusCode {
    match err {
        category::CategoryError::NotFound(_) => StatusCode::NOT_FOUND,
        category::CategoryError::Invalid(_) => StatusCode::BAD_REQUEST,
        category::CategoryError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
