//! User routes — profiles, admin user management, diagnostics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::session::UserRole;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub member_since: String,
    pub tasks_created: i64,
    pub tasks_completed: i64,
    pub families_joined: i64,
    pub last_completed_ms: Option<i64>,
}

/// `GET /api/v1/users/{id}/profile` — profile with aggregate task stats.
pub async fn user_profile(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfileResponse>, StatusCode> {
    let row = sqlx::query_as::<_, (Uuid, String, String, String, i64, i64, i64, Option<i64>)>(
        "SELECT u.id, u.name, u.color,
                to_char(u.created_at, 'YYYY-MM-DD') AS member_since,
                (SELECT COUNT(*) FROM tasks t WHERE t.owner_id = u.id),
                (SELECT COUNT(*) FROM tasks t WHERE (t.owner_id = u.id OR t.assignee_id = u.id) AND t.status = 'done'),
                (SELECT COUNT(*) FROM family_members fm WHERE fm.user_id = u.id),
                (SELECT MAX(t.completed_at_ms) FROM tasks t WHERE (t.owner_id = u.id OR t.assignee_id = u.id) AND t.status = 'done')
         FROM users u
         WHERE u.id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "database error");
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(UserProfileResponse {
        id: row.0,
        name: row.1,
        color: row.2,
        member_since: row.3,
        tasks_created: row.4,
        tasks_completed: row.5,
        families_joined: row.6,
        last_completed_ms: row.7,
    }))
}

// =============================================================================
// ADMIN
// =============================================================================

#[derive(Serialize)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: String,
    pub role: String,
}

#[derive(Deserialize, Default)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/v1/admin/users` — paged account list (admin and above).
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::extract::Query(query): axum::extract::Query<ListUsersQuery>,
) -> Result<Json<Vec<AdminUserRow>>, StatusCode> {
    if !auth.user.user_role().is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let rows = sqlx::query_as::<_, (Uuid, Option<String>, String, String)>(
        "SELECT id, email, name, role FROM users ORDER BY created_at ASC LIMIT $1 OFFSET $2",
    )
    .bind(query.limit.unwrap_or(100).clamp(1, 500))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "database error");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(
        rows.into_iter()
            .map(|(id, email, name, role)| AdminUserRow { id, email, name, role })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct UpdateRoleBody {
    pub role: String,
}

/// `PATCH /api/v1/admin/users/{id}/role` — change an account role
/// (global admin only).
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if auth.user.user_role() != UserRole::GlobalAdmin {
        return Err(StatusCode::FORBIDDEN);
    }
    let Some(role) = UserRole::from_str(&body.role) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(user_id)
        .bind(role.as_str())
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if result.rows_affected() == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/v1/admin/users/{id}` — delete an account and its data.
/// Admins cannot delete global admins, and nobody deletes themselves here.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    if !auth.user.user_role().is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if user_id == auth.user.id {
        return Err(StatusCode::BAD_REQUEST);
    }

    let target_role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    let target_role = UserRole::from_str(&target_role).unwrap_or(UserRole::User);
    if target_role == UserRole::GlobalAdmin && auth.user.user_role() != UserRole::GlobalAdmin {
        return Err(StatusCode::FORBIDDEN);
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// `GET /api/v1/admin/diag/db` — pool stats, a round-trip probe, and row
/// counts (developer / global admin only).
pub async fn diag_db(State(state): State<AppState>, auth: AuthUser) -> Result<Json<serde_json::Value>, StatusCode> {
    if !auth.user.user_role().can_diagnose() {
        return Err(StatusCode::FORBIDDEN);
    }

    let started = std::time::Instant::now();
    let probe: Result<i32, sqlx::Error> = sqlx::query_scalar("SELECT 1").fetch_one(&state.pool).await;
    let elapsed_ms = started.elapsed().as_millis();

    let counts = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM tasks),
                (SELECT COUNT(*) FROM families)",
    )
    .fetch_one(&state.pool)
    .await
    .unwrap_or((0, 0, 0));

    Ok(Json(serde_json::json!({
        "ok": probe.is_ok(),
        "probe_ms": elapsed_ms,
        "pool_size": state.pool.size(),
        "pool_idle": state.pool.num_idle(),
        "users": counts.0,
        "tasks": counts.1,
        "families": counts.2,
    })))
}
