//! Family routes — family CRUD and member management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::family::{self, FamilyMemberRow, FamilyRole, FamilyRow};
use crate::services::notification::{self, NotificationKind};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateFamilyBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RenameFamilyBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpsertMemberBody {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: String,
}

/// `POST /api/v1/families` — create a family; the creator becomes its admin.
pub async fn create_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateFamilyBody>,
) -> Result<(StatusCode, Json<FamilyRow>), StatusCode> {
    let row = family::create_family(&state.pool, auth.user.id, &body.name)
        .await
        .map_err(family_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/v1/families` — families the caller belongs to.
pub async fn list_families(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<FamilyRow>>, StatusCode> {
    let rows = family::list_families(&state.pool, auth.user.id)
        .await
        .map_err(family_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/v1/families/{id}` — fetch one family.
pub async fn get_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
) -> Result<Json<FamilyRow>, StatusCode> {
    let row = family::get_family(&state.pool, family_id, auth.user.id)
        .await
        .map_err(family_error_to_status)?;
    Ok(Json(row))
}

/// `PATCH /api/v1/families/{id}` — rename (family admin only).
pub async fn rename_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
    Json(body): Json<RenameFamilyBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    family::rename_family(&state.pool, family_id, auth.user.id, &body.name)
        .await
        .map_err(family_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/v1/families/{id}` — delete (family admin only).
pub async fn delete_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    family::delete_family(&state.pool, family_id, auth.user.id)
        .await
        .map_err(family_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/families/{id}/members` — list members.
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
) -> Result<Json<Vec<FamilyMemberRow>>, StatusCode> {
    let rows = family::list_members(&state.pool, family_id, auth.user.id)
        .await
        .map_err(family_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/v1/families/{id}/members` — add or update a member by id or
/// email. New members get a notification.
pub async fn upsert_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
    Json(body): Json<UpsertMemberBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(role) = FamilyRole::from_str(&body.role) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let target_user_id = match (body.user_id, body.email.as_deref()) {
        (Some(user_id), _) => user_id,
        (None, Some(email)) => family::resolve_user_id_by_email(&state.pool, email)
            .await
            .map_err(family_error_to_status)?
            .ok_or(StatusCode::NOT_FOUND)?,
        (None, None) => return Err(StatusCode::BAD_REQUEST),
    };

    let was_member = family::member_role(&state.pool, family_id, target_user_id)
        .await
        .map_err(family_error_to_status)?
        .is_some();

    family::add_or_update_member(&state.pool, family_id, auth.user.id, target_user_id, role)
        .await
        .map_err(family_error_to_status)?;

    if !was_member && target_user_id != auth.user.id {
        let text = format!("{} added you to a family", auth.user.name);
        if let Err(e) =
            notification::notify(&state.pool, target_user_id, NotificationKind::FamilyAdded, &text, None, Some(family_id))
                .await
        {
            tracing::error!(error = %e, "family-added notification failed");
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct UpdateMemberBody {
    pub role: String,
}

/// `PATCH /api/v1/families/{id}/members/{user_id}` — change an existing
/// member's role; 404 if they are not a member.
pub async fn update_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(role) = FamilyRole::from_str(&body.role) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    family::update_member_role(&state.pool, family_id, auth.user.id, member_user_id, role)
        .await
        .map_err(family_error_to_status)?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/v1/families/{id}/members/{user_id}` — remove a member
/// (admin, or self-leave).
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    family::remove_member(&state.pool, family_id, auth.user.id, member_user_id)
        .await
        .map_err(family_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn family_error_to_status(err: family::FamilyError) -> StatusCode {
    match err {
        family::FamilyError::NotFound(_) | family::FamilyError::MemberNotFound(_) => StatusCode::NOT_FOUND,
        family::FamilyError::Forbidden(_) => StatusCode::FORBIDDEN,
        family::FamilyError::Invalid(_) => StatusCode::BAD_REQUEST,
        family::FamilyError::Database(e) => {
            tracing::error!(error = %e, "database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
