//! Family service — family groups and membership management.
//!
//! DESIGN
//! ======
//! A family is a sharing scope for tasks and boards. Every family keeps at
//! least one `admin`; role changes and removals that would orphan the family
//! are rejected rather than silently reassigned.

use sqlx::{PgPool, Row};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FamilyError {
    #[error("family not found: {0}")]
    NotFound(Uuid),
    #[error("no access to family: {0}")]
    Forbidden(Uuid),
    #[error("not a member: {0}")]
    MemberNotFound(Uuid),
    #[error("invalid family operation: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Role of a user inside one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyRole {
    Admin,
    Adult,
    Child,
}

impl FamilyRole {
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "adult" => Some(Self::Adult),
            "child" => Some(Self::Child),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Adult => "adult",
            Self::Child => "child",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FamilyRow {
    pub id: Uuid,
    pub name: String,
    pub created_by: Option<Uuid>,
    pub member_count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FamilyMemberRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub color: String,
    pub role: String,
}

// =============================================================================
// MEMBERSHIP HELPERS
// =============================================================================

/// The caller's role in a family, if they are a member.
pub async fn member_role(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<Option<FamilyRole>, FamilyError> {
    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM family_members WHERE family_id = $1 AND user_id = $2")
            .bind(family_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(role.as_deref().and_then(FamilyRole::from_str))
}

async fn require_role(
    pool: &PgPool,
    family_id: Uuid,
    user_id: Uuid,
    required_admin: bool,
) -> Result<FamilyRole, FamilyError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM families WHERE id = $1)")
        .bind(family_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(FamilyError::NotFound(family_id));
    }

    let role = member_role(pool, family_id, user_id)
        .await?
        .ok_or(FamilyError::Forbidden(family_id))?;
    if required_admin && role != FamilyRole::Admin {
        return Err(FamilyError::Forbidden(family_id));
    }
    Ok(role)
}

/// Look up a user id by normalized email. Used to add members by address.
pub async fn resolve_user_id_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>, FamilyError> {
    let row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(email.trim().to_ascii_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("id")))
}

// =============================================================================
// FAMILY CRUD
// =============================================================================

/// Create a family; the creator becomes its first `admin`.
pub async fn create_family(pool: &PgPool, user_id: Uuid, name: &str) -> Result<FamilyRow, FamilyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FamilyError::Invalid("name must not be empty".into()));
    }

    let mut tx = pool.begin().await?;
    let family_id: Uuid =
        sqlx::query_scalar("INSERT INTO families (name, created_by) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(user_id)
            .fetch_one(tx.as_mut())
            .await?;
    sqlx::query("INSERT INTO family_members (family_id, user_id, role) VALUES ($1, $2, 'admin')")
        .bind(family_id)
        .bind(user_id)
        .execute(tx.as_mut())
        .await?;
    tx.commit().await?;

    Ok(FamilyRow { id: family_id, name: name.to_owned(), created_by: Some(user_id), member_count: 1 })
}

/// Families the caller belongs to, with member counts.
pub async fn list_families(pool: &PgPool, user_id: Uuid) -> Result<Vec<FamilyRow>, FamilyError> {
    let rows = sqlx::query_as::<_, (Uuid, String, Option<Uuid>, i64)>(
        "SELECT f.id, f.name, f.created_by,
                (SELECT COUNT(*) FROM family_members fm2 WHERE fm2.family_id = f.id) AS member_count
         FROM families f
         JOIN family_members fm ON fm.family_id = f.id
         WHERE fm.user_id = $1
         ORDER BY f.created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, created_by, member_count)| FamilyRow { id, name, created_by, member_count })
        .collect())
}

/// Fetch one family (members only).
pub async fn get_family(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<FamilyRow, FamilyError> {
    require_role(pool, family_id, user_id, false).await?;

    let row = sqlx::query_as::<_, (Uuid, String, Option<Uuid>, i64)>(
        "SELECT f.id, f.name, f.created_by,
                (SELECT COUNT(*) FROM family_members fm WHERE fm.family_id = f.id) AS member_count
         FROM families f WHERE f.id = $1",
    )
    .bind(family_id)
    .fetch_optional(pool)
    .await?
    .ok_or(FamilyError::NotFound(family_id))?;

    Ok(FamilyRow { id: row.0, name: row.1, created_by: row.2, member_count: row.3 })
}

/// Rename a family (admin only).
pub async fn rename_family(pool: &PgPool, family_id: Uuid, user_id: Uuid, name: &str) -> Result<(), FamilyError> {
    require_role(pool, family_id, user_id, true).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(FamilyError::Invalid("name must not be empty".into()));
    }

    sqlx::query("UPDATE families SET name = $2 WHERE id = $1")
        .bind(family_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a family (admin only). Membership rows cascade; family tasks are
/// detached rather than deleted.
pub async fn delete_family(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<(), FamilyError> {
    require_role(pool, family_id, user_id, true).await?;
    sqlx::query("DELETE FROM families WHERE id = $1")
        .bind(family_id)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// MEMBERS
// =============================================================================

/// List family members (members only), admins first.
pub async fn list_members(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<Vec<FamilyMemberRow>, FamilyError> {
    require_role(pool, family_id, user_id, false).await?;

    let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, String, String)>(
        "SELECT u.id, u.name, u.email, u.color, fm.role
         FROM family_members fm
         JOIN users u ON u.id = fm.user_id
         WHERE fm.family_id = $1
         ORDER BY CASE fm.role WHEN 'admin' THEN 0 WHEN 'adult' THEN 1 ELSE 2 END, u.name ASC",
    )
    .bind(family_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user_id, name, email, color, role)| FamilyMemberRow { user_id, name, email, color, role })
        .collect())
}

/// Reject role assignments that would leave the family without an admin.
async fn ensure_admin_remains(
    pool: &PgPool,
    family_id: Uuid,
    target_user_id: Uuid,
    role: FamilyRole,
) -> Result<(), FamilyError> {
    if role == FamilyRole::Admin {
        return Ok(());
    }
    let admin_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM family_members WHERE family_id = $1 AND role = 'admin' AND user_id <> $2",
    )
    .bind(family_id)
    .bind(target_user_id)
    .fetch_one(pool)
    .await?;
    if admin_count == 0 {
        return Err(FamilyError::Invalid("family must keep at least one admin".into()));
    }
    Ok(())
}

/// Add or re-role a member (admin only). The target user must exist.
pub async fn add_or_update_member(
    pool: &PgPool,
    family_id: Uuid,
    caller_id: Uuid,
    target_user_id: Uuid,
    role: FamilyRole,
) -> Result<(), FamilyError> {
    require_role(pool, family_id, caller_id, true).await?;

    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(target_user_id)
        .fetch_one(pool)
        .await?;
    if !user_exists {
        return Err(FamilyError::Invalid("unknown user".into()));
    }

    ensure_admin_remains(pool, family_id, target_user_id, role).await?;

    sqlx::query(
        "INSERT INTO family_members (family_id, user_id, role)
         VALUES ($1, $2, $3)
         ON CONFLICT (family_id, user_id) DO UPDATE SET role = EXCLUDED.role",
    )
    .bind(family_id)
    .bind(target_user_id)
    .bind(role.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Change an existing member's role (admin only). Unlike
/// [`add_or_update_member`], this never adds a new member.
pub async fn update_member_role(
    pool: &PgPool,
    family_id: Uuid,
    caller_id: Uuid,
    target_user_id: Uuid,
    role: FamilyRole,
) -> Result<(), FamilyError> {
    require_role(pool, family_id, caller_id, true).await?;

    if member_role(pool, family_id, target_user_id).await?.is_none() {
        return Err(FamilyError::MemberNotFound(target_user_id));
    }
    ensure_admin_remains(pool, family_id, target_user_id, role).await?;

    sqlx::query("UPDATE family_members SET role = $3 WHERE family_id = $1 AND user_id = $2")
        .bind(family_id)
        .bind(target_user_id)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a member (admin, or a member removing themselves). Removing the
/// last admin is rejected.
pub async fn remove_member(
    pool: &PgPool,
    family_id: Uuid,
    caller_id: Uuid,
    target_user_id: Uuid,
) -> Result<(), FamilyError> {
    if caller_id == target_user_id {
        require_role(pool, family_id, caller_id, false).await?;
    } else {
        require_role(pool, family_id, caller_id, true).await?;
    }

    let remaining_admins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM family_members WHERE family_id = $1 AND role = 'admin' AND user_id <> $2",
    )
    .bind(family_id)
    .bind(target_user_id)
    .fetch_one(pool)
    .await?;
    let target_role = member_role(pool, family_id, target_user_id).await?;
    if target_role == Some(FamilyRole::Admin) && remaining_admins == 0 {
        return Err(FamilyError::Invalid("family must keep at least one admin".into()));
    }

    let result = sqlx::query("DELETE FROM family_members WHERE family_id = $1 AND user_id = $2")
        .bind(family_id)
        .bind(target_user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(FamilyError::Invalid("not a member".into()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "family_test.rs"]
mod tests;
