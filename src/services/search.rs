//! Search service — free-text task search and saved searches.
//!
//! DESIGN
//! ======
//! Free text matches title and description with ILIKE; everything else reuses
//! the task filter composition so search and plain listing cannot drift
//! apart. Saved searches store the whole query as a JSON blob and re-parse it
//! on every run, so older rows with unknown keys keep working.

use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::services::task::{self, TaskFilter, TaskRow};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("saved search not found: {0}")]
    NotFound(Uuid),
    #[error("invalid search: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Deserialized saved-search query. Doubles as the wire shape for
/// `GET /search/tasks` parameters.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
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

impl SearchQuery {
    #[must_use]
    pub fn filter(&self) -> TaskFilter {
        TaskFilter {
            status: self.status.clone(),
            category_id: self.category_id,
            family_id: self.family_id,
            assignee_id: self.assignee_id,
            column_id: None,
            tag: self.tag.clone(),
            due_before_ms: self.due_before_ms,
            due_after_ms: self.due_after_ms,
            limit: self.limit.unwrap_or(100),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Parse a stored saved-search blob. Unknown keys are ignored.
pub fn parse_saved_query(value: &serde_json::Value) -> Result<SearchQuery, SearchError> {
    serde_json::from_value(value.clone()).map_err(|e| SearchError::Invalid(format!("bad saved query: {e}")))
}

/// Wrap a query string in `%...%`, escaping the LIKE metacharacters.
/// Backslash must go first so the later escapes are not doubled.
pub(crate) fn ilike_pattern(q: &str) -> String {
    let escaped = q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn build_search(user_id: Uuid, query: &SearchQuery) -> QueryBuilder<'static, sqlx::Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT t.id, t.owner_id, t.family_id, t.category_id, t.column_id, t.assignee_id, \
         t.title, t.description, t.status, t.priority, t.due_at_ms, t.completed_at_ms, t.version FROM tasks t",
    );
    task::push_visibility_clause(&mut builder, user_id);

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = ilike_pattern(q);
        builder
            .push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    let filter = query.filter();
    task::apply_filters(&mut builder, &filter);

    builder.push(" ORDER BY t.due_at_ms ASC NULLS LAST, t.created_at DESC");
    builder.push(" LIMIT ").push_bind(filter.limit.clamp(1, 500));
    builder.push(" OFFSET ").push_bind(filter.offset.max(0));
    builder
}

/// Run a search over tasks visible to `user_id`.
pub async fn search_tasks(pool: &PgPool, user_id: Uuid, query: &SearchQuery) -> Result<Vec<TaskRow>, SearchError> {
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

    let mut builder = build_search(user_id, query);
    let rows = builder.build_query_as::<TaskTuple>().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(
            |(
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
            )| TaskRow {
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
            },
        )
        .collect())
}

// =============================================================================
// SAVED SEARCHES
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct SavedSearchRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub query: serde_json::Value,
}

/// Save a named query for the caller.
pub async fn create_saved_search(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    query: serde_json::Value,
) -> Result<SavedSearchRow, SearchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SearchError::Invalid("name must not be empty".into()));
    }
    // Reject blobs that would fail on every later run.
    parse_saved_query(&query)?;

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO saved_searches (id, owner_id, name, query) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(&query)
        .execute(pool)
        .await?;

    Ok(SavedSearchRow { id, owner_id, name: name.to_owned(), query })
}

/// The caller's saved searches, newest first.
pub async fn list_saved_searches(pool: &PgPool, owner_id: Uuid) -> Result<Vec<SavedSearchRow>, SearchError> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, serde_json::Value)>(
        "SELECT id, owner_id, name, query FROM saved_searches WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, owner_id, name, query)| SavedSearchRow { id, owner_id, name, query })
        .collect())
}

/// Delete a saved search.
pub async fn delete_saved_search(pool: &PgPool, search_id: Uuid, owner_id: Uuid) -> Result<(), SearchError> {
    let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND owner_id = $2")
        .bind(search_id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SearchError::NotFound(search_id));
    }
    Ok(())
}

/// Re-execute a saved search by id.
pub async fn run_saved_search(pool: &PgPool, search_id: Uuid, owner_id: Uuid) -> Result<Vec<TaskRow>, SearchError> {
    let query: serde_json::Value =
        sqlx::query_scalar("SELECT query FROM saved_searches WHERE id = $1 AND owner_id = $2")
            .bind(search_id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?
            .ok_or(SearchError::NotFound(search_id))?;

    let parsed = parse_saved_query(&query)?;
    search_tasks(pool, owner_id, &parsed).await
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
