//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! All endpoints live under `/api/v1`. Authentication is a bearer token
//! checked by the `AuthUser` extractor in `auth`, which also applies the
//! per-user and global rate limits. Each route module keeps its own
//! error-to-status mapper next to its handlers.

pub mod analytics;
pub mod auth;
pub mod boards;
pub mod categories;
pub mod families;
pub mod notifications;
pub mod reminders;
pub mod search;
pub mod tags;
pub mod tasks;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Deserialize a nullable patch field so that an explicit `null` becomes
/// `Some(None)` while an absent key stays `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Auth
        .route("/api/v1/auth/request-code", post(auth::request_code))
        .route("/api/v1/auth/verify-code", post(auth::verify_code))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/logout", post(auth::logout))
        // Tasks
        .route("/api/v1/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/v1/tasks/export.jsonl", get(tasks::export_jsonl))
        .route("/api/v1/tasks/import.jsonl", post(tasks::import_jsonl))
        .route(
            "/api/v1/tasks/{id}",
            get(tasks::get_task).patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/v1/tasks/{id}/complete", post(tasks::complete_task))
        .route("/api/v1/tasks/{id}/assign", post(tasks::assign_task))
        .route(
            "/api/v1/tasks/{id}/tags/{tag_id}",
            post(tasks::attach_tag).delete(tasks::detach_tag),
        )
        // Categories
        .route(
            "/api/v1/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/v1/categories/{id}",
            patch(categories::update_category).delete(categories::delete_category),
        )
        // Tags
        .route("/api/v1/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/api/v1/tags/{id}", delete(tags::delete_tag))
        .route("/api/v1/tags/{id}/tasks", get(tags::list_tag_tasks))
        // Families
        .route("/api/v1/families", get(families::list_families).post(families::create_family))
        .route(
            "/api/v1/families/{id}",
            get(families::get_family)
                .patch(families::rename_family)
                .delete(families::delete_family),
        )
        .route(
            "/api/v1/families/{id}/members",
            get(families::list_members).post(families::upsert_member),
        )
        .route(
            "/api/v1/families/{id}/members/{user_id}",
            patch(families::update_member).delete(families::remove_member),
        )
        .route("/api/v1/families/{id}/analytics", get(analytics::family_breakdown))
        // Boards
        .route("/api/v1/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/api/v1/boards/{id}",
            patch(boards::rename_board).delete(boards::delete_board),
        )
        .route(
            "/api/v1/boards/{id}/columns",
            get(boards::list_columns).post(boards::create_column),
        )
        .route(
            "/api/v1/boards/{id}/columns/{column_id}",
            patch(boards::update_column).delete(boards::delete_column),
        )
        .route("/api/v1/boards/{id}/columns/{column_id}/tasks", get(boards::list_column_tasks))
        .route(
            "/api/v1/boards/{id}/columns/{column_id}/tasks/{task_id}",
            post(boards::place_task).delete(boards::unplace_task),
        )
        // Reminders
        .route(
            "/api/v1/reminders",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        .route(
            "/api/v1/reminders/{id}",
            patch(reminders::update_reminder).delete(reminders::delete_reminder),
        )
        // Notifications
        .route("/api/v1/notifications", get(notifications::list_notifications))
        .route("/api/v1/notifications/unread-count", get(notifications::unread_count))
        .route("/api/v1/notifications/read-all", post(notifications::mark_all_read))
        .route(
            "/api/v1/notifications/{id}",
            delete(notifications::delete_notification),
        )
        .route("/api/v1/notifications/{id}/read", post(notifications::mark_read))
        // Search
        .route("/api/v1/search/tasks", get(search::search_tasks))
        .route(
            "/api/v1/searches",
            get(search::list_saved_searches).post(search::create_saved_search),
        )
        .route("/api/v1/searches/{id}", delete(search::delete_saved_search))
        .route("/api/v1/searches/{id}/run", get(search::run_saved_search))
        // Analytics and achievements
        .route("/api/v1/analytics/summary", get(analytics::summary))
        .route("/api/v1/analytics/categories", get(analytics::by_category))
        .route("/api/v1/analytics/daily", get(analytics::daily))
        .route("/api/v1/achievements", get(analytics::list_achievements))
        // Users and admin
        .route("/api/v1/users/{id}/profile", get(users::user_profile))
        .route("/api/v1/admin/users", get(users::list_users))
        .route("/api/v1/admin/users/{id}", delete(users::delete_user))
        .route("/api/v1/admin/users/{id}/role", patch(users::update_role))
        .route("/api/v1/admin/diag/db", get(users::diag_db))
        // Health
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
