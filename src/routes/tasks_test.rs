use super::*;

// =============================================================================
// parse_import_task_line
// =============================================================================

fn owner() -> Uuid {
    Uuid::nil()
}

#[test]
fn import_skips_meta_line() {
    let line = r#"{"type":"task_export_meta","version":1,"exported_at_ms":0,"task_count":3}"#;
    assert!(parse_import_task_line(line, owner()).unwrap().is_none());
}

#[test]
fn import_parses_task_line() {
    let line = r#"{"type":"task","title":"Walk the dog","status":"done","priority":"high","completed_at_ms":1000}"#;
    let row = parse_import_task_line(line, owner()).unwrap().expect("task line");
    assert_eq!(row.title, "Walk the dog");
    assert_eq!(row.status, "done");
    assert_eq!(row.priority, "high");
    assert_eq!(row.completed_at_ms, Some(1000));
    assert_eq!(row.owner_id, owner());
}

#[test]
fn import_assigns_fresh_id_and_drops_foreign_refs() {
    let line = r#"{"type":"task","id":"6b1e1e2a-0000-0000-0000-000000000001","title":"x","family_id":"6b1e1e2a-0000-0000-0000-000000000002","assignee_id":"6b1e1e2a-0000-0000-0000-000000000003"}"#;
    let row = parse_import_task_line(line, owner()).unwrap().expect("task line");
    assert_ne!(row.id.to_string(), "6b1e1e2a-0000-0000-0000-000000000001");
    assert!(row.family_id.is_none());
    assert!(row.assignee_id.is_none());
    assert!(row.category_id.is_none());
}

#[test]
fn import_defaults_unknown_status_and_priority() {
    let line = r#"{"title":"y","status":"someday","priority":"asap"}"#;
    let row = parse_import_task_line(line, owner()).unwrap().expect("task line");
    assert_eq!(row.status, "todo");
    assert_eq!(row.priority, "medium");
}

#[test]
fn import_drops_completed_at_for_open_tasks() {
    let line = r#"{"title":"z","status":"todo","completed_at_ms":1234}"#;
    let row = parse_import_task_line(line, owner()).unwrap().expect("task line");
    assert!(row.completed_at_ms.is_none());
}

#[test]
fn import_skips_untitled_lines() {
    assert!(parse_import_task_line(r#"{"type":"task","title":"   "}"#, owner()).unwrap().is_none());
    assert!(parse_import_task_line(r#"{"note":"not a task"}"#, owner()).unwrap().is_none());
}

#[test]
fn import_rejects_malformed_json() {
    assert!(parse_import_task_line("{not json", owner()).is_err());
}

// =============================================================================
// patch body null handling
// =============================================================================

#[test]
fn patch_body_distinguishes_null_from_absent() {
    let body: UpdateTaskBody = serde_json::from_str(r#"{"due_at_ms":null}"#).unwrap();
    assert_eq!(body.due_at_ms, Some(None));
    assert!(body.description.is_none());

    let body: UpdateTaskBody = serde_json::from_str(r#"{"description":"new text"}"#).unwrap();
    assert_eq!(body.description, Some(Some("new text".to_owned())));
    assert!(body.due_at_ms.is_none());
}

// =============================================================================
// error mapping
// =============================================================================

#[test]
fn task_errors_map_to_expected_statuses() {
    assert_eq!(task_error_to_status(task::TaskError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(task_error_to_status(task::TaskError::Forbidden(Uuid::nil())), StatusCode::FORBIDDEN);
    assert_eq!(task_error_to_status(task::TaskError::Invalid("bad".into())), StatusCode::BAD_REQUEST);
    assert_eq!(task_error_to_status(task::TaskError::Database(sqlx::Error::RowNotFound)), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn list_query_defaults_paging() {
    let filter = TaskListQuery::default().filter();
    assert_eq!(filter.limit, 100);
    assert_eq!(filter.offset, 0);
}
