use super::*;

// =============================================================================
// parse_saved_query
// =============================================================================

#[test]
fn parse_saved_query_accepts_empty_blob() {
    let parsed = parse_saved_query(&serde_json::json!({})).unwrap();
    assert!(parsed.q.is_none());
    assert!(parsed.status.is_none());
}

#[test]
fn parse_saved_query_reads_known_fields() {
    let parsed = parse_saved_query(&serde_json::json!({
        "q": "groceries",
        "status": "todo",
        "limit": 25
    }))
    .unwrap();
    assert_eq!(parsed.q.as_deref(), Some("groceries"));
    assert_eq!(parsed.status.as_deref(), Some("todo"));
    assert_eq!(parsed.limit, Some(25));
}

#[test]
fn parse_saved_query_ignores_unknown_keys() {
    let parsed = parse_saved_query(&serde_json::json!({"q": "x", "some_future_key": true})).unwrap();
    assert_eq!(parsed.q.as_deref(), Some("x"));
}

#[test]
fn parse_saved_query_rejects_wrong_types() {
    let result = parse_saved_query(&serde_json::json!({"limit": "twenty"}));
    assert!(matches!(result, Err(SearchError::Invalid(_))));
}

// =============================================================================
// SearchQuery::filter
// =============================================================================

#[test]
fn filter_defaults_limit_and_offset() {
    let filter = SearchQuery::default().filter();
    assert_eq!(filter.limit, 100);
    assert_eq!(filter.offset, 0);
}

// =============================================================================
// ilike_pattern
// =============================================================================

#[test]
fn ilike_pattern_wraps_in_wildcards() {
    assert_eq!(ilike_pattern("laundry"), "%laundry%");
}

#[test]
fn ilike_pattern_escapes_percent_and_underscore() {
    assert_eq!(ilike_pattern("50%_off"), "%50\\%\\_off%");
}

#[test]
fn ilike_pattern_escapes_backslash_before_the_others() {
    assert_eq!(ilike_pattern("C:\\dir"), "%C:\\\\dir%");
    // A trailing backslash must not swallow the closing wildcard.
    assert_eq!(ilike_pattern("tail\\"), "%tail\\\\%");
    assert_eq!(ilike_pattern("\\%"), "%\\\\\\%%");
}

// =============================================================================
// build_search SQL composition
// =============================================================================

fn search_sql(query: &SearchQuery) -> String {
    build_search(Uuid::nil(), query).into_sql()
}

#[test]
fn free_text_adds_ilike_over_title_and_description() {
    let sql = search_sql(&SearchQuery { q: Some("laundry".into()), ..SearchQuery::default() });
    assert!(sql.contains("t.title ILIKE "));
    assert!(sql.contains("t.description ILIKE "));
}

#[test]
fn blank_free_text_is_ignored() {
    let sql = search_sql(&SearchQuery { q: Some("   ".into()), ..SearchQuery::default() });
    assert!(!sql.contains("ILIKE"));
}

#[test]
fn results_are_ordered_by_due_then_recency() {
    let sql = search_sql(&SearchQuery::default());
    assert!(sql.contains("ORDER BY t.due_at_ms ASC NULLS LAST, t.created_at DESC"));
}

#[test]
fn filters_compose_with_free_text() {
    let sql = search_sql(&SearchQuery {
        q: Some("bins".into()),
        status: Some("todo".into()),
        tag: Some("chores".into()),
        ..SearchQuery::default()
    });
    assert!(sql.contains("ILIKE"));
    assert!(sql.contains(" AND t.status = "));
    assert!(sql.contains("task_tags"));
}
