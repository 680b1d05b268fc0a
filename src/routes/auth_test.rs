use super::*;

// =============================================================================
// bearer_token
// =============================================================================

#[test]
fn bearer_token_extracts_value() {
    assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
}

#[test]
fn bearer_token_rejects_other_schemes() {
    assert_eq!(bearer_token("Basic abc123"), None);
}

#[test]
fn bearer_token_rejects_empty_token() {
    assert_eq!(bearer_token("Bearer "), None);
    assert_eq!(bearer_token("Bearer    "), None);
}

#[test]
fn bearer_token_is_case_sensitive_on_scheme() {
    assert_eq!(bearer_token("bearer abc123"), None);
}

// =============================================================================
// error mapping
// =============================================================================

#[test]
fn verification_failure_maps_to_unauthorized() {
    assert_eq!(
        email_auth_error_to_status(email_auth::EmailAuthError::VerificationFailed),
        StatusCode::UNAUTHORIZED
    );
}

#[test]
fn malformed_email_maps_to_bad_request() {
    assert_eq!(email_auth_error_to_status(email_auth::EmailAuthError::InvalidEmail), StatusCode::BAD_REQUEST);
}

#[test]
fn delivery_failure_maps_to_bad_gateway() {
    assert_eq!(
        email_auth_error_to_status(email_auth::EmailAuthError::EmailDelivery("smtp".into())),
        StatusCode::BAD_GATEWAY
    );
}
