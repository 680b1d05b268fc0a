use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
}

// =============================================================================
// UserRole
// =============================================================================

#[test]
fn user_role_round_trips_all_variants() {
    for role in [UserRole::User, UserRole::Admin, UserRole::GlobalAdmin, UserRole::Developer] {
        assert_eq!(UserRole::from_str(role.as_str()), Some(role));
    }
}

#[test]
fn user_role_rejects_unknown_and_cased_values() {
    assert_eq!(UserRole::from_str("ADMIN"), None);
    assert_eq!(UserRole::from_str("superuser"), None);
    assert_eq!(UserRole::from_str(""), None);
}

#[test]
fn admin_access_covers_admin_and_global_admin() {
    assert!(!UserRole::User.is_admin());
    assert!(UserRole::Admin.is_admin());
    assert!(UserRole::GlobalAdmin.is_admin());
    assert!(!UserRole::Developer.is_admin());
}

#[test]
fn diagnostics_cover_developer_and_admins() {
    assert!(UserRole::Developer.can_diagnose());
    assert!(UserRole::Admin.can_diagnose());
    assert!(UserRole::GlobalAdmin.can_diagnose());
    assert!(!UserRole::User.can_diagnose());
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_role_falls_back_to_user() {
    let user = SessionUser {
        id: Uuid::nil(),
        email: None,
        name: "alice".into(),
        color: "#FF0000".into(),
        role: "not-a-role".into(),
    };
    assert_eq!(user.user_role(), UserRole::User);
}

#[test]
fn session_user_serialize_includes_role() {
    let user = SessionUser {
        id: Uuid::nil(),
        email: Some("bob@example.com".into()),
        name: "bob".into(),
        color: "#00FF00".into(),
        role: "global_admin".into(),
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["role"], "global_admin");
    assert_eq!(json["email"], "bob@example.com");
}
