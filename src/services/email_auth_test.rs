use super::*;

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  USER@Example.com "), Some("user@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("user"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("user@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

#[test]
fn normalize_code_accepts_upper_and_normalizes() {
    let code = generate_access_code();
    assert_eq!(normalize_code(&code), Some(code.clone()));
    assert_eq!(normalize_code("abc234"), Some("ABC234".to_owned()));
}

#[test]
fn normalize_code_rejects_bad_shapes() {
    assert_eq!(normalize_code("abc23"), None);
    assert_eq!(normalize_code("abc2345"), None);
    // Ambiguous characters are not in the alphabet.
    assert_eq!(normalize_code("ABC1I0"), None);
    assert_eq!(normalize_code("ABCL23"), None);
    assert_eq!(normalize_code("ABC23!"), None);
}

#[test]
fn generate_access_code_shape() {
    let code = generate_access_code();
    assert_eq!(code.len(), CODE_LEN);
    assert!(code.chars().all(|c| CODE_ALPHABET.contains(&(c as u8))));
}

#[test]
fn hash_access_code_is_stable() {
    assert_eq!(hash_access_code("ABC234"), hash_access_code("ABC234"));
    assert_ne!(hash_access_code("ABC234"), hash_access_code("ABC235"));
}

#[test]
fn hash_access_code_is_hex_sha256() {
    let hash = hash_access_code("ABC234");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn name_from_email_uses_local_part() {
    assert_eq!(name_from_email("jamie@example.com"), "jamie");
    assert_eq!(name_from_email("@example.com"), "member");
}

#[test]
fn pick_color_is_deterministic() {
    assert_eq!(pick_color("a@example.com"), pick_color("a@example.com"));
    assert!(MEMBER_COLORS.contains(&pick_color("b@example.com")));
}

#[test]
fn login_code_template_substitutes_placeholders() {
    let html = render_login_code_template("jamie@example.com", "ABC234");
    assert!(html.contains("jamie@example.com"));
    assert!(html.contains("ABC234"));
    assert!(!html.contains("{{EMAIL}}"));
    assert!(!html.contains("{{CODE}}"));
}
