use anonsocial::infrastructure::observability::sanitize_content;

#[test]
fn given_blank_content_when_sanitizing_then_returns_empty_marker() {
    assert_eq!(sanitize_content("   \n"), "[EMPTY]");
}

#[test]
fn given_short_content_when_sanitizing_then_returns_it_trimmed() {
    assert_eq!(sanitize_content("  hello there  "), "hello there");
}

#[test]
fn given_long_content_when_sanitizing_then_truncates_with_total() {
    let content = "x".repeat(120);
    let preview = sanitize_content(&content);

    assert!(preview.starts_with(&"x".repeat(32)));
    assert!(preview.ends_with("(120 chars total)"));
}

#[test]
fn given_multibyte_content_when_truncating_then_does_not_split_characters() {
    let content = "ş".repeat(40);
    let preview = sanitize_content(&content);

    assert!(preview.starts_with(&"ş".repeat(32)));
    assert!(preview.ends_with("(40 chars total)"));
}

#[test]
fn given_control_characters_when_sanitizing_then_flattens_to_single_line() {
    assert_eq!(sanitize_content("line one\nline two"), "line one line two");
}
