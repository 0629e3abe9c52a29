const MAX_PREVIEW_CHARS: usize = 32;

/// Short, single-line preview of a message body for log fields.
///
/// Anonymous message bodies are never logged in full.
pub fn sanitize_content(content: &str) -> String {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total_chars = trimmed.chars().count();
    let preview: String = trimmed
        .chars()
        .take(MAX_PREVIEW_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if total_chars > MAX_PREVIEW_CHARS {
        format!("{}... ({} chars total)", preview, total_chars)
    } else {
        preview
    }
}
