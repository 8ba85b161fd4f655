//! Helpers for inspecting assistant replies and captured process output.

use std::sync::LazyLock;

use regex::Regex;

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)```").expect("json fence regex must compile")
});
static ANY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```\s*(.*?)```").expect("fence regex must compile")
});
static BRACE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").expect("brace span regex must compile"));

const NEED_MORE_INPUT_PHRASES: [&str; 6] = [
    "please provide more information",
    "please tell me",
    "please specify",
    "please confirm",
    "need to know",
    "please supplement",
];

/// Pull a structured payload out of free-form reply text.
///
/// Tries a ```` ```json ```` fence, then any fence, then the outermost
/// `{...}` span. The first candidate that parses wins.
pub fn extract_json_payload(text: &str) -> Option<serde_json::Value> {
    [&*JSON_FENCE_RE, &*ANY_FENCE_RE, &*BRACE_SPAN_RE]
        .into_iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| serde_json::from_str(m.as_str().trim()).ok())
}

/// Whether the reply asks the user for more information.
pub fn needs_more_input(text: &str) -> bool {
    let lower = text.to_lowercase();
    NEED_MORE_INPUT_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    s[..cutoff].to_string()
}
