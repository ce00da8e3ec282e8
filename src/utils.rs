// src/utils.rs
use regex::Regex;
use std::sync::LazyLock;

/// Maximum number of characters kept from a post body.
pub const MAX_TEXT_CHARS: usize = 500;

pub const TRUNCATION_MARKER: &str = "...";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email pattern is valid")
});

/// Collapse every run of whitespace (newlines included) into a single space.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Like [`clean_text`] within each line, but line breaks survive. Blank lines
/// are dropped.
pub fn clean_lines(text: &str) -> String {
    text.lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to [`MAX_TEXT_CHARS`] characters, appending the truncation
/// marker only when something was actually removed.
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Email addresses in order of appearance. Duplicates are kept.
pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
