//! Normalization of the singleton contact fields (phone and LinkedIn)

use regex::Regex;
use std::sync::LazyLock;

/// Normalized phone numbers shorter than this are never collision-checked
pub const MIN_PHONE_LEN: usize = 10;

/// Country-code prefix stripped from phone numbers
const COUNTRY_CODE: &str = "91";

static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/in/([^/?#]+)")
        .expect("LinkedIn URL pattern is a valid regex")
});

/// Strip formatting characters and the leading country code from a phone number
pub fn normalize_phone(value: &str) -> String {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '+'))
        .collect();

    digits
        .strip_prefix(COUNTRY_CODE)
        .unwrap_or(&digits)
        .trim()
        .to_lowercase()
}

/// Whether a normalized phone number is long enough to take part in duplicate checks
pub fn is_checkable_phone(normalized: &str) -> bool {
    normalized.chars().count() >= MIN_PHONE_LEN
}

/// Extract the `/in/<segment>` part of a LinkedIn URL, or fall back to the whole value
pub fn normalize_linkedin(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    match LINKEDIN.captures(value).and_then(|caps| caps.get(1)) {
        Some(segment) => segment.as_str().trim().to_lowercase(),
        None => value.trim().to_lowercase(),
    }
}
