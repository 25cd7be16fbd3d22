//! Shared helpers for providers, the service and the health monitor

use std::time::Duration;

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Sensitive patterns to filter from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "x-api-key",
    "authorization",
    "bearer",
    "token",
    "secret",
    "password",
    "credential",
];

/// Reduce a vendor completion to its JSON-shaped part.
///
/// Returns the substring from the first `{` or `[` to the last `}` or `]`
/// inclusive. When either bracket is missing, or the last closer precedes
/// the first opener, the input comes back unchanged. This does not parse or
/// validate JSON.
///
/// # Examples
/// ```
/// use msgflow_llm::util::extract_json;
/// assert_eq!(extract_json("Sure! {\"a\": 1} Hope that helps"), "{\"a\": 1}");
/// assert_eq!(extract_json("no json here"), "no json here");
/// ```
#[must_use]
pub fn extract_json(text: &str) -> &str {
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Join conversation lines for a prompt
#[must_use]
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Running mean of call latency.
///
/// `count` is the number of samples including `new`.
#[must_use]
pub fn average_latency(current: Duration, new: Duration, count: u64) -> Duration {
    if count <= 1 {
        return new;
    }
    let current = current.as_nanos() as i128;
    let new = new.as_nanos() as i128;
    let mean = current + (new - current) / i128::from(count);
    Duration::from_nanos(u64::try_from(mean.max(0)).unwrap_or(u64::MAX))
}

/// Mask API key for safe display in logs
///
/// Shows first 4 and last 4 characters for keys longer than 8 characters,
/// otherwise shows "****" to prevent exposure of short keys.
///
/// # Examples
/// ```
/// use msgflow_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY {
        return "****".to_string();
    }
    let head: String = chars[..KEY_MASK_VISIBLE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - KEY_MASK_VISIBLE_CHARS..].iter().collect();
    format!("{head}...{tail}")
}

/// Sanitize error message for user display
///
/// Removes sensitive information from error messages before showing them to users.
/// If the error contains sensitive patterns, returns a generic error message.
///
/// # Examples
/// ```
/// use msgflow_llm::util::sanitize_error_for_user;
/// assert_eq!(
///     sanitize_error_for_user("Invalid api_key provided"),
///     "An API error occurred. Please try again."
/// );
/// assert_eq!(sanitize_error_for_user("Connection timeout"), "Connection timeout");
/// ```
#[must_use]
pub fn sanitize_error_for_user(error: &str) -> String {
    let lower = error.to_lowercase();

    for pattern in SENSITIVE_PATTERNS {
        if lower.contains(pattern) {
            return "An API error occurred. Please try again.".to_string();
        }
    }

    error.to_string()
}
