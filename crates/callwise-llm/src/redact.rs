//! Keeping credentials out of logs and error messages

/// Longest provider error body carried into an [`crate::Error`]
const MAX_ERROR_CHARS: usize = 300;

/// Phrases that mark an error body as being about credentials
const CREDENTIAL_MARKERS: [&str; 5] = [
    "api key",
    "api_key",
    "x-api-key",
    "unauthorized",
    "authentication",
];

/// Short, non-reversible rendering of a secret for `Debug` output
///
/// ```
/// use callwise_llm::redact::mask_secret;
/// assert_eq!(mask_secret("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_secret("ollama"), "****");
/// ```
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Provider error text safe to log: credential complaints are replaced
/// wholesale and long bodies are cut
#[must_use]
pub fn scrub_error(body: &str) -> String {
    let lower = body.to_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    match body.char_indices().nth(MAX_ERROR_CHARS) {
        Some((cut, _)) => format!("{}...(truncated)", &body[..cut]),
        None => body.to_string(),
    }
}
