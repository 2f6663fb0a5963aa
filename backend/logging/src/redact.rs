//! Log Redaction Layer
//!
//! Scrubs subscription keys, access tokens, and key-bearing URLs from strings
//! prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static SUBSCRIPTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ocp-apim-subscription-key\s*[:=]\s*)[^\s,;&]+").unwrap()
});
static QUERY_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:subscription-key|api[-_]?key|key)=)[^\s&]+").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{32}\b|(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = SUBSCRIPTION_HEADER_RE
        .replace_all(input, "${1}[REDACTED_KEY]")
        .to_string();

    redacted = QUERY_KEY_RE
        .replace_all(&redacted, "${1}[REDACTED_KEY]")
        .to_string();

    // Bare Azure keys (32 hex chars), API keys and bearer tokens
    redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_subscription_header() {
        let raw = "sending with Ocp-Apim-Subscription-Key: abc-def-123 to service";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("abc-def-123"));
        assert!(clean.contains("Ocp-Apim-Subscription-Key: [REDACTED_KEY]"));
    }

    #[test]
    fn test_redacts_bare_azure_key_and_bearer() {
        let raw = "key 0123456789abcdef0123456789ABCDEF and Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("0123456789abcdef0123456789ABCDEF"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn test_redacts_query_key() {
        let clean = redact_sensitive_data("https://x.example/analyze?api-version=1&subscription-key=s3cret");
        assert!(!clean.contains("s3cret"));
        assert!(clean.contains("api-version=1"));
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        assert_eq!(redact_sensitive_data("a dog on grass"), "a dog on grass");
    }
}
