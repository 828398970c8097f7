//! Keep credentials out of log lines and error messages.

const REDACTED: &str = "[REDACTED]";

/// Replace every occurrence of `secret` in `text`.
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}
