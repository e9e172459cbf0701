//! Secret detection and redaction utilities.
//!
//! Used for environment variables in configuration errors and for field keys
//! in submitted log payloads.

/// Key segments that mark a secret on their own.
const SECRET_SEGMENTS: &[&str] = &[
    "apikey",
    "auth",
    "authorization",
    "credential",
    "credentials",
    "passphrase",
    "passwd",
    "password",
    "secret",
    "token",
];

/// Adjacent segment pairs that mark a secret (`api_key`, `privateKey`).
const SECRET_PAIRS: &[(&str, &str)] = &[
    ("access", "key"),
    ("api", "key"),
    ("private", "key"),
    ("secret", "key"),
];

/// Checks if a key/variable name likely refers to a secret.
///
/// The key is split into lowercase segments on separators and camelCase
/// boundaries; only whole segments match, so `author` or `tokens_used` are
/// left alone.
///
/// # Examples
///
/// ```
/// use cloud_log_shared::is_secret_key;
///
/// assert!(is_secret_key("API_KEY"));
/// assert!(is_secret_key("password"));
/// assert!(is_secret_key("CLOUD_LOG_ACCESS_TOKEN"));
/// assert!(is_secret_key("refreshToken"));
/// assert!(!is_secret_key("request_id"));
/// assert!(!is_secret_key("cache_key"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let segments = key_segments(key);
    segments
        .iter()
        .any(|segment| SECRET_SEGMENTS.contains(&segment.as_str()))
        || segments.windows(2).any(|pair| {
            SECRET_PAIRS
                .iter()
                .any(|(first, second)| pair[0] == *first && pair[1] == *second)
        })
}

fn key_segments(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in key.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && previous_lower && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        current.push(ch.to_ascii_lowercase());
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Redacts a value if the key is likely a secret.
///
/// Returns `"[REDACTED]"` for secret keys, or the original value otherwise.
///
/// # Examples
///
/// ```
/// use cloud_log_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("ACCESS_TOKEN", "ya29"), "[REDACTED]");
/// assert_eq!(redact_if_secret("CLOUD_LOG_MIN_LEVEL", "debug"), "debug");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying secret.
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl AsRef<str> for SecretString {
    fn as_ref(&self) -> &str {
        self.expose()
    }
}

impl From<Box<str>> for SecretString {
    fn from(value: Box<str>) -> Self {
        Self(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_secret_patterns() {
        // API keys
        assert!(is_secret_key("API_KEY"));
        assert!(is_secret_key("api_key"));
        assert!(is_secret_key("OPENAI_API_KEY"));

        // Tokens
        assert!(is_secret_key("ACCESS_TOKEN"));
        assert!(is_secret_key("refresh_token"));
        assert!(is_secret_key("JWT_TOKEN"));

        // Secrets
        assert!(is_secret_key("CLIENT_SECRET"));
        assert!(is_secret_key("secret_value"));

        // Passwords
        assert!(is_secret_key("DB_PASSWORD"));
        assert!(is_secret_key("user_password"));

        // Credentials
        assert!(is_secret_key("AWS_CREDENTIAL"));
        assert!(is_secret_key("credentials"));

        // Auth
        assert!(is_secret_key("authorization"));
        assert!(is_secret_key("basic_auth"));
    }

    #[test]
    fn rejects_non_secret_patterns() {
        assert!(!is_secret_key("CLOUD_LOG_LOG_ID"));
        assert!(!is_secret_key("request_id"));
        assert!(!is_secret_key("retries"));
        assert!(!is_secret_key("CLOUD_LOG_FLUSH_TIMEOUT_MS"));
        assert!(!is_secret_key("msg"));
    }

    #[test]
    fn only_whole_segments_count() {
        assert!(!is_secret_key("author"));
        assert!(!is_secret_key("tokens_used"));
        assert!(!is_secret_key("monkey"));
        assert!(!is_secret_key("cache_key"));
        assert!(!is_secret_key("keyboard_layout"));
        assert!(is_secret_key("apiKey"));
        assert!(is_secret_key("x-auth-token"));
        assert!(is_secret_key("PRIVATE_KEY_PEM"));
    }

    #[test]
    fn redacts_secret_values() {
        assert_eq!(redact_if_secret("CLOUD_LOG_ACCESS_TOKEN", "ya29.abc"), REDACTED);
        assert_eq!(redact_if_secret("password", "hunter2"), REDACTED);
    }

    #[test]
    fn preserves_non_secret_values() {
        assert_eq!(redact_if_secret("CLOUD_LOG_MIN_LEVEL", "debug"), "debug");
        assert_eq!(redact_if_secret("CLOUD_LOG_LOG_ID", "app"), "app");
    }

    #[test]
    fn secret_string_redacts_display() {
        let secret = SecretString::new("ya29.token");
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(secret.expose(), "ya29.token");
    }
}
