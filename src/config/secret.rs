//! Redacting wrapper for the model runtime's API key.

use std::fmt;

const REDACTED: &str = "<REDACTED>";

/// An API key that never shows up in `Debug` or `Display` output.
///
/// Local runtimes usually run without authentication; when one is fronted
/// by a proxy that checks a bearer token, the token travels in this type so
/// that logging a [`Config`](super::Config) or a client cannot leak it.
///
/// # Example
///
/// ```
/// use graph_insights::config::SecretString;
///
/// let key = SecretString::new("local-api-key-123");
/// assert_eq!(format!("{key:?}"), "<REDACTED>");
/// assert_eq!(key.expose(), "local-api-key-123");
///
/// assert!(SecretString::non_blank("   ").is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap `value` as is.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Wrap `value` with surrounding whitespace removed, or `None` if
    /// nothing is left.
    ///
    /// Keys pasted into `.env` files often carry a trailing newline or space.
    #[must_use]
    pub fn non_blank(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self::new(trimmed))
    }

    /// The raw key, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}
