//! Error types for the authorization flow and calendar operations.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for authorization and calendar operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while obtaining a token or creating a meeting.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in the cache (missing or empty file).
    #[error("no cached token: {0}")]
    CacheMiss(String),

    /// A token file exists but cannot be deserialized.
    #[error("cached token is unreadable: {0}")]
    CacheCorrupt(String),

    /// The freshly obtained token could not be persisted.
    #[error("failed to persist token: {0}")]
    CacheWrite(String),

    /// No authorization code arrived before the approval timeout.
    #[error("timed out waiting for the authorization redirect after {0:?}")]
    RedirectTimeout(Duration),

    /// The code relay closed before a code arrived.
    #[error("authorization code channel closed before a code arrived")]
    RelayClosed,

    /// The code-for-token exchange failed, either at the provider or in transit.
    #[error("could not obtain token: {0}")]
    Exchange(String),

    /// A Calendar API request failed.
    #[error("calendar request failed: {0}")]
    Calendar(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error (socket, file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AuthError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an exchange error.
    pub fn exchange(message: impl Into<String>) -> Self {
        Self::Exchange(message.into())
    }

    /// Creates a calendar error.
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::Calendar(message.into())
    }

    /// Returns true if the error means the cache had no usable token.
    ///
    /// These errors are recovered locally by falling back to the
    /// interactive flow; everything else is fatal for the invocation.
    pub fn is_cache_fallback(&self) -> bool {
        matches!(self, Self::CacheMiss(_) | Self::CacheCorrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_errors_are_recoverable() {
        assert!(AuthError::CacheMiss("missing".into()).is_cache_fallback());
        assert!(AuthError::CacheCorrupt("bad json".into()).is_cache_fallback());
        assert!(!AuthError::RedirectTimeout(Duration::from_secs(30)).is_cache_fallback());
        assert!(!AuthError::exchange("rejected").is_cache_fallback());
    }

    #[test]
    fn display_includes_cause() {
        let err = AuthError::exchange("token endpoint returned 400");
        assert!(err.to_string().contains("could not obtain token"));
        assert!(err.to_string().contains("400"));
    }
}
