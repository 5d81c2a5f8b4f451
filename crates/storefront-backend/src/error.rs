//! Backend client errors.

use thiserror::Error;

/// Errors raised by [`BackendClient`](crate::BackendClient).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The configured URL is not an absolute http(s) URL.
    #[error("invalid backend URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The API key cannot be sent as a header value.
    #[error("invalid backend key: not a valid header value")]
    InvalidKey,

    /// Table names must be a single path segment.
    #[error("invalid table name '{0}'")]
    InvalidTable(String),

    /// The HTTP client could not be built or the request failed.
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        message: String,
    },
}

impl BackendError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_display() {
        let err = BackendError::invalid_url("nope", "relative URL without a base");
        assert_eq!(
            err.to_string(),
            "invalid backend URL 'nope': relative URL without a base"
        );
    }

    #[test]
    fn test_status_display() {
        let err = BackendError::Status {
            status: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 401: bad key");
    }
}
