//! Per-request fault records.
//!
//! Every fault raised while serving a request (a missing route, a malformed
//! body, a handler failure) is captured as an [`ErrorRecord`] at the fault
//! site and handed to the error normalizer, which consumes it exactly once.

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a request fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No route matched the request.
    NotFound,
    /// The request could not be decoded (e.g. malformed body).
    BadRequest,
    /// Any other stage or handler failure.
    Internal,
}

impl ErrorKind {
    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a stable string name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized request fault.
///
/// Required fields are the kind, status and message. The trace and the
/// originating method/path are filled in where they are known.
///
/// # Example
///
/// ```
/// use storefront_core::{ErrorKind, ErrorRecord};
/// use http::StatusCode;
///
/// let record = ErrorRecord::not_found();
/// assert_eq!(record.kind(), ErrorKind::NotFound);
/// assert_eq!(record.status(), StatusCode::NOT_FOUND);
/// assert_eq!(record.message(), "Not Found");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{kind} ({status}): {message}")]
pub struct ErrorRecord {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
    trace: Option<String>,
    method: Option<Method>,
    path: Option<String>,
}

impl ErrorRecord {
    /// Creates a record of the given kind with its default status.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status_code(),
            message: message.into(),
            trace: None,
            method: None,
            path: None,
        }
    }

    /// The record synthesized when no route matches.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "Not Found")
    }

    /// Creates a 400 record.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Creates a 500 record.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Creates an internal record from an `anyhow` error.
    ///
    /// The message is the outermost context and the trace is the full
    /// debug rendering (cause chain, plus a backtrace when captured).
    #[must_use]
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self::internal(error.to_string()).with_trace(format!("{error:?}"))
    }

    /// Overrides the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Attaches a trace.
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Records the originating request method and path.
    #[must_use]
    pub fn with_origin(mut self, method: Method, path: impl Into<String>) -> Self {
        self.method = Some(method);
        self.path = Some(path.into());
        self
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the trace, if any.
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// Returns the originating method, if recorded.
    #[must_use]
    pub const fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Returns the originating path, if recorded.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns true for server-side (5xx) faults.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}
