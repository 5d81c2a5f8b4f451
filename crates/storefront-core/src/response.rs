//! One-response-per-request guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised when delivering a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// A response was already delivered for this request.
    #[error("a response has already been sent for this request")]
    AlreadySent,
}

/// Shared flag recording whether a request's response has been sent.
///
/// Clones share the same flag. The first [`mark_sent`](Self::mark_sent) wins;
/// every later call returns [`ResponseError::AlreadySent`].
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    sent: Arc<AtomicBool>,
}

impl ResponseState {
    /// Creates an unsent state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the response as sent.
    pub fn mark_sent(&self) -> Result<(), ResponseError> {
        self.sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ResponseError::AlreadySent)
    }

    /// Returns true once a response has been sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mark_wins() {
        let state = ResponseState::new();
        assert!(!state.is_sent());
        assert!(state.mark_sent().is_ok());
        assert!(state.is_sent());
        assert_eq!(state.mark_sent(), Err(ResponseError::AlreadySent));
    }

    #[test]
    fn test_clones_share_flag() {
        let state = ResponseState::new();
        let clone = state.clone();
        clone.mark_sent().unwrap();
        assert!(state.is_sent());
        assert!(state.mark_sent().is_err());
    }
}
