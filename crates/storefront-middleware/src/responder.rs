//! One-shot response delivery.
//!
//! Each request gets exactly one [`Responder`]. The first [`Responder::send`]
//! delivers the response to the paired [`ResponseReceiver`]; every later send
//! is refused with [`ResponseError::AlreadySent`] and the response dropped.

use std::sync::{Arc, Mutex};

use storefront_core::{ResponseError, ResponseState};
use tokio::sync::oneshot;

use crate::types::Response;

type Slot = Arc<Mutex<Option<oneshot::Sender<Response>>>>;

/// The sending half of a request's response channel.
///
/// Clones share the same channel and the same [`ResponseState`].
#[derive(Debug, Clone)]
pub struct Responder {
    state: ResponseState,
    slot: Slot,
}

/// The receiving half of a request's response channel.
#[derive(Debug)]
pub struct ResponseReceiver {
    rx: oneshot::Receiver<Response>,
}

impl Responder {
    /// Creates a connected responder/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            state: ResponseState::new(),
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (responder, ResponseReceiver { rx })
    }

    /// A responder with no receiver. Sends are accepted once and discarded.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            state: ResponseState::new(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Delivers `response` if nothing has been delivered yet.
    pub fn send(&self, response: Response) -> Result<(), ResponseError> {
        self.state.mark_sent()?;

        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(tx) = sender {
            if tx.send(response).is_err() {
                tracing::debug!("response receiver dropped before delivery");
            }
        }
        Ok(())
    }

    /// The shared sent flag.
    #[must_use]
    pub const fn state(&self) -> &ResponseState {
        &self.state
    }

    /// True once a response has been delivered.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.state.is_sent()
    }
}

impl ResponseReceiver {
    /// Takes the delivered response, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Response> {
        self.rx.try_recv().ok()
    }

    /// Waits for the response. `None` if every responder was dropped unsent.
    pub async fn recv(self) -> Option<Response> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use http::StatusCode;

    #[tokio::test]
    async fn test_first_send_wins() {
        let (responder, receiver) = Responder::channel();

        assert!(responder.send(Response::empty(StatusCode::OK)).is_ok());
        assert_eq!(
            responder.send(Response::empty(StatusCode::INTERNAL_SERVER_ERROR)),
            Err(ResponseError::AlreadySent)
        );

        let response = receiver.recv().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let (responder, mut receiver) = Responder::channel();
        let clone = responder.clone();

        clone.send(Response::empty(StatusCode::CREATED)).unwrap();
        assert!(responder.is_sent());
        assert!(responder.send(Response::empty(StatusCode::OK)).is_err());
        assert_eq!(receiver.try_recv().unwrap().status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_dropped_unsent_yields_none() {
        let (responder, receiver) = Responder::channel();
        drop(responder);
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_detached_accepts_once() {
        let responder = Responder::detached();
        assert!(responder.send(Response::empty(StatusCode::OK)).is_ok());
        assert!(responder.send(Response::empty(StatusCode::OK)).is_err());
    }
}
