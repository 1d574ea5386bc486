//! Authenticated session
//!
//! One `Session` per live connection past the gate. It owns the sending
//! half of the outbound queue of already-serialized frames; the write pump
//! owns the receiving half. Every producer enqueues non-blocking so a slow
//! connection can never stall a handler or the hub.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::hub::Hub;
use crate::protocol::{ErrorCode, WireMessage};

/// Capacity of the per-session outbound queue
pub const OUTBOUND_QUEUE_SIZE: usize = 256;

/// Why a non-blocking enqueue failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("outbound queue is full")]
    Full,
    #[error("outbound queue is closed")]
    Closed,
}

/// One authenticated connection.
///
/// The user identity and display name are snapshots taken at login. The
/// outbound sender sits behind a mutex so the hub can close the queue when
/// the session is unregistered, which terminates the write pump.
pub struct Session {
    session_id: String,
    user_id: String,
    display_name: String,
    hub: Arc<Hub>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
}

impl Session {
    /// Create a session and the receiving half of its outbound queue
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        hub: Arc<Hub>,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let session = Arc::new(Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            display_name: display_name.into(),
            hub,
            outbound: Mutex::new(Some(tx)),
        });
        (session, rx)
    }

    /// Unique per-connection identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Identifier of the authenticated user
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Display name snapshot taken at login
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The hub this session is registered with
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Enqueue an already-serialized frame without blocking
    pub fn try_enqueue(&self, frame: String) -> Result<(), EnqueueError> {
        let guard = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            None => Err(EnqueueError::Closed),
            Some(tx) => tx.try_send(frame).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            }),
        }
    }

    /// Serialize a frame and enqueue it; a full or closed queue is logged
    /// and dropped, the hub decides whether the session survives
    pub fn send_frame(&self, msg: &WireMessage) {
        let frame = match msg.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    tag = %msg.tag,
                    error = %e,
                    "Failed to serialize outbound frame"
                );
                return;
            }
        };
        if let Err(e) = self.try_enqueue(frame) {
            warn!(
                session_id = %self.session_id,
                user_id = %self.user_id,
                tag = %msg.tag,
                error = %e,
                "Dropped outbound frame"
            );
        }
    }

    /// Reply with an `ERROR_NOTIFY` frame
    pub fn send_error(&self, code: ErrorCode, message: &str) {
        debug!(
            session_id = %self.session_id,
            user_id = %self.user_id,
            code = %code,
            message = %message,
            "Sending error to client"
        );
        self.send_frame(&WireMessage::error(code, message));
    }

    /// Close the outbound queue, terminating the write pump once it drains.
    /// Safe to call more than once.
    pub fn close_outbound(&self) {
        let mut guard = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_receive() {
        let hub = Hub::new();
        let (session, mut rx) = Session::new("u1", "Alice", hub);

        session.try_enqueue("frame-1".to_string()).unwrap();
        session.try_enqueue("frame-2".to_string()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), "frame-1");
        assert_eq!(rx.recv().await.unwrap(), "frame-2");
    }

    #[tokio::test]
    async fn test_full_queue_reports_full() {
        let hub = Hub::new();
        let (session, _rx) = Session::new("u1", "Alice", hub);

        for i in 0..OUTBOUND_QUEUE_SIZE {
            session.try_enqueue(format!("frame-{i}")).unwrap();
        }
        assert_eq!(
            session.try_enqueue("overflow".to_string()),
            Err(EnqueueError::Full)
        );
    }

    #[tokio::test]
    async fn test_closed_queue_terminates_receiver() {
        let hub = Hub::new();
        let (session, mut rx) = Session::new("u1", "Alice", hub);

        session.try_enqueue("last".to_string()).unwrap();
        session.close_outbound();
        session.close_outbound(); // idempotent

        assert_eq!(
            session.try_enqueue("late".to_string()),
            Err(EnqueueError::Closed)
        );

        // Buffered frames drain before the queue reports closed.
        assert_eq!(rx.recv().await.unwrap(), "last");
        assert!(rx.recv().await.is_none());
    }
}
