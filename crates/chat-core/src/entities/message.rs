//! Stored message entity - one line of a chat's append-only log

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as appended to a chat history log.
///
/// Serialization matches the wire representation inside
/// `CHAT_HISTORY_RESPONSE`; extra fields in persisted records are tolerated
/// on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub chat_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Seconds since the Unix epoch, assigned at append time
    pub timestamp: i64,
}

impl StoredMessage {
    /// Create a new record with a fresh message identifier and the current
    /// wall-clock timestamp
    pub fn new(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp: Utc::now().timestamp(),
        }
    }
}
