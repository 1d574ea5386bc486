//! Per-chat append-only message log
//!
//! One newline-delimited JSON file per chat. Appends hold a per-chat mutex
//! across open, write, close; loads serialize with appends on the same chat
//! but independent chats proceed in parallel. A partial tail line from a
//! crash is skipped on load.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chat_core::StoredMessage;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors produced by history operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("chat identifier cannot be empty")]
    EmptyChatId,

    #[error("history io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A bounded replay of a chat's log, oldest-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    pub messages: Vec<StoredMessage>,
    /// True when the log holds more records than the replay returned
    pub has_more: bool,
}

impl ChatHistory {
    fn empty() -> Self {
        Self {
            messages: Vec::new(),
            has_more: false,
        }
    }
}

/// Append-only history store rooted at one directory.
///
/// The lock map materializes a mutex per chat on first touch; the outer
/// mutex only guards the map itself.
pub struct HistoryStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HistoryStore {
    /// Default number of messages returned by a replay
    pub const DEFAULT_LIMIT: usize = 50;

    /// Largest limit a client may request
    pub const MAX_LIMIT: i64 = 100;

    /// Create the store, creating the directory if needed
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        info!(path = %dir.display(), "Chat history store initialized");

        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Append a message to a chat's log.
    ///
    /// Assigns a fresh message identifier and wall-clock timestamp, writes
    /// one JSON line, and returns the stored record.
    ///
    /// # Errors
    /// `EmptyChatId` for an empty chat identifier, `Io`/`Encode` on failure.
    pub async fn append(
        &self,
        chat_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<StoredMessage, HistoryError> {
        if chat_id.is_empty() {
            return Err(HistoryError::EmptyChatId);
        }

        let lock = self.file_lock(chat_id).await;
        let _guard = lock.lock().await;

        let message = StoredMessage::new(chat_id, sender_id, sender_name, text);
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');

        let path = self.chat_path(chat_id);
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(chat_id = %chat_id, message_id = %message.message_id, "Message appended");
        Ok(message)
    }

    /// Read the last `limit` messages of a chat, oldest-first.
    ///
    /// A missing file yields an empty history. `limit <= 0` or
    /// `limit > 100` is clamped to the default of 50. Malformed lines are
    /// skipped with a warning.
    ///
    /// # Errors
    /// `EmptyChatId` for an empty chat identifier, `Io` on read failure.
    pub async fn load_tail(&self, chat_id: &str, limit: i64) -> Result<ChatHistory, HistoryError> {
        if chat_id.is_empty() {
            return Err(HistoryError::EmptyChatId);
        }

        let limit = if limit <= 0 || limit > Self::MAX_LIMIT {
            Self::DEFAULT_LIMIT
        } else {
            limit as usize
        };

        let lock = self.file_lock(chat_id).await;
        let _guard = lock.lock().await;

        let path = self.chat_path(chat_id);
        let data = match fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(chat_id = %chat_id, "No history file yet");
                return Ok(ChatHistory::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let mut messages = Vec::new();
        for line in data.lines() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredMessage>(line) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "Skipping malformed history line");
                }
            }
        }

        let has_more = messages.len() > limit;
        if has_more {
            messages.drain(..messages.len() - limit);
        }

        debug!(chat_id = %chat_id, count = messages.len(), "History loaded");
        Ok(ChatHistory { messages, has_more })
    }

    fn chat_path(&self, chat_id: &str) -> PathBuf {
        self.dir.join(format!("{chat_id}.jsonl"))
    }

    async fn file_lock(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(chat_id.to_string()).or_default().clone()
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").field("dir", &self.dir).finish()
    }
}
