//! # chat-store
//!
//! Durable state: the user identity store backed by a single JSON document,
//! and the per-chat append-only history store backed by newline-delimited
//! JSON files.

pub mod history;
pub mod identity;

// Re-export commonly used types at crate root
pub use history::{ChatHistory, HistoryError, HistoryStore};
pub use identity::{IdentityError, UserStore};
