//! Chat history store

mod history_store;

pub use history_store::{ChatHistory, HistoryError, HistoryStore};
