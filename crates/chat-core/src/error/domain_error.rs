//! Domain error type

use thiserror::Error;

/// Errors produced by domain rules, independent of any infrastructure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("user identifiers cannot be empty")]
    EmptyUserId,

    #[error("chat identifier cannot be empty")]
    EmptyChatId,
}
