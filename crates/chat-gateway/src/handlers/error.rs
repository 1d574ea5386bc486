//! Handler error types

use chat_core::DomainError;
use thiserror::Error;

use crate::protocol::ErrorCode;

/// Errors a frame handler can answer with.
///
/// The display string is the `error_message` put on the wire.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not match the frame's tag
    #[error("{0}")]
    InvalidPayload(String),

    /// The session sent a tag the server does not handle
    #[error("Unhandled message type by server.")]
    UnknownType,

    /// The addressed user is not connected
    #[error("Recipient is not online or does not exist.")]
    TargetNotFound,

    /// The requester is not a member of the chat
    #[error("You do not have permission to access this chat history.")]
    AccessDenied,

    /// A history read failed
    #[error("Could not load chat history.")]
    LoadFailed,

    /// A domain rule was violated server-side
    #[error("Could not process the request.")]
    Domain(#[from] DomainError),
}

impl HandlerError {
    /// Wire error code for this failure
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidPayload(_) => ErrorCode::InvalidPayload,
            Self::UnknownType => ErrorCode::UnknownMessageType,
            Self::TargetNotFound => ErrorCode::UserNotFound,
            Self::AccessDenied => ErrorCode::AccessDenied,
            Self::LoadFailed => ErrorCode::HistoryLoadFailed,
            Self::Domain(_) => ErrorCode::Internal,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(HandlerError::UnknownType.error_code(), ErrorCode::UnknownMessageType);
        assert_eq!(HandlerError::TargetNotFound.error_code(), ErrorCode::UserNotFound);
        assert_eq!(HandlerError::AccessDenied.error_code(), ErrorCode::AccessDenied);
        assert_eq!(
            HandlerError::Domain(DomainError::EmptyUserId).error_code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn test_wire_messages() {
        assert_eq!(
            HandlerError::TargetNotFound.to_string(),
            "Recipient is not online or does not exist."
        );
        assert_eq!(
            HandlerError::InvalidPayload("Could not parse text payload.".to_string()).to_string(),
            "Could not parse text payload."
        );
    }
}
