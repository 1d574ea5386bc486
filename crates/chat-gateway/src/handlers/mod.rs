//! Frame handlers for authenticated sessions
//!
//! The dispatcher decodes the envelope and routes by tag; each handler
//! decodes its own payload. Handler errors answer the current frame with an
//! `ERROR_NOTIFY` and the pump continues; only connection-level failures end
//! the session.

mod error;
mod history;
mod private;
mod text;
mod user_list;

pub use error::{HandlerError, HandlerResult};

use std::sync::Arc;

use tracing::debug;

use crate::connection::Session;
use crate::protocol::{ErrorCode, MessageKind, WireMessage};
use crate::server::GatewayState;

/// Dispatch one inbound text frame from an authenticated session
pub struct FrameDispatcher;

impl FrameDispatcher {
    pub async fn dispatch(state: &GatewayState, session: &Arc<Session>, text: &str) {
        let msg = match WireMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(
                    session_id = %session.session_id(),
                    error = %e,
                    "Failed to parse inbound frame"
                );
                session.send_error(ErrorCode::InvalidJson, "Could not parse message.");
                return;
            }
        };

        let result = match msg.kind() {
            Some(MessageKind::TextMessage) => text::handle(state, session, &msg).await,
            Some(MessageKind::GetUserListRequest) => user_list::handle(session).await,
            Some(MessageKind::SendPrivateMessageRequest) => {
                private::handle(state, session, &msg).await
            }
            Some(MessageKind::GetChatHistoryRequest) => history::handle(state, session, &msg).await,
            _ => {
                debug!(
                    session_id = %session.session_id(),
                    tag = %msg.tag,
                    "Unhandled frame tag"
                );
                Err(HandlerError::UnknownType)
            }
        };

        if let Err(e) = result {
            debug!(
                session_id = %session.session_id(),
                tag = %msg.tag,
                error = %e,
                "Frame handling failed"
            );
            session.send_error(e.error_code(), &e.to_string());
        }
    }
}
