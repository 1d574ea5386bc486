//! `GET_CHAT_HISTORY_REQUEST` handler

use std::sync::Arc;

use tracing::{debug, warn};

use chat_core::can_access;

use super::{HandlerError, HandlerResult};
use crate::connection::Session;
use crate::protocol::{ChatHistoryResponsePayload, GetChatHistoryRequestPayload, MessageKind, WireMessage};
use crate::server::GatewayState;

pub async fn handle(
    state: &GatewayState,
    session: &Arc<Session>,
    msg: &WireMessage,
) -> HandlerResult<()> {
    let payload: GetChatHistoryRequestPayload = msg.decode_payload().map_err(|_| {
        HandlerError::InvalidPayload("Could not parse get history request payload.".to_string())
    })?;

    debug!(
        user_id = %session.user_id(),
        chat_id = %payload.chat_id,
        limit = payload.limit,
        "Chat history requested"
    );

    if !can_access(&payload.chat_id, session.user_id()) {
        debug!(
            user_id = %session.user_id(),
            chat_id = %payload.chat_id,
            "History access denied"
        );
        return Err(HandlerError::AccessDenied);
    }

    let history = state
        .history()
        .load_tail(&payload.chat_id, payload.limit)
        .await
        .map_err(|e| {
            warn!(chat_id = %payload.chat_id, error = %e, "Failed to load chat history");
            HandlerError::LoadFailed
        })?;

    session.send_frame(&WireMessage::new(
        MessageKind::ChatHistoryResponse,
        ChatHistoryResponsePayload {
            chat_id: payload.chat_id,
            messages: history.messages,
            has_more: Some(history.has_more),
        },
    ));

    Ok(())
}
