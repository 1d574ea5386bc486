//! `SEND_PRIVATE_MESSAGE_REQUEST` handler

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use chat_core::private_chat_id;

use super::{HandlerError, HandlerResult};
use crate::connection::Session;
use crate::protocol::{ErrorCode, MessageKind, NewPrivateMessageNotifyPayload, SendPrivateMessageRequestPayload, WireMessage};
use crate::server::GatewayState;

pub async fn handle(
    state: &GatewayState,
    session: &Arc<Session>,
    msg: &WireMessage,
) -> HandlerResult<()> {
    let payload: SendPrivateMessageRequestPayload = msg.decode_payload().map_err(|_| {
        HandlerError::InvalidPayload("Could not parse private message request payload.".to_string())
    })?;

    debug!(
        sender_id = %session.user_id(),
        target_user_id = %payload.target_user_id,
        "Private message requested"
    );

    let target = session
        .hub()
        .find_by_user_id(&payload.target_user_id)
        .await
        .ok_or(HandlerError::TargetNotFound)?;

    let chat_id = private_chat_id(session.user_id(), target.user_id())?;

    // A failed append is reported but the notify is still delivered to both
    // parties; it just carries no message identifier.
    let (message_id, timestamp) = match state
        .history()
        .append(&chat_id, session.user_id(), session.display_name(), &payload.text)
        .await
    {
        Ok(stored) => (Some(stored.message_id), stored.timestamp),
        Err(e) => {
            warn!(chat_id = %chat_id, error = %e, "Failed to append private message to history");
            session.send_error(ErrorCode::HistorySaveFailed, "Could not save your message.");
            (None, Utc::now().timestamp())
        }
    };

    let notify = WireMessage::new(
        MessageKind::NewPrivateMessageNotify,
        NewPrivateMessageNotifyPayload {
            chat_id,
            message_id,
            sender_id: session.user_id().to_string(),
            sender_name: session.display_name().to_string(),
            receiver_id: target.user_id().to_string(),
            text: payload.text,
            timestamp,
        },
    );

    // Deliver to the target and echo the same frame back to the sender.
    target.send_frame(&notify);
    session.send_frame(&notify);

    Ok(())
}
