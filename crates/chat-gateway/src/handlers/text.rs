//! `TEXT_MESSAGE` handler - global broadcast

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use chat_core::GLOBAL_CHAT_ID;

use super::{HandlerError, HandlerResult};
use crate::connection::Session;
use crate::protocol::{BroadcastTextPayload, MessageKind, TextMessagePayload, WireMessage};
use crate::server::GatewayState;

pub async fn handle(
    state: &GatewayState,
    session: &Arc<Session>,
    msg: &WireMessage,
) -> HandlerResult<()> {
    let payload: TextMessagePayload = msg.decode_payload().map_err(|_| {
        HandlerError::InvalidPayload("Could not parse text payload for broadcast.".to_string())
    })?;

    // Losing durability is preferable to losing liveness: an append failure
    // is logged and the broadcast still goes out.
    let timestamp = match state
        .history()
        .append(GLOBAL_CHAT_ID, session.user_id(), session.display_name(), &payload.text)
        .await
    {
        Ok(stored) => stored.timestamp,
        Err(e) => {
            warn!(
                chat_id = GLOBAL_CHAT_ID,
                sender_id = %session.user_id(),
                error = %e,
                "Failed to append broadcast to history"
            );
            Utc::now().timestamp()
        }
    };

    let broadcast = WireMessage::new(
        MessageKind::BroadcastTextMessage,
        BroadcastTextPayload {
            sender_id: session.user_id().to_string(),
            sender_name: session.display_name().to_string(),
            text: payload.text,
            timestamp,
        },
    );

    match broadcast.to_json() {
        Ok(frame) => session.hub().broadcast(frame).await,
        Err(e) => warn!(
            sender_id = %session.user_id(),
            error = %e,
            "Failed to serialize broadcast frame"
        ),
    }

    Ok(())
}
