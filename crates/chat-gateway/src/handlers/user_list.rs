//! `GET_USER_LIST_REQUEST` handler

use std::sync::Arc;

use tracing::debug;

use super::HandlerResult;
use crate::connection::Session;
use crate::protocol::{MessageKind, UserListResponsePayload, WireMessage};

pub async fn handle(session: &Arc<Session>) -> HandlerResult<()> {
    debug!(
        user_id = %session.user_id(),
        display_name = %session.display_name(),
        "User list requested"
    );

    // The reply goes straight to the requester, not through the broadcast
    // channel.
    let users = session.hub().online_users(session.user_id()).await;
    session.send_frame(&WireMessage::new(
        MessageKind::UserListResponse,
        UserListResponsePayload { users },
    ));

    Ok(())
}
