//! Pre-authentication connection gate
//!
//! A fresh connection talks only to the gate: registration and login are
//! the only frames it accepts. Registration never logs the connection in; a
//! successful login hands the authenticated identity back to the socket
//! handler, which builds the session and registers it with the hub. A
//! connection that has not left the gate never reaches the hub and never
//! receives a broadcast.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chat_core::User;

use crate::protocol::{
    ErrorCode, LoginRequestPayload, LoginResponsePayload, MessageKind, RegisterRequestPayload,
    RegisterResponsePayload, WireMessage,
};
use crate::server::GatewayState;

/// How long the gate waits for the next frame. Resets after each handled
/// frame; expiry closes the connection.
const AUTH_WAIT: Duration = Duration::from_secs(60);

/// Identity established by a successful login
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session_token: String,
}

/// Run the pre-auth dialogue on a freshly upgraded connection.
///
/// Returns `None` when the connection closes, errors, or times out before a
/// successful login.
pub async fn authenticate(state: &GatewayState, socket: &mut WebSocket) -> Option<AuthenticatedUser> {
    loop {
        let frame = match timeout(AUTH_WAIT, socket.recv()).await {
            Err(_) => {
                debug!("Gate read deadline expired");
                return None;
            }
            Ok(None) => return None,
            Ok(Some(Err(e))) => {
                debug!(error = %e, "Gate read error");
                return None;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => {
                debug!("Client closed connection inside the gate");
                return None;
            }
            // Pings are answered by the transport; anything else is noise.
            _ => continue,
        };

        let msg = match WireMessage::from_json(&text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "Gate received malformed frame");
                send(socket, &WireMessage::error(ErrorCode::InvalidJson, "Could not parse message."))
                    .await
                    .ok()?;
                continue;
            }
        };

        match msg.kind() {
            Some(MessageKind::RegisterRequest) => {
                handle_register(state, socket, &msg).await.ok()?;
            }
            Some(MessageKind::LoginRequest) => {
                if let Some(authed) = handle_login(state, socket, &msg).await.ok()? {
                    return Some(authed);
                }
            }
            Some(kind) => {
                debug!(tag = %kind, "Authenticated-only frame inside the gate");
                send(
                    socket,
                    &WireMessage::error(ErrorCode::Unauthorized, "Log in before sending chat frames."),
                )
                .await
                .ok()?;
            }
            None if msg.tag.is_empty() => {
                send(
                    socket,
                    &WireMessage::error(ErrorCode::InvalidMessageType, "Frame carries no message type."),
                )
                .await
                .ok()?;
            }
            None => {
                debug!(tag = %msg.tag, "Unknown frame tag inside the gate");
                send(
                    socket,
                    &WireMessage::error(
                        ErrorCode::UnexpectedMessageType,
                        "Only registration and login are accepted before authentication.",
                    ),
                )
                .await
                .ok()?;
            }
        }
    }
}

async fn handle_register(
    state: &GatewayState,
    socket: &mut WebSocket,
    msg: &WireMessage,
) -> Result<(), axum::Error> {
    let payload: RegisterRequestPayload = match msg.decode_payload() {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Malformed register payload");
            return send(
                socket,
                &WireMessage::error(ErrorCode::InvalidPayload, "Could not parse register request payload."),
            )
            .await;
        }
    };

    info!(username = %payload.username, "Processing registration");

    let response = match state
        .users()
        .register(&payload.username, &payload.password, &payload.display_name)
    {
        Ok(user) => {
            info!(username = %payload.username, user_id = %user.id, "Registration successful");
            RegisterResponsePayload::ok(user.id)
        }
        Err(e) => {
            warn!(username = %payload.username, error = %e, "Registration failed");
            RegisterResponsePayload::err(e.to_string())
        }
    };

    send(socket, &WireMessage::new(MessageKind::RegisterResponse, response)).await
}

async fn handle_login(
    state: &GatewayState,
    socket: &mut WebSocket,
    msg: &WireMessage,
) -> Result<Option<AuthenticatedUser>, axum::Error> {
    let payload: LoginRequestPayload = match msg.decode_payload() {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Malformed login payload");
            send(
                socket,
                &WireMessage::error(ErrorCode::InvalidPayload, "Could not parse login request payload."),
            )
            .await?;
            return Ok(None);
        }
    };

    info!(username = %payload.username, "Processing login");

    match state.users().authenticate(&payload.username, &payload.password) {
        Ok(user) => {
            // The token is returned to the client but the connection itself
            // is the session; later frames do not present it.
            let session_token = Uuid::new_v4().to_string();
            info!(username = %payload.username, user_id = %user.id, "Login successful");

            let response =
                LoginResponsePayload::ok(user.id.clone(), user.display_name.clone(), session_token.clone());
            send(socket, &WireMessage::new(MessageKind::LoginResponse, response)).await?;

            Ok(Some(AuthenticatedUser { user, session_token }))
        }
        Err(e) => {
            warn!(username = %payload.username, error = %e, "Login failed");
            send(
                socket,
                &WireMessage::new(MessageKind::LoginResponse, LoginResponsePayload::err(e.to_string())),
            )
            .await?;
            Ok(None)
        }
    }
}

/// Write one frame directly to the socket. The gate runs before the socket
/// is split, so it is the only writer at this stage.
async fn send(socket: &mut WebSocket, msg: &WireMessage) -> Result<(), axum::Error> {
    match msg.to_json() {
        Ok(frame) => socket.send(Message::Text(frame)).await,
        Err(e) => {
            warn!(tag = %msg.tag, error = %e, "Failed to serialize gate response");
            Ok(())
        }
    }
}
