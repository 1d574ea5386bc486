//! WebSocket handler
//!
//! Upgrades the connection, runs the pre-auth gate, then couples the socket
//! to a session through two cooperating pumps: the read pump in the current
//! task and a spawned write pump. Only the write pump writes to the socket
//! once the gate has passed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tracing::{debug, info, trace};

use crate::connection::{gate, Session};
use crate::handlers::FrameDispatcher;
use crate::server::GatewayState;

/// Time allowed for one write to complete
const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between inbound frames (pongs included)
const PONG_WAIT: Duration = Duration::from_secs(60);

/// Ping period. Must be strictly less than `PONG_WAIT`.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum inbound frame size in bytes
const MAX_FRAME_SIZE: usize = 10 * 1024;

/// WebSocket upgrade handler for `/ws`
pub async fn ws_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(|socket| handle_socket(state, socket))
}

/// Drive one upgraded connection from gate to teardown
async fn handle_socket(state: GatewayState, mut socket: WebSocket) {
    info!("WebSocket connection established");

    let Some(authed) = gate::authenticate(&state, &mut socket).await else {
        info!("Connection closed before login");
        return;
    };

    let (session, outbound_rx) = Session::new(
        authed.user.id.clone(),
        authed.user.display_name.clone(),
        Arc::clone(state.hub()),
    );

    state.hub().register(Arc::clone(&session)).await;

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_pump(sink, outbound_rx, session.session_id().to_string()));

    read_pump(&state, &session, stream).await;

    // Teardown: the hub removes the session and closes its outbound queue,
    // which lets the write pump drain and exit.
    session.hub().unregister(Arc::clone(&session)).await;
    let _ = writer.await;

    info!(
        session_id = %session.session_id(),
        user_id = %session.user_id(),
        "Connection torn down"
    );
}

/// Read frames, decode, dispatch. Any read error, deadline expiry, or peer
/// close ends the pump.
async fn read_pump(state: &GatewayState, session: &Arc<Session>, mut stream: SplitStream<WebSocket>) {
    loop {
        let frame = match timeout(PONG_WAIT, stream.next()).await {
            Err(_) => {
                debug!(session_id = %session.session_id(), "Read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(session_id = %session.session_id(), error = %e, "Read error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => FrameDispatcher::dispatch(state, session, &text).await,
            Message::Pong(_) => {
                // Receiving anything resets the read deadline; nothing else
                // to do for a pong.
                trace!(session_id = %session.session_id(), "Pong received");
            }
            Message::Ping(_) => {
                trace!(session_id = %session.session_id(), "Ping received");
            }
            Message::Close(_) => {
                info!(session_id = %session.session_id(), "Client closed connection");
                break;
            }
            Message::Binary(_) => {
                debug!(session_id = %session.session_id(), "Binary frames not supported");
            }
        }
    }
}

/// Drain the outbound queue onto the socket and keep the connection alive
/// with periodic pings. A closed queue sends a close frame and exits; any
/// write failure exits immediately.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    session_id: String,
) {
    let mut ticker = interval(PING_PERIOD);
    // The first tick completes immediately; skip it so pings start one
    // period from now.
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe_frame = outbound.recv() => match maybe_frame {
                Some(frame) => {
                    match timeout(WRITE_WAIT, sink.send(Message::Text(frame))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!(session_id = %session_id, error = %e, "Write error");
                            return;
                        }
                        Err(_) => {
                            debug!(session_id = %session_id, "Write deadline expired");
                            return;
                        }
                    }
                }
                None => {
                    // Outbound queue closed by the hub; say goodbye.
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                match timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => trace!(session_id = %session_id, "Ping sent"),
                    Ok(Err(e)) => {
                        debug!(session_id = %session_id, error = %e, "Ping write error");
                        return;
                    }
                    Err(_) => {
                        debug!(session_id = %session_id, "Ping write deadline expired");
                        return;
                    }
                }
            }
        }
    }
}
