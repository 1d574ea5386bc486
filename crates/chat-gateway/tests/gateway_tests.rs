//! End-to-end gateway tests
//!
//! Each test boots a real server on an ephemeral port with throwaway
//! storage and talks to it over actual WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use chat_common::{AppConfig, ServerConfig, StorageConfig};
use chat_gateway::server::{create_app, create_gateway_state};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    _dir: TempDir,
}

async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            users_file: dir.path().join("users_data.json"),
            history_dir: dir.path().join("chat_history"),
        },
    };

    let state = create_gateway_state(config).await.unwrap();
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestServer { addr, _dir: dir }
}

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(format!("ws://{}/ws", server.addr))
            .await
            .expect("websocket connect failed");
        Self { ws }
    }

    async fn send(&mut self, tag: &str, payload: Value) {
        let frame = json!({ "type": tag, "payload": payload }).to_string();
        self.ws.send(WsMessage::Text(frame)).await.expect("send failed");
    }

    async fn send_raw(&mut self, raw: &str) {
        self.ws
            .send(WsMessage::Text(raw.to_string()))
            .await
            .expect("send failed");
    }

    /// Next text frame, parsed; control frames are skipped
    async fn recv(&mut self) -> Value {
        loop {
            let msg = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("connection closed")
                .expect("websocket error");
            match msg {
                WsMessage::Text(text) => return serde_json::from_str(&text).expect("invalid json frame"),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Assert the next frame's tag and return its payload
    async fn expect(&mut self, tag: &str) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame["type"], tag, "unexpected frame: {frame}");
        frame["payload"].clone()
    }

    async fn register(&mut self, username: &str, password: &str, display_name: &str) -> Value {
        self.send(
            "REGISTER_REQUEST",
            json!({ "username": username, "password": password, "display_name": display_name }),
        )
        .await;
        self.expect("REGISTER_RESPONSE").await
    }

    async fn login(&mut self, username: &str, password: &str) -> Value {
        self.send(
            "LOGIN_REQUEST",
            json!({ "username": username, "password": password }),
        )
        .await;
        self.expect("LOGIN_RESPONSE").await
    }
}

/// Register and log in a fresh user, returning the client and its user id
async fn join(server: &TestServer, username: &str, display_name: &str) -> (Client, String) {
    let mut client = Client::connect(server).await;
    let reg = client.register(username, "pw1", display_name).await;
    assert_eq!(reg["success"], true, "registration failed: {reg}");

    let login = client.login(username, "pw1").await;
    assert_eq!(login["success"], true, "login failed: {login}");
    let user_id = login["user_id"].as_str().unwrap().to_string();
    (client, user_id)
}

fn private_chat_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("private:{lo}:{hi}")
}

#[tokio::test]
async fn test_register_then_login() {
    let server = start_server().await;
    let mut client = Client::connect(&server).await;

    let reg = client.register("alice", "pw1", "Alice").await;
    assert_eq!(reg["success"], true);
    let user_id = reg["user_id"].as_str().unwrap().to_string();
    assert!(!user_id.is_empty());

    let login = client.login("alice", "pw1").await;
    assert_eq!(login["success"], true);
    assert_eq!(login["user_id"], user_id.as_str());
    assert_eq!(login["display_name"], "Alice");
    assert!(!login["session_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let server = start_server().await;

    let mut first = Client::connect(&server).await;
    assert_eq!(first.register("alice", "pw1", "Alice").await["success"], true);

    let mut second = Client::connect(&server).await;
    let reg = second.register("alice", "other", "Alice Again").await;
    assert_eq!(reg["success"], false);
    assert_eq!(reg["error_message"], "username is already taken");
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let server = start_server().await;
    let mut client = Client::connect(&server).await;

    assert_eq!(client.register("alice", "pw1", "Alice").await["success"], true);

    let login = client.login("alice", "wrong").await;
    assert_eq!(login["success"], false);
    assert_eq!(login["error_message"], "invalid password");

    let login = client.login("nobody", "pw1").await;
    assert_eq!(login["success"], false);
    assert_eq!(login["error_message"], "user not found");
}

#[tokio::test]
async fn test_broadcast_order_preserved() {
    let server = start_server().await;
    let (mut alice, alice_id) = join(&server, "alice", "Alice").await;
    let (mut bob, _) = join(&server, "bob", "Bob").await;

    alice.send("TEXT_MESSAGE", json!({ "text": "hi" })).await;

    // Alice's own copy confirms the hub accepted the first frame before the
    // second is submitted.
    let first = alice.expect("BROADCAST_TEXT_MESSAGE").await;
    assert_eq!(first["text"], "hi");
    assert_eq!(first["sender_id"], alice_id.as_str());
    assert_eq!(first["sender_name"], "Alice");
    assert!(first["timestamp"].is_i64());

    bob.send("TEXT_MESSAGE", json!({ "text": "hey" })).await;

    // Both sessions observe "hi" before "hey".
    let bob_first = bob.expect("BROADCAST_TEXT_MESSAGE").await;
    assert_eq!(bob_first["text"], "hi");
    let bob_second = bob.expect("BROADCAST_TEXT_MESSAGE").await;
    assert_eq!(bob_second["text"], "hey");

    let alice_second = alice.expect("BROADCAST_TEXT_MESSAGE").await;
    assert_eq!(alice_second["text"], "hey");
}

#[tokio::test]
async fn test_private_message_routed_to_both() {
    let server = start_server().await;
    let (mut alice, alice_id) = join(&server, "alice", "Alice").await;
    let (mut bob, bob_id) = join(&server, "bob", "Bob").await;

    alice
        .send(
            "SEND_PRIVATE_MESSAGE_REQUEST",
            json!({ "target_user_id": bob_id, "text": "hello" }),
        )
        .await;

    let expected_chat = private_chat_id(&alice_id, &bob_id);
    for payload in [
        bob.expect("NEW_PRIVATE_MESSAGE_NOTIFY").await,
        alice.expect("NEW_PRIVATE_MESSAGE_NOTIFY").await,
    ] {
        assert_eq!(payload["chat_id"], expected_chat.as_str());
        assert_eq!(payload["sender_id"], alice_id.as_str());
        assert_eq!(payload["sender_name"], "Alice");
        assert_eq!(payload["receiver_id"], bob_id.as_str());
        assert_eq!(payload["text"], "hello");
        assert!(!payload["message_id"].as_str().unwrap().is_empty());
        assert!(payload["timestamp"].is_i64());
    }
}

#[tokio::test]
async fn test_private_message_to_offline_user() {
    let server = start_server().await;
    let (mut alice, _) = join(&server, "alice", "Alice").await;

    alice
        .send(
            "SEND_PRIVATE_MESSAGE_REQUEST",
            json!({ "target_user_id": "no-such-user", "text": "hello?" }),
        )
        .await;

    let err = alice.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_history_access_control() {
    let server = start_server().await;
    let (mut alice, alice_id) = join(&server, "alice", "Alice").await;
    let (mut bob, bob_id) = join(&server, "bob", "Bob").await;
    let (mut carol, _) = join(&server, "carol", "Carol").await;

    alice
        .send(
            "SEND_PRIVATE_MESSAGE_REQUEST",
            json!({ "target_user_id": bob_id, "text": "hello" }),
        )
        .await;
    alice.expect("NEW_PRIVATE_MESSAGE_NOTIFY").await;
    bob.expect("NEW_PRIVATE_MESSAGE_NOTIFY").await;

    let chat_id = private_chat_id(&alice_id, &bob_id);

    // Carol is not a member of the chat.
    carol
        .send("GET_CHAT_HISTORY_REQUEST", json!({ "chat_id": chat_id }))
        .await;
    let err = carol.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "ACCESS_DENIED");

    // Alice is.
    alice
        .send("GET_CHAT_HISTORY_REQUEST", json!({ "chat_id": chat_id }))
        .await;
    let history = alice.expect("CHAT_HISTORY_RESPONSE").await;
    assert_eq!(history["chat_id"], chat_id.as_str());
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hello");
    assert_eq!(messages[0]["sender_id"], alice_id.as_str());
}

#[tokio::test]
async fn test_history_tail_bounded() {
    let server = start_server().await;
    let (mut alice, _) = join(&server, "alice", "Alice").await;

    for i in 1..=120 {
        alice
            .send("TEXT_MESSAGE", json!({ "text": format!("msg {i}") }))
            .await;
        // Receiving the echo confirms the append completed.
        let echo = alice.expect("BROADCAST_TEXT_MESSAGE").await;
        assert_eq!(echo["text"], format!("msg {i}"));
    }

    alice
        .send(
            "GET_CHAT_HISTORY_REQUEST",
            json!({ "chat_id": "global_broadcast", "limit": 0 }),
        )
        .await;

    let history = alice.expect("CHAT_HISTORY_RESPONSE").await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(messages[0]["text"], "msg 71");
    assert_eq!(messages[49]["text"], "msg 120");
    assert_eq!(history["has_more"], true);
}

#[tokio::test]
async fn test_gate_rejects_pre_auth_traffic() {
    let server = start_server().await;
    let mut client = Client::connect(&server).await;

    // A chat frame before login.
    client.send("TEXT_MESSAGE", json!({ "text": "hi" })).await;
    let err = client.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "UNAUTHORIZED");

    // Malformed JSON.
    client.send_raw("this is not json").await;
    let err = client.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "INVALID_JSON");

    // A tag outside the protocol.
    client.send("MADE_UP_TYPE", json!({})).await;
    let err = client.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "UNEXPECTED_MESSAGE_TYPE");

    // Registration does not log the connection in.
    let reg = client.register("alice", "pw1", "Alice").await;
    assert_eq!(reg["success"], true);
    client.send("TEXT_MESSAGE", json!({ "text": "hi" })).await;
    let err = client.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_register_payload() {
    let server = start_server().await;
    let mut client = Client::connect(&server).await;

    client.send("REGISTER_REQUEST", json!({ "username": 42 })).await;
    let err = client.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_user_list_excludes_requester() {
    let server = start_server().await;
    let (mut alice, _) = join(&server, "alice", "Alice").await;
    let (_bob, bob_id) = join(&server, "bob", "Bob").await;

    alice.send("GET_USER_LIST_REQUEST", json!({})).await;
    let payload = alice.expect("USER_LIST_RESPONSE").await;
    let users = payload["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["user_id"], bob_id.as_str());
    assert_eq!(users[0]["display_name"], "Bob");
    assert_eq!(users[0]["is_online"], true);
}

#[tokio::test]
async fn test_unknown_tag_after_login() {
    let server = start_server().await;
    let (mut alice, _) = join(&server, "alice", "Alice").await;

    alice.send("MADE_UP_TYPE", json!({})).await;
    let err = alice.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "UNKNOWN_MESSAGE_TYPE");

    // Login and registration are gate-only tags; after authentication they
    // fall through to the same reply.
    alice
        .send("LOGIN_REQUEST", json!({ "username": "alice", "password": "pw1" }))
        .await;
    let err = alice.expect("ERROR_NOTIFY").await;
    assert_eq!(err["error_code"], "UNKNOWN_MESSAGE_TYPE");
}

#[tokio::test]
async fn test_global_history_persists_across_sessions() {
    let server = start_server().await;

    {
        let (mut alice, _) = join(&server, "alice", "Alice").await;
        alice.send("TEXT_MESSAGE", json!({ "text": "before restart" })).await;
        alice.expect("BROADCAST_TEXT_MESSAGE").await;
    }

    // A different user on a fresh connection sees the logged broadcast.
    let (mut bob, _) = join(&server, "bob", "Bob").await;
    bob.send(
        "GET_CHAT_HISTORY_REQUEST",
        json!({ "chat_id": "global_broadcast" }),
    )
    .await;
    let history = bob.expect("CHAT_HISTORY_RESPONSE").await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "before restart");
}
