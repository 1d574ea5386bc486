//! Wire frame envelope
//!
//! Every frame is a text-encoded object `{ "type": <tag>, "payload": {..} }`.
//! Decoding is two-stage: the envelope first (cheap), then the payload
//! against the schema implied by the tag.

use super::ErrorCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of frame tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    RegisterRequest,
    RegisterResponse,
    LoginRequest,
    LoginResponse,
    TextMessage,
    BroadcastTextMessage,
    GetUserListRequest,
    UserListResponse,
    SendPrivateMessageRequest,
    NewPrivateMessageNotify,
    GetChatHistoryRequest,
    ChatHistoryResponse,
    ErrorNotify,
}

impl MessageKind {
    /// The wire representation of this tag
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RegisterRequest => "REGISTER_REQUEST",
            Self::RegisterResponse => "REGISTER_RESPONSE",
            Self::LoginRequest => "LOGIN_REQUEST",
            Self::LoginResponse => "LOGIN_RESPONSE",
            Self::TextMessage => "TEXT_MESSAGE",
            Self::BroadcastTextMessage => "BROADCAST_TEXT_MESSAGE",
            Self::GetUserListRequest => "GET_USER_LIST_REQUEST",
            Self::UserListResponse => "USER_LIST_RESPONSE",
            Self::SendPrivateMessageRequest => "SEND_PRIVATE_MESSAGE_REQUEST",
            Self::NewPrivateMessageNotify => "NEW_PRIVATE_MESSAGE_NOTIFY",
            Self::GetChatHistoryRequest => "GET_CHAT_HISTORY_REQUEST",
            Self::ChatHistoryResponse => "CHAT_HISTORY_RESPONSE",
            Self::ErrorNotify => "ERROR_NOTIFY",
        }
    }

    /// Parse a wire tag; `None` for anything outside the closed set
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "REGISTER_REQUEST" => Some(Self::RegisterRequest),
            "REGISTER_RESPONSE" => Some(Self::RegisterResponse),
            "LOGIN_REQUEST" => Some(Self::LoginRequest),
            "LOGIN_RESPONSE" => Some(Self::LoginResponse),
            "TEXT_MESSAGE" => Some(Self::TextMessage),
            "BROADCAST_TEXT_MESSAGE" => Some(Self::BroadcastTextMessage),
            "GET_USER_LIST_REQUEST" => Some(Self::GetUserListRequest),
            "USER_LIST_RESPONSE" => Some(Self::UserListResponse),
            "SEND_PRIVATE_MESSAGE_REQUEST" => Some(Self::SendPrivateMessageRequest),
            "NEW_PRIVATE_MESSAGE_NOTIFY" => Some(Self::NewPrivateMessageNotify),
            "GET_CHAT_HISTORY_REQUEST" => Some(Self::GetChatHistoryRequest),
            "CHAT_HISTORY_RESPONSE" => Some(Self::ChatHistoryResponse),
            "ERROR_NOTIFY" => Some(Self::ErrorNotify),
            _ => None,
        }
    }

    /// Tags a connection may send before authenticating
    #[must_use]
    pub const fn is_pre_auth(&self) -> bool {
        matches!(self, Self::RegisterRequest | Self::LoginRequest)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame on the wire.
///
/// The tag is kept as a raw string so frames with tags outside the closed
/// set still decode and can be answered with an error frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Frame tag
    #[serde(rename = "type")]
    pub tag: String,

    /// Opaque payload, decoded in a second stage against the tag's schema
    #[serde(default)]
    pub payload: Value,
}

impl WireMessage {
    /// Build a frame from a tag and payload
    #[must_use]
    pub fn new(kind: MessageKind, payload: impl Serialize) -> Self {
        Self {
            tag: kind.as_str().to_string(),
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Build an `ERROR_NOTIFY` frame
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            tag: MessageKind::ErrorNotify.as_str().to_string(),
            payload: serde_json::json!({
                "error_code": code.as_str(),
                "error_message": message,
            }),
        }
    }

    /// The parsed tag, if it belongs to the closed set
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::parse(&self.tag)
    }

    /// Decode the payload against a concrete schema (the second stage)
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON text (the first stage)
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
