//! Typed payloads for each frame tag

use chat_core::StoredMessage;
use serde::{Deserialize, Serialize};

/// `REGISTER_REQUEST` (client to server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequestPayload {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

/// `REGISTER_RESPONSE` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponsePayload {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RegisterResponsePayload {
    #[must_use]
    pub fn ok(user_id: impl Into<String>) -> Self {
        Self {
            success: true,
            user_id: Some(user_id.into()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user_id: None,
            error_message: Some(message.into()),
        }
    }
}

/// `LOGIN_REQUEST` (client to server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequestPayload {
    pub username: String,
    pub password: String,
}

/// `LOGIN_RESPONSE` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponsePayload {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LoginResponsePayload {
    #[must_use]
    pub fn ok(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            user_id: Some(user_id.into()),
            display_name: Some(display_name.into()),
            session_token: Some(session_token.into()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user_id: None,
            display_name: None,
            session_token: None,
            error_message: Some(message.into()),
        }
    }
}

/// `TEXT_MESSAGE` (client to server) - a global broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessagePayload {
    pub text: String,
}

/// `BROADCAST_TEXT_MESSAGE` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastTextPayload {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: i64,
}

/// One entry of `USER_LIST_RESPONSE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: String,
    pub display_name: String,
    pub is_online: bool,
}

/// `USER_LIST_RESPONSE` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponsePayload {
    pub users: Vec<UserSummary>,
}

/// `SEND_PRIVATE_MESSAGE_REQUEST` (client to server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendPrivateMessageRequestPayload {
    pub target_user_id: String,
    pub text: String,
}

/// `NEW_PRIVATE_MESSAGE_NOTIFY` (server to client, sent to both parties).
///
/// `message_id` is absent when the history append failed; the message was
/// still delivered but never made it to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrivateMessageNotifyPayload {
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub receiver_id: String,
    pub text: String,
    pub timestamp: i64,
}

/// `GET_CHAT_HISTORY_REQUEST` (client to server).
///
/// `since_message_id` is accepted for forward compatibility; replays are
/// currently tail-bounded only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetChatHistoryRequestPayload {
    pub chat_id: String,
    #[serde(default)]
    pub limit: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_message_id: Option<String>,
}

/// `CHAT_HISTORY_RESPONSE` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryResponsePayload {
    pub chat_id: String,
    pub messages: Vec<StoredMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

/// `ERROR_NOTIFY` (server to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error_code: String,
    pub error_message: String,
}
