//! Wire protocol definitions
//!
//! Defines the text-frame envelope, the closed set of message tags, typed
//! payloads, and wire error codes.

mod error_codes;
mod messages;
mod payloads;

pub use error_codes::ErrorCode;
pub use messages::{MessageKind, WireMessage};
pub use payloads::{
    BroadcastTextPayload, ChatHistoryResponsePayload, ErrorPayload, GetChatHistoryRequestPayload,
    LoginRequestPayload, LoginResponsePayload, NewPrivateMessageNotifyPayload,
    RegisterRequestPayload, RegisterResponsePayload, SendPrivateMessageRequestPayload,
    TextMessagePayload, UserListResponsePayload, UserSummary,
};
