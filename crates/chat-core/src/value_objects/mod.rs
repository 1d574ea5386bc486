//! Value objects

mod chat_id;

pub use chat_id::{can_access, private_chat_id, GLOBAL_CHAT_ID};
