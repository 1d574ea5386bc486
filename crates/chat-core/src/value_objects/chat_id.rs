//! Chat identifiers
//!
//! A chat is either the well-known global channel or a canonical private
//! channel derived from an unordered pair of user identifiers.

use crate::error::DomainError;

/// The well-known identifier of the global broadcast channel
pub const GLOBAL_CHAT_ID: &str = "global_broadcast";

/// Prefix of every private channel identifier
const PRIVATE_PREFIX: &str = "private:";

/// Derive the canonical chat identifier for a pair of users.
///
/// The two identifiers are sorted lexicographically, so the result is stable
/// under argument swap. Empty identifiers are rejected.
///
/// # Errors
/// Returns [`DomainError::EmptyUserId`] if either identifier is empty.
pub fn private_chat_id(a: &str, b: &str) -> Result<String, DomainError> {
    if a.is_empty() || b.is_empty() {
        return Err(DomainError::EmptyUserId);
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Ok(format!("{PRIVATE_PREFIX}{lo}:{hi}"))
}

/// Check whether a user may read the history of a chat.
///
/// The global channel is readable by every authenticated user; a private
/// channel only by its two named members. Anything else is denied.
#[must_use]
pub fn can_access(chat_id: &str, user_id: &str) -> bool {
    if chat_id == GLOBAL_CHAT_ID {
        return true;
    }
    let Some(pair) = chat_id.strip_prefix(PRIVATE_PREFIX) else {
        return false;
    };
    match pair.split_once(':') {
        Some((lo, hi)) => lo == user_id || hi == user_id,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_symmetric() {
        let ab = private_chat_id("user-a", "user-b").unwrap();
        let ba = private_chat_id("user-b", "user-a").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab, "private:user-a:user-b");
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert_eq!(private_chat_id("", "b"), Err(DomainError::EmptyUserId));
        assert_eq!(private_chat_id("a", ""), Err(DomainError::EmptyUserId));
    }

    #[test]
    fn test_global_channel_open_to_all() {
        assert!(can_access(GLOBAL_CHAT_ID, "anyone"));
    }

    #[test]
    fn test_private_channel_members_only() {
        let chat = private_chat_id("alice", "bob").unwrap();
        assert!(can_access(&chat, "alice"));
        assert!(can_access(&chat, "bob"));
        assert!(!can_access(&chat, "carol"));
    }

    #[test]
    fn test_unrecognized_chat_denied() {
        assert!(!can_access("group:alice:bob", "alice"));
        assert!(!can_access("private:", "alice"));
        assert!(!can_access("", "alice"));
    }
}
