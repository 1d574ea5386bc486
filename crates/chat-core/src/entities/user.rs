//! User entity - represents a registered account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user as persisted in the identity store.
///
/// The `password_hash` is an argon2 verifier string and is only ever
/// serialized into the identity file; wire payloads use dedicated structs
/// that never carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with a fresh opaque identifier
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            password_hash: password_hash.into(),
            display_name: display_name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_gets_unique_id() {
        let a = User::new("alice", "$argon2id$...", "Alice");
        let b = User::new("alice", "$argon2id$...", "Alice");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36); // UUID format
    }

    #[test]
    fn test_user_roundtrips_through_json() {
        let user = User::new("bob", "$argon2id$...", "Bob");
        let json = serde_json::to_string(&user).unwrap();
        let parsed: User = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn test_user_persists_expected_fields() {
        let user = User::new("carol", "hash", "Carol");
        let json = serde_json::to_string(&user).unwrap();
        for field in ["id", "username", "password_hash", "display_name", "created_at"] {
            assert!(json.contains(field), "missing field {field}");
        }
    }
}
