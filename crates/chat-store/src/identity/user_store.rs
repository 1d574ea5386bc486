//! Durable username-to-credential store
//!
//! The whole store is a single JSON document mapping username to user
//! record, rewritten atomically on each registration. Writes are rare and
//! reads are served from memory after the initial load, so the document is
//! kept small enough to rewrite wholesale.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chat_common::auth::{hash_password, verify_password};
use chat_core::User;
use thiserror::Error;
use tracing::{info, warn};

/// Errors produced by registration and authentication
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("username, password and display name must not be empty")]
    EmptyField,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("failed to hash password")]
    HashingFailed,

    #[error("failed to persist user store: {0}")]
    PersistFailed(#[source] io::Error),

    #[error("user not found")]
    NotFound,

    #[error("invalid password")]
    Mismatch,

    #[error("failed to verify password")]
    VerifyError,
}

/// In-memory user map with a durable JSON file behind it.
///
/// One read-write lock covers both the map and the file: writers hold it
/// across the in-memory mutation and the file rewrite, readers only touch
/// the map.
pub struct UserStore {
    path: PathBuf,
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    /// Load the store from `path`.
    ///
    /// A missing or empty file is an empty store. A malformed file also
    /// yields an empty store with a warning; the bad file is left in place
    /// and only overwritten by the next successful registration.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = match fs::read(&path) {
            Ok(data) if data.is_empty() => {
                info!(path = %path.display(), "User data file is empty, starting fresh");
                HashMap::new()
            }
            Ok(data) => match serde_json::from_slice::<HashMap<String, User>>(&data) {
                Ok(users) => {
                    info!(path = %path.display(), count = users.len(), "Loaded user store");
                    users
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "User data file is malformed, starting with an empty store"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "User data file not found, it will be created on first registration"
                );
                HashMap::new()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not read user data file, starting with an empty store"
                );
                HashMap::new()
            }
        };

        Self {
            path,
            users: RwLock::new(users),
        }
    }

    /// Register a new user.
    ///
    /// The record is inserted in memory and the whole document is rewritten
    /// to disk before returning; a failed rewrite rolls the insert back.
    ///
    /// # Errors
    /// `EmptyField` if any argument is empty, `UsernameTaken` if the
    /// username exists, `HashingFailed` or `PersistFailed` on the respective
    /// stages.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, IdentityError> {
        if username.is_empty() || password.is_empty() || display_name.is_empty() {
            return Err(IdentityError::EmptyField);
        }

        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());

        if users.contains_key(username) {
            return Err(IdentityError::UsernameTaken);
        }

        let password_hash = hash_password(password).map_err(|e| {
            warn!(username = %username, error = %e, "Password hashing failed");
            IdentityError::HashingFailed
        })?;

        let user = User::new(username, password_hash, display_name);
        users.insert(username.to_string(), user.clone());

        if let Err(e) = self.persist(&users) {
            warn!(
                username = %username,
                error = %e,
                "User registered in memory but persisting failed, rolling back"
            );
            users.remove(username);
            return Err(IdentityError::PersistFailed(e));
        }

        info!(username = %username, user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verify a username/password pair.
    ///
    /// # Errors
    /// `NotFound` for an unknown username, `Mismatch` for a wrong password,
    /// `VerifyError` if the stored verifier cannot be checked.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, IdentityError> {
        let user = {
            let users = self.users.read().unwrap_or_else(|e| e.into_inner());
            users.get(username).cloned().ok_or(IdentityError::NotFound)?
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(IdentityError::Mismatch),
            Err(e) => {
                warn!(username = %username, error = %e, "Password verification failed");
                Err(IdentityError::VerifyError)
            }
        }
    }

    /// Look up a user by identifier
    pub fn find_by_id(&self, user_id: &str) -> Option<User> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users.values().find(|u| u.id == user_id).cloned()
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store has no users
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the whole document atomically: write a sibling temp file,
    /// flush it to stable storage, then rename over the target.
    fn persist(&self, users: &HashMap<String, User>) -> io::Result<()> {
        let data = serde_json::to_vec_pretty(users)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = tmp_path(&self.path);
        {
            let mut file = fs::File::create(&tmp)?;
            io::Write::write_all(&mut file, &data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("path", &self.path)
            .field("users", &self.len())
            .finish()
    }
}
