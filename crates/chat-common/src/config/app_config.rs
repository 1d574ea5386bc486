//! Application configuration structs
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Durable state locations
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// JSON document mapping username to user record
    pub users_file: PathBuf,
    /// Directory of per-chat `<chat_id>.jsonl` logs
    pub history_dir: PathBuf,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users_data.json")
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("./chat_history")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            storage: StorageConfig {
                users_file: default_users_file(),
                history_dir: default_history_dir(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Every field has a default; only malformed values are an error.
    ///
    /// # Errors
    /// Returns an error if an environment variable is set to an unparsable value
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let port = match env::var("CHAT_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAT_PORT", raw))?,
            Err(_) => default_port(),
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("CHAT_HOST").unwrap_or_else(|_| default_host()),
                port,
            },
            storage: StorageConfig {
                users_file: env::var("CHAT_USERS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_users_file()),
                history_dir: env::var("CHAT_HISTORY_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_history_dir()),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
