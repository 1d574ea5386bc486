//! Gateway state
//!
//! Shared dependencies for the gateway, constructed explicitly at startup
//! and threaded into the router. There are no process-wide singletons; this
//! removes init-order coupling and eases testing.

use std::sync::Arc;

use chat_common::AppConfig;
use chat_store::{HistoryStore, UserStore};

use crate::hub::Hub;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    users: Arc<UserStore>,
    history: Arc<HistoryStore>,
    hub: Arc<Hub>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        users: Arc<UserStore>,
        history: Arc<HistoryStore>,
        hub: Arc<Hub>,
        config: AppConfig,
    ) -> Self {
        Self {
            users,
            history,
            hub,
            config: Arc::new(config),
        }
    }

    /// The identity store
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// The history store
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The session hub
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("users", &self.users)
            .field("history", &self.history)
            .finish()
    }
}
