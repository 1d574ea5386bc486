//! Gateway server setup
//!
//! Provides the router, state assembly, and the main run loop.

mod handler;
mod state;

pub use handler::ws_handler;
pub use state::GatewayState;

use std::sync::Arc;

use axum::{routing::get, Router};
use chat_common::{AppConfig, AppError};
use chat_store::{HistoryStore, UserStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::hub::Hub;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let users = Arc::new(UserStore::load(&config.storage.users_file));

    let history = Arc::new(
        HistoryStore::new(&config.storage.history_dir)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?,
    );

    let hub = Hub::new();
    hub.start();

    Ok(GatewayState::new(users, history, hub, config))
}

/// Run the gateway server on an already-bound listener
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Listener has no local address: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let address = config.server.address();

    // Create gateway state
    let state = create_gateway_state(config).await?;

    // Build application
    let app = create_app(state);

    // Bind and serve
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {address}: {e}")))?;

    run_server(app, listener).await
}
