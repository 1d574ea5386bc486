//! Server binary: installs tracing, reads the environment, and serves the
//! chat gateway until the process is stopped.

use std::process::ExitCode;

use chat_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    if try_init_tracing().is_err() {
        eprintln!("tracing subscriber was already installed, keeping the existing one");
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Refusing to start with a bad configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        address = %config.server.address(),
        users_file = %config.storage.users_file.display(),
        history_dir = %config.storage.history_dir.display(),
        "Starting chat gateway"
    );

    match chat_gateway::server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway exited with an error");
            ExitCode::FAILURE
        }
    }
}
