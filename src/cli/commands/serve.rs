//! Serve command implementation.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::{self, AppState};

/// Execute the serve command.
///
/// Blocks until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the address cannot be bound.
pub fn execute(config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run_server(config))
}

async fn run_server(config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    let addr = listener.local_addr()?;
    info!(addr = %addr, backend = store.backend(), "listening");

    http::serve(listener, AppState::new(store), http::wait_for_shutdown_signal())
        .await
        .context("Server error")?;
    info!("server stopped");
    Ok(())
}
