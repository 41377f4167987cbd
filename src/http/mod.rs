//! JSON HTTP access layer.
//!
//! Thin handlers over an injected [`IssueStore`]; every request runs inside
//! an `http.request` span.

pub mod error;
pub mod handlers;
mod request_tracing;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::get;
use schoolfix_lib::IssueStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use error::ApiError;

/// Request bodies above this size are rejected.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IssueStore>,
    /// Cancelled when the server begins shutting down; ends open event streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/issues",
            get(handlers::list_issues)
                .post(handlers::create_issue)
                .put(handlers::update_issue)
                .delete(handlers::delete_issue),
        )
        .route("/api/issues/events", get(handlers::issue_events))
        .route("/api/stats", get(handlers::get_stats))
        .layer(from_fn(request_tracing::request_tracing_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve until `shutdown_signal` resolves, then drain in-flight requests.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown_signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = state.shutdown.clone();
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            info!("shutdown requested, draining connections");
            token.cancel();
        })
        .await
}

/// Resolves on SIGTERM or SIGINT (Ctrl-C elsewhere).
///
/// Never resolves if no signal handler can be installed.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "unix signal handlers unavailable, falling back to ctrl-c");
                settle_ctrl_c(tokio::signal::ctrl_c().await).await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        settle_ctrl_c(tokio::signal::ctrl_c().await).await;
    }
}

/// A failed Ctrl-C registration waits forever instead of shutting down.
async fn settle_ctrl_c(result: std::io::Result<()>) {
    if let Err(e) = result {
        error!(error = %e, "failed to listen for ctrl-c; stop the server with SIGKILL");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ctrl_c_registration_failure_keeps_serving() {
        let failed = std::io::Error::other("no signal driver");
        let waited = tokio::time::timeout(Duration::from_millis(50), settle_ctrl_c(Err(failed))).await;
        assert!(waited.is_err(), "shutdown must not be triggered by a registration failure");
    }

    #[tokio::test]
    async fn test_ctrl_c_delivery_resolves() {
        let waited = tokio::time::timeout(Duration::from_millis(50), settle_ctrl_c(Ok(()))).await;
        assert!(waited.is_ok());
    }
}
