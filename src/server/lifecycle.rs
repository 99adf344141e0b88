//! Server lifecycle: bind, serve, and shut down on a signal.

use snafu::ResultExt;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::error;
use tracing::info;

use super::AppState;
use super::BindSnafu;
use super::ServeSnafu;
use super::ServerError;
use super::router::build_router;
use crate::config::NetworkConfig;

/// Serve HTTP on the configured address until SIGINT or SIGTERM.
///
/// In-flight requests finish before this returns.
pub async fn serve(network: &NetworkConfig, state: AppState) -> Result<(), ServerError> {
    let addr = format!("{}:{}", network.http_bind_addr, network.http_port);
    let listener = TcpListener::bind(&addr).await.context(BindSnafu { addr: addr.clone() })?;
    info!(%addr, max_body_bytes = network.max_body_bytes, "listening");

    let router = build_router(state, network.max_body_bytes);
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await.context(ServeSnafu)?;

    info!("server stopped");
    Ok(())
}

/// Wait for SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            never_fires("Ctrl+C", err).await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => never_fires("SIGTERM", err).await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, shutting down");
        }
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        }
    }
}

/// A signal whose handler could not be installed must not trigger shutdown.
async fn never_fires(signal: &str, err: std::io::Error) {
    error!("failed to install {} handler: {}", signal, err);
    std::future::pending::<()>().await;
}
