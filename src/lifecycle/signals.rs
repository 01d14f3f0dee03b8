//! OS signal handling.
//!
//! - SIGINT / SIGTERM trigger graceful shutdown
//! - SIGHUP forces every source to reload, stale or not

use std::sync::Arc;

use crate::lifecycle::Shutdown;
use crate::server::ConfigServer;

/// Wait for Ctrl+C (or SIGTERM on unix), then trigger `shutdown`.
pub async fn shutdown_on_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

/// Force a reload of every source each time SIGHUP arrives.
#[cfg(unix)]
pub async fn reload_on_hangup(server: Arc<ConfigServer>, shutdown: Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(sig) => sig,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };
    let mut stop = shutdown.subscribe();

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    return;
                }
                tracing::info!("SIGHUP received, reloading sources");
                let server = server.clone();
                match tokio::task::spawn_blocking(move || server.force_reload()).await {
                    Ok(report) => tracing::info!(?report, "Forced reload finished"),
                    Err(e) => tracing::error!(error = %e, "Forced reload task failed"),
                }
            }
            _ = stop.recv() => return,
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(_server: Arc<ConfigServer>, _shutdown: Shutdown) {}
