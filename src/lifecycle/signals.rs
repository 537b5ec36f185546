//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//! - Trigger appropriate actions (shutdown, reload)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown, whether or not
//!   `live_reload` is enabled

use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::config::ConfigHandle;
use crate::lifecycle::shutdown::Shutdown;

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
}

#[cfg(unix)]
async fn reload_on_hangup(path: PathBuf, config: ConfigHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return std::future::pending().await;
        }
    };

    while hangup.recv().await.is_some() {
        tracing::info!("SIGHUP received, reloading configuration");
        if let Err(e) = crate::config::watcher::reload(&path, &config) {
            tracing::error!(
                error = %e,
                "Failed to reload config. Keeping current configuration."
            );
        }
    }
}

/// Spawn the task that turns OS signals into shutdown and reload events.
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    config_path: PathBuf,
    config: ConfigHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let hangup = reload_on_hangup(config_path, config);

        #[cfg(not(unix))]
        let hangup = {
            let _ = (config_path, config);
            std::future::pending::<()>()
        };

        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
            _ = hangup => {}
        }
    })
}
