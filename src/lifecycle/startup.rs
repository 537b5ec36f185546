//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration (creating it on first run)
//! - Initialize subsystems in dependency order
//! - Start background tasks (config watcher, signals, metrics)
//! - Bind the listener and begin accepting traffic
//! - Drain the log pipeline on the way out
//!
//! # Design Decisions
//! - Fail fast: config and bind errors are fatal
//! - Sink, watcher and metrics failures degrade but do not stop startup
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::loader::load_or_init;
use crate::config::{ConfigError, ConfigHandle, ConfigWatcher};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::net::{ConnectionServer, ListenerError};
use crate::observability::metrics;
use crate::observability::LogPipeline;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start server: {0}")]
    Listener(#[from] ListenerError),
}

/// Run the daemon until a shutdown signal arrives.
pub async fn run(config_path: &Path) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    run_until(config_path, shutdown).await
}

/// Run the daemon until `shutdown` is triggered, by a signal or by the caller.
pub async fn run_until(config_path: &Path, shutdown: Shutdown) -> Result<(), StartupError> {
    let config = ConfigHandle::new(load_or_init(config_path)?);
    let snapshot = config.current();

    tracing::info!(
        path = %config_path.display(),
        log_level = %snapshot.logging.log_level,
        log_file = %snapshot.logging.log_file.display(),
        live_reload = snapshot.logging.live_reload,
        port = snapshot.tcp.port,
        "Configuration loaded"
    );

    let watcher = if snapshot.logging.live_reload {
        match ConfigWatcher::new(config_path, config.clone()).spawn(shutdown.subscribe()) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::error!(error = %e, "Failed to watch config file; live reload disabled");
                None
            }
        }
    } else {
        None
    };

    let pipeline = LogPipeline::open(&snapshot.logging.log_file, config.clone()).await;

    if snapshot.metrics.enabled {
        match snapshot.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::warn!(
                        error = %e,
                        "Failed to start metrics endpoint. Metrics disabled."
                    );
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %snapshot.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match ConnectionServer::start(snapshot.tcp.port, pipeline.logger()).await {
        Ok(server) => server,
        Err(e) => {
            pipeline.error("Failed to start server", &[("error", e.to_string().into())]);
            shutdown.trigger();
            if let Some(watcher) = watcher {
                let _ = watcher.await;
            }
            pipeline.close().await;
            return Err(e.into());
        }
    };

    pipeline.info("Server started", &[("port", snapshot.tcp.port.into())]);

    let signals = spawn_signal_handler(shutdown.clone(), config_path.to_path_buf(), config);
    server.run(shutdown.subscribe()).await;

    shutdown.trigger();
    signals.abort();
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }

    pipeline.info("Shutdown complete", &[]);
    pipeline.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
