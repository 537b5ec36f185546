//! Configuration file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::{load_config, ConfigError};
use crate::config::provider::ConfigHandle;
use crate::config::schema::ServiceConfig;
use crate::lifecycle::ShutdownSignal;

/// Editors often emit several events per save; wait this long and coalesce.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// A watcher that monitors the configuration file for changes and publishes
/// every successfully loaded version to a [`ConfigHandle`].
pub struct ConfigWatcher {
    path: PathBuf,
    handle: ConfigHandle,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher for `path`.
    pub fn new(path: &Path, handle: ConfigHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            handle,
        }
    }

    /// Start watching the file in a background task.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors which save by renaming a temp file over the original are
    /// still noticed. The task stops when `shutdown` fires.
    pub fn spawn(self, mut shutdown: ShutdownSignal) -> Result<JoinHandle<()>, notify::Error> {
        let (change_tx, mut change_rx) = mpsc::unbounded_channel();
        let file_name: Option<OsString> = self.path.file_name().map(OsString::from);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if relevant && ours {
                        let _ = change_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let watch_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");

        let Self { path, handle } = self;
        Ok(tokio::spawn(async move {
            // Dropping the watcher unregisters it; keep it for the task's lifetime.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    changed = change_rx.recv() => {
                        if changed.is_none() {
                            break;
                        }
                        tokio::time::sleep(SETTLE_DELAY).await;
                        while change_rx.try_recv().is_ok() {}

                        tracing::info!("Config file change detected, reloading...");
                        if let Err(e) = reload(&path, &handle) {
                            tracing::error!(
                                error = %e,
                                "Failed to reload config. Keeping current configuration."
                            );
                        }
                    }
                }
            }
            tracing::info!("Config watcher stopped");
        }))
    }
}

/// Load `path` and publish it as the current snapshot.
///
/// On failure the current snapshot is left in place.
pub fn reload(path: &Path, handle: &ConfigHandle) -> Result<Arc<ServiceConfig>, ConfigError> {
    let current = Arc::new(load_config(path)?);
    let previous = handle.publish(Arc::clone(&current));

    warn_restart_required(&previous, &current);
    tracing::info!(
        log_level = %current.logging.log_level,
        "Config reloaded successfully"
    );
    Ok(current)
}

/// Some settings are bound at startup; a reload records them but cannot
/// apply them.
fn warn_restart_required(previous: &ServiceConfig, current: &ServiceConfig) {
    if previous.tcp.port != current.tcp.port {
        tracing::warn!(
            from = previous.tcp.port,
            to = current.tcp.port,
            "tcp.port changed; restart to rebind"
        );
    }
    if previous.logging.log_file != current.logging.log_file {
        tracing::warn!(
            from = %previous.logging.log_file.display(),
            to = %current.logging.log_file.display(),
            "logging.log_file changed; restart to reopen the sink"
        );
    }
    if previous.metrics != current.metrics {
        tracing::warn!("metrics settings changed; restart to apply");
    }
}
