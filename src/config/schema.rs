//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for (de)serialization from the TOML file,
//! and every field has a default so that a partial file is still valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::observability::logging::Level;

/// Port used when the config file does not name one.
pub const DEFAULT_PORT: u16 = 9001;

/// Name of the application directory under `~/.config`.
pub const APP_DIR: &str = "hyperatomic";

/// On-disk layout of the config file.
///
/// All settings live under a top-level `[hyperatomic]` table so the file can
/// be shared with other tools.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub hyperatomic: ServiceConfig,
}

/// Root configuration for the daemon.
///
/// Published as an immutable snapshot through
/// [`ConfigHandle`](crate::config::ConfigHandle).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Log level, sink and reload settings.
    pub logging: LoggingConfig,

    /// Listener settings.
    pub tcp: TcpConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
}

impl ServiceConfig {
    /// Minimum severity the log pipeline should emit.
    ///
    /// `None` when `log_level` is not a recognized level, in which case every
    /// record is emitted.
    pub fn log_threshold(&self) -> Option<Level> {
        self.logging.log_level.parse().ok()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error). Case-insensitive.
    pub log_level: String,

    /// File the log pipeline appends to.
    pub log_file: PathBuf,

    /// Watch the config file and publish changes without a restart.
    pub live_reload: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: default_log_file(),
            live_reload: false,
        }
    }
}

/// TCP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TcpConfig {
    /// Port to listen on, on all interfaces.
    pub port: u16,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve a Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// `~/.config/hyperatomic`, or a relative `hyperatomic` directory when the
/// home directory cannot be determined.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
}

fn default_log_file() -> PathBuf {
    app_dir().join("hyperatomic.log")
}
