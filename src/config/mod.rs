//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, created with defaults on first run)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → provider.rs publishes it via ConfigHandle
//!
//! On file change (live_reload) or SIGHUP:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ServiceConfig>
//!     → next log call observes the new level
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listen port and log file are bound at startup; only the log level
//!   takes effect live

pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use provider::ConfigHandle;
pub use schema::{LoggingConfig, MetricsConfig, ServiceConfig, TcpConfig};
pub use watcher::ConfigWatcher;
