//! Process console diagnostics.
//!
//! # Responsibilities
//! - Install the `tracing` subscriber that writes to stderr
//! - Carry diagnostics that must not depend on the log pipeline: startup
//!   failures, config reloads, dropped records, sink write errors
//!
//! # Design Decisions
//! - Level controlled by `RUST_LOG`, default `hyperatomic=info`
//! - stderr keeps console output apart from the stdout fallback sink

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "hyperatomic=info";

/// Install the global console subscriber. Call once, early in `main`.
pub fn init_console() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
