//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server and handlers produce:
//!     → logging (leveled records → bounded queue → writer task → sink file)
//!     → metrics.rs (counters, gauges)
//!
//! Fallback / out-of-band:
//!     → console.rs (tracing on stderr: startup, reload, dropped records)
//! ```
//!
//! # Design Decisions
//! - Log calls never block the caller; overload drops records
//! - Level gating reads the live config snapshot on every call
//! - Metrics are cheap (atomic increments)

pub mod console;
pub mod logging;
pub mod metrics;

pub use logging::{Level, LogPipeline, Logger};
