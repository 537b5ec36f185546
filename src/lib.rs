//! hyperatomic: line-oriented TCP daemon with a non-blocking log pipeline.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{ConfigHandle, ServiceConfig};
pub use lifecycle::Shutdown;
pub use net::ConnectionServer;
pub use observability::{Level, LogPipeline, Logger};
