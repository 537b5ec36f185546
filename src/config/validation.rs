//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port valid, sink path present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - An unrecognized log level is accepted: the pipeline emits everything
//!   rather than silently suppressing records

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tcp.port must be between 1 and 65535")]
    PortZero,

    #[error("logging.log_file must not be empty")]
    EmptyLogFile,

    #[error("metrics.address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration before it is accepted into the system.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tcp.port == 0 {
        errors.push(ValidationError::PortZero);
    }

    if config.logging.log_file.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyLogFile);
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(config.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
