//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → server.rs (accept loop, one supervised task per connection)
//!     → connection.rs (id, lifecycle tracking, state machine)
//!     → handler.rs (read line → log → write ACK)
//!
//! Connection States:
//!     Open → Reading ⇄ Acknowledging → Closing
//! ```
//!
//! # Design Decisions
//! - Handlers share nothing mutable except the log pipeline
//! - No read or idle timeouts; a handler ends when its peer does
//! - Lines are capped at `MAX_LINE_BYTES`; an over-long line closes the connection
//! - Accept errors are transient, bind errors are fatal

pub mod connection;
pub mod handler;
pub mod listener;
pub mod server;

pub use handler::{CloseReason, ACK, MAX_LINE_BYTES};
pub use listener::ListenerError;
pub use server::ConnectionServer;
