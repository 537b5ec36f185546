//! Connection identity, state machine and live-handler accounting.
//!
//! Every accepted socket gets a [`ConnectionId`] from the server's
//! [`ConnectionTracker`] and holds a [`ConnectionGuard`] for as long as its
//! handler runs. Ids appear in log records as `conn=<n>`.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::logging::FieldValue;
use crate::observability::metrics;

/// Identifier of one accepted connection, unique per server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConnectionId> for FieldValue {
    fn from(id: ConnectionId) -> Self {
        FieldValue::U64(id.0)
    }
}

/// Per-connection state.
///
/// ```text
/// Open → Reading ⇄ Acknowledging
///           │            │
///           └──▶ Closing ◀┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, nothing read yet.
    Open,
    /// Waiting for the next line.
    Reading,
    /// Writing the acknowledgment for a line.
    Acknowledging,
    /// Terminal: the socket is being released.
    Closing,
}

impl ConnectionState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Open, Reading)
                | (Open, Closing)
                | (Reading, Acknowledging)
                | (Reading, Closing)
                | (Acknowledging, Reading)
                | (Acknowledging, Closing)
        )
    }
}

#[derive(Debug)]
struct Counters {
    next_id: AtomicU64,
    live: AtomicUsize,
}

/// Hands out connection ids and counts handlers that are still running.
///
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    counters: Arc<Counters>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters {
                next_id: AtomicU64::new(1),
                live: AtomicUsize::new(0),
            }),
        }
    }

    /// Register an accepted connection. The returned guard must live as long
    /// as its handler.
    pub fn track(&self) -> ConnectionGuard {
        let id = ConnectionId(self.counters.next_id.fetch_add(1, Ordering::Relaxed));
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        metrics::record_connection_opened();
        ConnectionGuard {
            id,
            counters: Arc::clone(&self.counters),
        }
    }

    /// Handlers that have been tracked and not yet finished.
    pub fn active_count(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Live-handler token. Dropping it, including during unwind, releases the
/// slot.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    counters: Arc<Counters>,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        metrics::record_connection_closed();
    }
}
