//! Atomically published configuration snapshot.
//!
//! [`ConfigHandle`] is the single owner of the "current" configuration. It is
//! cloned into every subsystem that needs it; readers call
//! [`ConfigHandle::current`] on each use so a reload becomes visible without
//! restarting anything. Writers replace the whole snapshot, never a field.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::ServiceConfig;

/// Shared, lock-free accessor for the current [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<ServiceConfig>>,
}

impl ConfigHandle {
    /// Publish `initial` as the first snapshot.
    pub fn new(initial: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The snapshot that is current right now.
    ///
    /// The returned value never changes; call again to observe a reload.
    pub fn current(&self) -> Arc<ServiceConfig> {
        self.inner.load_full()
    }

    /// Replace the current snapshot wholesale. Returns the previous one.
    pub fn publish(&self, next: impl Into<Arc<ServiceConfig>>) -> Arc<ServiceConfig> {
        self.inner.swap(next.into())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}
