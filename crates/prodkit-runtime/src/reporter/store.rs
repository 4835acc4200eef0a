//! Latest-snapshot store.
//!
//! Readers take the shared lock and clone; the single writer takes the
//! exclusive lock only to swap in a freshly sampled block.

use std::sync::Arc;

use parking_lot::RwLock;

use prodkit_core::{MemStats, RuntimeStats, Stats};

/// Cloneable read handle onto a reporter's snapshot.
#[derive(Clone, Default)]
pub struct StatsHandle {
    inner: Arc<RwLock<Stats>>,
}

impl StatsHandle {
    pub(crate) fn new(stats: Stats) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stats)),
        }
    }

    /// Owned copy of the latest snapshot.
    pub fn get(&self) -> Stats {
        self.inner.read().clone()
    }

    /// Replace the dynamic fields as one unit.
    pub(crate) fn replace(&self, runtime: RuntimeStats, mem: MemStats) {
        let mut guard = self.inner.write();
        guard.runtime = runtime;
        guard.mem = mem;
    }
}
