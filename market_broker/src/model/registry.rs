//! Count of active buyer connections.
//!
//! The registry is the only shared counter in the broker. It is incremented by the
//! accept loop and decremented once by every buyer session when it ends; the
//! broadcaster and the broker read it to decide whether the market is still open.
//!
//! `decrease` returns the post-decrement value so a session can tell, without a
//! second racy read, whether it was the last buyer to leave.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe count of connected buyers.
#[derive(Debug, Default)]
pub struct Registry {
    count: AtomicUsize,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted buyer and return the new count.
    pub fn increase(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a departed buyer and return the new count.
    ///
    /// Saturates at zero: decreasing an empty registry is a no-op.
    pub fn decrease(&self) -> usize {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Current number of connected buyers.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
