//! [`SerialCounter`]: monotonic source of candidate serial numbers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out unique, strictly increasing serial numbers.
///
/// Passed explicitly into every candidate-construction path. A bulk run
/// shares one counter across workers; tests create their own to get
/// deterministic numbering.
#[derive(Debug, Default)]
pub struct SerialCounter {
    next: AtomicU64,
}

impl SerialCounter {
    /// Counter whose first issued number is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Issue the next serial number.
    pub fn next_serial(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The number the next call to [`next_serial`](Self::next_serial) returns.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Move the counter to `next`. Used to continue numbering after a
    /// resumed run.
    pub fn reset(&self, next: u64) {
        self.next.store(next, Ordering::Relaxed);
    }
}
