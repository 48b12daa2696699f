//! Monotonic id allocation.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing ids. Seeded with the highest stored id so
/// a restart continues after it. Reserved ids are never returned again,
/// even if the append that reserved them fails.
#[derive(Debug)]
pub struct IdSequence {
    last: AtomicU64,
}

impl IdSequence {
    pub fn starting_after(last_id: u64) -> Self {
        Self {
            last: AtomicU64::new(last_id),
        }
    }

    /// Reserves `n` contiguous ids.
    pub fn reserve(&self, n: u64) -> Range<u64> {
        let prev = self.last.fetch_add(n, Ordering::SeqCst);
        (prev + 1)..(prev + 1 + n)
    }

    /// Last id handed out.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}
