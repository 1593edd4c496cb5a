//! `SharedBudget` + RAII `Reservation`.
//!
//! A reservation holds bytes against the budget until it is dropped. Clones of
//! a `SharedBudget` share one counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tupleflow_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

struct BudgetState {
    capacity: usize,
    used: AtomicUsize,
    peak: PeakTracker,
}

impl BudgetState {
    fn reserve(&self, bytes: usize) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.peak.record(next);
                return true;
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Byte-capped budget shared by every buffer of one operator.
#[derive(Clone)]
pub struct SharedBudget {
    state: Arc<BudgetState>,
}

impl SharedBudget {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            state: Arc::new(BudgetState {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
                peak: PeakTracker::new(),
            }),
        }
    }

    /// Highest number of bytes reserved at once since creation.
    pub fn peak_bytes(&self) -> usize {
        self.state.peak.peak()
    }

    /// Like `try_acquire`, but reports why the reservation failed.
    pub fn reserve(&self, bytes: usize, tag: &'static str) -> Result<Reservation> {
        self.try_acquire(bytes, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: bytes,
                capacity: self.capacity_bytes(),
                used: self.used_bytes(),
            })
    }
}

impl std::fmt::Debug for SharedBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBudget")
            .field("capacity", &self.state.capacity)
            .field("used", &self.used_bytes())
            .finish()
    }
}

impl MemoryBudget for SharedBudget {
    type Guard = Reservation;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.state.reserve(bytes) {
            #[cfg(feature = "tracing")]
            tracing::debug!(tag, bytes, capacity = self.state.capacity, "reservation refused");
            return None;
        }
        Some(Reservation {
            state: Arc::clone(&self.state),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.state.capacity
    }

    fn used_bytes(&self) -> usize {
        self.state.used.load(Ordering::Relaxed)
    }
}

/// Bytes held against a `SharedBudget`; returned on drop.
pub struct Reservation {
    state: Arc<BudgetState>,
    bytes: usize,
    tag: &'static str,
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("tag", &self.tag)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl BudgetGuard for Reservation {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.state.release(self.bytes);
            self.bytes = 0;
        }
    }
}
