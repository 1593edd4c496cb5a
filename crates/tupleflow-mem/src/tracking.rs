//! Lightweight high-water-mark tracking.
//!
//! Used for reserved bytes on a budget and for live rows in a block buffer.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak: AtomicUsize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak: AtomicUsize::new(0),
        }
    }

    /// Record a current level; raises the peak if higher.
    pub fn record(&self, level: usize) {
        let mut cur = self.peak.load(Ordering::Relaxed);
        while level > cur {
            match self
                .peak
                .compare_exchange(cur, level, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}
