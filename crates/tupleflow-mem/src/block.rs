//! Bounded row buffer for block-at-a-time algorithms.
//!
//! The row capacity is fixed at construction from a byte budget and a row
//! width, and the matching bytes are reserved from a `SharedBudget` for the
//! lifetime of the buffer. The row vector itself grows on demand up to that
//! capacity. `reset` empties the live region without giving the allocation
//! back, so a buffer is reused across blocks.

use tupleflow_core::budget::BudgetGuard;

use crate::error::{Error, Result};
use crate::guard::{Reservation, SharedBudget};
use crate::tracking::PeakTracker;

pub struct BlockBuffer<T> {
    rows: Vec<T>,
    capacity: usize,
    reservation: Reservation,
    peak: PeakTracker,
    tag: &'static str,
}

impl<T> BlockBuffer<T> {
    /// Rows of `row_bytes` that fit in `block_bytes`. Zero-width rows count
    /// as one byte.
    pub fn rows_for(block_bytes: usize, row_bytes: usize) -> usize {
        block_bytes / row_bytes.max(1)
    }

    /// Reserve `rows_for(block_bytes, row_bytes)` rows worth of bytes.
    pub fn new(
        budget: &SharedBudget,
        block_bytes: usize,
        row_bytes: usize,
        tag: &'static str,
    ) -> Result<Self> {
        let capacity = Self::rows_for(block_bytes, row_bytes);
        if capacity == 0 {
            return Err(Error::RowTooWide {
                tag,
                budget: block_bytes,
                row_bytes,
            });
        }
        let reservation = budget.reserve(capacity * row_bytes.max(1), tag)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(tag, capacity, row_bytes, "block buffer reserved");

        Ok(Self {
            rows: Vec::new(),
            capacity,
            reservation,
            peak: PeakTracker::new(),
            tag,
        })
    }

    /// Append a row. Returns `true` once the block is full.
    pub fn push(&mut self, row: T) -> Result<bool> {
        if self.is_full() {
            return Err(Error::BlockFull {
                tag: self.tag,
                capacity: self.capacity,
            });
        }
        self.rows.push(row);
        self.peak.record(self.rows.len());
        Ok(self.is_full())
    }

    /// Live rows of the current block.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every live row; the next block starts from slot 0.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// Most rows ever live at once.
    pub fn peak_rows(&self) -> usize {
        self.peak.peak()
    }

    pub fn reserved_bytes(&self) -> usize {
        self.reservation.bytes()
    }
}
