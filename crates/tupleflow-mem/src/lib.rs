#![forbid(unsafe_code)]
//! tupleflow-mem: hard memory budgeting and bounded block buffers.
//!
//! This crate provides the concrete implementation of the interfaces defined
//! in `tupleflow-core::budget`. Operators that buffer rows (the block join)
//! reserve through here so the configured byte ceiling is enforced with RAII
//! reservations.

pub mod block;
pub mod error;
pub mod guard;
pub mod tracking;

pub use block::BlockBuffer;
pub use error::{Error, Result};
pub use guard::{Reservation, SharedBudget};
pub use tracking::PeakTracker;
