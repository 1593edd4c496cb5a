#![forbid(unsafe_code)]
//! tupleflow: a pull-based query execution layer.
//!
//! Flat re-export of `tupleflow-core`, `tupleflow-mem` and
//! `tupleflow-operators` for callers that want a single dependency.

pub use tupleflow_core::prelude::*;
pub use tupleflow_mem::{BlockBuffer, PeakTracker, Reservation, SharedBudget};
pub use tupleflow_operators::{
    collect_all, AggOp, Aggregate, BlockJoinStats, BoxedStream, Join, JoinPredicate,
    MaterializedStream, MemoryPageStore, OpError, Operator, PageStore, SeqScan, TupleStream,
    NO_GROUPING,
};
