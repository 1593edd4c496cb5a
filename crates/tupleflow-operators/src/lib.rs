#![forbid(unsafe_code)]
//! tupleflow-operators: the pull-based tuple stream protocol, a paged
//! sequential scan, and the Join and Aggregate operators.
//!
//! Operators own their children as `BoxedStream`s and compute their whole
//! result when opened.

pub mod aggregate;
pub mod join;
pub mod scan;
pub mod source;
pub mod stream;
pub mod traits;

pub use aggregate::{AggOp, Aggregate, NO_GROUPING};
pub use join::{BlockJoinStats, Join, JoinPredicate};
pub use scan::SeqScan;
pub use source::{MemoryPageStore, PageStore};
pub use stream::{collect_all, MaterializedStream};
pub use traits::{BoxedStream, OpError, Operator, Result, TupleStream};
