#![forbid(unsafe_code)]
//! tupleflow-core: schemas, values, tuples, IDs and configuration.
//!
//! Pure data; no IO and no operator logic. Everything here is shared by the
//! memory crate and the operator crate.

pub mod budget;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;
