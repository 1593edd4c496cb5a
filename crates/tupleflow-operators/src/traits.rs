//! Tuple stream protocol + operator error type.
//!
//! Every leaf scan and every operator is a pull stream: the consumer opens it,
//! alternates `has_next`/`next` until exhaustion, and closes it. Operators
//! additionally expose their children so a tree can be inspected and rebound.

use thiserror::Error;
use tupleflow_core::error::Error as CoreError;
use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::Tuple;
use tupleflow_mem::Error as MemError;

#[derive(Debug, Error)]
pub enum OpError {
    /// Protocol violation: use before `open`, after `close`, double `open`.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("no such element: stream is exhausted")]
    NoSuchElement,

    /// Operator configured with something it cannot compute.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Core(#[from] CoreError),

    /// Raised by the page store; passed through unchanged.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("memory budget error: {0}")]
    Budget(MemError),
}

impl From<MemError> for OpError {
    fn from(e: MemError) -> Self {
        match e {
            // A block that cannot hold a single row is a sizing mistake, not
            // a transient shortage.
            MemError::RowTooWide { .. } => OpError::Config(e.to_string()),
            other => OpError::Budget(other),
        }
    }
}

impl OpError {
    pub(crate) fn not_open(op: &str) -> Self {
        OpError::Usage(format!("{op} is not open"))
    }

    pub(crate) fn already_open(op: &str) -> Self {
        OpError::Usage(format!("{op} is already open"))
    }
}

pub type Result<T> = std::result::Result<T, OpError>;

/// Pull-based tuple stream.
///
/// Invariants:
/// - `schema` is callable at any time, including before `open`.
/// - `has_next` does not consume; repeated calls return the same answer until
///   `next` is called.
/// - `next` on an exhausted stream fails with `OpError::NoSuchElement`.
/// - every method except `schema` and `close` fails with `OpError::Usage` on a
///   stream that is not open, and `open` fails on a stream that already is.
/// - `close` never fails and may be called on a closed stream.
pub trait TupleStream {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    /// Restart from the first tuple. Equivalent to `close` + `open`.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    fn schema(&self) -> &SchemaRef;

    fn boxed(self) -> BoxedStream
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxedStream = Box<dyn TupleStream>;

impl<S: TupleStream + ?Sized> TupleStream for Box<S> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }
    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }
    fn next(&mut self) -> Result<Tuple> {
        (**self).next()
    }
    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }
    fn close(&mut self) {
        (**self).close()
    }
    fn schema(&self) -> &SchemaRef {
        (**self).schema()
    }
}

/// A stream with child streams.
pub trait Operator: TupleStream {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    fn children(&self) -> Vec<&dyn TupleStream>;

    /// Replace the children. Only allowed while the operator is closed.
    fn set_children(&mut self, children: Vec<BoxedStream>) -> Result<()>;
}
