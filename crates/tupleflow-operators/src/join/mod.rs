//! Join operator.
//!
//! The join result is computed eagerly when the operator is opened, using one
//! of four strategies (block-nested-loop unless configured otherwise), and is
//! then replayed from a `MaterializedStream`. Output tuples are the left tuple
//! followed by the right tuple; equi-join columns are not de-duplicated.
//!
//! All strategies produce the same multiset of tuples. Output order is not
//! part of the contract.

mod block_nested;
mod hash;
mod merge;
mod nested_loop;
mod predicate;

pub use block_nested::BlockJoinStats;
pub use predicate::JoinPredicate;

use tupleflow_core::config::{ExecConfig, JoinStrategy};
use tupleflow_core::error::Error as CoreError;
use tupleflow_core::schema::{Schema, SchemaRef};
use tupleflow_core::types::Tuple;
use tupleflow_mem::SharedBudget;

use crate::stream::MaterializedStream;
use crate::traits::{BoxedStream, OpError, Operator, Result, TupleStream};

pub struct Join {
    predicate: JoinPredicate,
    left: BoxedStream,
    right: BoxedStream,
    schema: SchemaRef,
    strategy: JoinStrategy,
    buffer_bytes: usize,
    budget: SharedBudget,
    result: Option<MaterializedStream>,
    block_stats: Option<BlockJoinStats>,
}

impl Join {
    /// Join with the default configuration.
    pub fn new(predicate: JoinPredicate, left: BoxedStream, right: BoxedStream) -> Result<Self> {
        Self::with_config(predicate, left, right, &ExecConfig::default())
    }

    pub fn with_config(
        predicate: JoinPredicate,
        left: BoxedStream,
        right: BoxedStream,
        cfg: &ExecConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        check_fields(&predicate, left.schema(), right.schema())?;
        let schema = Schema::merge(left.schema(), right.schema()).into_ref();
        Ok(Self {
            predicate,
            left,
            right,
            schema,
            strategy: cfg.join_strategy,
            buffer_bytes: cfg.join_buffer_bytes,
            // Both blocks are sized from the full buffer, so two of them can
            // be live at once.
            budget: SharedBudget::new(cfg.join_buffer_bytes.saturating_mul(2)),
            result: None,
            block_stats: None,
        })
    }

    /// Use `strategy` from the next `open`/`rewind` on.
    pub fn with_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn set_strategy(&mut self, strategy: JoinStrategy) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> JoinStrategy {
        self.strategy
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Name of the left join field as the left child reports it (qualified
    /// when the child is an aliased scan).
    pub fn left_field_name(&self) -> Option<&str> {
        self.left
            .schema()
            .field_name(self.predicate.left_field())
            .ok()
            .flatten()
    }

    pub fn right_field_name(&self) -> Option<&str> {
        self.right
            .schema()
            .field_name(self.predicate.right_field())
            .ok()
            .flatten()
    }

    /// Buffer statistics of the last block-nested-loop computation.
    pub fn block_stats(&self) -> Option<&BlockJoinStats> {
        self.block_stats.as_ref()
    }

    pub fn budget(&self) -> &SharedBudget {
        &self.budget
    }

    fn compute(&mut self) -> Result<Vec<Tuple>> {
        let left = self.left.as_mut();
        let right = self.right.as_mut();
        match self.strategy {
            JoinStrategy::NestedLoop => nested_loop::join(&self.predicate, left, right, &self.schema),
            JoinStrategy::BlockNestedLoop => {
                let (tuples, stats) = block_nested::join(
                    &self.predicate,
                    left,
                    right,
                    &self.schema,
                    &self.budget,
                    self.buffer_bytes,
                )?;
                self.block_stats = Some(stats);
                Ok(tuples)
            }
            JoinStrategy::SortMerge => merge::join(&self.predicate, left, right, &self.schema),
            JoinStrategy::Hash => hash::join(&self.predicate, left, right, &self.schema),
        }
    }

    /// Compute the result with the children already open. On failure the
    /// whole operator is closed; there are no partial results.
    fn materialize(&mut self) -> Result<()> {
        let tuples = match self.compute() {
            Ok(tuples) => tuples,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            strategy = %self.strategy,
            predicate = %self.predicate,
            rows = tuples.len(),
            "join materialized"
        );

        let mut result = MaterializedStream::new(SchemaRef::clone(&self.schema), tuples);
        result.open()?;
        self.result = Some(result);
        Ok(())
    }

    fn result_mut(&mut self) -> Result<&mut MaterializedStream> {
        self.result.as_mut().ok_or_else(|| OpError::not_open("join"))
    }
}

fn check_fields(predicate: &JoinPredicate, left: &Schema, right: &Schema) -> Result<()> {
    left.field_type(predicate.left_field())
        .and_then(|_| right.field_type(predicate.right_field()))
        .map(|_| ())
        .map_err(|e| OpError::Core(CoreError::Schema(format!("join predicate {predicate}: {e}"))))
}

impl TupleStream for Join {
    fn open(&mut self) -> Result<()> {
        if self.result.is_some() {
            return Err(OpError::already_open("join"));
        }
        self.left.open()?;
        if let Err(e) = self.right.open() {
            self.left.close();
            return Err(e);
        }
        self.materialize()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.result_mut()?.has_next()
    }

    fn next(&mut self) -> Result<Tuple> {
        self.result_mut()?.next()
    }

    /// Rewinds both children and recomputes the join.
    fn rewind(&mut self) -> Result<()> {
        self.result_mut()?;
        let rewound = self.left.rewind().and_then(|_| self.right.rewind());
        if let Err(e) = rewound {
            self.close();
            return Err(e);
        }
        self.result = None;
        self.materialize()
    }

    fn close(&mut self) {
        self.result = None;
        self.left.close();
        self.right.close();
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

impl Operator for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn children(&self) -> Vec<&dyn TupleStream> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedStream>) -> Result<()> {
        if self.result.is_some() {
            return Err(OpError::Usage("cannot rebind children of an open join".into()));
        }
        let [left, right]: [BoxedStream; 2] = children
            .try_into()
            .map_err(|c: Vec<BoxedStream>| OpError::Usage(format!("join takes 2 children, got {}", c.len())))?;
        check_fields(&self.predicate, left.schema(), right.schema())?;
        self.schema = Schema::merge(left.schema(), right.schema()).into_ref();
        self.left = left;
        self.right = right;
        Ok(())
    }
}
