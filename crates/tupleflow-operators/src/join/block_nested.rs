//! Block-nested-loop join with a fixed byte budget per side.
//!
//! Each side's block holds `buffer_bytes / row_width` tuples, computed from
//! that side's own row width. The left child is consumed one block at a time;
//! for every left block the right child is rewound and streamed through its
//! own block buffer, and each full (or final partial) right block is compared
//! against the whole left block. At most two blocks are live at once.

use serde::Serialize;
use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::Tuple;
use tupleflow_mem::{BlockBuffer, SharedBudget};

use super::predicate::JoinPredicate;
use crate::traits::{Result, TupleStream};

/// What a block-nested-loop run did with its buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockJoinStats {
    /// Block capacity (rows) of each side.
    pub left_block_rows: usize,
    pub right_block_rows: usize,
    /// Most rows ever live in each block.
    pub peak_left_rows: usize,
    pub peak_right_rows: usize,
    pub left_blocks: usize,
    pub right_blocks: usize,
    /// Full passes over the right child.
    pub right_scans: usize,
}

struct BlockJoin<'a> {
    predicate: &'a JoinPredicate,
    schema: &'a SchemaRef,
    left_block: BlockBuffer<Tuple>,
    right_block: BlockBuffer<Tuple>,
    out: Vec<Tuple>,
    stats: BlockJoinStats,
}

pub(crate) fn join(
    predicate: &JoinPredicate,
    left: &mut dyn TupleStream,
    right: &mut dyn TupleStream,
    schema: &SchemaRef,
    budget: &SharedBudget,
    buffer_bytes: usize,
) -> Result<(Vec<Tuple>, BlockJoinStats)> {
    let left_block = BlockBuffer::new(
        budget,
        buffer_bytes,
        left.schema().byte_size(),
        "join_left_block",
    )?;
    let right_block = BlockBuffer::new(
        budget,
        buffer_bytes,
        right.schema().byte_size(),
        "join_right_block",
    )?;

    let mut run = BlockJoin {
        predicate,
        schema,
        stats: BlockJoinStats {
            left_block_rows: left_block.capacity(),
            right_block_rows: right_block.capacity(),
            ..BlockJoinStats::default()
        },
        left_block,
        right_block,
        out: Vec::new(),
    };

    left.rewind()?;
    while left.has_next()? {
        if run.left_block.push(left.next()?)? {
            run.drain_right(right)?;
        }
    }
    if !run.left_block.is_empty() {
        run.drain_right(right)?;
    }

    run.stats.peak_left_rows = run.left_block.peak_rows();
    run.stats.peak_right_rows = run.right_block.peak_rows();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        left_blocks = run.stats.left_blocks,
        right_blocks = run.stats.right_blocks,
        peak_left = run.stats.peak_left_rows,
        peak_right = run.stats.peak_right_rows,
        budget_peak_bytes = budget.peak_bytes(),
        "block nested loop join finished"
    );

    Ok((run.out, run.stats))
}

impl BlockJoin<'_> {
    /// Stream the whole right child against the current left block, then
    /// empty the left block.
    fn drain_right(&mut self, right: &mut dyn TupleStream) -> Result<()> {
        self.stats.left_blocks += 1;
        self.stats.right_scans += 1;
        right.rewind()?;
        while right.has_next()? {
            if self.right_block.push(right.next()?)? {
                self.join_blocks();
            }
        }
        if !self.right_block.is_empty() {
            self.join_blocks();
        }
        self.left_block.reset();
        Ok(())
    }

    /// Compare every live left row with every live right row, then empty the
    /// right block.
    fn join_blocks(&mut self) {
        self.stats.right_blocks += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            left_rows = self.left_block.len(),
            right_rows = self.right_block.len(),
            left_block = self.stats.left_blocks,
            "joining block pair"
        );

        for l in self.left_block.rows() {
            for r in self.right_block.rows() {
                if self.predicate.matches(l, r) {
                    self.out.push(Tuple::concat(l, r, self.schema));
                }
            }
        }
        self.right_block.reset();
    }
}
