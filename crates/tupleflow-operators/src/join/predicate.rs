use std::fmt;

use serde::{Deserialize, Serialize};
use tupleflow_core::types::{CmpOp, Tuple};

/// `left[left_field] op right[right_field]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPredicate {
    left_field: usize,
    op: CmpOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CmpOp, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn left_field(&self) -> usize {
        self.left_field
    }

    pub fn right_field(&self) -> usize {
        self.right_field
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    /// An absent cell on either side never matches.
    pub fn matches(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.get(self.left_field), right.get(self.right_field)) {
            (Some(l), Some(r)) => l.compare(self.op, r),
            _ => false,
        }
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left[{}] {} right[{}]",
            self.left_field, self.op, self.right_field
        )
    }
}
