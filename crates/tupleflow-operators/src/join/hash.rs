//! In-memory hash join for equality predicates.
//!
//! Builds a table over the whole left side keyed by the join value, then
//! streams the right side through it. Memory is unbounded.

use std::collections::HashMap;

use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::{CmpOp, Tuple, Value};

use super::predicate::JoinPredicate;
use crate::traits::{OpError, Result, TupleStream};

pub(crate) fn join(
    predicate: &JoinPredicate,
    left: &mut dyn TupleStream,
    right: &mut dyn TupleStream,
    schema: &SchemaRef,
) -> Result<Vec<Tuple>> {
    if predicate.op() != CmpOp::Equals {
        return Err(OpError::Config(format!(
            "hash join only supports equality predicates, got '{}'",
            predicate.op()
        )));
    }

    let mut table: HashMap<Value, Vec<Tuple>> = HashMap::new();
    left.rewind()?;
    while left.has_next()? {
        let l = left.next()?;
        // absent keys can never be probed
        if let Some(key) = l.get(predicate.left_field()).cloned() {
            table.entry(key).or_default().push(l);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(buckets = table.len(), "hash join build side ready");

    let mut out = Vec::new();
    if table.is_empty() {
        return Ok(out);
    }
    right.rewind()?;
    while right.has_next()? {
        let r = right.next()?;
        let Some(bucket) = r.get(predicate.right_field()).and_then(|k| table.get(k)) else {
            continue;
        };
        for l in bucket {
            out.push(Tuple::concat(l, &r, schema));
        }
    }
    Ok(out)
}
