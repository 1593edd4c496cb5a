//! Tuple-at-a-time nested-loop join.
//!
//! The right child is rewound once per left tuple; nothing beyond the current
//! pair is held in memory.

use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::Tuple;

use super::predicate::JoinPredicate;
use crate::traits::{Result, TupleStream};

pub(crate) fn join(
    predicate: &JoinPredicate,
    left: &mut dyn TupleStream,
    right: &mut dyn TupleStream,
    schema: &SchemaRef,
) -> Result<Vec<Tuple>> {
    let mut out = Vec::new();
    left.rewind()?;
    while left.has_next()? {
        let l = left.next()?;
        right.rewind()?;
        while right.has_next()? {
            let r = right.next()?;
            if predicate.matches(&l, &r) {
                out.push(Tuple::concat(&l, &r, schema));
            }
        }
    }
    Ok(out)
}
