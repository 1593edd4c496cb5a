//! Sort-merge join.
//!
//! Both children are materialized and sorted ascending on their join value.
//! Tuples whose join cell is absent are dropped up front since they can never
//! match. Equality merges equal-key runs with two pointers; range predicates
//! scan the sorted right side from the end that satisfies them and stop at the
//! first miss.

use std::cmp::Ordering;

use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::{CmpOp, Tuple, Value};

use super::predicate::JoinPredicate;
use crate::traits::{Result, TupleStream};

type Keyed = Vec<(Value, Tuple)>;

pub(crate) fn join(
    predicate: &JoinPredicate,
    left: &mut dyn TupleStream,
    right: &mut dyn TupleStream,
    schema: &SchemaRef,
) -> Result<Vec<Tuple>> {
    // Values of different types never compare true, and sorting them together
    // would not respect that.
    let left_ty = left.schema().field_type(predicate.left_field())?;
    let right_ty = right.schema().field_type(predicate.right_field())?;
    if left_ty != right_ty {
        return Ok(Vec::new());
    }

    let l = sorted_run(left, predicate.left_field())?;
    let r = sorted_run(right, predicate.right_field())?;
    let op = predicate.op();
    let mut out = Vec::new();

    match op {
        CmpOp::Equals => merge_equal(&l, &r, schema, &mut out),
        CmpOp::GreaterThan | CmpOp::GreaterThanOrEq => {
            // matches form a prefix of the ascending right side
            for (lk, lt) in &l {
                for (rk, rt) in &r {
                    if !lk.compare(op, rk) {
                        break;
                    }
                    out.push(Tuple::concat(lt, rt, schema));
                }
            }
        }
        CmpOp::LessThan | CmpOp::LessThanOrEq => {
            // matches form a suffix of the ascending right side
            for (lk, lt) in &l {
                for (rk, rt) in r.iter().rev() {
                    if !lk.compare(op, rk) {
                        break;
                    }
                    out.push(Tuple::concat(lt, rt, schema));
                }
            }
        }
        CmpOp::NotEquals => {
            for (lk, lt) in &l {
                let lo = r.partition_point(|(rk, _)| rk < lk);
                let hi = r.partition_point(|(rk, _)| rk <= lk);
                for (_, rt) in r[..lo].iter().chain(&r[hi..]) {
                    out.push(Tuple::concat(lt, rt, schema));
                }
            }
        }
    }
    Ok(out)
}

/// Drain a child into `(join value, tuple)` pairs sorted by value.
fn sorted_run(child: &mut dyn TupleStream, field: usize) -> Result<Keyed> {
    let mut run = Vec::new();
    child.rewind()?;
    while child.has_next()? {
        let t = child.next()?;
        if let Some(key) = t.get(field).cloned() {
            run.push((key, t));
        }
    }
    run.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
    Ok(run)
}

fn merge_equal(l: &Keyed, r: &Keyed, schema: &SchemaRef, out: &mut Vec<Tuple>) {
    let (mut i, mut j) = (0, 0);
    while i < l.len() && j < r.len() {
        match l[i].0.cmp(&r[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let key = &l[i].0;
                let i_end = i + l[i..].iter().take_while(|(k, _)| k == key).count();
                let j_end = j + r[j..].iter().take_while(|(k, _)| k == key).count();
                for (_, lt) in &l[i..i_end] {
                    for (_, rt) in &r[j..j_end] {
                        out.push(Tuple::concat(lt, rt, schema));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
}
