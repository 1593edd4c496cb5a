//! Grouping aggregators.
//!
//! A `GroupAggregator` folds tuples one at a time into per-group accumulators
//! and can re-derive its output tuples at any point. The input flavour
//! (`IntInput`, `StrInput`) decides which `AggOp`s are computable.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tupleflow_core::error::Error as CoreError;
use tupleflow_core::schema::{Schema, SchemaRef, Type};
use tupleflow_core::types::{Tuple, Value};

use crate::stream::MaterializedStream;
use crate::traits::{OpError, Result};

/// Group field value meaning "aggregate everything into one group".
pub const NO_GROUPING: Option<usize> = None;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggOp {
    pub const ALL: [AggOp; 5] = [AggOp::Count, AggOp::Sum, AggOp::Avg, AggOp::Min, AggOp::Max];

    pub fn name(self) -> &'static str {
        match self {
            AggOp::Count => "count",
            AggOp::Sum => "sum",
            AggOp::Avg => "avg",
            AggOp::Min => "min",
            AggOp::Max => "max",
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash key of a group. `Ungrouped` never collides with a real value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Ungrouped,
    /// The tuple's group cell was unset.
    Absent,
    Value(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acc {
    Count(i64),
    Sum(Option<i64>),
    Min(Option<i64>),
    Max(Option<i64>),
    Avg { count: i64, sum: i128 },
}

impl Acc {
    fn empty(op: AggOp) -> Self {
        match op {
            AggOp::Count => Acc::Count(0),
            AggOp::Sum => Acc::Sum(None),
            AggOp::Min => Acc::Min(None),
            AggOp::Max => Acc::Max(None),
            AggOp::Avg => Acc::Avg { count: 0, sum: 0 },
        }
    }

    /// Fold one cell in. `v` is `None` for an unset cell, which only COUNT
    /// sees. State is untouched when this fails.
    fn merge(&mut self, v: Option<i64>) -> Result<()> {
        match (self, v) {
            (Acc::Count(n), _) => *n += 1,
            (_, None) => {}
            (Acc::Sum(s), Some(v)) => {
                *s = Some(match *s {
                    None => v,
                    Some(s) => s
                        .checked_add(v)
                        .ok_or_else(|| OpError::Overflow(format!("sum {s} + {v}")))?,
                });
            }
            (Acc::Min(m), Some(v)) => *m = Some(m.map_or(v, |m| m.min(v))),
            (Acc::Max(m), Some(v)) => *m = Some(m.map_or(v, |m| m.max(v))),
            (Acc::Avg { count, sum }, Some(v)) => {
                *count += 1;
                *sum += i128::from(v);
            }
        }
        Ok(())
    }

    /// `None` when nothing was folded into a non-COUNT accumulator.
    fn value(&self) -> Option<i64> {
        match *self {
            Acc::Count(n) => Some(n),
            Acc::Sum(v) | Acc::Min(v) | Acc::Max(v) => v,
            Acc::Avg { count: 0, .. } => None,
            // the mean of i64s is always an i64; division truncates toward zero
            Acc::Avg { count, sum } => Some((sum / i128::from(count)) as i64),
        }
    }
}

/// Which aggregate operations an input column type supports and how its
/// values feed the arithmetic.
pub trait AggInput {
    const TYPE: Type;

    fn supports(op: AggOp) -> bool;

    fn numeric(v: &Value) -> Result<i64>;
}

#[derive(Debug, Clone, Copy)]
pub struct IntInput;

impl AggInput for IntInput {
    const TYPE: Type = Type::Int;

    fn supports(_op: AggOp) -> bool {
        true
    }

    fn numeric(v: &Value) -> Result<i64> {
        Ok(v.as_int()?)
    }
}

/// String columns can only be counted.
#[derive(Debug, Clone, Copy)]
pub struct StrInput;

impl AggInput for StrInput {
    const TYPE: Type = Type::Str;

    fn supports(op: AggOp) -> bool {
        op == AggOp::Count
    }

    fn numeric(v: &Value) -> Result<i64> {
        Err(OpError::Config(format!(
            "string value {v:?} has no numeric interpretation"
        )))
    }
}

/// Object-safe view of a `GroupAggregator`, used by the Aggregate operator to
/// hold either flavour.
pub trait Aggregator {
    fn op(&self) -> AggOp;

    /// Fold one tuple into its group.
    fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()>;

    /// One tuple per group, shaped by `schema` (`[agg]` or `[group, agg]`).
    fn materialize(&self, schema: &SchemaRef) -> Result<Vec<Tuple>>;

    /// Closed stream over the current groups, with an unnamed schema.
    fn iterator(&self) -> Result<MaterializedStream>;

    fn num_groups(&self) -> usize;

    fn clear(&mut self);
}

pub struct GroupAggregator<I: AggInput> {
    group_field: Option<usize>,
    group_type: Option<Type>,
    agg_field: usize,
    op: AggOp,
    groups: HashMap<GroupKey, Acc>,
    _input: PhantomData<I>,
}

pub type IntegerAggregator = GroupAggregator<IntInput>;
pub type StringAggregator = GroupAggregator<StrInput>;

impl<I: AggInput> GroupAggregator<I> {
    pub fn new(
        group_field: Option<usize>,
        group_type: Option<Type>,
        agg_field: usize,
        op: AggOp,
    ) -> Result<Self> {
        if !I::supports(op) {
            return Err(OpError::Config(format!(
                "{op} is not supported over {} columns",
                I::TYPE
            )));
        }
        if group_field.is_some() != group_type.is_some() {
            return Err(OpError::Config(
                "group field and group type must be given together".into(),
            ));
        }
        Ok(Self {
            group_field,
            group_type,
            agg_field,
            op,
            groups: HashMap::new(),
            _input: PhantomData,
        })
    }

    /// `[Int]` ungrouped, `[group_type, Int]` grouped.
    pub fn schema(&self) -> Schema {
        match self.group_type {
            Some(ty) => Schema::from_types(&[ty, Type::Int]),
            None => Schema::from_types(&[Type::Int]),
        }
    }

    fn key_of(&self, tuple: &Tuple) -> Result<GroupKey> {
        let Some(idx) = self.group_field else {
            return Ok(GroupKey::Ungrouped);
        };
        if idx >= tuple.len() {
            return Err(out_of_range("group", idx, tuple));
        }
        Ok(tuple
            .get(idx)
            .cloned()
            .map_or(GroupKey::Absent, GroupKey::Value))
    }
}

fn out_of_range(what: &str, idx: usize, tuple: &Tuple) -> OpError {
    OpError::Core(CoreError::Schema(format!(
        "{what} field {idx} out of range for a tuple of {} fields",
        tuple.len()
    )))
}

impl<I: AggInput> Aggregator for GroupAggregator<I> {
    fn op(&self) -> AggOp {
        self.op
    }

    fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()> {
        if self.agg_field >= tuple.len() {
            return Err(out_of_range("aggregate", self.agg_field, tuple));
        }
        let key = self.key_of(tuple)?;
        let v = match (self.op, tuple.get(self.agg_field)) {
            (AggOp::Count, _) | (_, None) => None,
            (_, Some(v)) => Some(I::numeric(v)?),
        };
        let op = self.op;
        let acc = self.groups.entry(key).or_insert_with(|| Acc::empty(op));
        let mut next = *acc;
        next.merge(v)?;
        *acc = next;
        Ok(())
    }

    fn materialize(&self, schema: &SchemaRef) -> Result<Vec<Tuple>> {
        let agg_idx = usize::from(self.group_field.is_some());
        let mut out = Vec::with_capacity(self.groups.len());
        for (key, acc) in &self.groups {
            let mut t = Tuple::new(SchemaRef::clone(schema));
            if let GroupKey::Value(v) = key {
                t.set(0, v.clone())?;
            }
            if let Some(v) = acc.value() {
                t.set(agg_idx, Value::Int(v))?;
            }
            out.push(t);
        }
        Ok(out)
    }

    fn iterator(&self) -> Result<MaterializedStream> {
        let schema = self.schema().into_ref();
        let tuples = self.materialize(&schema)?;
        Ok(MaterializedStream::new(schema, tuples))
    }

    fn num_groups(&self) -> usize {
        self.groups.len()
    }

    fn clear(&mut self) {
        self.groups.clear();
    }
}

/// Pick the aggregator flavour for an aggregate column of type `agg_type`.
pub fn aggregator_for(
    agg_type: Type,
    group_field: Option<usize>,
    group_type: Option<Type>,
    agg_field: usize,
    op: AggOp,
) -> Result<Box<dyn Aggregator>> {
    Ok(match agg_type {
        Type::Int => Box::new(IntegerAggregator::new(group_field, group_type, agg_field, op)?),
        Type::Str => Box::new(StringAggregator::new(group_field, group_type, agg_field, op)?),
    })
}
