//! Aggregate operator: drains its child into a grouping aggregator on `open`
//! and replays the per-group results.

mod aggregator;

pub use aggregator::{
    aggregator_for, AggInput, AggOp, Aggregator, GroupAggregator, GroupKey, IntInput,
    IntegerAggregator, StrInput, StringAggregator, NO_GROUPING,
};

use tupleflow_core::schema::{Field, Schema, SchemaRef, Type};
use tupleflow_core::types::Tuple;

use crate::stream::MaterializedStream;
use crate::traits::{BoxedStream, OpError, Operator, Result, TupleStream};

pub struct Aggregate {
    child: BoxedStream,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    schema: SchemaRef,
    aggregator: Option<Box<dyn Aggregator>>,
    result: Option<MaterializedStream>,
}

impl Aggregate {
    /// Fails with a configuration error when `op` cannot be computed over the
    /// aggregate field's type, and with a schema error on a bad field index.
    pub fn new(
        child: BoxedStream,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> Result<Self> {
        let schema = output_schema(child.schema(), agg_field, group_field, op)?;
        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            schema,
            aggregator: None,
            result: None,
        })
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn group_field_name(&self) -> Option<&str> {
        let idx = self.group_field?;
        self.child.schema().field_name(idx).ok().flatten()
    }

    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    pub fn aggregate_field_name(&self) -> Option<&str> {
        self.child.schema().field_name(self.agg_field).ok().flatten()
    }

    pub fn aggregate_op(&self) -> AggOp {
        self.op
    }

    pub fn name_of_op(op: AggOp) -> &'static str {
        op.name()
    }

    fn fresh_aggregator(&self) -> Result<Box<dyn Aggregator>> {
        let child = self.child.schema();
        let group_type = self
            .group_field
            .map(|i| child.field_type(i))
            .transpose()?;
        aggregator_for(
            child.field_type(self.agg_field)?,
            self.group_field,
            group_type,
            self.agg_field,
            self.op,
        )
    }

    fn drain_child(&mut self) -> Result<Box<dyn Aggregator>> {
        let mut agg = self.fresh_aggregator()?;
        while self.child.has_next()? {
            let t = self.child.next()?;
            agg.merge_tuple_into_group(&t)?;
        }
        Ok(agg)
    }

    fn replay(&mut self) -> Result<()> {
        let agg = self
            .aggregator
            .as_ref()
            .ok_or_else(|| OpError::not_open("aggregate"))?;
        let mut result = MaterializedStream::new(
            SchemaRef::clone(&self.schema),
            agg.materialize(&self.schema)?,
        );
        result.open()?;
        self.result = Some(result);
        Ok(())
    }

    fn result_mut(&mut self) -> Result<&mut MaterializedStream> {
        self.result
            .as_mut()
            .ok_or_else(|| OpError::not_open("aggregate"))
    }
}

/// `[agg]` or `[group, agg]`; names come from the child, the aggregate column
/// is always Int.
fn output_schema(
    child: &Schema,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
) -> Result<SchemaRef> {
    let agg_type = child.field_type(agg_field)?;
    let group_type = group_field.map(|i| child.field_type(i)).transpose()?;
    // rejects kinds the column type cannot compute before anything is opened
    aggregator_for(agg_type, group_field, group_type, agg_field, op)?;

    let named = |idx: usize, ty: Type| -> Result<Field> {
        Ok(match child.field_name(idx)? {
            Some(name) => Field::new(name, ty),
            None => Field::unnamed(ty),
        })
    };
    let mut fields = Vec::with_capacity(2);
    if let (Some(idx), Some(ty)) = (group_field, group_type) {
        fields.push(named(idx, ty)?);
    }
    fields.push(named(agg_field, Type::Int)?);
    Ok(Schema::new(fields).into_ref())
}

impl TupleStream for Aggregate {
    fn open(&mut self) -> Result<()> {
        if self.result.is_some() {
            return Err(OpError::already_open("aggregate"));
        }
        self.child.open()?;
        let agg = match self.drain_child() {
            Ok(agg) => agg,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(op = %self.op, groups = agg.num_groups(), "aggregate materialized");

        self.aggregator = Some(agg);
        if let Err(e) = self.replay() {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.result_mut()?.has_next()
    }

    fn next(&mut self) -> Result<Tuple> {
        self.result_mut()?.next()
    }

    /// Re-derives the groups from the state built at `open`; the child is not
    /// read again.
    fn rewind(&mut self) -> Result<()> {
        self.result_mut()?;
        self.replay()
    }

    fn close(&mut self) {
        self.result = None;
        self.aggregator = None;
        self.child.close();
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

impl Operator for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn children(&self) -> Vec<&dyn TupleStream> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedStream>) -> Result<()> {
        if self.result.is_some() {
            return Err(OpError::Usage(
                "cannot rebind the child of an open aggregate".into(),
            ));
        }
        let [child]: [BoxedStream; 1] = children.try_into().map_err(|c: Vec<BoxedStream>| {
            OpError::Usage(format!("aggregate takes 1 child, got {}", c.len()))
        })?;
        self.schema = output_schema(child.schema(), self.agg_field, self.group_field, self.op)?;
        self.child = child;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::collect_all;
    use tupleflow_core::types::Value;

    fn people() -> BoxedStream {
        let schema = Schema::with_names(&[Type::Int, Type::Str], &["id", "name"]).into_ref();
        let tuples = [(1, "a"), (1, "b"), (2, "c")]
            .iter()
            .map(|(id, name)| {
                Tuple::from_values(
                    SchemaRef::clone(&schema),
                    vec![Value::Int(*id), Value::str(*name)],
                )
                .unwrap()
            })
            .collect();
        MaterializedStream::new(schema, tuples).boxed()
    }

    fn pairs(rows: Vec<Tuple>) -> Vec<(i64, i64)> {
        let mut out: Vec<_> = rows
            .iter()
            .map(|t| {
                (
                    t.get(0).unwrap().as_int().unwrap(),
                    t.get(1).unwrap().as_int().unwrap(),
                )
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn count_names_grouped_by_id() {
        let mut agg = Aggregate::new(people(), 1, Some(0), AggOp::Count).unwrap();
        agg.open().unwrap();
        assert_eq!(pairs(collect_all(&mut agg).unwrap()), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn schema_takes_names_from_child() {
        let agg = Aggregate::new(people(), 1, Some(0), AggOp::Count).unwrap();
        assert_eq!(agg.schema().num_fields(), 2);
        assert_eq!(agg.schema().field_name(0).unwrap(), Some("id"));
        assert_eq!(agg.schema().field_name(1).unwrap(), Some("name"));
        assert_eq!(agg.schema().field_type(1).unwrap(), Type::Int);
        assert_eq!(agg.group_field_name(), Some("id"));
        assert_eq!(agg.aggregate_field_name(), Some("name"));
        assert_eq!(Aggregate::name_of_op(agg.aggregate_op()), "count");

        let ungrouped = Aggregate::new(people(), 0, NO_GROUPING, AggOp::Sum).unwrap();
        assert_eq!(ungrouped.schema().num_fields(), 1);
        assert_eq!(ungrouped.group_field(), None);
        assert_eq!(ungrouped.group_field_name(), None);
    }

    #[test]
    fn string_sum_is_rejected_at_construction() {
        assert!(matches!(
            Aggregate::new(people(), 1, NO_GROUPING, AggOp::Sum),
            Err(OpError::Config(_))
        ));
    }

    #[test]
    fn rewind_replays_without_reading_child() {
        let mut agg = Aggregate::new(people(), 0, NO_GROUPING, AggOp::Max).unwrap();
        agg.open().unwrap();
        let first = collect_all(&mut agg).unwrap();
        agg.rewind().unwrap();
        let second = collect_all(&mut agg).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].get(0), Some(&Value::Int(2)));
    }

    #[test]
    fn reopen_rebuilds_from_scratch() {
        let mut agg = Aggregate::new(people(), 0, NO_GROUPING, AggOp::Sum).unwrap();
        agg.open().unwrap();
        let first = collect_all(&mut agg).unwrap();
        agg.close();
        assert!(matches!(agg.has_next(), Err(OpError::Usage(_))));
        agg.open().unwrap();
        assert_eq!(collect_all(&mut agg).unwrap(), first);
        assert_eq!(first[0].get(0), Some(&Value::Int(4)));
    }

    #[test]
    fn empty_ungrouped_input_has_no_rows() {
        let schema = Schema::from_types(&[Type::Int]).into_ref();
        let child = MaterializedStream::new(schema, Vec::new()).boxed();
        let mut agg = Aggregate::new(child, 0, NO_GROUPING, AggOp::Count).unwrap();
        agg.open().unwrap();
        assert!(!agg.has_next().unwrap());
    }

    #[test]
    fn set_children_requires_closed_and_one_child() {
        let mut agg = Aggregate::new(people(), 0, NO_GROUPING, AggOp::Min).unwrap();
        assert_eq!(agg.children().len(), 1);
        assert!(agg.set_children(vec![people(), people()]).is_err());
        agg.set_children(vec![people()]).unwrap();
        agg.open().unwrap();
        assert!(agg.set_children(vec![people()]).is_err());
    }
}
