//! Values, comparison operators and tuples.
//!
//! `Value` is a closed variant; every comparison or aggregate site matches it
//! exhaustively. A tuple cell that was never set is "absent" and never
//! satisfies a comparison.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{SchemaRef, Type, STRING_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    /// String value, truncated to `STRING_LEN` bytes on a char boundary.
    pub fn str(s: impl Into<String>) -> Self {
        let mut s = s.into();
        if s.len() > STRING_LEN {
            let mut cut = STRING_LEN;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            s.truncate(cut);
        }
        Value::Str(s)
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Str(_) => Type::Str,
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Str(_) => Err(Error::Type {
                expected: Type::Int.name(),
                found: Type::Str.name(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            Value::Int(_) => Err(Error::Type {
                expected: Type::Str.name(),
                found: Type::Int.name(),
            }),
        }
    }

    /// Ordering between two values of the same variant; `None` across variants.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// `self op other`. Values of different variants never compare true.
    pub fn compare(&self, op: CmpOp, other: &Value) -> bool {
        self.partial_cmp_value(other)
            .map(|ord| op.holds(ord))
            .unwrap_or(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Equals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    NotEquals,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [
        CmpOp::Equals,
        CmpOp::LessThan,
        CmpOp::LessThanOrEq,
        CmpOp::GreaterThan,
        CmpOp::GreaterThanOrEq,
        CmpOp::NotEquals,
    ];

    /// Whether `lhs op rhs` holds given `lhs.cmp(rhs)`.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Equals => ord == Ordering::Equal,
            CmpOp::LessThan => ord == Ordering::Less,
            CmpOp::LessThanOrEq => ord != Ordering::Greater,
            CmpOp::GreaterThan => ord == Ordering::Greater,
            CmpOp::GreaterThanOrEq => ord != Ordering::Less,
            CmpOp::NotEquals => ord != Ordering::Equal,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Equals => "=",
            CmpOp::LessThan => "<",
            CmpOp::LessThanOrEq => "<=",
            CmpOp::GreaterThan => ">",
            CmpOp::GreaterThanOrEq => ">=",
            CmpOp::NotEquals => "<>",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Where a stored tuple came from. Operators carry it but never read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page: usize,
    pub slot: usize,
}

/// One record conforming to `schema`. Cells start absent and are set in place.
///
/// Equality and hashing look at the schema's types and the cells only; the
/// record id is provenance and is ignored.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: SchemaRef,
    cells: Vec<Option<Value>>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(schema: SchemaRef) -> Self {
        let cells = vec![None; schema.num_fields()];
        Self {
            schema,
            cells,
            record_id: None,
        }
    }

    /// Fully populated tuple. Arity and types are checked against `schema`.
    pub fn from_values(schema: SchemaRef, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.num_fields() {
            return Err(Error::Schema(format!(
                "tuple has {} values, schema has {} fields",
                values.len(),
                schema.num_fields()
            )));
        }
        let mut tuple = Tuple::new(schema);
        for (i, v) in values.into_iter().enumerate() {
            tuple.set(i, v)?;
        }
        Ok(tuple)
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Re-describe this tuple under a type-equal schema (e.g. one with
    /// qualified names).
    pub fn with_schema(mut self, schema: SchemaRef) -> Result<Self> {
        if *schema != *self.schema {
            return Err(Error::Schema(format!(
                "cannot rebind tuple of ({}) to ({})",
                self.schema, schema
            )));
        }
        self.schema = schema;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at `idx`; `None` when out of range or never set.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.cells.get(idx).and_then(Option::as_ref)
    }

    /// Type-checked store. Strings longer than `STRING_LEN` bytes are
    /// truncated, including ones built directly as `Value::Str`.
    pub fn set(&mut self, idx: usize, value: Value) -> Result<()> {
        let expected = self.schema.field_type(idx)?;
        let value = match value {
            Value::Str(s) => Value::str(s),
            v => v,
        };
        if value.ty() != expected {
            return Err(Error::Type {
                expected: expected.name(),
                found: value.ty().name(),
            });
        }
        self.cells[idx] = Some(value);
        Ok(())
    }

    pub fn cells(&self) -> &[Option<Value>] {
        &self.cells
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Left cells followed by right cells, under the already merged `schema`.
    pub fn concat(left: &Tuple, right: &Tuple, schema: &SchemaRef) -> Tuple {
        let mut cells = Vec::with_capacity(left.len() + right.len());
        cells.extend_from_slice(&left.cells);
        cells.extend_from_slice(&right.cells);
        debug_assert_eq!(cells.len(), schema.num_fields());
        Tuple {
            schema: SchemaRef::clone(schema),
            cells,
            record_id: None,
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells && self.schema == other.schema
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cells.hash(state);
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            match cell {
                Some(v) => write!(f, "{v}")?,
                None => f.write_str("null")?,
            }
        }
        Ok(())
    }
}
