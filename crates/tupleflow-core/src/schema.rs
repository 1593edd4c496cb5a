//! Logical schema types. Pure data.
//!
//! A `Schema` is an ordered list of typed, optionally named fields. Every type
//! has a fixed byte width so row widths are known up front; the join uses
//! them to size its block buffers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum stored length of a string value, in bytes.
pub const STRING_LEN: usize = 128;

/// Shared, immutable schema handle.
pub type SchemaRef = Arc<Schema>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Str,
}

impl Type {
    /// Fixed on-page width of a value of this type.
    pub const fn byte_width(self) -> usize {
        match self {
            Type::Int => 8,
            // length prefix + padded payload
            Type::Str => 4 + STRING_LEN,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Type::Int => "INT",
            Type::Str => "STRING",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: Option<String>,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn unnamed(ty: Type) -> Self {
        Self { name: None, ty }
    }
}

/// Ordered field list. Equality ignores names (see the `PartialEq` impl).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Anonymous schema from a list of types.
    pub fn from_types(types: &[Type]) -> Self {
        Self::new(types.iter().copied().map(Field::unnamed).collect())
    }

    /// Named schema; `names` and `types` are zipped, extra entries are dropped.
    pub fn with_names(types: &[Type], names: &[&str]) -> Self {
        Self::new(
            types
                .iter()
                .zip(names)
                .map(|(ty, name)| Field::new(*name, *ty))
                .collect(),
        )
    }

    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn field_type(&self, idx: usize) -> Result<Type> {
        self.field(idx)
            .map(|f| f.ty)
            .ok_or_else(|| Error::Schema(format!("no field at index {idx}")))
    }

    /// Name of field `idx`; `Ok(None)` for an unnamed field.
    pub fn field_name(&self, idx: usize) -> Result<Option<&str>> {
        self.field(idx)
            .map(|f| f.name.as_deref())
            .ok_or_else(|| Error::Schema(format!("no field at index {idx}")))
    }

    /// Index of the first field called `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| Error::Schema(format!("no field named '{name}'")))
    }

    /// Width in bytes of one row of this schema.
    pub fn byte_size(&self) -> usize {
        self.fields.iter().map(|f| f.ty.byte_width()).sum()
    }

    /// Concatenate two schemas: all of `left`'s fields, then all of `right`'s.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let mut fields = Vec::with_capacity(left.num_fields() + right.num_fields());
        fields.extend_from_slice(&left.fields);
        fields.extend_from_slice(&right.fields);
        Schema { fields }
    }

    /// Copy of this schema with every name rewritten as `prefix.name`.
    ///
    /// Unnamed fields become `prefix.null`.
    pub fn qualified(&self, prefix: &str) -> Schema {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let bare = f.name.as_deref().unwrap_or("null");
                Field::new(format!("{prefix}.{bare}"), f.ty)
            })
            .collect();
        Schema { fields }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.num_fields() == other.num_fields()
            && self.byte_size() == other.byte_size()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.ty == b.ty)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}({})", field.ty, field.name.as_deref().unwrap_or("null"))?;
        }
        Ok(())
    }
}
