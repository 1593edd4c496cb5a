//! Finite, restartable buffered stream.
//!
//! Join and Aggregate compute their whole result at `open` time and replay it
//! through a `MaterializedStream`. Rewinding one only resets the replay
//! cursor. It is also the simplest leaf for driving operators directly.

use tupleflow_core::schema::SchemaRef;
use tupleflow_core::types::Tuple;

use crate::traits::{OpError, Result, TupleStream};

#[derive(Debug, Clone)]
pub struct MaterializedStream {
    schema: SchemaRef,
    tuples: Vec<Tuple>,
    pos: usize,
    open: bool,
}

impl MaterializedStream {
    pub fn new(schema: SchemaRef, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            pos: 0,
            open: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(OpError::not_open("materialized stream"))
        }
    }
}

impl TupleStream for MaterializedStream {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(OpError::already_open("materialized stream"));
        }
        self.open = true;
        self.pos = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.pos < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.ensure_open()?;
        let tuple = self
            .tuples
            .get(self.pos)
            .cloned()
            .ok_or(OpError::NoSuchElement)?;
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Drain an open stream to the end.
pub fn collect_all(stream: &mut dyn TupleStream) -> Result<Vec<Tuple>> {
    let mut out = Vec::new();
    while stream.has_next()? {
        out.push(stream.next()?);
    }
    Ok(out)
}
