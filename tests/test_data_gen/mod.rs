//! Test data generation utilities shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tupleflow::{
    BoxedStream, MaterializedStream, MemoryPageStore, Schema, SchemaRef, TableId, Tuple,
    TupleStream, Type, Value,
};

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `(a INT, b INT)` schema with the given field names.
pub fn int_pair_schema(a: &str, b: &str) -> SchemaRef {
    Schema::with_names(&[Type::Int, Type::Int], &[a, b]).into_ref()
}

pub fn int_rows(schema: &SchemaRef, rows: &[(i64, i64)]) -> Vec<Tuple> {
    rows.iter()
        .map(|(a, b)| {
            Tuple::from_values(SchemaRef::clone(schema), vec![Value::Int(*a), Value::Int(*b)])
                .expect("row matches schema")
        })
        .collect()
}

pub fn int_stream(names: [&str; 2], rows: &[(i64, i64)]) -> BoxedStream {
    let schema = int_pair_schema(names[0], names[1]);
    let tuples = int_rows(&schema, rows);
    MaterializedStream::new(schema, tuples).boxed()
}

/// `len` rows whose first column is drawn from `0..key_range`, second column
/// is the row index.
pub fn random_int_rows(rng: &mut impl Rng, len: usize, key_range: i64) -> Vec<(i64, i64)> {
    (0..len)
        .map(|i| (rng.gen_range(0..key_range), i as i64))
        .collect()
}

/// `(key INT, tag STRING)` rows; keys drawn from `0..key_range`.
pub fn random_keyed_strings(
    rng: &mut impl Rng,
    schema: &SchemaRef,
    len: usize,
    key_range: i64,
) -> Vec<Tuple> {
    (0..len)
        .map(|i| {
            Tuple::from_values(
                SchemaRef::clone(schema),
                vec![
                    Value::Int(rng.gen_range(0..key_range)),
                    Value::str(format!("tag-{i}")),
                ],
            )
            .expect("row matches schema")
        })
        .collect()
}

/// Store holding one `(id INT, val INT)` table filled with `rows`.
pub fn store_with_table(
    page_tuples: usize,
    name: &str,
    rows: &[(i64, i64)],
) -> (Arc<MemoryPageStore>, TableId) {
    let store = Arc::new(MemoryPageStore::new(page_tuples));
    let schema = int_pair_schema("id", "val");
    let table = store
        .create_table(name, SchemaRef::clone(&schema))
        .expect("create table");
    store
        .insert_all(table, int_rows(&schema, rows))
        .expect("insert rows");
    (store, table)
}

/// Int cells of a tuple, `None` for unset cells.
pub fn ints(t: &Tuple) -> Vec<Option<i64>> {
    t.cells()
        .iter()
        .map(|c| c.as_ref().map(|v| v.as_int().expect("int cell")))
        .collect()
}

/// Sorted cell vectors, for multiset comparison.
pub fn sorted_ints(tuples: &[Tuple]) -> Vec<Vec<Option<i64>>> {
    let mut out: Vec<_> = tuples.iter().map(ints).collect();
    out.sort();
    out
}
