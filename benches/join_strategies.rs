use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tupleflow::{
    collect_all, AggOp, Aggregate, CmpOp, ExecConfig, Join, JoinPredicate, JoinStrategy,
    MaterializedStream, Schema, SchemaRef, Tuple, TupleStream, Type, Value, NO_GROUPING,
};

fn make_stream(rows: usize, keys: i64) -> MaterializedStream {
    let schema: SchemaRef = Schema::with_names(&[Type::Int, Type::Int], &["k", "v"]).into_ref();
    let tuples = (0..rows as i64)
        .map(|i| {
            Tuple::from_values(schema.clone(), vec![Value::Int(i % keys), Value::Int(i)]).unwrap()
        })
        .collect();
    MaterializedStream::new(schema, tuples)
}

fn bench_join_strategies(c: &mut Criterion) {
    let left = make_stream(512, 64);
    let right = make_stream(512, 64);
    let mut group = c.benchmark_group("equi_join_512x512");
    for strategy in JoinStrategy::ALL {
        let cfg = ExecConfig::from_env().with_join_strategy(strategy);
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &cfg, |b, cfg| {
            b.iter(|| {
                let mut join = Join::with_config(
                    JoinPredicate::new(0, CmpOp::Equals, 0),
                    left.clone().boxed(),
                    right.clone().boxed(),
                    cfg,
                )
                .unwrap();
                join.open().unwrap();
                collect_all(&mut join).unwrap().len()
            })
        });
    }
    group.finish();
}

fn bench_grouped_aggregate(c: &mut Criterion) {
    let input = make_stream(4096, 128);
    c.bench_function("grouped_avg_4096", |b| {
        b.iter(|| {
            let mut agg = Aggregate::new(input.clone().boxed(), 1, Some(0), AggOp::Avg).unwrap();
            agg.open().unwrap();
            collect_all(&mut agg).unwrap().len()
        })
    });
    c.bench_function("ungrouped_sum_4096", |b| {
        b.iter(|| {
            let mut agg = Aggregate::new(input.clone().boxed(), 1, NO_GROUPING, AggOp::Sum).unwrap();
            agg.open().unwrap();
            collect_all(&mut agg).unwrap().len()
        })
    });
}

criterion_group!(operators, bench_join_strategies, bench_grouped_aggregate);
criterion_main!(operators);
