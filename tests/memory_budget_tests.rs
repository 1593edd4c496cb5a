//! Memory budget enforcement tests

mod test_data_gen;

use std::sync::Arc;
use std::thread;

use test_data_gen::{int_pair_schema, int_rows, int_stream, sorted_ints};
use tupleflow::{
    collect_all, BlockBuffer, CmpOp, ExecConfig, Join, JoinPredicate, JoinStrategy,
    MemoryPageStore, OpError, SeqScan, SharedBudget, TupleStream, TxnId,
};
use tupleflow_core::budget::{BudgetGuard, MemoryBudget};
use tupleflow_core::config::MAX_JOIN_BUFFER_BYTES;

#[test]
fn test_budget_acquire_release() {
    let budget = SharedBudget::new(1024 * 1024); // 1MB

    assert_eq!(budget.used_bytes(), 0);

    let guard = budget
        .try_acquire(100 * 1024, "test")
        .expect("Acquire failed");
    assert_eq!(budget.used_bytes(), 100 * 1024);
    assert_eq!(guard.bytes(), 100 * 1024);
    assert_eq!(guard.tag(), "test");

    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_budget_exhaustion() {
    let budget = SharedBudget::new(500 * 1024);

    let guard1 = budget
        .try_acquire(400 * 1024, "test")
        .expect("First acquire failed");

    // 600KB total would exceed the cap
    assert!(budget.try_acquire(200 * 1024, "test").is_none());
    assert!(budget.reserve(200 * 1024, "test").is_err());
    assert_eq!(budget.used_bytes(), 400 * 1024);

    drop(guard1);
    let guard2 = budget
        .try_acquire(200 * 1024, "test")
        .expect("Acquire after release failed");
    assert_eq!(budget.used_bytes(), 200 * 1024);
    drop(guard2);
}

#[test]
fn test_budget_concurrent_access() {
    let budget = SharedBudget::new(1024 * 1024);
    let mut handles = vec![];

    for _ in 0..10 {
        let budget = budget.clone();
        handles.push(thread::spawn(move || {
            if let Some(guard) = budget.try_acquire(50 * 1024, "test") {
                thread::sleep(std::time::Duration::from_millis(10));
                assert_eq!(guard.bytes(), 50 * 1024);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(budget.used_bytes(), 0);
    assert!(budget.peak_bytes() <= 1024 * 1024);
    let full = budget
        .try_acquire(1024 * 1024, "test")
        .expect("Should be able to acquire full budget");
    drop(full);
}

#[test]
fn test_block_buffers_share_one_budget() {
    let budget = SharedBudget::new(128);
    let left: BlockBuffer<u64> = BlockBuffer::new(&budget, 64, 16, "left").unwrap();
    let right: BlockBuffer<u64> = BlockBuffer::new(&budget, 64, 16, "right").unwrap();
    assert_eq!(left.capacity(), 4);
    assert_eq!(budget.used_bytes(), 128);

    let third = BlockBuffer::<u64>::new(&budget, 64, 16, "third");
    assert!(matches!(
        third,
        Err(tupleflow_mem::Error::BudgetExceeded { .. })
    ));

    drop(left);
    drop(right);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_block_join_peak_rows_stay_within_block() {
    let left_rows: Vec<(i64, i64)> = (0..23).map(|i| (i % 5, i)).collect();
    let right_rows: Vec<(i64, i64)> = (0..17).map(|i| (i % 5, i)).collect();

    // 16-byte rows: 5 per block
    let cfg = ExecConfig::default().with_join_buffer_bytes(80);
    let mut join = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &left_rows),
        int_stream(["c", "d"], &right_rows),
        &cfg,
    )
    .unwrap();
    assert_eq!(join.strategy(), JoinStrategy::BlockNestedLoop);
    join.open().unwrap();
    let rows = collect_all(&mut join).unwrap();

    let stats = *join.block_stats().expect("block join stats");
    assert_eq!(stats.left_block_rows, 5);
    assert_eq!(stats.right_block_rows, 5);
    assert!(stats.peak_left_rows <= 5);
    assert!(stats.peak_right_rows <= 5);
    assert_eq!(stats.left_blocks, 5); // ceil(23 / 5)
    assert_eq!(stats.right_scans, stats.left_blocks);
    assert_eq!(stats.right_blocks, 5 * 4); // ceil(17 / 5) per scan

    assert!(join.budget().peak_bytes() <= 2 * 80);
    assert_eq!(join.budget().used_bytes(), 0);

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["left_blocks"], 5);

    // same multiset as the unbounded strategy
    let mut nl = Join::new(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &left_rows),
        int_stream(["c", "d"], &right_rows),
    )
    .unwrap()
    .with_strategy(JoinStrategy::NestedLoop);
    nl.open().unwrap();
    assert_eq!(sorted_ints(&rows), sorted_ints(&collect_all(&mut nl).unwrap()));
}

#[test]
fn test_block_join_rescans_right_pages_once_per_left_block() {
    let store = Arc::new(MemoryPageStore::new(3));
    let schema = int_pair_schema("id", "val");
    let left = store.create_table("orders", schema.clone()).unwrap();
    let right = store.create_table("users", schema.clone()).unwrap();
    store
        .insert_all(left, int_rows(&schema, &(0..10).map(|i| (i, i)).collect::<Vec<(i64, i64)>>()))
        .unwrap();
    store
        .insert_all(right, int_rows(&schema, &(0..7).map(|i| (i, i)).collect::<Vec<(i64, i64)>>()))
        .unwrap();

    let txn = TxnId::new(1);
    let cfg = ExecConfig::default().with_join_buffer_bytes(16 * 4);
    let mut join = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        SeqScan::new(store.clone(), txn, left, "o").unwrap().boxed(),
        SeqScan::new(store.clone(), txn, right, "u").unwrap().boxed(),
        &cfg,
    )
    .unwrap();
    join.open().unwrap();
    assert_eq!(collect_all(&mut join).unwrap().len(), 7);

    let stats = join.block_stats().copied().unwrap();
    assert_eq!(stats.left_blocks, 3); // ceil(10 / 4)
    // left: 4 pages read once; right: 3 pages per left block
    assert_eq!(store.page_reads(left), 4);
    assert_eq!(store.page_reads(right), 3 * 3);
}

#[test]
fn test_block_smaller_than_a_row_is_config_error() {
    let cfg = ExecConfig::default().with_join_buffer_bytes(10);
    let mut join = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &[(1, 1)]),
        int_stream(["c", "d"], &[(1, 1)]),
        &cfg,
    )
    .unwrap();
    assert!(matches!(join.open(), Err(OpError::Config(_))));
    assert_eq!(join.budget().used_bytes(), 0);

    // other strategies do not buffer through the block budget
    join.set_strategy(JoinStrategy::Hash);
    join.open().unwrap();
    assert_eq!(collect_all(&mut join).unwrap().len(), 1);
}

#[test]
fn test_zero_buffer_config_is_rejected() {
    let cfg = ExecConfig::default().with_join_buffer_bytes(0);
    let res = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &[]),
        int_stream(["c", "d"], &[]),
        &cfg,
    );
    assert!(matches!(res, Err(OpError::Core(_))));
}

#[test]
fn test_large_buffer_join_opens_without_preallocating() {
    let cfg = ExecConfig::default().with_join_buffer_bytes(MAX_JOIN_BUFFER_BYTES);
    let mut join = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &[(1, 1)]),
        int_stream(["c", "d"], &[(1, 2)]),
        &cfg,
    )
    .unwrap();
    join.open().unwrap();
    assert_eq!(
        sorted_ints(&collect_all(&mut join).unwrap()),
        vec![vec![Some(1), Some(1), Some(1), Some(2)]]
    );
    let stats = join.block_stats().copied().unwrap();
    assert_eq!(stats.left_block_rows, MAX_JOIN_BUFFER_BYTES / 16);
    assert_eq!(stats.peak_left_rows, 1);
}

#[test]
fn test_unbounded_buffer_request_is_rejected() {
    let cfg = ExecConfig::default().with_join_buffer_bytes(usize::MAX / 4);
    let res = Join::with_config(
        JoinPredicate::new(0, CmpOp::Equals, 0),
        int_stream(["a", "b"], &[(1, 1)]),
        int_stream(["c", "d"], &[(1, 2)]),
        &cfg,
    );
    assert!(matches!(res, Err(OpError::Core(_))));
}
