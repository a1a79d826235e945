//! # Lock Manager Scenario Tests
//!
//! End-to-end walks through the canonical locking scenarios: grant,
//! conflict and queueing, shared co-holding, release cascade, upgrade
//! under contention, and the one-pending-request rule. Each test drives
//! the public `LockManager` surface against a `FixedBufferPool`.

use std::sync::Arc;

use locktree::types::{PageId, SourceId, TableId, TxnId};
use locktree::{FixedBufferPool, LockAccess, LockManager, LockTarget};

fn setup() -> LockManager {
    let pool = Arc::new(FixedBufferPool::new());
    pool.register_source(SourceId::new(0), PageId::new(1));
    let manager = LockManager::new(pool);
    manager
        .register_table(TableId::new(0), SourceId::new(0))
        .unwrap();
    manager
}

fn table() -> TableId {
    TableId::new(0)
}

#[test]
fn register_then_acquire_shared_on_a_table() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();

    let target = LockTarget::table(table(), LockAccess::Shared);
    let result = manager.acquire_lock(TxnId::new(1), &target).unwrap();
    assert!(!result.blocked);
    assert!(manager.table_has_locks(table()));
}

#[test]
fn incompatible_request_queues_behind_the_holder() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let held = LockTarget::table(table(), LockAccess::IntentExclusive);
    assert!(!manager.acquire_lock(TxnId::new(1), &held).unwrap().blocked);

    // Exclusive is incompatible with an IntentExclusive holder.
    let wanted = LockTarget::table(table(), LockAccess::Exclusive);
    let result = manager.acquire_lock(TxnId::new(2), &wanted).unwrap();
    assert!(result.blocked);
    assert_eq!(manager.pending_transactions(), vec![TxnId::new(2)]);
    assert_eq!(manager.pending_lock(TxnId::new(2)), Some(wanted));
    assert_eq!(manager.holder_count(&wanted), 0);
}

#[test]
fn shared_holders_stack_their_counts() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let target = LockTarget::table(table(), LockAccess::Shared);
    assert!(!manager.acquire_lock(TxnId::new(1), &target).unwrap().blocked);
    assert!(!manager.acquire_lock(TxnId::new(2), &target).unwrap().blocked);
    assert_eq!(manager.holder_count(&target), 2);
}

#[test]
fn row_release_cascades_through_the_registry() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();

    let addr = FixedBufferPool::encode_pointer(PageId::new(6), 128);
    let target = LockTarget::row(table(), addr, LockAccess::Exclusive);
    assert!(!manager.acquire_lock(TxnId::new(1), &target).unwrap().blocked);

    let stats = manager.stats();
    assert_eq!(
        (stats.table_records, stats.page_records, stats.row_records),
        (1, 1, 1)
    );

    manager.release_lock(TxnId::new(1), &target).unwrap();
    let stats = manager.stats();
    assert_eq!(
        (stats.table_records, stats.page_records, stats.row_records),
        (1, 0, 0)
    );
    assert_eq!(stats.held_total, 0);
    assert!(!manager.table_has_locks(table()));
}

#[test]
fn upgrade_from_shared_to_exclusive_under_contention() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let shared = LockTarget::table(table(), LockAccess::Shared);
    manager.acquire_lock(TxnId::new(1), &shared).unwrap();
    manager.acquire_lock(TxnId::new(2), &shared).unwrap();

    // Exclusive is compatible with a Shared holder in this matrix, so
    // the upgrade grants instead of queueing.
    let result = manager
        .upgrade_lock(TxnId::new(1), &shared, LockAccess::Exclusive)
        .unwrap();
    assert!(!result.blocked);
    assert_eq!(manager.holder_count(&shared), 1);
    assert_eq!(
        manager.holder_count(&shared.with_access(LockAccess::Exclusive)),
        1
    );
    assert!(manager.pending_transactions().is_empty());
}

#[test]
fn a_transaction_gets_one_pending_request() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let held = LockTarget::table(table(), LockAccess::Update);
    manager.acquire_lock(TxnId::new(1), &held).unwrap();

    let wanted = LockTarget::table(table(), LockAccess::Update);
    assert!(manager.acquire_lock(TxnId::new(2), &wanted).unwrap().blocked);

    // Any further request is rejected outright while one is pending.
    let another = LockTarget::page(table(), PageId::new(3), LockAccess::Shared);
    assert!(manager.acquire_lock(TxnId::new(2), &another).is_err());
    let row = FixedBufferPool::encode_pointer(PageId::new(3), 0);
    let row_target = LockTarget::row(table(), row, LockAccess::Shared);
    assert!(manager.acquire_lock(TxnId::new(2), &row_target).is_err());
}

#[test]
fn pending_requests_queue_in_registration_order() {
    let manager = setup();
    for id in 1..=3 {
        manager.register_transaction(TxnId::new(id), 100).unwrap();
    }

    let update = LockTarget::table(table(), LockAccess::Update);
    manager.acquire_lock(TxnId::new(1), &update).unwrap();
    assert!(manager.acquire_lock(TxnId::new(2), &update).unwrap().blocked);
    assert!(manager.acquire_lock(TxnId::new(3), &update).unwrap().blocked);
    assert_eq!(
        manager.pending_transactions(),
        vec![TxnId::new(2), TxnId::new(3)]
    );

    manager.release_lock(TxnId::new(2), &update).unwrap();
    assert_eq!(manager.pending_transactions(), vec![TxnId::new(3)]);
}

#[test]
fn acquire_then_release_is_a_no_op_on_counts() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let base = LockTarget::table(table(), LockAccess::Shared);
    manager.acquire_lock(TxnId::new(2), &base).unwrap();
    let before = manager.holder_count(&base);

    manager.acquire_lock(TxnId::new(1), &base).unwrap();
    manager.release_lock(TxnId::new(1), &base).unwrap();
    assert_eq!(manager.holder_count(&base), before);
}

#[test]
fn granting_upgrades_invert_cleanly() {
    let manager = setup();
    manager.register_transaction(TxnId::new(1), 100).unwrap();
    manager.register_transaction(TxnId::new(2), 100).unwrap();

    let shared = LockTarget::table(table(), LockAccess::Shared);
    let exclusive = shared.with_access(LockAccess::Exclusive);
    manager.acquire_lock(TxnId::new(2), &shared).unwrap();
    manager.acquire_lock(TxnId::new(1), &shared).unwrap();
    let shared_before = manager.holder_count(&shared);
    let exclusive_before = manager.holder_count(&exclusive);

    assert!(!manager
        .upgrade_lock(TxnId::new(1), &shared, LockAccess::Exclusive)
        .unwrap()
        .blocked);
    assert!(!manager
        .upgrade_lock(TxnId::new(1), &exclusive, LockAccess::Shared)
        .unwrap()
        .blocked);

    assert_eq!(manager.holder_count(&shared), shared_before);
    assert_eq!(manager.holder_count(&exclusive), exclusive_before);
}

#[test]
fn deadlocked_transactions_are_detected_and_a_victim_chosen() {
    let pool = Arc::new(FixedBufferPool::new());
    pool.register_source(SourceId::new(0), PageId::new(1));
    pool.register_source(SourceId::new(1), PageId::new(2));
    let manager = LockManager::new(pool);
    manager
        .register_table(TableId::new(0), SourceId::new(0))
        .unwrap();
    manager
        .register_table(TableId::new(1), SourceId::new(1))
        .unwrap();
    manager.register_transaction(TxnId::new(1), 50).unwrap();
    manager.register_transaction(TxnId::new(2), 10).unwrap();

    let t0 = LockTarget::table(TableId::new(0), LockAccess::IntentShared);
    let t1 = LockTarget::table(TableId::new(1), LockAccess::IntentShared);
    manager.acquire_lock(TxnId::new(1), &t0).unwrap();
    manager.acquire_lock(TxnId::new(2), &t1).unwrap();

    let x0 = t0.with_access(LockAccess::Exclusive);
    let x1 = t1.with_access(LockAccess::Exclusive);
    assert!(manager.acquire_lock(TxnId::new(1), &x1).unwrap().blocked);
    assert!(manager.acquire_lock(TxnId::new(2), &x0).unwrap().blocked);

    let deadlocks = manager.detect_deadlock();
    assert_eq!(deadlocks.len(), 1);
    assert!(deadlocks[0].involves(TxnId::new(1)));
    assert!(deadlocks[0].involves(TxnId::new(2)));

    // Lower importance loses.
    assert_eq!(manager.pick_transaction(), Some(TxnId::new(2)));

    manager.rollback(TxnId::new(2)).unwrap();
    assert!(manager.detect_deadlock().is_empty());
    assert_eq!(manager.pending_transactions(), vec![TxnId::new(1)]);
}
