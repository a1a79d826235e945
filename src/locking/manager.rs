//! # Lock Manager
//!
//! The [`LockManager`] mediates concurrent access by transactions to
//! tables, pages and rows. It owns all lock state (the nested object
//! registry, the transaction registry and the pending queue) behind one
//! mutex, and exposes a small operation surface on top of it.
//!
//! ## Uniform Operation Protocol
//!
//! Acquire, release and upgrade all run the same traversal and differ
//! only in the work applied at the leaf:
//!
//! ```text
//! validate handles and registration          (§ input checking)
//!   │
//!   ├─ pending check (acquire/upgrade only): a transaction with a
//!   │  pending request is rejected outright
//!   │
//! find or create TableLockInfo               (create on acquire only)
//!   │
//!   ├─ Table target ──> apply at table record
//!   │
//! resolve the page: from the target, or by decoding the row address
//! through the buffer manager (decode failure is fatal)
//!   │
//! find or create PageLockInfo
//!   │
//!   ├─ Page target ───> apply at page record, then prune if emptied
//!   │
//! find or create RowLockInfo
//!   │
//!   └─ Row target ────> apply at row record, then prune row and page
//!                       records if emptied
//! ```
//!
//! Release and upgrade require the records to exist already and fail
//! otherwise.
//!
//! ## Blocking Model
//!
//! The manager never suspends a caller. An acquire that conflicts with
//! current holders returns immediately with `blocked = true` after
//! queueing the transaction: the transaction is appended to the pending
//! queue (registration order) and its single pending slot is filled. A
//! pending request is cancelled by releasing its target. Waking a blocked
//! transaction is the caller's concern.
//!
//! ## Upgrade Is Not Atomic
//!
//! Upgrade is release-then-reacquire at the same leaf. When the new mode
//! conflicts with other holders the transaction ends up holding nothing
//! on the object, with the new request pending. Both phases run inside
//! one critical section, so no other transaction interleaves, but the
//! downgrade-on-block is real and callers must be prepared for it.
//!
//! ## Concurrency
//!
//! Any number of threads may call into the manager; every public
//! operation takes the internal `parking_lot::Mutex` for its full
//! duration, so compatibility check, count mutation, pending-queue
//! update and cascade pruning all happen inside the critical section.
//! Buffer manager callbacks occur inside it too and must not re-enter
//! the manager.
//!
//! ## Failure Classes
//!
//! Operational failures (unknown handles, duplicate registration,
//! missing prerequisite state, a second request while one is pending)
//! come back as `Err`. Conditions that can only arise from internal
//! corruption (holder-count underflow, an undecodable row address that
//! passed validation) panic with a diagnostic instead; they are never
//! reachable from well-formed input.

use std::sync::Arc;

use eyre::{bail, ensure, Result};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::buffer::BufferPool;
use crate::locking::access::LockAccess;
use crate::locking::deadlock::{self, DeadlockInfo};
use crate::locking::registry::{HolderCounts, PageLockInfo, RowLockInfo, TableLockInfo};
use crate::locking::target::{LockResult, LockScope, LockTarget};
use crate::locking::transaction::TransInfo;
use crate::types::{SourceId, TableId, TxnId};

/// A registered table: its handle plus the backing source it was created
/// from.
#[derive(Debug, Clone, Copy)]
pub struct TableInfo {
    pub table: TableId,
    pub source: SourceId,
}

/// Aggregate view of the registry, for monitoring and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub table_records: usize,
    pub page_records: usize,
    pub row_records: usize,
    pub held_total: u64,
    pub pending_count: usize,
}

#[derive(Debug, Clone, Copy)]
enum LockOp {
    Acquire,
    Release,
    Upgrade(LockAccess),
}

impl LockOp {
    fn creates_lock_info(self) -> bool {
        matches!(self, LockOp::Acquire)
    }

    fn checks_pending(self) -> bool {
        !matches!(self, LockOp::Release)
    }
}

struct LockState {
    tables: HashMap<TableId, TableInfo>,
    transactions: HashMap<TxnId, TransInfo>,
    table_locks: Vec<Option<TableLockInfo>>,
    pending: Vec<TxnId>,
}

pub struct LockManager {
    buffer: Arc<dyn BufferPool>,
    state: Mutex<LockState>,
}

impl LockManager {
    pub fn new(buffer: Arc<dyn BufferPool>) -> Self {
        Self {
            buffer,
            state: Mutex::new(LockState {
                tables: HashMap::new(),
                transactions: HashMap::new(),
                table_locks: Vec::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// Registers a table. Fails when the handle is already registered or
    /// the buffer manager reports no valid index page for `source`.
    pub fn register_table(&self, table: TableId, source: SourceId) -> Result<()> {
        ensure!(table.is_valid(), "invalid table handle");
        ensure!(source.is_valid(), "invalid source handle");
        let mut state = self.state.lock();
        ensure!(
            !state.tables.contains_key(&table),
            "table {table:?} is already registered"
        );
        ensure!(
            self.buffer.index_page(source).is_some(),
            "source {source:?} has no valid index page"
        );
        state.tables.insert(table, TableInfo { table, source });
        Ok(())
    }

    /// Unregisters a table. Existing lock state is not checked; callers
    /// are expected to quiesce the table first.
    pub fn unregister_table(&self, table: TableId) -> Result<()> {
        ensure!(table.is_valid(), "invalid table handle");
        let mut state = self.state.lock();
        ensure!(
            state.tables.remove(&table).is_some(),
            "table {table:?} is not registered"
        );
        Ok(())
    }

    /// Registers a transaction with its deadlock-victim weight. Lower
    /// importance loses victim selection.
    pub fn register_transaction(&self, trans: TxnId, importance: u64) -> Result<()> {
        ensure!(trans.is_valid(), "invalid transaction handle");
        let mut state = self.state.lock();
        ensure!(
            !state.transactions.contains_key(&trans),
            "transaction {trans:?} is already registered"
        );
        state.transactions.insert(trans, TransInfo::new(trans, importance));
        Ok(())
    }

    /// Unregisters a transaction. Held locks are not released; that is
    /// the caller's responsibility via `release_lock` or `rollback`.
    pub fn unregister_transaction(&self, trans: TxnId) -> Result<()> {
        ensure!(trans.is_valid(), "invalid transaction handle");
        let mut state = self.state.lock();
        ensure!(
            state.transactions.remove(&trans).is_some(),
            "transaction {trans:?} is not registered"
        );
        Ok(())
    }

    /// Requests a lock. `Ok` means the request was accepted:
    /// `blocked = false` for an immediate grant, `blocked = true` when
    /// the transaction was queued behind incompatible holders.
    pub fn acquire_lock(&self, owner: TxnId, target: &LockTarget) -> Result<LockResult> {
        let mut state = self.state.lock();
        state.operate(self.buffer.as_ref(), owner, target, LockOp::Acquire)
    }

    /// Releases a held lock, or cancels the matching pending request.
    /// Emptied page and row records are pruned, cascading upward; table
    /// records persist.
    pub fn release_lock(&self, owner: TxnId, target: &LockTarget) -> Result<()> {
        let mut state = self.state.lock();
        state
            .operate(self.buffer.as_ref(), owner, target, LockOp::Release)
            .map(|_| ())
    }

    /// Exchanges a held lock for the same object at a different mode.
    /// The release phase must succeed or the upgrade fails with state
    /// unchanged; the re-acquire may still block, leaving the
    /// transaction holding nothing on the object with the new request
    /// pending.
    pub fn upgrade_lock(
        &self,
        owner: TxnId,
        old_target: &LockTarget,
        new_access: LockAccess,
    ) -> Result<LockResult> {
        let mut state = self.state.lock();
        state.operate(
            self.buffer.as_ref(),
            owner,
            old_target,
            LockOp::Upgrade(new_access),
        )
    }

    /// Whether any lock state exists for `table`: a grant on the table
    /// itself or on any page or row beneath it.
    pub fn table_has_locks(&self, table: TableId) -> bool {
        if !table.is_valid() {
            return false;
        }
        let state = self.state.lock();
        match state.table_locks.get(table.index()) {
            Some(Some(record)) => !record.is_empty(),
            _ => false,
        }
    }

    /// Releases every lock the transaction holds and cancels its pending
    /// request, all in one critical section. The transaction stays
    /// registered.
    pub fn rollback(&self, trans: TxnId) -> Result<()> {
        ensure!(trans.is_valid(), "invalid transaction handle");
        let mut state = self.state.lock();

        let held: Vec<LockTarget> = {
            let LockState {
                transactions,
                pending,
                ..
            } = &mut *state;
            let info = match transactions.get_mut(&trans) {
                Some(info) => info,
                None => bail!("transaction {trans:?} is not registered"),
            };
            if let Some(target) = info.pending {
                remove_pending(info, pending, &target);
            }
            info.held.to_vec()
        };

        for target in held {
            state.operate(self.buffer.as_ref(), trans, &target, LockOp::Release)?;
        }
        Ok(())
    }

    /// Builds the wait-for graph from the pending queue and the holder
    /// sets and reports every cycle found.
    pub fn detect_deadlock(&self) -> Vec<DeadlockInfo> {
        let state = self.state.lock();
        deadlock::detect(&state.transactions, &state.pending)
    }

    /// The deadlock victim: the lowest-importance transaction on any
    /// wait-for cycle, ties broken toward the larger handle. `None` when
    /// no deadlock exists.
    pub fn pick_transaction(&self) -> Option<TxnId> {
        let state = self.state.lock();
        deadlock::pick_victim(&state.transactions, &state.pending)
    }

    /// Snapshot of the pending queue, in registration order.
    pub fn pending_transactions(&self) -> Vec<TxnId> {
        self.state.lock().pending.clone()
    }

    /// The transaction's pending request, if any.
    pub fn pending_lock(&self, trans: TxnId) -> Option<LockTarget> {
        let state = self.state.lock();
        state.transactions.get(&trans).and_then(|info| info.pending)
    }

    /// The targets a transaction currently holds, one entry per
    /// acquisition. `None` when the transaction is not registered.
    pub fn held_locks(&self, trans: TxnId) -> Option<Vec<LockTarget>> {
        let state = self.state.lock();
        state.transactions.get(&trans).map(|info| info.held.to_vec())
    }

    /// Grant count for the target's mode on the object it names. Zero
    /// when no record exists.
    pub fn holder_count(&self, target: &LockTarget) -> u32 {
        let state = self.state.lock();
        let record = match state.table_locks.get(target.table.index()) {
            Some(Some(record)) => record,
            _ => return 0,
        };
        match target.scope {
            LockScope::Table => record.held.count(target.access),
            LockScope::Page(page) => record
                .pages
                .get(&page)
                .map_or(0, |p| p.held.count(target.access)),
            LockScope::Row(addr) => {
                let Some((page, offset)) = self.buffer.decode_pointer(addr) else {
                    return 0;
                };
                record
                    .pages
                    .get(&page)
                    .and_then(|p| p.rows.get(&offset))
                    .map_or(0, |r| r.held.count(target.access))
            }
        }
    }

    /// Aggregate registry counters, for monitoring and invariant checks.
    pub fn stats(&self) -> LockStats {
        let state = self.state.lock();
        let mut stats = LockStats {
            pending_count: state.pending.len(),
            ..LockStats::default()
        };
        for record in state.table_locks.iter().flatten() {
            stats.table_records += 1;
            stats.held_total += record.held.total();
            for page in record.pages.values() {
                stats.page_records += 1;
                stats.held_total += page.held.total();
                for row in page.rows.values() {
                    stats.row_records += 1;
                    stats.held_total += row.held.total();
                }
            }
        }
        stats
    }
}

impl LockState {
    /// The shared traversal behind acquire, release and upgrade. Resolves
    /// the chain table → page → row as far as the target requires,
    /// applies the operation at the leaf, and prunes emptied records on
    /// release.
    fn operate(
        &mut self,
        buffer: &dyn BufferPool,
        owner: TxnId,
        target: &LockTarget,
        op: LockOp,
    ) -> Result<LockResult> {
        let create = op.creates_lock_info();
        let LockState {
            tables,
            transactions,
            table_locks,
            pending,
        } = self;

        ensure!(owner.is_valid(), "invalid transaction handle");
        let trans = match transactions.get_mut(&owner) {
            Some(info) => info,
            None => bail!("transaction {owner:?} is not registered"),
        };
        ensure!(target.table.is_valid(), "invalid table handle");
        ensure!(
            tables.contains_key(&target.table),
            "table {:?} is not registered",
            target.table
        );
        match target.scope {
            LockScope::Table => {}
            LockScope::Page(page) => ensure!(page.is_valid(), "invalid page handle"),
            LockScope::Row(addr) => ensure!(addr.is_valid(), "invalid row address"),
        }

        if op.checks_pending() && trans.pending.is_some() {
            bail!("transaction {owner:?} already has a pending lock");
        }

        let index = target.table.index();
        if table_locks.len() <= index {
            ensure!(create, "no lock state for table {:?}", target.table);
            table_locks.resize_with(index + 1, || None);
        }
        let slot = &mut table_locks[index];
        ensure!(
            create || slot.is_some(),
            "no lock state for table {:?}",
            target.table
        );
        let table_record = slot.get_or_insert_with(|| TableLockInfo::new(target.table));

        let (target_page, row_offset) = match target.scope {
            LockScope::Table => {
                return apply_leaf(&mut table_record.held, trans, pending, target, op);
            }
            LockScope::Page(page) => (page, None),
            LockScope::Row(addr) => {
                let Some((page, offset)) = buffer.decode_pointer(addr) else {
                    panic!("unable to decode row pointer {addr:?}: lock state is corrupted");
                };
                (page, Some(offset))
            }
        };

        let page_record = match table_record.pages.entry(target_page) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                ensure!(
                    create,
                    "no lock state for page {target_page:?} of table {:?}",
                    target.table
                );
                entry.insert(PageLockInfo::new(target_page))
            }
        };

        let Some(offset) = row_offset else {
            let result = apply_leaf(&mut page_record.held, trans, pending, target, op)?;
            if matches!(op, LockOp::Release) && page_record.is_empty() {
                table_record.pages.remove(&target_page);
            }
            return Ok(result);
        };

        let row_record = match page_record.rows.entry(offset) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                ensure!(
                    create,
                    "no lock state for row {offset} on page {target_page:?}"
                );
                entry.insert(RowLockInfo::new(offset))
            }
        };

        let result = apply_leaf(&mut row_record.held, trans, pending, target, op)?;
        if matches!(op, LockOp::Release) && row_record.is_empty() {
            page_record.rows.remove(&offset);
            if page_record.is_empty() {
                table_record.pages.remove(&target_page);
            }
        }
        Ok(result)
    }
}

fn apply_leaf(
    counts: &mut HolderCounts,
    trans: &mut TransInfo,
    pending: &mut Vec<TxnId>,
    target: &LockTarget,
    op: LockOp,
) -> Result<LockResult> {
    match op {
        LockOp::Acquire => acquire_leaf(counts, trans, pending, *target),
        LockOp::Release => {
            release_leaf(counts, trans, pending, target)?;
            Ok(LockResult::granted())
        }
        LockOp::Upgrade(new_access) => {
            ensure!(
                trans.remove_held(target),
                "transaction {:?} does not hold {target:?}",
                trans.trans
            );
            counts.release(target.access);
            acquire_leaf(counts, trans, pending, target.with_access(new_access))
        }
    }
}

fn acquire_leaf(
    counts: &mut HolderCounts,
    trans: &mut TransInfo,
    pending: &mut Vec<TxnId>,
    target: LockTarget,
) -> Result<LockResult> {
    if !counts.conflicts_with(target.access) {
        counts.grant(target.access);
        trans.add_held(target);
        return Ok(LockResult::granted());
    }
    add_pending(trans, pending, target)?;
    Ok(LockResult::blocked())
}

fn release_leaf(
    counts: &mut HolderCounts,
    trans: &mut TransInfo,
    pending: &mut Vec<TxnId>,
    target: &LockTarget,
) -> Result<()> {
    if trans.remove_held(target) {
        counts.release(target.access);
        return Ok(());
    }
    ensure!(
        remove_pending(trans, pending, target),
        "transaction {:?} neither holds nor awaits {target:?}",
        trans.trans
    );
    Ok(())
}

fn add_pending(trans: &mut TransInfo, pending: &mut Vec<TxnId>, target: LockTarget) -> Result<()> {
    ensure!(
        trans.pending.is_none(),
        "transaction {:?} already has a pending lock",
        trans.trans
    );
    ensure!(
        !pending.contains(&trans.trans),
        "transaction {:?} is already queued",
        trans.trans
    );
    pending.push(trans.trans);
    trans.pending = Some(target);
    Ok(())
}

fn remove_pending(trans: &mut TransInfo, pending: &mut Vec<TxnId>, target: &LockTarget) -> bool {
    if trans.pending.as_ref() != Some(target) {
        return false;
    }
    let Some(index) = pending.iter().position(|&queued| queued == trans.trans) else {
        return false;
    };
    pending.remove(index);
    trans.pending = None;
    true
}
