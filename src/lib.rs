//! # locktree - Hierarchical Lock Manager
//!
//! locktree is the lock manager of a buffer-oriented storage engine. It
//! mediates concurrent access by transactions to three nested
//! granularities of data objects (tables, pages and rows) under a fixed
//! six-mode compatibility matrix, with pending-request bookkeeping and
//! deadlock primitives built on top.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              LockManager API                  │
//! │  register / acquire / release / upgrade /     │
//! │  queries / rollback / deadlock detection      │
//! ├──────────────────────────────────────────────┤
//! │            Operation Engine                   │
//! │  one traversal for all three operations:      │
//! │  validate → table → page → row → apply        │
//! ├──────────────────────┬───────────────────────┤
//! │  Object Registry     │  Transaction Registry  │
//! │  TableLockInfo       │  TransInfo             │
//! │   └ PageLockInfo     │   ├ held targets       │
//! │      └ RowLockInfo   │   └ pending request    │
//! ├──────────────────────┴───────────────────────┤
//! │        Compatibility Algebra (6x6)            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Modes
//!
//! `Shared`, `Exclusive`, `Update`, plus the multi-granularity intent
//! modes `IntentShared`, `IntentExclusive` and `SharedIntentExclusive`.
//! A request is granted only when its mode is compatible with every mode
//! currently held on the object; see [`locking::access`] for the matrix.
//!
//! ## Blocking Model
//!
//! The manager never parks a caller thread. A conflicting acquire
//! returns immediately with `blocked = true` after appending the
//! transaction to the pending queue; each transaction has at most one
//! pending request, cancelled by releasing its target. Waking is the
//! caller's concern: poll, or drive a condition variable from
//! [`LockManager::pick_transaction`].
//!
//! ## Collaborators
//!
//! The buffer manager is reached through the two-call
//! [`buffer::BufferPool`] contract: resolving a table's source to its
//! index page at registration, and decoding opaque row addresses into
//! (page, offset) pairs during row-granularity operations. Transaction
//! ids are issued elsewhere; the manager only tracks registered ids.
//!
//! ## Thread Safety
//!
//! `LockManager` is `Send + Sync`. All state sits behind one internal
//! `parking_lot::Mutex`; every operation (compatibility check, count
//! mutation, pending-queue update, cascade pruning) runs inside a
//! single critical section. Lock state is in-memory and process-lifetime
//! only.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use locktree::{FixedBufferPool, LockAccess, LockManager, LockTarget};
//! use locktree::types::{PageId, SourceId, TableId, TxnId};
//!
//! let pool = Arc::new(FixedBufferPool::new());
//! pool.register_source(SourceId::new(0), PageId::new(1));
//!
//! let manager = LockManager::new(pool);
//! manager.register_table(TableId::new(0), SourceId::new(0))?;
//! manager.register_transaction(TxnId::new(1), 100)?;
//!
//! let target = LockTarget::table(TableId::new(0), LockAccess::Shared);
//! let result = manager.acquire_lock(TxnId::new(1), &target)?;
//! assert!(!result.blocked);
//! manager.release_lock(TxnId::new(1), &target)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`types`]: opaque table/page/source/transaction/row handles
//! - [`buffer`]: the buffer-manager contract and an in-memory pool
//! - [`locking`]: modes, targets, registry, manager, deadlock detection
//! - [`config`]: centralized constants

pub mod buffer;
pub mod config;
pub mod locking;
pub mod types;

pub use buffer::{BufferPool, FixedBufferPool};
pub use locking::{
    DeadlockInfo, LockAccess, LockManager, LockResult, LockScope, LockStats, LockTarget,
    TableInfo,
};
