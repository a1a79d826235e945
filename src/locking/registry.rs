//! # Object Lock Registry
//!
//! Lock state is a three-level tree mirroring the physical hierarchy:
//!
//! ```text
//! table_locks: Vec<Option<TableLockInfo>>     (dense, indexed by TableId)
//!   └── TableLockInfo
//!        ├── held: HolderCounts               (locks on the table itself)
//!        └── pages: HashMap<PageId, PageLockInfo>
//!              └── PageLockInfo
//!                   ├── held: HolderCounts
//!                   └── rows: HashMap<u64, RowLockInfo>
//!                         └── RowLockInfo
//!                              └── held: HolderCounts
//! ```
//!
//! Every record carries one non-negative holder count per lock mode. A
//! record is *empty* when all its counts are zero and its child map (if
//! any) is empty; empty page and row records are pruned from their parent
//! on release, cascading upward. Table records are deliberately never
//! pruned; the dense vector stays sized to the highest table index seen,
//! trading a little memory for O(1) lookup.
//!
//! The manager exclusively owns every record; traversal hands out borrows
//! that live no longer than the manager's critical section.

use hashbrown::HashMap;

use crate::config::LOCK_MODE_COUNT;
use crate::locking::access::LockAccess;
use crate::types::{PageId, TableId};

/// Per-object, per-mode grant counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderCounts([u32; LOCK_MODE_COUNT]);

impl HolderCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, access: LockAccess) -> u32 {
        self.0[access as usize]
    }

    /// Whether a request in `access` conflicts with any current holder.
    pub fn conflicts_with(&self, access: LockAccess) -> bool {
        LockAccess::ALL
            .iter()
            .any(|&existing| !access.compatible_with(existing) && self.0[existing as usize] > 0)
    }

    pub fn grant(&mut self, access: LockAccess) {
        self.0[access as usize] += 1;
    }

    /// Drops one grant in `access`. A release with no matching grant means
    /// the registry no longer agrees with the held-lock bookkeeping, which
    /// is unrecoverable corruption.
    pub fn release(&mut self, access: LockAccess) {
        let slot = &mut self.0[access as usize];
        assert!(
            *slot > 0,
            "holder count underflow for {access:?}: lock registry is corrupted"
        );
        *slot -= 1;
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&count| count as u64).sum()
    }
}

/// Lock state for one row, keyed by its decoded in-page offset.
#[derive(Debug)]
pub struct RowLockInfo {
    pub offset: u64,
    pub held: HolderCounts,
}

impl RowLockInfo {
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            held: HolderCounts::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Lock state for one page plus the row locks beneath it.
#[derive(Debug)]
pub struct PageLockInfo {
    pub page: PageId,
    pub held: HolderCounts,
    pub rows: HashMap<u64, RowLockInfo>,
}

impl PageLockInfo {
    pub fn new(page: PageId) -> Self {
        Self {
            page,
            held: HolderCounts::new(),
            rows: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.rows.is_empty()
    }
}

/// Lock state for one table plus the page locks beneath it.
#[derive(Debug)]
pub struct TableLockInfo {
    pub table: TableId,
    pub held: HolderCounts,
    pub pages: HashMap<PageId, PageLockInfo>,
}

impl TableLockInfo {
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            held: HolderCounts::new(),
            pages: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.pages.is_empty()
    }
}
