//! # Lock Targets
//!
//! A lock target names one object in the table/page/row hierarchy together
//! with the mode being requested on it. The granularity lives in the
//! [`LockScope`] enum, so a page target always carries its page and a row
//! target always carries its row address; ill-shaped targets cannot be
//! constructed.
//!
//! Two targets are equal iff every populated field matches: same table,
//! same scope (including the page or row payload) and same access mode.
//! The held-lock bookkeeping and pending-lock matching both rely on this.
//!
//! [`LockResult`] reports the outcome of an accepted acquire or upgrade:
//! `blocked = false` means the lock was granted, `blocked = true` means
//! the transaction was queued. A blocked result is a normal outcome, not
//! an error.

use crate::locking::access::LockAccess;
use crate::types::{PageId, RowAddr, TableId};

/// The granularity of a lock target, with the object payload for the two
/// sub-table levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockScope {
    Table,
    Page(PageId),
    Row(RowAddr),
}

/// One lockable object plus the mode requested on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockTarget {
    pub table: TableId,
    pub scope: LockScope,
    pub access: LockAccess,
}

impl LockTarget {
    pub fn table(table: TableId, access: LockAccess) -> Self {
        Self {
            table,
            scope: LockScope::Table,
            access,
        }
    }

    pub fn page(table: TableId, page: PageId, access: LockAccess) -> Self {
        Self {
            table,
            scope: LockScope::Page(page),
            access,
        }
    }

    pub fn row(table: TableId, addr: RowAddr, access: LockAccess) -> Self {
        Self {
            table,
            scope: LockScope::Row(addr),
            access,
        }
    }

    /// The same object with a different access mode.
    pub fn with_access(self, access: LockAccess) -> Self {
        Self { access, ..self }
    }

    /// Whether two targets name the same object, ignoring the mode.
    pub fn same_object(&self, other: &LockTarget) -> bool {
        self.table == other.table && self.scope == other.scope
    }
}

/// Outcome of an accepted acquire or upgrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct LockResult {
    pub blocked: bool,
}

impl LockResult {
    pub fn granted() -> Self {
        Self { blocked: false }
    }

    pub fn blocked() -> Self {
        Self { blocked: true }
    }
}
