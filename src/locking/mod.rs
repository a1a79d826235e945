//! # Hierarchical Locking
//!
//! This module implements multi-granularity locking over the
//! table → page → row hierarchy. The pieces:
//!
//! - [`access`]: the six lock modes and the compatibility matrix
//! - [`target`]: lock targets (object + requested mode) and operation
//!   results
//! - [`registry`]: the nested object-lock records and their holder counts
//! - [`transaction`]: per-transaction held/pending bookkeeping
//! - [`manager`]: the [`LockManager`] operation surface
//! - [`deadlock`]: wait-for graph construction and victim selection
//!
//! ## Grant Rule
//!
//! A request is granted iff its mode is compatible with every mode that
//! currently has holders on the addressed object. Compatibility is the
//! static 6×6 matrix in [`access`]; there is no dynamic policy. A request
//! that cannot be granted queues the transaction instead of blocking the
//! calling thread.

pub mod access;
pub mod deadlock;
pub mod manager;
pub mod registry;
pub mod target;
pub mod transaction;

pub use access::{LockAccess, COMPATIBILITY};
pub use deadlock::DeadlockInfo;
pub use manager::{LockManager, LockStats, TableInfo};
pub use target::{LockResult, LockScope, LockTarget};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_diagonal_matches_mode_semantics() {
        use LockAccess::*;
        assert!(Shared.compatible_with(Shared));
        assert!(Exclusive.compatible_with(Exclusive));
        assert!(!Update.compatible_with(Update));
        assert!(IntentShared.compatible_with(IntentShared));
        assert!(!IntentExclusive.compatible_with(IntentExclusive));
        assert!(!SharedIntentExclusive.compatible_with(SharedIntentExclusive));
    }

    #[test]
    fn targets_carry_their_granularity() {
        use crate::types::{PageId, RowAddr, TableId};
        let table = LockTarget::table(TableId::new(1), LockAccess::Shared);
        let page = LockTarget::page(TableId::new(1), PageId::new(2), LockAccess::Shared);
        let row = LockTarget::row(TableId::new(1), RowAddr::new(3), LockAccess::Shared);
        assert!(matches!(table.scope, LockScope::Table));
        assert!(matches!(page.scope, LockScope::Page(_)));
        assert!(matches!(row.scope, LockScope::Row(_)));
    }
}
