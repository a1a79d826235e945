//! # Per-Transaction Lock State
//!
//! The manager keeps one [`TransInfo`] per registered transaction:
//!
//! - the set of targets it currently holds, one entry per acquisition (a
//!   transaction that acquires the same target twice holds two entries and
//!   must release twice)
//! - at most one pending target, the single blocked request a
//!   transaction may have outstanding
//! - an `importance` weight used by deadlock victim selection; lower
//!   importance loses
//!
//! The held set is a `SmallVec` sized for the common case: most
//! transactions hold a handful of locks and never allocate.

use smallvec::SmallVec;

use crate::config::HELD_LOCKS_INLINE;
use crate::locking::target::LockTarget;
use crate::types::TxnId;

#[derive(Debug)]
pub struct TransInfo {
    pub trans: TxnId,
    pub importance: u64,
    pub held: SmallVec<[LockTarget; HELD_LOCKS_INLINE]>,
    pub pending: Option<LockTarget>,
}

impl TransInfo {
    pub fn new(trans: TxnId, importance: u64) -> Self {
        Self {
            trans,
            importance,
            held: SmallVec::new(),
            pending: None,
        }
    }

    /// Records one successful acquisition.
    pub fn add_held(&mut self, target: LockTarget) {
        self.held.push(target);
    }

    /// Removes one occurrence of `target` from the held set. Returns false
    /// when the transaction does not hold it.
    pub fn remove_held(&mut self, target: &LockTarget) -> bool {
        match self.held.iter().position(|held| held == target) {
            Some(index) => {
                self.held.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn holds(&self, target: &LockTarget) -> bool {
        self.held.iter().any(|held| held == target)
    }
}
