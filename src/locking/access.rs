//! # Lock Modes and Compatibility
//!
//! Six lock modes govern concurrent access to an object. Four are familiar
//! from any multi-granularity locking scheme, two are intent modes that
//! announce locking activity deeper in the hierarchy:
//!
//! | Mode | Meaning |
//! |------|---------|
//! | `Shared` | read the object |
//! | `Exclusive` | write the object |
//! | `Update` | read now, intending to write later |
//! | `IntentShared` | shared locks exist (or will) below this object |
//! | `IntentExclusive` | exclusive locks exist (or will) below this object |
//! | `SharedIntentExclusive` | shared on the object plus intent-exclusive below |
//!
//! ## Compatibility Matrix
//!
//! A request is granted only when its mode is compatible with *every* mode
//! currently held on the object. The matrix is indexed by
//! `COMPATIBILITY[request][existing]` and the mode discriminants fix the
//! row/column order; both the discriminants and the table contents are
//! load-bearing and must not be reordered.
//!
//! ```text
//!            S      X      U      IS     IX     SIX
//!   S     true   true   true   true   true   false
//!   X     true   true   true   false  false  false
//!   U     true   true   false  false  false  false
//!   IS    true   false  false  true   false  false
//!   IX    true   false  false  false  false  false
//!   SIX   false  false  false  false  false  false
//! ```

use crate::config::LOCK_MODE_COUNT;

/// A requested or held lock mode. Discriminants index the compatibility
/// matrix and the per-object holder-count array.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAccess {
    Shared = 0,
    Exclusive = 1,
    Update = 2,
    IntentShared = 3,
    IntentExclusive = 4,
    SharedIntentExclusive = 5,
}

/// `COMPATIBILITY[request][existing]`: whether a requested mode can
/// coexist with an already-granted one.
pub const COMPATIBILITY: [[bool; LOCK_MODE_COUNT]; LOCK_MODE_COUNT] = [
    [true, true, true, true, true, false],
    [true, true, true, false, false, false],
    [true, true, false, false, false, false],
    [true, false, false, true, false, false],
    [true, false, false, false, false, false],
    [false, false, false, false, false, false],
];

const _: () = assert!(COMPATIBILITY.len() == LOCK_MODE_COUNT);
const _: () = assert!(COMPATIBILITY[0].len() == LOCK_MODE_COUNT);

impl LockAccess {
    /// All modes in discriminant order.
    pub const ALL: [LockAccess; LOCK_MODE_COUNT] = [
        LockAccess::Shared,
        LockAccess::Exclusive,
        LockAccess::Update,
        LockAccess::IntentShared,
        LockAccess::IntentExclusive,
        LockAccess::SharedIntentExclusive,
    ];

    /// Whether a request in this mode can coexist with an existing grant
    /// in `existing`.
    pub fn compatible_with(self, existing: LockAccess) -> bool {
        COMPATIBILITY[self as usize][existing as usize]
    }

    pub fn from_index(index: usize) -> Option<LockAccess> {
        Self::ALL.get(index).copied()
    }
}
