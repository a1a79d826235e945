//! # Configuration Constants
//!
//! Centralized constants for the lock manager. Each constant documents the
//! structures that depend on it; compile-time assertions below enforce the
//! relationships that can be checked statically.
//!
//! ## Dependency Graph
//!
//! ```text
//! LOCK_MODE_COUNT (6)
//!       │
//!       ├─> HolderCounts array length (one slot per mode)
//!       │
//!       └─> COMPATIBILITY matrix dimensions (6x6, asserted at the
//!           definition site in locking::access)
//!
//! HELD_LOCKS_INLINE (16)
//!       │
//!       └─> Inline capacity of each transaction's held-lock set.
//!           Acquisitions beyond this spill to the heap; the value covers
//!           the common case without inflating TransInfo.
//!
//! ROW_OFFSET_BITS (16)
//!       │
//!       └─> FixedBufferPool address packing: the low bits of a RowAddr
//!           carry the in-page offset, the remaining high bits the page.
//! ```

// ============================================================================
// LOCK MODE CONFIGURATION
// ============================================================================

/// Number of lock modes. The compatibility matrix is LOCK_MODE_COUNT x
/// LOCK_MODE_COUNT and every object lock record carries one holder count
/// per mode.
pub const LOCK_MODE_COUNT: usize = 6;

// ============================================================================
// TRANSACTION STATE
// ============================================================================

/// Inline capacity of a transaction's held-lock set. Most transactions
/// hold fewer locks than this and never touch the heap.
pub const HELD_LOCKS_INLINE: usize = 16;

// ============================================================================
// FIXED BUFFER POOL ADDRESS PACKING
// ============================================================================

/// Bits of a packed row address reserved for the in-page offset.
pub const ROW_OFFSET_BITS: u32 = 16;

/// Mask extracting the in-page offset from a packed row address.
pub const ROW_OFFSET_MASK: u64 = (1 << ROW_OFFSET_BITS) - 1;

const _: () = assert!(LOCK_MODE_COUNT > 0);
const _: () = assert!(HELD_LOCKS_INLINE > 0);
const _: () = assert!(ROW_OFFSET_BITS < 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_mask_matches_bit_width() {
        assert_eq!(ROW_OFFSET_MASK.count_ones(), ROW_OFFSET_BITS);
    }

    #[test]
    fn mode_count_is_six() {
        assert_eq!(LOCK_MODE_COUNT, 6);
    }
}
