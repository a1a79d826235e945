//! # Buffer Manager Contract
//!
//! The lock manager names rows by opaque addresses and tables by the
//! source they were created from. Translating either into buffer pages is
//! the buffer manager's job, and this module pins down the two calls the
//! lock manager needs from it:
//!
//! - `index_page(source)`: resolve a table's backing source to its index
//!   page. Registration of a table succeeds only when the source resolves.
//! - `decode_pointer(addr)`: decode a row address into its (page, offset)
//!   pair. Row-granularity lock operations depend on this to find the page
//!   a row lives on.
//!
//! ## Reentrancy
//!
//! Both calls are made while the lock manager holds its internal mutex.
//! Implementations must not call back into the lock manager, directly or
//! indirectly, or they will deadlock.
//!
//! ## FixedBufferPool
//!
//! [`FixedBufferPool`] is a deterministic in-memory implementation for
//! tests, benchmarks and single-process embedding. Sources are registered
//! up front and row addresses are packed as `page << ROW_OFFSET_BITS |
//! offset`, so decoding is pure arithmetic and never fails for a validly
//! packed address.
//!
//! ## Thread Safety
//!
//! `BufferPool` requires `Send + Sync`: the lock manager is shared across
//! caller threads and invokes the pool from any of them.

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::{ROW_OFFSET_BITS, ROW_OFFSET_MASK};
use crate::types::{PageId, RowAddr, SourceId};

/// The two-call contract the lock manager requires from the buffer
/// manager.
pub trait BufferPool: Send + Sync {
    /// Resolves a table's backing source to its index page, or `None` when
    /// the source is unknown or carries no valid index page.
    fn index_page(&self, source: SourceId) -> Option<PageId>;

    /// Decodes an opaque row address into its (page, offset) pair, or
    /// `None` when the address does not name a row.
    fn decode_pointer(&self, addr: RowAddr) -> Option<(PageId, u64)>;
}

/// In-memory [`BufferPool`] with up-front source registration and
/// arithmetic address packing.
pub struct FixedBufferPool {
    sources: RwLock<HashMap<SourceId, PageId>>,
}

impl FixedBufferPool {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a source and the index page it resolves to. Re-registering
    /// a source overwrites the previous mapping.
    pub fn register_source(&self, source: SourceId, index_page: PageId) {
        self.sources.write().insert(source, index_page);
    }

    /// Packs a (page, offset) pair into a row address. The offset must fit
    /// in `ROW_OFFSET_BITS` and the page in the remaining bits.
    pub fn encode_pointer(page: PageId, offset: u64) -> RowAddr {
        assert!(
            offset <= ROW_OFFSET_MASK,
            "row offset {offset} exceeds {ROW_OFFSET_BITS}-bit packing"
        );
        let packed = (page.raw() << ROW_OFFSET_BITS) | offset;
        assert!(
            packed >> ROW_OFFSET_BITS == page.raw(),
            "page id {} does not fit packed row addressing",
            page.raw()
        );
        RowAddr::new(packed)
    }
}

impl Default for FixedBufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool for FixedBufferPool {
    fn index_page(&self, source: SourceId) -> Option<PageId> {
        self.sources.read().get(&source).copied()
    }

    fn decode_pointer(&self, addr: RowAddr) -> Option<(PageId, u64)> {
        if !addr.is_valid() {
            return None;
        }
        let page = PageId::new(addr.raw() >> ROW_OFFSET_BITS);
        let offset = addr.raw() & ROW_OFFSET_MASK;
        Some((page, offset))
    }
}
