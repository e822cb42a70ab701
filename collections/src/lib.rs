//! Low-level storage primitives shared by the formalism, grounder and search
//! layers: typed indices, grow-only segmented storage, content-addressed
//! interning, slot-tree set interning and a recycling object pool.
//!
//! Everything here is append-only: once a value has been written it keeps its
//! address and its index for the lifetime of the owning container. The upper
//! layers rely on that stability to hand out plain `u32` indices instead of
//! references.

pub mod index;
pub mod indexed_hash_set;
pub mod pool;
pub mod segmented;
pub mod slot_tree;

pub use index::{Idx, Ref};
pub use indexed_hash_set::IndexedHashSet;
pub use pool::{PoolPtr, SharedObjectPool, SyncPoolPtr, SyncSharedObjectPool};
pub use segmented::{BufRef, SegmentedBuffer, SegmentedVec};
pub use slot_tree::{FloatTable, Slot, SlotTree};
