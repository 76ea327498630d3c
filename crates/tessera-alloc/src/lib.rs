//! Transactional range allocation for contiguous record buffers.
//!
//! Gives callers the illusion of a dynamically growing contiguous array of
//! fixed-size records while reusing freed regions, splitting and coalescing
//! free space, and growing the backing store only when nothing fits.
//! Writes and removes are queued and applied together at an explicit
//! commit point.
//!
//! # Architecture
//!
//! ```text
//! TransactionalBuffer<T, S> (composition root)
//! ├── TransactionQueue<T>   (queued writes + removes between commits)
//! ├── TokenTable            (authoritative Pending/Valid state per token)
//! ├── RangeAllocator        (free/used ranges, first-fit, coalesce, grow)
//! │   └── Range[]           (identified [index, index+length) intervals)
//! └── S: BackingStore<T>    (physical write/remove/resize; e.g. VecStore)
//! ```
//!
//! # Commit ordering
//!
//! 1. Every queued remove: store remove, release range, invalidate token.
//! 2. Every queued write, in enqueue order: find or grow a range, store
//!    write, validate token.
//!
//! Removes go first so writes in the same commit can reuse the space.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod buffer;
pub mod config;
mod queue;
pub mod range;
pub mod store;
pub mod token;

// Public re-exports for the primary API surface.
pub use allocator::RangeAllocator;
pub use buffer::{CommitStats, TransactionalBuffer};
pub use config::{BufferConfig, GrowthPolicy};
pub use range::Range;
pub use store::VecStore;
pub use token::{Token, TokenInfo, TokenState};

pub use tessera_core::{BackingStore, BufferError, StoreError};
