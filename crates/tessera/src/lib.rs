//! Tessera: transactional range allocation for contiguous record buffers.
//!
//! This is the top-level facade crate that re-exports the public API from the
//! Tessera sub-crates. For most users, adding `tessera` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! // Two-slot records (e.g. a position and a colour per vertex).
//! let config = BufferConfig::new(2, 8);
//! let store = VecStore::for_config(&config);
//! let mut buf = TransactionalBuffer::new(config, store).unwrap();
//!
//! let quad = buf.write(vec!['a', 'b', 'c', 'd']).unwrap();
//! let tri = buf.write(vec!['x', 'y', 'z']).unwrap();
//! assert_eq!(buf.token_state(quad).unwrap(), TokenState::Pending);
//!
//! // 14 slots requested against 8: the store grows exactly once.
//! let stats = buf.commit().unwrap();
//! assert_eq!(stats.grow_events, 1);
//! assert_eq!(buf.capacity(), 14);
//!
//! let range = buf.token_range(tri).unwrap().unwrap();
//! assert_eq!((range.index(), range.length()), (8, 6));
//! assert_eq!(buf.store().get(8), Some(&'x'));
//!
//! buf.remove(quad).unwrap();
//! buf.commit().unwrap();
//! assert_eq!(buf.token_state(quad).unwrap(), TokenState::Invalid);
//! assert_eq!(buf.num_objects(), 6);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`alloc`] | `tessera-alloc` | Ranges, allocator, tokens, buffer, `VecStore` |
//! | [`types`] | `tessera-core` | IDs, error types, the `BackingStore` trait |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Range allocation and the transactional buffer (`tessera-alloc`).
///
/// Most users only need [`alloc::TransactionalBuffer`] and
/// [`alloc::VecStore`]; both are also in the [`prelude`].
pub use tessera_alloc as alloc;

/// Core IDs, error types, and the storage trait (`tessera-core`).
///
/// Implement [`types::BackingStore`] to put a buffer in front of GPU
/// memory, a file, or anything else addressable by slot.
pub use tessera_core as types;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Buffer and allocator
    pub use tessera_alloc::{
        BufferConfig, CommitStats, GrowthPolicy, Range, RangeAllocator, TransactionalBuffer,
        VecStore,
    };

    // Tokens
    pub use tessera_alloc::{Token, TokenInfo, TokenState};

    // Storage trait and errors
    pub use tessera_core::{BackingStore, BufferError, StoreError};
}
