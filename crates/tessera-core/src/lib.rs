//! Core types and traits for the Tessera transactional buffer allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the allocator and by backing-store implementations:
//! strongly-typed ids, error types, and the [`BackingStore`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{BufferError, StoreError};
pub use id::{BufferInstanceId, IdSequence, RangeId, TokenId, WriteOpId};
pub use traits::BackingStore;
