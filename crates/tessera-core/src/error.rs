//! Error types for Tessera buffers.
//!
//! Two layers: [`StoreError`] is raised by backing-store implementations,
//! [`BufferError`] is what the transactional buffer returns to callers.
//! Store failures reach the caller wrapped in [`BufferError::Store`].

use std::error::Error;
use std::fmt;

use crate::id::{RangeId, TokenId};

/// Errors raised by a [`BackingStore`](crate::BackingStore) implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A physical write could not be applied.
    WriteFailed {
        /// Slot index the write targeted.
        index: u32,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A physical remove could not be applied.
    RemoveFailed {
        /// Slot index the remove targeted.
        index: u32,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The store could not grow to the requested capacity.
    ResizeFailed {
        /// Capacity before the resize, in slots.
        old_capacity: u32,
        /// Requested capacity, in slots.
        new_capacity: u32,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// An operation addressed slots beyond the store's capacity.
    OutOfBounds {
        /// First slot addressed.
        index: u32,
        /// Number of slots addressed.
        len: u32,
        /// Current store capacity in slots.
        capacity: u32,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { index, reason } => {
                write!(f, "write at slot {index} failed: {reason}")
            }
            Self::RemoveFailed { index, reason } => {
                write!(f, "remove at slot {index} failed: {reason}")
            }
            Self::ResizeFailed {
                old_capacity,
                new_capacity,
                reason,
            } => {
                write!(
                    f,
                    "resize {old_capacity} -> {new_capacity} slots failed: {reason}"
                )
            }
            Self::OutOfBounds {
                index,
                len,
                capacity,
            } => {
                write!(
                    f,
                    "slots [{index}, {index}+{len}) out of bounds for capacity {capacity}"
                )
            }
        }
    }
}

impl Error for StoreError {}

/// Errors returned by transactional buffer operations.
///
/// The variants fall into three groups:
///
/// - **Contract violations** (`EmptyBatch`, `ForeignToken`, `InvalidToken`,
///   `InvalidConfig`): caller bugs, reported before any state changes.
/// - **Allocation inconsistency** (`AllocationInconsistency`,
///   `UnknownRange`, `CapacityOverflow` during commit): an internal
///   invariant broke or the index space ran out.
/// - **Store failures** (`Store`): propagated unchanged from the backing
///   store.
///
/// Any error returned from `commit` poisons the buffer; every later
/// mutation returns [`BufferError::Poisoned`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// `write()` was called with an empty record batch.
    EmptyBatch,
    /// The token was issued by a different buffer instance.
    ForeignToken {
        /// The offending token.
        token: TokenId,
    },
    /// The token has already been removed and committed.
    InvalidToken {
        /// The offending token.
        token: TokenId,
    },
    /// The buffer configuration was rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// No free range fit the request even after growing the store.
    AllocationInconsistency {
        /// Slots requested.
        requested: u32,
        /// Capacity after the growth attempt.
        capacity: u32,
    },
    /// A range scheduled for release is not in the used set.
    UnknownRange {
        /// Id of the missing range.
        range: RangeId,
    },
    /// The request would push the slot index space past `u32::MAX`.
    CapacityOverflow {
        /// Slots requested.
        requested: u32,
        /// Capacity at the time of the request.
        capacity: u32,
    },
    /// The backing store failed.
    Store(StoreError),
    /// A previous commit failed fatally; the buffer must not be used.
    Poisoned,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "write batch must not be empty"),
            Self::ForeignToken { token } => {
                write!(f, "token {token} belongs to a different buffer")
            }
            Self::InvalidToken { token } => write!(f, "token {token} is already invalid"),
            Self::InvalidConfig { reason } => write!(f, "invalid buffer config: {reason}"),
            Self::AllocationInconsistency {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "no free range of {requested} slots after growing to {capacity} slots"
                )
            }
            Self::UnknownRange { range } => write!(f, "range {range} is not in use"),
            Self::CapacityOverflow {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "capacity overflow: {requested} slots requested at capacity {capacity}"
                )
            }
            Self::Store(e) => write!(f, "backing store failed: {e}"),
            Self::Poisoned => write!(f, "buffer poisoned by an earlier failed commit"),
        }
    }
}

impl Error for BufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for BufferError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
