//! Strongly-typed identifiers and the [`IdSequence`] generator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a range of slots within one buffer instance.
///
/// Range ids are minted from a per-buffer [`IdSequence`] and never reused.
/// Two ranges with identical bounds but different ids are distinct ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(pub u64);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RangeId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a token (one write batch) within one buffer instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a queued write entry.
///
/// Only used for diagnostics; entries are looked up by token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteOpId(pub u64);

impl fmt::Display for WriteOpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WriteOpId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`BufferInstanceId`] allocation.
static BUFFER_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a buffer.
///
/// Allocated from a monotonic atomic counter via [`BufferInstanceId::next`].
/// Tokens carry the id of the buffer that issued them, so a token handed to
/// the wrong buffer is rejected instead of aliasing a local token with the
/// same [`TokenId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferInstanceId(u64);

impl BufferInstanceId {
    /// Allocate a fresh, unique instance ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(BUFFER_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BufferInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id generator owned by a single buffer instance.
///
/// Yields `first, first + 1, ...` converted into the requested id type.
/// Values are never recycled.
#[derive(Clone, Debug)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Create a sequence whose first value is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Take the next id.
    pub fn mint<I: From<u64>>(&mut self) -> I {
        let id = self.next;
        self.next += 1;
        I::from(id)
    }

    /// The value the next call to [`mint`](Self::mint) will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(0)
    }
}
