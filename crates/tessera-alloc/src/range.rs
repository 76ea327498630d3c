//! Identified slot intervals.
//!
//! A [`Range`] is the unit of bookkeeping in the allocator: every slot of
//! the buffer belongs to exactly one free or used range. Ranges are never
//! mutated. Splitting or merging mints new ranges with fresh ids, so a
//! token that was stamped with a range keeps pointing at a well-defined
//! identity even when another range happens to share its bounds.

use std::fmt;
use std::hash::{Hash, Hasher};

use tessera_core::RangeId;

/// The half-open slot interval `[index, index + length)` with an identity.
///
/// Equality and hashing use only the id. Compare bounds explicitly with
/// [`Range::same_bounds`] when that is what you mean.
#[derive(Clone, Copy, Debug)]
pub struct Range {
    id: RangeId,
    index: u32,
    length: u32,
}

impl Range {
    /// Create a range. `index + length` must not overflow and `length`
    /// must be non-zero; the allocator guarantees both.
    pub(crate) fn new(id: RangeId, index: u32, length: u32) -> Self {
        debug_assert!(length > 0, "ranges are never empty");
        debug_assert!(index.checked_add(length).is_some(), "range end overflows u32");
        Self { id, index, length }
    }

    /// Identity of this range.
    pub fn id(&self) -> RangeId {
        self.id
    }

    /// First slot.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of slots.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// One past the last slot.
    pub fn end(&self) -> u32 {
        self.index + self.length
    }

    /// Whether `slot` falls inside this range.
    pub fn contains(&self, slot: u32) -> bool {
        slot >= self.index && slot < self.end()
    }

    /// Whether `other` starts exactly where this range ends.
    pub fn precedes(&self, other: &Range) -> bool {
        self.end() == other.index
    }

    /// Whether the two ranges share at least one slot.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.index < other.end() && other.index < self.end()
    }

    /// Whether both ranges cover the same slots, regardless of identity.
    pub fn same_bounds(&self, other: &Range) -> bool {
        self.index == other.index && self.length == other.length
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}[{}, {})", self.id, self.index, self.end())
    }
}
