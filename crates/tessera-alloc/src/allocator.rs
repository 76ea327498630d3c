//! First-fit range allocator with coalescing and need-driven growth.
//!
//! [`RangeAllocator`] owns the index-space bookkeeping of one buffer: a set
//! of free ranges and a set of used ranges that together tile
//! `[0, capacity)`. It never touches record data. Physical growth is
//! delegated to a resize callback supplied by the caller, which lets the
//! buffer route it to its backing store without the allocator owning the
//! store.
//!
//! # Algorithm
//!
//! ```text
//! find_or_grow(len)
//! ├── first free range with length >= len (scan order, not best fit)
//! │   ├── exact fit    → move to used
//! │   └── larger       → split into [head: len] used + [tail] free
//! └── none fits        → grow once, coalesce, scan again
//!                        (second miss = AllocationInconsistency)
//!
//! release(range)       → used → free, coalesce
//! optimize()           → merge adjacent free pairs until fixed point
//! ```

use tessera_core::{BufferError, IdSequence, RangeId, StoreError};
use tracing::debug;

use crate::config::GrowthPolicy;
use crate::range::Range;

/// Free/used range bookkeeping for one buffer instance.
///
/// Both sets are kept in insertion order. New free ranges (split tails,
/// released ranges, merge results, growth) are appended at the end, and
/// first-fit scans from the front.
#[derive(Clone, Debug)]
pub struct RangeAllocator {
    /// Ranges available for allocation.
    free: Vec<Range>,
    /// Ranges currently assigned to committed writes.
    used: Vec<Range>,
    /// Total slots tiled by `free` and `used`.
    capacity: u32,
    /// Source of fresh range ids.
    range_ids: IdSequence,
    /// Sizing rule for growth.
    growth: GrowthPolicy,
    /// Number of successful growth events.
    grow_events: u32,
}

impl RangeAllocator {
    /// Create an allocator whose whole capacity is one free range.
    ///
    /// A zero capacity starts with no ranges at all.
    pub fn new(capacity: u32, growth: GrowthPolicy) -> Self {
        let mut range_ids = IdSequence::default();
        let mut free = Vec::new();
        if capacity > 0 {
            free.push(Range::new(range_ids.mint(), 0, capacity));
        }
        Self {
            free,
            used: Vec::new(),
            capacity,
            range_ids,
            growth,
            grow_events: 0,
        }
    }

    /// Claim a range of exactly `length` slots, growing the store if needed.
    ///
    /// `resize` is called at most once, with `(old_capacity, new_capacity)`,
    /// and only when no free range is large enough. Its error is returned
    /// unchanged as [`BufferError::Store`] and leaves the allocator
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`BufferError::CapacityOverflow`] if growth would exceed `u32::MAX`
    ///   slots (checked before `resize` runs).
    /// - [`BufferError::AllocationInconsistency`] if no range fits even
    ///   after growth.
    pub fn find_or_grow<F>(&mut self, length: u32, resize: F) -> Result<Range, BufferError>
    where
        F: FnOnce(u32, u32) -> Result<(), StoreError>,
    {
        debug_assert!(length > 0, "zero-length allocation");

        let pos = match self.first_fit(length) {
            Some(pos) => pos,
            None => {
                let new_capacity = self.growth.target(self.capacity, length).ok_or(
                    BufferError::CapacityOverflow {
                        requested: length,
                        capacity: self.capacity,
                    },
                )?;
                self.grow(new_capacity, resize)?;
                self.first_fit(length)
                    .ok_or(BufferError::AllocationInconsistency {
                        requested: length,
                        capacity: self.capacity,
                    })?
            }
        };

        let candidate = self.free.remove(pos);
        let range = if candidate.length() > length {
            let head = Range::new(self.range_ids.mint(), candidate.index(), length);
            let tail = Range::new(
                self.range_ids.mint(),
                candidate.index() + length,
                candidate.length() - length,
            );
            self.free.push(tail);
            head
        } else {
            candidate
        };

        self.used.push(range);
        Ok(range)
    }

    /// Return a used range to free space, then coalesce.
    ///
    /// Lookup is by range id. Returns [`BufferError::UnknownRange`] if the
    /// range is not currently in use.
    pub fn release(&mut self, range: Range) -> Result<(), BufferError> {
        let pos = self
            .used
            .iter()
            .position(|r| *r == range)
            .ok_or(BufferError::UnknownRange { range: range.id() })?;
        let released = self.used.remove(pos);
        self.free.push(released);
        self.optimize();
        Ok(())
    }

    /// Grow the index space to `new_capacity` slots.
    ///
    /// Calls `resize(old, new)` first; on success appends one free range
    /// covering `[old, new)` and coalesces it with any trailing free range.
    /// A `new_capacity` at or below the current capacity is a no-op.
    pub fn grow<F>(&mut self, new_capacity: u32, resize: F) -> Result<(), BufferError>
    where
        F: FnOnce(u32, u32) -> Result<(), StoreError>,
    {
        let old_capacity = self.capacity;
        if new_capacity <= old_capacity {
            return Ok(());
        }

        resize(old_capacity, new_capacity)?;

        self.capacity = new_capacity;
        self.free.push(Range::new(
            self.range_ids.mint(),
            old_capacity,
            new_capacity - old_capacity,
        ));
        self.grow_events += 1;
        let merges = self.optimize();
        debug!(old_capacity, new_capacity, merges, "grew range allocator");
        Ok(())
    }

    /// Merge index-adjacent free ranges until none remain.
    ///
    /// Returns the number of merges performed. Each merge replaces the
    /// pair with one range under a fresh id and restarts the scan.
    pub fn optimize(&mut self) -> usize {
        let mut merges = 0;
        while self.merge_next() {
            merges += 1;
        }
        merges
    }

    /// Find and merge the first adjacent free pair, if any.
    fn merge_next(&mut self) -> bool {
        for i in 0..self.free.len() {
            for p in (i + 1)..self.free.len() {
                let a = self.free[i];
                let b = self.free[p];
                let (lo, hi) = if a.precedes(&b) {
                    (a, b)
                } else if b.precedes(&a) {
                    (b, a)
                } else {
                    continue;
                };

                let merged = Range::new(
                    self.range_ids.mint(),
                    lo.index(),
                    lo.length() + hi.length(),
                );
                // `p > i`, so removing `p` first keeps `i` in place.
                self.free.remove(p);
                self.free.remove(i);
                self.free.push(merged);
                return true;
            }
        }
        false
    }

    /// Position of the first free range with at least `length` slots.
    fn first_fit(&self, length: u32) -> Option<usize> {
        self.free.iter().position(|r| r.length() >= length)
    }

    /// Total slots tiled by free and used ranges.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Free ranges in scan order.
    pub fn free_ranges(&self) -> &[Range] {
        &self.free
    }

    /// Used ranges in allocation order.
    pub fn used_ranges(&self) -> &[Range] {
        &self.used
    }

    /// Look up a used range by id.
    pub fn used_range(&self, id: RangeId) -> Option<Range> {
        self.used.iter().copied().find(|r| r.id() == id)
    }

    /// Sum of free range lengths.
    pub fn free_slots(&self) -> u32 {
        self.free.iter().map(Range::length).sum()
    }

    /// Sum of used range lengths.
    pub fn used_slots(&self) -> u32 {
        self.used.iter().map(Range::length).sum()
    }

    /// Length of the largest free range, or 0 when nothing is free.
    pub fn largest_free(&self) -> u32 {
        self.free.iter().map(Range::length).max().unwrap_or(0)
    }

    /// Number of growth events so far.
    pub fn grow_events(&self) -> u32 {
        self.grow_events
    }

    /// The growth policy in effect.
    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth
    }

    /// Whether any two free ranges are index-adjacent.
    ///
    /// Always `false` after [`optimize`](Self::optimize).
    pub fn has_adjacent_free(&self) -> bool {
        self.free
            .iter()
            .enumerate()
            .any(|(i, a)| self.free[i + 1..].iter().any(|b| a.precedes(b) || b.precedes(a)))
    }

    /// Check the tiling invariant.
    ///
    /// True iff the free and used ranges share no id and their intervals
    /// cover `[0, capacity)` exactly once, with no gaps and no overlaps.
    pub fn is_tiled(&self) -> bool {
        let mut all: Vec<Range> = self.free.iter().chain(self.used.iter()).copied().collect();

        let mut ids: Vec<RangeId> = all.iter().map(Range::id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return false;
        }

        all.sort_unstable_by_key(Range::index);
        let mut cursor = 0u32;
        for r in &all {
            if r.index() != cursor {
                return false;
            }
            cursor = r.end();
        }
        cursor == self.capacity
    }

    /// Build an allocator from explicit `(index, length)` layouts.
    #[cfg(test)]
    pub(crate) fn from_layout(
        capacity: u32,
        free: &[(u32, u32)],
        used: &[(u32, u32)],
        growth: GrowthPolicy,
    ) -> Self {
        let mut range_ids = IdSequence::default();
        let mut mk = |&(index, length): &(u32, u32)| Range::new(range_ids.mint(), index, length);
        let free = free.iter().map(&mut mk).collect();
        let used = used.iter().map(&mut mk).collect();
        Self {
            free,
            used,
            capacity,
            range_ids,
            growth,
            grow_events: 0,
        }
    }
}
