//! The physical storage contract a transactional buffer drives.

use crate::error::StoreError;

/// Physical storage behind a transactional buffer.
///
/// The buffer decides *where* records go; the store only moves them. All
/// positions are slot indices. A record occupies `object_size` slots, so a
/// batch of `n` records written at `index` spans
/// `[index, index + n * object_size)`.
///
/// Implementations must treat each call as atomic: a call either fully
/// applies or returns `Err`. The buffer never retries and never rolls back.
pub trait BackingStore<T> {
    /// Place `records` starting at slot `index`.
    ///
    /// Must not affect any slot outside the batch's span.
    fn write(&mut self, index: u32, records: Vec<T>) -> Result<(), StoreError>;

    /// Erase `length` slots starting at `index`.
    ///
    /// Stores whose slots are simply overwritten on reuse (e.g. GPU vertex
    /// buffers) can keep the default no-op.
    fn remove(&mut self, index: u32, length: u32) -> Result<(), StoreError> {
        let _ = (index, length);
        Ok(())
    }

    /// Grow from `old_capacity` to `new_capacity` slots.
    ///
    /// Existing contents must stay at their existing indices. Partial
    /// growth is not an allowed outcome.
    fn resize(&mut self, old_capacity: u32, new_capacity: u32) -> Result<(), StoreError>;
}

impl<T, S: BackingStore<T> + ?Sized> BackingStore<T> for Box<S> {
    fn write(&mut self, index: u32, records: Vec<T>) -> Result<(), StoreError> {
        (**self).write(index, records)
    }

    fn remove(&mut self, index: u32, length: u32) -> Result<(), StoreError> {
        (**self).remove(index, length)
    }

    fn resize(&mut self, old_capacity: u32, new_capacity: u32) -> Result<(), StoreError> {
        (**self).resize(old_capacity, new_capacity)
    }
}
