//! Heap-array backing store.
//!
//! [`VecStore`] keeps records in a `Vec<Option<T>>` indexed by slot. It is
//! the plain-memory counterpart of a GPU vertex buffer: same index space,
//! same growth contract, but readable from the CPU.

use tessera_core::{BackingStore, StoreError};

use crate::config::BufferConfig;
use crate::range::Range;

/// A [`BackingStore`] backed by a slot vector.
///
/// A record written at slot `i` occupies slots `[i, i + object_size)`; the
/// value lives in slot `i` and the remaining `object_size - 1` slots stay
/// `None`.
#[derive(Clone, Debug)]
pub struct VecStore<T> {
    slots: Vec<Option<T>>,
    object_size: u32,
}

impl<T> VecStore<T> {
    /// Create a store of `capacity` empty slots.
    ///
    /// An `object_size` of zero is treated as one.
    pub fn new(object_size: u32, capacity: u32) -> Self {
        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, || None);
        Self {
            slots,
            object_size: object_size.max(1),
        }
    }

    /// Create a store sized for a buffer built from `config`.
    pub fn for_config(config: &BufferConfig) -> Self {
        Self::new(config.object_size, config.initial_capacity)
    }

    /// Capacity in slots.
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// The record starting at `slot`, if any.
    pub fn get(&self, slot: u32) -> Option<&T> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    /// Records stored inside `range`, in slot order.
    pub fn records<'a>(&'a self, range: &Range) -> impl Iterator<Item = &'a T> + 'a {
        let start = (range.index() as usize).min(self.slots.len());
        let end = (range.end() as usize).min(self.slots.len());
        self.slots[start..end]
            .iter()
            .step_by(self.object_size as usize)
            .filter_map(Option::as_ref)
    }

    /// Number of slots holding a record.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn check_span(&self, index: u32, len: u32) -> Result<(), StoreError> {
        let capacity = self.capacity();
        match index.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(StoreError::OutOfBounds {
                index,
                len,
                capacity,
            }),
        }
    }
}

impl<T> BackingStore<T> for VecStore<T> {
    fn write(&mut self, index: u32, records: Vec<T>) -> Result<(), StoreError> {
        let span = u32::try_from(records.len())
            .ok()
            .and_then(|n| n.checked_mul(self.object_size))
            .ok_or(StoreError::WriteFailed {
                index,
                reason: "batch exceeds u32 slot space".into(),
            })?;
        self.check_span(index, span)?;

        let stride = self.object_size as usize;
        let base = index as usize;
        for (i, record) in records.into_iter().enumerate() {
            self.slots[base + i * stride] = Some(record);
        }
        Ok(())
    }

    fn remove(&mut self, index: u32, length: u32) -> Result<(), StoreError> {
        self.check_span(index, length)?;
        let start = index as usize;
        self.slots[start..start + length as usize].fill_with(|| None);
        Ok(())
    }

    fn resize(&mut self, old_capacity: u32, new_capacity: u32) -> Result<(), StoreError> {
        if old_capacity != self.capacity() {
            return Err(StoreError::ResizeFailed {
                old_capacity,
                new_capacity,
                reason: format!("store holds {} slots", self.capacity()),
            });
        }
        if new_capacity < old_capacity {
            return Err(StoreError::ResizeFailed {
                old_capacity,
                new_capacity,
                reason: "stores never shrink".into(),
            });
        }
        self.slots.resize_with(new_capacity as usize, || None);
        Ok(())
    }
}
