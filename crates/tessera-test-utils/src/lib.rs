//! Test utilities and mock backing stores for Tessera development.
//!
//! Provides [`RecordingStore`] (logs every physical call), [`FailingStore`]
//! (fault injection on the n-th call of one kind), and coverage helpers for
//! checking that a set of `(index, length)` spans tiles a capacity.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{assert_tiles, covers_exactly, spans_adjacent};

use tessera_core::{BackingStore, StoreError};

/// Kind of backing-store call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Write,
    Remove,
    Resize,
}

/// One recorded backing-store call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall<T> {
    Write { index: u32, records: Vec<T> },
    Remove { index: u32, length: u32 },
    Resize { old_capacity: u32, new_capacity: u32 },
}

impl<T> StoreCall<T> {
    pub fn op(&self) -> StoreOp {
        match self {
            Self::Write { .. } => StoreOp::Write,
            Self::Remove { .. } => StoreOp::Remove,
            Self::Resize { .. } => StoreOp::Resize,
        }
    }
}

/// Mock [`BackingStore`] that records calls and stores nothing.
///
/// Every call succeeds. Inspect the log with
/// [`calls`](RecordingStore::calls) after driving a buffer.
#[derive(Clone, Debug)]
pub struct RecordingStore<T> {
    calls: Vec<StoreCall<T>>,
}

impl<T> RecordingStore<T> {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> &[StoreCall<T>] {
        &self.calls
    }

    /// Number of calls of kind `op`.
    pub fn count(&self, op: StoreOp) -> usize {
        self.calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forget recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl<T> Default for RecordingStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BackingStore<T> for RecordingStore<T> {
    fn write(&mut self, index: u32, records: Vec<T>) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Write { index, records });
        Ok(())
    }

    fn remove(&mut self, index: u32, length: u32) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Remove { index, length });
        Ok(())
    }

    fn resize(&mut self, old_capacity: u32, new_capacity: u32) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Resize {
            old_capacity,
            new_capacity,
        });
        Ok(())
    }
}

/// Wraps a store and fails the `fail_on`-th call (1-based) of kind `op`.
///
/// Calls before the failing one are forwarded to the inner store. The
/// failing call is not forwarded; later calls are forwarded again.
pub struct FailingStore<S> {
    inner: S,
    op: StoreOp,
    fail_on: usize,
    seen: usize,
}

impl<S> FailingStore<S> {
    pub fn new(inner: S, op: StoreOp, fail_on: usize) -> Self {
        Self {
            inner,
            op,
            fail_on,
            seen: 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns true if this call of kind `op` is the one to fail.
    fn trip(&mut self, op: StoreOp) -> bool {
        if op != self.op {
            return false;
        }
        self.seen += 1;
        self.seen == self.fail_on
    }
}

impl<T, S: BackingStore<T>> BackingStore<T> for FailingStore<S> {
    fn write(&mut self, index: u32, records: Vec<T>) -> Result<(), StoreError> {
        if self.trip(StoreOp::Write) {
            return Err(StoreError::WriteFailed {
                index,
                reason: "injected failure".into(),
            });
        }
        self.inner.write(index, records)
    }

    fn remove(&mut self, index: u32, length: u32) -> Result<(), StoreError> {
        if self.trip(StoreOp::Remove) {
            return Err(StoreError::RemoveFailed {
                index,
                reason: "injected failure".into(),
            });
        }
        self.inner.remove(index, length)
    }

    fn resize(&mut self, old_capacity: u32, new_capacity: u32) -> Result<(), StoreError> {
        if self.trip(StoreOp::Resize) {
            return Err(StoreError::ResizeFailed {
                old_capacity,
                new_capacity,
                reason: "injected failure".into(),
            });
        }
        self.inner.resize(old_capacity, new_capacity)
    }
}
