//! Queued writes and removes between commits.

use smallvec::SmallVec;
use tessera_core::{IdSequence, TokenId, WriteOpId};

/// A queued write: the batch and the token that will receive its range.
///
/// Consumed exactly once at commit; the payload is moved out.
#[derive(Debug)]
pub(crate) struct WriteEntry<T> {
    id: WriteOpId,
    token: TokenId,
    payload: Vec<T>,
}

impl<T> WriteEntry<T> {
    pub(crate) fn id(&self) -> WriteOpId {
        self.id
    }

    pub(crate) fn token(&self) -> TokenId {
        self.token
    }

    pub(crate) fn into_payload(self) -> Vec<T> {
        self.payload
    }
}

/// Remove queue. Most commits retire only a handful of tokens.
pub(crate) type RemoveQueue = SmallVec<[TokenId; 8]>;

/// Per-buffer transaction state between commits.
#[derive(Debug)]
pub(crate) struct TransactionQueue<T> {
    writes: Vec<WriteEntry<T>>,
    removes: RemoveQueue,
    write_ids: IdSequence,
}

impl<T> TransactionQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            writes: Vec::new(),
            removes: SmallVec::new(),
            write_ids: IdSequence::default(),
        }
    }

    /// Queue a batch for `token`. Ownership of `payload` moves into the queue.
    pub(crate) fn push_write(&mut self, token: TokenId, payload: Vec<T>) -> WriteOpId {
        let id = self.write_ids.mint();
        self.writes.push(WriteEntry { id, token, payload });
        id
    }

    /// Drop the queued write for `token`, preserving the order of the rest.
    pub(crate) fn cancel_write(&mut self, token: TokenId) -> Option<WriteEntry<T>> {
        let pos = self.writes.iter().position(|w| w.token == token)?;
        Some(self.writes.remove(pos))
    }

    /// Queue `token` for removal. Returns `false` if it is already queued.
    pub(crate) fn push_remove(&mut self, token: TokenId) -> bool {
        if self.removes.contains(&token) {
            return false;
        }
        self.removes.push(token);
        true
    }

    /// Drain both queues, leaving them empty.
    pub(crate) fn take(&mut self) -> (RemoveQueue, Vec<WriteEntry<T>>) {
        (
            std::mem::take(&mut self.removes),
            std::mem::take(&mut self.writes),
        )
    }

    pub(crate) fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn pending_removes(&self) -> usize {
        self.removes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.removes.is_empty()
    }
}
