//! The transactional buffer: queued writes and removes applied at commit.
//!
//! [`TransactionalBuffer`] is the composition root. It hands out [`Token`]s
//! immediately on `write()`, queues removes, and only assigns slot ranges
//! and touches the [`BackingStore`] inside [`commit()`].
//!
//! The lifecycle per frame is:
//! 1. `write()` / `remove()`: enqueue, O(1) bookkeeping, no store calls
//! 2. `commit()`: removes first, then writes in enqueue order
//! 3. `token_info()` / `store()`: inspect placements and data
//!
//! Removes run before writes so that space freed in a commit can be reused
//! by the writes of the same commit.
//!
//! [`commit()`]: TransactionalBuffer::commit

use tessera_core::{BackingStore, BufferError, BufferInstanceId, TokenId};
use tracing::{debug, error, trace};

use crate::allocator::RangeAllocator;
use crate::config::BufferConfig;
use crate::queue::TransactionQueue;
use crate::range::Range;
use crate::token::{Token, TokenInfo, TokenState, TokenTable};

/// Summary of one [`TransactionalBuffer::commit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Tokens invalidated by queued removes.
    pub removed: usize,
    /// Write batches placed.
    pub written: usize,
    /// Slots returned to free space.
    pub slots_freed: u32,
    /// Slots claimed by writes.
    pub slots_written: u32,
    /// Times the backing store was resized.
    pub grow_events: u32,
}

/// A contiguous, growable record buffer with transactional writes.
///
/// Generic over the record type `T` and the physical store `S`. The buffer
/// owns the store, the range allocator, the token table, and the
/// transaction queue. All mutation takes `&mut self`; a buffer is driven
/// from one thread.
///
/// # Example
///
/// ```
/// use tessera_alloc::{BufferConfig, TokenState, TransactionalBuffer, VecStore};
///
/// let config = BufferConfig::new(1, 10);
/// let store = VecStore::for_config(&config);
/// let mut buf = TransactionalBuffer::new(config, store).unwrap();
///
/// let t1 = buf.write(vec!['a', 'b', 'c']).unwrap();
/// assert_eq!(buf.token_state(t1).unwrap(), TokenState::Pending);
///
/// buf.commit().unwrap();
/// let range = buf.token_range(t1).unwrap().unwrap();
/// assert_eq!((range.index(), range.length()), (0, 3));
/// assert_eq!(buf.num_objects(), 3);
/// ```
pub struct TransactionalBuffer<T, S> {
    instance: BufferInstanceId,
    object_size: u32,
    allocator: RangeAllocator,
    tokens: TokenTable,
    queue: TransactionQueue<T>,
    store: S,
    /// Slots covered by used ranges. Updated in lockstep with commits.
    num_objects: u32,
    /// Set when a commit fails part-way.
    poisoned: bool,
}

impl<T, S: BackingStore<T>> TransactionalBuffer<T, S> {
    /// Create a buffer over `store`.
    ///
    /// `store` must already hold `config.initial_capacity` slots; the
    /// constructor does not call it. Returns `Err(InvalidConfig)` if the
    /// config is rejected.
    pub fn new(config: BufferConfig, store: S) -> Result<Self, BufferError> {
        config.validate()?;
        let instance = BufferInstanceId::next();
        debug!(
            buffer = %instance,
            capacity = config.initial_capacity,
            object_size = config.object_size,
            "created transactional buffer"
        );
        Ok(Self {
            instance,
            object_size: config.object_size,
            allocator: RangeAllocator::new(config.initial_capacity, config.growth),
            tokens: TokenTable::new(),
            queue: TransactionQueue::new(),
            store,
            num_objects: 0,
            poisoned: false,
        })
    }

    /// Queue `records` for placement at the next commit.
    ///
    /// Returns a pending token immediately. Nothing touches the store until
    /// [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// - [`BufferError::EmptyBatch`] if `records` is empty.
    /// - [`BufferError::CapacityOverflow`] if the batch cannot be expressed
    ///   in the `u32` slot space.
    /// - [`BufferError::Poisoned`] after a failed commit.
    pub fn write(&mut self, records: Vec<T>) -> Result<Token, BufferError> {
        self.ensure_live()?;
        if records.is_empty() {
            return Err(BufferError::EmptyBatch);
        }
        let slots = self.slots_for(records.len())?;

        let id = self.tokens.issue();
        let op = self.queue.push_write(id, records);
        trace!(buffer = %self.instance, token = %id, write_op = %op, slots, "queued write");
        Ok(Token::new(self.instance, id))
    }

    /// Retire the batch behind `token`.
    ///
    /// A pending token is cancelled on the spot: its queued write is
    /// dropped and the token becomes invalid without any store call. A
    /// valid token is queued for removal at the next commit; queueing it
    /// twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`BufferError::ForeignToken`] if another buffer issued `token`.
    /// - [`BufferError::InvalidToken`] if `token` is already invalid.
    /// - [`BufferError::Poisoned`] after a failed commit.
    pub fn remove(&mut self, token: Token) -> Result<(), BufferError> {
        self.ensure_live()?;
        let id = self.check_owner(token)?;

        match self.tokens.state(id) {
            TokenState::Pending => {
                let cancelled = self.queue.cancel_write(id);
                debug_assert!(cancelled.is_some(), "pending token without queued write");
                self.tokens.invalidate(id);
                trace!(buffer = %self.instance, token = %id, "cancelled pending write");
                Ok(())
            }
            TokenState::Valid => {
                if self.queue.push_remove(id) {
                    trace!(buffer = %self.instance, token = %id, "queued remove");
                }
                Ok(())
            }
            TokenState::Invalid => Err(BufferError::InvalidToken { token: id }),
        }
    }

    /// Apply all queued removes, then all queued writes.
    ///
    /// On success both queues are empty and [`num_objects`](Self::num_objects)
    /// equals the slots covered by used ranges.
    ///
    /// # Errors
    ///
    /// Any error from here is fatal: the commit is not rolled back and the
    /// buffer is poisoned.
    ///
    /// - [`BufferError::Store`] if the backing store fails.
    /// - [`BufferError::AllocationInconsistency`] or
    ///   [`BufferError::UnknownRange`] if range bookkeeping breaks.
    /// - [`BufferError::CapacityOverflow`] if growth exceeds `u32` slots.
    /// - [`BufferError::Poisoned`] after an earlier failed commit.
    pub fn commit(&mut self) -> Result<CommitStats, BufferError> {
        self.ensure_live()?;
        match self.apply_queued() {
            Ok(stats) => {
                debug!(
                    buffer = %self.instance,
                    removed = stats.removed,
                    written = stats.written,
                    grow_events = stats.grow_events,
                    num_objects = self.num_objects,
                    capacity = self.allocator.capacity(),
                    "commit applied"
                );
                Ok(stats)
            }
            Err(e) => {
                self.poisoned = true;
                error!(buffer = %self.instance, error = %e, "commit failed, buffer poisoned");
                Err(e)
            }
        }
    }

    fn apply_queued(&mut self) -> Result<CommitStats, BufferError> {
        let (removes, writes) = self.queue.take();
        let grow_events_before = self.allocator.grow_events();
        let mut stats = CommitStats::default();

        // 1. Removes.
        for id in removes {
            let range = self
                .tokens
                .range(id)
                .ok_or(BufferError::InvalidToken { token: id })?;
            self.store.remove(range.index(), range.length())?;
            self.allocator.release(range)?;
            self.tokens.invalidate(id);
            self.num_objects -= range.length();
            stats.removed += 1;
            stats.slots_freed += range.length();
            trace!(buffer = %self.instance, token = %id, index = range.index(), length = range.length(), "removed");
        }

        // 2. Writes, in enqueue order.
        for entry in writes {
            let id = entry.token();
            let op = entry.id();
            let payload = entry.into_payload();
            let size = self.slots_for(payload.len())?;

            let store = &mut self.store;
            let range = self
                .allocator
                .find_or_grow(size, |old, new| store.resize(old, new))?;

            self.store.write(range.index(), payload)?;
            self.tokens.validate(id, range);
            self.num_objects += range.length();
            stats.written += 1;
            stats.slots_written += range.length();
            trace!(buffer = %self.instance, token = %id, write_op = %op, index = range.index(), length = range.length(), "written");
        }

        stats.grow_events = self.allocator.grow_events() - grow_events_before;

        debug_assert!(self.queue.is_empty());
        debug_assert_eq!(self.num_objects, self.allocator.used_slots());
        debug_assert!(self.allocator.is_tiled());
        Ok(stats)
    }

    /// Slots needed for `records` records.
    fn slots_for(&self, records: usize) -> Result<u32, BufferError> {
        u32::try_from(records)
            .ok()
            .and_then(|n| n.checked_mul(self.object_size))
            .ok_or(BufferError::CapacityOverflow {
                requested: u32::MAX,
                capacity: self.allocator.capacity(),
            })
    }

    fn ensure_live(&self) -> Result<(), BufferError> {
        if self.poisoned {
            return Err(BufferError::Poisoned);
        }
        Ok(())
    }
}

impl<T, S> TransactionalBuffer<T, S> {
    /// Validate that `token` came from this buffer and return its id.
    fn check_owner(&self, token: Token) -> Result<TokenId, BufferError> {
        if token.buffer() != self.instance || !self.tokens.was_issued(token.id()) {
            return Err(BufferError::ForeignToken { token: token.id() });
        }
        Ok(token.id())
    }

    /// Slots covered by committed writes.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Current capacity in slots.
    pub fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }

    /// Slots per record.
    pub fn object_size(&self) -> u32 {
        self.object_size
    }

    /// Unique id of this buffer instance.
    pub fn instance_id(&self) -> BufferInstanceId {
        self.instance
    }

    /// Lifecycle state of `token`.
    pub fn token_state(&self, token: Token) -> Result<TokenState, BufferError> {
        let id = self.check_owner(token)?;
        Ok(self.tokens.state(id))
    }

    /// Range assigned to `token`; `None` unless the token is valid.
    pub fn token_range(&self, token: Token) -> Result<Option<Range>, BufferError> {
        let id = self.check_owner(token)?;
        Ok(self.tokens.range(id))
    }

    /// State, range, and record geometry of `token`.
    pub fn token_info(&self, token: Token) -> Result<TokenInfo, BufferError> {
        let id = self.check_owner(token)?;
        Ok(TokenInfo::new(
            self.tokens.state(id),
            self.tokens.range(id),
            self.object_size,
        ))
    }

    /// Pending and valid tokens in issue order.
    pub fn active_tokens(&self) -> impl Iterator<Item = Token> + '_ {
        let instance = self.instance;
        self.tokens.active().map(move |(id, _)| Token::new(instance, id))
    }

    /// Number of pending and valid tokens.
    pub fn active_token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Writes queued for the next commit.
    pub fn pending_writes(&self) -> usize {
        self.queue.pending_writes()
    }

    /// Removes queued for the next commit.
    pub fn pending_removes(&self) -> usize {
        self.queue.pending_removes()
    }

    /// Whether the next commit has anything to do.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Whether a failed commit has disabled this buffer.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Read-only view of the range bookkeeping.
    pub fn allocator(&self) -> &RangeAllocator {
        &self.allocator
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store.
    ///
    /// Changing the store's capacity behind the buffer's back breaks the
    /// tiling between allocator and store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the buffer and return its store.
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrowthPolicy;
    use tessera_test_utils::{FailingStore, RecordingStore, StoreCall, StoreOp};

    fn recording(capacity: u32) -> TransactionalBuffer<char, RecordingStore<char>> {
        TransactionalBuffer::new(BufferConfig::new(1, capacity), RecordingStore::new()).unwrap()
    }

    #[test]
    fn write_returns_pending_token_without_store_calls() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a']).unwrap();
        assert_eq!(buf.token_state(t).unwrap(), TokenState::Pending);
        assert_eq!(buf.token_range(t).unwrap(), None);
        assert_eq!(buf.pending_writes(), 1);
        assert!(buf.store().calls().is_empty());
        assert_eq!(buf.num_objects(), 0);
    }

    #[test]
    fn empty_batch_rejected() {
        let mut buf = recording(10);
        assert_eq!(buf.write(vec![]), Err(BufferError::EmptyBatch));
        assert!(!buf.is_poisoned());
        assert_eq!(buf.active_token_count(), 0);
    }

    #[test]
    fn invalid_config_rejected() {
        let result: Result<TransactionalBuffer<u8, _>, _> =
            TransactionalBuffer::new(BufferConfig::new(0, 4), RecordingStore::new());
        assert!(matches!(result, Err(BufferError::InvalidConfig { .. })));
    }

    #[test]
    fn commit_places_and_validates() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a', 'b', 'c']).unwrap();
        let stats = buf.commit().unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.slots_written, 3);
        let info = buf.token_info(t).unwrap();
        assert_eq!(info.state(), TokenState::Valid);
        assert_eq!(info.first_slot(), Some(0));
        assert_eq!(info.record_count(), 3);
        assert_eq!(
            buf.store().calls(),
            &[StoreCall::Write {
                index: 0,
                records: vec!['a', 'b', 'c']
            }]
        );
        assert!(!buf.has_pending());
    }

    #[test]
    fn pending_cancel_makes_no_store_calls() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a', 'b']).unwrap();
        buf.remove(t).unwrap();
        assert_eq!(buf.token_state(t).unwrap(), TokenState::Invalid);
        assert_eq!(buf.pending_writes(), 0);

        let stats = buf.commit().unwrap();
        assert_eq!(stats, CommitStats::default());
        assert_eq!(buf.num_objects(), 0);
        assert!(buf.store().calls().is_empty());
    }

    #[test]
    fn cancel_keeps_other_writes() {
        let mut buf = recording(10);
        let a = buf.write(vec!['a']).unwrap();
        let b = buf.write(vec!['b', 'b']).unwrap();
        let c = buf.write(vec!['c']).unwrap();
        buf.remove(b).unwrap();
        buf.commit().unwrap();

        assert_eq!(buf.token_range(a).unwrap().unwrap().index(), 0);
        assert_eq!(buf.token_range(c).unwrap().unwrap().index(), 1);
        assert_eq!(buf.num_objects(), 2);
    }

    #[test]
    fn remove_of_valid_token_waits_for_commit() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a', 'b']).unwrap();
        buf.commit().unwrap();

        buf.remove(t).unwrap();
        assert_eq!(buf.token_state(t).unwrap(), TokenState::Valid);
        assert_eq!(buf.pending_removes(), 1);

        let stats = buf.commit().unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.slots_freed, 2);
        assert_eq!(buf.token_state(t).unwrap(), TokenState::Invalid);
        assert_eq!(buf.token_range(t).unwrap(), None);
        assert_eq!(buf.num_objects(), 0);
        assert_eq!(
            buf.store().calls().last(),
            Some(&StoreCall::Remove {
                index: 0,
                length: 2
            })
        );
    }

    #[test]
    fn double_remove_releases_once() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a']).unwrap();
        buf.commit().unwrap();
        buf.remove(t).unwrap();
        buf.remove(t).unwrap();
        assert_eq!(buf.pending_removes(), 1);
        let stats = buf.commit().unwrap();
        assert_eq!(stats.removed, 1);
        assert!(buf.allocator().is_tiled());
    }

    #[test]
    fn remove_of_invalid_token_is_error() {
        let mut buf = recording(10);
        let t = buf.write(vec!['a']).unwrap();
        buf.remove(t).unwrap();
        assert_eq!(
            buf.remove(t),
            Err(BufferError::InvalidToken { token: t.id() })
        );
        assert!(!buf.is_poisoned());
    }

    #[test]
    fn foreign_token_rejected() {
        let mut a = recording(10);
        let mut b = recording(10);
        let t = a.write(vec!['x']).unwrap();
        let _ = b.write(vec!['y']).unwrap();
        assert_eq!(b.remove(t), Err(BufferError::ForeignToken { token: t.id() }));
        assert!(matches!(
            b.token_state(t),
            Err(BufferError::ForeignToken { .. })
        ));
    }

    #[test]
    fn removes_apply_before_writes() {
        let mut buf = recording(3);
        let t1 = buf.write(vec!['a', 'b', 'c']).unwrap();
        buf.commit().unwrap();

        let t2 = buf.write(vec!['d', 'e', 'f']).unwrap();
        buf.remove(t1).unwrap();
        let stats = buf.commit().unwrap();

        // The freed [0,3) is reused in the same commit, so no growth.
        assert_eq!(stats.grow_events, 0);
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.token_range(t2).unwrap().unwrap().index(), 0);

        let calls = buf.store().calls();
        let n = calls.len();
        assert!(matches!(calls[n - 2], StoreCall::Remove { .. }));
        assert!(matches!(calls[n - 1], StoreCall::Write { .. }));
    }

    #[test]
    fn growth_resizes_store_once() {
        let mut buf = recording(4);
        let t = buf.write(vec!['a'; 6]).unwrap();
        let stats = buf.commit().unwrap();
        assert_eq!(stats.grow_events, 1);
        assert_eq!(buf.capacity(), 10);
        assert_eq!(buf.token_range(t).unwrap().unwrap().index(), 0);
        assert_eq!(
            buf.store().count(StoreOp::Resize),
            1,
            "exactly one resize call"
        );
        assert_eq!(
            buf.store().calls()[0],
            StoreCall::Resize {
                old_capacity: 4,
                new_capacity: 10
            }
        );
    }

    #[test]
    fn object_size_scales_slots() {
        let config = BufferConfig::new(4, 16);
        let mut buf: TransactionalBuffer<u32, _> =
            TransactionalBuffer::new(config, RecordingStore::new()).unwrap();
        let a = buf.write(vec![1, 2]).unwrap();
        let b = buf.write(vec![3]).unwrap();
        buf.commit().unwrap();

        let ra = buf.token_range(a).unwrap().unwrap();
        let rb = buf.token_range(b).unwrap().unwrap();
        assert_eq!((ra.index(), ra.length()), (0, 8));
        assert_eq!((rb.index(), rb.length()), (8, 4));
        assert_eq!(buf.num_objects(), 12);
        assert_eq!(buf.token_info(a).unwrap().record_count(), 2);
    }

    #[test]
    fn active_tokens_track_lifecycle() {
        let mut buf = recording(10);
        let a = buf.write(vec!['a']).unwrap();
        let b = buf.write(vec!['b']).unwrap();
        buf.commit().unwrap();
        buf.remove(a).unwrap();
        buf.commit().unwrap();

        let active: Vec<Token> = buf.active_tokens().collect();
        assert_eq!(active, vec![b]);
    }

    #[test]
    fn store_failure_poisons_buffer() {
        let store = FailingStore::new(RecordingStore::new(), StoreOp::Write, 2);
        let mut buf: TransactionalBuffer<char, _> =
            TransactionalBuffer::new(BufferConfig::new(1, 10), store).unwrap();
        let a = buf.write(vec!['a']).unwrap();
        let _ = buf.write(vec!['b']).unwrap();
        let err = buf.commit().unwrap_err();
        assert!(matches!(err, BufferError::Store(_)));
        assert!(buf.is_poisoned());

        // The first write landed before the failure; no rollback.
        assert_eq!(buf.token_state(a).unwrap(), TokenState::Valid);

        assert_eq!(buf.write(vec!['c']), Err(BufferError::Poisoned));
        assert_eq!(buf.remove(a), Err(BufferError::Poisoned));
        assert_eq!(buf.commit(), Err(BufferError::Poisoned));
    }

    #[test]
    fn resize_failure_poisons_buffer() {
        let store = FailingStore::new(RecordingStore::new(), StoreOp::Resize, 1);
        let mut buf: TransactionalBuffer<char, _> =
            TransactionalBuffer::new(BufferConfig::new(1, 2), store).unwrap();
        let _ = buf.write(vec!['a'; 3]).unwrap();
        assert!(matches!(
            buf.commit(),
            Err(BufferError::Store(tessera_core::StoreError::ResizeFailed { .. }))
        ));
        assert!(buf.is_poisoned());
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn doubling_policy_reaches_buffer() {
        let config = BufferConfig::new(1, 4).with_growth(GrowthPolicy::Doubling);
        let mut buf: TransactionalBuffer<u8, _> =
            TransactionalBuffer::new(config, RecordingStore::new()).unwrap();
        let _ = buf.write(vec![0; 5]).unwrap();
        buf.commit().unwrap();
        assert_eq!(buf.capacity(), 9);
        let _ = buf.write(vec![0; 1]).unwrap();
        buf.commit().unwrap();
        assert_eq!(buf.capacity(), 18);
    }

    #[test]
    fn into_store_returns_recorded_calls() {
        let mut buf = recording(4);
        let _ = buf.write(vec!['z']).unwrap();
        buf.commit().unwrap();
        let store = buf.into_store();
        assert_eq!(store.count(StoreOp::Write), 1);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Write(usize),
            Remove(usize),
            Commit,
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => (1usize..6).prop_map(Op::Write),
                2 => (0usize..32).prop_map(Op::Remove),
                1 => Just(Op::Commit),
            ]
        }

        proptest! {
            #[test]
            fn conservation_and_tiling_hold_after_every_commit(
                capacity in 0u32..16,
                object_size in 1u32..4,
                ops in proptest::collection::vec(arb_op(), 1..60),
            ) {
                let config = BufferConfig::new(object_size, capacity);
                let mut buf: TransactionalBuffer<u16, _> =
                    TransactionalBuffer::new(config, RecordingStore::new()).unwrap();
                let mut tokens: Vec<Token> = Vec::new();

                for op in ops {
                    match op {
                        Op::Write(n) => tokens.push(buf.write(vec![7; n]).unwrap()),
                        Op::Remove(i) => {
                            if !tokens.is_empty() {
                                let t = tokens.swap_remove(i % tokens.len());
                                buf.remove(t).unwrap();
                            }
                        }
                        Op::Commit => {
                            buf.commit().unwrap();
                            prop_assert!(!buf.has_pending());
                            prop_assert_eq!(buf.num_objects(), buf.allocator().used_slots());
                            prop_assert!(buf.allocator().is_tiled());
                            for t in &tokens {
                                prop_assert_eq!(buf.token_state(*t).unwrap(), TokenState::Valid);
                            }
                        }
                    }
                }

                buf.commit().unwrap();
                prop_assert_eq!(buf.num_objects(), buf.allocator().used_slots());
                prop_assert_eq!(buf.active_token_count(), tokens.len());
                prop_assert!(buf.allocator().is_tiled());
            }
        }
    }
}
