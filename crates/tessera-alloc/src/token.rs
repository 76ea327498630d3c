//! Caller-facing tokens and the per-buffer token table.
//!
//! A [`Token`] is a `Copy` lookup key. The authoritative lifecycle state
//! lives in the issuing buffer's [`TokenTable`]; callers query it through
//! the buffer. Token ids are monotonic and never recycled, so a token that
//! has left the table is known to be [`TokenState::Invalid`].

use std::fmt;

use indexmap::IndexMap;
use tessera_core::{BufferInstanceId, IdSequence, TokenId};

use crate::range::Range;

/// Handle for one write batch.
///
/// Equality is by identity (issuing buffer and id), never by range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Token {
    buffer: BufferInstanceId,
    id: TokenId,
}

impl Token {
    pub(crate) fn new(buffer: BufferInstanceId, id: TokenId) -> Self {
        Self { buffer, id }
    }

    /// The token's id within its buffer.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// The buffer instance that issued this token.
    pub fn buffer(&self) -> BufferInstanceId {
        self.buffer
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(buf={}, id={})", self.buffer, self.id)
    }
}

/// Lifecycle state of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenState {
    /// Write queued, no range assigned yet.
    Pending,
    /// Write committed; the token carries its range.
    Valid,
    /// Removed and committed, or cancelled while pending.
    Invalid,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Snapshot of a token's state and placement.
#[derive(Clone, Copy, Debug)]
pub struct TokenInfo {
    state: TokenState,
    range: Option<Range>,
    object_size: u32,
}

impl TokenInfo {
    pub(crate) fn new(state: TokenState, range: Option<Range>, object_size: u32) -> Self {
        Self {
            state,
            range,
            object_size,
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> TokenState {
        self.state
    }

    /// Assigned range; `Some` only while [`TokenState::Valid`].
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Slots per record in the issuing buffer.
    pub fn object_size(&self) -> u32 {
        self.object_size
    }

    /// Whether the token is committed and live.
    pub fn is_valid(&self) -> bool {
        self.state == TokenState::Valid
    }

    /// First slot of the assigned range.
    pub fn first_slot(&self) -> Option<u32> {
        self.range.map(|r| r.index())
    }

    /// Number of records in the committed batch, or 0 without a range.
    pub fn record_count(&self) -> u32 {
        self.range.map_or(0, |r| r.length() / self.object_size)
    }
}

/// Live entry for a pending or valid token.
#[derive(Clone, Copy, Debug)]
struct TokenEntry {
    state: TokenState,
    range: Option<Range>,
}

/// Active-token table of one buffer.
///
/// Holds only pending and valid tokens, in issue order. Invalid tokens are
/// dropped from the table.
#[derive(Clone, Debug)]
pub(crate) struct TokenTable {
    entries: IndexMap<TokenId, TokenEntry>,
    ids: IdSequence,
}

impl TokenTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            ids: IdSequence::default(),
        }
    }

    /// Issue a fresh pending token id.
    pub(crate) fn issue(&mut self) -> TokenId {
        let id: TokenId = self.ids.mint();
        self.entries.insert(
            id,
            TokenEntry {
                state: TokenState::Pending,
                range: None,
            },
        );
        id
    }

    /// Whether `id` was ever issued by this table.
    pub(crate) fn was_issued(&self, id: TokenId) -> bool {
        id.0 < self.ids.peek()
    }

    pub(crate) fn state(&self, id: TokenId) -> TokenState {
        self.entries
            .get(&id)
            .map_or(TokenState::Invalid, |e| e.state)
    }

    pub(crate) fn range(&self, id: TokenId) -> Option<Range> {
        self.entries.get(&id).and_then(|e| e.range)
    }

    /// Stamp a pending token valid with its assigned range.
    pub(crate) fn validate(&mut self, id: TokenId, range: Range) {
        if let Some(entry) = self.entries.get_mut(&id) {
            debug_assert_eq!(entry.state, TokenState::Pending);
            entry.state = TokenState::Valid;
            entry.range = Some(range);
        }
    }

    /// Drop a token from the table, making it invalid.
    ///
    /// Returns the range it held, if any.
    pub(crate) fn invalidate(&mut self, id: TokenId) -> Option<Range> {
        self.entries.shift_remove(&id).and_then(|e| e.range)
    }

    /// Pending and valid tokens in issue order.
    pub(crate) fn active(&self) -> impl Iterator<Item = (TokenId, TokenState)> + '_ {
        self.entries.iter().map(|(&id, e)| (id, e.state))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
