//! Buffer configuration parameters.

use tessera_core::BufferError;

/// How the allocator sizes the backing store when no free range fits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Grow to exactly `capacity + requested` slots.
    ///
    /// Every growth is need-driven, so steady allocation pressure resizes
    /// the store once per overflowing request.
    #[default]
    Exact,
    /// Grow to `max(capacity + requested, 2 * capacity)` slots.
    Doubling,
}

impl GrowthPolicy {
    /// Target capacity for a request of `requested` slots at `capacity`.
    ///
    /// Returns `None` if the target does not fit in the `u32` slot space.
    pub fn target(self, capacity: u32, requested: u32) -> Option<u32> {
        let exact = capacity.checked_add(requested)?;
        match self {
            Self::Exact => Some(exact),
            Self::Doubling => Some(exact.max(capacity.saturating_mul(2))),
        }
    }
}

/// Configuration for a transactional buffer.
///
/// Supplied once at construction. `object_size` is immutable afterwards;
/// capacity only changes through growth.
#[derive(Clone, Debug)]
pub struct BufferConfig {
    /// Slots occupied by one record. Must be non-zero.
    ///
    /// A batch of `n` records claims a range of `n * object_size` slots.
    pub object_size: u32,

    /// Slots available before the first growth.
    ///
    /// Zero is allowed; the first commit then grows the store.
    pub initial_capacity: u32,

    /// Sizing rule used when the store must grow.
    pub growth: GrowthPolicy,
}

impl BufferConfig {
    /// Default record footprint: one slot per record.
    pub const DEFAULT_OBJECT_SIZE: u32 = 1;

    /// Default initial capacity in slots.
    pub const DEFAULT_INITIAL_CAPACITY: u32 = 1024;

    /// Create a config with the given record size and initial capacity.
    ///
    /// Uses [`GrowthPolicy::Exact`].
    pub fn new(object_size: u32, initial_capacity: u32) -> Self {
        Self {
            object_size,
            initial_capacity,
            growth: GrowthPolicy::default(),
        }
    }

    /// Replace the growth policy.
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Check the config before a buffer is built from it.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.object_size == 0 {
            return Err(BufferError::InvalidConfig {
                reason: "object_size must be non-zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OBJECT_SIZE, Self::DEFAULT_INITIAL_CAPACITY)
    }
}
