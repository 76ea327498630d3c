//! Coverage helpers for `(index, length)` span sets.
//!
//! Written against plain tuples so they work for any range representation:
//! map your ranges to `(index, length)` and pass them in.

/// Whether `spans` cover `[0, capacity)` exactly once.
pub fn covers_exactly(spans: &[(u32, u32)], capacity: u32) -> bool {
    let mut sorted = spans.to_vec();
    sorted.sort_unstable();
    let mut cursor = 0u64;
    for &(index, length) in &sorted {
        if length == 0 || u64::from(index) != cursor {
            return false;
        }
        cursor += u64::from(length);
    }
    cursor == u64::from(capacity)
}

/// Whether any two spans are index-adjacent.
pub fn spans_adjacent(spans: &[(u32, u32)]) -> bool {
    spans.iter().enumerate().any(|(i, &(ai, al))| {
        spans[i + 1..].iter().any(|&(bi, bl)| {
            u64::from(ai) + u64::from(al) == u64::from(bi)
                || u64::from(bi) + u64::from(bl) == u64::from(ai)
        })
    })
}

/// Panic with a readable message unless `free` and `used` tile `capacity`.
pub fn assert_tiles(free: &[(u32, u32)], used: &[(u32, u32)], capacity: u32) {
    let all: Vec<(u32, u32)> = free.iter().chain(used.iter()).copied().collect();
    assert!(
        covers_exactly(&all, capacity),
        "spans do not tile [0, {capacity}): free={free:?} used={used:?}"
    );
}
