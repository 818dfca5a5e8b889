//! Static range partitioning.
//!
//! ```text
//! total = 10, size = 3  ->  chunk = 3
//!
//!   Rank 0: [0, 3)
//!   Rank 1: [3, 6)
//!   Rank 2: [6, 10)   <- last rank absorbs the remainder
//! ```
//!
//! Every rank computes its own slice from `(total, size, rank)` alone, so all
//! ranks agree on the boundaries without exchanging them.

use std::ops::Range;

use crate::group::GroupDescriptor;

/// Half-open slice `[start, end)` of the global unit range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubRange {
    pub start: u64,
    pub end: u64,
}

impl SubRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "inverted sub-range [{start}, {end})");
        Self { start, end }
    }

    /// Slice owned by `group.rank()` out of `[0, total_units)`.
    ///
    /// `chunk = total / size`; every rank takes `chunk` units except the
    /// highest, which runs to `total_units`. When `total_units < size` all
    /// ranks but the last get an empty slice.
    pub fn for_rank(total_units: u64, group: &GroupDescriptor) -> Self {
        let size = group.size() as u64;
        let rank = group.rank() as u64;

        let chunk = total_units / size;
        let start = rank * chunk;
        let end = if group.rank() == group.last_rank() {
            total_units
        } else {
            start + chunk
        };

        Self::new(start, end)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn units(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl std::fmt::Display for SubRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
