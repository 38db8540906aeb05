//! Range Set Module
//!
//! Tracks which byte offsets of an in-progress upload have been received,
//! as a canonical list of closed intervals: sorted by start, with no two
//! intervals overlapping or adjacent.

/// Closed byte interval `[start, end]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteInterval {
    pub start: u64,
    pub end: u64,
}

impl ByteInterval {
    /// Create an interval. Requires `start <= end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "interval start must not exceed end");
        Self { start, end }
    }

    /// Number of bytes covered by this interval.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// True when the two intervals overlap or touch end-to-start, i.e. can
    /// be replaced by a single interval without covering any new byte.
    pub fn mergeable(&self, other: &ByteInterval) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    /// Merge two intervals. Precondition: `self.mergeable(other)`.
    pub fn merge(&self, other: &ByteInterval) -> ByteInterval {
        ByteInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Canonical set of received byte intervals.
///
/// Invariant after every mutation: sorted ascending by start, no two
/// elements mergeable. Sets only grow; there is no delete operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    intervals: Vec<ByteInterval>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Insert an interval and re-canonicalize: sort by start, then sweep
    /// left to right merging overlapping or adjacent neighbors. Sessions
    /// see a small number of chunks, so the full re-sort per insert is
    /// deliberate simplicity, not an oversight.
    pub fn insert(&mut self, interval: ByteInterval) {
        self.intervals.push(interval);
        self.intervals.sort_by_key(|iv| iv.start);

        let mut merged: Vec<ByteInterval> = Vec::with_capacity(self.intervals.len());
        for iv in self.intervals.drain(..) {
            match merged.last_mut() {
                Some(last) if last.mergeable(&iv) => *last = last.merge(&iv),
                _ => merged.push(iv),
            }
        }
        self.intervals = merged;
    }

    /// True when the set covers exactly `[0, total-1]`.
    ///
    /// A zero-byte object has nothing to receive: it counts as covered only
    /// while the set is empty.
    pub fn is_fully_covered(&self, total: u64) -> bool {
        if total == 0 {
            return self.intervals.is_empty();
        }
        self.intervals.len() == 1
            && self.intervals[0].start == 0
            && self.intervals[0].end == total - 1
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    pub fn intervals(&self) -> &[ByteInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
