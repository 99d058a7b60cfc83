use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

/// Inclusive range of slot numbers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub start: u64,
    pub end: u64,
}

impl SlotRange {
    /// Returns `None` when `start > end`, i.e. there is nothing to do.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(SlotRange { start, end })
    }

    /// Number of slots. Saturates for the full `0..=u64::MAX` range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn ids(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Splits the range into contiguous batches of at most `size` slots.
    /// The last batch may be shorter.
    pub fn batches(&self, size: u64) -> Batches {
        Batches {
            next: Some(self.start),
            end: self.end,
            size: size.max(1),
        }
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct Batches {
    next: Option<u64>,
    end: u64,
    size: u64,
}

impl Iterator for Batches {
    type Item = SlotRange;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.size - 1).min(self.end);

        self.next = if end >= self.end { None } else { Some(end + 1) };
        Some(SlotRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_when_start_after_end() {
        assert_eq!(SlotRange::new(10, 9), None);
    }

    #[test]
    fn splits_into_fixed_size_batches() {
        let range = SlotRange::new(0, 1_249).unwrap();
        let batches: Vec<_> = range.batches(500).collect();

        assert_eq!(
            batches,
            vec![
                SlotRange { start: 0, end: 499 },
                SlotRange { start: 500, end: 999 },
                SlotRange { start: 1_000, end: 1_249 },
            ]
        );
    }

    #[test]
    fn single_slot_range_is_one_batch() {
        let range = SlotRange::new(42, 42).unwrap();
        let batches: Vec<_> = range.batches(500).collect();
        assert_eq!(batches, vec![range]);
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn batches_do_not_overflow_at_u64_max() {
        let range = SlotRange::new(u64::MAX - 2, u64::MAX).unwrap();
        let batches: Vec<_> = range.batches(2).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].end, u64::MAX);
    }

    #[test]
    fn full_range_len_saturates() {
        let range = SlotRange::new(0, u64::MAX).unwrap();
        assert_eq!(range.len(), u64::MAX);
    }
}
