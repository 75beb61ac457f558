//! Half-open byte intervals and alignment arithmetic.

/// Round `value` up to the next multiple of `alignment`.
///
/// An alignment of `0` or `1` leaves the value untouched.
///
/// ```
/// use ltk_vstream::round_up;
///
/// assert_eq!(round_up(0, 2048), 0);
/// assert_eq!(round_up(1, 2048), 2048);
/// assert_eq!(round_up(2048, 2048), 2048);
/// assert_eq!(round_up(20, 16), 32);
/// ```
pub fn round_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    match value % alignment {
        0 => value,
        rem => value + (alignment - rem),
    }
}

/// A half-open interval `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OffsetRange {
    pub start: u64,
    pub length: u64,
}

impl OffsetRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Exclusive end of the range.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether `offset` falls inside the range.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// Whether `next` begins exactly where `self` ends.
    pub fn is_adjacent_to(&self, next: &OffsetRange) -> bool {
        self.end() == next.start
    }

    /// Whether the two ranges share at least one byte.
    pub fn overlaps(&self, other: &OffsetRange) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_round_up_properties(value in 0u64..(1 << 40), alignment in 1u64..65536) {
            let rounded = round_up(value, alignment);
            prop_assert!(rounded >= value);
            prop_assert_eq!(rounded % alignment, 0);
            prop_assert!(rounded - value < alignment);
        }
    }

    #[test]
    fn test_round_up_zero() {
        assert_eq!(round_up(0, 16), 0);
        assert_eq!(round_up(0, 2048), 0);
    }

    #[test]
    fn test_round_up_degenerate_alignment() {
        assert_eq!(round_up(13, 0), 13);
        assert_eq!(round_up(13, 1), 13);
    }

    #[test]
    fn test_range_adjacency() {
        let a = OffsetRange::new(0, 16);
        let b = OffsetRange::new(16, 4);
        let c = OffsetRange::new(21, 4);

        assert!(a.is_adjacent_to(&b));
        assert!(!b.is_adjacent_to(&a));
        assert!(!b.is_adjacent_to(&c));
    }

    #[test]
    fn test_range_contains_is_half_open() {
        let range = OffsetRange::new(10, 5);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(14));
        assert!(!range.contains(15));
        assert!(!OffsetRange::new(3, 0).contains(3));
    }

    #[test]
    fn test_range_overlap() {
        let a = OffsetRange::new(0, 10);
        assert!(a.overlaps(&OffsetRange::new(9, 1)));
        assert!(!a.overlaps(&OffsetRange::new(10, 1)));
    }
}
