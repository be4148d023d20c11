//! Character ranges, classes, and alphabet partitioning
//!
//! Automaton transitions are keyed by inclusive character ranges. Before
//! determinization every range used by an NFA is split into disjoint atoms so
//! that each DFA state has at most one successor per character.

use std::fmt;

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;

/// An inclusive range of characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharRange {
    /// First character in the range
    pub start: char,
    /// Last character in the range
    pub end: char,
}

impl CharRange {
    /// Create a range; the bounds are swapped if given in reverse
    pub fn new(start: char, end: char) -> Self {
        if start <= end {
            CharRange { start, end }
        } else {
            CharRange {
                start: end,
                end: start,
            }
        }
    }

    /// A range holding exactly one character
    pub fn single(c: char) -> Self {
        CharRange { start: c, end: c }
    }

    /// Check whether `c` lies in the range
    pub fn contains(&self, c: char) -> bool {
        self.start <= c && c <= self.end
    }

    /// Check whether `other` lies entirely inside this range
    pub fn covers(&self, other: &CharRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn from_scalars(lo: u32, hi: u32) -> Option<Self> {
        // Clamp around the surrogate gap, which holds no chars.
        let lo = if (SURROGATE_START..=SURROGATE_END).contains(&lo) {
            SURROGATE_END + 1
        } else {
            lo
        };
        let hi = if (SURROGATE_START..=SURROGATE_END).contains(&hi) {
            SURROGATE_START - 1
        } else {
            hi
        };
        if lo > hi {
            return None;
        }
        Some(CharRange {
            start: char::from_u32(lo)?,
            end: char::from_u32(hi)?,
        })
    }
}

/// Scalar value following `c`, skipping the surrogate gap
fn next_scalar(c: char) -> u32 {
    let n = c as u32 + 1;
    if n == SURROGATE_START {
        SURROGATE_END + 1
    } else {
        n
    }
}

/// A normalized set of characters: sorted, non-overlapping, non-adjacent ranges
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CharClass {
    ranges: Vec<CharRange>,
}

impl CharClass {
    /// Build a class from arbitrary ranges
    pub fn new(ranges: impl IntoIterator<Item = CharRange>) -> Self {
        let mut ranges: Vec<CharRange> = ranges.into_iter().collect();
        ranges.sort();
        let mut merged: Vec<CharRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start as u32 <= next_scalar(last.end) => {
                    if range.end > last.end {
                        last.end = range.end;
                    }
                }
                _ => merged.push(range),
            }
        }
        CharClass { ranges: merged }
    }

    /// Build the complement of the given ranges over all of Unicode
    pub fn negated(ranges: impl IntoIterator<Item = CharRange>) -> Self {
        let positive = CharClass::new(ranges);
        let mut complement = Vec::new();
        let mut lo = 0u32;
        for range in &positive.ranges {
            let start = range.start as u32;
            if start > lo {
                complement.extend(CharRange::from_scalars(lo, start - 1));
            }
            lo = next_scalar(range.end);
        }
        if lo <= char::MAX as u32 {
            complement.extend(CharRange::from_scalars(lo, char::MAX as u32));
        }
        CharClass::new(complement)
    }

    /// A class holding exactly one character
    pub fn single(c: char) -> Self {
        CharClass {
            ranges: vec![CharRange::single(c)],
        }
    }

    /// The class of every character
    pub fn any() -> Self {
        CharClass::negated(std::iter::empty())
    }

    /// The normalized ranges
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    /// Check whether `c` is a member
    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|range| {
                if range.end < c {
                    std::cmp::Ordering::Less
                } else if range.start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Check whether the class matches nothing
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The sole member, if the class holds exactly one character
    pub fn as_char(&self) -> Option<char> {
        match self.ranges.as_slice() {
            [range] if range.start == range.end => Some(range.start),
            _ => None,
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::emit::class_to_regex(self))
    }
}

/// Split a collection of ranges into disjoint atoms
///
/// Every input range is exactly the union of the atoms it covers, and no two
/// atoms overlap. The atoms are returned in ascending order.
pub fn partition(ranges: &[CharRange]) -> Vec<CharRange> {
    let mut bounds: Vec<u32> = Vec::with_capacity(ranges.len() * 2);
    for range in ranges {
        bounds.push(range.start as u32);
        bounds.push(range.end as u32 + 1);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut atoms = Vec::new();
    for pair in bounds.windows(2) {
        let Some(atom) = CharRange::from_scalars(pair[0], pair[1] - 1) else {
            continue;
        };
        if ranges.iter().any(|range| range.covers(&atom)) {
            atoms.push(atom);
        }
    }
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_merges_adjacent_ranges() {
        let class = CharClass::new([
            CharRange::new('d', 'f'),
            CharRange::new('a', 'c'),
            CharRange::single('x'),
        ]);
        assert_eq!(
            class.ranges(),
            &[CharRange::new('a', 'f'), CharRange::single('x')]
        );
    }

    #[test]
    fn test_class_contains() {
        let class = CharClass::new([CharRange::new('a', 'z'), CharRange::new('0', '9')]);
        assert!(class.contains('m'));
        assert!(class.contains('5'));
        assert!(!class.contains('M'));
    }

    #[test]
    fn test_negated_class() {
        let class = CharClass::negated([CharRange::new('b', 'y')]);
        assert!(class.contains('a'));
        assert!(class.contains('z'));
        assert!(class.contains('\u{10FFFF}'));
        assert!(!class.contains('m'));
    }

    #[test]
    fn test_any_spans_surrogate_gap() {
        let any = CharClass::any();
        assert_eq!(
            any.ranges(),
            &[CharRange::new('\0', char::MAX)],
            "the gap is invisible to char ranges"
        );
    }

    #[test]
    fn test_as_char() {
        assert_eq!(CharClass::single('k').as_char(), Some('k'));
        assert_eq!(CharClass::new([CharRange::new('a', 'b')]).as_char(), None);
    }

    #[test]
    fn test_partition_splits_overlaps() {
        let atoms = partition(&[CharRange::new('a', 'z'), CharRange::single('k')]);
        assert_eq!(
            atoms,
            vec![
                CharRange::new('a', 'j'),
                CharRange::single('k'),
                CharRange::new('l', 'z'),
            ]
        );
    }

    #[test]
    fn test_partition_skips_gaps() {
        let atoms = partition(&[CharRange::single('a'), CharRange::single('c')]);
        assert_eq!(atoms, vec![CharRange::single('a'), CharRange::single('c')]);
    }

    #[test]
    fn test_partition_around_surrogates() {
        let atoms = partition(&[
            CharRange::new('\u{D000}', '\u{D7FF}'),
            CharRange::new('\u{D000}', '\u{E005}'),
        ]);
        assert_eq!(
            atoms,
            vec![
                CharRange::new('\u{D000}', '\u{D7FF}'),
                CharRange::new('\u{E000}', '\u{E005}'),
            ]
        );
    }
}
