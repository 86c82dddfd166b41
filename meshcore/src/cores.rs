//! Logical cores inside one chip, and rectangular groups of them.

use crate::helpe::*;

/// The kind of core a semaphore lives on. Semaphores of different core
/// types sit in different L1s and can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum CoreType {
    /// A Tensix compute core.
    Worker,
    /// An idle or active Ethernet core.
    Ethernet,
}

/// A logical core position: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CoreCoord {
    pub x:  usize,
    pub y:  usize,
}

impl CoreCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CoreCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={},y={})", self.x, self.y)
    }
}

/// An inclusive rectangle of cores, `start` being its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreRange {
    start:  CoreCoord,
    end:    CoreCoord,
}

impl CoreRange {
    pub fn new(start: CoreCoord, end: CoreCoord) -> Self {
        assert!(
            start.x <= end.x && start.y <= end.y,
            "Invalid core range: start {start} must be less than or equal to end {end}"
        );

        Self { start, end }
    }

    /// A range covering exactly one core.
    pub fn single(core: CoreCoord) -> Self {
        Self { start: core, end: core }
    }

    pub fn start(&self) -> CoreCoord {
        self.start
    }

    pub fn end(&self) -> CoreCoord {
        self.end
    }

    #[inline(always)]
    pub fn contains(&self, core: &CoreCoord) -> bool {
        core.x >= self.start.x && core.x <= self.end.x &&
        core.y >= self.start.y && core.y <= self.end.y
    }

    #[inline(always)]
    pub fn intersects(&self, other: &Self) -> bool {
        self.start.x <= other.end.x && other.start.x <= self.end.x &&
        self.start.y <= other.end.y && other.start.y <= self.end.y
    }

    pub fn num_cores(&self) -> usize {
        (self.end.x - self.start.x + 1) * (self.end.y - self.start.y + 1)
    }

    /// Every core of the range, row by row.
    pub fn cores(&self) -> impl Iterator<Item = CoreCoord> + '_ {
        (self.start.y..=self.end.y)
            .cartesian_product(self.start.x..=self.end.x)
            .map(|(y, x)| CoreCoord::new(x, y))
    }
}

impl From<CoreCoord> for CoreRange {
    fn from(core: CoreCoord) -> Self {
        Self::single(core)
    }
}

impl fmt::Display for CoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// A set of pairwise disjoint [CoreRange]s on one chip.
///
/// Ranges are kept sorted, so two sets built from the same ranges in a
/// different order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CoreRangeSet {
    ranges: Vec<CoreRange>,
}

impl CoreRangeSet {
    /// Panics if any two of `ranges` overlap: a set that claims the same
    /// core twice can only come from a bug in the caller.
    pub fn new(ranges: impl IntoIterator<Item = CoreRange>) -> Self {
        let ranges: Vec<CoreRange> = ranges.into_iter()
            .sorted_unstable()
            .dedup()
            .collect();
        if let Some((a, b)) = ranges.iter()
            .tuple_combinations()
            .find(|(a, b)| a.intersects(b)) {
            panic!("Overlapping core ranges {a} and {b} in one set");
        }

        Self { ranges }
    }

    pub fn ranges(&self) -> &[CoreRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns `true` if `core` belongs to any of the set's ranges.
    #[inline(always)]
    pub fn contains(&self, core: &CoreCoord) -> bool {
        self.ranges
            .iter()
            .any(|r| r.contains(core))
    }

    /// Returns `true` if at least one core belongs to both sets.
    pub fn intersects(&self, other: &Self) -> bool {
        self.ranges
            .iter()
            .cartesian_product(other.ranges.iter())
            .any(|(a, b)| a.intersects(b))
    }

    pub fn num_cores(&self) -> usize {
        self.ranges.iter().map(CoreRange::num_cores).sum()
    }

    /// Smallest single range enclosing the whole set.
    pub fn bounding_box(&self) -> Option<CoreRange> {
        let first = self.ranges.first()?;
        let (lo, hi) = self.ranges
            .iter()
            .skip(1)
            .fold((first.start, first.end), |(lo, hi), r| {
                (
                    CoreCoord::new(lo.x.min(r.start.x), lo.y.min(r.start.y)),
                    CoreCoord::new(hi.x.max(r.end.x), hi.y.max(r.end.y)),
                )
            });

        Some(CoreRange::new(lo, hi))
    }

    pub fn cores(&self) -> impl Iterator<Item = CoreCoord> + '_ {
        self.ranges.iter().flat_map(|r| r.cores())
    }
}

impl From<CoreRange> for CoreRangeSet {
    fn from(range: CoreRange) -> Self {
        Self { ranges: vec![range] }
    }
}

impl From<CoreCoord> for CoreRangeSet {
    fn from(core: CoreCoord) -> Self {
        Self::from(CoreRange::single(core))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: usize, y0: usize, x1: usize, y1: usize) -> CoreRange {
        CoreRange::new(CoreCoord::new(x0, y0), CoreCoord::new(x1, y1))
    }

    #[test]
    fn range_membership_is_inclusive() {
        let r = rect(1, 1, 2, 3);
        assert!(r.contains(&CoreCoord::new(1, 1)));
        assert!(r.contains(&CoreCoord::new(2, 3)));
        assert!(!r.contains(&CoreCoord::new(3, 3)));
        assert!(!r.contains(&CoreCoord::new(0, 2)));
        assert_eq!(r.num_cores(), 6);
        assert_eq!(r.cores().count(), 6);
    }

    #[test]
    fn range_intersection() {
        assert!(rect(0, 0, 2, 2).intersects(&rect(2, 2, 4, 4)));
        assert!(!rect(0, 0, 2, 2).intersects(&rect(3, 0, 4, 2)));
        assert!(rect(0, 0, 7, 0).intersects(&rect(4, 0, 4, 5)));
    }

    #[test]
    #[should_panic(expected = "Invalid core range")]
    fn inverted_range_panics() {
        rect(2, 0, 1, 0);
    }

    #[test]
    fn set_membership_and_order() {
        let a = CoreRangeSet::new([rect(4, 0, 5, 0), rect(0, 0, 1, 1)]);
        let b = CoreRangeSet::new([rect(0, 0, 1, 1), rect(4, 0, 5, 0)]);
        assert_eq!(a, b);
        assert!(a.contains(&CoreCoord::new(5, 0)));
        assert!(!a.contains(&CoreCoord::new(3, 0)));
        assert_eq!(a.num_cores(), 6);
        assert_eq!(a.bounding_box(), Some(rect(0, 0, 5, 1)));
        assert!(CoreRangeSet::default().bounding_box().is_none());
    }

    #[test]
    fn set_intersection() {
        let a = CoreRangeSet::new([rect(0, 0, 1, 1), rect(4, 0, 5, 0)]);
        let b = CoreRangeSet::from(CoreCoord::new(5, 0));
        let c = CoreRangeSet::from(rect(2, 0, 3, 3));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&CoreRangeSet::default()));
    }

    #[test]
    #[should_panic(expected = "Overlapping core ranges")]
    fn overlapping_set_panics() {
        CoreRangeSet::new([rect(0, 0, 2, 2), rect(1, 1, 3, 3)]);
    }
}
