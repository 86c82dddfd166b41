use crate::helpe::*;

impl Coordinate {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Position of `self` in a row-major walk over a grid that is
    /// `num_cols` wide.
    #[inline(always)]
    pub fn linear_index(&self, num_cols: usize) -> usize {
        debug_assert!(self.col < num_cols, "Column {} outside a {num_cols}-wide grid", self.col);
        self.row * num_cols + self.col
    }

    /// Inverse of [`Coordinate::linear_index`].
    #[inline(always)]
    pub fn from_linear_index(idx: usize, num_cols: usize) -> Self {
        assert!(num_cols > 0, "Zero-width grid");
        Self::new(idx / num_cols, idx % num_cols)
    }

    /// Returns `true` if `self` is above-left of (or equal to) `other`
    /// in BOTH axes.
    #[inline(always)]
    pub fn precedes(&self, other: &Self) -> bool {
        self.row <= other.row && self.col <= other.col
    }

    /// Returns `true` if `self` lies within the inclusive rectangle
    /// `[top_left, bottom_right]`.
    #[inline(always)]
    pub fn within(&self, top_left: &Self, bottom_right: &Self) -> bool {
        top_left.precedes(self) && self.precedes(bottom_right)
    }

    /// Componentwise `self + other`.
    #[inline(always)]
    pub fn offset_by(&self, other: &Self) -> Self {
        Self::new(self.row + other.row, self.col + other.col)
    }

    /// Componentwise min and max over `coords`, or `None` if there are none.
    pub fn bounding_box<'c, I>(coords: I) -> Option<(Self, Self)>
    where I: IntoIterator<Item = &'c Self> {
        coords.into_iter()
            .fold(None, |acc, c| {
                match acc {
                    None            => Some((*c, *c)),
                    Some((lo, hi))  => Some((
                        Self::new(lo.row.min(c.row), lo.col.min(c.col)),
                        Self::new(hi.row.max(c.row), hi.col.max(c.col)),
                    )),
                }
            })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Coordinate {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}
