use std::cmp::Ordering;
use std::fmt;

/// Position of a scaffold inside a (possibly morphing) scaffold tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TreeIndex {
    pub level: u32,
    pub position: u64,
}

impl TreeIndex {
    pub const fn new(level: u32, position: u64) -> Self {
        Self { level, position }
    }
}

impl fmt::Display for TreeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.level, self.position)
    }
}

/// Shape of a scaffold tree: number of levels and the number of scaffolds on
/// the searchable level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    pub levels: u32,
    pub count_at_level: u64,
}

/// Composite key of one candidate pose at a given resolution.
///
/// `nest_part` addresses a cell of the recursively subdivided rigid-body grid;
/// each finer resolution multiplies it by the fan-out and adds the sub-cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BigIndex {
    pub nest_part: u64,
    pub scaffold_index: TreeIndex,
}

impl BigIndex {
    pub const fn new(nest_part: u64, scaffold_index: TreeIndex) -> Self {
        Self {
            nest_part,
            scaffold_index,
        }
    }

    /// Index of sub-cell `offset` one resolution finer than `self`.
    #[inline]
    pub fn child(&self, dimpow2: u64, offset: u64) -> Self {
        debug_assert!(offset < dimpow2);
        Self {
            nest_part: self.nest_part * dimpow2 + offset,
            scaffold_index: self.scaffold_index,
        }
    }

    /// Index of the enclosing cell one resolution coarser than `self`.
    #[inline]
    pub fn parent(&self, dimpow2: u64) -> Self {
        Self {
            nest_part: self.nest_part / dimpow2,
            scaffold_index: self.scaffold_index,
        }
    }
}

impl fmt::Display for BigIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.nest_part, self.scaffold_index)
    }
}

/// A scored sample. Ordered by score ascending (lower is better), then by index.
#[derive(Debug, Clone, Copy)]
pub struct SearchPoint {
    pub index: BigIndex,
    pub score: f32,
}

impl SearchPoint {
    pub fn new(index: BigIndex) -> Self {
        Self { index, score: 0.0 }
    }

    pub fn with_score(index: BigIndex, score: f32) -> Self {
        Self { index, score }
    }
}

impl PartialEq for SearchPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for SearchPoint {}

impl PartialOrd for SearchPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Rotamer `irot` placed at scaffold sequence position `seqpos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotamerAssignment {
    pub seqpos: usize,
    pub irot: usize,
}

/// A final search result carrying room for the rotamers packed onto it by
/// downstream stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPointWithRots {
    pub index: BigIndex,
    pub score: f32,
    pub rotamers: Vec<RotamerAssignment>,
}

impl From<SearchPoint> for SearchPointWithRots {
    fn from(point: SearchPoint) -> Self {
        Self {
            index: point.index,
            score: point.score,
            rotamers: Vec::new(),
        }
    }
}

impl SearchPointWithRots {
    pub fn as_search_point(&self) -> SearchPoint {
        SearchPoint::with_score(self.index, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(nest: u64, score: f32) -> SearchPoint {
        SearchPoint::with_score(BigIndex::new(nest, TreeIndex::new(1, 0)), score)
    }

    #[test]
    fn child_and_parent_are_inverse() {
        let index = BigIndex::new(5, TreeIndex::new(1, 3));
        for offset in 0..64 {
            let child = index.child(64, offset);
            assert_eq!(child.nest_part, 5 * 64 + offset);
            assert_eq!(child.scaffold_index, index.scaffold_index);
            assert_eq!(child.parent(64), index);
        }
    }

    #[test]
    fn search_points_order_by_score_then_index() {
        let mut points = vec![point(3, 1.0), point(1, -2.0), point(0, 1.0), point(9, f32::INFINITY)];
        points.sort();
        let order: Vec<u64> = points.iter().map(|p| p.index.nest_part).collect();
        assert_eq!(order, vec![1, 0, 3, 9]);
    }

    #[test]
    fn nan_scores_sort_last() {
        let mut points = vec![point(0, f32::NAN), point(1, 100.0)];
        points.sort();
        assert_eq!(points[0].index.nest_part, 1);
    }

    #[test]
    fn conversion_to_point_with_rots_keeps_index_and_score() {
        let with_rots = SearchPointWithRots::from(point(7, -3.5));
        assert_eq!(with_rots.index.nest_part, 7);
        assert_eq!(with_rots.score, -3.5);
        assert!(with_rots.rotamers.is_empty());
        assert_eq!(with_rots.as_search_point(), point(7, -3.5));
    }
}
