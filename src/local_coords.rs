use crate::point::Point;

/// What a level of the hierarchy refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelKind {
    /// A simple universe (by uid) and the cell (by uid) chosen in it, once known.
    Univ { universe: usize, cell: Option<usize> },
    /// A lattice (by universe uid) and the tile the point falls in.
    Lat { lattice: usize, i: usize, j: usize },
}

/// One frame of a position: the entity at this level and the point expressed
/// in that entity's local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Level {
    pub kind: LevelKind,
    pub point: Point,
}

impl LevelKind {
    /// Uid of the universe (simple or lattice) this level lives in.
    pub fn universe(&self) -> usize {
        match *self {
            LevelKind::Univ { universe, .. } => universe,
            LevelKind::Lat { lattice, .. } => lattice,
        }
    }
}

impl Level {
    pub fn is_lattice(&self) -> bool {
        matches!(self.kind, LevelKind::Lat { .. })
    }
}

/// Position of a point in the universe hierarchy, ordered from the root
/// universe down to the universe holding the material cell.
///
/// Moving between levels is a pure translation, so shifting the point at any
/// level shifts every level by the same amount.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct LocalCoords {
    levels: Vec<Level>,
}

impl LocalCoords {
    /// Coordinates rooted at universe `root` (by uid), with no cell chosen yet.
    pub fn new(root: usize, point: Point) -> Self {
        LocalCoords {
            levels: vec![Level {
                kind: LevelKind::Univ {
                    universe: root,
                    cell: None,
                },
                point,
            }],
        }
    }

    /// Coordinates starting from an arbitrary top level.
    pub fn from_level(level: Level) -> Self {
        LocalCoords { levels: vec![level] }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, depth: usize) -> Option<&Level> {
        self.levels.get(depth)
    }

    pub(crate) fn level_mut(&mut self, depth: usize) -> Option<&mut Level> {
        self.levels.get_mut(depth)
    }

    /// Root-frame point
    pub fn point(&self) -> Point {
        self.levels.first().map(|l| l.point).unwrap_or_default()
    }

    pub fn lowest_level(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn push(&mut self, level: Level) {
        self.levels.push(level);
    }

    /// Drop every level below `depth`, keeping levels `0..=depth`.
    pub fn prune(&mut self, depth: usize) {
        self.levels.truncate(depth + 1);
    }

    /// Shift the point at every level by (dx, dy).
    pub fn adjust_coords(&mut self, dx: f64, dy: f64) {
        for level in &mut self.levels {
            level.point = level.point.translate(dx, dy);
        }
    }

    /// Depths of the lattice levels, top to bottom.
    pub fn lattice_depths(&self) -> Vec<usize> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_lattice())
            .map(|(depth, _)| depth)
            .collect()
    }
}
