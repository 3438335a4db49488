use crate::geometry::Geometry;
use crate::lattice::Lattice;
use crate::local_coords::{Level, LevelKind, LocalCoords};
use crate::point::Point;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub enum UniverseKind {
    /// Cells (by uid) in insertion order.
    Simple { cells: Vec<usize> },
    Lattice(Lattice),
}

/// A coordinate frame populated by cells, or a lattice of other universes.
#[derive(Clone, Debug, PartialEq)]
pub struct Universe {
    pub universe_id: i32,
    pub uid: usize,
    pub kind: UniverseKind,
    /// First FSR id of each cell (by uid) relative to this universe.
    pub fsr_offsets: BTreeMap<usize, usize>,
    /// Number of FSRs below this universe, once enumerated.
    pub num_fsrs: Option<usize>,
}

impl Universe {
    pub fn new_simple(universe_id: i32) -> Self {
        Universe {
            universe_id,
            uid: 0,
            kind: UniverseKind::Simple { cells: Vec::new() },
            fsr_offsets: BTreeMap::new(),
            num_fsrs: None,
        }
    }

    pub fn new_lattice(lattice: Lattice) -> Self {
        Universe {
            universe_id: lattice.lattice_id,
            uid: 0,
            kind: UniverseKind::Lattice(lattice),
            fsr_offsets: BTreeMap::new(),
            num_fsrs: None,
        }
    }

    pub fn is_lattice(&self) -> bool {
        matches!(self.kind, UniverseKind::Lattice(_))
    }

    pub fn lattice(&self) -> Option<&Lattice> {
        match &self.kind {
            UniverseKind::Lattice(lattice) => Some(lattice),
            UniverseKind::Simple { .. } => None,
        }
    }

    /// Cells (by uid) of a simple universe; empty for lattices.
    pub fn cells(&self) -> &[usize] {
        match &self.kind {
            UniverseKind::Simple { cells } => cells,
            UniverseKind::Lattice(_) => &[],
        }
    }

    pub(crate) fn add_cell(&mut self, cell_uid: usize) {
        if let UniverseKind::Simple { cells } = &mut self.kind {
            cells.push(cell_uid);
        }
    }

    pub fn fsr_offset(&self, cell_uid: usize) -> usize {
        self.fsr_offsets.get(&cell_uid).copied().unwrap_or(0)
    }

    /// Level describing a point in this universe's frame, before any cell or
    /// tile has been chosen.
    pub(crate) fn entry_level(&self, point: Point) -> Level {
        let kind = match self.kind {
            UniverseKind::Simple { .. } => LevelKind::Univ {
                universe: self.uid,
                cell: None,
            },
            UniverseKind::Lattice(_) => LevelKind::Lat {
                lattice: self.uid,
                i: 0,
                j: 0,
            },
        };
        Level { kind, point }
    }

    /// Find the material cell containing the point held at `depth`, which must
    /// be a level of this universe. Levels below `depth` are rebuilt on the
    /// way down. Returns the material cell uid, or None if no cell contains
    /// the point.
    pub fn find_cell(&self, coords: &mut LocalCoords, depth: usize, geometry: &Geometry) -> Option<usize> {
        let point = coords.level(depth)?.point;
        match &self.kind {
            UniverseKind::Lattice(lattice) => lattice.find_cell(self.uid, coords, depth, geometry),
            UniverseKind::Simple { cells } => {
                let cell_uid = cells
                    .iter()
                    .copied()
                    .find(|&c| geometry.cells[c].contains(&point, &geometry.surfaces))?;
                coords.prune(depth);
                if let Some(level) = coords.level_mut(depth) {
                    level.kind = LevelKind::Univ {
                        universe: self.uid,
                        cell: Some(cell_uid),
                    };
                }
                match geometry.cells[cell_uid].fill() {
                    None => Some(cell_uid),
                    Some(fill) => {
                        let inner = &geometry.universes[fill];
                        coords.push(inner.entry_level(point));
                        inner.find_cell(coords, depth + 1, geometry)
                    }
                }
            }
        }
    }
}

impl Lattice {
    /// Choose the tile under the lattice-frame point held at `depth`, then
    /// descend into that tile's universe with the point in the tile frame.
    pub fn find_cell(
        &self,
        lattice_uid: usize,
        coords: &mut LocalCoords,
        depth: usize,
        geometry: &Geometry,
    ) -> Option<usize> {
        let point = coords.level(depth)?.point;
        let (i, j) = self.tile_indices(&point)?;
        coords.prune(depth);
        if let Some(level) = coords.level_mut(depth) {
            level.kind = LevelKind::Lat {
                lattice: lattice_uid,
                i,
                j,
            };
        }
        let center = self.tile_center(i, j);
        let tile_point = Point::new(point.x - center.x, point.y - center.y);
        let tile = &geometry.universes[self.tile_universe(i, j)];
        coords.push(tile.entry_level(tile_point));
        tile.find_cell(coords, depth + 1, geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_universe_cells() {
        let mut universe = Universe::new_simple(3);
        universe.add_cell(4);
        universe.add_cell(1);
        assert_eq!(universe.cells(), &[4, 1]);
        assert!(!universe.is_lattice());
        assert_eq!(universe.fsr_offset(4), 0);
    }

    #[test]
    fn test_lattice_universe() {
        let lattice = Lattice::new(7, 1.0, 1.0, vec![vec![1]]);
        let mut universe = Universe::new_lattice(lattice);
        universe.add_cell(2);
        assert!(universe.is_lattice());
        assert_eq!(universe.universe_id, 7);
        assert!(universe.cells().is_empty());
        assert_eq!(universe.lattice().map(|l| l.num_tiles()), Some(1));
    }

    #[test]
    fn test_entry_level_kind() {
        let mut universe = Universe::new_simple(3);
        universe.uid = 5;
        let level = universe.entry_level(Point::new(1.0, 2.0));
        assert_eq!(
            level.kind,
            LevelKind::Univ {
                universe: 5,
                cell: None
            }
        );
    }
}
