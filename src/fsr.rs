use crate::error::{GeometryError, Result};
use crate::geometry::Geometry;
use crate::local_coords::{LevelKind, LocalCoords};
use crate::universe::UniverseKind;
use tracing::info;

/// One step of the path from the root universe down to a flat source region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsrStep {
    /// Cell (by uid) chosen in a simple universe.
    Cell(usize),
    /// Tile (i, j) chosen in a lattice (by universe uid).
    Tile { lattice: usize, i: usize, j: usize },
}

impl Geometry {
    /// Number the flat source regions below the root universe and fill the
    /// FSR to cell and FSR to material tables.
    pub(crate) fn compute_fsr_maps(&mut self) -> Result<()> {
        let root = self.root_uid()?;
        for universe in &mut self.universes {
            universe.num_fsrs = None;
            universe.fsr_offsets.clear();
        }
        let mut visiting = vec![false; self.universes.len()];
        self.num_fsrs = self.count_fsrs(root, &mut visiting)?;

        let mut fsrs_to_cells = Vec::with_capacity(self.num_fsrs);
        for fsr in 0..self.num_fsrs {
            fsrs_to_cells.push(self.find_cell_for_fsr(fsr)?);
        }
        self.fsrs_to_materials = fsrs_to_cells
            .iter()
            .map(|&cell| self.cells[cell].material().unwrap_or_default())
            .collect();
        self.fsrs_to_cells = fsrs_to_cells;
        info!(fsrs = self.num_fsrs, "enumerated flat source regions");
        Ok(())
    }

    /// Number of FSRs below universe `uid`, assigning block offsets to its
    /// cells or tiles on the first visit.
    fn count_fsrs(&mut self, uid: usize, visiting: &mut [bool]) -> Result<usize> {
        if let Some(count) = self.universes[uid].num_fsrs {
            return Ok(count);
        }
        if visiting[uid] {
            return Err(GeometryError::CyclicUniverse {
                id: self.universes[uid].universe_id,
            });
        }
        visiting[uid] = true;

        let mut count = 0;
        match &self.universes[uid].kind {
            UniverseKind::Simple { cells } => {
                let mut cells = cells.clone();
                cells.sort_by_key(|&c| self.cells[c].cell_id);
                for cell in cells {
                    self.universes[uid].fsr_offsets.insert(cell, count);
                    count += match self.cells[cell].fill() {
                        Some(fill) => self.count_fsrs(fill, visiting)?,
                        None => 1,
                    };
                }
            }
            UniverseKind::Lattice(lattice) => {
                let tiles = lattice.tiles.clone();
                let mut offsets = Vec::with_capacity(tiles.len());
                for tile in tiles {
                    offsets.push(count);
                    count += self.count_fsrs(tile, visiting)?;
                }
                if let UniverseKind::Lattice(lattice) = &mut self.universes[uid].kind {
                    lattice.fsr_offsets = offsets;
                }
            }
        }

        visiting[uid] = false;
        self.universes[uid].num_fsrs = Some(count);
        Ok(count)
    }

    /// Sum of the FSR offsets along a located position: the id of the flat
    /// source region the position lies in.
    pub fn find_fsr_id(&self, coords: &LocalCoords) -> usize {
        coords
            .levels()
            .iter()
            .map(|level| match level.kind {
                LevelKind::Univ {
                    universe,
                    cell: Some(cell),
                } => self.universes[universe].fsr_offset(cell),
                LevelKind::Univ { cell: None, .. } => 0,
                LevelKind::Lat { lattice, i, j } => self.universes[lattice]
                    .lattice()
                    .map_or(0, |l| l.fsr_offset(i, j)),
            })
            .sum()
    }

    /// Cells and tiles leading from the root universe to flat source region
    /// `fsr`; the last step is the material cell.
    pub fn fsr_path(&self, fsr: usize) -> Result<Vec<FsrStep>> {
        let root = self.root_uid()?;
        let num_fsrs = self.universes[root].num_fsrs.unwrap_or(0);
        let invalid = GeometryError::InvalidFsr { fsr, num_fsrs };
        if fsr >= num_fsrs {
            return Err(invalid);
        }

        let mut path = Vec::new();
        let mut remaining = fsr;
        let mut uid = root;
        loop {
            let universe = &self.universes[uid];
            match &universe.kind {
                UniverseKind::Simple { cells } => {
                    // Block containing the id: largest base not above it, the
                    // last such cell in id order when empty blocks share a base
                    let (base, cell) = cells
                        .iter()
                        .map(|&c| (universe.fsr_offset(c), c))
                        .filter(|&(base, _)| base <= remaining)
                        .max_by_key(|&(base, c)| (base, self.cells[c].cell_id))
                        .ok_or_else(|| invalid.clone())?;
                    remaining -= base;
                    path.push(FsrStep::Cell(cell));
                    match self.cells[cell].fill() {
                        Some(fill) => uid = fill,
                        None if remaining == 0 => return Ok(path),
                        None => return Err(invalid),
                    }
                }
                UniverseKind::Lattice(lattice) => {
                    let tile = lattice
                        .fsr_offsets
                        .iter()
                        .rposition(|&offset| offset <= remaining)
                        .ok_or_else(|| invalid.clone())?;
                    remaining -= lattice.fsr_offsets[tile];
                    path.push(FsrStep::Tile {
                        lattice: uid,
                        i: tile % lattice.num_x,
                        j: tile / lattice.num_x,
                    });
                    uid = lattice.tiles[tile];
                }
            }
        }
    }

    /// Material cell (by uid) of flat source region `fsr`.
    pub fn find_cell_for_fsr(&self, fsr: usize) -> Result<usize> {
        match self.fsr_path(fsr)?.last() {
            Some(FsrStep::Cell(cell)) => Ok(*cell),
            _ => Err(GeometryError::InvalidFsr {
                fsr,
                num_fsrs: self.num_fsrs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::lattice::Lattice;
    use crate::material::Material;
    use crate::point::Point;
    use crate::region::HalfspaceType::{Above, Below};
    use crate::surface::Surface;

    /// Root universe 0 holds a fill cell (id 1) with universe 5 and a plain
    /// cell (id 2). Universe 5 is split by x = 0 into cells 7 and 3.
    fn nested() -> Geometry {
        let mut geometry = Geometry::new();
        geometry
            .add_material(Material::new(1, vec![1.0], vec![1.0], vec![vec![0.0]]))
            .unwrap();
        geometry.add_surface(Surface::y_plane(0.0, 1, None)).unwrap();
        geometry.add_surface(Surface::x_plane(0.0, 2, None)).unwrap();
        geometry.add_cell(Cell::new_material(2, 0, 1, &[Above(1)])).unwrap();
        geometry.add_cell(Cell::new_fill(1, 0, 5, &[Below(1)])).unwrap();
        geometry.add_cell(Cell::new_material(7, 5, 1, &[Below(2)])).unwrap();
        geometry.add_cell(Cell::new_material(3, 5, 1, &[Above(2)])).unwrap();
        geometry.finalize().unwrap();
        geometry
    }

    #[test]
    fn test_nested_enumeration() {
        let geometry = nested();
        assert_eq!(geometry.num_fsrs(), 3);
        // Cells visited in id order: fill cell 1 takes ids 0..2, cell 2 takes 2
        let ids: Vec<i32> = geometry
            .fsr_to_cells()
            .iter()
            .map(|&c| geometry.cells()[c].cell_id)
            .collect();
        assert_eq!(ids, vec![3, 7, 2]);
    }

    #[test]
    fn test_find_fsr_id_round_trip() {
        let geometry = nested();
        for (x, y) in [(0.5, -0.5), (-0.5, -0.5), (0.0, 3.0)] {
            let (coords, cell) = geometry.locate(Point::new(x, y)).unwrap();
            let fsr = geometry.find_fsr_id(&coords);
            assert_eq!(geometry.find_cell_for_fsr(fsr).unwrap(), cell);
        }
    }

    #[test]
    fn test_fsr_out_of_range() {
        let geometry = nested();
        assert_eq!(
            geometry.find_cell_for_fsr(3),
            Err(GeometryError::InvalidFsr { fsr: 3, num_fsrs: 3 })
        );
    }

    #[test]
    fn test_lattice_offsets_row_major() {
        let mut geometry = Geometry::new();
        geometry
            .add_material(Material::new(1, vec![1.0], vec![1.0], vec![vec![0.0]]))
            .unwrap();
        geometry.add_surface(Surface::x_plane(0.0, 1, None)).unwrap();
        // Universe 1 has one region, universe 2 has two
        geometry.add_cell(Cell::new_material(1, 1, 1, &[])).unwrap();
        geometry.add_cell(Cell::new_material(2, 2, 1, &[Below(1)])).unwrap();
        geometry.add_cell(Cell::new_material(3, 2, 1, &[Above(1)])).unwrap();
        geometry
            .add_lattice(Lattice::new(0, 1.0, 1.0, vec![vec![1, 1], vec![2, 1]]))
            .unwrap();
        geometry.finalize().unwrap();
        assert_eq!(geometry.num_fsrs(), 5);
        let lattice = geometry.lattice(0).unwrap();
        assert_eq!(lattice.fsr_offsets, vec![0, 2, 3, 4]);
        assert_eq!(
            geometry.fsr_path(1).unwrap(),
            vec![
                FsrStep::Tile { lattice: 2, i: 0, j: 0 },
                FsrStep::Cell(2)
            ]
        );
    }

    #[test]
    fn test_cyclic_universe() {
        let mut geometry = Geometry::new();
        geometry.add_cell(Cell::new_fill(1, 0, 4, &[])).unwrap();
        geometry.add_cell(Cell::new_fill(2, 4, 0, &[])).unwrap();
        assert!(matches!(
            geometry.finalize(),
            Err(GeometryError::CyclicUniverse { .. })
        ));
    }
}
