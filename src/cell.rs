use crate::point::Point;
use crate::region::{HalfspaceType, Region};
use crate::surface::Surface;
use serde::{Deserialize, Serialize};

/// What fills a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CellKind {
    /// Leaf cell holding a single material, optionally refined into equal
    /// area rings and angular sectors.
    Material {
        material_id: i32,
        #[serde(default)]
        num_rings: usize,
        #[serde(default)]
        num_sectors: usize,
        /// Material uid, resolved by the geometry.
        #[serde(skip)]
        material: usize,
    },
    /// Cell filled by another universe (or lattice) sharing this cell's frame.
    Fill {
        universe_fill: i32,
        /// Universe uid, resolved by the geometry.
        #[serde(skip)]
        fill: usize,
    },
}

/// A cell is the intersection of the halfspaces listed in `surfaces` (signed
/// surface ids; +s is the positive side of s, -s the negative side).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: i32,
    /// Dense, zero-based index assigned when the cell joins a geometry.
    #[serde(skip)]
    pub uid: usize,
    #[serde(default)]
    pub name: Option<String>,
    /// Id of the universe this cell lives in.
    pub universe_id: i32,
    pub kind: CellKind,
    #[serde(default)]
    pub surfaces: Vec<i32>,
    /// Halfspaces resolved against the geometry's surface registry.
    #[serde(skip)]
    pub region: Region,
}

impl Cell {
    pub fn new(cell_id: i32, universe_id: i32, kind: CellKind, halfspaces: &[HalfspaceType]) -> Self {
        Cell {
            cell_id,
            uid: 0,
            name: None,
            universe_id,
            kind,
            surfaces: halfspaces.iter().map(HalfspaceType::signed_id).collect(),
            region: Region::new(),
        }
    }

    /// Material cell without refinement
    pub fn new_material(cell_id: i32, universe_id: i32, material_id: i32, halfspaces: &[HalfspaceType]) -> Self {
        let kind = CellKind::Material {
            material_id,
            num_rings: 0,
            num_sectors: 0,
            material: 0,
        };
        Self::new(cell_id, universe_id, kind, halfspaces)
    }

    pub fn new_fill(cell_id: i32, universe_id: i32, universe_fill: i32, halfspaces: &[HalfspaceType]) -> Self {
        let kind = CellKind::Fill {
            universe_fill,
            fill: 0,
        };
        Self::new(cell_id, universe_id, kind, halfspaces)
    }

    /// Request `num_rings` equal-area rings (material cells only).
    pub fn with_rings(mut self, rings: usize) -> Self {
        if let CellKind::Material { num_rings, .. } = &mut self.kind {
            *num_rings = rings;
        }
        self
    }

    /// Request `num_sectors` angular sectors (material cells only).
    pub fn with_sectors(mut self, sectors: usize) -> Self {
        if let CellKind::Material { num_sectors, .. } = &mut self.kind {
            *num_sectors = sectors;
        }
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_material(&self) -> bool {
        matches!(self.kind, CellKind::Material { .. })
    }

    /// Material uid for material cells
    pub fn material(&self) -> Option<usize> {
        match self.kind {
            CellKind::Material { material, .. } => Some(material),
            CellKind::Fill { .. } => None,
        }
    }

    /// Filling universe uid for fill cells
    pub fn fill(&self) -> Option<usize> {
        match self.kind {
            CellKind::Fill { fill, .. } => Some(fill),
            CellKind::Material { .. } => None,
        }
    }

    pub fn num_rings(&self) -> usize {
        match self.kind {
            CellKind::Material { num_rings, .. } => num_rings,
            CellKind::Fill { .. } => 0,
        }
    }

    pub fn num_sectors(&self) -> usize {
        match self.kind {
            CellKind::Material { num_sectors, .. } => num_sectors,
            CellKind::Fill { .. } => 0,
        }
    }

    pub(crate) fn clear_refinement(&mut self) {
        if let CellKind::Material {
            num_rings,
            num_sectors,
            ..
        } = &mut self.kind
        {
            *num_rings = 0;
            *num_sectors = 0;
        }
    }

    /// Add a resolved halfspace constraint.
    pub fn add_surface(&mut self, signed_id: i32, surface_uid: usize) {
        if !self.surfaces.contains(&signed_id) {
            self.surfaces.push(signed_id);
        }
        self.region.insert(signed_id, surface_uid);
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Check if a point (in this cell's universe frame) is inside the cell
    pub fn contains(&self, point: &Point, surfaces: &[Surface]) -> bool {
        self.region.contains(point, surfaces)
    }

    /// Distance along `phi` to the nearest of this cell's surfaces and the
    /// uid of that surface, or None if the ray never meets one.
    pub fn min_surface_dist(&self, point: &Point, phi: f64, surfaces: &[Surface], epsilon: f64) -> Option<(f64, usize)> {
        self.region.min_surface_dist(point, phi, surfaces, epsilon)
    }
}
