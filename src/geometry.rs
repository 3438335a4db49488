use crate::bounding_box::BoundingBox;
use crate::cell::{Cell, CellKind};
use crate::error::{EntityKind, GeometryError, Result};
use crate::input::Parser;
use crate::lattice::Lattice;
use crate::local_coords::LocalCoords;
use crate::material::Material;
use crate::point::Point;
use crate::settings::GeometrySettings;
use crate::surface::Surface;
use crate::universe::Universe;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument};

/// The complete CSG model: registries of materials, surfaces, cells and
/// universes (lattices included), plus the flat source region tables built
/// by [`Geometry::finalize`].
///
/// Entities live in dense arenas indexed by uid. Each kind also has a key map
/// from user id to uid; [`Geometry::adjust_keys`] rekeys those maps by uid
/// once the build is complete.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub(crate) settings: GeometrySettings,
    pub(crate) materials: Vec<Material>,
    pub(crate) surfaces: Vec<Surface>,
    pub(crate) cells: Vec<Cell>,
    pub(crate) universes: Vec<Universe>,
    material_keys: BTreeMap<i32, usize>,
    surface_keys: BTreeMap<i32, usize>,
    cell_keys: BTreeMap<i32, usize>,
    universe_keys: BTreeMap<i32, usize>,
    num_lattices: usize,
    bounding_box: BoundingBox,
    next_refinement_id: i32,
    pub(crate) root: Option<usize>,
    pub(crate) num_fsrs: usize,
    pub(crate) fsrs_to_cells: Vec<usize>,
    pub(crate) fsrs_to_materials: Vec<usize>,
    keys_adjusted: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::with_settings(GeometrySettings::default())
    }
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: GeometrySettings) -> Self {
        Geometry {
            next_refinement_id: settings.refinement_id_base,
            settings,
            materials: Vec::new(),
            surfaces: Vec::new(),
            cells: Vec::new(),
            universes: Vec::new(),
            material_keys: BTreeMap::new(),
            surface_keys: BTreeMap::new(),
            cell_keys: BTreeMap::new(),
            universe_keys: BTreeMap::new(),
            num_lattices: 0,
            bounding_box: BoundingBox::empty(),
            root: None,
            num_fsrs: 0,
            fsrs_to_cells: Vec::new(),
            fsrs_to_materials: Vec::new(),
            keys_adjusted: false,
        }
    }

    /// Build a geometry from the four entity streams of a parser, inserted in
    /// the order materials, surfaces, cells, lattices, then finalize it.
    #[instrument(skip(parser, settings))]
    pub fn from_parser<P: Parser + ?Sized>(parser: &P, settings: GeometrySettings) -> Result<Self> {
        let mut geometry = Geometry::with_settings(settings);
        for material in parser.materials() {
            geometry.add_material(material)?;
        }
        for surface in parser.surfaces() {
            geometry.add_surface(surface)?;
        }
        for cell in parser.cells() {
            geometry.add_cell(cell)?;
        }
        for lattice in parser.lattices() {
            geometry.add_lattice(lattice)?;
        }
        geometry.finalize()?;
        Ok(geometry)
    }

    pub fn settings(&self) -> &GeometrySettings {
        &self.settings
    }

    /// Add a material after checking its id is unused and its total cross
    /// section is consistent. Returns the material uid.
    pub fn add_material(&mut self, mut material: Material) -> Result<usize> {
        if self.material_keys.contains_key(&material.material_id) {
            return Err(GeometryError::DuplicateId {
                kind: EntityKind::Material,
                id: material.material_id,
            });
        }
        material.check_sigma_t(self.settings.sigma_t_tolerance)?;
        let uid = self.materials.len();
        material.uid = uid;
        info!(id = material.material_id, uid, groups = material.num_groups(), "added material");
        self.material_keys.insert(material.material_id, uid);
        self.materials.push(material);
        Ok(uid)
    }

    /// Add a surface. Reflective surfaces widen the geometry bounding box.
    ///
    /// Surface ids must be positive: a cell names the side of a surface by
    /// the sign of its id.
    pub fn add_surface(&mut self, mut surface: Surface) -> Result<usize> {
        if surface.surface_id <= 0 {
            return Err(GeometryError::InvalidSurfaceId {
                id: surface.surface_id,
                referrer: "surface".to_string(),
            });
        }
        if self.surface_keys.contains_key(&surface.surface_id) {
            return Err(GeometryError::DuplicateId {
                kind: EntityKind::Surface,
                id: surface.surface_id,
            });
        }
        let uid = self.surfaces.len();
        surface.uid = uid;
        if surface.is_reflective() {
            let (x_range, y_range) = surface.extents();
            if let Some((min, max)) = x_range {
                self.bounding_box.grow(0, min, max);
            }
            if let Some((min, max)) = y_range {
                self.bounding_box.grow(1, min, max);
            }
        }
        debug!(id = surface.surface_id, uid, kind = ?surface.kind, "added surface");
        self.surface_keys.insert(surface.surface_id, uid);
        self.surfaces.push(surface);
        Ok(uid)
    }

    /// Add a cell to its universe, creating the universe if its id is new.
    ///
    /// Surface and material references must already exist. A fill cell may
    /// name a universe that is added later; that reference is checked by
    /// [`Geometry::finalize`]. Material cells asking for rings or sectors are
    /// refined here, so the refined cells share the universe. Returns the
    /// cell uid.
    pub fn add_cell(&mut self, mut cell: Cell) -> Result<usize> {
        if self.cell_keys.contains_key(&cell.cell_id) {
            return Err(GeometryError::DuplicateId {
                kind: EntityKind::Cell,
                id: cell.cell_id,
            });
        }
        let referrer = format!("cell {}", cell.cell_id);

        for signed_id in cell.surfaces.clone() {
            if signed_id == 0 || signed_id == i32::MIN {
                return Err(GeometryError::InvalidSurfaceId {
                    id: signed_id,
                    referrer: referrer.clone(),
                });
            }
            let surface_uid = *self.surface_keys.get(&signed_id.abs()).ok_or_else(|| {
                GeometryError::UnknownReference {
                    kind: EntityKind::Surface,
                    id: signed_id.abs(),
                    referrer: referrer.clone(),
                }
            })?;
            cell.region.insert(signed_id, surface_uid);
        }

        match &mut cell.kind {
            CellKind::Material {
                material_id, material, ..
            } => {
                *material = *self.material_keys.get(material_id).ok_or_else(|| {
                    GeometryError::UnknownReference {
                        kind: EntityKind::Material,
                        id: *material_id,
                        referrer: referrer.clone(),
                    }
                })?;
            }
            CellKind::Fill { universe_fill, fill } => {
                if let Some(&uid) = self.universe_keys.get(universe_fill) {
                    *fill = uid;
                }
            }
        }

        let universe_uid = match self.universe_keys.get(&cell.universe_id) {
            Some(&uid) => uid,
            None => {
                let uid = self.universes.len();
                let mut universe = Universe::new_simple(cell.universe_id);
                universe.uid = uid;
                debug!(id = cell.universe_id, uid, "created universe");
                self.universe_keys.insert(cell.universe_id, uid);
                self.universes.push(universe);
                uid
            }
        };
        if self.universes[universe_uid].is_lattice() {
            return Err(GeometryError::InvalidLattice {
                id: cell.universe_id,
                reason: format!("{} cannot be placed directly in a lattice", referrer),
            });
        }

        let uid = self.cells.len();
        cell.uid = uid;
        let (rings, sectors) = (cell.num_rings(), cell.num_sectors());
        info!(id = cell.cell_id, uid, universe = cell.universe_id, rings, sectors, "added cell");
        self.cell_keys.insert(cell.cell_id, uid);
        self.cells.push(cell);
        self.universes[universe_uid].add_cell(uid);

        if rings > 1 {
            self.subdivide_rings(uid, rings)?;
        }
        if sectors > 0 {
            self.subdivide_sectors(uid, sectors)?;
        }
        self.cells[uid].clear_refinement();
        Ok(uid)
    }

    /// Add a lattice; every tile universe must already exist. Returns the
    /// universe uid of the lattice.
    pub fn add_lattice(&mut self, mut lattice: Lattice) -> Result<usize> {
        lattice.validate()?;
        if self.universe_keys.contains_key(&lattice.lattice_id) {
            return Err(GeometryError::DuplicateId {
                kind: EntityKind::Lattice,
                id: lattice.lattice_id,
            });
        }
        let mut tiles = Vec::with_capacity(lattice.num_tiles());
        for j in 0..lattice.num_y {
            for i in 0..lattice.num_x {
                let id = lattice.universe_id_at(i, j);
                let uid = *self.universe_keys.get(&id).ok_or_else(|| GeometryError::UnknownReference {
                    kind: EntityKind::Universe,
                    id,
                    referrer: format!("lattice {}", lattice.lattice_id),
                })?;
                tiles.push(uid);
            }
        }
        lattice.tiles = tiles;
        lattice.uid = self.num_lattices;
        self.num_lattices += 1;

        let uid = self.universes.len();
        let mut universe = Universe::new_lattice(lattice);
        universe.uid = uid;
        info!(id = universe.universe_id, uid, "added lattice");
        self.universe_keys.insert(universe.universe_id, uid);
        self.universes.push(universe);
        Ok(uid)
    }

    /// Complete the build: resolve deferred fill references, locate the
    /// root universe, build surface neighbor lists and enumerate the flat
    /// source regions.
    #[instrument(skip(self))]
    pub fn finalize(&mut self) -> Result<()> {
        for uid in 0..self.cells.len() {
            let cell_id = self.cells[uid].cell_id;
            if let CellKind::Fill { universe_fill, fill } = &mut self.cells[uid].kind {
                *fill = *self.universe_keys.get(universe_fill).ok_or_else(|| {
                    GeometryError::UnknownReference {
                        kind: EntityKind::Universe,
                        id: *universe_fill,
                        referrer: format!("cell {}", cell_id),
                    }
                })?;
            }
        }
        let root_id = self.settings.root_universe;
        let root = *self
            .universe_keys
            .get(&root_id)
            .ok_or(GeometryError::MissingRootUniverse(root_id))?;
        self.root = Some(root);
        self.build_neighbors();
        self.compute_fsr_maps()?;
        info!(
            fsrs = self.num_fsrs,
            cells = self.cells.len(),
            universes = self.universes.len(),
            "geometry finalized"
        );
        Ok(())
    }

    /// Record, for each surface, the cells that use each of its halfspaces.
    fn build_neighbors(&mut self) {
        let mut counts = vec![(0usize, 0usize); self.surfaces.len()];
        for cell in &self.cells {
            for (signed_id, uid) in cell.region.halfspaces() {
                if signed_id > 0 {
                    counts[uid].0 += 1;
                } else {
                    counts[uid].1 += 1;
                }
            }
        }
        for (surface, &(positive, negative)) in self.surfaces.iter_mut().zip(counts.iter()) {
            surface.neighbors_positive = Vec::with_capacity(positive);
            surface.neighbors_negative = Vec::with_capacity(negative);
        }
        for cell in &self.cells {
            for (signed_id, uid) in cell.region.halfspaces() {
                if signed_id > 0 {
                    self.surfaces[uid].neighbors_positive.push(cell.uid);
                } else {
                    self.surfaces[uid].neighbors_negative.push(cell.uid);
                }
            }
        }
    }

    /// Rekey every registry by uid instead of user id. Only valid once the
    /// geometry is finalized; calling it again has no effect.
    pub fn adjust_keys(&mut self) -> Result<()> {
        if self.root.is_none() {
            return Err(GeometryError::NotFinalized);
        }
        if self.keys_adjusted {
            return Ok(());
        }
        let rekey = |keys: &BTreeMap<i32, usize>| -> BTreeMap<i32, usize> {
            keys.values().map(|&uid| (uid as i32, uid)).collect()
        };
        self.material_keys = rekey(&self.material_keys);
        self.surface_keys = rekey(&self.surface_keys);
        self.cell_keys = rekey(&self.cell_keys);
        self.universe_keys = rekey(&self.universe_keys);
        self.keys_adjusted = true;
        info!("registries rekeyed by uid");
        Ok(())
    }

    pub fn keys_adjusted(&self) -> bool {
        self.keys_adjusted
    }

    /// Next id for a surface or cell made by refinement, skipping ids that
    /// are already taken.
    pub(crate) fn next_refinement_id(&mut self) -> i32 {
        loop {
            let id = self.next_refinement_id;
            self.next_refinement_id += 1;
            if !self.surface_keys.contains_key(&id) && !self.cell_keys.contains_key(&id) {
                return id;
            }
        }
    }

    /// Root universe uid, once finalized
    pub(crate) fn root_uid(&self) -> Result<usize> {
        self.root.ok_or(GeometryError::NotFinalized)
    }

    /// Coordinates of a root-frame point, before any cell is chosen.
    pub fn root_coords(&self, point: Point) -> Result<LocalCoords> {
        let root = self.root_uid()?;
        Ok(LocalCoords::from_level(self.universes[root].entry_level(point)))
    }

    pub fn material(&self, key: i32) -> Option<&Material> {
        self.material_keys.get(&key).map(|&uid| &self.materials[uid])
    }

    pub fn surface(&self, key: i32) -> Option<&Surface> {
        self.surface_keys.get(&key).map(|&uid| &self.surfaces[uid])
    }

    pub fn cell(&self, key: i32) -> Option<&Cell> {
        self.cell_keys.get(&key).map(|&uid| &self.cells[uid])
    }

    pub fn universe(&self, key: i32) -> Option<&Universe> {
        self.universe_keys.get(&key).map(|&uid| &self.universes[uid])
    }

    pub fn lattice(&self, key: i32) -> Option<&Lattice> {
        self.universe(key).and_then(Universe::lattice)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn universes(&self) -> &[Universe] {
        &self.universes
    }

    pub fn num_lattices(&self) -> usize {
        self.num_lattices
    }

    pub fn num_fsrs(&self) -> usize {
        self.num_fsrs
    }

    /// Material cell uid of each flat source region
    pub fn fsr_to_cells(&self) -> &[usize] {
        &self.fsrs_to_cells
    }

    /// Material uid of each flat source region
    pub fn fsr_to_materials(&self) -> &[usize] {
        &self.fsrs_to_materials
    }

    /// Union of the extents of all reflective surfaces.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Width along x of the bounding box; infinite without reflective
    /// surfaces bounding x.
    pub fn width(&self) -> f64 {
        axis_width(&self.bounding_box, 0)
    }

    pub fn height(&self) -> f64 {
        axis_width(&self.bounding_box, 1)
    }

    /// Surfaces carrying a reflective boundary condition
    pub fn boundary_surfaces(&self) -> Vec<&Surface> {
        self.surfaces.iter().filter(|s| s.is_reflective()).collect()
    }
}

fn axis_width(bbox: &BoundingBox, axis: usize) -> f64 {
    if bbox.lower_left[axis].is_finite() && bbox.upper_right[axis].is_finite() {
        bbox.width[axis]
    } else {
        f64::INFINITY
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Geometry")?;
        writeln!(f, "  width = {}, height = {}", self.width(), self.height())?;
        writeln!(
            f,
            "  bounding box = [{}, {}] x [{}, {}]",
            self.bounding_box.lower_left[0],
            self.bounding_box.upper_right[0],
            self.bounding_box.lower_left[1],
            self.bounding_box.upper_right[1]
        )?;
        writeln!(f, "  materials = {}", self.materials.len())?;
        writeln!(f, "  surfaces = {}", self.surfaces.len())?;
        writeln!(f, "  cells = {}", self.cells.len())?;
        writeln!(
            f,
            "  universes = {} ({} lattices)",
            self.universes.len(),
            self.num_lattices
        )?;
        write!(f, "  flat source regions = {}", self.num_fsrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HalfspaceType::{Above, Below};
    use crate::surface::BoundaryType;

    fn water() -> Material {
        Material::new(1, vec![1.0], vec![0.2], vec![vec![0.8]])
    }

    fn reflective_square(geometry: &mut Geometry) {
        let reflective = Some(BoundaryType::Reflective);
        geometry.add_surface(Surface::x_plane(-1.0, 1, reflective)).unwrap();
        geometry.add_surface(Surface::x_plane(1.0, 2, reflective)).unwrap();
        geometry.add_surface(Surface::y_plane(-1.0, 3, reflective)).unwrap();
        geometry.add_surface(Surface::y_plane(1.0, 4, reflective)).unwrap();
    }

    fn square_cell(id: i32) -> Cell {
        Cell::new_material(id, 0, 1, &[Above(1), Below(2), Above(3), Below(4)])
    }

    #[test]
    fn test_duplicate_ids() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        assert_eq!(
            geometry.add_material(water()),
            Err(GeometryError::DuplicateId {
                kind: EntityKind::Material,
                id: 1
            })
        );
        reflective_square(&mut geometry);
        assert!(geometry.add_surface(Surface::x_plane(0.0, 2, None)).is_err());
        geometry.add_cell(square_cell(1)).unwrap();
        assert!(matches!(
            geometry.add_cell(square_cell(1)),
            Err(GeometryError::DuplicateId {
                kind: EntityKind::Cell,
                id: 1
            })
        ));
    }

    #[test]
    fn test_unknown_references() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        let result = geometry.add_cell(Cell::new_material(1, 0, 1, &[Below(9)]));
        assert!(matches!(
            result,
            Err(GeometryError::UnknownReference {
                kind: EntityKind::Surface,
                id: 9,
                ..
            })
        ));
        let result = geometry.add_cell(Cell::new_material(2, 0, 5, &[]));
        assert!(matches!(
            result,
            Err(GeometryError::UnknownReference {
                kind: EntityKind::Material,
                id: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_non_positive_surface_ids_rejected() {
        let mut geometry = Geometry::new();
        assert_eq!(
            geometry.add_surface(Surface::x_plane(0.0, 0, None)),
            Err(GeometryError::InvalidSurfaceId {
                id: 0,
                referrer: "surface".to_string()
            })
        );
        assert!(matches!(
            geometry.add_surface(Surface::x_plane(0.0, -3, None)),
            Err(GeometryError::InvalidSurfaceId { id: -3, .. })
        ));
        assert!(geometry.surfaces().is_empty());
        assert!(geometry.surface(0).is_none());
    }

    #[test]
    fn test_cell_with_unsigned_surface_rejected() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        reflective_square(&mut geometry);

        let mut cell = square_cell(1);
        cell.surfaces.push(0);
        assert_eq!(
            geometry.add_cell(cell),
            Err(GeometryError::InvalidSurfaceId {
                id: 0,
                referrer: "cell 1".to_string()
            })
        );

        let mut cell = square_cell(2);
        cell.surfaces.push(i32::MIN);
        assert!(matches!(
            geometry.add_cell(cell),
            Err(GeometryError::InvalidSurfaceId { id: i32::MIN, .. })
        ));
        assert!(geometry.cells().is_empty());
    }

    #[test]
    fn test_fill_reference_checked_at_finalize() {
        let mut geometry = Geometry::new();
        reflective_square(&mut geometry);
        geometry
            .add_cell(Cell::new_fill(1, 0, 7, &[Above(1), Below(2), Above(3), Below(4)]))
            .unwrap();
        assert!(matches!(
            geometry.finalize(),
            Err(GeometryError::UnknownReference {
                kind: EntityKind::Universe,
                id: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_material_rejected() {
        let mut geometry = Geometry::new();
        let bad = Material::new(2, vec![2.0], vec![0.2], vec![vec![0.8]]);
        assert!(matches!(
            geometry.add_material(bad),
            Err(GeometryError::InvalidMaterial { id: 2, .. })
        ));
    }

    #[test]
    fn test_bounding_box_from_reflective_surfaces() {
        let mut geometry = Geometry::new();
        reflective_square(&mut geometry);
        geometry.add_surface(Surface::x_plane(5.0, 5, None)).unwrap();
        assert_eq!(geometry.bounding_box().lower_left, [-1.0, -1.0]);
        assert_eq!(geometry.bounding_box().upper_right, [1.0, 1.0]);
        assert_eq!(geometry.width(), 2.0);
        assert_eq!(geometry.height(), 2.0);
        assert_eq!(geometry.boundary_surfaces().len(), 4);
    }

    #[test]
    fn test_missing_root_universe() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        geometry.add_cell(Cell::new_material(1, 3, 1, &[])).unwrap();
        assert_eq!(geometry.finalize(), Err(GeometryError::MissingRootUniverse(0)));
    }

    #[test]
    fn test_neighbor_lists() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        reflective_square(&mut geometry);
        geometry.add_surface(Surface::x_plane(0.0, 5, None)).unwrap();
        geometry
            .add_cell(Cell::new_material(1, 0, 1, &[Above(1), Below(5), Above(3), Below(4)]))
            .unwrap();
        geometry
            .add_cell(Cell::new_material(2, 0, 1, &[Above(5), Below(2), Above(3), Below(4)]))
            .unwrap();
        geometry.finalize().unwrap();
        let middle = geometry.surface(5).unwrap();
        assert_eq!(middle.neighbors_negative, vec![0]);
        assert_eq!(middle.neighbors_positive, vec![1]);
        assert_eq!(geometry.surface(3).unwrap().neighbors_positive, vec![0, 1]);
    }

    #[test]
    fn test_adjust_keys() {
        let mut geometry = Geometry::new();
        assert_eq!(geometry.adjust_keys(), Err(GeometryError::NotFinalized));
        geometry.add_material(Material::new(40, vec![1.0], vec![1.0], vec![vec![0.0]])).unwrap();
        reflective_square(&mut geometry);
        geometry
            .add_cell(Cell::new_material(12, 0, 40, &[Above(1), Below(2), Above(3), Below(4)]))
            .unwrap();
        geometry.finalize().unwrap();
        assert!(geometry.cell(12).is_some());
        geometry.adjust_keys().unwrap();
        assert!(geometry.keys_adjusted());
        assert!(geometry.cell(12).is_none());
        assert_eq!(geometry.cell(0).map(|c| c.cell_id), Some(12));
        assert_eq!(geometry.material(0).map(|m| m.material_id), Some(40));
        assert_eq!(geometry.surface(3).map(|s| s.surface_id), Some(4));
    }

    #[test]
    fn test_refinement_ids_skip_used() {
        let mut geometry = Geometry::with_settings(GeometrySettings {
            refinement_id_base: 2,
            ..GeometrySettings::default()
        });
        reflective_square(&mut geometry);
        assert_eq!(geometry.next_refinement_id(), 5);
        assert_eq!(geometry.next_refinement_id(), 6);
    }

    #[test]
    fn test_display() {
        let mut geometry = Geometry::new();
        geometry.add_material(water()).unwrap();
        reflective_square(&mut geometry);
        geometry.add_cell(square_cell(1)).unwrap();
        geometry.finalize().unwrap();
        let text = geometry.to_string();
        assert!(text.contains("width = 2, height = 2"));
        assert!(text.contains("cells = 1"));
        assert!(text.contains("flat source regions = 1"));
    }
}
