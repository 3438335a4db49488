//! Flattened CSG description of the flat source regions, for mesh writers
//! and plotting tools.
//!
//! Every flat source region becomes a zone: the intersection of the
//! halfspaces met on the way down from the root universe, with surfaces
//! moved into the root frame and lattice tiles replaced by their four walls.
//! The export is a node table in six parallel arrays.

use crate::error::{GeometryError, Result};
use crate::fsr::FsrStep;
use crate::geometry::Geometry;
use crate::point::Point;
use crate::surface::SurfaceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceFlag {
    Plane,
    XPlane,
    YPlane,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsgOperator {
    /// Leaf: negative halfspace of the surface in `left_ids`.
    Inner,
    /// Leaf: positive halfspace of the surface in `left_ids`.
    Outer,
    /// Both children; with no children, the whole plane.
    Intersect,
    /// Either child.
    Union,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsgExport {
    pub surf_flags: Vec<SurfaceFlag>,
    /// Three coefficients per surface: (a, b, c) for planes, (x0, 0, 0) and
    /// (y0, 0, 0) for axis planes, (x0, y0, radius) for circles.
    pub surf_coeffs: Vec<f64>,
    pub oper_flags: Vec<CsgOperator>,
    pub left_ids: Vec<Option<usize>>,
    pub right_ids: Vec<Option<usize>>,
    /// Root node of each zone, indexed by flat source region id.
    pub zones: Vec<usize>,
    /// Union of all zones.
    pub domain: Option<usize>,
}

impl CsgExport {
    pub fn from_geometry(geometry: &Geometry) -> Result<Self> {
        let mut builder = Builder::default();
        for fsr in 0..geometry.num_fsrs() {
            let zone = builder.add_zone(geometry, &geometry.fsr_path(fsr)?);
            builder.export.zones.push(zone);
        }
        let zones = builder.export.zones.clone();
        let domain = zones
            .into_iter()
            .reduce(|left, right| builder.add_node(CsgOperator::Union, Some(left), Some(right)));
        builder.export.domain = domain;
        Ok(builder.export)
    }

    pub fn num_surfaces(&self) -> usize {
        self.surf_flags.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.oper_flags.len()
    }

    /// Evaluate a surface of the table at a point, with the same sign
    /// convention as [`Surface::evaluate`](crate::surface::Surface::evaluate).
    pub fn evaluate_surface(&self, surface: usize, point: &Point) -> f64 {
        let c = &self.surf_coeffs[3 * surface..3 * surface + 3];
        match self.surf_flags[surface] {
            SurfaceFlag::Plane => c[0] * point.x + c[1] * point.y + c[2],
            SurfaceFlag::XPlane => point.x - c[0],
            SurfaceFlag::YPlane => point.y - c[0],
            SurfaceFlag::Circle => {
                let (dx, dy) = (point.x - c[0], point.y - c[1]);
                dx * dx + dy * dy - c[2] * c[2]
            }
        }
    }

    /// True when the root-frame point lies in the region of `node`.
    pub fn node_contains(&self, node: usize, point: &Point) -> bool {
        let (left, right) = (self.left_ids[node], self.right_ids[node]);
        match self.oper_flags[node] {
            CsgOperator::Inner => left.map_or(false, |s| self.evaluate_surface(s, point) <= 0.0),
            CsgOperator::Outer => left.map_or(false, |s| self.evaluate_surface(s, point) >= 0.0),
            CsgOperator::Intersect => [left, right]
                .iter()
                .flatten()
                .all(|&child| self.node_contains(child, point)),
            CsgOperator::Union => [left, right]
                .iter()
                .flatten()
                .any(|&child| self.node_contains(child, point)),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeometryError::Export(e.to_string()))
    }
}

#[derive(Default)]
struct Builder {
    export: CsgExport,
    surfaces: BTreeMap<(u8, [u64; 3]), usize>,
}

impl Builder {
    fn add_surface(&mut self, kind: &SurfaceKind) -> usize {
        let (flag, coeffs) = match *kind {
            SurfaceKind::Plane { a, b, c } => (SurfaceFlag::Plane, [a, b, c]),
            SurfaceKind::XPlane { x0 } => (SurfaceFlag::XPlane, [x0, 0.0, 0.0]),
            SurfaceKind::YPlane { y0 } => (SurfaceFlag::YPlane, [y0, 0.0, 0.0]),
            SurfaceKind::Circle { x0, y0, radius } => (SurfaceFlag::Circle, [x0, y0, radius]),
        };
        let key = (flag as u8, coeffs.map(f64::to_bits));
        let export = &mut self.export;
        *self.surfaces.entry(key).or_insert_with(|| {
            export.surf_flags.push(flag);
            export.surf_coeffs.extend_from_slice(&coeffs);
            export.surf_flags.len() - 1
        })
    }

    fn add_node(&mut self, operator: CsgOperator, left: Option<usize>, right: Option<usize>) -> usize {
        self.export.oper_flags.push(operator);
        self.export.left_ids.push(left);
        self.export.right_ids.push(right);
        self.export.oper_flags.len() - 1
    }

    fn add_halfspace(&mut self, kind: &SurfaceKind, positive: bool) -> usize {
        let surface = self.add_surface(kind);
        let operator = if positive {
            CsgOperator::Outer
        } else {
            CsgOperator::Inner
        };
        self.add_node(operator, Some(surface), None)
    }

    fn add_zone(&mut self, geometry: &Geometry, path: &[FsrStep]) -> usize {
        let mut leaves = Vec::new();
        let (mut dx, mut dy) = (0.0, 0.0);
        for step in path {
            match *step {
                FsrStep::Cell(cell) => {
                    for (signed_id, uid) in geometry.cells()[cell].region.halfspaces() {
                        let kind = geometry.surfaces()[uid].translated_kind(dx, dy);
                        leaves.push(self.add_halfspace(&kind, signed_id > 0));
                    }
                }
                FsrStep::Tile { lattice, i, j } => {
                    let Some(lattice) = geometry.universes()[lattice].lattice() else {
                        continue;
                    };
                    let center = lattice.tile_center(i, j);
                    let (cx, cy) = (center.x + dx, center.y + dy);
                    let (hx, hy) = (0.5 * lattice.pitch_x, 0.5 * lattice.pitch_y);
                    leaves.push(self.add_halfspace(&SurfaceKind::XPlane { x0: cx - hx }, true));
                    leaves.push(self.add_halfspace(&SurfaceKind::XPlane { x0: cx + hx }, false));
                    leaves.push(self.add_halfspace(&SurfaceKind::YPlane { y0: cy - hy }, true));
                    leaves.push(self.add_halfspace(&SurfaceKind::YPlane { y0: cy + hy }, false));
                    dx = cx;
                    dy = cy;
                }
            }
        }
        let mut leaves = leaves.into_iter();
        match leaves.next() {
            None => self.add_node(CsgOperator::Intersect, None, None),
            Some(first) => leaves.fold(first, |zone, leaf| {
                self.add_node(CsgOperator::Intersect, Some(zone), Some(leaf))
            }),
        }
    }
}
