//! Ring and sector refinement of material cells.
//!
//! Rings split a disk or annulus into equal-area annuli using new circles
//! concentric with the cell. Sectors split a cell into equal angular wedges
//! using planes through its centre. New surfaces and cells draw ids from the
//! geometry's refinement counter.

use crate::cell::{Cell, CellKind};
use crate::error::{GeometryError, Result};
use crate::geometry::Geometry;
use crate::point::Point;
use crate::region::Region;
use crate::surface::{Surface, SurfaceKind};
use std::f64::consts::{FRAC_PI_4, PI};
use tracing::{debug, info};

/// Sector counts with a wedge construction
pub const SUPPORTED_SECTORS: [usize; 3] = [4, 8, 16];

/// Radii of the circles separating `rings` equal-area rings between
/// `inner` (zero for a disk) and `outer`, innermost first, excluding both
/// bounds.
pub fn ring_radii(inner: f64, outer: f64, rings: usize) -> Vec<f64> {
    let area = outer * outer - inner * inner;
    (1..rings)
        .map(|k| (inner * inner + k as f64 * area / rings as f64).sqrt())
        .collect()
}

/// Angle of the first wedge boundary, and of each subsequent one every 2π/N.
pub fn sector_angle(k: usize, sectors: usize) -> f64 {
    FRAC_PI_4 + k as f64 * 2.0 * PI / sectors as f64
}

/// Plane through `center` along angle `beta`, positive on the clockwise side
/// of the direction (cos beta, sin beta).
fn line_through(center: &Point, beta: f64) -> SurfaceKind {
    let a = beta.sin();
    let b = -beta.cos();
    SurfaceKind::Plane {
        a,
        b,
        c: -(a * center.x + b * center.y),
    }
}

/// Halfspaces bounding wedge `m` of `sectors`, as (line index, positive
/// side) pairs over the `sectors / 2` lines through the centre. Wedge m spans
/// the angles between sector_angle(m) and sector_angle(m + 1).
fn wedge_halfspaces(m: usize, sectors: usize) -> [(usize, bool); 2] {
    let half = sectors / 2;
    // A point at angle theta lies on the positive side of the line at angle
    // beta when sin(beta - theta) > 0.
    let next = (m + 1) % sectors;
    [(m % half, m / half != 0), (next % half, next / half == 0)]
}

fn signed(lines: &[i32], (line, positive): (usize, bool)) -> i32 {
    if positive {
        lines[line]
    } else {
        -lines[line]
    }
}

impl Geometry {
    /// Split material cell `uid` into `rings` equal-area rings. The original
    /// cell keeps the outermost ring.
    pub(crate) fn subdivide_rings(&mut self, uid: usize, rings: usize) -> Result<()> {
        let cell_id = self.cells[uid].cell_id;
        let unsupported = |reason: &str| GeometryError::UnsupportedRefinement {
            cell: cell_id,
            reason: reason.to_string(),
        };

        let mut inner: Option<(i32, f64, f64, f64)> = None;
        let mut outer: Option<(i32, f64, f64, f64)> = None;
        for (signed_id, surface_uid) in self.cells[uid].region.halfspaces() {
            let (x0, y0, radius) = match self.surfaces[surface_uid].kind {
                SurfaceKind::Circle { x0, y0, radius } => (x0, y0, radius),
                _ => return Err(unsupported("rings need a cell bounded only by circles")),
            };
            let slot = if signed_id > 0 { &mut inner } else { &mut outer };
            if slot.is_some() {
                return Err(unsupported("rings need at most one inner and one outer circle"));
            }
            *slot = Some((signed_id, x0, y0, radius));
        }
        let (_, cx, cy, outer_radius) = outer.ok_or_else(|| unsupported("rings need an outer circle"))?;
        let inner_radius = match inner {
            Some((_, x0, y0, radius)) => {
                if x0 != cx || y0 != cy {
                    return Err(unsupported("ring circles must be concentric"));
                }
                if radius >= outer_radius {
                    return Err(unsupported("inner circle must be smaller than the outer circle"));
                }
                radius
            }
            None => 0.0,
        };

        let mut previous = inner.map(|(signed_id, ..)| signed_id);
        let mut last_uid = None;
        let template = self.cells[uid].clone();
        for radius in ring_radii(inner_radius, outer_radius, rings) {
            let surface_id = self.next_refinement_id();
            let surface = Surface::circle(cx, cy, radius, surface_id, None);
            last_uid = Some(self.add_surface(surface)?);
            debug!(cell = cell_id, surface = surface_id, radius, "added ring surface");

            let mut ring = template.clone();
            ring.cell_id = self.next_refinement_id();
            ring.region = Region::new();
            ring.surfaces = previous.into_iter().chain(std::iter::once(-surface_id)).collect();
            if let CellKind::Material { num_rings, .. } = &mut ring.kind {
                *num_rings = 0;
            }
            self.add_cell(ring)?;
            previous = Some(surface_id);
        }

        if let (Some(last), Some(surface_uid)) = (previous, last_uid) {
            let original = &mut self.cells[uid];
            if let Some(inner_id) = inner.map(|(signed_id, ..)| signed_id) {
                original.surfaces.retain(|&s| s != inner_id);
                let mut region = Region::new();
                for (signed_id, surface) in original.region.halfspaces() {
                    if signed_id != inner_id {
                        region.insert(signed_id, surface);
                    }
                }
                original.region = region;
            }
            original.add_surface(last, surface_uid);
        }
        info!(cell = cell_id, rings, "subdivided cell into rings");
        Ok(())
    }

    /// Split material cell `uid` into `sectors` equal wedges around the
    /// cell's centre. The original cell keeps the first wedge.
    pub(crate) fn subdivide_sectors(&mut self, uid: usize, sectors: usize) -> Result<()> {
        let cell_id = self.cells[uid].cell_id;
        if !SUPPORTED_SECTORS.contains(&sectors) {
            return Err(GeometryError::UnsupportedRefinement {
                cell: cell_id,
                reason: format!("{} sectors requested, expected one of {:?}", sectors, SUPPORTED_SECTORS),
            });
        }
        let center = self.refinement_center(uid);

        let mut lines = Vec::with_capacity(sectors / 2);
        let mut line_uids = Vec::with_capacity(sectors / 2);
        for k in 0..sectors / 2 {
            let surface_id = self.next_refinement_id();
            let kind = line_through(&center, sector_angle(k, sectors));
            line_uids.push(self.add_surface(Surface::new(surface_id, kind, None))?);
            debug!(cell = cell_id, surface = surface_id, "added sector surface");
            lines.push(surface_id);
        }

        let mut template = self.cells[uid].clone();
        template.clear_refinement();
        template.region = Region::new();
        for m in 1..sectors {
            let mut wedge: Cell = template.clone();
            wedge.cell_id = self.next_refinement_id();
            wedge
                .surfaces
                .extend(wedge_halfspaces(m, sectors).iter().map(|&h| signed(&lines, h)));
            self.add_cell(wedge)?;
        }

        for halfspace in wedge_halfspaces(0, sectors) {
            self.cells[uid].add_surface(signed(&lines, halfspace), line_uids[halfspace.0]);
        }
        info!(cell = cell_id, sectors, "subdivided cell into sectors");
        Ok(())
    }

    /// Centre of the first circle bounding the cell, else the centre of the
    /// cell's bounding box, else the frame origin.
    fn refinement_center(&self, uid: usize) -> Point {
        let region = &self.cells[uid].region;
        for (_, surface_uid) in region.halfspaces() {
            if let SurfaceKind::Circle { x0, y0, .. } = self.surfaces[surface_uid].kind {
                return Point::new(x0, y0);
            }
        }
        let bbox = region.bounding_box(&self.surfaces);
        if bbox.is_finite() {
            Point::new(bbox.center[0], bbox.center[1])
        } else {
            Point::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_radii_disk() {
        let radii = ring_radii(0.0, 1.0, 2);
        assert_eq!(radii.len(), 1);
        assert!((radii[0] - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ring_radii_equal_areas() {
        let radii = ring_radii(0.5, 2.0, 3);
        let mut bounds = vec![0.5];
        bounds.extend(radii);
        bounds.push(2.0);
        let areas: Vec<f64> = bounds.windows(2).map(|w| PI * (w[1] * w[1] - w[0] * w[0])).collect();
        for area in &areas {
            assert!((area - areas[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_four_sector_lines() {
        let center = Point::default();
        // x - y and x + y, up to scaling
        match line_through(&center, sector_angle(0, 4)) {
            SurfaceKind::Plane { a, b, c } => {
                assert!((a + b).abs() < 1e-12);
                assert!(a > 0.0);
                assert!(c.abs() < 1e-12);
            }
            _ => panic!("Not a plane"),
        }
        match line_through(&center, sector_angle(1, 4)) {
            SurfaceKind::Plane { a, b, .. } => {
                assert!((a - b).abs() < 1e-12);
                assert!(a > 0.0);
            }
            _ => panic!("Not a plane"),
        }
    }

    #[test]
    fn test_wedges_partition_angles() {
        for sectors in SUPPORTED_SECTORS {
            let center = Point::new(0.3, -0.2);
            let lines: Vec<SurfaceKind> = (0..sectors / 2)
                .map(|k| line_through(&center, sector_angle(k, sectors)))
                .collect();
            let ids: Vec<i32> = (1..=lines.len() as i32).collect();
            let surfaces: Vec<Surface> = lines
                .into_iter()
                .zip(ids.iter())
                .map(|(kind, &id)| Surface::new(id, kind, None))
                .collect();
            for m in 0..sectors {
                // A point in the middle of wedge m lies in wedge m only
                let theta = sector_angle(m, sectors) + PI / sectors as f64;
                let probe = center.along(theta, 0.5);
                let inside: Vec<usize> = (0..sectors)
                    .filter(|&w| {
                        wedge_halfspaces(w, sectors).iter().all(|&(line, positive)| {
                            let value = surfaces[line].evaluate(&probe);
                            if positive {
                                value >= 0.0
                            } else {
                                value <= 0.0
                            }
                        })
                    })
                    .collect();
                assert_eq!(inside, vec![m], "sectors = {}", sectors);
            }
        }
    }
}
