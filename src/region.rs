use crate::bounding_box::BoundingBox;
use crate::point::Point;
use crate::surface::Surface;
use std::collections::BTreeMap;

/// One halfspace constraint, naming its surface by user id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalfspaceType {
    /// Positive side of the surface (evaluate >= 0).
    Above(i32),
    /// Negative side of the surface (evaluate <= 0).
    Below(i32),
}

impl HalfspaceType {
    /// Signed surface id: +id for the positive halfspace, -id for the negative one.
    pub fn signed_id(&self) -> i32 {
        match *self {
            HalfspaceType::Above(id) => id,
            HalfspaceType::Below(id) => -id,
        }
    }

    pub fn from_signed_id(signed_id: i32) -> Self {
        if signed_id > 0 {
            HalfspaceType::Above(signed_id)
        } else {
            HalfspaceType::Below(-signed_id)
        }
    }
}

/// Intersection of halfspaces, keyed by signed surface id and resolved to
/// surface uids in the owning geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    halfspaces: BTreeMap<i32, usize>,
}

impl Region {
    pub fn new() -> Self {
        Region {
            halfspaces: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, signed_id: i32, surface_uid: usize) {
        self.halfspaces.insert(signed_id, surface_uid);
    }

    pub fn len(&self) -> usize {
        self.halfspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halfspaces.is_empty()
    }

    /// (signed surface id, surface uid) pairs in ascending signed-id order.
    pub fn halfspaces(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.halfspaces.iter().map(|(&signed_id, &uid)| (signed_id, uid))
    }

    /// Every constraint holds; points exactly on a surface belong to the region.
    pub fn contains(&self, point: &Point, surfaces: &[Surface]) -> bool {
        self.halfspaces.iter().all(|(&signed_id, &uid)| {
            let value = surfaces[uid].evaluate(point);
            if signed_id > 0 {
                value >= 0.0
            } else {
                value <= 0.0
            }
        })
    }

    /// Nearest strictly positive distance along `phi` to any of the region's
    /// surfaces, with the uid of the surface hit.
    pub fn min_surface_dist(
        &self,
        point: &Point,
        phi: f64,
        surfaces: &[Surface],
        epsilon: f64,
    ) -> Option<(f64, usize)> {
        let mut closest: Option<(f64, usize)> = None;
        for &uid in self.halfspaces.values() {
            if let Some(dist) = surfaces[uid].intersection(point, phi, epsilon).first() {
                if closest.map_or(true, |(best, _)| dist < best) {
                    closest = Some((dist, uid));
                }
            }
        }
        closest
    }

    pub fn bounding_box(&self, surfaces: &[Surface]) -> BoundingBox {
        let mut axis_lowers = [f64::NEG_INFINITY; 2];
        let mut axis_uppers = [f64::INFINITY; 2];

        for (signed_id, uid) in self.halfspaces() {
            let surface = &surfaces[uid];
            let positive = signed_id > 0;
            if let Some((axis, is_upper, value)) = surface.axis_constraint(positive) {
                if is_upper {
                    axis_uppers[axis] = axis_uppers[axis].min(value);
                } else {
                    axis_lowers[axis] = axis_lowers[axis].max(value);
                }
            }
            if let Some((lower, upper)) = surface.bounding_box(positive) {
                for i in 0..2 {
                    axis_lowers[i] = axis_lowers[i].max(lower[i]);
                    axis_uppers[i] = axis_uppers[i].min(upper[i]);
                }
            }
        }

        // If any min > max, region is empty: return empty bounding box
        if axis_lowers[0] > axis_uppers[0] || axis_lowers[1] > axis_uppers[1] {
            return BoundingBox::empty();
        }
        BoundingBox::new(axis_lowers, axis_uppers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> (Vec<Surface>, Region) {
        let surfaces = vec![
            Surface::x_plane(-1.0, 1, None),
            Surface::x_plane(1.0, 2, None),
            Surface::y_plane(-1.0, 3, None),
            Surface::y_plane(1.0, 4, None),
        ];
        let mut region = Region::new();
        region.insert(1, 0);
        region.insert(-2, 1);
        region.insert(3, 2);
        region.insert(-4, 3);
        (surfaces, region)
    }

    #[test]
    fn test_signed_ids() {
        assert_eq!(HalfspaceType::Above(3).signed_id(), 3);
        assert_eq!(HalfspaceType::Below(3).signed_id(), -3);
        assert_eq!(HalfspaceType::from_signed_id(-7), HalfspaceType::Below(7));
    }

    #[test]
    fn test_region_contains() {
        let (surfaces, region) = unit_square();
        assert!(region.contains(&Point::new(0.0, 0.0), &surfaces));
        // Points on the boundary belong to the region
        assert!(region.contains(&Point::new(1.0, 0.5), &surfaces));
        assert!(!region.contains(&Point::new(1.5, 0.0), &surfaces));
    }

    #[test]
    fn test_empty_region_contains_everything() {
        let region = Region::new();
        assert!(region.contains(&Point::new(1e6, -1e6), &[]));
        assert_eq!(region.min_surface_dist(&Point::new(0.0, 0.0), 0.3, &[], 1e-10), None);
    }

    #[test]
    fn test_min_surface_dist() {
        let (surfaces, region) = unit_square();
        let (dist, uid) = region
            .min_surface_dist(&Point::new(-1.0, 0.0), 0.0, &surfaces, 1e-10)
            .unwrap();
        assert_eq!(dist, 2.0);
        assert_eq!(uid, 1);
    }

    #[test]
    fn test_square_bounding_box() {
        let (surfaces, region) = unit_square();
        let bbox = region.bounding_box(&surfaces);
        assert_eq!(bbox.lower_left, [-1.0, -1.0]);
        assert_eq!(bbox.upper_right, [1.0, 1.0]);
    }

    #[test]
    fn test_circle_and_xplane_bounding_box() {
        let surfaces = vec![
            Surface::circle(0.0, 0.0, 4.2, 1, None),
            Surface::x_plane(2.1, 2, None),
        ];
        let mut region = Region::new();
        region.insert(-1, 0);
        region.insert(-2, 1);
        let bbox = region.bounding_box(&surfaces);
        assert_eq!(bbox.lower_left, [-4.2, -4.2]);
        assert_eq!(bbox.upper_right, [2.1, 4.2]);
    }

    #[test]
    fn test_outside_circle_is_unbounded() {
        let surfaces = vec![Surface::circle(0.0, 0.0, 1.0, 1, None)];
        let mut region = Region::new();
        region.insert(1, 0);
        let bbox = region.bounding_box(&surfaces);
        assert!(!bbox.is_finite());
    }
}
