use crate::point::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    /// Interior surface with no boundary condition.
    #[serde(alias = "none")]
    Transmission,
    /// Outer surface on which the solver reflects angular flux.
    Reflective,
}

impl Default for BoundaryType {
    fn default() -> Self {
        BoundaryType::Transmission
    }
}

impl BoundaryType {
    /// Parse a boundary type from a string, returning None for invalid strings
    pub fn from_str_option(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "transmission" | "none" => Some(BoundaryType::Transmission),
            "reflective" => Some(BoundaryType::Reflective),
            _ => None,
        }
    }
}

/// Quadratic surface variants. Evaluation uses the quadratic form so that the
/// sign of `evaluate` selects the halfspace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SurfaceKind {
    /// a*x + b*y + c = 0
    Plane { a: f64, b: f64, c: f64 },
    /// x = x0
    XPlane { x0: f64 },
    /// y = y0
    YPlane { y0: f64 },
    /// (x - x0)^2 + (y - y0)^2 = radius^2
    Circle { x0: f64, y0: f64, radius: f64 },
}

/// Up to two ray/surface intersection distances, sorted ascending.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Intersections {
    count: usize,
    distances: [f64; 2],
}

impl Intersections {
    fn push(&mut self, t: f64, epsilon: f64) {
        if !(t >= epsilon) {
            return;
        }
        if self.count == 1 && (t - self.distances[0]).abs() < epsilon {
            return;
        }
        self.distances[self.count] = t;
        self.count += 1;
        if self.count == 2 && self.distances[0] > self.distances[1] {
            self.distances.swap(0, 1);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Nearest intersection distance, if any
    pub fn first(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.distances[0])
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.distances[..self.count].iter().copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub surface_id: i32,
    /// Dense, zero-based index assigned when the surface joins a geometry.
    #[serde(skip)]
    pub uid: usize,
    pub kind: SurfaceKind,
    #[serde(default)]
    pub boundary_type: BoundaryType,
    /// Cells (by uid) that use the positive halfspace of this surface.
    #[serde(skip)]
    pub neighbors_positive: Vec<usize>,
    /// Cells (by uid) that use the negative halfspace of this surface.
    #[serde(skip)]
    pub neighbors_negative: Vec<usize>,
}

impl Surface {
    pub fn new(surface_id: i32, kind: SurfaceKind, boundary_type: Option<BoundaryType>) -> Self {
        Surface {
            surface_id,
            uid: 0,
            kind,
            boundary_type: boundary_type.unwrap_or_default(),
            neighbors_positive: Vec::new(),
            neighbors_negative: Vec::new(),
        }
    }

    pub fn new_plane(a: f64, b: f64, c: f64, surface_id: i32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(surface_id, SurfaceKind::Plane { a, b, c }, boundary_type)
    }

    pub fn x_plane(x0: f64, surface_id: i32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(surface_id, SurfaceKind::XPlane { x0 }, boundary_type)
    }

    pub fn y_plane(y0: f64, surface_id: i32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(surface_id, SurfaceKind::YPlane { y0 }, boundary_type)
    }

    pub fn circle(x0: f64, y0: f64, radius: f64, surface_id: i32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(surface_id, SurfaceKind::Circle { x0, y0, radius }, boundary_type)
    }

    /// Get the boundary type of the surface
    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    /// Set the boundary type of the surface
    pub fn set_boundary_type(&mut self, boundary_type: BoundaryType) {
        self.boundary_type = boundary_type;
    }

    pub fn is_reflective(&self) -> bool {
        self.boundary_type == BoundaryType::Reflective
    }

    /// Linear coefficients (a, b, c) for plane-like surfaces.
    pub fn plane_coefficients(&self) -> Option<(f64, f64, f64)> {
        match self.kind {
            SurfaceKind::Plane { a, b, c } => Some((a, b, c)),
            SurfaceKind::XPlane { x0 } => Some((1.0, 0.0, -x0)),
            SurfaceKind::YPlane { y0 } => Some((0.0, 1.0, -y0)),
            SurfaceKind::Circle { .. } => None,
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match self.kind {
            SurfaceKind::Circle { radius, .. } => Some(radius),
            _ => None,
        }
    }

    /// Signed quadratic form at a point: positive on the "outside" halfspace.
    pub fn evaluate(&self, point: &Point) -> f64 {
        match self.kind {
            SurfaceKind::Circle { x0, y0, radius } => {
                point.x * point.x + point.y * point.y - 2.0 * x0 * point.x - 2.0 * y0 * point.y
                    + (x0 * x0 + y0 * y0 - radius * radius)
            }
            _ => {
                let (a, b, c) = self.plane_coefficients().unwrap_or((0.0, 0.0, 0.0));
                a * point.x + b * point.y + c
            }
        }
    }

    /// Distances t >= epsilon at which the ray `point + t*(cos phi, sin phi)`
    /// meets the surface. Roots closer than epsilon are merged.
    pub fn intersection(&self, point: &Point, phi: f64, epsilon: f64) -> Intersections {
        let (dx, dy) = (phi.cos(), phi.sin());
        let mut hits = Intersections::default();
        match self.kind {
            SurfaceKind::Circle { x0, y0, radius } => {
                let ox = point.x - x0;
                let oy = point.y - y0;
                let a = dx * dx + dy * dy;
                let b = 2.0 * (ox * dx + oy * dy);
                let c = ox * ox + oy * oy - radius * radius;
                let disc = b * b - 4.0 * a * c;
                if disc < 0.0 {
                    return hits;
                }
                // Stable roots, avoiding cancellation between -b and sqrt(disc)
                let sign_b = if b < 0.0 { -1.0 } else { 1.0 };
                let q = -0.5 * (b + sign_b * disc.sqrt());
                if q == 0.0 {
                    return hits;
                }
                hits.push(q / a, epsilon);
                hits.push(c / q, epsilon);
            }
            _ => {
                let (a, b, c) = self.plane_coefficients().unwrap_or((0.0, 0.0, 0.0));
                let denom = a * dx + b * dy;
                if denom.abs() < epsilon {
                    // Parallel, no intersection
                    return hits;
                }
                hits.push(-(a * point.x + b * point.y + c) / denom, epsilon);
            }
        }
        hits
    }

    /// Coordinate ranges spanned by the surface: (x range, y range). An axis
    /// is None when the surface is unbounded along it.
    pub fn extents(&self) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
        match self.kind {
            SurfaceKind::XPlane { x0 } => (Some((x0, x0)), None),
            SurfaceKind::YPlane { y0 } => (None, Some((y0, y0))),
            SurfaceKind::Circle { x0, y0, radius } => {
                (Some((x0 - radius, x0 + radius)), Some((y0 - radius, y0 + radius)))
            }
            SurfaceKind::Plane { a, b, c } => {
                if b == 0.0 && a != 0.0 {
                    (Some((-c / a, -c / a)), None)
                } else if a == 0.0 && b != 0.0 {
                    (None, Some((-c / b, -c / b)))
                } else {
                    (None, None)
                }
            }
        }
    }

    /// Get the constraint this surface imposes on axis-aligned bounds when used as a halfspace.
    /// Returns (axis_index, is_upper_bound, value) or None if no axis constraint.
    pub fn axis_constraint(&self, halfspace_positive: bool) -> Option<(usize, bool, f64)> {
        let (a, b, c) = self.plane_coefficients()?;
        if b == 0.0 && a != 0.0 {
            // a*x + c > 0 is x > -c/a when a > 0
            Some((0, (a > 0.0) != halfspace_positive, -c / a))
        } else if a == 0.0 && b != 0.0 {
            Some((1, (b > 0.0) != halfspace_positive, -c / b))
        } else {
            None
        }
    }

    /// Bounding box ([x_min, y_min], [x_max, y_max]) of the negative halfspace
    /// of a circle; other halfspaces are unbounded.
    pub fn bounding_box(&self, halfspace_positive: bool) -> Option<([f64; 2], [f64; 2])> {
        match self.kind {
            SurfaceKind::Circle { x0, y0, radius } if !halfspace_positive => {
                Some(([x0 - radius, y0 - radius], [x0 + radius, y0 + radius]))
            }
            _ => None,
        }
    }

    /// The same surface expressed in a frame whose origin sits at (dx, dy) of
    /// the current frame, i.e. shifted by (dx, dy) into the parent frame.
    pub fn translated_kind(&self, dx: f64, dy: f64) -> SurfaceKind {
        match self.kind {
            SurfaceKind::Plane { a, b, c } => SurfaceKind::Plane {
                a,
                b,
                c: c - a * dx - b * dy,
            },
            SurfaceKind::XPlane { x0 } => SurfaceKind::XPlane { x0: x0 + dx },
            SurfaceKind::YPlane { y0 } => SurfaceKind::YPlane { y0: y0 + dy },
            SurfaceKind::Circle { x0, y0, radius } => SurfaceKind::Circle {
                x0: x0 + dx,
                y0: y0 + dy,
                radius,
            },
        }
    }
}
