use crate::point::Point;
use crate::surface::BoundaryType;
use serde::{Deserialize, Serialize};

/// The part of a track lying inside a single flat source region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub length: f64,
    /// Flat source region id
    pub region_id: usize,
    /// Material uid
    pub material: usize,
}

/// A straight ray through the geometry, cut into segments by
/// [`Geometry::segmentize`](crate::geometry::Geometry::segmentize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub start: Point,
    /// Azimuthal angle, normally in [0, π)
    pub phi: f64,
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Point just past the outer boundary where the track left the geometry.
    #[serde(default)]
    pub end: Point,
    /// Boundary condition of the surface the track left through.
    #[serde(default)]
    pub boundary_out: BoundaryType,
}

impl Track {
    pub fn new(start: Point, phi: f64) -> Self {
        Track {
            start,
            phi,
            segments: Vec::new(),
            end: start,
            boundary_out: BoundaryType::default(),
        }
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Sum of the segment lengths
    pub fn length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }
}

/// Running minimum, maximum and count of segment lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Default for SegmentStats {
    fn default() -> Self {
        SegmentStats {
            min: f64::INFINITY,
            max: 0.0,
            count: 0,
        }
    }
}

impl SegmentStats {
    pub fn record(&mut self, length: f64) {
        self.min = self.min.min(length);
        self.max = self.max.max(length);
        self.count += 1;
    }

    pub fn merge(self, other: SegmentStats) -> SegmentStats {
        SegmentStats {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            count: self.count + other.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_track() {
        let track = Track::new(Point::new(-1.0, 0.0), 0.3);
        assert_eq!(track.end, track.start);
        assert_eq!(track.num_segments(), 0);
        assert_eq!(track.length(), 0.0);
        assert_eq!(track.boundary_out, BoundaryType::Transmission);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = SegmentStats::default();
        a.record(0.5);
        a.record(2.0);
        let mut b = SegmentStats::default();
        b.record(0.1);
        let merged = a.merge(b);
        assert_eq!(merged.min, 0.1);
        assert_eq!(merged.max, 2.0);
        assert_eq!(merged.count, 3);
        assert_eq!(SegmentStats::default().merge(a), a);
    }
}
