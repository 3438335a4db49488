use crate::error::{GeometryError, Result};
use crate::geometry::Geometry;
use crate::local_coords::{LevelKind, LocalCoords};
use crate::point::Point;
use crate::track::{Segment, SegmentStats, Track};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Outcome of moving a located point to the next boundary along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    /// The point entered this material cell (by uid).
    Cell(usize),
    /// The point left the geometry, through this surface (by uid) when known.
    Exit(Option<usize>),
    /// Nothing lies ahead of the point.
    Unbounded,
}

impl Geometry {
    /// Locate the point held at the top level of `coords`, rebuilding every
    /// level below it. Returns the material cell uid, or None when the point
    /// is outside the geometry.
    pub fn find_cell(&self, coords: &mut LocalCoords) -> Option<usize> {
        let top = coords.level(0)?.kind.universe();
        let universe = &self.universes[top];
        coords.prune(0);
        if let Some(level) = coords.level_mut(0) {
            *level = universe.entry_level(level.point);
        }
        universe.find_cell(coords, 0, self)
    }

    /// Locate a root-frame point.
    pub fn locate(&self, point: Point) -> Result<(LocalCoords, usize)> {
        let mut coords = self.root_coords(point)?;
        match self.find_cell(&mut coords) {
            Some(cell) => Ok((coords, cell)),
            None => Err(GeometryError::PointOutsideGeometry {
                x: point.x,
                y: point.y,
                universe: self.settings.root_universe,
            }),
        }
    }

    /// Move `coords` across the next boundary along `phi` and locate the
    /// material cell entered, or None when the ray leaves the geometry.
    pub fn find_next_cell(&self, coords: &mut LocalCoords, phi: f64) -> Option<usize> {
        match self.next_crossing(coords, phi) {
            Crossing::Cell(cell) => Some(cell),
            Crossing::Exit(_) | Crossing::Unbounded => None,
        }
    }

    /// Step the lattice at `depth` of `coords` into the neighbouring tile
    /// along `phi` and locate the material cell there. Returns None, leaving
    /// `coords` untouched, when the ray leaves the lattice.
    pub fn find_next_lattice_cell(&self, coords: &mut LocalCoords, depth: usize, phi: f64) -> Option<usize> {
        let (lattice_uid, i, j) = match coords.level(depth)?.kind {
            LevelKind::Lat { lattice, i, j } => (lattice, i, j),
            LevelKind::Univ { .. } => return None,
        };
        let lattice = self.universes[lattice_uid].lattice()?;
        let tile_point = coords.level(depth + 1)?.point;
        let (new_i, new_j, new_tile_point, travelled) =
            lattice.next_tile(i, j, &tile_point, phi, self.settings.tiny_move)?;

        let saved = coords.clone();
        coords.adjust_coords(phi.cos() * travelled, phi.sin() * travelled);
        coords.prune(depth);
        if let Some(level) = coords.level_mut(depth) {
            level.kind = LevelKind::Lat {
                lattice: lattice_uid,
                i: new_i,
                j: new_j,
            };
        }
        let tile = &self.universes[lattice.tile_universe(new_i, new_j)];
        coords.push(tile.entry_level(new_tile_point));
        match tile.find_cell(coords, depth + 1, self) {
            Some(cell) => Some(cell),
            None => {
                *coords = saved;
                None
            }
        }
    }

    /// Nearest surface ahead of the point in the cell chosen at each level,
    /// with the uid of that surface, top level first.
    fn level_surfaces(&self, coords: &LocalCoords, phi: f64) -> Vec<Option<(f64, usize)>> {
        let epsilon = self.settings.intersection_epsilon;
        coords
            .levels()
            .iter()
            .map(|level| match level.kind {
                LevelKind::Univ { cell: Some(cell), .. } => {
                    self.cells[cell].min_surface_dist(&level.point, phi, &self.surfaces, epsilon)
                }
                _ => None,
            })
            .collect()
    }

    /// Distance to the nearest tile wall ahead of the point at a lattice level.
    fn tile_wall_distance(&self, coords: &LocalCoords, depth: usize, phi: f64) -> Option<f64> {
        let lattice = match coords.level(depth)?.kind {
            LevelKind::Lat { lattice, .. } => self.universes[lattice].lattice()?,
            LevelKind::Univ { .. } => return None,
        };
        let tile_point = coords.level(depth + 1)?.point;
        let (dist, _, _) = lattice.distance_to_tile_wall(&tile_point, phi, self.settings.tiny_move);
        dist.is_finite().then_some(dist)
    }

    /// Nearest tile wall over all lattice levels, with the depth of its
    /// lattice. Ties go to the deepest lattice.
    fn nearest_tile_wall(&self, coords: &LocalCoords, phi: f64) -> Option<(f64, usize)> {
        let tiny = self.settings.tiny_move;
        let mut nearest: Option<(f64, usize)> = None;
        for depth in coords.lattice_depths() {
            if let Some(dist) = self.tile_wall_distance(coords, depth, phi) {
                if nearest.map_or(true, |(best, _)| dist <= best + tiny) {
                    nearest = Some((dist, depth));
                }
            }
        }
        nearest
    }

    fn advance(&self, coords: &mut LocalCoords, phi: f64, distance: f64) {
        coords.adjust_coords(phi.cos() * distance, phi.sin() * distance);
    }

    fn next_crossing(&self, coords: &mut LocalCoords, phi: f64) -> Crossing {
        let tiny = self.settings.tiny_move;
        if self.find_cell(coords).is_none() {
            return Crossing::Exit(None);
        }
        let level_surfaces = self.level_surfaces(coords, phi);
        let surface = level_surfaces
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| a.0.total_cmp(&b.0));
        let wall = self.nearest_tile_wall(coords, phi);

        let distance = match (surface, wall) {
            (None, None) => return Crossing::Unbounded,
            (Some((dist, _)), None) => dist,
            (Some((dist, _)), Some((wall_dist, _))) if dist < wall_dist => dist,
            (_, Some((wall_dist, depth))) => {
                // Bubble up through the lattices whose walls coincide with
                // the nearest one, deepest first
                for lattice_depth in coords.lattice_depths().into_iter().rev() {
                    if lattice_depth > depth {
                        continue;
                    }
                    let coincident = self
                        .tile_wall_distance(coords, lattice_depth, phi)
                        .map_or(false, |dist| dist <= wall_dist + tiny);
                    if !coincident {
                        break;
                    }
                    if let Some(cell) = self.find_next_lattice_cell(coords, lattice_depth, phi) {
                        return Crossing::Cell(cell);
                    }
                }
                wall_dist
            }
        };

        // Surfaces met at the crossing; the outermost one is the boundary
        // the ray leaves through if nothing lies beyond
        let exit_surface = level_surfaces
            .iter()
            .flatten()
            .find(|&&(dist, _)| dist <= distance + tiny)
            .map(|&(_, uid)| uid);

        self.advance(coords, phi, distance + tiny);
        match self.find_cell(coords) {
            Some(cell) => Crossing::Cell(cell),
            None => Crossing::Exit(exit_surface),
        }
    }

    /// Cut a track into segments, one per flat source region crossed, from
    /// its start until it leaves the geometry. Consecutive pieces in the same
    /// region are joined. A track starting outside the
    /// geometry gets no segments.
    pub fn segmentize(&self, track: &mut Track) -> Result<SegmentStats> {
        let mut stats = SegmentStats::default();
        track.segments.clear();
        track.end = track.start;
        track.boundary_out = Default::default();

        let mut segment_end = self.root_coords(track.start)?;
        let mut current = match self.find_cell(&mut segment_end) {
            Some(cell) => cell,
            None => {
                warn!(
                    x = track.start.x,
                    y = track.start.y,
                    phi = track.phi,
                    "track starts outside the geometry"
                );
                return Ok(stats);
            }
        };

        loop {
            let segment_start = segment_end.clone();
            let crossing = self.next_crossing(&mut segment_end, track.phi);
            let start = segment_start.point();
            if crossing == Crossing::Unbounded {
                return Err(GeometryError::UnboundedRay {
                    x: start.x,
                    y: start.y,
                    phi: track.phi,
                });
            }
            let end = segment_end.point();
            let length = start.distance(&end);
            if length < self.settings.intersection_epsilon {
                return Err(GeometryError::DegenerateRay { x: start.x, y: start.y });
            }

            let segment = Segment {
                length,
                region_id: self.find_fsr_id(&segment_start),
                material: self.cells[current].material().unwrap_or_default(),
            };
            debug!(
                start = ?(start.x, start.y),
                end = ?(end.x, end.y),
                length,
                fsr = segment.region_id,
                "created segment"
            );
            // A ray grazing a curved boundary re-enters the same region
            match track.segments.last_mut() {
                Some(last) if last.region_id == segment.region_id => last.length += length,
                _ => track.segments.push(segment),
            }

            match crossing {
                Crossing::Cell(next) => current = next,
                Crossing::Exit(surface) => {
                    track.end = end;
                    track.boundary_out = surface
                        .map(|uid| self.surfaces[uid].boundary_type())
                        .unwrap_or_default();
                    break;
                }
                Crossing::Unbounded => break,
            }
        }
        for segment in &track.segments {
            stats.record(segment.length);
        }
        Ok(stats)
    }

    /// Segmentize every track in parallel, returning the merged segment
    /// statistics. Stops at the first error.
    pub fn segmentize_all(&self, tracks: &mut [Track]) -> Result<SegmentStats> {
        let stats = tracks
            .par_iter_mut()
            .map(|track| self.segmentize(track))
            .try_reduce(SegmentStats::default, |a, b| Ok(a.merge(b)))?;
        info!(
            tracks = tracks.len(),
            segments = stats.count,
            min = stats.min,
            max = stats.max,
            "segmentized tracks"
        );
        Ok(stats)
    }
}
