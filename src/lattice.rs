use crate::error::{GeometryError, Result};
use crate::point::Point;
use serde::{Deserialize, Serialize};

/// Rectangular `num_x` by `num_y` tiling of universes with pitch
/// (`pitch_x`, `pitch_y`), centred on its frame origin.
///
/// Tile (i, j) counts i along x and j along y, with (0, 0) in the lower left
/// corner. The input `universes` rows are listed top row first, as they read
/// on a drawing of the lattice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub lattice_id: i32,
    /// Dense, zero-based index among lattices.
    #[serde(skip)]
    pub uid: usize,
    pub num_x: usize,
    pub num_y: usize,
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub universes: Vec<Vec<i32>>,
    /// Universe uid of each tile, indexed `j * num_x + i`.
    #[serde(skip)]
    pub tiles: Vec<usize>,
    /// First FSR id of each tile relative to the lattice, indexed like `tiles`.
    #[serde(skip)]
    pub fsr_offsets: Vec<usize>,
}

impl Lattice {
    pub fn new(lattice_id: i32, pitch_x: f64, pitch_y: f64, universes: Vec<Vec<i32>>) -> Self {
        let num_y = universes.len();
        let num_x = universes.first().map_or(0, Vec::len);
        Lattice {
            lattice_id,
            uid: 0,
            num_x,
            num_y,
            pitch_x,
            pitch_y,
            universes,
            tiles: Vec::new(),
            fsr_offsets: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| GeometryError::InvalidLattice {
            id: self.lattice_id,
            reason,
        };
        if self.num_x == 0 || self.num_y == 0 {
            return Err(invalid("lattice has no tiles".to_string()));
        }
        if !(self.pitch_x > 0.0 && self.pitch_y > 0.0) {
            return Err(invalid(format!(
                "pitch ({}, {}) must be positive",
                self.pitch_x, self.pitch_y
            )));
        }
        if self.universes.len() != self.num_y {
            return Err(invalid(format!(
                "expected {} rows of universes, found {}",
                self.num_y,
                self.universes.len()
            )));
        }
        if let Some(row) = self.universes.iter().position(|r| r.len() != self.num_x) {
            return Err(invalid(format!(
                "row {} has {} universes, expected {}",
                row,
                self.universes[row].len(),
                self.num_x
            )));
        }
        Ok(())
    }

    pub fn num_tiles(&self) -> usize {
        self.num_x * self.num_y
    }

    pub fn tile_index(&self, i: usize, j: usize) -> usize {
        j * self.num_x + i
    }

    /// User id of the universe in tile (i, j)
    pub fn universe_id_at(&self, i: usize, j: usize) -> i32 {
        self.universes[self.num_y - 1 - j][i]
    }

    /// Universe uid of tile (i, j), once resolved
    pub fn tile_universe(&self, i: usize, j: usize) -> usize {
        self.tiles[self.tile_index(i, j)]
    }

    pub fn fsr_offset(&self, i: usize, j: usize) -> usize {
        self.fsr_offsets.get(self.tile_index(i, j)).copied().unwrap_or(0)
    }

    pub fn width(&self) -> f64 {
        self.num_x as f64 * self.pitch_x
    }

    pub fn height(&self) -> f64 {
        self.num_y as f64 * self.pitch_y
    }

    /// Tile containing a lattice-frame point, or None outside the lattice.
    pub fn tile_indices(&self, point: &Point) -> Option<(usize, usize)> {
        let fi = ((point.x + 0.5 * self.width()) / self.pitch_x).floor();
        let fj = ((point.y + 0.5 * self.height()) / self.pitch_y).floor();
        // A point on the outer top/right edge belongs to the last tile
        let i = clamp_edge(fi, point.x, 0.5 * self.width(), self.num_x)?;
        let j = clamp_edge(fj, point.y, 0.5 * self.height(), self.num_y)?;
        Some((i, j))
    }

    /// Centre of tile (i, j) in the lattice frame
    pub fn tile_center(&self, i: usize, j: usize) -> Point {
        Point::new(
            -0.5 * self.width() + (i as f64 + 0.5) * self.pitch_x,
            -0.5 * self.height() + (j as f64 + 0.5) * self.pitch_y,
        )
    }

    /// Distance along `phi` from a tile-frame point to the tile walls, and the
    /// index steps (di, dj) taken when crossing there. Both steps are non-zero
    /// when the ray leaves through a corner.
    pub fn distance_to_tile_wall(&self, tile_point: &Point, phi: f64, tolerance: f64) -> (f64, i32, i32) {
        let (cos, sin) = (phi.cos(), phi.sin());
        let (dist_x, di) = wall_distance(tile_point.x, cos, 0.5 * self.pitch_x);
        let (dist_y, dj) = wall_distance(tile_point.y, sin, 0.5 * self.pitch_y);
        if (dist_x - dist_y).abs() < tolerance {
            (dist_x.min(dist_y), di, dj)
        } else if dist_x < dist_y {
            (dist_x, di, 0)
        } else {
            (dist_y, 0, dj)
        }
    }

    /// Step from tile (i, j) to the next tile along `phi`. Returns the new
    /// tile indices, the point in the new tile's frame just past the wall,
    /// and the distance travelled; None when the ray leaves the lattice.
    pub fn next_tile(
        &self,
        i: usize,
        j: usize,
        tile_point: &Point,
        phi: f64,
        tiny_move: f64,
    ) -> Option<(usize, usize, Point, f64)> {
        let (dist, di, dj) = self.distance_to_tile_wall(tile_point, phi, tiny_move);
        if !dist.is_finite() {
            return None;
        }
        let new_i = i as i64 + di as i64;
        let new_j = j as i64 + dj as i64;
        if new_i < 0 || new_j < 0 || new_i >= self.num_x as i64 || new_j >= self.num_y as i64 {
            return None;
        }
        let (new_i, new_j) = (new_i as usize, new_j as usize);
        let travelled = dist + tiny_move;
        let center = self.tile_center(i, j);
        let lattice_point = Point::new(center.x + tile_point.x, center.y + tile_point.y).along(phi, travelled);
        let new_center = self.tile_center(new_i, new_j);
        let new_tile_point = Point::new(lattice_point.x - new_center.x, lattice_point.y - new_center.y);
        Some((new_i, new_j, new_tile_point, travelled))
    }
}

fn clamp_edge(index: f64, coordinate: f64, half_extent: f64, count: usize) -> Option<usize> {
    if index >= 0.0 && (index as usize) < count {
        Some(index as usize)
    } else if index as usize == count && coordinate <= half_extent {
        Some(count - 1)
    } else {
        None
    }
}

fn wall_distance(coordinate: f64, direction: f64, half_pitch: f64) -> (f64, i32) {
    if direction > 0.0 && direction.abs() > 1e-14 {
        (((half_pitch - coordinate) / direction).max(0.0), 1)
    } else if direction < 0.0 && direction.abs() > 1e-14 {
        (((-half_pitch - coordinate) / direction).max(0.0), -1)
    } else {
        (f64::INFINITY, 0)
    }
}
