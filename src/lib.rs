//! Geometry core for 2D method-of-characteristics neutron transport.
//!
//! A geometry is built from surfaces, cells, universes and lattices,
//! refined into flat source regions, and queried by tracing straight tracks
//! into per-region segments.

pub mod bounding_box;
pub mod cell;
pub mod csg;
pub mod error;
pub mod fsr;
pub mod geometry;
pub mod input;
pub mod lattice;
pub mod local_coords;
pub mod material;
pub mod point;
pub mod refine;
pub mod region;
pub mod settings;
pub mod surface;
pub mod tracer;
pub mod track;
pub mod universe;

pub use bounding_box::BoundingBox;
pub use cell::{Cell, CellKind};
pub use csg::CsgExport;
pub use error::{EntityKind, GeometryError, Result};
pub use fsr::FsrStep;
pub use geometry::Geometry;
pub use input::{GeometryInput, Parser};
pub use lattice::Lattice;
pub use local_coords::{Level, LevelKind, LocalCoords};
pub use material::Material;
pub use point::Point;
pub use region::{HalfspaceType, Region};
pub use settings::GeometrySettings;
pub use surface::{BoundaryType, Surface, SurfaceKind};
pub use track::{Segment, SegmentStats, Track};
pub use universe::{Universe, UniverseKind};
