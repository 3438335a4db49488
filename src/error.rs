use std::fmt;

/// The kind of entity an id refers to, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Material,
    Surface,
    Cell,
    Universe,
    Lattice,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Material => "material",
            EntityKind::Surface => "surface",
            EntityKind::Cell => "cell",
            EntityKind::Universe => "universe",
            EntityKind::Lattice => "lattice",
        };
        f.write_str(name)
    }
}

/// Errors raised while building or querying a geometry.
///
/// Configuration errors are fatal during build and leave the geometry
/// unusable. Query-time errors indicate a malformed model (overlaps or gaps)
/// or a failure of the ray-tracing tolerances.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("cannot add a second {kind} with id = {id}")]
    DuplicateId { kind: EntityKind, id: i32 },

    #[error("{referrer} references {kind} with id = {id}, which does not exist")]
    UnknownReference {
        kind: EntityKind,
        id: i32,
        referrer: String,
    },

    #[error(
        "material {id}: sigma_t = {sigma_t} in group {group} does not match sigma_a + sigma_s = {sum}"
    )]
    InvalidMaterial {
        id: i32,
        group: usize,
        sigma_t: f64,
        sum: f64,
    },

    #[error("{referrer} uses surface id {id}; surface ids must be positive")]
    InvalidSurfaceId { id: i32, referrer: String },

    #[error("cannot refine cell {cell}: {reason}")]
    UnsupportedRefinement { cell: i32, reason: String },

    #[error("invalid lattice {id}: {reason}")]
    InvalidLattice { id: i32, reason: String },

    #[error("point ({x}, {y}) is not inside any cell of universe {universe}")]
    PointOutsideGeometry { x: f64, y: f64, universe: i32 },

    #[error("created a segment with the same start and end point: x = {x}, y = {y}")]
    DegenerateRay { x: f64, y: f64 },

    #[error("universe {id} contains itself through its fill cells or lattice tiles")]
    CyclicUniverse { id: i32 },

    #[error("ray from ({x}, {y}) at angle {phi} never leaves its cell")]
    UnboundedRay { x: f64, y: f64, phi: f64 },

    #[error("the geometry has no root universe with id = {0}")]
    MissingRootUniverse(i32),

    #[error("flat source region {fsr} is outside [0, {num_fsrs})")]
    InvalidFsr { fsr: usize, num_fsrs: usize },

    #[error("the geometry has not been finalized")]
    NotFinalized,

    #[error("failed to parse geometry input: {0}")]
    Parse(String),

    #[error("failed to export geometry: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
