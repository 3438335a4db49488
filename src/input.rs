use crate::cell::Cell;
use crate::error::{GeometryError, Result};
use crate::geometry::Geometry;
use crate::lattice::Lattice;
use crate::material::Material;
use crate::settings::GeometrySettings;
use crate::surface::Surface;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source of fully formed entities, one stream per kind. A geometry consumes
/// the streams in the order materials, surfaces, cells, lattices.
pub trait Parser {
    fn materials(&self) -> Vec<Material>;
    fn surfaces(&self) -> Vec<Surface>;
    fn cells(&self) -> Vec<Cell>;
    fn lattices(&self) -> Vec<Lattice>;
}

/// A geometry described as a JSON document with one array per entity kind
/// and optional settings.
///
/// ```json
/// {
///   "materials": [{"material_id": 1, "sigma_t": [1.0], "sigma_a": [0.5], "sigma_s": [[0.5]]}],
///   "surfaces": [{"surface_id": 1, "kind": {"type": "circle", "x0": 0.0, "y0": 0.0, "radius": 1.0}}],
///   "cells": [{"cell_id": 1, "universe_id": 0, "kind": {"type": "material", "material_id": 1}, "surfaces": [-1]}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryInput {
    pub settings: GeometrySettings,
    pub materials: Vec<Material>,
    pub surfaces: Vec<Surface>,
    pub cells: Vec<Cell>,
    pub lattices: Vec<Lattice>,
}

impl GeometryInput {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GeometryError::Parse(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GeometryError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Build and finalize the geometry described by this document.
    pub fn build(&self) -> Result<Geometry> {
        Geometry::from_parser(self, self.settings.clone())
    }
}

impl Parser for GeometryInput {
    fn materials(&self) -> Vec<Material> {
        self.materials.clone()
    }

    fn surfaces(&self) -> Vec<Surface> {
        self.surfaces.clone()
    }

    fn cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    fn lattices(&self) -> Vec<Lattice> {
        self.lattices.clone()
    }
}
