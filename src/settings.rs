use serde::{Deserialize, Serialize};

/// Numeric tolerances and id policies used while building and tracing a
/// geometry.
///
/// Every field has a default, so a partial JSON document such as
/// `{"tiny_move": 1e-9}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Distance a point is pushed past a crossed boundary so that it lands
    /// strictly inside the next cell or lattice tile.
    pub tiny_move: f64,
    /// Ray/surface intersections closer than this to the ray origin are
    /// discarded, and roots closer than this to each other are merged.
    pub intersection_epsilon: f64,
    /// First id handed out to surfaces and cells fabricated by ring and
    /// sector refinement.
    pub refinement_id_base: i32,
    /// Absolute tolerance on sigma_t - (sigma_a + sum of scattering) per group.
    pub sigma_t_tolerance: f64,
    /// Id of the universe every point location starts from.
    pub root_universe: i32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        GeometrySettings {
            tiny_move: 1e-8,
            intersection_epsilon: 1e-10,
            refinement_id_base: 10000,
            sigma_t_tolerance: 1e-3,
            root_universe: 0,
        }
    }
}

impl GeometrySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a JSON string, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::error::GeometryError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let settings = GeometrySettings::default();
        assert_eq!(settings.tiny_move, 1e-8);
        assert_eq!(settings.intersection_epsilon, 1e-10);
        assert_eq!(settings.refinement_id_base, 10000);
        assert_eq!(settings.root_universe, 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = GeometrySettings::from_json_str(r#"{"tiny_move": 1e-9}"#).unwrap();
        assert_eq!(settings.tiny_move, 1e-9);
        assert_eq!(settings.refinement_id_base, 10000);
    }

    #[test]
    fn test_invalid_json() {
        let result = GeometrySettings::from_json_str("{not json");
        assert!(matches!(result, Err(crate::error::GeometryError::Parse(_))));
    }
}
