use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};

/// Multi-group macroscopic cross sections of one material.
///
/// All per-group vectors have one entry per energy group. The scattering
/// matrix is indexed `sigma_s[from][to]`, so the out-scattering from group
/// `g` is the sum of row `g`.
///
/// A material joins a geometry only if, for every group, sigma_t equals
/// sigma_a plus the out-scattering within the configured tolerance (see
/// [`Material::check_sigma_t`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier for the material
    pub material_id: i32,
    /// Dense, zero-based index assigned when the material joins a geometry.
    #[serde(skip)]
    pub uid: usize,
    /// Optional name of the material
    #[serde(default)]
    pub name: Option<String>,
    pub sigma_t: Vec<f64>,
    pub sigma_a: Vec<f64>,
    pub sigma_s: Vec<Vec<f64>>,
    #[serde(default)]
    pub sigma_f: Vec<f64>,
    #[serde(default)]
    pub nu_sigma_f: Vec<f64>,
    #[serde(default)]
    pub chi: Vec<f64>,
}

impl Material {
    /// Create a non-fissile material from total, absorption and scattering data.
    pub fn new(material_id: i32, sigma_t: Vec<f64>, sigma_a: Vec<f64>, sigma_s: Vec<Vec<f64>>) -> Self {
        let num_groups = sigma_t.len();
        Material {
            material_id,
            uid: 0,
            name: None,
            sigma_t,
            sigma_a,
            sigma_s,
            sigma_f: vec![0.0; num_groups],
            nu_sigma_f: vec![0.0; num_groups],
            chi: vec![0.0; num_groups],
        }
    }

    /// Add fission data (sigma_f, nu*sigma_f and the fission spectrum chi).
    pub fn with_fission(mut self, sigma_f: Vec<f64>, nu_sigma_f: Vec<f64>, chi: Vec<f64>) -> Self {
        self.sigma_f = sigma_f;
        self.nu_sigma_f = nu_sigma_f;
        self.chi = chi;
        self
    }

    /// Set the name of the material
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn num_groups(&self) -> usize {
        self.sigma_t.len()
    }

    pub fn is_fissile(&self) -> bool {
        self.nu_sigma_f.iter().any(|&v| v > 0.0)
    }

    /// Total out-scattering cross section from group `g`
    pub fn sigma_s_out(&self, g: usize) -> f64 {
        self.sigma_s.get(g).map_or(0.0, |row| row.iter().sum())
    }

    /// Check that sigma_t(g) = sigma_a(g) + sum_g' sigma_s(g -> g') for every group.
    pub fn check_sigma_t(&self, tolerance: f64) -> Result<()> {
        let num_groups = self.num_groups();
        if self.sigma_a.len() != num_groups || self.sigma_s.len() != num_groups {
            return Err(GeometryError::InvalidMaterial {
                id: self.material_id,
                group: num_groups.min(self.sigma_a.len()).min(self.sigma_s.len()),
                sigma_t: f64::NAN,
                sum: f64::NAN,
            });
        }
        for g in 0..num_groups {
            let sum = self.sigma_a[g] + self.sigma_s_out(g);
            if (self.sigma_t[g] - sum).abs() > tolerance {
                return Err(GeometryError::InvalidMaterial {
                    id: self.material_id,
                    group: g,
                    sigma_t: self.sigma_t[g],
                    sum,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_group() -> Material {
        Material::new(
            1,
            vec![0.5, 1.2],
            vec![0.01, 0.1],
            vec![vec![0.47, 0.02], vec![0.0, 1.1]],
        )
    }

    #[test]
    fn test_valid_material() {
        let material = two_group();
        assert_eq!(material.num_groups(), 2);
        assert!((material.sigma_s_out(0) - 0.49).abs() < 1e-12);
        assert!(material.check_sigma_t(1e-3).is_ok());
        assert!(!material.is_fissile());
    }

    #[test]
    fn test_sigma_t_mismatch() {
        let mut material = two_group();
        material.sigma_t[1] = 2.0;
        match material.check_sigma_t(1e-3) {
            Err(GeometryError::InvalidMaterial { id, group, .. }) => {
                assert_eq!(id, 1);
                assert_eq!(group, 1);
            }
            other => panic!("expected InvalidMaterial, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_data_rejected() {
        let material = Material::new(4, vec![1.0, 1.0], vec![1.0], vec![vec![0.0]]);
        assert!(material.check_sigma_t(1e-3).is_err());
    }

    #[test]
    fn test_fission_data() {
        let fuel = two_group().with_fission(vec![0.0, 0.05], vec![0.0, 0.12], vec![1.0, 0.0]);
        assert!(fuel.is_fissile());
        assert_eq!(fuel.chi, vec![1.0, 0.0]);
    }
}
