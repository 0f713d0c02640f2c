//! Run parameters shared by mesh generation and coefficient construction.
use eyre::{bail, eyre, WrapErr};
use nalgebra::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters describing the spatial problem setup.
///
/// Parameters are typically read from a JSON file. Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Number of coarse cells along each axis of the hyper-rectangle.
    pub subdivisions: Vec<usize>,
    pub hyperrect_lower_left: Vec<f64>,
    pub hyperrect_upper_right: Vec<f64>,
    /// Number of global refinements applied to the coarse mesh.
    pub refinement: usize,
    /// Polynomial degree of the spatial finite element.
    pub fe_degree: usize,
    /// Relative magnitude of random vertex perturbations. Zero disables grid distortion.
    pub distort_grid: f64,
    /// Relative magnitude of the random coefficient perturbation. Zero disables it.
    pub distort_coeff: f64,
    /// The constants `c1, c2, c3` of the three coefficient regions.
    pub coefficient_values: [f64; 3],
    /// Seed for every random stream derived from these parameters.
    pub seed: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            subdivisions: vec![1, 1],
            hyperrect_lower_left: vec![0.0, 0.0],
            hyperrect_upper_right: vec![1.0, 1.0],
            refinement: 2,
            fe_degree: 1,
            distort_grid: 0.0,
            distort_coeff: 0.0,
            coefficient_values: [1.0, 9.0, 16.0],
            seed: 5489,
        }
    }
}

impl Parameters {
    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        serde_json::from_str(json).wrap_err("failed to parse parameters")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read parameter file {}", path.display()))?;
        Self::from_json_str(&contents).wrap_err_with(|| format!("invalid parameter file {}", path.display()))
    }

    /// Checks that the parameters describe a valid `D`-dimensional setup.
    pub fn validate<const D: usize>(&self) -> eyre::Result<()> {
        self.subdivisions::<D>()?;
        let lower_left = self.lower_left::<D>()?;
        let upper_right = self.upper_right::<D>()?;
        if (0..D).any(|d| upper_right[d] <= lower_left[d]) {
            bail!("upper right corner must lie strictly above and to the right of the lower left corner");
        }
        if self.fe_degree == 0 {
            bail!("finite element degree must be at least 1");
        }
        if !(0.0..0.5).contains(&self.distort_grid) {
            bail!("grid distortion must lie in [0, 0.5), got {}", self.distort_grid);
        }
        if !(0.0..1.0).contains(&self.distort_coeff) {
            bail!("coefficient distortion must lie in [0, 1), got {}", self.distort_coeff);
        }
        Ok(())
    }

    pub fn subdivisions<const D: usize>(&self) -> eyre::Result<[usize; D]> {
        let subdivisions: [usize; D] = self
            .subdivisions
            .as_slice()
            .try_into()
            .map_err(|_| eyre!("expected {} subdivisions, got {}", D, self.subdivisions.len()))?;
        if subdivisions.iter().any(|&n| n == 0) {
            bail!("subdivisions must be positive, got {:?}", subdivisions);
        }
        Ok(subdivisions)
    }

    pub fn lower_left<const D: usize>(&self) -> eyre::Result<Point<f64, D>> {
        to_point(&self.hyperrect_lower_left, "lower left corner")
    }

    pub fn upper_right<const D: usize>(&self) -> eyre::Result<Point<f64, D>> {
        to_point(&self.hyperrect_upper_right, "upper right corner")
    }
}

fn to_point<const D: usize>(coords: &[f64], name: &str) -> eyre::Result<Point<f64, D>> {
    if coords.len() != D {
        bail!("{} must have {} coordinates, got {}", name, D, coords.len());
    }
    Ok(Point::from_slice(coords))
}
