//! Spatially varying scalar coefficients.
use crate::batch::{Lanes, BATCH_WIDTH};
use crate::params::Parameters;
use eyre::bail;
use nalgebra::{Point, SVector};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A scalar function of the physical coordinates.
pub trait CoefficientFunction<const D: usize>: Sync {
    fn value(&self, point: &Point<f64, D>) -> f64;

    /// Evaluates the function at the quadrature points of every cell in a batch.
    ///
    /// Must agree with [`value`](Self::value) lane by lane.
    fn value_lanes(&self, points: &[Point<f64, D>; BATCH_WIDTH]) -> Lanes<f64> {
        Lanes::from_fn(|lane| self.value(&points[lane]))
    }
}

impl<const D: usize, F> CoefficientFunction<D> for F
where
    F: Fn(&Point<f64, D>) -> f64 + Sync,
{
    fn value(&self, point: &Point<f64, D>) -> f64 {
        self(point)
    }
}

/// A coefficient with the same value everywhere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantCoefficient(pub f64);

impl<const D: usize> CoefficientFunction<D> for ConstantCoefficient {
    fn value(&self, _point: &Point<f64, D>) -> f64 {
        self.0
    }
}

/// Threshold separating the three coefficient regions along the two leading axes.
const REGION_THRESHOLD: f64 = 0.2;

/// A piecewise constant coefficient with three regions, optionally perturbed per grid cell.
///
/// With `(x, y)` the two leading coordinates of a point, the undistorted coefficient is
///
/// - `c1` if `y < 0.2`,
/// - `c2` if `y >= 0.2` and `x < 0.2`,
/// - `c3` otherwise.
///
/// If a distortion is configured, the value is multiplied by a factor drawn once per cell of a
/// uniform grid over a hyper-rectangle, uniformly from `[1 - d, 1 + d]`. The factors come from
/// a seeded generator, so equal seeds and grids reproduce identical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientField<const D: usize> {
    values: [f64; 3],
    distortion: Option<DistortionTable<D>>,
}

#[derive(Debug, Clone, PartialEq)]
struct DistortionTable<const D: usize> {
    lower_left: Point<f64, D>,
    step_size: SVector<f64, D>,
    shape: [usize; D],
    factors: Vec<f64>,
}

impl<const D: usize> DistortionTable<D> {
    fn factor(&self, point: &Point<f64, D>) -> f64 {
        let mut index = 0;
        let mut stride = 1;
        for d in 0..D {
            // Points outside the grid are clamped onto its boundary cells
            let i = ((point[d] - self.lower_left[d]) / self.step_size[d]) as usize;
            index += i.min(self.shape[d] - 1) * stride;
            stride *= self.shape[d];
        }
        self.factors[index]
    }

    /// Looks up the factors of a whole batch, computing the flat cell index axis by axis.
    fn factor_lanes(&self, points: &[Point<f64, D>; BATCH_WIDTH]) -> Lanes<f64> {
        let mut indices = [0usize; BATCH_WIDTH];
        let mut stride = 1;
        for d in 0..D {
            let last = self.shape[d] - 1;
            for (index, point) in indices.iter_mut().zip(points) {
                let i = ((point[d] - self.lower_left[d]) / self.step_size[d]) as usize;
                *index += i.min(last) * stride;
            }
            stride *= self.shape[d];
        }
        Lanes::from_fn(|lane| self.factors[indices[lane]])
    }
}

impl<const D: usize> CoefficientField<D> {
    /// A field with region values `[c1, c2, c3]`, perturbed by `distort` on the uniform grid
    /// with `subdivisions` cells over `[lower_left, upper_right]`.
    pub fn new(
        values: [f64; 3],
        distort: f64,
        subdivisions: [usize; D],
        lower_left: Point<f64, D>,
        upper_right: Point<f64, D>,
        seed: u64,
    ) -> eyre::Result<Self> {
        Self::piecewise_constant(values)?.with_distortion(distort, subdivisions, lower_left, upper_right, seed)
    }

    /// An undistorted field with region values `[c1, c2, c3]`.
    pub fn piecewise_constant(values: [f64; 3]) -> eyre::Result<Self> {
        if D < 2 {
            bail!("coefficient regions require at least two spatial dimensions");
        }
        Ok(Self {
            values,
            distortion: None,
        })
    }

    /// Perturbs the field by a random factor per cell of the uniform grid with `subdivisions`
    /// cells over `[lower_left, upper_right]`.
    ///
    /// A zero `distort` leaves the field unperturbed, regardless of the seed.
    pub fn with_distortion(
        mut self,
        distort: f64,
        subdivisions: [usize; D],
        lower_left: Point<f64, D>,
        upper_right: Point<f64, D>,
        seed: u64,
    ) -> eyre::Result<Self> {
        if !(0.0..1.0).contains(&distort) {
            bail!("coefficient distortion must lie in [0, 1), got {}", distort);
        }
        if subdivisions.iter().any(|&n| n == 0) {
            bail!("distortion grid needs at least one cell per axis");
        }
        if (0..D).any(|d| upper_right[d] <= lower_left[d]) {
            bail!("degenerate distortion grid [{}, {}]", lower_left, upper_right);
        }
        if distort == 0.0 {
            self.distortion = None;
            return Ok(self);
        }

        let num_factors = subdivisions.iter().product();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let uniform = Uniform::new_inclusive(1.0 - distort, 1.0 + distort);
        let factors = (0..num_factors).map(|_| uniform.sample(&mut rng)).collect();
        let extents = upper_right - lower_left;

        self.distortion = Some(DistortionTable {
            lower_left,
            step_size: SVector::from_fn(|d, _| extents[d] / subdivisions[d] as f64),
            shape: subdivisions,
            factors,
        });
        Ok(self)
    }

    /// The field described by the coefficient values and distortion settings of `params`.
    ///
    /// The distortion grid is the coarse (unrefined) grid of the parameters.
    pub fn from_parameters(params: &Parameters) -> eyre::Result<Self> {
        params.validate::<D>()?;
        Self::new(
            params.coefficient_values,
            params.distort_coeff,
            params.subdivisions::<D>()?,
            params.lower_left::<D>()?,
            params.upper_right::<D>()?,
            params.seed,
        )
    }

    pub fn is_distorted(&self) -> bool {
        self.distortion.is_some()
    }

    fn region_value(&self, x: f64, y: f64) -> f64 {
        let [c1, c2, c3] = self.values;
        if y >= REGION_THRESHOLD {
            if x < REGION_THRESHOLD {
                c2
            } else {
                c3
            }
        } else {
            c1
        }
    }
}

impl<const D: usize> CoefficientFunction<D> for CoefficientField<D> {
    fn value(&self, point: &Point<f64, D>) -> f64 {
        let value = self.region_value(point[0], point[1]);
        match &self.distortion {
            Some(table) => value * table.factor(point),
            None => value,
        }
    }

    fn value_lanes(&self, points: &[Point<f64, D>; BATCH_WIDTH]) -> Lanes<f64> {
        let x = Lanes::from_fn(|lane| points[lane][0]);
        let y = Lanes::from_fn(|lane| points[lane][1]);
        let values = Lanes::from_fn(|lane| self.region_value(x[lane], y[lane]));
        match &self.distortion {
            Some(table) => values * table.factor_lanes(points),
            None => values,
        }
    }
}
