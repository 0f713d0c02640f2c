//! Quadrature rules on the reference cell, expressed with `nalgebra` points.
use nalgebra::Point;
use stfem_quadrature::tensor::tensor_gauss;

pub use stfem_quadrature::{tensor, univariate, Error as QuadratureError, Rule};

/// A quadrature rule on the reference cell `[-1, 1]^D`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorQuadrature<const D: usize> {
    weights: Vec<f64>,
    points: Vec<Point<f64, D>>,
}

impl<const D: usize> TensorQuadrature<D> {
    /// The tensor-product Gauss rule with `num_points_per_dim` points along every axis.
    pub fn gauss(num_points_per_dim: usize) -> Self {
        Self::from(tensor_gauss::<D>(num_points_per_dim))
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn points(&self) -> &[Point<f64, D>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<const D: usize> From<Rule<D>> for TensorQuadrature<D> {
    fn from((weights, points): Rule<D>) -> Self {
        assert_eq!(weights.len(), points.len(), "Weights and points must have the same length");
        Self {
            weights,
            points: points.into_iter().map(Point::from).collect(),
        }
    }
}
