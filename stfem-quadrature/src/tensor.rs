//! Quadrature rules on `[-1, 1]^D` formed as tensor products of one-dimensional rules.
//!
//! Points are enumerated lexicographically with the *first* coordinate running fastest,
//! which matches the numbering of tensor-product finite element bases.

use crate::univariate::{gauss, gauss_lobatto};
use crate::{Error, Rule};

/// Forms the D-fold tensor product of a one-dimensional rule.
pub fn tensor_product<const D: usize>(rule1d: &Rule<1>) -> Rule<D> {
    let (weights1d, points1d) = rule1d;
    let n = weights1d.len();
    let num_points = n.pow(D as u32);

    let mut weights = Vec::with_capacity(num_points);
    let mut points = Vec::with_capacity(num_points);
    for linear_index in 0..num_points {
        let mut remainder = linear_index;
        let mut weight = 1.0;
        let mut point = [0.0; D];
        for coord in point.iter_mut() {
            let i = remainder % n;
            remainder /= n;
            weight *= weights1d[i];
            *coord = points1d[i][0];
        }
        weights.push(weight);
        points.push(point);
    }

    (weights, points)
}

/// A Gauss quadrature rule for the reference hypercube `[-1, 1]^D`.
///
/// The rule has `num_points_per_dim` points along each axis and integrates polynomials of
/// order up to `2 n - 1` in each coordinate exactly.
pub fn tensor_gauss<const D: usize>(num_points_per_dim: usize) -> Rule<D> {
    tensor_product(&gauss(num_points_per_dim))
}

/// A Gauss-Lobatto quadrature rule for the reference hypercube `[-1, 1]^D`.
pub fn tensor_gauss_lobatto<const D: usize>(num_points_per_dim: usize) -> Result<Rule<D>, Error> {
    Ok(tensor_product(&gauss_lobatto(num_points_per_dim)?))
}
