//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::{Error, Rule};
use std::f64::consts::PI;

const NEWTON_TOLERANCE: f64 = 1e-15;
const MAX_NEWTON_ITERATIONS: usize = 100;

/// The Legendre polynomial `P_n` and its predecessor `P_{n-1}` evaluated at a single point.
#[derive(Debug, Clone, Copy)]
struct Legendre {
    n: usize,
    x: f64,
    p_n: f64,
    p_n_minus_1: f64,
}

impl Legendre {
    fn evaluate(n: usize, x: f64) -> Self {
        // Bonnet's recursion: m P_m(x) = (2m - 1) x P_{m-1}(x) - (m - 1) P_{m-2}(x)
        let (mut p_n, mut p_n_minus_1) = (1.0, 0.0);
        for m in 1..=n {
            let m = m as f64;
            let p_next = ((2.0 * m - 1.0) * x * p_n - (m - 1.0) * p_n_minus_1) / m;
            p_n_minus_1 = p_n;
            p_n = p_next;
        }
        Self {
            n,
            x,
            p_n,
            p_n_minus_1,
        }
    }

    /// `P_n'(x)`. Only valid in the open interval `(-1, 1)`.
    fn derivative(&self) -> f64 {
        let n = self.n as f64;
        n * (self.x * self.p_n - self.p_n_minus_1) / (self.x * self.x - 1.0)
    }

    /// `P_n''(x)`, from the Legendre differential equation. Only valid in `(-1, 1)`.
    fn second_derivative(&self) -> f64 {
        let n = self.n as f64;
        let x = self.x;
        (2.0 * x * self.derivative() - n * (n + 1.0) * self.p_n) / (1.0 - x * x)
    }
}

/// Runs Newton's method from `x0` until the update falls below tolerance.
fn newton(mut x: f64, step: impl Fn(f64) -> f64) -> f64 {
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let dx = step(x);
        x += dx;
        if dx.abs() <= NEWTON_TOLERANCE {
            break;
        }
    }
    x
}

/// Gauss quadrature for the reference interval `[-1, 1]`.
///
/// Returns the [Gauss quadrature rule] with the given number of points, sorted in ascending
/// order. Given `n` points, the rule integrates polynomials of order up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut nodes: Vec<(f64, f64)> = Vec::with_capacity(n);
    // Roots are symmetric about the origin, so only the upper half needs Newton iterations
    let half = (n + 1) / 2;
    for i in 0..half {
        let x0 = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let x = newton(x0, |x| {
            let p = Legendre::evaluate(n, x);
            -p.p_n / p.derivative()
        });
        let dp = Legendre::evaluate(n, x).derivative();
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        if 2 * i + 1 == n {
            // The middle root of an odd rule is exactly zero
            nodes.push((0.0, w));
        } else {
            nodes.push((x, w));
            nodes.push((-x, w));
        }
    }

    collect_sorted(nodes)
}

/// Gauss-Lobatto quadrature for the reference interval `[-1, 1]`.
///
/// The rule contains both end points of the interval, and the interior points are the roots
/// of `P_{n-1}'`. Points are sorted in ascending order. Given `n` points, the rule integrates
/// polynomials of order up to `2 n - 3` exactly.
///
/// Returns an error if fewer than two points are requested.
pub fn gauss_lobatto(num_points: usize) -> Result<Rule<1>, Error> {
    let n = num_points;
    if n < 2 {
        return Err(Error::NoRuleAvailable);
    }

    let m = n - 1;
    let weight = |p_m: f64| 2.0 / ((n * m) as f64 * p_m * p_m);

    let mut nodes: Vec<(f64, f64)> = Vec::with_capacity(n);
    // |P_m(+-1)| = 1
    nodes.push((-1.0, weight(1.0)));
    nodes.push((1.0, weight(1.0)));

    for i in 1..=(m / 2) {
        // Chebyshev-Gauss-Lobatto points are close to the Legendre-Gauss-Lobatto points
        let x0 = (PI * i as f64 / m as f64).cos();
        let x = newton(x0, |x| {
            let p = Legendre::evaluate(m, x);
            -p.derivative() / p.second_derivative()
        });
        let w = weight(Legendre::evaluate(m, x).p_n);
        if 2 * i == m {
            nodes.push((0.0, w));
        } else {
            nodes.push((x, w));
            nodes.push((-x, w));
        }
    }

    debug_assert_eq!(nodes.len(), n);
    Ok(collect_sorted(nodes))
}

fn collect_sorted(mut nodes: Vec<(f64, f64)>) -> Rule<1> {
    nodes.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    let (points, weights): (Vec<_>, Vec<_>) = nodes.into_iter().map(|(x, w)| ([x], w)).unzip();
    (weights, points)
}
