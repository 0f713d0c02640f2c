use matrixcompare::assert_scalar_eq;
use stfem_quadrature::univariate::{gauss, gauss_lobatto};
use stfem_quadrature::{Error, Rule};

fn integrate(rule: &Rule<1>, f: impl Fn(f64) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, [x])| w * f(*x)).sum()
}

/// Exact integral of x^k over [-1, 1].
fn monomial_integral(k: i32) -> f64 {
    if k % 2 == 1 {
        0.0
    } else {
        2.0 / (k as f64 + 1.0)
    }
}

#[test]
fn gauss_integrates_polynomials_exactly() {
    for n in 1..=10 {
        let rule = gauss(n);
        assert_eq!(rule.0.len(), n);
        for k in 0..=(2 * n as i32 - 1) {
            let integral = integrate(&rule, |x| x.powi(k));
            assert_scalar_eq!(integral, monomial_integral(k), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_points_are_sorted_and_interior() {
    for n in 1..=10 {
        let (_, points) = gauss(n);
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
        assert!(points.iter().all(|[x]| x.abs() < 1.0));
    }
}

#[test]
#[should_panic]
fn gauss_with_zero_points_panics() {
    gauss(0);
}

#[test]
fn gauss_lobatto_contains_end_points() {
    for n in 2..=10 {
        let (weights, points) = gauss_lobatto(n).unwrap();
        assert_eq!(points.len(), n);
        assert_eq!(weights.len(), n);
        assert_eq!(points.first().unwrap()[0], -1.0);
        assert_eq!(points.last().unwrap()[0], 1.0);
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
    }
}

#[test]
fn gauss_lobatto_integrates_polynomials_exactly() {
    for n in 2..=10 {
        let rule = gauss_lobatto(n).unwrap();
        for k in 0..=(2 * n as i32 - 3) {
            let integral = integrate(&rule, |x| x.powi(k));
            assert_scalar_eq!(integral, monomial_integral(k), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_lobatto_three_points() {
    let (weights, points) = gauss_lobatto(3).unwrap();
    assert_scalar_eq!(points[1][0], 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights[0], 1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 4.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[2], 1.0 / 3.0, comp = abs, tol = 1e-14);
}

#[test]
fn gauss_lobatto_requires_two_points() {
    assert_eq!(gauss_lobatto(0), Err(Error::NoRuleAvailable));
    assert_eq!(gauss_lobatto(1), Err(Error::NoRuleAvailable));
}
