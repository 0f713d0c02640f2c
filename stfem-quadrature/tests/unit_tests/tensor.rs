use matrixcompare::assert_scalar_eq;
use stfem_quadrature::tensor::{tensor_gauss, tensor_gauss_lobatto};

#[test]
fn tensor_gauss_weights_sum_to_volume() {
    let (weights, points) = tensor_gauss::<2>(3);
    assert_eq!(weights.len(), 9);
    assert_eq!(points.len(), 9);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-13);

    let (weights, _) = tensor_gauss::<3>(2);
    assert_eq!(weights.len(), 8);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 8.0, comp = abs, tol = 1e-13);
}

#[test]
fn tensor_gauss_first_coordinate_runs_fastest() {
    let (_, points) = tensor_gauss::<2>(2);
    assert!(points[0][0] < points[1][0]);
    assert_eq!(points[0][1], points[1][1]);
    assert!(points[1][1] < points[2][1]);
}

#[test]
fn tensor_gauss_integrates_tensor_polynomials() {
    // int_{[-1, 1]^3} x^2 y^4 z^2 = (2/3) (2/5) (2/3)
    let (weights, points) = tensor_gauss::<3>(3);
    let integral: f64 = weights
        .iter()
        .zip(&points)
        .map(|(w, [x, y, z])| w * x.powi(2) * y.powi(4) * z.powi(2))
        .sum();
    assert_scalar_eq!(integral, (2.0 / 3.0) * (2.0 / 5.0) * (2.0 / 3.0), comp = abs, tol = 1e-13);
}

#[test]
fn tensor_gauss_lobatto_contains_corners() {
    let (_, points) = tensor_gauss_lobatto::<2>(3).unwrap();
    assert_eq!(points[0], [-1.0, -1.0]);
    assert_eq!(points[8], [1.0, 1.0]);
    assert!(tensor_gauss_lobatto::<2>(1).is_err());
}
