use matrixcompare::assert_scalar_eq;
use nalgebra::Point;
use proptest::prelude::*;
use stfem::batch::BATCH_WIDTH;
use stfem::coefficient::{CoefficientField, CoefficientFunction, ConstantCoefficient};
use stfem::params::Parameters;

const VALUES: [f64; 3] = [1.0, 9.0, 16.0];

fn distorted_field(distort: f64, seed: u64) -> CoefficientField<2> {
    CoefficientField::new(VALUES, distort, [4, 3], Point::origin(), Point::from([1.0, 1.0]), seed).unwrap()
}

#[test]
fn piecewise_constant_regions() {
    let field = CoefficientField::<2>::piecewise_constant(VALUES).unwrap();
    let samples = [0.0, 0.1, 0.19999, 0.2, 0.20001, 0.5, 1.0];
    for &x in &samples {
        for &y in &samples {
            let expected = if y < 0.2 {
                1.0
            } else if x < 0.2 {
                9.0
            } else {
                16.0
            };
            assert_eq!(field.value(&Point::from([x, y])), expected, "x = {}, y = {}", x, y);
        }
    }

    // Exactly on the thresholds
    assert_eq!(field.value(&Point::from([0.1, 0.2])), 9.0);
    assert_eq!(field.value(&Point::from([0.2, 0.2])), 16.0);
    assert_eq!(field.value(&Point::from([0.2, 0.1])), 1.0);
}

#[test]
fn regions_only_depend_on_two_leading_coordinates() {
    let field = CoefficientField::<3>::piecewise_constant(VALUES).unwrap();
    for z in [0.0, 0.1, 0.7] {
        assert_eq!(field.value(&Point::from([0.5, 0.1, z])), 1.0);
        assert_eq!(field.value(&Point::from([0.1, 0.5, z])), 9.0);
        assert_eq!(field.value(&Point::from([0.5, 0.5, z])), 16.0);
    }
}

#[test]
fn zero_distortion_is_independent_of_seed() {
    let baseline = CoefficientField::<2>::piecewise_constant(VALUES).unwrap();
    let a = distorted_field(0.0, 1);
    let b = distorted_field(0.0, 12345);
    assert!(!a.is_distorted());
    assert_eq!(a, b);

    for i in 0..=10 {
        for j in 0..=10 {
            let p = Point::from([i as f64 / 10.0, j as f64 / 10.0]);
            assert_eq!(a.value(&p), baseline.value(&p));
            assert_eq!(b.value(&p), baseline.value(&p));
        }
    }
}

#[test]
fn distortion_is_reproducible_from_seed() {
    let a = distorted_field(0.3, 42);
    let b = distorted_field(0.3, 42);
    let c = distorted_field(0.3, 43);
    assert!(a.is_distorted());
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn distortion_is_bounded_and_constant_per_grid_cell() {
    let distort = 0.3;
    let field = distorted_field(distort, 7);
    let baseline = CoefficientField::<2>::piecewise_constant(VALUES).unwrap();

    // The grid has 4 x 3 cells of size 0.25 x (1/3). Sample two points in the same grid cell
    // and the same region.
    let p = Point::from([0.55, 0.4]);
    let q = Point::from([0.7, 0.6]);
    assert_scalar_eq!(field.value(&p), field.value(&q), comp = abs, tol = 1e-14);

    for i in 0..20 {
        for j in 0..20 {
            let p = Point::from([(i as f64 + 0.5) / 20.0, (j as f64 + 0.5) / 20.0]);
            let factor = field.value(&p) / baseline.value(&p);
            assert!(factor >= 1.0 - distort && factor <= 1.0 + distort);
        }
    }
}

#[test]
fn invalid_coefficients_are_rejected() {
    assert!(CoefficientField::<1>::piecewise_constant(VALUES).is_err());
    let new = |distort, subdivisions| {
        CoefficientField::<2>::new(VALUES, distort, subdivisions, Point::origin(), Point::from([1.0, 1.0]), 0)
    };
    assert!(new(1.0, [2, 2]).is_err());
    assert!(new(-0.1, [2, 2]).is_err());
    assert!(new(0.1, [0, 2]).is_err());
    assert!(CoefficientField::<2>::new(VALUES, 0.1, [2, 2], Point::from([1.0, 0.0]), Point::from([1.0, 1.0]), 0).is_err());
}

#[test]
fn field_from_parameters() {
    let params = Parameters {
        subdivisions: vec![2, 2],
        coefficient_values: [2.0, 3.0, 4.0],
        distort_coeff: 0.0,
        ..Default::default()
    };
    let field = CoefficientField::<2>::from_parameters(&params).unwrap();
    assert_eq!(field.value(&Point::from([0.5, 0.1])), 2.0);
    assert_eq!(field.value(&Point::from([0.1, 0.5])), 3.0);
    assert_eq!(field.value(&Point::from([0.5, 0.5])), 4.0);

    let distorted = Parameters {
        distort_coeff: 0.2,
        ..params.clone()
    };
    assert!(CoefficientField::<2>::from_parameters(&distorted).unwrap().is_distorted());
    assert!(CoefficientField::<3>::from_parameters(&params).is_err());
}

#[test]
fn constant_and_closure_coefficients() {
    let p = Point::from([0.3, 0.4]);
    assert_eq!(ConstantCoefficient(2.5).value(&p), 2.5);
    let linear = |p: &Point<f64, 2>| p.x + 2.0 * p.y;
    assert_scalar_eq!(linear.value(&p), 1.1, comp = abs, tol = 1e-14);
}

#[test]
fn lanewise_evaluation_spans_regions_and_grid_cells() {
    let field = distorted_field(0.5, 11);
    // One point per region, the last one beyond the upper grid corner
    let points: [Point<f64, 2>; BATCH_WIDTH] = [[0.9, 0.05], [0.1, 0.6], [0.4, 0.4], [1.3, 1.2]].map(Point::from);
    let lanes = field.value_lanes(&points);
    for lane in 0..BATCH_WIDTH {
        assert_eq!(lanes[lane], field.value(&points[lane]), "lane {}", lane);
    }
    assert_eq!(lanes[3], field.value(&Point::from([0.99, 0.99])));

    let field = CoefficientField::<3>::new(VALUES, 0.4, [2, 2, 3], Point::origin(), Point::from([1.0; 3]), 3).unwrap();
    let points: [Point<f64, 3>; BATCH_WIDTH] = [[0.5, 0.1, 0.1], [0.1, 0.5, 0.5], [0.6, 0.7, 0.9], [0.6, 0.7, -0.2]].map(Point::from);
    let lanes = field.value_lanes(&points);
    for lane in 0..BATCH_WIDTH {
        assert_eq!(lanes[lane], field.value(&points[lane]), "lane {}", lane);
    }
}

proptest! {
    #[test]
    fn lanewise_evaluation_matches_scalar_evaluation(
        coords in prop::array::uniform4((0.0f64 .. 1.0, 0.0f64 .. 1.0)),
        distort in 0.0f64 .. 0.9,
        seed in any::<u64>(),
    ) {
        let field = distorted_field(distort, seed);
        let points: [Point<f64, 2>; BATCH_WIDTH] = coords.map(|(x, y)| Point::from([x, y]));
        let lanes = field.value_lanes(&points);
        for lane in 0 .. BATCH_WIDTH {
            prop_assert_eq!(lanes[lane], field.value(&points[lane]));
        }
    }
}
