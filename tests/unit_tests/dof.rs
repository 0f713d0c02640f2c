use crate::unit_hypercube_mesh;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Point};
use proptest::prelude::*;
use stfem::dof::{Constraints, DofHandler};
use stfem::mesh::HyperRectangleMesh;

#[test]
fn dof_counts() {
    let mesh = HyperRectangleMesh::subdivided_hyper_rectangle([3, 2], Point::origin(), Point::from([3.0, 2.0])).unwrap();
    let q1 = DofHandler::new(&mesh, 1).unwrap();
    assert_eq!(q1.n_dofs(), 4 * 3);
    assert_eq!(q1.dofs_per_cell(), 4);
    assert_eq!(q1.num_cells(), 6);
    assert_eq!(q1.subdivisions(), [3, 2]);

    let q3 = DofHandler::new(&mesh, 3).unwrap();
    assert_eq!(q3.n_dofs(), 10 * 7);
    assert_eq!(q3.dofs_per_cell(), 16);

    assert!(DofHandler::new(&mesh, 0).is_err());
}

#[test]
fn neighboring_cells_share_face_dofs() {
    let mesh = unit_hypercube_mesh::<2>(2);
    let dof_handler = DofHandler::new(&mesh, 2).unwrap();
    let mut left = vec![0; 9];
    let mut right = vec![0; 9];
    dof_handler.populate_cell_dofs(&mut left, 0);
    dof_handler.populate_cell_dofs(&mut right, 1);

    // The right face of cell 0 is the left face of cell 1
    for j in 0..3 {
        assert_eq!(left[3 * j + 2], right[3 * j]);
    }
    assert_eq!(left, vec![0, 1, 2, 5, 6, 7, 10, 11, 12]);
}

#[test]
fn every_dof_belongs_to_some_cell() {
    let mesh = unit_hypercube_mesh::<3>(2);
    let dof_handler = DofHandler::new(&mesh, 2).unwrap();
    let mut seen = vec![false; dof_handler.n_dofs()];
    let mut cell_dofs = vec![0; dof_handler.dofs_per_cell()];
    for cell in 0..dof_handler.num_cells() {
        dof_handler.populate_cell_dofs(&mut cell_dofs, cell);
        for &dof in &cell_dofs {
            seen[dof] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn boundary_dofs() {
    let mesh = unit_hypercube_mesh::<2>(3);
    let dof_handler = DofHandler::new(&mesh, 2).unwrap();
    let boundary = dof_handler.boundary_dofs();
    // 7 x 7 lattice with a 5 x 5 interior
    assert_eq!(boundary.len(), 49 - 25);
    assert!(boundary.windows(2).all(|w| w[0] < w[1]));

    let points = dof_handler.support_points(&mesh);
    for (dof, p) in points.iter().enumerate() {
        let on_boundary = p.iter().any(|&x| x.abs() < 1e-12 || (x - 1.0).abs() < 1e-12);
        assert_eq!(boundary.binary_search(&dof).is_ok(), on_boundary, "dof {} at {}", dof, p);
    }
}

#[test]
fn support_points_follow_lexicographic_lattice() {
    let mesh = HyperRectangleMesh::subdivided_hyper_rectangle([2], Point::from([1.0]), Point::from([3.0])).unwrap();
    let dof_handler = DofHandler::new(&mesh, 2).unwrap();
    let points: Vec<f64> = dof_handler
        .support_points(&mesh)
        .iter()
        .map(|p| p[0])
        .collect();
    let expected = [1.0, 1.5, 2.0, 2.5, 3.0];
    for (x, y) in points.iter().zip(&expected) {
        assert_scalar_eq!(*x, *y, comp = abs, tol = 1e-14);
    }
}

#[test]
fn constraints() {
    let none = Constraints::none(5);
    assert_eq!(none.n_dofs(), 5);
    assert_eq!(none.num_constrained(), 0);

    let constraints = Constraints::from_constrained_dofs(5, &[3, 0, 3]);
    assert_eq!(constraints.num_constrained(), 2);
    assert!(constraints.is_constrained(0));
    assert!(!constraints.is_constrained(1));
    assert_eq!(constraints.constrained_dofs().collect::<Vec<_>>(), vec![0, 3]);

    let mut v = DVector::from_element(5, 2.0);
    constraints.set_zero(&mut v);
    assert_eq!(v, DVector::from_column_slice(&[0.0, 2.0, 2.0, 0.0, 2.0]));

    let mesh = unit_hypercube_mesh::<2>(2);
    let dof_handler = DofHandler::new(&mesh, 1).unwrap();
    let boundary = Constraints::zero_boundary(&dof_handler);
    assert_eq!(boundary.num_constrained(), 8);
    assert!(!boundary.is_constrained(4));
}

#[test]
#[should_panic]
fn out_of_bounds_constraint_panics() {
    Constraints::from_constrained_dofs(3, &[3]);
}

proptest! {
    #[test]
    fn cell_dofs_are_distinct_and_in_range(n0 in 1 .. 4usize, n1 in 1 .. 4usize, degree in 1 .. 4usize) {
        let mesh = HyperRectangleMesh::subdivided_hyper_rectangle([n0, n1], Point::origin(), Point::from([1.0, 1.0])).unwrap();
        let dof_handler = DofHandler::new(&mesh, degree).unwrap();
        prop_assert_eq!(dof_handler.n_dofs(), (n0 * degree + 1) * (n1 * degree + 1));

        let mut cell_dofs = vec![0; dof_handler.dofs_per_cell()];
        for cell in 0 .. dof_handler.num_cells() {
            dof_handler.populate_cell_dofs(&mut cell_dofs, cell);
            let mut sorted = cell_dofs.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), cell_dofs.len());
            prop_assert!(cell_dofs.iter().all(|&dof| dof < dof_handler.n_dofs()));
        }
    }
}
