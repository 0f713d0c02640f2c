use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DVector;
use proptest::collection::vec;
use proptest::prelude::*;
use stfem::block_vector::BlockVector;
use stfem::diagonal::{regularized_inverse, DiagonalMatrix};

fn two_blocks() -> BlockVector<f64> {
    BlockVector::from_blocks(vec![
        DVector::from_column_slice(&[1.0, 2.0, 2.0]),
        DVector::from_column_slice(&[0.0, -4.0, 0.0]),
    ])
}

#[test]
fn layout() {
    let v = BlockVector::<f64>::zeros(3, 4);
    assert_eq!(v.n_blocks(), 3);
    assert_eq!(v.len(), 12);
    assert!(!v.is_empty());

    let empty = BlockVector::<f64>::new(2);
    assert_eq!(empty.n_blocks(), 2);
    assert!(empty.is_empty());
    assert_eq!(BlockVector::<f64>::default().n_blocks(), 0);
}

#[test]
fn norms_and_inner_products() {
    let v = two_blocks();
    assert_eq!(v.norm_squared(), 25.0);
    assert_eq!(v.norm(), 5.0);
    assert_eq!(v.dot(&v), 25.0);

    let w = BlockVector::from_blocks(vec![DVector::from_element(3, 1.0), DVector::from_element(3, 1.0)]);
    assert_eq!(v.dot(&w), 1.0);
}

#[test]
fn set_zero_keeps_layout() {
    let mut v = two_blocks();
    v.set_zero();
    assert_eq!(v, BlockVector::zeros(2, 3));
}

#[test]
fn add_scaled_block_only_touches_one_block() {
    let mut v = two_blocks();
    v.add_scaled_block(1, 0.5, &DVector::from_column_slice(&[2.0, 8.0, -2.0]));
    assert_eq!(v.block(0), &DVector::from_column_slice(&[1.0, 2.0, 2.0]));
    assert_eq!(v.block(1), &DVector::from_column_slice(&[1.0, 0.0, -1.0]));
}

#[test]
#[should_panic]
fn add_scaled_block_with_wrong_length_panics() {
    let mut v = two_blocks();
    v.add_scaled_block(0, 1.0, &DVector::zeros(2));
}

#[test]
#[should_panic]
fn dot_with_different_layout_panics() {
    let v = two_blocks();
    v.dot(&BlockVector::zeros(3, 3));
}

#[test]
fn precision_cast() {
    let v = BlockVector::from_blocks(vec![DVector::from_column_slice(&[0.1f64, 1.0 / 3.0])]);
    let single: BlockVector<f32> = v.cast();
    assert_eq!(single.block(0)[0], 0.1f32);
    assert_eq!(single.block(0)[1], 1.0f32 / 3.0);

    let back: BlockVector<f64> = single.cast();
    assert_scalar_eq!(back.block(0)[1], 1.0 / 3.0, comp = abs, tol = 1e-7);
}

#[test]
fn diagonal_application() {
    let diagonal = DiagonalMatrix::new(DVector::from_column_slice(&[2.0, -1.0, 0.5]));
    assert_eq!(diagonal.m(), 3);
    let mut dst = DVector::zeros(3);
    diagonal.vmult(&mut dst, &DVector::from_column_slice(&[1.0, 2.0, 4.0]));
    assert_eq!(dst, DVector::from_column_slice(&[2.0, -2.0, 2.0]));

    let block_diagonal = DiagonalMatrix::new(two_blocks());
    assert_eq!(block_diagonal.m(), 6);
    let mut dst = BlockVector::zeros(2, 3);
    let src = BlockVector::from_blocks(vec![DVector::from_element(3, 2.0), DVector::from_element(3, -1.0)]);
    block_diagonal.vmult(&mut dst, &src);
    assert_eq!(dst.block(0), &DVector::from_column_slice(&[2.0, 4.0, 4.0]));
    assert_eq!(dst.block(1), &DVector::from_column_slice(&[0.0, 4.0, 0.0]));
}

#[test]
fn regularized_inverse_replaces_tiny_entries() {
    let d = DVector::from_column_slice(&[4.0f64, 0.0, -0.5, 1e-10, 1e-6]);
    let inverse = regularized_inverse(&d);
    let expected = DVector::from_column_slice(&[0.25, 1.0, -2.0, 1.0, 1e6]);
    assert_matrix_eq!(inverse, expected, comp = float);

    // The threshold scales with the precision
    let d = DVector::from_column_slice(&[1e-4f32, 1e-2]);
    let inverse = regularized_inverse(&d);
    assert_eq!(inverse[0], 1.0);
    assert_scalar_eq!(inverse[1], 100.0, comp = abs, tol = 1e-3);
}

proptest! {
    #[test]
    fn dot_matches_concatenated_vectors(
        blocks in (1 .. 4usize).prop_flat_map(|n| vec((vec(-5.0f64 .. 5.0, 3), vec(-5.0f64 .. 5.0, 3)), n))
    ) {
        let (a, b): (Vec<_>, Vec<_>) = blocks.into_iter().unzip();
        let flat_a = DVector::from_iterator(3 * a.len(), a.iter().flatten().copied());
        let flat_b = DVector::from_iterator(3 * b.len(), b.iter().flatten().copied());
        let a = BlockVector::from_blocks(a.into_iter().map(DVector::from_vec).collect());
        let b = BlockVector::from_blocks(b.into_iter().map(DVector::from_vec).collect());

        assert_scalar_eq!(a.dot(&b), flat_a.dot(&flat_b), comp = abs, tol = 1e-10);
        assert_scalar_eq!(a.norm(), flat_a.norm(), comp = abs, tol = 1e-10);

        let mut c = a.clone();
        c.add_scaled_block(0, 2.0, b.block(0));
        assert_matrix_eq!(c.block(0).clone(), a.block(0) + b.block(0) * 2.0, comp = abs, tol = 1e-12);
    }
}
