//! Kronecker-style actions of small dense matrices on block vectors.
//!
//! Given a dense `m x n` matrix `A` and a block vector `b` with `n` blocks, the action
//! `(A ⊗ I) b` produces `m` blocks with
//!
//! $$
//! c_i = \sum_j A_{ij} b_j.
//! $$
//!
//! Zero entries of `A` are skipped entirely, without touching the corresponding blocks.
use crate::block_vector::BlockVector;
use crate::Real;
use nalgebra::{convert, DMatrix, DVector};
use simba::scalar::SupersetOf;

/// Accumulates `c_{offset + i} += A_{i0} b` for every row `i` of the `m x 1` matrix `A`.
///
/// The output is *not* reset. `block_offset` selects the first block of `c` addressed by
/// row `0` of `A`.
///
/// # Panics
///
/// Panics if `A` does not have exactly one column, or if `c` has too few blocks.
pub fn tensor_product_add_vector<T: Real>(c: &mut BlockVector<T>, a: &DMatrix<T>, b: &DVector<T>, block_offset: usize) {
    assert_eq!(a.ncols(), 1, "Matrix must have a single column");
    assert!(
        block_offset + a.nrows() <= c.n_blocks(),
        "Output has too few blocks for matrix and offset"
    );
    for (i, &a_i) in a.column(0).iter().enumerate() {
        if a_i != T::zero() {
            c.add_scaled_block(block_offset + i, a_i, b);
        }
    }
}

/// Accumulates `c_{offset + i} += sum_j A_{ij} b_{offset + j}`.
///
/// The output is *not* reset. The same `block_offset` applies to both `c` and `b`, so that
/// a square coupling matrix can address a contiguous window of a longer space-time vector.
///
/// # Panics
///
/// Panics if `c` or `b` have too few blocks for the matrix and offset.
pub fn tensor_product_add<T: Real>(c: &mut BlockVector<T>, a: &DMatrix<T>, b: &BlockVector<T>, block_offset: usize) {
    assert!(
        block_offset + a.nrows() <= c.n_blocks(),
        "Output has too few blocks for matrix and offset"
    );
    assert!(
        block_offset + a.ncols() <= b.n_blocks(),
        "Input has too few blocks for matrix and offset"
    );
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            let a_ij = a[(i, j)];
            if a_ij != T::zero() {
                c.add_scaled_block(block_offset + i, a_ij, b.block(block_offset + j));
            }
        }
    }
}

/// Computes `A ⊗ b` for an `m x 1` matrix `A`, producing `m` blocks laid out like `b`.
pub fn tensor_product_vector<T: Real>(a: &DMatrix<T>, b: &DVector<T>) -> BlockVector<T> {
    let mut c = BlockVector::zeros(a.nrows(), b.len());
    tensor_product_add_vector(&mut c, a, b, 0);
    c
}

/// Computes `(A ⊗ I) b`, producing `A.nrows()` blocks.
///
/// Output block `i` is laid out like input block `i`.
///
/// # Panics
///
/// Panics if `b` does not have `A.ncols()` blocks, or if `A` has more rows than `b` has blocks.
pub fn tensor_product<T: Real>(a: &DMatrix<T>, b: &BlockVector<T>) -> BlockVector<T> {
    assert_eq!(a.ncols(), b.n_blocks(), "Matrix columns must match number of blocks");
    assert!(a.nrows() <= b.n_blocks(), "Output blocks take their layout from the input blocks");
    let blocks = (0..a.nrows())
        .map(|i| DVector::zeros(b.block(i).len()))
        .collect();
    let mut c = BlockVector::from_blocks(blocks);
    tensor_product_add(&mut c, a, b, 0);
    c
}

/// Converts a coupling matrix to another scalar type.
pub fn cast_coupling_matrix<T, T2>(matrix: &DMatrix<T>) -> DMatrix<T2>
where
    T: Real,
    T2: Real + SupersetOf<T>,
{
    matrix.map(|x| convert::<T, T2>(x))
}
