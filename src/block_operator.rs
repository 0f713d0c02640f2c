//! Space-time block operators `Alpha ⊗ K + Beta ⊗ M`.
use crate::block_vector::BlockVector;
use crate::diagonal::DiagonalMatrix;
use crate::operator::SystemOperator;
use crate::tensor_product::tensor_product_add_vector;
use crate::Real;
use log::trace;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;
use std::time::Instant;

/// Couples two scalar operators `K` and `M` through the dense matrices `Alpha` and `Beta`.
///
/// Block `j` of the action on a block vector `u` is
/// `sum_i Alpha(j, i) K u_i + Beta(j, i) M u_i`. Every scalar operator is applied once per
/// source block, and its result is distributed to every destination block with a non-zero
/// coupling entry.
///
/// The block operator only borrows its parts and never mutates them, so it can be used from
/// several threads at once.
#[derive(Debug)]
pub struct BlockSystemOperator<'a, T: Real, Op: ?Sized> {
    k: &'a Op,
    m: &'a Op,
    alpha: &'a DMatrix<T>,
    beta: &'a DMatrix<T>,
    alpha_is_zero: bool,
    beta_is_zero: bool,
}

impl<'a, T, Op> BlockSystemOperator<'a, T, Op>
where
    T: Real,
    Op: ?Sized + SystemOperator<T>,
{
    /// # Panics
    ///
    /// Panics if `alpha` and `beta` differ in shape or if `k` and `m` differ in size.
    pub fn new(k: &'a Op, m: &'a Op, alpha: &'a DMatrix<T>, beta: &'a DMatrix<T>) -> Self {
        assert_eq!(alpha.shape(), beta.shape(), "Coupling matrices must have the same shape");
        assert_eq!(k.m(), m.m(), "Scalar operators must have the same size");
        Self {
            k,
            m,
            alpha,
            beta,
            alpha_is_zero: alpha.iter().all(|&a| a == T::zero()),
            beta_is_zero: beta.iter().all(|&b| b == T::zero()),
        }
    }

    /// Total number of rows, i.e. the number of blocks times the size of a block.
    pub fn m(&self) -> usize {
        self.alpha.nrows() * self.m.m()
    }

    pub fn n_blocks(&self) -> usize {
        self.alpha.nrows()
    }

    pub fn alpha(&self) -> &DMatrix<T> {
        self.alpha
    }

    pub fn beta(&self) -> &DMatrix<T> {
        self.beta
    }

    /// A zero block vector with one block per row of the coupling matrices.
    pub fn initialize_dof_vector(&self) -> BlockVector<T> {
        BlockVector::from_blocks(vec![self.k.initialize_dof_vector(); self.n_blocks()])
    }

    /// A zero vector laid out like a single block.
    pub fn initialize_scalar_dof_vector(&self) -> DVector<T> {
        self.k.initialize_dof_vector()
    }

    fn assert_block_layout(&self, vector: &BlockVector<T>, n_blocks: usize, name: &str) {
        assert_eq!(vector.n_blocks(), n_blocks, "{} block count mismatch", name);
        for block in vector.blocks() {
            assert_eq!(block.len(), self.k.m(), "{} block dimension mismatch", name);
        }
    }

    /// Computes `dst = (Alpha ⊗ K + Beta ⊗ M) src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` does not have one block per column or `dst` one block per row of the
    /// coupling matrices.
    pub fn vmult(&self, dst: &mut BlockVector<T>, src: &BlockVector<T>) {
        let timer = Instant::now();
        self.assert_block_layout(src, self.alpha.ncols(), "Source");
        self.assert_block_layout(dst, self.alpha.nrows(), "Destination");
        dst.set_zero();
        let mut tmp = self.initialize_scalar_dof_vector();
        for i in 0..self.alpha.ncols() {
            let alpha_column: Vec<_> = self.alpha.column(i).iter().copied().collect();
            let beta_column: Vec<_> = self.beta.column(i).iter().copied().collect();
            self.distribute(dst, &mut tmp, src.block(i), self.k, &alpha_column);
            self.distribute(dst, &mut tmp, src.block(i), self.m, &beta_column);
        }
        trace!("Block vmult with {} blocks took {:?}", dst.n_blocks(), timer.elapsed());
    }

    /// Computes `dst = (Alpha^T ⊗ K + Beta^T ⊗ M) src`.
    ///
    /// This is the transpose of [`vmult`](Self::vmult) when `K` and `M` are symmetric.
    pub fn tvmult(&self, dst: &mut BlockVector<T>, src: &BlockVector<T>) {
        let timer = Instant::now();
        self.assert_block_layout(src, self.alpha.nrows(), "Source");
        self.assert_block_layout(dst, self.alpha.ncols(), "Destination");
        dst.set_zero();
        let mut tmp = self.initialize_scalar_dof_vector();
        for i in 0..self.alpha.nrows() {
            let alpha_row: Vec<_> = self.alpha.row(i).iter().copied().collect();
            let beta_row: Vec<_> = self.beta.row(i).iter().copied().collect();
            self.distribute(dst, &mut tmp, src.block(i), self.k, &alpha_row);
            self.distribute(dst, &mut tmp, src.block(i), self.m, &beta_row);
        }
        trace!("Block Tvmult with {} blocks took {:?}", dst.n_blocks(), timer.elapsed());
    }

    /// Computes `tmp = op * x` once and adds `weights[j] * tmp` to every block `j` of `dst`.
    fn distribute(
        &self,
        dst: &mut BlockVector<T>,
        tmp: &mut DVector<T>,
        x: &DVector<T>,
        op: &Op,
        weights: &[T],
    ) {
        if weights.iter().all(|&w| w == T::zero()) {
            return;
        }
        op.vmult(tmp, x);
        for (j, &w) in weights.iter().enumerate() {
            if w != T::zero() {
                dst.add_scaled_block(j, w, tmp);
            }
        }
    }

    /// Computes `dst += (Alpha ⊗ K + Beta ⊗ M) src` for coupling matrices with a single column.
    ///
    /// Used to spread one spatial right-hand side over all time blocks. If `Alpha` (`Beta`)
    /// vanishes, `K` (`M`) is not applied at all.
    ///
    /// # Panics
    ///
    /// Panics if the coupling matrices have more than one column.
    pub fn vmult_add_vector(&self, dst: &mut BlockVector<T>, src: &DVector<T>) {
        let timer = Instant::now();
        assert_eq!(self.alpha.ncols(), 1, "Coupling matrices must have a single column");
        self.assert_block_layout(dst, self.alpha.nrows(), "Destination");
        assert_eq!(src.len(), self.k.m(), "Source dimension mismatch");
        let mut tmp = self.initialize_scalar_dof_vector();
        if !self.alpha_is_zero {
            self.k.vmult(&mut tmp, src);
            tensor_product_add_vector(dst, self.alpha, &tmp, 0);
        }
        if !self.beta_is_zero {
            self.m.vmult(&mut tmp, src);
            tensor_product_add_vector(dst, self.beta, &tmp, 0);
        }
        trace!("Block vmult_add from vector took {:?}", timer.elapsed());
    }

    /// Computes `dst = (Alpha ⊗ K + Beta ⊗ M) src` for coupling matrices with a single column.
    pub fn vmult_vector(&self, dst: &mut BlockVector<T>, src: &DVector<T>) {
        dst.set_zero();
        self.vmult_add_vector(dst, src);
    }

    /// The diagonal of the diagonal blocks, `Alpha(i, i) diag(K) + Beta(i, i) diag(M)` in block `i`.
    ///
    /// Off-diagonal coupling blocks are ignored, so this is the true diagonal of the operator
    /// only if the coupling matrices are diagonal.
    ///
    /// # Panics
    ///
    /// Panics if the coupling matrices are not square.
    pub fn diagonal(&self) -> Arc<DiagonalMatrix<BlockVector<T>>> {
        assert!(self.alpha.is_square(), "Block diagonal requires square coupling matrices");
        let diag_k = self.k.matrix_diagonal().vector();
        let diag_m = self.m.matrix_diagonal().vector();
        let blocks = (0..self.n_blocks())
            .map(|i| diag_k * self.alpha[(i, i)] + diag_m * self.beta[(i, i)])
            .collect();
        Arc::new(DiagonalMatrix::new(BlockVector::from_blocks(blocks)))
    }

    /// Combines the scalar diagonal inverses into
    /// `diag(K)^{-1} / Alpha(i, i) + diag(M)^{-1} / Beta(i, i)` in block `i`.
    ///
    /// A term whose coupling entry is exactly zero is left out.
    ///
    /// # Panics
    ///
    /// Panics if the coupling matrices are not square.
    pub fn diagonal_inverse(&self) -> Arc<DiagonalMatrix<BlockVector<T>>> {
        assert!(self.alpha.is_square(), "Block diagonal requires square coupling matrices");
        let inv_k = self.k.matrix_diagonal_inverse().vector();
        let inv_m = self.m.matrix_diagonal_inverse().vector();
        let blocks = (0..self.n_blocks())
            .map(|i| {
                let mut block = DVector::zeros(inv_k.len());
                for (weight, inverse) in [(self.alpha[(i, i)], inv_k), (self.beta[(i, i)], inv_m)] {
                    if weight != T::zero() {
                        block.axpy(T::one() / weight, inverse, T::one());
                    }
                }
                block
            })
            .collect();
        Arc::new(DiagonalMatrix::new(BlockVector::from_blocks(blocks)))
    }
}
