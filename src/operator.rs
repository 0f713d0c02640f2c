//! The capabilities shared by matrix-free and assembled scalar operators.
use crate::diagonal::{regularized_inverse, DiagonalMatrix};
use crate::matrix_free::MatrixFreeOperator;
use crate::Real;
use eyre::bail;
use nalgebra::DVector;
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use std::sync::Arc;

/// A square linear operator on spatial degree-of-freedom vectors.
pub trait SystemOperator<T: Real> {
    /// Number of rows (and columns).
    fn m(&self) -> usize;

    /// Computes `dst = A * src`.
    fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>);

    /// A zero vector laid out like the operator's degrees of freedom.
    fn initialize_dof_vector(&self) -> DVector<T> {
        DVector::zeros(self.m())
    }

    fn matrix_diagonal(&self) -> &Arc<DiagonalMatrix<DVector<T>>>;

    /// The regularized entry-wise inverse of [`matrix_diagonal`](Self::matrix_diagonal).
    fn matrix_diagonal_inverse(&self) -> &Arc<DiagonalMatrix<DVector<T>>>;
}

impl<'a, T, A> SystemOperator<T> for &'a A
where
    T: Real,
    A: ?Sized + SystemOperator<T>,
{
    fn m(&self) -> usize {
        <A as SystemOperator<T>>::m(self)
    }

    fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>) {
        <A as SystemOperator<T>>::vmult(self, dst, src)
    }

    fn initialize_dof_vector(&self) -> DVector<T> {
        <A as SystemOperator<T>>::initialize_dof_vector(self)
    }

    fn matrix_diagonal(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        <A as SystemOperator<T>>::matrix_diagonal(self)
    }

    fn matrix_diagonal_inverse(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        <A as SystemOperator<T>>::matrix_diagonal_inverse(self)
    }
}

/// A scalar operator backed by an explicitly assembled sparse matrix.
#[derive(Debug, Clone)]
pub struct AssembledOperator<T: Real> {
    matrix: CsrMatrix<T>,
    diagonal: Arc<DiagonalMatrix<DVector<T>>>,
    diagonal_inverse: Arc<DiagonalMatrix<DVector<T>>>,
}

impl<T: Real> AssembledOperator<T> {
    pub fn from_matrix(matrix: CsrMatrix<T>) -> eyre::Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            bail!("system matrix must be square, got {}x{}", matrix.nrows(), matrix.ncols());
        }
        let mut diagonal = DVector::zeros(matrix.nrows());
        for (i, j, &v) in matrix.triplet_iter() {
            if i == j {
                diagonal[i] += v;
            }
        }
        let diagonal_inverse = regularized_inverse(&diagonal);
        Ok(Self {
            matrix,
            diagonal: Arc::new(DiagonalMatrix::new(diagonal)),
            diagonal_inverse: Arc::new(DiagonalMatrix::new(diagonal_inverse)),
        })
    }

    /// Materializes a matrix-free operator, e.g. for use on a coarse level.
    pub fn from_matrix_free<const D: usize>(operator: &MatrixFreeOperator<T, D>) -> eyre::Result<Self> {
        Self::from_matrix(operator.compute_system_matrix())
    }

    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }
}

impl<T: Real> SystemOperator<T> for AssembledOperator<T> {
    fn m(&self) -> usize {
        self.matrix.nrows()
    }

    fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>) {
        assert_eq!(dst.len(), self.m(), "Destination dimension mismatch");
        assert_eq!(src.len(), self.m(), "Source dimension mismatch");
        // A zero beta still multiplies the old entries, so clear non-finite values first
        dst.fill(T::zero());
        spmm_csr_dense(T::zero(), &mut *dst, T::one(), Op::NoOp(&self.matrix), Op::NoOp(src));
    }

    fn matrix_diagonal(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal
    }

    fn matrix_diagonal_inverse(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal_inverse
    }
}
