use crate::block_vector::BlockVector;
use crate::Real;
use nalgebra::DVector;

/// A diagonal matrix stored as the vector of its diagonal entries.
///
/// Operators hand these out behind an [`Arc`](std::sync::Arc), since smoothers on several
/// multigrid levels may hold on to the same diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalMatrix<V> {
    diagonal: V,
}

impl<V> DiagonalMatrix<V> {
    pub fn new(diagonal: V) -> Self {
        Self { diagonal }
    }

    pub fn vector(&self) -> &V {
        &self.diagonal
    }

    pub fn into_vector(self) -> V {
        self.diagonal
    }
}

impl<T: Real> DiagonalMatrix<DVector<T>> {
    pub fn m(&self) -> usize {
        self.diagonal.len()
    }

    /// Computes `dst = D * src`.
    pub fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>) {
        assert_eq!(dst.len(), self.diagonal.len(), "Destination dimension mismatch");
        assert_eq!(src.len(), self.diagonal.len(), "Source dimension mismatch");
        dst.zip_zip_apply(&self.diagonal, src, |y, d, x| *y = d * x);
    }
}

impl<T: Real> DiagonalMatrix<BlockVector<T>> {
    pub fn m(&self) -> usize {
        self.diagonal.len()
    }

    /// Computes `dst = D * src` block by block.
    pub fn vmult(&self, dst: &mut BlockVector<T>, src: &BlockVector<T>) {
        assert_eq!(dst.n_blocks(), self.diagonal.n_blocks(), "Destination block count mismatch");
        assert_eq!(src.n_blocks(), self.diagonal.n_blocks(), "Source block count mismatch");
        for (i, d) in self.diagonal.blocks().iter().enumerate() {
            let dst_block = dst.block_mut(i);
            let src_block = src.block(i);
            assert_eq!(dst_block.len(), d.len(), "Destination block dimension mismatch");
            assert_eq!(src_block.len(), d.len(), "Source block dimension mismatch");
            dst_block.zip_zip_apply(d, src_block, |y, d, x| *y = d * x);
        }
    }
}

/// Entry-wise inverse with regularization of (near-)zero entries.
///
/// Entries with `|x| <= sqrt(eps)` are replaced by `1` rather than inverted. Such entries belong
/// to constrained or otherwise eliminated degrees of freedom, whose rows are empty.
pub fn regularized_inverse<T: Real>(diagonal: &DVector<T>) -> DVector<T> {
    let tolerance = T::default_epsilon().sqrt();
    diagonal.map(|x| if x.abs() > tolerance { T::one() / x } else { T::one() })
}
