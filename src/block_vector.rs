use crate::Real;
use nalgebra::{convert, DVector};
use serde::{Deserialize, Serialize};
use simba::scalar::SupersetOf;

/// An ordered sequence of equally laid out vectors.
///
/// Each block holds the spatial degrees of freedom associated with one time degree of freedom
/// of a space-time system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockVector<T: Real> {
    blocks: Vec<DVector<T>>,
}

impl<T: Real> Default for BlockVector<T> {
    fn default() -> Self {
        Self { blocks: Vec::new() }
    }
}

impl<T: Real> BlockVector<T> {
    /// A block vector with `num_blocks` empty blocks.
    pub fn new(num_blocks: usize) -> Self {
        Self::zeros(num_blocks, 0)
    }

    /// A block vector with `num_blocks` zero blocks of length `block_size` each.
    pub fn zeros(num_blocks: usize, block_size: usize) -> Self {
        Self {
            blocks: vec![DVector::zeros(block_size); num_blocks],
        }
    }

    pub fn from_blocks(blocks: Vec<DVector<T>>) -> Self {
        Self { blocks }
    }

    pub fn into_blocks(self) -> Vec<DVector<T>> {
        self.blocks
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Total number of entries across all blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block(&self, index: usize) -> &DVector<T> {
        &self.blocks[index]
    }

    pub fn block_mut(&mut self, index: usize) -> &mut DVector<T> {
        &mut self.blocks[index]
    }

    pub fn blocks(&self) -> &[DVector<T>] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [DVector<T>] {
        &mut self.blocks
    }

    /// Sets every entry of every block to zero, keeping the layout.
    pub fn set_zero(&mut self) {
        for block in &mut self.blocks {
            block.fill(T::zero());
        }
    }

    /// Computes `block(index) += factor * x`.
    ///
    /// # Panics
    ///
    /// Panics if the block and `x` have different lengths.
    pub fn add_scaled_block(&mut self, index: usize, factor: T, x: &DVector<T>) {
        let block = &mut self.blocks[index];
        assert_eq!(block.len(), x.len(), "Block and vector dimensions must match");
        block.axpy(factor, x, T::one());
    }

    /// The Euclidean inner product over all blocks.
    ///
    /// # Panics
    ///
    /// Panics if the block layouts differ.
    pub fn dot(&self, other: &Self) -> T {
        assert_eq!(self.n_blocks(), other.n_blocks(), "Number of blocks must match");
        self.blocks
            .iter()
            .zip(&other.blocks)
            .fold(T::zero(), |acc, (a, b)| acc + a.dot(b))
    }

    pub fn norm_squared(&self) -> T {
        self.blocks
            .iter()
            .fold(T::zero(), |acc, block| acc + block.norm_squared())
    }

    pub fn norm(&self) -> T {
        self.norm_squared().sqrt()
    }

    /// Converts every entry to another scalar type.
    ///
    /// This is the explicit conversion point between the precision an outer solver works in
    /// and the precision a preconditioner works in.
    pub fn cast<T2>(&self) -> BlockVector<T2>
    where
        T2: Real + SupersetOf<T>,
    {
        BlockVector {
            blocks: self
                .blocks
                .iter()
                .map(|block| block.map(|x| convert::<T, T2>(x)))
                .collect(),
        }
    }
}
