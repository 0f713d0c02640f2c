//! Cell batches and lane-wise arithmetic.
//!
//! Cells are processed in groups of [`BATCH_WIDTH`]. Every quantity that varies from cell to
//! cell inside a batch (quadrature data, coefficients, local degrees of freedom) is stored as
//! a [`Lanes`] value, so that the same instruction stream processes all cells of the batch.
use crate::Real;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub};

/// Number of cells processed together in a single batch.
pub const BATCH_WIDTH: usize = 4;

/// One value per cell of a batch.
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(transparent)]
pub struct Lanes<T>(pub [T; BATCH_WIDTH]);

impl<T: Copy> Lanes<T> {
    /// All lanes set to the same value.
    pub fn splat(value: T) -> Self {
        Self([value; BATCH_WIDTH])
    }

    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self(std::array::from_fn(f))
    }

    pub fn map<U: Copy>(&self, mut f: impl FnMut(T) -> U) -> Lanes<U> {
        Lanes::from_fn(|lane| f(self.0[lane]))
    }
}

impl<T: Real> Lanes<T> {
    pub fn zero() -> Self {
        Self::splat(T::zero())
    }
}

impl<T> Index<usize> for Lanes<T> {
    type Output = T;

    fn index(&self, lane: usize) -> &T {
        &self.0[lane]
    }
}

impl<T> IndexMut<usize> for Lanes<T> {
    fn index_mut(&mut self, lane: usize) -> &mut T {
        &mut self.0[lane]
    }
}

macro_rules! impl_lanewise_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T: Real> $trait for Lanes<T> {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Self::from_fn(|lane| self.0[lane] $op rhs.0[lane])
            }
        }
    };
}

impl_lanewise_binary_op!(Add, add, +);
impl_lanewise_binary_op!(Sub, sub, -);
impl_lanewise_binary_op!(Mul, mul, *);

impl<T: Real> AddAssign for Lanes<T> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl<T: Real> MulAssign for Lanes<T> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a *= b;
        }
    }
}

impl<T: Real> Neg for Lanes<T> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.map(|x| -x)
    }
}

/// A group of up to [`BATCH_WIDTH`] cells.
///
/// If fewer than [`BATCH_WIDTH`] cells are available, the remaining lanes repeat the last
/// cell. Padded lanes take part in the arithmetic but must never be written back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CellBatch {
    cells: [usize; BATCH_WIDTH],
    num_filled: usize,
}

impl CellBatch {
    /// # Panics
    ///
    /// Panics if `cells` is empty or holds more than [`BATCH_WIDTH`] cells.
    pub fn from_cells(cells: &[usize]) -> Self {
        assert!(!cells.is_empty(), "A cell batch must contain at least one cell");
        assert!(cells.len() <= BATCH_WIDTH, "Too many cells for a single batch");
        let last = cells[cells.len() - 1];
        Self {
            cells: std::array::from_fn(|lane| cells.get(lane).copied().unwrap_or(last)),
            num_filled: cells.len(),
        }
    }

    /// The cell index for every lane, including padded lanes.
    pub fn lane_cells(&self) -> &[usize; BATCH_WIDTH] {
        &self.cells
    }

    /// The cells actually contained in the batch.
    pub fn cells(&self) -> &[usize] {
        &self.cells[..self.num_filled]
    }

    pub fn num_filled_lanes(&self) -> usize {
        self.num_filled
    }
}

/// Groups the cells `0 .. num_cells` into consecutive batches.
pub fn partition_into_batches(num_cells: usize) -> Vec<CellBatch> {
    (0..num_cells)
        .collect::<Vec<_>>()
        .chunks(BATCH_WIDTH)
        .map(CellBatch::from_cells)
        .collect()
}
