//! Matrix-free space-time finite element operators.
//!
//! The crate evaluates the action of combined mass/stiffness bilinear forms cell by cell,
//! without assembling a global matrix, and couples several such scalar operators into
//! space-time block operators through small dense time-coupling matrices.
//!
//! The main entry points are [`MatrixFreeOperator`](matrix_free::MatrixFreeOperator) and
//! [`BlockSystemOperator`](block_operator::BlockSystemOperator).
use nalgebra::RealField;

pub mod batch;
pub mod block_operator;
pub mod block_vector;
pub mod coefficient;
pub mod diagonal;
pub mod dof;
pub mod element;
pub mod matrix_free;
pub mod mesh;
pub mod operator;
pub mod params;
pub mod quadrature;
pub mod tensor_product;

pub(crate) mod parallel;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Scalar types the operators can be instantiated with.
///
/// Used as a trait alias: in practice `f32` and `f64`.
pub trait Real: RealField + Copy + Send + Sync {}

impl<T> Real for T where T: RealField + Copy + Send + Sync {}
