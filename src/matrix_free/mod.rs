//! Matrix-free evaluation of `mass_scaling * M + laplace_scaling * L`.
//!
//! `M` is the mass bilinear form `(u, v)` and `L` the Laplace form `(grad u, grad v)`. Instead
//! of storing a global matrix, the operator keeps geometry and basis tabulations per cell batch
//! and evaluates the weak form on every batch whenever its action is requested.
use crate::batch::Lanes;
use crate::coefficient::CoefficientFunction;
use crate::diagonal::{regularized_inverse, DiagonalMatrix};
use crate::dof::{Constraints, DofHandler};
use crate::mesh::HyperRectangleMesh;
use crate::operator::SystemOperator;
use crate::parallel::DisjointSliceAccess;
use crate::quadrature::TensorQuadrature;
use crate::Real;
use eyre::bail;
use log::debug;
use nalgebra::{convert, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Instant;
use thread_local::ThreadLocal;

mod data;
mod evaluator;

pub use data::MatrixFreeData;
pub use evaluator::CellEvaluator;

/// Coefficient values at every quadrature point of every cell batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable<T: Real> {
    num_quadrature_points: usize,
    values: Vec<Lanes<T>>,
}

impl<T: Real> CoefficientTable<T> {
    /// Evaluates `field` at the physical location of every quadrature point.
    pub fn evaluate<F, const D: usize>(data: &MatrixFreeData<T, D>, field: &F) -> Self
    where
        F: ?Sized + CoefficientFunction<D>,
    {
        let nq = data.num_quadrature_points();
        let values = (0..data.num_batches())
            .into_par_iter()
            .map(|batch_index| {
                (0..nq)
                    .map(|q| {
                        field
                            .value_lanes(data.quadrature_points(batch_index, q))
                            .map(|value| convert::<f64, T>(value))
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .concat();
        Self {
            num_quadrature_points: nq,
            values,
        }
    }

    pub fn get(&self, batch_index: usize, q: usize) -> Lanes<T> {
        self.values[batch_index * self.num_quadrature_points + q]
    }

    /// All values, batch-major.
    pub fn values(&self) -> &[Lanes<T>] {
        &self.values
    }
}

/// Whether the operator uses its uniform scalings or per-point coefficients.
///
/// Once a coefficient has been evaluated, it replaces the corresponding scaling entirely.
/// A table is only present if the corresponding scaling is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub enum CoefficientState<T: Real> {
    Uniform,
    Evaluated {
        mass: Option<CoefficientTable<T>>,
        laplace: Option<CoefficientTable<T>>,
    },
}

/// The quantities a cell evaluation needs at the quadrature points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvaluationMode {
    MassAndLaplace,
    Mass,
    Laplace,
    /// Both scalings vanish: the operator is zero.
    Zero,
}

impl EvaluationMode {
    pub fn from_scalings<T: Real>(mass_scaling: T, laplace_scaling: T) -> Self {
        match (mass_scaling != T::zero(), laplace_scaling != T::zero()) {
            (true, true) => Self::MassAndLaplace,
            (true, false) => Self::Mass,
            (false, true) => Self::Laplace,
            (false, false) => Self::Zero,
        }
    }

    pub fn needs_values(&self) -> bool {
        matches!(self, Self::MassAndLaplace | Self::Mass)
    }

    pub fn needs_gradients(&self) -> bool {
        matches!(self, Self::MassAndLaplace | Self::Laplace)
    }
}

/// The operator `mass_scaling * M + laplace_scaling * L` on a [`HyperRectangleMesh`].
///
/// Constrained degrees of freedom are eliminated: their entries in the source are read as zero,
/// and the corresponding entries of every result are zero.
///
/// The diagonal and its regularized inverse are computed at construction and recomputed by
/// [`evaluate_coefficient`](Self::evaluate_coefficient), so they always describe the operator
/// [`vmult`](Self::vmult) applies.
#[derive(Debug)]
pub struct MatrixFreeOperator<T: Real, const D: usize> {
    data: MatrixFreeData<T, D>,
    constraints: Constraints,
    mass_scaling: T,
    laplace_scaling: T,
    coefficient: CoefficientState<T>,
    diagonal: Arc<DiagonalMatrix<DVector<T>>>,
    diagonal_inverse: Arc<DiagonalMatrix<DVector<T>>>,
    workspace: ThreadLocal<RefCell<CellEvaluator<T, D>>>,
}

impl<T: Real, const D: usize> MatrixFreeOperator<T, D> {
    pub fn new(
        mesh: &HyperRectangleMesh<D>,
        dof_handler: &DofHandler<D>,
        constraints: &Constraints,
        quadrature: &TensorQuadrature<D>,
        mass_scaling: T,
        laplace_scaling: T,
    ) -> eyre::Result<Self> {
        if constraints.n_dofs() != dof_handler.n_dofs() {
            bail!(
                "constraints cover {} dofs, but the dof handler has {}",
                constraints.n_dofs(),
                dof_handler.n_dofs()
            );
        }
        let data = MatrixFreeData::new(mesh, dof_handler, quadrature)?;
        let empty_diagonal = Arc::new(DiagonalMatrix::new(DVector::zeros(0)));
        let mut operator = Self {
            data,
            constraints: constraints.clone(),
            mass_scaling,
            laplace_scaling,
            coefficient: CoefficientState::Uniform,
            diagonal: Arc::clone(&empty_diagonal),
            diagonal_inverse: empty_diagonal,
            workspace: ThreadLocal::new(),
        };
        operator.update_diagonals();

        debug!(
            "Created matrix-free operator with {} dofs, {} cells in {} batches and {} colors",
            operator.m(),
            mesh.num_cells(),
            operator.data.num_batches(),
            operator.data.colors().len()
        );
        Ok(operator)
    }

    pub fn m(&self) -> usize {
        self.data.n_dofs()
    }

    pub fn data(&self) -> &MatrixFreeData<T, D> {
        &self.data
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn mass_scaling(&self) -> T {
        self.mass_scaling
    }

    pub fn laplace_scaling(&self) -> T {
        self.laplace_scaling
    }

    pub fn coefficient_state(&self) -> &CoefficientState<T> {
        &self.coefficient
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        EvaluationMode::from_scalings(self.mass_scaling, self.laplace_scaling)
    }

    pub fn initialize_dof_vector(&self) -> DVector<T> {
        DVector::zeros(self.m())
    }

    pub fn diagonal(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal
    }

    pub fn diagonal_inverse(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal_inverse
    }

    /// Replaces the uniform scalings by `field`, evaluated at every quadrature point.
    ///
    /// Only the terms with a non-zero scaling receive a coefficient; a vanishing term stays
    /// switched off. Calling this again re-evaluates the tables with the new field.
    pub fn evaluate_coefficient<F>(&mut self, field: &F)
    where
        F: ?Sized + CoefficientFunction<D>,
    {
        let mode = self.evaluation_mode();
        let table = (mode != EvaluationMode::Zero).then(|| CoefficientTable::evaluate(&self.data, field));
        let mass = table.clone().filter(|_| mode.needs_values());
        let laplace = table.filter(|_| mode.needs_gradients());
        self.coefficient = CoefficientState::Evaluated { mass, laplace };
        self.update_diagonals();
        debug!("Evaluated coefficient on {} batches", self.data.num_batches());
    }

    fn mass_coefficient(&self, batch_index: usize, q: usize) -> Lanes<T> {
        match &self.coefficient {
            CoefficientState::Evaluated { mass: Some(table), .. } => table.get(batch_index, q),
            _ => Lanes::splat(self.mass_scaling),
        }
    }

    fn laplace_coefficient(&self, batch_index: usize, q: usize) -> Lanes<T> {
        match &self.coefficient {
            CoefficientState::Evaluated { laplace: Some(table), .. } => table.get(batch_index, q),
            _ => Lanes::splat(self.laplace_scaling),
        }
    }

    fn with_evaluator<R>(&self, f: impl FnOnce(&mut CellEvaluator<T, D>) -> R) -> R {
        let evaluator = self
            .workspace
            .get_or(|| RefCell::new(CellEvaluator::new(&self.data)));
        f(&mut evaluator.borrow_mut())
    }

    /// Applies the cell operator of every lane to the evaluator's local dof values.
    fn apply_cell(&self, evaluator: &mut CellEvaluator<T, D>, batch_index: usize) {
        let mode = self.evaluation_mode();
        let (values, gradients) = (mode.needs_values(), mode.needs_gradients());
        evaluator.evaluate(&self.data, batch_index, values, gradients);
        for q in 0..self.data.num_quadrature_points() {
            if values {
                evaluator.submit_value(&self.data, batch_index, q, self.mass_coefficient(batch_index, q));
            }
            if gradients {
                evaluator.submit_gradient(&self.data, batch_index, q, self.laplace_coefficient(batch_index, q));
            }
        }
        evaluator.integrate(&self.data, values, gradients);
    }

    /// Computes `dst = A * src`.
    ///
    /// # Panics
    ///
    /// Panics if either vector does not have length [`m`](Self::m).
    pub fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>) {
        assert_eq!(dst.len(), self.m(), "Destination dimension mismatch");
        assert_eq!(src.len(), self.m(), "Source dimension mismatch");
        dst.fill(T::zero());
        if self.evaluation_mode() == EvaluationMode::Zero {
            return;
        }

        let dst = DisjointSliceAccess::new(dst.as_mut_slice());
        for color in self.data.colors() {
            color.par_iter().for_each(|&batch_index| {
                self.with_evaluator(|evaluator| {
                    evaluator.read_dof_values(&self.data, batch_index, src, &self.constraints);
                    self.apply_cell(evaluator, batch_index);
                    // Batches of one color share no dofs
                    unsafe { evaluator.distribute_local_to_global(&self.data, batch_index, &dst, &self.constraints) };
                })
            });
        }
    }

    /// Computes the diagonal of the operator by applying every cell operator to the local unit
    /// vectors.
    pub fn compute_diagonal(&self) -> DVector<T> {
        let mut diagonal = DVector::zeros(self.m());
        if self.evaluation_mode() == EvaluationMode::Zero {
            return diagonal;
        }

        let dofs_per_cell = self.data.dofs_per_cell();
        let access = DisjointSliceAccess::new(diagonal.as_mut_slice());
        for color in self.data.colors() {
            color.par_iter().for_each(|&batch_index| {
                self.with_evaluator(|evaluator| {
                    for j in 0..dofs_per_cell {
                        evaluator.set_unit_dof_values(j);
                        self.apply_cell(evaluator, batch_index);
                        evaluator.store_probe(j);
                    }
                    // Batches of one color share no dofs
                    unsafe { evaluator.distribute_probe(&self.data, batch_index, &access, &self.constraints) };
                })
            });
        }
        diagonal
    }

    fn update_diagonals(&mut self) {
        let diagonal = self.compute_diagonal();
        self.diagonal_inverse = Arc::new(DiagonalMatrix::new(regularized_inverse(&diagonal)));
        self.diagonal = Arc::new(DiagonalMatrix::new(diagonal));
    }

    /// Assembles the operator into a sparse matrix.
    ///
    /// Rows and columns of constrained dofs are empty apart from a unit diagonal entry, so the
    /// matrix agrees with [`vmult`](Self::vmult) on every vector that vanishes on the
    /// constrained dofs.
    pub fn compute_system_matrix(&self) -> CsrMatrix<T> {
        let timer = Instant::now();
        let dofs_per_cell = self.data.dofs_per_cell();
        let triplets = (0..self.data.num_batches())
            .into_par_iter()
            .map(|batch_index| {
                self.with_evaluator(|evaluator| {
                    let mut triplets = Vec::new();
                    let num_filled = self.data.batch(batch_index).num_filled_lanes();
                    for j in 0..dofs_per_cell {
                        evaluator.set_unit_dof_values(j);
                        self.apply_cell(evaluator, batch_index);
                        for lane in 0..num_filled {
                            let dofs = self.data.lane_dofs(batch_index, lane);
                            let col = dofs[j];
                            if self.constraints.is_constrained(col) {
                                continue;
                            }
                            for (value, &row) in evaluator.dof_values().iter().zip(dofs) {
                                if !self.constraints.is_constrained(row) {
                                    triplets.push((row, col, value[lane]));
                                }
                            }
                        }
                    }
                    triplets
                })
            })
            .collect::<Vec<_>>();

        let mut coo = CooMatrix::new(self.m(), self.m());
        for (row, col, value) in triplets.into_iter().flatten() {
            coo.push(row, col, value);
        }
        for dof in self.constraints.constrained_dofs() {
            coo.push(dof, dof, T::one());
        }
        let matrix = CsrMatrix::from(&coo);
        debug!(
            "Assembled {}x{} system matrix with {} non-zeros in {:?}",
            matrix.nrows(),
            matrix.ncols(),
            matrix.nnz(),
            timer.elapsed()
        );
        matrix
    }
}

impl<T: Real, const D: usize> SystemOperator<T> for MatrixFreeOperator<T, D> {
    fn m(&self) -> usize {
        MatrixFreeOperator::m(self)
    }

    fn vmult(&self, dst: &mut DVector<T>, src: &DVector<T>) {
        MatrixFreeOperator::vmult(self, dst, src)
    }

    fn initialize_dof_vector(&self) -> DVector<T> {
        MatrixFreeOperator::initialize_dof_vector(self)
    }

    fn matrix_diagonal(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal
    }

    fn matrix_diagonal_inverse(&self) -> &Arc<DiagonalMatrix<DVector<T>>> {
        &self.diagonal_inverse
    }
}
