use crate::batch::{Lanes, BATCH_WIDTH};
use crate::dof::Constraints;
use crate::matrix_free::data::MatrixFreeData;
use crate::parallel::DisjointSliceAccess;
use crate::Real;
use itertools::izip;
use nalgebra::DVector;

/// Evaluates a finite element field on all cells of a batch at once.
///
/// The evaluator owns the buffers for a single batch: local degree-of-freedom values, and the
/// values and gradients at the quadrature points. A typical cell operation reads the local
/// dofs, evaluates, submits scaled values and gradients per quadrature point, integrates and
/// distributes the result.
#[derive(Debug, Clone)]
pub struct CellEvaluator<T: Real, const D: usize> {
    dof_values: Vec<Lanes<T>>,
    values: Vec<Lanes<T>>,
    gradients: Vec<[Lanes<T>; D]>,
    /// Local diagonal entries collected while probing the cell operator.
    probe: Vec<Lanes<T>>,
}

impl<T: Real, const D: usize> CellEvaluator<T, D> {
    pub fn new(data: &MatrixFreeData<T, D>) -> Self {
        let n = data.dofs_per_cell();
        let nq = data.num_quadrature_points();
        Self {
            dof_values: vec![Lanes::zero(); n],
            values: vec![Lanes::zero(); nq],
            gradients: vec![[Lanes::zero(); D]; nq],
            probe: vec![Lanes::zero(); n],
        }
    }

    pub fn dof_values(&self) -> &[Lanes<T>] {
        &self.dof_values
    }

    /// Gathers the local dofs of every lane from `src`. Constrained dofs read as zero.
    pub fn read_dof_values(
        &mut self,
        data: &MatrixFreeData<T, D>,
        batch_index: usize,
        src: &DVector<T>,
        constraints: &Constraints,
    ) {
        for lane in 0..BATCH_WIDTH {
            for (value, &dof) in self.dof_values.iter_mut().zip(data.lane_dofs(batch_index, lane)) {
                value[lane] = if constraints.is_constrained(dof) {
                    T::zero()
                } else {
                    src[dof]
                };
            }
        }
    }

    /// Sets the local dofs to the `j`-th unit vector in every lane.
    pub fn set_unit_dof_values(&mut self, j: usize) {
        for (i, value) in self.dof_values.iter_mut().enumerate() {
            *value = Lanes::splat(if i == j { T::one() } else { T::zero() });
        }
    }

    /// Evaluates values and/or physical gradients at all quadrature points.
    pub fn evaluate(&mut self, data: &MatrixFreeData<T, D>, batch_index: usize, values: bool, gradients: bool) {
        for q in 0..data.num_quadrature_points() {
            if values {
                let mut u = Lanes::zero();
                for (&n, &dof_value) in data.shape_values(q).iter().zip(&self.dof_values) {
                    u += Lanes::splat(n) * dof_value;
                }
                self.values[q] = u;
            }

            if gradients {
                let mut reference_gradient = [Lanes::zero(); D];
                for (dn, &dof_value) in data.shape_gradients(q).iter().zip(&self.dof_values) {
                    for e in 0..D {
                        reference_gradient[e] += Lanes::splat(dn[e]) * dof_value;
                    }
                }
                let g = data.inverse_jacobian_t(batch_index, q);
                self.gradients[q] = std::array::from_fn(|d| {
                    let mut component = Lanes::zero();
                    for e in 0..D {
                        component += g[d][e] * reference_gradient[e];
                    }
                    component
                });
            }
        }
    }

    /// Replaces the value at `q` by the integrand `coefficient * u * JxW`.
    pub fn submit_value(&mut self, data: &MatrixFreeData<T, D>, batch_index: usize, q: usize, coefficient: Lanes<T>) {
        self.values[q] = self.values[q] * coefficient * data.jxw(batch_index, q);
    }

    /// Replaces the gradient at `q` by the integrand `coefficient * grad u * JxW`, pulled back
    /// to reference coordinates so that [`integrate`](Self::integrate) can test it against
    /// reference gradients.
    pub fn submit_gradient(
        &mut self,
        data: &MatrixFreeData<T, D>,
        batch_index: usize,
        q: usize,
        coefficient: Lanes<T>,
    ) {
        let g = data.inverse_jacobian_t(batch_index, q);
        let scale = coefficient * data.jxw(batch_index, q);
        let flux = self.gradients[q].map(|component| component * scale);
        self.gradients[q] = std::array::from_fn(|e| {
            let mut reference_flux = Lanes::zero();
            for d in 0..D {
                reference_flux += g[d][e] * flux[d];
            }
            reference_flux
        });
    }

    /// Tests the submitted integrands against every basis function, overwriting the local dofs.
    pub fn integrate(&mut self, data: &MatrixFreeData<T, D>, values: bool, gradients: bool) {
        self.dof_values.fill(Lanes::zero());
        for q in 0..data.num_quadrature_points() {
            let value = self.values[q];
            let flux = self.gradients[q];
            for (out, &n, dn) in izip!(&mut self.dof_values, data.shape_values(q), data.shape_gradients(q)) {
                if values {
                    *out += Lanes::splat(n) * value;
                }
                if gradients {
                    for e in 0..D {
                        *out += Lanes::splat(dn[e]) * flux[e];
                    }
                }
            }
        }
    }

    /// Adds the local dofs of the filled lanes to `dst`, skipping constrained dofs.
    ///
    /// # Safety
    ///
    /// No other thread may concurrently access any of the batch's dofs in `dst`.
    pub unsafe fn distribute_local_to_global(
        &self,
        data: &MatrixFreeData<T, D>,
        batch_index: usize,
        dst: &DisjointSliceAccess<T>,
        constraints: &Constraints,
    ) {
        distribute(&self.dof_values, data, batch_index, dst, constraints)
    }

    /// Keeps entry `j` of the local result as the `j`-th local diagonal entry.
    pub fn store_probe(&mut self, j: usize) {
        self.probe[j] = self.dof_values[j];
    }

    /// Adds the probed diagonal entries of the filled lanes to `dst`, skipping constrained dofs.
    ///
    /// # Safety
    ///
    /// Same as [`distribute_local_to_global`](Self::distribute_local_to_global).
    pub unsafe fn distribute_probe(
        &self,
        data: &MatrixFreeData<T, D>,
        batch_index: usize,
        dst: &DisjointSliceAccess<T>,
        constraints: &Constraints,
    ) {
        distribute(&self.probe, data, batch_index, dst, constraints)
    }
}

unsafe fn distribute<T: Real, const D: usize>(
    local: &[Lanes<T>],
    data: &MatrixFreeData<T, D>,
    batch_index: usize,
    dst: &DisjointSliceAccess<T>,
    constraints: &Constraints,
) {
    let num_filled = data.batch(batch_index).num_filled_lanes();
    for lane in 0..num_filled {
        for (value, &dof) in local.iter().zip(data.lane_dofs(batch_index, lane)) {
            if !constraints.is_constrained(dof) {
                dst.add(dof, value[lane]);
            }
        }
    }
}
