use crate::batch::{partition_into_batches, CellBatch, Lanes, BATCH_WIDTH};
use crate::dof::DofHandler;
use crate::mesh::HyperRectangleMesh;
use crate::parallel::sequential_greedy_coloring;
use crate::quadrature::TensorQuadrature;
use crate::Real;
use eyre::bail;
use nalgebra::{convert, DMatrix, Point, SVector};

/// Precomputed cell data shared by every evaluation of a matrix-free operator.
///
/// Per-batch quantities are stored batch-major: the entry for quadrature point `q` of batch `b`
/// lives at `b * num_quadrature_points + q`.
#[derive(Debug, Clone)]
pub struct MatrixFreeData<T: Real, const D: usize> {
    n_dofs: usize,
    dofs_per_cell: usize,
    num_quadrature_points: usize,
    batches: Vec<CellBatch>,
    colors: Vec<Vec<usize>>,
    /// Global dofs of every lane of every batch, `(batch, lane, local dof)` row-major.
    batch_dofs: Vec<usize>,
    /// Basis values, `(q, local dof)` row-major.
    shape_values: Vec<T>,
    /// Reference basis gradients, `(q, local dof)` row-major.
    shape_gradients: Vec<[T; D]>,
    /// Inverse transposed Jacobians `J^{-T}` of the cell maps.
    inverse_jacobians_t: Vec<[[Lanes<T>; D]; D]>,
    /// Determinant of the Jacobian times the quadrature weight.
    jxw: Vec<Lanes<T>>,
    quadrature_points: Vec<[Point<f64, D>; BATCH_WIDTH]>,
}

impl<T: Real, const D: usize> MatrixFreeData<T, D> {
    pub fn new(
        mesh: &HyperRectangleMesh<D>,
        dof_handler: &DofHandler<D>,
        quadrature: &TensorQuadrature<D>,
    ) -> eyre::Result<Self> {
        if mesh.subdivisions() != &dof_handler.subdivisions() {
            bail!("dof handler was created for a different mesh");
        }
        if quadrature.is_empty() {
            bail!("quadrature rule has no points");
        }

        let element = dof_handler.element();
        let dofs_per_cell = dof_handler.dofs_per_cell();
        let num_quadrature_points = quadrature.len();

        let mut shape_values = vec![T::zero(); num_quadrature_points * dofs_per_cell];
        let mut shape_gradients = vec![[T::zero(); D]; num_quadrature_points * dofs_per_cell];
        let mut values_f64 = vec![0.0; dofs_per_cell];
        let mut gradients_f64 = vec![SVector::<f64, D>::zeros(); dofs_per_cell];
        for (q, xi) in quadrature.points().iter().enumerate() {
            element.populate_basis(&mut values_f64, xi);
            element.populate_basis_gradients(&mut gradients_f64, xi);
            let offset = q * dofs_per_cell;
            for i in 0..dofs_per_cell {
                shape_values[offset + i] = convert(values_f64[i]);
                shape_gradients[offset + i] = std::array::from_fn(|e| convert(gradients_f64[i][e]));
            }
        }

        let batches = partition_into_batches(mesh.num_cells());
        let mut batch_dofs = vec![0; batches.len() * BATCH_WIDTH * dofs_per_cell];
        for (batch, lane_dofs) in batches.iter().zip(batch_dofs.chunks_mut(BATCH_WIDTH * dofs_per_cell)) {
            for (&cell, cell_dofs) in batch.lane_cells().iter().zip(lane_dofs.chunks_mut(dofs_per_cell)) {
                dof_handler.populate_cell_dofs(cell_dofs, cell);
            }
        }

        let batch_dof_sets: Vec<_> = batches
            .iter()
            .enumerate()
            .map(|(b, batch)| {
                let offset = b * BATCH_WIDTH * dofs_per_cell;
                batch_dofs[offset..offset + batch.num_filled_lanes() * dofs_per_cell].to_vec()
            })
            .collect();
        let colors = sequential_greedy_coloring(&batch_dof_sets);

        let num_entries = batches.len() * num_quadrature_points;
        let mut inverse_jacobians_t = Vec::with_capacity(num_entries);
        let mut jxw = Vec::with_capacity(num_entries);
        let mut quadrature_points = Vec::with_capacity(num_entries);
        for batch in &batches {
            for (xi, &weight) in quadrature.points().iter().zip(quadrature.weights()) {
                let mut g = [[Lanes::zero(); D]; D];
                let mut lane_jxw = Lanes::zero();
                let mut points = [Point::origin(); BATCH_WIDTH];
                for (lane, &cell) in batch.lane_cells().iter().enumerate() {
                    // Const-generic square matrices lack `determinant`, so go through a dynamic one
                    let jacobian = DMatrix::from_column_slice(D, D, mesh.reference_jacobian(cell, xi).as_slice());
                    let det = jacobian.determinant();
                    if det <= 0.0 {
                        bail!("cell {} has a non-positive Jacobian determinant {}", cell, det);
                    }
                    let Some(inverse) = jacobian.try_inverse() else {
                        bail!("cell {} has a singular Jacobian", cell);
                    };
                    for d in 0..D {
                        for e in 0..D {
                            // (J^{-T})_{de} = (J^{-1})_{ed}
                            g[d][e][lane] = convert(inverse[(e, d)]);
                        }
                    }
                    lane_jxw[lane] = convert(det * weight);
                    points[lane] = mesh.map_reference_point(cell, xi);
                }
                inverse_jacobians_t.push(g);
                jxw.push(lane_jxw);
                quadrature_points.push(points);
            }
        }

        Ok(Self {
            n_dofs: dof_handler.n_dofs(),
            dofs_per_cell,
            num_quadrature_points,
            batches,
            colors,
            batch_dofs,
            shape_values,
            shape_gradients,
            inverse_jacobians_t,
            jxw,
            quadrature_points,
        })
    }

    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    pub fn dofs_per_cell(&self) -> usize {
        self.dofs_per_cell
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_quadrature_points
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn batch(&self, batch_index: usize) -> &CellBatch {
        &self.batches[batch_index]
    }

    /// Batch indices grouped so that the batches of one colour share no degrees of freedom.
    pub fn colors(&self) -> &[Vec<usize>] {
        &self.colors
    }

    /// Global dofs of the cell in the given lane of a batch.
    pub fn lane_dofs(&self, batch_index: usize, lane: usize) -> &[usize] {
        let offset = (batch_index * BATCH_WIDTH + lane) * self.dofs_per_cell;
        &self.batch_dofs[offset..offset + self.dofs_per_cell]
    }

    pub fn shape_values(&self, q: usize) -> &[T] {
        let offset = q * self.dofs_per_cell;
        &self.shape_values[offset..offset + self.dofs_per_cell]
    }

    pub fn shape_gradients(&self, q: usize) -> &[[T; D]] {
        let offset = q * self.dofs_per_cell;
        &self.shape_gradients[offset..offset + self.dofs_per_cell]
    }

    pub fn inverse_jacobian_t(&self, batch_index: usize, q: usize) -> &[[Lanes<T>; D]; D] {
        &self.inverse_jacobians_t[batch_index * self.num_quadrature_points + q]
    }

    pub fn jxw(&self, batch_index: usize, q: usize) -> Lanes<T> {
        self.jxw[batch_index * self.num_quadrature_points + q]
    }

    pub fn quadrature_points(&self, batch_index: usize, q: usize) -> &[Point<f64, D>; BATCH_WIDTH] {
        &self.quadrature_points[batch_index * self.num_quadrature_points + q]
    }
}
