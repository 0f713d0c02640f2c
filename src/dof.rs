//! Degree-of-freedom numbering and homogeneous constraints.
use crate::element::TensorProductElement;
use crate::mesh::HyperRectangleMesh;
use crate::Real;
use nalgebra::{DVector, Point};

/// Numbering of the `Q_k` degrees of freedom on a [`HyperRectangleMesh`].
///
/// All degrees of freedom of the mesh lie on a global lattice with `n_d k + 1` points along
/// axis `d`, where `n_d` is the number of cells along that axis. Degrees of freedom on faces
/// shared by several cells are numbered once.
#[derive(Debug, Clone, PartialEq)]
pub struct DofHandler<const D: usize> {
    element: TensorProductElement<D>,
    subdivisions: [usize; D],
    dofs_per_axis: [usize; D],
}

impl<const D: usize> DofHandler<D> {
    pub fn new(mesh: &HyperRectangleMesh<D>, degree: usize) -> eyre::Result<Self> {
        let element = TensorProductElement::new(degree)?;
        let subdivisions = *mesh.subdivisions();
        Ok(Self {
            element,
            subdivisions,
            dofs_per_axis: subdivisions.map(|n| n * degree + 1),
        })
    }

    pub fn element(&self) -> &TensorProductElement<D> {
        &self.element
    }

    /// Number of cells along each axis of the underlying mesh.
    pub fn subdivisions(&self) -> [usize; D] {
        self.subdivisions
    }

    pub fn degree(&self) -> usize {
        self.element.degree()
    }

    pub fn n_dofs(&self) -> usize {
        self.dofs_per_axis.iter().product()
    }

    pub fn num_cells(&self) -> usize {
        self.subdivisions.iter().product()
    }

    pub fn dofs_per_cell(&self) -> usize {
        self.element.num_nodes()
    }

    fn dof_multi_index(&self, dof: usize) -> [usize; D] {
        let mut remainder = dof;
        std::array::from_fn(|d| {
            let i = remainder % self.dofs_per_axis[d];
            remainder /= self.dofs_per_axis[d];
            i
        })
    }

    /// Stores the global indices of the degrees of freedom of `cell` in local node order.
    pub fn populate_cell_dofs(&self, output: &mut [usize], cell: usize) {
        assert_eq!(output.len(), self.dofs_per_cell(), "Output must hold all cell dofs");
        assert!(cell < self.num_cells(), "Cell index out of bounds");

        let k = self.degree();
        let mut remainder = cell;
        let cell_index: [usize; D] = std::array::from_fn(|d| {
            let i = remainder % self.subdivisions[d];
            remainder /= self.subdivisions[d];
            i
        });

        for (node, dof) in output.iter_mut().enumerate() {
            let local = self.element.node_multi_index(node);
            let mut index = 0;
            let mut stride = 1;
            for d in 0..D {
                index += (cell_index[d] * k + local[d]) * stride;
                stride *= self.dofs_per_axis[d];
            }
            *dof = index;
        }
    }

    /// The global indices of the degrees of freedom on the boundary of the domain, sorted.
    pub fn boundary_dofs(&self) -> Vec<usize> {
        (0..self.n_dofs())
            .filter(|&dof| {
                let index = self.dof_multi_index(dof);
                (0..D).any(|d| index[d] == 0 || index[d] + 1 == self.dofs_per_axis[d])
            })
            .collect()
    }

    /// The physical location of every degree of freedom.
    pub fn support_points(&self, mesh: &HyperRectangleMesh<D>) -> Vec<Point<f64, D>> {
        assert_eq!(mesh.subdivisions(), &self.subdivisions, "Mesh does not match dof handler");
        let mut points = vec![Point::origin(); self.n_dofs()];
        let mut cell_dofs = vec![0; self.dofs_per_cell()];
        for cell in 0..self.num_cells() {
            self.populate_cell_dofs(&mut cell_dofs, cell);
            for (node, &dof) in cell_dofs.iter().enumerate() {
                let xi = self.element.reference_support_point(node);
                points[dof] = mesh.map_reference_point(cell, &xi);
            }
        }
        points
    }
}

/// A set of homogeneously constrained degrees of freedom.
///
/// Constrained degrees of freedom are eliminated from every operator: their values are read as
/// zero and contributions to them are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    constrained: Vec<bool>,
}

impl Constraints {
    /// No constrained degrees of freedom.
    pub fn none(n_dofs: usize) -> Self {
        Self {
            constrained: vec![false; n_dofs],
        }
    }

    /// # Panics
    ///
    /// Panics if a constrained index is out of bounds.
    pub fn from_constrained_dofs(n_dofs: usize, dofs: &[usize]) -> Self {
        let mut constraints = Self::none(n_dofs);
        for &dof in dofs {
            assert!(dof < n_dofs, "Constrained dof index out of bounds");
            constraints.constrained[dof] = true;
        }
        constraints
    }

    /// Homogeneous Dirichlet constraints on the whole boundary.
    pub fn zero_boundary<const D: usize>(dof_handler: &DofHandler<D>) -> Self {
        Self::from_constrained_dofs(dof_handler.n_dofs(), &dof_handler.boundary_dofs())
    }

    pub fn n_dofs(&self) -> usize {
        self.constrained.len()
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constrained[dof]
    }

    pub fn num_constrained(&self) -> usize {
        self.constrained.iter().filter(|&&c| c).count()
    }

    pub fn constrained_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.constrained
            .iter()
            .enumerate()
            .filter_map(|(dof, &c)| c.then_some(dof))
    }

    /// Sets the constrained entries of `vector` to zero.
    pub fn set_zero<T: Real>(&self, vector: &mut DVector<T>) {
        assert_eq!(vector.len(), self.n_dofs(), "Vector dimension mismatch");
        for dof in self.constrained_dofs() {
            vector[dof] = T::zero();
        }
    }
}
