//! Tensor-product Lagrange elements on the reference cell `[-1, 1]^D`.
use eyre::eyre;
use nalgebra::{Point, SVector};
use stfem_quadrature::univariate::gauss_lobatto;

/// One-dimensional Lagrange polynomials of degree `k` on `[-1, 1]`.
///
/// The `k + 1` support points are the Gauss-Lobatto points, in ascending order, so that the
/// first and last polynomials are the ones associated with the end points of the interval.
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeBasis1d {
    support_points: Vec<f64>,
}

impl LagrangeBasis1d {
    pub fn new(degree: usize) -> eyre::Result<Self> {
        if degree == 0 {
            return Err(eyre!("Lagrange basis degree must be at least 1"));
        }
        let (_, points) = gauss_lobatto(degree + 1)?;
        Ok(Self {
            support_points: points.into_iter().map(|[x]| x).collect(),
        })
    }

    pub fn degree(&self) -> usize {
        self.support_points.len() - 1
    }

    pub fn num_functions(&self) -> usize {
        self.support_points.len()
    }

    pub fn support_points(&self) -> &[f64] {
        &self.support_points
    }

    /// Value of basis function `i` at `x`.
    pub fn value(&self, i: usize, x: f64) -> f64 {
        let x_i = self.support_points[i];
        self.support_points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &x_j)| (x - x_j) / (x_i - x_j))
            .product()
    }

    /// Derivative of basis function `i` at `x`.
    pub fn derivative(&self, i: usize, x: f64) -> f64 {
        let x_i = self.support_points[i];
        let mut sum = 0.0;
        for (k, &x_k) in self.support_points.iter().enumerate() {
            if k == i {
                continue;
            }
            let product: f64 = self
                .support_points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i && j != k)
                .map(|(_, &x_j)| (x - x_j) / (x_i - x_j))
                .product();
            sum += product / (x_i - x_k);
        }
        sum
    }
}

/// The `Q_k` element: tensor products of [`LagrangeBasis1d`] in `D` dimensions.
///
/// Local basis functions are numbered lexicographically with the first axis running fastest,
/// i.e. the function with one-dimensional indices `(i_0, ..., i_{D-1})` has local index
/// `sum_d i_d (k + 1)^d`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorProductElement<const D: usize> {
    basis: LagrangeBasis1d,
}

impl<const D: usize> TensorProductElement<D> {
    pub fn new(degree: usize) -> eyre::Result<Self> {
        Ok(Self {
            basis: LagrangeBasis1d::new(degree)?,
        })
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn basis_1d(&self) -> &LagrangeBasis1d {
        &self.basis
    }

    pub fn num_nodes(&self) -> usize {
        self.basis.num_functions().pow(D as u32)
    }

    /// The one-dimensional indices of the local basis function `node`.
    pub fn node_multi_index(&self, node: usize) -> [usize; D] {
        let n = self.basis.num_functions();
        let mut remainder = node;
        std::array::from_fn(|_| {
            let i = remainder % n;
            remainder /= n;
            i
        })
    }

    /// The support point of the local basis function `node` in reference coordinates.
    pub fn reference_support_point(&self, node: usize) -> Point<f64, D> {
        let multi_index = self.node_multi_index(node);
        Point::from(SVector::<f64, D>::from_fn(|d, _| {
            self.basis.support_points()[multi_index[d]]
        }))
    }

    /// Evaluates every basis function at `xi`, storing the values in `output`.
    pub fn populate_basis(&self, output: &mut [f64], xi: &Point<f64, D>) {
        assert_eq!(output.len(), self.num_nodes(), "Output must hold one value per node");
        for (node, value) in output.iter_mut().enumerate() {
            let multi_index = self.node_multi_index(node);
            *value = (0..D)
                .map(|d| self.basis.value(multi_index[d], xi[d]))
                .product();
        }
    }

    /// Evaluates the reference gradient of every basis function at `xi`.
    pub fn populate_basis_gradients(&self, output: &mut [SVector<f64, D>], xi: &Point<f64, D>) {
        assert_eq!(output.len(), self.num_nodes(), "Output must hold one gradient per node");
        for (node, gradient) in output.iter_mut().enumerate() {
            let multi_index = self.node_multi_index(node);
            *gradient = SVector::from_fn(|e, _| {
                (0..D)
                    .map(|d| {
                        if d == e {
                            self.basis.derivative(multi_index[d], xi[d])
                        } else {
                            self.basis.value(multi_index[d], xi[d])
                        }
                    })
                    .product()
            });
        }
    }
}
