//! Structured hexahedral meshes of hyper-rectangles.
//!
//! Cells and vertices are numbered lexicographically with the first axis running fastest.
//! The topology is always that of a tensor-product grid, but vertices may be moved freely
//! (see [`HyperRectangleMesh::distort_random`]), so cells are general multilinear images of the
//! reference cell `[-1, 1]^D`.
use crate::params::Parameters;
use eyre::bail;
use log::debug;
use nalgebra::{distance, Point, SMatrix, SVector};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct HyperRectangleMesh<const D: usize> {
    subdivisions: [usize; D],
    lower_left: Point<f64, D>,
    upper_right: Point<f64, D>,
    vertices: Vec<Point<f64, D>>,
}

impl<const D: usize> HyperRectangleMesh<D> {
    /// Number of vertices of a single cell.
    pub const VERTICES_PER_CELL: usize = 1 << D;

    /// Creates a uniform mesh of the box `[lower_left, upper_right]` with the given number of
    /// cells along each axis.
    pub fn subdivided_hyper_rectangle(
        subdivisions: [usize; D],
        lower_left: Point<f64, D>,
        upper_right: Point<f64, D>,
    ) -> eyre::Result<Self> {
        if D == 0 {
            bail!("mesh dimension must be positive");
        }
        if subdivisions.iter().any(|&n| n == 0) {
            bail!("subdivisions must be positive, got {:?}", subdivisions);
        }
        if (0..D).any(|d| upper_right[d] <= lower_left[d]) {
            bail!("degenerate hyper-rectangle [{}, {}]", lower_left, upper_right);
        }

        let mut mesh = Self {
            subdivisions,
            lower_left,
            upper_right,
            vertices: Vec::new(),
        };
        let extents = upper_right - lower_left;
        mesh.vertices = (0..mesh.num_vertices())
            .map(|vertex| {
                let multi_index = mesh.vertex_multi_index(vertex);
                lower_left
                    + SVector::<f64, D>::from_fn(|d, _| extents[d] * multi_index[d] as f64 / subdivisions[d] as f64)
            })
            .collect();
        Ok(mesh)
    }

    /// Creates the (refined and possibly distorted) mesh described by the parameters.
    pub fn from_parameters(params: &Parameters) -> eyre::Result<Self> {
        params.validate::<D>()?;
        let mut mesh = Self::subdivided_hyper_rectangle(
            params.subdivisions::<D>()?,
            params.lower_left::<D>()?,
            params.upper_right::<D>()?,
        )?;
        mesh.refine_global(params.refinement);
        if params.distort_grid != 0.0 {
            mesh.distort_random(params.distort_grid, params.seed)?;
        }
        debug!(
            "Created mesh with {} cells and {} vertices",
            mesh.num_cells(),
            mesh.num_vertices()
        );
        Ok(mesh)
    }

    pub fn subdivisions(&self) -> &[usize; D] {
        &self.subdivisions
    }

    pub fn lower_left(&self) -> &Point<f64, D> {
        &self.lower_left
    }

    pub fn upper_right(&self) -> &Point<f64, D> {
        &self.upper_right
    }

    pub fn vertices(&self) -> &[Point<f64, D>] {
        &self.vertices
    }

    pub fn num_cells(&self) -> usize {
        self.subdivisions.iter().product()
    }

    pub fn num_vertices(&self) -> usize {
        self.subdivisions.iter().map(|n| n + 1).product()
    }

    pub fn cell_multi_index(&self, cell: usize) -> [usize; D] {
        assert!(cell < self.num_cells(), "Cell index out of bounds");
        let mut remainder = cell;
        std::array::from_fn(|d| {
            let i = remainder % self.subdivisions[d];
            remainder /= self.subdivisions[d];
            i
        })
    }

    fn vertex_multi_index(&self, vertex: usize) -> [usize; D] {
        let mut remainder = vertex;
        std::array::from_fn(|d| {
            let n = self.subdivisions[d] + 1;
            let i = remainder % n;
            remainder /= n;
            i
        })
    }

    fn vertex_index(&self, multi_index: &[usize; D]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for d in 0..D {
            index += multi_index[d] * stride;
            stride *= self.subdivisions[d] + 1;
        }
        index
    }

    fn is_boundary_vertex(&self, multi_index: &[usize; D]) -> bool {
        (0..D).any(|d| multi_index[d] == 0 || multi_index[d] == self.subdivisions[d])
    }

    /// Fills `output` with the vertices of the given cell in lexicographic order.
    ///
    /// # Panics
    ///
    /// Panics if `output` does not have length [`Self::VERTICES_PER_CELL`].
    pub fn populate_cell_vertices(&self, output: &mut [Point<f64, D>], cell: usize) {
        assert_eq!(output.len(), Self::VERTICES_PER_CELL, "Output must hold all cell vertices");
        let cell_index = self.cell_multi_index(cell);
        for (local, vertex) in output.iter_mut().enumerate() {
            let multi_index = std::array::from_fn(|d| cell_index[d] + ((local >> d) & 1));
            *vertex = self.vertices[self.vertex_index(&multi_index)];
        }
    }

    /// Maps a point in the reference cell `[-1, 1]^D` to physical coordinates.
    pub fn map_reference_point(&self, cell: usize, xi: &Point<f64, D>) -> Point<f64, D> {
        let mut vertices = vec![Point::origin(); Self::VERTICES_PER_CELL];
        self.populate_cell_vertices(&mut vertices, cell);
        map_multilinear(&vertices, xi)
    }

    /// The Jacobian `dx/dxi` of the cell map at the reference point `xi`.
    pub fn reference_jacobian(&self, cell: usize, xi: &Point<f64, D>) -> SMatrix<f64, D, D> {
        let mut vertices = vec![Point::origin(); Self::VERTICES_PER_CELL];
        self.populate_cell_vertices(&mut vertices, cell);
        multilinear_jacobian(&vertices, xi)
    }

    /// Refines every cell isotropically into `2^D` children, `levels` times.
    ///
    /// New vertices are placed by the multilinear map of their parent cell, so refinement
    /// preserves the geometry of distorted meshes.
    pub fn refine_global(&mut self, levels: usize) {
        for _ in 0..levels {
            let coarse = self.clone();
            self.subdivisions = coarse.subdivisions.map(|n| 2 * n);
            self.vertices = (0..self.num_vertices())
                .map(|vertex| {
                    let fine_index = self.vertex_multi_index(vertex);
                    let mut coarse_index = [0; D];
                    let mut xi = Point::<f64, D>::origin();
                    for d in 0..D {
                        coarse_index[d] = (fine_index[d] / 2).min(coarse.subdivisions[d] - 1);
                        xi[d] = (fine_index[d] - 2 * coarse_index[d]) as f64 - 1.0;
                    }
                    let coarse_cell = coarse.cell_index(&coarse_index);
                    coarse.map_reference_point(coarse_cell, &xi)
                })
                .collect();
        }
    }

    fn cell_index(&self, multi_index: &[usize; D]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for d in 0..D {
            index += multi_index[d] * stride;
            stride *= self.subdivisions[d];
        }
        index
    }

    /// Moves every interior vertex by a random offset.
    ///
    /// Along axis `d` the offset is drawn uniformly from `[-factor * h_d, factor * h_d]`, where
    /// `h_d` is the undistorted cell extent along that axis. Boundary vertices stay in place.
    /// The random stream is fully determined by `seed`.
    pub fn distort_random(&mut self, factor: f64, seed: u64) -> eyre::Result<()> {
        if !(0.0..0.5).contains(&factor) {
            bail!("distortion factor must lie in [0, 0.5), got {}", factor);
        }
        let extents = self.upper_right - self.lower_left;
        let cell_size = SVector::<f64, D>::from_fn(|d, _| extents[d] / self.subdivisions[d] as f64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let unit = Uniform::new_inclusive(-1.0, 1.0);

        for vertex in 0..self.vertices.len() {
            let multi_index = self.vertex_multi_index(vertex);
            if !self.is_boundary_vertex(&multi_index) {
                let offset = SVector::<f64, D>::from_fn(|d, _| factor * cell_size[d] * unit.sample(&mut rng));
                self.vertices[vertex] += offset;
            }
        }
        Ok(())
    }

    /// The smallest cell diameter, where the diameter of a cell is the largest distance between
    /// two of its vertices.
    pub fn minimal_cell_diameter(&self) -> f64 {
        let mut vertices = vec![Point::origin(); Self::VERTICES_PER_CELL];
        (0..self.num_cells())
            .map(|cell| {
                self.populate_cell_vertices(&mut vertices, cell);
                let mut diameter = 0.0_f64;
                for (i, a) in vertices.iter().enumerate() {
                    for b in &vertices[i + 1..] {
                        diameter = diameter.max(distance(a, b));
                    }
                }
                diameter
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// The multilinear shape function of the given local vertex, evaluated at `xi`.
fn multilinear_basis<const D: usize>(xi: &Point<f64, D>, local_vertex: usize) -> f64 {
    (0..D)
        .map(|d| {
            let sign = if (local_vertex >> d) & 1 == 1 { 1.0 } else { -1.0 };
            0.5 * (1.0 + sign * xi[d])
        })
        .product()
}

fn map_multilinear<const D: usize>(vertices: &[Point<f64, D>], xi: &Point<f64, D>) -> Point<f64, D> {
    let mut x = SVector::<f64, D>::zeros();
    for (local, vertex) in vertices.iter().enumerate() {
        x += vertex.coords * multilinear_basis(xi, local);
    }
    Point::from(x)
}

fn multilinear_jacobian<const D: usize>(vertices: &[Point<f64, D>], xi: &Point<f64, D>) -> SMatrix<f64, D, D> {
    let mut jacobian = SMatrix::<f64, D, D>::zeros();
    for (local, vertex) in vertices.iter().enumerate() {
        for e in 0..D {
            let derivative: f64 = (0..D)
                .map(|d| {
                    let sign = if (local >> d) & 1 == 1 { 1.0 } else { -1.0 };
                    if d == e {
                        0.5 * sign
                    } else {
                        0.5 * (1.0 + sign * xi[d])
                    }
                })
                .product();
            for d in 0..D {
                jacobian[(d, e)] += vertex[d] * derivative;
            }
        }
    }
    jacobian
}
