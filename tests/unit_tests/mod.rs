mod block_vector;
mod coefficient;
mod dof;
