pub mod grid;
pub mod linalg;

pub use grid::log_space;
pub use linalg::{DenseMatrix, LuDecomposition, LuError, lu_factorize, lu_invert, lu_solve};
