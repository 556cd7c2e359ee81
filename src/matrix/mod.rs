//! Matrix module: distributed matrix, its assembly, and the local storage layouts.

pub mod dense;
pub mod dist;
pub use dist::{Matrix, MatrixBuilder};
pub mod parcsr;
pub use parcsr::ParCsrMatrix;
pub mod sparse;
pub use sparse::CsrMatrix;
