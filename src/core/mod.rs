//! Core containers and the algebra contract.

pub mod distribution;
pub mod space;
pub mod traits;
pub mod vector;
pub mod writer;

pub use distribution::{Distribution, MatrixDistribution};
pub use space::Space;
pub use traits::{AlgebraOps, LinearAlgebra};
pub use vector::Vector;
pub use writer::VectorWriter;
