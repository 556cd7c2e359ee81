//! sparsebridge: one algebra contract over interchangeable distributed sparse backends
//!
//! This crate lets numerical code build distributed vectors and matrices, run the
//! vector/matrix primitives on them and solve `A x = b` with Krylov methods,
//! without knowing which backend engine holds the data. Backends are picked at
//! runtime by a [`BackendKind`] tag; the [`Backend`] handle returned by
//! [`Backend::init`] is required to construct anything tied to a backend.
//!
//! ```
//! use std::sync::Arc;
//! use sparsebridge::*;
//!
//! let comm = UniverseComm::serial();
//! let backend = Backend::init(BackendKind::Native, &comm);
//! let dist = MatrixDistribution::square(4, Arc::clone(&comm));
//! let mut builder = MatrixBuilder::square(dist).unwrap();
//! for i in 0..4 {
//!     builder.add(i, i, 2.0).unwrap();
//! }
//! let a = builder.build(&backend).unwrap();
//!
//! let mut w = VectorWriter::new(
//!     Vector::new(&backend, Arc::clone(a.row_space()), Arc::clone(a.distribution().row())).unwrap(),
//! );
//! w.fill(2.0);
//! let b = w.release();
//! let mut x = b.zeros_like();
//!
//! let mut ksp = KspContext::new(&backend, SolverOptions::new(SolverKind::Cg, PcKind::Jacobi)).unwrap();
//! let stats = ksp.solve(&a, &b, &mut x).unwrap();
//! assert!(stats.converged);
//! ```

pub mod parallel;

pub mod backend;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod io;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use backend::{Backend, BackendKind, RuntimeConfig, RuntimeState};
pub use crate::config::*;
pub use crate::context::*;
pub use crate::core::*;
pub use crate::error::*;
pub use matrix::{Matrix, MatrixBuilder};
pub use parallel::{Comm, UniverseComm};
pub use utils::convergence::{ConvergedReason, SolveStats};
