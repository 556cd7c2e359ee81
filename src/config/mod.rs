//! Construction-time configuration.

pub mod options;
pub use options::{PcKind, SolverKind, SolverOptions};
