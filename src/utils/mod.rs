pub mod convergence;
pub use convergence::{ConvergedReason, Convergence, SolveStats};
