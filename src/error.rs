use thiserror::Error;

use crate::backend::BackendKind;

// Unified error type for sparsebridge

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error("unsupported operation: {op} is not implemented by the {backend} backend")]
    Unsupported { backend: BackendKind, op: &'static str },
    #[error("shape mismatch in {op}: {detail}")]
    ShapeMismatch { op: &'static str, detail: String },
    #[error("index {index} out of range for local size {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("object built for the {found} backend passed to the {expected} backend")]
    BackendMismatch { expected: BackendKind, found: BackendKind },
    #[error("zero entry at global index {0} cannot be inverted")]
    ZeroEntry(usize),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("did not converge after {iterations} iterations (relative residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("runtime fault: {0}")]
    Runtime(String),
}

impl KError {
    pub(crate) fn shape(op: &'static str, detail: impl Into<String>) -> Self {
        KError::ShapeMismatch { op, detail: detail.into() }
    }

    /// Whether the caller can reasonably retry (other options, other backend,
    /// accept a partial result). Runtime faults are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, KError::Runtime(_))
    }
}
