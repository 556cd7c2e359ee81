//! Preconditioners for the Krylov solvers.
//!
//! A preconditioner approximates A⁻¹ and is applied rank-locally: neither
//! `setup` nor `apply` communicates, so both work with any backend.

use crate::config::PcKind;
use crate::core::Vector;
use crate::error::KError;
use crate::matrix::Matrix;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner: Send {
    /// Prepare from the assembled operator.
    fn setup(&mut self, _a: &Matrix) -> Result<(), KError> {
        Ok(())
    }
    /// z = M⁻¹ r
    fn apply(&self, r: &Vector, z: &mut Vector) -> Result<(), KError>;
}

pub mod identity;
pub mod jacobi;

pub use identity::Identity;
pub use jacobi::Jacobi;

/// Preconditioner for `kind`, not yet set up.
pub fn from_kind(kind: PcKind) -> Box<dyn Preconditioner> {
    match kind {
        PcKind::Jacobi => Box::new(Jacobi::new()),
        PcKind::NoPc => Box::new(Identity),
    }
}
