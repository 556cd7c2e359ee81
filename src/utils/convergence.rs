//! Convergence tracking & tolerance checks for iterative solvers.

use crate::error::KError;

/// Why an iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergedReason {
    /// Relative residual fell below the tolerance.
    ConvergedRtol,
    /// `b = 0`; the solution is `x = 0`.
    ConvergedZeroRhs,
    /// Iteration cap reached first.
    DivergedIterations,
    /// A recurrence coefficient vanished (e.g. `ρ = 0` in BiCG).
    DivergedBreakdown,
}

impl ConvergedReason {
    pub fn is_converged(self) -> bool {
        matches!(self, ConvergedReason::ConvergedRtol | ConvergedReason::ConvergedZeroRhs)
    }
}

/// Stopping criteria.
#[derive(Debug, Clone, Copy)]
pub struct Convergence {
    pub tol: f64,
    pub max_iters: usize,
}

impl Convergence {
    /// Whether `rel` (a relative residual) meets the tolerance.
    pub fn satisfied(&self, rel: f64) -> bool {
        rel <= self.tol
    }

    /// Returns (should_stop, reason) for relative residual `rel` after iteration `i`.
    pub fn check(&self, rel: f64, i: usize) -> (bool, ConvergedReason) {
        if self.satisfied(rel) {
            (true, ConvergedReason::ConvergedRtol)
        } else if i >= self.max_iters {
            (true, ConvergedReason::DivergedIterations)
        } else {
            (false, ConvergedReason::DivergedIterations)
        }
    }
}

/// Outcome of a solve. Non-convergence is an outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    /// True relative residual ‖b − A x‖ / ‖b‖ of the returned `x`.
    pub residual: f64,
    pub converged: bool,
    pub reason: ConvergedReason,
    /// Relative residual estimate after each iteration.
    pub history: Vec<f64>,
}

impl SolveStats {
    pub(crate) fn new(iterations: usize, residual: f64, reason: ConvergedReason, history: Vec<f64>) -> Self {
        Self { iterations, residual, converged: reason.is_converged(), reason, history }
    }

    /// `Err(KError::NotConverged)` unless the solve converged.
    pub fn into_result(self) -> Result<SolveStats, KError> {
        if self.converged {
            Ok(self)
        } else {
            Err(KError::NotConverged { iterations: self.iterations, residual: self.residual })
        }
    }
}
