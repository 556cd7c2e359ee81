//! Krylov solvers written against the algebra contract.
//!
//! Every solver here touches vectors only through `mult`, `mult_transpose`,
//! `dot`, `norm2`, `axpy`, `scal` and `copy`, so it runs unchanged on any
//! backend that provides those. Preconditioning is rank-local.
//!
//! A solver starts from the `x` it is given and reports the residual estimate
//! its recurrence tracks; [`KspContext`](crate::context::KspContext) owns the
//! initial guess, the zero right-hand side and the final true residual.

use crate::core::{LinearAlgebra, Vector};
use crate::error::KError;
use crate::matrix::Matrix;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

/// Operator, preconditioner and the backend algebra that applies them.
pub struct Operator<'a> {
    pub la: &'a dyn LinearAlgebra,
    pub a: &'a Matrix,
    pub pc: &'a dyn Preconditioner,
}

impl Operator<'_> {
    /// r = b − A x
    pub fn residual(&self, b: &Vector, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        self.la.mult(self.a, x, r)?;
        self.la.scal(-1.0, r)?;
        self.la.axpy(1.0, b, r)
    }
}

/// Common interface for the iterative solvers.
pub trait KrylovSolver {
    fn name(&self) -> &'static str;

    /// Iterate on `A x = b` from the current `x`, calling `monitor(iteration, relative residual)`
    /// after every iteration.
    fn solve(
        &mut self,
        op: &Operator<'_>,
        b: &Vector,
        x: &mut Vector,
        monitor: &mut dyn FnMut(usize, f64),
    ) -> Result<SolveStats, KError>;
}

/// Per-solve bookkeeping: relative residual history, monitor calls, stop test.
pub(crate) struct Progress<'m> {
    conv: Convergence,
    bnorm: f64,
    last: f64,
    history: Vec<f64>,
    monitor: &'m mut dyn FnMut(usize, f64),
}

impl<'m> Progress<'m> {
    pub(crate) fn new(conv: Convergence, bnorm: f64, monitor: &'m mut dyn FnMut(usize, f64)) -> Self {
        Self { conv, bnorm, last: f64::INFINITY, history: Vec::new(), monitor }
    }

    /// Checks the starting residual; `Some` when no iteration is needed.
    pub(crate) fn start(&mut self, rnorm: f64) -> Option<ConvergedReason> {
        if self.bnorm == 0.0 {
            return Some(ConvergedReason::ConvergedZeroRhs);
        }
        self.last = rnorm / self.bnorm;
        self.conv.satisfied(self.last).then_some(ConvergedReason::ConvergedRtol)
    }

    pub(crate) fn satisfied(&self, rnorm: f64) -> bool {
        self.conv.satisfied(rnorm / self.bnorm)
    }

    /// Records iteration `i`; `Some` when the solver must stop.
    pub(crate) fn record(&mut self, i: usize, rnorm: f64) -> Option<ConvergedReason> {
        let rel = rnorm / self.bnorm;
        self.last = rel;
        self.history.push(rel);
        (self.monitor)(i, rel);
        let (stop, reason) = self.conv.check(rel, i);
        stop.then_some(reason)
    }

    pub(crate) fn finish(self, iterations: usize, reason: ConvergedReason) -> SolveStats {
        let residual = if reason == ConvergedReason::ConvergedZeroRhs { 0.0 } else { self.last };
        SolveStats::new(iterations, residual, reason, self.history)
    }
}

/// A recurrence denominator that cannot be divided by.
pub(crate) fn breaks_down(d: f64) -> bool {
    d == 0.0 || !d.is_finite()
}

pub mod bicg;
pub mod bicgstab;
pub mod cg;
pub mod gmres;

pub use bicg::BiCgSolver;
pub use bicgstab::BiCgStabSolver;
pub use cg::CgSolver;
pub use gmres::GmresSolver;
