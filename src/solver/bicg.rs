//! Preconditioned BiConjugate Gradient (Saad §7.3, Algorithm 7.3).
//!
//! Runs the shadow recurrence with Aᵀ, so the backend must provide
//! `mult_transpose`. The preconditioners offered here are diagonal, hence
//! M⁻ᵀ = M⁻¹ and the same `apply` serves both sequences.

use crate::core::Vector;
use crate::error::KError;
use crate::solver::{breaks_down, KrylovSolver, Operator, Progress};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

pub struct BiCgSolver {
    pub conv: Convergence,
}

impl BiCgSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters } }
    }
}

impl KrylovSolver for BiCgSolver {
    fn name(&self) -> &'static str {
        "bicg"
    }

    fn solve(
        &mut self,
        op: &Operator<'_>,
        b: &Vector,
        x: &mut Vector,
        monitor: &mut dyn FnMut(usize, f64),
    ) -> Result<SolveStats, KError> {
        let la = op.la;
        let mut progress = Progress::new(self.conv, la.norm2(b)?, monitor);

        let mut r = b.zeros_like();
        op.residual(b, x, &mut r)?;
        if let Some(reason) = progress.start(la.norm2(&r)?) {
            return Ok(progress.finish(0, reason));
        }
        let mut rt = b.zeros_like();
        la.copy(&r, &mut rt)?;

        let mut z = b.zeros_like();
        let mut zt = b.zeros_like();
        op.pc.apply(&r, &mut z)?;
        op.pc.apply(&rt, &mut zt)?;

        // p feeds A (column side), pt feeds Aᵀ (row side)
        let mut p = x.zeros_like();
        let mut pt = b.zeros_like();
        la.copy(&z, &mut p)?;
        la.copy(&zt, &mut pt)?;
        let mut q = b.zeros_like();
        let mut qt = x.zeros_like();
        let mut rho = la.dot(&z, &rt)?;

        for i in 1..=self.conv.max_iters {
            if breaks_down(rho) {
                log::debug!("bicg: rho vanished at iteration {i}");
                return Ok(progress.finish(i - 1, ConvergedReason::DivergedBreakdown));
            }
            la.mult(op.a, &p, &mut q)?;
            la.mult_transpose(op.a, &pt, &mut qt)?;
            let ptq = la.dot(&pt, &q)?;
            if breaks_down(ptq) {
                log::debug!("bicg: pt·Ap vanished at iteration {i}");
                return Ok(progress.finish(i - 1, ConvergedReason::DivergedBreakdown));
            }
            let alpha = rho / ptq;
            la.axpy(alpha, &p, x)?;
            la.axpy(-alpha, &q, &mut r)?;
            la.axpy(-alpha, &qt, &mut rt)?;

            if let Some(reason) = progress.record(i, la.norm2(&r)?) {
                log::debug!("bicg: {reason:?} after {i} iterations");
                return Ok(progress.finish(i, reason));
            }

            op.pc.apply(&r, &mut z)?;
            op.pc.apply(&rt, &mut zt)?;
            let rho_new = la.dot(&z, &rt)?;
            let beta = rho_new / rho;
            la.scal(beta, &mut p)?;
            la.axpy(1.0, &z, &mut p)?;
            la.scal(beta, &mut pt)?;
            la.axpy(1.0, &zt, &mut pt)?;
            rho = rho_new;
        }
        Ok(progress.finish(self.conv.max_iters, ConvergedReason::DivergedIterations))
    }
}
