//! Preconditioned Conjugate Gradient per Saad §9.2 (Algorithm 9.1).
//!
//! Needs A symmetric positive definite and a symmetric preconditioner.

use crate::core::Vector;
use crate::error::KError;
use crate::solver::{breaks_down, KrylovSolver, Operator, Progress};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

pub struct CgSolver {
    pub conv: Convergence,
}

impl CgSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters } }
    }
}

impl KrylovSolver for CgSolver {
    fn name(&self) -> &'static str {
        "cg"
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

        let mut z = b.zeros_like();
        op.pc.apply(&r, &mut z)?;
        let mut p = x.zeros_like();
        la.copy(&z, &mut p)?;
        let mut q = b.zeros_like();
        let mut rz = la.dot(&r, &z)?;

        for i in 1..=self.conv.max_iters {
            la.mult(op.a, &p, &mut q)?;
            let pq = la.dot(&p, &q)?;
            if breaks_down(pq) || breaks_down(rz) {
                log::debug!("cg: breakdown at iteration {i} (p·Ap = {pq:e}, r·z = {rz:e})");
                return Ok(progress.finish(i - 1, ConvergedReason::DivergedBreakdown));
            }
            let alpha = rz / pq;
            la.axpy(alpha, &p, x)?;
            la.axpy(-alpha, &q, &mut r)?;

            if let Some(reason) = progress.record(i, la.norm2(&r)?) {
                log::debug!("cg: {reason:?} after {i} iterations");
                return Ok(progress.finish(i, reason));
            }

            op.pc.apply(&r, &mut z)?;
            let rz_new = la.dot(&r, &z)?;
            let beta = rz_new / rz;
            // p = z + beta p
            la.scal(beta, &mut p)?;
            la.axpy(1.0, &z, &mut p)?;
            rz = rz_new;
        }
        Ok(progress.finish(self.conv.max_iters, ConvergedReason::DivergedIterations))
    }
}
