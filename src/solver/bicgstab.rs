//! Right-preconditioned BiCGSTAB (van der Vorst 1992; Saad §7.4.2).
//!
//! Solves A M⁻¹ u = b with x = M⁻¹ u, so the tracked residual is the
//! unpreconditioned b − A x. Each iteration costs two products with A and
//! tests convergence twice: on the half-step residual `s` and on `r`.

use crate::core::Vector;
use crate::error::KError;
use crate::solver::{breaks_down, KrylovSolver, Operator, Progress};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

pub struct BiCgStabSolver {
    pub conv: Convergence,
}

impl BiCgStabSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters } }
    }
}

impl KrylovSolver for BiCgStabSolver {
    fn name(&self) -> &'static str {
        "bicgstab"
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
        let mut r_hat = b.zeros_like();
        la.copy(&r, &mut r_hat)?;

        let mut p = b.zeros_like();
        let mut v = b.zeros_like();
        let mut s = b.zeros_like();
        let mut t = b.zeros_like();
        let mut p_hat = x.zeros_like();
        let mut s_hat = x.zeros_like();
        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);

        for i in 1..=self.conv.max_iters {
            let rho_new = la.dot(&r_hat, &r)?;
            if breaks_down(rho_new) {
                log::debug!("bicgstab: rho vanished at iteration {i}");
                return Ok(progress.finish(i - 1, ConvergedReason::DivergedBreakdown));
            }
            if i == 1 {
                la.copy(&r, &mut p)?;
            } else {
                // p = r + beta (p − omega v)
                let beta = (rho_new / rho) * (alpha / omega);
                la.axpy(-omega, &v, &mut p)?;
                la.scal(beta, &mut p)?;
                la.axpy(1.0, &r, &mut p)?;
            }
            op.pc.apply(&p, &mut p_hat)?;
            la.mult(op.a, &p_hat, &mut v)?;
            let rv = la.dot(&r_hat, &v)?;
            if breaks_down(rv) {
                log::debug!("bicgstab: r̂·v vanished at iteration {i}");
                return Ok(progress.finish(i - 1, ConvergedReason::DivergedBreakdown));
            }
            alpha = rho_new / rv;

            la.copy(&r, &mut s)?;
            la.axpy(-alpha, &v, &mut s)?;
            let s_norm = la.norm2(&s)?;
            if progress.satisfied(s_norm) {
                la.axpy(alpha, &p_hat, x)?;
                la.copy(&s, &mut r)?;
                let reason = progress.record(i, s_norm).unwrap_or(ConvergedReason::ConvergedRtol);
                log::debug!("bicgstab: converged on half step of iteration {i}");
                return Ok(progress.finish(i, reason));
            }

            op.pc.apply(&s, &mut s_hat)?;
            la.mult(op.a, &s_hat, &mut t)?;
            let tt = la.dot(&t, &t)?;
            if breaks_down(tt) {
                la.axpy(alpha, &p_hat, x)?;
                log::debug!("bicgstab: t vanished at iteration {i}");
                return Ok(progress.finish(i, ConvergedReason::DivergedBreakdown));
            }
            omega = la.dot(&t, &s)? / tt;

            la.axpy(alpha, &p_hat, x)?;
            la.axpy(omega, &s_hat, x)?;
            la.copy(&s, &mut r)?;
            la.axpy(-omega, &t, &mut r)?;

            if let Some(reason) = progress.record(i, la.norm2(&r)?) {
                log::debug!("bicgstab: {reason:?} after {i} iterations");
                return Ok(progress.finish(i, reason));
            }
            if omega == 0.0 {
                log::debug!("bicgstab: omega vanished at iteration {i}");
                return Ok(progress.finish(i, ConvergedReason::DivergedBreakdown));
            }
            rho = rho_new;
        }
        Ok(progress.finish(self.conv.max_iters, ConvergedReason::DivergedIterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::config::PcKind;
    use crate::solver::test_support::{run, tridiagonal};

    #[test]
    fn bicgstab_solves_nonsymmetric() {
        for kind in BackendKind::ALL {
            for pc in PcKind::ALL {
                let sys = tridiagonal(kind, 24, 0.5);
                let (stats, true_rel) = run(&mut BiCgStabSolver::new(1e-10, 200), &sys, pc);
                assert!(stats.converged, "{kind}/{pc}: {stats:?}");
                assert!(true_rel < 1e-9, "{kind}/{pc}: true residual {true_rel:e}");
            }
        }
    }

    #[test]
    fn bicgstab_records_one_residual_per_iteration() {
        let sys = tridiagonal(BackendKind::Native, 24, 0.5);
        let (stats, _) = run(&mut BiCgStabSolver::new(1e-10, 200), &sys, PcKind::Jacobi);
        assert_eq!(stats.history.len(), stats.iterations);
        assert_eq!(stats.history.last().copied(), Some(stats.residual));
    }
}
