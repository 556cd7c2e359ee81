//! Restarted GMRES with right preconditioning (Saad §9.3.2, Algorithm 9.5).
//!
//! The Arnoldi basis is built for A M⁻¹ with modified Gram-Schmidt; the
//! preconditioned directions `Z_j = M⁻¹ V_j` are kept so the update is
//! `x += Z y`. The small Hessenberg least-squares problem is reduced with
//! Givens rotations in a dense `faer::Mat`, which makes `|g[j+1]|` the
//! unpreconditioned residual norm at every step.

use faer::Mat;

use crate::core::Vector;
use crate::error::KError;
use crate::solver::{KrylovSolver, Operator, Progress};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

/// GMRES solver struct with restart length.
pub struct GmresSolver {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence,
}

impl GmresSolver {
    pub fn new(restart: usize, tol: f64, max_iters: usize) -> Self {
        Self { restart: restart.max(1), conv: Convergence { tol, max_iters } }
    }
}

fn givens(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        return (1.0, 0.0);
    }
    let r = a.hypot(b);
    (a / r, b / r)
}

/// Solves the leading `k×k` upper-triangular block of `h` against `g`.
/// `None` if a pivot is zero.
fn back_substitution(h: &Mat<f64>, g: &[f64], k: usize) -> Option<Vec<f64>> {
    let mut y = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = g[i];
        for l in (i + 1)..k {
            sum -= h[(i, l)] * y[l];
        }
        let pivot = h[(i, i)];
        if pivot == 0.0 {
            return None;
        }
        y[i] = sum / pivot;
    }
    Some(y)
}

impl KrylovSolver for GmresSolver {
    fn name(&self) -> &'static str {
        "gmres"
    }

    fn solve(
        &mut self,
        op: &Operator<'_>,
        b: &Vector,
        x: &mut Vector,
        monitor: &mut dyn FnMut(usize, f64),
    ) -> Result<SolveStats, KError> {
        let la = op.la;
        let m = self.restart;
        let mut progress = Progress::new(self.conv, la.norm2(b)?, monitor);

        let mut r = b.zeros_like();
        op.residual(b, x, &mut r)?;
        let mut beta = la.norm2(&r)?;
        if let Some(reason) = progress.start(beta) {
            return Ok(progress.finish(0, reason));
        }

        let mut it = 0;
        loop {
            log::trace!("gmres: cycle start at iteration {it}, |r| = {beta:e}");
            let mut v0 = b.zeros_like();
            la.copy(&r, &mut v0)?;
            la.scal(1.0 / beta, &mut v0)?;
            let mut basis = vec![v0];
            let mut dirs: Vec<Vector> = Vec::with_capacity(m);
            let mut h = Mat::<f64>::zeros(m + 1, m);
            let (mut cs, mut sn) = (vec![0.0; m], vec![0.0; m]);
            let mut g = vec![0.0; m + 1];
            g[0] = beta;

            let mut k = 0;
            let mut stop = None;
            let mut happy = false;
            while k < m {
                let j = k;
                it += 1;
                let mut z = x.zeros_like();
                op.pc.apply(&basis[j], &mut z)?;
                let mut w = b.zeros_like();
                la.mult(op.a, &z, &mut w)?;
                dirs.push(z);

                for (l, vl) in basis.iter().enumerate() {
                    let hl = la.dot(&w, vl)?;
                    h[(l, j)] = hl;
                    la.axpy(-hl, vl, &mut w)?;
                }
                let h_next = la.norm2(&w)?;
                h[(j + 1, j)] = h_next;

                for l in 0..j {
                    let temp = cs[l] * h[(l, j)] + sn[l] * h[(l + 1, j)];
                    h[(l + 1, j)] = -sn[l] * h[(l, j)] + cs[l] * h[(l + 1, j)];
                    h[(l, j)] = temp;
                }
                let (c, s) = givens(h[(j, j)], h[(j + 1, j)]);
                cs[j] = c;
                sn[j] = s;
                h[(j, j)] = c * h[(j, j)] + s * h[(j + 1, j)];
                h[(j + 1, j)] = 0.0;
                g[j + 1] = -s * g[j];
                g[j] *= c;
                k += 1;

                stop = progress.record(it, g[j + 1].abs());
                if stop.is_some() {
                    break;
                }
                if h_next == 0.0 {
                    happy = true;
                    break;
                }
                la.scal(1.0 / h_next, &mut w)?;
                basis.push(w);
            }

            let Some(y) = back_substitution(&h, &g, k) else {
                log::debug!("gmres: singular Hessenberg at iteration {it}");
                return Ok(progress.finish(it, ConvergedReason::DivergedBreakdown));
            };
            for (yi, zi) in y.iter().zip(&dirs) {
                la.axpy(*yi, zi, x)?;
            }

            if let Some(reason) = stop {
                log::debug!("gmres: {reason:?} after {it} iterations");
                return Ok(progress.finish(it, reason));
            }
            if happy {
                log::debug!("gmres: happy breakdown at iteration {it}");
            }
            op.residual(b, x, &mut r)?;
            beta = la.norm2(&r)?;
            if beta == 0.0 {
                return Ok(progress.finish(it, ConvergedReason::ConvergedRtol));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::config::PcKind;
    use crate::solver::test_support::{run, tridiagonal};

    #[test]
    fn gmres_solves_nonsymmetric() {
        for kind in BackendKind::ALL {
            for pc in PcKind::ALL {
                let sys = tridiagonal(kind, 30, 0.5);
                let (stats, true_rel) = run(&mut GmresSolver::new(30, 1e-10, 200), &sys, pc);
                assert!(stats.converged, "{kind}/{pc}: {stats:?}");
                assert!(true_rel < 1e-9, "{kind}/{pc}: true residual {true_rel:e}");
            }
        }
    }

    #[test]
    fn gmres_converges_across_restarts() {
        let sys = tridiagonal(BackendKind::ParCsr, 40, 0.5);
        let (stats, true_rel) = run(&mut GmresSolver::new(4, 1e-10, 400), &sys, PcKind::Jacobi);
        assert!(stats.converged, "{stats:?}");
        assert!(stats.iterations > 4);
        assert!(true_rel < 1e-9);
    }

    #[test]
    fn back_substitution_flags_zero_pivot() {
        let mut h = Mat::<f64>::zeros(3, 2);
        h[(0, 0)] = 2.0;
        h[(0, 1)] = 1.0;
        h[(1, 1)] = 4.0;
        assert_eq!(back_substitution(&h, &[4.0, 8.0, 0.0], 2), Some(vec![1.0, 2.0]));
        h[(1, 1)] = 0.0;
        assert_eq!(back_substitution(&h, &[4.0, 8.0, 0.0], 2), None);
    }
}
