//! Execution entry point for Krylov subspace solves (KSP).
//!
//! A `KspContext` is built from a [`Backend`] handle and a [`SolverOptions`]
//! record. `solve` runs the configured method and preconditioner on `A x = b`
//! until the true relative residual ‖b − A x‖/‖b‖ is at most the tolerance or
//! the iteration cap is spent.
//!
//! Running out of iterations is not an error: `solve` returns
//! `Ok(SolveStats { converged: false, .. })` with the last residual, and
//! [`SolveStats::into_result`] turns that into [`KError::NotConverged`] for
//! callers that prefer `?`. Errors are reserved for unsupported operations,
//! shape or backend mismatches, bad options and runtime faults.
//!
//! # Usage
//!
//! 1. `Backend::init(kind, &comm)` once per process.
//! 2. `KspContext::new(&backend, options)?`.
//! 3. `ctx.solve(&a, &b, &mut x)?`.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc KSP manual pages: https://petsc.org/release/manualpages/KSP/

use crate::backend::Backend;
use crate::config::{SolverKind, SolverOptions};
use crate::core::{AlgebraOps, LinearAlgebra, Vector};
use crate::error::KError;
use crate::matrix::Matrix;
use crate::preconditioner;
use crate::solver::{BiCgSolver, BiCgStabSolver, CgSolver, GmresSolver, KrylovSolver, Operator};
use crate::utils::convergence::{ConvergedReason, SolveStats};

type Monitor = Box<dyn FnMut(usize, f64) + Send>;

const BASE_OPS: [(AlgebraOps, &str); 6] = [
    (AlgebraOps::MULT, "mult"),
    (AlgebraOps::DOT, "dot"),
    (AlgebraOps::NORM2, "norm2"),
    (AlgebraOps::AXPY, "axpy"),
    (AlgebraOps::SCAL, "scal"),
    (AlgebraOps::COPY, "copy"),
];

fn krylov(options: &SolverOptions, max_iters: usize) -> Box<dyn KrylovSolver> {
    let tol = options.tolerance;
    match options.solver {
        SolverKind::Cg => Box::new(CgSolver::new(tol, max_iters)),
        SolverKind::Gmres => Box::new(GmresSolver::new(options.restart, tol, max_iters)),
        SolverKind::BiCg => Box::new(BiCgSolver::new(tol, max_iters)),
        SolverKind::BiCgStab => Box::new(BiCgStabSolver::new(tol, max_iters)),
    }
}

/// Solver configuration bound to one backend.
pub struct KspContext {
    backend: Backend,
    options: SolverOptions,
    la: Box<dyn LinearAlgebra>,
    monitor: Option<Monitor>,
}

impl KspContext {
    /// Validates `options` and binds them to `backend`.
    pub fn new(backend: &Backend, options: SolverOptions) -> Result<Self, KError> {
        options.validate()?;
        let la = backend.algebra();
        let ctx = Self { backend: *backend, options, la, monitor: None };
        ctx.check_capabilities()?;
        log::debug!(
            "ksp: {}/{} on {} (max {} iterations, rtol {:e})",
            ctx.options.solver,
            ctx.options.preconditioner,
            backend.kind(),
            ctx.options.max_iterations,
            ctx.options.tolerance
        );
        Ok(ctx)
    }

    /// Calls `f(iteration, relative residual)` after every iteration.
    pub fn with_monitor(mut self, f: impl FnMut(usize, f64) + Send + 'static) -> Self {
        self.monitor = Some(Box::new(f));
        self
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The algebra the solves run on.
    pub fn algebra(&self) -> &dyn LinearAlgebra {
        self.la.as_ref()
    }

    fn check_capabilities(&self) -> Result<(), KError> {
        let caps = self.la.capabilities();
        let transpose = (self.options.solver == SolverKind::BiCg).then_some((AlgebraOps::MULT_TRANSPOSE, "mult_transpose"));
        for (op, name) in BASE_OPS.into_iter().chain(transpose) {
            if !caps.contains(op) {
                return Err(self.la.unsupported(name));
            }
        }
        Ok(())
    }

    /// Solve `A x = b`.
    ///
    /// `b` lives on the row side of `A` and `x` on its column side. `x` is zeroed
    /// first unless `nonzero_initial_guess` is set. Collective over the
    /// communicator of `A`'s distribution.
    pub fn solve(&mut self, a: &Matrix, b: &Vector, x: &mut Vector) -> Result<SolveStats, KError> {
        let kind = self.backend.kind();
        for found in [a.backend(), b.backend(), x.backend()] {
            if found != kind {
                return Err(KError::BackendMismatch { expected: kind, found });
            }
        }
        if a.row_space().size() != a.col_space().size() {
            return Err(KError::shape(
                "solve",
                format!("operator is {}x{}, not square", a.row_space().size(), a.col_space().size()),
            ));
        }
        a.ensure_mult_shapes(x, b, false, "solve")?;

        let la = self.la.as_ref();
        let tol = self.options.tolerance;
        let bnorm = la.norm2(b)?;
        if bnorm == 0.0 {
            x.values_mut().fill(0.0);
            log::info!("ksp: zero right-hand side, x = 0");
            return Ok(SolveStats::new(0, 0.0, ConvergedReason::ConvergedZeroRhs, Vec::new()));
        }
        if !self.options.nonzero_initial_guess {
            x.values_mut().fill(0.0);
        }

        let mut pc = preconditioner::from_kind(self.options.preconditioner);
        pc.setup(a)?;
        let op = Operator { la, a, pc: pc.as_ref() };

        let max_iters = self.options.max_iterations;
        let mut iterations = 0;
        let mut history = Vec::new();
        let mut r = b.zeros_like();
        let (reason, rel) = loop {
            let offset = iterations;
            let monitor = &mut self.monitor;
            let mut forward = |i: usize, rel: f64| {
                if let Some(m) = monitor.as_mut() {
                    m(offset + i, rel);
                }
            };
            let mut solver = krylov(&self.options, max_iters - iterations);
            let stats = solver.solve(&op, b, x, &mut forward)?;
            iterations += stats.iterations;
            history.extend(stats.history);

            op.residual(b, x, &mut r)?;
            let rel = la.norm2(&r)? / bnorm;
            if rel <= tol {
                break (ConvergedReason::ConvergedRtol, rel);
            }
            // the recurrence residual drifted from the true one; restart from x
            if stats.converged && stats.iterations > 0 && iterations < max_iters {
                log::debug!("ksp: {} reported {:e} but true residual is {rel:e}, restarting", solver.name(), stats.residual);
                continue;
            }
            let reason = match stats.reason {
                ConvergedReason::DivergedBreakdown => ConvergedReason::DivergedBreakdown,
                _ => ConvergedReason::DivergedIterations,
            };
            break (reason, rel);
        };

        let stats = SolveStats::new(iterations, rel, reason, history);
        if stats.converged {
            log::info!("ksp: {reason:?} in {iterations} iterations, relative residual {rel:e}");
        } else {
            log::warn!("ksp: {reason:?} after {iterations} iterations, relative residual {rel:e}");
        }
        Ok(stats)
    }
}
