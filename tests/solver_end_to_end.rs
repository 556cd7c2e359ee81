//! End-to-end solves through `KspContext` on every backend, checked against
//! the true residual and against a dense direct solve.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use rand::Rng;
use sparsebridge::io::vector_from_values;
use sparsebridge::*;

struct System {
    backend: Backend,
    a: Matrix,
    b: Vector,
}

impl System {
    fn from_dense(kind: BackendKind, dense: &Mat<f64>) -> Self {
        let backend = Backend::init(kind, &UniverseComm::Serial);
        let n = dense.nrows();
        let a = Matrix::from_dense(&backend, dense, MatrixDistribution::square(n, UniverseComm::serial())).unwrap();
        let xe = vector_from_values(&backend, Arc::clone(a.col_space()), Arc::clone(a.distribution().col()), &vec![1.0; n])
            .unwrap();
        let mut b = Vector::new(&backend, Arc::clone(a.row_space()), Arc::clone(a.distribution().row())).unwrap();
        backend.algebra().mult(&a, &xe, &mut b).unwrap();
        Self { backend, a, b }
    }

    fn with_rhs(kind: BackendKind, dense: &Mat<f64>, rhs: &[f64]) -> Self {
        let mut sys = Self::from_dense(kind, dense);
        sys.b = vector_from_values(&sys.backend, Arc::clone(sys.a.row_space()), Arc::clone(sys.a.distribution().row()), rhs)
            .unwrap();
        sys
    }

    fn x(&self) -> Vector {
        Vector::new(&self.backend, Arc::clone(self.a.col_space()), Arc::clone(self.a.distribution().col())).unwrap()
    }

    fn solve(&self, options: SolverOptions) -> (SolveStats, Vector) {
        let mut x = self.x();
        let stats = KspContext::new(&self.backend, options).unwrap().solve(&self.a, &self.b, &mut x).unwrap();
        (stats, x)
    }

    /// ‖A x − b‖ / ‖b‖, computed the way an application would.
    fn relative_residual(&self, x: &Vector) -> f64 {
        let la = self.backend.algebra();
        let mut r = self.b.zeros_like();
        la.mult(&self.a, x, &mut r).unwrap();
        la.axpy(-1.0, &self.b, &mut r).unwrap();
        la.norm2(&r).unwrap() / la.norm2(&self.b).unwrap()
    }
}

/// 4x4 identity with a small symmetric off-diagonal perturbation.
fn perturbed_identity() -> Mat<f64> {
    Mat::from_fn(4, 4, |i, j| {
        if i == j {
            1.0
        } else if i.abs_diff(j) == 1 {
            0.1
        } else {
            0.0
        }
    })
}

fn laplacian_1d(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { 2.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 })
}

/// A = Mᵀ M + I, symmetric positive definite.
fn random_spd(n: usize) -> Mat<f64> {
    let mut rng = rand::thread_rng();
    let data: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let m = Mat::from_fn(n, n, |i, j| data[j * n + i]);
    let m_t = m.transpose();
    &m_t * &m + Mat::<f64>::identity(n, n)
}

/// Random sparse-ish, diagonally dominant, non-symmetric.
fn random_nonsymmetric(n: usize) -> Mat<f64> {
    let mut rng = rand::thread_rng();
    let mut a = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        a[(i, i)] = 4.0 + rng.gen_range(0.0..2.0);
        for _ in 0..3 {
            let j = rng.gen_range(0..n);
            if j != i {
                a[(i, j)] += rng.gen_range(-1.0..1.0);
            }
        }
    }
    a
}

/// Dense QR solve; panics unless the result actually satisfies `a x = b`.
fn direct_solve(a: &Mat<f64>, b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = b.to_vec();
    let qr = faer::linalg::solvers::Qr::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x, n, 1);
    qr.solve_in_place_with_conj(faer::Conj::No, x_mat);

    let residual = (0..n)
        .map(|i| {
            let ax: f64 = (0..n).map(|j| a[(i, j)] * x[j]).sum();
            (ax - b[i]).powi(2)
        })
        .sum::<f64>()
        .sqrt();
    let bnorm = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!(residual <= 1e-12 * bnorm, "direct solve residual {residual:e}");
    x
}

#[test]
fn cg_jacobi_solves_perturbed_identity() {
    for kind in BackendKind::ALL {
        let sys = System::from_dense(kind, &perturbed_identity());
        let options = SolverOptions::new(SolverKind::Cg, PcKind::Jacobi).with_tolerance(1e-9).with_max_iterations(500);
        let (stats, x) = sys.solve(options);
        assert!(stats.converged, "{kind}: {stats:?}");
        assert_eq!(stats.reason, ConvergedReason::ConvergedRtol);
        assert!(sys.relative_residual(&x) < 1e-9);
        for v in x.values() {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 1e-8);
        }
    }
}

#[test]
fn single_iteration_reports_non_convergence() {
    for kind in BackendKind::ALL {
        let sys = System::from_dense(kind, &laplacian_1d(100));
        let options = SolverOptions::new(SolverKind::Cg, PcKind::Jacobi).with_max_iterations(1);
        let (stats, x) = sys.solve(options);
        assert!(!stats.converged);
        assert_eq!(stats.reason, ConvergedReason::DivergedIterations);
        assert_eq!(stats.iterations, 1);
        assert_abs_diff_eq!(stats.residual, sys.relative_residual(&x), epsilon = 1e-12);
        match stats.into_result() {
            Err(KError::NotConverged { iterations, residual }) => {
                assert_eq!(iterations, 1);
                assert!(residual > 1e-9);
            }
            other => panic!("expected NotConverged, got {other:?}"),
        }
    }
}

#[test]
fn every_method_and_preconditioner_matches_direct_solve() {
    let n = 24;
    let spd = random_spd(n);
    let nonsym = random_nonsymmetric(n);
    let mut rng = rand::thread_rng();
    let rhs: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();

    for kind in BackendKind::ALL {
        for solver in SolverKind::ALL {
            for pc in PcKind::ALL {
                let dense = if solver == SolverKind::Cg { &spd } else { &nonsym };
                let sys = System::with_rhs(kind, dense, &rhs);
                let options = SolverOptions::new(solver, pc).with_tolerance(1e-10).with_max_iterations(2000);
                let (stats, x) = sys.solve(options);
                assert!(stats.converged, "{kind} {solver}/{pc}: {stats:?}");
                assert!(stats.residual <= 1e-10, "{kind} {solver}/{pc}: {}", stats.residual);

                let expected = direct_solve(dense, &rhs);
                for (xi, ei) in x.values().iter().zip(&expected) {
                    assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-6);
                }
            }
        }
    }
}

#[test]
fn direct_reference_is_finite_on_nonsymmetric_systems() {
    for _ in 0..5 {
        let a = random_nonsymmetric(24);
        let x = direct_solve(&a, &[1.0; 24]);
        assert!(x.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn zero_rhs_gives_zero_solution() {
    for kind in BackendKind::ALL {
        let sys = System::with_rhs(kind, &laplacian_1d(6), &[0.0; 6]);
        let mut x = sys.x();
        let mut w = VectorWriter::new(x);
        w.fill(7.0);
        x = w.release();
        let options = SolverOptions::new(SolverKind::Gmres, PcKind::NoPc).with_nonzero_initial_guess(true);
        let stats = KspContext::new(&sys.backend, options).unwrap().solve(&sys.a, &sys.b, &mut x).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.reason, ConvergedReason::ConvergedZeroRhs);
        assert_eq!(stats.iterations, 0);
        assert!(x.values().iter().all(|&v| v == 0.0));
    }
}

#[test]
fn solve_checks_shapes_and_backends() {
    let sys = System::from_dense(BackendKind::Native, &laplacian_1d(5));
    let mut ctx = KspContext::new(&sys.backend, SolverOptions::default()).unwrap();

    let short = Vector::new(
        &sys.backend,
        Arc::new(Space::new(4)),
        Arc::new(Distribution::uniform(4, UniverseComm::serial())),
    )
    .unwrap();
    let mut x = sys.x();
    assert!(matches!(ctx.solve(&sys.a, &short, &mut x), Err(KError::ShapeMismatch { .. })));

    let other = Backend::init(BackendKind::ParCsr, &UniverseComm::Serial);
    let mut foreign_x = Vector::new(&other, Arc::clone(sys.a.col_space()), Arc::clone(sys.a.distribution().col())).unwrap();
    assert_eq!(
        ctx.solve(&sys.a, &sys.b, &mut foreign_x).unwrap_err(),
        KError::BackendMismatch { expected: BackendKind::Native, found: BackendKind::ParCsr }
    );
}

#[test]
fn gmres_restart_length_is_honoured() {
    let sys = System::from_dense(BackendKind::Native, &random_nonsymmetric(40));
    let long = SolverOptions::new(SolverKind::Gmres, PcKind::NoPc).with_restart(40);
    let short = long.clone().with_restart(3);
    let (long_stats, _) = sys.solve(long);
    let (short_stats, x) = sys.solve(short);
    assert!(long_stats.converged && short_stats.converged);
    assert!(short_stats.iterations >= long_stats.iterations);
    assert!(sys.relative_residual(&x) < 1e-9);
}
