//! Several ranks in one process: every rank owns a block of rows, and the
//! distributed results must agree with a serial run on the same data.

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use sparsebridge::parallel::ThreadComm;
use sparsebridge::*;

const N: usize = 23;

/// Non-symmetric tridiagonal operator; only the rows owned by `dist` are added.
fn operator(backend: &Backend, dist: MatrixDistribution) -> Matrix {
    let range = dist.row().local_range();
    let mut b = MatrixBuilder::square(dist).unwrap();
    for i in range {
        b.add(i, i, 4.0).unwrap();
        if i > 0 {
            b.add(i, i - 1, -1.5).unwrap();
        }
        if i + 1 < N {
            b.add(i, i + 1, -0.5).unwrap();
        }
    }
    b.build(backend).unwrap()
}

fn entry(g: usize) -> f64 {
    (g as f64 + 1.0).sin()
}

fn input_vector(backend: &Backend, a: &Matrix) -> Vector {
    let dist = Arc::clone(a.distribution().col());
    let range = dist.local_range();
    let mut w = VectorWriter::new(Vector::new(backend, Arc::clone(a.col_space()), dist).unwrap());
    for g in range {
        w.set_global(g, entry(g)).unwrap();
    }
    w.release()
}

struct Results {
    range: std::ops::Range<usize>,
    ax: Vec<f64>,
    atx: Vec<f64>,
    dot: f64,
    solution: Vec<f64>,
    iterations: usize,
}

fn compute(kind: BackendKind, comm: Arc<UniverseComm>, solver: SolverKind) -> Results {
    let backend = Backend::init(kind, &comm);
    let la = backend.algebra();
    let a = operator(&backend, MatrixDistribution::square(N, comm));
    let x = input_vector(&backend, &a);
    let range = x.distribution().local_range();

    let mut ax = x.zeros_like();
    la.mult(&a, &x, &mut ax).unwrap();
    let mut atx = x.zeros_like();
    la.mult_transpose(&a, &x, &mut atx).unwrap();
    let dot = la.dot(&ax, &x).unwrap();

    let mut sol = x.zeros_like();
    let options = SolverOptions::new(solver, PcKind::NoPc).with_tolerance(1e-11);
    let stats = KspContext::new(&backend, options).unwrap().solve(&a, &ax, &mut sol).unwrap();
    assert!(stats.converged, "{kind} {solver}: {stats:?}");

    Results {
        range,
        ax: ax.values().to_vec(),
        atx: atx.values().to_vec(),
        dot,
        solution: sol.values().to_vec(),
        iterations: stats.iterations,
    }
}

fn run_on_ranks(nprocs: usize, kind: BackendKind, solver: SolverKind) -> Vec<Results> {
    let handles: Vec<_> = ThreadComm::group(nprocs)
        .into_iter()
        .map(|c| thread::spawn(move || compute(kind, Arc::new(UniverseComm::Thread(c)), solver)))
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn distributed_primitives_match_serial() {
    for kind in BackendKind::ALL {
        let serial = compute(kind, UniverseComm::serial(), SolverKind::Gmres);
        for nprocs in [2, 3] {
            let ranks = run_on_ranks(nprocs, kind, SolverKind::Gmres);
            let covered: usize = ranks.iter().map(|r| r.range.len()).sum();
            assert_eq!(covered, N);
            for r in &ranks {
                assert_abs_diff_eq!(r.dot, serial.dot, epsilon = 1e-12);
                for (k, g) in r.range.clone().enumerate() {
                    assert_abs_diff_eq!(r.ax[k], serial.ax[g], epsilon = 1e-14);
                    assert_abs_diff_eq!(r.atx[k], serial.atx[g], epsilon = 1e-14);
                }
            }
        }
    }
}

#[test]
fn distributed_solves_recover_the_input() {
    for kind in BackendKind::ALL {
        for solver in [SolverKind::Gmres, SolverKind::BiCg, SolverKind::BiCgStab] {
            let ranks = run_on_ranks(3, kind, solver);
            let first = ranks[0].iterations;
            for r in &ranks {
                // every rank takes the same decisions from the same reduced scalars
                assert_eq!(r.iterations, first);
                for (k, g) in r.range.clone().enumerate() {
                    assert_abs_diff_eq!(r.solution[k], entry(g), epsilon = 1e-8);
                }
            }
        }
    }
}
