//! Solver benchmark driver.
//!
//! ```sh
//! bench_solver CG Jacobi matrix.mtx [rhs.mtx] [--backend native|parcsr]
//! ```
//!
//! Reads `A`, builds `xe = 1` and `b = A·xe` (or reads `b`), solves `A x = b`
//! and logs ‖A x − b‖ and ‖A x − b‖/‖b‖. Exit status: 0 on success, -1 on a
//! usage error, 3 on a library error, 2 on any other error, 1 on a panic.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use log::info;

use sparsebridge::io::{read_matrix_market, read_vector, vector_from_values};
use sparsebridge::{
    Backend, BackendKind, KError, KspContext, PcKind, SolverKind, SolverOptions, UniverseComm, Vector,
    VectorWriter,
};

const USAGE: &str = "Usage : bench_solver [solver] [preconditioner] [matrix] [vector]
  - solver : (CG|GMRES|BICG|BICGSTAB)
  - preconditioner : (Jacobi|NoPC)
  - MTX matrix file
  - optional MTX vector file";

#[derive(Parser, Debug)]
#[command(name = "bench_solver")]
#[command(about = "Solve a Matrix Market system and report the residual")]
#[command(version)]
struct Cli {
    /// Krylov method (CG|GMRES|BICG|BICGSTAB).
    solver: String,
    /// Preconditioner (Jacobi|NoPC).
    preconditioner: String,
    /// Matrix Market coordinate file.
    matrix: PathBuf,
    /// Optional right-hand side; defaults to b = A·1.
    vector: Option<PathBuf>,
    /// Backend to run on.
    #[arg(long, default_value = "native")]
    backend: String,
    #[arg(long, default_value_t = 500)]
    max_iterations: usize,
    #[arg(long, default_value_t = 1e-9)]
    tolerance: f64,
}

struct Choices {
    solver: SolverKind,
    pc: PcKind,
    backend: BackendKind,
}

fn usage_error(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}\n{USAGE}");
    exit(-1)
}

fn choices(cli: &Cli) -> Result<Choices, KError> {
    Ok(Choices {
        solver: cli.solver.parse()?,
        pc: cli.preconditioner.parse()?,
        backend: cli.backend.parse()?,
    })
}

#[cfg(feature = "mpi")]
fn universe() -> anyhow::Result<Arc<UniverseComm>> {
    let comm = sparsebridge::parallel::MpiComm::new()?;
    Ok(Arc::new(UniverseComm::Mpi(comm)))
}

#[cfg(not(feature = "mpi"))]
fn universe() -> anyhow::Result<Arc<UniverseComm>> {
    Ok(UniverseComm::serial())
}

fn run(cli: &Cli, choice: &Choices) -> anyhow::Result<()> {
    let comm = universe()?;
    let backend = Backend::init(choice.backend, &comm);
    let la = backend.algebra();

    info!("read matrix file : {}", cli.matrix.display());
    let a = read_matrix_market(&cli.matrix)?.assemble(&backend, Arc::clone(&comm))?;
    let row_space = Arc::clone(a.row_space());
    let row_dist = Arc::clone(a.distribution().row());

    info!("* xe = 1");
    let mut writer = VectorWriter::new(Vector::new(&backend, Arc::clone(a.col_space()), Arc::clone(a.distribution().col()))?);
    writer.fill(1.0);
    let xe = writer.release();
    info!("=> vector distribution : {}", xe.distribution());

    let b = match &cli.vector {
        Some(path) => {
            info!("read vector file : {}", path.display());
            vector_from_values(&backend, row_space, row_dist, &read_vector(path)?)?
        }
        None => {
            info!("* b = A * xe");
            let mut b = Vector::new(&backend, row_space, row_dist)?;
            la.mult(&a, &xe, &mut b)?;
            b
        }
    };

    info!("* solve A x = b with {}/{} on {}", choice.solver, choice.pc, choice.backend);
    let mut x = xe.zeros_like();
    let options = SolverOptions::new(choice.solver, choice.pc)
        .with_max_iterations(cli.max_iterations)
        .with_tolerance(cli.tolerance);
    let stats = KspContext::new(&backend, options)?.solve(&a, &b, &mut x)?;
    info!("{:?} after {} iterations", stats.reason, stats.iterations);

    info!("* r = Ax - b");
    let mut r = b.zeros_like();
    la.mult(&a, &x, &mut r)?;
    la.axpy(-1.0, &b, &mut r)?;
    let norm = la.norm2(&r)?;
    let norm_b = la.norm2(&b)?;
    info!(" => ||r|| = {norm:e} ; ||r||/||b|| = {:e}", norm / norm_b);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            exit(0)
        }
        Err(e) => usage_error(e),
    };
    let choice = choices(&cli).unwrap_or_else(|e| usage_error(e));
    if !cli.matrix.is_file() {
        usage_error(format!("Matrix file is needed for this bench: {}", cli.matrix.display()));
    }

    let code = match panic::catch_unwind(AssertUnwindSafe(|| run(&cli, &choice))) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => match err.downcast_ref::<KError>() {
            Some(e) => {
                eprintln!("Exception: {e}");
                3
            }
            None => {
                eprintln!("** A standard error occurred: {err:#}.");
                2
            }
        },
        Err(_) => {
            eprintln!("** An unknown failure has occurred...");
            1
        }
    };
    exit(code)
}
