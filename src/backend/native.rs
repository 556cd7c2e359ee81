//! Native backend: local rows in CSR with global column indices, the whole algebra
//! contract, rayon-parallel local kernels when the `rayon` feature is on.

use crate::backend::BackendKind;
use crate::core::traits::{AlgebraOps, LinearAlgebra};
use crate::core::vector::Vector;
use crate::error::KError;
use crate::matrix::dist::MatrixRepr;
use crate::matrix::sparse::CsrMatrix;
use crate::matrix::Matrix;
use crate::parallel::Comm;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub struct NativeAlgebra;

const KIND: BackendKind = BackendKind::Native;

fn local_rows(a: &Matrix) -> Result<&CsrMatrix<f64>, KError> {
    match a.repr() {
        MatrixRepr::Csr(m) if a.backend() == KIND => Ok(m),
        _ => Err(KError::BackendMismatch { expected: KIND, found: a.backend() }),
    }
}

fn local_dot(x: &[f64], y: &[f64]) -> f64 {
    #[cfg(feature = "rayon")]
    {
        x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().zip(y).map(|(a, b)| a * b).sum()
    }
}

fn local_abs_sum(x: &[f64]) -> f64 {
    #[cfg(feature = "rayon")]
    {
        x.par_iter().map(|v| v.abs()).sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().map(|v| v.abs()).sum()
    }
}

fn local_abs_max(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |m, v| f64::max(m, v.abs()))
}

/// Full copy of a distributed vector on every rank. Collective.
pub(crate) fn gather_global(x: &Vector) -> Vec<f64> {
    let dist = x.distribution();
    let mut global = vec![0.0; dist.global_size()];
    dist.comm().all_gather_varcount(x.values(), &dist.counts(), &mut global);
    global
}

fn zip_update(r: &mut [f64], x: &[f64], f: impl Fn(f64, f64) -> f64 + Sync + Send) {
    #[cfg(feature = "rayon")]
    {
        r.par_iter_mut().zip(x.par_iter()).for_each(|(ri, &xi)| *ri = f(*ri, xi));
    }
    #[cfg(not(feature = "rayon"))]
    {
        r.iter_mut().zip(x).for_each(|(ri, &xi)| *ri = f(*ri, xi));
    }
}

impl NativeAlgebra {
    fn check_pair(&self, x: &Vector, y: &Vector, op: &'static str) -> Result<(), KError> {
        x.ensure_backend(KIND)?;
        y.ensure_backend(KIND)?;
        x.ensure_same_layout(y, op)
    }
}

impl LinearAlgebra for NativeAlgebra {
    fn backend(&self) -> BackendKind {
        KIND
    }

    fn capabilities(&self) -> AlgebraOps {
        AlgebraOps::all()
    }

    fn norm0(&self, x: &Vector) -> Result<f64, KError> {
        x.ensure_backend(KIND)?;
        Ok(x.distribution().comm().all_reduce_max(local_abs_max(x.values())))
    }

    fn norm1(&self, x: &Vector) -> Result<f64, KError> {
        x.ensure_backend(KIND)?;
        Ok(x.distribution().comm().all_reduce(local_abs_sum(x.values())))
    }

    fn mult(&self, a: &Matrix, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        let rows = local_rows(a)?;
        x.ensure_backend(KIND)?;
        r.ensure_backend(KIND)?;
        a.ensure_mult_shapes(x, r, false, "mult")?;
        let x_global = gather_global(x);
        #[cfg(feature = "rayon")]
        rows.spmv_parallel(&x_global, r.values_mut());
        #[cfg(not(feature = "rayon"))]
        rows.spmv(&x_global, r.values_mut());
        Ok(())
    }

    fn mult_transpose(&self, a: &Matrix, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        let rows = local_rows(a)?;
        x.ensure_backend(KIND)?;
        r.ensure_backend(KIND)?;
        a.ensure_mult_shapes(x, r, true, "mult_transpose")?;
        // every rank contributes to every column; sum, then keep the owned block
        let mut partial = vec![0.0; rows.ncols()];
        rows.spmv_transpose_add(x.values(), &mut partial);
        let dist = r.distribution();
        dist.comm().all_reduce_vec(&mut partial);
        let range = dist.local_range();
        r.values_mut().copy_from_slice(&partial[range]);
        Ok(())
    }

    fn axpy(&self, alpha: f64, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        self.check_pair(x, r, "axpy")?;
        zip_update(r.values_mut(), x.values(), |ri, xi| alpha * xi + ri);
        Ok(())
    }

    fn aypx(&self, alpha: f64, y: &mut Vector, x: &Vector) -> Result<(), KError> {
        self.check_pair(x, y, "aypx")?;
        zip_update(y.values_mut(), x.values(), |yi, xi| xi + alpha * yi);
        Ok(())
    }

    fn copy(&self, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        self.check_pair(x, r, "copy")?;
        r.values_mut().copy_from_slice(x.values());
        Ok(())
    }

    fn dot(&self, x: &Vector, y: &Vector) -> Result<f64, KError> {
        self.check_pair(x, y, "dot")?;
        Ok(x.distribution().comm().all_reduce(local_dot(x.values(), y.values())))
    }

    fn scal(&self, alpha: f64, x: &mut Vector) -> Result<(), KError> {
        x.ensure_backend(KIND)?;
        x.values_mut().iter_mut().for_each(|v| *v *= alpha);
        Ok(())
    }

    fn diagonal(&self, a: &Matrix, x: &mut Vector) -> Result<(), KError> {
        local_rows(a)?;
        x.ensure_backend(KIND)?;
        if !x.distribution().same_partition(a.distribution().row()) {
            return Err(KError::shape("diagonal", "vector is not laid out like the matrix rows"));
        }
        x.values_mut().copy_from_slice(&a.local_diagonal());
        Ok(())
    }

    fn reciprocal(&self, x: &mut Vector) -> Result<(), KError> {
        x.ensure_backend(KIND)?;
        if let Some(i) = x.values().iter().position(|&v| v == 0.0) {
            return Err(KError::ZeroEntry(x.distribution().offset() + i));
        }
        x.values_mut().iter_mut().for_each(|v| *v = 1.0 / *v);
        Ok(())
    }

    fn pointwise_mult(&self, x: &Vector, y: &Vector, w: &mut Vector) -> Result<(), KError> {
        self.check_pair(x, y, "pointwise_mult")?;
        self.check_pair(x, w, "pointwise_mult")?;
        for ((wi, &xi), &yi) in w.values_mut().iter_mut().zip(x.values()).zip(y.values()) {
            *wi = xi * yi;
        }
        Ok(())
    }
}
