//! ParCSR backend: diag/offd split matrices and the reduced operation set of a
//! parallel-CSR engine (`norm2`, `mult`, `mult_transpose`, `axpy`, `copy`, `dot`,
//! `scal`). Everything else reports `Unsupported` through the trait defaults.

use crate::backend::BackendKind;
use crate::core::traits::{AlgebraOps, LinearAlgebra};
use crate::core::distribution::Distribution;
use crate::core::vector::Vector;
use crate::error::KError;
use crate::matrix::dist::MatrixRepr;
use crate::matrix::parcsr::ParCsrMatrix;
use crate::matrix::Matrix;
use crate::parallel::Comm;

pub struct ParCsrAlgebra;

const KIND: BackendKind = BackendKind::ParCsr;

fn par_csr(a: &Matrix) -> Result<&ParCsrMatrix, KError> {
    match a.repr() {
        MatrixRepr::ParCsr(m) if a.backend() == KIND => Ok(m),
        _ => Err(KError::BackendMismatch { expected: KIND, found: a.backend() }),
    }
}

fn check_pair(x: &Vector, y: &Vector, op: &'static str) -> Result<(), KError> {
    x.ensure_backend(KIND)?;
    y.ensure_backend(KIND)?;
    x.ensure_same_layout(y, op)
}

/// Values of `x` at the global indices `wanted`, fetched from their owners. Collective.
///
/// Only requested entries move: every rank publishes the indices it needs, each
/// owner answers with the requested entries it holds (in request order), and every
/// rank reads its answers back by walking the requests with one cursor per owner.
pub(crate) fn exchange_external(x: &Vector, wanted: &[usize]) -> Vec<f64> {
    let dist = x.distribution();
    let comm = dist.comm();

    let requests: Vec<f64> = wanted.iter().map(|&g| g as f64).collect();
    let request_counts = comm.all_gather_counts(requests.len());
    let mut all_requests = vec![0.0; request_counts.iter().sum()];
    comm.all_gather_varcount(&requests, &request_counts, &mut all_requests);

    let owned = dist.local_range();
    let answers: Vec<f64> = all_requests
        .iter()
        .map(|&g| g as usize)
        .filter(|g| owned.contains(g))
        .map(|g| x.values()[g - owned.start])
        .collect();
    let answer_counts = comm.all_gather_counts(answers.len());
    let mut all_answers = vec![0.0; answer_counts.iter().sum()];
    comm.all_gather_varcount(&answers, &answer_counts, &mut all_answers);

    pick_answers(dist, &request_counts, &all_requests, &answer_counts, &all_answers)
}

fn pick_answers(
    dist: &Distribution,
    request_counts: &[usize],
    all_requests: &[f64],
    answer_counts: &[usize],
    all_answers: &[f64],
) -> Vec<f64> {
    let rank = dist.rank();
    let mine_start: usize = request_counts[..rank].iter().sum();
    let mine = mine_start..mine_start + request_counts[rank];

    // cursor[p] is the next unread answer of owner p
    let mut cursor: Vec<usize> = answer_counts
        .iter()
        .scan(0, |offset, &n| {
            let start = *offset;
            *offset += n;
            Some(start)
        })
        .collect();
    let mut out = Vec::with_capacity(mine.len());
    for (k, &g) in all_requests.iter().enumerate() {
        // every request has an owner: the column map only holds indices below the global size
        let Some(p) = dist.owner(g as usize) else { continue };
        if mine.contains(&k) {
            out.push(all_answers[cursor[p]]);
        }
        cursor[p] += 1;
    }
    out
}

impl LinearAlgebra for ParCsrAlgebra {
    fn backend(&self) -> BackendKind {
        KIND
    }

    fn capabilities(&self) -> AlgebraOps {
        AlgebraOps::NORM2
            | AlgebraOps::MULT
            | AlgebraOps::MULT_TRANSPOSE
            | AlgebraOps::AXPY
            | AlgebraOps::COPY
            | AlgebraOps::DOT
            | AlgebraOps::SCAL
    }

    fn mult(&self, a: &Matrix, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        let m = par_csr(a)?;
        x.ensure_backend(KIND)?;
        r.ensure_backend(KIND)?;
        a.ensure_mult_shapes(x, r, false, "mult")?;
        let x_ext = exchange_external(x, m.col_map_offd());
        m.matvec(x.values(), &x_ext, r.values_mut());
        Ok(())
    }

    fn mult_transpose(&self, a: &Matrix, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        let m = par_csr(a)?;
        x.ensure_backend(KIND)?;
        r.ensure_backend(KIND)?;
        a.ensure_mult_shapes(x, r, true, "mult_transpose")?;
        let ext = m.matvec_transpose(x.values(), r.values_mut());
        let dist = a.distribution().col();
        let mut scattered = vec![0.0; dist.global_size()];
        for (&g, &v) in m.col_map_offd().iter().zip(&ext) {
            scattered[g] += v;
        }
        dist.comm().all_reduce_vec(&mut scattered);
        for (ri, &si) in r.values_mut().iter_mut().zip(&scattered[dist.local_range()]) {
            *ri += si;
        }
        Ok(())
    }

    fn axpy(&self, alpha: f64, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        check_pair(x, r, "axpy")?;
        for (ri, &xi) in r.values_mut().iter_mut().zip(x.values()) {
            *ri += alpha * xi;
        }
        Ok(())
    }

    fn copy(&self, x: &Vector, r: &mut Vector) -> Result<(), KError> {
        check_pair(x, r, "copy")?;
        r.values_mut().copy_from_slice(x.values());
        Ok(())
    }

    fn dot(&self, x: &Vector, y: &Vector) -> Result<f64, KError> {
        check_pair(x, y, "dot")?;
        let local: f64 = x.values().iter().zip(y.values()).map(|(a, b)| a * b).sum();
        Ok(x.distribution().comm().all_reduce(local))
    }

    fn scal(&self, alpha: f64, x: &mut Vector) -> Result<(), KError> {
        x.ensure_backend(KIND)?;
        x.values_mut().iter_mut().for_each(|v| *v *= alpha);
        Ok(())
    }
}
