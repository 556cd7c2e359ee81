//! Distributed matrix and its assembly.
//!
//! A [`Matrix`] holds the rows its rank owns, in the native layout of the backend
//! it was built for. Matrices are assembled once through [`MatrixBuilder`] (or
//! [`Matrix::from_dense`](crate::matrix::dense)) and are read-only afterwards.

use std::sync::Arc;

use crate::backend::{Backend, BackendKind};
use crate::core::{MatrixDistribution, Space, Vector};
use crate::error::KError;
use crate::matrix::parcsr::ParCsrMatrix;
use crate::matrix::sparse::CsrMatrix;

/// Backend-native payload.
#[derive(Debug, Clone)]
pub(crate) enum MatrixRepr {
    /// Local rows, global column indices.
    Csr(CsrMatrix<f64>),
    ParCsr(ParCsrMatrix),
}

/// A distributed sparse matrix bound to one backend.
///
/// Entries are only reachable through the backend's algebra, so an operation the
/// backend does not implement (such as `diagonal` on ParCSR) cannot be bypassed:
///
/// ```compile_fail
/// use sparsebridge::*;
/// let backend = Backend::init(BackendKind::ParCsr, &UniverseComm::Serial);
/// let a = MatrixBuilder::square(MatrixDistribution::square(2, UniverseComm::serial()))
///     .unwrap()
///     .build(&backend)
///     .unwrap();
/// let _ = a.local_diagonal();
/// ```
#[derive(Debug)]
pub struct Matrix {
    backend: BackendKind,
    row_space: Arc<Space>,
    col_space: Arc<Space>,
    dist: MatrixDistribution,
    repr: MatrixRepr,
}

fn check_spaces(row_space: &Space, col_space: &Space, dist: &MatrixDistribution) -> Result<(), KError> {
    if row_space.size() != dist.row().global_size() || col_space.size() != dist.col().global_size() {
        return Err(KError::shape(
            "matrix",
            format!(
                "spaces {row_space} x {col_space} against distribution {} x {}",
                dist.row().global_size(),
                dist.col().global_size()
            ),
        ));
    }
    Ok(())
}

impl Matrix {
    /// Wraps this rank's rows (global column indices) in the backend's native layout.
    pub(crate) fn from_local_rows(
        backend: &Backend,
        row_space: Arc<Space>,
        col_space: Arc<Space>,
        dist: MatrixDistribution,
        rows: CsrMatrix<f64>,
    ) -> Result<Self, KError> {
        check_spaces(&row_space, &col_space, &dist)?;
        if rows.nrows() != dist.row().local_size() || rows.ncols() != dist.col().global_size() {
            return Err(KError::shape(
                "matrix",
                format!("local block {}x{} for {} local rows", rows.nrows(), rows.ncols(), dist.row().local_size()),
            ));
        }
        let repr = match backend.kind() {
            BackendKind::Native => MatrixRepr::Csr(rows),
            BackendKind::ParCsr => MatrixRepr::ParCsr(ParCsrMatrix::split(&rows, dist.col().local_range())?),
        };
        log::debug!(
            "assembled {} matrix {}x{} rank {} nnz {}",
            backend.kind(),
            row_space.size(),
            col_space.size(),
            dist.row().rank(),
            rows_nnz(&repr)
        );
        Ok(Self { backend: backend.kind(), row_space, col_space, dist, repr })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn row_space(&self) -> &Arc<Space> {
        &self.row_space
    }

    pub fn col_space(&self) -> &Arc<Space> {
        &self.col_space
    }

    pub fn distribution(&self) -> &MatrixDistribution {
        &self.dist
    }

    pub fn local_nnz(&self) -> usize {
        rows_nnz(&self.repr)
    }

    pub(crate) fn repr(&self) -> &MatrixRepr {
        &self.repr
    }

    /// Main diagonal entries of the locally owned rows; missing entries read as zero.
    pub(crate) fn local_diagonal(&self) -> Vec<f64> {
        let offset = self.dist.row().offset();
        (0..self.dist.row().local_size())
            .map(|i| {
                let g = offset + i;
                let entry = match &self.repr {
                    MatrixRepr::Csr(m) => m.get(i, g),
                    MatrixRepr::ParCsr(m) => m.entry(i, g),
                };
                entry.unwrap_or(0.0)
            })
            .collect()
    }

    /// Checks `x` / `r` against the column / row side of `A` (swapped when `transpose`).
    pub(crate) fn ensure_mult_shapes(&self, x: &Vector, r: &Vector, transpose: bool, op: &'static str) -> Result<(), KError> {
        let (in_space, in_dist, out_space, out_dist) = if transpose {
            (&self.row_space, self.dist.row(), &self.col_space, self.dist.col())
        } else {
            (&self.col_space, self.dist.col(), &self.row_space, self.dist.row())
        };
        if **x.space() != **in_space || !x.distribution().same_partition(in_dist) {
            return Err(KError::shape(op, format!("input vector on {} but operator expects {}", x.space(), in_space)));
        }
        if **r.space() != **out_space || !r.distribution().same_partition(out_dist) {
            return Err(KError::shape(op, format!("output vector on {} but operator produces {}", r.space(), out_space)));
        }
        Ok(())
    }
}

fn rows_nnz(repr: &MatrixRepr) -> usize {
    match repr {
        MatrixRepr::Csr(m) => m.nnz(),
        MatrixRepr::ParCsr(m) => m.nnz(),
    }
}

/// Collects this rank's entries of a distributed matrix.
pub struct MatrixBuilder {
    row_space: Arc<Space>,
    col_space: Arc<Space>,
    dist: MatrixDistribution,
    entries: Vec<(usize, usize, f64)>,
}

impl MatrixBuilder {
    pub fn new(row_space: Arc<Space>, col_space: Arc<Space>, dist: MatrixDistribution) -> Result<Self, KError> {
        check_spaces(&row_space, &col_space, &dist)?;
        Ok(Self { row_space, col_space, dist, entries: Vec::new() })
    }

    /// Square builder over anonymous spaces.
    pub fn square(dist: MatrixDistribution) -> Result<Self, KError> {
        let rows = Arc::new(Space::new(dist.row().global_size()));
        let cols = Arc::new(Space::new(dist.col().global_size()));
        Self::new(rows, cols, dist)
    }

    /// Adds `value` at global `(row, col)`; repeated positions are summed. `row` must be owned locally.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> Result<(), KError> {
        let local_row = self
            .dist
            .row()
            .to_local(row)
            .ok_or(KError::OutOfBounds { index: row, len: self.dist.row().local_size() })?;
        let ncols = self.dist.col().global_size();
        if col >= ncols {
            return Err(KError::OutOfBounds { index: col, len: ncols });
        }
        self.entries.push((local_row, col, value));
        Ok(())
    }

    pub fn build(self, backend: &Backend) -> Result<Matrix, KError> {
        let rows = CsrMatrix::from_triplets(self.dist.row().local_size(), self.dist.col().global_size(), self.entries)?;
        Matrix::from_local_rows(backend, self.row_space, self.col_space, self.dist, rows)
    }
}
