//! Distributed matrices from dense `faer::Mat` input.
//!
//! Every rank passes the same global matrix and keeps only its own rows; exact
//! zeros are dropped from the sparse pattern.

use std::sync::Arc;

use faer::Mat;

use crate::backend::Backend;
use crate::core::{MatrixDistribution, Space};
use crate::error::KError;
use crate::matrix::dist::Matrix;
use crate::matrix::sparse::CsrMatrix;

impl Matrix {
    pub fn from_dense(backend: &Backend, a: &Mat<f64>, dist: MatrixDistribution) -> Result<Matrix, KError> {
        if a.nrows() != dist.row().global_size() || a.ncols() != dist.col().global_size() {
            return Err(KError::shape(
                "from_dense",
                format!(
                    "{}x{} matrix for a {}x{} distribution",
                    a.nrows(),
                    a.ncols(),
                    dist.row().global_size(),
                    dist.col().global_size()
                ),
            ));
        }
        let range = dist.row().local_range();
        let mut entries = Vec::new();
        for (li, i) in range.enumerate() {
            for j in 0..a.ncols() {
                let v = a[(i, j)];
                if v != 0.0 {
                    entries.push((li, j, v));
                }
            }
        }
        let rows = CsrMatrix::from_triplets(dist.row().local_size(), a.ncols(), entries)?;
        let row_space = Arc::new(Space::new(a.nrows()));
        let col_space = Arc::new(Space::new(a.ncols()));
        Matrix::from_local_rows(backend, row_space, col_space, dist, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::parallel::UniverseComm;

    #[test]
    fn keeps_the_nonzero_pattern() {
        let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 } else if j == i + 1 { -1.0 } else { 0.0 });
        let m = Matrix::from_dense(&backend, &a, MatrixDistribution::square(3, UniverseComm::serial())).unwrap();
        assert_eq!(m.local_nnz(), 5);
        assert_eq!(m.local_diagonal(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn dimensions_must_match() {
        let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
        let a = Mat::<f64>::zeros(2, 3);
        assert!(Matrix::from_dense(&backend, &a, MatrixDistribution::square(3, UniverseComm::serial())).is_err());
    }
}
