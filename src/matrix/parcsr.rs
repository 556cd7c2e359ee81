//! Parallel-CSR layout: the local rows split into a `diag` block, whose columns
//! belong to this rank's column range, and an `offd` block whose columns are
//! compressed through `col_map_offd` (sorted global column ids).

use std::ops::Range;

use crate::error::KError;
use crate::matrix::sparse::CsrMatrix;

#[derive(Debug, Clone)]
pub struct ParCsrMatrix {
    diag: CsrMatrix<f64>,
    offd: CsrMatrix<f64>,
    col_map_offd: Vec<usize>,
    first_col: usize,
}

impl ParCsrMatrix {
    /// Splits local rows with global column indices, given the locally owned column range.
    pub fn split(rows: &CsrMatrix<f64>, local_cols: Range<usize>) -> Result<Self, KError> {
        let mut col_map_offd: Vec<usize> = (0..rows.nrows())
            .flat_map(|i| rows.row(i).0.iter().copied())
            .filter(|j| !local_cols.contains(j))
            .collect();
        col_map_offd.sort_unstable();
        col_map_offd.dedup();

        let mut diag = Vec::new();
        let mut offd = Vec::new();
        for i in 0..rows.nrows() {
            let (cols, vals) = rows.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                if local_cols.contains(&j) {
                    diag.push((i, j - local_cols.start, v));
                } else {
                    // present by construction of col_map_offd
                    let k = col_map_offd.binary_search(&j).unwrap_or_else(|k| k);
                    offd.push((i, k, v));
                }
            }
        }
        Ok(Self {
            diag: CsrMatrix::from_triplets(rows.nrows(), local_cols.len(), diag)?,
            offd: CsrMatrix::from_triplets(rows.nrows(), col_map_offd.len(), offd)?,
            col_map_offd,
            first_col: local_cols.start,
        })
    }

    pub fn nrows(&self) -> usize {
        self.diag.nrows()
    }

    pub fn col_map_offd(&self) -> &[usize] {
        &self.col_map_offd
    }

    pub fn nnz(&self) -> usize {
        self.diag.nnz() + self.offd.nnz()
    }

    /// y = diag · x_local + offd · x_ext.
    pub fn matvec(&self, x_local: &[f64], x_ext: &[f64], y: &mut [f64]) {
        self.diag.spmv(x_local, y);
        self.offd.spmv_add(x_ext, y);
    }

    /// Local part of Aᵀ x, plus the contributions to off-process columns (indexed like `col_map_offd`).
    pub fn matvec_transpose(&self, x: &[f64], y_local: &mut [f64]) -> Vec<f64> {
        y_local.iter_mut().for_each(|v| *v = 0.0);
        self.diag.spmv_transpose_add(x, y_local);
        let mut ext = vec![0.0; self.col_map_offd.len()];
        self.offd.spmv_transpose_add(x, &mut ext);
        ext
    }

    /// Entry at local row `i`, global column `g`.
    pub fn entry(&self, i: usize, g: usize) -> Option<f64> {
        if g >= self.first_col && g - self.first_col < self.diag.ncols() {
            return self.diag.get(i, g - self.first_col);
        }
        let k = self.col_map_offd.binary_search(&g).ok()?;
        self.offd.get(i, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // rank owning rows/cols 1..3 of a 4x4 tridiagonal matrix
    fn middle_block() -> CsrMatrix<f64> {
        CsrMatrix::from_triplets(
            2,
            4,
            vec![(0, 0, -1.0), (0, 1, 2.0), (0, 2, -1.0), (1, 1, -1.0), (1, 2, 2.0), (1, 3, -1.0)],
        )
        .unwrap()
    }

    #[test]
    fn split_separates_owned_columns() {
        let p = ParCsrMatrix::split(&middle_block(), 1..3).unwrap();
        assert_eq!(p.col_map_offd(), &[0, 3]);
        assert_eq!(p.nnz(), 6);
        assert_eq!(p.entry(0, 1), Some(2.0));
        assert_eq!(p.entry(1, 3), Some(-1.0));
        assert_eq!(p.entry(0, 3), None);
    }

    #[test]
    fn matvec_matches_unsplit_rows() {
        let rows = middle_block();
        let p = ParCsrMatrix::split(&rows, 1..3).unwrap();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut expected = vec![0.0; 2];
        rows.spmv(&x, &mut expected);
        let mut y = vec![0.0; 2];
        // x_ext follows col_map_offd = [0, 3]
        p.matvec(&x[1..3], &[x[0], x[3]], &mut y);
        assert_eq!(y, expected);
    }

    #[test]
    fn transpose_reports_external_contributions() {
        let p = ParCsrMatrix::split(&middle_block(), 1..3).unwrap();
        let mut y_local = vec![0.0; 2];
        let ext = p.matvec_transpose(&[1.0, 1.0], &mut y_local);
        assert_eq!(y_local, vec![1.0, 1.0]);
        assert_eq!(ext, vec![-1.0, -1.0]);
    }
}
