// Local CSR block: the rows a rank owns, with column indices into some column range.
// Storage and triplet assembly are faer's; the kernels below walk its row slices.

use faer::sparse::{CreationError, SparseRowMat, Triplet};
use faer::traits::ComplexField;
use num_traits::Float;

use crate::error::KError;

#[derive(Debug, Clone)]
pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
}

impl<T: ComplexField + Float> CsrMatrix<T> {
    /// Build from `(row, col, value)` triplets; duplicates are summed, rows come out column-sorted.
    pub fn from_triplets(nrows: usize, ncols: usize, entries: Vec<(usize, usize, T)>) -> Result<Self, KError> {
        let triplets: Vec<Triplet<usize, usize, T>> =
            entries.iter().map(|&(i, j, v)| Triplet::new(i, j, v)).collect();
        match SparseRowMat::try_new_from_triplets(nrows, ncols, &triplets) {
            Ok(inner) => Ok(Self { inner }),
            Err(CreationError::OutOfBounds { .. }) => Err(first_out_of_bounds(nrows, ncols, &entries)),
            Err(CreationError::Generic(e)) => Err(KError::Runtime(format!("csr assembly: {e:?}"))),
        }
    }
}

fn first_out_of_bounds<T>(nrows: usize, ncols: usize, entries: &[(usize, usize, T)]) -> KError {
    for &(i, j, _) in entries {
        if i >= nrows {
            return KError::OutOfBounds { index: i, len: nrows };
        }
        if j >= ncols {
            return KError::OutOfBounds { index: j, len: ncols };
        }
    }
    KError::Runtime("csr assembly: index out of bounds".into())
}

impl<T: Float> CsrMatrix<T> {
    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.val().len()
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let row_ptr = self.inner.row_ptr();
        let range = row_ptr[i]..row_ptr[i + 1];
        (&self.inner.col_idx()[range.clone()], &self.inner.val()[range])
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        let (cols, vals) = self.row(i);
        cols.binary_search(&j).ok().map(|k| vals[k])
    }

    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let (cols, vals) = self.row(i);
        cols.iter().zip(vals).fold(T::zero(), |acc, (&j, &v)| acc + v * x[j])
    }

    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }

    /// y += A * x.
    pub fn spmv_add(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = *yi + self.row_dot(i, x);
        }
    }

    /// y += Aᵀ * x.  `x.len() == nrows()`, `y.len() == ncols()`.
    pub fn spmv_transpose_add(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows());
        assert_eq!(y.len(), self.ncols());
        for (i, &xi) in x.iter().enumerate() {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                y[j] = y[j] + v * xi;
            }
        }
    }
}

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            *yi = self.row_dot(i, x);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_spmv() {
        let m = CsrMatrix::from_triplets(3, 3, vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]).unwrap();
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn simple_pattern() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_triplets(2, 3, vec![(1, 2, 4.0), (0, 0, 1.0), (1, 1, 3.0), (0, 1, 2.0)]).unwrap();
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);
        let mut yt = vec![0.0; 3];
        m.spmv_transpose_add(&[1.0, 2.0], &mut yt);
        assert_eq!(yt, vec![1.0, 8.0, 8.0]);
    }

    #[test]
    fn triplets_sum_duplicates() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(1, 0, 2.0), (0, 1, 1.0), (1, 0, 3.0), (0, 0, 4.0)]).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(1, 0), Some(5.0));
        assert_eq!(m.row(0).0, &[0, 1]);
        assert_eq!(m.get(1, 1), None);
    }

    #[test]
    fn empty_rows_are_kept() {
        let m = CsrMatrix::<f64>::from_triplets(3, 4, vec![(2, 3, 1.5)]).unwrap();
        assert_eq!((m.nrows(), m.ncols(), m.nnz()), (3, 4, 1));
        assert!(m.row(0).0.is_empty());
        let mut y = vec![9.0; 3];
        m.spmv(&[0.0, 0.0, 0.0, 2.0], &mut y);
        assert_eq!(y, vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn out_of_range_entries_name_the_bad_index() {
        assert_eq!(
            CsrMatrix::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 5, 1.0)]).unwrap_err(),
            KError::OutOfBounds { index: 5, len: 2 }
        );
        assert_eq!(
            CsrMatrix::from_triplets(2, 2, vec![(3, 0, 1.0)]).unwrap_err(),
            KError::OutOfBounds { index: 3, len: 2 }
        );
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_matches_serial() {
        let m = CsrMatrix::from_triplets(3, 3, vec![(0, 0, 2.0), (1, 2, -1.0), (2, 1, 4.0), (2, 2, 1.0)]).unwrap();
        let x = vec![1.0, 2.0, 3.0];
        let (mut a, mut b) = (vec![0.0; 3], vec![0.0; 3]);
        m.spmv(&x, &mut a);
        m.spmv_parallel(&x, &mut b);
        assert_eq!(a, b);
    }
}
