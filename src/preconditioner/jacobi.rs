// Jacobi preconditioner implementation

use crate::core::Vector;
use crate::error::KError;
use crate::matrix::Matrix;
use crate::preconditioner::Preconditioner;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Jacobi preconditioner: M⁻¹ = D⁻¹ over the locally owned rows.
#[derive(Debug, Default)]
pub struct Jacobi {
    pub(crate) inv_diag: Vec<f64>,
}

impl Jacobi {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }
}

impl Preconditioner for Jacobi {
    fn setup(&mut self, a: &Matrix) -> Result<(), KError> {
        let offset = a.distribution().row().offset();
        let diag = a.local_diagonal();
        if let Some(i) = diag.iter().position(|&d| d == 0.0) {
            return Err(KError::ZeroPivot(offset + i));
        }
        self.inv_diag = diag.into_iter().map(|d| 1.0 / d).collect();
        log::trace!("jacobi: {} local rows", self.inv_diag.len());
        Ok(())
    }

    fn apply(&self, r: &Vector, z: &mut Vector) -> Result<(), KError> {
        r.ensure_same_layout(z, "jacobi")?;
        if r.local_size() != self.inv_diag.len() {
            return Err(KError::shape(
                "jacobi",
                format!("set up for {} local rows, applied to {}", self.inv_diag.len(), r.local_size()),
            ));
        }
        let (src, dst) = (r.values(), z.values_mut());
        #[cfg(feature = "rayon")]
        {
            dst.par_iter_mut()
                .zip(src.par_iter().zip(self.inv_diag.par_iter()))
                .for_each(|(zi, (&ri, &di))| *zi = di * ri);
        }
        #[cfg(not(feature = "rayon"))]
        {
            for ((zi, &ri), &di) in dst.iter_mut().zip(src).zip(&self.inv_diag) {
                *zi = di * ri;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendKind};
    use crate::core::{MatrixDistribution, VectorWriter};
    use crate::matrix::MatrixBuilder;
    use crate::parallel::UniverseComm;
    use std::sync::Arc;

    fn diag_matrix(backend: &Backend, d: &[f64]) -> Matrix {
        let mut b = MatrixBuilder::square(MatrixDistribution::square(d.len(), UniverseComm::serial())).unwrap();
        for (i, &v) in d.iter().enumerate() {
            if v != 0.0 {
                b.add(i, i, v).unwrap();
            }
        }
        b.build(backend).unwrap()
    }

    #[test]
    fn jacobi_scales_by_inverse_diagonal() {
        let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
        let a = diag_matrix(&backend, &[2.0, 4.0, -0.5]);
        let mut pc = Jacobi::new();
        pc.setup(&a).unwrap();

        let dist = Arc::clone(a.distribution().row());
        let mut w = VectorWriter::new(Vector::new(&backend, Arc::clone(a.row_space()), Arc::clone(&dist)).unwrap());
        w.as_mut_slice().copy_from_slice(&[1.0, 1.0, 1.0]);
        let r = w.release();
        let mut z = r.zeros_like();
        pc.apply(&r, &mut z).unwrap();
        assert_eq!(z.values(), &[0.5, 0.25, -2.0]);
    }

    #[test]
    fn jacobi_rejects_zero_diagonal() {
        let backend = Backend::init(BackendKind::ParCsr, &UniverseComm::Serial);
        let a = diag_matrix(&backend, &[1.0, 0.0, 3.0]);
        assert_eq!(Jacobi::new().setup(&a), Err(KError::ZeroPivot(1)));
    }
}
