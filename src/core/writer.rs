//! Staging handle for filling a vector before anyone can read it.
//!
//! `VectorWriter::new` consumes the vector, so while the writer is alive no other
//! handle to the vector exists and it cannot reach an algebra operation or a solve.
//! `release` hands the finished vector back.
//!
//! ```
//! # use std::sync::Arc;
//! # use sparsebridge::{Backend, BackendKind, Distribution, Space, Vector, VectorWriter, UniverseComm};
//! let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
//! let dist = Arc::new(Distribution::uniform(3, UniverseComm::serial()));
//! let v = Vector::new(&backend, Arc::new(Space::new(3)), dist).unwrap();
//! let mut w = VectorWriter::new(v);
//! for i in 0..w.len() {
//!     w.set(i, i as f64).unwrap();
//! }
//! assert!(w.set(3, 1.0).is_err());
//! let v = w.release();
//! assert_eq!(v.values(), &[0.0, 1.0, 2.0]);
//! ```

use crate::core::vector::Vector;
use crate::error::KError;

pub struct VectorWriter {
    vector: Vector,
}

impl VectorWriter {
    pub fn new(vector: Vector) -> Self {
        Self { vector }
    }

    /// Number of locally writable entries.
    pub fn len(&self) -> usize {
        self.vector.local_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes local entry `i`; `i` must be below `len()`.
    pub fn set(&mut self, i: usize, value: f64) -> Result<(), KError> {
        let len = self.len();
        let slot = self
            .vector
            .values_mut()
            .get_mut(i)
            .ok_or(KError::OutOfBounds { index: i, len })?;
        *slot = value;
        Ok(())
    }

    pub fn get(&self, i: usize) -> Result<f64, KError> {
        self.vector
            .values()
            .get(i)
            .copied()
            .ok_or(KError::OutOfBounds { index: i, len: self.len() })
    }

    /// Writes by global index; the index must be owned by this rank.
    pub fn set_global(&mut self, g: usize, value: f64) -> Result<(), KError> {
        let i = self
            .vector
            .distribution()
            .to_local(g)
            .ok_or(KError::OutOfBounds { index: g, len: self.len() })?;
        self.set(i, value)
    }

    pub fn fill(&mut self, value: f64) {
        self.vector.values_mut().iter_mut().for_each(|x| *x = value);
    }

    /// Bulk access to the local block.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.vector.values_mut()
    }

    /// Ends construction and returns the vector.
    pub fn release(self) -> Vector {
        self.vector
    }
}

impl From<Vector> for VectorWriter {
    fn from(vector: Vector) -> Self {
        Self::new(vector)
    }
}
