//! Distributed vector: a (space, distribution) pair plus this rank's block of values.

use std::sync::Arc;

use crate::backend::{Backend, BackendKind};
use crate::core::distribution::Distribution;
use crate::core::space::Space;
use crate::error::KError;

/// A distributed vector tied to one backend.
///
/// The local payload always has `distribution().local_size()` entries. It is
/// filled through a [`VectorWriter`](crate::core::writer::VectorWriter), which takes
/// the vector by value, and afterwards changed only by algebra operations. Vectors are
/// not `Clone`; an independent copy is made with `LinearAlgebra::copy`.
#[derive(Debug)]
pub struct Vector {
    backend: BackendKind,
    space: Arc<Space>,
    dist: Arc<Distribution>,
    values: Vec<f64>,
}

impl Vector {
    /// Zero vector over `space`, laid out by `dist`.
    pub fn new(backend: &Backend, space: Arc<Space>, dist: Arc<Distribution>) -> Result<Self, KError> {
        if space.size() != dist.global_size() {
            return Err(KError::shape(
                "vector",
                format!("{space} does not match distribution of global size {}", dist.global_size()),
            ));
        }
        let values = vec![0.0; dist.local_size()];
        Ok(Self { backend: backend.kind(), space, dist, values })
    }

    /// Zero vector with the same space, distribution and backend.
    pub fn zeros_like(&self) -> Vector {
        Vector {
            backend: self.backend,
            space: Arc::clone(&self.space),
            dist: Arc::clone(&self.dist),
            values: vec![0.0; self.values.len()],
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn space(&self) -> &Arc<Space> {
        &self.space
    }

    pub fn distribution(&self) -> &Arc<Distribution> {
        &self.dist
    }

    pub fn local_size(&self) -> usize {
        self.values.len()
    }

    pub fn global_size(&self) -> usize {
        self.space.size()
    }

    /// This rank's entries, local index `i` holding global index `offset + i`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub(crate) fn ensure_backend(&self, expected: BackendKind) -> Result<(), KError> {
        if self.backend != expected {
            return Err(KError::BackendMismatch { expected, found: self.backend });
        }
        Ok(())
    }

    /// Elementwise operations need identical blocks on every rank.
    pub(crate) fn ensure_same_layout(&self, other: &Vector, op: &'static str) -> Result<(), KError> {
        if !self.dist.same_partition(&other.dist) {
            return Err(KError::shape(
                op,
                format!("distributions differ: {:?} vs {:?}", self.dist.counts(), other.dist.counts()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::UniverseComm;

    #[test]
    fn new_vector_is_zero_and_sized_by_partition() {
        let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
        let dist = Arc::new(Distribution::uniform(6, UniverseComm::serial()));
        let v = Vector::new(&backend, Arc::new(Space::new(6)), dist).unwrap();
        assert_eq!(v.local_size(), 6);
        assert!(v.values().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn space_and_distribution_sizes_must_agree() {
        let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
        let dist = Arc::new(Distribution::uniform(6, UniverseComm::serial()));
        let err = Vector::new(&backend, Arc::new(Space::new(5)), dist).unwrap_err();
        assert!(matches!(err, KError::ShapeMismatch { op: "vector", .. }));
    }
}
