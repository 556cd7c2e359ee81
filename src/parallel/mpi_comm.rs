//! MPI-based communicator.
//!
//! Wraps the world communicator of an initialized MPI universe and implements
//! the collectives of [`Comm`](super::Comm) with rsmpi. The node-local grouping
//! used for accelerator assignment is computed once, at construction, by
//! splitting the world into shared-memory sub-communicators.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")] {
//! use sparsebridge::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI init");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Count;

use crate::error::KError;

pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    shared_rank: usize,
    shared_size: usize,
    // finalizes MPI on drop, so it lives as long as the communicator
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm`.
    ///
    /// Fails if MPI was already initialized in this process.
    pub fn new() -> Result<Self, KError> {
        let universe = mpi::initialize()
            .ok_or_else(|| KError::Runtime("MPI already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        let node = world.split_shared(0);
        let shared_rank = node.rank() as usize;
        let shared_size = node.size() as usize;
        log::debug!("mpi rank {rank}/{size}, node-local {shared_rank}/{shared_size}");
        Ok(MpiComm { world, rank, size, shared_rank, shared_size, _universe: universe })
    }
}

impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.world.barrier(); }

    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::max());
        y
    }

    fn all_reduce_vec(&self, x: &mut [f64]) {
        let local = x.to_vec();
        self.world.all_reduce_into(&local[..], x, &SystemOperation::sum());
    }

    fn all_gather_counts(&self, n: usize) -> Vec<usize> {
        let mut counts = vec![0u64; self.size];
        self.world.all_gather_into(&(n as u64), &mut counts[..]);
        counts.into_iter().map(|c| c as usize).collect()
    }

    fn all_gather_varcount(&self, local: &[f64], counts: &[usize], out: &mut [f64]) {
        let counts: Vec<Count> = counts.iter().map(|&c| c as Count).collect();
        let displs: Vec<Count> = counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect();
        let mut partition = PartitionMut::new(out, counts, displs);
        self.world.all_gather_varcount_into(local, &mut partition);
    }

    fn shared_rank(&self) -> usize { self.shared_rank }
    fn shared_size(&self) -> usize { self.shared_size }
}
