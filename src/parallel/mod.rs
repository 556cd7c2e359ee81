//! Communicators for the cooperating processes that share a distributed object.
//!
//! Every method here is collective: all ranks of a communicator must call them in
//! the same order, otherwise results are undefined (or the group deadlocks).

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Global sum of one value per rank.
    fn all_reduce(&self, x: f64) -> f64;
    /// Global maximum of one value per rank.
    fn all_reduce_max(&self, x: f64) -> f64;
    /// Elementwise global sum, in place. All ranks pass buffers of equal length.
    fn all_reduce_vec(&self, x: &mut [f64]);
    /// Gathers one count per rank, ordered by rank.
    fn all_gather_counts(&self, n: usize) -> Vec<usize>;
    /// Concatenates every rank's `local` slice into `out`, ordered by rank.
    /// `counts[r]` is the length contributed by rank `r`.
    fn all_gather_varcount(&self, local: &[f64], counts: &[usize], out: &mut [f64]);
    /// Rank within the group of ranks sharing this node's memory.
    fn shared_rank(&self) -> usize;
    /// Number of ranks sharing this node's memory.
    fn shared_size(&self) -> usize;

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let local = a.iter().zip(b).map(|(&x, &y)| x * y).sum::<f64>();
        self.all_reduce(local)
    }
}

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

pub mod thread_comm;
pub use thread_comm::ThreadComm;

pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    Thread(ThreadComm),
    Serial,
}

impl UniverseComm {
    pub fn serial() -> std::sync::Arc<Self> {
        std::sync::Arc::new(UniverseComm::Serial)
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Thread(comm) => comm.rank(),
            UniverseComm::Serial => 0,
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Thread(comm) => comm.size(),
            UniverseComm::Serial => 1,
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Thread(comm) => comm.barrier(),
            UniverseComm::Serial => {}
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce(x),
            UniverseComm::Thread(comm) => comm.all_reduce(x),
            UniverseComm::Serial => x,
        }
    }
    fn all_reduce_max(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
            UniverseComm::Thread(comm) => comm.all_reduce_max(x),
            UniverseComm::Serial => x,
        }
    }
    fn all_reduce_vec(&self, x: &mut [f64]) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_vec(x),
            UniverseComm::Thread(comm) => comm.all_reduce_vec(x),
            UniverseComm::Serial => {}
        }
    }
    fn all_gather_counts(&self, n: usize) -> Vec<usize> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_counts(n),
            UniverseComm::Thread(comm) => comm.all_gather_counts(n),
            UniverseComm::Serial => vec![n],
        }
    }
    fn all_gather_varcount(&self, local: &[f64], counts: &[usize], out: &mut [f64]) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_varcount(local, counts, out),
            UniverseComm::Thread(comm) => comm.all_gather_varcount(local, counts, out),
            UniverseComm::Serial => out.copy_from_slice(local),
        }
    }
    fn shared_rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.shared_rank(),
            UniverseComm::Thread(comm) => comm.shared_rank(),
            UniverseComm::Serial => 0,
        }
    }
    fn shared_size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.shared_size(),
            UniverseComm::Thread(comm) => comm.shared_size(),
            UniverseComm::Serial => 1,
        }
    }
}

impl std::fmt::Debug for UniverseComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(_) => "mpi",
            UniverseComm::Thread(_) => "thread",
            UniverseComm::Serial => "serial",
        };
        write!(f, "UniverseComm({kind}, rank {}/{})", self.rank(), self.size())
    }
}
