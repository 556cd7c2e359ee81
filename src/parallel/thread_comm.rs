// Thread-backed communicator group: N ranks living in one process.
//
// Each rank runs on its own thread and holds one `ThreadComm`. Collectives
// publish into a shared slot table and synchronise on a barrier, so the
// ordering rules are the same as for a multi-process communicator. All ranks
// are reported as sharing one node.

use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};

struct Shared {
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
}

pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Creates `size` connected ranks. Hand one to each thread.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, size, shared: Arc::clone(&shared) })
            .collect()
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Vec<f64>>> {
        self.shared.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `local` and returns every rank's contribution, by rank.
    fn exchange(&self, local: &[f64]) -> Vec<Vec<f64>> {
        self.slots()[self.rank] = local.to_vec();
        self.shared.barrier.wait();
        let all = self.slots().clone();
        // nobody may overwrite a slot until every rank has read the table
        self.shared.barrier.wait();
        all
    }
}

impl super::Comm for ThreadComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.shared.barrier.wait(); }

    fn all_reduce(&self, x: f64) -> f64 {
        self.exchange(&[x]).iter().map(|v| v[0]).sum()
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        self.exchange(&[x]).iter().map(|v| v[0]).fold(f64::NEG_INFINITY, f64::max)
    }

    fn all_reduce_vec(&self, x: &mut [f64]) {
        let all = self.exchange(x);
        x.iter_mut().for_each(|xi| *xi = 0.0);
        for contribution in &all {
            for (xi, ci) in x.iter_mut().zip(contribution) {
                *xi += *ci;
            }
        }
    }

    fn all_gather_counts(&self, n: usize) -> Vec<usize> {
        self.exchange(&[n as f64]).iter().map(|v| v[0] as usize).collect()
    }

    fn all_gather_varcount(&self, local: &[f64], counts: &[usize], out: &mut [f64]) {
        debug_assert_eq!(counts[self.rank], local.len());
        let all = self.exchange(local);
        let mut offset = 0;
        for part in &all {
            out[offset..offset + part.len()].copy_from_slice(part);
            offset += part.len();
        }
    }

    fn shared_rank(&self) -> usize { self.rank }
    fn shared_size(&self) -> usize { self.size }
}
