//! Partition of a global index range across the ranks of a communicator.
//!
//! Each rank owns one contiguous block `[offset, offset + local_size)`. The blocks
//! of all ranks cover `[0, global_size)` exactly, in rank order. A distribution is
//! immutable once created and is shared by every vector and matrix laid out on it.

use std::ops::Range;
use std::sync::Arc;

use crate::error::KError;
use crate::parallel::{Comm, UniverseComm};

#[derive(Debug)]
pub struct Distribution {
    /// `offsets[r]..offsets[r + 1]` is the block owned by rank `r`.
    offsets: Vec<usize>,
    comm: Arc<UniverseComm>,
}

/// Block offsets for `n` indices over `p` ranks; the first `n % p` ranks get one extra index.
pub(crate) fn uniform_offsets(n: usize, p: usize) -> Vec<usize> {
    let p = p.max(1);
    let base = n / p;
    let rem = n % p;
    let mut offsets = Vec::with_capacity(p + 1);
    offsets.push(0);
    for r in 0..p {
        let len = base + usize::from(r < rem);
        offsets.push(offsets[r] + len);
    }
    offsets
}

impl Distribution {
    /// Balanced block distribution of `global_size` indices over `comm`.
    pub fn uniform(global_size: usize, comm: Arc<UniverseComm>) -> Self {
        let offsets = uniform_offsets(global_size, comm.size());
        Self { offsets, comm }
    }

    /// Each rank contributes its own block length. Collective.
    pub fn from_local_size(local_size: usize, comm: Arc<UniverseComm>) -> Self {
        let counts = comm.all_gather_counts(local_size);
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0);
        for c in counts {
            offsets.push(offsets[offsets.len() - 1] + c);
        }
        Self { offsets, comm }
    }

    /// Explicit block boundaries: `offsets[0] == 0`, non-decreasing, one entry per rank plus one.
    pub fn from_offsets(offsets: Vec<usize>, comm: Arc<UniverseComm>) -> Result<Self, KError> {
        if offsets.len() != comm.size() + 1 {
            return Err(KError::shape(
                "distribution",
                format!("{} offsets for {} ranks", offsets.len(), comm.size()),
            ));
        }
        if offsets[0] != 0 || offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(KError::shape("distribution", format!("offsets {offsets:?} do not partition the range")));
        }
        Ok(Self { offsets, comm })
    }

    pub fn global_size(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn nprocs(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn offset(&self) -> usize {
        self.offsets[self.rank()]
    }

    pub fn local_size(&self) -> usize {
        let r = self.rank();
        self.offsets[r + 1] - self.offsets[r]
    }

    pub fn local_range(&self) -> Range<usize> {
        self.range_of(self.rank())
    }

    pub fn range_of(&self, rank: usize) -> Range<usize> {
        self.offsets[rank]..self.offsets[rank + 1]
    }

    /// Block length of every rank, by rank.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Rank owning global index `g`.
    pub fn owner(&self, g: usize) -> Option<usize> {
        if g >= self.global_size() {
            return None;
        }
        // last block whose start is <= g; empty blocks share a start with their successor
        Some(self.offsets.partition_point(|&o| o <= g) - 1)
    }

    /// Local position of global index `g`, if this rank owns it.
    pub fn to_local(&self, g: usize) -> Option<usize> {
        let range = self.local_range();
        range.contains(&g).then(|| g - range.start)
    }

    pub fn comm(&self) -> &UniverseComm {
        &self.comm
    }

    pub fn comm_arc(&self) -> &Arc<UniverseComm> {
        &self.comm
    }

    /// True when both describe the same blocks.
    pub fn same_partition(&self, other: &Distribution) -> bool {
        std::ptr::eq(self, other) || self.offsets == other.offsets
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Distribution(global {}, rank {}/{} owns {:?})",
            self.global_size(),
            self.rank(),
            self.nprocs(),
            self.local_range()
        )
    }
}

/// Row and column distributions of a matrix.
#[derive(Debug, Clone)]
pub struct MatrixDistribution {
    row: Arc<Distribution>,
    col: Arc<Distribution>,
}

impl MatrixDistribution {
    pub fn new(row: Arc<Distribution>, col: Arc<Distribution>) -> Self {
        Self { row, col }
    }

    /// Square `n x n` layout with the same uniform distribution for rows and columns.
    pub fn square(n: usize, comm: Arc<UniverseComm>) -> Self {
        let d = Arc::new(Distribution::uniform(n, comm));
        Self { row: Arc::clone(&d), col: d }
    }

    pub fn row(&self) -> &Arc<Distribution> {
        &self.row
    }

    pub fn col(&self) -> &Arc<Distribution> {
        &self.col
    }
}
