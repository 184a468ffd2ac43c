//! Worker group and collective operations
//!
//! The subsetting core runs SPMD-style over a fixed group of cooperating
//! workers, one logical rank per thread of a dedicated Rayon pool. Distributed
//! arrays are block-partitioned across the ranks and every cross-rank
//! operation (reduction, prefix sum, barrier) is *collective*: it must be
//! entered by all ranks of the group together. Collective calls only ever
//! happen inside a [`ProcessGroup::run`] episode, which runs the same closure
//! once on every rank and joins them all before returning.
//!
//! Calling a collective from a subset of ranks deadlocks the group, so
//! episodes never branch into a collective on rank-local state.

use crate::errors::{Result, SubsetError};
use rayon::ThreadPoolBuilder;
use std::sync::{Barrier, Mutex};

/// A fixed-size group of cooperating workers.
///
/// The pool is dedicated to this group so that a broadcast episode always has
/// exactly one thread per rank.
pub struct ProcessGroup {
    pool: rayon::ThreadPool,
    nprocs: usize,
}

impl ProcessGroup {
    /// Create a group of `nprocs` workers backed by a dedicated thread pool.
    pub fn new(nprocs: usize) -> Result<Self> {
        if nprocs == 0 {
            return Err(SubsetError::GroupError(
                "worker group must have at least one rank".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(nprocs)
            .thread_name(|i| format!("parasub-rank-{}", i))
            .build()
            .map_err(|e| {
                SubsetError::GroupError(format!(
                    "Failed to initialize worker group with {} ranks: {}",
                    nprocs, e
                ))
            })?;
        Ok(Self { pool, nprocs })
    }

    /// Create a group with one rank per available CPU core.
    pub fn all_cores() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    /// Number of ranks in the group.
    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    /// Run one SPMD episode: `f` executes once on every rank, concurrently,
    /// and the call returns only after all ranks have finished. Returns one
    /// result per rank, in rank order.
    pub fn run<F, T>(&self, f: F) -> Vec<T>
    where
        F: Fn(&Comm) -> T + Sync,
        T: Send,
    {
        let coll = Collectives::new(self.nprocs);
        self.pool.broadcast(|ctx| {
            let comm = Comm {
                rank: ctx.index(),
                nprocs: self.nprocs,
                coll: &coll,
            };
            f(&comm)
        })
    }
}

/// Shared state backing the collectives of a single episode.
struct Collectives {
    barrier: Barrier,
    slots: Mutex<Vec<i64>>,
}

impl Collectives {
    fn new(nprocs: usize) -> Self {
        Self {
            barrier: Barrier::new(nprocs),
            slots: Mutex::new(vec![0; nprocs]),
        }
    }
}

/// Per-rank handle to the group within one episode.
///
/// All methods other than `rank`/`nprocs` are collective.
pub struct Comm<'a> {
    rank: usize,
    nprocs: usize,
    coll: &'a Collectives,
}

impl Comm<'_> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    /// Block until every rank of the group reaches this call.
    pub fn barrier(&self) {
        self.coll.barrier.wait();
    }

    /// Collective gather: every rank contributes one value, every rank
    /// receives the full table in rank order.
    pub fn gather(&self, value: i64) -> Vec<i64> {
        {
            let mut slots = lock(&self.coll.slots);
            slots[self.rank] = value;
        }
        self.barrier();
        let table = lock(&self.coll.slots).clone();
        // keep the slot table stable until every rank has read it
        self.barrier();
        table
    }

    /// Collective sum reduction over one value per rank.
    pub fn all_reduce_sum(&self, value: i64) -> i64 {
        self.gather(value).iter().sum()
    }

    /// Collective exclusive prefix sum: returns this rank's base (sum of the
    /// values contributed by lower ranks) and the group total.
    pub fn exclusive_scan(&self, value: i64) -> (i64, i64) {
        let table = self.gather(value);
        let base = table[..self.rank].iter().sum();
        let total = table.iter().sum();
        (base, total)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Group-fatal abort path.
///
/// A failure inside a collective region leaves the group without lockstep, so
/// the only safe response is to terminate every rank at once.
pub fn group_abort(message: &str) -> ! {
    eprintln!("parasub: group-fatal error: {}", message);
    std::process::abort();
}

/// Near-even contiguous block partition of `total` elements over `nprocs`
/// ranks. The first `total % nprocs` ranks hold one extra element, so the
/// union of all patches covers the index space exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDist {
    total: i64,
    nprocs: usize,
}

impl BlockDist {
    pub fn new(total: i64, nprocs: usize) -> Self {
        debug_assert!(total >= 0);
        debug_assert!(nprocs > 0);
        Self { total, nprocs }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    /// First global index owned by `rank`.
    pub fn lo(&self, rank: usize) -> i64 {
        let base = self.total / self.nprocs as i64;
        let rem = self.total % self.nprocs as i64;
        let r = rank as i64;
        if r < rem {
            r * (base + 1)
        } else {
            rem * (base + 1) + (r - rem) * base
        }
    }

    /// One past the last global index owned by `rank`.
    pub fn hi(&self, rank: usize) -> i64 {
        self.lo(rank) + self.local_len(rank)
    }

    /// Number of elements owned by `rank`.
    pub fn local_len(&self, rank: usize) -> i64 {
        let base = self.total / self.nprocs as i64;
        let rem = self.total % self.nprocs as i64;
        if (rank as i64) < rem {
            base + 1
        } else {
            base
        }
    }

    /// Owning rank of a global index.
    pub fn rank_of(&self, index: i64) -> usize {
        debug_assert!(index >= 0 && index < self.total);
        let base = self.total / self.nprocs as i64;
        let rem = self.total % self.nprocs as i64;
        let split = rem * (base + 1);
        if index < split {
            (index / (base + 1)) as usize
        } else {
            (rem + (index - split) / base) as usize
        }
    }
}
