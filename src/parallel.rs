//! Worker pool the reasoner's term and variable phases run on.
//!
//! `num_threads == 0` auto-sizes to the host's CPU count, the same
//! auto-sizing convention other batch-parallel runners in this ecosystem use
//! for their own `rayon::ThreadPoolBuilder` setup; everything else here is
//! block-chunking glue specific to the reasoner's bulk-synchronous
//! term/variable phases.

use problemo::{Problem, ProblemResult};
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::E;
use crate::error::AdmmError;

/// Thin wrapper around a `rayon::ThreadPool` sized per `admm.num_threads`,
/// plus the two chunked-iteration shapes the ADMM phases need.
pub struct ParallelPool {
    pool: ThreadPool,
    num_threads: usize,
}

impl ParallelPool {
    /// `requested == 0` auto-sizes to [`num_cpus::get`].
    pub fn build(requested: usize) -> Result<Self, Problem> {
        let num_threads = if requested == 0 {
            num_cpus::get()
        } else {
            requested
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .via(AdmmError::Pool(format!(
                "could not start {num_threads} rayon workers"
            )))?;
        Ok(Self { pool, num_threads })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Runs `f` once per `chunk_size`-sized chunk of `items`, in parallel,
    /// mutating each chunk in place. Used for the term phase, where every
    /// term's `update_lagrange`/`minimize` only touches that term's own
    /// local variables.
    pub fn for_each_chunk_mut<T, F>(&self, items: &mut [T], chunk_size: usize, f: F)
    where
        T: Send,
        F: Fn(&mut [T]) + Sync,
    {
        self.pool.install(|| {
            items.par_chunks_mut(chunk_size.max(1)).for_each(|chunk| f(chunk));
        });
    }

    /// Runs `f` once per global index `g` over `[0, num_globals)`, in
    /// parallel, folding per-`g` results with `reduce` under `op`. Used for
    /// the variable phase, where consensus projection and residual
    /// accumulation for a given `g` only ever depend on that `g`'s own
    /// incoming locals.
    pub fn for_each_global_reduce<R, F, Op>(&self, num_globals: usize, identity: R, f: F, op: Op) -> R
    where
        R: Copy + Send,
        F: Fn(usize) -> R + Sync,
        Op: Fn(R, R) -> R + Sync + Send,
    {
        self.pool
            .install(|| (0..num_globals).into_par_iter().map(f).reduce(|| identity, op))
    }

    /// Like [`ParallelPool::for_each_global_reduce`], but `f` also computes
    /// the new value for `z[g]`, which is written in place. Used for the
    /// variable phase: each index is independent, so writing `z[g]` and
    /// folding that index's residual contribution happen in the same pass.
    pub fn for_each_global_mut_reduce<R, F, Op>(&self, z: &mut [f32], identity: R, f: F, op: Op) -> R
    where
        R: Copy + Send,
        F: Fn(usize, f32) -> (f32, R) + Sync,
        Op: Fn(R, R) -> R + Sync + Send,
    {
        self.pool.install(|| {
            z.par_iter_mut()
                .enumerate()
                .map(|(g, z_g)| {
                    let (new_z, r) = f(g, *z_g);
                    *z_g = new_z;
                    r
                })
                .reduce(|| identity, op)
        })
    }
}

/// Picks a chunk size that gives the pool roughly `4x` more chunks than
/// threads, so a few unevenly-sized terms don't stall the whole phase
/// behind one lagging worker.
pub fn block_size(total: usize, num_threads: usize) -> usize {
    if total == 0 || num_threads == 0 {
        return total.max(1);
    }
    (total / (num_threads * 4).max(1)).max(1)
}
