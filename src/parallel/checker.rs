//! Chunked constraint checking on a worker pool.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::models::Assignment;

/// Checks candidate assignments in parallel chunks.
///
/// Violations come back in candidate order regardless of which worker
/// handled which chunk.
#[derive(Debug, Clone)]
pub struct ParallelConstraintChecker {
    pool: Arc<ThreadPool>,
    chunk_size: usize,
}

impl ParallelConstraintChecker {
    pub fn new(pool: Arc<ThreadPool>, chunk_size: usize) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Every violation of every candidate against `solution`.
    pub fn check(
        &self,
        constraints: &ConstraintSet,
        candidates: &[Assignment],
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Violation> {
        let chunk_size = self.chunk_size;
        self.pool.install(|| {
            candidates
                .par_chunks(chunk_size)
                .enumerate()
                .flat_map_iter(|(i, chunk)| {
                    let found: Vec<Violation> = chunk
                        .iter()
                        .flat_map(|a| constraints.check_all(a, solution, ctx))
                        .collect();
                    debug!(
                        chunk = i,
                        size = chunk.len(),
                        violations = found.len(),
                        "chunk checked"
                    );
                    found
                })
                .collect()
        })
    }

    /// Violations within a complete solution.
    pub fn violations_in(
        &self,
        constraints: &ConstraintSet,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Violation> {
        self.check(constraints, solution, solution, ctx)
    }

    /// Candidates passing every constraint, in input order.
    pub fn feasible<'c>(
        &self,
        constraints: &ConstraintSet,
        candidates: &'c [Assignment],
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<&'c Assignment> {
        let chunk_size = self.chunk_size;
        self.pool.install(|| {
            candidates
                .par_chunks(chunk_size)
                .flat_map_iter(|chunk| {
                    chunk
                        .iter()
                        .filter(|a| constraints.check(a, solution, ctx).is_none())
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }
}
