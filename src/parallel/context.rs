//! Shared state for parallel solving.
//!
//! Holds the best solution found so far behind a `parking_lot::Mutex`,
//! with a lock-free copy of its placed count for cheap "can this win?"
//! checks, plus the iteration counter, clock and cancellation flag that
//! every worker polls between work items.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::ParallelConfig;
use crate::models::{Assignment, InfeasibilityReport};

/// Quality of a worker solution; compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionScore {
    /// Occurrences placed (locked included).
    pub placed: usize,
    /// Weighted objective score, 0 without objectives.
    pub objective: f64,
}

impl SolutionScore {
    /// Strictly better: more placed, then higher objective.
    pub fn beats(&self, other: &Self) -> bool {
        self.placed > other.placed
            || (self.placed == other.placed && self.objective > other.objective + 1e-12)
    }
}

/// One worker's complete solution.
#[derive(Debug, Clone)]
pub struct WorkerSolution {
    /// Worker index; lower wins ties.
    pub worker: usize,
    /// Seed the worker ran with.
    pub seed: u64,
    pub score: SolutionScore,
    pub assignments: Vec<Assignment>,
    pub report: InfeasibilityReport,
}

impl WorkerSolution {
    /// Better score, or equal score and lower worker index.
    pub fn outranks(&self, other: &Self) -> bool {
        self.score.beats(&other.score)
            || (!other.score.beats(&self.score) && self.worker < other.worker)
    }
}

/// Thread-safe solve context.
#[derive(Debug)]
pub struct ParallelContext {
    best: Mutex<Option<WorkerSolution>>,
    best_placed: AtomicU64,
    iterations: AtomicU64,
    cancelled: AtomicBool,
    started: Instant,
    timeout: Option<Duration>,
    max_iterations: Option<u64>,
}

impl ParallelContext {
    pub fn new(timeout: Option<Duration>, max_iterations: Option<u64>) -> Self {
        Self {
            best: Mutex::new(None),
            best_placed: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            started: Instant::now(),
            timeout,
            max_iterations,
        }
    }

    pub fn from_config(config: &ParallelConfig) -> Self {
        Self::new(config.timeout(), config.max_iterations)
    }

    /// Installs `candidate` if it outranks the current best.
    pub fn offer(&self, candidate: WorkerSolution) -> bool {
        // cannot win on placed count alone
        if (candidate.score.placed as u64) < self.best_placed.load(Ordering::Relaxed) {
            return false;
        }
        let mut best = self.best.lock();
        let install = best.as_ref().map_or(true, |current| candidate.outranks(current));
        if install {
            self.best_placed.store(candidate.score.placed as u64, Ordering::Relaxed);
            *best = Some(candidate);
        }
        install
    }

    /// Clone of the current best.
    pub fn best(&self) -> Option<WorkerSolution> {
        self.best.lock().clone()
    }

    /// Placed count of the current best (lock-free).
    pub fn best_placed(&self) -> usize {
        self.best_placed.load(Ordering::Relaxed) as usize
    }

    /// Counts one processed work item; returns the new total.
    pub fn increment_iterations(&self) -> u64 {
        self.iterations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Asks every worker to stop at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancelled, out of time, or out of iterations.
    pub fn should_stop(&self) -> bool {
        self.is_cancelled()
            || self.timeout.is_some_and(|t| self.elapsed() >= t)
            || self.max_iterations.is_some_and(|m| self.iterations() >= m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(worker: usize, placed: usize, objective: f64) -> WorkerSolution {
        WorkerSolution {
            worker,
            seed: worker as u64,
            score: SolutionScore { placed, objective },
            assignments: Vec::new(),
            report: InfeasibilityReport::default(),
        }
    }

    #[test]
    fn test_offer_keeps_best() {
        let ctx = ParallelContext::new(None, None);
        assert!(ctx.offer(solution(2, 5, 0.0)));
        assert!(!ctx.offer(solution(1, 4, 0.9)));
        assert!(ctx.offer(solution(3, 5, 0.5)));
        // equal score: lower worker wins
        assert!(ctx.offer(solution(0, 5, 0.5)));
        assert!(!ctx.offer(solution(4, 5, 0.5)));
        let best = ctx.best().unwrap();
        assert_eq!(best.worker, 0);
        assert_eq!(ctx.best_placed(), 5);
    }

    #[test]
    fn test_concurrent_offers() {
        let ctx = ParallelContext::new(None, None);
        rayon::scope(|s| {
            for w in 0..8 {
                let ctx = &ctx;
                s.spawn(move |_| {
                    ctx.offer(solution(w, w * 10, 0.0));
                    for _ in 0..100 {
                        ctx.increment_iterations();
                    }
                });
            }
        });
        assert_eq!(ctx.best().unwrap().worker, 7);
        assert_eq!(ctx.iterations(), 800);
    }

    #[test]
    fn test_stop_conditions() {
        let ctx = ParallelContext::new(None, Some(2));
        assert!(!ctx.should_stop());
        ctx.increment_iterations();
        ctx.increment_iterations();
        assert!(ctx.should_stop());

        let ctx = ParallelContext::new(Some(Duration::ZERO), None);
        assert!(ctx.should_stop());

        let ctx = ParallelContext::new(None, None);
        ctx.cancel();
        assert!(ctx.should_stop());
    }
}
