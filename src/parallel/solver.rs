//! Portfolio solver on a rayon worker pool.
//!
//! # Algorithm
//!
//! 1. **Portfolio**: `num_workers` greedy runs, each with its own seed.
//!    Worker 0 keeps the plain priority order (and so reproduces the
//!    heuristic solve); the others shuffle requests within each priority
//!    band. Finished runs are offered to the shared [`ParallelContext`].
//! 2. **Merge**: worker solutions are combined with the configured
//!    [`MergeStrategy`].
//! 3. **Fill**: occurrences still missing are retried over the full
//!    (resource × slot) candidate space with
//!    [`ParallelAssignmentGenerator`].
//! 4. **Verify**: [`ParallelConstraintChecker`] re-checks the final
//!    solution; anything found is reported as residual violations.
//!
//! Timeouts, iteration caps and cancellation are polled between requests
//! and between date blocks; a stopped solve returns what it has.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use super::checker::ParallelConstraintChecker;
use super::context::{ParallelContext, SolutionScore, WorkerSolution};
use super::generator::ParallelAssignmentGenerator;
use super::merger::ParallelSolutionMerger;
use crate::api::SolverBackend;
use crate::config::SolverConfig;
use crate::constraints::{weighted_objective_score, ConstraintContext, ConstraintSet};
use crate::error::ScheduleError;
use crate::heuristic::{
    priority_score, sort_by_priority, GreedyRun, OccurrenceSpreader, Placer, SlotGenerator,
};
use crate::models::{Assignment, Diagnostics, Problem, SessionRequest, SolveResult};
use crate::timeline::ResourceTimeline;

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Parallel portfolio solver.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use edu_schedule::config::SolverConfig;
/// use edu_schedule::models::{Problem, Resource, ResourceType, SessionRequest, SolveStatus};
/// use edu_schedule::parallel::ParallelSolver;
///
/// let (start, end) = (
///     Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
/// );
/// let problem = Problem::new()
///     .with_request(
///         SessionRequest::new("cs101", 90, 4, start, end)
///             .with_resource_type(ResourceType::Classroom, 1),
///     )
///     .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));
///
/// let solver = ParallelSolver::with_config(SolverConfig::default().with_workers(2));
/// let result = solver.schedule(&problem, 7, false).unwrap();
/// assert_eq!(result.status, SolveStatus::Feasible);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParallelSolver {
    config: SolverConfig,
}

impl ParallelSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn build_pool(&self) -> Result<Arc<ThreadPool>, ScheduleError> {
        ThreadPoolBuilder::new()
            .num_threads(self.config.parallel.num_workers.max(1))
            .thread_name(|i| format!("edu-schedule-worker-{i}"))
            .build()
            .map(Arc::new)
            .map_err(|e| ScheduleError::backend("parallel", e.to_string()))
    }

    fn run_worker(
        &self,
        worker: usize,
        seed: u64,
        ctx: ConstraintContext<'_>,
        constraints: &ConstraintSet,
        ordered: &[&SessionRequest],
        pctx: &ParallelContext,
    ) -> WorkerSolution {
        let worker_seed = seed.wrapping_add((worker as u64).wrapping_mul(SEED_STRIDE));
        let mut rng = ChaCha8Rng::seed_from_u64(worker_seed);
        let mut order = ordered.to_vec();
        if worker > 0 {
            order.shuffle(&mut rng);
            order.sort_by_key(|r| Reverse(priority_score(r)));
        }

        let mut run = GreedyRun::new(
            ctx,
            constraints,
            &self.config.heuristic,
            ctx.problem.locked_assignments.clone(),
        );
        for request in order {
            if pctx.should_stop() {
                break;
            }
            pctx.increment_iterations();
            run.place_request(request, &mut rng);
        }

        let score = SolutionScore {
            placed: run.solution.len(),
            objective: weighted_objective_score(&ctx.problem.objectives, &run.solution, &ctx)
                .unwrap_or(0.0),
        };
        debug!(worker, seed = worker_seed, placed = score.placed, "worker finished");
        let solution = WorkerSolution {
            worker,
            seed: worker_seed,
            score,
            assignments: run.solution,
            report: run.report,
        };
        pctx.offer(solution.clone());
        solution
    }

    /// Retries missing occurrences over the full candidate space.
    /// Returns how many were placed.
    #[allow(clippy::too_many_arguments)]
    fn fill_missing(
        &self,
        ctx: ConstraintContext<'_>,
        constraints: &ConstraintSet,
        ordered: &[&SessionRequest],
        generator: &ParallelAssignmentGenerator,
        solution: &mut Vec<Assignment>,
        pctx: &ParallelContext,
    ) -> usize {
        let placer = Placer::new(ctx, constraints);
        let spreader = OccurrenceSpreader::new(ctx.holidays());
        let slots = SlotGenerator::new(&self.config.heuristic, ctx.institutional_calendar());
        let mut timeline = ResourceTimeline::from_assignments(solution.iter(), &ctx);
        let mut filled = 0;

        for request in ordered {
            if pctx.should_stop() {
                break;
            }
            let present: BTreeSet<u32> = solution
                .iter()
                .filter(|a| a.request_id == request.id)
                .map(|a| a.occurrence_index)
                .collect();
            let missing: Vec<u32> = (0..request.number_of_occurrences)
                .filter(|i| !present.contains(i))
                .collect();
            if missing.is_empty() {
                continue;
            }
            let candidates = spreader.candidate_dates(request);
            if candidates.is_empty() {
                continue;
            }
            for occurrence in missing {
                let scheduled: Vec<_> = solution
                    .iter()
                    .filter(|a| a.request_id == request.id)
                    .map(Assignment::date)
                    .collect();
                let dates =
                    spreader.fallback_order(
                        request,
                        &candidates,
                        &scheduled,
                        None,
                        self.config.heuristic.max_date_trials,
                    );
                let Some(best) =
                    generator.best(
                        &placer,
                        &slots,
                        request,
                        occurrence,
                        &dates,
                        solution.as_slice(),
                        &timeline,
                        pctx,
                    )
                else {
                    // later occurrences see the same dates
                    break;
                };
                debug!(request = %request.id, occurrence, score = best.score, "occurrence filled");
                timeline.book(&best.assignment, &ctx);
                solution.push(best.assignment);
                filled += 1;
            }
        }
        filled
    }

    /// Schedules `problem` with the given seed.
    pub fn schedule(
        &self,
        problem: &Problem,
        seed: u64,
        fallback: bool,
    ) -> Result<SolveResult, ScheduleError> {
        let started = Instant::now();
        let problem = problem.canonicalized();
        let indices = problem.build_indices();
        let ctx = ConstraintContext::new(&problem, &indices, self.config.constraints);
        let constraints = ConstraintSet::standard(&problem);
        let cfg = &self.config.parallel;

        info!(
            event = "solve_start",
            backend = "parallel",
            seed,
            workers = cfg.num_workers,
            merge_strategy = %cfg.merge_strategy,
            requests = problem.requests.len(),
            resources = problem.resources.len(),
        );

        let pool = self.build_pool()?;
        let pctx = ParallelContext::from_config(cfg);
        let ordered = sort_by_priority(&problem.requests);

        let workers: Vec<WorkerSolution> = pool.install(|| {
            (0..cfg.num_workers.max(1))
                .into_par_iter()
                .map(|w| self.run_worker(w, seed, ctx, &constraints, &ordered, &pctx))
                .collect()
        });

        let merger = ParallelSolutionMerger::new(ctx, &constraints);
        let mut solution = merger.merge(cfg.merge_strategy, &workers);
        let mut report = pctx.best().map(|w| w.report).unwrap_or_default();

        let generator = ParallelAssignmentGenerator::new(Arc::clone(&pool), cfg.chunk_size);
        let filled = self
            .fill_missing(ctx, &constraints, &ordered, &generator, &mut solution, &pctx);

        let checker = ParallelConstraintChecker::new(Arc::clone(&pool), cfg.chunk_size);
        let residual = checker.violations_in(&constraints, &solution, &ctx);
        for v in &residual {
            report.record_violation(v);
        }

        let mut diagnostics = Diagnostics {
            iterations: pctx.iterations(),
            residual_violations: residual.len(),
            ..Diagnostics::default()
        };
        diagnostics.note("workers", workers.len());
        diagnostics.note("merge_strategy", cfg.merge_strategy);
        if let Some(best) = pctx.best() {
            diagnostics.note("best_worker", best.worker);
        }
        diagnostics.note("filled", filled);
        if pctx.should_stop() {
            diagnostics.note("stopped_early", true);
        }

        let result = SolveResult::assemble(
            &ctx,
            solution,
            "parallel",
            seed,
            started.elapsed(),
            diagnostics,
            report,
            fallback,
        );
        info!(
            event = "solve_end",
            backend = "parallel",
            status = %result.status,
            scheduled = result.assignment_count(),
            unscheduled = result.unscheduled_requests.len(),
            iterations = pctx.iterations(),
            elapsed_ms = result.solve_time_ms,
        );
        Ok(result)
    }
}

impl SolverBackend for ParallelSolver {
    fn backend_name(&self) -> &'static str {
        "parallel"
    }

    fn solve(
        &self,
        problem: &Problem,
        seed: u64,
        fallback: bool,
    ) -> Result<SolveResult, ScheduleError> {
        self.schedule(problem, seed, fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::HeuristicSolver;
    use crate::models::{Resource, ResourceType, SolveStatus};
    use crate::parallel::MergeStrategy;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn term_problem() -> Problem {
        let mut p = Problem::new()
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(50))
            .with_resource(Resource::new("R2", ResourceType::Classroom).with_capacity(35));
        for (i, minutes) in [120, 90, 60, 60, 180].iter().enumerate() {
            p = p.with_request(
                SessionRequest::new(format!("c{i}"), *minutes, 6, utc(1, 15, 0), utc(3, 15, 0))
                    .with_enrollment(30)
                    .with_resource_type(ResourceType::Classroom, 1),
            );
        }
        p
    }

    fn solver(strategy: MergeStrategy) -> ParallelSolver {
        let mut config = SolverConfig::default().with_workers(3);
        config.parallel.merge_strategy = strategy;
        ParallelSolver::with_config(config)
    }

    #[test]
    fn test_all_strategies_feasible_and_valid() {
        let problem = term_problem();
        let strategies = [
            MergeStrategy::Best,
            MergeStrategy::Union,
            MergeStrategy::BestConflictFree,
        ];
        for strategy in strategies {
            let result = solver(strategy).schedule(&problem, 42, false).unwrap();
            assert_eq!(result.status, SolveStatus::Feasible, "{strategy}");
            assert_eq!(result.assignment_count(), 30);
            assert_eq!(result.diagnostics.residual_violations, 0);
            assert_eq!(result.backend_used, "parallel");
        }
    }

    #[test]
    fn test_at_least_as_good_as_heuristic() {
        let start = utc(1, 15, 9);
        let end = utc(1, 15, 11);
        let problem = Problem::new()
            .with_request(
                SessionRequest::new("a", 120, 1, start, end)
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_request(
                SessionRequest::new("b", 120, 1, start, end)
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(30));

        let greedy = HeuristicSolver::new().schedule(&problem, 42, false);
        let parallel = solver(MergeStrategy::Union).schedule(&problem, 42, false).unwrap();
        assert_eq!(parallel.status, SolveStatus::Partial);
        assert!(parallel.assignment_count() >= greedy.assignment_count());
        assert_eq!(parallel.unscheduled_requests.len(), 1);
    }

    #[test]
    fn test_locked_preserved_and_deterministic() {
        let locked = Assignment::new("c0", 0, utc(1, 16, 9), utc(1, 16, 11))
            .with_resource(ResourceType::Classroom, "R1");
        let problem = term_problem().with_locked(locked.clone());
        let a = solver(MergeStrategy::BestConflictFree).schedule(&problem, 9, false).unwrap();
        let b = solver(MergeStrategy::BestConflictFree).schedule(&problem, 9, false).unwrap();
        assert!(a.assignments.contains(&locked));
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn test_iteration_cap_stops_early() {
        let mut config = SolverConfig::default().with_workers(2);
        config.parallel.max_iterations = Some(1);
        let result = ParallelSolver::with_config(config)
            .schedule(&term_problem(), 1, false)
            .unwrap();
        assert_eq!(result.diagnostics.notes.get("stopped_early").map(String::as_str), Some("true"));
        assert_ne!(result.status, SolveStatus::Feasible);
    }
}
