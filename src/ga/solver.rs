//! Generational GA over whole schedules.
//!
//! # Algorithm
//!
//! 1. Build one individual from a greedy pass (missing occurrences filled
//!    at random) and fill the rest of the population with random
//!    individuals.
//! 2. Each generation: copy the elite fraction unchanged, then breed the
//!    remainder by tournament selection, crossover (`crossover_rate`) and
//!    mutation (`mutation_rate`).
//! 3. Stop after `generations`, or as soon as the best individual has no
//!    hard violations and non-negative fitness.
//! 4. Repair the best individual so the returned schedule never violates
//!    a hard constraint.
//!
//! # Complexity
//! O(g · p · n² · c) where g = generations, p = population size,
//! n = assignments per individual, c = constraints.
//!
//! # Reference
//! Colorni, Dorigo & Maniezzo (1998), "Metaheuristics for High School
//! Timetabling"

use std::collections::BTreeMap;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::chromosome::ScheduleChromosome;
use super::operators::GeneticOperators;
use super::problem::GeneticProblem;
use crate::api::SolverBackend;
use crate::config::SolverConfig;
use crate::constraints::{ConstraintContext, ConstraintSet};
use crate::error::ScheduleError;
use crate::heuristic::{sort_by_priority, GreedyRun};
use crate::models::{
    Assignment, Diagnostics, InfeasibilityReport, OccurrenceKey, Problem, SolveResult,
};

/// Genetic algorithm solver.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use edu_schedule::ga::GeneticSolver;
/// use edu_schedule::config::SolverConfig;
/// use edu_schedule::models::{Problem, Resource, ResourceType, SessionRequest, SolveStatus};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let problem = Problem::new()
///     .with_request(
///         SessionRequest::new("cs101", 90, 4, start, end)
///             .with_resource_type(ResourceType::Classroom, 1),
///     )
///     .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));
///
/// let mut config = SolverConfig::default();
/// config.genetic.population_size = 10;
/// config.genetic.generations = 5;
/// let result = GeneticSolver::with_config(config).schedule(&problem, 42, false);
/// assert_eq!(result.status, SolveStatus::Feasible);
/// assert_eq!(result.backend_used, "genetic");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeneticSolver {
    config: SolverConfig,
    operators: Option<GeneticOperators>,
}

impl GeneticSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            operators: None,
        }
    }

    /// Overrides the operator set; tournament size from config otherwise.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = Some(operators);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn operators(&self) -> GeneticOperators {
        self.operators.clone().unwrap_or_else(|| GeneticOperators {
            tournament_size: self.config.genetic.tournament_size,
            ..GeneticOperators::default()
        })
    }

    fn greedy_seed<R: Rng>(
        &self,
        problem: &Problem,
        ctx: ConstraintContext<'_>,
        constraints: &ConstraintSet,
        gp: &GeneticProblem<'_>,
        rng: &mut R,
    ) -> ScheduleChromosome {
        let mut run = GreedyRun::new(
            ctx,
            constraints,
            &self.config.heuristic,
            problem.locked_assignments.clone(),
        );
        for request in sort_by_priority(&problem.requests) {
            run.place_request(request, rng);
        }
        let locked: std::collections::BTreeSet<OccurrenceKey> =
            problem.locked_assignments.iter().map(Assignment::key).collect();
        let mut genes: BTreeMap<String, Vec<Assignment>> = BTreeMap::new();
        for a in run.solution.into_iter().filter(|a| !locked.contains(&a.key())) {
            genes.entry(a.request_id.clone()).or_default().push(a);
        }
        gp.fill_missing(genes, rng)
    }

    /// Schedules `problem` with the given seed.
    pub fn schedule(&self, problem: &Problem, seed: u64, fallback: bool) -> SolveResult {
        let started = Instant::now();
        let problem = problem.canonicalized();
        let indices = problem.build_indices();
        let ctx = ConstraintContext::new(&problem, &indices, self.config.constraints);
        let constraints = ConstraintSet::standard(&problem);
        let settings = &self.config.genetic;
        let ops = self.operators();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        info!(
            event = "solve_start",
            backend = "genetic",
            seed,
            requests = problem.requests.len(),
            population = settings.population_size,
            generations = settings.generations,
        );

        let gp = GeneticProblem::new(ctx, &constraints, &self.config.heuristic, settings);
        let size = settings.population_size.max(2);
        let elites = ((size as f64 * settings.elite_fraction).round() as usize).clamp(1, size);

        let mut population = Vec::with_capacity(size);
        population.push(self.greedy_seed(&problem, ctx, &constraints, &gp, &mut rng));
        while population.len() < size {
            population.push(ScheduleChromosome::random(&gp, &mut rng));
        }
        for individual in &mut population {
            gp.evaluate(individual);
        }
        let mut evaluations = population.len() as u64;

        let mut generation = 0;
        loop {
            population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
            let best = &population[0];
            debug!(generation, best_fitness = best.fitness, best_violations = best.violations);
            if (best.is_conflict_free() && best.fitness >= 0.0)
                || generation >= settings.generations
            {
                break;
            }

            let mut next: Vec<ScheduleChromosome> = population[..elites].to_vec();
            while next.len() < size {
                let p1 = &population[ops.select(&population, &mut rng)];
                let p2 = &population[ops.select(&population, &mut rng)];
                let (c1, c2) = if rng.random_bool(settings.crossover_rate) {
                    ops.crossover(p1, p2, &mut rng)
                } else {
                    (p1.clone(), p2.clone())
                };
                for mut child in [c1, c2] {
                    if next.len() >= size {
                        break;
                    }
                    if rng.random_bool(settings.mutation_rate) {
                        ops.mutate(&mut child, &gp, &mut rng);
                    }
                    gp.evaluate(&mut child);
                    evaluations += 1;
                    next.push(child);
                }
            }
            population = next;
            generation += 1;
        }

        let best = &population[0];
        let (solution, dropped) = gp.repair(best);
        let mut report = InfeasibilityReport::default();
        for v in &dropped {
            report.record_violation(v);
        }
        let stuck = gp
            .templates
            .values()
            .filter(|t| !t.pending.is_empty() && !t.is_encodable());
        for template in stuck {
            let reason = if template.candidate_dates.is_empty() {
                "no_candidate_dates"
            } else {
                "no_qualified_resource"
            };
            report.record(reason);
            report.explain(&template.request_id, reason.replace('_', " "));
        }

        let mut diagnostics = Diagnostics {
            candidates_evaluated: evaluations,
            iterations: generation as u64,
            residual_violations: best.violations,
            ..Diagnostics::default()
        };
        diagnostics.note("best_fitness", format!("{:.3}", best.fitness));
        diagnostics.note("repair_dropped", dropped.len());

        let result = SolveResult::assemble(
            &ctx,
            solution,
            "genetic",
            seed,
            started.elapsed(),
            diagnostics,
            report,
            fallback,
        );
        info!(
            event = "solve_end",
            backend = "genetic",
            status = %result.status,
            generations = generation,
            scheduled = result.assignment_count(),
            unscheduled = result.unscheduled_requests.len(),
            elapsed_ms = result.solve_time_ms,
        );
        result
    }
}

impl SolverBackend for GeneticSolver {
    fn backend_name(&self) -> &'static str {
        "genetic"
    }

    fn solve(
        &self,
        problem: &Problem,
        seed: u64,
        fallback: bool,
    ) -> Result<SolveResult, ScheduleError> {
        Ok(self.schedule(problem, seed, fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Resource, ResourceType, SessionRequest, SolveStatus};
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn small_config() -> SolverConfig {
        let mut config = SolverConfig::default();
        config.genetic.population_size = 12;
        config.genetic.generations = 10;
        config
    }

    fn room_request(id: &str, occurrences: u32) -> SessionRequest {
        SessionRequest::new(id, 90, occurrences, utc(1, 15, 0), utc(3, 15, 0))
            .with_enrollment(30)
            .with_resource_type(ResourceType::Classroom, 1)
    }

    #[test]
    fn test_genetic_schedules_without_violations() {
        let problem = Problem::new()
            .with_request(room_request("a", 6))
            .with_request(room_request("b", 4))
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));

        let result = GeneticSolver::with_config(small_config()).schedule(&problem, 42, false);
        assert_eq!(result.status, SolveStatus::Feasible);
        assert_eq!(result.assignment_count(), 10);
        assert_eq!(result.backend_used, "genetic");

        let canonical = problem.canonicalized();
        let indices = canonical.build_indices();
        let ctx = ConstraintContext::new(&canonical, &indices, SolverConfig::default().constraints);
        assert!(ConstraintSet::standard(&canonical).is_valid(&result.assignments, &ctx));
    }

    #[test]
    fn test_genetic_keeps_locked() {
        let locked = Assignment::new(
            "a",
            0,
            utc(1, 16, 9),
            utc(1, 16, 10) + chrono::Duration::minutes(30),
        )
            .with_resource(ResourceType::Classroom, "R1");
        let problem = Problem::new()
            .with_request(room_request("a", 3))
            .with_request(room_request("b", 3))
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40))
            .with_locked(locked.clone());

        let result = GeneticSolver::with_config(small_config()).schedule(&problem, 42, false);
        assert!(result.assignments.contains(&locked));
        assert_eq!(result.assignments_for_request("a").len(), 3);
    }

    #[test]
    fn test_genetic_reports_unencodable_request() {
        let problem = Problem::new()
            .with_request(room_request("a", 2))
            .with_request(
                SessionRequest::new("lab", 60, 2, utc(1, 15, 0), utc(3, 15, 0))
                    .with_resource_type(ResourceType::Equipment, 1),
            )
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));

        let result = GeneticSolver::with_config(small_config()).schedule(&problem, 42, false);
        assert_eq!(result.status, SolveStatus::Partial);
        assert_eq!(result.unscheduled_requests, vec!["lab".to_string()]);
        let report = result.infeasibility_report.unwrap();
        assert!(report.violated_constraints_summary.contains_key("no_qualified_resource"));
    }

    #[test]
    fn test_genetic_deterministic() {
        let problem = Problem::new()
            .with_request(room_request("a", 4))
            .with_request(room_request("b", 4))
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40))
            .with_resource(Resource::new("R2", ResourceType::Classroom).with_capacity(40));
        let solver = GeneticSolver::with_config(small_config());
        let r1 = solver.schedule(&problem, 7, false);
        let r2 = solver.schedule(&problem, 7, false);
        assert_eq!(r1.assignments, r2.assignments);
    }
}
