//! Greedy priority-driven solver.
//!
//! # Algorithm
//!
//! 1. Canonicalize the problem and start from the locked assignments.
//! 2. Sort requests by priority band (session length), then occurrence
//!    count.
//! 3. For each occurrence, try its planned date, then fallback dates
//!    (bounded by `max_date_trials`); on each date try granularity-aligned
//!    slots in order.
//! 4. For each slot, pick the best free qualified resources and run every
//!    hard constraint; accept the first candidate that passes.
//! 5. A request whose first occurrence cannot be placed is dropped; a
//!    later failing occurrence leaves the earlier ones in place.
//!
//! Deterministic for a given seed and input.
//!
//! # Complexity
//! O(r · o · d · s · c) where r = requests, o = occurrences, d = date
//! trials, s = slots per day, c = constraint checks per candidate.
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling", §3.1 (direct
//! heuristics)

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::placement::{Placer, Rejection};
use super::spreader::{sort_by_priority, OccurrenceSpreader, SlotGenerator};
use crate::api::SolverBackend;
use crate::config::{HeuristicConfig, SolverConfig};
use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::error::ScheduleError;
use crate::models::{
    Assignment, Diagnostics, InfeasibilityReport, OccurrenceKey, Problem, SessionRequest,
    SolveResult,
};
use crate::timeline::ResourceTimeline;

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Every occurrence placed (locked ones included).
    Complete,
    /// Some occurrences placed.
    Partial {
        /// Occurrences newly placed.
        placed: u32,
    },
    /// The request was dropped.
    Dropped,
}

/// Incremental greedy state shared by the heuristic and the solvers that
/// reuse greedy placement (parallel merge repair).
#[derive(Debug)]
pub struct GreedyRun<'a> {
    placer: Placer<'a>,
    spreader: OccurrenceSpreader<'a>,
    slots: SlotGenerator,
    max_date_trials: usize,
    locked: BTreeSet<OccurrenceKey>,
    /// Accepted assignments so far.
    pub solution: Vec<Assignment>,
    /// Bookings of `solution`.
    pub timeline: ResourceTimeline,
    /// Reasons for unplaced occurrences.
    pub report: InfeasibilityReport,
    /// Counters.
    pub diagnostics: Diagnostics,
}

impl<'a> GreedyRun<'a> {
    /// Starts from `initial` (usually the locked assignments).
    pub fn new(
        ctx: ConstraintContext<'a>,
        constraints: &'a ConstraintSet,
        config: &HeuristicConfig,
        initial: Vec<Assignment>,
    ) -> Self {
        let timeline = ResourceTimeline::from_assignments(&initial, &ctx);
        Self {
            placer: Placer::new(ctx, constraints),
            spreader: OccurrenceSpreader::new(ctx.holidays()),
            slots: SlotGenerator::new(config, ctx.institutional_calendar()),
            max_date_trials: config.max_date_trials.max(1),
            locked: initial.iter().map(Assignment::key).collect(),
            solution: initial,
            timeline,
            report: InfeasibilityReport::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    fn accept(&mut self, assignment: Assignment) {
        self.timeline.book(&assignment, self.placer.context());
        self.solution.push(assignment);
    }

    fn remove_request(&mut self, request_id: &str) {
        let (removed, kept): (Vec<Assignment>, Vec<Assignment>) = std::mem::take(&mut self.solution)
            .into_iter()
            .partition(|a| a.request_id == request_id && !self.locked.contains(&a.key()));
        for a in &removed {
            self.timeline.release(a);
        }
        self.solution = kept;
    }

    /// Tries `dates` in order for one occurrence.
    ///
    /// On failure `reasons` holds rejection counts by reason, each with
    /// the first blocking violation seen.
    fn place_occurrence(
        &mut self,
        request: &SessionRequest,
        occurrence_index: u32,
        dates: &[NaiveDate],
        reasons: &mut BTreeMap<String, (usize, Option<Violation>)>,
    ) -> Option<Assignment> {
        for &date in dates {
            for window in self.slots.slots(date, request) {
                self.diagnostics.candidates_evaluated += 1;
                let rejection = match self
                    .placer
                    .try_place(request, occurrence_index, &window, &self.solution, &self.timeline)
                {
                    Ok(a) => return Some(a),
                    Err(rejection) => rejection,
                };
                let entry = reasons.entry(rejection.reason().to_string()).or_insert((0, None));
                entry.0 += 1;
                match rejection {
                    Rejection::Violation(v) if entry.1.is_none() => entry.1 = Some(v),
                    // nothing qualifies at any time
                    Rejection::NoQualifiedResource(_) => return None,
                    _ => {}
                }
            }
        }
        None
    }

    /// Places every unlocked occurrence of `request`.
    pub fn place_request<R: Rng>(&mut self, request: &SessionRequest, rng: &mut R) -> Placement {
        let mut scheduled: Vec<NaiveDate> = self
            .solution
            .iter()
            .filter(|a| a.request_id == request.id)
            .map(Assignment::date)
            .collect();
        let pending: Vec<u32> = (0..request.number_of_occurrences)
            .filter(|i| !self.locked.contains(&(request.id.clone(), *i)))
            .collect();
        if pending.is_empty() {
            return Placement::Complete;
        }

        let candidates = self.spreader.candidate_dates(request);
        if candidates.is_empty() {
            self.report.record("no_candidate_dates");
            self
                .report
                .explain(&request.id, "no date in the window matches the pattern and holidays");
            return Placement::Dropped;
        }
        let planned_dates: Vec<NaiveDate> = self
            .spreader
            .plan(request, &candidates, rng)
            .into_iter()
            .filter(|d| !scheduled.contains(d))
            .collect();
        let mut plan = planned_dates.into_iter();

        let mut placed = 0u32;
        let mut failed = 0u32;
        for (n, &occurrence) in pending.iter().enumerate() {
            let planned = plan.next();
            let dates = self
                .spreader
                .fallback_order(request, &candidates, &scheduled, planned, self.max_date_trials);
            let mut reasons = BTreeMap::new();

            match self.place_occurrence(request, occurrence, &dates, &mut reasons) {
                Some(a) => {
                    scheduled.push(a.date());
                    self.accept(a);
                    placed += 1;
                }
                None => {
                    failed += 1;
                    for (reason, (count, violation)) in &reasons {
                        *self
                            .report
                            .violated_constraints_summary
                            .entry(reason.clone())
                            .or_insert(0) += count;
                        if let Some(v) = violation {
                            if self.report.top_conflicts.len()
                                < InfeasibilityReport::MAX_TOP_CONFLICTS
                            {
                                self.report.top_conflicts.push(v.clone());
                            }
                        }
                    }
                    let dominant = reasons
                        .iter()
                        .max_by(|a, b| (a.1).0.cmp(&(b.1).0).then(b.0.cmp(a.0)))
                        .map_or("no_candidate_dates", |(r, _)| r.as_str());
                    let tried = dates.len();
                    let why =
                        format!("occurrence {occurrence} blocked by {dominant} on {tried} date(s)");
                    self.report.explain(&request.id, why);
                    if n == 0 && scheduled.is_empty() {
                        self.remove_request(&request.id);
                        debug!(request = %request.id, reason = dominant, "request dropped");
                        return Placement::Dropped;
                    }
                }
            }
        }

        debug!(request = %request.id, placed, failed, "request placed");
        if failed == 0 {
            Placement::Complete
        } else {
            Placement::Partial { placed }
        }
    }
}

/// Greedy solver.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use edu_schedule::heuristic::HeuristicSolver;
/// use edu_schedule::models::{Problem, Resource, ResourceType, SessionRequest, SolveStatus};
///
/// let term = (
///     Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
/// );
/// let problem = Problem::new()
///     .with_request(
///         SessionRequest::new("cs101", 90, 6, term.0, term.1)
///             .with_enrollment(30)
///             .with_resource_type(ResourceType::Classroom, 1),
///     )
///     .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));
///
/// let result = HeuristicSolver::new().schedule(&problem, 42, false);
/// assert_eq!(result.status, SolveStatus::Feasible);
/// assert_eq!(result.assignment_count(), 6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeuristicSolver {
    config: SolverConfig,
}

impl HeuristicSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Schedules `problem` with the given seed.
    pub fn schedule(&self, problem: &Problem, seed: u64, fallback: bool) -> SolveResult {
        let started = Instant::now();
        let problem = problem.canonicalized();
        let indices = problem.build_indices();
        let ctx = ConstraintContext::new(&problem, &indices, self.config.constraints);
        let constraints = ConstraintSet::standard(&problem);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        info!(
            event = "solve_start",
            backend = "heuristic",
            seed,
            requests = problem.requests.len(),
            resources = problem.resources.len(),
        );

        let mut run = GreedyRun::new(
            ctx,
            &constraints,
            &self.config.heuristic,
            problem.locked_assignments.clone(),
        );
        for request in sort_by_priority(&problem.requests) {
            run.place_request(request, &mut rng);
        }
        let GreedyRun {
            solution,
            report,
            mut diagnostics,
            ..
        } = run;
        diagnostics.iterations = problem.requests.len() as u64;

        let result = SolveResult::assemble(
            &ctx,
            solution,
            "heuristic",
            seed,
            started.elapsed(),
            diagnostics,
            report,
            fallback,
        );
        info!(
            event = "solve_end",
            backend = "heuristic",
            status = %result.status,
            scheduled = result.assignment_count(),
            unscheduled = result.unscheduled_requests.len(),
            elapsed_ms = result.solve_time_ms,
        );
        result
    }
}

impl SolverBackend for HeuristicSolver {
    fn backend_name(&self) -> &'static str {
        "heuristic"
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
