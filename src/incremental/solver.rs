//! Incremental add / remove / move on a live schedule.
//!
//! Each operation touches only the occurrences it changes; the rest of
//! the schedule is never re-solved. Operations that would leave the
//! schedule with a new hard violation are rolled back.
//!
//! # Complexity
//! `add_course`: O(o · a · c) where o = occurrences, a = `max_attempts`,
//! c = constraint checks. `move_assignment` / `remove_course`: O(n)
//! for the state update plus one constraint pass.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

use super::state::IncrementalState;
use crate::api::SolverBackend;
use crate::config::SolverConfig;
use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::error::ScheduleError;
use crate::heuristic::{priority_score, sort_by_priority, OccurrenceSpreader, Placer, SlotGenerator};
use crate::models::{
    Assignment, Diagnostics, InfeasibilityReport, OccurrenceKey, Problem, ProblemIndices,
    ResourceType, SessionRequest, SolveResult, TimeWindow,
};
use crate::validation::ValidationError;

/// Resource ids by type.
pub type ResourceMap = BTreeMap<ResourceType, BTreeSet<String>>;

/// Incremental operation failure. The schedule is unchanged.
#[derive(Debug, Error)]
pub enum IncrementalError {
    #[error("request '{0}' not found")]
    RequestNotFound(String),

    #[error("occurrence {occurrence_index} of '{request_id}' not found")]
    AssignmentNotFound { request_id: String, occurrence_index: u32 },

    #[error("request '{0}' is already scheduled")]
    AlreadyScheduled(String),

    #[error("occurrence {occurrence_index} of '{request_id}' is locked")]
    Locked { request_id: String, occurrence_index: u32 },

    #[error("cannot remove '{request_id}': prerequisite of {}", .dependents.join(", "))]
    DependencyViolated { request_id: String, dependents: Vec<String> },

    #[error("{}: {}", .0.constraint_type, .0.message)]
    ConstraintViolated(Box<Violation>),

    #[error("no occurrence of '{0}' could be placed")]
    NoPlacement(String),

    #[error("resource '{0}' does not exist or has the wrong type")]
    UnknownResource(String),

    #[error("empty time window")]
    EmptyWindow,

    #[error("invalid request: {}", first_message(.0))]
    Invalid(Vec<ValidationError>),
}

fn first_message(errors: &[ValidationError]) -> String {
    errors.first().map(|e| e.message.clone()).unwrap_or_default()
}

fn not_found(key: &OccurrenceKey) -> IncrementalError {
    IncrementalError::AssignmentNotFound {
        request_id: key.0.clone(),
        occurrence_index: key.1,
    }
}

fn locked(key: &OccurrenceKey) -> IncrementalError {
    IncrementalError::Locked {
        request_id: key.0.clone(),
        occurrence_index: key.1,
    }
}

/// One edit in a batch.
#[derive(Debug, Clone)]
pub enum Change {
    Add(SessionRequest),
    Remove(String),
    Move {
        key: OccurrenceKey,
        window: TimeWindow,
        resources: Option<ResourceMap>,
    },
}

impl Change {
    // removals free resources before anything is placed
    fn rank(&self) -> u8 {
        match self {
            Self::Remove(_) => 0,
            Self::Move { .. } => 1,
            Self::Add(_) => 2,
        }
    }
}

/// Result of `add_course`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub request_id: String,
    /// Occurrence indices placed by this call.
    pub placed: Vec<u32>,
    /// Occurrence indices left unscheduled.
    pub unplaced: Vec<u32>,
}

impl AddOutcome {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}

/// Result of `resolve_conflicts`.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    /// Occurrences moved to other resources at the same time.
    pub reallocated: usize,
    /// Occurrences moved to another slot.
    pub rescheduled: usize,
    /// Occurrences removed to clear the remaining violations.
    pub dropped: Vec<OccurrenceKey>,
    /// Violations still present (e.g. between locked assignments).
    pub remaining: Vec<Violation>,
}

impl ResolveOutcome {
    pub fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Result of `apply_batch`.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Changes applied.
    pub applied: usize,
    /// Changes rejected, with the reason.
    pub failures: Vec<(Change, IncrementalError)>,
    /// Conflict resolution run after the batch.
    pub resolution: ResolveOutcome,
}

/// Editable schedule over a problem.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use edu_schedule::incremental::IncrementalSolver;
/// use edu_schedule::models::{Problem, Resource, ResourceType, SessionRequest};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let problem = Problem::new()
///     .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40));
///
/// let mut solver = IncrementalSolver::new(problem);
/// let added = solver
///     .add_course(
///         SessionRequest::new("cs101", 60, 4, start, end)
///             .with_resource_type(ResourceType::Classroom, 1),
///     )
///     .unwrap();
/// assert!(added.is_complete());
/// assert_eq!(solver.assignments().len(), 4);
///
/// solver.remove_course("cs101").unwrap();
/// assert!(solver.assignments().is_empty());
/// ```
#[derive(Debug)]
pub struct IncrementalSolver {
    config: SolverConfig,
    problem: Problem,
    indices: ProblemIndices,
    constraints: ConstraintSet,
    state: IncrementalState,
    locked: BTreeSet<OccurrenceKey>,
    report: InfeasibilityReport,
    rng: ChaCha8Rng,
    seed: u64,
    started: Instant,
}

impl IncrementalSolver {
    /// Starts from the problem's locked assignments with default config.
    pub fn new(problem: Problem) -> Self {
        Self::with_config(problem, SolverConfig::default(), 0)
    }

    pub fn with_config(problem: Problem, config: SolverConfig, seed: u64) -> Self {
        let problem = problem.canonicalized();
        let indices = problem.build_indices();
        let constraints = ConstraintSet::standard(&problem);
        let ttl = Duration::from_secs(config.incremental.cache_ttl_seconds);
        let ctx = ConstraintContext::new(&problem, &indices, config.constraints);
        let state = IncrementalState::from_assignments(
            problem.locked_assignments.clone(),
            &ctx,
            ttl,
        );
        let locked = problem.locked_assignments.iter().map(Assignment::key).collect();
        Self {
            config,
            problem,
            indices,
            constraints,
            state,
            locked,
            report: InfeasibilityReport::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            started: Instant::now(),
        }
    }

    /// Loads an existing schedule (e.g. a previous solve). Occurrences
    /// already present are skipped.
    pub fn with_existing(mut self, assignments: impl IntoIterator<Item = Assignment>) -> Self {
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        for a in assignments {
            if self.state.get(&a.key()).is_none() {
                self.state.insert(a, &ctx);
            }
        }
        self
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn state(&self) -> &IncrementalState {
        &self.state
    }

    pub fn assignments(&self) -> &[Assignment] {
        self.state.assignments()
    }

    pub fn report(&self) -> &InfeasibilityReport {
        &self.report
    }

    fn rebuild(&mut self) {
        self.indices = self.problem.build_indices();
        self.constraints = ConstraintSet::standard(&self.problem);
    }

    /// Registers `request` (replacing a definition with the same id) and
    /// returns the previous definition.
    fn register(&mut self, request: SessionRequest) -> Option<SessionRequest> {
        let previous = self
            .problem
            .requests
            .iter()
            .position(|r| r.id == request.id)
            .map(|i| self.problem.requests.remove(i));
        let pos = self.problem.requests.partition_point(|r| r.id < request.id);
        self.problem.requests.insert(pos, request);
        self.rebuild();
        previous
    }

    fn unregister(&mut self, request_id: &str, previous: Option<SessionRequest>) {
        self.problem.requests.retain(|r| r.id != request_id);
        if let Some(request) = previous {
            let pos = self.problem.requests.partition_point(|r| r.id < request.id);
            self.problem.requests.insert(pos, request);
        }
        self.rebuild();
    }

    /// Tries dates in order, at most `max_attempts` windows overall.
    #[allow(clippy::too_many_arguments)]
    fn place_occurrence(
        placer: &Placer<'_>,
        slots: &SlotGenerator,
        state: &mut IncrementalState,
        request: &SessionRequest,
        occurrence_index: u32,
        dates: &[NaiveDate],
        max_attempts: usize,
        reasons: &mut BTreeMap<String, usize>,
    ) -> Option<Assignment> {
        let mut attempts = 0;
        for &date in dates {
            for window in slots.slots(date, request) {
                attempts += 1;
                if attempts > max_attempts {
                    return None;
                }
                let resources = match placer
                    .window_allowed(request, &window)
                    .and_then(|_| placer.select_resources(request, &window, state.timeline()))
                {
                    Ok(r) => r,
                    Err(rejection) => {
                        *reasons.entry(rejection.reason().to_string()).or_default() += 1;
                        continue;
                    }
                };
                let candidate = Assignment::new(
                    &request.id,
                    occurrence_index,
                    window.start,
                    window.end,
                )
                    .with_resources(resources)
                    .with_cohort(request.cohort_id.clone());
                match state.check(&candidate, placer.constraints(), placer.context()) {
                    None => return Some(candidate),
                    Some(v) => *reasons.entry(v.constraint_type).or_default() += 1,
                }
            }
        }
        None
    }

    /// Places every missing occurrence of a registered request.
    fn schedule_request(&mut self, request_id: &str) -> (AddOutcome, BTreeMap<String, usize>) {
        let mut outcome = AddOutcome {
            request_id: request_id.to_string(),
            placed: Vec::new(),
            unplaced: Vec::new(),
        };
        let mut reasons = BTreeMap::new();
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        let Some(request) = ctx.request(request_id) else {
            return (outcome, reasons);
        };
        let placer = Placer::new(ctx, &self.constraints);
        let spreader = OccurrenceSpreader::new(ctx.holidays());
        let slots = SlotGenerator::new(&self.config.heuristic, ctx.institutional_calendar());

        let candidates = spreader.candidate_dates(request);
        let mut scheduled: Vec<NaiveDate> = self
            .state
            .for_request(request_id)
            .iter()
            .map(|a| a.date())
            .collect();
        let planned: Vec<NaiveDate> = spreader
            .plan(request, &candidates, &mut self.rng)
            .into_iter()
            .filter(|d| !scheduled.contains(d))
            .collect();
        let mut plan = planned.into_iter();
        if candidates.is_empty() {
            reasons.insert("no_candidate_dates".to_string(), 1);
        }

        for occurrence in 0..request.number_of_occurrences {
            if self.state.get(&(request.id.clone(), occurrence)).is_some() {
                continue;
            }
            let dates = spreader.fallback_order(
                request,
                &candidates,
                &scheduled,
                plan.next(),
                self.config.heuristic.max_date_trials,
            );
            match Self::place_occurrence(
                &placer,
                &slots,
                &mut self.state,
                request,
                occurrence,
                &dates,
                self.config.incremental.max_attempts,
                &mut reasons,
            ) {
                Some(a) => {
                    scheduled.push(a.date());
                    self.state.insert(a, &ctx);
                    outcome.placed.push(occurrence);
                }
                None => outcome.unplaced.push(occurrence),
            }
        }
        (outcome, reasons)
    }

    fn record_failure(
        &mut self,
        request_id: &str,
        unplaced: &[u32],
        reasons: &BTreeMap<String, usize>,
    ) {
        for (reason, count) in reasons {
            *self.report.violated_constraints_summary.entry(reason.clone()).or_insert(0) += count;
        }
        let dominant = reasons
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map_or("no_candidate_dates", |(r, _)| r.as_str());
        self.report.explain(
            request_id,
            format!("{} occurrence(s) not placed; dominant blocker: {dominant}", unplaced.len()),
        );
    }

    /// Schedules every occurrence of a new request against the current
    /// schedule.
    ///
    /// Rolled back entirely when no occurrence can be placed or when the
    /// merged schedule breaks a hard constraint. Occurrences that could
    /// not be placed are reported in the outcome.
    pub fn add_course(&mut self, request: SessionRequest) -> Result<AddOutcome, IncrementalError> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(IncrementalError::Invalid(errors));
        }
        let id = request.id.clone();
        if self
            .state
            .assignments()
            .iter()
            .any(|a| a.request_id == id && !self.locked.contains(&a.key()))
        {
            return Err(IncrementalError::AlreadyScheduled(id));
        }

        let previous = self.register(request);
        let (outcome, reasons) = self.schedule_request(&id);
        if outcome.placed.is_empty() && !outcome.unplaced.is_empty() {
            self.record_failure(&id, &outcome.unplaced, &reasons);
            self.unregister(&id, previous);
            debug!(request = %id, "add rolled back: nothing placed");
            return Err(IncrementalError::NoPlacement(id));
        }

        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        let broken = self
            .state
            .violations(&self.constraints, &ctx)
            .into_iter()
            .find(|v| v.affected_request_id == id || v.conflicting_request() == Some(id.as_str()));
        if let Some(v) = broken {
            for occurrence in &outcome.placed {
                self.state.remove(&(id.clone(), *occurrence));
            }
            self.report.record_violation(&v);
            self.unregister(&id, previous);
            debug!(
                request = %id,
                constraint = %v.constraint_type,
                "add rolled back: merged schedule invalid"
            );
            return Err(IncrementalError::ConstraintViolated(Box::new(v)));
        }

        if !outcome.is_complete() {
            self.record_failure(&id, &outcome.unplaced, &reasons);
        }
        debug!(
            request = %id,
            placed = outcome.placed.len(),
            unplaced = outcome.unplaced.len(),
            "course added"
        );
        Ok(outcome)
    }

    /// Drops every assignment of a request and forgets the request.
    ///
    /// Refused while another scheduled request lists it as a
    /// prerequisite, or when any of its occurrences is locked.
    pub fn remove_course(&mut self, request_id: &str) -> Result<Vec<Assignment>, IncrementalError> {
        let known = self.problem.requests.iter().any(|r| r.id == request_id);
        if !known && !self.state.contains_request(request_id) {
            return Err(IncrementalError::RequestNotFound(request_id.to_string()));
        }
        if let Some(key) = self.locked.iter().find(|k| k.0 == request_id) {
            return Err(locked(key));
        }
        let dependents: Vec<String> = self
            .problem
            .requests
            .iter()
            .filter(|r| {
                r.prerequisites.iter().any(|p| p == request_id)
                    && self.state.contains_request(&r.id)
            })
            .map(|r| r.id.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(IncrementalError::DependencyViolated {
                request_id: request_id.to_string(),
                dependents,
            });
        }

        let removed = self.state.remove_request(request_id);
        self.problem.requests.retain(|r| r.id != request_id);
        self.rebuild();
        self.report.per_request_explanations.remove(request_id);
        debug!(request = %request_id, removed = removed.len(), "course removed");
        Ok(removed)
    }

    /// Moves one occurrence to `window`, optionally with new resources.
    ///
    /// Returns the new assignment; on a violation the old one stays.
    pub fn move_assignment(
        &mut self,
        key: &OccurrenceKey,
        window: TimeWindow,
        resources: Option<ResourceMap>,
    ) -> Result<Assignment, IncrementalError> {
        if window.end <= window.start {
            return Err(IncrementalError::EmptyWindow);
        }
        if self.locked.contains(key) {
            return Err(locked(key));
        }
        let old = self.state.get(key).cloned().ok_or_else(|| not_found(key))?;
        let mut moved = old.clone();
        moved.start_time = window.start;
        moved.end_time = window.end;
        if let Some(resources) = resources {
            moved.assigned_resources = resources;
        }
        for (rtype, ids) in &moved.assigned_resources {
            for id in ids {
                match self.indices.resource(&self.problem, id) {
                    Some(r) if r.resource_type == *rtype => {}
                    _ => return Err(IncrementalError::UnknownResource(id.clone())),
                }
            }
        }

        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        self.state.remove(key);
        if let Some(v) = self.state.check(&moved, &self.constraints, &ctx) {
            self.state.insert(old, &ctx);
            return Err(IncrementalError::ConstraintViolated(Box::new(v)));
        }
        self.state.insert(moved.clone(), &ctx);
        debug!(request = %key.0, occurrence = key.1, start = %window.start, "assignment moved");
        Ok(moved)
    }

    /// Unlocked occurrences currently violating a hard constraint.
    fn violators(&mut self) -> Vec<OccurrenceKey> {
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        let current = self.state.assignments().to_vec();
        current
            .iter()
            .filter(|a| !self.locked.contains(&a.key()))
            .filter(|a| self.state.check(a, &self.constraints, &ctx).is_some())
            .map(Assignment::key)
            .collect()
    }

    fn try_reallocate(&mut self, key: &OccurrenceKey) -> bool {
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        let Some(old) = self.state.remove(key) else {
            return false;
        };
        let placer = Placer::new(ctx, &self.constraints);
        let candidate = ctx
            .request(&key.0)
            .and_then(|r| placer.select_resources(r, &old.window(), self.state.timeline()).ok())
            .map(|resources| old.clone().with_resources(resources));
        match candidate {
            Some(a) if a != old && self.state.check(&a, &self.constraints, &ctx).is_none() => {
                self.state.insert(a, &ctx);
                true
            }
            _ => {
                self.state.insert(old, &ctx);
                false
            }
        }
    }

    fn try_reschedule(&mut self, key: &OccurrenceKey) -> bool {
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        let Some(request) = ctx.request(&key.0) else {
            return false;
        };
        let Some(old) = self.state.remove(key) else {
            return false;
        };
        let placer = Placer::new(ctx, &self.constraints);
        let spreader = OccurrenceSpreader::new(ctx.holidays());
        let slots = SlotGenerator::new(&self.config.heuristic, ctx.institutional_calendar());
        let candidates = spreader.candidate_dates(request);
        let scheduled: Vec<NaiveDate> = self
            .state
            .for_request(&key.0)
            .iter()
            .map(|a| a.date())
            .collect();
        let dates = spreader.fallback_order(
            request,
            &candidates,
            &scheduled,
            None,
            self.config.heuristic.max_date_trials,
        );
        let mut reasons = BTreeMap::new();
        match Self::place_occurrence(
            &placer,
            &slots,
            &mut self.state,
            request,
            key.1,
            &dates,
            self.config.incremental.max_attempts,
            &mut reasons,
        ) {
            Some(a) => {
                self.state.insert(a, &ctx);
                true
            }
            None => {
                self.state.insert(old, &ctx);
                false
            }
        }
    }

    /// Lowest-priority violator: shortest session first, then the later
    /// occurrence, then the larger request id.
    fn least_important(&self, keys: &[OccurrenceKey]) -> Option<OccurrenceKey> {
        keys.iter()
            .min_by(|a, b| {
                let pa = self
                    .problem
                    .requests
                    .iter()
                    .find(|r| r.id == a.0)
                    .map_or(0, priority_score);
                let pb = self
                    .problem
                    .requests
                    .iter()
                    .find(|r| r.id == b.0)
                    .map_or(0, priority_score);
                pa.cmp(&pb).then(b.1.cmp(&a.1)).then(b.0.cmp(&a.0))
            })
            .cloned()
    }

    /// Clears hard violations in the current schedule.
    ///
    /// Strategies in order: reallocate resources at the same time, move
    /// to another slot, then drop the lowest-priority violators until
    /// none remain. Locked assignments are never touched.
    pub fn resolve_conflicts(&mut self) -> ResolveOutcome {
        let mut outcome = ResolveOutcome::default();

        for key in self.violators() {
            if self.try_reallocate(&key) {
                outcome.reallocated += 1;
            }
        }
        for key in self.violators() {
            if self.try_reschedule(&key) {
                outcome.rescheduled += 1;
            }
        }
        loop {
            let keys = self.violators();
            let Some(victim) = self.least_important(&keys) else {
                break;
            };
            self.state.remove(&victim);
            self.report.record("relaxed");
            self.report.explain(
                &victim.0,
                format!("occurrence {} dropped to resolve conflicts", victim.1),
            );
            outcome.dropped.push(victim);
        }

        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        outcome.remaining = self.state.violations(&self.constraints, &ctx);
        if outcome.reallocated + outcome.rescheduled + outcome.dropped.len() > 0 {
            debug!(
                reallocated = outcome.reallocated,
                rescheduled = outcome.rescheduled,
                dropped = outcome.dropped.len(),
                remaining = outcome.remaining.len(),
                "conflicts resolved"
            );
        }
        outcome
    }

    /// Applies a batch: removals, then moves, then additions; then
    /// resolves conflicts once.
    pub fn apply_batch(&mut self, changes: Vec<Change>) -> BatchOutcome {
        let mut ordered = changes;
        ordered.sort_by_key(Change::rank);

        let mut outcome = BatchOutcome::default();
        for change in ordered {
            let result = match &change {
                Change::Remove(id) => self.remove_course(id).map(|_| ()),
                Change::Move { key, window, resources } => {
                    self.move_assignment(key, *window, resources.clone()).map(|_| ())
                }
                Change::Add(request) => self.add_course(request.clone()).map(|_| ()),
            };
            match result {
                Ok(()) => outcome.applied += 1,
                Err(e) => outcome.failures.push((change, e)),
            }
        }
        outcome.resolution = self.resolve_conflicts();
        info!(
            event = "batch_applied",
            applied = outcome.applied,
            failed = outcome.failures.len(),
            remaining_conflicts = outcome.resolution.remaining.len(),
        );
        outcome
    }

    /// The current schedule as a solve result.
    pub fn to_result(&self, fallback: bool) -> SolveResult {
        let ctx = ConstraintContext::new(&self.problem, &self.indices, self.config.constraints);
        SolveResult::assemble(
            &ctx,
            self.state.assignments().to_vec(),
            "incremental",
            self.seed,
            self.started.elapsed(),
            self.diagnostics(),
            self.report.clone(),
            fallback,
        )
    }

    fn diagnostics(&self) -> Diagnostics {
        let stats = self.state.cache_stats();
        let mut diagnostics = Diagnostics {
            candidates_evaluated: stats.hits + stats.misses,
            iterations: self.state.version(),
            ..Diagnostics::default()
        };
        diagnostics.note("cache_hits", stats.hits);
        diagnostics.note("cache_misses", stats.misses);
        diagnostics
    }
}

/// Full solve through the incremental path: every request is added in
/// priority order to a state seeded with the locked assignments.
#[derive(Debug, Clone, Default)]
pub struct IncrementalBackend {
    config: SolverConfig,
}

impl IncrementalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn schedule(&self, problem: &Problem, seed: u64, fallback: bool) -> SolveResult {
        let started = Instant::now();
        let full = problem.canonicalized();
        info!(event = "solve_start", backend = "incremental", seed, requests = full.requests.len());

        let mut empty = full.clone();
        empty.requests.clear();
        let mut solver = IncrementalSolver::with_config(empty, self.config.clone(), seed);
        for request in sort_by_priority(&full.requests) {
            if let Err(e) = solver.add_course(request.clone()) {
                debug!(request = %request.id, error = %e, "request not added");
            }
        }

        let indices = full.build_indices();
        let ctx = ConstraintContext::new(&full, &indices, self.config.constraints);
        let result = SolveResult::assemble(
            &ctx,
            solver.state.assignments().to_vec(),
            "incremental",
            seed,
            started.elapsed(),
            solver.diagnostics(),
            solver.report.clone(),
            fallback,
        );
        info!(
            event = "solve_end",
            backend = "incremental",
            status = %result.status,
            scheduled = result.assignment_count(),
            unscheduled = result.unscheduled_requests.len(),
            elapsed_ms = result.solve_time_ms,
        );
        result
    }
}

impl SolverBackend for IncrementalBackend {
    fn backend_name(&self) -> &'static str {
        "incremental"
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
