//! Strategy-driven conflict repair.
//!
//! Conflicts are handled most severe first. For each, the applicable
//! strategies are tried in order until one changes the schedule; the
//! schedule is then re-detected so conflicts fixed as a side effect are
//! counted and newly introduced ones are reported. Failures are never
//! fatal: unresolved conflicts come back in `remaining`.
//!
//! Every strategy that moves or re-resources an assignment goes through
//! the greedy placer, so the changed assignment passes every hard
//! constraint against the rest of the schedule. Locked assignments are
//! never touched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::detector::ConflictDetector;
use super::{Conflict, ConflictType, ResolutionResult, ResolutionStrategy};
use crate::config::HeuristicConfig;
use crate::constraints::{ConstraintContext, ConstraintSet};
use crate::heuristic::{priority_score, OccurrenceSpreader, Placer, SlotGenerator};
use crate::models::{Assignment, OccurrenceKey, Resource, SessionRequest};
use crate::timeline::ResourceTimeline;

/// Shortest session `AdjustDuration` may leave, as a fraction of the
/// requested duration.
const MIN_DURATION_FRACTION: f64 = 0.5;

/// How much a constraint type matters when weighing conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRanking {
    pub constraint_type: String,
    /// Conflicts citing this type.
    pub occurrences: usize,
    /// 1 = highest.
    pub priority: u8,
    pub weight: f64,
    /// resource, temporal, capacity, personnel or general.
    pub category: &'static str,
    pub is_hard: bool,
    pub can_relax: bool,
}

impl ConstraintRanking {
    fn new(constraint_type: &str, occurrences: usize) -> Self {
        let (priority, weight, is_hard) = if constraint_type.contains("hard") {
            (1, 10.0, true)
        } else if constraint_type.contains("soft") {
            (5, 5.0, false)
        } else {
            (3, 7.0, true)
        };
        let lower = constraint_type.to_lowercase();
        let category = if lower.contains("resource") {
            "resource"
        } else if lower.contains("time") {
            "temporal"
        } else if lower.contains("capacity") {
            "capacity"
        } else if lower.contains("teacher") {
            "personnel"
        } else {
            "general"
        };
        Self {
            constraint_type: constraint_type.to_string(),
            occurrences,
            priority,
            weight,
            category,
            is_hard,
            can_relax: !is_hard,
        }
    }
}

/// Constraint types a conflict stands for.
fn cited_constraints(conflict: &Conflict) -> Vec<&str> {
    if !conflict.violated_constraints.is_empty() {
        return conflict.violated_constraints.iter().map(String::as_str).collect();
    }
    let implied = match conflict.conflict_type {
        ConflictType::ResourceDoubleBooking => "hard.no_overlap",
        ConflictType::TeacherOverload => "hard.teacher_conflict",
        ConflictType::CapacityExceeded => "hard.classroom_capacity",
        ConflictType::BlackoutDate => "hard.blackout_dates",
        ConflictType::StudentConflict => "hard.student_conflict",
        ConflictType::PrerequisiteViolation => "hard.prerequisite",
        _ => "general",
    };
    vec![implied]
}

/// Repairs conflicts in a schedule.
#[derive(Debug)]
pub struct ConflictResolver<'a> {
    ctx: ConstraintContext<'a>,
    constraints: &'a ConstraintSet,
    detector: ConflictDetector,
    placer: Placer<'a>,
    spreader: OccurrenceSpreader<'a>,
    slots: SlotGenerator,
    max_date_trials: usize,
    locked: BTreeSet<OccurrenceKey>,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(
        ctx: ConstraintContext<'a>,
        constraints: &'a ConstraintSet,
        config: &HeuristicConfig,
    ) -> Self {
        Self {
            ctx,
            constraints,
            detector: ConflictDetector::new(),
            placer: Placer::new(ctx, constraints),
            spreader: OccurrenceSpreader::new(ctx.holidays()),
            slots: SlotGenerator::new(config, ctx.institutional_calendar()),
            max_date_trials: config.max_date_trials.max(1),
            locked: ctx.problem.locked_assignments.iter().map(Assignment::key).collect(),
        }
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Conflicts in `solution` as this resolver sees them (relaxed
    /// constraints excluded).
    pub fn detect(&self, solution: &[Assignment]) -> Vec<Conflict> {
        self.detector.detect_all(solution, &self.ctx, self.constraints)
    }

    /// Position of the conflict's least important unlocked assignment:
    /// lowest priority, then latest occurrence, then largest id.
    fn target(&self, conflict: &Conflict, solution: &[Assignment]) -> Option<usize> {
        let priority = |a: &Assignment| self.ctx.request(&a.request_id).map_or(0, priority_score);
        solution
            .iter()
            .enumerate()
            .filter(
                |(_, a)| !self.locked.contains(&a.key()) && conflict.assignments.contains(&a.key()),
            )
            .min_by(|(_, a), (_, b)| {
                priority(a)
                    .cmp(&priority(b))
                    .then(b.start_time.cmp(&a.start_time))
                    .then(b.occurrence_index.cmp(&a.occurrence_index))
                    .then_with(|| b.request_id.cmp(&a.request_id))
            })
            .map(|(i, _)| i)
    }

    fn target_request(
        &self,
        conflict: &Conflict,
        solution: &[Assignment],
    ) -> Result<(usize, &'a SessionRequest), String> {
        let i = self
            .target(conflict, solution)
            .ok_or_else(|| "every involved occurrence is locked".to_string())?;
        let request = self
            .ctx
            .request(&solution[i].request_id)
            .ok_or_else(|| format!("unknown request {}", solution[i].request_id))?;
        Ok((i, request))
    }

    /// Up to `limit` valid placements of `request` elsewhere in time.
    fn search_windows(
        &self,
        request: &SessionRequest,
        original: &Assignment,
        rest: &[Assignment],
        limit: usize,
    ) -> Vec<Assignment> {
        let timeline = ResourceTimeline::from_assignments(rest, &self.ctx);
        let candidates = self.spreader.candidate_dates(request);
        let scheduled: Vec<NaiveDate> = rest
            .iter()
            .filter(|a| a.request_id == request.id)
            .map(Assignment::date)
            .collect();
        let dates = self
            .spreader
            .fallback_order(request, &candidates, &scheduled, None, self.max_date_trials);
        let mut found = Vec::new();
        for date in dates {
            for window in self.slots.slots(date, request) {
                if window.start == original.start_time {
                    continue;
                }
                if let Ok(a) = self.placer.try_place(
                    request,
                    original.occurrence_index,
                    &window,
                    rest,
                    &timeline,
                ) {
                    found.push(a);
                    if found.len() >= limit {
                        return found;
                    }
                }
            }
        }
        found
    }

    fn reschedule(
        &self,
        conflict: &Conflict,
        solution: &mut Vec<Assignment>,
    ) -> Result<(String, f64), String> {
        let (i, request) = self.target_request(conflict, solution)?;
        let original = solution.remove(i);
        match self.search_windows(request, &original, solution, 1).pop() {
            Some(moved) => {
                let detail = format!(
                    "moved {}#{} from {} to {}",
                    original.request_id,
                    original.occurrence_index,
                    original.start_time,
                    moved.start_time
                );
                solution.insert(i, moved);
                Ok((detail, -0.1))
            }
            None => {
                solution.insert(i, original);
                Err("no free slot".to_string())
            }
        }
    }

    fn reassign(
        &self,
        conflict: &Conflict,
        solution: &mut Vec<Assignment>,
    ) -> Result<(String, f64), String> {
        let (i, request) = self.target_request(conflict, solution)?;
        let original = solution.remove(i);
        let timeline = ResourceTimeline::from_assignments(solution.iter(), &self.ctx);
        let outcome = self
            .placer
            .select_resources(request, &original.window(), &timeline)
            .map_err(|r| r.reason().to_string())
            .and_then(|resources| {
                if resources == original.assigned_resources {
                    return Err("no other resources free".to_string());
                }
                let candidate = Assignment { assigned_resources: resources, ..original.clone() };
                match self.constraints.check(&candidate, solution.as_slice(), &self.ctx) {
                    Some(v) => Err(v.message),
                    None => Ok(candidate),
                }
            });
        match outcome {
            Ok(candidate) => {
                let detail = format!(
                    "re-resourced {}#{} to {}",
                    candidate.request_id,
                    candidate.occurrence_index,
                    candidate.resource_ids().collect::<Vec<_>>().join(",")
                );
                solution.insert(i, candidate);
                Ok((detail, -0.05))
            }
            Err(reason) => {
                solution.insert(i, original);
                Err(reason)
            }
        }
    }

    fn alternate_resource(
        &self,
        conflict: &Conflict,
        solution: &mut Vec<Assignment>,
    ) -> Result<(String, f64), String> {
        let (i, request) = self.target_request(conflict, solution)?;
        let original = solution[i].clone();
        let rest: Vec<Assignment> = solution
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, a)| a.clone())
            .collect();
        let timeline = ResourceTimeline::from_assignments(&rest, &self.ctx);
        let window = original.window();
        let occupied = self.ctx.occupied_window(&original);

        for rid in conflict.resource_ids.iter().filter(|r| original.uses_resource(r)) {
            let Some(current) = self.ctx.resource(rid) else {
                continue;
            };
            let rtype = current.resource_type;
            let spare = self.placer.ranked(request, rtype).into_iter().filter(|r: &&Resource| {
                !original.uses_resource(&r.id)
                    && self.placer.resource_free(r, &window, &occupied, &timeline)
            });
            for replacement in spare {
                let mut candidate = original.clone();
                if let Some(ids) = candidate.assigned_resources.get_mut(&rtype) {
                    ids.remove(rid.as_str());
                    ids.insert(replacement.id.clone());
                }
                if self.constraints.check(&candidate, &rest, &self.ctx).is_none() {
                    solution[i] = candidate;
                    return Ok((
                        format!(
                            "swapped {rid} for {} on {}#{}",
                            replacement.id,
                            original.request_id,
                            original.occurrence_index
                        ),
                        -0.05,
                    ));
                }
            }
        }
        Err("no alternative resource".to_string())
    }

    fn adjust_duration(
        &self,
        conflict: &Conflict,
        solution: &mut [Assignment],
    ) -> Result<(String, f64), String> {
        let mut involved: Vec<usize> = solution
            .iter()
            .enumerate()
            .filter(|(_, a)| conflict.assignments.contains(&a.key()))
            .map(|(i, _)| i)
            .collect();
        if involved.len() != 2 {
            return Err("needs exactly two sessions".to_string());
        }
        involved.sort_by_key(|&i| solution[i].start_time);
        let (first, second) = (involved[0], involved[1]);
        if self.locked.contains(&solution[first].key()) {
            return Err("earlier session is locked".to_string());
        }
        let request = self
            .ctx
            .request(&solution[first].request_id)
            .ok_or_else(|| "unknown request".to_string())?;

        let (_, cleanup) = self.ctx.buffers(&request.id);
        let new_end = self.ctx.occupied_window(&solution[second]).start - cleanup;
        let kept = new_end - solution[first].start_time;
        let floor = Duration::seconds(
            (request.duration().num_seconds() as f64 * MIN_DURATION_FRACTION) as i64,
        );
        if kept <= Duration::zero() || kept < floor {
            return Err(format!("would leave {} minutes", kept.num_minutes()));
        }

        let candidate = Assignment { end_time: new_end, ..solution[first].clone() };
        let rest: Vec<Assignment> = solution
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != first)
            .map(|(_, a)| a.clone())
            .collect();
        if let Some(v) = self.constraints.check(&candidate, &rest, &self.ctx) {
            return Err(v.message);
        }
        let cut = 1.0 - kept.num_seconds() as f64 / request.duration().num_seconds().max(1) as f64;
        let detail = format!(
            "shortened {}#{} to {} minutes",
            candidate.request_id,
            candidate.occurrence_index,
            kept.num_minutes()
        );
        solution[first] = candidate;
        Ok((detail, -0.3 * cut.max(0.1)))
    }

    fn relax(&mut self, conflict: &Conflict) -> Result<(String, f64), String> {
        if conflict.violated_constraints.is_empty() {
            return Err("no constraint to relax".to_string());
        }
        let hard = conflict
            .violated_constraints
            .iter()
            .find(|t| ConstraintRanking::new(t, 0).is_hard);
        if let Some(hard) = hard {
            return Err(format!("{hard} cannot be relaxed"));
        }
        for t in &conflict.violated_constraints {
            self.detector.relax(t.clone());
        }
        Ok((format!("relaxed {}", conflict.violated_constraints.join(",")), -0.1))
    }

    fn remove(
        &self,
        conflict: &Conflict,
        solution: &mut Vec<Assignment>,
    ) -> Result<(String, f64), String> {
        if conflict.conflict_type == ConflictType::PrerequisiteViolation {
            let before = solution.len();
            solution.retain(|a| {
                self.locked.contains(&a.key()) || !conflict.assignments.contains(&a.key())
            });
            let removed = before - solution.len();
            if removed == 0 {
                return Err("every involved occurrence is locked".to_string());
            }
            return Ok((format!("removed {removed} session(s) lacking a prerequisite"), -0.2));
        }
        let i = self
            .target(conflict, solution)
            .ok_or_else(|| "every involved occurrence is locked".to_string())?;
        let removed = solution.remove(i);
        Ok((format!("removed {}#{}", removed.request_id, removed.occurrence_index), -0.2))
    }

    fn apply(
        &mut self,
        strategy: ResolutionStrategy,
        conflict: &Conflict,
        solution: &mut Vec<Assignment>,
    ) -> Result<(String, f64), String> {
        match strategy {
            ResolutionStrategy::Reschedule => self.reschedule(conflict, solution),
            ResolutionStrategy::Reassign => self.reassign(conflict, solution),
            ResolutionStrategy::AlternateResource => self.alternate_resource(conflict, solution),
            ResolutionStrategy::AdjustDuration => self.adjust_duration(conflict, solution),
            ResolutionStrategy::RelaxConstraint => self.relax(conflict),
            ResolutionStrategy::Remove => self.remove(conflict, solution),
        }
    }

    /// Resolves `conflicts` in `solution`, most severe first.
    ///
    /// `strategy_order` defaults to [`ResolutionStrategy::DEFAULT_ORDER`];
    /// only strategies the conflict allows are tried.
    pub fn resolve_conflicts(
        &mut self,
        conflicts: &[Conflict],
        solution: &mut Vec<Assignment>,
        strategy_order: Option<&[ResolutionStrategy]>,
    ) -> ResolutionResult {
        let order = strategy_order.unwrap_or(&ResolutionStrategy::DEFAULT_ORDER);
        let mut queue = conflicts.to_vec();
        queue.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.conflict_id.cmp(&b.conflict_id))
        });

        let mut seen: BTreeSet<String> = queue.iter().map(|c| c.conflict_id.clone()).collect();
        let mut live: BTreeSet<String> = self
            .detect(solution)
            .into_iter()
            .map(|c| c.conflict_id)
            .collect();
        let mut result = ResolutionResult::default();
        let mut failures: BTreeMap<String, String> = BTreeMap::new();

        for conflict in &queue {
            if !live.contains(&conflict.conflict_id) {
                result.resolved.push(conflict.conflict_id.clone());
                result.details.insert(
                    conflict.conflict_id.clone(),
                    "resolved by an earlier change".to_string(),
                );
                continue;
            }
            let mut fixed = false;
            for &strategy in order.iter().filter(|s| conflict.allows(**s)) {
                match self.apply(strategy, conflict, solution) {
                    Ok((detail, impact)) => {
                        debug!(
                            conflict = %conflict.conflict_id,
                            strategy = %strategy,
                            detail = %detail,
                            "conflict resolved"
                        );
                        let now = self.detect(solution);
                        for c in &now {
                            if seen.insert(c.conflict_id.clone()) {
                                result.new_conflicts.push(c.clone());
                            }
                        }
                        live = now.into_iter().map(|c| c.conflict_id).collect();
                        result.resolved.push(conflict.conflict_id.clone());
                        result
                            .details
                            .insert(conflict.conflict_id.clone(), format!("{strategy}: {detail}"));
                        result.strategy = Some(strategy);
                        result.quality_impact = (result.quality_impact + impact).clamp(-1.0, 1.0);
                        fixed = true;
                        break;
                    }
                    Err(reason) => {
                        failures
                            .insert(conflict.conflict_id.clone(), format!("{strategy}: {reason}"));
                    }
                }
            }
            if !fixed {
                debug!(conflict = %conflict.conflict_id, "conflict left unresolved");
                result.remaining.push(conflict.conflict_id.clone());
                let why = failures
                    .remove(&conflict.conflict_id)
                    .unwrap_or_else(|| "no applicable strategy".to_string());
                result.details.insert(conflict.conflict_id.clone(), why);
            }
        }
        result.success = !result.resolved.is_empty();
        result
    }

    /// Detects and resolves everything currently in `solution`.
    pub fn resolve_all(
        &mut self,
        solution: &mut Vec<Assignment>,
        strategy_order: Option<&[ResolutionStrategy]>,
    ) -> ResolutionResult {
        let conflicts = self.detect(solution);
        self.resolve_conflicts(&conflicts, solution, strategy_order)
    }

    /// Human-readable hints for one conflict, with up to three concrete
    /// alternative placements for its least important session.
    pub fn generate_suggestions(
        &self,
        conflict: &Conflict,
        solution: &[Assignment],
    ) -> Vec<String> {
        let general: &[&str] = match conflict.conflict_type {
            ConflictType::ResourceDoubleBooking => &[
                "Use a different room",
                "Change the time of one session",
                "Check for alternative resources",
            ],
            ConflictType::TeacherOverload => &[
                "Reschedule one session to a different day",
                "Find an alternative instructor",
                "Split the session into smaller parts",
            ],
            ConflictType::CapacityExceeded => &[
                "Move to a larger room",
                "Split the class into multiple sections",
                "Offer online participation for some students",
            ],
            ConflictType::StudentConflict => &[
                "Offer recorded sessions",
                "Provide alternative time slots",
                "Consider hybrid attendance options",
            ],
            ConflictType::BlackoutDate => &["Move the session off the blocked date"],
            ConflictType::PrerequisiteViolation => &["Schedule the prerequisite course first"],
            _ => &["Review the violated constraint"],
        };
        let mut suggestions: Vec<String> = general.iter().map(|s| s.to_string()).collect();

        if let Ok((i, request)) = self.target_request(conflict, solution) {
            let original = &solution[i];
            let rest: Vec<Assignment> = solution
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, a)| a.clone())
                .collect();
            for alt in self.search_windows(request, original, &rest, 3) {
                suggestions.push(format!(
                    "Move {} occurrence {} to {} in {}",
                    alt.request_id,
                    alt.occurrence_index,
                    alt.start_time.format("%Y-%m-%d %H:%M"),
                    alt.resource_ids().collect::<Vec<_>>().join(", ")
                ));
            }
        }
        suggestions
    }

    /// Constraint types behind `conflicts`, hard before soft, then by how
    /// often they are cited.
    pub fn rank_constraints(&self, conflicts: &[Conflict]) -> Vec<ConstraintRanking> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for c in conflicts {
            for t in cited_constraints(c) {
                *counts.entry(t).or_default() += 1;
            }
        }
        let mut rankings: Vec<ConstraintRanking> =
            counts.into_iter().map(|(t, n)| ConstraintRanking::new(t, n)).collect();
        rankings.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.occurrences.cmp(&a.occurrences))
                .then_with(|| a.constraint_type.cmp(&b.constraint_type))
        });
        rankings
    }
}
