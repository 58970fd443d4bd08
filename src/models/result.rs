//! Solve result and infeasibility reporting.
//!
//! A `SolveResult` is the only thing a solver hands back: the produced
//! assignments, which requests could not be (fully) placed, an optional
//! weighted objective score and diagnostics. Partial and infeasible
//! outcomes are data, not errors; `into_feasible` converts them when a
//! caller wants an error instead.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::{Assignment, OccurrenceKey};
use crate::constraints::{weighted_objective_score, ConstraintContext, Violation};
use crate::error::ScheduleError;

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Every request fully scheduled.
    Feasible,
    /// Some requests (or occurrences) unscheduled.
    Partial,
    /// Nothing could be scheduled.
    Infeasible,
}

impl SolveStatus {
    /// Derives the status from the outcome counts.
    ///
    /// `newly_scheduled` excludes locked assignments.
    pub fn classify(unscheduled: usize, newly_scheduled: usize, fallback: bool) -> Self {
        if unscheduled == 0 {
            Self::Feasible
        } else if newly_scheduled == 0 && !fallback {
            Self::Infeasible
        } else {
            Self::Partial
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Feasible => "feasible",
            Self::Partial => "partial",
            Self::Infeasible => "infeasible",
        })
    }
}

/// Solver bookkeeping attached to a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Candidate placements evaluated.
    pub candidates_evaluated: u64,
    /// Search iterations (generations, batches, work items).
    pub iterations: u64,
    /// Hard-constraint violations left in the output (always 0 for
    /// accepted assignments).
    pub residual_violations: usize,
    /// Free-form notes.
    pub notes: BTreeMap<String, String>,
}

impl Diagnostics {
    /// Adds a note.
    pub fn note(&mut self, key: impl Into<String>, value: impl ToString) {
        self.notes.insert(key.into(), value.to_string());
    }
}

/// Why requests could not be placed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfeasibilityReport {
    /// Requests with at least one missing occurrence.
    pub unscheduled_requests: Vec<String>,
    /// Rejection reasons by constraint type (or placement failure tag).
    pub violated_constraints_summary: BTreeMap<String, usize>,
    /// Representative blocking violations.
    pub top_conflicts: Vec<Violation>,
    /// One explanation per unscheduled request.
    pub per_request_explanations: BTreeMap<String, String>,
}

impl InfeasibilityReport {
    /// Maximum retained `top_conflicts`.
    pub const MAX_TOP_CONFLICTS: usize = 10;

    /// Records a rejection reason.
    pub fn record(&mut self, reason: impl Into<String>) {
        *self.violated_constraints_summary.entry(reason.into()).or_insert(0) += 1;
    }

    /// Records a blocking violation.
    pub fn record_violation(&mut self, violation: &Violation) {
        self.record(violation.constraint_type.clone());
        if self.top_conflicts.len() < Self::MAX_TOP_CONFLICTS {
            self.top_conflicts.push(violation.clone());
        }
    }

    /// Marks a request unscheduled with an explanation.
    pub fn explain(&mut self, request_id: &str, explanation: impl Into<String>) {
        if !self.unscheduled_requests.iter().any(|r| r == request_id) {
            self.unscheduled_requests.push(request_id.to_string());
        }
        self.per_request_explanations
            .insert(request_id.to_string(), explanation.into());
    }

    /// Dominant reasons, most frequent first.
    pub fn dominant_reasons(&self) -> Vec<(&str, usize)> {
        let mut reasons: Vec<(&str, usize)> = self
            .violated_constraints_summary
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        reasons
    }

    /// One-paragraph human summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} request(s) could not be fully scheduled",
            self.unscheduled_requests.len()
        );
        let reasons = self.dominant_reasons();
        if !reasons.is_empty() {
            let top: Vec<String> = reasons
                .iter()
                .take(3)
                .map(|(r, n)| format!("{r} ({n})"))
                .collect();
            out.push_str(&format!("; dominant blockers: {}", top.join(", ")));
        }
        out
    }

    /// Suggested remedies derived from the dominant reasons.
    pub fn recommendations(&self) -> Vec<String> {
        let mut recs = Vec::new();
        for (reason, _) in self.dominant_reasons() {
            let rec = match reason {
                r if r.contains("no_overlap") || r == "resources_busy" => {
                    "Add resources of the contended type or widen date windows"
                }
                r if r.contains("capacity") || r == "no_qualified_resource" => {
                    "Provide larger rooms or relax capacity/attribute requirements"
                }
                r if r.contains("teacher") => "Review teacher availability and workload limits",
                r if r.contains("blackout") || r.contains("holiday") => {
                    "Shorten blackout periods or extend the term"
                }
                "no_candidate_dates" => "Widen the request date range or scheduling pattern",
                _ => continue,
            };
            if !recs.iter().any(|r: &String| r == rec) {
                recs.push(rec.to_string());
            }
        }
        recs
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResult {
    /// Terminal status.
    pub status: SolveStatus,
    /// Produced assignments (locked ones included).
    pub assignments: Vec<Assignment>,
    /// Requests not fully placed.
    pub unscheduled_requests: Vec<String>,
    /// Weighted objective score in [0, 1]; `None` without objectives.
    pub objective_score: Option<f64>,
    /// Backend that produced the result.
    pub backend_used: String,
    /// Seed the solve ran with.
    pub seed_used: u64,
    /// Wall-clock solve time (ms).
    pub solve_time_ms: u64,
    /// Solver bookkeeping.
    pub diagnostics: Diagnostics,
    /// Present unless feasible.
    pub infeasibility_report: Option<InfeasibilityReport>,
}

/// Flat view of one assignment for export adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Request id.
    pub request_id: String,
    /// Occurrence index.
    pub occurrence_index: u32,
    /// ISO-8601 start.
    pub start_time: String,
    /// ISO-8601 end.
    pub end_time: String,
    /// Resource ids by type name.
    pub resources: BTreeMap<String, Vec<String>>,
    /// Cohort.
    pub cohort_id: Option<String>,
}

impl SolveResult {
    /// Builds a result from a solver's final assignments.
    ///
    /// A request is unscheduled when fewer of its occurrences are
    /// assigned than requested. The status follows
    /// [`SolveStatus::classify`] with locked assignments excluded from
    /// the newly scheduled count, and unscheduled requests without an
    /// explanation get a generic one.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        ctx: &ConstraintContext<'_>,
        mut assignments: Vec<Assignment>,
        backend: &str,
        seed: u64,
        elapsed: Duration,
        diagnostics: Diagnostics,
        mut report: InfeasibilityReport,
        fallback: bool,
    ) -> Self {
        assignments.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.request_id.cmp(&b.request_id))
                .then(a.occurrence_index.cmp(&b.occurrence_index))
        });

        let mut placed: BTreeMap<&str, usize> = BTreeMap::new();
        for a in &assignments {
            *placed.entry(a.request_id.as_str()).or_default() += 1;
        }
        let mut unscheduled = Vec::new();
        for request in &ctx.problem.requests {
            let got = placed.get(request.id.as_str()).copied().unwrap_or(0);
            if got < request.number_of_occurrences as usize {
                if !report.per_request_explanations.contains_key(&request.id) {
                    report.explain(
                        &request.id,
                        format!("scheduled {got} of {} occurrences", request.number_of_occurrences),
                    );
                }
                unscheduled.push(request.id.clone());
            }
        }

        let locked: BTreeSet<OccurrenceKey> =
            ctx.problem.locked_assignments.iter().map(Assignment::key).collect();
        let newly_scheduled = assignments.iter().filter(|a| !locked.contains(&a.key())).count();
        let status = SolveStatus::classify(unscheduled.len(), newly_scheduled, fallback);
        let objective_score = weighted_objective_score(&ctx.problem.objectives, &assignments, ctx);

        let infeasibility_report = (status != SolveStatus::Feasible).then(|| {
            report.unscheduled_requests = unscheduled.clone();
            report.per_request_explanations.retain(|id, _| unscheduled.contains(id));
            report
        });

        Self {
            status,
            assignments,
            unscheduled_requests: unscheduled,
            objective_score,
            backend_used: backend.to_string(),
            seed_used: seed,
            solve_time_ms: elapsed.as_millis() as u64,
            diagnostics,
            infeasibility_report,
        }
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Assignments of one request, in occurrence order.
    pub fn assignments_for_request(&self, request_id: &str) -> Vec<&Assignment> {
        let mut found: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.request_id == request_id)
            .collect();
        found.sort_by_key(|a| a.occurrence_index);
        found
    }

    /// Assignments using one resource.
    pub fn assignments_for_resource(&self, resource_id: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.uses_resource(resource_id))
            .collect()
    }

    /// Flat records with ISO-8601 times, ordered by start time.
    pub fn to_records(&self) -> Vec<AssignmentRecord> {
        let mut sorted: Vec<&Assignment> = self.assignments.iter().collect();
        sorted.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.request_id.cmp(&b.request_id))
        });
        sorted
            .into_iter()
            .map(|a| AssignmentRecord {
                request_id: a.request_id.clone(),
                occurrence_index: a.occurrence_index,
                start_time: a.start_time.to_rfc3339(),
                end_time: a.end_time.to_rfc3339(),
                resources: a
                    .assigned_resources
                    .iter()
                    .map(|(t, ids)| (t.as_str().to_string(), ids.iter().cloned().collect()))
                    .collect(),
                cohort_id: a.cohort_id.clone(),
            })
            .collect()
    }

    /// Returns `self` if feasible, otherwise an infeasibility error.
    pub fn into_feasible(self) -> Result<Self, ScheduleError> {
        if self.status == SolveStatus::Feasible {
            return Ok(self);
        }
        let report = self.infeasibility_report.unwrap_or_else(|| InfeasibilityReport {
            unscheduled_requests: self.unscheduled_requests.clone(),
            ..InfeasibilityReport::default()
        });
        Err(ScheduleError::Infeasible(Box::new(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use chrono::{TimeZone, Utc};

    fn sample_result(status: SolveStatus) -> SolveResult {
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap();
        SolveResult {
            status,
            assignments: vec![
                Assignment::new("b", 0, at(11), at(12))
                    .with_resource(ResourceType::Classroom, "R1"),
                Assignment::new("a", 1, at(9), at(10)).with_resource(ResourceType::Classroom, "R1"),
                Assignment::new("a", 0, at(13), at(14))
                    .with_resource(ResourceType::Classroom, "R2"),
            ],
            unscheduled_requests: Vec::new(),
            objective_score: None,
            backend_used: "heuristic".into(),
            seed_used: 42,
            solve_time_ms: 1,
            diagnostics: Diagnostics::default(),
            infeasibility_report: None,
        }
    }

    #[test]
    fn test_status_classify() {
        assert_eq!(SolveStatus::classify(0, 5, false), SolveStatus::Feasible);
        assert_eq!(SolveStatus::classify(1, 5, false), SolveStatus::Partial);
        assert_eq!(SolveStatus::classify(2, 0, false), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::classify(2, 0, true), SolveStatus::Partial);
    }

    #[test]
    fn test_queries() {
        let r = sample_result(SolveStatus::Feasible);
        let a = r.assignments_for_request("a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].occurrence_index, 0);
        assert_eq!(r.assignments_for_resource("R1").len(), 2);
    }

    #[test]
    fn test_to_records_sorted_iso() {
        let records = sample_result(SolveStatus::Feasible).to_records();
        assert_eq!(records[0].request_id, "a");
        assert_eq!(records[0].start_time, "2024-01-16T09:00:00+00:00");
        assert_eq!(records[0].resources["classroom"], vec!["R1".to_string()]);
    }

    #[test]
    fn test_into_feasible() {
        assert!(sample_result(SolveStatus::Feasible).into_feasible().is_ok());
        let mut partial = sample_result(SolveStatus::Partial);
        partial.unscheduled_requests = vec!["c".into()];
        match partial.into_feasible() {
            Err(ScheduleError::Infeasible(report)) => {
                assert_eq!(report.unscheduled_requests, vec!["c".to_string()])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_assemble_marks_short_requests() {
        use crate::config::ConstraintConfig;
        use crate::models::{Problem, SessionRequest};

        let at = |h| Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap();
        let (s, e) = (at(0), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let locked = Assignment::new("a", 0, at(9), at(10));
        let p = Problem::new()
            .with_request(SessionRequest::new("a", 60, 1, s, e))
            .with_request(SessionRequest::new("b", 60, 2, s, e))
            .with_locked(locked.clone());
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());

        let r = SolveResult::assemble(
            &ctx,
            vec![locked.clone(), Assignment::new("b", 0, at(11), at(12))],
            "heuristic",
            42,
            Duration::from_millis(5),
            Diagnostics::default(),
            InfeasibilityReport::default(),
            false,
        );
        assert_eq!(r.status, SolveStatus::Partial);
        assert_eq!(r.unscheduled_requests, vec!["b".to_string()]);
        assert!(r.objective_score.is_none());
        let report = r.infeasibility_report.unwrap();
        assert!(report.per_request_explanations["b"].contains("1 of 2"));

        // only the locked assignment: nothing new was scheduled
        let r = SolveResult::assemble(
            &ctx,
            vec![locked],
            "heuristic",
            42,
            Duration::ZERO,
            Diagnostics::default(),
            InfeasibilityReport::default(),
            false,
        );
        assert_eq!(r.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_report_summary_and_recommendations() {
        let mut report = InfeasibilityReport::default();
        report.explain("c", "no room");
        report.record("hard.no_overlap");
        report.record("hard.no_overlap");
        report.record("no_qualified_resource");
        assert_eq!(report.dominant_reasons()[0], ("hard.no_overlap", 2));
        assert!(report.summary().contains("1 request(s)"));
        assert_eq!(report.recommendations().len(), 2);
    }
}
