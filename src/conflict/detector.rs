//! Typed conflict detection.
//!
//! A fixed battery of detectors runs over a complete schedule. Each
//! dedicated detector owns the constraint types it explains; the generic
//! pass reports every other violated constraint.
//!
//! | Detector | Severity | Strategies |
//! |---|---|---|
//! | double-booking | 0.9 | reschedule, reassign, alternate resource |
//! | teacher overload | 0.8 | reschedule, adjust duration |
//! | capacity | 0.7 | reassign, alternate resource |
//! | blackout | 1.0 | reschedule |
//! | student | 0.6 | reschedule |
//! | prerequisite | 0.5 | remove |
//! | generic | 0.5 | reschedule, relax constraint |

use std::collections::{BTreeMap, BTreeSet};

use super::{Conflict, ConflictType};
use crate::constraints::capacity::check_room;
use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::models::{Assignment, ResourceType};

use super::ResolutionStrategy::{
    AdjustDuration, AlternateResource, Reassign, RelaxConstraint, Remove, Reschedule,
};

/// Constraint types explained by a dedicated detector.
const COVERED: [&str; 7] = [
    "hard.no_overlap",
    "hard.teacher_conflict",
    "hard.classroom_capacity",
    "hard.blackout_dates",
    "hard.resource_blackout",
    "hard.holiday_avoidance",
    "hard.student_conflict",
];

fn generic_type(constraint_type: &str) -> ConflictType {
    match constraint_type {
        "hard.equipment_quantity" => ConflictType::EquipmentUnavailable,
        "hard.attribute_match" => ConflictType::RoomUnavailable,
        "hard.within_date_range"
        | "hard.scheduling_pattern"
        | "hard.campus_hours"
        | "hard.max_per_day"
        | "hard.min_gap_between_occurrences"
        | "hard.teacher_availability" => ConflictType::TimeSlotUnavailable,
        "hard.teacher_workload" | "hard.teacher_travel_time" => ConflictType::TeacherOverload,
        _ => ConflictType::PreferenceViolation,
    }
}

/// Overlapping pairs among `group`, by occupied window (buffers included).
fn overlapping_pairs<'s>(
    group: &[&'s Assignment],
    ctx: &ConstraintContext<'_>,
) -> Vec<(&'s Assignment, &'s Assignment)> {
    let mut pairs = Vec::new();
    for (i, a) in group.iter().enumerate() {
        let wa = ctx.occupied_window(a);
        for b in &group[i + 1..] {
            if !a.same_occurrence(b) && wa.overlaps(&ctx.occupied_window(b)) {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}

/// Runs every detector over a schedule.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    relaxed: BTreeSet<String>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops reporting violations of `constraint_type` in the generic pass.
    pub fn relax(&mut self, constraint_type: impl Into<String>) {
        self.relaxed.insert(constraint_type.into());
    }

    pub fn is_relaxed(&self, constraint_type: &str) -> bool {
        self.relaxed.contains(constraint_type)
    }

    /// All conflicts, most severe first, ties by id.
    pub fn detect_all(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
        constraints: &ConstraintSet,
    ) -> Vec<Conflict> {
        let mut all = self.detect_double_booking(solution, ctx);
        all.extend(self.detect_teacher_overload(solution, ctx));
        all.extend(self.detect_capacity(solution, ctx));
        all.extend(self.detect_blackouts(solution, ctx));
        all.extend(self.detect_student_conflicts(solution, ctx));
        all.extend(self.detect_prerequisites(solution, ctx));
        all.extend(self.detect_constraint_violations(solution, ctx, constraints));

        all.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.conflict_id.cmp(&b.conflict_id))
        });
        all.dedup_by(|a, b| a.conflict_id == b.conflict_id);
        all
    }

    /// Resources holding more overlapping sessions than they can run.
    pub fn detect_double_booking(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let mut by_resource: BTreeMap<&str, Vec<&Assignment>> = BTreeMap::new();
        for a in solution {
            for id in a.resource_ids() {
                by_resource.entry(id).or_default().push(a);
            }
        }

        let mut out = Vec::new();
        for (resource_id, group) in by_resource {
            let capacity = ctx
                .resource(resource_id)
                .map_or(1, |r| r.concurrency_capacity.max(1)) as usize;
            if capacity == 1 {
                for (a, b) in overlapping_pairs(&group, ctx) {
                    out.push(
                        Conflict::new(
                            ConflictType::ResourceDoubleBooking,
                            resource_id,
                            0.9,
                            format!(
                                "Resource {resource_id} double-booked by {} and {}",
                                a.request_id,
                                b.request_id
                            ),
                            vec![a.key(), b.key()],
                        )
                        .with_resource(resource_id)
                        .with_strategies(&[Reschedule, Reassign, AlternateResource]),
                    );
                }
                continue;
            }
            for a in &group {
                let wa = ctx.occupied_window(a);
                let held: Vec<&Assignment> = group
                    .iter()
                    .copied()
                    .filter(|o| ctx.occupied_window(o).overlaps(&wa))
                    .collect();
                if held.len() > capacity {
                    out.push(
                        Conflict::new(
                            ConflictType::ResourceDoubleBooking,
                            resource_id,
                            0.9,
                            format!(
                                "Resource {resource_id} holds {} sessions, capacity {capacity}",
                                held.len()
                            ),
                            held.iter().map(|o| o.key()).collect(),
                        )
                        .with_resource(resource_id)
                        .with_strategies(&[Reschedule, Reassign, AlternateResource]),
                    );
                }
            }
        }
        out
    }

    /// Teachers with overlapping sessions.
    pub fn detect_teacher_overload(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let teachers: BTreeSet<&str> = ctx
            .problem
            .requests
            .iter()
            .flat_map(|r| r.all_teachers())
            .collect();
        let mut out = Vec::new();
        for teacher_id in teachers {
            let group: Vec<&Assignment> = solution
                .iter()
                .filter(|a| ctx.teaches(teacher_id, &a.request_id) || a.uses_resource(teacher_id))
                .collect();
            for (a, b) in overlapping_pairs(&group, ctx) {
                out.push(
                    Conflict::new(
                        ConflictType::TeacherOverload,
                        teacher_id,
                        0.8,
                        format!(
                            "Teacher {teacher_id} has overlapping sessions {} and {}",
                            a.request_id,
                            b.request_id
                        ),
                        vec![a.key(), b.key()],
                    )
                    .with_teacher(teacher_id)
                    .with_strategies(&[Reschedule, AdjustDuration]),
                );
            }
        }
        out
    }

    /// Classrooms that do not fit the class.
    pub fn detect_capacity(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let buffer = ctx.config.capacity_buffer;
        let mut out = Vec::new();
        for a in solution {
            let Some(request) = ctx
                .request(&a.request_id)
                .filter(|r| r.needs_room_capacity())
            else {
                continue;
            };
            for room in a.resources_of(ResourceType::Classroom).filter_map(|id| ctx.resource(id)) {
                if let Err(mismatch) = check_room(room, request, buffer) {
                    out.push(
                        Conflict::new(
                            ConflictType::CapacityExceeded,
                            &room.id,
                            0.7,
                            format!("Room {} does not fit {}: {mismatch:?}", room.id, request.id),
                            vec![a.key()],
                        )
                        .with_resource(&room.id)
                        .with_strategies(&[Reassign, AlternateResource]),
                    );
                }
            }
        }
        out
    }

    /// Sessions inside calendar, resource or holiday blackouts.
    pub fn detect_blackouts(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let blackout = |entity: &str, a: &Assignment, what: String| {
            Conflict::new(ConflictType::BlackoutDate, entity, 1.0, what, vec![a.key()])
                .with_strategies(&[Reschedule])
        };
        let mut out = Vec::new();
        for a in solution {
            let window = a.window();
            if let Some(cal) = ctx.institutional_calendar().filter(|c| !c.is_available(&window)) {
                let what = format!("{} falls in an institutional blackout", a.request_id);
                out.push(blackout(&cal.id, a, what));
            }
            for resource in a.resource_ids().filter_map(|id| ctx.resource(id)) {
                let own_calendar_blocks = resource
                    .availability_calendar_id
                    .as_deref()
                    .and_then(|id| ctx.calendar(id))
                    .is_some_and(|c| !c.is_available(&window));
                if resource.blackout_overlapping(&window).is_some() || own_calendar_blocks {
                    out.push(
                        blackout(
                            &resource.id,
                            a,
                            format!("{} uses {} while unavailable", a.request_id, resource.id),
                        )
                            .with_resource(&resource.id),
                    );
                }
            }
            let avoids = ctx.request(&a.request_id).is_some_and(|r| r.avoid_holidays);
            let holidays = ctx.holidays().filter(|h| avoids && !h.is_schedulable_day(a.date()));
            if let Some(holidays) = holidays {
                let what = format!("{} falls on a holiday ({})", a.request_id, a.date());
                out.push(blackout(&holidays.id, a, what));
            }
        }
        out
    }

    /// Students attending overlapping sessions.
    pub fn detect_student_conflicts(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let mut out = Vec::new();
        for student in &ctx.problem.students {
            let group: Vec<&Assignment> = solution
                .iter()
                .filter(|a| student.is_enrolled_in(&a.request_id))
                .collect();
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if a.request_id != b.request_id && a.window().overlaps(&b.window()) {
                        out.push(
                            Conflict::new(
                                ConflictType::StudentConflict,
                                &student.id,
                                0.6,
                                format!(
                                    "Student {} attends {} and {} at once",
                                    student.id,
                                    a.request_id,
                                    b.request_id
                                ),
                                vec![a.key(), b.key()],
                            )
                            .with_student(&student.id)
                            .with_strategies(&[Reschedule]),
                        );
                    }
                }
            }
        }
        out
    }

    /// Scheduled requests whose prerequisites are not scheduled at all.
    pub fn detect_prerequisites(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Conflict> {
        let scheduled: BTreeSet<&str> = solution.iter().map(|a| a.request_id.as_str()).collect();
        let mut out = Vec::new();
        for request in ctx.problem.requests.iter().filter(|r| scheduled.contains(r.id.as_str())) {
            let missing = request
                .prerequisites
                .iter()
                .filter(|p| !scheduled.contains(p.as_str()));
            for prerequisite in missing {
                let keys = solution
                    .iter()
                    .filter(|a| a.request_id == request.id)
                    .map(Assignment::key)
                    .collect();
                out.push(
                    Conflict::new(
                        ConflictType::PrerequisiteViolation,
                        prerequisite,
                        0.5,
                        format!(
                            "{} is scheduled but its prerequisite {prerequisite} is not",
                            request.id
                        ),
                        keys,
                    )
                    .with_strategies(&[Remove]),
                );
            }
        }
        out
    }

    /// Remaining hard-constraint violations, one conflict per violation.
    pub fn detect_constraint_violations(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
        constraints: &ConstraintSet,
    ) -> Vec<Conflict> {
        let mut out = Vec::new();
        for a in solution {
            let violations: Vec<Violation> = constraints
                .check_all(a, solution, ctx)
                .into_iter()
                .filter(|v| {
                    !COVERED.contains(&v.constraint_type.as_str())
                        && !self.is_relaxed(&v.constraint_type)
                })
                .collect();
            for v in violations {
                let mut keys = vec![a.key()];
                let occurrence = v.details.get("conflicting_occurrence");
                if let (Some(other), Some(n)) = (v.conflicting_request(), occurrence) {
                    if let Ok(n) = n.parse::<u32>() {
                        keys.push((other.to_string(), n));
                    }
                }
                let mut conflict = Conflict::new(
                    generic_type(&v.constraint_type),
                    &v.constraint_type,
                    0.5,
                    format!("Constraint violation: {}", v.message),
                    keys,
                )
                .with_strategies(&[Reschedule, RelaxConstraint]);
                if let Some(rid) = &v.affected_resource_id {
                    conflict = conflict.with_resource(rid);
                }
                out.push(conflict.with_violation(v));
            }
        }
        out
    }
}
