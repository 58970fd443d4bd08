//! Teacher constraints.
//!
//! A teacher is involved in an assignment when they lead or co-teach the
//! request, or when they are booked as an `Instructor` resource under
//! their own id.

use chrono::{Datelike, Duration};

use super::{Constraint, ConstraintContext, Violation};
use crate::models::Assignment;

fn involves(ctx: &ConstraintContext<'_>, teacher_id: &str, assignment: &Assignment) -> bool {
    ctx.teaches(teacher_id, &assignment.request_id) || assignment.uses_resource(teacher_id)
}

fn hours(d: Duration) -> f64 {
    d.num_minutes() as f64 / 60.0
}

/// A teacher never teaches two overlapping sessions.
#[derive(Debug, Clone)]
pub struct TeacherConflict {
    pub teacher_id: String,
}

impl TeacherConflict {
    pub fn new(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
        }
    }
}

impl Constraint for TeacherConflict {
    fn constraint_type(&self) -> &'static str {
        "hard.teacher_conflict"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !involves(ctx, &self.teacher_id, assignment) {
            return None;
        }
        let occupied = ctx.occupied_window(assignment);
        let other = solution.iter().find(|o| {
            !o.same_occurrence(assignment)
                && involves(ctx, &self.teacher_id, o)
                && ctx.occupied_window(o).overlaps(&occupied)
        })?;
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Teacher {} already teaches {} at {}",
                    self.teacher_id, other.request_id, other.start_time
                ),
            )
            .with_resource(&self.teacher_id)
            .with_detail("conflicting_request", &other.request_id)
            .with_detail("conflicting_occurrence", other.occurrence_index)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Sessions fall on the teacher's preferred days.
#[derive(Debug, Clone)]
pub struct TeacherAvailability {
    pub teacher_id: String,
}

impl TeacherAvailability {
    pub fn new(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
        }
    }
}

impl Constraint for TeacherAvailability {
    fn constraint_type(&self) -> &'static str {
        "hard.teacher_availability"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !involves(ctx, &self.teacher_id, assignment) {
            return None;
        }
        let teacher = ctx.teacher(&self.teacher_id)?;
        let day = assignment.start_time.weekday();
        if teacher.works_on(day) {
            return None;
        }
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!("Teacher {} does not teach on {day}", teacher.id),
            )
            .with_resource(&teacher.id)
            .with_detail("weekday", day)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Daily and weekly teaching hours stay within the teacher's caps.
///
/// Weeks are ISO weeks.
#[derive(Debug, Clone)]
pub struct TeacherWorkload {
    pub teacher_id: String,
}

impl TeacherWorkload {
    pub fn new(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
        }
    }
}

impl Constraint for TeacherWorkload {
    fn constraint_type(&self) -> &'static str {
        "hard.teacher_workload"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !involves(ctx, &self.teacher_id, assignment) {
            return None;
        }
        let teacher = ctx.teacher(&self.teacher_id)?;
        if teacher.max_daily_hours.is_none() && teacher.max_weekly_hours.is_none() {
            return None;
        }

        let day = assignment.date();
        let week = day.iso_week();
        let mut daily = hours(assignment.duration());
        let mut weekly = daily;
        for other in solution
            .iter()
            .filter(|o| !o.same_occurrence(assignment) && involves(ctx, &self.teacher_id, o))
        {
            let d = other.date();
            if d.iso_week() == week {
                weekly += hours(other.duration());
                if d == day {
                    daily += hours(other.duration());
                }
            }
        }

        let (scope, load, cap) = match (teacher.max_daily_hours, teacher.max_weekly_hours) {
            (Some(cap), _) if daily > cap + 1e-9 => ("day", daily, cap),
            (_, Some(cap)) if weekly > cap + 1e-9 => ("week", weekly, cap),
            _ => return None,
        };
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Teacher {} would teach {load:.1}h this {scope}, above {cap:.1}h",
                    teacher.id
                ),
            )
            .with_resource(&teacher.id)
            .with_detail("scope", scope)
            .with_detail("hours", format!("{load:.2}")),
        )
    }
}

/// Same-day sessions in different buildings leave time to travel.
#[derive(Debug, Clone)]
pub struct TeacherTravelTime {
    pub teacher_id: String,
}

impl TeacherTravelTime {
    pub fn new(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
        }
    }
}

impl Constraint for TeacherTravelTime {
    fn constraint_type(&self) -> &'static str {
        "hard.teacher_travel_time"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !involves(ctx, &self.teacher_id, assignment) {
            return None;
        }
        let teacher = ctx.teacher(&self.teacher_id)?;
        if teacher.min_travel_minutes <= 0 {
            return None;
        }
        let here = ctx.building_of(assignment)?;
        let travel = Duration::minutes(teacher.min_travel_minutes);
        let day = assignment.date();

        let other = solution.iter().find(|o| {
            if o.same_occurrence(assignment)
                || o.date() != day
                || !involves(ctx, &self.teacher_id, o)
            {
                return false;
            }
            match ctx.building_of(o) {
                Some(there) if there != here => {
                    let gap = if o.end_time <= assignment.start_time {
                        assignment.start_time - o.end_time
                    } else {
                        o.start_time - assignment.end_time
                    };
                    gap < travel
                }
                _ => false,
            }
        })?;
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Teacher {} cannot reach {here} from {} ({}) within {} minutes",
                    teacher.id,
                    ctx.building_of(other).unwrap_or("?"),
                    other.request_id,
                    teacher.min_travel_minutes
                ),
            )
            .with_resource(&teacher.id)
            .with_detail("conflicting_request", &other.request_id),
        )
    }
}
