//! Ordered collection of hard constraints.

use std::sync::Arc;

use super::{
    AttributeMatch, BlackoutDates, CampusHours, ClassroomCapacity, Constraint, ConstraintContext,
    EquipmentQuantity, HolidayAvoidance, MinGapBetweenOccurrences, NoOverlap, ResourceBlackout,
    SchedulingPatternRule, StudentConflict, TeacherAvailability, TeacherConflict,
    TeacherTravelTime, TeacherWorkload, Violation, WithinDateRange,
};
use crate::models::{Assignment, Problem, ResourceType};

/// The hard constraints a solver enforces, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Arc<dyn Constraint>>,
}

impl ConstraintSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in constraints derived from the problem, followed by the
    /// problem's own pluggable constraints.
    ///
    /// Constraints that cannot fire for an entity (no blackouts, no
    /// limits) are not instantiated.
    pub fn standard(problem: &Problem) -> Self {
        let mut set = Self::new();

        for resource in &problem.resources {
            set.push(NoOverlap::new(&resource.id));
            if !resource.blackout_periods.is_empty() {
                set.push(ResourceBlackout::new(&resource.id));
            }
        }
        for calendar in &problem.calendars {
            if !calendar.blackout_periods.is_empty() || !calendar.availability_windows.is_empty() {
                set.push(BlackoutDates::new(&calendar.id));
            }
        }

        for request in &problem.requests {
            set.push(WithinDateRange::new(&request.id));
            set.push(EquipmentQuantity::new(&request.id));
            if !request.required_attributes.is_empty() {
                set.push(AttributeMatch::new(&request.id));
            }
            if request.needs_room_capacity()
                && request.required_resource_types.contains_key(&ResourceType::Classroom)
            {
                set.push(ClassroomCapacity::new(&request.id));
            }
            set.push(SchedulingPatternRule::new(&request.id));
            if request.avoid_holidays && problem.holiday_calendar.is_some() {
                set.push(HolidayAvoidance::new(&request.id));
            }
            if request.min_gap_minutes > 0 {
                set.push(MinGapBetweenOccurrences::new(&request.id));
            }
        }

        for teacher in &problem.teachers {
            set.push(TeacherConflict::new(&teacher.id));
            if !teacher.preferred_days.is_empty() {
                set.push(TeacherAvailability::new(&teacher.id));
            }
            if teacher.max_daily_hours.is_some() || teacher.max_weekly_hours.is_some() {
                set.push(TeacherWorkload::new(&teacher.id));
            }
            if teacher.min_travel_minutes > 0 {
                set.push(TeacherTravelTime::new(&teacher.id));
            }
        }
        if !problem.students.is_empty() {
            set.push(StudentConflict::new(&problem.students));
        }
        for campus in &problem.campuses {
            set.push(CampusHours::new(&campus.id));
        }

        set.constraints.extend(problem.constraints.iter().cloned());
        set
    }

    /// Appends a constraint.
    pub fn push<C: Constraint + 'static>(&mut self, constraint: C) {
        self.constraints.push(Arc::new(constraint));
    }

    /// Appends a shared constraint.
    pub fn push_shared(&mut self, constraint: Arc<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    /// Copy without constraints whose type starts with `prefix`.
    pub fn without(&self, prefix: &str) -> Self {
        Self {
            constraints: self
                .constraints
                .iter()
                .filter(|c| !c.constraint_type().starts_with(prefix))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Constraint>> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// First violation of `assignment` against `solution`.
    pub fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        self.constraints
            .iter()
            .find_map(|c| c.check(assignment, solution, ctx))
    }

    /// Every violation of `assignment` against `solution`.
    pub fn check_all(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Violation> {
        self.constraints
            .iter()
            .filter_map(|c| c.check(assignment, solution, ctx))
            .collect()
    }

    /// Violations of every assignment in `solution` against the rest.
    pub fn violations_in(
        &self,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Violation> {
        solution
            .iter()
            .flat_map(|a| self.check_all(a, solution, ctx))
            .collect()
    }

    /// Number of violations in `solution`.
    pub fn count_violations(&self, solution: &[Assignment], ctx: &ConstraintContext<'_>) -> usize {
        solution
            .iter()
            .map(|a| {
                self.constraints
                    .iter()
                    .filter(|c| c.check(a, solution, ctx).is_some())
                    .count()
            })
            .sum()
    }

    /// Whether `solution` violates nothing.
    pub fn is_valid(&self, solution: &[Assignment], ctx: &ConstraintContext<'_>) -> bool {
        solution.iter().all(|a| self.check(a, solution, ctx).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::{Calendar, Resource, SessionRequest, Student, Teacher};
    use chrono::{TimeZone, Utc};

    fn problem() -> Problem {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        Problem::new()
            .with_request(
                SessionRequest::new("cs101", 60, 2, start, end)
                    .with_resource_type(ResourceType::Classroom, 1)
                    .with_teacher("t1"),
            )
            .with_request(
                SessionRequest::new("ma201", 60, 2, start, end)
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40))
            .with_calendar(Calendar::new("inst"))
            .with_teacher(Teacher::new("t1"))
            .with_student(Student::new("s1").with_enrollment("cs101").with_enrollment("ma201"))
    }

    #[test]
    fn test_standard_set() {
        let p = problem();
        let set = ConstraintSet::standard(&p);
        let types: Vec<&str> = set.iter().map(|c| c.constraint_type()).collect();
        assert!(types.contains(&"hard.no_overlap"));
        assert!(types.contains(&"hard.classroom_capacity"));
        assert!(types.contains(&"hard.teacher_conflict"));
        assert!(types.contains(&"hard.student_conflict"));
        // calendar without blackouts or windows adds nothing
        assert!(!types.contains(&"hard.blackout_dates"));

        let relaxed = set.without("hard.student");
        assert_eq!(relaxed.len(), set.len() - 1);
    }

    #[test]
    fn test_violations_in_solution() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap();

        let clash = vec![
            Assignment::new("cs101", 0, at(9), at(10)).with_resource(ResourceType::Classroom, "R1"),
            Assignment::new("ma201", 0, at(9), at(10)).with_resource(ResourceType::Classroom, "R1"),
        ];
        assert!(!set.is_valid(&clash, &ctx));
        // room and student conflict, reported from both sides
        assert_eq!(set.count_violations(&clash, &ctx), 4);
        assert_eq!(set.violations_in(&clash, &ctx).len(), 4);

        let apart = vec![
            Assignment::new("cs101", 0, at(9), at(10)).with_resource(ResourceType::Classroom, "R1"),
            Assignment::new("ma201", 0, at(13), at(14))
                .with_resource(ResourceType::Classroom, "R1"),
        ];
        assert!(set.is_valid(&apart, &ctx));
    }
}
