//! Student conflict constraint.

use std::collections::{BTreeMap, BTreeSet};

use super::{Constraint, ConstraintContext, Violation};
use crate::models::{Assignment, Student};

/// No student attends two overlapping sessions.
///
/// Enrollments are inverted once at construction so a check only looks
/// at requests that share students with the candidate.
#[derive(Debug, Clone, Default)]
pub struct StudentConflict {
    /// Request id -> enrolled student ids.
    enrollments: BTreeMap<String, BTreeSet<String>>,
}

impl StudentConflict {
    /// Builds the constraint from student enrollments.
    pub fn new(students: &[Student]) -> Self {
        let mut enrollments: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for student in students {
            for request_id in &student.enrolled_requests {
                enrollments
                    .entry(request_id.clone())
                    .or_default()
                    .insert(student.id.clone());
            }
        }
        Self { enrollments }
    }

    fn shared_student<'s>(&'s self, a: &str, b: &str) -> Option<&'s str> {
        let left = self.enrollments.get(a)?;
        let right = self.enrollments.get(b)?;
        left.intersection(right).next().map(String::as_str)
    }
}

impl Constraint for StudentConflict {
    fn constraint_type(&self) -> &'static str {
        "hard.student_conflict"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        _ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !self.enrollments.contains_key(&assignment.request_id) {
            return None;
        }
        let window = assignment.window();
        solution
            .iter()
            .filter(|o| o.request_id != assignment.request_id && o.window().overlaps(&window))
            .find_map(|o| {
                let student = self.shared_student(&assignment.request_id, &o.request_id)?;
                Some(
                    Violation::new(
                        self.constraint_type(),
                        &assignment.request_id,
                        format!(
                            "Student {student} attends both {} and {} at {}",
                            assignment.request_id, o.request_id, o.start_time
                        ),
                    )
                    .with_detail("student_id", student)
                    .with_detail("conflicting_request", &o.request_id)
                    .with_detail("conflicting_occurrence", o.occurrence_index)
                    .with_detail("occurrence_index", assignment.occurrence_index),
                )
            })
    }
}
