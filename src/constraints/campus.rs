//! Campus operating-hours constraint.

use super::{Constraint, ConstraintContext, Violation};
use crate::models::Assignment;

/// Sessions in a campus's buildings run within its operating hours.
///
/// A session crossing midnight is always outside operating hours.
#[derive(Debug, Clone)]
pub struct CampusHours {
    pub campus_id: String,
}

impl CampusHours {
    pub fn new(campus_id: impl Into<String>) -> Self {
        Self {
            campus_id: campus_id.into(),
        }
    }
}

impl Constraint for CampusHours {
    fn constraint_type(&self) -> &'static str {
        "hard.campus_hours"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        let building = ctx.building(ctx.building_of(assignment)?)?;
        if building.campus_id != self.campus_id {
            return None;
        }
        let campus = ctx.campus(&self.campus_id)?;
        let (start, end) = (assignment.start_time.time(), assignment.end_time.time());
        if assignment.end_time.date_naive() == assignment.date()
            && campus.is_open_between(start, end)
        {
            return None;
        }
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Campus {} is open {} - {}, session runs {start} - {end}",
                    campus.id, campus.opening_time, campus.closing_time
                ),
            )
            .with_detail("campus_id", &campus.id)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::{Building, Campus, Problem, Resource, ResourceType};
    use chrono::{NaiveTime, TimeZone, Utc};

    #[test]
    fn test_campus_hours() {
        let p = Problem::new()
            .with_campus(Campus::new("main").with_hours(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            ))
            .with_building(Building::new("B1", "main"))
            .with_resource(
                Resource::new("R1", ResourceType::Classroom)
                    .with_building("B1", Some(2)),
            )
            .with_resource(Resource::new("R2", ResourceType::Classroom));
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap();
        let c = CampusHours::new("main");

        let day = Assignment::new("a", 0, at(9), at(11))
            .with_resource(ResourceType::Classroom, "R1");
        assert!(c.check(&day, &[], &ctx).is_none());
        let evening = Assignment::new("a", 0, at(17), at(19))
            .with_resource(ResourceType::Classroom, "R1");
        assert!(c.check(&evening, &[], &ctx).is_some());
        let elsewhere = Assignment::new("a", 0, at(17), at(19))
            .with_resource(ResourceType::Classroom, "R2");
        assert!(c.check(&elsewhere, &[], &ctx).is_none());
    }
}
