//! Built-in hard constraints on resources and requests.
//!
//! Each constraint is scoped to one entity (a resource, a calendar or a
//! request) and ignores assignments outside its scope, so a problem
//! carries one instance per entity.

use chrono::{Datelike, Duration};

use super::capacity::{check_room, CapacityMismatch};
use super::{Constraint, ConstraintContext, Violation};
use crate::models::{Assignment, ResourceType};

// ======================== Resource constraints ========================

/// A resource is never booked beyond its concurrency capacity.
///
/// Intervals are compared with setup/cleanup buffers applied, so two
/// sessions in the same room need at least `cleanup + setup` between them.
#[derive(Debug, Clone)]
pub struct NoOverlap {
    /// Guarded resource.
    pub resource_id: String,
}

impl NoOverlap {
    /// Creates the constraint.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
        }
    }
}

impl Constraint for NoOverlap {
    fn constraint_type(&self) -> &'static str {
        "hard.no_overlap"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !assignment.uses_resource(&self.resource_id) {
            return None;
        }
        let capacity = ctx
            .resource(&self.resource_id)
            .map_or(1, |r| r.concurrency_capacity.max(1)) as usize;
        let occupied = ctx.occupied_window(assignment);

        let mut overlapping = solution.iter().filter(|other| {
            !other.same_occurrence(assignment)
                && other.uses_resource(&self.resource_id)
                && ctx.occupied_window(other).overlaps(&occupied)
        });
        let first = overlapping.next()?;
        let count = 1 + overlapping.count();
        if count < capacity {
            return None;
        }

        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Resource {} double-booked: {} overlaps {} at {}",
                    self.resource_id, assignment.request_id, first.request_id, first.start_time
                ),
            )
            .with_resource(&self.resource_id)
            .with_detail("conflicting_request", &first.request_id)
            .with_detail("conflicting_occurrence", first.occurrence_index)
            .with_detail("occurrence_index", assignment.occurrence_index)
            .with_detail("overlap_count", count),
        )
    }
}

/// No session overlaps a blackout of the given calendar.
///
/// The institutional calendar applies to every assignment; any other
/// calendar applies to assignments using a resource that references it.
#[derive(Debug, Clone)]
pub struct BlackoutDates {
    /// Calendar whose blackouts and windows apply.
    pub calendar_id: String,
}

impl BlackoutDates {
    /// Creates the constraint.
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
        }
    }
}

impl Constraint for BlackoutDates {
    fn constraint_type(&self) -> &'static str {
        "hard.blackout_dates"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        let calendar = ctx.calendar(&self.calendar_id)?;
        let institutional =
            ctx.problem.institutional_calendar_id.as_deref() == Some(self.calendar_id.as_str());
        let via_resource = assignment
            .resource_ids()
            .filter_map(|id| ctx.resource(id))
            .find(|r| r.availability_calendar_id.as_deref() == Some(self.calendar_id.as_str()));
        if !institutional && via_resource.is_none() {
            return None;
        }

        let window = assignment.window();
        if calendar.is_available(&window) {
            return None;
        }
        let mut v = Violation::new(
            self.constraint_type(),
            &assignment.request_id,
            match calendar.blocking_blackout(&window) {
                Some(b) => format!(
                    "{} at {} falls in blackout {} - {} of calendar {}",
                    assignment.request_id, assignment.start_time, b.start, b.end, calendar.id
                ),
                None => format!(
                    "{} at {} is outside the availability windows of calendar {}",
                    assignment.request_id, assignment.start_time, calendar.id
                ),
            },
        )
        .with_detail("calendar_id", &calendar.id)
        .with_detail("occurrence_index", assignment.occurrence_index);
        if let Some(r) = via_resource {
            v = v.with_resource(&r.id);
        }
        Some(v)
    }
}

/// A resource is not used during its own blackout periods.
#[derive(Debug, Clone)]
pub struct ResourceBlackout {
    /// Guarded resource.
    pub resource_id: String,
}

impl ResourceBlackout {
    /// Creates the constraint.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
        }
    }
}

impl Constraint for ResourceBlackout {
    fn constraint_type(&self) -> &'static str {
        "hard.resource_blackout"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !assignment.uses_resource(&self.resource_id) {
            return None;
        }
        let resource = ctx.resource(&self.resource_id)?;
        let blackout = resource.blackout_overlapping(&assignment.window())?;
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Resource {} unavailable {} - {}",
                    resource.id, blackout.start, blackout.end
                ),
            )
            .with_resource(&resource.id)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// A resource hosts at most `max` sessions per day.
#[derive(Debug, Clone)]
pub struct MaxPerDay {
    /// Guarded resource.
    pub resource_id: String,
    /// Daily cap.
    pub max: usize,
}

impl MaxPerDay {
    /// Creates the constraint.
    pub fn new(resource_id: impl Into<String>, max: usize) -> Self {
        Self {
            resource_id: resource_id.into(),
            max,
        }
    }
}

impl Constraint for MaxPerDay {
    fn constraint_type(&self) -> &'static str {
        "hard.max_per_day"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        _ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if !assignment.uses_resource(&self.resource_id) {
            return None;
        }
        let day = assignment.date();
        let same_day = solution
            .iter()
            .filter(|a| {
                !a.same_occurrence(assignment)
                    && a.uses_resource(&self.resource_id)
                    && a.date() == day
            })
            .count();
        if same_day < self.max {
            return None;
        }
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!("Resource {} exceeds {} sessions on {}", self.resource_id, self.max, day),
            )
            .with_resource(&self.resource_id)
            .with_detail("count", same_day + 1)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Each required resource type receives the requested number of resources.
#[derive(Debug, Clone)]
pub struct EquipmentQuantity {
    /// Guarded request.
    pub request_id: String,
}

impl EquipmentQuantity {
    /// Creates the constraint.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Constraint for EquipmentQuantity {
    fn constraint_type(&self) -> &'static str {
        "hard.equipment_quantity"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        for (rtype, &needed) in &request.required_resource_types {
            let got = assignment.resources_of(*rtype).count();
            if got < needed as usize {
                return Some(
                    Violation::new(
                        self.constraint_type(),
                        &assignment.request_id,
                        format!("{} needs {needed} {rtype} resource(s), got {got}", request.id),
                    )
                    .with_detail("resource_type", rtype)
                    .with_detail("required", needed)
                    .with_detail("assigned", got),
                );
            }
        }
        None
    }
}

// ======================== Request constraints ========================

/// Occurrences stay inside the request's date window.
#[derive(Debug, Clone)]
pub struct WithinDateRange {
    /// Guarded request.
    pub request_id: String,
}

impl WithinDateRange {
    /// Creates the constraint.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Constraint for WithinDateRange {
    fn constraint_type(&self) -> &'static str {
        "hard.within_date_range"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        if assignment.start_time >= request.earliest_date
            && assignment.end_time <= request.latest_date
        {
            return None;
        }
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "{} occurrence {} at {} is outside {} - {}",
                    request.id,
                    assignment.occurrence_index,
                    assignment.start_time,
                    request.earliest_date,
                    request.latest_date
                ),
            )
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Assigned rooms (or all resources without a room) meet required attributes.
#[derive(Debug, Clone)]
pub struct AttributeMatch {
    /// Guarded request.
    pub request_id: String,
}

impl AttributeMatch {
    /// Creates the constraint.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Constraint for AttributeMatch {
    fn constraint_type(&self) -> &'static str {
        "hard.attribute_match"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        if request.required_attributes.is_empty() {
            return None;
        }
        let target = request.attribute_target();
        let failing = assignment
            .assigned_resources
            .iter()
            .filter(|(rtype, _)| target.map_or(true, |t| t == **rtype))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| ctx.resource(id))
            .find(|r| !r.can_satisfy(&request.required_attributes))?;

        let missing: Vec<&str> = request
            .required_attributes
            .iter()
            .filter(|(k, req)| !req.is_satisfied_by(failing.attributes.get(*k)))
            .map(|(k, _)| k.as_str())
            .collect();
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Resource {} lacks required attributes: {}",
                    failing.id,
                    missing.join(", ")
                ),
            )
            .with_resource(&failing.id)
            .with_detail("missing", missing.join(",")),
        )
    }
}

/// Rooms seat the enrollment plus buffer and respect the request maximum.
///
/// Skipped for online and hybrid sessions.
#[derive(Debug, Clone)]
pub struct ClassroomCapacity {
    /// Guarded request.
    pub request_id: String,
    /// Override of the configured buffer.
    pub buffer: Option<f64>,
}

impl ClassroomCapacity {
    /// Creates the constraint using the configured buffer.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            buffer: None,
        }
    }

    /// Uses a fixed buffer instead of the configured one.
    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = Some(buffer);
        self
    }
}

impl Constraint for ClassroomCapacity {
    fn constraint_type(&self) -> &'static str {
        "hard.classroom_capacity"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        if !request.needs_room_capacity() {
            return None;
        }
        let buffer = self.buffer.unwrap_or(ctx.config.capacity_buffer);
        for room in assignment
            .resources_of(ResourceType::Classroom)
            .filter_map(|id| ctx.resource(id))
        {
            let message = match check_room(room, request, buffer) {
                Ok(()) => continue,
                Err(CapacityMismatch::Unknown) => {
                    format!("Room {} has no capacity defined", room.id)
                }
                Err(CapacityMismatch::TooSmall { capacity, needed }) => format!(
                    "Room {} seats {capacity}, {} needs {needed} (enrollment {} + {:.0}% buffer)",
                    room.id,
                    request.id,
                    request.enrollment_count,
                    buffer * 100.0
                ),
                Err(CapacityMismatch::TooLarge { capacity, max }) => format!(
                    "Room {} seats {capacity}, above the {max} maximum of {}",
                    room.id, request.id
                ),
            };
            return Some(
                Violation::new(self.constraint_type(), &assignment.request_id, message)
                    .with_resource(&room.id)
                    .with_detail("enrollment", request.enrollment_count)
                    .with_detail("capacity", room.capacity.unwrap_or(0)),
            );
        }
        None
    }
}

/// Occurrences fall on the weekdays of the request's pattern.
#[derive(Debug, Clone)]
pub struct SchedulingPatternRule {
    /// Guarded request.
    pub request_id: String,
}

impl SchedulingPatternRule {
    /// Creates the constraint.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Constraint for SchedulingPatternRule {
    fn constraint_type(&self) -> &'static str {
        "hard.scheduling_pattern"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        let weekday = assignment.start_time.weekday();
        let pattern = request.pattern();
        if pattern.allows(weekday) {
            return None;
        }
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "{} scheduled on {weekday}, which is not in pattern {}",
                    request.id,
                    pattern.tag()
                ),
            )
            .with_detail("weekday", weekday)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Occurrences avoid holiday-calendar days when the request asks to.
#[derive(Debug, Clone)]
pub struct HolidayAvoidance {
    /// Guarded request.
    pub request_id: String,
}

impl HolidayAvoidance {
    /// Creates the constraint.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Constraint for HolidayAvoidance {
    fn constraint_type(&self) -> &'static str {
        "hard.holiday_avoidance"
    }

    fn check(
        &self,
        assignment: &Assignment,
        _solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let request = ctx.request(&self.request_id)?;
        let holidays = ctx.holidays()?;
        let day = assignment.date();
        if !request.avoid_holidays || holidays.is_schedulable_day(day) {
            return None;
        }
        let reason = holidays
            .holiday_on(day)
            .map_or_else(|| format!("{} is not a teaching day", day.weekday()), |h| h.name.clone());
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!("{} scheduled on {day} ({reason})", request.id),
            )
            .with_detail("date", day)
            .with_detail("occurrence_index", assignment.occurrence_index),
        )
    }
}

/// Consecutive occurrences of a request are at least `min_gap` apart.
#[derive(Debug, Clone)]
pub struct MinGapBetweenOccurrences {
    /// Guarded request.
    pub request_id: String,
    /// Override of the request's own gap, in minutes.
    pub gap_minutes: Option<i64>,
}

impl MinGapBetweenOccurrences {
    /// Creates the constraint using the request's gap.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            gap_minutes: None,
        }
    }

    /// Uses a fixed gap.
    pub fn with_gap_minutes(mut self, minutes: i64) -> Self {
        self.gap_minutes = Some(minutes);
        self
    }
}

impl Constraint for MinGapBetweenOccurrences {
    fn constraint_type(&self) -> &'static str {
        "hard.min_gap_between_occurrences"
    }

    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        if assignment.request_id != self.request_id {
            return None;
        }
        let minutes = match self.gap_minutes {
            Some(m) => m,
            None => ctx.request(&self.request_id)?.min_gap_minutes,
        };
        if minutes <= 0 {
            return None;
        }
        let gap = Duration::minutes(minutes);
        let too_close = solution.iter().find(|other| {
            other.request_id == assignment.request_id
                && !other.same_occurrence(assignment)
                && {
                    let (first, second) = if other.start_time <= assignment.start_time {
                        (*other, assignment)
                    } else {
                        (assignment, *other)
                    };
                    second.start_time - first.end_time < gap
                }
        })?;
        Some(
            Violation::new(
                self.constraint_type(),
                &assignment.request_id,
                format!(
                    "Occurrences {} and {} of {} are closer than {minutes} minutes",
                    assignment.occurrence_index, too_close.occurrence_index, assignment.request_id
                ),
            )
            .with_detail("occurrence_index", assignment.occurrence_index)
            .with_detail("conflicting_occurrence", too_close.occurrence_index),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::{
        AttributeRequirement, Calendar, HolidayCalendar, HolidayPeriod, Modality, Problem,
        ProblemIndices, Resource, SchedulingPattern, SessionRequest, Teacher,
    };
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn problem() -> Problem {
        let term = (at(15, 0, 0), Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap());
        Problem::new()
            .with_request(
                SessionRequest::new("cs101", 60, 3, term.0, term.1)
                    .with_enrollment(45)
                    .with_resource_type(ResourceType::Classroom, 1)
                    .with_teacher("t1")
                    .with_attribute("projector", AttributeRequirement::Required(true.into()))
                    .with_pattern(SchedulingPattern::ThreeDaysMonWed)
                    .with_min_gap_minutes(24 * 60),
            )
            .with_request(
                SessionRequest::new("ma201", 60, 1, term.0, term.1)
                    .with_enrollment(20)
                    .with_resource_type(ResourceType::Classroom, 1)
                    .with_modality(Modality::Online),
            )
            .with_resource(
                Resource::new("R1", ResourceType::Classroom)
                    .with_capacity(50)
                    .with_attribute("projector", true)
                    .with_calendar("rooms"),
            )
            .with_resource(Resource::new("R2", ResourceType::Classroom).with_capacity(30))
            .with_teacher(Teacher::new("t1").with_buffers(15, 10))
            .with_calendar(Calendar::new("rooms").with_blackout(at(17, 12, 0), at(17, 13, 0)))
            .with_holiday_calendar(
                HolidayCalendar::new("h").with_holiday(HolidayPeriod::new(
                    "MLK",
                    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                )),
            )
    }

    fn ctx<'a>(p: &'a Problem, idx: &'a ProblemIndices) -> ConstraintContext<'a> {
        ConstraintContext::new(p, idx, ConstraintConfig::default())
    }

    fn room(req: &str, occ: u32, start: DateTime<Utc>, end: DateTime<Utc>, r: &str) -> Assignment {
        Assignment::new(req, occ, start, end).with_resource(ResourceType::Classroom, r)
    }

    #[test]
    fn test_no_overlap_with_buffers() {
        let p = problem();
        let idx = p.build_indices();
        let c = NoOverlap::new("R1");
        let existing = vec![room("ma201", 0, at(16, 9, 0), at(16, 10, 0), "R1")];

        // 10:00 start collides with 10 min cleanup + 15 min setup
        let tight = room("cs101", 0, at(16, 10, 0), at(16, 11, 0), "R1");
        let v = c.check(&tight, &existing, &ctx(&p, &idx)).unwrap();
        assert_eq!(v.conflicting_request(), Some("ma201"));

        let spaced = room("cs101", 0, at(16, 10, 30), at(16, 11, 30), "R1");
        assert!(c.check(&spaced, &existing, &ctx(&p, &idx)).is_none());

        let other_room = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R2");
        assert!(c.check(&other_room, &existing, &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_no_overlap_skips_self() {
        let p = problem();
        let idx = p.build_indices();
        let a = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R1");
        assert!(NoOverlap::new("R1").check(&a, &[a.clone()], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_no_overlap_respects_concurrency() {
        let p = problem()
            .with_resource(Resource::new("ZOOM", ResourceType::OnlineSlot).with_concurrency(2));
        let idx = p.build_indices();
        let zoom = |req: &str| {
            Assignment::new(req, 0, at(16, 9, 0), at(16, 10, 0))
                .with_resource(ResourceType::OnlineSlot, "ZOOM")
        };
        let c = NoOverlap::new("ZOOM");
        assert!(c.check(&zoom("b"), &[zoom("a")], &ctx(&p, &idx)).is_none());
        assert!(c.check(&zoom("c"), &[zoom("a"), zoom("b")], &ctx(&p, &idx)).is_some());
    }

    #[test]
    fn test_resource_calendar_blackout() {
        let p = problem();
        let idx = p.build_indices();
        let c = BlackoutDates::new("rooms");
        let a = room("cs101", 0, at(17, 11, 30), at(17, 12, 30), "R1");
        let v = c.check(&a, &[], &ctx(&p, &idx)).unwrap();
        assert_eq!(v.affected_resource_id.as_deref(), Some("R1"));
        // R2 does not use the calendar
        let b = room("cs101", 0, at(17, 11, 30), at(17, 12, 30), "R2");
        assert!(c.check(&b, &[], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_within_date_range() {
        let p = problem();
        let idx = p.build_indices();
        let early = room("cs101", 0, at(10, 9, 0), at(10, 10, 0), "R1");
        assert!(WithinDateRange::new("cs101").check(&early, &[], &ctx(&p, &idx)).is_some());
        let ok = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R1");
        assert!(WithinDateRange::new("cs101").check(&ok, &[], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_attribute_match() {
        let p = problem();
        let idx = p.build_indices();
        let a = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R2");
        let v = AttributeMatch::new("cs101").check(&a, &[], &ctx(&p, &idx)).unwrap();
        assert!(v.message.contains("projector"));
    }

    #[test]
    fn test_classroom_capacity() {
        let p = problem();
        let idx = p.build_indices();
        let small = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R2");
        assert!(ClassroomCapacity::new("cs101").check(&small, &[], &ctx(&p, &idx)).is_some());
        let big = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R1");
        assert!(ClassroomCapacity::new("cs101").check(&big, &[], &ctx(&p, &idx)).is_none());
        // online request ignores capacity
        let online = room("ma201", 0, at(16, 9, 0), at(16, 10, 0), "R2");
        assert!(ClassroomCapacity::new("ma201").check(&online, &[], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_pattern_and_holiday() {
        let p = problem();
        let idx = p.build_indices();
        // Jan 18 2024 is a Thursday
        let thu = room("cs101", 0, at(18, 9, 0), at(18, 10, 0), "R1");
        assert!(SchedulingPatternRule::new("cs101").check(&thu, &[], &ctx(&p, &idx)).is_some());
        let mlk = room("cs101", 0, at(15, 9, 0), at(15, 10, 0), "R1");
        assert!(HolidayAvoidance::new("cs101").check(&mlk, &[], &ctx(&p, &idx)).is_some());
        let tue = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R1");
        assert!(HolidayAvoidance::new("cs101").check(&tue, &[], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_min_gap_and_max_per_day() {
        let p = problem();
        let idx = p.build_indices();
        let first = room("cs101", 0, at(16, 9, 0), at(16, 10, 0), "R1");
        let same_day = room("cs101", 1, at(16, 14, 0), at(16, 15, 0), "R1");
        let next_week = room("cs101", 1, at(22, 9, 0), at(22, 10, 0), "R1");
        let gap = MinGapBetweenOccurrences::new("cs101");
        assert!(gap.check(&same_day, &[first.clone()], &ctx(&p, &idx)).is_some());
        assert!(gap.check(&next_week, &[first.clone()], &ctx(&p, &idx)).is_none());

        let cap = MaxPerDay::new("R1", 1);
        assert!(cap.check(&same_day, &[first.clone()], &ctx(&p, &idx)).is_some());
        assert!(cap.check(&next_week, &[first], &ctx(&p, &idx)).is_none());
    }

    #[test]
    fn test_equipment_quantity() {
        let p = problem();
        let idx = p.build_indices();
        let bare = Assignment::new("cs101", 0, at(16, 9, 0), at(16, 10, 0));
        assert!(EquipmentQuantity::new("cs101").check(&bare, &[], &ctx(&p, &idx)).is_some());
    }
}
