//! Resource selection and candidate placement.
//!
//! For one candidate window, picks the required number of resources of
//! each type from the request's qualified resources, then runs the hard
//! constraints against the fully formed assignment.
//!
//! Ranking within a type:
//! - classrooms: preferred building first, then efficiency score (closest
//!   to the ideal capacity ratio), then id
//! - instructors: the request's own teachers first, then id
//! - everything else: id

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::capacity::{check_room, efficiency_score, required_capacity};
use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::models::{Assignment, Resource, ResourceType, SessionRequest, TimeWindow};
use crate::timeline::ResourceTimeline;

/// Why a candidate window was rejected.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// Window outside the request's date range.
    OutsideDateRange,
    /// Institutional calendar blocks the window.
    CalendarUnavailable,
    /// No resource of this type qualifies at all.
    NoQualifiedResource(ResourceType),
    /// Qualified resources exist but too few are free.
    ResourcesBusy(ResourceType),
    /// A hard constraint failed.
    Violation(Violation),
}

impl Rejection {
    /// Reason tag recorded in infeasibility reports.
    pub fn reason(&self) -> &str {
        match self {
            Self::OutsideDateRange => "outside_date_range",
            Self::CalendarUnavailable => "calendar_unavailable",
            Self::NoQualifiedResource(_) => "no_qualified_resource",
            Self::ResourcesBusy(_) => "resources_busy",
            Self::Violation(v) => &v.constraint_type,
        }
    }
}

/// Builds assignments for candidate windows.
#[derive(Debug, Clone, Copy)]
pub struct Placer<'a> {
    ctx: ConstraintContext<'a>,
    constraints: &'a ConstraintSet,
}

impl<'a> Placer<'a> {
    pub fn new(ctx: ConstraintContext<'a>, constraints: &'a ConstraintSet) -> Self {
        Self { ctx, constraints }
    }

    pub fn context(&self) -> &ConstraintContext<'a> {
        &self.ctx
    }

    pub fn constraints(&self) -> &'a ConstraintSet {
        self.constraints
    }

    /// Checks the request window and the institutional calendar.
    pub fn window_allowed(
        &self,
        request: &SessionRequest,
        window: &TimeWindow,
    ) -> Result<(), Rejection> {
        if window.start < request.earliest_date || window.end > request.latest_date {
            return Err(Rejection::OutsideDateRange);
        }
        match self.ctx.institutional_calendar() {
            Some(cal) if !cal.is_available(window) => Err(Rejection::CalendarUnavailable),
            _ => Ok(()),
        }
    }

    /// Whether the resource itself can be booked for `window`
    /// (capacity aside): own blackouts, own calendar, timeline.
    pub fn resource_free(
        &self,
        resource: &Resource,
        window: &TimeWindow,
        occupied: &TimeWindow,
        timeline: &ResourceTimeline,
    ) -> bool {
        if resource.blackout_overlapping(window).is_some() {
            return false;
        }
        let calendar_ok = resource
            .availability_calendar_id
            .as_deref()
            .and_then(|id| self.ctx.calendar(id))
            .map_or(true, |cal| cal.is_available(window));
        calendar_ok && timeline.is_free(&resource.id, occupied, resource.concurrency_capacity)
    }

    /// Qualified resources of `rtype` whose capacity fits the request,
    /// best first, ignoring availability.
    pub fn ranked(&self, request: &SessionRequest, rtype: ResourceType) -> Vec<&'a Resource> {
        let problem = self.ctx.problem;
        let buffer = self.ctx.config.capacity_buffer;
        let mut fitting: Vec<&Resource> = self
            .ctx
            .indices
            .qualified(&request.id, rtype)
            .iter()
            .map(|&i| &problem.resources[i])
            .filter(|r| {
                rtype != ResourceType::Classroom
                    || !request.needs_room_capacity()
                    || check_room(r, request, buffer).is_ok()
            })
            .collect();

        let required = required_capacity(request);
        let ideal = self.ctx.config.efficiency_ideal_ratio;
        let teaches = |r: &Resource| request.all_teachers().any(|t| t == r.id);
        let in_preferred = |r: &Resource| {
            request.preferred_building_id.is_some()
                && r.building_id == request.preferred_building_id
        };
        fitting.sort_by(|a, b| {
            let by_type = match rtype {
                ResourceType::Classroom => in_preferred(b).cmp(&in_preferred(a)).then_with(|| {
                    let ea = efficiency_score(a.capacity.unwrap_or(0), required, ideal);
                    let eb = efficiency_score(b.capacity.unwrap_or(0), required, ideal);
                    eb.partial_cmp(&ea).unwrap_or(Ordering::Equal)
                }),
                ResourceType::Instructor => teaches(b).cmp(&teaches(a)),
                _ => Ordering::Equal,
            };
            by_type.then_with(|| a.id.cmp(&b.id))
        });
        fitting
    }

    /// Picks resources for every required type, best first.
    pub fn select_resources(
        &self,
        request: &SessionRequest,
        window: &TimeWindow,
        timeline: &ResourceTimeline,
    ) -> Result<BTreeMap<ResourceType, BTreeSet<String>>, Rejection> {
        self.select_resources_with(request, window, timeline, None)
    }

    /// Like [`select_resources`](Self::select_resources), with `pinned`
    /// always taken for its type when it qualifies and is free.
    pub fn select_resources_with(
        &self,
        request: &SessionRequest,
        window: &TimeWindow,
        timeline: &ResourceTimeline,
        pinned: Option<&Resource>,
    ) -> Result<BTreeMap<ResourceType, BTreeSet<String>>, Rejection> {
        let occupied = self.ctx.occupied_for(&request.id, window);
        let mut chosen = BTreeMap::new();
        for (&rtype, &count) in &request.required_resource_types {
            if count == 0 {
                continue;
            }
            let mut ranked = self.ranked(request, rtype);
            if ranked.is_empty() {
                return Err(Rejection::NoQualifiedResource(rtype));
            }
            if let Some(pin) = pinned.filter(|p| p.resource_type == rtype) {
                let pos = ranked
                    .iter()
                    .position(|r| r.id == pin.id)
                    .ok_or(Rejection::ResourcesBusy(rtype))?;
                let first = ranked.remove(pos);
                ranked.insert(0, first);
            }
            let picked: BTreeSet<String> = ranked
                .into_iter()
                .filter(|r| self.resource_free(r, window, &occupied, timeline))
                .take(count as usize)
                .map(|r| r.id.clone())
                .collect();
            if picked.len() < count as usize
                || pinned.is_some_and(|p| p.resource_type == rtype && !picked.contains(&p.id))
            {
                return Err(Rejection::ResourcesBusy(rtype));
            }
            chosen.insert(rtype, picked);
        }
        Ok(chosen)
    }

    /// Builds the assignment for `window` and checks every hard constraint
    /// against `solution`.
    pub fn try_place(
        &self,
        request: &SessionRequest,
        occurrence_index: u32,
        window: &TimeWindow,
        solution: &[Assignment],
        timeline: &ResourceTimeline,
    ) -> Result<Assignment, Rejection> {
        self.window_allowed(request, window)?;
        let resources = self.select_resources(request, window, timeline)?;
        let assignment = Assignment::new(&request.id, occurrence_index, window.start, window.end)
            .with_resources(resources)
            .with_cohort(request.cohort_id.clone());
        match self.constraints.check(&assignment, solution, &self.ctx) {
            Some(v) => Err(Rejection::Violation(v)),
            None => Ok(assignment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::{Calendar, Problem};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap()
    }

    fn problem() -> Problem {
        let (s, e) = (
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap(),
        );
        Problem::new()
            .with_request(
                SessionRequest::new("cs101", 60, 1, s, e)
                    .with_enrollment(45)
                    .with_resource_type(ResourceType::Classroom, 1)
                    .with_resource_type(ResourceType::Instructor, 1)
                    .with_teacher("lee")
                    .with_preferred_building("north"),
            )
            .with_resource(Resource::new("HALL", ResourceType::Classroom).with_capacity(300))
            .with_resource(Resource::new("R50", ResourceType::Classroom).with_capacity(50))
            .with_resource(
                Resource::new("R52", ResourceType::Classroom)
                    .with_capacity(52)
                    .with_building("north", None),
            )
            .with_resource(Resource::new("R30", ResourceType::Classroom).with_capacity(30))
            .with_resource(Resource::new("kim", ResourceType::Instructor))
            .with_resource(Resource::new("lee", ResourceType::Instructor))
            .with_calendar(Calendar::new("inst").with_blackout(at(12), at(13)))
            .with_institutional_calendar("inst")
    }

    #[test]
    fn test_ranking() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let req = &p.requests[0];

        let rooms: Vec<&str> = placer
            .ranked(req, ResourceType::Classroom)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(rooms, vec!["R52", "R50", "HALL"]);
        let teachers: Vec<&str> = placer
            .ranked(req, ResourceType::Instructor)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(teachers, vec!["lee", "kim"]);
    }

    #[test]
    fn test_try_place_and_busy() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let req = &p.requests[0];
        let mut timeline = ResourceTimeline::new();

        let window = TimeWindow::new(at(9), at(10));
        let a = placer.try_place(req, 0, &window, &[], &timeline).unwrap();
        assert!(a.uses_resource("R52"));
        assert!(a.uses_resource("lee"));

        timeline.book(&a, &ctx);
        let b = placer.try_place(req, 1, &window, &[a.clone()], &timeline).unwrap();
        assert!(b.uses_resource("R50"));
        assert!(b.uses_resource("kim"));

        timeline.book(&b, &ctx);
        let c = Assignment::new("x", 0, at(9), at(10))
            .with_resource(ResourceType::Classroom, "HALL");
        timeline.book(&c, &ctx);
        let err = placer.try_place(req, 2, &window, &[a, b, c], &timeline).unwrap_err();
        assert_eq!(err.reason(), "resources_busy");
    }

    #[test]
    fn test_calendar_and_range_rejections() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let req = &p.requests[0];
        let timeline = ResourceTimeline::new();

        let lunch = TimeWindow::new(at(12), at(13));
        assert_eq!(
            placer.try_place(req, 0, &lunch, &[], &timeline).unwrap_err().reason(),
            "calendar_unavailable"
        );
        let early = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        );
        assert_eq!(
            placer.try_place(req, 0, &early, &[], &timeline).unwrap_err().reason(),
            "outside_date_range"
        );
    }
}
