//! Scheduling problem and its lookup indices.
//!
//! A `Problem` aggregates everything a solver needs: requests, resources,
//! calendars, people, pluggable constraints and objectives, and locked
//! assignments that must survive unchanged. `ProblemIndices` is built
//! once per solve and shared read-only.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{
    Assignment, Building, Calendar, Campus, HolidayCalendar, Resource, ResourceType,
    SessionRequest, Student, Teacher, TimeWindow,
};
use crate::constraints::{Constraint, Objective};
use crate::validation::{validate_problem, ValidationResult};

/// A complete scheduling problem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    /// Sessions to place.
    pub requests: Vec<SessionRequest>,
    /// Bookable resources.
    pub resources: Vec<Resource>,
    /// Calendars referenced by id.
    pub calendars: Vec<Calendar>,
    /// Teaching staff.
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    /// Buildings.
    #[serde(default)]
    pub buildings: Vec<Building>,
    /// Campuses.
    #[serde(default)]
    pub campuses: Vec<Campus>,
    /// Students with enrollments.
    #[serde(default)]
    pub students: Vec<Student>,
    /// Term-wide holidays.
    #[serde(default)]
    pub holiday_calendar: Option<HolidayCalendar>,
    /// Calendar all sessions must respect.
    #[serde(default)]
    pub institutional_calendar_id: Option<String>,
    /// Pre-committed occurrences.
    #[serde(default)]
    pub locked_assignments: Vec<Assignment>,
    /// Caller-supplied hard constraints (in addition to the built-in set).
    #[serde(skip)]
    pub constraints: Vec<Arc<dyn Constraint>>,
    /// Soft objectives.
    #[serde(skip)]
    pub objectives: Vec<Arc<dyn Objective>>,
}

impl Problem {
    /// Creates an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request.
    pub fn with_request(mut self, request: SessionRequest) -> Self {
        self.requests.push(request);
        self
    }

    /// Adds a resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a calendar.
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendars.push(calendar);
        self
    }

    /// Adds a teacher.
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Adds a building.
    pub fn with_building(mut self, building: Building) -> Self {
        self.buildings.push(building);
        self
    }

    /// Adds a campus.
    pub fn with_campus(mut self, campus: Campus) -> Self {
        self.campuses.push(campus);
        self
    }

    /// Adds a student.
    pub fn with_student(mut self, student: Student) -> Self {
        self.students.push(student);
        self
    }

    /// Sets the holiday calendar.
    pub fn with_holiday_calendar(mut self, calendar: HolidayCalendar) -> Self {
        self.holiday_calendar = Some(calendar);
        self
    }

    /// Sets the institutional calendar.
    pub fn with_institutional_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.institutional_calendar_id = Some(calendar_id.into());
        self
    }

    /// Adds a locked assignment.
    pub fn with_locked(mut self, assignment: Assignment) -> Self {
        self.locked_assignments.push(assignment);
        self
    }

    /// Adds a hard constraint.
    pub fn with_constraint<C: Constraint + 'static>(mut self, constraint: C) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    /// Adds an objective.
    pub fn with_objective<O: Objective + 'static>(mut self, objective: O) -> Self {
        self.objectives.push(Arc::new(objective));
        self
    }

    /// Validates the whole problem, collecting every error.
    pub fn validate(&self) -> ValidationResult {
        validate_problem(self)
    }

    /// Sorts entities by id so solving is independent of input order.
    ///
    /// Locked assignments are ordered by (request id, occurrence index).
    pub fn canonicalize(&mut self) {
        self.requests.sort_by(|a, b| a.id.cmp(&b.id));
        self.resources.sort_by(|a, b| a.id.cmp(&b.id));
        self.calendars.sort_by(|a, b| a.id.cmp(&b.id));
        self.teachers.sort_by(|a, b| a.id.cmp(&b.id));
        self.locked_assignments.sort_by(|a, b| {
            a.request_id
                .cmp(&b.request_id)
                .then(a.occurrence_index.cmp(&b.occurrence_index))
        });
    }

    /// A canonicalized copy; the receiver is left untouched.
    pub fn canonicalized(&self) -> Self {
        let mut copy = self.clone();
        copy.canonicalize();
        copy
    }

    /// Builds lookup indices.
    pub fn build_indices(&self) -> ProblemIndices {
        ProblemIndices::build(self)
    }
}

/// Precomputed lookups over a `Problem`.
///
/// Indices point into the problem's vectors, so the problem must not be
/// modified while the indices are in use.
#[derive(Debug, Clone, Default)]
pub struct ProblemIndices {
    request_lookup: HashMap<String, usize>,
    resource_lookup: HashMap<String, usize>,
    calendar_lookup: HashMap<String, usize>,
    teacher_lookup: HashMap<String, usize>,
    building_lookup: HashMap<String, usize>,
    campus_lookup: HashMap<String, usize>,
    /// Resource positions grouped by type, ordered by resource id.
    pub resources_by_type: BTreeMap<ResourceType, Vec<usize>>,
    /// Per request: resources whose attributes and building qualify, by type.
    pub qualified_resources: HashMap<String, BTreeMap<ResourceType, Vec<usize>>>,
    /// Per resource: intervals held by locked assignments, sorted by start.
    pub locked_intervals: HashMap<String, Vec<TimeWindow>>,
}

impl ProblemIndices {
    fn build(problem: &Problem) -> Self {
        let position = |ids: Vec<&String>| -> HashMap<String, usize> {
            ids.into_iter().enumerate().map(|(i, id)| (id.clone(), i)).collect()
        };

        let mut resources_by_type: BTreeMap<ResourceType, Vec<usize>> = BTreeMap::new();
        for (idx, r) in problem.resources.iter().enumerate() {
            resources_by_type.entry(r.resource_type).or_default().push(idx);
        }
        for list in resources_by_type.values_mut() {
            list.sort_by(|a, b| problem.resources[*a].id.cmp(&problem.resources[*b].id));
        }

        let mut qualified_resources = HashMap::new();
        for request in &problem.requests {
            let target = request.attribute_target();
            let mut by_type = BTreeMap::new();
            for rtype in request.required_resource_types.keys() {
                let candidates: Vec<usize> = resources_by_type
                    .get(rtype)
                    .map(|list| {
                        list.iter()
                            .copied()
                            .filter(|&idx| {
                                let r = &problem.resources[idx];
                                let attrs_ok = target.is_some_and(|t| t != *rtype)
                                    || r.can_satisfy(&request.required_attributes);
                                let building_ok = *rtype != ResourceType::Classroom
                                    || request.required_building_id.is_none()
                                    || r.building_id == request.required_building_id;
                                attrs_ok && building_ok
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                by_type.insert(*rtype, candidates);
            }
            qualified_resources.insert(request.id.clone(), by_type);
        }

        let mut locked_intervals: HashMap<String, Vec<TimeWindow>> = HashMap::new();
        for a in &problem.locked_assignments {
            for id in a.resource_ids() {
                locked_intervals.entry(id.to_string()).or_default().push(a.window());
            }
        }
        for list in locked_intervals.values_mut() {
            list.sort();
        }

        Self {
            request_lookup: position(problem.requests.iter().map(|r| &r.id).collect()),
            resource_lookup: position(problem.resources.iter().map(|r| &r.id).collect()),
            calendar_lookup: position(problem.calendars.iter().map(|c| &c.id).collect()),
            teacher_lookup: position(problem.teachers.iter().map(|t| &t.id).collect()),
            building_lookup: position(problem.buildings.iter().map(|b| &b.id).collect()),
            campus_lookup: position(problem.campuses.iter().map(|c| &c.id).collect()),
            resources_by_type,
            qualified_resources,
            locked_intervals,
        }
    }

    /// Looks up a request.
    pub fn request<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p SessionRequest> {
        self.request_lookup.get(id).map(|&i| &problem.requests[i])
    }

    /// Looks up a resource.
    pub fn resource<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p Resource> {
        self.resource_lookup.get(id).map(|&i| &problem.resources[i])
    }

    /// Looks up a calendar.
    pub fn calendar<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p Calendar> {
        self.calendar_lookup.get(id).map(|&i| &problem.calendars[i])
    }

    /// Looks up a teacher.
    pub fn teacher<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p Teacher> {
        self.teacher_lookup.get(id).map(|&i| &problem.teachers[i])
    }

    /// Looks up a building.
    pub fn building<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p Building> {
        self.building_lookup.get(id).map(|&i| &problem.buildings[i])
    }

    /// Looks up a campus.
    pub fn campus<'p>(&self, problem: &'p Problem, id: &str) -> Option<&'p Campus> {
        self.campus_lookup.get(id).map(|&i| &problem.campuses[i])
    }

    /// Whether a request id is known.
    pub fn has_request(&self, id: &str) -> bool {
        self.request_lookup.contains_key(id)
    }

    /// Qualified resource positions for one request and type.
    pub fn qualified<'s>(&'s self, request_id: &str, rtype: ResourceType) -> &'s [usize] {
        self.qualified_resources
            .get(request_id)
            .and_then(|m| m.get(&rtype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeRequirement;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn sample_problem() -> Problem {
        Problem::new()
            .with_request(
                SessionRequest::new("phys", 90, 2, at(1, 15, 0), at(2, 15, 0))
                    .with_resource_type(ResourceType::Classroom, 1)
                    .with_attribute("lab", AttributeRequirement::Required(true.into())),
            )
            .with_request(
                SessionRequest::new("art", 60, 1, at(1, 15, 0), at(2, 15, 0))
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_resource(Resource::new("R2", ResourceType::Classroom).with_capacity(30))
            .with_resource(
                Resource::new("R1", ResourceType::Classroom)
                    .with_capacity(30)
                    .with_attribute("lab", true),
            )
            .with_resource(Resource::new("T1", ResourceType::Instructor))
    }

    #[test]
    fn test_canonicalize_sorts_by_id() {
        let p = sample_problem().canonicalized();
        assert_eq!(p.requests[0].id, "art");
        assert_eq!(p.resources[0].id, "R1");
    }

    #[test]
    fn test_indices_lookup() {
        let p = sample_problem();
        let idx = p.build_indices();
        assert_eq!(idx.request(&p, "phys").map(|r| r.duration_minutes), Some(90));
        assert!(idx.resource(&p, "T1").is_some());
        assert!(idx.resource(&p, "nope").is_none());
        assert_eq!(idx.resources_by_type[&ResourceType::Classroom].len(), 2);
    }

    #[test]
    fn test_qualified_resources_respect_attributes() {
        let p = sample_problem();
        let idx = p.build_indices();
        let phys: Vec<&str> = idx
            .qualified("phys", ResourceType::Classroom)
            .iter()
            .map(|&i| p.resources[i].id.as_str())
            .collect();
        assert_eq!(phys, vec!["R1"]);
        assert_eq!(idx.qualified("art", ResourceType::Classroom).len(), 2);
        assert!(idx.qualified("art", ResourceType::Equipment).is_empty());
    }

    #[test]
    fn test_locked_intervals() {
        let p = sample_problem().with_locked(
            Assignment::new("art", 0, at(1, 16, 9), at(1, 16, 10))
                .with_resource(ResourceType::Classroom, "R2"),
        );
        let idx = p.build_indices();
        assert_eq!(idx.locked_intervals["R2"].len(), 1);
    }
}
