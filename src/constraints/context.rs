//! Shared read-only context for constraint evaluation.

use chrono::Duration;

use crate::config::ConstraintConfig;
use crate::models::{
    Assignment, Building, Calendar, Campus, HolidayCalendar, Problem, ProblemIndices, Resource,
    SessionRequest, Teacher, TimeWindow,
};

/// Lookups and settings available to every constraint check.
///
/// Built once per solve from a `Problem` and its `ProblemIndices`;
/// cheap to copy references out of and safe to share across threads.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'a> {
    /// The problem being solved.
    pub problem: &'a Problem,
    /// Precomputed indices over `problem`.
    pub indices: &'a ProblemIndices,
    /// Evaluation settings.
    pub config: ConstraintConfig,
}

impl<'a> ConstraintContext<'a> {
    /// Creates a context.
    pub fn new(
        problem: &'a Problem,
        indices: &'a ProblemIndices,
        config: ConstraintConfig,
    ) -> Self {
        Self {
            problem,
            indices,
            config,
        }
    }

    /// Request by id.
    pub fn request(&self, id: &str) -> Option<&'a SessionRequest> {
        self.indices.request(self.problem, id)
    }

    /// Resource by id.
    pub fn resource(&self, id: &str) -> Option<&'a Resource> {
        self.indices.resource(self.problem, id)
    }

    /// Calendar by id.
    pub fn calendar(&self, id: &str) -> Option<&'a Calendar> {
        self.indices.calendar(self.problem, id)
    }

    /// Teacher by id.
    pub fn teacher(&self, id: &str) -> Option<&'a Teacher> {
        self.indices.teacher(self.problem, id)
    }

    /// Building by id.
    pub fn building(&self, id: &str) -> Option<&'a Building> {
        self.indices.building(self.problem, id)
    }

    /// Campus by id.
    pub fn campus(&self, id: &str) -> Option<&'a Campus> {
        self.indices.campus(self.problem, id)
    }

    /// The institutional calendar, if configured.
    pub fn institutional_calendar(&self) -> Option<&'a Calendar> {
        self.problem
            .institutional_calendar_id
            .as_deref()
            .and_then(|id| self.calendar(id))
    }

    /// The term holiday calendar, if configured.
    pub fn holidays(&self) -> Option<&'a HolidayCalendar> {
        self.problem.holiday_calendar.as_ref()
    }

    /// Whether `teacher_id` teaches `request_id`.
    pub fn teaches(&self, teacher_id: &str, request_id: &str) -> bool {
        self.request(request_id)
            .is_some_and(|r| r.all_teachers().any(|t| t == teacher_id))
    }

    /// Setup and cleanup buffers around occurrences of `request_id`.
    ///
    /// Taken from the lead teacher when known, otherwise from config.
    pub fn buffers(&self, request_id: &str) -> (Duration, Duration) {
        let teacher = self
            .request(request_id)
            .and_then(|r| r.teacher_id.as_deref())
            .and_then(|t| self.teacher(t));
        match teacher {
            Some(t) => (t.setup(), t.cleanup()),
            None => (
                Duration::minutes(self.config.default_setup_minutes.max(0)),
                Duration::minutes(self.config.default_cleanup_minutes.max(0)),
            ),
        }
    }

    /// Interval an assignment blocks its resources for, buffers included.
    pub fn occupied_window(&self, assignment: &Assignment) -> TimeWindow {
        let (setup, cleanup) = self.buffers(&assignment.request_id);
        assignment.window().expand(setup, cleanup)
    }

    /// Occupied interval for a hypothetical occurrence of `request_id`.
    pub fn occupied_for(&self, request_id: &str, window: &TimeWindow) -> TimeWindow {
        let (setup, cleanup) = self.buffers(request_id);
        window.expand(setup, cleanup)
    }

    /// Building of the first classroom an assignment uses.
    pub fn building_of(&self, assignment: &Assignment) -> Option<&'a str> {
        assignment
            .resources_of(crate::models::ResourceType::Classroom)
            .filter_map(|id| self.resource(id))
            .find_map(|r| r.building_id.as_deref())
    }
}
