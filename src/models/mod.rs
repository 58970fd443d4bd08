//! Scheduling domain models.
//!
//! Provides the data types for academic session scheduling: what must be
//! scheduled (`SessionRequest`), what it can use (`Resource`, `Teacher`),
//! when it may happen (`Calendar`, `HolidayCalendar`) and what a solver
//! produces (`Assignment`, `SolveResult`).
//!
//! # Domain Mappings
//!
//! | edu-schedule | University | School | Training center |
//! |--------------|------------|--------|-----------------|
//! | SessionRequest | Course section | Class period | Workshop |
//! | Occurrence | Lecture | Lesson | Session day |
//! | Resource | Room/Lecturer | Classroom/Teacher | Lab/Trainer |
//! | Problem | Term timetable | School year | Program |

mod assignment;
mod attribute;
mod calendar;
mod campus;
mod holiday;
mod problem;
mod request;
mod resource;
mod result;
mod student;
mod teacher;

pub use assignment::{Assignment, OccurrenceKey};
pub use attribute::{AttributeRequirement, AttributeValue, Attributes, Requirements};
pub use calendar::{Calendar, TimeWindow};
pub use campus::{Building, Campus};
pub use holiday::{AcademicWeek, HolidayCalendar, HolidayKind, HolidayPeriod, SchedulingPattern};
pub use problem::{Problem, ProblemIndices};
pub use request::{Modality, SessionRequest};
pub use resource::{Resource, ResourceType};
pub use result::{AssignmentRecord, Diagnostics, InfeasibilityReport, SolveResult, SolveStatus};
pub use student::Student;
pub use teacher::Teacher;
