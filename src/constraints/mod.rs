//! Constraint protocol: hard constraints and soft objectives.
//!
//! A [`Constraint`] checks one candidate assignment against a (partial)
//! solution and returns a [`Violation`] when the candidate is not
//! acceptable. An [`Objective`] scores a whole solution in `[0, 1]`.
//! Both are pure: they never mutate their inputs and may be evaluated
//! from several threads at once.
//!
//! # Usage
//!
//! ```ignore
//! let indices = problem.build_indices();
//! let ctx = ConstraintContext::new(&problem, &indices, ConstraintConfig::default());
//! let set = ConstraintSet::standard(&problem);
//! if let Some(v) = set.check(&candidate, &solution, &ctx) {
//!     println!("{}: {}", v.constraint_type, v.message);
//! }
//! ```
//!
//! # Built-in constraints
//!
//! - **Resources**: no-overlap, calendar blackout, resource blackout,
//!   max-per-day, required resource counts
//! - **Requests**: date range, attributes, room capacity, weekday pattern,
//!   holidays, gap between occurrences
//! - **People**: teacher conflict/availability/workload/travel, student conflict
//! - **Sites**: campus operating hours

pub mod capacity;
mod campus;
mod context;
mod hard;
mod objectives;
mod set;
mod student;
mod teacher;
mod violation;

pub use campus::CampusHours;
pub use context::ConstraintContext;
pub use hard::{
    AttributeMatch, BlackoutDates, ClassroomCapacity, EquipmentQuantity, HolidayAvoidance,
    MaxPerDay, MinGapBetweenOccurrences, NoOverlap, ResourceBlackout, SchedulingPatternRule,
    WithinDateRange,
};
pub use objectives::{
    weighted_objective_score, BalanceInstructorLoad, MinimizeEveningSessions,
    SpreadEvenlyAcrossTerm,
};
pub use set::ConstraintSet;
pub use student::StudentConflict;
pub use teacher::{TeacherAvailability, TeacherConflict, TeacherTravelTime, TeacherWorkload};
pub use violation::Violation;

use crate::models::Assignment;
use std::fmt::Debug;

/// A hard rule a candidate assignment must satisfy.
///
/// # Contract
/// `check` must be a pure function of its inputs. `solution` may contain
/// `assignment` itself (same request and occurrence index); implementations
/// skip that entry when comparing against other assignments.
pub trait Constraint: Send + Sync + Debug {
    /// Unique identifier (e.g. `"hard.no_overlap"`).
    fn constraint_type(&self) -> &'static str;

    /// Checks `assignment` against `solution`.
    fn check(
        &self,
        assignment: &Assignment,
        solution: &[Assignment],
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation>;

    /// Human-readable explanation of a violation this constraint produced.
    fn explain(&self, violation: &Violation) -> String {
        violation.message.clone()
    }
}

/// A soft preference scored over a whole solution.
pub trait Objective: Send + Sync + Debug {
    /// Unique identifier (e.g. `"soft.minimize_evening_sessions"`).
    fn objective_type(&self) -> &'static str;

    /// Relative weight in the combined score.
    fn weight(&self) -> f64;

    /// Score in `[0, 1]`; higher is better.
    fn score(&self, solution: &[Assignment], ctx: &ConstraintContext<'_>) -> f64;
}
