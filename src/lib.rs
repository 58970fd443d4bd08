//! Academic session scheduling engine.
//!
//! Places the recurring sessions of courses (lectures, labs, workshops)
//! into dated time slots with rooms, instructors and equipment, honoring
//! hard constraints (no double-booking, capacity, blackouts, holidays,
//! teacher limits) and scoring soft objectives.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `SessionRequest`, `Resource`, `Calendar`,
//!   `HolidayCalendar`, `Teacher`, `Problem`, `Assignment`, `SolveResult`
//! - **`validation`**: Input integrity checks run before any solve
//! - **`constraints`**: The `Constraint`/`Objective` protocol, the built-in
//!   catalogue and `ConstraintSet`
//! - **`heuristic`**: Greedy priority-driven solver (the primary backend)
//! - **`ga`**: Genetic search over whole schedules with greedy repair
//! - **`incremental`**: Add/remove/move edits against a live schedule
//! - **`parallel`**: Portfolio solving on a rayon worker pool
//! - **`conflict`**: Typed conflict detection and strategy-driven repair
//! - **`api`**: `solve(problem, backend, seed, fallback)`
//! - **`config`**: TOML-loadable solver settings
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use edu_schedule::{solve, Problem, Resource, ResourceType, SessionRequest, SolveStatus};
//!
//! let term = (
//!     Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap(),
//! );
//! let problem = Problem::new()
//!     .with_request(
//!         SessionRequest::new("cs101", 120, 24, term.0, term.1)
//!             .with_enrollment(45)
//!             .with_resource_type(ResourceType::Classroom, 1),
//!     )
//!     .with_resource(Resource::new("R101", ResourceType::Classroom).with_capacity(50));
//!
//! let result = solve(&problem, "heuristic", Some(42), false).unwrap();
//! assert_eq!(result.status, SolveStatus::Feasible);
//! assert_eq!(result.assignments.len(), 24);
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"
//! - Lewis (2008), "A survey of metaheuristic-based techniques for
//!   University Timetabling problems"

pub mod api;
pub mod config;
pub mod conflict;
pub mod constraints;
pub mod error;
pub mod ga;
pub mod heuristic;
pub mod incremental;
pub mod models;
pub mod parallel;
pub mod timeline;
pub mod validation;

pub use api::{solve, solve_with_config, Backend, SolverBackend};
pub use config::SolverConfig;
pub use error::ScheduleError;
pub use models::{
    Assignment, Calendar, HolidayCalendar, HolidayPeriod, Problem, Resource, ResourceType,
    SessionRequest, SolveResult, SolveStatus, Teacher, TimeWindow,
};
