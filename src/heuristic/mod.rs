//! Greedy heuristic solver.
//!
//! Places requests one occurrence at a time in priority order, spreading
//! occurrences across the term and choosing the best-fitting free
//! resources.
//!
//! # Submodules
//!
//! - [`spreader`]: priority scoring, candidate dates, date spreading, slots
//! - [`placement`]: resource selection and constraint-checked placement

pub mod placement;
mod solver;
pub mod spreader;

pub use placement::{Placer, Rejection};
pub use solver::{GreedyRun, HeuristicSolver, Placement};
pub use spreader::{priority_score, sort_by_priority, OccurrenceSpreader, SlotGenerator};
