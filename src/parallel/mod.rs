//! Multi-threaded solving.
//!
//! Independent greedy runs execute on a bounded rayon pool and meet only
//! at the mutex-guarded [`ParallelContext`]. Constraint checking and
//! candidate generation are split into chunks with no shared mutable
//! state.
//!
//! # Submodules
//!
//! - [`context`]: best-so-far holder, iteration counter, stop conditions
//! - [`checker`]: chunked constraint checking
//! - [`generator`]: (resource × slot) candidate generation and scoring
//! - [`merger`]: combining worker solutions

pub mod checker;
pub mod context;
pub mod generator;
pub mod merger;
mod solver;

pub use checker::ParallelConstraintChecker;
pub use context::{ParallelContext, SolutionScore, WorkerSolution};
pub use generator::{ParallelAssignmentGenerator, ScoredCandidate};
pub use merger::{MergeStrategy, ParallelSolutionMerger};
pub use solver::ParallelSolver;
