//! GA-based schedule search.
//!
//! Evolves whole schedules and repairs the fittest into a hard-feasible
//! assignment set.
//!
//! # Encoding
//!
//! One gene per request: the assignments (date, slot, resources) of its
//! pending occurrences. Locked assignments stay outside the chromosome
//! and are prepended at evaluation.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//!
//! # Reference
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"

mod chromosome;
pub mod operators;
mod problem;
mod solver;

pub use chromosome::{
    one_point_crossover, resource_mutation, slot_mutation, uniform_crossover, ScheduleChromosome,
};
pub use problem::{GeneticProblem, RequestGenes};
pub use solver::GeneticSolver;
