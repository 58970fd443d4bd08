//! Single entry point over the solver backends.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use edu_schedule::api::solve;
//! use edu_schedule::models::{Problem, Resource, ResourceType, SessionRequest, SolveStatus};
//!
//! let (start, end) = (
//!     Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
//! );
//! let problem = Problem::new()
//!     .with_request(
//!         SessionRequest::new("cs101", 60, 3, start, end)
//!             .with_resource_type(ResourceType::Classroom, 1),
//!     )
//!     .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(30));
//!
//! let result = solve(&problem, "heuristic", Some(42), false).unwrap();
//! assert_eq!(result.status, SolveStatus::Feasible);
//! assert_eq!(result.seed_used, 42);
//!
//! assert!(solve(&problem, "quantum", None, false).is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::warn;

use crate::config::SolverConfig;
use crate::error::ScheduleError;
use crate::ga::GeneticSolver;
use crate::heuristic::HeuristicSolver;
use crate::incremental::IncrementalBackend;
use crate::models::{Problem, SolveResult};
use crate::parallel::ParallelSolver;

/// A solver selectable by name.
///
/// Implementations must not mutate `problem` and must return every
/// locked assignment unchanged.
pub trait SolverBackend: Send + Sync {
    /// Name used in results and logs.
    fn backend_name(&self) -> &'static str;

    /// Solves `problem` deterministically for `seed`.
    fn solve(
        &self,
        problem: &Problem,
        seed: u64,
        fallback: bool,
    ) -> Result<SolveResult, ScheduleError>;
}

/// Available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Heuristic,
    Genetic,
    Incremental,
    Parallel,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Self::Heuristic,
        Self::Genetic,
        Self::Incremental,
        Self::Parallel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Genetic => "genetic",
            Self::Incremental => "incremental",
            Self::Parallel => "parallel",
        }
    }

    /// Instantiates the backend with `config`.
    pub fn build(&self, config: SolverConfig) -> Box<dyn SolverBackend> {
        match self {
            Self::Heuristic => Box::new(HeuristicSolver::with_config(config)),
            Self::Genetic => Box::new(GeneticSolver::with_config(config)),
            Self::Incremental => Box::new(IncrementalBackend::with_config(config)),
            Self::Parallel => Box::new(ParallelSolver::with_config(config)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == name)
            .ok_or_else(|| ScheduleError::backend(s, format!("Unknown backend: {s}")))
    }
}

/// Solves `problem` with the named backend and default configuration.
///
/// See [`solve_with_config`].
pub fn solve(
    problem: &Problem,
    backend: &str,
    seed: Option<u64>,
    fallback: bool,
) -> Result<SolveResult, ScheduleError> {
    solve_with_config(problem, backend, seed, fallback, SolverConfig::default())
}

/// Solves `problem` with the named backend.
///
/// The problem and the configuration are checked first; either is
/// rejected as a whole on any error.
/// Without a seed a random one is drawn; either way it is echoed in
/// `seed_used`. With `fallback`, a failing non-heuristic backend is
/// replaced by the heuristic one.
pub fn solve_with_config(
    problem: &Problem,
    backend: &str,
    seed: Option<u64>,
    fallback: bool,
    config: SolverConfig,
) -> Result<SolveResult, ScheduleError> {
    let backend: Backend = backend.parse()?;
    problem.validate()?;
    config.check()?;
    let seed = seed.unwrap_or_else(|| rand::rng().random());

    let solver = backend.build(config.clone());
    run(solver.as_ref(), problem, seed, fallback, &config)
}

fn run(
    solver: &dyn SolverBackend,
    problem: &Problem,
    seed: u64,
    fallback: bool,
    config: &SolverConfig,
) -> Result<SolveResult, ScheduleError> {
    match solver.solve(problem, seed, fallback) {
        Err(e) if fallback && solver.backend_name() != Backend::Heuristic.as_str() => {
            warn!(
                backend = solver.backend_name(),
                error = %e,
                "backend failed; falling back to heuristic"
            );
            HeuristicSolver::with_config(config.clone()).solve(problem, seed, fallback)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Resource, ResourceType, SessionRequest};
    use chrono::{TimeZone, Utc};

    fn problem() -> Problem {
        let (s, e) = (
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        );
        Problem::new()
            .with_request(
                SessionRequest::new("cs101", 60, 4, s, e)
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(30))
    }

    #[test]
    fn test_backend_names() {
        for b in Backend::ALL {
            assert_eq!(b.to_string().parse::<Backend>().unwrap(), b);
        }
        assert_eq!(" Parallel ".parse::<Backend>().unwrap(), Backend::Parallel);
        let err = "quantum".parse::<Backend>().unwrap_err();
        assert!(err.to_string().contains("Unknown backend"));
    }

    #[test]
    fn test_every_backend_runs() {
        let p = problem();
        for b in Backend::ALL {
            let result = solve(&p, b.as_str(), Some(3), false).unwrap();
            assert_eq!(result.backend_used, b.as_str());
            assert_eq!(result.seed_used, 3);
            assert_eq!(result.assignment_count(), 4);
        }
    }

    #[test]
    fn test_validation_fails_fast() {
        let (s, e) = (
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        );
        let bad = Problem::new().with_request(SessionRequest::new("x", 60, 1, s, e));
        let err = solve(&bad, "heuristic", Some(1), false).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn test_out_of_range_config_rejected() {
        let mut config = SolverConfig::default();
        config.genetic.mutation_rate = 1.5;
        config.genetic.population_size = 4;
        config.genetic.generations = 2;
        let err = solve_with_config(&problem(), "genetic", Some(1), false, config).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(_)));
    }

    #[test]
    fn test_seed_drawn_when_absent() {
        let p = problem();
        let a = solve(&p, "heuristic", None, false).unwrap();
        let b = solve(&p, "heuristic", Some(a.seed_used), false).unwrap();
        assert_eq!(a.assignments, b.assignments);
    }

    #[derive(Debug)]
    struct Broken;

    impl SolverBackend for Broken {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        fn solve(&self, _: &Problem, _: u64, _: bool) -> Result<SolveResult, ScheduleError> {
            Err(ScheduleError::backend("broken", "always fails"))
        }
    }

    #[test]
    fn test_fallback_on_backend_error() {
        let config = SolverConfig::default();
        let err = run(&Broken, &problem(), 1, false, &config).unwrap_err();
        assert!(matches!(err, ScheduleError::Backend { .. }));

        let result = run(&Broken, &problem(), 1, true, &config).unwrap();
        assert_eq!(result.backend_used, "heuristic");
        assert_eq!(result.assignment_count(), 4);
    }
}
