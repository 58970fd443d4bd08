//! Crate-level error type.
//!
//! Structural problems fail fast as `Validation` before any search starts.
//! Scheduling shortfalls are reported as data in `SolveResult`; they only
//! become `Infeasible` when a caller asks for that via
//! `SolveResult::into_feasible`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::InfeasibilityReport;
use crate::validation::ValidationError;

/// Errors surfaced by the scheduling engine.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The problem is malformed.
    #[error("invalid problem: {} error(s), first: {}", .0.len(), first_message(.0))]
    Validation(Vec<ValidationError>),

    /// Solving finished without placing every request.
    #[error("infeasible: {}", .0.summary())]
    Infeasible(Box<InfeasibilityReport>),

    /// A solver failed internally.
    #[error("backend '{backend}' failed: {details}")]
    Backend {
        /// Backend name.
        backend: String,
        /// Failure description.
        details: String,
    },

    /// An optional integration is not available in this build.
    #[error("missing optional dependency for {feature}; install with `{install_command}`")]
    MissingOptionalDependency {
        /// Feature that needs the dependency.
        feature: String,
        /// How to enable it.
        install_command: String,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScheduleError {
    /// Creates a backend error.
    pub fn backend(backend: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            details: details.into(),
        }
    }
}

impl From<Vec<ValidationError>> for ScheduleError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

fn first_message(errors: &[ValidationError]) -> String {
    errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}
