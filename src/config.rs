//! Solver configuration.
//!
//! Every tunable constant of the engine (capacity buffer, trial bounds,
//! GA rates, worker counts, cache TTL) lives here rather than in solver
//! code. Configuration can be loaded from TOML; every field has a default.
//!
//! # Examples
//!
//! ```
//! use edu_schedule::config::SolverConfig;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     [constraints]
//!     capacity_buffer = 0.2
//!
//!     [genetic]
//!     population_size = 30
//!     generations = 40
//!
//!     [parallel]
//!     num_workers = 2
//!     merge_strategy = "best_conflict_free"
//! "#).unwrap();
//!
//! assert_eq!(config.genetic.population_size, 30);
//! assert_eq!(config.heuristic.max_date_trials, 30); // default kept
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parallel::MergeStrategy;

/// Upper bound for setup, cleanup and travel buffers (one day).
pub const MAX_BUFFER_MINUTES: i64 = 1440;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main solver configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Settings shared by constraint evaluation.
    pub constraints: ConstraintConfig,
    /// Greedy solver settings.
    pub heuristic: HeuristicConfig,
    /// Genetic solver settings.
    pub genetic: GeneticConfig,
    /// Parallel solver settings.
    pub parallel: ParallelConfig,
    /// Incremental solver settings.
    pub incremental: IncrementalConfig,
}

impl SolverConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.check()?;
        Ok(config)
    }

    /// Rejects values no solver can work with.
    pub fn check(&self) -> Result<(), ConfigError> {
        let c = &self.constraints;
        if !(0.0..=1.0).contains(&c.capacity_buffer) {
            return Err(ConfigError::Invalid(format!(
                "capacity_buffer must be in [0, 1], got {}",
                c.capacity_buffer
            )));
        }
        for (name, minutes) in [
            ("default_setup_minutes", c.default_setup_minutes),
            ("default_cleanup_minutes", c.default_cleanup_minutes),
        ] {
            if !(0..=MAX_BUFFER_MINUTES).contains(&minutes) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, {MAX_BUFFER_MINUTES}], got {minutes}"
                )));
            }
        }
        let h = &self.heuristic;
        if h.day_start_hour >= h.day_end_hour || h.day_end_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "teaching day {}..{} is empty or exceeds 24h",
                h.day_start_hour, h.day_end_hour
            )));
        }
        let g = &self.genetic;
        if g.population_size < 2 || g.tournament_size == 0 {
            return Err(ConfigError::Invalid(
                "population_size must be >= 2 and tournament_size >= 1".to_string(),
            ));
        }
        for (name, rate) in [
            ("crossover_rate", g.crossover_rate),
            ("mutation_rate", g.mutation_rate),
            ("elite_fraction", g.elite_fraction),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {rate}")));
            }
        }
        if self.parallel.num_workers == 0 || self.parallel.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "num_workers and chunk_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the capacity buffer.
    pub fn with_capacity_buffer(mut self, buffer: f64) -> Self {
        self.constraints.capacity_buffer = buffer;
        self
    }

    /// Sets the parallel worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.parallel.num_workers = workers;
        self
    }
}

/// Settings shared by every constraint check.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Fractional headroom required above enrollment (0.1 = 10%).
    pub capacity_buffer: f64,
    /// Setup buffer when the request has no known teacher (minutes).
    pub default_setup_minutes: i64,
    /// Cleanup buffer when the request has no known teacher (minutes).
    pub default_cleanup_minutes: i64,
    /// Capacity/required ratio with the best efficiency score.
    pub efficiency_ideal_ratio: f64,
    /// Start of an "evening" session (hour, UTC).
    pub evening_threshold_hour: u32,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            capacity_buffer: 0.1,
            default_setup_minutes: 15,
            default_cleanup_minutes: 10,
            efficiency_ideal_ratio: 1.1,
            evening_threshold_hour: 17,
        }
    }
}

/// Greedy solver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Candidate dates tried per occurrence before giving up.
    pub max_date_trials: usize,
    /// First slot of the teaching day (hour, UTC).
    pub day_start_hour: u32,
    /// End of the teaching day (hour, UTC).
    pub day_end_hour: u32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            max_date_trials: 30,
            day_start_hour: 8,
            day_end_hour: 18,
        }
    }
}

/// Genetic solver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneticConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Maximum generations.
    pub generations: usize,
    /// Probability of crossover per pair.
    pub crossover_rate: f64,
    /// Probability of mutating a child.
    pub mutation_rate: f64,
    /// Fraction of the population copied unchanged.
    pub elite_fraction: f64,
    /// Individuals sampled per tournament.
    pub tournament_size: usize,
    /// Fitness penalty per hard violation.
    pub violation_penalty: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_fraction: 0.1,
            tournament_size: 3,
            violation_penalty: 100.0,
        }
    }
}

/// Parallel solver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads.
    pub num_workers: usize,
    /// Work items per chunk.
    pub chunk_size: usize,
    /// Wall-clock budget in seconds.
    pub timeout_seconds: Option<u64>,
    /// Cap on processed work items.
    pub max_iterations: Option<u64>,
    /// How independent partial solutions are combined.
    pub merge_strategy: MergeStrategy,
}

impl ParallelConfig {
    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            chunk_size: 10,
            timeout_seconds: None,
            max_iterations: None,
            merge_strategy: MergeStrategy::Best,
        }
    }
}

/// Incremental solver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IncrementalConfig {
    /// Lifetime of cached constraint results (seconds).
    pub cache_ttl_seconds: u64,
    /// Candidate windows tried per occurrence.
    pub max_attempts: usize,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            max_attempts: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SolverConfig::default();
        assert!((c.constraints.capacity_buffer - 0.1).abs() < 1e-10);
        assert_eq!(c.genetic.population_size, 50);
        assert_eq!(c.parallel.num_workers, 4);
        assert_eq!(c.incremental.cache_ttl_seconds, 60);
        assert!(c.check().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = SolverConfig::from_toml_str(
            r#"
            [heuristic]
            day_start_hour = 9

            [parallel]
            timeout_seconds = 5
            merge_strategy = "union"
            "#,
        )
        .unwrap();
        assert_eq!(c.heuristic.day_start_hour, 9);
        assert_eq!(c.heuristic.day_end_hour, 18);
        assert_eq!(c.parallel.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(c.parallel.merge_strategy, MergeStrategy::Union);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SolverConfig::from_toml_str("[genetic]\nmutation_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SolverConfig::from_toml_str("[heuristic]\nday_start_hour = 19\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SolverConfig::from_toml_str("[constraints]\ndefault_setup_minutes = 100000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_toml() {
        let err = SolverConfig::from_toml_str("[genetic\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
