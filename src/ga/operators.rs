//! Configurable genetic operators for scheduling.
//!
//! Provides runtime-selectable crossover and mutation strategies plus
//! tournament selection via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use edu_schedule::ga::operators::{GeneticOperators, CrossoverType, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Uniform);
//! assert_eq!(ops.mutation_type, MutationType::Mixed);
//! ```

use rand::Rng;

use super::chromosome::{
    one_point_crossover, resource_mutation, slot_mutation, uniform_crossover, ScheduleChromosome,
};
use super::problem::GeneticProblem;

/// Crossover strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverType {
    /// Each request's gene drawn from either parent with p = 0.5.
    Uniform,
    /// Requests before a random cut from one parent, the rest from the other.
    OnePoint,
}

/// Mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    /// Move one occurrence to a new slot.
    Slot,
    /// Re-draw one occurrence's resources.
    Resource,
    /// Slot or resource mutation with equal probability.
    Mixed,
}

/// Runtime-selectable genetic operators.
///
/// # Example
///
/// ```
/// use edu_schedule::ga::operators::{GeneticOperators, CrossoverType, MutationType};
///
/// let ops = GeneticOperators {
///     crossover_type: CrossoverType::OnePoint,
///     mutation_type: MutationType::Slot,
///     tournament_size: 5,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Mutation strategy.
    pub mutation_type: MutationType,
    /// Individuals sampled per tournament.
    pub tournament_size: usize,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::Uniform,
            mutation_type: MutationType::Mixed,
            tournament_size: 3,
        }
    }
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng>(
        &self,
        p1: &ScheduleChromosome,
        p2: &ScheduleChromosome,
        rng: &mut R,
    ) -> (ScheduleChromosome, ScheduleChromosome) {
        match self.crossover_type {
            CrossoverType::Uniform => uniform_crossover(p1, p2, rng),
            CrossoverType::OnePoint => one_point_crossover(p1, p2, rng),
        }
    }

    /// Performs mutation using the configured strategy.
    ///
    /// Returns whether the chromosome changed.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut ScheduleChromosome,
        problem: &GeneticProblem<'_>,
        rng: &mut R,
    ) -> bool {
        let slot = match self.mutation_type {
            MutationType::Slot => true,
            MutationType::Resource => false,
            MutationType::Mixed => rng.random_bool(0.5),
        };
        if slot {
            slot_mutation(chromosome, problem, rng)
        } else {
            resource_mutation(chromosome, problem, rng)
        }
    }

    /// Tournament selection: best of `tournament_size` random picks.
    ///
    /// Returns an index into `population`; ties keep the earliest pick.
    /// `population` must not be empty.
    pub fn select<R: Rng>(&self, population: &[ScheduleChromosome], rng: &mut R) -> usize {
        let mut best = rng.random_range(0..population.len());
        for _ in 1..self.tournament_size.max(1) {
            let i = rng.random_range(0..population.len());
            if population[i].fitness > population[best].fitness {
                best = i;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scored(fitness: f64) -> ScheduleChromosome {
        let mut ch = ScheduleChromosome::new(BTreeMap::new());
        ch.fitness = fitness;
        ch
    }

    #[test]
    fn test_default_operators() {
        let ops = GeneticOperators::default();
        assert_eq!(ops.crossover_type, CrossoverType::Uniform);
        assert_eq!(ops.mutation_type, MutationType::Mixed);
        assert_eq!(ops.tournament_size, 3);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let population = vec![scored(-500.0), scored(-10.0), scored(-300.0), scored(-200.0)];
        let ops = GeneticOperators {
            tournament_size: 16,
            ..GeneticOperators::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let picks: Vec<usize> = (0..20).map(|_| ops.select(&population, &mut rng)).collect();
        // 16 draws from 4 almost always include the best
        assert!(picks.iter().filter(|&&i| i == 1).count() >= 18);
    }

    #[test]
    fn test_tournament_size_one_is_random() {
        let population = vec![scored(0.0), scored(1.0)];
        let ops = GeneticOperators {
            tournament_size: 1,
            ..GeneticOperators::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let picks: Vec<usize> = (0..100).map(|_| ops.select(&population, &mut rng)).collect();
        assert!(picks.contains(&0));
        assert!(picks.contains(&1));
    }
}
