//! Per-request assignment encoding.
//!
//! A chromosome maps each request id to the assignments of its pending
//! occurrences. Locked assignments are never part of a chromosome; they
//! are added back when the solution is evaluated.
//!
//! # Operators
//! Crossover exchanges whole requests between parents so every child
//! gene stays internally consistent (one assignment per occurrence).
//! Mutation changes either the time slot or the resources of a single
//! occurrence.
//!
//! # Reference
//! Burke, Newall & Weare (1996), "A memetic algorithm for university exam
//! timetabling"

use std::collections::BTreeMap;

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::problem::GeneticProblem;
use crate::models::Assignment;

/// Candidate schedule for the genetic solver.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleChromosome {
    /// Assignments per request id.
    pub genes: BTreeMap<String, Vec<Assignment>>,
    /// Fitness (higher is better). `f64::NEG_INFINITY` until evaluated.
    pub fitness: f64,
    /// Hard violations counted at evaluation.
    pub violations: usize,
}

impl ScheduleChromosome {
    /// Wraps genes; fitness is unset.
    pub fn new(genes: BTreeMap<String, Vec<Assignment>>) -> Self {
        Self {
            genes,
            fitness: f64::NEG_INFINITY,
            violations: usize::MAX,
        }
    }

    /// Random individual with every encodable request filled in.
    pub fn random<R: Rng>(problem: &GeneticProblem<'_>, rng: &mut R) -> Self {
        let genes = problem
            .templates
            .keys()
            .map(|id| (id.clone(), problem.random_gene(id, rng)))
            .collect();
        Self::new(genes)
    }

    /// All gene assignments in request order.
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.genes.values().flatten()
    }

    /// Number of gene assignments.
    pub fn len(&self) -> usize {
        self.genes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the last evaluation found no hard violations.
    pub fn is_conflict_free(&self) -> bool {
        self.violations == 0
    }
}

// ======================== Crossover operators ========================

/// Uniform request crossover.
///
/// Each request's gene comes from either parent with probability 0.5;
/// the second child takes the other parent's gene.
pub fn uniform_crossover<R: Rng>(
    p1: &ScheduleChromosome,
    p2: &ScheduleChromosome,
    rng: &mut R,
) -> (ScheduleChromosome, ScheduleChromosome) {
    let mut c1 = BTreeMap::new();
    let mut c2 = BTreeMap::new();
    for (id, g1) in &p1.genes {
        let g2 = p2.genes.get(id).unwrap_or(g1);
        if rng.random_bool(0.5) {
            c1.insert(id.clone(), g1.clone());
            c2.insert(id.clone(), g2.clone());
        } else {
            c1.insert(id.clone(), g2.clone());
            c2.insert(id.clone(), g1.clone());
        }
    }
    (ScheduleChromosome::new(c1), ScheduleChromosome::new(c2))
}

/// One-point request crossover.
///
/// Requests are ordered by id; genes before a random cut come from one
/// parent and the rest from the other.
pub fn one_point_crossover<R: Rng>(
    p1: &ScheduleChromosome,
    p2: &ScheduleChromosome,
    rng: &mut R,
) -> (ScheduleChromosome, ScheduleChromosome) {
    let n = p1.genes.len();
    if n < 2 {
        return (p1.clone(), p2.clone());
    }
    let cut = rng.random_range(1..n);
    let mut c1 = BTreeMap::new();
    let mut c2 = BTreeMap::new();
    for (i, (id, g1)) in p1.genes.iter().enumerate() {
        let g2 = p2.genes.get(id).unwrap_or(g1);
        let (a, b) = if i < cut { (g1, g2) } else { (g2, g1) };
        c1.insert(id.clone(), a.clone());
        c2.insert(id.clone(), b.clone());
    }
    (ScheduleChromosome::new(c1), ScheduleChromosome::new(c2))
}

// ======================== Mutation operators ========================

fn pick_occurrence<R: Rng>(
    chromosome: &ScheduleChromosome,
    rng: &mut R,
) -> Option<(String, usize)> {
    let ids: Vec<&String> = chromosome
        .genes
        .iter()
        .filter(|(_, g)| !g.is_empty())
        .map(|(id, _)| id)
        .collect();
    let id = (*ids.choose(rng)?).clone();
    let len = chromosome.genes.get(&id).map_or(0, Vec::len);
    Some((id, rng.random_range(0..len)))
}

/// Moves one random occurrence to a new random slot.
///
/// Returns `false` when nothing could be changed.
pub fn slot_mutation<R: Rng>(
    chromosome: &mut ScheduleChromosome,
    problem: &GeneticProblem<'_>,
    rng: &mut R,
) -> bool {
    let Some((id, pos)) = pick_occurrence(chromosome, rng) else {
        return false;
    };
    let Some(window) = problem.random_window(&id, None, rng) else {
        return false;
    };
    match chromosome.genes.get_mut(&id).and_then(|g| g.get_mut(pos)) {
        Some(a) => {
            a.start_time = window.start;
            a.end_time = window.end;
            true
        }
        None => false,
    }
}

/// Re-draws the resources of one random occurrence.
pub fn resource_mutation<R: Rng>(
    chromosome: &mut ScheduleChromosome,
    problem: &GeneticProblem<'_>,
    rng: &mut R,
) -> bool {
    let Some((id, pos)) = pick_occurrence(chromosome, rng) else {
        return false;
    };
    let Some(resources) = problem.random_resources(&id, rng) else {
        return false;
    };
    match chromosome.genes.get_mut(&id).and_then(|g| g.get_mut(pos)) {
        Some(a) => {
            a.assigned_resources = resources;
            true
        }
        None => false,
    }
}
