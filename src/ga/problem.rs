//! Scheduling GA problem definition.
//!
//! Bridges the domain `Problem` to the GA: per-request gene templates
//! (pending occurrences, candidate dates, resource pools), random gene
//! construction, fitness evaluation and the final repair pass.
//!
//! # Fitness
//! `-(violations × violation_penalty) + weighted objective score`, higher
//! is better. With no objectives the score term is 0, so any
//! zero-violation individual has fitness ≥ 0.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rand::prelude::IndexedRandom;
use rand::Rng;

use super::chromosome::ScheduleChromosome;
use crate::config::{GeneticConfig, HeuristicConfig};
use crate::constraints::{weighted_objective_score, ConstraintContext, ConstraintSet, Violation};
use crate::heuristic::{priority_score, OccurrenceSpreader, Placer, SlotGenerator};
use crate::models::{Assignment, OccurrenceKey, ResourceType, SessionRequest, TimeWindow};

/// Gene template for one request.
///
/// Extracted once so chromosome operators never touch the full problem.
#[derive(Debug, Clone)]
pub struct RequestGenes {
    /// Request id.
    pub request_id: String,
    /// Occurrence indices not covered by locked assignments.
    pub pending: Vec<u32>,
    /// Dates an occurrence may use.
    pub candidate_dates: Vec<NaiveDate>,
    /// Per required type: count and fitting resource ids.
    pub resource_pools: BTreeMap<ResourceType, (usize, Vec<String>)>,
    /// Priority band (for repair order).
    pub priority: u8,
}

impl RequestGenes {
    /// Whether a gene can be built at all.
    pub fn is_encodable(&self) -> bool {
        !self.pending.is_empty()
            && !self.candidate_dates.is_empty()
            && self.resource_pools.values().all(|(n, pool)| pool.len() >= *n)
    }
}

/// GA problem definition for session scheduling.
#[derive(Debug)]
pub struct GeneticProblem<'a> {
    ctx: ConstraintContext<'a>,
    constraints: &'a ConstraintSet,
    spreader: OccurrenceSpreader<'a>,
    slots: SlotGenerator,
    penalty: f64,
    /// Gene templates keyed by request id.
    pub templates: BTreeMap<String, RequestGenes>,
    /// Locked assignments, fixed in every individual.
    pub locked: Vec<Assignment>,
}

impl<'a> GeneticProblem<'a> {
    /// Creates a problem from a solve context.
    pub fn new(
        ctx: ConstraintContext<'a>,
        constraints: &'a ConstraintSet,
        heuristic: &HeuristicConfig,
        genetic: &GeneticConfig,
    ) -> Self {
        let spreader = OccurrenceSpreader::new(ctx.holidays());
        let placer = Placer::new(ctx, constraints);
        let locked_keys: BTreeSet<OccurrenceKey> =
            ctx.problem.locked_assignments.iter().map(Assignment::key).collect();

        let templates = ctx
            .problem
            .requests
            .iter()
            .map(|request| {
                let resource_pools = request
                    .required_resource_types
                    .iter()
                    .filter(|(_, n)| **n > 0)
                    .map(|(&rtype, &n)| {
                        let pool = placer
                            .ranked(request, rtype)
                            .into_iter()
                            .map(|r| r.id.clone())
                            .collect();
                        (rtype, (n as usize, pool))
                    })
                    .collect();
                let genes = RequestGenes {
                    request_id: request.id.clone(),
                    pending: (0..request.number_of_occurrences)
                        .filter(|i| !locked_keys.contains(&(request.id.clone(), *i)))
                        .collect(),
                    candidate_dates: spreader.candidate_dates(request),
                    resource_pools,
                    priority: priority_score(request),
                };
                (request.id.clone(), genes)
            })
            .collect();

        Self {
            ctx,
            constraints,
            spreader,
            slots: SlotGenerator::new(heuristic, ctx.institutional_calendar()),
            penalty: genetic.violation_penalty,
            templates,
            locked: ctx.problem.locked_assignments.clone(),
        }
    }

    pub fn context(&self) -> &ConstraintContext<'a> {
        &self.ctx
    }

    fn request(&self, request_id: &str) -> Option<&'a SessionRequest> {
        self.ctx.request(request_id)
    }

    /// Random slot on a random candidate date (planned date first).
    pub fn random_window<R: Rng>(
        &self,
        request_id: &str,
        preferred: Option<NaiveDate>,
        rng: &mut R,
    ) -> Option<TimeWindow> {
        let request = self.request(request_id)?;
        let template = self.templates.get(request_id)?;
        if let Some(date) = preferred {
            if let Some(w) = self.slots.slots(date, request).choose(rng) {
                return Some(*w);
            }
        }
        // a few random dates before giving up
        for _ in 0..8 {
            let date = *template.candidate_dates.choose(rng)?;
            if let Some(w) = self.slots.slots(date, request).choose(rng) {
                return Some(*w);
            }
        }
        None
    }

    /// Random fitting resources for every required type.
    pub fn random_resources<R: Rng>(
        &self,
        request_id: &str,
        rng: &mut R,
    ) -> Option<BTreeMap<ResourceType, BTreeSet<String>>> {
        let template = self.templates.get(request_id)?;
        let mut chosen = BTreeMap::new();
        for (&rtype, (n, pool)) in &template.resource_pools {
            if pool.len() < *n {
                return None;
            }
            let picked: BTreeSet<String> = pool.choose_multiple(rng, *n).cloned().collect();
            chosen.insert(rtype, picked);
        }
        Some(chosen)
    }

    /// Random assignments for every pending occurrence of a request.
    ///
    /// Dates come from the spreading plan so a fresh gene is already
    /// spread across the term.
    pub fn random_gene<R: Rng>(&self, request_id: &str, rng: &mut R) -> Vec<Assignment> {
        let (Some(request), Some(template)) =
            (self.request(request_id), self.templates.get(request_id))
        else {
            return Vec::new();
        };
        if !template.is_encodable() {
            return Vec::new();
        }
        let plan = self.spreader.plan(request, &template.candidate_dates, rng);
        template
            .pending
            .iter()
            .enumerate()
            .filter_map(|(i, &occurrence)| {
                let window = self.random_window(request_id, plan.get(i).copied(), rng)?;
                let resources = self.random_resources(request_id, rng)?;
                Some(
                    Assignment::new(&request.id, occurrence, window.start, window.end)
                        .with_resources(resources)
                        .with_cohort(request.cohort_id.clone()),
                )
            })
            .collect()
    }

    /// Completes `genes` with random assignments for every pending
    /// occurrence they lack.
    pub fn fill_missing<R: Rng>(
        &self,
        mut genes: BTreeMap<String, Vec<Assignment>>,
        rng: &mut R,
    ) -> ScheduleChromosome {
        for (id, template) in &self.templates {
            let gene = genes.entry(id.clone()).or_default();
            if gene.len() >= template.pending.len() {
                continue;
            }
            let have: BTreeSet<u32> = gene.iter().map(|a| a.occurrence_index).collect();
            gene.extend(
                self.random_gene(id, rng)
                    .into_iter()
                    .filter(|a| !have.contains(&a.occurrence_index)),
            );
            gene.sort_by_key(|a| a.occurrence_index);
        }
        ScheduleChromosome::new(genes)
    }

    /// Locked assignments followed by every gene.
    pub fn full_solution(&self, chromosome: &ScheduleChromosome) -> Vec<Assignment> {
        let mut all = self.locked.clone();
        all.extend(chromosome.assignments().cloned());
        all
    }

    /// Sets violations and fitness.
    pub fn evaluate(&self, chromosome: &mut ScheduleChromosome) {
        let all = self.full_solution(chromosome);
        let violations = self.constraints.count_violations(&all, &self.ctx);
        let objective = weighted_objective_score(&self.ctx.problem.objectives, &all, &self.ctx)
            .unwrap_or(0.0);
        chromosome.violations = violations;
        chromosome.fitness = -(violations as f64) * self.penalty + objective;
    }

    /// Greedy repair: keeps locked assignments, then re-adds genes in
    /// priority order, skipping any that violate a hard constraint against
    /// what was kept so far.
    ///
    /// Returns the kept assignments and the violation behind each drop.
    pub fn repair(&self, chromosome: &ScheduleChromosome) -> (Vec<Assignment>, Vec<Violation>) {
        let mut genes: Vec<&Assignment> = chromosome.assignments().collect();
        genes.sort_by(|a, b| {
            let pa = self.templates.get(&a.request_id).map_or(0, |t| t.priority);
            let pb = self.templates.get(&b.request_id).map_or(0, |t| t.priority);
            pb.cmp(&pa)
                .then_with(|| a.request_id.cmp(&b.request_id))
                .then(a.occurrence_index.cmp(&b.occurrence_index))
        });

        let mut kept = self.locked.clone();
        let mut dropped = Vec::new();
        for a in genes {
            match self.constraints.check(a, &kept, &self.ctx) {
                None => kept.push(a.clone()),
                Some(v) => dropped.push(v),
            }
        }
        (kept, dropped)
    }
}
