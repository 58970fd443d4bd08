//! Combining independently computed worker solutions.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::WorkerSolution;
use super::generator::room_efficiency;
use crate::constraints::{ConstraintContext, ConstraintSet};
use crate::heuristic::priority_score;
use crate::models::{Assignment, OccurrenceKey};

/// How worker solutions are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep the best solution only.
    #[default]
    Best,
    /// Pool every assignment, then rebuild greedily by priority and room
    /// efficiency.
    Union,
    /// Best solution plus any other worker's assignments that still fit.
    BestConflictFree,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Union => write!(f, "union"),
            Self::BestConflictFree => write!(f, "best_conflict_free"),
        }
    }
}

/// Merges worker solutions without breaking hard constraints.
///
/// Locked assignments always come first and are never displaced.
#[derive(Debug, Clone, Copy)]
pub struct ParallelSolutionMerger<'a> {
    ctx: ConstraintContext<'a>,
    constraints: &'a ConstraintSet,
}

impl<'a> ParallelSolutionMerger<'a> {
    pub fn new(ctx: ConstraintContext<'a>, constraints: &'a ConstraintSet) -> Self {
        Self { ctx, constraints }
    }

    fn ranked(candidates: &[WorkerSolution]) -> Vec<&WorkerSolution> {
        let mut ranked: Vec<&WorkerSolution> = candidates.iter().collect();
        ranked.sort_by(|a, b| {
            if a.outranks(b) {
                Ordering::Less
            } else if b.outranks(a) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        ranked
    }

    /// Adds each assignment whose occurrence is still missing and that
    /// passes every hard constraint. Returns how many were added.
    fn extend_compatible<'s, I>(
        &self,
        solution: &mut Vec<Assignment>,
        keys: &mut BTreeSet<OccurrenceKey>,
        extra: I,
    ) -> usize
    where
        I: IntoIterator<Item = &'s Assignment>,
    {
        let mut added = 0;
        for a in extra {
            if keys.contains(&a.key()) {
                continue;
            }
            if self.constraints.check(a, solution, &self.ctx).is_none() {
                keys.insert(a.key());
                solution.push(a.clone());
                added += 1;
            }
        }
        added
    }

    fn locked(&self) -> (Vec<Assignment>, BTreeSet<OccurrenceKey>) {
        let locked = self.ctx.problem.locked_assignments.clone();
        let keys = locked.iter().map(Assignment::key).collect();
        (locked, keys)
    }

    /// Merges `candidates` with `strategy`; empty when there are none.
    pub fn merge(&self, strategy: MergeStrategy, candidates: &[WorkerSolution]) -> Vec<Assignment> {
        let ranked = Self::ranked(candidates);
        let Some(best) = ranked.first() else {
            return Vec::new();
        };
        match strategy {
            MergeStrategy::Best => best.assignments.clone(),
            MergeStrategy::BestConflictFree => {
                let (mut solution, mut keys) = self.locked();
                self.extend_compatible(&mut solution, &mut keys, &best.assignments);
                let base = solution.len();
                let added =
                    self.extend_compatible(
                        &mut solution,
                        &mut keys,
                        ranked[1..].iter().flat_map(|w| &w.assignments),
                    );
                debug!(strategy = %strategy, base, added, "solutions merged");
                solution
            }
            MergeStrategy::Union => {
                let mut pool: Vec<(usize, f64, u8, &Assignment)> = Vec::new();
                for (rank, w) in ranked.iter().enumerate() {
                    for a in &w.assignments {
                        if pool.iter().any(|(_, _, _, seen)| *seen == a) {
                            continue;
                        }
                        let (priority, efficiency) = match self.ctx.request(&a.request_id) {
                            Some(r) => (priority_score(r), room_efficiency(&self.ctx, r, a)),
                            None => (0, 0.0),
                        };
                        pool.push((rank, efficiency, priority, a));
                    }
                }
                pool.sort_by(|a, b| {
                    b.2.cmp(&a.2)
                        .then_with(|| b.1.total_cmp(&a.1))
                        .then(a.0.cmp(&b.0))
                        .then_with(|| a.3.request_id.cmp(&b.3.request_id))
                        .then(a.3.occurrence_index.cmp(&b.3.occurrence_index))
                });
                let (mut solution, mut keys) = self.locked();
                let added = self.extend_compatible(
                    &mut solution,
                    &mut keys,
                    pool.iter().map(|(_, _, _, a)| *a),
                );
                debug!(strategy = %strategy, pooled = pool.len(), added, "solutions merged");
                solution
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::{InfeasibilityReport, Problem, Resource, ResourceType, SessionRequest};
    use crate::parallel::SolutionScore;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap()
    }

    fn problem() -> Problem {
        let (s, e) = (
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap(),
        );
        ["a", "b", "c"]
            .iter()
            .fold(Problem::new(), |p, id| {
                p.with_request(
                    SessionRequest::new(*id, 60, 1, s, e)
                        .with_resource_type(ResourceType::Classroom, 1),
                )
            })
            .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40))
    }

    fn session(id: &str, h: u32) -> Assignment {
        Assignment::new(id, 0, at(h), at(h + 1)).with_resource(ResourceType::Classroom, "R1")
    }

    fn worker(worker: usize, assignments: Vec<Assignment>) -> WorkerSolution {
        WorkerSolution {
            worker,
            seed: worker as u64,
            score: SolutionScore {
                placed: assignments.len(),
                objective: 0.0,
            },
            assignments,
            report: InfeasibilityReport::default(),
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(MergeStrategy::default(), MergeStrategy::Best);
        assert_eq!(MergeStrategy::BestConflictFree.to_string(), "best_conflict_free");
        let parsed: MergeStrategy = serde_json::from_str("\"union\"").unwrap();
        assert_eq!(parsed, MergeStrategy::Union);
    }

    #[test]
    fn test_merge_strategies() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let merger = ParallelSolutionMerger::new(ctx, &set);

        let candidates = vec![
            worker(0, vec![session("a", 9)]),
            worker(1, vec![session("a", 11), session("b", 9)]),
            // c collides with w1's b
            worker(2, vec![session("c", 9)]),
        ];

        let best = merger.merge(MergeStrategy::Best, &candidates);
        assert_eq!(best, vec![session("a", 11), session("b", 9)]);

        let extended = merger.merge(MergeStrategy::BestConflictFree, &candidates);
        assert_eq!(extended.len(), 2);
        assert!(set.is_valid(&extended, &ctx));

        let union = merger.merge(MergeStrategy::Union, &candidates);
        assert!(set.is_valid(&union, &ctx));
        assert_eq!(union.len(), 2);
        assert!(union.iter().any(|a| a.request_id == "a"));

        assert!(merger.merge(MergeStrategy::Union, &[]).is_empty());
    }

    #[test]
    fn test_conflict_free_adds_compatible() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let merger = ParallelSolutionMerger::new(ctx, &set);

        let candidates = vec![
            worker(0, vec![session("a", 9), session("b", 11)]),
            worker(1, vec![session("c", 14)]),
        ];
        let merged = merger.merge(MergeStrategy::BestConflictFree, &candidates);
        assert_eq!(merged.len(), 3);
        assert!(set.is_valid(&merged, &ctx));
    }
}
