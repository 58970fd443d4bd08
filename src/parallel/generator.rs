//! Parallel candidate generation over the (resource × time slot) space.
//!
//! Work items pair one slot with one pinned resource of the request's
//! primary type (its first required type). Dates are processed in blocks
//! of `chunk_size`; the first block yielding any valid candidate wins, so
//! earlier dates in the fallback order keep precedence over better
//! scored later ones.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use rayon::ThreadPool;

use super::context::ParallelContext;
use crate::constraints::capacity::{efficiency_score, required_capacity};
use crate::constraints::ConstraintContext;
use crate::heuristic::{Placer, SlotGenerator};
use crate::models::{Assignment, Resource, ResourceType, SessionRequest, TimeWindow};
use crate::timeline::ResourceTimeline;

/// Worst efficiency among the assignment's classrooms; 1 without any.
pub fn room_efficiency(
    ctx: &ConstraintContext<'_>,
    request: &SessionRequest,
    assignment: &Assignment,
) -> f64 {
    let required = required_capacity(request);
    assignment
        .resources_of(ResourceType::Classroom)
        .filter_map(|id| ctx.resource(id))
        .map(|room| {
            let ideal = ctx.config.efficiency_ideal_ratio;
            efficiency_score(room.capacity.unwrap_or(0), required, ideal)
        })
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
        .unwrap_or(1.0)
}

/// A valid candidate with its desirability.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub assignment: Assignment,
    /// Room efficiency of the assigned classroom; 1 without one.
    pub score: f64,
}

impl ScoredCandidate {
    /// Score descending, then start, then resources.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.assignment.start_time.cmp(&other.assignment.start_time))
            .then_with(
                || self.assignment.assigned_resources.cmp(&other.assignment.assigned_resources),
            )
    }
}

/// Generates and scores placement candidates on a worker pool.
#[derive(Debug, Clone)]
pub struct ParallelAssignmentGenerator {
    pool: Arc<ThreadPool>,
    chunk_size: usize,
}

impl ParallelAssignmentGenerator {
    pub fn new(pool: Arc<ThreadPool>, chunk_size: usize) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.max(1),
        }
    }

    fn primary_type(request: &SessionRequest) -> Option<ResourceType> {
        request
            .required_resource_types
            .iter()
            .find(|(_, &count)| count > 0)
            .map(|(&rtype, _)| rtype)
    }

    fn evaluate(
        placer: &Placer<'_>,
        request: &SessionRequest,
        occurrence_index: u32,
        window: &TimeWindow,
        pinned: Option<&Resource>,
        solution: &[Assignment],
        timeline: &ResourceTimeline,
    ) -> Option<ScoredCandidate> {
        placer.window_allowed(request, window).ok()?;
        let resources = placer.select_resources_with(request, window, timeline, pinned).ok()?;
        let assignment = Assignment::new(&request.id, occurrence_index, window.start, window.end)
            .with_resources(resources)
            .with_cohort(request.cohort_id.clone());
        if placer.constraints().check(&assignment, solution, placer.context()).is_some() {
            return None;
        }
        let score = room_efficiency(placer.context(), request, &assignment);
        Some(ScoredCandidate { assignment, score })
    }

    /// Valid candidates of the first productive date block, best first.
    ///
    /// Stops early (returning what it has, possibly nothing) once `pctx`
    /// says so. Each work item counts as one iteration.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        &self,
        placer: &Placer<'_>,
        slots: &SlotGenerator,
        request: &SessionRequest,
        occurrence_index: u32,
        dates: &[NaiveDate],
        solution: &[Assignment],
        timeline: &ResourceTimeline,
        pctx: &ParallelContext,
    ) -> Vec<ScoredCandidate> {
        let pins: Vec<Option<&Resource>> = match Self::primary_type(request) {
            Some(rtype) => placer.ranked(request, rtype).into_iter().map(Some).collect(),
            None => vec![None],
        };
        if pins.is_empty() {
            return Vec::new();
        }

        for block in dates.chunks(self.chunk_size) {
            if pctx.should_stop() {
                break;
            }
            let items: Vec<(TimeWindow, Option<&Resource>)> = block
                .iter()
                .flat_map(|&d| slots.slots(d, request))
                .flat_map(|w| pins.iter().map(move |&p| (w, p)))
                .collect();

            let mut found: Vec<ScoredCandidate> = self.pool.install(|| {
                items
                    .par_iter()
                    .filter_map(|(window, pin)| {
                        pctx.increment_iterations();
                        Self::evaluate(
                            placer,
                            request,
                            occurrence_index,
                            window,
                            *pin,
                            solution,
                            timeline,
                        )
                    })
                    .collect()
            });
            if !found.is_empty() {
                found.sort_by(ScoredCandidate::rank);
                found.dedup_by(|a, b| a.assignment == b.assignment);
                return found;
            }
        }
        Vec::new()
    }

    /// Best candidate, if any.
    #[allow(clippy::too_many_arguments)]
    pub fn best(
        &self,
        placer: &Placer<'_>,
        slots: &SlotGenerator,
        request: &SessionRequest,
        occurrence_index: u32,
        dates: &[NaiveDate],
        solution: &[Assignment],
        timeline: &ResourceTimeline,
        pctx: &ParallelContext,
    ) -> Option<ScoredCandidate> {
        self.generate(placer, slots, request, occurrence_index, dates, solution, timeline, pctx)
            .into_iter()
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintConfig, HeuristicConfig};
    use crate::constraints::ConstraintSet;
    use crate::models::Problem;
    use chrono::{TimeZone, Utc};
    use rayon::ThreadPoolBuilder;

    fn problem() -> Problem {
        let (s, e) = (
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap(),
        );
        Problem::new()
            .with_request(
                SessionRequest::new("cs101", 60, 1, s, e)
                    .with_enrollment(45)
                    .with_resource_type(ResourceType::Classroom, 1),
            )
            .with_resource(Resource::new("HALL", ResourceType::Classroom).with_capacity(300))
            .with_resource(Resource::new("R50", ResourceType::Classroom).with_capacity(50))
    }

    fn pool() -> Arc<ThreadPool> {
        Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap())
    }

    #[test]
    fn test_best_prefers_efficient_room_and_early_slot() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let slots = SlotGenerator::new(&HeuristicConfig::default(), None);
        let generator = ParallelAssignmentGenerator::new(pool(), 2);
        let pctx = ParallelContext::new(None, None);
        let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();

        let all = generator.generate(
            &placer,
            &slots,
            &p.requests[0],
            0,
            &[date],
            &[],
            &ResourceTimeline::new(),
            &pctx,
        );
        // 37 quarter-hour starts from 08:00 to 17:00, two rooms
        assert_eq!(all.len(), 74);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

        let best = &all[0];
        assert!(best.assignment.uses_resource("R50"));
        assert_eq!(best.assignment.start_time, Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap());
        assert!(pctx.iterations() >= 74);
    }

    #[test]
    fn test_busy_room_falls_to_other_room() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let slots = SlotGenerator::new(
            &HeuristicConfig { day_start_hour: 8, day_end_hour: 9, ..Default::default() },
            None,
        );
        let generator = ParallelAssignmentGenerator::new(pool(), 1);
        let pctx = ParallelContext::new(None, None);
        let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();

        let taken = Assignment::new(
            "other",
            0,
            Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap(),
        )
            .with_resource(ResourceType::Classroom, "R50");
        let timeline = ResourceTimeline::from_assignments(std::slice::from_ref(&taken), &ctx);
        let best = generator
            .best(
                &placer,
                &slots,
                &p.requests[0],
                0,
                &[date],
                std::slice::from_ref(&taken),
                &timeline,
                &pctx,
            )
            .unwrap();
        assert!(best.assignment.uses_resource("HALL"));
    }

    #[test]
    fn test_cancelled_generates_nothing() {
        let p = problem();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let set = ConstraintSet::standard(&p);
        let placer = Placer::new(ctx, &set);
        let slots = SlotGenerator::new(&HeuristicConfig::default(), None);
        let generator = ParallelAssignmentGenerator::new(pool(), 2);
        let pctx = ParallelContext::new(None, None);
        pctx.cancel();
        let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let timeline = ResourceTimeline::new();
        let request = &p.requests[0];
        let best = generator.best(&placer, &slots, request, 0, &[date], &[], &timeline, &pctx);
        assert!(best.is_none());
    }
}
