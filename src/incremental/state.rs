//! Mutable schedule state for live editing.

use std::time::{Duration, Instant};

use super::cache::{CacheStats, CheckCache, CheckKey};
use crate::constraints::{ConstraintContext, ConstraintSet, Violation};
use crate::models::{Assignment, OccurrenceKey, TimeWindow};
use crate::timeline::ResourceTimeline;

fn order(a: &Assignment, b: &Assignment) -> std::cmp::Ordering {
    a.start_time
        .cmp(&b.start_time)
        .then_with(|| a.request_id.cmp(&b.request_id))
        .then(a.occurrence_index.cmp(&b.occurrence_index))
}

/// Current assignments plus the indexes kept in step with them.
///
/// - `assignments`: sorted by start time (then request, occurrence)
/// - `timeline`: per-resource sorted occupied intervals
/// - `cache`: constraint results for the current `version`
///
/// Every mutation bumps `version`, which retires all cached results.
#[derive(Debug, Clone)]
pub struct IncrementalState {
    assignments: Vec<Assignment>,
    timeline: ResourceTimeline,
    cache: CheckCache,
    version: u64,
}

impl IncrementalState {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            assignments: Vec::new(),
            timeline: ResourceTimeline::new(),
            cache: CheckCache::new(cache_ttl),
            version: 0,
        }
    }

    /// State holding `assignments`.
    pub fn from_assignments(
        assignments: Vec<Assignment>,
        ctx: &ConstraintContext<'_>,
        cache_ttl: Duration,
    ) -> Self {
        let mut state = Self::new(cache_ttl);
        for a in assignments {
            state.insert(a, ctx);
        }
        state
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn timeline(&self) -> &ResourceTimeline {
        &self.timeline
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Assignment for an occurrence.
    pub fn get(&self, key: &OccurrenceKey) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.request_id == key.0 && a.occurrence_index == key.1)
    }

    /// Assignments of one request, by occurrence index.
    pub fn for_request(&self, request_id: &str) -> Vec<&Assignment> {
        let mut found: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.request_id == request_id)
            .collect();
        found.sort_by_key(|a| a.occurrence_index);
        found
    }

    pub fn contains_request(&self, request_id: &str) -> bool {
        self.assignments.iter().any(|a| a.request_id == request_id)
    }

    /// Assignments starting inside `window`.
    pub fn starting_within(&self, window: &TimeWindow) -> &[Assignment] {
        let lo = self.assignments.partition_point(|a| a.start_time < window.start);
        let hi = self.assignments.partition_point(|a| a.start_time < window.end);
        &self.assignments[lo..hi.max(lo)]
    }

    /// Occurrences holding `resource_id` during `window` (occupied windows).
    pub fn holders(&self, resource_id: &str, window: &TimeWindow) -> Vec<OccurrenceKey> {
        self.timeline
            .overlapping(resource_id, window, None)
            .map(|b| b.key.clone())
            .collect()
    }

    /// Inserts in start order and books its resources.
    pub fn insert(&mut self, assignment: Assignment, ctx: &ConstraintContext<'_>) {
        self.timeline.book(&assignment, ctx);
        let pos = self
            .assignments
            .partition_point(|a| order(a, &assignment) == std::cmp::Ordering::Less);
        self.assignments.insert(pos, assignment);
        self.version += 1;
    }

    /// Removes one occurrence.
    pub fn remove(&mut self, key: &OccurrenceKey) -> Option<Assignment> {
        let pos = self
            .assignments
            .iter()
            .position(|a| a.request_id == key.0 && a.occurrence_index == key.1)?;
        let removed = self.assignments.remove(pos);
        self.timeline.release(&removed);
        self.version += 1;
        Some(removed)
    }

    /// Removes every occurrence of a request.
    pub fn remove_request(&mut self, request_id: &str) -> Vec<Assignment> {
        let (removed, kept): (Vec<Assignment>, Vec<Assignment>) =
            std::mem::take(&mut self.assignments)
                .into_iter()
                .partition(|a| a.request_id == request_id);
        for a in &removed {
            self.timeline.release(a);
        }
        self.assignments = kept;
        if !removed.is_empty() {
            self.version += 1;
        }
        removed
    }

    /// Hard-constraint check of `assignment` against the current state,
    /// served from the cache when possible.
    pub fn check(
        &mut self,
        assignment: &Assignment,
        constraints: &ConstraintSet,
        ctx: &ConstraintContext<'_>,
    ) -> Option<Violation> {
        let now = Instant::now();
        let key = CheckKey::of(assignment);
        if let Some(cached) = self.cache.get(&key, self.version, now) {
            return cached;
        }
        let result = constraints.check(assignment, &self.assignments, ctx);
        self.cache.insert(key, result.clone(), self.version, now);
        result
    }

    /// Every violation in the current state.
    pub fn violations(
        &mut self,
        constraints: &ConstraintSet,
        ctx: &ConstraintContext<'_>,
    ) -> Vec<Violation> {
        let now = Instant::now();
        self.cache.purge(self.version, now);
        let current = self.assignments.clone();
        current
            .iter()
            .filter_map(|a| self.check(a, constraints, ctx))
            .collect()
    }
}
