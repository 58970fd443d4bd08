//! Conflict repair that learns per conflict pattern.
//!
//! A pattern is the conflict type plus the number of sessions involved
//! (`"resource_double_booking_2"`). The strategy that last resolved a
//! pattern is tried first next time, ahead of the usual order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::resolver::ConflictResolver;
use super::{Conflict, ResolutionResult, ResolutionStrategy};
use crate::models::Assignment;

/// Summary of one `auto_resolve` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub timestamp: DateTime<Utc>,
    pub conflicts: usize,
    pub resolved: usize,
    /// `resolved / conflicts`, 0 when there were none.
    pub success_rate: f64,
}

/// Resolver with a memory of successful strategies.
#[derive(Debug)]
pub struct AutomatedResolver<'a> {
    resolver: ConflictResolver<'a>,
    success_patterns: HashMap<String, ResolutionStrategy>,
    history: Vec<ResolutionRecord>,
}

impl<'a> AutomatedResolver<'a> {
    pub fn new(resolver: ConflictResolver<'a>) -> Self {
        Self {
            resolver,
            success_patterns: HashMap::new(),
            history: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &ConflictResolver<'a> {
        &self.resolver
    }

    /// Strategy remembered for a pattern key.
    pub fn learned(&self, pattern_key: &str) -> Option<ResolutionStrategy> {
        self.success_patterns.get(pattern_key).copied()
    }

    pub fn history(&self) -> &[ResolutionRecord] {
        &self.history
    }

    fn order_for(&self, conflict: &Conflict) -> Vec<ResolutionStrategy> {
        let mut order = ResolutionStrategy::DEFAULT_ORDER.to_vec();
        if let Some(known) = self.learned(&conflict.pattern_key()) {
            order.retain(|s| *s != known);
            order.insert(0, known);
        }
        order
    }

    /// Resolves `conflicts` one at a time, most severe first, trying the
    /// learned strategy for each pattern before the default order.
    pub fn auto_resolve(
        &mut self,
        conflicts: &[Conflict],
        solution: &mut Vec<Assignment>,
    ) -> ResolutionResult {
        let mut sorted = conflicts.to_vec();
        sorted.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.conflict_id.cmp(&b.conflict_id))
        });

        let mut result = ResolutionResult::default();
        for conflict in &sorted {
            let order = self.order_for(conflict);
            let attempt = self
                .resolver
                .resolve_conflicts(
                    std::slice::from_ref(conflict),
                    solution,
                    Some(order.as_slice()),
                );
            if attempt.resolved.contains(&conflict.conflict_id) {
                if let Some(strategy) = attempt.strategy {
                    self.success_patterns.insert(conflict.pattern_key(), strategy);
                }
            }
            result.absorb(attempt);
        }
        result.success = !result.resolved.is_empty();

        let record = ResolutionRecord {
            timestamp: Utc::now(),
            conflicts: conflicts.len(),
            resolved: result.resolved.len(),
            success_rate: if conflicts.is_empty() {
                0.0
            } else {
                result.resolved.len() as f64 / conflicts.len() as f64
            },
        };
        info!(
            event = "auto_resolve",
            conflicts = record.conflicts,
            resolved = record.resolved,
            success_rate = record.success_rate,
        );
        self.history.push(record);
        result
    }
}
