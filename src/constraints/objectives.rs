//! Built-in soft objectives.
//!
//! Every objective maps a solution to `[0, 1]`, higher is better, and an
//! empty solution scores 1.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};

use super::{ConstraintContext, Objective};
use crate::models::{Assignment, ResourceType};

/// `1 - variance / max_variance`, where `max_variance = total² / buckets`
/// (everything in one bucket).
fn balance_score<I: IntoIterator<Item = usize>>(counts: I, total: usize) -> f64 {
    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    if counts.is_empty() || total == 0 {
        return 1.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<f64>() / n;
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    let max_variance = (total as f64).powi(2) / n;
    (1.0 - variance / max_variance).max(0.0)
}

/// Prefers an even number of sessions on every used day.
#[derive(Debug, Clone)]
pub struct SpreadEvenlyAcrossTerm {
    weight: f64,
}

impl SpreadEvenlyAcrossTerm {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl Default for SpreadEvenlyAcrossTerm {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Objective for SpreadEvenlyAcrossTerm {
    fn objective_type(&self) -> &'static str {
        "soft.spread_evenly_across_term"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, solution: &[Assignment], _ctx: &ConstraintContext<'_>) -> f64 {
        let mut daily: BTreeMap<_, usize> = BTreeMap::new();
        for a in solution {
            *daily.entry(a.date()).or_default() += 1;
        }
        balance_score(daily.into_values(), solution.len())
    }
}

/// Penalizes sessions starting at or after an evening threshold.
#[derive(Debug, Clone)]
pub struct MinimizeEveningSessions {
    weight: f64,
    threshold: Option<NaiveTime>,
}

impl MinimizeEveningSessions {
    /// Uses the configured `evening_threshold_hour`.
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            threshold: None,
        }
    }

    /// Overrides the threshold.
    pub fn with_threshold(mut self, threshold: NaiveTime) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

impl Default for MinimizeEveningSessions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Objective for MinimizeEveningSessions {
    fn objective_type(&self) -> &'static str {
        "soft.minimize_evening_sessions"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, solution: &[Assignment], ctx: &ConstraintContext<'_>) -> f64 {
        if solution.is_empty() {
            return 1.0;
        }
        let threshold = self.threshold.unwrap_or_else(|| {
            NaiveTime::from_hms_opt(ctx.config.evening_threshold_hour.min(23), 0, 0)
                .unwrap_or(NaiveTime::MIN)
        });
        let evening = solution
            .iter()
            .filter(|a| {
                let t = a.start_time.time();
                t.with_nanosecond(0).unwrap_or(t) >= threshold
            })
            .count();
        (1.0 - evening as f64 / solution.len() as f64).max(0.0)
    }
}

/// Prefers instructors with similar session counts.
#[derive(Debug, Clone)]
pub struct BalanceInstructorLoad {
    weight: f64,
}

impl BalanceInstructorLoad {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl Default for BalanceInstructorLoad {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Objective for BalanceInstructorLoad {
    fn objective_type(&self) -> &'static str {
        "soft.balance_instructor_load"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, solution: &[Assignment], _ctx: &ConstraintContext<'_>) -> f64 {
        let mut loads: BTreeMap<&str, usize> = BTreeMap::new();
        for a in solution {
            for id in a.resources_of(ResourceType::Instructor) {
                *loads.entry(id).or_default() += 1;
            }
        }
        balance_score(loads.into_values(), solution.len())
    }
}

/// Weighted mean of objective scores; `None` without objectives or weight.
pub fn weighted_objective_score<O>(
    objectives: &[O],
    solution: &[Assignment],
    ctx: &ConstraintContext<'_>,
) -> Option<f64>
where
    O: AsRef<dyn Objective>,
{
    let (mut total, mut weights) = (0.0, 0.0);
    for o in objectives {
        let o = o.as_ref();
        let w = o.weight().max(0.0);
        total += w * o.score(solution, ctx).clamp(0.0, 1.0);
        weights += w;
    }
    (weights > 0.0).then(|| total / weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintConfig;
    use crate::models::Problem;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn a(d: u32, h: u32) -> Assignment {
        Assignment::new("x", d, at(d, h), at(d, h + 1))
    }

    #[test]
    fn test_spread_evenly() {
        let p = Problem::new();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let o = SpreadEvenlyAcrossTerm::default();

        assert!((o.score(&[], &ctx) - 1.0).abs() < 1e-10);
        assert!((o.score(&[a(15, 9), a(16, 9), a(17, 9)], &ctx) - 1.0).abs() < 1e-10);

        // counts [2, 1]: mean 1.5, variance 0.25, max 9/2
        let uneven = vec![a(15, 9), Assignment::new("x", 9, at(15, 11), at(15, 12)), a(16, 9)];
        assert!((o.score(&uneven, &ctx) - (1.0 - 0.25 / 4.5)).abs() < 1e-10);
    }

    #[test]
    fn test_minimize_evening() {
        let p = Problem::new();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let o = MinimizeEveningSessions::default();
        let s = vec![a(15, 9), a(16, 17), a(17, 18), a(18, 10)];
        assert!((o.score(&s, &ctx) - 0.5).abs() < 1e-10);
        let late = MinimizeEveningSessions::new(1.0)
            .with_threshold(NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert!((late.score(&s, &ctx) - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_balance_instructor_load() {
        let p = Problem::new();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let o = BalanceInstructorLoad::default();
        let s = vec![
            a(15, 9).with_resource(ResourceType::Instructor, "i1"),
            a(16, 9).with_resource(ResourceType::Instructor, "i2"),
        ];
        assert!((o.score(&s, &ctx) - 1.0).abs() < 1e-10);
        assert!((o.score(&[a(15, 9)], &ctx) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_weighted_score() {
        let p = Problem::new();
        let idx = p.build_indices();
        let ctx = ConstraintContext::new(&p, &idx, ConstraintConfig::default());
        let none: Vec<Arc<dyn Objective>> = Vec::new();
        assert!(weighted_objective_score(&none, &[], &ctx).is_none());

        let objectives: Vec<Arc<dyn Objective>> = vec![
            Arc::new(MinimizeEveningSessions::new(3.0)),
            Arc::new(SpreadEvenlyAcrossTerm::new(1.0)),
        ];
        let s = vec![a(15, 9), a(16, 19)];
        // evening 0.5 * 3 + spread 1.0 * 1 over 4
        let score = weighted_objective_score(&objectives, &s, &ctx).unwrap();
        assert!((score - 2.5 / 4.0).abs() < 1e-10);
    }
}
