//! Conflict detection and resolution over finished schedules.
//!
//! Where solvers prevent violations while placing, this module works on a
//! schedule that already has them (imported timetables, manual edits,
//! relaxed solves): it names each problem as a typed [`Conflict`] and
//! repairs what it can in place.
//!
//! # Submodules
//!
//! - [`detector`]: typed conflict detection
//! - [`resolver`]: strategy-driven repair, suggestions, constraint ranking
//! - [`automated`]: repair that remembers what worked per conflict pattern

pub mod automated;
pub mod detector;
pub mod resolver;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraints::Violation;
use crate::models::OccurrenceKey;

pub use automated::{AutomatedResolver, ResolutionRecord};
pub use detector::ConflictDetector;
pub use resolver::{ConflictResolver, ConstraintRanking};

/// Kind of scheduling conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    ResourceDoubleBooking,
    TeacherOverload,
    CapacityExceeded,
    TimeSlotUnavailable,
    EquipmentUnavailable,
    RoomUnavailable,
    StudentConflict,
    PrerequisiteViolation,
    BlackoutDate,
    PreferenceViolation,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceDoubleBooking => "resource_double_booking",
            Self::TeacherOverload => "teacher_overload",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::TimeSlotUnavailable => "time_slot_unavailable",
            Self::EquipmentUnavailable => "equipment_unavailable",
            Self::RoomUnavailable => "room_unavailable",
            Self::StudentConflict => "student_conflict",
            Self::PrerequisiteViolation => "prerequisite_violation",
            Self::BlackoutDate => "blackout_date",
            Self::PreferenceViolation => "preference_violation",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repair action for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Drop the least important conflicting assignment.
    Remove,
    /// Move an assignment to another time.
    Reschedule,
    /// Re-pick every resource at the same time.
    Reassign,
    /// Stop enforcing a relaxable constraint.
    RelaxConstraint,
    /// Swap only the conflicting resource.
    AlternateResource,
    /// Shorten a session so it no longer overlaps.
    AdjustDuration,
}

impl ResolutionStrategy {
    /// Strategies tried when the caller gives no order. Removal is never
    /// tried unless asked for.
    pub const DEFAULT_ORDER: [ResolutionStrategy; 5] = [
        Self::AlternateResource,
        Self::Reassign,
        Self::Reschedule,
        Self::AdjustDuration,
        Self::RelaxConstraint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Reschedule => "reschedule",
            Self::Reassign => "reassign",
            Self::RelaxConstraint => "relax_constraint",
            Self::AlternateResource => "alternate_resource",
            Self::AdjustDuration => "adjust_duration",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Stable id: the same conflict gets the same id on re-detection.
    pub conflict_id: String,
    pub conflict_type: ConflictType,
    /// In [0, 1]; higher is more severe.
    pub severity: f64,
    pub description: String,
    /// Occurrences involved.
    pub assignments: Vec<OccurrenceKey>,
    pub resource_ids: Vec<String>,
    pub teacher_ids: Vec<String>,
    pub student_ids: Vec<String>,
    /// Constraint types behind the conflict.
    pub violated_constraints: Vec<String>,
    pub violations: Vec<Violation>,
    /// Applicable strategies, most promising first.
    pub suggested_strategies: Vec<ResolutionStrategy>,
}

impl Conflict {
    /// Creates a conflict; the id is derived from type, entity and the
    /// sorted occurrence keys.
    pub fn new(
        conflict_type: ConflictType,
        entity: &str,
        severity: f64,
        description: impl Into<String>,
        mut assignments: Vec<OccurrenceKey>,
    ) -> Self {
        assignments.sort();
        let keys: Vec<String> = assignments.iter().map(|(id, n)| format!("{id}#{n}")).collect();
        Self {
            conflict_id: format!("{conflict_type}:{entity}:{}", keys.join(",")),
            conflict_type,
            severity,
            description: description.into(),
            assignments,
            resource_ids: Vec::new(),
            teacher_ids: Vec::new(),
            student_ids: Vec::new(),
            violated_constraints: Vec::new(),
            violations: Vec::new(),
            suggested_strategies: Vec::new(),
        }
    }

    pub fn with_strategies(mut self, strategies: &[ResolutionStrategy]) -> Self {
        self.suggested_strategies = strategies.to_vec();
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_ids.push(resource_id.into());
        self
    }

    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_ids.push(teacher_id.into());
        self
    }

    pub fn with_student(mut self, student_id: impl Into<String>) -> Self {
        self.student_ids.push(student_id.into());
        self
    }

    pub fn with_violation(mut self, violation: Violation) -> Self {
        if !self.violated_constraints.contains(&violation.constraint_type) {
            self.violated_constraints.push(violation.constraint_type.clone());
        }
        self.violations.push(violation);
        self
    }

    /// Whether `strategy` applies. Removal applies to every conflict.
    pub fn allows(&self, strategy: ResolutionStrategy) -> bool {
        strategy == ResolutionStrategy::Remove || self.suggested_strategies.contains(&strategy)
    }

    /// Pattern key used to remember successful strategies.
    pub fn pattern_key(&self) -> String {
        format!("{}_{}", self.conflict_type, self.assignments.len())
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// At least one conflict was resolved.
    pub success: bool,
    /// Ids of resolved conflicts.
    pub resolved: Vec<String>,
    /// Ids of conflicts still present.
    pub remaining: Vec<String>,
    /// Last strategy that succeeded.
    pub strategy: Option<ResolutionStrategy>,
    /// What was changed, keyed by conflict id.
    pub details: BTreeMap<String, String>,
    /// Conflicts that appeared during the pass.
    pub new_conflicts: Vec<Conflict>,
    /// Estimated schedule-quality change in [-1, 1].
    pub quality_impact: f64,
}

impl ResolutionResult {
    /// Folds another pass into this one.
    pub fn absorb(&mut self, other: ResolutionResult) {
        self.success |= other.success;
        self.resolved.extend(other.resolved);
        self.remaining.extend(other.remaining);
        if other.strategy.is_some() {
            self.strategy = other.strategy;
        }
        self.details.extend(other.details);
        for c in other.new_conflicts {
            if !self.new_conflicts.iter().any(|n| n.conflict_id == c.conflict_id) {
                self.new_conflicts.push(c);
            }
        }
        self.quality_impact = (self.quality_impact + other.quality_impact).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_id_is_order_independent() {
        let a = Conflict::new(
            ConflictType::ResourceDoubleBooking,
            "R1",
            0.9,
            "x",
            vec![("b".into(), 0), ("a".into(), 1)],
        );
        let b = Conflict::new(
            ConflictType::ResourceDoubleBooking,
            "R1",
            0.9,
            "y",
            vec![("a".into(), 1), ("b".into(), 0)],
        );
        assert_eq!(a.conflict_id, b.conflict_id);
        assert_eq!(a.conflict_id, "resource_double_booking:R1:a#1,b#0");
        assert_eq!(a.pattern_key(), "resource_double_booking_2");
    }

    #[test]
    fn test_allows_and_serde_names() {
        let c = Conflict::new(ConflictType::BlackoutDate, "cal", 1.0, "x", vec![("a".into(), 0)])
            .with_strategies(&[ResolutionStrategy::Reschedule]);
        assert!(c.allows(ResolutionStrategy::Reschedule));
        assert!(c.allows(ResolutionStrategy::Remove));
        assert!(!c.allows(ResolutionStrategy::Reassign));

        let json = serde_json::to_string(&ResolutionStrategy::AlternateResource).unwrap();
        assert_eq!(json, "\"alternate_resource\"");
        let t: ConflictType = serde_json::from_str("\"teacher_overload\"").unwrap();
        assert_eq!(t, ConflictType::TeacherOverload);
    }

    #[test]
    fn test_absorb() {
        let mut total = ResolutionResult::default();
        total.absorb(ResolutionResult {
            success: true,
            resolved: vec!["x".into()],
            strategy: Some(ResolutionStrategy::Reassign),
            quality_impact: -0.8,
            ..Default::default()
        });
        total.absorb(ResolutionResult {
            remaining: vec!["y".into()],
            quality_impact: -0.5,
            ..Default::default()
        });
        assert!(total.success);
        assert_eq!(total.strategy, Some(ResolutionStrategy::Reassign));
        assert!((total.quality_impact + 1.0).abs() < 1e-10);
    }
}
