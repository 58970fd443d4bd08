//! Constraint violation record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A constraint violation.
///
/// Carries identity and diagnostics only; remediation lives in the
/// conflict resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the violated constraint.
    pub constraint_type: String,
    /// Request whose assignment violated it.
    pub affected_request_id: String,
    /// Resource involved, if any.
    pub affected_resource_id: Option<String>,
    /// Human-readable description.
    pub message: String,
    /// Structured diagnostics.
    pub details: BTreeMap<String, String>,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        constraint_type: impl Into<String>,
        request_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            constraint_type: constraint_type.into(),
            affected_request_id: request_id.into(),
            affected_resource_id: None,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Sets the affected resource.
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.affected_resource_id = Some(resource_id.into());
        self
    }

    /// Adds a diagnostic entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// The other request involved in a pairwise conflict, if recorded.
    pub fn conflicting_request(&self) -> Option<&str> {
        self.details.get("conflicting_request").map(String::as_str)
    }

    /// Occurrence index of the violating assignment, if recorded.
    pub fn occurrence_index(&self) -> Option<u32> {
        self.details.get("occurrence_index").and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_builder() {
        let v = Violation::new("hard.no_overlap", "cs101", "Room R1 double-booked")
            .with_resource("R1")
            .with_detail("conflicting_request", "ma201")
            .with_detail("occurrence_index", 3);
        assert_eq!(v.affected_resource_id.as_deref(), Some("R1"));
        assert_eq!(v.conflicting_request(), Some("ma201"));
        assert_eq!(v.occurrence_index(), Some(3));
    }
}
