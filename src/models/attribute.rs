//! Capability attributes and requirements.
//!
//! Resources advertise attributes (`projector = true`, `seats = 60`,
//! `lab_type = "chemistry"`); requests state requirements against them.
//! A requirement is either `Required` (must be satisfied) or `Optional`
//! (a preference that never blocks placement).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An attribute value advertised by a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer quantity.
    Int(i64),
    /// Real quantity.
    Float(f64),
    /// Free-form label.
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it is a quantity.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A requirement on one named attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeRequirement {
    /// The resource must satisfy the value.
    Required(AttributeValue),
    /// Preferred but not enforced.
    Optional(AttributeValue),
}

impl AttributeRequirement {
    /// Whether this requirement blocks placement when unmet.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required(_))
    }

    /// The requested value.
    pub fn value(&self) -> &AttributeValue {
        match self {
            Self::Required(v) | Self::Optional(v) => v,
        }
    }

    /// Whether an advertised value meets this requirement.
    ///
    /// Quantities are satisfied by any value at least as large; flags and
    /// labels need equality. Optional requirements are always satisfied.
    pub fn is_satisfied_by(&self, actual: Option<&AttributeValue>) -> bool {
        match self {
            Self::Optional(_) => true,
            Self::Required(wanted) => actual.is_some_and(|a| value_meets(a, wanted)),
        }
    }

    /// Whether an advertised value matches the requested value, ignoring
    /// whether the requirement is optional. Used for preference scoring.
    pub fn is_matched_by(&self, actual: Option<&AttributeValue>) -> bool {
        actual.is_some_and(|a| value_meets(a, self.value()))
    }
}

fn value_meets(actual: &AttributeValue, wanted: &AttributeValue) -> bool {
    match (wanted.as_f64(), actual.as_f64()) {
        (Some(w), Some(a)) => a >= w,
        _ => actual == wanted,
    }
}

/// Attribute requirements keyed by attribute name.
pub type Requirements = BTreeMap<String, AttributeRequirement>;

/// Advertised attributes keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_flag() {
        let req = AttributeRequirement::Required(true.into());
        assert!(req.is_satisfied_by(Some(&AttributeValue::Bool(true))));
        assert!(!req.is_satisfied_by(Some(&AttributeValue::Bool(false))));
        assert!(!req.is_satisfied_by(None));
    }

    #[test]
    fn test_required_quantity_is_minimum() {
        let req = AttributeRequirement::Required(AttributeValue::Int(30));
        assert!(req.is_satisfied_by(Some(&AttributeValue::Int(40))));
        assert!(req.is_satisfied_by(Some(&AttributeValue::Float(30.0))));
        assert!(!req.is_satisfied_by(Some(&AttributeValue::Int(20))));
    }

    #[test]
    fn test_optional_never_blocks() {
        let req = AttributeRequirement::Optional("chemistry".into());
        assert!(req.is_satisfied_by(None));
        assert!(!req.is_matched_by(None));
        assert!(req.is_matched_by(Some(&AttributeValue::Text("chemistry".into()))));
    }

    #[test]
    fn test_text_equality() {
        let req = AttributeRequirement::Required("lab".into());
        assert!(!req.is_satisfied_by(Some(&AttributeValue::Text("lecture".into()))));
    }
}
