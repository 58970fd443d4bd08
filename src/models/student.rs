//! Student enrollment model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A student and the requests they are enrolled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Unique identifier.
    pub id: String,
    /// Enrolled request ids.
    pub enrolled_requests: BTreeSet<String>,
}

impl Student {
    /// Creates a student with no enrollments.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enrolled_requests: BTreeSet::new(),
        }
    }

    /// Enrolls the student in a request.
    pub fn with_enrollment(mut self, request_id: impl Into<String>) -> Self {
        self.enrolled_requests.insert(request_id.into());
        self
    }

    /// Whether the student attends `request_id`.
    pub fn is_enrolled_in(&self, request_id: &str) -> bool {
        self.enrolled_requests.contains(request_id)
    }
}
