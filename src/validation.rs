//! Input validation for scheduling problems.
//!
//! Checks structural integrity of a `Problem` before any solving begins.
//! Every error is collected so callers can fix a problem in one pass.
//! Detects:
//! - Malformed requests (date ranges, durations, occurrence counts)
//! - Duplicate IDs
//! - Dangling calendar, building and prerequisite references
//! - Circular prerequisite chains (DAG validation)
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::MAX_BUFFER_MINUTES;
use crate::models::Problem;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: expected {expected_format}, got {actual_value} ({message})")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Offending field path (e.g. `requests[cs101].duration_minutes`).
    pub field: String,
    /// What a valid value looks like.
    pub expected_format: String,
    /// The value that was found.
    pub actual_value: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A reference points to an entity that doesn't exist.
    InvalidReference,
    /// Prerequisite graph contains a cycle.
    CyclicDependency,
    /// `earliest_date` is not before `latest_date` (or a window is reversed).
    InvalidDateRange,
    /// A numeric field is out of range.
    InvalidValue,
    /// A required field is empty.
    MissingField,
}

impl ValidationError {
    fn new(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            expected_format: String::new(),
            actual_value: String::new(),
            message: message.into(),
        }
    }

    /// Creates an error describing an unexpected field value.
    pub fn field(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        expected_format: impl Into<String>,
        actual_value: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let expected_format = expected_format.into();
        let actual_value = actual_value.into();
        Self {
            message: format!("{field} must be {expected_format}"),
            kind,
            field,
            expected_format,
            actual_value,
        }
    }
}

/// Validates a scheduling problem.
///
/// Checks:
/// 1. Every request's own invariants
/// 2. No duplicate request, resource, calendar or teacher IDs
/// 3. The institutional calendar and resource calendars exist
/// 4. Calendars have positive granularity and ordered windows
/// 5. Resources tolerate at least one booking
/// 6. Building and campus references resolve (when buildings are modelled)
/// 7. Prerequisites reference known requests and contain no cycles
/// 8. Locked assignments have positive length
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(problem: &Problem) -> ValidationResult {
    let mut errors = Vec::new();

    for request in &problem.requests {
        errors.extend(request.validate());
    }

    check_duplicates("request", problem.requests.iter().map(|r| r.id.as_str()), &mut errors);
    check_duplicates("resource", problem.resources.iter().map(|r| r.id.as_str()), &mut errors);
    check_duplicates("calendar", problem.calendars.iter().map(|c| c.id.as_str()), &mut errors);
    check_duplicates("teacher", problem.teachers.iter().map(|t| t.id.as_str()), &mut errors);

    for t in &problem.teachers {
        for (name, minutes) in [
            ("setup_minutes", t.setup_minutes),
            ("cleanup_minutes", t.cleanup_minutes),
            ("min_travel_minutes", t.min_travel_minutes),
        ] {
            if minutes > MAX_BUFFER_MINUTES {
                errors.push(ValidationError::field(
                    ValidationErrorKind::InvalidValue,
                    format!("teachers[{}].{name}", t.id),
                    format!("at most {MAX_BUFFER_MINUTES} minutes"),
                    minutes.to_string(),
                ));
            }
        }
    }

    let calendar_ids: HashSet<&str> = problem.calendars.iter().map(|c| c.id.as_str()).collect();

    if let Some(id) = &problem.institutional_calendar_id {
        if !calendar_ids.contains(id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                "institutional_calendar_id",
                format!("Institutional calendar '{id}' not found"),
            ));
        }
    }

    for cal in &problem.calendars {
        if cal.timeslot_granularity_minutes <= 0 {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                format!("calendars[{}].timeslot_granularity_minutes", cal.id),
                "positive minutes",
                cal.timeslot_granularity_minutes.to_string(),
            ));
        }
        for w in cal.availability_windows.iter().chain(&cal.blackout_periods) {
            if w.start >= w.end {
                errors.push(ValidationError::field(
                    ValidationErrorKind::InvalidDateRange,
                    format!("calendars[{}]", cal.id),
                    "window start < end",
                    format!("{} >= {}", w.start, w.end),
                ));
            }
        }
    }

    let building_ids: HashSet<&str> = problem.buildings.iter().map(|b| b.id.as_str()).collect();
    for r in &problem.resources {
        if let Some(cal) = &r.availability_calendar_id {
            if !calendar_ids.contains(cal.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("resources[{}].availability_calendar_id", r.id),
                    format!("Resource '{}' references unknown calendar '{cal}'", r.id),
                ));
            }
        }
        if r.concurrency_capacity == 0 {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                format!("resources[{}].concurrency_capacity", r.id),
                "at least 1",
                "0",
            ));
        }
        if let Some(b) = &r.building_id {
            if !building_ids.is_empty() && !building_ids.contains(b.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("resources[{}].building_id", r.id),
                    format!("Resource '{}' references unknown building '{b}'", r.id),
                ));
            }
        }
    }

    let campus_ids: HashSet<&str> = problem.campuses.iter().map(|c| c.id.as_str()).collect();
    for b in &problem.buildings {
        if !campus_ids.is_empty() && !campus_ids.contains(b.campus_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!("buildings[{}].campus_id", b.id),
                format!("Building '{}' references unknown campus '{}'", b.id, b.campus_id),
            ));
        }
    }

    if let Some(holidays) = &problem.holiday_calendar {
        for message in holidays.validate() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDateRange,
                format!("holiday_calendar[{}]", holidays.id),
                message,
            ));
        }
    }

    let request_ids: HashSet<&str> = problem.requests.iter().map(|r| r.id.as_str()).collect();
    for request in &problem.requests {
        for pre in &request.prerequisites {
            if !request_ids.contains(pre.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("requests[{}].prerequisites", request.id),
                    format!("Request '{}' references unknown prerequisite '{pre}'", request.id),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(problem) {
        errors.push(cycle_err);
    }

    for a in &problem.locked_assignments {
        if a.start_time >= a.end_time {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidDateRange,
                format!("locked_assignments[{}#{}]", a.request_id, a.occurrence_index),
                "start_time < end_time",
                format!("{} >= {}", a.start_time, a.end_time),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duplicates<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("{entity}s"),
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
}

/// Detects cycles in the prerequisite graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(problem: &Problem) -> Option<ValidationError> {
    // prerequisite → dependents
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut all_ids: Vec<&str> = Vec::new();

    for request in &problem.requests {
        all_ids.push(&request.id);
        for pre in &request.prerequisites {
            adj.entry(pre.as_str()).or_default().push(request.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for &node in &all_ids {
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                "requests[].prerequisites",
                format!("Circular prerequisite chain involving request '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
