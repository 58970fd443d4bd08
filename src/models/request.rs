//! Session request model.
//!
//! A `SessionRequest` describes a recurring course meeting that must be
//! placed `number_of_occurrences` times inside its date window. Requests
//! are immutable during solving; solvers only emit `Assignment`s that
//! reference them by id.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AttributeRequirement, Requirements, ResourceType, SchedulingPattern};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Delivery mode of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Meets in a physical room.
    #[default]
    InPerson,
    /// Meets online only.
    Online,
    /// Mixed; room capacity is not enforced.
    Hybrid,
}

/// A recurring session to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Unique request identifier.
    pub id: String,
    /// Length of one occurrence, in minutes.
    pub duration_minutes: i64,
    /// How many times the session meets.
    pub number_of_occurrences: u32,
    /// Earliest allowed start.
    pub earliest_date: DateTime<Utc>,
    /// Latest allowed end.
    pub latest_date: DateTime<Utc>,
    /// Expected attendance.
    pub enrollment_count: u32,
    /// Minimum room capacity, overriding enrollment when larger.
    pub min_capacity: Option<u32>,
    /// Maximum room capacity (avoids oversized rooms).
    pub max_capacity: Option<u32>,
    /// Delivery mode.
    pub modality: Modality,
    /// Student cohort attending.
    pub cohort_id: Option<String>,
    /// Capability requirements on assigned resources.
    pub required_attributes: Requirements,
    /// Number of resources needed per type.
    pub required_resource_types: BTreeMap<ResourceType, u32>,
    /// Lead teacher.
    pub teacher_id: Option<String>,
    /// Co-teachers.
    pub additional_teachers: Vec<String>,
    /// Allowed weekdays.
    pub scheduling_pattern: Option<SchedulingPattern>,
    /// Minimum gap between consecutive occurrences, in minutes.
    pub min_gap_minutes: i64,
    /// Skip holiday-calendar days.
    pub avoid_holidays: bool,
    /// Cap on occurrences in one week.
    pub max_occurrences_per_week: Option<u32>,
    /// Preferred building for rooms.
    pub preferred_building_id: Option<String>,
    /// Mandatory building for rooms.
    pub required_building_id: Option<String>,
    /// Requests this one depends on.
    pub prerequisites: Vec<String>,
}

impl SessionRequest {
    /// Creates a request with no resource needs, Mon–Fri pattern and
    /// holiday avoidance on.
    pub fn new(
        id: impl Into<String>,
        duration_minutes: i64,
        number_of_occurrences: u32,
        earliest_date: DateTime<Utc>,
        latest_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            duration_minutes,
            number_of_occurrences,
            earliest_date,
            latest_date,
            enrollment_count: 0,
            min_capacity: None,
            max_capacity: None,
            modality: Modality::InPerson,
            cohort_id: None,
            required_attributes: Requirements::new(),
            required_resource_types: BTreeMap::new(),
            teacher_id: None,
            additional_teachers: Vec::new(),
            scheduling_pattern: None,
            min_gap_minutes: 0,
            avoid_holidays: true,
            max_occurrences_per_week: None,
            preferred_building_id: None,
            required_building_id: None,
            prerequisites: Vec::new(),
        }
    }

    /// Sets the enrollment.
    pub fn with_enrollment(mut self, count: u32) -> Self {
        self.enrollment_count = count;
        self
    }

    /// Sets capacity bounds.
    pub fn with_capacity_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_capacity = min;
        self.max_capacity = max;
        self
    }

    /// Sets the modality.
    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    /// Sets the cohort.
    pub fn with_cohort(mut self, cohort_id: impl Into<String>) -> Self {
        self.cohort_id = Some(cohort_id.into());
        self
    }

    /// Requires `count` resources of a type.
    pub fn with_resource_type(mut self, resource_type: ResourceType, count: u32) -> Self {
        self.required_resource_types.insert(resource_type, count);
        self
    }

    /// Adds an attribute requirement.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        requirement: AttributeRequirement,
    ) -> Self {
        self.required_attributes.insert(key.into(), requirement);
        self
    }

    /// Sets the lead teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Adds a co-teacher.
    pub fn with_additional_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.additional_teachers.push(teacher_id.into());
        self
    }

    /// Sets the weekday pattern.
    pub fn with_pattern(mut self, pattern: SchedulingPattern) -> Self {
        self.scheduling_pattern = Some(pattern);
        self
    }

    /// Sets the minimum gap between occurrences.
    pub fn with_min_gap_minutes(mut self, minutes: i64) -> Self {
        self.min_gap_minutes = minutes;
        self
    }

    /// Enables or disables holiday avoidance.
    pub fn with_avoid_holidays(mut self, avoid: bool) -> Self {
        self.avoid_holidays = avoid;
        self
    }

    /// Caps occurrences per week.
    pub fn with_max_per_week(mut self, max: u32) -> Self {
        self.max_occurrences_per_week = Some(max);
        self
    }

    /// Sets the preferred building.
    pub fn with_preferred_building(mut self, building_id: impl Into<String>) -> Self {
        self.preferred_building_id = Some(building_id.into());
        self
    }

    /// Sets the mandatory building.
    pub fn with_required_building(mut self, building_id: impl Into<String>) -> Self {
        self.required_building_id = Some(building_id.into());
        self
    }

    /// Adds a prerequisite request.
    pub fn with_prerequisite(mut self, request_id: impl Into<String>) -> Self {
        self.prerequisites.push(request_id.into());
        self
    }

    /// Occurrence length.
    #[inline]
    pub fn duration(&self) -> Duration {
        Duration::try_minutes(self.duration_minutes).unwrap_or(Duration::MAX)
    }

    /// Effective weekday pattern.
    pub fn pattern(&self) -> SchedulingPattern {
        self.scheduling_pattern.unwrap_or_default()
    }

    /// Whether room capacity applies to this request.
    pub fn needs_room_capacity(&self) -> bool {
        self.modality == Modality::InPerson
    }

    /// The resource type `required_attributes` are matched against:
    /// the room (or online slot) when one is required, otherwise `None`
    /// meaning every required type.
    pub fn attribute_target(&self) -> Option<ResourceType> {
        [ResourceType::Classroom, ResourceType::OnlineSlot]
            .into_iter()
            .find(|t| self.required_resource_types.contains_key(t))
    }

    /// Every teacher attached to the request (lead first).
    pub fn all_teachers(&self) -> impl Iterator<Item = &str> {
        self.teacher_id
            .as_deref()
            .into_iter()
            .chain(self.additional_teachers.iter().map(String::as_str))
    }

    /// Checks the request's invariants, collecting every error.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let field = |name: &str| format!("requests[{}].{}", self.id, name);

        if self.id.is_empty() {
            errors.push(ValidationError::field(
                ValidationErrorKind::MissingField,
                "requests[].id",
                "non-empty string",
                "\"\"",
            ));
        }
        if self.earliest_date >= self.latest_date {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidDateRange,
                field("earliest_date"),
                "earliest_date < latest_date",
                format!("{} >= {}", self.earliest_date, self.latest_date),
            ));
        }
        if self.duration_minutes <= 0 {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("duration_minutes"),
                "positive duration",
                self.duration_minutes.to_string(),
            ));
        }
        let span = self.latest_date - self.earliest_date;
        if self.duration_minutes > 0
            && self.earliest_date < self.latest_date
            && self.duration() > span
        {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("duration_minutes"),
                format!("at most the request window ({} minutes)", span.num_minutes()),
                self.duration_minutes.to_string(),
            ));
        }
        if self.number_of_occurrences < 1 {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("number_of_occurrences"),
                "at least 1",
                "0",
            ));
        }
        if let (Some(min), Some(max)) = (self.min_capacity, self.max_capacity) {
            if min > max {
                errors.push(ValidationError::field(
                    ValidationErrorKind::InvalidValue,
                    field("min_capacity"),
                    "min_capacity <= max_capacity",
                    format!("{min} > {max}"),
                ));
            }
        }
        if self.min_gap_minutes < 0 {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("min_gap_minutes"),
                "non-negative minutes",
                self.min_gap_minutes.to_string(),
            ));
        } else if self.earliest_date < self.latest_date
            && self.min_gap_minutes > span.num_minutes()
        {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("min_gap_minutes"),
                format!("at most the request window ({} minutes)", span.num_minutes()),
                self.min_gap_minutes.to_string(),
            ));
        }
        if self.max_occurrences_per_week == Some(0) {
            errors.push(ValidationError::field(
                ValidationErrorKind::InvalidValue,
                field("max_occurrences_per_week"),
                "at least 1 when set",
                "0",
            ));
        }

        errors
    }
}
