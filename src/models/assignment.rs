//! Assignment (one scheduled occurrence).
//!
//! An assignment records that occurrence `occurrence_index` of a request
//! meets during `[start_time, end_time)` using a set of resources grouped
//! by type.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ResourceType, TimeWindow};

/// Identity of an occurrence: (request id, occurrence index).
pub type OccurrenceKey = (String, u32);

/// A scheduled occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Scheduled request.
    pub request_id: String,
    /// Zero-based occurrence number within the request.
    pub occurrence_index: u32,
    /// Start (inclusive).
    pub start_time: DateTime<Utc>,
    /// End (exclusive).
    pub end_time: DateTime<Utc>,
    /// Resource ids by type.
    pub assigned_resources: BTreeMap<ResourceType, BTreeSet<String>>,
    /// Attending cohort.
    pub cohort_id: Option<String>,
}

impl Assignment {
    /// Creates an assignment with no resources.
    pub fn new(
        request_id: impl Into<String>,
        occurrence_index: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            occurrence_index,
            start_time,
            end_time,
            assigned_resources: BTreeMap::new(),
            cohort_id: None,
        }
    }

    /// Adds one resource.
    pub fn with_resource(
        mut self,
        resource_type: ResourceType,
        resource_id: impl Into<String>,
    ) -> Self {
        self.assigned_resources
            .entry(resource_type)
            .or_default()
            .insert(resource_id.into());
        self
    }

    /// Replaces the whole resource map.
    pub fn with_resources(mut self, resources: BTreeMap<ResourceType, BTreeSet<String>>) -> Self {
        self.assigned_resources = resources;
        self
    }

    /// Sets the cohort.
    pub fn with_cohort(mut self, cohort_id: Option<String>) -> Self {
        self.cohort_id = cohort_id;
        self
    }

    /// Occurrence identity.
    pub fn key(&self) -> OccurrenceKey {
        (self.request_id.clone(), self.occurrence_index)
    }

    /// Whether `other` is the same occurrence.
    #[inline]
    pub fn same_occurrence(&self, other: &Self) -> bool {
        self.occurrence_index == other.occurrence_index && self.request_id == other.request_id
    }

    /// Meeting interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Meeting length.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Calendar day of the start.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// All assigned resource ids.
    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.assigned_resources
            .values()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }

    /// Whether `resource_id` is used by this assignment.
    pub fn uses_resource(&self, resource_id: &str) -> bool {
        self.assigned_resources.values().any(|ids| ids.contains(resource_id))
    }

    /// Resources of one type.
    pub fn resources_of(&self, resource_type: ResourceType) -> impl Iterator<Item = &str> {
        self.assigned_resources
            .get(&resource_type)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }

    /// Whether the two assignments share at least one resource.
    pub fn shares_resource_with(&self, other: &Self) -> bool {
        self.resource_ids().any(|id| other.uses_resource(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, 0, 0).unwrap()
    }

    #[test]
    fn test_assignment_resources() {
        let a = Assignment::new("cs101", 0, at(16, 9), at(16, 11))
            .with_resource(ResourceType::Classroom, "R1")
            .with_resource(ResourceType::Equipment, "P1")
            .with_resource(ResourceType::Equipment, "P2");

        assert_eq!(a.duration(), Duration::hours(2));
        assert_eq!(a.resource_ids().count(), 3);
        assert!(a.uses_resource("P2"));
        assert!(!a.uses_resource("R2"));
        assert_eq!(a.resources_of(ResourceType::Classroom).collect::<Vec<_>>(), vec!["R1"]);
    }

    #[test]
    fn test_shares_resource() {
        let a = Assignment::new("a", 0, at(16, 9), at(16, 10))
            .with_resource(ResourceType::Classroom, "R1");
        let b = Assignment::new("b", 0, at(16, 9), at(16, 10))
            .with_resource(ResourceType::Classroom, "R1");
        let c = Assignment::new("c", 0, at(16, 9), at(16, 10))
            .with_resource(ResourceType::Classroom, "R2");
        assert!(a.shares_resource_with(&b));
        assert!(!a.shares_resource_with(&c));
        assert!(!a.same_occurrence(&b));
    }

    #[test]
    fn test_serializes_iso_times() {
        let a = Assignment::new("a", 2, at(16, 9), at(16, 10))
            .with_resource(ResourceType::Classroom, "R1");
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("2024-01-16T09:00:00Z"));
        assert!(json.contains("\"classroom\":[\"R1\"]"));
        let back: Assignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
