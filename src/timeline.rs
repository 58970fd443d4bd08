//! Per-resource booking timeline.
//!
//! Keeps each resource's occupied intervals sorted by start so overlap
//! queries are a binary search plus a short scan instead of a pass over
//! the whole solution.
//!
//! # Complexity
//! `book`: O(log n + n) (vector insert). `overlap_count`: O(log n + k)
//! where k is the number of bookings starting within the longest booked
//! duration before the query.

use std::collections::BTreeMap;

use chrono::Duration;

use crate::constraints::ConstraintContext;
use crate::models::{Assignment, OccurrenceKey, TimeWindow};

/// One occupied interval on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Occupied interval, buffers included.
    pub window: TimeWindow,
    /// Occurrence holding the resource.
    pub key: OccurrenceKey,
}

#[derive(Debug, Clone)]
struct Lane {
    bookings: Vec<Booking>,
    longest: Duration,
}

impl Default for Lane {
    fn default() -> Self {
        Self {
            bookings: Vec::new(),
            longest: Duration::zero(),
        }
    }
}

/// Sorted bookings for every resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceTimeline {
    lanes: BTreeMap<String, Lane>,
}

impl ResourceTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline holding every assignment's occupied window.
    pub fn from_assignments<'a, I>(assignments: I, ctx: &ConstraintContext<'_>) -> Self
    where
        I: IntoIterator<Item = &'a Assignment>,
    {
        let mut timeline = Self::new();
        for a in assignments {
            timeline.book(a, ctx);
        }
        timeline
    }

    /// Books an assignment's occupied window on all its resources.
    pub fn book(&mut self, assignment: &Assignment, ctx: &ConstraintContext<'_>) {
        let window = ctx.occupied_window(assignment);
        for id in assignment.resource_ids() {
            self.insert(id, window, assignment.key());
        }
    }

    /// Inserts one interval.
    pub fn insert(&mut self, resource_id: &str, window: TimeWindow, key: OccurrenceKey) {
        let lane = self.lanes.entry(resource_id.to_string()).or_default();
        let pos = lane.bookings.partition_point(|b| b.window.start <= window.start);
        lane.bookings.insert(pos, Booking { window, key });
        lane.longest = lane.longest.max(window.duration());
    }

    /// Removes every booking held by `assignment`'s occurrence.
    pub fn release(&mut self, assignment: &Assignment) {
        let key = assignment.key();
        for id in assignment.resource_ids() {
            if let Some(lane) = self.lanes.get_mut(id) {
                lane.bookings.retain(|b| b.key != key);
            }
        }
    }

    /// Bookings on `resource_id` overlapping `window`, excluding `skip`.
    pub fn overlapping<'s>(
        &'s self,
        resource_id: &str,
        window: &TimeWindow,
        skip: Option<&'s OccurrenceKey>,
    ) -> impl Iterator<Item = &'s Booking> + 's {
        let window = *window;
        let slice: &[Booking] = match self.lanes.get(resource_id) {
            Some(lane) => {
                let lo = lane
                    .bookings
                    .partition_point(|b| b.window.start + lane.longest <= window.start);
                let hi = lane.bookings.partition_point(|b| b.window.start < window.end);
                &lane.bookings[lo..hi.max(lo)]
            }
            None => &[],
        };
        slice
            .iter()
            .filter(move |b| b.window.overlaps(&window) && Some(&b.key) != skip)
    }

    /// Number of bookings on `resource_id` overlapping `window`.
    pub fn overlap_count(&self, resource_id: &str, window: &TimeWindow) -> usize {
        self.overlapping(resource_id, window, None).count()
    }

    /// Whether `resource_id` has room for one more booking in `window`.
    pub fn is_free(&self, resource_id: &str, window: &TimeWindow, concurrency: u32) -> bool {
        self.overlap_count(resource_id, window) < concurrency.max(1) as usize
    }

    /// Bookings of one resource, sorted by start.
    pub fn bookings(&self, resource_id: &str) -> &[Booking] {
        self.lanes
            .get(resource_id)
            .map(|l| l.bookings.as_slice())
            .unwrap_or(&[])
    }

    /// Total booked intervals.
    pub fn len(&self) -> usize {
        self.lanes.values().map(|l| l.bookings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.lanes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, h, m, 0).unwrap()
    }

    fn w(h1: u32, h2: u32) -> TimeWindow {
        TimeWindow::new(at(h1, 0), at(h2, 0))
    }

    #[test]
    fn test_overlap_queries() {
        let mut t = ResourceTimeline::new();
        t.insert("R1", w(9, 12), ("a".into(), 0));
        t.insert("R1", w(13, 14), ("b".into(), 0));
        t.insert("R1", w(8, 9), ("c".into(), 0));

        let starts: Vec<_> = t.bookings("R1").iter().map(|b| b.window.start).collect();
        assert_eq!(starts, vec![at(8, 0), at(9, 0), at(13, 0)]);

        // long booking starting before the query still counts
        assert_eq!(t.overlap_count("R1", &w(11, 13)), 1);
        assert_eq!(t.overlap_count("R1", &w(12, 13)), 0);
        assert_eq!(t.overlap_count("R1", &TimeWindow::new(at(8, 30), at(13, 30))), 3);
        assert_eq!(t.overlap_count("R2", &w(8, 18)), 0);
        assert!(t.is_free("R1", &w(12, 13), 1));
        assert!(!t.is_free("R1", &w(9, 10), 1));
        assert!(t.is_free("R1", &w(9, 10), 2));
    }

    #[test]
    fn test_skip_and_release() {
        let mut t = ResourceTimeline::new();
        let key = ("a".to_string(), 1);
        t.insert("R1", w(9, 10), key.clone());
        assert_eq!(t.overlapping("R1", &w(9, 10), Some(&key)).count(), 0);

        let a = Assignment::new("a", 1, at(9, 0), at(10, 0))
            .with_resource(crate::models::ResourceType::Classroom, "R1");
        t.release(&a);
        assert!(t.is_empty());
    }
}
