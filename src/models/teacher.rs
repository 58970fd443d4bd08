//! Teacher model.
//!
//! Teachers are referenced by `SessionRequest::teacher_id` and carry the
//! personal limits the teacher constraints enforce: setup/cleanup
//! buffers around every session, preferred teaching days, daily and
//! weekly load caps and travel time between buildings.

use chrono::{Duration, Weekday};
use serde::{Deserialize, Serialize};

/// A member of teaching staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Preparation time before each session (minutes).
    pub setup_minutes: i64,
    /// Wrap-up time after each session (minutes).
    pub cleanup_minutes: i64,
    /// Days the teacher is available. Empty = any day.
    pub preferred_days: Vec<Weekday>,
    /// Maximum teaching hours per day.
    pub max_daily_hours: Option<f64>,
    /// Maximum teaching hours per ISO week.
    pub max_weekly_hours: Option<f64>,
    /// Minimum gap between same-day sessions in different buildings (minutes).
    pub min_travel_minutes: i64,
}

impl Teacher {
    /// Creates a teacher with 15/10 minute buffers and no limits.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            setup_minutes: 15,
            cleanup_minutes: 10,
            preferred_days: Vec::new(),
            max_daily_hours: None,
            max_weekly_hours: None,
            min_travel_minutes: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets setup and cleanup buffers.
    pub fn with_buffers(mut self, setup_minutes: i64, cleanup_minutes: i64) -> Self {
        self.setup_minutes = setup_minutes;
        self.cleanup_minutes = cleanup_minutes;
        self
    }

    /// Restricts the teacher to the given days.
    pub fn with_preferred_days(mut self, days: Vec<Weekday>) -> Self {
        self.preferred_days = days;
        self
    }

    /// Sets daily and weekly hour caps.
    pub fn with_workload(mut self, daily: Option<f64>, weekly: Option<f64>) -> Self {
        self.max_daily_hours = daily;
        self.max_weekly_hours = weekly;
        self
    }

    /// Sets the travel gap between buildings.
    pub fn with_travel_minutes(mut self, minutes: i64) -> Self {
        self.min_travel_minutes = minutes;
        self
    }

    /// Setup buffer as a duration.
    pub fn setup(&self) -> Duration {
        Duration::minutes(self.setup_minutes.max(0))
    }

    /// Cleanup buffer as a duration.
    pub fn cleanup(&self) -> Duration {
        Duration::minutes(self.cleanup_minutes.max(0))
    }

    /// Whether the teacher works on `day`.
    pub fn works_on(&self, day: Weekday) -> bool {
        self.preferred_days.is_empty() || self.preferred_days.contains(&day)
    }
}
