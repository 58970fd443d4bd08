//! Campus and building models.
//!
//! Rooms reference a building; buildings belong to a campus with
//! daily operating hours.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A campus with daily operating hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campus {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Opening time (UTC time of day).
    pub opening_time: NaiveTime,
    /// Closing time (UTC time of day).
    pub closing_time: NaiveTime,
}

impl Campus {
    /// Creates a campus open 07:00–23:00.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            opening_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            closing_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Sets operating hours.
    pub fn with_hours(mut self, opening: NaiveTime, closing: NaiveTime) -> Self {
        self.opening_time = opening;
        self.closing_time = closing;
        self
    }

    /// Whether `[start, end]` (times of day) lies within operating hours.
    pub fn is_open_between(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.opening_time && end <= self.closing_time
    }
}

/// A building on a campus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    /// Unique identifier.
    pub id: String,
    /// Owning campus.
    pub campus_id: String,
}

impl Building {
    /// Creates a building.
    pub fn new(id: impl Into<String>, campus_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            campus_id: campus_id.into(),
        }
    }
}
