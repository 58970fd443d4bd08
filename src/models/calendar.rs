//! Calendar and time window models.
//!
//! Defines when sessions may be booked: availability windows, blackout
//! periods (closures, maintenance, exams) and the minimum bookable increment.
//!
//! # Time Model
//! All instants are UTC (`DateTime<Utc>`). The calendar's `timezone` is an
//! IANA label carried for adapters; the engine itself never converts.
//!
//! # Precedence
//! Blackouts override availability windows. A window is bookable iff:
//! - It lies entirely within at least one `availability_windows` entry
//!   (or no windows are defined), AND
//! - It does NOT overlap any `blackout_periods` entry.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: DateTime<Utc>,
    /// Interval end (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length of this window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether `other` lies entirely inside this window.
    pub fn encloses(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Widens the window by `before` at the start and `after` at the end.
    pub fn expand(&self, before: Duration, after: Duration) -> Self {
        Self::new(self.start - before, self.end + after)
    }
}

/// Institutional or resource availability calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    /// Calendar identifier.
    pub id: String,
    /// IANA timezone label (informational).
    pub timezone: String,
    /// Minimum bookable increment, in minutes.
    pub timeslot_granularity_minutes: i64,
    /// Periods when booking is allowed. Empty = always.
    pub availability_windows: Vec<TimeWindow>,
    /// Periods when booking is never allowed.
    pub blackout_periods: Vec<TimeWindow>,
}

impl Calendar {
    /// Creates a UTC calendar with 15-minute granularity and no restrictions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timezone: "UTC".to_string(),
            timeslot_granularity_minutes: 15,
            availability_windows: Vec::new(),
            blackout_periods: Vec::new(),
        }
    }

    /// Sets the timezone label.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sets the slot granularity.
    pub fn with_granularity(mut self, minutes: i64) -> Self {
        self.timeslot_granularity_minutes = minutes;
        self
    }

    /// Adds an availability window.
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.availability_windows.push(TimeWindow::new(start, end));
        self
    }

    /// Adds a blackout period.
    pub fn with_blackout(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.blackout_periods.push(TimeWindow::new(start, end));
        self
    }

    /// Slot granularity as a duration (at least one minute).
    pub fn granularity(&self) -> Duration {
        Duration::minutes(self.timeslot_granularity_minutes.max(1))
    }

    /// First blackout that overlaps `window`, if any.
    pub fn blocking_blackout(&self, window: &TimeWindow) -> Option<&TimeWindow> {
        self.blackout_periods.iter().find(|b| b.overlaps(window))
    }

    /// Whether `window` can be booked against this calendar.
    pub fn is_available(&self, window: &TimeWindow) -> bool {
        if self.blocking_blackout(window).is_some() {
            return false;
        }
        if self.availability_windows.is_empty() {
            return true;
        }
        self.availability_windows.iter().any(|w| w.encloses(window))
    }

    /// Rounds a time of day up to the next granularity boundary
    /// (measured from midnight).
    pub fn align_up(&self, time: NaiveTime) -> Option<NaiveTime> {
        let step = self.granularity().num_minutes().max(1) as u32;
        let minutes = time.hour() * 60 + time.minute() + u32::from(time.second() > 0);
        let aligned = minutes.div_ceil(step) * step;
        NaiveTime::from_hms_opt(aligned / 60, aligned % 60, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(at(9, 0), at(11, 0));
        assert_eq!(w.duration(), Duration::hours(2));
        assert!(w.contains(at(9, 0)));
        assert!(w.contains(at(10, 59)));
        assert!(!w.contains(at(11, 0))); // exclusive end
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(at(9, 0), at(10, 0));
        let b = TimeWindow::new(at(9, 30), at(10, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(at(10, 0), at(11, 0)); // touching
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_time_window_expand() {
        let w = TimeWindow::new(at(10, 0), at(11, 0))
            .expand(Duration::minutes(15), Duration::minutes(10));
        assert_eq!(w.start, at(9, 45));
        assert_eq!(w.end, at(11, 10));
    }

    #[test]
    fn test_calendar_unrestricted() {
        let cal = Calendar::new("main");
        assert!(cal.is_available(&TimeWindow::new(at(3, 0), at(4, 0))));
    }

    #[test]
    fn test_calendar_windows_must_enclose() {
        let cal = Calendar::new("main").with_window(at(8, 0), at(18, 0));
        assert!(cal.is_available(&TimeWindow::new(at(9, 0), at(11, 0))));
        assert!(!cal.is_available(&TimeWindow::new(at(17, 0), at(19, 0))));
    }

    #[test]
    fn test_calendar_blackout_overrides() {
        let cal = Calendar::new("main")
            .with_window(at(8, 0), at(18, 0))
            .with_blackout(at(12, 0), at(13, 0));
        assert!(!cal.is_available(&TimeWindow::new(at(11, 30), at(12, 30))));
        assert!(cal.is_available(&TimeWindow::new(at(13, 0), at(14, 0))));
    }

    #[test]
    fn test_align_up() {
        let cal = Calendar::new("main").with_granularity(15);
        let t = NaiveTime::from_hms_opt(9, 7, 0).unwrap();
        assert_eq!(cal.align_up(t), NaiveTime::from_hms_opt(9, 15, 0));
        let exact = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(cal.align_up(exact), Some(exact));
    }
}
