//! Academic holiday calendar and weekly meeting patterns.
//!
//! A `HolidayCalendar` marks whole days on which no session may meet
//! (public holidays, term breaks, closures) plus weekdays that are never
//! schedulable (weekends by default). It also splits a date range into
//! Monday–Friday academic weeks, which is how occurrences are spread
//! across a term.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Category of a holiday period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    /// Public or institutional holiday.
    #[default]
    Holiday,
    /// Term break (spring break, reading week).
    Break,
    /// Examination period.
    ExamPeriod,
    /// Unplanned closure.
    Closure,
}

/// An inclusive range of non-teaching days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayPeriod {
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// Display name.
    pub name: String,
    /// Category.
    pub kind: HolidayKind,
}

impl HolidayPeriod {
    /// Creates a holiday period.
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            name: name.into(),
            kind: HolidayKind::Holiday,
        }
    }

    /// Sets the category.
    pub fn with_kind(mut self, kind: HolidayKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether `date` falls in this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// One Monday–Friday academic week, clamped to a requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcademicWeek {
    /// First day of the week inside the range.
    pub start: NaiveDate,
    /// Last day of the week inside the range.
    pub end: NaiveDate,
}

/// Holiday and non-teaching-day calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayCalendar {
    /// Calendar identifier.
    pub id: String,
    /// Holiday periods.
    pub holidays: Vec<HolidayPeriod>,
    /// Weekdays that are never schedulable.
    pub excluded_weekdays: Vec<Weekday>,
}

impl HolidayCalendar {
    /// Creates a calendar that excludes weekends.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            holidays: Vec::new(),
            excluded_weekdays: vec![Weekday::Sat, Weekday::Sun],
        }
    }

    /// Adds a holiday period.
    pub fn with_holiday(mut self, holiday: HolidayPeriod) -> Self {
        self.holidays.push(holiday);
        self
    }

    /// Replaces the excluded weekdays.
    pub fn with_excluded_weekdays(mut self, days: Vec<Weekday>) -> Self {
        self.excluded_weekdays = days;
        self
    }

    /// The holiday covering `date`, if any.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&HolidayPeriod> {
        self.holidays.iter().find(|h| h.contains(date))
    }

    /// Whether `date` is a holiday.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_on(date).is_some()
    }

    /// Whether sessions may meet on `date`.
    pub fn is_schedulable_day(&self, date: NaiveDate) -> bool {
        !self.excluded_weekdays.contains(&date.weekday()) && !self.is_holiday(date)
    }

    /// All schedulable days in `[start, end]`.
    pub fn available_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_schedulable_day(*d))
            .collect()
    }

    /// Monday–Friday weeks covering `[start, end]`.
    ///
    /// The first week begins on the first Monday on or after `start`.
    /// Weeks in which every weekday is a holiday are skipped; the last
    /// week is clamped to `end`.
    pub fn academic_weeks(&self, start: NaiveDate, end: NaiveDate) -> Vec<AcademicWeek> {
        let mut weeks = Vec::new();
        let mut monday = next_monday(start);

        while monday <= end {
            let friday = monday + Days::new(4);
            let week_end = friday.min(end);
            let all_holiday = monday
                .iter_days()
                .take_while(|d| *d <= week_end)
                .all(|d| self.is_holiday(d));
            if !all_holiday {
                weeks.push(AcademicWeek {
                    start: monday,
                    end: week_end,
                });
            }
            monday = monday + Days::new(7);
        }

        weeks
    }

    /// Validates holiday ranges.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("holiday calendar id must be non-empty".to_string());
        }
        for h in &self.holidays {
            if h.start_date > h.end_date {
                errors.push(format!(
                    "holiday '{}' starts {} after it ends {}",
                    h.name, h.start_date, h.end_date
                ));
            }
        }
        errors
    }
}

fn next_monday(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Days::new(u64::from(offset))
}

/// Weekday subset a request meets on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulingPattern {
    /// Monday to Friday.
    #[default]
    #[serde(rename = "5days")]
    FiveDays,
    /// Monday to Thursday.
    #[serde(rename = "4days_mt")]
    FourDaysMonThu,
    /// Tuesday to Friday.
    #[serde(rename = "4days_tf")]
    FourDaysTueFri,
    /// Monday to Wednesday.
    #[serde(rename = "3days_mw")]
    ThreeDaysMonWed,
    /// Wednesday to Friday.
    #[serde(rename = "3days_wf")]
    ThreeDaysWedFri,
    /// Monday and Tuesday.
    #[serde(rename = "2days_mt")]
    TwoDaysMonTue,
    /// Thursday and Friday.
    #[serde(rename = "2days_tf")]
    TwoDaysThuFri,
}

impl SchedulingPattern {
    /// Parses a pattern tag. Unknown tags fall back to Monday–Friday.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "4days_mt" => Self::FourDaysMonThu,
            "4days_tf" => Self::FourDaysTueFri,
            "3days_mw" => Self::ThreeDaysMonWed,
            "3days_wf" => Self::ThreeDaysWedFri,
            "2days_mt" => Self::TwoDaysMonTue,
            "2days_tf" => Self::TwoDaysThuFri,
            _ => Self::FiveDays,
        }
    }

    /// The tag this pattern serializes as.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::FiveDays => "5days",
            Self::FourDaysMonThu => "4days_mt",
            Self::FourDaysTueFri => "4days_tf",
            Self::ThreeDaysMonWed => "3days_mw",
            Self::ThreeDaysWedFri => "3days_wf",
            Self::TwoDaysMonTue => "2days_mt",
            Self::TwoDaysThuFri => "2days_tf",
        }
    }

    /// Weekdays this pattern allows.
    pub fn weekdays(&self) -> &'static [Weekday] {
        use Weekday::*;
        match self {
            Self::FiveDays => &[Mon, Tue, Wed, Thu, Fri],
            Self::FourDaysMonThu => &[Mon, Tue, Wed, Thu],
            Self::FourDaysTueFri => &[Tue, Wed, Thu, Fri],
            Self::ThreeDaysMonWed => &[Mon, Tue, Wed],
            Self::ThreeDaysWedFri => &[Wed, Thu, Fri],
            Self::TwoDaysMonTue => &[Mon, Tue],
            Self::TwoDaysThuFri => &[Thu, Fri],
        }
    }

    /// Whether `day` is allowed.
    pub fn allows(&self, day: Weekday) -> bool {
        self.weekdays().contains(&day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn spring() -> HolidayCalendar {
        HolidayCalendar::new("spring-2024")
            .with_holiday(HolidayPeriod::new("MLK Day", d(1, 15), d(1, 15)))
            .with_holiday(
                HolidayPeriod::new("Spring Break", d(3, 11), d(3, 15))
                    .with_kind(HolidayKind::Break),
            )
    }

    #[test]
    fn test_schedulable_day() {
        let cal = spring();
        assert!(!cal.is_schedulable_day(d(1, 15))); // holiday
        assert!(cal.is_schedulable_day(d(1, 16)));
        assert!(!cal.is_schedulable_day(d(1, 20))); // Saturday
        assert_eq!(cal.holiday_on(d(3, 13)).map(|h| h.kind), Some(HolidayKind::Break));
    }

    #[test]
    fn test_available_days_in_range() {
        let cal = spring();
        // Jan 15 (holiday) .. Jan 21 (Sun): Tue-Fri remain
        assert_eq!(cal.available_days_in_range(d(1, 15), d(1, 21)).len(), 4);
    }

    #[test]
    fn test_academic_weeks_skip_break() {
        let cal = spring();
        let weeks = cal.academic_weeks(d(3, 1), d(3, 22));
        // Mar 1 is a Friday: weeks start Mar 4, Mar 11 (break, skipped), Mar 18
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].start, d(3, 4));
        assert_eq!(weeks[1].start, d(3, 18));
        assert_eq!(weeks[1].end, d(3, 22));
    }

    #[test]
    fn test_academic_weeks_clamped() {
        let cal = HolidayCalendar::new("c");
        let weeks = cal.academic_weeks(d(1, 15), d(1, 17));
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].end, d(1, 17));
    }

    #[test]
    fn test_pattern_tags() {
        assert_eq!(SchedulingPattern::from_tag("3days_mw").weekdays().len(), 3);
        assert_eq!(SchedulingPattern::from_tag("unknown"), SchedulingPattern::FiveDays);
        assert!(SchedulingPattern::TwoDaysThuFri.allows(Weekday::Thu));
        assert!(!SchedulingPattern::TwoDaysThuFri.allows(Weekday::Mon));
        assert_eq!(SchedulingPattern::FourDaysTueFri.tag(), "4days_tf");
    }

    #[test]
    fn test_validate_reversed_holiday() {
        let cal = HolidayCalendar::new("c")
            .with_holiday(HolidayPeriod::new("bad", d(2, 2), d(2, 1)));
        assert_eq!(cal.validate().len(), 1);
    }
}
