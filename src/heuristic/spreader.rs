//! Occurrence date spreading and slot generation.
//!
//! # Algorithm
//!
//! 1. Candidate dates: days in the request window allowed by its weekday
//!    pattern and, when holidays are avoided, schedulable in the holiday
//!    calendar.
//! 2. Candidates are grouped into academic weeks (Monday-based).
//! 3. First round: one date in each of `min(n, weeks)` evenly spaced weeks.
//! 4. Extra rounds: walk the weeks again adding one date per week while
//!    the per-week cap and the minimum gap allow it.
//! 5. Within a week the date farthest from already chosen dates wins;
//!    equal candidates are split by the RNG.
//!
//! Dates that were not planned (or failed) are retried in fallback order:
//! maximal distance from the request's scheduled dates first.
//!
//! # Reference
//! Burke & Petrovic (2002), "Recent research directions in automated
//! timetabling", §3 (spreading constraints)

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;

use crate::config::HeuristicConfig;
use crate::models::{Calendar, HolidayCalendar, SessionRequest, TimeWindow};

/// Priority band of a request by session length.
///
/// ≥180 min → 4, ≥120 → 3, ≥90 → 2, otherwise 1.
pub fn priority_score(request: &SessionRequest) -> u8 {
    match request.duration_minutes {
        m if m >= 180 => 4,
        m if m >= 120 => 3,
        m if m >= 90 => 2,
        _ => 1,
    }
}

/// Requests in placement order: priority band, then occurrence count
/// (both descending), then id.
pub fn sort_by_priority<'a, I>(requests: I) -> Vec<&'a SessionRequest>
where
    I: IntoIterator<Item = &'a SessionRequest>,
{
    let mut sorted: Vec<&SessionRequest> = requests.into_iter().collect();
    sorted.sort_by(|a, b| {
        priority_score(b)
            .cmp(&priority_score(a))
            .then(b.number_of_occurrences.cmp(&a.number_of_occurrences))
            .then(a.id.cmp(&b.id))
    });
    sorted
}

/// Monday of the week containing `date`.
pub fn week_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Spreads occurrences of a request across its date window.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceSpreader<'a> {
    holidays: Option<&'a HolidayCalendar>,
}

impl<'a> OccurrenceSpreader<'a> {
    pub fn new(holidays: Option<&'a HolidayCalendar>) -> Self {
        Self { holidays }
    }

    /// Every date an occurrence of `request` may fall on, ascending.
    pub fn candidate_dates(&self, request: &SessionRequest) -> Vec<NaiveDate> {
        let pattern = request.pattern();
        let (first, last) = (request.earliest_date.date_naive(), request.latest_date.date_naive());
        first
            .iter_days()
            .take_while(|d| *d <= last)
            .filter(|d| pattern.allows(d.weekday()))
            .filter(|d| {
                !request.avoid_holidays || self.holidays.map_or(true, |h| h.is_schedulable_day(*d))
            })
            .collect()
    }

    /// Minimum whole days between two planned dates of `request`.
    fn min_day_gap(request: &SessionRequest) -> i64 {
        if request.min_gap_minutes <= 0 {
            return 1;
        }
        let minutes = request.min_gap_minutes.saturating_add(request.duration_minutes.max(0));
        (minutes.saturating_add(1439) / 1440).max(1)
    }

    fn week_has_room(request: &SessionRequest, chosen: &[NaiveDate], week: NaiveDate) -> bool {
        match request.max_occurrences_per_week {
            Some(cap) => chosen.iter().filter(|d| week_of(**d) == week).count() < cap as usize,
            None => true,
        }
    }

    fn best_in_week<R: Rng>(
        request: &SessionRequest,
        dates: &[NaiveDate],
        chosen: &[NaiveDate],
        rng: &mut R,
    ) -> Option<NaiveDate> {
        let gap = Self::min_day_gap(request);
        let mut best: Vec<NaiveDate> = Vec::new();
        let mut best_score = i64::MIN;
        for &d in dates {
            if chosen.iter().any(|c| day_distance(*c, d) < gap) {
                continue;
            }
            // farthest from chosen dates (capped at a week), earlier weekday second
            let spread = chosen.iter().map(|c| day_distance(*c, d)).min().unwrap_or(7).min(7);
            let score = spread * 10 - i64::from(d.weekday().num_days_from_monday());
            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score == best_score {
                best.push(d);
            }
        }
        match best.len() {
            0 => None,
            1 => Some(best[0]),
            n => Some(best[rng.random_range(0..n)]),
        }
    }

    /// Planned dates for the request's occurrences, ascending.
    ///
    /// May return fewer dates than occurrences when the window is too
    /// narrow; the caller falls back to [`Self::fallback_order`].
    pub fn plan<R: Rng>(
        &self,
        request: &SessionRequest,
        candidates: &[NaiveDate],
        rng: &mut R,
    ) -> Vec<NaiveDate> {
        let mut weeks: BTreeMap<NaiveDate, Vec<NaiveDate>> = BTreeMap::new();
        for &d in candidates {
            weeks.entry(week_of(d)).or_default().push(d);
        }
        let week_list: Vec<(&NaiveDate, &Vec<NaiveDate>)> = weeks.iter().collect();
        let needed = request.number_of_occurrences as usize;
        let total = week_list.len();
        if total == 0 || needed == 0 {
            return Vec::new();
        }

        let mut chosen: Vec<NaiveDate> = Vec::with_capacity(needed);
        let first_round: Vec<usize> = if needed >= total {
            (0..total).collect()
        } else {
            (0..needed).map(|i| (2 * i + 1) * total / (2 * needed)).collect()
        };
        for idx in first_round {
            let (_, dates) = week_list[idx];
            if let Some(d) = Self::best_in_week(request, dates, &chosen, rng) {
                chosen.push(d);
            }
        }

        while chosen.len() < needed {
            let before = chosen.len();
            for (week, dates) in &week_list {
                if chosen.len() >= needed {
                    break;
                }
                if !Self::week_has_room(request, &chosen, **week) {
                    continue;
                }
                let open: Vec<NaiveDate> = dates
                    .iter()
                    .copied()
                    .filter(|d| !chosen.contains(d))
                    .collect();
                if let Some(d) = Self::best_in_week(request, &open, &chosen, rng) {
                    chosen.push(d);
                }
            }
            if chosen.len() == before {
                break;
            }
        }

        chosen.sort();
        chosen
    }

    /// Dates to try for one occurrence, at most `limit`.
    ///
    /// `planned` comes first; then unused candidates whose week still has
    /// room, farthest from `scheduled` first, earlier date on ties.
    pub fn fallback_order(
        &self,
        request: &SessionRequest,
        candidates: &[NaiveDate],
        scheduled: &[NaiveDate],
        planned: Option<NaiveDate>,
        limit: usize,
    ) -> Vec<NaiveDate> {
        let used: BTreeSet<NaiveDate> = scheduled.iter().copied().collect();
        let mut rest: Vec<(i64, NaiveDate)> = candidates
            .iter()
            .copied()
            .filter(|d| !used.contains(d) && Some(*d) != planned)
            .filter(|d| Self::week_has_room(request, scheduled, week_of(*d)))
            .map(|d| {
                let distance = scheduled.iter().map(|s| day_distance(*s, d)).min().unwrap_or(0);
                (distance, d)
            })
            .collect();
        rest.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        planned
            .filter(|d| !used.contains(d))
            .into_iter()
            .chain(rest.into_iter().map(|(_, d)| d))
            .take(limit)
            .collect()
    }
}

/// Start times within the teaching day, aligned to calendar granularity.
#[derive(Debug, Clone, Copy)]
pub struct SlotGenerator {
    day_start_hour: u32,
    day_end_hour: u32,
    step: Duration,
}

impl SlotGenerator {
    /// Uses the teaching day from `config` and the granularity of
    /// `calendar` (15 minutes without one).
    pub fn new(config: &HeuristicConfig, calendar: Option<&Calendar>) -> Self {
        Self {
            day_start_hour: config.day_start_hour,
            day_end_hour: config.day_end_hour.min(24),
            step: calendar.map_or(Duration::minutes(15), Calendar::granularity),
        }
    }

    /// Windows of the request's duration on `date` that fit the teaching
    /// day and the request's date window.
    pub fn slots(&self, date: NaiveDate, request: &SessionRequest) -> Vec<TimeWindow> {
        let midnight: DateTime<Utc> = match date.and_hms_opt(0, 0, 0) {
            Some(t) => t.and_utc(),
            None => return Vec::new(),
        };
        let day_end = midnight + Duration::hours(i64::from(self.day_end_hour));
        let duration = request.duration();
        let mut start = midnight + Duration::hours(i64::from(self.day_start_hour));
        let mut out = Vec::new();
        while start + duration <= day_end {
            let end = start + duration;
            if start >= request.earliest_date && end <= request.latest_date {
                out.push(TimeWindow::new(start, end));
            }
            start += self.step;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HolidayPeriod, SchedulingPattern};
    use chrono::{TimeZone, Weekday};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn request(minutes: i64, occurrences: u32) -> SessionRequest {
        SessionRequest::new(
            "cs101",
            minutes,
            occurrences,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_priority_score_and_order() {
        assert_eq!(priority_score(&request(180, 1)), 4);
        assert_eq!(priority_score(&request(120, 1)), 3);
        assert_eq!(priority_score(&request(90, 1)), 2);
        assert_eq!(priority_score(&request(60, 1)), 1);

        let mut a = request(60, 10);
        a.id = "a".into();
        let mut b = request(120, 2);
        b.id = "b".into();
        let mut c = request(60, 12);
        c.id = "c".into();
        let order: Vec<&str> = sort_by_priority([&a, &b, &c])
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_candidate_dates_skip_weekends_and_holidays() {
        let holidays = HolidayCalendar::new("term")
            .with_holiday(HolidayPeriod::new("Spring break", d(3, 11), d(3, 15)));
        let spreader = OccurrenceSpreader::new(Some(&holidays));
        let dates = spreader.candidate_dates(&request(60, 1));
        assert!(dates.iter().all(|x| !matches!(x.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(!dates.contains(&d(3, 12)));
        assert_eq!(dates.first(), Some(&d(1, 15)));

        let mut mw = request(60, 1).with_pattern(SchedulingPattern::TwoDaysMonTue);
        mw.avoid_holidays = false;
        let dates = spreader.candidate_dates(&mw);
        assert!(dates.contains(&d(3, 12)));
        assert!(dates.iter().all(|x| matches!(x.weekday(), Weekday::Mon | Weekday::Tue)));
    }

    #[test]
    fn test_plan_spreads_across_weeks() {
        let spreader = OccurrenceSpreader::new(None);
        let req = request(120, 8);
        let candidates = spreader.candidate_dates(&req);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let plan = spreader.plan(&req, &candidates, &mut rng);

        assert_eq!(plan.len(), 8);
        let weeks: BTreeSet<NaiveDate> = plan.iter().map(|x| week_of(*x)).collect();
        assert_eq!(weeks.len(), 8);
        assert!(plan.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_plan_respects_week_cap_and_gap() {
        let spreader = OccurrenceSpreader::new(None);
        let mut req = request(60, 40).with_max_per_week(2).with_min_gap_minutes(24 * 60);
        req.latest_date = Utc.with_ymd_and_hms(2024, 2, 9, 23, 0, 0).unwrap();
        let candidates = spreader.candidate_dates(&req);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let plan = spreader.plan(&req, &candidates, &mut rng);

        // four weeks, two per week
        assert_eq!(plan.len(), 8);
        assert!(plan.windows(2).all(|w| (w[1] - w[0]).num_days() >= 2));
    }

    #[test]
    fn test_plan_is_seed_deterministic() {
        let spreader = OccurrenceSpreader::new(None);
        let req = request(60, 24);
        let candidates = spreader.candidate_dates(&req);
        let a = spreader.plan(&req, &candidates, &mut ChaCha8Rng::seed_from_u64(42));
        let b = spreader.plan(&req, &candidates, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_prefers_distant_dates() {
        let spreader = OccurrenceSpreader::new(None);
        let req = request(60, 3);
        let candidates = vec![d(1, 15), d(1, 16), d(1, 22), d(2, 5)];
        let order = spreader.fallback_order(&req, &candidates, &[d(1, 15)], Some(d(1, 16)), 3);
        assert_eq!(order, vec![d(1, 16), d(2, 5), d(1, 22)]);
    }

    #[test]
    fn test_slots_fit_day_and_window() {
        let config = HeuristicConfig::default();
        let slots = SlotGenerator::new(&config, None).slots(d(1, 16), &request(120, 1));
        assert_eq!(
            slots.first().map(|w| w.start),
            Some(Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap())
        );
        assert_eq!(
            slots.last().map(|w| w.end),
            Some(Utc.with_ymd_and_hms(2024, 1, 16, 18, 0, 0).unwrap())
        );
        // 08:00..16:00 every 15 minutes
        assert_eq!(slots.len(), 33);

        let mut narrow = request(120, 1);
        narrow.earliest_date = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        narrow.latest_date = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let slots = SlotGenerator::new(&config, None).slots(d(1, 15), &narrow);
        assert_eq!(slots.len(), 1);
    }
}
