//! End-to-end scheduling properties across every backend.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use edu_schedule::config::ConstraintConfig;
use edu_schedule::constraints::ConstraintContext;
use edu_schedule::models::{Assignment, HolidayCalendar, HolidayPeriod, Problem};
use edu_schedule::{
    solve, solve_with_config, Backend, Resource, ResourceType, SessionRequest, SolveResult,
    SolveStatus, SolverConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn fast_config() -> SolverConfig {
    let mut config = SolverConfig::default();
    config.genetic.population_size = 12;
    config.genetic.generations = 10;
    config.parallel.num_workers = 2;
    config
}

fn run_all(problem: &Problem, seed: u64) -> Vec<SolveResult> {
    Backend::ALL
        .iter()
        .map(|b| solve_with_config(problem, b.as_str(), Some(seed), false, fast_config()).unwrap())
        .collect()
}

fn spring_break() -> HolidayCalendar {
    HolidayCalendar::new("2024-spring")
        .with_holiday(HolidayPeriod::new("Spring break", date(3, 11), date(3, 15)))
        .with_holiday(HolidayPeriod::new("Founders day", date(4, 2), date(4, 2)))
}

fn cs101_problem() -> Problem {
    Problem::new()
        .with_request(
            SessionRequest::new("cs101", 120, 24, at(1, 15, 0), at(5, 15, 0))
                .with_enrollment(45)
                .with_capacity_range(Some(45), None)
                .with_resource_type(ResourceType::Classroom, 1)
                .with_avoid_holidays(true),
        )
        .with_resource(Resource::new("R101", ResourceType::Classroom).with_capacity(50))
        .with_holiday_calendar(spring_break())
}

/// Four courses competing for two rooms over one month.
fn busy_problem() -> Problem {
    let mut problem = Problem::new()
        .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(40))
        .with_resource(Resource::new("R2", ResourceType::Classroom).with_capacity(60));
    for (id, enrollment) in [("math", 30), ("physics", 50), ("chem", 20), ("bio", 35)] {
        problem = problem.with_request(
            SessionRequest::new(id, 90, 6, at(1, 15, 0), at(2, 15, 0))
                .with_enrollment(enrollment)
                .with_resource_type(ResourceType::Classroom, 1),
        );
    }
    problem
}

fn assert_no_double_booking(problem: &Problem, result: &SolveResult) {
    let indices = problem.build_indices();
    let ctx = ConstraintContext::new(problem, &indices, ConstraintConfig::default());
    let all = &result.assignments;
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            let shared = a.resource_ids().any(|r| b.uses_resource(r));
            if shared {
                assert!(
                    !ctx.occupied_window(a).overlaps(&ctx.occupied_window(b)),
                    "{} double-booked: {:?} / {:?}",
                    result.backend_used,
                    a.key(),
                    b.key()
                );
            }
        }
    }
}

fn assert_in_date_window(problem: &Problem, result: &SolveResult) {
    for a in &result.assignments {
        let request = problem.requests.iter().find(|r| r.id == a.request_id).unwrap();
        assert!(request.earliest_date <= a.start_time, "{:?} starts early", a.key());
        assert!(a.end_time <= request.latest_date, "{:?} ends late", a.key());
    }
}

fn assert_capacity(problem: &Problem, result: &SolveResult) {
    let buffer = ConstraintConfig::default().capacity_buffer;
    for a in &result.assignments {
        let request = problem.requests.iter().find(|r| r.id == a.request_id).unwrap();
        for room_id in a.resources_of(ResourceType::Classroom) {
            let room = problem.resources.iter().find(|r| r.id == room_id).unwrap();
            if let Some(capacity) = room.capacity {
                assert!(
                    f64::from(request.enrollment_count) <= f64::from(capacity) * (1.0 + buffer)
                );
            }
        }
    }
}

#[test]
fn test_cs101_term_is_feasible() {
    init_tracing();
    let problem = cs101_problem();
    let calendar = spring_break();

    let result = solve(&problem, "heuristic", Some(42), false).unwrap();
    assert_eq!(result.status, SolveStatus::Feasible);
    assert_eq!(result.assignments.len(), 24);
    assert!(result.unscheduled_requests.is_empty());
    assert_eq!(result.seed_used, 42);

    let mut occurrences: Vec<u32> = result.assignments.iter().map(|a| a.occurrence_index).collect();
    occurrences.sort_unstable();
    assert_eq!(occurrences, (0..24).collect::<Vec<_>>());

    for a in &result.assignments {
        let day = a.start_time.weekday();
        assert!(day != Weekday::Sat && day != Weekday::Sun, "{:?} on {day}", a.key());
        assert!(!calendar.is_holiday(a.date()), "{:?} on holiday {}", a.key(), a.date());
        assert!(a.uses_resource("R101"));
    }
}

#[test]
fn test_cs101_every_backend() {
    let problem = cs101_problem();
    for result in run_all(&problem, 7) {
        assert_eq!(result.status, SolveStatus::Feasible, "{}", result.backend_used);
        assert_eq!(result.assignments.len(), 24, "{}", result.backend_used);
        assert_eq!(result.seed_used, 7);
    }
}

#[test]
fn test_contended_window_is_partial() {
    init_tracing();
    // both requests fit only 09:00-11:00 on Jan 16
    let problem = Problem::new()
        .with_request(
            SessionRequest::new("a", 120, 1, at(1, 16, 9), at(1, 16, 11))
                .with_enrollment(20)
                .with_resource_type(ResourceType::Classroom, 1),
        )
        .with_request(
            SessionRequest::new("b", 120, 1, at(1, 16, 9), at(1, 16, 11))
                .with_enrollment(20)
                .with_resource_type(ResourceType::Classroom, 1),
        )
        .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(30));

    for result in run_all(&problem, 42) {
        assert_eq!(result.status, SolveStatus::Partial, "{}", result.backend_used);
        assert_eq!(result.assignments.len(), 1, "{}", result.backend_used);
        assert_eq!(result.unscheduled_requests.len(), 1, "{}", result.backend_used);
        let scheduled = &result.assignments[0].request_id;
        assert_ne!(scheduled, &result.unscheduled_requests[0]);
        let report = result.infeasibility_report.as_ref().unwrap();
        assert!(report.per_request_explanations.contains_key(&result.unscheduled_requests[0]));
    }
}

#[test]
fn test_locked_assignment_untouched() {
    init_tracing();
    let locked = Assignment::new("seminar", 0, at(1, 16, 9), at(1, 16, 11))
        .with_resource(ResourceType::Classroom, "R1");
    let problem = Problem::new()
        .with_request(
            SessionRequest::new("seminar", 120, 1, at(1, 16, 0), at(1, 17, 0))
                .with_enrollment(15)
                .with_resource_type(ResourceType::Classroom, 1),
        )
        .with_request(
            SessionRequest::new("lab", 120, 1, at(1, 16, 0), at(1, 17, 0))
                .with_enrollment(15)
                .with_resource_type(ResourceType::Classroom, 1),
        )
        .with_resource(Resource::new("R1", ResourceType::Classroom).with_capacity(20))
        .with_locked(locked.clone());

    for result in run_all(&problem, 3) {
        let kept = result
            .assignments
            .iter()
            .find(|a| a.same_occurrence(&locked))
            .unwrap_or_else(|| panic!("{} dropped the locked assignment", result.backend_used));
        assert_eq!(kept, &locked, "{}", result.backend_used);

        if let Some(lab) = result.assignments.iter().find(|a| a.request_id == "lab") {
            assert!(!lab.window().overlaps(&locked.window()), "{}", result.backend_used);
        } else {
            assert!(result.unscheduled_requests.contains(&"lab".to_string()));
        }
        assert_no_double_booking(&problem, &result);
    }
}

#[test]
fn test_hard_properties_every_backend() {
    init_tracing();
    let problem = busy_problem();
    for result in run_all(&problem, 11) {
        assert_ne!(result.status, SolveStatus::Infeasible, "{}", result.backend_used);
        assert_no_double_booking(&problem, &result);
        assert_in_date_window(&problem, &result);
        assert_capacity(&problem, &result);
        // physics (50) only fits R2
        for a in result.assignments_for_request("physics") {
            assert!(a.uses_resource("R2"), "{}", result.backend_used);
        }
    }
}

#[test]
fn test_heuristic_resolve_is_idempotent() {
    let problem = busy_problem();
    let first = solve(&problem, "heuristic", Some(99), false).unwrap();
    let second = solve(&problem, "heuristic", Some(99), false).unwrap();
    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.status, second.status);
}

#[test]
fn test_unknown_backend_rejected() {
    let err = solve(&cs101_problem(), "simulated_annealing", Some(1), false).unwrap_err();
    assert!(err.to_string().contains("Unknown backend"));
}

#[test]
fn test_invalid_problem_rejected() {
    // ends before it starts
    let problem = Problem::new()
        .with_request(SessionRequest::new("broken", 60, 1, at(2, 1, 0), at(1, 1, 0)))
        .with_resource(Resource::new("R1", ResourceType::Classroom));
    assert!(solve(&problem, "heuristic", Some(1), false).is_err());
}

#[test]
fn test_result_serializes_to_json() {
    let result = solve(&cs101_problem(), "heuristic", Some(42), false).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "feasible");
    assert_eq!(json["backend_used"], "heuristic");
    assert_eq!(json["seed_used"], 42);
    assert_eq!(json["assignments"].as_array().unwrap().len(), 24);

    let back: SolveResult = serde_json::from_value(json).unwrap();
    assert_eq!(back.assignments, result.assignments);

    let records = result.to_records();
    assert_eq!(records.len(), 24);
    let record = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(record["request_id"], "cs101");
    assert_eq!(record["resources"]["classroom"][0], "R101");
}
