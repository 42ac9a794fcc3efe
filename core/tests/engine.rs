//! Scenario engine properties over whole runs.

use office_sim_core::{
    control::{CancellationToken, NoProgress, ProgressSink, RunControl},
    engine::{run_scenario, ScenarioEngine},
    error::SimError,
    message::{ProgressUpdate, ScenarioInput},
    policy::{PolicyRule, PolicyTable},
    rng::SimRng,
    sampler::DayWeights,
};
use std::sync::Mutex;

const EXACTLY_3: &str = "Exactly 3";

fn input(employees: usize, seats: usize, preference: f64, weeks: u64) -> ScenarioInput {
    ScenarioInput {
        scenario_name: EXACTLY_3.into(),
        total_employees: employees,
        available_seats: seats,
        employee_preferences: vec![preference; employees],
        num_weeks: weeks,
        day_weights: DayWeights::uniform(),
        policy_rules: PolicyTable::new()
            .with_rule(EXACTLY_3, PolicyRule::Exactly(3))
            .with_rule("No rules", PolicyRule::Unrestricted),
        baseline_absence_rate: 0.0,
    }
}

fn run(input: &ScenarioInput, seed: u64) -> Result<office_sim_core::result::ScenarioResult, SimError> {
    let token = CancellationToken::new();
    let mut rng = SimRng::new(seed);
    run_scenario(input, &mut rng, RunControl::new(&token, &NoProgress))
}

#[test]
fn ten_people_five_seats_exactly_three_runs_short_every_day() {
    let result = run(&input(10, 5, 5.0, 1_000), 1).expect("run");

    // Daily attendance is Binomial(10, 0.6): expected overflow ~1.23 seats.
    assert!(
        (0.9..1.5).contains(&result.overall_average_shortage),
        "overall shortage {} should sit near one seat",
        result.overall_average_shortage
    );
    assert_eq!(result.attendance_distribution_pct, [0.0, 0.0, 0.0, 100.0, 0.0, 0.0]);
    assert_eq!(result.average_preference_deviation, 2.0);
}

#[test]
fn shortage_is_never_negative_and_distribution_sums_to_100() {
    let mut input = input(40, 10, 2.7, 300);
    input.scenario_name = "No rules".into();
    input.day_weights = DayWeights::new([3.0, 1.0, 0.5, 2.0, 0.0]);
    input.employee_preferences = (0..40).map(|i| (i % 6) as f64 * 0.9).collect();

    let result = run(&input, 77).expect("run");
    assert!(result.daily_average_shortage.iter().all(|&s| s >= 0.0));
    assert!(
        (result.distribution_total() - 100.0).abs() <= 0.5,
        "distribution sums to {}",
        result.distribution_total()
    );
    // Friday only fills once a five-day employee exhausts the weighted days,
    // and there are fewer of them than seats.
    assert_eq!(result.daily_average_shortage[4], 0.0);
}

#[test]
fn zero_employees_or_zero_weeks_give_an_all_zero_result() {
    let none = run(&input(0, 5, 3.0, 100), 3).expect("zero employees");
    assert_eq!(none, office_sim_core::result::ScenarioResult::zero());

    let no_weeks = run(&input(10, 5, 3.0, 0), 3).expect("zero weeks");
    assert_eq!(no_weeks, office_sim_core::result::ScenarioResult::zero());
}

#[test]
fn baseline_absentees_land_in_bucket_zero() {
    let mut input = input(50, 50, 3.0, 200);
    input.baseline_absence_rate = 0.2;

    let result = run(&input, 5).expect("run");
    assert_eq!(result.attendance_distribution_pct[0], 20.0);
    assert_eq!(result.attendance_distribution_pct[3], 80.0);
    assert_eq!(result.overall_average_shortage, 0.0);
}

#[test]
fn preference_count_must_match_headcount() {
    let mut input = input(10, 5, 3.0, 10);
    input.employee_preferences.pop();

    assert!(matches!(
        run(&input, 9),
        Err(SimError::PreferenceCountMismatch { expected: 10, actual: 9 })
    ));
}

#[test]
fn cancelled_run_publishes_nothing() {
    let input = input(10, 5, 3.0, 500);
    let token = CancellationToken::new();
    token.cancel();
    let mut rng = SimRng::new(4);

    let outcome = run_scenario(&input, &mut rng, RunControl::new(&token, &NoProgress));
    assert!(matches!(outcome, Err(SimError::Cancelled { completed_weeks: 0, total_weeks: 500 })));
}

#[test]
fn same_seed_same_result() {
    let input = input(30, 12, 3.4, 250);
    let a = run(&input, 0xDEAD_BEEF).expect("a");
    let b = run(&input, 0xDEAD_BEEF).expect("b");
    assert_eq!(a, b);
}

#[derive(Default)]
struct Recorder(Mutex<Vec<u8>>);

impl ProgressSink for Recorder {
    fn report(&self, update: ProgressUpdate) {
        self.0.lock().unwrap().push(update.progress_percent);
    }
}

#[test]
fn progress_is_reported_about_every_percent_and_ends_at_100() {
    let input = input(5, 5, 3.0, 1_000);
    let token = CancellationToken::new();
    let recorder = Recorder::default();
    let mut rng = SimRng::new(8);

    run_scenario(&input, &mut rng, RunControl::new(&token, &recorder)).expect("run");

    let seen = recorder.0.lock().unwrap();
    assert_eq!(seen.len(), 100);
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn simulate_week_respects_targets() {
    let input = input(8, 8, 1.0, 1);
    let mut engine = ScenarioEngine::new(&input).expect("engine");
    assert!(engine.targets().iter().all(|&t| t == 3));

    let mut rng = SimRng::new(21);
    let week = engine.simulate_week(&mut rng);
    assert_eq!(week.baseline_absent, 0);
    assert_eq!(week.attendees.iter().sum::<usize>(), 8 * 3);
    assert_eq!(week.shortage, [0; 5]);
    assert_eq!(engine.weeks_completed(), 1);
}
