//! Host behavior: isolation, determinism, and study sequencing.

use office_sim_core::{
    config::SimulationConfig,
    control::{CancellationToken, NoProgress, RunControl},
    history::WeeklyRecord,
    host::{BatchKind, ScenarioHost},
    message::HostMessage,
    rng::RngBank,
};
use std::sync::mpsc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn history() -> Vec<WeeklyRecord> {
    (1..=6)
        .map(|i| WeeklyRecord::new(format!("2024-W{i:02}"), [5, 5, 10, 15, 10, 5]))
        .collect()
}

#[test]
fn same_seed_produces_identical_batches() {
    init_logging();
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");

    let a = host.run_study(&config, None, RunControl::new(&token, &NoProgress)).expect("a");
    let b = host.run_study(&config, None, RunControl::new(&token, &NoProgress)).expect("b");

    assert_eq!(a.seed, 42);
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.modeled.outputs, b.modeled.outputs);
}

#[test]
fn worker_count_does_not_change_results() {
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();

    let one = ScenarioHost::new(1).expect("one worker");
    let many = ScenarioHost::new(6).expect("six workers");

    let a = one.run_study(&config, None, RunControl::new(&token, &NoProgress)).expect("a");
    let b = many.run_study(&config, None, RunControl::new(&token, &NoProgress)).expect("b");
    assert_eq!(a.modeled.outputs, b.modeled.outputs);
}

#[test]
fn outputs_follow_input_order() {
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");

    let report = host.run_study(&config, None, RunControl::new(&token, &NoProgress)).expect("study");
    let names: Vec<&str> = report.modeled.outputs.iter().map(|o| o.scenario_name.as_str()).collect();
    let expected: Vec<&str> = config.policies.scenario_names().map(String::as_str).collect();
    assert_eq!(names, expected);
    assert_eq!(report.modeled.failed().count(), 0);
}

#[test]
fn one_failing_scenario_does_not_affect_its_siblings() {
    init_logging();
    let config = SimulationConfig::default_test();
    let mut inputs = config.scenario_inputs(&vec![3.0; config.employees]);
    inputs[2].employee_preferences.truncate(3);
    let broken = inputs[2].scenario_name.clone();

    let token = CancellationToken::new();
    let host = ScenarioHost::new(2).expect("host");
    let report = host.run_batch(BatchKind::Modeled, &inputs, &RngBank::new(7), RunControl::new(&token, &NoProgress));

    assert_eq!(report.outputs.len(), 6);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.succeeded().count(), 5);

    let failed = report.output(&broken).expect("broken output");
    assert!(failed.error.as_deref().unwrap_or_default().contains("preferences"));
    assert!(failed.overall_average_shortage.is_none());
}

#[test]
fn study_with_history_runs_an_empirical_batch() {
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");

    let records = history();
    let report = host
        .run_study(&config, Some(records.as_slice()), RunControl::new(&token, &NoProgress))
        .expect("study");

    let estimate = report.estimate.as_ref().expect("estimate attempted").as_ref().expect("usable");
    assert_eq!(estimate.included_weeks, 6);

    let empirical = report.empirical.as_ref().expect("empirical batch");
    assert_eq!(empirical.kind, BatchKind::Empirical);
    assert_eq!(empirical.outputs.len(), config.policies.len());
    assert_eq!(empirical.failed().count(), 0);
}

#[test]
fn unusable_history_skips_only_the_empirical_batch() {
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");

    let report = host
        .run_study(&config, Some(&[][..]), RunControl::new(&token, &NoProgress))
        .expect("study");

    assert!(matches!(report.estimate, Some(Err(_))));
    assert!(report.empirical.is_none());
    assert_eq!(report.modeled.succeeded().count(), config.policies.len());
}

#[test]
fn cancelled_study_reports_every_scenario_as_failed() {
    let config = SimulationConfig::default_test();
    let token = CancellationToken::new();
    token.cancel();
    let host = ScenarioHost::for_config(&config).expect("host");

    let records = history();
    let report = host
        .run_study(&config, Some(records.as_slice()), RunControl::new(&token, &NoProgress))
        .expect("study");

    assert_eq!(report.modeled.failed().count(), config.policies.len());
    assert!(report.empirical.is_none());
}

#[test]
fn progress_messages_reach_the_channel() {
    let config = SimulationConfig { simulated_weeks: 50, ..SimulationConfig::default_test() };
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");
    let (tx, rx) = mpsc::channel::<HostMessage>();

    host.run_study(&config, None, RunControl::new(&token, &tx)).expect("study");
    drop(tx);

    let finished: usize = rx
        .iter()
        .filter(|m| matches!(m, HostMessage::Progress(p) if p.progress_percent == 100))
        .count();
    assert_eq!(finished, config.policies.len());
}

#[test]
fn invalid_config_is_rejected_before_any_work() {
    let config = SimulationConfig { baseline_absence_rate: 1.5, ..SimulationConfig::default_test() };
    let token = CancellationToken::new();
    let host = ScenarioHost::new(1).expect("host");
    assert!(host.run_study(&config, None, RunControl::new(&token, &NoProgress)).is_err());
}
