use office_sim_core::{
    config::SimulationConfig,
    control::{CancellationToken, NoProgress, RunControl},
    history::WeeklyRecord,
    host::{BatchKind, ScenarioHost},
    store::ResultStore,
};

fn store() -> ResultStore {
    let store = ResultStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn saved_study_reads_back_unchanged() {
    let config = SimulationConfig { simulated_weeks: 40, ..SimulationConfig::default_test() };
    let token = CancellationToken::new();
    let host = ScenarioHost::for_config(&config).expect("host");

    let mut records: Vec<WeeklyRecord> = (1..=8)
        .map(|i| WeeklyRecord::new(format!("2024-W{i:02}"), [10, 10, 20, 30, 20, 10]))
        .collect();
    records.push(WeeklyRecord::new("2024-W52", [4, 1, 0, 0, 0, 0]));

    let report = host
        .run_study(&config, Some(records.as_slice()), RunControl::new(&token, &NoProgress))
        .expect("study");

    let mut store = store();
    store.save_study(&report, &config, "0.1.0-test").expect("save");

    assert_eq!(store.run_seed(&report.run_id).expect("seed"), Some(42));
    assert_eq!(
        store.scenario_outputs(&report.run_id, BatchKind::Modeled).expect("modeled"),
        report.modeled.outputs
    );
    let empirical = report.empirical.as_ref().expect("empirical batch");
    assert_eq!(
        store.scenario_outputs(&report.run_id, BatchKind::Empirical).expect("empirical"),
        empirical.outputs
    );

    let excluded = store.excluded_weeks(&report.run_id).expect("excluded");
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].week_id, "2024-W52");
}

#[test]
fn error_outputs_are_stored_with_null_results() {
    let store = store();
    let config = SimulationConfig::default_test();
    store.insert_run("run-err", 1, "0.1.0-test", &config).expect("run");

    let output = office_sim_core::message::ScenarioOutput::failure("6) Exactly 3 days/week".into(), "boom");
    store.insert_scenario_output("run-err", BatchKind::Modeled, &output).expect("insert");

    let back = store.scenario_outputs("run-err", BatchKind::Modeled).expect("read");
    assert_eq!(back, vec![output]);
}

#[test]
fn unknown_run_has_no_seed() {
    assert_eq!(store().run_seed("missing").expect("query"), None);
}
