//! sim-runner: headless runner for the office seat simulator.
//!
//! Usage:
//!   sim-runner --config study.json --history weeks.json --seed 12345 --db results.db
//!   sim-runner --weeks 2000 --workers 4
//!   sim-runner --ipc-mode

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use office_sim_core::{
    config::SimulationConfig,
    control::{CancellationToken, RunControl},
    history::{group_attendance_rows, AttendanceRow, WeeklyRecord},
    host::{BatchKind, BatchReport, ScenarioHost, StudyReport},
    message::{HostMessage, ScenarioInput, ScenarioOutput},
    rng::RngBank,
    store::ResultStore,
    types::WEEKDAY_NAMES,
};
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Run(ScenarioInput),
    Quit,
}

/// History file: either weekly records or raw attendance rows.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Weeks(Vec<WeeklyRecord>),
    Rows(Vec<AttendanceRow>),
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let seed: Option<u64> = string_arg(&args, "--seed").and_then(|s| s.parse().ok());
    let config_path = string_arg(&args, "--config");
    let history_path = string_arg(&args, "--history");
    let db = string_arg(&args, "--db");

    if ipc_mode {
        return run_ipc_loop(seed);
    }

    let mut config = match config_path {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    config.simulated_weeks = parse_arg(&args, "--weeks", config.simulated_weeks);
    if has_flag(&args, "--workers") {
        config.workers = Some(parse_arg(&args, "--workers", 1usize));
    }
    config.validate()?;

    let history = match history_path {
        Some(path) => Some(load_history(path)?),
        None => None,
    };

    println!("Office Seat Simulator: sim-runner");
    println!("  started:    {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("  employees:  {}", config.employees);
    println!("  seats:      {} (desk ratio {:.2})", config.available_seats(), config.desk_ratio);
    println!("  weeks:      {}", config.simulated_weeks);
    println!("  absence:    {:.1}%", config.baseline_absence_rate * 100.0);
    println!("  scenarios:  {}", config.policies.len());
    if let Some(records) = &history {
        println!("  history:    {} weeks", records.len());
    }
    println!();

    let host = ScenarioHost::for_config(&config)?;
    let cancellation = CancellationToken::new();
    let report = run_with_progress(&host, &config, history.as_deref(), &cancellation)?;

    print_summary(&report);

    if let Some(path) = db {
        let mut store = ResultStore::open(path)?;
        store.migrate()?;
        store.save_study(&report, &config, env!("CARGO_PKG_VERSION"))?;
        println!();
        println!("Saved run {} to {path}", report.run_id);
    }

    Ok(())
}

/// Run the study while a side thread drives one progress bar per scenario.
fn run_with_progress(
    host: &ScenarioHost,
    config: &SimulationConfig,
    history: Option<&[WeeklyRecord]>,
    cancellation: &CancellationToken,
) -> Result<StudyReport> {
    let (tx, rx) = mpsc::channel::<HostMessage>();

    let multi = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{prefix:40} [{bar:30.cyan/blue}] {pos:>3}%")?
        .progress_chars("#>-");
    let names: Vec<String> = config.policies.scenario_names().cloned().collect();

    let drawer = thread::spawn(move || {
        let mut bars: HashMap<String, ProgressBar> = HashMap::new();
        for message in rx {
            if let HostMessage::Progress(update) = message {
                let bar = bars.entry(update.scenario_name.clone()).or_insert_with(|| {
                    let bar = multi.add(ProgressBar::new(100));
                    bar.set_style(style.clone());
                    bar.set_prefix(update.scenario_name.clone());
                    bar
                });
                // A new batch restarts every scenario at a low percentage.
                if u64::from(update.progress_percent) < bar.position() {
                    bar.reset();
                }
                bar.set_position(u64::from(update.progress_percent));
            }
        }
        for bar in bars.values() {
            bar.finish_and_clear();
        }
    });

    log::debug!("running scenarios: {}", names.join(", "));
    let report = host.run_study(config, history, RunControl::new(cancellation, &tx));
    drop(tx);
    let _ = drawer.join();
    Ok(report?)
}

fn load_history(path: &str) -> Result<Vec<WeeklyRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let file: HistoryFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    Ok(match file {
        HistoryFile::Weeks(records) => records,
        HistoryFile::Rows(rows) => group_attendance_rows(&rows),
    })
}

/// JSON-lines worker protocol: one `run` command per line in, progress
/// and result messages out.
fn run_ipc_loop(seed: Option<u64>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    let bank = seed.map(RngBank::new).unwrap_or_else(RngBank::from_entropy);
    let host = ScenarioHost::new(1)?;
    let cancellation = CancellationToken::new();
    let mut job_index: u64 = 0;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Run(input) => {
                let (tx, rx) = mpsc::channel::<HostMessage>();
                let job_bank = RngBank::new(bank.master_seed().wrapping_add(job_index));
                job_index += 1;

                let report = host.run_batch(
                    BatchKind::Modeled,
                    std::slice::from_ref(&input),
                    &job_bank,
                    RunControl::new(&cancellation, &tx),
                );
                drop(tx);

                for message in rx.try_iter() {
                    writeln!(stdout, "{}", serde_json::to_string(&message)?)?;
                }
                for output in report.outputs {
                    writeln!(stdout, "{}", serde_json::to_string(&HostMessage::Result(output))?)?;
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(report: &StudyReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:  {}", report.run_id);
    println!("  seed:    {}", report.seed);

    print_batch(&report.modeled);

    match &report.estimate {
        Some(Ok(est)) => {
            let suggested = est.suggested_parameters();
            println!();
            println!("=== HISTORY ESTIMATE ===");
            println!("  weeks kept:       {}", est.included_weeks);
            println!("  employees:        {}", suggested.employees);
            println!("  mean preference:  {:.1}", suggested.mean_preference);
            println!("  std dev:          {:.1}", suggested.std_dev_preference);
            println!("  observed distribution: {}", format_distribution(&est.raw_attendance_distribution_pct));
            for week in &est.excluded_weeks {
                println!("  excluded: {week}");
            }
        }
        Some(Err(e)) => {
            println!();
            println!("=== HISTORY ESTIMATE ===");
            println!("  unusable: {e}");
            for week in e.excluded_weeks() {
                println!("  excluded: {week}");
            }
        }
        None => {}
    }

    if let Some(empirical) = &report.empirical {
        print_batch(empirical);
    }
}

fn print_batch(batch: &BatchReport) {
    println!();
    println!("=== {} PREFERENCES ({} ms) ===", batch.kind.name().to_uppercase(), batch.elapsed_ms);
    println!(
        "  {:<40} {:>8} {:>6}  {:<34}  distribution 0..5 days (%)",
        "scenario",
        "shortage",
        "dev",
        WEEKDAY_NAMES.join("    ")
    );
    for output in &batch.outputs {
        print_output(output);
    }
}

fn print_output(output: &ScenarioOutput) {
    match output.result() {
        Some(result) => {
            let daily: Vec<String> = result.daily_average_shortage.iter().map(|d| format!("{d:>6.2}")).collect();
            println!(
                "  {:<40} {:>8.2} {:>6.2}  {:<34}  {}",
                output.scenario_name,
                result.overall_average_shortage,
                result.average_preference_deviation,
                daily.join(" "),
                format_distribution(&result.attendance_distribution_pct)
            );
        }
        None => println!(
            "  {:<40} ERROR: {}",
            output.scenario_name,
            output.error.as_deref().unwrap_or("unknown failure")
        ),
    }
}

fn format_distribution(pct: &[f64]) -> String {
    pct.iter().map(|p| format!("{p:.1}")).collect::<Vec<_>>().join(" / ")
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
