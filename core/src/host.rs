//! Execution host: runs one scenario job per worker and gathers results.
//!
//! RULES:
//!   - One job per scenario; jobs share nothing but read-only inputs.
//!   - A job's failure (error or panic) becomes an error output for that
//!     scenario only. Siblings always complete.
//!   - Results are published whole, in input order, or not at all.
//!   - Batches run one after the other on the same fixed pool.

use crate::{
    config::SimulationConfig,
    control::RunControl,
    engine::run_scenario,
    error::{SimError, SimResult},
    history::{estimate_parameters, HistoricalEstimate, HistoryError, WeeklyRecord},
    message::{ScenarioInput, ScenarioOutput},
    population::{empirical_preferences, modeled_preferences},
    rng::RngBank,
    types::RunId,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Which preference source a batch was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u64)]
pub enum BatchKind {
    Modeled = 0,
    Empirical = 1,
}

impl BatchKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Modeled => "modeled",
            Self::Empirical => "empirical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub outputs: Vec<ScenarioOutput>,
    pub elapsed_ms: u128,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ScenarioOutput> {
        self.outputs.iter().filter(|o| !o.is_error())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScenarioOutput> {
        self.outputs.iter().filter(|o| o.is_error())
    }

    pub fn output(&self, scenario: &str) -> Option<&ScenarioOutput> {
        self.outputs.iter().find(|o| o.scenario_name == scenario)
    }
}

#[derive(Debug, Clone)]
pub struct StudyReport {
    pub run_id: RunId,
    pub seed: u64,
    pub modeled: BatchReport,
    /// Present only when history was supplied and estimation succeeded.
    pub empirical: Option<BatchReport>,
    /// Outcome of the historical estimate, when history was supplied.
    pub estimate: Option<Result<HistoricalEstimate, HistoryError>>,
}

/// A fixed-size worker pool, reused across batches.
pub struct ScenarioHost {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ScenarioHost {
    pub fn new(workers: usize) -> SimResult<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("scenario-worker-{i}"))
            .build()
            .map_err(|e| SimError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    /// Pool sized for `config`: its worker count, or one per scenario.
    pub fn for_config(config: &SimulationConfig) -> SimResult<Self> {
        Self::new(config.workers.unwrap_or(config.policies.len()))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every input as its own job and wait for all of them.
    pub fn run_batch(
        &self,
        kind: BatchKind,
        inputs: &[ScenarioInput],
        bank: &RngBank,
        control: RunControl<'_>,
    ) -> BatchReport {
        let started = Instant::now();
        let pending = AtomicUsize::new(inputs.len());
        log::info!("batch {}: dispatching {} scenarios", kind.name(), inputs.len());

        let outputs: Vec<ScenarioOutput> = self.pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| {
                    let output = run_job(kind, index, input, bank, control);
                    let remaining = pending.fetch_sub(1, Ordering::AcqRel) - 1;
                    if remaining == 0 {
                        log::info!("batch {}: all scenarios finished", kind.name());
                    }
                    output
                })
                .collect()
        });

        BatchReport {
            kind,
            outputs,
            elapsed_ms: started.elapsed().as_millis(),
        }
    }

    /// The full study: modeled batch, then the empirical batch when
    /// `history` yields a usable estimate. A failed estimate skips only
    /// the empirical batch.
    pub fn run_study(
        &self,
        config: &SimulationConfig,
        history: Option<&[WeeklyRecord]>,
        control: RunControl<'_>,
    ) -> SimResult<StudyReport> {
        config.validate()?;

        let bank = config.seed.map(RngBank::new).unwrap_or_else(RngBank::from_entropy);
        let run_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "study {run_id}: seed={} employees={} seats={} weeks={}",
            bank.master_seed(),
            config.employees,
            config.available_seats(),
            config.simulated_weeks
        );

        let mut population_rng = bank.for_population();
        let modeled_prefs = modeled_preferences(
            config.employees,
            config.mean_preference,
            config.std_dev_preference,
            &mut population_rng,
        );
        let modeled = self.run_batch(
            BatchKind::Modeled,
            &config.scenario_inputs(&modeled_prefs),
            &bank,
            control,
        );

        let estimate = history.map(|records| estimate_parameters(records, config.baseline_absence_rate));

        let empirical = match &estimate {
            Some(Ok(est)) if !control.cancellation.is_cancelled() => {
                let prefs = empirical_preferences(config.employees, &est.active_preference_sample, &mut population_rng)?;
                Some(self.run_batch(BatchKind::Empirical, &config.scenario_inputs(&prefs), &bank, control))
            }
            Some(Err(e)) => {
                log::warn!("study {run_id}: skipping empirical batch: {e}");
                None
            }
            _ => None,
        };

        Ok(StudyReport {
            run_id,
            seed: bank.master_seed(),
            modeled,
            empirical,
            estimate,
        })
    }
}

fn run_job(
    kind: BatchKind,
    index: usize,
    input: &ScenarioInput,
    bank: &RngBank,
    control: RunControl<'_>,
) -> ScenarioOutput {
    let job_index = ((kind as u64) << 32) | index as u64;
    let mut rng = bank.for_job(job_index, &input.scenario_name);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_scenario(input, &mut rng, control)));
    match outcome {
        Ok(Ok(result)) => ScenarioOutput::success(input.scenario_name.clone(), &result),
        Ok(Err(e)) => {
            log::error!("scenario '{}' failed: {e}", input.scenario_name);
            ScenarioOutput::failure(input.scenario_name.clone(), e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("scenario '{}' panicked: {message}", input.scenario_name);
            ScenarioOutput::failure(input.scenario_name.clone(), message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "scenario worker panicked".to_string()
    }
}
