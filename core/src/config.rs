use crate::{
    error::{SimError, SimResult},
    message::ScenarioInput,
    policy::PolicyTable,
    sampler::DayWeights,
    types::DAYS_IN_WORK_WEEK,
};
use serde::{Deserialize, Serialize};

/// Parameters for one study: a modeled batch and, optionally, an
/// empirical batch driven by historical data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub employees: usize,
    /// Seats per employee; seats = round(employees * desk_ratio).
    pub desk_ratio: f64,
    pub mean_preference: f64,
    pub std_dev_preference: f64,
    /// Fraction of the workforce absent each week for non-policy reasons.
    pub baseline_absence_rate: f64,
    pub simulated_weeks: u64,
    pub day_weights: DayWeights,
    pub policies: PolicyTable,
    /// Master seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Worker threads. `None` uses one per scenario.
    pub workers: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            employees: 100,
            desk_ratio: 0.7,
            mean_preference: 3.0,
            std_dev_preference: 0.8,
            baseline_absence_rate: 0.0,
            simulated_weeks: 10_000,
            day_weights: DayWeights::uniform(),
            policies: PolicyTable::standard(),
            seed: None,
            workers: None,
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    /// In tests, use SimulationConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimulationConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Small, seeded configuration for fast tests.
    pub fn default_test() -> Self {
        Self {
            employees: 50,
            simulated_weeks: 200,
            seed: Some(42),
            workers: Some(2),
            ..Self::default()
        }
    }

    pub fn available_seats(&self) -> usize {
        (self.employees as f64 * self.desk_ratio).round() as usize
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.desk_ratio.is_finite() && self.desk_ratio >= 0.0) {
            return Err(invalid("desk_ratio", format!("must be >= 0, got {}", self.desk_ratio)));
        }
        if !(0.0..1.0).contains(&self.baseline_absence_rate) {
            return Err(invalid(
                "baseline_absence_rate",
                format!("must be in [0, 1), got {}", self.baseline_absence_rate),
            ));
        }
        if !(0.0..=DAYS_IN_WORK_WEEK as f64).contains(&self.mean_preference) {
            return Err(invalid(
                "mean_preference",
                format!("must be in [0, {DAYS_IN_WORK_WEEK}], got {}", self.mean_preference),
            ));
        }
        if !(self.std_dev_preference.is_finite() && self.std_dev_preference >= 0.0) {
            return Err(invalid(
                "std_dev_preference",
                format!("must be >= 0, got {}", self.std_dev_preference),
            ));
        }
        if self.day_weights.raw().iter().any(|w| !w.is_finite()) {
            return Err(invalid("day_weights", "weights must be finite".into()));
        }
        if self.policies.is_empty() {
            return Err(invalid("policies", "at least one scenario is required".into()));
        }
        if self.workers == Some(0) {
            return Err(invalid("workers", "must be at least 1".into()));
        }
        Ok(())
    }

    /// One input message per scenario, all sharing `preferences`.
    pub fn scenario_inputs(&self, preferences: &[f64]) -> Vec<ScenarioInput> {
        self.policies
            .scenario_names()
            .map(|name| ScenarioInput {
                scenario_name: name.clone(),
                total_employees: self.employees,
                available_seats: self.available_seats(),
                employee_preferences: preferences.to_vec(),
                num_weeks: self.simulated_weeks,
                day_weights: self.day_weights,
                policy_rules: self.policies.clone(),
                baseline_absence_rate: self.baseline_absence_rate,
            })
            .collect()
    }
}

fn invalid(name: &'static str, reason: String) -> SimError {
    SimError::InvalidParameter { name, reason }
}
