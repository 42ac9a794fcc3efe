//! Messages exchanged between a host and scenario workers.
//!
//! Field names are camelCase on the wire. One `ScenarioInput` goes in per
//! scenario per batch; any number of progress messages and exactly one
//! result message come back.

use crate::{
    policy::PolicyTable,
    result::ScenarioResult,
    sampler::DayWeights,
    types::{ScenarioName, ATTENDANCE_BUCKETS, DAYS_IN_WORK_WEEK},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInput {
    pub scenario_name: ScenarioName,
    pub total_employees: usize,
    /// round(total_employees * desk_ratio)
    pub available_seats: usize,
    /// One raw preference per employee; length must equal `total_employees`.
    pub employee_preferences: Vec<f64>,
    pub num_weeks: u64,
    #[serde(default)]
    pub day_weights: DayWeights,
    pub policy_rules: PolicyTable,
    #[serde(default)]
    pub baseline_absence_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutput {
    pub scenario_name: ScenarioName,
    pub overall_average_shortage: Option<f64>,
    pub daily_average_shortage: Option<[f64; DAYS_IN_WORK_WEEK]>,
    pub attendance_distribution_pct: Option<[f64; ATTENDANCE_BUCKETS]>,
    pub average_preference_deviation: Option<f64>,
    /// Non-null signals a caught fault; every result field is null then.
    pub error: Option<String>,
}

impl ScenarioOutput {
    pub fn success(scenario_name: ScenarioName, result: &ScenarioResult) -> Self {
        Self {
            scenario_name,
            overall_average_shortage: Some(result.overall_average_shortage),
            daily_average_shortage: Some(result.daily_average_shortage),
            attendance_distribution_pct: Some(result.attendance_distribution_pct),
            average_preference_deviation: Some(result.average_preference_deviation),
            error: None,
        }
    }

    pub fn failure(scenario_name: ScenarioName, error: impl Into<String>) -> Self {
        Self {
            scenario_name,
            overall_average_shortage: None,
            daily_average_shortage: None,
            attendance_distribution_pct: None,
            average_preference_deviation: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The result, if the job succeeded.
    pub fn result(&self) -> Option<ScenarioResult> {
        Some(ScenarioResult {
            overall_average_shortage: self.overall_average_shortage?,
            daily_average_shortage: self.daily_average_shortage?,
            attendance_distribution_pct: self.attendance_distribution_pct?,
            average_preference_deviation: self.average_preference_deviation?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub scenario_name: ScenarioName,
    /// 0..=100
    pub progress_percent: u8,
}

/// Everything a worker sends back to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Progress(ProgressUpdate),
    Result(ScenarioOutput),
}
