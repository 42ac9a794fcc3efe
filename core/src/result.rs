//! Aggregated statistics for one scenario run.

use crate::types::{round2, ATTENDANCE_BUCKETS, DAYS_IN_WORK_WEEK};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Mean of `daily_average_shortage`.
    pub overall_average_shortage: f64,
    /// Average people without a seat, Mon..Fri.
    pub daily_average_shortage: [f64; DAYS_IN_WORK_WEEK],
    /// Share of the whole workforce attending 0..=5 days, in percent.
    pub attendance_distribution_pct: [f64; ATTENDANCE_BUCKETS],
    /// Mean |raw preference - target days| over active employee-weeks.
    pub average_preference_deviation: f64,
}

impl ScenarioResult {
    pub fn zero() -> Self {
        Self {
            overall_average_shortage: 0.0,
            daily_average_shortage: [0.0; DAYS_IN_WORK_WEEK],
            attendance_distribution_pct: [0.0; ATTENDANCE_BUCKETS],
            average_preference_deviation: 0.0,
        }
    }

    /// Every field rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            overall_average_shortage: round2(self.overall_average_shortage),
            daily_average_shortage: self.daily_average_shortage.map(round2),
            attendance_distribution_pct: self.attendance_distribution_pct.map(round2),
            average_preference_deviation: round2(self.average_preference_deviation),
        }
    }

    /// Weekday with the largest average shortage (first one on ties).
    pub fn peak_day(&self) -> usize {
        let mut peak = 0;
        for (day, &value) in self.daily_average_shortage.iter().enumerate() {
            if value > self.daily_average_shortage[peak] {
                peak = day;
            }
        }
        peak
    }

    pub fn distribution_total(&self) -> f64 {
        self.attendance_distribution_pct.iter().sum()
    }
}

impl Default for ScenarioResult {
    fn default() -> Self {
        Self::zero()
    }
}
