//! Parameter estimation from historical attendance.
//!
//! Input is one record per week: how many people attended 0..=5 days.
//! Weeks with anomalously low total attendance (holidays) or anomalously
//! many zero-day people (extreme events) are dropped using IQR fences,
//! then the remaining weeks become an empirical preference sample.
//!
//! Exclusions are diagnostics, not errors: they are always returned so
//! callers can show which weeks were dropped and why.

use crate::types::{round1, ATTENDANCE_BUCKETS, DAYS_IN_WORK_WEEK};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Fewer weeks than this and outlier filtering is skipped.
pub const MIN_WEEKS_FOR_OUTLIER_DETECTION: usize = 3;

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRecord {
    pub week_id: String,
    /// People attending 0, 1, .., 5 days that week.
    pub attendance_distribution: [u64; ATTENDANCE_BUCKETS],
}

impl WeeklyRecord {
    pub fn new(week_id: impl Into<String>, attendance_distribution: [u64; ATTENDANCE_BUCKETS]) -> Self {
        Self {
            week_id: week_id.into(),
            attendance_distribution,
        }
    }

    pub fn total_people(&self) -> u64 {
        self.attendance_distribution.iter().sum()
    }

    pub fn zero_attendance(&self) -> u64 {
        self.attendance_distribution[0]
    }
}

/// One already-parsed row of an attendance export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub week_id: String,
    pub days_attended: i64,
    pub people_count: u64,
}

/// Fold rows into weekly records, in order of first appearance.
/// Rows with a day count outside 0..=5 are skipped.
pub fn group_attendance_rows(rows: &[AttendanceRow]) -> Vec<WeeklyRecord> {
    let mut records: Vec<WeeklyRecord> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let Ok(days) = usize::try_from(row.days_attended) else {
            log::warn!("skipping row for week '{}': days_attended={}", row.week_id, row.days_attended);
            continue;
        };
        if days > DAYS_IN_WORK_WEEK {
            log::warn!("skipping row for week '{}': days_attended={days}", row.week_id);
            continue;
        }

        let slot = *index.entry(row.week_id.as_str()).or_insert_with(|| {
            records.push(WeeklyRecord::new(row.week_id.clone(), [0; ATTENDANCE_BUCKETS]));
            records.len() - 1
        });
        records[slot].attendance_distribution[days] += row.people_count;
    }

    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    LowTotalAttendance,
    HighZeroAttendance,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowTotalAttendance => write!(f, "Low total attendance"),
            Self::HighZeroAttendance => write!(f, "High zero attendance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedWeek {
    pub week_id: String,
    pub total_people: u64,
    pub zero_attendance: u64,
    pub reasons: Vec<ExclusionReason>,
}

impl fmt::Display for ExcludedWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<String> = self.reasons.iter().map(ToString::to_string).collect();
        write!(f, "{} (Reason: {})", self.week_id, reasons.join("; "))
    }
}

/// IQR fences; `None` when there were too few weeks to compute them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierBounds {
    pub lower_total_attendance: Option<f64>,
    pub upper_zero_attendance: Option<f64>,
}

impl OutlierBounds {
    pub fn from_records(records: &[WeeklyRecord]) -> Self {
        if records.len() < MIN_WEEKS_FOR_OUTLIER_DETECTION {
            log::warn!(
                "only {} weeks of history: skipping outlier detection",
                records.len()
            );
            return Self::default();
        }

        let totals: Vec<u64> = records.iter().map(WeeklyRecord::total_people).collect();
        let zeros: Vec<u64> = records.iter().map(WeeklyRecord::zero_attendance).collect();

        let (q1_total, q3_total) = quartiles(&totals);
        let (q1_zero, q3_zero) = quartiles(&zeros);

        Self {
            lower_total_attendance: Some(q1_total - IQR_MULTIPLIER * (q3_total - q1_total)),
            upper_zero_attendance: Some(q3_zero + IQR_MULTIPLIER * (q3_zero - q1_zero)),
        }
    }

    /// Why `record` falls outside the fences; empty when it is kept.
    pub fn violations(&self, record: &WeeklyRecord) -> Vec<ExclusionReason> {
        let mut reasons = Vec::new();
        if let Some(lower) = self.lower_total_attendance {
            if (record.total_people() as f64) < lower {
                reasons.push(ExclusionReason::LowTotalAttendance);
            }
        }
        if let Some(upper) = self.upper_zero_attendance {
            if record.zero_attendance() as f64 > upper {
                reasons.push(ExclusionReason::HighZeroAttendance);
            }
        }
        reasons
    }
}

/// Nearest-rank quartiles: `sorted[n/4]` and `sorted[3n/4]`.
fn quartiles(values: &[u64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    (sorted[n / 4] as f64, sorted[n * 3 / 4] as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEstimate {
    /// Average weekly headcount over the included weeks.
    pub employee_count: usize,
    pub mean_preference: f64,
    pub std_dev_preference: f64,
    /// Day counts of people making an active choice (baseline absentees removed).
    pub active_preference_sample: Vec<f64>,
    /// Unadjusted attendance distribution over included weeks, in percent.
    pub raw_attendance_distribution_pct: [f64; ATTENDANCE_BUCKETS],
    pub included_weeks: usize,
    pub excluded_weeks: Vec<ExcludedWeek>,
    pub bounds: OutlierBounds,
}

/// Inputs a host should apply to its modeled batch after an import.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedParameters {
    pub employees: usize,
    pub mean_preference: f64,
    pub std_dev_preference: f64,
}

impl HistoricalEstimate {
    /// Estimated parameters, rounded to one decimal with sane fallbacks
    /// (100 employees, mean 3.0, stdDev 0.8) for degenerate estimates.
    pub fn suggested_parameters(&self) -> SuggestedParameters {
        let employees = if self.employee_count > 0 { self.employee_count } else { 100 };
        let mean = self.mean_preference;
        let mean_preference = if mean.is_finite() && (0.0..=DAYS_IN_WORK_WEEK as f64).contains(&mean) {
            round1(mean)
        } else {
            3.0
        };
        let std_dev = self.std_dev_preference;
        let std_dev_preference = if std_dev.is_finite() && std_dev > 0.0 { round1(std_dev) } else { 0.8 };

        SuggestedParameters {
            employees,
            mean_preference,
            std_dev_preference,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("No weekly records supplied")]
    NoWeeks,

    #[error("No valid (non-outlier) weekly data: all {} weeks were excluded", excluded.len())]
    AllWeeksExcluded { excluded: Vec<ExcludedWeek> },

    #[error("Active preference sample is empty after removing baseline absence")]
    EmptyActiveSample { excluded: Vec<ExcludedWeek> },
}

impl HistoryError {
    /// Weeks dropped before the estimate failed, for diagnostics.
    pub fn excluded_weeks(&self) -> &[ExcludedWeek] {
        match self {
            Self::NoWeeks => &[],
            Self::AllWeeksExcluded { excluded } | Self::EmptyActiveSample { excluded } => excluded,
        }
    }
}

/// Estimate preference parameters from weekly records.
///
/// In each included week, `round(week_total * baseline_absence_rate)` of the
/// zero-day people are treated as baseline absent and left out of the active
/// sample; the rest chose zero days. Buckets 1..=5 are active in full.
pub fn estimate_parameters(
    records: &[WeeklyRecord],
    baseline_absence_rate: f64,
) -> Result<HistoricalEstimate, HistoryError> {
    if records.is_empty() {
        return Err(HistoryError::NoWeeks);
    }
    let rate = if baseline_absence_rate.is_nan() { 0.0 } else { baseline_absence_rate.clamp(0.0, 1.0) };

    let bounds = OutlierBounds::from_records(records);

    let mut excluded_weeks = Vec::new();
    let mut included: Vec<&WeeklyRecord> = Vec::new();
    for record in records {
        let reasons = bounds.violations(record);
        if reasons.is_empty() {
            included.push(record);
        } else {
            let week = ExcludedWeek {
                week_id: record.week_id.clone(),
                total_people: record.total_people(),
                zero_attendance: record.zero_attendance(),
                reasons,
            };
            log::info!(
                "excluding outlier week {week} (total people: {}, zero attendance: {})",
                week.total_people,
                week.zero_attendance
            );
            excluded_weeks.push(week);
        }
    }

    if included.is_empty() {
        return Err(HistoryError::AllWeeksExcluded { excluded: excluded_weeks });
    }

    let mut total_people_sum: u64 = 0;
    let mut bucket_sums = [0u64; ATTENDANCE_BUCKETS];
    let mut active_preference_sample = Vec::new();

    for record in &included {
        let week_total = record.total_people();
        total_people_sum += week_total;
        for (sum, &count) in bucket_sums.iter_mut().zip(record.attendance_distribution.iter()) {
            *sum += count;
        }

        let baseline_absent = (week_total as f64 * rate).round() as u64;
        let chose_zero = record.zero_attendance().saturating_sub(baseline_absent);
        push_repeated(&mut active_preference_sample, 0.0, chose_zero);
        for days in 1..ATTENDANCE_BUCKETS {
            push_repeated(&mut active_preference_sample, days as f64, record.attendance_distribution[days]);
        }
    }

    if active_preference_sample.is_empty() {
        return Err(HistoryError::EmptyActiveSample { excluded: excluded_weeks });
    }

    let (mean_preference, std_dev_preference) = population_moments(&active_preference_sample);

    let raw_attendance_distribution_pct = if total_people_sum > 0 {
        bucket_sums.map(|sum| sum as f64 / total_people_sum as f64 * 100.0)
    } else {
        [0.0; ATTENDANCE_BUCKETS]
    };

    let employee_count = (total_people_sum as f64 / included.len() as f64).round() as usize;

    log::info!(
        "history: {} weeks kept, {} excluded; employees={employee_count} mean={mean_preference:.2} sd={std_dev_preference:.2}",
        included.len(),
        excluded_weeks.len()
    );

    Ok(HistoricalEstimate {
        employee_count,
        mean_preference,
        std_dev_preference,
        active_preference_sample,
        raw_attendance_distribution_pct,
        included_weeks: included.len(),
        excluded_weeks,
        bounds,
    })
}

fn push_repeated(sample: &mut Vec<f64>, value: f64, times: u64) {
    sample.extend(std::iter::repeat(value).take(times as usize));
}

/// Population mean and standard deviation.
fn population_moments(sample: &[f64]) -> (f64, f64) {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
