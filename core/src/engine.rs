//! The scenario simulation engine: the heart of the seat simulator.
//!
//! WEEK ORDER (fixed, never reordered):
//!   1. Draw this week's baseline absentees (shuffle of employee indices).
//!   2. Every present employee samples their attendance days.
//!   3. Fold per-day shortages and per-employee day counts into the sums.
//!
//! RULES:
//!   - Target days are resolved once per run; preferences never change mid-run.
//!   - Week state lives only inside `simulate_week`.
//!   - All randomness flows through the SimRng handed in by the host.
//!   - Cancellation is checked between weeks, never inside one.

use crate::{
    control::RunControl,
    error::{SimError, SimResult},
    message::{ProgressUpdate, ScenarioInput},
    policy::round_preference,
    result::ScenarioResult,
    rng::SimRng,
    sampler::select_attendance_days,
    types::{ATTENDANCE_BUCKETS, DAYS_IN_WORK_WEEK},
};

/// What one simulated week looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekSummary {
    pub baseline_absent: usize,
    pub attendees: [usize; DAYS_IN_WORK_WEEK],
    pub shortage: [usize; DAYS_IN_WORK_WEEK],
}

pub struct ScenarioEngine<'a> {
    input: &'a ScenarioInput,
    absence_rate: f64,
    /// Policy target per employee, resolved once.
    targets: Vec<u8>,
    /// |raw preference - target| per employee.
    deviations: Vec<f64>,
    weeks_completed: u64,
    daily_shortage_sums: [u64; DAYS_IN_WORK_WEEK],
    attendance_bucket_sums: [u64; ATTENDANCE_BUCKETS],
    total_deviation: f64,
    active_employee_weeks: u64,
    // Reused scratch buffers for the absence draw.
    order: Vec<usize>,
    absent: Vec<bool>,
}

impl<'a> ScenarioEngine<'a> {
    pub fn new(input: &'a ScenarioInput) -> SimResult<Self> {
        let n = input.total_employees;
        if input.employee_preferences.len() != n {
            return Err(SimError::PreferenceCountMismatch {
                expected: n,
                actual: input.employee_preferences.len(),
            });
        }

        let absence_rate = sanitize_rate(input.baseline_absence_rate);
        if absence_rate != input.baseline_absence_rate {
            log::warn!(
                "scenario '{}': baseline absence rate {} clamped to {absence_rate}",
                input.scenario_name,
                input.baseline_absence_rate
            );
        }

        let rule = input.policy_rules.rule_for(&input.scenario_name);
        let (targets, deviations): (Vec<u8>, Vec<f64>) = input
            .employee_preferences
            .iter()
            .map(|&pref| {
                let target = rule.apply(round_preference(pref));
                let deviation = if pref.is_finite() { (pref - target as f64).abs() } else { 0.0 };
                (target, deviation)
            })
            .unzip();

        Ok(Self {
            input,
            absence_rate,
            targets,
            deviations,
            weeks_completed: 0,
            daily_shortage_sums: [0; DAYS_IN_WORK_WEEK],
            attendance_bucket_sums: [0; ATTENDANCE_BUCKETS],
            total_deviation: 0.0,
            active_employee_weeks: 0,
            order: (0..n).collect(),
            absent: vec![false; n],
        })
    }

    pub fn weeks_completed(&self) -> u64 {
        self.weeks_completed
    }

    /// Resolved target days, one per employee.
    pub fn targets(&self) -> &[u8] {
        &self.targets
    }

    /// Simulate one week and fold it into the running sums.
    pub fn simulate_week(&mut self, rng: &mut SimRng) -> WeekSummary {
        let n = self.input.total_employees;
        let absent_count = ((n as f64 * self.absence_rate).round() as usize).min(n);

        self.absent.fill(false);
        if absent_count > 0 {
            rng.shuffle(&mut self.order);
            for &idx in &self.order[..absent_count] {
                self.absent[idx] = true;
            }
        }

        let mut attendees = [0usize; DAYS_IN_WORK_WEEK];
        for emp in 0..n {
            if self.absent[emp] {
                self.attendance_bucket_sums[0] += 1;
                continue;
            }

            self.total_deviation += self.deviations[emp];
            self.active_employee_weeks += 1;

            let days = select_attendance_days(self.targets[emp], &self.input.day_weights, rng);
            for day in days.iter() {
                attendees[day] += 1;
            }
            self.attendance_bucket_sums[days.len().min(DAYS_IN_WORK_WEEK)] += 1;
        }

        let seats = self.input.available_seats;
        let shortage = attendees.map(|count| count.saturating_sub(seats));
        for (sum, &short) in self.daily_shortage_sums.iter_mut().zip(shortage.iter()) {
            *sum += short as u64;
        }

        self.weeks_completed += 1;
        WeekSummary {
            baseline_absent: absent_count,
            attendees,
            shortage,
        }
    }

    /// Run all configured weeks, reporting progress about every 1%.
    pub fn run(&mut self, rng: &mut SimRng, control: RunControl<'_>) -> SimResult<()> {
        let total_weeks = self.input.num_weeks;
        let interval = (total_weeks / 100).max(1);

        while self.weeks_completed < total_weeks {
            if control.cancellation.is_cancelled() {
                log::info!(
                    "scenario '{}': cancelled at week {}/{total_weeks}",
                    self.input.scenario_name,
                    self.weeks_completed
                );
                return Err(SimError::Cancelled {
                    completed_weeks: self.weeks_completed,
                    total_weeks,
                });
            }

            self.simulate_week(rng);

            let done = self.weeks_completed;
            if done % interval == 0 || done == total_weeks {
                let percent = (done as f64 / total_weeks as f64 * 100.0).round() as u8;
                log::trace!("scenario '{}': {percent}%", self.input.scenario_name);
                control.progress.report(ProgressUpdate {
                    scenario_name: self.input.scenario_name.clone(),
                    progress_percent: percent,
                });
            }
        }
        Ok(())
    }

    /// Aggregate the completed weeks into a rounded result.
    pub fn finish(&self) -> ScenarioResult {
        let weeks = self.weeks_completed;
        let n = self.input.total_employees as u64;
        if weeks == 0 || n == 0 {
            return ScenarioResult::zero();
        }

        let daily_average_shortage = self.daily_shortage_sums.map(|sum| sum as f64 / weeks as f64);
        let overall_average_shortage =
            daily_average_shortage.iter().sum::<f64>() / DAYS_IN_WORK_WEEK as f64;

        let employee_weeks = (weeks * n) as f64;
        let attendance_distribution_pct =
            self.attendance_bucket_sums.map(|sum| sum as f64 / employee_weeks * 100.0);

        let average_preference_deviation = if self.active_employee_weeks > 0 {
            self.total_deviation / self.active_employee_weeks as f64
        } else {
            0.0
        };

        ScenarioResult {
            overall_average_shortage,
            daily_average_shortage,
            attendance_distribution_pct,
            average_preference_deviation,
        }
        .rounded()
    }
}

/// Run one scenario to completion.
///
/// Zero employees or zero weeks short-circuit to an all-zero result before
/// any validation, so degenerate inputs never error.
pub fn run_scenario(
    input: &ScenarioInput,
    rng: &mut SimRng,
    control: RunControl<'_>,
) -> SimResult<ScenarioResult> {
    if input.total_employees == 0 || input.num_weeks == 0 {
        log::debug!(
            "scenario '{}': nothing to simulate (employees={}, weeks={})",
            input.scenario_name,
            input.total_employees,
            input.num_weeks
        );
        return Ok(ScenarioResult::zero());
    }

    let mut engine = ScenarioEngine::new(input)?;
    engine.run(rng, control)?;
    let result = engine.finish();

    log::debug!(
        "scenario '{}': overall shortage {:.2}, deviation {:.2}",
        input.scenario_name,
        result.overall_average_shortage,
        result.average_preference_deviation
    );
    Ok(result)
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}
