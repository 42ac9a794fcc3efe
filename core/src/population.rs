//! Per-employee preference arrays for a batch.
//!
//! Preferences are drawn once per batch and shared by every scenario in
//! it, so scenarios differ only by policy, never by population.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
    types::DAYS_IN_WORK_WEEK,
};

/// `count` normal draws around `mean`, clamped to [0, 5] days.
pub fn modeled_preferences(count: usize, mean: f64, std_dev: f64, rng: &mut SimRng) -> Vec<f64> {
    (0..count)
        .map(|_| rng.normal(mean, std_dev).clamp(0.0, DAYS_IN_WORK_WEEK as f64))
        .collect()
}

/// `count` draws with replacement from an observed preference sample.
pub fn empirical_preferences(count: usize, sample: &[f64], rng: &mut SimRng) -> SimResult<Vec<f64>> {
    if sample.is_empty() {
        return Err(SimError::EmptyPreferenceSample);
    }
    Ok((0..count)
        .map(|_| sample[rng.next_usize_below(sample.len())])
        .collect())
}
