//! Weighted selection of attendance days, without replacement.

use crate::{rng::SimRng, types::DAYS_IN_WORK_WEEK};
use serde::{Deserialize, Serialize};

/// Relative popularity of each weekday, Mon..Fri.
///
/// Non-positive (and NaN) weights carry no selection weight, but such a
/// day can still be picked once every remaining day weighs zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct DayWeights([f64; DAYS_IN_WORK_WEEK]);

impl DayWeights {
    pub fn new(weights: [f64; DAYS_IN_WORK_WEEK]) -> Self {
        Self(weights)
    }

    pub fn uniform() -> Self {
        Self([1.0; DAYS_IN_WORK_WEEK])
    }

    pub fn raw(&self) -> &[f64; DAYS_IN_WORK_WEEK] {
        &self.0
    }

    /// Weight used for sampling: negative and NaN count as zero.
    pub fn effective(&self, day: usize) -> f64 {
        let w = self.0[day];
        if w > 0.0 {
            w
        } else {
            0.0
        }
    }
}

impl Default for DayWeights {
    fn default() -> Self {
        Self::uniform()
    }
}

impl From<Vec<f64>> for DayWeights {
    fn from(weights: Vec<f64>) -> Self {
        match <[f64; DAYS_IN_WORK_WEEK]>::try_from(weights) {
            Ok(array) => Self(array),
            Err(other) => {
                log::warn!(
                    "expected {DAYS_IN_WORK_WEEK} day weights, got {}: using uniform weights",
                    other.len()
                );
                Self::uniform()
            }
        }
    }
}

impl From<DayWeights> for Vec<f64> {
    fn from(weights: DayWeights) -> Self {
        weights.0.to_vec()
    }
}

/// A set of weekdays, one bit per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySet(u8);

impl DaySet {
    pub fn insert(&mut self, day: usize) {
        debug_assert!(day < DAYS_IN_WORK_WEEK);
        self.0 |= 1 << day;
    }

    pub fn contains(&self, day: usize) -> bool {
        self.0 & (1 << day) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..DAYS_IN_WORK_WEEK).filter(move |&day| self.contains(day))
    }
}

/// Pick `target_count` distinct weekdays, weighted by `weights`.
///
/// The pool shrinks by swap-remove after every pick. Once the remaining
/// pool weighs nothing the pick falls back to uniform, so the sampler
/// always makes progress. More than five days is clamped by pool exhaustion.
pub fn select_attendance_days(target_count: u8, weights: &DayWeights, rng: &mut SimRng) -> DaySet {
    let mut chosen = DaySet::default();
    let mut pool: [usize; DAYS_IN_WORK_WEEK] = [0, 1, 2, 3, 4];
    let mut available = DAYS_IN_WORK_WEEK;

    for _ in 0..target_count {
        if available == 0 {
            break;
        }

        // Re-summed from the pool so removed weight never leaves drift behind.
        let total_weight: f64 = pool[..available].iter().map(|&d| weights.effective(d)).sum();
        let slot = if total_weight <= 0.0 {
            rng.next_usize_below(available)
        } else {
            pick_weighted_slot(&pool[..available], weights, total_weight, rng)
        };

        let day = pool[slot];
        chosen.insert(day);
        pool[slot] = pool[available - 1];
        available -= 1;
    }

    chosen
}

fn pick_weighted_slot(pool: &[usize], weights: &DayWeights, total_weight: f64, rng: &mut SimRng) -> usize {
    let threshold = rng.next_f64() * total_weight;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (slot, &day) in pool.iter().enumerate() {
        let w = weights.effective(day);
        if w > 0.0 {
            last_positive = Some(slot);
        }
        cumulative += w;
        if threshold < cumulative {
            return slot;
        }
    }
    // Rounding drift can leave threshold == cumulative; stay on a weighted day.
    last_positive.unwrap_or(0)
}
