//! Attendance policies and the target-days resolver.
//!
//! A policy is stored on the wire as `{ min?, max?, exactly? }`. In memory
//! it is a `PolicyRule` variant, so `exactly` overriding `min`/`max` is
//! decided once at the boundary instead of at every call site.

use crate::types::{ScenarioName, DAYS_IN_WORK_WEEK};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_DAYS: u8 = DAYS_IN_WORK_WEEK as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPolicyRule", into = "RawPolicyRule")]
pub enum PolicyRule {
    /// No rules: employees follow their own preference.
    Unrestricted,
    /// Optional floor and ceiling on in-office days.
    Bounded { min: Option<u8>, max: Option<u8> },
    /// A fixed number of in-office days, regardless of preference.
    Exactly(u8),
}

impl PolicyRule {
    pub fn min(days: u8) -> Self {
        Self::Bounded { min: Some(days), max: None }
    }

    pub fn between(min: u8, max: u8) -> Self {
        Self::Bounded { min: Some(min), max: Some(max) }
    }

    /// Apply this rule to an already rounded and clamped preference.
    pub fn apply(&self, rounded_pref: u8) -> u8 {
        let target = match *self {
            Self::Unrestricted => rounded_pref,
            Self::Exactly(days) => days,
            Self::Bounded { min, max } => {
                let mut days = rounded_pref;
                if let Some(floor) = min {
                    days = days.max(floor);
                }
                if let Some(ceiling) = max {
                    days = days.min(ceiling);
                }
                days
            }
        };
        target.min(MAX_DAYS)
    }
}

/// Wire shape of a policy rule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct RawPolicyRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exactly: Option<u8>,
}

impl From<RawPolicyRule> for PolicyRule {
    fn from(raw: RawPolicyRule) -> Self {
        match raw {
            RawPolicyRule { exactly: Some(days), .. } => Self::Exactly(days),
            RawPolicyRule { min: None, max: None, .. } => Self::Unrestricted,
            RawPolicyRule { min, max, .. } => Self::Bounded { min, max },
        }
    }
}

impl From<PolicyRule> for RawPolicyRule {
    fn from(rule: PolicyRule) -> Self {
        match rule {
            PolicyRule::Unrestricted => Self::default(),
            PolicyRule::Bounded { min, max } => Self { min, max, exactly: None },
            PolicyRule::Exactly(days) => Self { exactly: Some(days), ..Self::default() },
        }
    }
}

/// Scenario name -> rule. Ordered so scenario listings are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable(BTreeMap<ScenarioName, PolicyRule>);

impl PolicyTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_rule(mut self, scenario: impl Into<ScenarioName>, rule: PolicyRule) -> Self {
        self.insert(scenario, rule);
        self
    }

    pub fn insert(&mut self, scenario: impl Into<ScenarioName>, rule: PolicyRule) {
        self.0.insert(scenario.into(), rule);
    }

    pub fn get(&self, scenario: &str) -> Option<&PolicyRule> {
        self.0.get(scenario)
    }

    /// Rule for `scenario`, or `Unrestricted` (with a warning) when the
    /// table has no entry.
    pub fn rule_for(&self, scenario: &str) -> PolicyRule {
        match self.get(scenario) {
            Some(rule) => *rule,
            None => {
                log::warn!("unknown scenario '{scenario}': defaulting to rounded preference");
                PolicyRule::Unrestricted
            }
        }
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &ScenarioName> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The six policies every study compares.
    pub fn standard() -> Self {
        Self::new()
            .with_rule("1) No rules", PolicyRule::Unrestricted)
            .with_rule("2) Min 2 days/week, no max", PolicyRule::min(2))
            .with_rule("3) Min 2 days/week, max 4 days/week", PolicyRule::between(2, 4))
            .with_rule("4) Min 3 days/week, no max", PolicyRule::min(3))
            .with_rule("5) Min 3 days/week, max 4 days/week", PolicyRule::between(3, 4))
            .with_rule("6) Exactly 3 days/week", PolicyRule::Exactly(3))
    }
}

/// Clamp a raw preference to [0, 5] and round it to whole days.
pub fn round_preference(raw_preference: f64) -> u8 {
    if raw_preference.is_nan() {
        return 0;
    }
    raw_preference.clamp(0.0, DAYS_IN_WORK_WEEK as f64).round() as u8
}

/// Target in-office days for one employee under `scenario`.
/// An unknown scenario falls back to the rounded preference.
pub fn resolve_target_days(rules: &PolicyTable, scenario: &str, raw_preference: f64) -> u8 {
    rules.rule_for(scenario).apply(round_preference(raw_preference))
}
