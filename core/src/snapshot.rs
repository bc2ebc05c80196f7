//! Portfolio snapshot: the flat metric-name → baseline-value mapping that
//! scenarios are applied to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tier 1 capital assumed when a snapshot does not carry one.
pub const DEFAULT_TIER1_CAPITAL: f64 = 1_000_000_000.0;
/// Total RWA assumed when a snapshot does not carry one.
pub const DEFAULT_TOTAL_RWA: f64 = 10_000_000_000.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioSnapshot {
    values: BTreeMap<String, f64>,
}

impl PortfolioSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: &str, value: f64) -> Self {
        self.values.insert(metric.to_string(), value);
        self
    }

    pub fn insert(&mut self, metric: &str, value: f64) {
        self.values.insert(metric.to_string(), value);
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn get_or(&self, metric: &str, default: f64) -> f64 {
        self.get(metric).unwrap_or(default)
    }

    pub fn tier1_capital(&self) -> f64 {
        self.get_or("tier1_capital", DEFAULT_TIER1_CAPITAL)
    }

    pub fn total_rwa(&self) -> f64 {
        self.get_or("total_rwa", DEFAULT_TOTAL_RWA)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, f64>> for PortfolioSnapshot {
    fn from(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }
}

impl<'a> FromIterator<(&'a str, f64)> for PortfolioSnapshot {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}
