//! Shared primitive types used across every engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in the reporting currency.
pub type Amount = f64;

/// Stable identifier of a macro scenario ("EBA_Adverse", "MC_00042", ...).
pub type ScenarioId = String;

/// Name of a portfolio metric ("cet1_ratio", "lcr", ...).
pub type MetricName = String;

/// Result of a division whose denominator may legitimately be zero.
///
/// Every ratio that can hit a zero denominator (stress impact %, backtest
/// accuracy and relative error, peer percentile, capital adequacy) returns
/// this instead of `inf`/`NaN` or a silent `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Ratio {
    Defined(f64),
    #[default]
    Undefined,
}

impl Ratio {
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Self::Undefined;
        }
        let value = numerator / denominator;
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined
        }
    }

    /// `numerator / denominator × 100`.
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        Self::of(numerator, denominator).map(|v| v * 100.0)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Defined(v) => Self::Defined(f(v)),
            Self::Undefined => Self::Undefined,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined => None,
        }
    }

    pub fn unwrap_or(self, fallback: f64) -> f64 {
        self.value().unwrap_or(fallback)
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Self::Defined(_))
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{v:.2}"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_undefined() {
        assert_eq!(Ratio::of(5.0, 0.0), Ratio::Undefined);
        assert_eq!(Ratio::percent(0.0, 0.0), Ratio::Undefined);
    }

    #[test]
    fn percent_scales_by_hundred() {
        let r = Ratio::percent(1.0, 8.0);
        assert!((r.unwrap_or(0.0) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_string(&Ratio::Defined(1.5)).unwrap();
        assert_eq!(json, r#"{"status":"defined","value":1.5}"#);
        let json = serde_json::to_string(&Ratio::Undefined).unwrap();
        assert_eq!(json, r#"{"status":"undefined"}"#);
    }
}
