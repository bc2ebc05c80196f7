//! Exposure records fed to the Pillar 1 calculators.
//!
//! Every field has a documented default so a partially populated JSON
//! record still deserialises. Free-text classifications (counterparty type,
//! instrument type) keep unrecognised values in an `Other` variant instead
//! of failing; the calculators then apply their conservative fallback.

use crate::error::{RiskError, RiskResult};
use crate::types::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum CounterpartyType {
    Sovereign,
    Corporate,
    Retail,
    #[default]
    Unspecified,
    Other(String),
}

impl From<String> for CounterpartyType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SOVEREIGN" => Self::Sovereign,
            "CORPORATE" => Self::Corporate,
            "RETAIL" => Self::Retail,
            "" => Self::Unspecified,
            _ => Self::Other(raw),
        }
    }
}

impl From<CounterpartyType> for String {
    fn from(kind: CounterpartyType) -> Self {
        match kind {
            CounterpartyType::Sovereign => "SOVEREIGN".into(),
            CounterpartyType::Corporate => "CORPORATE".into(),
            CounterpartyType::Retail => "RETAIL".into(),
            CounterpartyType::Unspecified => String::new(),
            CounterpartyType::Other(raw) => raw,
        }
    }
}

/// IFRS 9 credit-quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Ifrs9Stage {
    #[default]
    Performing,
    Underperforming,
    Defaulted,
}

impl TryFrom<u8> for Ifrs9Stage {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::Performing),
            2 => Ok(Self::Underperforming),
            3 => Ok(Self::Defaulted),
            other => Err(format!("IFRS 9 stage must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Ifrs9Stage> for u8 {
    fn from(stage: Ifrs9Stage) -> Self {
        match stage {
            Ifrs9Stage::Performing => 1,
            Ifrs9Stage::Underperforming => 2,
            Ifrs9Stage::Defaulted => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditExposure {
    pub exposure_id: String,
    pub counterparty_id: String,
    pub product_type: String,
    pub counterparty_type: CounterpartyType,
    pub amount: Amount,
    pub currency: String,
    pub rating: String,
    pub score: i32,
    pub segment: String,
    pub country: String,
    pub days_past_due: u32,
    pub stage: Ifrs9Stage,
    pub lgd: f64,
    pub pd: f64,
}

impl Default for CreditExposure {
    fn default() -> Self {
        Self {
            exposure_id: String::new(),
            counterparty_id: String::new(),
            product_type: String::new(),
            counterparty_type: CounterpartyType::Unspecified,
            amount: 0.0,
            currency: "EUR".into(),
            rating: "NR".into(),
            score: 0,
            segment: "UNASSIGNED".into(),
            country: String::new(),
            days_past_due: 0,
            stage: Ifrs9Stage::Performing,
            lgd: 0.45,
            pd: 0.01,
        }
    }
}

impl CreditExposure {
    /// Expected loss `PD × LGD × EAD`.
    pub fn expected_loss(&self) -> Amount {
        self.pd * self.lgd * self.amount
    }

    /// Checks the record invariants. Calculators do not call this; they
    /// clamp instead, so callers who want hard rejection validate first.
    pub fn validate(&self) -> RiskResult<()> {
        let reject = |reason: String| RiskError::InvalidExposure {
            exposure_id: self.exposure_id.clone(),
            reason,
        };
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(reject(format!("amount must be >= 0, got {}", self.amount)));
        }
        if !(0.0..=1.0).contains(&self.pd) {
            return Err(reject(format!("pd must be within [0, 1], got {}", self.pd)));
        }
        if !(0.0..=1.0).contains(&self.lgd) {
            return Err(reject(format!("lgd must be within [0, 1], got {}", self.lgd)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum InstrumentType {
    Bond,
    InterestRateSwap,
    Fra,
    Equity,
    EquityOption,
    FxForward,
    FxOption,
    Commodity,
    #[default]
    Unspecified,
    Other(String),
}

/// Standardised-approach risk class a position is charged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRiskClass {
    InterestRate,
    Equity,
    Fx,
    Commodity,
    Unclassified,
}

impl InstrumentType {
    pub fn risk_class(&self) -> MarketRiskClass {
        match self {
            Self::Bond | Self::InterestRateSwap | Self::Fra => MarketRiskClass::InterestRate,
            Self::Equity | Self::EquityOption => MarketRiskClass::Equity,
            Self::FxForward | Self::FxOption => MarketRiskClass::Fx,
            Self::Commodity => MarketRiskClass::Commodity,
            Self::Unspecified | Self::Other(_) => MarketRiskClass::Unclassified,
        }
    }
}

impl From<String> for InstrumentType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BOND" => Self::Bond,
            "IRS" => Self::InterestRateSwap,
            "FRA" => Self::Fra,
            "EQUITY" => Self::Equity,
            "EQUITY_OPTION" => Self::EquityOption,
            "FX_FORWARD" => Self::FxForward,
            "FX_OPTION" => Self::FxOption,
            "COMMODITY" => Self::Commodity,
            "" => Self::Unspecified,
            _ => Self::Other(raw),
        }
    }
}

impl From<InstrumentType> for String {
    fn from(kind: InstrumentType) -> Self {
        match kind {
            InstrumentType::Bond => "BOND".into(),
            InstrumentType::InterestRateSwap => "IRS".into(),
            InstrumentType::Fra => "FRA".into(),
            InstrumentType::Equity => "EQUITY".into(),
            InstrumentType::EquityOption => "EQUITY_OPTION".into(),
            InstrumentType::FxForward => "FX_FORWARD".into(),
            InstrumentType::FxOption => "FX_OPTION".into(),
            InstrumentType::Commodity => "COMMODITY".into(),
            InstrumentType::Unspecified => String::new(),
            InstrumentType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MarketExposure {
    pub position_id: String,
    pub instrument_type: InstrumentType,
    pub notional: Amount,
    pub currency: String,
    /// Residual maturity in years.
    pub maturity: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalRisk {
    pub business_line: String,
    pub gross_income: Amount,
    pub beta_factor: f64,
}

impl Default for OperationalRisk {
    fn default() -> Self {
        Self {
            business_line: String::new(),
            gross_income: 0.0,
            beta_factor: 0.15,
        }
    }
}

/// The full exposure set for one Pillar 1 run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExposureBook {
    pub credit: Vec<CreditExposure>,
    pub market: Vec<MarketExposure>,
    pub operational: Vec<OperationalRisk>,
}
