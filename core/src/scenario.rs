//! Macro scenarios and their application to a portfolio snapshot.
//!
//! RULES:
//!   - Every variable sequence of a scenario has exactly `horizon_years`
//!     values. Constructors that take caller data check this.
//!   - Stress transmission only reads year-1 values. A missing variable falls
//!     back to its neutral default (GDP 0, unemployment 7.5, house prices 0,
//!     spread 150 bp, short rate 3.5).
//!   - Stressed capital ratios are floored at 0, liquidity ratios at 50,
//!     profitability at 0; cost of risk is capped at 5× its baseline.
//!
//! The Monte Carlo generator lives in `monte_carlo.rs` as a second
//! `impl ScenarioEngine` block.

use crate::config::ScenarioConfig;
use crate::error::{RiskError, RiskResult};
use crate::rng::RngBank;
use crate::snapshot::PortfolioSnapshot;
use crate::types::{MetricName, Ratio, ScenarioId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroVariable {
    GdpGrowth,
    UnemploymentRate,
    HousePriceGrowth,
    EquityPriceGrowth,
    CorporateBondSpread,
    ShortTermRate,
    LongTermRate,
}

impl MacroVariable {
    pub const ALL: [MacroVariable; 7] = [
        MacroVariable::GdpGrowth,
        MacroVariable::UnemploymentRate,
        MacroVariable::HousePriceGrowth,
        MacroVariable::EquityPriceGrowth,
        MacroVariable::CorporateBondSpread,
        MacroVariable::ShortTermRate,
        MacroVariable::LongTermRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GdpGrowth => "gdp_growth",
            Self::UnemploymentRate => "unemployment_rate",
            Self::HousePriceGrowth => "house_price_growth",
            Self::EquityPriceGrowth => "equity_price_growth",
            Self::CorporateBondSpread => "corporate_bond_spread",
            Self::ShortTermRate => "short_term_rate",
            Self::LongTermRate => "long_term_rate",
        }
    }

    /// Year-1 value assumed when a scenario does not carry the variable.
    fn neutral(&self) -> f64 {
        match self {
            Self::UnemploymentRate => 7.5,
            Self::CorporateBondSpread => 150.0,
            Self::ShortTermRate => 3.5,
            _ => 0.0,
        }
    }
}

impl fmt::Display for MacroVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioType {
    Base,
    Adverse,
    #[serde(rename = "Severely_Adverse")]
    SeverelyAdverse,
    Custom,
    #[serde(rename = "Monte_Carlo")]
    MonteCarlo,
}

impl ScenarioType {
    /// Multiplier applied to metrics the transmission rules do not know.
    pub fn generic_factor(&self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Adverse => 0.9,
            Self::SeverelyAdverse => 0.8,
            Self::Custom | Self::MonteCarlo => 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroScenario {
    pub scenario_id: ScenarioId,
    pub scenario_name: String,
    pub scenario_type: ScenarioType,
    pub horizon_years: usize,
    pub variables: BTreeMap<MacroVariable, Vec<f64>>,
    pub probability: f64,
    pub source: String,
    pub description: String,
}

impl MacroScenario {
    /// Check that every variable sequence spans the full horizon.
    pub fn validate(&self) -> RiskResult<()> {
        for (variable, values) in &self.variables {
            if values.len() != self.horizon_years {
                return Err(RiskError::InvalidScenario {
                    scenario_id: self.scenario_id.clone(),
                    variable: variable.to_string(),
                    expected: self.horizon_years,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }

    pub fn first_year(&self, variable: MacroVariable) -> f64 {
        self.variables
            .get(&variable)
            .and_then(|values| values.first().copied())
            .unwrap_or_else(|| variable.neutral())
    }
}

/// Caller-supplied description of a custom scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomScenarioConfig {
    pub scenario_id: String,
    pub scenario_name: String,
    pub horizon_years: usize,
    pub variables: BTreeMap<MacroVariable, Vec<f64>>,
    pub probability: f64,
    pub source: String,
    pub description: String,
}

impl Default for CustomScenarioConfig {
    fn default() -> Self {
        Self {
            scenario_id: "CUSTOM".into(),
            scenario_name: "Custom Scenario".into(),
            horizon_years: 3,
            variables: BTreeMap::new(),
            probability: 0.1,
            source: "Internal".into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShockUnit {
    #[serde(rename = "bp")]
    BasisPoints,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "abs")]
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityShock {
    pub factor_name: String,
    pub shock_type: String,
    pub shock_size: f64,
    pub shock_unit: ShockUnit,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario_id: ScenarioId,
    pub metric_name: MetricName,
    pub baseline_value: f64,
    pub stressed_value: f64,
    pub impact: f64,
    /// Impact relative to the baseline, in percent.
    pub impact_percentage: Ratio,
    pub time_horizon: usize,
}

/// Transmission rule a metric name maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MetricClass {
    CapitalRatio,
    Liquidity,
    Profitability { rate_sensitivity: f64 },
    CostOfRisk,
    Other,
}

impl MetricClass {
    fn of(metric: &str) -> Self {
        match metric {
            "cet1_ratio" | "tier1_ratio" | "total_ratio" => Self::CapitalRatio,
            "lcr" | "nsfr" => Self::Liquidity,
            "nim" => Self::Profitability { rate_sensitivity: 0.1 },
            "roe" | "roa" => Self::Profitability { rate_sensitivity: 0.05 },
            "cost_of_risk" => Self::CostOfRisk,
            _ => Self::Other,
        }
    }
}

pub struct ScenarioEngine {
    config: ScenarioConfig,
    pub(crate) rng_bank: RngBank,
}

impl ScenarioEngine {
    pub fn new(config: ScenarioConfig, rng_bank: RngBank) -> Self {
        Self { config, rng_bank }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// EBA-style baseline, adverse and severely adverse scenarios.
    ///
    /// The tables are calibration constants; `year` only labels the
    /// exercise.
    pub fn create_eba_scenarios(&self, year: i32) -> BTreeMap<ScenarioId, MacroScenario> {
        use MacroVariable::*;
        let scenarios = [
            fixed_scenario(
                "EBA_Baseline",
                "EBA Baseline Scenario",
                ScenarioType::Base,
                0.5,
                "EBA",
                format!("EBA {year} baseline macroeconomic projection"),
                [
                    (GdpGrowth, [2.1, 2.3, 2.2]),
                    (UnemploymentRate, [7.5, 7.2, 7.0]),
                    (HousePriceGrowth, [3.0, 2.8, 2.5]),
                    (EquityPriceGrowth, [6.0, 5.5, 5.0]),
                    (CorporateBondSpread, [150.0, 145.0, 140.0]),
                    (ShortTermRate, [3.5, 3.8, 4.0]),
                    (LongTermRate, [4.0, 4.2, 4.3]),
                ],
            ),
            fixed_scenario(
                "EBA_Adverse",
                "EBA Adverse Scenario",
                ScenarioType::Adverse,
                0.1,
                "EBA",
                format!("EBA {year} adverse scenario: recession with falling asset prices"),
                [
                    (GdpGrowth, [-1.7, -0.8, 1.2]),
                    (UnemploymentRate, [9.0, 10.5, 9.8]),
                    (HousePriceGrowth, [-16.0, -8.0, 2.0]),
                    (EquityPriceGrowth, [-22.0, -5.0, 8.0]),
                    (CorporateBondSpread, [280.0, 220.0, 180.0]),
                    (ShortTermRate, [3.5, 2.8, 3.2]),
                    (LongTermRate, [4.0, 3.5, 3.8]),
                ],
            ),
            fixed_scenario(
                "EBA_Severely_Adverse",
                "EBA Severely Adverse Scenario",
                ScenarioType::SeverelyAdverse,
                0.01,
                "EBA",
                format!("EBA {year} severely adverse scenario: deep recession and market crash"),
                [
                    (GdpGrowth, [-4.1, -2.5, 0.5]),
                    (UnemploymentRate, [11.5, 13.0, 11.8]),
                    (HousePriceGrowth, [-33.0, -15.0, -2.0]),
                    (EquityPriceGrowth, [-45.0, -10.0, 5.0]),
                    (CorporateBondSpread, [450.0, 350.0, 250.0]),
                    (ShortTermRate, [3.5, 1.5, 2.0]),
                    (LongTermRate, [4.0, 2.5, 3.0]),
                ],
            ),
        ];
        log::debug!("scenario: built {} EBA scenarios for {year}", scenarios.len());
        scenarios.into_iter().map(|s| (s.scenario_id.clone(), s)).collect()
    }

    /// Fed CCAR-style baseline and severely adverse scenarios.
    pub fn create_fed_scenarios(&self, year: i32) -> BTreeMap<ScenarioId, MacroScenario> {
        use MacroVariable::*;
        let scenarios = [
            fixed_scenario(
                "Fed_Baseline",
                "Fed CCAR Baseline",
                ScenarioType::Base,
                0.5,
                "Fed",
                format!("Fed CCAR {year} baseline"),
                [
                    (GdpGrowth, [2.4, 2.1, 1.9]),
                    (UnemploymentRate, [3.8, 4.1, 4.3]),
                    (HousePriceGrowth, [4.2, 3.8, 3.5]),
                    (EquityPriceGrowth, [7.5, 6.8, 6.2]),
                    (CorporateBondSpread, [120.0, 125.0, 130.0]),
                    (ShortTermRate, [5.25, 4.75, 4.25]),
                    (LongTermRate, [4.5, 4.3, 4.1]),
                ],
            ),
            fixed_scenario(
                "Fed_Severely_Adverse",
                "Fed CCAR Severely Adverse",
                ScenarioType::SeverelyAdverse,
                0.005,
                "Fed",
                format!("Fed CCAR {year} severely adverse"),
                [
                    (GdpGrowth, [-3.5, -1.2, 2.1]),
                    (UnemploymentRate, [10.0, 12.5, 9.5]),
                    (HousePriceGrowth, [-25.0, -12.0, 3.0]),
                    (EquityPriceGrowth, [-40.0, -8.0, 12.0]),
                    (CorporateBondSpread, [550.0, 400.0, 200.0]),
                    (ShortTermRate, [5.25, 0.5, 1.5]),
                    (LongTermRate, [4.5, 1.8, 2.8]),
                ],
            ),
        ];
        log::debug!("scenario: built {} Fed scenarios for {year}", scenarios.len());
        scenarios.into_iter().map(|s| (s.scenario_id.clone(), s)).collect()
    }

    pub fn create_custom_scenario(&self, custom: CustomScenarioConfig) -> RiskResult<MacroScenario> {
        if custom.scenario_id.trim().is_empty() {
            return Err(RiskError::InsufficientData {
                what: "custom scenario has an empty id".into(),
            });
        }
        let scenario = MacroScenario {
            scenario_id: custom.scenario_id,
            scenario_name: custom.scenario_name,
            scenario_type: ScenarioType::Custom,
            horizon_years: custom.horizon_years,
            variables: custom.variables,
            probability: custom.probability,
            source: custom.source,
            description: custom.description,
        };
        scenario.validate()?;
        log::info!("scenario: custom scenario {} accepted", scenario.scenario_id);
        Ok(scenario)
    }

    /// Single-factor shock families used for sensitivity runs.
    pub fn generate_sensitivity_shocks(&self) -> BTreeMap<String, Vec<SensitivityShock>> {
        use ShockUnit::*;
        let family = |factor: &str, shocks: &[(&str, f64, ShockUnit, f64)]| {
            let shocks = shocks
                .iter()
                .map(|(shock_type, size, unit, confidence)| SensitivityShock {
                    factor_name: factor.to_string(),
                    shock_type: shock_type.to_string(),
                    shock_size: *size,
                    shock_unit: *unit,
                    confidence_level: *confidence,
                })
                .collect();
            (factor.to_string(), shocks)
        };
        BTreeMap::from([
            family(
                "Interest_Rate",
                &[
                    ("Parallel_Up", 200.0, BasisPoints, 95.0),
                    ("Parallel_Down", -200.0, BasisPoints, 95.0),
                    ("Steepening", 100.0, BasisPoints, 95.0),
                    ("Flattening", -100.0, BasisPoints, 95.0),
                ],
            ),
            family(
                "Credit_Spread",
                &[
                    ("Widening", 100.0, BasisPoints, 95.0),
                    ("Tightening", -50.0, BasisPoints, 95.0),
                    ("Sector_Rotation", 150.0, BasisPoints, 90.0),
                ],
            ),
            family(
                "Equity",
                &[
                    ("Market_Crash", -30.0, Percent, 99.0),
                    ("Market_Rally", 20.0, Percent, 95.0),
                    ("Volatility_Spike", 50.0, Percent, 95.0),
                ],
            ),
            family(
                "FX",
                &[
                    ("EUR_Appreciation", 15.0, Percent, 95.0),
                    ("EUR_Depreciation", -15.0, Percent, 95.0),
                    ("USD_Strength", 20.0, Percent, 90.0),
                ],
            ),
            family(
                "Real_Estate",
                &[
                    ("Price_Decline", -20.0, Percent, 99.0),
                    ("Price_Boom", 10.0, Percent, 95.0),
                    ("Regional_Crisis", -35.0, Percent, 99.9),
                ],
            ),
        ])
    }

    /// Stress every metric of `portfolio` under `scenario`.
    pub fn apply_scenario_to_portfolio(
        &self,
        scenario: &MacroScenario,
        portfolio: &PortfolioSnapshot,
    ) -> BTreeMap<MetricName, StressResult> {
        log::debug!(
            "scenario: applying {} to {} metrics",
            scenario.scenario_id,
            portfolio.len()
        );
        portfolio
            .iter()
            .map(|(metric, baseline)| {
                let stressed = stress_metric(scenario, portfolio, metric, baseline);
                let impact = stressed - baseline;
                let result = StressResult {
                    scenario_id: scenario.scenario_id.clone(),
                    metric_name: metric.to_string(),
                    baseline_value: baseline,
                    stressed_value: stressed,
                    impact,
                    impact_percentage: Ratio::percent(impact, baseline),
                    time_horizon: scenario.horizon_years,
                };
                (metric.to_string(), result)
            })
            .collect()
    }
}

fn fixed_scenario(
    id: &str,
    name: &str,
    scenario_type: ScenarioType,
    probability: f64,
    source: &str,
    description: String,
    table: [(MacroVariable, [f64; 3]); 7],
) -> MacroScenario {
    MacroScenario {
        scenario_id: id.to_string(),
        scenario_name: name.to_string(),
        scenario_type,
        horizon_years: 3,
        variables: table.into_iter().map(|(v, values)| (v, values.to_vec())).collect(),
        probability,
        source: source.to_string(),
        description,
    }
}

fn stress_metric(
    scenario: &MacroScenario,
    portfolio: &PortfolioSnapshot,
    metric: &str,
    baseline: f64,
) -> f64 {
    use MacroVariable::*;
    let gdp = scenario.first_year(GdpGrowth);
    let unemployment = scenario.first_year(UnemploymentRate);
    let house_prices = scenario.first_year(HousePriceGrowth);

    match MetricClass::of(metric) {
        MetricClass::CapitalRatio => {
            let mut loss_multiplier = 1.0;
            if gdp < -2.0 {
                loss_multiplier += gdp.abs() * 0.3;
            }
            if unemployment > 10.0 {
                loss_multiplier += (unemployment - 10.0) * 0.2;
            }
            if house_prices < -10.0 {
                loss_multiplier += house_prices.abs() * 0.1;
            }
            let capital = portfolio.tier1_capital();
            let losses = capital * 0.1 * (loss_multiplier - 1.0);
            let stressed_capital = capital - losses;
            let rwa = portfolio.total_rwa();
            // Without a usable RWA the ratio is scaled by the capital haircut.
            let ratio = if rwa > 0.0 {
                stressed_capital / rwa * 100.0
            } else if capital != 0.0 {
                baseline * stressed_capital / capital
            } else {
                baseline
            };
            ratio.max(0.0)
        }
        MetricClass::Liquidity => {
            let spread = scenario.first_year(CorporateBondSpread);
            let mut factor = 1.0;
            if gdp < -2.0 {
                factor -= gdp.abs() * 0.05;
            }
            if spread > 300.0 {
                factor -= (spread - 300.0) / 1000.0;
            }
            (baseline * factor).max(50.0)
        }
        MetricClass::Profitability { rate_sensitivity } => {
            let short_rate = scenario.first_year(ShortTermRate);
            let factor = 1.0 + gdp * 0.2 + (short_rate - 3.5) * rate_sensitivity;
            (baseline * factor).max(0.0)
        }
        MetricClass::CostOfRisk => {
            let mut multiplier = 1.0;
            if gdp < 0.0 {
                multiplier += gdp.abs() * 0.5;
            }
            if unemployment > 8.0 {
                multiplier += (unemployment - 8.0) * 0.3;
            }
            if house_prices < -5.0 {
                multiplier += house_prices.abs() * 0.02;
            }
            (baseline * multiplier).min(baseline * 5.0)
        }
        MetricClass::Other => baseline * scenario.scenario_type.generic_factor(),
    }
}
