//! Engine configuration.
//!
//! Each engine owns one JSON section (`<data_dir>/<section>.json`). Every
//! section struct is `#[serde(default)]` and its `Default` impl is the
//! embedded calibration, so partial files only override what they name and
//! a missing or malformed file degrades to the embedded values.

use crate::pillar3::{DisclosureFrequency, SensitivityFactor};
use crate::scenario::MacroVariable;
use crate::types::Amount;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------- Pillar 1 --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetailWeights {
    pub standard: f64,
    pub revolving: f64,
    pub mortgage: f64,
}

impl Default for RetailWeights {
    fn default() -> Self {
        Self {
            standard: 0.75,
            revolving: 0.75,
            mortgage: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeightTables {
    pub sovereign: BTreeMap<String, f64>,
    pub corporate: BTreeMap<String, f64>,
    pub retail: RetailWeights,
}

fn rating_table(weights: [f64; 7]) -> BTreeMap<String, f64> {
    ["AAA", "AA", "A", "BBB", "BB", "B", "CCC"]
        .iter()
        .zip(weights)
        .map(|(rating, w)| (rating.to_string(), w))
        .collect()
}

impl Default for RiskWeightTables {
    fn default() -> Self {
        Self {
            sovereign: rating_table([0.0, 0.0, 0.2, 0.2, 0.5, 1.0, 1.5]),
            corporate: rating_table([0.2, 0.2, 0.5, 1.0, 1.0, 1.5, 1.5]),
            retail: RetailWeights::default(),
        }
    }
}

/// Capital charge per unit of |delta| × notional, by risk class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketShocks {
    pub interest_rate: f64,
    pub equity: f64,
    pub fx: f64,
    pub commodity: f64,
}

impl Default for MarketShocks {
    fn default() -> Self {
        Self {
            interest_rate: 0.01,
            equity: 0.08,
            fx: 0.08,
            commodity: 0.0,
        }
    }
}

/// Minimum capital ratios in percent of total RWA.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapitalMinimums {
    pub cet1: f64,
    pub tier1: f64,
    pub total: f64,
}

impl Default for CapitalMinimums {
    fn default() -> Self {
        Self {
            cet1: 4.5,
            tier1: 6.0,
            total: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pillar1Config {
    pub risk_weights: RiskWeightTables,
    /// Retail product codes weighted at the mortgage rate.
    pub mortgage_products: Vec<String>,
    /// Retail product codes weighted at the revolving rate.
    pub revolving_products: Vec<String>,
    /// Weight for unknown counterparty types and unrated buckets.
    pub fallback_risk_weight: f64,
    pub market_shocks: MarketShocks,
    /// Capital-to-RWA conversion (1 / 8%).
    pub rwa_multiplier: f64,
    /// Basic-indicator alpha applied to aggregate gross income.
    pub operational_alpha: f64,
    pub capital_minimums: CapitalMinimums,
}

impl Default for Pillar1Config {
    fn default() -> Self {
        Self {
            risk_weights: RiskWeightTables::default(),
            mortgage_products: vec!["PRET_IMMOBILIER".into()],
            revolving_products: vec!["CREDIT_RENOUVELABLE".into()],
            fallback_risk_weight: 1.0,
            market_shocks: MarketShocks::default(),
            rwa_multiplier: 12.5,
            operational_alpha: 0.15,
            capital_minimums: CapitalMinimums::default(),
        }
    }
}

// ---------------------------------------------------------------- Pillar 2 --

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceMultiplier {
    pub confidence: f64,
    pub multiplier: f64,
}

/// Upper bound (inclusive) of a weighted SREP score and the P2R it maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct P2rStep {
    pub max_score: f64,
    pub requirement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pillar2Config {
    pub icaap_confidence_levels: BTreeMap<String, f64>,
    pub default_confidence_level: f64,
    pub confidence_multipliers: Vec<ConfidenceMultiplier>,
    pub default_confidence_multiplier: f64,
    pub var_holding_period_days: f64,
    pub var_regulatory_multiplier: f64,
    pub default_severity_multiplier: f64,
    pub srep_weights: BTreeMap<String, f64>,
    pub default_srep_weight: f64,
    pub default_srep_score: f64,
    pub p2r_steps: Vec<P2rStep>,
    /// P2R when the score is above every step.
    pub p2r_ceiling: f64,
    pub p2g_buffer: f64,
    /// Internal liquidity limit as a multiple of the regulatory minimum.
    pub internal_limit_factor: f64,
    /// Highest P2R still considered compliant in the summary.
    pub p2r_compliance_limit: f64,
    /// P2R above which the summary asks for capital strengthening.
    pub p2r_action_threshold: f64,
}

impl Default for Pillar2Config {
    fn default() -> Self {
        let confidence = [
            ("credit_risk", 99.9),
            ("market_risk", 99.0),
            ("operational_risk", 99.9),
            ("interest_rate_risk", 99.0),
            ("concentration_risk", 99.9),
        ];
        let weights = [
            ("business_model", 0.25),
            ("governance", 0.25),
            ("capital", 0.25),
            ("liquidity", 0.25),
        ];
        Self {
            icaap_confidence_levels: confidence.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_confidence_level: 99.9,
            confidence_multipliers: vec![
                ConfidenceMultiplier { confidence: 99.0, multiplier: 2.33 },
                ConfidenceMultiplier { confidence: 99.5, multiplier: 2.58 },
                ConfidenceMultiplier { confidence: 99.9, multiplier: 3.09 },
            ],
            default_confidence_multiplier: 3.09,
            var_holding_period_days: 10.0,
            var_regulatory_multiplier: 3.0,
            default_severity_multiplier: 2.5,
            srep_weights: weights.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_srep_weight: 0.25,
            default_srep_score: 3.0,
            p2r_steps: vec![
                P2rStep { max_score: 1.5, requirement: 0.0 },
                P2rStep { max_score: 2.0, requirement: 0.5 },
                P2rStep { max_score: 2.5, requirement: 1.0 },
                P2rStep { max_score: 3.0, requirement: 1.5 },
            ],
            p2r_ceiling: 2.0,
            p2g_buffer: 1.0,
            internal_limit_factor: 1.1,
            p2r_compliance_limit: 2.0,
            p2r_action_threshold: 1.5,
        }
    }
}

// ---------------------------------------------------------------- Pillar 3 --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosureTable {
    pub name: String,
    pub frequency: DisclosureFrequency,
    #[serde(default = "mandatory_by_default")]
    pub mandatory: bool,
}

fn mandatory_by_default() -> bool {
    true
}

/// Days after period end by which a disclosure must be published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationDeadlines {
    pub quarterly: i64,
    pub semi_annual: i64,
    pub annual: i64,
}

impl Default for PublicationDeadlines {
    fn default() -> Self {
        Self {
            quarterly: 45,
            semi_annual: 60,
            annual: 120,
        }
    }
}

impl PublicationDeadlines {
    pub fn for_frequency(&self, frequency: DisclosureFrequency) -> i64 {
        match frequency {
            DisclosureFrequency::Quarterly => self.quarterly,
            DisclosureFrequency::SemiAnnual => self.semi_annual,
            DisclosureFrequency::Annual => self.annual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pillar3Config {
    pub disclosure_tables: BTreeMap<String, DisclosureTable>,
    pub publication_deadlines: PublicationDeadlines,
    pub upcoming_window_days: i64,
    /// Risk factor → named shock → size (bp for rates and spreads, % otherwise).
    pub sensitivity_scenarios: BTreeMap<SensitivityFactor, BTreeMap<String, f64>>,
    pub sensitivity_confidence_level: f64,
    /// |capital impact| above which a sensitivity is flagged for action.
    pub high_impact_threshold: Amount,
}

impl Default for Pillar3Config {
    fn default() -> Self {
        use DisclosureFrequency::*;
        let tables = [
            ("EU OV1", "Overview of RWA", Quarterly),
            ("EU CR1", "Credit quality of exposures", SemiAnnual),
            ("EU CR2", "Changes in defaulted exposures", SemiAnnual),
            ("EU CCR1", "CCR exposures by approach", SemiAnnual),
            ("EU MR1", "Market risk under standardised approach", Quarterly),
            ("EU OR1", "Operational risk", Annual),
            ("EU LIQ1", "LCR", Quarterly),
            ("EU LIQ2", "NSFR", SemiAnnual),
            ("EU KM1", "Key metrics", Quarterly),
        ];
        let grid = |up: f64, down: f64| {
            BTreeMap::from([("shock_up".to_string(), up), ("shock_down".to_string(), down)])
        };
        Self {
            disclosure_tables: tables
                .into_iter()
                .map(|(code, name, frequency)| {
                    let table = DisclosureTable {
                        name: name.into(),
                        frequency,
                        mandatory: true,
                    };
                    (code.to_string(), table)
                })
                .collect(),
            publication_deadlines: PublicationDeadlines::default(),
            upcoming_window_days: 30,
            sensitivity_scenarios: BTreeMap::from([
                (SensitivityFactor::InterestRate, grid(200.0, -200.0)),
                (SensitivityFactor::CreditSpread, grid(100.0, -50.0)),
                (SensitivityFactor::Equity, grid(20.0, -30.0)),
                (SensitivityFactor::Fx, grid(15.0, -15.0)),
                (SensitivityFactor::RealEstate, grid(10.0, -20.0)),
            ]),
            sensitivity_confidence_level: 95.0,
            high_impact_threshold: 1_000_000.0,
        }
    }
}

// --------------------------------------------------------------- Scenarios --

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VariableBounds {
    pub baseline: f64,
    pub min: f64,
    pub max: f64,
}

/// Correlation of each variable's yearly shock with the GDP shock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationHints {
    pub gdp_unemployment: f64,
    pub gdp_house_prices: f64,
    pub gdp_equity_prices: f64,
}

impl Default for CorrelationHints {
    fn default() -> Self {
        Self {
            gdp_unemployment: -0.7,
            gdp_house_prices: 0.6,
            gdp_equity_prices: 0.8,
        }
    }
}

impl CorrelationHints {
    pub fn loading_on_gdp(&self, variable: MacroVariable) -> f64 {
        let rho = match variable {
            MacroVariable::UnemploymentRate => self.gdp_unemployment,
            MacroVariable::HousePriceGrowth => self.gdp_house_prices,
            MacroVariable::EquityPriceGrowth => self.gdp_equity_prices,
            _ => 0.0,
        };
        rho.clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Baseline metrics every simulated scenario is applied to.
    pub reference_portfolio: BTreeMap<String, f64>,
    /// Cap on how many generated scenarios are applied. `None` applies all.
    pub max_applied_scenarios: Option<usize>,
    pub first_year_shock_std: f64,
    pub later_year_shock_std: f64,
    pub mean_reversion: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        let portfolio = [
            ("cet1_ratio", 14.2),
            ("tier1_ratio", 15.1),
            ("lcr", 125.0),
            ("nsfr", 105.0),
            ("roe", 11.2),
            ("cost_of_risk", 0.35),
            ("tier1_capital", 1_200_000_000.0),
            ("total_rwa", 8_000_000_000.0),
        ];
        Self {
            reference_portfolio: portfolio.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            max_applied_scenarios: None,
            first_year_shock_std: 1.0,
            later_year_shock_std: 0.8,
            mean_reversion: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub macro_variables: BTreeMap<MacroVariable, VariableBounds>,
    pub correlations: CorrelationHints,
    pub monte_carlo: MonteCarloConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        use MacroVariable::*;
        let bounds = |baseline, min, max| VariableBounds { baseline, min, max };
        Self {
            macro_variables: BTreeMap::from([
                (GdpGrowth, bounds(2.1, -5.0, 4.0)),
                (UnemploymentRate, bounds(7.5, 5.0, 15.0)),
                (HousePriceGrowth, bounds(3.0, -35.0, 10.0)),
                (EquityPriceGrowth, bounds(6.0, -45.0, 20.0)),
                (CorporateBondSpread, bounds(150.0, 50.0, 800.0)),
                (ShortTermRate, bounds(3.5, 0.0, 8.0)),
                (LongTermRate, bounds(4.0, 1.0, 8.0)),
            ]),
            correlations: CorrelationHints::default(),
            monte_carlo: MonteCarloConfig::default(),
        }
    }
}

// ---------------------------------------------------------- Forward-looking --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapitalTargets {
    pub cet1_minimum: f64,
    pub cet1_target: f64,
    pub cet1_buffer: f64,
    /// Extra percentage points required on top of target and buffer.
    pub cet1_stress_buffer: f64,
    pub tier1_minimum: f64,
    pub total_minimum: f64,
}

impl Default for CapitalTargets {
    fn default() -> Self {
        Self {
            cet1_minimum: 4.5,
            cet1_target: 12.0,
            cet1_buffer: 2.0,
            cet1_stress_buffer: 0.0,
            tier1_minimum: 6.0,
            total_minimum: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityTargets {
    pub lcr_minimum: f64,
    pub lcr_target: f64,
    pub nsfr_minimum: f64,
    pub nsfr_target: f64,
}

impl Default for LiquidityTargets {
    fn default() -> Self {
        Self {
            lcr_minimum: 100.0,
            lcr_target: 120.0,
            nsfr_minimum: 100.0,
            nsfr_target: 110.0,
        }
    }
}

/// Annual growth rates used when a business plan leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthAssumptions {
    pub loan_growth: f64,
    pub deposit_growth: f64,
    pub rwa_growth: f64,
    pub cost_of_risk: f64,
}

impl Default for GrowthAssumptions {
    fn default() -> Self {
        Self {
            loan_growth: 0.05,
            deposit_growth: 0.04,
            rwa_growth: 0.06,
            cost_of_risk: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub linear_weight: f64,
    pub members: usize,
    pub seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            linear_weight: 0.7,
            members: 100,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardLookingConfig {
    pub capital_targets: CapitalTargets,
    pub liquidity_targets: LiquidityTargets,
    pub growth_assumptions: GrowthAssumptions,
    pub ensemble: EnsembleConfig,
    pub capital_increase_threshold: Amount,
    pub retained_earnings_threshold: Amount,
    /// Euro funding needed per LCR point below target.
    pub funding_gap_per_lcr_point: Amount,
    /// LCR points gained per euro of monthly net cash flow.
    pub lcr_points_per_cash_flow: f64,
    pub funding_gap_action_threshold: Amount,
    pub capital_needs_insight_threshold: Amount,
}

impl Default for ForwardLookingConfig {
    fn default() -> Self {
        Self {
            capital_targets: CapitalTargets::default(),
            liquidity_targets: LiquidityTargets::default(),
            growth_assumptions: GrowthAssumptions::default(),
            ensemble: EnsembleConfig::default(),
            capital_increase_threshold: 100_000_000.0,
            retained_earnings_threshold: 50_000_000.0,
            funding_gap_per_lcr_point: 50_000_000.0,
            lcr_points_per_cash_flow: 2.0 / 1_000_000_000.0,
            funding_gap_action_threshold: 100_000_000.0,
            capital_needs_insight_threshold: 500_000_000.0,
        }
    }
}

// ------------------------------------------------------------- Backtesting --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub r2_minimum: f64,
    pub mae_maximum: f64,
    pub directional_accuracy_minimum: f64,
    /// Normality is rejected below this p-value.
    pub p_value_maximum: f64,
    /// Fraction of `r2_minimum` that still earns a Warning.
    pub warning_r2_fraction: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            r2_minimum: 0.6,
            mae_maximum: 0.5,
            directional_accuracy_minimum: 0.7,
            p_value_maximum: 0.05,
            warning_r2_fraction: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    pub validation_thresholds: ValidationThresholds,
    pub default_test_period_days: i64,
    /// Predicted impact per unit of scenario severity, by metric.
    pub stress_base_impacts: BTreeMap<String, f64>,
    pub durbin_watson_lower: f64,
    pub durbin_watson_upper: f64,
    pub heteroscedasticity_max_correlation: f64,
    pub validation_interval_days: i64,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        let impacts = [
            ("cet1_ratio", -2.0),
            ("lcr", -15.0),
            ("roe", -5.0),
            ("cost_of_risk", 1.5),
        ];
        Self {
            validation_thresholds: ValidationThresholds::default(),
            default_test_period_days: 365,
            stress_base_impacts: impacts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            durbin_watson_lower: 1.5,
            durbin_watson_upper: 2.5,
            heteroscedasticity_max_correlation: 0.3,
            validation_interval_days: 90,
        }
    }
}

// --------------------------------------------------------------- Reporting --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub rwa_tolerance: Amount,
    pub balance_sheet_tolerance: Amount,
    pub hqla_tolerance: Amount,
    pub level2_cap: f64,
    pub level2b_cap: f64,
    /// Net outflows never fall below this share of gross outflows.
    pub net_outflow_floor: f64,
    pub lcr_minimum: f64,
    pub cet1_minimum: f64,
    pub entity_identifier: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            rwa_tolerance: 1000.0,
            balance_sheet_tolerance: 1000.0,
            hqla_tolerance: 100.0,
            level2_cap: 0.40,
            level2b_cap: 0.15,
            net_outflow_floor: 0.25,
            lcr_minimum: 100.0,
            cet1_minimum: 4.5,
            entity_identifier: "BANK001".into(),
        }
    }
}

// ------------------------------------------------------------------ Loader --

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RiskConfig {
    pub pillar1: Pillar1Config,
    pub pillar2: Pillar2Config,
    pub pillar3: Pillar3Config,
    pub scenarios: ScenarioConfig,
    pub forward_looking: ForwardLookingConfig,
    pub backtesting: BacktestingConfig,
    pub reporting: ReportingConfig,
}

impl RiskConfig {
    /// Load every section from `data_dir`. A section whose file is missing
    /// or malformed falls back to its embedded default with a warning.
    pub fn load(data_dir: &str) -> Self {
        Self {
            pillar1: load_section(data_dir, "pillar1"),
            pillar2: load_section(data_dir, "pillar2"),
            pillar3: load_section(data_dir, "pillar3"),
            scenarios: load_section(data_dir, "scenarios"),
            forward_looking: load_section(data_dir, "forward_looking"),
            backtesting: load_section(data_dir, "backtesting"),
            reporting: load_section(data_dir, "reporting"),
        }
    }

    /// Like `load`, but any unreadable or malformed section is an error.
    pub fn load_strict(data_dir: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pillar1: read_section(data_dir, "pillar1")?,
            pillar2: read_section(data_dir, "pillar2")?,
            pillar3: read_section(data_dir, "pillar3")?,
            scenarios: read_section(data_dir, "scenarios")?,
            forward_looking: read_section(data_dir, "forward_looking")?,
            backtesting: read_section(data_dir, "backtesting")?,
            reporting: read_section(data_dir, "reporting")?,
        })
    }
}

fn read_section<T: DeserializeOwned>(data_dir: &str, name: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{name}.json");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let section = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    Ok(section)
}

fn load_section<T: DeserializeOwned + Default>(data_dir: &str, name: &str) -> T {
    match read_section(data_dir, name) {
        Ok(section) => {
            log::debug!("config: loaded {name} from {data_dir}");
            section
        }
        Err(e) => {
            log::warn!("config: {e}; using embedded {name} defaults");
            T::default()
        }
    }
}
