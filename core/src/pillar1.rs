//! Pillar 1 minimum capital: standardised credit RWA, a standardised-style
//! market RWA approximation and basic-indicator operational RWA.
//!
//! The engine keeps the last total produced by each calculator in
//! [`RwaTotals`]. That field is public and only written by the three
//! `calculate_*_rwa` methods, so `get_total_rwa` is a pure read of it.
//! [`Pillar1Engine::compute_all`] runs the whole sequence and returns one
//! aggregate report for callers that prefer not to track call order.

use crate::config::Pillar1Config;
use crate::exposure::{
    CounterpartyType, CreditExposure, ExposureBook, MarketExposure, MarketRiskClass,
    OperationalRisk,
};
use crate::types::{Amount, Ratio};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRwaResult {
    pub total_rwa: Amount,
    pub rwa_by_segment: BTreeMap<String, Amount>,
    pub rwa_by_rating: BTreeMap<String, Amount>,
    /// Total RWA over total exposure amount.
    pub average_risk_weight: Ratio,
    pub number_exposures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRwaResult {
    pub total_rwa: Amount,
    pub interest_rate_risk: Amount,
    pub equity_risk: Amount,
    pub fx_risk: Amount,
    pub commodity_risk: Amount,
    pub number_positions: usize,
    /// Positions whose instrument type carries no charge.
    pub unclassified_positions: usize,
}

/// Operational RWA under the basic-indicator approach.
///
/// `total_rwa` applies one alpha to aggregate gross income. The per-line
/// view applies each line's own beta and is reported separately in
/// `rwa_by_business_line` / `attributed_rwa`; the two totals only agree
/// when every beta equals the alpha.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalRwaResult {
    pub total_rwa: Amount,
    pub capital_requirement: Amount,
    pub total_gross_income: Amount,
    pub rwa_by_business_line: BTreeMap<String, Amount>,
    pub attributed_rwa: Amount,
    pub beta_factor: f64,
}

/// Last total produced by each calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RwaTotals {
    pub credit: Amount,
    pub market: Amount,
    pub operational: Amount,
}

impl RwaTotals {
    pub fn total(&self) -> Amount {
        self.credit + self.market + self.operational
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RwaBreakdown {
    pub total_rwa: Amount,
    pub credit_rwa: Amount,
    pub market_rwa: Amount,
    pub operational_rwa: Amount,
    pub credit_percentage: Ratio,
    pub market_percentage: Ratio,
    pub operational_percentage: Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalRequirements {
    pub total_rwa: Amount,
    pub tier1_capital: Amount,
    pub cet1_ratio: Ratio,
    pub minimum_cet1: Amount,
    pub minimum_tier1: Amount,
    pub minimum_total: Amount,
    pub cet1_surplus: Amount,
    /// CET1 ratio at or above the minimum. False when the ratio is undefined.
    pub is_compliant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pillar1Report {
    pub credit: CreditRwaResult,
    pub market: MarketRwaResult,
    pub operational: OperationalRwaResult,
    pub totals: RwaBreakdown,
    pub capital: CapitalRequirements,
}

pub struct Pillar1Engine {
    config: Pillar1Config,
    pub totals: RwaTotals,
}

impl Pillar1Engine {
    pub fn new(config: Pillar1Config) -> Self {
        Self {
            config,
            totals: RwaTotals::default(),
        }
    }

    pub fn config(&self) -> &Pillar1Config {
        &self.config
    }

    /// Standardised risk weight for one exposure.
    pub fn risk_weight(&self, exposure: &CreditExposure) -> f64 {
        let weights = &self.config.risk_weights;
        let rating = exposure.rating.trim().to_ascii_uppercase();
        let by_rating = |table: &BTreeMap<String, f64>| {
            table
                .get(&rating)
                .copied()
                .unwrap_or(self.config.fallback_risk_weight)
        };
        match &exposure.counterparty_type {
            CounterpartyType::Sovereign => by_rating(&weights.sovereign),
            CounterpartyType::Corporate => by_rating(&weights.corporate),
            CounterpartyType::Retail => {
                let product = exposure.product_type.trim();
                if self.config.mortgage_products.iter().any(|p| p == product) {
                    weights.retail.mortgage
                } else if self.config.revolving_products.iter().any(|p| p == product) {
                    weights.retail.revolving
                } else {
                    weights.retail.standard
                }
            }
            CounterpartyType::Unspecified | CounterpartyType::Other(_) => {
                self.config.fallback_risk_weight
            }
        }
    }

    pub fn calculate_credit_rwa(&mut self, exposures: &[CreditExposure]) -> CreditRwaResult {
        log::info!("pillar1: credit RWA over {} exposures", exposures.len());

        let mut total_rwa = 0.0;
        let mut total_amount = 0.0;
        let mut rwa_by_segment: BTreeMap<String, Amount> = BTreeMap::new();
        let mut rwa_by_rating: BTreeMap<String, Amount> = BTreeMap::new();

        for exposure in exposures {
            let amount = if exposure.amount.is_finite() && exposure.amount >= 0.0 {
                exposure.amount
            } else {
                log::warn!(
                    "pillar1: exposure {} has amount {}, counted as 0",
                    exposure.exposure_id,
                    exposure.amount
                );
                0.0
            };
            let rwa = amount * self.risk_weight(exposure);
            total_rwa += rwa;
            total_amount += amount;
            *rwa_by_segment.entry(exposure.segment.clone()).or_default() += rwa;
            *rwa_by_rating.entry(exposure.rating.clone()).or_default() += rwa;
        }

        self.totals.credit = total_rwa;

        CreditRwaResult {
            total_rwa,
            rwa_by_segment,
            rwa_by_rating,
            average_risk_weight: Ratio::of(total_rwa, total_amount),
            number_exposures: exposures.len(),
        }
    }

    pub fn calculate_market_rwa(&mut self, positions: &[MarketExposure]) -> MarketRwaResult {
        log::info!("pillar1: market RWA over {} positions", positions.len());

        let shocks = &self.config.market_shocks;
        let mut ir = 0.0;
        let mut equity = 0.0;
        let mut fx = 0.0;
        let mut commodity = 0.0;
        let mut unclassified = 0;

        for position in positions {
            let sensitivity = position.delta.abs() * position.notional;
            match position.instrument_type.risk_class() {
                MarketRiskClass::InterestRate => ir += sensitivity * shocks.interest_rate,
                MarketRiskClass::Equity => equity += sensitivity * shocks.equity,
                MarketRiskClass::Fx => fx += sensitivity * shocks.fx,
                MarketRiskClass::Commodity => commodity += sensitivity * shocks.commodity,
                MarketRiskClass::Unclassified => {
                    log::debug!(
                        "pillar1: position {} has no market risk class",
                        position.position_id
                    );
                    unclassified += 1;
                }
            }
        }

        let k = self.config.rwa_multiplier;
        let total_rwa = (ir + equity + fx + commodity) * k;
        self.totals.market = total_rwa;

        MarketRwaResult {
            total_rwa,
            interest_rate_risk: ir * k,
            equity_risk: equity * k,
            fx_risk: fx * k,
            commodity_risk: commodity * k,
            number_positions: positions.len(),
            unclassified_positions: unclassified,
        }
    }

    pub fn calculate_operational_rwa(
        &mut self,
        business_lines: &[OperationalRisk],
    ) -> OperationalRwaResult {
        log::info!("pillar1: operational RWA over {} business lines", business_lines.len());

        let k = self.config.rwa_multiplier;
        let alpha = self.config.operational_alpha;
        let total_gross_income: Amount = business_lines.iter().map(|bl| bl.gross_income).sum();
        let capital_requirement = total_gross_income * alpha;
        let total_rwa = capital_requirement * k;

        let mut rwa_by_business_line = BTreeMap::new();
        for bl in business_lines {
            *rwa_by_business_line.entry(bl.business_line.clone()).or_default() +=
                bl.gross_income * bl.beta_factor * k;
        }
        let attributed_rwa = rwa_by_business_line.values().sum();

        self.totals.operational = total_rwa;

        OperationalRwaResult {
            total_rwa,
            capital_requirement,
            total_gross_income,
            rwa_by_business_line,
            attributed_rwa,
            beta_factor: alpha,
        }
    }

    pub fn get_total_rwa(&self) -> RwaBreakdown {
        let t = self.totals;
        let total = t.total();
        let share = |part: Amount| {
            if total > 0.0 {
                Ratio::percent(part, total)
            } else {
                Ratio::Undefined
            }
        };
        RwaBreakdown {
            total_rwa: total,
            credit_rwa: t.credit,
            market_rwa: t.market,
            operational_rwa: t.operational,
            credit_percentage: share(t.credit),
            market_percentage: share(t.market),
            operational_percentage: share(t.operational),
        }
    }

    pub fn calculate_capital_requirements(&self, tier1_capital: Amount) -> CapitalRequirements {
        let total_rwa = self.totals.total();
        let minimums = &self.config.capital_minimums;
        let minimum_cet1 = total_rwa * minimums.cet1 / 100.0;
        let cet1_ratio = if total_rwa > 0.0 {
            Ratio::percent(tier1_capital, total_rwa)
        } else {
            Ratio::Undefined
        };
        let is_compliant = cet1_ratio.value().is_some_and(|r| r >= minimums.cet1);

        CapitalRequirements {
            total_rwa,
            tier1_capital,
            cet1_ratio,
            minimum_cet1,
            minimum_tier1: total_rwa * minimums.tier1 / 100.0,
            minimum_total: total_rwa * minimums.total / 100.0,
            cet1_surplus: tier1_capital - minimum_cet1,
            is_compliant,
        }
    }

    /// Run all three calculators over `book`, then the capital check.
    pub fn compute_all(&mut self, book: &ExposureBook, tier1_capital: Amount) -> Pillar1Report {
        let credit = self.calculate_credit_rwa(&book.credit);
        let market = self.calculate_market_rwa(&book.market);
        let operational = self.calculate_operational_rwa(&book.operational);
        let totals = self.get_total_rwa();
        let capital = self.calculate_capital_requirements(tier1_capital);
        log::info!(
            "pillar1: total RWA {:.0}, CET1 ratio {}, compliant={}",
            totals.total_rwa,
            capital.cet1_ratio,
            capital.is_compliant
        );
        Pillar1Report {
            credit,
            market,
            operational,
            totals,
            capital,
        }
    }
}
