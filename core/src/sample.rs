//! A small, self-consistent sample bank used by the runner and the
//! end-to-end tests.
//!
//! Everything is fixed except the backtest history, which is drawn from the
//! `SampleData` stream so one seed always gives the same series.

use crate::backtesting::{HistoricalStressEvent, StressScenarioProfile};
use crate::engine::RiskInputs;
use crate::exposure::{
    CounterpartyType, CreditExposure, ExposureBook, Ifrs9Stage, InstrumentType, MarketExposure,
    OperationalRisk,
};
use crate::forward_looking::{
    AllocationBounds, BusinessLinePlan, BusinessPlan, CashFlowProjections, CurrentCapitalMetrics,
    TimeSeriesFrame,
};
use crate::pillar2::{IcaapInput, LiquidityMetricInput, RiskCategoryData, SrepPillarInput};
use crate::pillar3::{FactorExposure, PeerMetricInput, PublicationLog, SensitivityFactor};
use crate::reporting::{CapitalAmounts, ReportData};
use crate::rng::{RngBank, StreamSlot};
use crate::scenario::ScenarioType;
use crate::snapshot::PortfolioSnapshot;
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::BTreeMap;

fn data(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn credit_exposures() -> Vec<CreditExposure> {
    let exposure = |id: &str,
                    counterparty: &str,
                    product: &str,
                    kind: CounterpartyType,
                    amount: f64,
                    rating: &str,
                    score: i32,
                    segment: &str,
                    dpd: u32,
                    stage: Ifrs9Stage| CreditExposure {
        exposure_id: id.into(),
        counterparty_id: counterparty.into(),
        product_type: product.into(),
        counterparty_type: kind,
        amount,
        rating: rating.into(),
        score,
        segment: segment.into(),
        country: "FR".into(),
        days_past_due: dpd,
        stage,
        ..CreditExposure::default()
    };
    vec![
        exposure("EXP001", "CNT001", "PRET_IMMOBILIER", CounterpartyType::Retail, 250_000.0, "BBB", 670, "PARTICULIER", 0, Ifrs9Stage::Performing),
        exposure("EXP002", "CNT002", "PRET_ENTREPRISE", CounterpartyType::Corporate, 1_000_000.0, "A", 720, "PME", 15, Ifrs9Stage::Performing),
        exposure("EXP003", "CNT003", "PRET_CONSOMMATION", CounterpartyType::Retail, 15_000.0, "B", 640, "PARTICULIER", 45, Ifrs9Stage::Underperforming),
    ]
}

pub fn market_positions() -> Vec<MarketExposure> {
    vec![
        MarketExposure {
            position_id: "POS001".into(),
            instrument_type: InstrumentType::Bond,
            notional: 5_000_000.0,
            currency: "EUR".into(),
            maturity: 5.0,
            delta: 0.04,
            gamma: 0.001,
            vega: 0.0,
            theta: -50.0,
        },
        MarketExposure {
            position_id: "POS002".into(),
            instrument_type: InstrumentType::Equity,
            notional: 2_000_000.0,
            currency: "EUR".into(),
            maturity: 0.0,
            delta: 1.0,
            gamma: 0.0,
            vega: 0.15,
            theta: 0.0,
        },
        MarketExposure {
            position_id: "POS003".into(),
            instrument_type: InstrumentType::FxForward,
            notional: 1_000_000.0,
            currency: "USD".into(),
            maturity: 0.25,
            delta: 0.8,
            gamma: 0.0,
            vega: 0.0,
            theta: -10.0,
        },
    ]
}

pub fn business_lines() -> Vec<OperationalRisk> {
    [
        ("RETAIL_BANKING", 50_000_000.0, 0.15),
        ("CORPORATE_BANKING", 30_000_000.0, 0.18),
        ("TRADING", 20_000_000.0, 0.18),
    ]
    .into_iter()
    .map(|(line, income, beta)| OperationalRisk {
        business_line: line.into(),
        gross_income: income,
        beta_factor: beta,
    })
    .collect()
}

pub fn exposure_book() -> ExposureBook {
    ExposureBook {
        credit: credit_exposures(),
        market: market_positions(),
        operational: business_lines(),
    }
}

pub fn icaap_input() -> IcaapInput {
    let categories = [
        (
            "credit_risk",
            RiskCategoryData {
                allocated_capital: 5_000_000.0,
                expected_loss: 500_000.0,
                unexpected_loss: 1_500_000.0,
                methodology: Some("Internal Ratings Based".into()),
                ..RiskCategoryData::default()
            },
        ),
        (
            "market_risk",
            RiskCategoryData {
                allocated_capital: 1_000_000.0,
                var_1day: 50_000.0,
                methodology: Some("Value at Risk".into()),
                ..RiskCategoryData::default()
            },
        ),
        (
            "operational_risk",
            RiskCategoryData {
                allocated_capital: 1_500_000.0,
                annual_loss_estimate: 300_000.0,
                severity_multiplier: Some(3.0),
                methodology: Some("Loss Distribution Approach".into()),
                ..RiskCategoryData::default()
            },
        ),
        (
            "interest_rate_risk",
            RiskCategoryData {
                allocated_capital: 500_000.0,
                rate_shock_200bp: -200_000.0,
                methodology: Some("Duration Analysis".into()),
                ..RiskCategoryData::default()
            },
        ),
    ];
    IcaapInput {
        available_capital: 8_000_000.0,
        risk_categories: categories.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
}

pub fn srep_input() -> BTreeMap<String, SrepPillarInput> {
    let pillar = |score: f64, description: &str, finding: &str| SrepPillarInput {
        score: Some(score),
        description: description.into(),
        key_findings: vec![finding.into()],
        recommendations: Vec::new(),
    };
    BTreeMap::from([
        ("business_model".to_string(), pillar(2.0, "Sustainable business model", "Diversified revenue")),
        ("governance".to_string(), pillar(2.0, "Adequate internal governance", "Risk committee in place")),
        ("capital".to_string(), pillar(1.0, "Strong capital position", "CET1 well above requirements")),
        ("liquidity".to_string(), pillar(2.0, "Sound liquidity profile", "LCR above 120%")),
    ])
}

pub fn liquidity_metrics() -> BTreeMap<String, LiquidityMetricInput> {
    let metric = |current: f64, minimum: f64, internal: f64| LiquidityMetricInput {
        current_value: current,
        regulatory_minimum: minimum,
        internal_limit: Some(internal),
        currency: Some("EUR".into()),
        maturity_bucket: None,
    };
    BTreeMap::from([
        ("LCR".to_string(), metric(125.0, 100.0, 110.0)),
        ("NSFR".to_string(), metric(105.0, 100.0, 105.0)),
        ("Survival_Horizon".to_string(), metric(45.0, 30.0, 35.0)),
    ])
}

pub fn sensitivity_portfolio() -> BTreeMap<SensitivityFactor, FactorExposure> {
    BTreeMap::from([
        (
            SensitivityFactor::InterestRate,
            FactorExposure { notional: 100_000_000.0, duration: 4.5, delta: 1.0, ..FactorExposure::default() },
        ),
        (
            SensitivityFactor::CreditSpread,
            FactorExposure {
                notional: 50_000_000.0,
                duration: 3.2,
                spread_duration: Some(3.0),
                ..FactorExposure::default()
            },
        ),
        (
            SensitivityFactor::Equity,
            FactorExposure { notional: 20_000_000.0, delta: 0.8, ..FactorExposure::default() },
        ),
        (
            SensitivityFactor::Fx,
            FactorExposure { notional: 30_000_000.0, delta: 0.9, ..FactorExposure::default() },
        ),
        (
            SensitivityFactor::RealEstate,
            FactorExposure { notional: 15_000_000.0, delta: 1.0, ..FactorExposure::default() },
        ),
    ])
}

pub fn peer_metrics() -> BTreeMap<String, PeerMetricInput> {
    let peer = |own: f64, peers: &[f64]| PeerMetricInput {
        own_value: own,
        peer_values: peers.to_vec(),
    };
    BTreeMap::from([
        (
            "CET1_ratio".to_string(),
            peer(14.2, &[12.5, 13.1, 13.8, 14.5, 15.2, 13.9, 14.1, 12.8, 15.0, 13.5]),
        ),
        (
            "LCR".to_string(),
            peer(125.0, &[110.0, 115.0, 120.0, 125.0, 130.0, 118.0, 122.0, 135.0, 128.0, 112.0]),
        ),
        (
            "ROE".to_string(),
            peer(11.2, &[8.5, 9.2, 10.1, 11.5, 12.3, 9.8, 10.5, 8.9, 11.8, 10.2]),
        ),
        (
            "Cost_Income_Ratio".to_string(),
            peer(58.7, &[55.2, 62.1, 59.8, 57.3, 60.5, 63.2, 56.8, 61.4, 58.9, 59.1]),
        ),
    ])
}

/// Baseline metrics the named scenarios are applied to.
pub fn portfolio_snapshot() -> PortfolioSnapshot {
    [
        ("cet1_ratio", 14.2),
        ("tier1_ratio", 15.1),
        ("total_ratio", 17.5),
        ("lcr", 125.0),
        ("nsfr", 105.0),
        ("roe", 11.2),
        ("nim", 1.8),
        ("cost_of_risk", 0.35),
        ("leverage_ratio", 5.2),
        ("tier1_capital", 1_200_000_000.0),
        ("total_rwa", 8_000_000_000.0),
    ]
    .into_iter()
    .collect()
}

/// 24 month-end observations from January 2022 and noisy model predictions
/// for CET1, LCR and ROE.
pub fn backtest_history(bank: &RngBank) -> (TimeSeriesFrame, BTreeMap<String, Vec<f64>>) {
    let mut rng = bank.for_stream(StreamSlot::SampleData);
    let start = NaiveDate::from_ymd_opt(2022, 1, 31).unwrap_or_default();
    let dates: Vec<NaiveDate> = (0..24)
        .filter_map(|m| start.checked_add_months(Months::new(m)))
        .collect();
    let n = dates.len();

    let mut cet1 = Vec::with_capacity(n);
    let mut level = 14.0;
    for _ in 0..n {
        level += rng.normal(0.0, 0.1);
        cet1.push(level);
    }
    let tier1: Vec<f64> = cet1.iter().map(|c| c + 0.9 + rng.normal(0.0, 0.05)).collect();
    let total: Vec<f64> = tier1.iter().map(|t| t + 2.4 + rng.normal(0.0, 0.05)).collect();
    let lcr: Vec<f64> = (0..n).map(|_| rng.normal(125.0, 2.0)).collect();
    let nsfr: Vec<f64> = (0..n).map(|_| rng.normal(105.0, 1.5)).collect();
    let roe: Vec<f64> = (0..n).map(|_| rng.normal(11.0, 0.2)).collect();

    let mut noisy = |values: &[f64], sd: f64| -> Vec<f64> {
        values.iter().map(|v| v + rng.normal(0.0, sd)).collect()
    };
    let predictions = BTreeMap::from([
        ("cet1_ratio".to_string(), noisy(&cet1, 0.05)),
        ("lcr".to_string(), noisy(&lcr, 1.0)),
        ("roe".to_string(), noisy(&roe, 0.1)),
    ]);

    let frame = TimeSeriesFrame::new(dates)
        .with_column("cet1_ratio", cet1)
        .with_column("tier1_ratio", tier1)
        .with_column("total_ratio", total)
        .with_column("lcr", lcr)
        .with_column("nsfr", nsfr)
        .with_column("roe", roe);
    (frame, predictions)
}

pub fn stress_events() -> Vec<HistoricalStressEvent> {
    let event = |y, m, d, kind: &str, description: &str, impacts: &[(&str, f64)]| {
        HistoricalStressEvent {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            event_type: kind.into(),
            description: description.into(),
            impacts: data(impacts),
        }
    };
    vec![
        event(
            2020,
            3,
            1,
            "COVID",
            "Pandemic COVID-19",
            &[("cet1_ratio", -1.5), ("lcr", -20.0), ("roe", -3.0), ("cost_of_risk", 0.8)],
        ),
        event(
            2008,
            9,
            15,
            "Financial_Crisis",
            "Global financial crisis",
            &[("cet1_ratio", -3.0), ("lcr", -35.0), ("roe", -8.0), ("cost_of_risk", 2.5)],
        ),
    ]
}

pub fn stress_scenarios() -> BTreeMap<String, StressScenarioProfile> {
    BTreeMap::from([(
        "COVID_Scenario".to_string(),
        StressScenarioProfile {
            scenario_type: ScenarioType::SeverelyAdverse,
            description: "Pandemic scenario with economic lockdown".into(),
            severity: 1.0,
        },
    )])
}

pub fn allocation_lines() -> BTreeMap<String, BusinessLinePlan> {
    let line = |roe: f64, rwa_ratio: f64, capital: f64| BusinessLinePlan {
        roe_target: roe,
        rwa_ratio,
        current_capital: capital,
    };
    BTreeMap::from([
        ("Retail".to_string(), line(0.12, 0.6, 400_000_000.0)),
        ("Corporate".to_string(), line(0.10, 0.8, 500_000_000.0)),
        ("Markets".to_string(), line(0.15, 1.2, 300_000_000.0)),
    ])
}

pub fn cash_flows() -> CashFlowProjections {
    CashFlowProjections {
        monthly_net_flows: (1..=12)
            .map(|m| (m, if m % 3 == 0 { -30_000_000.0 } else { 50_000_000.0 }))
            .collect(),
        funding_growth: 0.03,
    }
}

/// Key-metric and RWA overview tables for each quarter of the current year
/// that closed at least 30 days before `as_of`, published on day 30.
pub fn publications(as_of: NaiveDate) -> PublicationLog {
    let mut log = PublicationLog::new();
    for (month, day) in [(3, 31), (6, 30), (9, 30)] {
        let Some(period_end) = NaiveDate::from_ymd_opt(as_of.year(), month, day) else {
            continue;
        };
        let published_on = period_end + Duration::days(30);
        if published_on <= as_of {
            for code in ["EU OV1", "EU KM1"] {
                log.record(code, period_end, published_on);
            }
        }
    }
    log
}

pub fn corep_data() -> ReportData {
    data(&[
        ("total_rwa", 15_000_000_000.0),
        ("credit_rwa", 12_000_000_000.0),
        ("market_rwa", 2_000_000_000.0),
        ("operational_rwa", 1_000_000_000.0),
        ("cet1_capital", 1_200_000_000.0),
        ("tier1_capital", 1_300_000_000.0),
        ("total_capital", 1_500_000_000.0),
    ])
}

pub fn finrep_data() -> ReportData {
    data(&[
        ("total_assets", 50_000_000_000.0),
        ("loans_advances", 35_000_000_000.0),
        ("debt_securities", 8_000_000_000.0),
        ("equity_instruments", 2_000_000_000.0),
        ("derivatives", 1_000_000_000.0),
        ("total_liabilities", 47_000_000_000.0),
        ("deposits", 40_000_000_000.0),
        ("debt_issued", 5_000_000_000.0),
        ("total_equity", 3_000_000_000.0),
        ("retained_earnings", 1_500_000_000.0),
    ])
}

pub fn lcr_data() -> ReportData {
    data(&[
        ("total_hqla", 5_000_000_000.0),
        ("level1_assets", 4_000_000_000.0),
        ("level2a_assets", 800_000_000.0),
        ("level2b_assets", 200_000_000.0),
        ("total_outflows", 4_500_000_000.0),
        ("retail_outflows", 2_000_000_000.0),
        ("wholesale_outflows", 2_500_000_000.0),
        ("total_inflows", 500_000_000.0),
    ])
}

/// The full sample input set as of `as_of`.
pub fn sample_inputs(bank: &RngBank, as_of: NaiveDate) -> RiskInputs {
    let (history, model_predictions) = backtest_history(bank);
    RiskInputs {
        as_of,
        book: exposure_book(),
        capital: CapitalAmounts {
            cet1_capital: 1_000_000_000.0,
            tier1_capital: 1_200_000_000.0,
            total_capital: 1_500_000_000.0,
        },
        icaap: icaap_input(),
        srep: srep_input(),
        liquidity: liquidity_metrics(),
        publications: publications(as_of),
        sensitivity_portfolio: sensitivity_portfolio(),
        peers: peer_metrics(),
        snapshot: portfolio_snapshot(),
        num_simulations: 1000,
        horizon_years: 3,
        history,
        projection_months: 12,
        current_capital: CurrentCapitalMetrics {
            cet1_ratio: 14.2,
            tier1_capital: 1_200_000_000.0,
            total_rwa: 8_000_000_000.0,
        },
        business_plan: BusinessPlan {
            rwa_growth_annual: Some(0.07),
            dividend_payout: 0.35,
            roe_target: 0.12,
        },
        planning_months: 24,
        cash_flows: cash_flows(),
        business_lines: allocation_lines(),
        allocation_bounds: BTreeMap::from([(
            "Markets".to_string(),
            AllocationBounds { min: None, max: Some(450_000_000.0) },
        )]),
        model_predictions,
        stress_scenarios: stress_scenarios(),
        stress_events: stress_events(),
        finrep: finrep_data(),
        lcr: lcr_data(),
    }
}
