//! Pillar 3: disclosure calendar, market sensitivity grid and peer
//! benchmarking.

use crate::config::Pillar3Config;
use crate::stats;
use crate::types::{Amount, Ratio};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// -------------------------------------------------------------- Disclosure --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisclosureFrequency {
    Quarterly,
    #[serde(rename = "Semi-annual")]
    SemiAnnual,
    Annual,
}

impl DisclosureFrequency {
    /// Period-end (month, day) pairs within a calendar year.
    fn period_ends(&self) -> &'static [(u32, u32)] {
        match self {
            Self::Quarterly => &[(3, 31), (6, 30), (9, 30), (12, 31)],
            Self::SemiAnnual => &[(6, 30), (12, 31)],
            Self::Annual => &[(12, 31)],
        }
    }

    /// How far back from the reference date a due date is still listed.
    fn lookback_days(&self) -> i64 {
        match self {
            Self::Quarterly => 90,
            Self::SemiAnnual => 180,
            Self::Annual => 365,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisclosureStatus {
    Overdue,
    Upcoming,
    Compliant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub table_code: String,
    pub period_end: NaiveDate,
    pub published_on: NaiveDate,
}

/// Publications already made, keyed by table and reporting period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationLog {
    pub records: Vec<PublicationRecord>,
}

impl PublicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table_code: &str, period_end: NaiveDate, published_on: NaiveDate) {
        self.records.push(PublicationRecord {
            table_code: table_code.to_string(),
            period_end,
            published_on,
        });
    }

    pub fn published_on(&self, table_code: &str, period_end: NaiveDate) -> Option<NaiveDate> {
        self.records
            .iter()
            .filter(|r| r.table_code == table_code && r.period_end == period_end)
            .map(|r| r.published_on)
            .min()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosureRequirement {
    pub table_code: String,
    pub table_name: String,
    pub frequency: DisclosureFrequency,
    pub mandatory: bool,
    pub period_end: NaiveDate,
    pub next_due: NaiveDate,
    pub last_published: Option<NaiveDate>,
    pub status: DisclosureStatus,
    pub days_until_due: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosureSchedule {
    pub reference_date: NaiveDate,
    pub total_requirements: usize,
    pub overdue_count: usize,
    pub upcoming_count: usize,
    pub compliant_count: usize,
    pub compliance_rate: Ratio,
    /// Sorted by due date, then table code.
    pub schedule_details: Vec<DisclosureRequirement>,
}

// ------------------------------------------------------------- Sensitivity --

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityFactor {
    InterestRate,
    CreditSpread,
    Equity,
    Fx,
    RealEstate,
}

impl SensitivityFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InterestRate => "interest_rate",
            Self::CreditSpread => "credit_spread",
            Self::Equity => "equity",
            Self::Fx => "fx",
            Self::RealEstate => "real_estate",
        }
    }
}

/// Position aggregate exposed to one risk factor.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FactorExposure {
    pub notional: Amount,
    pub duration: f64,
    /// Falls back to `duration` when absent.
    pub spread_duration: Option<f64>,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSensitivity {
    /// `<factor>_<shock name>`, e.g. `interest_rate_shock_up`.
    pub risk_factor: String,
    pub factor: SensitivityFactor,
    pub shock_size: f64,
    pub impact_on_capital: Amount,
    pub impact_on_earnings: Amount,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub total_scenarios: usize,
    /// Sum of absolute capital impacts.
    pub total_capital_impact: Amount,
    pub total_earnings_impact: Amount,
    pub most_significant_risks: Vec<MarketSensitivity>,
    pub sensitivity_details: Vec<MarketSensitivity>,
}

/// Capital and earnings impact of one shock on one factor.
pub fn factor_impact(factor: SensitivityFactor, shock: f64, exposure: &FactorExposure) -> (Amount, Amount) {
    let notional = exposure.notional;
    match factor {
        SensitivityFactor::InterestRate => {
            let capital = -exposure.duration * (shock / 10_000.0) * notional;
            (capital, capital * 0.5)
        }
        SensitivityFactor::CreditSpread => {
            let duration = exposure.spread_duration.unwrap_or(exposure.duration);
            let capital = -duration * (shock / 10_000.0) * notional;
            (capital, capital * 0.7)
        }
        SensitivityFactor::Equity | SensitivityFactor::Fx => {
            let capital = exposure.delta * (shock / 100.0) * notional;
            (capital, capital)
        }
        SensitivityFactor::RealEstate => {
            let capital = (shock / 100.0) * notional * 0.8;
            (capital, capital * 0.3)
        }
    }
}

fn by_capital_impact(results: &[MarketSensitivity], n: usize) -> Vec<MarketSensitivity> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| b.impact_on_capital.abs().total_cmp(&a.impact_on_capital.abs()));
    ranked.truncate(n);
    ranked
}

// ------------------------------------------------------------ Benchmarking --

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PeerMetricInput {
    pub own_value: f64,
    pub peer_values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatistics {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mean: f64,
    pub p25: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceBucket {
    #[serde(rename = "Top Quartile")]
    TopQuartile,
    #[serde(rename = "Above Median")]
    AboveMedian,
    #[serde(rename = "Below Median")]
    BelowMedian,
    #[serde(rename = "Bottom Quartile")]
    BottomQuartile,
    #[serde(rename = "No Data")]
    NoData,
}

impl PerformanceBucket {
    pub fn from_percentile(rank: Ratio) -> Self {
        match rank.value() {
            None => Self::NoData,
            Some(p) if p >= 75.0 => Self::TopQuartile,
            Some(p) if p >= 50.0 => Self::AboveMedian,
            Some(p) if p >= 25.0 => Self::BelowMedian,
            Some(_) => Self::BottomQuartile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerBenchmark {
    pub own_value: f64,
    pub peer_statistics: Option<PeerStatistics>,
    /// Share of peers strictly below the own value, in percent.
    pub percentile_rank: Ratio,
    pub vs_median: Option<f64>,
    pub vs_mean: Option<f64>,
    pub performance: PerformanceBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkingResult {
    /// Metrics with at least one peer value.
    pub metrics_analyzed: usize,
    pub overall_performance: PerformanceBucket,
    pub benchmarking_details: BTreeMap<String, PeerBenchmark>,
}

pub fn benchmark_metric(input: &PeerMetricInput) -> PeerBenchmark {
    let peers = &input.peer_values;
    let own = input.own_value;
    if peers.is_empty() {
        return PeerBenchmark {
            own_value: own,
            peer_statistics: None,
            percentile_rank: Ratio::Undefined,
            vs_median: None,
            vs_mean: None,
            performance: PerformanceBucket::NoData,
        };
    }
    let stats = PeerStatistics {
        min: stats::min(peers),
        max: stats::max(peers),
        median: stats::median(peers),
        mean: stats::mean(peers),
        p25: stats::percentile(peers, 25.0),
        p75: stats::percentile(peers, 75.0),
    };
    let better_than = peers.iter().filter(|&&v| own > v).count();
    let percentile_rank = Ratio::percent(better_than as f64, peers.len() as f64);
    PeerBenchmark {
        own_value: own,
        vs_median: Some(own - stats.median),
        vs_mean: Some(own - stats.mean),
        peer_statistics: Some(stats),
        percentile_rank,
        performance: PerformanceBucket::from_percentile(percentile_rank),
    }
}

// ----------------------------------------------------------------- Summary --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pillar3Summary {
    pub total_requirements: usize,
    pub overdue_publications: usize,
    pub upcoming_publications: usize,
    pub disclosure_compliant: bool,
    pub scenarios_analyzed: usize,
    pub highest_risk_factors: Vec<String>,
    pub total_capital_at_risk: Amount,
    pub key_actions: Vec<String>,
}

pub struct Pillar3Engine {
    config: Pillar3Config,
    pub disclosure_schedule: Vec<DisclosureRequirement>,
    pub sensitivity_results: Vec<MarketSensitivity>,
}

impl Pillar3Engine {
    pub fn new(config: Pillar3Config) -> Self {
        Self {
            config,
            disclosure_schedule: Vec::new(),
            sensitivity_results: Vec::new(),
        }
    }

    /// Due dates (with their period ends) listed for one frequency.
    fn due_dates(&self, reference_date: NaiveDate, frequency: DisclosureFrequency) -> Vec<(NaiveDate, NaiveDate)> {
        let deadline = Duration::days(self.config.publication_deadlines.for_frequency(frequency));
        let earliest = reference_date - Duration::days(frequency.lookback_days());
        frequency
            .period_ends()
            .iter()
            .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(reference_date.year(), m, d))
            .map(|period_end| (period_end, period_end + deadline))
            .filter(|&(_, due)| due >= earliest)
            .collect()
    }

    fn classify(&self, reference_date: NaiveDate, due: NaiveDate, published: Option<NaiveDate>) -> DisclosureStatus {
        if published.is_some() {
            DisclosureStatus::Compliant
        } else if due < reference_date {
            DisclosureStatus::Overdue
        } else if due <= reference_date + Duration::days(self.config.upcoming_window_days) {
            DisclosureStatus::Upcoming
        } else {
            DisclosureStatus::Compliant
        }
    }

    pub fn generate_disclosure_schedule(
        &mut self,
        reference_date: NaiveDate,
        publications: &PublicationLog,
    ) -> DisclosureSchedule {
        log::info!("pillar3: disclosure schedule as of {reference_date}");

        let mut schedule = Vec::new();
        for (code, table) in &self.config.disclosure_tables {
            for (period_end, due) in self.due_dates(reference_date, table.frequency) {
                let last_published = publications.published_on(code, period_end);
                schedule.push(DisclosureRequirement {
                    table_code: code.clone(),
                    table_name: table.name.clone(),
                    frequency: table.frequency,
                    mandatory: table.mandatory,
                    period_end,
                    next_due: due,
                    last_published,
                    status: self.classify(reference_date, due, last_published),
                    days_until_due: (due - reference_date).num_days(),
                });
            }
        }
        schedule.sort_by(|a, b| a.next_due.cmp(&b.next_due).then_with(|| a.table_code.cmp(&b.table_code)));

        let count = |status| schedule.iter().filter(|r| r.status == status).count();
        let overdue_count = count(DisclosureStatus::Overdue);
        let upcoming_count = count(DisclosureStatus::Upcoming);
        let compliant_count = count(DisclosureStatus::Compliant);
        if overdue_count > 0 {
            log::warn!("pillar3: {overdue_count} disclosure(s) overdue");
        }

        self.disclosure_schedule = schedule.clone();

        DisclosureSchedule {
            reference_date,
            total_requirements: schedule.len(),
            overdue_count,
            upcoming_count,
            compliant_count,
            compliance_rate: Ratio::percent(compliant_count as f64, schedule.len() as f64),
            schedule_details: schedule,
        }
    }

    pub fn calculate_market_sensitivity(
        &mut self,
        portfolio: &BTreeMap<SensitivityFactor, FactorExposure>,
    ) -> SensitivityAnalysis {
        log::info!("pillar3: market sensitivity over {} factors", portfolio.len());

        let empty = FactorExposure::default();
        let mut results = Vec::new();
        for (factor, shocks) in &self.config.sensitivity_scenarios {
            let exposure = portfolio.get(factor).unwrap_or(&empty);
            for (shock_name, &shock_size) in shocks {
                let (capital, earnings) = factor_impact(*factor, shock_size, exposure);
                results.push(MarketSensitivity {
                    risk_factor: format!("{}_{shock_name}", factor.as_str()),
                    factor: *factor,
                    shock_size,
                    impact_on_capital: capital,
                    impact_on_earnings: earnings,
                    confidence_level: self.config.sensitivity_confidence_level,
                });
            }
        }

        self.sensitivity_results = results.clone();

        SensitivityAnalysis {
            total_scenarios: results.len(),
            total_capital_impact: results.iter().map(|r| r.impact_on_capital.abs()).sum(),
            total_earnings_impact: results.iter().map(|r| r.impact_on_earnings.abs()).sum(),
            most_significant_risks: by_capital_impact(&results, 5),
            sensitivity_details: results,
        }
    }

    pub fn generate_peer_benchmarking(&self, peers: &BTreeMap<String, PeerMetricInput>) -> BenchmarkingResult {
        log::info!("pillar3: peer benchmarking over {} metrics", peers.len());

        let details: BTreeMap<String, PeerBenchmark> = peers
            .iter()
            .map(|(metric, input)| (metric.clone(), benchmark_metric(input)))
            .collect();
        let ranks: Vec<f64> = details.values().filter_map(|b| b.percentile_rank.value()).collect();
        let overall = if ranks.is_empty() {
            PerformanceBucket::NoData
        } else {
            PerformanceBucket::from_percentile(Ratio::Defined(stats::mean(&ranks)))
        };

        BenchmarkingResult {
            metrics_analyzed: ranks.len(),
            overall_performance: overall,
            benchmarking_details: details,
        }
    }

    pub fn generate_pillar3_summary(&self) -> Pillar3Summary {
        let count = |status| self.disclosure_schedule.iter().filter(|r| r.status == status).count();
        let overdue = count(DisclosureStatus::Overdue);
        let upcoming = count(DisclosureStatus::Upcoming);

        let mut key_actions = Vec::new();
        if overdue > 0 {
            key_actions.push(format!("Publish {overdue} overdue disclosure(s)"));
        }
        if upcoming > 0 {
            key_actions.push(format!("Prepare {upcoming} upcoming disclosure(s)"));
        }
        if self
            .sensitivity_results
            .iter()
            .any(|r| r.impact_on_capital.abs() > self.config.high_impact_threshold)
        {
            key_actions.push("Review management of high-impact market risks".to_string());
        }

        Pillar3Summary {
            total_requirements: self.disclosure_schedule.len(),
            overdue_publications: overdue,
            upcoming_publications: upcoming,
            disclosure_compliant: overdue == 0,
            scenarios_analyzed: self.sensitivity_results.len(),
            highest_risk_factors: by_capital_impact(&self.sensitivity_results, 3)
                .into_iter()
                .map(|r| r.risk_factor)
                .collect(),
            total_capital_at_risk: self
                .sensitivity_results
                .iter()
                .map(|r| r.impact_on_capital.abs())
                .sum(),
            key_actions,
        }
    }
}
