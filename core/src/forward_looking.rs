//! Forward-looking analysis: capital ratio projections, dynamic capital
//! planning, liquidity forecasts and capital allocation across business lines.
//!
//! Projections blend an OLS trend over the observation index with a seeded
//! bootstrap ensemble of one-feature regression trees. Confidence bands are
//! computed on the blended value before the regulatory floor is applied.

use crate::config::ForwardLookingConfig;
use crate::rng::{EngineRng, StreamSlot};
use crate::stats::{self, LinearTrend};
use crate::types::{Amount, Ratio};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const CAPITAL_RATIOS: [&str; 3] = ["cet1_ratio", "tier1_ratio", "total_ratio"];
const Z_95: f64 = 1.96;

/// Dated observations with named numeric columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeriesFrame {
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl TimeSeriesFrame {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Self {
        self.columns.insert(name.to_string(), values);
        self
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn last(&self, name: &str) -> Option<f64> {
        self.column(name).and_then(|c| c.last().copied())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

// -------------------------------------------------------------- Projections --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionAssumptions {
    pub historical_periods: usize,
    pub trend_component: f64,
    pub intercept: f64,
    pub residual_volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub metric_name: String,
    pub projection_date: NaiveDate,
    pub projected_value: f64,
    pub confidence_interval_lower: f64,
    pub confidence_interval_upper: f64,
    pub methodology: String,
    pub assumptions: ProjectionAssumptions,
}

/// Bagged, fully grown regression trees on the single feature "index".
///
/// With one feature and no depth limit every distinct sampled index is its
/// own leaf and splits sit at midpoints, so a member predicts the value of
/// the sampled index nearest to `x`. Past either end of the sample it
/// predicts the outermost sampled observation.
struct BootstrapEnsemble {
    members: Vec<Vec<usize>>,
}

impl BootstrapEnsemble {
    fn fit(n: usize, members: usize, rng: &mut EngineRng) -> Self {
        let members = (0..members)
            .map(|_| {
                let mut sample: Vec<usize> = (0..n).map(|_| rng.next_index(n)).collect();
                sample.sort_unstable();
                sample.dedup();
                sample
            })
            .collect();
        Self { members }
    }

    fn predict(&self, y: &[f64], x: f64) -> f64 {
        let predictions: Vec<f64> = self
            .members
            .iter()
            .filter_map(|sample| nearest_leaf(sample, x).map(|i| y[i]))
            .collect();
        stats::mean(&predictions)
    }
}

fn nearest_leaf(sample: &[usize], x: f64) -> Option<usize> {
    let mut leaf = *sample.first()?;
    for pair in sample.windows(2) {
        let split = (pair[0] + pair[1]) as f64 / 2.0;
        if x > split {
            leaf = pair[1];
        }
    }
    Some(leaf)
}

// ------------------------------------------------------------- Capital plan --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentCapitalMetrics {
    pub cet1_ratio: f64,
    pub tier1_capital: Amount,
    pub total_rwa: Amount,
}

impl Default for CurrentCapitalMetrics {
    fn default() -> Self {
        Self {
            cet1_ratio: 14.0,
            tier1_capital: 1_000_000_000.0,
            total_rwa: 8_000_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessPlan {
    /// Falls back to the configured RWA growth assumption.
    pub rwa_growth_annual: Option<f64>,
    pub dividend_payout: f64,
    pub roe_target: f64,
}

impl Default for BusinessPlan {
    fn default() -> Self {
        Self {
            rwa_growth_annual: None,
            dividend_payout: 0.4,
            roe_target: 0.11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapitalActionType {
    #[serde(rename = "Capital_Increase")]
    CapitalIncrease,
    #[serde(rename = "Retained_Earnings")]
    RetainedEarnings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalAction {
    pub month: usize,
    pub action_type: CapitalActionType,
    pub amount: Amount,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalPlan {
    pub plan_id: String,
    pub planning_horizon: usize,
    pub target_cet1_ratio: f64,
    pub current_capital: Amount,
    /// Shortfall per month before any action, never negative.
    pub projected_capital_needs: Vec<Amount>,
    /// CET1 ratio per month after that month's action.
    pub projected_cet1_ratios: Vec<f64>,
    pub capital_actions: Vec<CapitalAction>,
    pub stress_buffer: Amount,
}

impl CapitalPlan {
    pub fn total_capital_needs(&self) -> Amount {
        self.projected_capital_needs.iter().sum()
    }
}

// ---------------------------------------------------------------- Liquidity --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CashFlowProjections {
    /// Net cash flow per month, keyed by month number starting at 1.
    pub monthly_net_flows: BTreeMap<usize, Amount>,
    /// Annual growth of stable funding.
    pub funding_growth: f64,
}

impl Default for CashFlowProjections {
    fn default() -> Self {
        Self {
            monthly_net_flows: BTreeMap::new(),
            funding_growth: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityForecast {
    pub forecast_date: NaiveDate,
    pub lcr_forecast: f64,
    pub nsfr_forecast: f64,
    pub cash_flow_forecast: Amount,
    pub funding_gap: Amount,
    pub recommended_actions: Vec<String>,
}

// --------------------------------------------------------------- Allocation --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLinePlan {
    pub roe_target: f64,
    pub rwa_ratio: f64,
    pub current_capital: Amount,
}

/// Per-line allocation bounds; absent bounds default to 0.5× and 2× the
/// line's current capital.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationBounds {
    pub min: Option<Amount>,
    pub max: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAllocation {
    pub current_capital: Amount,
    pub optimal_capital: Amount,
    pub change: Amount,
    pub change_percentage: Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub optimization_successful: bool,
    pub message: Option<String>,
    pub current_roe: Ratio,
    pub optimal_roe: Ratio,
    pub roe_improvement: Ratio,
    pub allocations: BTreeMap<String, LineAllocation>,
}

impl AllocationResult {
    fn failed(message: String) -> Self {
        log::warn!("forward_looking: capital allocation failed: {message}");
        Self {
            optimization_successful: false,
            message: Some(message),
            current_roe: Ratio::Undefined,
            optimal_roe: Ratio::Undefined,
            roe_improvement: Ratio::Undefined,
            allocations: BTreeMap::new(),
        }
    }
}

// ------------------------------------------------------------------ Summary --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionTrend {
    pub current_trend: String,
    pub twelve_month_projection: Option<f64>,
    pub confidence_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalPlanSummary {
    pub total_capital_needs: Amount,
    pub number_of_actions: usize,
    pub stress_buffer: Amount,
    pub planning_horizon: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardLookingSummary {
    pub projections_summary: BTreeMap<String, ProjectionTrend>,
    pub capital_plans_summary: BTreeMap<String, CapitalPlanSummary>,
    pub liquidity_forecasts_count: usize,
    pub key_insights: Vec<String>,
}

// ------------------------------------------------------------------- Engine --

pub struct ForwardLookingAnalyzer {
    config: ForwardLookingConfig,
    pub projections: BTreeMap<String, Vec<Projection>>,
    pub capital_plans: BTreeMap<String, CapitalPlan>,
    pub liquidity_forecasts: Vec<LiquidityForecast>,
}

impl ForwardLookingAnalyzer {
    pub fn new(config: ForwardLookingConfig) -> Self {
        Self {
            config,
            projections: BTreeMap::new(),
            capital_plans: BTreeMap::new(),
            liquidity_forecasts: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForwardLookingConfig {
        &self.config
    }

    fn ratio_floor(&self, ratio: &str) -> f64 {
        let targets = &self.config.capital_targets;
        match ratio {
            "cet1_ratio" => targets.cet1_minimum,
            "tier1_ratio" => targets.tier1_minimum,
            _ => targets.total_minimum,
        }
    }

    /// Monthly projections of CET1, Tier 1 and total capital ratios.
    /// Ratios absent from `history` are skipped with a warning.
    pub fn project_capital_ratios(
        &mut self,
        history: &TimeSeriesFrame,
        horizon_months: usize,
        as_of: NaiveDate,
    ) -> BTreeMap<String, Vec<Projection>> {
        log::info!("forward_looking: projecting capital ratios over {horizon_months} months");
        let ensemble_cfg = &self.config.ensemble;
        let weight = ensemble_cfg.linear_weight.clamp(0.0, 1.0);
        let mut rng = EngineRng::new(ensemble_cfg.seed, StreamSlot::ProjectionEnsemble as u64)
            .with_name(StreamSlot::ProjectionEnsemble.name());

        let mut projections = BTreeMap::new();
        for ratio in CAPITAL_RATIOS {
            let y = match history.column(ratio) {
                Some(y) if !y.is_empty() => y,
                _ => {
                    log::warn!("forward_looking: ratio {ratio} missing from history, skipped");
                    continue;
                }
            };
            let n = y.len();
            let trend = LinearTrend::fit(y);
            let residual_std = stats::std_dev(&trend.residuals(y));
            let ensemble = BootstrapEnsemble::fit(n, ensemble_cfg.members, &mut rng);
            let margin = Z_95 * residual_std * (1.0 + 1.0 / n as f64).sqrt();
            let floor = self.ratio_floor(ratio);

            let series: Vec<Projection> = (1..=horizon_months)
                .map(|month| {
                    let x = (n - 1 + month) as f64;
                    let blended =
                        weight * trend.predict(x) + (1.0 - weight) * ensemble.predict(y, x);
                    Projection {
                        metric_name: ratio.to_string(),
                        projection_date: as_of + Duration::days(30 * month as i64),
                        projected_value: blended.max(floor),
                        confidence_interval_lower: blended - margin,
                        confidence_interval_upper: blended + margin,
                        methodology: "Linear + Bootstrap Ensemble".into(),
                        assumptions: ProjectionAssumptions {
                            historical_periods: n,
                            trend_component: trend.slope,
                            intercept: trend.intercept,
                            residual_volatility: residual_std,
                        },
                    }
                })
                .collect();
            log::debug!(
                "forward_looking: {ratio} slope={:.4} residual_std={residual_std:.4}",
                trend.slope
            );
            projections.insert(ratio.to_string(), series);
        }

        self.projections.extend(projections.clone());
        projections
    }

    /// Month-by-month capital plan against the CET1 target plus buffers.
    /// An action covering the month's shortfall is applied the same month.
    pub fn create_dynamic_capital_plan(
        &mut self,
        current: &CurrentCapitalMetrics,
        plan: &BusinessPlan,
        horizon_months: usize,
    ) -> CapitalPlan {
        log::info!("forward_looking: capital plan over {horizon_months} months");
        let targets = &self.config.capital_targets;
        let required_rate = (targets.cet1_target + targets.cet1_buffer + targets.cet1_stress_buffer)
            / 100.0;
        let rwa_growth_monthly = plan
            .rwa_growth_annual
            .unwrap_or(self.config.growth_assumptions.rwa_growth)
            / 12.0;
        let monthly_roe = plan.roe_target / 12.0;

        let mut rwa = current.total_rwa;
        let mut capital = current.tier1_capital;
        let mut needs = Vec::with_capacity(horizon_months);
        let mut ratios = Vec::with_capacity(horizon_months);
        let mut actions = Vec::new();

        for month in 1..=horizon_months {
            rwa *= 1.0 + rwa_growth_monthly;
            capital += capital * monthly_roe * (1.0 - plan.dividend_payout);

            let gap = rwa * required_rate - capital;
            needs.push(gap.max(0.0));

            let action_type = if gap >= self.config.capital_increase_threshold {
                Some(CapitalActionType::CapitalIncrease)
            } else if gap >= self.config.retained_earnings_threshold {
                Some(CapitalActionType::RetainedEarnings)
            } else {
                None
            };
            if let Some(action_type) = action_type {
                let description = match action_type {
                    CapitalActionType::CapitalIncrease => {
                        format!("Capital increase of {:.0}M", gap / 1e6)
                    }
                    CapitalActionType::RetainedEarnings => {
                        format!("Additional retention of {:.0}M", gap / 1e6)
                    }
                };
                log::debug!("forward_looking: month {month} {description}");
                actions.push(CapitalAction {
                    month,
                    action_type,
                    amount: gap,
                    description,
                });
                capital += gap;
            }
            ratios.push(Ratio::percent(capital, rwa).unwrap_or(0.0));
        }

        let stress_buffer = (current.tier1_capital * 0.15).max(rwa * 0.02);
        let capital_plan = CapitalPlan {
            plan_id: format!("CAP_PLAN_{}", Uuid::new_v4().simple()),
            planning_horizon: horizon_months,
            target_cet1_ratio: targets.cet1_target,
            current_capital: current.tier1_capital,
            projected_capital_needs: needs,
            projected_cet1_ratios: ratios,
            capital_actions: actions,
            stress_buffer,
        };
        self.capital_plans
            .insert(capital_plan.plan_id.clone(), capital_plan.clone());
        capital_plan
    }

    /// LCR and NSFR forecasts from their historical trend, monthly cash
    /// flows and stable-funding growth.
    pub fn forecast_liquidity_metrics(
        &mut self,
        history: &TimeSeriesFrame,
        cash_flows: &CashFlowProjections,
        horizon_months: usize,
        as_of: NaiveDate,
    ) -> Vec<LiquidityForecast> {
        log::info!("forward_looking: liquidity forecast over {horizon_months} months");
        let targets = &self.config.liquidity_targets;
        let current_lcr = history.last("lcr").unwrap_or(120.0);
        let current_nsfr = history.last("nsfr").unwrap_or(105.0);
        let slope = |name: &str| history.column(name).map_or(0.0, trend_slope);
        let lcr_trend = slope("lcr");
        let nsfr_trend = slope("nsfr");

        let forecasts: Vec<LiquidityForecast> = (1..=horizon_months)
            .map(|month| {
                let m = month as f64;
                let cash_flow = cash_flows.monthly_net_flows.get(&month).copied().unwrap_or(0.0);
                let lcr = current_lcr
                    + lcr_trend * m
                    + cash_flow * self.config.lcr_points_per_cash_flow;
                let nsfr =
                    (current_nsfr + nsfr_trend * m) * (1.0 + cash_flows.funding_growth * m / 12.0);
                let funding_gap = if lcr < targets.lcr_target {
                    (targets.lcr_target - lcr) * self.config.funding_gap_per_lcr_point
                } else {
                    0.0
                };

                let mut actions = Vec::new();
                if lcr < targets.lcr_minimum {
                    actions.push("Increase high-quality liquid assets".to_string());
                }
                if nsfr < targets.nsfr_minimum {
                    actions.push("Lengthen funding maturity".to_string());
                }
                if funding_gap > self.config.funding_gap_action_threshold {
                    actions.push("Raise additional stable funding".to_string());
                }

                LiquidityForecast {
                    forecast_date: as_of + Duration::days(30 * month as i64),
                    lcr_forecast: lcr,
                    nsfr_forecast: nsfr,
                    cash_flow_forecast: cash_flow,
                    funding_gap,
                    recommended_actions: actions,
                }
            })
            .collect();

        self.liquidity_forecasts.extend(forecasts.iter().cloned());
        forecasts
    }

    /// Maximise capital-weighted ROE with total capital conserved and each
    /// line inside its bounds.
    ///
    /// The objective is linear, so the optimum fills lines in descending ROE
    /// order starting from every line at its minimum.
    pub fn optimize_capital_allocation(
        &self,
        business_lines: &BTreeMap<String, BusinessLinePlan>,
        constraints: &BTreeMap<String, AllocationBounds>,
    ) -> AllocationResult {
        log::info!(
            "forward_looking: optimising allocation over {} business lines",
            business_lines.len()
        );
        if business_lines.is_empty() {
            return AllocationResult::failed("no business lines to allocate".into());
        }

        let total_capital: Amount = business_lines.values().map(|l| l.current_capital).sum();
        let mut bounds = BTreeMap::new();
        for (name, line) in business_lines {
            let given = constraints.get(name).cloned().unwrap_or_default();
            let lo = given.min.unwrap_or(line.current_capital * 0.5);
            let hi = given.max.unwrap_or(line.current_capital * 2.0);
            if lo > hi {
                return AllocationResult::failed(format!(
                    "bounds for {name} are inverted ({lo:.0} > {hi:.0})"
                ));
            }
            bounds.insert(name.as_str(), (lo, hi));
        }

        let floor_sum: Amount = bounds.values().map(|(lo, _)| lo).sum();
        let cap_sum: Amount = bounds.values().map(|(_, hi)| hi).sum();
        if total_capital < floor_sum || total_capital > cap_sum {
            return AllocationResult::failed(format!(
                "total capital {total_capital:.0} outside feasible range [{floor_sum:.0}, {cap_sum:.0}]"
            ));
        }

        let mut optimal: BTreeMap<&str, Amount> =
            bounds.iter().map(|(name, (lo, _))| (*name, *lo)).collect();
        let mut by_roe: Vec<(&String, &BusinessLinePlan)> = business_lines.iter().collect();
        by_roe.sort_by(|a, b| b.1.roe_target.total_cmp(&a.1.roe_target).then(a.0.cmp(b.0)));
        let mut remaining = total_capital - floor_sum;
        for (name, _) in by_roe {
            if remaining <= 0.0 {
                break;
            }
            let Some((lo, hi)) = bounds.get(name.as_str()) else {
                continue;
            };
            let add = remaining.min(hi - lo);
            if let Some(slot) = optimal.get_mut(name.as_str()) {
                *slot += add;
            }
            remaining -= add;
        }

        let current_weighted: f64 = business_lines
            .values()
            .map(|line| line.current_capital * line.roe_target)
            .sum();
        let optimal_weighted: f64 = business_lines
            .iter()
            .map(|(name, line)| optimal.get(name.as_str()).copied().unwrap_or(0.0) * line.roe_target)
            .sum();
        let current_roe = Ratio::of(current_weighted, total_capital);
        let optimal_roe = Ratio::of(optimal_weighted, total_capital);
        let roe_improvement = match (optimal_roe, current_roe) {
            (Ratio::Defined(o), Ratio::Defined(c)) => Ratio::Defined(o - c),
            _ => Ratio::Undefined,
        };

        let allocations = business_lines
            .iter()
            .map(|(name, line)| {
                let optimal_capital = optimal.get(name.as_str()).copied().unwrap_or(0.0);
                let change = optimal_capital - line.current_capital;
                let allocation = LineAllocation {
                    current_capital: line.current_capital,
                    optimal_capital,
                    change,
                    change_percentage: Ratio::percent(change, line.current_capital),
                };
                (name.clone(), allocation)
            })
            .collect();

        AllocationResult {
            optimization_successful: true,
            message: None,
            current_roe,
            optimal_roe,
            roe_improvement,
            allocations,
        }
    }

    pub fn generate_forward_looking_summary(&self) -> ForwardLookingSummary {
        let projections_summary = self
            .projections
            .iter()
            .filter_map(|(metric, series)| {
                let first = series.first()?;
                let last = series.last()?;
                let trend = ProjectionTrend {
                    current_trend: if last.projected_value > first.projected_value {
                        "Increasing".into()
                    } else {
                        "Decreasing".into()
                    },
                    twelve_month_projection: series.get(11).map(|p| p.projected_value),
                    confidence_range: format!(
                        "{:.1} - {:.1}",
                        last.confidence_interval_lower, last.confidence_interval_upper
                    ),
                };
                Some((metric.clone(), trend))
            })
            .collect();

        let capital_plans_summary = self
            .capital_plans
            .iter()
            .map(|(id, plan)| {
                let summary = CapitalPlanSummary {
                    total_capital_needs: plan.total_capital_needs(),
                    number_of_actions: plan.capital_actions.len(),
                    stress_buffer: plan.stress_buffer,
                    planning_horizon: plan.planning_horizon,
                };
                (id.clone(), summary)
            })
            .collect();

        ForwardLookingSummary {
            projections_summary,
            capital_plans_summary,
            liquidity_forecasts_count: self.liquidity_forecasts.len(),
            key_insights: self.key_insights(),
        }
    }

    fn key_insights(&self) -> Vec<String> {
        let mut insights = Vec::new();
        if let Some(series) = self.projections.get("cet1_ratio") {
            if let (Some(first), Some(last)) = (series.first(), series.last()) {
                let drift = last.projected_value - first.projected_value;
                if drift < -1.0 {
                    insights.push("CET1 ratio trending down, needs close monitoring".to_string());
                } else if drift > 1.0 {
                    insights.push("CET1 ratio projected to improve, room for growth".to_string());
                }
            }
        }
        if self
            .capital_plans
            .values()
            .any(|p| p.total_capital_needs() > self.config.capital_needs_insight_threshold)
        {
            insights.push("Significant capital needs identified, plan issuance early".to_string());
        }
        insights
    }
}

fn trend_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    LinearTrend::fit(values).slope
}
