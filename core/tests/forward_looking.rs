//! Forward-looking integration tests: ratio projections, capital planning,
//! liquidity forecasts and capital allocation.

use chrono::{Duration, NaiveDate};
use crorisk_core::{
    config::ForwardLookingConfig,
    forward_looking::{
        AllocationBounds, BusinessLinePlan, BusinessPlan, CapitalActionType, CashFlowProjections,
        CurrentCapitalMetrics, ForwardLookingAnalyzer, TimeSeriesFrame,
    },
    rng::RngBank,
    sample,
};
use std::collections::BTreeMap;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

fn frame(columns: &[(&str, Vec<f64>)]) -> TimeSeriesFrame {
    let n = columns.first().map_or(0, |(_, v)| v.len());
    let dates = (0..n).map(|i| as_of() - Duration::days(30 * (n - i) as i64)).collect();
    columns
        .iter()
        .fold(TimeSeriesFrame::new(dates), |f, (name, values)| {
            f.with_column(name, values.clone())
        })
}

fn trend_only() -> ForwardLookingAnalyzer {
    let mut config = ForwardLookingConfig::default();
    config.ensemble.linear_weight = 1.0;
    ForwardLookingAnalyzer::new(config)
}

#[test]
fn linear_history_extrapolates_exactly() {
    let cet1: Vec<f64> = (0..24).map(|i| 10.0 + 0.1 * i as f64).collect();
    let mut fla = trend_only();
    let projections = fla.project_capital_ratios(&frame(&[("cet1_ratio", cet1)]), 12, as_of());

    let series = &projections["cet1_ratio"];
    assert_eq!(series.len(), 12);
    assert!(close(series[0].projected_value, 12.4), "got {}", series[0].projected_value);
    assert!(close(series[11].projected_value, 13.5));
    assert_eq!(series[0].projection_date, as_of() + Duration::days(30));
    assert_eq!(series[11].projection_date, as_of() + Duration::days(360));
    assert_eq!(series[0].assumptions.historical_periods, 24);
    assert!(close(series[0].assumptions.trend_component, 0.1));
    // A perfect fit leaves no residual, so the band collapses.
    assert!((series[0].confidence_interval_upper - series[0].confidence_interval_lower).abs() < 1e-9);
}

#[test]
fn missing_ratios_are_skipped() {
    let mut fla = trend_only();
    let projections =
        fla.project_capital_ratios(&frame(&[("cet1_ratio", vec![14.0; 12])]), 6, as_of());
    assert_eq!(projections.len(), 1);
    assert!(projections.contains_key("cet1_ratio"));
}

/// Projected values never fall below the regulatory minimum, the band may.
#[test]
fn projections_are_floored_at_minimum() {
    let falling: Vec<f64> = (0..12).map(|i| 8.0 - 0.5 * i as f64).collect();
    let mut fla = trend_only();
    let projections = fla.project_capital_ratios(&frame(&[("cet1_ratio", falling)]), 6, as_of());
    for p in &projections["cet1_ratio"] {
        assert!(p.projected_value >= 4.5);
        assert!(p.confidence_interval_lower < 4.5);
    }
}

/// With the ensemble blended in, two runs with one ensemble seed agree.
#[test]
fn ensemble_projection_is_deterministic() {
    let (history, _) = sample::backtest_history(&RngBank::new(11));
    let run = || {
        let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
        fla.project_capital_ratios(&history, 12, as_of())
    };
    let a = serde_json::to_string(&run()).unwrap();
    let b = serde_json::to_string(&run()).unwrap();
    assert_eq!(a, b);
    assert_eq!(run().len(), 3);
}

#[test]
fn plan_has_one_entry_per_month() {
    let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let plan = fla.create_dynamic_capital_plan(
        &CurrentCapitalMetrics::default(),
        &BusinessPlan::default(),
        24,
    );
    assert!(plan.plan_id.starts_with("CAP_PLAN_"));
    assert_eq!(plan.planning_horizon, 24);
    assert_eq!(plan.projected_capital_needs.len(), 24);
    assert_eq!(plan.projected_cet1_ratios.len(), 24);
}

/// A 120M shortfall triggers a capital increase in month 1 that restores
/// the 14% requirement; the plan stays above it afterwards.
#[test]
fn large_shortfall_triggers_capital_increase() {
    let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let current = CurrentCapitalMetrics {
        cet1_ratio: 12.5,
        tier1_capital: 1_000_000_000.0,
        total_rwa: 8_000_000_000.0,
    };
    let plan = fla.create_dynamic_capital_plan(
        &current,
        &BusinessPlan {
            rwa_growth_annual: Some(0.07),
            dividend_payout: 0.35,
            roe_target: 0.12,
        },
        12,
    );

    let first = &plan.capital_actions[0];
    assert_eq!(first.month, 1);
    assert_eq!(first.action_type, CapitalActionType::CapitalIncrease);
    assert!(first.amount >= 100_000_000.0);
    assert!(close(plan.projected_cet1_ratios[0], 14.0));
    assert!(plan.projected_cet1_ratios.iter().all(|r| *r >= 14.0 - 1e-9));
    assert!(close(plan.total_capital_needs(), plan.projected_capital_needs.iter().sum()));
}

#[test]
fn moderate_shortfall_uses_retained_earnings() {
    let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let current = CurrentCapitalMetrics {
        cet1_ratio: 13.1,
        tier1_capital: 1_050_000_000.0,
        total_rwa: 8_000_000_000.0,
    };
    let plan = fla.create_dynamic_capital_plan(
        &current,
        &BusinessPlan {
            rwa_growth_annual: Some(0.07),
            dividend_payout: 0.35,
            roe_target: 0.12,
        },
        1,
    );
    assert_eq!(plan.capital_actions.len(), 1);
    assert_eq!(
        plan.capital_actions[0].action_type,
        CapitalActionType::RetainedEarnings
    );
}

#[test]
fn liquidity_forecast_adds_cash_flows_and_funding_growth() {
    let history = frame(&[("lcr", vec![125.0; 12]), ("nsfr", vec![105.0; 12])]);
    let cash_flows = CashFlowProjections {
        monthly_net_flows: BTreeMap::from([(1, 50_000_000.0)]),
        funding_growth: 0.03,
    };
    let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let forecasts = fla.forecast_liquidity_metrics(&history, &cash_flows, 12, as_of());

    assert_eq!(forecasts.len(), 12);
    assert!(close(forecasts[0].lcr_forecast, 125.1));
    assert!(close(forecasts[0].cash_flow_forecast, 50_000_000.0));
    assert!(close(forecasts[1].lcr_forecast, 125.0));
    assert!(close(forecasts[11].nsfr_forecast, 105.0 * 1.03));
    assert!(forecasts.iter().all(|f| f.funding_gap == 0.0));
    assert!(forecasts.iter().all(|f| f.recommended_actions.is_empty()));
}

#[test]
fn weak_liquidity_triggers_actions() {
    let history = frame(&[("lcr", vec![95.0; 6]), ("nsfr", vec![98.0; 6])]);
    let mut fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let forecasts =
        fla.forecast_liquidity_metrics(&history, &CashFlowProjections::default(), 3, as_of());

    let first = &forecasts[0];
    // 25 LCR points below target at 50M each
    assert!(close(first.funding_gap, 1_250_000_000.0));
    for action in [
        "Increase high-quality liquid assets",
        "Lengthen funding maturity",
        "Raise additional stable funding",
    ] {
        assert!(first.recommended_actions.iter().any(|a| a == action), "missing {action}");
    }
}

/// Lines fill in descending ROE order from their minimums.
#[test]
fn allocation_moves_capital_to_higher_roe() {
    let fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let bounds = BTreeMap::from([(
        "Markets".to_string(),
        AllocationBounds {
            min: None,
            max: Some(450_000_000.0),
        },
    )]);
    let result = fla.optimize_capital_allocation(&sample::allocation_lines(), &bounds);

    assert!(result.optimization_successful);
    let optimal = |name: &str| result.allocations[name].optimal_capital;
    assert!(close(optimal("Markets"), 450_000_000.0));
    assert!(close(optimal("Retail"), 500_000_000.0));
    assert!(close(optimal("Corporate"), 250_000_000.0));

    let total: f64 = result.allocations.values().map(|a| a.optimal_capital).sum();
    assert!(close(total, 1_200_000_000.0));
    assert!(close(result.current_roe.unwrap_or(0.0), 143.0 / 1_200.0));
    assert!(close(result.optimal_roe.unwrap_or(0.0), 152.5 / 1_200.0));
    assert!(result.roe_improvement.unwrap_or(0.0) > 0.0);
}

#[test]
fn infeasible_or_inverted_bounds_fail() {
    let fla = ForwardLookingAnalyzer::new(ForwardLookingConfig::default());
    let lines = sample::allocation_lines();

    let tight: BTreeMap<String, AllocationBounds> = lines
        .iter()
        .map(|(name, line)| {
            let bounds = AllocationBounds {
                min: Some(line.current_capital * 0.5),
                max: Some(line.current_capital * 0.9),
            };
            (name.clone(), bounds)
        })
        .collect();
    let result = fla.optimize_capital_allocation(&lines, &tight);
    assert!(!result.optimization_successful);
    assert!(result.message.is_some());

    let inverted = BTreeMap::from([(
        "Retail".to_string(),
        AllocationBounds {
            min: Some(10.0),
            max: Some(1.0),
        },
    )]);
    assert!(!fla.optimize_capital_allocation(&lines, &inverted).optimization_successful);

    let empty: BTreeMap<String, BusinessLinePlan> = BTreeMap::new();
    assert!(!fla.optimize_capital_allocation(&empty, &BTreeMap::new()).optimization_successful);
}

#[test]
fn summary_reports_improving_cet1_and_counts() {
    let cet1: Vec<f64> = (0..24).map(|i| 10.0 + 0.1 * i as f64).collect();
    let history = frame(&[("cet1_ratio", cet1), ("lcr", vec![125.0; 24])]);
    let mut fla = trend_only();
    fla.project_capital_ratios(&history, 12, as_of());
    fla.forecast_liquidity_metrics(&history, &sample::cash_flows(), 6, as_of());
    fla.create_dynamic_capital_plan(&CurrentCapitalMetrics::default(), &BusinessPlan::default(), 12);

    let summary = fla.generate_forward_looking_summary();
    let trend = &summary.projections_summary["cet1_ratio"];
    assert_eq!(trend.current_trend, "Increasing");
    assert!(close(trend.twelve_month_projection.unwrap_or(0.0), 13.5));
    assert_eq!(summary.capital_plans_summary.len(), 1);
    assert_eq!(summary.liquidity_forecasts_count, 6);
    assert!(summary
        .key_insights
        .iter()
        .any(|i| i.contains("improve")));
}
