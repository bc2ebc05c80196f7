//! Scenario integration tests: named scenario sets, custom scenarios and the
//! macro-to-metric transmission rules.

use crorisk_core::{
    config::ScenarioConfig,
    error::RiskError,
    rng::RngBank,
    sample,
    scenario::{CustomScenarioConfig, MacroVariable, ScenarioEngine, ScenarioType, ShockUnit},
    snapshot::PortfolioSnapshot,
};
use std::collections::BTreeMap;

fn engine() -> ScenarioEngine {
    ScenarioEngine::new(ScenarioConfig::default(), RngBank::new(42))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

#[test]
fn eba_set_has_three_full_scenarios() {
    let scenarios = engine().create_eba_scenarios(2024);
    let ids: Vec<&str> = scenarios.keys().map(String::as_str).collect();
    assert_eq!(ids, ["EBA_Adverse", "EBA_Baseline", "EBA_Severely_Adverse"]);
    for scenario in scenarios.values() {
        assert_eq!(scenario.horizon_years, 3);
        assert_eq!(scenario.variables.len(), MacroVariable::ALL.len());
        assert!(scenario.validate().is_ok());
        assert!(scenario.description.contains("2024"));
    }
    assert_eq!(
        scenarios["EBA_Severely_Adverse"].scenario_type,
        ScenarioType::SeverelyAdverse
    );
}

#[test]
fn fed_set_has_baseline_and_severely_adverse() {
    let scenarios = engine().create_fed_scenarios(2024);
    assert_eq!(scenarios.len(), 2);
    assert!(scenarios.contains_key("Fed_Baseline"));
    assert!(scenarios["Fed_Severely_Adverse"].validate().is_ok());
}

/// CET1 under the EBA set: 15.0, 12.6 and 7.755 for 1.2bn capital on 8bn RWA.
#[test]
fn eba_cet1_stress_values() {
    let engine = engine();
    let scenarios = engine.create_eba_scenarios(2024);
    let snapshot = sample::portfolio_snapshot();
    let cet1 = |id: &str| {
        engine.apply_scenario_to_portfolio(&scenarios[id], &snapshot)["cet1_ratio"].stressed_value
    };

    assert!(close(cet1("EBA_Baseline"), 15.0), "got {}", cet1("EBA_Baseline"));
    assert!(close(cet1("EBA_Adverse"), 12.6), "got {}", cet1("EBA_Adverse"));
    assert!(close(cet1("EBA_Severely_Adverse"), 7.755), "got {}", cet1("EBA_Severely_Adverse"));
    assert!(cet1("EBA_Adverse") < 14.2);
    assert!(cet1("EBA_Severely_Adverse") < cet1("EBA_Adverse"));
}

#[test]
fn severely_adverse_moves_every_metric_class() {
    let engine = engine();
    let scenarios = engine.create_eba_scenarios(2024);
    let results =
        engine.apply_scenario_to_portfolio(&scenarios["EBA_Severely_Adverse"], &sample::portfolio_snapshot());

    // spread 450bp and GDP -4.1%
    assert!(close(results["lcr"].stressed_value, 125.0 * (1.0 - 0.205 - 0.15)));
    assert!(close(results["roe"].stressed_value, 11.2 * (1.0 - 0.82)));
    assert!(close(results["cost_of_risk"].stressed_value, 0.35 * (1.0 + 2.05 + 1.05 + 0.66)));
    assert!(close(results["leverage_ratio"].stressed_value, 5.2 * 0.8));

    let cet1 = &results["cet1_ratio"];
    assert!(close(cet1.impact, cet1.stressed_value - 14.2));
    assert_eq!(cet1.time_horizon, 3);
    assert!(cet1.impact_percentage.unwrap_or(0.0) < 0.0);
}

/// Capital ratios never go negative and liquidity never drops below 50.
#[test]
fn stressed_values_respect_floors() {
    let engine = engine();
    let mut variables = BTreeMap::new();
    variables.insert(MacroVariable::GdpGrowth, vec![-30.0]);
    variables.insert(MacroVariable::UnemploymentRate, vec![40.0]);
    variables.insert(MacroVariable::HousePriceGrowth, vec![-90.0]);
    variables.insert(MacroVariable::CorporateBondSpread, vec![3_000.0]);
    let armageddon = engine
        .create_custom_scenario(CustomScenarioConfig {
            scenario_id: "ARMAGEDDON".into(),
            horizon_years: 1,
            variables,
            ..CustomScenarioConfig::default()
        })
        .unwrap();

    let results = engine.apply_scenario_to_portfolio(&armageddon, &sample::portfolio_snapshot());
    assert_eq!(results["cet1_ratio"].stressed_value, 0.0);
    assert_eq!(results["tier1_ratio"].stressed_value, 0.0);
    assert_eq!(results["lcr"].stressed_value, 50.0);
    assert_eq!(results["roe"].stressed_value, 0.0);
    assert!(close(results["cost_of_risk"].stressed_value, 0.35 * 5.0));
}

#[test]
fn zero_baseline_has_undefined_impact_percentage() {
    let engine = engine();
    let scenarios = engine.create_eba_scenarios(2024);
    let snapshot: PortfolioSnapshot = [("leverage_ratio", 0.0)].into_iter().collect();
    let results = engine.apply_scenario_to_portfolio(&scenarios["EBA_Adverse"], &snapshot);
    assert!(!results["leverage_ratio"].impact_percentage.is_defined());
}

#[test]
fn custom_scenario_with_short_sequence_is_rejected() {
    let engine = engine();
    let mut variables = BTreeMap::new();
    variables.insert(MacroVariable::GdpGrowth, vec![-1.0, 0.0, 1.0]);
    variables.insert(MacroVariable::UnemploymentRate, vec![9.0, 9.5]);
    let err = engine
        .create_custom_scenario(CustomScenarioConfig {
            variables,
            ..CustomScenarioConfig::default()
        })
        .unwrap_err();
    match err {
        RiskError::InvalidScenario {
            scenario_id,
            expected,
            actual,
            ..
        } => {
            assert_eq!(scenario_id, "CUSTOM");
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn custom_scenario_requires_an_id() {
    let err = engine()
        .create_custom_scenario(CustomScenarioConfig {
            scenario_id: "  ".into(),
            ..CustomScenarioConfig::default()
        })
        .unwrap_err();
    assert!(matches!(err, RiskError::InsufficientData { .. }));
}

#[test]
fn custom_scenario_defaults() {
    let scenario = engine()
        .create_custom_scenario(CustomScenarioConfig::default())
        .unwrap();
    assert_eq!(scenario.scenario_type, ScenarioType::Custom);
    assert_eq!(scenario.scenario_name, "Custom Scenario");
    assert_eq!(scenario.source, "Internal");
    assert!(close(scenario.probability, 0.1));
}

#[test]
fn sensitivity_shock_families() {
    let shocks = engine().generate_sensitivity_shocks();
    let families: Vec<&str> = shocks.keys().map(String::as_str).collect();
    assert_eq!(
        families,
        ["Credit_Spread", "Equity", "FX", "Interest_Rate", "Real_Estate"]
    );
    assert_eq!(shocks["Interest_Rate"].len(), 4);
    assert!(shocks["Interest_Rate"]
        .iter()
        .all(|s| s.shock_unit == ShockUnit::BasisPoints));
    let crisis = shocks["Real_Estate"]
        .iter()
        .find(|s| s.shock_type == "Regional_Crisis")
        .unwrap();
    assert!(close(crisis.shock_size, -35.0));
    assert!(close(crisis.confidence_level, 99.9));
}
