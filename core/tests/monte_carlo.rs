//! Monte Carlo integration tests: determinism, bounds and the application cap.

use crorisk_core::{config::ScenarioConfig, rng::RngBank, scenario::ScenarioEngine};

fn engine(seed: u64) -> ScenarioEngine {
    ScenarioEngine::new(ScenarioConfig::default(), RngBank::new(seed))
}

/// Same seed, same statistics, bit for bit.
#[test]
fn same_seed_gives_identical_statistics() {
    let a = engine(0xDEAD_BEEF).run_monte_carlo_simulation(500, 3);
    let b = engine(0xDEAD_BEEF).run_monte_carlo_simulation(500, 3);
    let json_a = serde_json::to_string(&a.statistics).unwrap();
    let json_b = serde_json::to_string(&b.statistics).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn different_seeds_give_different_statistics() {
    let a = engine(1).run_monte_carlo_simulation(200, 3);
    let b = engine(2).run_monte_carlo_simulation(200, 3);
    assert_ne!(a.statistics["cet1_ratio"].mean, b.statistics["cet1_ratio"].mean);
}

/// Every simulated path is applied when no cap is configured.
#[test]
fn all_paths_are_applied_by_default() {
    let result = engine(42).run_monte_carlo_simulation(1_500, 3);
    assert_eq!(result.scenarios_generated, 1_500);
    assert_eq!(result.scenarios_applied, 1_500);
    assert_eq!(result.horizon_years, 3);
}

#[test]
fn configured_cap_limits_applied_paths() {
    let mut config = ScenarioConfig::default();
    config.monte_carlo.max_applied_scenarios = Some(100);
    let engine = ScenarioEngine::new(config, RngBank::new(42));

    let capped = engine.run_monte_carlo_simulation(400, 3);
    assert_eq!(capped.scenarios_generated, 400);
    assert_eq!(capped.scenarios_applied, 100);

    // The first 100 paths are the same ones the uncapped run draws.
    let first_hundred = engine.run_monte_carlo_simulation(100, 3);
    let a = serde_json::to_string(&capped.statistics).unwrap();
    let b = serde_json::to_string(&first_hundred.statistics).unwrap();
    assert_eq!(a, b);
}

/// Stressed CET1 stays within [0, unstressed] and LCR never drops below 50.
#[test]
fn stressed_metrics_stay_within_floors() {
    let result = engine(42).run_monte_carlo_simulation(1_000, 3);

    let cet1 = &result.statistics["cet1_ratio"];
    assert!(cet1.min >= 0.0);
    assert!(cet1.max <= 15.0 + 1e-9, "max {}", cet1.max);
    assert!(cet1.p1 <= cet1.p50 && cet1.p50 <= cet1.p99);

    let lcr = &result.statistics["lcr"];
    assert!(lcr.min >= 50.0);
    assert!(lcr.max <= 125.0 + 1e-9);

    let cost_of_risk = &result.statistics["cost_of_risk"];
    assert!(cost_of_risk.max <= 0.35 * 5.0 + 1e-9);
}

#[test]
fn zero_simulations_give_empty_statistics() {
    let result = engine(42).run_monte_carlo_simulation(0, 3);
    assert_eq!(result.scenarios_applied, 0);
    assert!(result.statistics.is_empty());
}
