//! Monte Carlo stress simulation over correlated macro paths.
//!
//! Each simulated path is a mean-reverting random walk per variable:
//! year 0 = baseline + shock(σ₀), year t = prev + κ·(baseline − prev) + shock(σ₁),
//! clamped to the configured [min, max]. Shocks of unemployment, house
//! prices and equity prices load on the same year's GDP shock; every
//! marginal shock keeps its configured standard deviation.
//!
//! RULE: all draws come from the `MonteCarlo` stream, so one seed always
//! yields the same statistics.

use crate::rng::{EngineRng, StreamSlot};
use crate::scenario::{MacroScenario, MacroVariable, ScenarioEngine, ScenarioType};
use crate::snapshot::PortfolioSnapshot;
use crate::stats;
use crate::types::MetricName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distribution of one stressed metric across the applied scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDistribution {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p1: f64,
    pub p5: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl MetricDistribution {
    fn from_values(values: &[f64]) -> Self {
        let p = |q| stats::percentile(values, q);
        Self {
            mean: stats::mean(values),
            std: stats::std_dev(values),
            min: stats::min(values),
            max: stats::max(values),
            p1: p(1.0),
            p5: p(5.0),
            p10: p(10.0),
            p50: p(50.0),
            p90: p(90.0),
            p95: p(95.0),
            p99: p(99.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub num_simulations: usize,
    pub horizon_years: usize,
    pub scenarios_generated: usize,
    pub scenarios_applied: usize,
    pub statistics: BTreeMap<MetricName, MetricDistribution>,
}

impl ScenarioEngine {
    /// Generate `num_simulations` correlated scenarios, stress the reference
    /// portfolio under each and summarise the stressed values per metric.
    pub fn run_monte_carlo_simulation(
        &self,
        num_simulations: usize,
        horizon_years: usize,
    ) -> MonteCarloResult {
        let mc = &self.config().monte_carlo;
        let applied = mc
            .max_applied_scenarios
            .map_or(num_simulations, |cap| cap.min(num_simulations));
        log::info!(
            "monte_carlo: {num_simulations} simulations over {horizon_years} years, applying {applied}"
        );

        let mut rng = self.rng_bank.for_stream(StreamSlot::MonteCarlo);
        let portfolio = PortfolioSnapshot::from(mc.reference_portfolio.clone());
        let probability = if num_simulations > 0 {
            1.0 / num_simulations as f64
        } else {
            0.0
        };

        let mut stressed: BTreeMap<MetricName, Vec<f64>> = BTreeMap::new();
        for i in 0..num_simulations {
            let scenario = MacroScenario {
                scenario_id: format!("MC_{i:05}"),
                scenario_name: format!("Monte Carlo path {i}"),
                scenario_type: ScenarioType::MonteCarlo,
                horizon_years,
                variables: self.generate_correlated_variables(&mut rng, horizon_years),
                probability,
                source: "Monte Carlo".into(),
                description: String::new(),
            };
            // Paths past the cap are still drawn so the stream position
            // does not depend on the cap.
            if i >= applied {
                continue;
            }
            for (metric, result) in self.apply_scenario_to_portfolio(&scenario, &portfolio) {
                stressed.entry(metric).or_default().push(result.stressed_value);
            }
        }

        let statistics = stressed
            .iter()
            .map(|(metric, values)| (metric.clone(), MetricDistribution::from_values(values)))
            .collect();

        MonteCarloResult {
            num_simulations,
            horizon_years,
            scenarios_generated: num_simulations,
            scenarios_applied: applied,
            statistics,
        }
    }

    /// One path per configured macro variable.
    pub(crate) fn generate_correlated_variables(
        &self,
        rng: &mut EngineRng,
        horizon_years: usize,
    ) -> BTreeMap<MacroVariable, Vec<f64>> {
        let config = self.config();
        let mc = &config.monte_carlo;
        let mut paths: BTreeMap<MacroVariable, Vec<f64>> = config
            .macro_variables
            .keys()
            .map(|v| (*v, Vec::with_capacity(horizon_years)))
            .collect();

        for year in 0..horizon_years {
            let sigma = if year == 0 {
                mc.first_year_shock_std
            } else {
                mc.later_year_shock_std
            };
            let gdp_shock = rng.standard_normal();
            for (variable, bounds) in &config.macro_variables {
                let z = if *variable == MacroVariable::GdpGrowth {
                    gdp_shock
                } else {
                    let rho = config.correlations.loading_on_gdp(*variable);
                    rho * gdp_shock + (1.0 - rho * rho).sqrt() * rng.standard_normal()
                };
                let Some(path) = paths.get_mut(variable) else {
                    continue;
                };
                let value = match path.last() {
                    None => bounds.baseline + sigma * z,
                    Some(prev) => {
                        prev + mc.mean_reversion * (bounds.baseline - prev) + sigma * z
                    }
                };
                path.push(value.max(bounds.min).min(bounds.max));
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::rng::RngBank;

    fn engine() -> ScenarioEngine {
        ScenarioEngine::new(ScenarioConfig::default(), RngBank::new(7))
    }

    #[test]
    fn paths_span_horizon_and_stay_in_bounds() {
        let engine = engine();
        let mut rng = engine.rng_bank.for_stream(StreamSlot::MonteCarlo);
        for _ in 0..200 {
            let paths = engine.generate_correlated_variables(&mut rng, 5);
            assert_eq!(paths.len(), MacroVariable::ALL.len());
            for (variable, path) in &paths {
                let bounds = engine.config().macro_variables[variable];
                assert_eq!(path.len(), 5);
                assert!(path.iter().all(|v| *v >= bounds.min && *v <= bounds.max));
            }
        }
    }

    #[test]
    fn shocks_follow_gdp_loadings() {
        let engine = engine();
        let mut rng = engine.rng_bank.for_stream(StreamSlot::MonteCarlo);
        let mut gdp = Vec::new();
        let mut unemployment = Vec::new();
        let mut equity = Vec::new();
        for _ in 0..2_000 {
            let paths = engine.generate_correlated_variables(&mut rng, 1);
            gdp.push(paths[&MacroVariable::GdpGrowth][0]);
            unemployment.push(paths[&MacroVariable::UnemploymentRate][0]);
            equity.push(paths[&MacroVariable::EquityPriceGrowth][0]);
        }
        let gdp_unemp = stats::correlation(&gdp, &unemployment).unwrap_or(0.0);
        let gdp_equity = stats::correlation(&gdp, &equity).unwrap_or(0.0);
        assert!(gdp_unemp < -0.5, "gdp/unemployment correlation {gdp_unemp}");
        assert!(gdp_equity > 0.6, "gdp/equity correlation {gdp_equity}");
    }

    #[test]
    fn distribution_percentiles_are_ordered() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let d = MetricDistribution::from_values(&values);
        let chain = [d.min, d.p1, d.p5, d.p10, d.p50, d.p90, d.p95, d.p99, d.max];
        assert!(chain.windows(2).all(|w| w[0] <= w[1]));
        assert!((d.mean - 49.5).abs() < 1e-9);
    }
}
