//! The CRO engine: runs every calculator over one set of inputs and
//! collects the results into a single report.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Pillar 1      credit, market and operational RWA, capital check
//!   2. Pillar 2      ICAAP, SREP, ILAAP, summary
//!   3. Pillar 3      disclosure schedule, sensitivities, peers, summary
//!   4. Scenarios     EBA and Fed scenarios applied to the snapshot
//!   5. Monte Carlo   correlated simulation on the reference portfolio
//!   6. Forward       projections, capital plan, liquidity, allocation
//!   7. Backtesting   projection backtests, stress model validation, report
//!   8. Reporting     COREP from Pillar 1, FINREP, LCR
//!
//! RULES:
//!   - Each step reads only the inputs and the outputs of earlier steps.
//!   - All randomness flows through seeded EngineRng streams.
//!   - Engines are rebuilt per run, so two runs with one seed agree.

use crate::{
    backtesting::{
        BacktestResult, BacktestingEngine, HistoricalStressEvent, ModelValidation,
        StressScenarioProfile, ValidationReport,
    },
    config::RiskConfig,
    exposure::ExposureBook,
    forward_looking::{
        AllocationBounds, AllocationResult, BusinessLinePlan, BusinessPlan, CapitalPlan,
        CashFlowProjections, CurrentCapitalMetrics, ForwardLookingAnalyzer, ForwardLookingSummary,
        LiquidityForecast, Projection, TimeSeriesFrame,
    },
    monte_carlo::MonteCarloResult,
    pillar1::{Pillar1Engine, Pillar1Report},
    pillar2::{
        IcaapAssessment, IcaapInput, IlaapAssessment, LiquidityMetricInput, Pillar2Engine,
        Pillar2Summary, SrepPillarInput, SrepResult,
    },
    pillar3::{
        BenchmarkingResult, DisclosureSchedule, FactorExposure, PeerMetricInput, Pillar3Engine,
        Pillar3Summary, PublicationLog, SensitivityAnalysis, SensitivityFactor,
    },
    reporting::{corep_input_from_pillar1, CapitalAmounts, RegulatoryReportingEngine, Report, ReportData},
    rng::RngBank,
    scenario::{ScenarioEngine, StressResult},
    snapshot::PortfolioSnapshot,
    types::{MetricName, ScenarioId},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything one run consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInputs {
    pub as_of:                 NaiveDate,
    pub book:                  ExposureBook,
    pub capital:               CapitalAmounts,
    pub icaap:                 IcaapInput,
    pub srep:                  BTreeMap<String, SrepPillarInput>,
    pub liquidity:             BTreeMap<String, LiquidityMetricInput>,
    pub publications:          PublicationLog,
    pub sensitivity_portfolio: BTreeMap<SensitivityFactor, FactorExposure>,
    pub peers:                 BTreeMap<String, PeerMetricInput>,
    pub snapshot:              PortfolioSnapshot,
    pub num_simulations:       usize,
    pub horizon_years:         usize,
    pub history:               TimeSeriesFrame,
    pub projection_months:     usize,
    pub current_capital:       CurrentCapitalMetrics,
    pub business_plan:         BusinessPlan,
    pub planning_months:       usize,
    pub cash_flows:            CashFlowProjections,
    pub business_lines:        BTreeMap<String, BusinessLinePlan>,
    pub allocation_bounds:     BTreeMap<String, AllocationBounds>,
    pub model_predictions:     BTreeMap<String, Vec<f64>>,
    pub stress_scenarios:      BTreeMap<String, StressScenarioProfile>,
    pub stress_events:         Vec<HistoricalStressEvent>,
    pub finrep:                ReportData,
    pub lcr:                   ReportData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pillar2Outcome {
    pub icaap:   IcaapAssessment,
    pub srep:    SrepResult,
    pub ilaap:   IlaapAssessment,
    pub summary: Pillar2Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pillar3Outcome {
    pub disclosure:   DisclosureSchedule,
    pub sensitivity:  SensitivityAnalysis,
    pub benchmarking: BenchmarkingResult,
    pub summary:      Pillar3Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardLookingOutcome {
    pub projections:         BTreeMap<String, Vec<Projection>>,
    pub capital_plan:        CapitalPlan,
    pub liquidity_forecasts: Vec<LiquidityForecast>,
    pub capital_allocation:  AllocationResult,
    pub summary:             ForwardLookingSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestingOutcome {
    pub backtests:   BTreeMap<String, BacktestResult>,
    pub validations: BTreeMap<String, ModelValidation>,
    pub report:      ValidationReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryReports {
    pub corep:  Report,
    pub finrep: Report,
    pub lcr:    Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CroReport {
    pub as_of:           NaiveDate,
    pub seed:            u64,
    pub pillar1:         Pillar1Report,
    pub pillar2:         Pillar2Outcome,
    pub pillar3:         Pillar3Outcome,
    pub stress_results:  BTreeMap<ScenarioId, BTreeMap<MetricName, StressResult>>,
    pub monte_carlo:     MonteCarloResult,
    pub forward_looking: ForwardLookingOutcome,
    pub backtesting:     BacktestingOutcome,
    pub reports:         RegulatoryReports,
}

pub struct CroEngine {
    pub config:   RiskConfig,
    pub rng_bank: RngBank,
}

impl CroEngine {
    pub fn build(config: RiskConfig, seed: u64) -> Self {
        Self {
            config,
            rng_bank: RngBank::new(seed),
        }
    }

    /// Default configuration, for tests.
    pub fn build_test(seed: u64) -> Self {
        Self::build(RiskConfig::default(), seed)
    }

    pub fn run(&self, inputs: &RiskInputs) -> CroReport {
        log::info!(
            "engine: run as_of={} seed={}",
            inputs.as_of,
            self.rng_bank.master_seed()
        );
        for exposure in &inputs.book.credit {
            if let Err(e) = exposure.validate() {
                log::warn!("engine: {e}");
            }
        }

        // 1. Pillar 1
        let mut pillar1 = Pillar1Engine::new(self.config.pillar1.clone());
        let pillar1_report = pillar1.compute_all(&inputs.book, inputs.capital.tier1_capital);

        // 2. Pillar 2
        let mut pillar2 = Pillar2Engine::new(self.config.pillar2.clone());
        let icaap = pillar2.calculate_icaap(&inputs.icaap);
        let srep = pillar2.calculate_srep_assessment(&inputs.srep);
        let ilaap = pillar2.calculate_ilaap(&inputs.liquidity);
        let pillar2_outcome = Pillar2Outcome {
            icaap,
            srep,
            ilaap,
            summary: pillar2.generate_pillar2_summary(),
        };

        // 3. Pillar 3
        let mut pillar3 = Pillar3Engine::new(self.config.pillar3.clone());
        let disclosure = pillar3.generate_disclosure_schedule(inputs.as_of, &inputs.publications);
        let sensitivity = pillar3.calculate_market_sensitivity(&inputs.sensitivity_portfolio);
        let benchmarking = pillar3.generate_peer_benchmarking(&inputs.peers);
        let pillar3_outcome = Pillar3Outcome {
            disclosure,
            sensitivity,
            benchmarking,
            summary: pillar3.generate_pillar3_summary(),
        };

        // 4. Scenarios
        let scenarios = ScenarioEngine::new(self.config.scenarios.clone(), self.rng_bank);
        let year = inputs.as_of.year();
        let mut named = scenarios.create_eba_scenarios(year);
        named.extend(scenarios.create_fed_scenarios(year));
        let stress_results = named
            .iter()
            .map(|(id, scenario)| {
                (id.clone(), scenarios.apply_scenario_to_portfolio(scenario, &inputs.snapshot))
            })
            .collect();

        // 5. Monte Carlo
        let monte_carlo =
            scenarios.run_monte_carlo_simulation(inputs.num_simulations, inputs.horizon_years);

        // 6. Forward-looking
        let mut forward = ForwardLookingAnalyzer::new(self.config.forward_looking.clone());
        let projections =
            forward.project_capital_ratios(&inputs.history, inputs.projection_months, inputs.as_of);
        let capital_plan = forward.create_dynamic_capital_plan(
            &inputs.current_capital,
            &inputs.business_plan,
            inputs.planning_months,
        );
        let liquidity_forecasts = forward.forecast_liquidity_metrics(
            &inputs.history,
            &inputs.cash_flows,
            inputs.projection_months,
            inputs.as_of,
        );
        let capital_allocation =
            forward.optimize_capital_allocation(&inputs.business_lines, &inputs.allocation_bounds);
        let forward_outcome = ForwardLookingOutcome {
            projections,
            capital_plan,
            liquidity_forecasts,
            capital_allocation,
            summary: forward.generate_forward_looking_summary(),
        };

        // 7. Backtesting
        let mut backtesting = BacktestingEngine::new(self.config.backtesting.clone());
        let test_days = backtesting.config().default_test_period_days;
        let backtests = backtesting.backtest_capital_projections(
            &inputs.history,
            &inputs.model_predictions,
            test_days,
        );
        let validations = backtesting.validate_stress_test_models(
            &inputs.stress_scenarios,
            &inputs.stress_events,
            inputs.as_of,
        );
        let backtesting_outcome = BacktestingOutcome {
            backtests,
            validations,
            report: backtesting.generate_validation_report(inputs.as_of),
        };

        // 8. Reporting
        let reporting = RegulatoryReportingEngine::new(self.config.reporting.clone());
        let corep_input = corep_input_from_pillar1(&pillar1_report, &inputs.capital);
        let reports = RegulatoryReports {
            corep: reporting.generate_corep_report(&corep_input, inputs.as_of),
            finrep: reporting.generate_finrep_report(&inputs.finrep, inputs.as_of),
            lcr: reporting.generate_lcr_report(&inputs.lcr, inputs.as_of),
        };

        log::info!("engine: run complete");
        CroReport {
            as_of: inputs.as_of,
            seed: self.rng_bank.master_seed(),
            pillar1: pillar1_report,
            pillar2: pillar2_outcome,
            pillar3: pillar3_outcome,
            stress_results,
            monte_carlo,
            forward_looking: forward_outcome,
            backtesting: backtesting_outcome,
            reports,
        }
    }
}
