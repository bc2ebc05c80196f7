//! Backtesting of capital projections and validation of stress-test models
//! against historical stress events.
//!
//! RULES:
//!   - Predictions are aligned to the trailing test window: the last `n`
//!     predictions are compared with the `n` observations in the window.
//!   - Stress diagnostics pool every metric of one event into a single
//!     residual sample. Fewer than three points means no diagnostics.
//!   - Accuracy and relative error are `Ratio::Undefined` when the actual
//!     impact is zero. Undefined values earn no rating points.

use crate::config::BacktestingConfig;
use crate::forward_looking::TimeSeriesFrame;
use crate::scenario::ScenarioType;
use crate::stats;
use crate::types::Ratio;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub model_name: String,
    pub metric_name: String,
    pub test_period_start: NaiveDate,
    pub test_period_end: NaiveDate,
    pub predicted_values: Vec<f64>,
    pub actual_values: Vec<f64>,
    pub mse: f64,
    pub mae: f64,
    pub r2_score: f64,
    /// `None` when the window holds a single observation.
    pub directional_accuracy: Option<f64>,
    pub validation_status: ValidationStatus,
}

/// Configured scenario that stress-test validation matches events against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenarioProfile {
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_severity")]
    pub severity: f64,
}

fn default_severity() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalStressEvent {
    pub date: NaiveDate,
    /// "Financial_Crisis", "COVID", "Sovereign_Debt", ...
    pub event_type: String,
    #[serde(default)]
    pub description: String,
    /// Observed change per metric.
    pub impacts: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelRating {
    Excellent,
    Good,
    Satisfactory,
    Poor,
}

impl ModelRating {
    fn from_points(points: u32) -> Self {
        match points {
            6.. => Self::Excellent,
            4..=5 => Self::Good,
            2..=3 => Self::Satisfactory,
            _ => Self::Poor,
        }
    }
}

impl fmt::Display for ModelRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Poor => "Poor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: Ratio,
    pub prediction_error: f64,
    pub relative_error: Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    pub is_normal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocorrelationTest {
    pub durbin_watson: f64,
    pub no_autocorrelation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeteroscedasticityTest {
    pub correlation: f64,
    pub homoscedastic: bool,
}

/// Residual diagnostics. A test that cannot be computed is `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticTests {
    pub normality: Option<NormalityTest>,
    pub autocorrelation: Option<AutocorrelationTest>,
    pub heteroscedasticity: Option<HeteroscedasticityTest>,
    pub unavailable_reason: Option<String>,
}

impl DiagnosticTests {
    fn passed(&self) -> u32 {
        let normal = self.normality.as_ref().is_some_and(|t| t.is_normal);
        let independent = self.autocorrelation.as_ref().is_some_and(|t| t.no_autocorrelation);
        let homoscedastic = self.heteroscedasticity.as_ref().is_some_and(|t| t.homoscedastic);
        [normal, independent, homoscedastic].into_iter().filter(|p| *p).count() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelValidation {
    pub model_id: String,
    pub model_type: String,
    pub scenario_id: String,
    pub validation_date: NaiveDate,
    /// Days between the event and the validation date.
    pub validation_period_days: i64,
    pub predicted_impact: f64,
    pub actual_impact: f64,
    pub performance_metrics: PerformanceMetrics,
    pub statistical_tests: DiagnosticTests,
    pub recommendations: Vec<String>,
    pub overall_rating: ModelRating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStatistics {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub pass_rate: f64,
    pub average_r2: f64,
    pub average_mae: f64,
    pub average_directional_accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelValidationStatistics {
    pub total_models: usize,
    pub rating_distribution: BTreeMap<String, usize>,
    /// Mean over validations with a defined accuracy.
    pub average_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelHealth {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Poor,
    #[serde(rename = "No Data")]
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub report_date: NaiveDate,
    pub backtest_statistics: Option<BacktestStatistics>,
    pub model_validation_statistics: Option<ModelValidationStatistics>,
    pub top_recommendations: Vec<String>,
    pub overall_model_health: ModelHealth,
    pub next_validation_due: NaiveDate,
}

pub struct BacktestingEngine {
    config: BacktestingConfig,
    pub backtest_results: BTreeMap<String, BacktestResult>,
    pub model_validations: BTreeMap<String, ModelValidation>,
}

impl BacktestingEngine {
    pub fn new(config: BacktestingConfig) -> Self {
        Self {
            config,
            backtest_results: BTreeMap::new(),
            model_validations: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &BacktestingConfig {
        &self.config
    }

    /// Compare model predictions with the observations of the last
    /// `test_period_days` of `history`.
    pub fn backtest_capital_projections(
        &mut self,
        history: &TimeSeriesFrame,
        predictions: &BTreeMap<String, Vec<f64>>,
        test_period_days: i64,
    ) -> BTreeMap<String, BacktestResult> {
        log::info!("backtesting: capital projections over {test_period_days} days");
        let Some(test_end) = history.dates.iter().max().copied() else {
            log::warn!("backtesting: history has no dates, nothing to test");
            return BTreeMap::new();
        };
        let test_start = test_end - Duration::days(test_period_days);
        let in_window: Vec<usize> = history
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= test_start && **d <= test_end)
            .map(|(i, _)| i)
            .collect();

        let mut results = BTreeMap::new();
        for (metric, predicted) in predictions {
            let Some(column) = history.column(metric) else {
                log::warn!("backtesting: metric {metric} missing from history, skipped");
                continue;
            };
            let actual: Vec<f64> = in_window
                .iter()
                .filter_map(|i| column.get(*i).copied())
                .collect();
            if actual.is_empty() || predicted.len() < actual.len() {
                log::warn!(
                    "backtesting: {metric} has {} predictions for {} observations, skipped",
                    predicted.len(),
                    actual.len()
                );
                continue;
            }
            let predicted = predicted[predicted.len() - actual.len()..].to_vec();

            let mse = stats::mean_squared_error(&actual, &predicted);
            let mae = stats::mean_absolute_error(&actual, &predicted);
            let r2 = stats::r2_score(&actual, &predicted);
            let directional = stats::directional_accuracy(&actual, &predicted);
            let status = self.validation_status(mae, r2, directional);
            log::debug!("backtesting: {metric} r2={r2:.3} mae={mae:.3} -> {status:?}");

            results.insert(
                metric.clone(),
                BacktestResult {
                    model_name: "Capital_Projection_Model".into(),
                    metric_name: metric.clone(),
                    test_period_start: test_start,
                    test_period_end: test_end,
                    predicted_values: predicted,
                    actual_values: actual,
                    mse,
                    mae,
                    r2_score: r2,
                    directional_accuracy: directional,
                    validation_status: status,
                },
            );
        }

        self.backtest_results.extend(results.clone());
        results
    }

    fn validation_status(&self, mae: f64, r2: f64, directional: Option<f64>) -> ValidationStatus {
        let t = &self.config.validation_thresholds;
        let directional_ok = directional.is_some_and(|d| d >= t.directional_accuracy_minimum);
        if r2 >= t.r2_minimum && mae <= t.mae_maximum && directional_ok {
            ValidationStatus::Pass
        } else if r2 >= t.r2_minimum * t.warning_r2_fraction {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Fail
        }
    }

    /// Validate configured stress scenarios against recorded stress events.
    /// Events without a matching scenario are skipped with a warning.
    pub fn validate_stress_test_models(
        &mut self,
        scenarios: &BTreeMap<String, StressScenarioProfile>,
        events: &[HistoricalStressEvent],
        as_of: NaiveDate,
    ) -> BTreeMap<String, ModelValidation> {
        log::info!(
            "backtesting: validating {} scenarios against {} stress events",
            scenarios.len(),
            events.len()
        );
        let mut validations = BTreeMap::new();

        for event in events {
            let Some((scenario_id, scenario)) = scenarios
                .iter()
                .find(|(_, s)| scenario_matches_event(s, event))
            else {
                log::warn!("backtesting: no scenario matches event {}", event.event_type);
                continue;
            };

            let pairs: Vec<(&String, f64, f64)> = event
                .impacts
                .iter()
                .map(|(metric, actual)| (metric, self.predicted_impact(scenario, metric), *actual))
                .collect();
            let predicted: Vec<f64> = pairs.iter().map(|(_, p, _)| *p).collect();
            let actual: Vec<f64> = pairs.iter().map(|(_, _, a)| *a).collect();
            let diagnostics = self.diagnostics(&predicted, &actual);

            for (metric, predicted_impact, actual_impact) in pairs {
                let error = (predicted_impact - actual_impact).abs();
                let relative_error = Ratio::of(error, actual_impact.abs());
                let metrics = PerformanceMetrics {
                    accuracy: relative_error.map(|r| 1.0 - r),
                    prediction_error: error,
                    relative_error,
                };
                let recommendations = recommendations(&metrics, &diagnostics);
                let rating = overall_rating(&metrics, &diagnostics);
                let model_id = format!("StressTest_{}_{}", event.event_type, metric);
                log::debug!("backtesting: {model_id} accuracy={} -> {rating}", metrics.accuracy);

                validations.insert(
                    model_id.clone(),
                    ModelValidation {
                        model_id,
                        model_type: "Stress_Test".into(),
                        scenario_id: scenario_id.clone(),
                        validation_date: as_of,
                        validation_period_days: (as_of - event.date).num_days(),
                        predicted_impact,
                        actual_impact,
                        performance_metrics: metrics,
                        statistical_tests: diagnostics.clone(),
                        recommendations,
                        overall_rating: rating,
                    },
                );
            }
        }

        self.model_validations.extend(validations.clone());
        validations
    }

    fn predicted_impact(&self, scenario: &StressScenarioProfile, metric: &str) -> f64 {
        self.config
            .stress_base_impacts
            .get(metric)
            .map_or(0.0, |base| base * scenario.severity)
    }

    fn diagnostics(&self, predicted: &[f64], actual: &[f64]) -> DiagnosticTests {
        if predicted.len() != actual.len() || predicted.len() < 3 {
            return DiagnosticTests {
                unavailable_reason: Some("insufficient data for statistical tests".into()),
                ..DiagnosticTests::default()
            };
        }
        let residuals: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
        let squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
        let cfg = &self.config;

        DiagnosticTests {
            normality: stats::jarque_bera(&residuals).map(|(statistic, p_value)| NormalityTest {
                statistic,
                p_value,
                is_normal: p_value > cfg.validation_thresholds.p_value_maximum,
            }),
            autocorrelation: stats::durbin_watson(&residuals).map(|dw| AutocorrelationTest {
                durbin_watson: dw,
                no_autocorrelation: dw > cfg.durbin_watson_lower && dw < cfg.durbin_watson_upper,
            }),
            heteroscedasticity: stats::correlation(&squared, predicted).map(|c| {
                HeteroscedasticityTest {
                    correlation: c,
                    homoscedastic: c.abs() < cfg.heteroscedasticity_max_correlation,
                }
            }),
            unavailable_reason: None,
        }
    }

    pub fn generate_validation_report(&self, as_of: NaiveDate) -> ValidationReport {
        let backtest_statistics = (!self.backtest_results.is_empty()).then(|| {
            let results: Vec<&BacktestResult> = self.backtest_results.values().collect();
            let total = results.len();
            let passed = results
                .iter()
                .filter(|r| r.validation_status == ValidationStatus::Pass)
                .count();
            let field = |f: fn(&BacktestResult) -> f64| {
                stats::mean(&results.iter().map(|r| f(r)).collect::<Vec<_>>())
            };
            BacktestStatistics {
                total_tests: total,
                passed_tests: passed,
                pass_rate: passed as f64 / total as f64,
                average_r2: field(|r| r.r2_score),
                average_mae: field(|r| r.mae),
                average_directional_accuracy: field(|r| r.directional_accuracy.unwrap_or(0.0)),
            }
        });

        let model_validation_statistics = (!self.model_validations.is_empty()).then(|| {
            let mut distribution = BTreeMap::new();
            for v in self.model_validations.values() {
                *distribution.entry(v.overall_rating.to_string()).or_insert(0) += 1;
            }
            let accuracies: Vec<f64> = self
                .model_validations
                .values()
                .filter_map(|v| v.performance_metrics.accuracy.value())
                .collect();
            ModelValidationStatistics {
                total_models: self.model_validations.len(),
                rating_distribution: distribution,
                average_accuracy: (!accuracies.is_empty()).then(|| stats::mean(&accuracies)),
            }
        });

        ValidationReport {
            report_date: as_of,
            backtest_statistics,
            model_validation_statistics,
            top_recommendations: self.top_recommendations(5),
            overall_model_health: self.overall_model_health(),
            next_validation_due: as_of + Duration::days(self.config.validation_interval_days),
        }
    }

    /// Most frequent recommendations, ties in first-seen order.
    fn top_recommendations(&self, limit: usize) -> Vec<String> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for rec in self.model_validations.values().flat_map(|v| &v.recommendations) {
            match counts.iter_mut().find(|(r, _)| *r == rec.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((rec.as_str(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.into_iter().take(limit).map(|(r, _)| r.to_string()).collect()
    }

    fn overall_model_health(&self) -> ModelHealth {
        if self.backtest_results.is_empty() && self.model_validations.is_empty() {
            return ModelHealth::NoData;
        }
        let tier = |share: f64| {
            if share >= 0.8 {
                3
            } else if share >= 0.6 {
                2
            } else if share >= 0.4 {
                1
            } else {
                0
            }
        };

        let mut score = 0;
        if !self.backtest_results.is_empty() {
            let passed = self
                .backtest_results
                .values()
                .filter(|r| r.validation_status == ValidationStatus::Pass)
                .count();
            score += tier(passed as f64 / self.backtest_results.len() as f64);
        }
        if !self.model_validations.is_empty() {
            let good = self
                .model_validations
                .values()
                .filter(|v| v.overall_rating <= ModelRating::Good)
                .count();
            score += tier(good as f64 / self.model_validations.len() as f64);
        }

        match score {
            5.. => ModelHealth::Excellent,
            3..=4 => ModelHealth::Good,
            1..=2 => ModelHealth::NeedsImprovement,
            _ => ModelHealth::Poor,
        }
    }
}

fn scenario_matches_event(scenario: &StressScenarioProfile, event: &HistoricalStressEvent) -> bool {
    let description = scenario.description.to_lowercase();
    match event.event_type.as_str() {
        "Financial_Crisis" => matches!(
            scenario.scenario_type,
            ScenarioType::Adverse | ScenarioType::SeverelyAdverse
        ),
        "COVID" => description.contains("pandemic"),
        "Sovereign_Debt" => description.contains("sovereign"),
        _ => false,
    }
}

fn recommendations(metrics: &PerformanceMetrics, tests: &DiagnosticTests) -> Vec<String> {
    let mut recs = Vec::new();
    if metrics.accuracy.value().map_or(true, |a| a < 0.7) {
        recs.push("Improve model accuracy; consider additional explanatory variables".to_string());
    }
    if metrics.relative_error.value().map_or(true, |r| r > 0.2) {
        recs.push("High relative error; review model calibration".to_string());
    }
    if tests.normality.as_ref().is_some_and(|t| !t.is_normal) {
        recs.push("Non-normal residuals; consider transforming the data".to_string());
    }
    if tests.autocorrelation.as_ref().is_some_and(|t| !t.no_autocorrelation) {
        recs.push("Autocorrelation detected; add lagged variables".to_string());
    }
    if tests.heteroscedasticity.as_ref().is_some_and(|t| !t.homoscedastic) {
        recs.push("Heteroscedasticity detected; use robust standard errors".to_string());
    }
    recs
}

fn overall_rating(metrics: &PerformanceMetrics, tests: &DiagnosticTests) -> ModelRating {
    let accuracy_points = match metrics.accuracy.value() {
        Some(a) if a >= 0.9 => 3,
        Some(a) if a >= 0.8 => 2,
        Some(a) if a >= 0.7 => 1,
        _ => 0,
    };
    let error_points = match metrics.relative_error.value() {
        Some(r) if r <= 0.1 => 2,
        Some(r) if r <= 0.2 => 1,
        _ => 0,
    };
    ModelRating::from_points(accuracy_points + error_points + tests.passed())
}
