//! Pillar 2: ICAAP capital adequacy, SREP scoring with P2R/P2G add-ons, and
//! ILAAP liquidity adequacy.

use crate::config::Pillar2Config;
use crate::types::{Amount, Ratio};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ------------------------------------------------------------------- ICAAP --

/// Risk category of an ICAAP line, parsed from its input key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskCategory {
    Credit,
    Market,
    Operational,
    InterestRate,
    Other(String),
}

impl From<String> for RiskCategory {
    fn from(key: String) -> Self {
        match key.as_str() {
            "credit_risk" => Self::Credit,
            "market_risk" => Self::Market,
            "operational_risk" => Self::Operational,
            "interest_rate_risk" => Self::InterestRate,
            _ => Self::Other(key),
        }
    }
}

impl From<RiskCategory> for String {
    fn from(category: RiskCategory) -> Self {
        category.key().to_string()
    }
}

impl RiskCategory {
    pub fn key(&self) -> &str {
        match self {
            Self::Credit => "credit_risk",
            Self::Market => "market_risk",
            Self::Operational => "operational_risk",
            Self::InterestRate => "interest_rate_risk",
            Self::Other(key) => key,
        }
    }
}

/// Inputs for one ICAAP risk category. Only the fields relevant to the
/// category's formula are read; everything defaults to zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RiskCategoryData {
    pub allocated_capital: Amount,
    pub expected_loss: Amount,
    pub unexpected_loss: Amount,
    pub var_1day: Amount,
    pub annual_loss_estimate: Amount,
    pub severity_multiplier: Option<f64>,
    /// Economic value change under a +200bp shock (negative = loss).
    pub rate_shock_200bp: Amount,
    /// Required capital for categories without a dedicated formula.
    pub capital_estimate: Amount,
    pub methodology: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IcaapInput {
    pub available_capital: Amount,
    pub risk_categories: BTreeMap<String, RiskCategoryData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcaapResult {
    pub risk_category: RiskCategory,
    pub current_capital: Amount,
    pub required_capital: Amount,
    pub surplus_deficit: Amount,
    pub confidence_level: f64,
    pub methodology: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcaapAssessment {
    pub total_required_capital: Amount,
    pub total_available_capital: Amount,
    pub overall_surplus_deficit: Amount,
    /// Available over required capital, in percent.
    pub capital_adequacy_ratio: Ratio,
    pub results_by_risk: Vec<IcaapResult>,
}

// -------------------------------------------------------------------- SREP --

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SrepPillarInput {
    pub score: Option<f64>,
    pub description: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrepAssessment {
    pub pillar: String,
    pub score: f64,
    pub weight: f64,
    pub description: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SrepScoreCategory {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium-Low Risk")]
    MediumLow,
    #[serde(rename = "Medium-High Risk")]
    MediumHigh,
    #[serde(rename = "High Risk")]
    High,
}

impl SrepScoreCategory {
    pub fn from_score(score: f64) -> Self {
        if score <= 1.5 {
            Self::Low
        } else if score <= 2.5 {
            Self::MediumLow
        } else if score <= 3.5 {
            Self::MediumHigh
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrepResult {
    pub overall_score: f64,
    pub score_category: SrepScoreCategory,
    pub p2r_requirement: f64,
    pub p2g_guidance: f64,
    pub total_requirement: f64,
    pub assessments_by_pillar: Vec<SrepAssessment>,
}

// ------------------------------------------------------------------- ILAAP --

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LiquidityMetricInput {
    pub current_value: f64,
    pub regulatory_minimum: f64,
    /// Defaults to `internal_limit_factor` × regulatory minimum.
    pub internal_limit: Option<f64>,
    pub currency: Option<String>,
    pub maturity_bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityMetric {
    pub metric_name: String,
    pub current_value: f64,
    pub regulatory_minimum: f64,
    pub internal_limit: f64,
    pub currency: String,
    pub maturity_bucket: String,
    pub regulatory_compliant: bool,
    pub meets_internal_limit: bool,
    pub surplus_deficit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityBreach {
    BelowRegulatoryMinimum,
    BelowInternalLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityFinding {
    pub metric_name: String,
    pub breach: LiquidityBreach,
}

impl fmt::Display for LiquidityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.breach {
            LiquidityBreach::BelowRegulatoryMinimum => "below regulatory minimum",
            LiquidityBreach::BelowInternalLimit => "below internal limit",
        };
        write!(f, "{}: {what}", self.metric_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlaapAssessment {
    /// True iff every metric meets its regulatory minimum.
    pub overall_adequacy: bool,
    pub metrics_count: usize,
    pub compliant_metrics: usize,
    pub metrics_details: Vec<LiquidityMetric>,
    pub key_risks: Vec<LiquidityFinding>,
}

// ----------------------------------------------------------------- Summary --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pillar2Summary {
    pub total_risks_assessed: usize,
    pub capital_adequate: bool,
    pub p2r_requirement: f64,
    pub p2g_guidance: f64,
    pub total_add_on: f64,
    pub pillar2_compliant: bool,
    pub key_actions: Vec<String>,
}

/// Pillar 2 calculator. Keeps the latest ICAAP lines and P2R/P2G so that
/// `generate_pillar2_summary` can report on them.
pub struct Pillar2Engine {
    config: Pillar2Config,
    pub icaap_results: Vec<IcaapResult>,
    pub p2r_requirement: f64,
    pub p2g_guidance: f64,
}

impl Pillar2Engine {
    pub fn new(config: Pillar2Config) -> Self {
        Self {
            config,
            icaap_results: Vec::new(),
            p2r_requirement: 0.0,
            p2g_guidance: 0.0,
        }
    }

    fn confidence_level(&self, category: &RiskCategory) -> f64 {
        self.config
            .icaap_confidence_levels
            .get(category.key())
            .copied()
            .unwrap_or(self.config.default_confidence_level)
    }

    /// Loss-distribution multiplier for a confidence level; unknown levels
    /// are treated as the most conservative configured default.
    pub fn confidence_multiplier(&self, confidence_level: f64) -> f64 {
        self.config
            .confidence_multipliers
            .iter()
            .find(|m| (m.confidence - confidence_level).abs() < 1e-9)
            .map(|m| m.multiplier)
            .unwrap_or(self.config.default_confidence_multiplier)
    }

    fn required_capital(&self, category: &RiskCategory, data: &RiskCategoryData, confidence: f64) -> Amount {
        match category {
            RiskCategory::Credit => {
                data.expected_loss + data.unexpected_loss * self.confidence_multiplier(confidence)
            }
            RiskCategory::Market => {
                data.var_1day
                    * self.config.var_holding_period_days.sqrt()
                    * self.config.var_regulatory_multiplier
            }
            RiskCategory::Operational => {
                let severity = data
                    .severity_multiplier
                    .unwrap_or(self.config.default_severity_multiplier);
                data.annual_loss_estimate * severity
            }
            RiskCategory::InterestRate => (-data.rate_shock_200bp).max(0.0),
            RiskCategory::Other(_) => data.capital_estimate,
        }
    }

    pub fn calculate_icaap(&mut self, input: &IcaapInput) -> IcaapAssessment {
        log::info!("pillar2: ICAAP over {} risk categories", input.risk_categories.len());

        let mut results = Vec::with_capacity(input.risk_categories.len());
        let mut total_required = 0.0;

        for (key, data) in &input.risk_categories {
            let category = RiskCategory::from(key.clone());
            let confidence_level = self.confidence_level(&category);
            let required_capital = self.required_capital(&category, data, confidence_level);
            total_required += required_capital;
            results.push(IcaapResult {
                risk_category: category,
                current_capital: data.allocated_capital,
                required_capital,
                surplus_deficit: data.allocated_capital - required_capital,
                confidence_level,
                methodology: data
                    .methodology
                    .clone()
                    .unwrap_or_else(|| "Internal Model".into()),
            });
        }

        self.icaap_results = results.clone();

        IcaapAssessment {
            total_required_capital: total_required,
            total_available_capital: input.available_capital,
            overall_surplus_deficit: input.available_capital - total_required,
            capital_adequacy_ratio: if total_required > 0.0 {
                Ratio::percent(input.available_capital, total_required)
            } else {
                Ratio::Undefined
            },
            results_by_risk: results,
        }
    }

    /// P2R in percentage points for a weighted SREP score.
    pub fn p2r_for_score(&self, score: f64) -> f64 {
        self.config
            .p2r_steps
            .iter()
            .find(|step| score <= step.max_score)
            .map(|step| step.requirement)
            .unwrap_or(self.config.p2r_ceiling)
    }

    pub fn p2g_for_score(&self, score: f64) -> f64 {
        self.p2r_for_score(score) + self.config.p2g_buffer
    }

    pub fn calculate_srep_assessment(
        &mut self,
        assessment: &BTreeMap<String, SrepPillarInput>,
    ) -> SrepResult {
        log::info!("pillar2: SREP over {} pillars", assessment.len());

        let mut weighted_score = 0.0;
        let mut pillars = Vec::with_capacity(assessment.len());

        for (pillar, data) in assessment {
            let raw = data.score.unwrap_or(self.config.default_srep_score);
            let score = raw.clamp(1.0, 4.0);
            if score != raw {
                log::warn!("pillar2: SREP score {raw} for {pillar} outside 1-4, clamped to {score}");
            }
            let weight = self
                .config
                .srep_weights
                .get(pillar)
                .copied()
                .unwrap_or(self.config.default_srep_weight);
            weighted_score += score * weight;
            pillars.push(SrepAssessment {
                pillar: pillar.clone(),
                score,
                weight,
                description: data.description.clone(),
                key_findings: data.key_findings.clone(),
                recommendations: data.recommendations.clone(),
            });
        }

        self.p2r_requirement = self.p2r_for_score(weighted_score);
        self.p2g_guidance = self.p2g_for_score(weighted_score);

        SrepResult {
            overall_score: weighted_score,
            score_category: SrepScoreCategory::from_score(weighted_score),
            p2r_requirement: self.p2r_requirement,
            p2g_guidance: self.p2g_guidance,
            total_requirement: self.p2r_requirement + self.p2g_guidance,
            assessments_by_pillar: pillars,
        }
    }

    pub fn calculate_ilaap(&self, metrics: &BTreeMap<String, LiquidityMetricInput>) -> IlaapAssessment {
        log::info!("pillar2: ILAAP over {} liquidity metrics", metrics.len());

        let mut details = Vec::with_capacity(metrics.len());
        let mut key_risks = Vec::new();

        for (name, data) in metrics {
            let internal_limit = data
                .internal_limit
                .unwrap_or(data.regulatory_minimum * self.config.internal_limit_factor);
            let regulatory_compliant = data.current_value >= data.regulatory_minimum;
            let meets_internal_limit = data.current_value >= internal_limit;

            if !regulatory_compliant {
                key_risks.push(LiquidityFinding {
                    metric_name: name.clone(),
                    breach: LiquidityBreach::BelowRegulatoryMinimum,
                });
            } else if !meets_internal_limit {
                key_risks.push(LiquidityFinding {
                    metric_name: name.clone(),
                    breach: LiquidityBreach::BelowInternalLimit,
                });
            }

            details.push(LiquidityMetric {
                metric_name: name.clone(),
                current_value: data.current_value,
                regulatory_minimum: data.regulatory_minimum,
                internal_limit,
                currency: data.currency.clone().unwrap_or_else(|| "EUR".into()),
                maturity_bucket: data.maturity_bucket.clone().unwrap_or_else(|| "All".into()),
                regulatory_compliant,
                meets_internal_limit,
                surplus_deficit: data.current_value - data.regulatory_minimum,
            });
        }

        let compliant_metrics = details.iter().filter(|m| m.regulatory_compliant).count();
        IlaapAssessment {
            overall_adequacy: compliant_metrics == details.len(),
            metrics_count: details.len(),
            compliant_metrics,
            metrics_details: details,
            key_risks,
        }
    }

    pub fn generate_pillar2_summary(&self) -> Pillar2Summary {
        let capital_adequate = self.icaap_results.iter().all(|r| r.surplus_deficit >= 0.0);

        let mut key_actions = Vec::new();
        if self.p2r_requirement > self.config.p2r_action_threshold {
            key_actions.push("Strengthen capital base".to_string());
        }
        if !capital_adequate {
            key_actions.push("Revise capital allocation by risk category".to_string());
        }

        Pillar2Summary {
            total_risks_assessed: self.icaap_results.len(),
            capital_adequate,
            p2r_requirement: self.p2r_requirement,
            p2g_guidance: self.p2g_guidance,
            total_add_on: self.p2r_requirement + self.p2g_guidance,
            pillar2_compliant: self.p2r_requirement <= self.config.p2r_compliance_limit,
            key_actions,
        }
    }
}
