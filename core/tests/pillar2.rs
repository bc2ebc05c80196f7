//! Pillar 2 integration tests: ICAAP formulas, SREP → P2R/P2G, ILAAP checks.

use crorisk_core::{
    config::Pillar2Config,
    pillar2::{
        IcaapInput, LiquidityBreach, LiquidityMetricInput, Pillar2Engine, RiskCategory,
        RiskCategoryData, SrepPillarInput, SrepScoreCategory,
    },
    sample,
};
use std::collections::BTreeMap;

fn engine() -> Pillar2Engine {
    Pillar2Engine::new(Pillar2Config::default())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

fn srep(scores: [f64; 4]) -> BTreeMap<String, SrepPillarInput> {
    ["business_model", "governance", "capital", "liquidity"]
        .iter()
        .zip(scores)
        .map(|(pillar, score)| {
            let input = SrepPillarInput {
                score: Some(score),
                ..SrepPillarInput::default()
            };
            (pillar.to_string(), input)
        })
        .collect()
}

#[test]
fn icaap_required_capital_per_category() {
    let mut p2 = engine();
    let assessment = p2.calculate_icaap(&sample::icaap_input());

    let required = |category: RiskCategory| {
        assessment
            .results_by_risk
            .iter()
            .find(|r| r.risk_category == category)
            .map(|r| r.required_capital)
            .unwrap_or(f64::NAN)
    };
    // EL + UL × 3.09 at 99.9%
    assert!(close(required(RiskCategory::Credit), 5_135_000.0));
    // VaR × √10 × 3
    assert!(close(required(RiskCategory::Market), 50_000.0 * 10f64.sqrt() * 3.0));
    assert!(close(required(RiskCategory::Operational), 900_000.0));
    assert!(close(required(RiskCategory::InterestRate), 200_000.0));

    let total = 5_135_000.0 + 50_000.0 * 10f64.sqrt() * 3.0 + 900_000.0 + 200_000.0;
    assert!(close(assessment.total_required_capital, total));
    assert!(close(assessment.overall_surplus_deficit, 8_000_000.0 - total));
    assert!(assessment.capital_adequacy_ratio.is_defined());
}

/// Credit needs more than its allocation in the sample, so the summary flags it.
#[test]
fn icaap_deficit_reaches_summary() {
    let mut p2 = engine();
    let assessment = p2.calculate_icaap(&sample::icaap_input());
    let credit = &assessment.results_by_risk[0];
    assert_eq!(credit.risk_category, RiskCategory::Credit);
    assert!(credit.surplus_deficit < 0.0);

    let summary = p2.generate_pillar2_summary();
    assert_eq!(summary.total_risks_assessed, 4);
    assert!(!summary.capital_adequate);
    assert!(summary
        .key_actions
        .iter()
        .any(|a| a.contains("capital allocation")));
}

#[test]
fn icaap_other_category_uses_capital_estimate() {
    let mut p2 = engine();
    let input = IcaapInput {
        available_capital: 100.0,
        risk_categories: BTreeMap::from([(
            "concentration_risk".to_string(),
            RiskCategoryData {
                allocated_capital: 50.0,
                capital_estimate: 40.0,
                ..RiskCategoryData::default()
            },
        )]),
    };
    let assessment = p2.calculate_icaap(&input);
    assert!(close(assessment.total_required_capital, 40.0));
    assert!(close(assessment.capital_adequacy_ratio.unwrap_or(0.0), 250.0));
}

#[test]
fn icaap_with_nothing_required_has_undefined_adequacy() {
    let mut p2 = engine();
    let assessment = p2.calculate_icaap(&IcaapInput {
        available_capital: 1_000.0,
        risk_categories: BTreeMap::new(),
    });
    assert_eq!(assessment.total_required_capital, 0.0);
    assert!(!assessment.capital_adequacy_ratio.is_defined());
}

/// P2R steps: ≤1.5 → 0, ≤2.0 → 0.5, ≤2.5 → 1.0, ≤3.0 → 1.5, above → 2.0.
#[test]
fn p2r_step_function() {
    let p2 = engine();
    for (score, expected) in [
        (1.0, 0.0),
        (1.5, 0.0),
        (1.75, 0.5),
        (2.0, 0.5),
        (2.25, 1.0),
        (2.75, 1.5),
        (3.0, 1.5),
        (3.5, 2.0),
        (4.0, 2.0),
    ] {
        assert!(
            close(p2.p2r_for_score(score), expected),
            "score {score}: expected P2R {expected}, got {}",
            p2.p2r_for_score(score)
        );
        assert!(close(p2.p2g_for_score(score), expected + 1.0));
    }
}

#[test]
fn srep_sample_assessment() {
    let mut p2 = engine();
    let result = p2.calculate_srep_assessment(&sample::srep_input());
    assert!(close(result.overall_score, 1.75));
    assert_eq!(result.score_category, SrepScoreCategory::MediumLow);
    assert!(close(result.p2r_requirement, 0.5));
    assert!(close(result.p2g_guidance, 1.5));
    assert!(close(result.total_requirement, 2.0));
    assert_eq!(result.assessments_by_pillar.len(), 4);
}

#[test]
fn srep_worst_scores_hit_ceiling() {
    let mut p2 = engine();
    let result = p2.calculate_srep_assessment(&srep([4.0, 4.0, 4.0, 4.0]));
    assert_eq!(result.score_category, SrepScoreCategory::High);
    assert!(close(result.p2r_requirement, 2.0));
    assert!(close(result.p2g_guidance, 3.0));

    let summary = p2.generate_pillar2_summary();
    assert!(summary.pillar2_compliant);
    assert!(summary.key_actions.iter().any(|a| a == "Strengthen capital base"));
}

#[test]
fn srep_scores_outside_range_are_clamped() {
    let mut p2 = engine();
    let result = p2.calculate_srep_assessment(&srep([0.0, 9.0, 1.0, 1.0]));
    // 1 + 4 + 1 + 1, each weighted 0.25
    assert!(close(result.overall_score, 1.75));
    assert!(result
        .assessments_by_pillar
        .iter()
        .all(|a| (1.0..=4.0).contains(&a.score)));
}

#[test]
fn ilaap_sample_is_adequate() {
    let p2 = engine();
    let result = p2.calculate_ilaap(&sample::liquidity_metrics());
    assert!(result.overall_adequacy);
    assert_eq!(result.metrics_count, 3);
    assert_eq!(result.compliant_metrics, 3);
    assert!(result.key_risks.is_empty());
}

#[test]
fn ilaap_flags_breaches_and_default_internal_limit() {
    let p2 = engine();
    let metric = |current: f64| LiquidityMetricInput {
        current_value: current,
        regulatory_minimum: 100.0,
        ..LiquidityMetricInput::default()
    };
    let metrics = BTreeMap::from([
        ("LCR".to_string(), metric(95.0)),
        ("NSFR".to_string(), metric(105.0)),
        ("Buffer".to_string(), metric(130.0)),
    ]);
    let result = p2.calculate_ilaap(&metrics);
    assert!(!result.overall_adequacy);
    assert_eq!(result.compliant_metrics, 2);

    let nsfr = result
        .metrics_details
        .iter()
        .find(|m| m.metric_name == "NSFR")
        .map(|m| m.internal_limit)
        .unwrap_or(0.0);
    assert!(close(nsfr, 110.0));

    let breach = |name: &str| {
        result
            .key_risks
            .iter()
            .find(|r| r.metric_name == name)
            .map(|r| r.breach)
    };
    assert_eq!(breach("LCR"), Some(LiquidityBreach::BelowRegulatoryMinimum));
    assert_eq!(breach("NSFR"), Some(LiquidityBreach::BelowInternalLimit));
    assert_eq!(breach("Buffer"), None);
}
