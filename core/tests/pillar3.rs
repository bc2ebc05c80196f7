//! Pillar 3 integration tests: disclosure calendar, factor sensitivities, peers.

use chrono::NaiveDate;
use crorisk_core::{
    config::Pillar3Config,
    pillar3::{
        benchmark_metric, DisclosureStatus, FactorExposure, PeerMetricInput, PerformanceBucket,
        Pillar3Engine, PublicationLog, SensitivityFactor,
    },
    sample,
};
use std::collections::BTreeMap;

fn engine() -> Pillar3Engine {
    Pillar3Engine::new(Pillar3Config::default())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

/// Mid-June: the Q1 quarterly tables (due 15 May) are overdue, nothing else is.
#[test]
fn unpublished_q1_tables_are_overdue_in_june() {
    let mut p3 = engine();
    let schedule = p3.generate_disclosure_schedule(date(2024, 6, 15), &PublicationLog::new());

    // 4 quarterly × 4 periods, 4 semi-annual × 2, 1 annual
    assert_eq!(schedule.total_requirements, 25);
    assert_eq!(schedule.overdue_count, 4);
    assert_eq!(schedule.upcoming_count, 0);
    assert_eq!(schedule.compliant_count, 21);

    for req in schedule
        .schedule_details
        .iter()
        .filter(|r| r.status == DisclosureStatus::Overdue)
    {
        assert_eq!(req.period_end, date(2024, 3, 31));
        assert!(req.days_until_due < 0);
    }
}

#[test]
fn publishing_clears_the_overdue_entry() {
    let mut p3 = engine();
    let mut log = PublicationLog::new();
    log.record("EU OV1", date(2024, 3, 31), date(2024, 5, 20));
    let schedule = p3.generate_disclosure_schedule(date(2024, 6, 15), &log);

    assert_eq!(schedule.overdue_count, 3);
    let ov1 = schedule
        .schedule_details
        .iter()
        .find(|r| r.table_code == "EU OV1" && r.period_end == date(2024, 3, 31))
        .unwrap();
    assert_eq!(ov1.status, DisclosureStatus::Compliant);
    assert_eq!(ov1.last_published, Some(date(2024, 5, 20)));
}

/// Due dates within the next 30 days are upcoming.
#[test]
fn due_within_window_is_upcoming() {
    let mut p3 = engine();
    let schedule = p3.generate_disclosure_schedule(date(2024, 5, 1), &PublicationLog::new());
    assert_eq!(schedule.overdue_count, 0);
    assert_eq!(schedule.upcoming_count, 4);

    let summary = p3.generate_pillar3_summary();
    assert!(summary.disclosure_compliant);
    assert_eq!(summary.upcoming_publications, 4);
}

#[test]
fn schedule_is_sorted_by_due_date() {
    let mut p3 = engine();
    let schedule = p3.generate_disclosure_schedule(date(2024, 9, 1), &PublicationLog::new());
    assert!(schedule
        .schedule_details
        .windows(2)
        .all(|w| w[0].next_due <= w[1].next_due));
}

#[test]
fn sample_publications_are_honoured() {
    let as_of = date(2024, 6, 15);
    let mut p3 = engine();
    let schedule = p3.generate_disclosure_schedule(as_of, &sample::publications(as_of));
    // EU OV1 and EU KM1 were published for Q1; EU MR1 and EU LIQ1 were not.
    assert_eq!(schedule.overdue_count, 2);
}

/// +200bp on 100M at duration 4.5 costs 9M of capital.
#[test]
fn interest_rate_sensitivity() {
    let mut p3 = engine();
    let analysis = p3.calculate_market_sensitivity(&sample::sensitivity_portfolio());

    let up = analysis
        .sensitivity_details
        .iter()
        .find(|s| s.risk_factor == "interest_rate_shock_up")
        .unwrap();
    assert!(close(up.impact_on_capital, -9_000_000.0));
    assert!(close(up.impact_on_earnings, -4_500_000.0));

    // 5 factors × 2 shocks
    assert_eq!(analysis.total_scenarios, 10);
    assert_eq!(analysis.most_significant_risks.len(), 5);
    assert!(analysis
        .most_significant_risks
        .windows(2)
        .all(|w| w[0].impact_on_capital.abs() >= w[1].impact_on_capital.abs()));
}

#[test]
fn missing_factor_exposure_has_no_impact() {
    let mut p3 = engine();
    let portfolio = BTreeMap::from([(
        SensitivityFactor::Equity,
        FactorExposure {
            notional: 10_000_000.0,
            delta: 1.0,
            ..FactorExposure::default()
        },
    )]);
    let analysis = p3.calculate_market_sensitivity(&portfolio);
    let fx_total: f64 = analysis
        .sensitivity_details
        .iter()
        .filter(|s| s.factor == SensitivityFactor::Fx)
        .map(|s| s.impact_on_capital.abs())
        .sum();
    assert_eq!(fx_total, 0.0);
    // -30% on 10M
    assert!(close(analysis.total_capital_impact, 2_000_000.0 + 3_000_000.0));
}

#[test]
fn high_impact_sensitivities_reach_summary() {
    let mut p3 = engine();
    p3.calculate_market_sensitivity(&sample::sensitivity_portfolio());
    let summary = p3.generate_pillar3_summary();
    assert_eq!(summary.scenarios_analyzed, 10);
    assert_eq!(summary.highest_risk_factors.len(), 3);
    assert!(summary
        .key_actions
        .iter()
        .any(|a| a.contains("high-impact")));
}

#[test]
fn cet1_peer_rank() {
    let peers = sample::peer_metrics();
    let cet1 = benchmark_metric(&peers["CET1_ratio"]);
    // 7 of 10 peers are below 14.2
    assert!(close(cet1.percentile_rank.unwrap_or(0.0), 70.0));
    assert_eq!(cet1.performance, PerformanceBucket::AboveMedian);
    assert!(cet1.vs_median.unwrap_or(0.0) > 0.0);
}

#[test]
fn no_peers_means_no_data() {
    let p3 = engine();
    let peers = BTreeMap::from([(
        "ROA".to_string(),
        PeerMetricInput {
            own_value: 1.0,
            peer_values: Vec::new(),
        },
    )]);
    let result = p3.generate_peer_benchmarking(&peers);
    assert_eq!(result.metrics_analyzed, 0);
    assert_eq!(result.overall_performance, PerformanceBucket::NoData);
    assert!(result.benchmarking_details["ROA"].peer_statistics.is_none());
}
