//! Reporting integration tests: template validation, export formats and the
//! submission calendar.

use chrono::NaiveDate;
use crorisk_core::{
    config::{Pillar1Config, ReportingConfig},
    error::RiskError,
    pillar1::Pillar1Engine,
    reporting::{
        corep_input_from_pillar1, CapitalAmounts, ExportFormat, RegulatoryReportingEngine,
        ReportingFrequency, COREP, FINREP, LCR,
    },
    sample,
};

fn engine() -> RegulatoryReportingEngine {
    RegulatoryReportingEngine::new(ReportingConfig::default())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

#[test]
fn sample_corep_is_valid_with_recomputed_ratio() {
    let report = engine().generate_corep_report(&sample::corep_data(), date(2024, 3, 31));
    assert_eq!(report.template_id, COREP);
    assert!(report.is_valid, "errors: {:?}", report.validation_errors);
    // 1.2bn CET1 on 15bn RWA
    assert!(close(report.cells["C01.00_r080_c010"], 8.0));
    assert_eq!(report.cells["C01.00_r010_c010"], 15_000_000_000.0);
    // Fields absent from the source default to zero.
    assert_eq!(report.cells["C01.00_r090_c010"], 0.0);
}

#[test]
fn inconsistent_corep_is_flagged() {
    let mut data = sample::corep_data();
    data.insert("credit_rwa".into(), 10_000_000_000.0);
    data.insert("cet1_capital".into(), 1_400_000_000.0);
    let report = engine().generate_corep_report(&data, date(2024, 3, 31));

    assert!(!report.is_valid);
    assert!(report.validation_errors.iter().any(|e| e.starts_with("Total RWA")));
    assert!(report
        .validation_errors
        .iter()
        .any(|e| e == "CET1 capital exceeds Tier 1 capital"));
}

#[test]
fn thin_capital_breaches_cet1_minimum() {
    let mut data = sample::corep_data();
    data.insert("cet1_capital".into(), 500_000_000.0);
    let report = engine().generate_corep_report(&data, date(2024, 3, 31));
    assert!(report
        .validation_errors
        .iter()
        .any(|e| e.starts_with("CET1 ratio below minimum")));
}

/// A COREP report fed from a Pillar 1 run reconciles by construction.
#[test]
fn corep_from_pillar1_reconciles() {
    let mut p1 = Pillar1Engine::new(Pillar1Config::default());
    let pillar1 = p1.compute_all(&sample::exposure_book(), 1_200_000_000.0);
    let capital = CapitalAmounts {
        cet1_capital: 1_000_000_000.0,
        tier1_capital: 1_200_000_000.0,
        total_capital: 1_500_000_000.0,
    };
    let data = corep_input_from_pillar1(&pillar1, &capital);
    assert!(close(data["total_rwa"], pillar1.totals.total_rwa));

    let report = engine().generate_corep_report(&data, date(2024, 6, 30));
    assert!(report.is_valid, "errors: {:?}", report.validation_errors);
}

#[test]
fn sample_finrep_balances() {
    let report = engine().generate_finrep_report(&sample::finrep_data(), date(2024, 3, 31));
    assert_eq!(report.template_id, FINREP);
    assert!(report.is_valid, "errors: {:?}", report.validation_errors);
    assert_eq!(report.balance_check, Some(0.0));
}

#[test]
fn unbalanced_finrep_is_flagged() {
    let mut data = sample::finrep_data();
    data.insert("total_equity".into(), 2_000_000_000.0);
    let report = engine().generate_finrep_report(&data, date(2024, 3, 31));
    assert!(!report.is_valid);
    assert!(close(report.balance_check.unwrap_or(0.0), 1_000_000_000.0));
    assert!(report.validation_errors[0].starts_with("Balance sheet does not balance"));
}

#[test]
fn empty_finrep_needs_positive_assets() {
    let report = engine().generate_finrep_report(&Default::default(), date(2024, 3, 31));
    assert!(report
        .validation_errors
        .iter()
        .any(|e| e == "Total assets must be positive"));
}

/// 5bn HQLA over 4bn net outflows.
#[test]
fn sample_lcr_is_125_and_compliant() {
    let report = engine().generate_lcr_report(&sample::lcr_data(), date(2024, 1, 31));
    assert_eq!(report.template_id, LCR);
    assert!(report.is_valid, "errors: {:?}", report.validation_errors);
    let lcr = report.lcr_ratio.unwrap();
    assert!(close(lcr.unwrap_or(0.0), 125.0));
    assert!(close(report.cells["LCR_r090_c010"], 125.0));
    assert_eq!(report.regulatory_compliant, Some(true));
}

/// Inflows can offset at most 75% of outflows.
#[test]
fn lcr_inflow_cap_and_level2_limits() {
    let mut data = sample::lcr_data();
    data.insert("total_inflows".into(), 4_400_000_000.0);
    data.insert("level1_assets".into(), 2_000_000_000.0);
    data.insert("level2a_assets".into(), 2_000_000_000.0);
    data.insert("level2b_assets".into(), 1_000_000_000.0);
    let report = engine().generate_lcr_report(&data, date(2024, 1, 31));

    // 5bn / (4.5bn × 25%)
    assert!(close(report.lcr_ratio.unwrap().unwrap_or(0.0), 5_000.0 / 11.25));
    assert!(report
        .validation_errors
        .iter()
        .any(|e| e.starts_with("Level 2 assets exceed")));
    assert!(report
        .validation_errors
        .iter()
        .any(|e| e.starts_with("Level 2B assets exceed")));
}

#[test]
fn lcr_without_outflows_is_undefined_and_non_compliant() {
    let mut data = sample::lcr_data();
    data.insert("total_outflows".into(), 0.0);
    data.insert("total_inflows".into(), 0.0);
    let report = engine().generate_lcr_report(&data, date(2024, 1, 31));
    assert!(!report.lcr_ratio.unwrap().is_defined());
    assert_eq!(report.regulatory_compliant, Some(false));
}

#[test]
fn csv_and_xml_exports_list_every_cell() {
    let engine = engine();
    let report = engine.generate_lcr_report(&sample::lcr_data(), date(2024, 1, 31));

    let csv = engine.export_report(&report, ExportFormat::Csv).unwrap();
    assert!(csv.starts_with("Cell_ID,Value\n"));
    assert_eq!(csv.lines().count(), report.cells.len() + 1);
    assert!(csv.contains("LCR_r010_c010,5000000000"));

    let xml = engine.export_report(&report, ExportFormat::Xml).unwrap();
    assert!(xml.contains("<Report template=\"LCR\" date=\"2024-01-31\">"));
    assert!(xml.ends_with("</Report>"));
}

#[test]
fn xbrl_export_carries_entity_and_instant() {
    let engine = engine();
    let report = engine.generate_corep_report(&sample::corep_data(), date(2024, 3, 31));
    let xbrl = engine.export_report(&report, ExportFormat::Xbrl).unwrap();
    assert!(xbrl.contains(">BANK001</identifier>"));
    assert!(xbrl.contains("<instant>2024-03-31</instant>"));
    assert!(xbrl.contains("<C01.00_r010_c010 contextRef=\"current\">"));
}

#[test]
fn excel_export_is_unsupported() {
    let engine = engine();
    let report = engine.generate_corep_report(&sample::corep_data(), date(2024, 3, 31));
    let err = engine.export_report(&report, ExportFormat::Excel).unwrap_err();
    assert!(matches!(err, RiskError::UnsupportedFormat { .. }));

    assert_eq!("XBRL".parse::<ExportFormat>().unwrap(), ExportFormat::Xbrl);
    assert!("pdf".parse::<ExportFormat>().is_err());
}

#[test]
fn calendar_deadlines_follow_frequency_lags() {
    let calendar = engine().get_reporting_calendar(2024);
    assert_eq!(calendar.len(), 3);

    let corep = &calendar[COREP];
    assert_eq!(corep.frequency, ReportingFrequency::Quarterly);
    assert_eq!(
        corep.deadlines,
        [
            date(2024, 5, 15),
            date(2024, 8, 14),
            date(2024, 11, 14),
            date(2025, 2, 14),
        ]
    );

    let lcr = &calendar[LCR];
    assert_eq!(lcr.deadlines.len(), 12);
    assert_eq!(lcr.deadlines[0], date(2024, 2, 15));
    // Leap-year February ends on the 29th.
    assert_eq!(lcr.deadlines[1], date(2024, 3, 15));
    assert_eq!(lcr.supervisor, "ECB");
}
