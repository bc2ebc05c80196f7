//! Configuration loading: bundled data files, per-section fallback and strict mode.

use crorisk_core::config::RiskConfig;
use std::path::PathBuf;

fn bundled_data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

/// A fresh scratch directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("crorisk-config-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn bundled_files_load_strictly() {
    let config = RiskConfig::load_strict(&bundled_data_dir()).unwrap();
    assert_eq!(config.reporting.entity_identifier, "BANK001");
    assert_eq!(config.pillar1.rwa_multiplier, 12.5);
    assert_eq!(config.backtesting.validation_interval_days, 90);
}

#[test]
fn missing_directory_falls_back_to_defaults() {
    let config = RiskConfig::load("/nonexistent/crorisk-data");
    let defaults = RiskConfig::default();
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        serde_json::to_value(&defaults).unwrap()
    );
}

#[test]
fn strict_load_reports_the_missing_file() {
    let err = RiskConfig::load_strict("/nonexistent/crorisk-data").unwrap_err();
    assert!(err.to_string().contains("pillar1.json"), "got {err}");
}

/// A partial section overrides only the fields it names.
#[test]
fn partial_section_keeps_remaining_defaults() {
    let dir = scratch_dir("partial");
    std::fs::write(dir.join("reporting.json"), r#"{ "lcr_minimum": 110.0 }"#).unwrap();

    let config = RiskConfig::load(dir.to_str().unwrap());
    assert_eq!(config.reporting.lcr_minimum, 110.0);
    assert_eq!(config.reporting.cet1_minimum, 4.5);
    assert_eq!(config.reporting.entity_identifier, "BANK001");
}

#[test]
fn malformed_section_falls_back_or_fails_strictly() {
    let dir = scratch_dir("malformed");
    std::fs::write(dir.join("pillar1.json"), "{ not json").unwrap();
    let path = dir.to_str().unwrap();

    let config = RiskConfig::load(path);
    assert_eq!(config.pillar1.operational_alpha, 0.15);

    let err = RiskConfig::load_strict(path).unwrap_err();
    assert!(err.to_string().starts_with("Cannot parse"), "got {err}");
}
