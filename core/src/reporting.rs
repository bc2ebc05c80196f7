//! Regulatory report generation: COREP capital, FINREP balance sheet and
//! LCR liquidity templates, plus text export and a submission calendar.
//!
//! Source data is a flat field → value map. Cells whose field is absent are
//! filled with 0.0. Derived cells (CET1 ratio, LCR) are recomputed from the
//! source fields before validation.

use crate::config::ReportingConfig;
use crate::error::{RiskError, RiskResult};
use crate::pillar1::Pillar1Report;
use crate::types::{Amount, Ratio};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

/// Source values keyed by field name ("total_rwa", "deposits", ...).
pub type ReportData = BTreeMap<String, f64>;

pub const COREP: &str = "COREP";
pub const FINREP: &str = "FINREP";
pub const LCR: &str = "LCR";

const CET1_RATIO_CELL: &str = "C01.00_r080_c010";
const LCR_RATIO_CELL: &str = "LCR_r090_c010";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportingFrequency {
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-annual")]
    SemiAnnual,
    Annual,
}

impl ReportingFrequency {
    /// Period ends within `year`.
    fn period_ends(&self, year: i32) -> Vec<NaiveDate> {
        let months: Vec<u32> = match self {
            Self::Monthly => (1..=12).collect(),
            Self::Quarterly => vec![3, 6, 9, 12],
            Self::SemiAnnual => vec![6, 12],
            Self::Annual => vec![12],
        };
        months.into_iter().filter_map(|m| month_end(year, m)).collect()
    }

    fn submission_lag_days(&self) -> i64 {
        match self {
            Self::Monthly => 15,
            Self::Quarterly => 45,
            Self::SemiAnnual => 60,
            Self::Annual => 120,
        }
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub template_id: String,
    pub template_name: String,
    pub frequency: ReportingFrequency,
    pub supervisor: String,
    pub version: String,
    /// Cell id → source field.
    pub cells_mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub template_id: String,
    pub reporting_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub cells: BTreeMap<String, f64>,
    pub validation_errors: Vec<String>,
    pub is_valid: bool,
    /// |assets − (liabilities + equity)|, FINREP only.
    pub balance_check: Option<Amount>,
    /// LCR only. Undefined when net outflows are zero.
    pub lcr_ratio: Option<Ratio>,
    pub regulatory_compliant: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Xml,
    Xbrl,
    Excel,
}

impl FromStr for ExportFormat {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "xbrl" => Ok(Self::Xbrl),
            "excel" | "xlsx" => Ok(Self::Excel),
            _ => Err(RiskError::UnsupportedFormat { format: s.to_string() }),
        }
    }
}

/// Capital amounts COREP needs alongside the Pillar 1 RWA figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CapitalAmounts {
    pub cet1_capital: Amount,
    pub tier1_capital: Amount,
    pub total_capital: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub template_name: String,
    pub frequency: ReportingFrequency,
    pub supervisor: String,
    pub deadlines: Vec<NaiveDate>,
}

/// Map a Pillar 1 report and capital amounts onto the COREP source fields.
pub fn corep_input_from_pillar1(report: &Pillar1Report, capital: &CapitalAmounts) -> ReportData {
    let total_rwa = report.totals.total_rwa;
    let ratio = |amount: Amount| Ratio::percent(amount, total_rwa).unwrap_or(0.0);
    [
        ("total_rwa", total_rwa),
        ("credit_rwa", report.totals.credit_rwa),
        ("market_rwa", report.totals.market_rwa),
        ("operational_rwa", report.totals.operational_rwa),
        ("cet1_capital", capital.cet1_capital),
        ("tier1_capital", capital.tier1_capital),
        ("total_capital", capital.total_capital),
        ("cet1_ratio", ratio(capital.cet1_capital)),
        ("tier1_ratio", ratio(capital.tier1_capital)),
        ("total_ratio", ratio(capital.total_capital)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub struct RegulatoryReportingEngine {
    config: ReportingConfig,
    templates: BTreeMap<String, ReportTemplate>,
}

impl RegulatoryReportingEngine {
    pub fn new(config: ReportingConfig) -> Self {
        Self {
            config,
            templates: standard_templates(),
        }
    }

    pub fn templates(&self) -> &BTreeMap<String, ReportTemplate> {
        &self.templates
    }

    fn fill_cells(&self, template_id: &str, data: &ReportData) -> BTreeMap<String, f64> {
        self.templates
            .get(template_id)
            .map(|t| {
                t.cells_mapping
                    .iter()
                    .map(|(cell, field)| (cell.clone(), data.get(field).copied().unwrap_or(0.0)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn report(
        template_id: &str,
        reporting_date: NaiveDate,
        cells: BTreeMap<String, f64>,
        validation_errors: Vec<String>,
    ) -> Report {
        if !validation_errors.is_empty() {
            log::warn!(
                "reporting: {template_id} {reporting_date} has {} validation errors",
                validation_errors.len()
            );
        }
        Report {
            template_id: template_id.to_string(),
            reporting_date,
            generated_at: Utc::now(),
            cells,
            is_valid: validation_errors.is_empty(),
            validation_errors,
            balance_check: None,
            lcr_ratio: None,
            regulatory_compliant: None,
        }
    }

    pub fn generate_corep_report(&self, data: &ReportData, reporting_date: NaiveDate) -> Report {
        log::info!("reporting: COREP for {reporting_date}");
        let mut cells = self.fill_cells(COREP, data);
        if let (Some(rwa), Some(cet1)) = (data.get("total_rwa"), data.get("cet1_capital")) {
            let ratio = if *rwa > 0.0 { cet1 / rwa * 100.0 } else { 0.0 };
            cells.insert(CET1_RATIO_CELL.into(), ratio);
        }

        let cell = |id: &str| cells.get(id).copied().unwrap_or(0.0);
        let mut errors = Vec::new();
        let total_rwa = cell("C01.00_r010_c010");
        let summed = cell("C01.00_r020_c010") + cell("C01.00_r030_c010") + cell("C01.00_r040_c010");
        if (total_rwa - summed).abs() > self.config.rwa_tolerance {
            errors.push(format!("Total RWA {total_rwa:.0} differs from component sum {summed:.0}"));
        }
        let cet1 = cell("C01.00_r050_c010");
        let tier1 = cell("C01.00_r060_c010");
        let total = cell("C01.00_r070_c010");
        if cet1 > tier1 {
            errors.push("CET1 capital exceeds Tier 1 capital".to_string());
        }
        if tier1 > total {
            errors.push("Tier 1 capital exceeds total capital".to_string());
        }
        let cet1_ratio = cell(CET1_RATIO_CELL);
        if cet1_ratio < self.config.cet1_minimum {
            errors.push(format!("CET1 ratio below minimum: {cet1_ratio:.2}%"));
        }

        Self::report(COREP, reporting_date, cells, errors)
    }

    pub fn generate_finrep_report(&self, data: &ReportData, reporting_date: NaiveDate) -> Report {
        log::info!("reporting: FINREP for {reporting_date}");
        let cells = self.fill_cells(FINREP, data);
        let cell = |id: &str| cells.get(id).copied().unwrap_or(0.0);

        let mut errors = Vec::new();
        let assets = cell("F01.01_r010_c010");
        if cell("F01.01_r020_c010") + cell("F01.01_r030_c010") > assets {
            errors.push("Asset components exceed total assets".to_string());
        }
        if assets <= 0.0 {
            errors.push("Total assets must be positive".to_string());
        }
        let balance_check = (assets - (cell("F01.01_r060_c010") + cell("F01.01_r090_c010"))).abs();
        if balance_check > self.config.balance_sheet_tolerance {
            errors.push(format!("Balance sheet does not balance: {balance_check:.0}"));
        }

        let mut report = Self::report(FINREP, reporting_date, cells, errors);
        report.balance_check = Some(balance_check);
        report
    }

    pub fn generate_lcr_report(&self, data: &ReportData, reporting_date: NaiveDate) -> Report {
        log::info!("reporting: LCR for {reporting_date}");
        let mut cells = self.fill_cells(LCR, data);
        let cell = |cells: &BTreeMap<String, f64>, id: &str| cells.get(id).copied().unwrap_or(0.0);

        let hqla = cell(&cells, "LCR_r010_c010");
        let outflows = cell(&cells, "LCR_r050_c010");
        let inflows = cell(&cells, "LCR_r080_c010");
        let net_outflows = (outflows - inflows).max(outflows * self.config.net_outflow_floor);
        let lcr = if net_outflows > 0.0 {
            Ratio::percent(hqla, net_outflows)
        } else {
            Ratio::Undefined
        };
        cells.insert(LCR_RATIO_CELL.into(), lcr.unwrap_or(0.0));

        let mut errors = Vec::new();
        let level1 = cell(&cells, "LCR_r020_c010");
        let level2a = cell(&cells, "LCR_r030_c010");
        let level2b = cell(&cells, "LCR_r040_c010");
        let summed = level1 + level2a + level2b;
        if (hqla - summed).abs() > self.config.hqla_tolerance {
            errors.push(format!("Total HQLA {hqla:.0} differs from level sum {summed:.0}"));
        }
        if level2a + level2b > hqla * self.config.level2_cap {
            errors.push(format!(
                "Level 2 assets exceed {:.0}% of HQLA",
                self.config.level2_cap * 100.0
            ));
        }
        if level2b > hqla * self.config.level2b_cap {
            errors.push(format!(
                "Level 2B assets exceed {:.0}% of HQLA",
                self.config.level2b_cap * 100.0
            ));
        }

        let mut report = Self::report(LCR, reporting_date, cells, errors);
        report.regulatory_compliant = Some(lcr.value().is_some_and(|v| v >= self.config.lcr_minimum));
        report.lcr_ratio = Some(lcr);
        report
    }

    /// Render a report as text in the requested format.
    pub fn export_report(&self, report: &Report, format: ExportFormat) -> RiskResult<String> {
        log::info!("reporting: exporting {} as {format:?}", report.template_id);
        let mut out = String::new();
        match format {
            ExportFormat::Csv => {
                out.push_str("Cell_ID,Value\n");
                for (cell, value) in &report.cells {
                    let _ = writeln!(out, "{cell},{value}");
                }
            }
            ExportFormat::Xml => {
                out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
                let _ = writeln!(
                    out,
                    "<Report template=\"{}\" date=\"{}\">",
                    report.template_id, report.reporting_date
                );
                for (cell, value) in &report.cells {
                    let _ = writeln!(out, "  <Cell id=\"{cell}\">{value}</Cell>");
                }
                out.push_str("</Report>");
            }
            ExportFormat::Xbrl => {
                out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
                out.push_str("<xbrl xmlns=\"http://www.xbrl.org/2003/instance\">\n");
                out.push_str("  <context id=\"current\">\n    <entity>\n");
                let _ = writeln!(
                    out,
                    "      <identifier scheme=\"http://www.example.com\">{}</identifier>",
                    self.config.entity_identifier
                );
                out.push_str("    </entity>\n    <period>\n");
                let _ = writeln!(out, "      <instant>{}</instant>", report.reporting_date);
                out.push_str("    </period>\n  </context>\n");
                for (cell, value) in &report.cells {
                    let _ = writeln!(out, "  <{cell} contextRef=\"current\">{value}</{cell}>");
                }
                out.push_str("</xbrl>");
            }
            ExportFormat::Excel => {
                return Err(RiskError::UnsupportedFormat { format: "Excel".into() });
            }
        }
        Ok(out)
    }

    /// Submission deadlines for every template in `year`. Monthly templates
    /// are due 15 days after the actual month end.
    pub fn get_reporting_calendar(&self, year: i32) -> BTreeMap<String, CalendarEntry> {
        self.templates
            .iter()
            .map(|(id, t)| {
                let lag = Duration::days(t.frequency.submission_lag_days());
                let deadlines = t
                    .frequency
                    .period_ends(year)
                    .into_iter()
                    .map(|end| end + lag)
                    .collect();
                let entry = CalendarEntry {
                    template_name: t.template_name.clone(),
                    frequency: t.frequency,
                    supervisor: t.supervisor.clone(),
                    deadlines,
                };
                (id.clone(), entry)
            })
            .collect()
    }
}

fn standard_templates() -> BTreeMap<String, ReportTemplate> {
    let template = |id: &str, name: &str, frequency, supervisor: &str, version: &str, prefix: &str, fields: &[&str]| {
        let cells_mapping = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (format!("{prefix}_r{:03}_c010", (i + 1) * 10), field.to_string()))
            .collect();
        let t = ReportTemplate {
            template_id: id.to_string(),
            template_name: name.to_string(),
            frequency,
            supervisor: supervisor.to_string(),
            version: version.to_string(),
            cells_mapping,
        };
        (id.to_string(), t)
    };
    BTreeMap::from([
        template(
            COREP,
            "Common Reporting Framework",
            ReportingFrequency::Quarterly,
            "EBA",
            "3.3",
            "C01.00",
            &[
                "total_rwa",
                "credit_rwa",
                "market_rwa",
                "operational_rwa",
                "cet1_capital",
                "tier1_capital",
                "total_capital",
                "cet1_ratio",
                "tier1_ratio",
                "total_ratio",
            ],
        ),
        template(
            FINREP,
            "Financial Reporting Framework",
            ReportingFrequency::Quarterly,
            "EBA",
            "3.3",
            "F01.01",
            &[
                "total_assets",
                "loans_advances",
                "debt_securities",
                "equity_instruments",
                "derivatives",
                "total_liabilities",
                "deposits",
                "debt_issued",
                "total_equity",
                "retained_earnings",
            ],
        ),
        template(
            LCR,
            "Liquidity Coverage Ratio",
            ReportingFrequency::Monthly,
            "ECB",
            "2.10",
            "LCR",
            &[
                "total_hqla",
                "level1_assets",
                "level2a_assets",
                "level2b_assets",
                "total_outflows",
                "retail_outflows",
                "wholesale_outflows",
                "total_inflows",
                "lcr_ratio",
            ],
        ),
    ])
}
