//! cro-runner: headless run of every risk engine over the sample bank.
//!
//! Usage:
//!   cro-runner --seed 12345 --simulations 1000 --as-of 2024-06-30
//!   cro-runner --seed 12345 --data-dir ./data --json
//!   cro-runner --export csv

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use crorisk_core::{
    config::RiskConfig,
    engine::{CroEngine, CroReport},
    reporting::{ExportFormat, RegulatoryReportingEngine},
    sample,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let simulations = parse_arg(&args, "--simulations", 1000usize);
    let horizon = parse_arg(&args, "--horizon", 3usize);
    let json = args.iter().any(|a| a == "--json");
    let strict = args.iter().any(|a| a == "--strict-config");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let as_of = match flag_value(&args, "--as-of") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--as-of expects YYYY-MM-DD, got {raw}"))?,
        None => Utc::now().date_naive(),
    };
    let export = flag_value(&args, "--export")
        .map(str::parse::<ExportFormat>)
        .transpose()?;

    let config = if strict {
        RiskConfig::load_strict(data_dir)?
    } else {
        RiskConfig::load(data_dir)
    };
    log::info!("cro-runner: seed={seed} as_of={as_of} data_dir={data_dir}");
    let engine = CroEngine::build(config, seed);

    let mut inputs = sample::sample_inputs(&engine.rng_bank, as_of);
    inputs.num_simulations = simulations;
    inputs.horizon_years = horizon;

    let report = engine.run(&inputs);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(&report, data_dir);

    if let Some(format) = export {
        let reporting = RegulatoryReportingEngine::new(engine.config.reporting.clone());
        for r in [&report.reports.corep, &report.reports.finrep, &report.reports.lcr] {
            println!();
            println!("--- {} ({format:?}) ---", r.template_id);
            println!("{}", reporting.export_report(r, format)?);
        }
    }
    Ok(())
}

fn print_summary(report: &CroReport, data_dir: &str) {
    println!("CRO risk run");
    println!("  as_of:     {}", report.as_of);
    println!("  seed:      {}", report.seed);
    println!("  data_dir:  {data_dir}");
    println!();

    let p1 = &report.pillar1;
    println!("Pillar 1");
    println!("  total RWA:        {:>18.2}", p1.totals.total_rwa);
    println!("    credit:         {:>18.2}", p1.totals.credit_rwa);
    println!("    market:         {:>18.2}", p1.totals.market_rwa);
    println!("    operational:    {:>18.2}", p1.totals.operational_rwa);
    println!("  CET1 ratio:       {}", p1.capital.cet1_ratio);
    println!("  compliant:        {}", p1.capital.is_compliant);
    println!();

    let p2 = &report.pillar2;
    println!("Pillar 2");
    println!("  ICAAP required:   {:>18.2}", p2.icaap.total_required_capital);
    println!("  ICAAP surplus:    {:>18.2}", p2.icaap.overall_surplus_deficit);
    println!(
        "  SREP score:       {:.2} ({:?}) P2R {:.2}% P2G {:.2}%",
        p2.srep.overall_score,
        p2.srep.score_category,
        p2.srep.p2r_requirement,
        p2.srep.p2g_guidance
    );
    println!(
        "  ILAAP:            {}/{} metrics compliant",
        p2.ilaap.compliant_metrics, p2.ilaap.metrics_count
    );
    println!();

    let p3 = &report.pillar3.disclosure;
    println!("Pillar 3");
    println!(
        "  disclosures:      {} total, {} overdue, {} upcoming, {} compliant",
        p3.total_requirements, p3.overdue_count, p3.upcoming_count, p3.compliant_count
    );
    println!();

    println!("Stress scenarios (CET1 ratio)");
    for (scenario_id, results) in &report.stress_results {
        if let Some(cet1) = results.get("cet1_ratio") {
            println!(
                "  {scenario_id:<24} {:>7.2} -> {:>7.2} ({})",
                cet1.baseline_value, cet1.stressed_value, cet1.impact_percentage
            );
        }
    }
    println!();

    let mc = &report.monte_carlo;
    println!(
        "Monte Carlo: {} paths, {} applied",
        mc.scenarios_generated, mc.scenarios_applied
    );
    for (metric, dist) in &mc.statistics {
        println!(
            "  {metric:<16} mean {:>9.3}  p1 {:>9.3}  p99 {:>9.3}",
            dist.mean, dist.p1, dist.p99
        );
    }
    println!();

    let fl = &report.forward_looking;
    println!("Forward-looking");
    println!(
        "  capital plan:     {} actions, {:.2} total needs",
        fl.capital_plan.capital_actions.len(),
        fl.capital_plan.total_capital_needs()
    );
    println!(
        "  allocation:       {} (ROE {} -> {})",
        if fl.capital_allocation.optimization_successful { "optimal" } else { "failed" },
        fl.capital_allocation.current_roe,
        fl.capital_allocation.optimal_roe
    );
    for insight in &fl.summary.key_insights {
        println!("  - {insight}");
    }
    println!();

    let bt = &report.backtesting.report;
    println!("Backtesting");
    println!("  model health:     {:?}", bt.overall_model_health);
    println!("  next validation:  {}", bt.next_validation_due);
    println!();

    println!("Regulatory reports");
    for r in [&report.reports.corep, &report.reports.finrep, &report.reports.lcr] {
        println!(
            "  {:<8} valid={} errors={}",
            r.template_id,
            r.is_valid,
            r.validation_errors.len()
        );
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
