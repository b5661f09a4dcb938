//! Audit command - coverage check without running cases

use super::Outcome;
use crate::reporting::{self, reporter::write_coverage_mismatch};
use anyhow::Result;
use colored::*;
use gauntlet_config::Config;
use gauntlet_harness::{CoverageAuditor, CoverageReport, SuitePlan};
use std::io::{self, Write};

pub fn run(config: &Config, suite: Option<&str>, json: bool) -> Result<Outcome> {
    let plans = SuitePlan::load_all(config, suite)?;

    let mut reports: Vec<(String, CoverageReport)> = Vec::with_capacity(plans.len());
    for plan in &plans {
        let report = CoverageAuditor::audit(
            &plan.repository,
            plan.registry.excluded(),
            plan.registry.declared(),
        )?;
        reports.push((plan.name.clone(), report));
    }

    if json {
        println!("{}", reporting::coverage_json(&reports));
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for ((name, report), plan) in reports.iter().zip(&plans) {
            if report.is_empty() {
                writeln!(
                    out,
                    "{} {}: {} case{} covered",
                    "✓".green(),
                    name,
                    plan.registry.len(),
                    if plan.registry.len() == 1 { "" } else { "s" }
                )?;
            } else {
                write_coverage_mismatch(&mut out, name, report)?;
            }
        }
    }

    Ok(Outcome::from_success(
        reports.iter().all(|(_, report)| report.is_empty()),
    ))
}
