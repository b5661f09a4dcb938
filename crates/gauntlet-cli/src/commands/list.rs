//! List command - print the configuration matrix

use super::Outcome;
use anyhow::Result;
use colored::*;
use gauntlet_config::Config;
use gauntlet_harness::{adapter_from_config, SubjectAdapter, SuitePlan};
use serde_json::json;

pub fn run(config: &Config, suite: Option<&str>, json: bool) -> Result<Outcome> {
    let plans = SuitePlan::load_all(config, suite)?;
    let adapter = adapter_from_config(&config.project, config.project_root())?;

    if json {
        let suites: Vec<_> = plans.iter().map(|plan| plan_json(&adapter, plan)).collect();
        println!("{}", json!({ "suites": suites }));
        return Ok(Outcome::Success);
    }

    for plan in &plans {
        println!(
            "{} ({} descriptor{} x {} case{})",
            plan.name.bold(),
            plan.descriptors.len(),
            if plan.descriptors.len() == 1 { "" } else { "s" },
            plan.registry.len(),
            if plan.registry.len() == 1 { "" } else { "s" }
        );
        for descriptor in &plan.descriptors {
            match adapter.resolve_subject(descriptor) {
                Ok(handle) => println!(
                    "  {} [{}] -> {}",
                    descriptor.configuration_name(),
                    descriptor,
                    handle.subject_name()
                ),
                Err(err) => println!(
                    "  {} [{}] {}",
                    descriptor.configuration_name(),
                    descriptor,
                    format!("unsupported: {}", err).red()
                ),
            }
            for case in plan.registry.cases() {
                println!("    {}", case.id);
            }
        }
    }

    Ok(Outcome::Success)
}

fn plan_json(adapter: &SubjectAdapter, plan: &SuitePlan) -> serde_json::Value {
    let descriptors: Vec<_> = plan
        .descriptors
        .iter()
        .map(|descriptor| {
            let resolved = adapter.resolve_subject(descriptor);
            json!({
                "descriptor": descriptor.to_string(),
                "configuration": descriptor.configuration_name(),
                "subject": resolved.as_ref().ok().map(|handle| handle.subject_name().to_string()),
                "error": resolved.as_ref().err().map(|err| err.to_string()),
            })
        })
        .collect();
    let cases: Vec<&str> = plan.registry.cases().iter().map(|c| c.id.as_str()).collect();

    json!({
        "suite": plan.name,
        "descriptors": descriptors,
        "cases": cases,
    })
}
