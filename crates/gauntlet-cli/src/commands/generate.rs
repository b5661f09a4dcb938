//! Generate command - rewrite case manifests from discovery

use super::Outcome;
use anyhow::Result;
use colored::*;
use gauntlet_config::Config;
use gauntlet_harness::registry::{render_manifest, write_manifest};
use gauntlet_harness::SuitePlan;
use std::fs;

/// Rewrite (or with `check`, verify) the manifest of each selected suite
pub fn run(config: &Config, suite: Option<&str>, check: bool) -> Result<Outcome> {
    let suites = match suite {
        Some(name) => vec![config.project.suite(name)?],
        None => config.project.suites.iter().collect(),
    };

    let mut stale = 0;
    for suite in suites {
        let Some(manifest) = &suite.manifest else {
            println!(
                "{} {}: no manifest configured, cases are discovered",
                "-".dimmed(),
                suite.name
            );
            continue;
        };

        let path = config.resolve(manifest);
        let ids = SuitePlan::discovered_cases(suite, config)?;

        if check {
            let current = fs::read_to_string(&path).ok();
            if current.as_deref() == Some(render_manifest(&suite.name, &ids).as_str()) {
                println!("{} {}: up to date", "✓".green(), suite.name);
            } else {
                stale += 1;
                println!(
                    "{} {}: {} is stale",
                    "✗".red(),
                    suite.name,
                    path.display()
                );
            }
        } else if write_manifest(&path, &suite.name, &ids)? {
            println!(
                "{} {}: wrote {} case{} to {}",
                "✓".green(),
                suite.name,
                ids.len(),
                if ids.len() == 1 { "" } else { "s" },
                path.display()
            );
        } else {
            println!("{} {}: up to date", "✓".green(), suite.name);
        }
    }

    Ok(Outcome::from_success(stale == 0))
}
