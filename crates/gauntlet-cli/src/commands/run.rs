//! Run command - audit, then execute the configuration matrix

use super::Outcome;
use crate::reporting::{self, RunReporter};
use anyhow::Result;
use colored::Colorize;
use gauntlet_config::Config;
use gauntlet_harness::{
    adapter_from_config, CaseExecution, HarnessError, Isolation, MatrixRunner, Normalizer,
    RunOptions, RunSummary, ScenarioSettings, SuitePlan,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Placeholder for the project root in rendered output
pub const PROJECT_DIR_PLACEHOLDER: &str = "$PROJECT_DIR";

/// Arguments for the run command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Run only this suite
    pub suite: Option<String>,
    /// Substring filter on case ids
    pub filter: Option<String>,
    /// Worker count; overrides configuration
    pub jobs: Option<usize>,
    pub fail_fast: bool,
    pub bless: bool,
    /// One line per case instead of dots
    pub verbose: bool,
    pub json: bool,
}

/// Run the run command
pub fn run(config: &Config, args: RunArgs) -> Result<Outcome> {
    let plans = SuitePlan::load_all(config, args.suite.as_deref())?;
    let adapter = adapter_from_config(&config.project, config.project_root())?;
    let mut runner = MatrixRunner::new(adapter, run_options(config, &args));

    // Every suite is resolved and audited before the first case runs
    let mut mismatches = Vec::new();
    for plan in &plans {
        runner.resolve(plan)?;
        match runner.audit(plan) {
            Ok(()) => {}
            Err(HarnessError::CoverageMismatch { suite, report }) => mismatches.push((suite, report)),
            Err(err) => return Err(err.into()),
        }
    }

    if !mismatches.is_empty() {
        if args.json {
            println!("{}", reporting::coverage_json(&mismatches));
        } else {
            for (suite, report) in &mismatches {
                reporting::print_coverage_mismatch(suite, report);
            }
        }
        return Ok(Outcome::Failure);
    }

    let total: usize = plans
        .iter()
        .map(|plan| plan.descriptors.len() * planned_cases(plan, args.filter.as_deref()))
        .sum();

    if total == 0 && !args.json {
        println!("{}", "No cases to run.".yellow());
    }

    let progress = if args.json || args.verbose || total == 0 {
        None
    } else {
        Some(progress_bar(total)?)
    };
    if let Some(bar) = &progress {
        let bar = bar.clone();
        runner = runner.with_observer(Arc::new(move |_execution: &CaseExecution| bar.inc(1)));
    }

    let mut summaries = Vec::with_capacity(plans.len());
    for plan in &plans {
        if let Some(bar) = &progress {
            bar.set_message(plan.name.clone());
        }
        summaries.push(runner.run(plan)?);
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if args.json {
        println!("{}", reporting::run_json(&summaries));
    } else if total > 0 {
        let reporter = RunReporter::new(args.verbose);
        for summary in &summaries {
            reporter.report(summary);
        }
    }

    Ok(Outcome::from_success(
        summaries.iter().all(RunSummary::success),
    ))
}

/// Project settings with command-line flags applied last
fn run_options(config: &Config, args: &RunArgs) -> RunOptions {
    let harness = config.project.harness();

    let mut normalizer = Normalizer::new();
    if let Some(root) = config.project_root() {
        if let Ok(canonical) = root.canonicalize() {
            normalizer = normalizer
                .with_substitution(canonical.display().to_string(), PROJECT_DIR_PLACEHOLDER);
        }
        normalizer =
            normalizer.with_substitution(root.display().to_string(), PROJECT_DIR_PLACEHOLDER);
    }

    RunOptions {
        jobs: args.jobs.or_else(|| config.jobs()),
        fail_fast: args.fail_fast || harness.fail_fast.unwrap_or(false),
        filter: args.filter.clone(),
        isolation: harness.isolation.map(Isolation::from).unwrap_or_default(),
        verbose: args.verbose,
        scenario: ScenarioSettings {
            expectation_extension: harness.expectation_extension().to_string(),
            bless: args.bless || harness.bless.unwrap_or(false),
            normalizer,
            ..Default::default()
        },
    }
}

fn planned_cases(plan: &SuitePlan, filter: Option<&str>) -> usize {
    match filter {
        Some(pattern) => plan.registry.filter(pattern).len(),
        None => plan.registry.len(),
    }
}

fn progress_bar(total: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}
