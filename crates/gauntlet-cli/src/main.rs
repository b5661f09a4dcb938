use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;

mod commands;
mod reporting;

use commands::Outcome;

/// Configuration-matrix conformance harness.
///
/// Runs every fixture of a suite against a compiler facility under each
/// configured descriptor and compares the canonical output with golden
/// files stored next to the fixtures.
///
/// EXAMPLES:
///     gauntlet run                      Audit and run every suite
///     gauntlet run -s multi-module      Run one suite
///     gauntlet run --bless              Rewrite expectations from output
///     gauntlet audit                    Check fixture coverage only
///     gauntlet generate                 Rewrite case manifests
///     gauntlet list                     Print the configuration matrix
///
/// ENVIRONMENT VARIABLES:
///     GAUNTLET_CONFIG     Path to gauntlet.toml
///     GAUNTLET_JOBS       Worker count
///     GAUNTLET_FAIL_FAST  Stop dispatching after the first failure
///     GAUNTLET_BLESS      Rewrite expectations instead of failing
///     GAUNTLET_JSON       Set to '1' for JSON output by default
///     NO_COLOR            Set to disable colored output
///
/// EXIT STATUS:
///     0  every case passed
///     1  a case failed or errored, or coverage does not match
///     2  invalid configuration or unsupported descriptor
#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Use this gauntlet.toml instead of searching upward from the current directory
    #[arg(long, global = true, env = "GAUNTLET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit coverage, then run the configuration matrix
    ///
    /// Every descriptor is resolved and every suite is audited before the
    /// first case runs; either failure aborts the run.
    ///
    /// EXAMPLES:
    ///     gauntlet run                      Run every suite
    ///     gauntlet run -s facility -j 1     One suite, sequentially
    ///     gauntlet run -f sealed            Only cases whose id contains "sealed"
    ///     gauntlet run --json               Machine-readable report
    #[command(visible_alias = "r")]
    Run {
        /// Run only this suite
        #[arg(long, short = 's')]
        suite: Option<String>,
        /// Only run cases whose id contains this text
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Worker count (1 runs sequentially)
        #[arg(long, short = 'j', value_parser = parse_jobs)]
        jobs: Option<usize>,
        /// Stop dispatching cases after the first failure
        #[arg(long)]
        fail_fast: bool,
        /// Write actual output to expectation files instead of failing
        #[arg(long)]
        bless: bool,
        /// One line per case instead of dots
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Output results in JSON format
        #[arg(long, env = "GAUNTLET_JSON")]
        json: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Check that fixtures and declared cases match
    ///
    /// EXAMPLES:
    ///     gauntlet audit                    Audit every suite
    ///     gauntlet audit -s facility --json
    #[command(visible_alias = "a")]
    Audit {
        /// Audit only this suite
        #[arg(long, short = 's')]
        suite: Option<String>,
        /// Output results in JSON format
        #[arg(long, env = "GAUNTLET_JSON")]
        json: bool,
    },

    /// Rewrite case manifests from the fixtures on disk
    ///
    /// Suites without a configured manifest declare their cases by
    /// discovery and are skipped.
    ///
    /// EXAMPLES:
    ///     gauntlet generate                 Rewrite every manifest
    ///     gauntlet generate --check         Fail if a manifest is stale
    #[command(visible_alias = "g")]
    Generate {
        /// Regenerate only this suite's manifest
        #[arg(long, short = 's')]
        suite: Option<String>,
        /// Report stale manifests without writing them
        #[arg(long)]
        check: bool,
    },

    /// Print the configuration matrix
    ///
    /// EXAMPLES:
    ///     gauntlet list
    ///     gauntlet list -s facility --json
    #[command(visible_alias = "ls")]
    List {
        /// List only this suite
        #[arg(long, short = 's')]
        suite: Option<String>,
        /// Output in JSON format
        #[arg(long, env = "GAUNTLET_JSON")]
        json: bool,
    },
}

fn parse_jobs(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(jobs) => Ok(jobs),
        Err(_) => Err(format!("'{}' is not a number", value)),
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match execute(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            commands::error_exit_code(&err)
        }
    };
    process::exit(code);
}

fn execute(cli: Cli) -> Result<Outcome> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            suite,
            filter,
            jobs,
            fail_fast,
            bless,
            verbose,
            json,
            no_color,
        } => {
            commands::apply_color(no_color, &config);
            let args = commands::run::RunArgs {
                suite,
                filter,
                jobs,
                fail_fast,
                bless,
                verbose,
                json,
            };
            commands::run::run(&config, args)
        }
        Commands::Audit { suite, json } => {
            commands::apply_color(false, &config);
            commands::audit::run(&config, suite.as_deref(), json)
        }
        Commands::Generate { suite, check } => {
            commands::apply_color(false, &config);
            commands::generate::run(&config, suite.as_deref(), check)
        }
        Commands::List { suite, json } => commands::list::run(&config, suite.as_deref(), json),
    }
}
