//! Terminal and JSON reports for runs and audits

pub mod json;
pub mod reporter;

pub use json::{coverage_json, run_json};
pub use reporter::{print_coverage_mismatch, RunReporter};
