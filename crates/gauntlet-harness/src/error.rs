/// Harness error types
use crate::audit::CoverageReport;
use crate::case_id::TestCaseId;
use crate::descriptor::ConfigurationDescriptor;
use std::path::PathBuf;
use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that abort a run or reject its inputs.
///
/// Per-case problems are not errors of this type: they are recorded as
/// [`ScenarioResult`](crate::scenario::ScenarioResult) values and the run
/// continues.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Unsupported configuration {descriptor}: {reason}")]
    UnsupportedConfiguration {
        descriptor: ConfigurationDescriptor,
        reason: String,
    },

    #[error("Coverage mismatch in suite '{suite}':\n{report}")]
    CoverageMismatch {
        suite: String,
        report: CoverageReport,
    },

    #[error("Case id '{id}' is derived from both {} and {}", .first.display(), .second.display())]
    CaseIdCollision {
        id: TestCaseId,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid fixture pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        error: regex::Error,
    },

    #[error("Invalid {axis} '{value}', expected one of: {expected}")]
    InvalidAxisValue {
        axis: &'static str,
        value: String,
        expected: String,
    },

    #[error("Invalid case id '{0}'")]
    InvalidCaseId(String),

    #[error("Invalid case manifest {}:{line}: {reason}", .path.display())]
    Manifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Illegal transition for case '{case}': {from} -> {to}")]
    IllegalTransition {
        case: TestCaseId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Failed to walk {}: {error}", .root.display())]
    Walk {
        root: PathBuf,
        error: walkdir::Error,
    },

    #[error("I/O error at {}: {error}", .path.display())]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] gauntlet_config::ConfigError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl HarnessError {
    /// Create an unsupported configuration error
    pub fn unsupported(descriptor: ConfigurationDescriptor, reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            descriptor,
            reason: reason.into(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a manifest error
    pub fn manifest(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the configuration class (bad inputs
    /// rather than a failing suite)
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::CoverageMismatch { .. })
    }
}
