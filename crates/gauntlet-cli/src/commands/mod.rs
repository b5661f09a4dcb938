//! CLI command implementations

pub mod audit;
pub mod generate;
pub mod list;
pub mod run;

use anyhow::Result;
use gauntlet_config::{Config, ConfigError, ConfigLoader, PROJECT_FILE_NAME};
use gauntlet_harness::HarnessError;
use std::path::Path;

/// Exit status for a failed or errored case, or a coverage mismatch
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for invalid configuration or an unsupported descriptor
pub const EXIT_CONFIGURATION: i32 = 2;

/// How a command that ran to completion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => EXIT_FAILURE,
        }
    }
}

/// Exit status for an error that aborted a command
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(harness) = err.downcast_ref::<HarnessError>() {
        if harness.is_configuration_error() {
            EXIT_CONFIGURATION
        } else {
            EXIT_FAILURE
        }
    } else if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIGURATION
    } else {
        EXIT_FAILURE
    }
}

/// Load gauntlet.toml from an explicit path or by walking up from the
/// current directory. Running outside a project is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();

    let config = match explicit {
        Some(path) => loader.load_from_file(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            let config = loader.load_from_directory(&cwd)?;
            if !config.is_project() {
                return Err(ConfigError::NotFound(cwd.join(PROJECT_FILE_NAME)).into());
            }
            config
        }
    };

    Ok(config)
}

/// Disable colors on request or when the user config turns them off.
/// `NO_COLOR` is honored by `colored` itself.
pub fn apply_color(no_color: bool, config: &Config) {
    if no_color || config.global.default_color() == Some(false) {
        colored::control::set_override(false);
    }
}
