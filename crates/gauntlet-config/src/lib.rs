//! Gauntlet Configuration System
//!
//! Provides configuration management for conformance suites including:
//! - Project configuration (gauntlet.toml): suites, descriptors, subjects
//! - Global user configuration (~/.gauntlet/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.gauntlet/config.toml)
//! 2. Project config (./gauntlet.toml)
//! 3. Environment variables (GAUNTLET_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use gauntlet_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! for suite in &config.project.suites {
//!     println!("{}", suite.name);
//! }
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown suite '{0}'")]
    UnknownSuite(String),

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name of the project configuration file
pub const PROJECT_FILE_NAME: &str = "gauntlet.toml";

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{
    DescriptorSpec, HarnessConfig, IsolationConfig, ProjectConfig, ProtocolConfig, SubjectConfig,
    SuiteConfig,
};
