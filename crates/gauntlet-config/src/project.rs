//! Project Configuration (gauntlet.toml)
//!
//! Handles project-level configuration stored in `gauntlet.toml` at the
//! root of a test-data repository: harness settings, suites with their
//! configuration descriptors, and the subjects that implement each frontend.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project configuration from gauntlet.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Harness-wide settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harness: Option<HarnessConfig>,

    /// Conformance suites, in declaration order
    #[serde(default, rename = "suite")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<SuiteConfig>,

    /// Subjects keyed by frontend name
    #[serde(default, rename = "subject")]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub subjects: BTreeMap<String, SubjectConfig>,
}

/// Harness-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct HarnessConfig {
    /// Worker pool size (default: available parallelism)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Subject isolation between cases (default: per-case)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation: Option<IsolationConfig>,

    /// Extension of golden files (default: "txt")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_extension: Option<String>,

    /// Stop dispatching cases after the first failure or error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    /// Overwrite golden files with actual output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bless: Option<bool>,
}

/// Subject isolation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationConfig {
    /// A fresh subject for every case
    #[default]
    PerCase,
    /// One subject shared by all cases of a descriptor
    PerDescriptor,
}

/// One conformance suite: a fixture directory run under one or more descriptors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SuiteConfig {
    /// Suite name (unique within the project)
    pub name: String,

    /// Fixture directory, relative to the project root
    pub root: PathBuf,

    /// Regular expression matched against fixture file names (default: `^(.+)\.kt$`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Descend into subdirectories (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,

    /// Committed case manifest, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// Case ids the coverage check ignores
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Comment prefix of MODULE/FILE markers (default: "//")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_prefix: Option<String>,

    /// Configuration points this suite runs under
    #[serde(default, rename = "descriptor")]
    pub descriptors: Vec<DescriptorSpec>,
}

/// Raw configuration descriptor; axis names are checked by the harness
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DescriptorSpec {
    pub frontend: String,
    pub module_kind: String,
    pub session_mode: String,
    pub api_mode: String,
}

/// External compiler-facility executable for one frontend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SubjectConfig {
    /// Program and arguments
    pub command: Vec<String>,

    /// Output protocol (default: json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolConfig>,

    /// Module kinds this subject accepts (empty: all)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub module_kinds: Vec<String>,

    /// Whether one instance may serve many cases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stateless: Option<bool>,

    /// Extra environment variables
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Seconds one compile may take before the process is killed (default: no limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// How a command subject reports its output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolConfig {
    /// A JSON object with diagnostics and artifacts on stdout
    #[default]
    Json,
    /// Raw stdout, stderr and exit code
    Text,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(harness) = &self.harness {
            harness.validate()?;
        }

        let mut names = HashSet::new();
        for suite in &self.suites {
            suite.validate()?;
            if !names.insert(suite.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate suite name '{}'",
                    suite.name
                )));
            }
        }

        for (frontend, subject) in &self.subjects {
            subject.validate(frontend)?;
        }

        Ok(())
    }

    /// Look up a suite by name
    pub fn suite(&self, name: &str) -> ConfigResult<&SuiteConfig> {
        self.suites
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownSuite(name.to_string()))
    }

    /// Harness settings, or defaults when the section is absent
    pub fn harness(&self) -> HarnessConfig {
        self.harness.clone().unwrap_or_default()
    }
}

impl HarnessConfig {
    /// Validate harness settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.jobs == Some(0) {
            return Err(ConfigError::invalid_value(
                "harness.jobs",
                "must be at least 1",
            ));
        }
        if let Some(ext) = &self.expectation_extension {
            validate_extension("harness.expectation-extension", ext)?;
        }
        Ok(())
    }

    /// Golden file extension, defaulting to "txt"
    pub fn expectation_extension(&self) -> &str {
        self.expectation_extension.as_deref().unwrap_or("txt")
    }

    /// Merge other settings over these; set values win
    pub fn merge(&mut self, other: &HarnessConfig) {
        if other.jobs.is_some() {
            self.jobs = other.jobs;
        }
        if other.isolation.is_some() {
            self.isolation = other.isolation;
        }
        if other.expectation_extension.is_some() {
            self.expectation_extension = other.expectation_extension.clone();
        }
        if other.fail_fast.is_some() {
            self.fail_fast = other.fail_fast;
        }
        if other.bless.is_some() {
            self.bless = other.bless;
        }
    }
}

impl SuiteConfig {
    /// Default fixture pattern
    pub const DEFAULT_PATTERN: &'static str = r"^(.+)\.kt$";

    /// Default marker comment prefix
    pub const DEFAULT_MARKER_PREFIX: &'static str = "//";

    /// Validate one suite
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "suite.name",
                "name cannot be empty",
            ));
        }
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("suite '{}'.root", self.name),
                "root cannot be empty",
            ));
        }
        if self.descriptors.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "suite '{}' declares no descriptor",
                self.name
            )));
        }
        if let Some(prefix) = &self.marker_prefix {
            if prefix.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("suite '{}'.marker-prefix", self.name),
                    "prefix cannot be blank",
                ));
            }
        }
        for id in &self.exclude {
            if id.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("suite '{}'.exclude", self.name),
                    "excluded case id cannot be empty",
                ));
            }
        }
        Ok(())
    }

    /// Fixture file pattern
    pub fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(Self::DEFAULT_PATTERN)
    }

    /// Whether discovery descends into subdirectories
    pub fn recursive(&self) -> bool {
        self.recursive.unwrap_or(true)
    }

    /// Marker comment prefix
    pub fn marker_prefix(&self) -> &str {
        self.marker_prefix
            .as_deref()
            .unwrap_or(Self::DEFAULT_MARKER_PREFIX)
    }
}

impl SubjectConfig {
    /// Validate a subject entry
    pub fn validate(&self, frontend: &str) -> ConfigResult<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("subject.{}.command", frontend),
                "command cannot be empty",
            ));
        }
        if self.env.keys().any(|k| k.is_empty() || k.contains('=')) {
            return Err(ConfigError::invalid_value(
                format!("subject.{}.env", frontend),
                "environment variable names must be non-empty and contain no '='",
            ));
        }
        if self.timeout == Some(0) {
            return Err(ConfigError::invalid_value(
                format!("subject.{}.timeout", frontend),
                "must be at least 1 second",
            ));
        }
        Ok(())
    }

    /// Output protocol
    pub fn protocol(&self) -> ProtocolConfig {
        self.protocol.unwrap_or_default()
    }

    /// Per-compile time limit
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

fn validate_extension(field: &str, ext: &str) -> ConfigResult<()> {
    if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
        return Err(ConfigError::invalid_value(
            field,
            format!("'{}' is not a bare file extension", ext),
        ));
    }
    Ok(())
}
