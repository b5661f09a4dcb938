//! Subject adapter
//!
//! The compiler facility is consumed through one entry point,
//! [`CompilerFacility::compile`]. Subjects are registered per frontend as
//! [`SubjectFactory`] implementations; [`SubjectAdapter::resolve_subject`]
//! checks a descriptor and hands back a [`SubjectHandle`] scoped to it.

use crate::axis::FrontendKind;
use crate::case_id::TestCaseId;
use crate::descriptor::ConfigurationDescriptor;
use crate::error::{HarnessError, HarnessResult};
use crate::units::SourceUnit;
use gauntlet_config::IsolationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

/// What the facility is asked to compile
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub descriptor: ConfigurationDescriptor,
    pub case: &'a TestCaseId,
    pub units: &'a [SourceUnit],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One diagnostic reported by the facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            unit: None,
            line: None,
            column: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn at(mut self, unit: impl Into<String>, line: u32, column: u32) -> Self {
        self.unit = Some(unit.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Everything a facility returns for one compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacilityOutput {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
}

impl FacilityOutput {
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty() && self.artifacts.is_empty()
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn with_artifact(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.artifacts.insert(name.into(), content.into());
        self
    }
}

/// Facility malfunction; the case is recorded as errored
#[derive(Debug, Error)]
pub enum FacilityError {
    #[error("failed to spawn '{program}': {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },

    #[error("facility exited with {}: {stderr}", exit_label(.code))]
    Exited { code: Option<i32>, stderr: String },

    #[error("'{program}' timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("malformed facility output: {0}")]
    Protocol(String),

    #[error("I/O error at {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl FacilityError {
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

/// The subject under test
pub trait CompilerFacility: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<FacilityOutput, FacilityError>;
}

/// Builds facilities for one frontend
pub trait SubjectFactory: Send + Sync {
    /// Human-readable subject name
    fn name(&self) -> &str;

    /// Decline descriptors this subject cannot serve
    fn check(&self, _descriptor: &ConfigurationDescriptor) -> Result<(), String> {
        Ok(())
    }

    /// Build a live facility for the descriptor
    fn create(
        &self,
        descriptor: &ConfigurationDescriptor,
    ) -> Result<Box<dyn CompilerFacility>, FacilityError>;

    /// Whether one facility may serve several cases
    fn is_stateless(&self) -> bool {
        false
    }
}

/// Subject isolation between cases of one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    #[default]
    PerCase,
    /// Share one facility, if the subject is stateless
    PerDescriptor,
}

impl From<IsolationConfig> for Isolation {
    fn from(config: IsolationConfig) -> Self {
        match config {
            IsolationConfig::PerCase => Isolation::PerCase,
            IsolationConfig::PerDescriptor => Isolation::PerDescriptor,
        }
    }
}

/// Registry of subject factories, one per frontend
#[derive(Default, Clone)]
pub struct SubjectAdapter {
    factories: BTreeMap<FrontendKind, Arc<dyn SubjectFactory>>,
}

impl SubjectAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory serving a frontend, replacing any previous one
    pub fn register(&mut self, frontend: FrontendKind, factory: Arc<dyn SubjectFactory>) {
        self.factories.insert(frontend, factory);
    }

    pub fn with_subject(mut self, frontend: FrontendKind, factory: Arc<dyn SubjectFactory>) -> Self {
        self.register(frontend, factory);
        self
    }

    pub fn frontends(&self) -> impl Iterator<Item = FrontendKind> + '_ {
        self.factories.keys().copied()
    }

    /// Resolve a descriptor into a handle.
    ///
    /// Fails with `UnsupportedConfiguration` when the axes are incompatible,
    /// when no subject serves the frontend, or when the subject declines.
    pub fn resolve_subject(
        &self,
        descriptor: &ConfigurationDescriptor,
    ) -> HarnessResult<SubjectHandle> {
        descriptor
            .check_compatibility()
            .map_err(|reason| HarnessError::unsupported(*descriptor, reason))?;

        let factory = self.factories.get(&descriptor.frontend()).ok_or_else(|| {
            HarnessError::unsupported(
                *descriptor,
                format!("no subject registered for frontend {}", descriptor.frontend()),
            )
        })?;

        factory.check(descriptor).map_err(|reason| {
            HarnessError::unsupported(*descriptor, format!("{}: {}", factory.name(), reason))
        })?;

        Ok(SubjectHandle {
            descriptor: *descriptor,
            factory: Arc::clone(factory),
            isolation: Isolation::PerCase,
            shared: OnceLock::new(),
        })
    }
}

impl fmt::Debug for SubjectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.factories.iter().map(|(k, v)| (k, v.name())))
            .finish()
    }
}

/// A subject resolved for exactly one descriptor
pub struct SubjectHandle {
    descriptor: ConfigurationDescriptor,
    factory: Arc<dyn SubjectFactory>,
    isolation: Isolation,
    shared: OnceLock<Result<Arc<dyn CompilerFacility>, String>>,
}

impl SubjectHandle {
    pub fn descriptor(&self) -> &ConfigurationDescriptor {
        &self.descriptor
    }

    pub fn subject_name(&self) -> &str {
        self.factory.name()
    }

    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Whether cases of this descriptor share one facility
    pub fn is_shared(&self) -> bool {
        self.isolation == Isolation::PerDescriptor && self.factory.is_stateless()
    }

    /// Build a fresh facility
    pub fn instantiate(&self) -> Result<Box<dyn CompilerFacility>, FacilityError> {
        self.factory.create(&self.descriptor)
    }

    /// Obtain the facility for one case: the shared instance when sharing
    /// applies, a fresh one otherwise
    pub fn acquire(&self) -> Result<FacilityLease, FacilityError> {
        if !self.is_shared() {
            return self.instantiate().map(FacilityLease::Owned);
        }

        let shared = self.shared.get_or_init(|| {
            self.instantiate()
                .map(Arc::from)
                .map_err(|e| e.to_string())
        });
        match shared {
            Ok(facility) => Ok(FacilityLease::Shared(Arc::clone(facility))),
            Err(message) => Err(FacilityError::Failed(message.clone())),
        }
    }
}

impl fmt::Debug for SubjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectHandle")
            .field("descriptor", &self.descriptor)
            .field("subject", &self.factory.name())
            .field("isolation", &self.isolation)
            .finish()
    }
}

/// A facility borrowed for one case
pub enum FacilityLease {
    Owned(Box<dyn CompilerFacility>),
    Shared(Arc<dyn CompilerFacility>),
}

impl Deref for FacilityLease {
    type Target = dyn CompilerFacility;

    fn deref(&self) -> &Self::Target {
        match self {
            FacilityLease::Owned(facility) => facility.as_ref(),
            FacilityLease::Shared(facility) => facility.as_ref(),
        }
    }
}
