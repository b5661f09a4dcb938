//! Gauntlet - configuration-matrix conformance harness
//!
//! Runs a directory of fixtures against a compiler facility under one or
//! more configuration descriptors and compares canonical output with golden
//! files stored next to each fixture.
//!
//! # Pipeline
//!
//! 1. [`SuitePlan`] resolves a configured suite: fixture repository, case
//!    registry (discovery or committed manifest), descriptors.
//! 2. [`MatrixRunner`] resolves every descriptor through the
//!    [`SubjectAdapter`] and runs the [`CoverageAuditor`]; either failure
//!    aborts before any case executes.
//! 3. Each (descriptor, case) pair runs through the [`ScenarioRunner`] on a
//!    bounded worker pool and ends in a [`ScenarioResult`].
//!
//! # Example
//!
//! ```no_run
//! use gauntlet_config::ConfigLoader;
//! use gauntlet_harness::{adapter_from_config, MatrixRunner, RunOptions, SuitePlan};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let adapter = adapter_from_config(&config.project, config.project_root()).unwrap();
//! let runner = MatrixRunner::new(adapter, RunOptions::default());
//!
//! for plan in SuitePlan::load_all(&config, None).unwrap() {
//!     let summary = runner.run(&plan).unwrap();
//!     println!("{}: {}/{} passed", summary.suite, summary.passed(), summary.total());
//! }
//! ```

pub mod audit;
pub mod axis;
pub mod case_id;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod execution;
pub mod fixture;
pub mod golden;
pub mod normalize;
pub mod registry;
pub mod scenario;
pub mod subject;
pub mod suite;
pub mod units;

pub use audit::{CoverageAuditor, CoverageReport};
pub use axis::{ApiMode, FrontendKind, ModuleKind, SessionMode};
pub use case_id::TestCaseId;
pub use command::{adapter_from_config, CommandSubjectFactory};
pub use descriptor::ConfigurationDescriptor;
pub use error::{HarnessError, HarnessResult};
pub use execution::{
    CancellationToken, CaseExecution, CaseState, MatrixRunner, Observer, RunOptions, RunSummary,
};
pub use fixture::{FilePattern, TestDataFile, TestDataRepository};
pub use normalize::Normalizer;
pub use registry::{CaseRegistry, CaseSource};
pub use scenario::{ScenarioResult, ScenarioRunner, ScenarioSettings};
pub use subject::{
    CompileRequest, CompilerFacility, Diagnostic, FacilityError, FacilityOutput, Isolation,
    Severity, SubjectAdapter, SubjectFactory, SubjectHandle,
};
pub use suite::SuitePlan;
pub use units::{SourceUnit, UnitError, UnitSplitter};
