//! Scenario runner: one fixture against one resolved subject

use crate::fixture::TestDataFile;
use crate::golden::{self, Comparison};
use crate::normalize::Normalizer;
use crate::subject::{CompileRequest, SubjectHandle};
use crate::units::UnitSplitter;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Verdict for one (descriptor, case) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum ScenarioResult {
    Passed,
    /// Output differs from the expectation
    Failed { reason: String },
    /// The case could not be evaluated
    Errored { cause: String },
}

impl ScenarioResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioResult::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScenarioResult::Failed { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, ScenarioResult::Errored { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioResult::Passed => "passed",
            ScenarioResult::Failed { .. } => "failed",
            ScenarioResult::Errored { .. } => "errored",
        }
    }

    fn errored(cause: impl fmt::Display) -> Self {
        ScenarioResult::Errored {
            cause: cause.to_string(),
        }
    }
}

/// Settings shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub expectation_extension: String,
    pub marker_prefix: String,
    pub bless: bool,
    pub normalizer: Normalizer,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            expectation_extension: "txt".to_string(),
            marker_prefix: "//".to_string(),
            bless: false,
            normalizer: Normalizer::new(),
        }
    }
}

/// Runs single cases. One runner serves one suite run; in bless mode each
/// expectation file is pinned to the first output settled for it.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    settings: ScenarioSettings,
    splitter: UnitSplitter,
    settled: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl ScenarioRunner {
    pub fn new(settings: ScenarioSettings) -> Self {
        let splitter = UnitSplitter::new(settings.marker_prefix.clone());
        Self {
            settings,
            splitter,
            settled: Arc::default(),
        }
    }

    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    /// Run one case. Never panics on facility misbehavior; every failure
    /// mode is folded into the returned verdict.
    pub fn run(&self, subject: &SubjectHandle, case: &TestDataFile) -> ScenarioResult {
        let actual = match self.observe(subject, case) {
            Ok(actual) => actual,
            Err(result) => return result,
        };

        let frontend = subject.descriptor().frontend();
        let extension = &self.settings.expectation_extension;

        let Some(expectation) = case.find_expectation(frontend, extension) else {
            if self.settings.bless {
                return self.settle(&case.expectation_path(extension), &actual, true);
            }
            return ScenarioResult::errored(format!(
                "missing expectation file {}",
                case.expectation_path(extension).display()
            ));
        };

        let expected = match fs::read_to_string(&expectation) {
            Ok(text) => self.settings.normalizer.normalize(&text),
            Err(e) => {
                return ScenarioResult::errored(format!(
                    "failed to read {}: {}",
                    expectation.display(),
                    e
                ))
            }
        };

        match golden::compare(&expected, &actual) {
            Comparison::Match if self.settings.bless => self.settle(&expectation, &actual, false),
            Comparison::Match => ScenarioResult::Passed,
            Comparison::Mismatch { .. } if self.settings.bless => {
                self.settle(&expectation, &actual, true)
            }
            Comparison::Mismatch { diff } => ScenarioResult::Failed {
                reason: format!(
                    "output differs from {}\n{}",
                    expectation.display(),
                    diff
                ),
            },
        }
    }

    /// Steps up to the canonical actual text
    fn observe(&self, subject: &SubjectHandle, case: &TestDataFile) -> Result<String, ScenarioResult> {
        let contents = case.read().map_err(|e| {
            ScenarioResult::errored(format!("failed to read {}: {}", case.path.display(), e))
        })?;

        let units = self
            .splitter
            .split(&case.file_name(), &contents)
            .map_err(|e| ScenarioResult::errored(format!("invalid fixture: {}", e)))?;

        let request = CompileRequest {
            descriptor: *subject.descriptor(),
            case: &case.id,
            units: &units,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let facility = subject.acquire()?;
            facility.compile(&request)
        }));

        match outcome {
            Ok(Ok(output)) => Ok(self.settings.normalizer.render(&output)),
            Ok(Err(e)) => Err(ScenarioResult::errored(format!("facility error: {}", e))),
            Err(payload) => Err(ScenarioResult::errored(format!(
                "facility panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    /// Pin `path` to `actual` for the rest of the run, writing it when
    /// `write` is set. A path already pinned to different output fails.
    fn settle(&self, path: &Path, actual: &str, write: bool) -> ScenarioResult {
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = settled.get(path) {
            if previous == actual {
                return ScenarioResult::Passed;
            }
            return ScenarioResult::Failed {
                reason: format!(
                    "{} is shared with another descriptor that produced different output in this run\n{}",
                    path.display(),
                    golden::line_diff(previous, actual)
                ),
            };
        }

        if write {
            if let Err(e) = golden::bless(path, actual) {
                return ScenarioResult::errored(format!("failed to write {}: {}", path.display(), e));
            }
        }
        settled.insert(path.to_path_buf(), actual.to_string());
        ScenarioResult::Passed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
