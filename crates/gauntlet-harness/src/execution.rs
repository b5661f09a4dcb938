//! Execution engine
//!
//! Runs the (descriptor x case) matrix of a suite on a bounded rayon pool.
//! Descriptor resolution and the coverage audit happen first; either one
//! failing aborts the run before any case executes.

use crate::audit::CoverageAuditor;
use crate::case_id::TestCaseId;
use crate::descriptor::ConfigurationDescriptor;
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::TestDataFile;
use crate::scenario::{ScenarioResult, ScenarioRunner, ScenarioSettings};
use crate::subject::{Isolation, SubjectAdapter, SubjectHandle};
use crate::suite::SuitePlan;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CaseState {
    Pending,
    Running,
    Passed,
    Failed { reason: String },
    Errored { cause: String },
}

impl CaseState {
    pub fn name(&self) -> &'static str {
        match self {
            CaseState::Pending => "pending",
            CaseState::Running => "running",
            CaseState::Passed => "passed",
            CaseState::Failed { .. } => "failed",
            CaseState::Errored { .. } => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseState::Passed | CaseState::Failed { .. } | CaseState::Errored { .. }
        )
    }
}

impl From<ScenarioResult> for CaseState {
    fn from(result: ScenarioResult) -> Self {
        match result {
            ScenarioResult::Passed => CaseState::Passed,
            ScenarioResult::Failed { reason } => CaseState::Failed { reason },
            ScenarioResult::Errored { cause } => CaseState::Errored { cause },
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One (descriptor, case) pair and its progress
#[derive(Debug, Clone)]
pub struct CaseExecution {
    pub descriptor: ConfigurationDescriptor,
    pub case: TestCaseId,
    pub path: PathBuf,
    state: CaseState,
    duration: Duration,
}

impl CaseExecution {
    pub fn new(descriptor: ConfigurationDescriptor, case: &TestDataFile) -> Self {
        Self {
            descriptor,
            case: case.id.clone(),
            path: case.relative_path.clone(),
            state: CaseState::Pending,
            duration: Duration::ZERO,
        }
    }

    pub fn state(&self) -> &CaseState {
        &self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Pending -> Running
    pub fn start(&mut self) -> HarnessResult<()> {
        if self.state != CaseState::Pending {
            return Err(self.illegal("running"));
        }
        self.state = CaseState::Running;
        Ok(())
    }

    /// Running -> Passed | Failed | Errored
    pub fn finish(&mut self, result: ScenarioResult, duration: Duration) -> HarnessResult<()> {
        if self.state != CaseState::Running {
            return Err(self.illegal(result.label()));
        }
        self.state = CaseState::from(result);
        self.duration = duration;
        Ok(())
    }

    fn illegal(&self, to: &'static str) -> HarnessError {
        HarnessError::IllegalTransition {
            case: self.case.clone(),
            from: self.state.name(),
            to,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.state == CaseState::Passed
    }

    /// Whether this execution counts against the run
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self.state, CaseState::Failed { .. } | CaseState::Errored { .. })
    }
}

/// Run-wide cancellation flag; once set, no further case is dispatched
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Callback invoked as each case reaches a terminal state
pub type Observer = Arc<dyn Fn(&CaseExecution) + Send + Sync>;

/// Run-level settings
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Worker count; `None` uses available parallelism, `Some(1)` runs sequentially
    pub jobs: Option<usize>,
    pub fail_fast: bool,
    /// Substring filter on case ids; narrows execution, never the audit
    pub filter: Option<String>,
    pub isolation: Isolation,
    pub verbose: bool,
    pub scenario: ScenarioSettings,
}

/// Outcome of one suite run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub suite: String,
    /// In matrix order: descriptors in configuration order, then cases
    pub executions: Vec<CaseExecution>,
    pub duration: Duration,
}

impl RunSummary {
    fn count(&self, predicate: impl Fn(&CaseState) -> bool) -> usize {
        self.executions
            .iter()
            .filter(|e| predicate(e.state()))
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(|s| *s == CaseState::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, CaseState::Failed { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|s| matches!(s, CaseState::Errored { .. }))
    }

    /// Cases never dispatched because the run was cancelled
    pub fn not_run(&self) -> usize {
        self.count(|s| !s.is_terminal())
    }

    pub fn total(&self) -> usize {
        self.executions.len()
    }

    /// True when every case ran and passed (an empty suite passes)
    pub fn success(&self) -> bool {
        self.passed() == self.total()
    }
}

/// Drives suites through the configuration matrix
pub struct MatrixRunner {
    adapter: SubjectAdapter,
    options: RunOptions,
    token: CancellationToken,
    observer: Option<Observer>,
}

impl MatrixRunner {
    pub fn new(adapter: SubjectAdapter, options: RunOptions) -> Self {
        Self {
            adapter,
            options,
            token: CancellationToken::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Token that stops dispatch when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolve every descriptor of the suite, failing on the first
    /// unsupported one
    pub fn resolve(&self, plan: &SuitePlan) -> HarnessResult<Vec<SubjectHandle>> {
        plan.descriptors
            .iter()
            .map(|descriptor| {
                self.adapter
                    .resolve_subject(descriptor)
                    .map(|handle| handle.with_isolation(self.options.isolation))
            })
            .collect()
    }

    /// Coverage check for the suite; a mismatch is an error
    pub fn audit(&self, plan: &SuitePlan) -> HarnessResult<()> {
        let report = CoverageAuditor::audit(
            &plan.repository,
            plan.registry.excluded(),
            plan.registry.declared(),
        )?;
        if report.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::CoverageMismatch {
                suite: plan.name.clone(),
                report,
            })
        }
    }

    pub fn run(&self, plan: &SuitePlan) -> HarnessResult<RunSummary> {
        let handles = self.resolve(plan)?;
        if self.options.verbose {
            for handle in &handles {
                eprintln!(
                    "Resolved {} -> {}",
                    handle.descriptor().configuration_name(),
                    handle.subject_name()
                );
            }
        }

        self.audit(plan)?;

        let cases: Vec<&TestDataFile> = match &self.options.filter {
            Some(pattern) => plan.registry.filter(pattern),
            None => plan.registry.cases().iter().collect(),
        };

        let matrix: Vec<(&SubjectHandle, &TestDataFile)> = handles
            .iter()
            .flat_map(|handle| cases.iter().map(move |case| (handle, *case)))
            .collect();

        let mut settings = self.options.scenario.clone();
        settings.marker_prefix = plan.marker_prefix.clone();
        let scenario = ScenarioRunner::new(settings);

        let jobs = self.options.jobs.unwrap_or_else(default_jobs).max(1);
        if self.options.verbose {
            eprintln!(
                "Suite {}: {} case(s) x {} descriptor(s) on {} worker(s)",
                plan.name,
                cases.len(),
                handles.len(),
                jobs
            );
        }

        let start = Instant::now();
        let executions = if jobs == 1 {
            matrix
                .iter()
                .map(|(handle, case)| self.execute_case(&scenario, handle, case))
                .collect::<HarnessResult<Vec<_>>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
            pool.install(|| {
                matrix
                    .par_iter()
                    .map(|(handle, case)| self.execute_case(&scenario, handle, case))
                    .collect::<HarnessResult<Vec<_>>>()
            })?
        };

        Ok(RunSummary {
            suite: plan.name.clone(),
            executions,
            duration: start.elapsed(),
        })
    }

    fn execute_case(
        &self,
        scenario: &ScenarioRunner,
        handle: &SubjectHandle,
        case: &TestDataFile,
    ) -> HarnessResult<CaseExecution> {
        let mut execution = CaseExecution::new(*handle.descriptor(), case);
        if self.token.is_cancelled() {
            return Ok(execution);
        }

        let start = Instant::now();
        execution.start()?;
        let result = scenario.run(handle, case);
        execution.finish(result, start.elapsed())?;

        if self.options.fail_fast && execution.is_unsuccessful() {
            self.token.cancel();
        }
        if let Some(observer) = &self.observer {
            observer(&execution);
        }

        Ok(execution)
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
