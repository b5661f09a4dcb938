//! Matrix runs: resolution, coverage, execution order, cancellation

mod common;

use common::*;
use gauntlet_harness::{
    ApiMode, CaseExecution, CaseState, ConfigurationDescriptor, CoverageAuditor, FrontendKind,
    HarnessError, Isolation, MatrixRunner, ModuleKind, RunOptions, ScenarioSettings, SessionMode,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SRC: &str = r"^(.+)\.src$";

fn options(jobs: usize) -> RunOptions {
    RunOptions {
        jobs: Some(jobs),
        ..Default::default()
    }
}

fn passing_tree(names: &[&str]) -> FixtureTree {
    let tree = FixtureTree::new();
    for name in names {
        let fixture = format!("{}.src", name);
        let text = format!("body of {}\n", name);
        tree.write(&fixture, &text)
            .write(&format!("{}.txt", name), &echo_expectation(&fixture, &text));
    }
    tree
}

// ============================================================================
// Coverage
// ============================================================================

#[test]
fn test_bijection_then_orphan_after_delete() {
    let tree = passing_tree(&["x", "y"]);
    let declared = BTreeSet::from([id("x"), id("y")]);
    let repository = tree.repository(SRC);

    let report = CoverageAuditor::audit(&repository, &BTreeSet::new(), &declared).unwrap();
    assert!(report.is_empty());

    tree.remove("y.src");
    let report = CoverageAuditor::audit(&repository, &BTreeSet::new(), &declared).unwrap();
    assert_eq!(report.orphaned, BTreeSet::from([id("y")]));
    assert!(report.missing.is_empty());
}

#[test]
fn test_empty_repository_and_registry_is_vacuous_pass() {
    let tree = FixtureTree::new();
    let report =
        CoverageAuditor::audit(&tree.repository(SRC), &BTreeSet::new(), &BTreeSet::new()).unwrap();
    assert!(report.is_empty());

    let factory = MockFactory::new(Behavior::Echo);
    let summary = MatrixRunner::new(adapter(factory.clone()), options(2))
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    assert_eq!(summary.total(), 0);
    assert!(summary.success());
    assert_eq!(factory.calls(), 0);
}

#[test]
fn test_coverage_mismatch_aborts_before_any_case() {
    let tree = passing_tree(&["x", "y"]);
    let manifest = tree.temp.path().join("suite.cases");
    std::fs::write(&manifest, "x\ny\n").unwrap();
    tree.remove("y.src");

    let factory = MockFactory::new(Behavior::Echo);
    let plan = tree.plan_with(SRC, vec![fir_library_binary()], Some(&manifest), BTreeSet::new());
    let err = MatrixRunner::new(adapter(factory.clone()), options(1))
        .run(&plan)
        .unwrap_err();

    match err {
        HarnessError::CoverageMismatch { report, .. } => {
            assert_eq!(report.orphaned, BTreeSet::from([id("y")]));
        }
        other => panic!("expected coverage mismatch, got {other}"),
    }
    assert_eq!(factory.calls(), 0);
}

#[test]
fn test_undeclared_fixture_is_missing() {
    let tree = passing_tree(&["x", "z"]);
    let manifest = tree.temp.path().join("suite.cases");
    std::fs::write(&manifest, "x\n").unwrap();

    let plan = tree.plan_with(SRC, vec![fir_library_binary()], Some(&manifest), BTreeSet::new());
    let err = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options(1))
        .run(&plan)
        .unwrap_err();

    assert!(err.to_string().contains("missing case: z"));
    assert!(!err.is_configuration_error());
}

#[test]
fn test_excluded_fixture_neither_audited_nor_run() {
    let tree = passing_tree(&["x"]);
    tree.write("broken.src", "no expectation\n");

    let factory = MockFactory::new(Behavior::Echo);
    let plan = tree.plan_with(SRC, vec![fir_library_binary()], None, BTreeSet::from([id("broken")]));
    let summary = MatrixRunner::new(adapter(factory.clone()), options(1))
        .run(&plan)
        .unwrap();

    assert_eq!(summary.total(), 1);
    assert!(summary.success());
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_unsupported_descriptor_aborts_before_any_case() {
    let tree = passing_tree(&["x"]);
    let factory = MockFactory::new(Behavior::Echo);
    let unsupported = ConfigurationDescriptor::new(
        FrontendKind::Fe10,
        ModuleKind::Source,
        SessionMode::Normal,
        ApiMode::Ide,
    );

    let err = MatrixRunner::new(adapter(factory.clone()), options(1))
        .run(&tree.plan(SRC, vec![fir_library_binary(), unsupported]))
        .unwrap_err();

    assert!(matches!(err, HarnessError::UnsupportedConfiguration { descriptor, .. } if descriptor == unsupported));
    assert!(err.is_configuration_error());
    assert_eq!(factory.calls(), 0);
}

#[test]
fn test_every_unsupported_combination_fails_resolution() {
    let adapter = adapter(MockFactory::new(Behavior::Echo));
    for descriptor in ConfigurationDescriptor::matrix().filter(|d| !d.is_compatible()) {
        assert!(
            matches!(
                adapter.resolve_subject(&descriptor),
                Err(HarnessError::UnsupportedConfiguration { .. })
            ),
            "{descriptor} resolved"
        );
    }
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_parallel_results_in_matrix_order() {
    let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let tree = passing_tree(&names);
    let descriptors = vec![fir_library_binary(), fir_source()];

    let summary = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options(4))
        .run(&tree.plan(SRC, descriptors.clone()))
        .unwrap();

    let order: Vec<(ConfigurationDescriptor, String)> = summary
        .executions
        .iter()
        .map(|e| (e.descriptor, e.case.to_string()))
        .collect();
    let expected: Vec<(ConfigurationDescriptor, String)> = descriptors
        .iter()
        .flat_map(|d| names.iter().map(move |n| (*d, n.to_string())))
        .collect();

    assert_eq!(order, expected);
    assert_eq!(summary.passed(), 16);
    assert!(summary.success());
}

#[test]
fn test_failures_and_errors_recorded_and_run_continues() {
    let tree = passing_tree(&["a", "c"]);
    tree.write("b.src", "changed\n")
        .write("b.txt", "ARTIFACT echo:\nmain/b.src:\noriginal\n");
    tree.write("d.src", "no expectation\n");

    let summary = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options(1))
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    let states: Vec<&str> = summary.executions.iter().map(|e| e.state().name()).collect();
    assert_eq!(states, vec!["passed", "failed", "passed", "errored"]);
    assert_eq!((summary.passed(), summary.failed(), summary.errored()), (2, 1, 1));
    assert!(!summary.success());
}

#[test]
fn test_fail_fast_leaves_rest_pending() {
    let tree = FixtureTree::new();
    for name in ["a", "b", "c"] {
        tree.write(&format!("{}.src", name), "x\n");
    }

    let options = RunOptions {
        jobs: Some(1),
        fail_fast: true,
        ..Default::default()
    };
    let summary = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options)
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    assert_eq!(summary.errored(), 1);
    assert_eq!(summary.not_run(), 2);
    assert_eq!(summary.executions[1].state(), &CaseState::Pending);
}

#[test]
fn test_cancelled_token_dispatches_nothing() {
    let tree = passing_tree(&["a", "b"]);
    let factory = MockFactory::new(Behavior::Echo);
    let runner = MatrixRunner::new(adapter(factory.clone()), options(2));
    runner.cancellation_token().cancel();

    let summary = runner.run(&tree.plan(SRC, vec![fir_library_binary()])).unwrap();

    assert_eq!(summary.not_run(), 2);
    assert_eq!(factory.calls(), 0);
}

#[test]
fn test_filter_narrows_execution_not_audit() {
    let tree = passing_tree(&["sealedA", "sealedB", "other"]);
    let options = RunOptions {
        jobs: Some(1),
        filter: Some("sealed".to_string()),
        ..Default::default()
    };

    let summary = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options)
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();
    assert_eq!(summary.total(), 2);

    tree.write("unlisted.src", "new\n");
    let filtered = RunOptions {
        jobs: Some(1),
        filter: Some("sealed".to_string()),
        ..Default::default()
    };
    let manifest = tree.temp.path().join("suite.cases");
    std::fs::write(&manifest, "other\nsealedA\nsealedB\n").unwrap();
    let plan = tree.plan_with(SRC, vec![fir_library_binary()], Some(&manifest), BTreeSet::new());
    assert!(matches!(
        MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), filtered).run(&plan),
        Err(HarnessError::CoverageMismatch { .. })
    ));
}

#[test]
fn test_per_descriptor_isolation_shares_stateless_subject() {
    let tree = passing_tree(&["a", "b", "c"]);
    let factory = MockFactory::stateless(Behavior::Echo);
    let options = RunOptions {
        jobs: Some(2),
        isolation: Isolation::PerDescriptor,
        ..Default::default()
    };

    let summary = MatrixRunner::new(adapter(factory.clone()), options)
        .run(&tree.plan(SRC, vec![fir_library_binary(), fir_source()]))
        .unwrap();

    assert!(summary.success());
    assert_eq!(factory.created(), 2);
    assert_eq!(factory.calls(), 6);
}

#[test]
fn test_per_case_isolation_builds_fresh_subjects() {
    let tree = passing_tree(&["a", "b", "c"]);
    let factory = MockFactory::stateless(Behavior::Echo);

    MatrixRunner::new(adapter(factory.clone()), options(2))
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    assert_eq!(factory.created(), 3);
}

#[test]
fn test_observer_sees_every_completed_case() {
    let tree = passing_tree(&["a", "b", "c"]);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options(3))
        .with_observer(Arc::new(move |execution: &CaseExecution| {
            assert!(execution.state().is_terminal());
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_panicking_facility_does_not_abort_run() {
    let tree = passing_tree(&["a", "b"]);
    let summary = MatrixRunner::new(adapter(MockFactory::new(Behavior::Panic)), options(2))
        .run(&tree.plan(SRC, vec![fir_library_binary()]))
        .unwrap();

    assert_eq!(summary.errored(), 2);
    assert_eq!(summary.not_run(), 0);
}

// ============================================================================
// Blessing
// ============================================================================

fn blessing(jobs: usize) -> RunOptions {
    RunOptions {
        jobs: Some(jobs),
        scenario: ScenarioSettings {
            bless: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_bless_conflict_between_descriptors_is_reported() {
    let tree = FixtureTree::new();
    tree.write("a.src", "x\n");
    let plan = tree.plan(SRC, vec![fir_source(), fir_library_binary()]);

    let blessed = MatrixRunner::new(adapter(MockFactory::new(Behavior::ModuleKind)), blessing(1))
        .run(&plan)
        .unwrap();

    assert_eq!((blessed.passed(), blessed.failed()), (1, 1));
    assert!(matches!(
        blessed.executions[1].state(),
        CaseState::Failed { reason } if reason.contains("shared with another descriptor")
    ));
    assert_eq!(tree.read("a.txt"), "ARTIFACT module-kind:\nsource\n");

    let rerun = MatrixRunner::new(adapter(MockFactory::new(Behavior::ModuleKind)), options(1))
        .run(&plan)
        .unwrap();
    assert_eq!((rerun.passed(), rerun.failed()), (1, 1));
}

#[test]
fn test_bless_with_agreeing_descriptors_passes_everywhere() {
    let tree = FixtureTree::new();
    for name in ["a", "b", "c"] {
        tree.write(&format!("{}.src", name), &format!("body of {}\n", name));
    }
    let plan = tree.plan(SRC, vec![fir_source(), fir_library_binary()]);

    let blessed = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), blessing(4))
        .run(&plan)
        .unwrap();
    assert_eq!(blessed.passed(), 6);
    assert_eq!(tree.read("b.txt"), echo_expectation("b.src", "body of b\n"));

    let rerun = MatrixRunner::new(adapter(MockFactory::new(Behavior::Echo)), options(2))
        .run(&plan)
        .unwrap();
    assert!(rerun.success());
}
