//! Scenario runner tests: one fixture, one subject, one verdict

mod common;

use common::*;
use gauntlet_harness::{Normalizer, ScenarioResult, ScenarioRunner, ScenarioSettings, TestDataFile};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

const PATTERN: &str = r"^(.+)\.kt$";

fn runner() -> ScenarioRunner {
    ScenarioRunner::new(ScenarioSettings::default())
}

fn blessing_runner() -> ScenarioRunner {
    ScenarioRunner::new(ScenarioSettings {
        bless: true,
        ..Default::default()
    })
}

fn only_case(tree: &FixtureTree) -> TestDataFile {
    let mut files = tree.repository(PATTERN).discover().unwrap();
    assert_eq!(files.len(), 1);
    files.remove(0)
}

fn run_with(behavior: Behavior, runner: &ScenarioRunner, tree: &FixtureTree) -> ScenarioResult {
    let handle = adapter(MockFactory::new(behavior))
        .resolve_subject(&fir_library_binary())
        .unwrap();
    runner.run(&handle, &only_case(tree))
}

fn cause(result: &ScenarioResult) -> &str {
    match result {
        ScenarioResult::Errored { cause } => cause,
        other => panic!("expected errored, got {:?}", other),
    }
}

// ============================================================================
// Verdicts
// ============================================================================

#[test]
fn test_matching_output_passes() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.txt", &echo_expectation("case.kt", "val x = 1\n"));

    assert_eq!(run_with(Behavior::Echo, &runner(), &tree), ScenarioResult::Passed);
}

#[test]
fn test_comparison_ignores_line_endings_and_trailing_whitespace() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n").write(
        "case.txt",
        "\r\nARTIFACT echo:  \r\nmain/case.kt:\r\nval x = 1\t\r\n\r\n",
    );

    assert_eq!(run_with(Behavior::Echo, &runner(), &tree), ScenarioResult::Passed);
}

#[test]
fn test_different_output_fails_with_diff() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.txt", &echo_expectation("case.kt", "val x = 2\n"));

    let result = run_with(Behavior::Echo, &runner(), &tree);
    let ScenarioResult::Failed { reason } = result else {
        panic!("expected failure, got {:?}", result);
    };
    assert!(reason.contains("case.txt"));
    assert!(reason.contains("- val x = 2\n+ val x = 1\n"));
}

#[test]
fn test_missing_expectation_is_errored_not_failed() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n");

    let result = run_with(Behavior::Echo, &runner(), &tree);
    assert!(cause(&result).starts_with("missing expectation file"));
    assert!(cause(&result).ends_with("case.txt"));
}

#[test]
fn test_facility_error_is_errored() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "").write("case.txt", "NO OUTPUT\n");

    let result = run_with(Behavior::Fail, &runner(), &tree);
    assert_eq!(cause(&result), "facility error: backend unavailable");
}

#[test]
fn test_facility_panic_is_errored() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "").write("case.txt", "NO OUTPUT\n");

    let result = run_with(Behavior::Panic, &runner(), &tree);
    assert_eq!(cause(&result), "facility panicked: facility blew up on case");
}

#[test]
fn test_malformed_fixture_is_errored() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "// MODULE: main(missing\n")
        .write("case.txt", "NO OUTPUT\n");

    let result = run_with(Behavior::Echo, &runner(), &tree);
    assert!(cause(&result).starts_with("invalid fixture: line 1: malformed marker"));
}

#[test]
fn test_frontend_specific_expectation_wins() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.txt", "stale shared expectation\n")
        .write("case.fir.txt", &echo_expectation("case.kt", "val x = 1\n"));

    assert_eq!(run_with(Behavior::Echo, &runner(), &tree), ScenarioResult::Passed);
}

#[test]
fn test_substitutions_apply_to_expectation_too() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "see /work/tree/lib.kt\n")
        .write("case.txt", &echo_expectation("case.kt", "see /work/tree/lib.kt\n"));

    let runner = ScenarioRunner::new(ScenarioSettings {
        normalizer: Normalizer::new().with_substitution("/work/tree", "$PROJECT_DIR"),
        ..Default::default()
    });

    assert_eq!(run_with(Behavior::Echo, &runner, &tree), ScenarioResult::Passed);
}

#[test]
fn test_same_pair_twice_gives_same_result() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.txt", &echo_expectation("case.kt", "val y = 1\n"));

    let handle = adapter(MockFactory::new(Behavior::Echo))
        .resolve_subject(&fir_library_binary())
        .unwrap();
    let case = only_case(&tree);
    let runner = runner();

    assert_eq!(runner.run(&handle, &case), runner.run(&handle, &case));
}

// ============================================================================
// Blessing
// ============================================================================

#[test]
fn test_bless_writes_missing_expectation() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n");

    let result = run_with(Behavior::Echo, &blessing_runner(), &tree);

    assert_eq!(result, ScenarioResult::Passed);
    assert_eq!(tree.read("case.txt"), echo_expectation("case.kt", "val x = 1\n"));
}

#[test]
fn test_bless_overwrites_mismatch_in_place() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.fir.txt", "old\n");

    let result = run_with(Behavior::Echo, &blessing_runner(), &tree);

    assert_eq!(result, ScenarioResult::Passed);
    assert_eq!(tree.read("case.fir.txt"), echo_expectation("case.kt", "val x = 1\n"));
    assert!(!tree.path("case.txt").exists());
}

#[test]
fn test_bless_multi_module_fixture() {
    let tree = FixtureTree::new();
    tree.write(
        "compilerPlugin.kt",
        "\
// MODULE: dependency
// FILE: MySealedInterface.kt
sealed interface MySealedInterface
ERROR: sealed hierarchy is open

// MODULE: main(dependency)
// FILE: main.kt
fun box() = \"OK\"
",
    );

    let result = run_with(Behavior::Echo, &blessing_runner(), &tree);
    assert_eq!(result, ScenarioResult::Passed);

    assert_snapshot!(tree.read("compilerPlugin.txt"), @r###"
    DIAGNOSTICS:
    error MySealedInterface.kt:2:1: sealed hierarchy is open

    ARTIFACT echo:
    dependency/MySealedInterface.kt:
    sealed interface MySealedInterface
    ERROR: sealed hierarchy is open

    main/main.kt:
    fun box() = "OK"
    "###);
}

#[test]
fn test_bless_does_not_overwrite_expectation_matched_by_another_descriptor() {
    let tree = FixtureTree::new();
    tree.write("case.kt", "val x = 1\n")
        .write("case.txt", "ARTIFACT module-kind:\nsource\n");

    let subjects = adapter(MockFactory::new(Behavior::ModuleKind));
    let source = subjects.resolve_subject(&fir_source()).unwrap();
    let binary = subjects.resolve_subject(&fir_library_binary()).unwrap();
    let runner = blessing_runner();
    let case = only_case(&tree);

    assert_eq!(runner.run(&source, &case), ScenarioResult::Passed);

    let result = runner.run(&binary, &case);
    let ScenarioResult::Failed { reason } = result else {
        panic!("expected failure, got {:?}", result);
    };
    assert!(reason.contains("shared with another descriptor"));
    assert!(reason.contains("- source\n+ library-binary\n"));
    assert_eq!(tree.read("case.txt"), "ARTIFACT module-kind:\nsource\n");
}
