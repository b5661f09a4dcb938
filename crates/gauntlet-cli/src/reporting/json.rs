//! JSON documents for `--json` output

use gauntlet_harness::{CaseExecution, CaseState, CoverageReport, RunSummary};
use serde_json::{json, Value};

/// One document covering every suite of a run
pub fn run_json(summaries: &[RunSummary]) -> Value {
    let suites: Vec<Value> = summaries.iter().map(summary_json).collect();

    json!({
        "success": summaries.iter().all(RunSummary::success),
        "total": summaries.iter().map(RunSummary::total).sum::<usize>(),
        "passed": summaries.iter().map(RunSummary::passed).sum::<usize>(),
        "failed": summaries.iter().map(RunSummary::failed).sum::<usize>(),
        "errored": summaries.iter().map(RunSummary::errored).sum::<usize>(),
        "not_run": summaries.iter().map(RunSummary::not_run).sum::<usize>(),
        "suites": suites,
    })
}

fn summary_json(summary: &RunSummary) -> Value {
    let cases: Vec<Value> = summary.executions.iter().map(case_json).collect();

    json!({
        "suite": summary.suite,
        "total": summary.total(),
        "passed": summary.passed(),
        "failed": summary.failed(),
        "errored": summary.errored(),
        "not_run": summary.not_run(),
        "duration_ms": summary.duration.as_millis() as u64,
        "cases": cases,
    })
}

fn case_json(execution: &CaseExecution) -> Value {
    let detail = match execution.state() {
        CaseState::Failed { reason } => Some(reason.as_str()),
        CaseState::Errored { cause } => Some(cause.as_str()),
        _ => None,
    };

    json!({
        "descriptor": execution.descriptor.to_string(),
        "configuration": execution.descriptor.configuration_name(),
        "case": execution.case.as_str(),
        "path": execution.path.display().to_string(),
        "state": execution.state().name(),
        "detail": detail,
        "duration_ms": execution.duration().as_millis() as u64,
    })
}

/// Per-suite coverage reports, from an audit or a run stopped by a mismatch
pub fn coverage_json(reports: &[(String, CoverageReport)]) -> Value {
    let suites: Vec<Value> = reports
        .iter()
        .map(|(suite, report)| {
            json!({
                "suite": suite,
                "missing": report.missing,
                "orphaned": report.orphaned,
            })
        })
        .collect();

    json!({
        "success": reports.iter().all(|(_, report)| report.is_empty()),
        "coverage": suites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_harness::{TestCaseId, TestDataFile};
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::time::Duration;

    fn execution(id: &str, result: Option<gauntlet_harness::ScenarioResult>) -> CaseExecution {
        let file = TestDataFile {
            id: TestCaseId::parse(id).unwrap(),
            path: PathBuf::from(format!("/data/{}.kt", id)),
            relative_path: PathBuf::from(format!("{}.kt", id)),
        };
        let descriptor = "fir/library-binary/normal/ide".parse().unwrap();
        let mut execution = CaseExecution::new(descriptor, &file);
        if let Some(result) = result {
            execution.start().unwrap();
            execution.finish(result, Duration::from_millis(4)).unwrap();
        }
        execution
    }

    #[test]
    fn test_run_json_counts_and_details() {
        let summary = RunSummary {
            suite: "facility".to_string(),
            executions: vec![
                execution("a", Some(gauntlet_harness::ScenarioResult::Passed)),
                execution(
                    "b",
                    Some(gauntlet_harness::ScenarioResult::Errored {
                        cause: "missing expectation file b.txt".to_string(),
                    }),
                ),
                execution("c", None),
            ],
            duration: Duration::from_millis(12),
        };

        let value = run_json(&[summary]);

        assert_eq!(value["success"], false);
        assert_eq!(value["passed"], 1);
        assert_eq!(value["errored"], 1);
        assert_eq!(value["not_run"], 1);
        let cases = &value["suites"][0]["cases"];
        assert_eq!(cases[0]["configuration"], "FirIdeNormalAnalysisLibraryBinaryModule");
        assert_eq!(cases[1]["state"], "errored");
        assert_eq!(cases[1]["detail"], "missing expectation file b.txt");
        assert_eq!(cases[2]["state"], "pending");
        assert!(cases[2]["detail"].is_null());
    }

    #[test]
    fn test_coverage_json_lists_ids() {
        let report = CoverageReport {
            missing: BTreeSet::from([TestCaseId::parse("z").unwrap()]),
            orphaned: BTreeSet::new(),
        };
        let value = coverage_json(&[("facility".to_string(), report)]);

        assert_eq!(value["success"], false);
        assert_eq!(value["coverage"][0]["missing"][0], "z");
        assert_eq!(value["coverage"][0]["orphaned"].as_array().unwrap().len(), 0);
    }
}
