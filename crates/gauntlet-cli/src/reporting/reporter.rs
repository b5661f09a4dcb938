//! Run reporter - display matrix results

use colored::*;
use gauntlet_harness::{CaseExecution, CaseState, CoverageReport, RunSummary};
use std::io::{self, Write};

/// Terminal reporter for suite runs
pub struct RunReporter {
    /// One line per case instead of dots
    verbose: bool,
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RunReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Report one suite to stdout
    pub fn report(&self, summary: &RunSummary) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // A closed stdout leaves nothing useful to do with the error
        let _ = self.write_report(&mut out, summary);
    }

    pub fn write_report(&self, out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
        writeln!(out, "{} {}", "Suite".bold(), summary.suite.bold())?;

        for execution in &summary.executions {
            self.write_case(out, execution)?;
        }

        // Dots need a newline before the summary
        if !self.verbose && !summary.executions.is_empty() {
            writeln!(out)?;
        }

        writeln!(out)?;
        self.write_summary(out, summary)?;
        self.write_details(out, summary, "Failures:", |state| {
            matches!(state, CaseState::Failed { .. })
        })?;
        self.write_details(out, summary, "Errors:", |state| {
            matches!(state, CaseState::Errored { .. })
        })?;
        Ok(())
    }

    fn write_case(&self, out: &mut impl Write, execution: &CaseExecution) -> io::Result<()> {
        let (label, dot) = match execution.state() {
            CaseState::Passed => ("PASS".green().bold(), ".".green()),
            CaseState::Failed { .. } => ("FAIL".red().bold(), "F".red().bold()),
            CaseState::Errored { .. } => ("ERROR".red().bold(), "E".red().bold()),
            CaseState::Pending | CaseState::Running => ("SKIP".yellow().bold(), "-".yellow()),
        };

        if !self.verbose {
            write!(out, "{}", dot)?;
            return out.flush();
        }

        if execution.state().is_terminal() {
            writeln!(
                out,
                "{} {} {} ({:.2?})",
                label,
                execution.descriptor.configuration_name(),
                execution.case,
                execution.duration()
            )
        } else {
            writeln!(
                out,
                "{} {} {} (not run)",
                label,
                execution.descriptor.configuration_name(),
                execution.case
            )
        }
    }

    fn write_summary(&self, out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
        writeln!(out, "{}", "─".repeat(50))?;

        let status = if summary.success() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };

        let highlight = |count: usize, color: Color| {
            if count > 0 {
                count.to_string().color(color).bold()
            } else {
                count.to_string().normal()
            }
        };

        writeln!(
            out,
            "Result: {} | {} total, {} passed, {} failed, {} errored, {} not run",
            status,
            summary.total().to_string().bold(),
            summary.passed().to_string().green().bold(),
            highlight(summary.failed(), Color::Red),
            highlight(summary.errored(), Color::Red),
            highlight(summary.not_run(), Color::Yellow),
        )?;
        writeln!(out, "Time: {:.2?}", summary.duration)
    }

    fn write_details(
        &self,
        out: &mut impl Write,
        summary: &RunSummary,
        title: &str,
        select: impl Fn(&CaseState) -> bool,
    ) -> io::Result<()> {
        let selected: Vec<&CaseExecution> = summary
            .executions
            .iter()
            .filter(|e| select(e.state()))
            .collect();

        if selected.is_empty() {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "{}", title.red().bold())?;
        writeln!(out)?;

        for execution in selected {
            writeln!(
                out,
                "  {} {} [{}]",
                "●".red(),
                execution.path.display(),
                execution.descriptor
            )?;
            writeln!(out, "    {}", execution.case.as_str().bold())?;

            let detail = match execution.state() {
                CaseState::Failed { reason } => reason.as_str(),
                CaseState::Errored { cause } => cause.as_str(),
                _ => "",
            };
            for line in detail.lines() {
                writeln!(out, "      {}", line.dimmed())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Report a coverage mismatch on stderr
pub fn print_coverage_mismatch(suite: &str, report: &CoverageReport) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    let _ = write_coverage_mismatch(&mut out, suite, report);
}

pub fn write_coverage_mismatch(
    out: &mut impl Write,
    suite: &str,
    report: &CoverageReport,
) -> io::Result<()> {
    writeln!(
        out,
        "{} suite '{}' does not match its declared cases",
        "Coverage mismatch:".red().bold(),
        suite
    )?;
    for id in &report.missing {
        writeln!(out, "  {} {} {}", "+".yellow(), id, "(fixture not declared)".dimmed())?;
    }
    for id in &report.orphaned {
        writeln!(out, "  {} {} {}", "-".yellow(), id, "(declared, no fixture)".dimmed())?;
    }
    writeln!(
        out,
        "Run `gauntlet generate` to rewrite the manifest, or exclude the case in gauntlet.toml."
    )
}
