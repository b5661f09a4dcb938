//! Canonical text for facility output
//!
//! Both the actual output and the expectation file pass through
//! [`Normalizer::normalize`]: substitutions first, then [`normalize_text`].
//! Comparison is insensitive to line endings, trailing whitespace and
//! surrounding blank lines.

use crate::subject::{Diagnostic, FacilityOutput};

/// Text rendered for output with neither diagnostics nor artifacts
pub const NO_OUTPUT: &str = "NO OUTPUT";

/// Renders `FacilityOutput` into canonical text
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    substitutions: Vec<(String, String)>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every occurrence of `from` with `to` before normalizing lines
    pub fn with_substitution(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if !from.is_empty() {
            self.substitutions.push((from, to.into()));
        }
        self
    }

    pub fn render(&self, output: &FacilityOutput) -> String {
        let mut sections = Vec::new();

        if !output.diagnostics.is_empty() {
            let mut diagnostics: Vec<&Diagnostic> = output.diagnostics.iter().collect();
            diagnostics.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

            let mut section = String::from("DIAGNOSTICS:");
            for diagnostic in diagnostics {
                section.push('\n');
                section.push_str(&render_diagnostic(diagnostic));
            }
            sections.push(section);
        }

        for (name, content) in &output.artifacts {
            let content = content.trim_end_matches(['\n', '\r']);
            if content.is_empty() {
                sections.push(format!("ARTIFACT {}:", name));
            } else {
                sections.push(format!("ARTIFACT {}:\n{}", name, content));
            }
        }

        if sections.is_empty() {
            sections.push(NO_OUTPUT.to_string());
        }

        self.normalize(&sections.join("\n\n"))
    }

    /// Apply substitutions, then line normalization
    pub fn normalize(&self, text: &str) -> String {
        let substituted = self
            .substitutions
            .iter()
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to));
        normalize_text(&substituted)
    }
}

type SortKey<'a> = (
    Option<&'a str>,
    Option<u32>,
    Option<u32>,
    crate::subject::Severity,
    Option<&'a str>,
    &'a str,
);

fn sort_key(diagnostic: &Diagnostic) -> SortKey<'_> {
    (
        diagnostic.unit.as_deref(),
        diagnostic.line,
        diagnostic.column,
        diagnostic.severity,
        diagnostic.code.as_deref(),
        diagnostic.message.as_str(),
    )
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut line = diagnostic.severity.name().to_string();
    if let Some(code) = &diagnostic.code {
        line.push_str(&format!("[{}]", code));
    }
    if let Some(unit) = &diagnostic.unit {
        line.push(' ');
        line.push_str(unit);
        if let Some(number) = diagnostic.line {
            line.push_str(&format!(":{}:{}", number, diagnostic.column.unwrap_or(1)));
        }
    }
    line.push_str(": ");
    line.push_str(&diagnostic.message);
    line
}

/// Line-level normalization: LF endings, no trailing whitespace, no leading
/// or trailing blank lines, exactly one final newline
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.lines().map(str::trim_end).collect();

    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());

    match (start, end) {
        (Some(start), Some(end)) => {
            let mut out = lines[start..=end].join("\n");
            out.push('\n');
            out
        }
        _ => String::from("\n"),
    }
}
