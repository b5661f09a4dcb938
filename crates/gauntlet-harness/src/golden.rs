//! Golden file comparison and blessing

use difference::{Changeset, Difference};
use std::fs;
use std::io;
use std::path::Path;

/// Unchanged lines kept around each change in a diff
const CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch { diff: String },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

/// Compare two already-normalized texts
pub fn compare(expected: &str, actual: &str) -> Comparison {
    if expected == actual {
        Comparison::Match
    } else {
        Comparison::Mismatch {
            diff: line_diff(expected, actual),
        }
    }
}

/// Line diff with `-` for expected-only and `+` for actual-only lines
pub fn line_diff(expected: &str, actual: &str) -> String {
    let changeset = Changeset::new(
        expected.trim_end_matches('\n'),
        actual.trim_end_matches('\n'),
        "\n",
    );
    let last = changeset.diffs.len().saturating_sub(1);

    let mut out = String::new();
    for (index, diff) in changeset.diffs.iter().enumerate() {
        match diff {
            Difference::Same(chunk) => {
                let lines: Vec<&str> = chunk.split('\n').collect();
                let head = if index == 0 { 0 } else { CONTEXT_LINES };
                let tail = if index == last { 0 } else { CONTEXT_LINES };

                if lines.len() > head + tail + 1 {
                    for line in &lines[..head] {
                        push_line(&mut out, ' ', line);
                    }
                    out.push_str("  ...\n");
                    for line in &lines[lines.len() - tail..] {
                        push_line(&mut out, ' ', line);
                    }
                } else {
                    for line in lines {
                        push_line(&mut out, ' ', line);
                    }
                }
            }
            Difference::Rem(chunk) => {
                for line in chunk.split('\n') {
                    push_line(&mut out, '-', line);
                }
            }
            Difference::Add(chunk) => {
                for line in chunk.split('\n') {
                    push_line(&mut out, '+', line);
                }
            }
        }
    }
    out
}

fn push_line(out: &mut String, marker: char, line: &str) {
    out.push(marker);
    out.push(' ');
    out.push_str(line);
    out.push('\n');
}

/// Write actual output over an expectation file, creating parent directories
pub fn bless(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
