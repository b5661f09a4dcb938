//! Test case identifiers
//!
//! A case id is derived from a fixture's path relative to the suite root:
//! every directory component plus the fixture stem, each normalized to
//! `[A-Za-z0-9_]` and joined with `/`.

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

/// Identifier of one test case within a suite
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCaseId(String);

impl TestCaseId {
    /// Derive the id for a fixture in `relative_dir` with the given stem
    pub fn derive(relative_dir: &Path, stem: &str) -> Self {
        let mut components: Vec<String> = relative_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(normalize_component(&name.to_string_lossy())),
                _ => None,
            })
            .collect();
        components.push(normalize_component(stem));
        Self(components.join("/"))
    }

    /// Parse an id written by hand, e.g. in a case manifest or exclusion list
    pub fn parse(text: &str) -> HarnessResult<Self> {
        let text = text.trim();
        let valid = !text.is_empty()
            && text
                .split('/')
                .all(|component| !component.is_empty() && normalize_component(component) == component);

        if valid {
            Ok(Self(text.to_string()))
        } else {
            Err(HarnessError::InvalidCaseId(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last component, the normalized fixture stem
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize one path component into an identifier fragment
pub fn normalize_component(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match out.chars().next() {
        None => out.push('_'),
        Some(first) if first.is_ascii_digit() => out.insert(0, '_'),
        Some(_) => {}
    }

    out
}
