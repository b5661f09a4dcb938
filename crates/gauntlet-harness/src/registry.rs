//! Case registry
//!
//! The declared case set of a suite comes either from a committed case
//! manifest (one id per line, `#` comments) or, without one, from discovery
//! itself. Only declared cases that have a fixture are executable.

use crate::case_id::TestCaseId;
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::{TestDataFile, TestDataRepository};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the declared case set came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseSource {
    Discovery,
    Manifest(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CaseRegistry {
    source: CaseSource,
    declared: BTreeSet<TestCaseId>,
    excluded: BTreeSet<TestCaseId>,
    cases: Vec<TestDataFile>,
}

impl CaseRegistry {
    /// Build the registry for a repository.
    ///
    /// `manifest` pins the declared set; `excluded` ids are never executed.
    pub fn load(
        repository: &TestDataRepository,
        manifest: Option<&Path>,
        excluded: BTreeSet<TestCaseId>,
    ) -> HarnessResult<Self> {
        let discovered = repository.discover()?;

        let (source, declared) = match manifest {
            Some(path) => (CaseSource::Manifest(path.to_path_buf()), read_manifest(path)?),
            None => (
                CaseSource::Discovery,
                discovered.iter().map(|f| f.id.clone()).collect(),
            ),
        };

        let cases = discovered
            .into_iter()
            .filter(|f| declared.contains(&f.id) && !excluded.contains(&f.id))
            .collect();

        Ok(Self {
            source,
            declared,
            excluded,
            cases,
        })
    }

    pub fn source(&self) -> &CaseSource {
        &self.source
    }

    /// Every declared id, including ones without a fixture
    pub fn declared(&self) -> &BTreeSet<TestCaseId> {
        &self.declared
    }

    pub fn excluded(&self) -> &BTreeSet<TestCaseId> {
        &self.excluded
    }

    /// Executable cases in relative-path order
    pub fn cases(&self) -> &[TestDataFile] {
        &self.cases
    }

    /// Cases whose id contains `pattern`
    pub fn filter(&self, pattern: &str) -> Vec<&TestDataFile> {
        self.cases
            .iter()
            .filter(|case| case.id.as_str().contains(pattern))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Read a case manifest
pub fn read_manifest(path: &Path) -> HarnessResult<BTreeSet<TestCaseId>> {
    let text = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;

    let mut ids = BTreeSet::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let id = TestCaseId::parse(line)
            .map_err(|_| HarnessError::manifest(path, index + 1, format!("invalid case id '{}'", line)))?;
        if !ids.insert(id) {
            return Err(HarnessError::manifest(
                path,
                index + 1,
                format!("case '{}' listed twice", line),
            ));
        }
    }
    Ok(ids)
}

/// Render a manifest for the given ids
pub fn render_manifest(suite: &str, ids: &BTreeSet<TestCaseId>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Case manifest for suite '{}'.", suite);
    let _ = writeln!(out, "# Regenerate with `gauntlet generate`.");
    for id in ids {
        let _ = writeln!(out, "{}", id);
    }
    out
}

/// Rewrite a manifest from discovery. Returns whether the file changed.
pub fn write_manifest(path: &Path, suite: &str, ids: &BTreeSet<TestCaseId>) -> HarnessResult<bool> {
    let content = render_manifest(suite, ids);
    if fs::read_to_string(path).ok().as_deref() == Some(content.as_str()) {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| HarnessError::io(path, e))?;
    Ok(true)
}
