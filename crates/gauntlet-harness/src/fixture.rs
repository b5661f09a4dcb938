//! Test-data repository: fixture discovery and expectation lookup

use crate::axis::FrontendKind;
use crate::case_id::TestCaseId;
use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Regular expression selecting fixture files by name
#[derive(Debug, Clone)]
pub struct FilePattern {
    regex: Regex,
}

impl FilePattern {
    pub fn new(pattern: &str) -> HarnessResult<Self> {
        let regex = Regex::new(pattern).map_err(|error| HarnessError::InvalidPattern {
            pattern: pattern.to_string(),
            error,
        })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Stem of a matching file name, or `None` if the name does not match.
    ///
    /// The first capture group is the stem when the pattern has one;
    /// otherwise the file name minus its last extension.
    pub fn stem(&self, file_name: &str) -> Option<String> {
        let captures = self.regex.captures(file_name)?;
        let stem = match captures.get(1) {
            Some(group) => group.as_str().to_string(),
            None => Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string()),
        };
        Some(stem)
    }
}

/// One fixture file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDataFile {
    pub id: TestCaseId,
    /// Absolute (or root-joined) path
    pub path: PathBuf,
    /// Path relative to the suite root
    pub relative_path: PathBuf,
}

impl TestDataFile {
    /// Read the raw fixture text
    pub fn read(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension of the fixture file, if any
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }

    /// Frontend-specific expectation path, e.g. `name.fir.txt`
    pub fn frontend_expectation_path(&self, frontend: FrontendKind, extension: &str) -> PathBuf {
        self.path
            .with_extension(format!("{}.{}", frontend.name(), extension))
    }

    /// Shared expectation path, e.g. `name.txt`
    pub fn expectation_path(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }

    /// Candidate expectation files, most specific first.
    ///
    /// A candidate equal to the fixture itself is never returned.
    pub fn expectation_candidates(&self, frontend: FrontendKind, extension: &str) -> Vec<PathBuf> {
        [
            self.frontend_expectation_path(frontend, extension),
            self.expectation_path(extension),
        ]
        .into_iter()
        .filter(|candidate| candidate != &self.path)
        .collect()
    }

    /// First existing expectation file
    pub fn find_expectation(&self, frontend: FrontendKind, extension: &str) -> Option<PathBuf> {
        self.expectation_candidates(frontend, extension)
            .into_iter()
            .find(|candidate| candidate.is_file())
    }
}

/// Fixture directory of one suite
#[derive(Debug, Clone)]
pub struct TestDataRepository {
    root: PathBuf,
    pattern: FilePattern,
    recursive: bool,
}

impl TestDataRepository {
    pub fn new(root: impl Into<PathBuf>, pattern: FilePattern, recursive: bool) -> Self {
        Self {
            root: root.into(),
            pattern,
            recursive,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &FilePattern {
        &self.pattern
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Discover all fixtures, ordered by relative path.
    ///
    /// The root must be an existing directory; an empty one is an empty
    /// repository. Two fixtures deriving the same id is an error.
    pub fn discover(&self) -> HarnessResult<Vec<TestDataFile>> {
        let metadata = fs::metadata(&self.root).map_err(|e| HarnessError::io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(HarnessError::io(
                &self.root,
                io::Error::new(io::ErrorKind::InvalidInput, "fixture root is not a directory"),
            ));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        let mut by_id: BTreeMap<TestCaseId, TestDataFile> = BTreeMap::new();
        for entry in walker {
            let entry = entry.map_err(|error| HarnessError::Walk {
                root: self.root.clone(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let Some(stem) = self.pattern.stem(&file_name) else {
                continue;
            };

            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let relative_dir = relative_path.parent().unwrap_or(Path::new(""));
            let id = TestCaseId::derive(relative_dir, &stem);

            if let Some(existing) = by_id.get(&id) {
                return Err(HarnessError::CaseIdCollision {
                    id,
                    first: existing.relative_path.clone(),
                    second: relative_path,
                });
            }

            by_id.insert(
                id.clone(),
                TestDataFile {
                    id,
                    path: entry.path().to_path_buf(),
                    relative_path,
                },
            );
        }

        let mut files: Vec<TestDataFile> = by_id.into_values().collect();
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
