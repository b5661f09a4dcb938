//! Coverage auditor
//!
//! Checks that fixtures on disk and declared cases are in bijection.
//! Excluded ids are removed from both sides before comparing.

use crate::case_id::TestCaseId;
use crate::error::HarnessResult;
use crate::fixture::TestDataRepository;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Result of one audit; empty means full coverage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Fixtures with no declared case
    pub missing: BTreeSet<TestCaseId>,
    /// Declared cases with no fixture
    pub orphaned: BTreeSet<TestCaseId>,
}

impl CoverageReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.orphaned.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "all fixtures covered");
        }
        let mut first = true;
        for (label, ids) in [("missing", &self.missing), ("orphaned", &self.orphaned)] {
            for id in ids {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                write!(f, "  {} case: {}", label, id)?;
            }
        }
        Ok(())
    }
}

pub struct CoverageAuditor;

impl CoverageAuditor {
    /// Walk the repository and compare what it holds with `declared`
    pub fn audit(
        repository: &TestDataRepository,
        excluded: &BTreeSet<TestCaseId>,
        declared: &BTreeSet<TestCaseId>,
    ) -> HarnessResult<CoverageReport> {
        let found: BTreeSet<TestCaseId> = repository
            .discover()?
            .into_iter()
            .map(|file| file.id)
            .collect();
        Ok(Self::compare(&found, declared, excluded))
    }

    /// Pure set comparison
    pub fn compare(
        found: &BTreeSet<TestCaseId>,
        declared: &BTreeSet<TestCaseId>,
        excluded: &BTreeSet<TestCaseId>,
    ) -> CoverageReport {
        CoverageReport {
            missing: found
                .difference(declared)
                .filter(|id| !excluded.contains(*id))
                .cloned()
                .collect(),
            orphaned: declared
                .difference(found)
                .filter(|id| !excluded.contains(*id))
                .cloned()
                .collect(),
        }
    }
}
