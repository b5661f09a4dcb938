//! Suite plans: a configured suite resolved against the project root

use crate::case_id::TestCaseId;
use crate::descriptor::ConfigurationDescriptor;
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::{FilePattern, TestDataRepository};
use crate::registry::CaseRegistry;
use gauntlet_config::{Config, ConfigError, SuiteConfig};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Everything needed to audit and execute one suite
#[derive(Debug, Clone)]
pub struct SuitePlan {
    pub name: String,
    pub repository: TestDataRepository,
    pub registry: CaseRegistry,
    pub descriptors: Vec<ConfigurationDescriptor>,
    pub marker_prefix: String,
    pub manifest: Option<PathBuf>,
}

impl SuitePlan {
    pub fn from_config(suite: &SuiteConfig, config: &Config) -> HarnessResult<Self> {
        let repository = repository(suite, config)?;
        let excluded = exclusions(suite)?;

        let mut descriptors = Vec::with_capacity(suite.descriptors.len());
        for spec in &suite.descriptors {
            let descriptor = ConfigurationDescriptor::from_spec(spec)?;
            if descriptors.contains(&descriptor) {
                return Err(HarnessError::Config(ConfigError::ValidationError(format!(
                    "suite '{}' declares descriptor {} twice",
                    suite.name, descriptor
                ))));
            }
            descriptors.push(descriptor);
        }

        let manifest = suite.manifest.as_deref().map(|path| config.resolve(path));
        let registry = CaseRegistry::load(&repository, manifest.as_deref(), excluded)?;

        Ok(Self {
            name: suite.name.clone(),
            repository,
            registry,
            descriptors,
            marker_prefix: suite.marker_prefix().to_string(),
            manifest,
        })
    }

    /// Ids a regenerated manifest declares: every discovered fixture that is
    /// not excluded. Does not read the current manifest.
    pub fn discovered_cases(
        suite: &SuiteConfig,
        config: &Config,
    ) -> HarnessResult<BTreeSet<TestCaseId>> {
        let excluded = exclusions(suite)?;
        Ok(repository(suite, config)?
            .discover()?
            .into_iter()
            .map(|file| file.id)
            .filter(|id| !excluded.contains(id))
            .collect())
    }

    /// Plans for every suite, or only the named one
    pub fn load_all(config: &Config, only: Option<&str>) -> HarnessResult<Vec<Self>> {
        match only {
            Some(name) => Ok(vec![Self::from_config(config.project.suite(name)?, config)?]),
            None => config
                .project
                .suites
                .iter()
                .map(|suite| Self::from_config(suite, config))
                .collect(),
        }
    }
}

fn repository(suite: &SuiteConfig, config: &Config) -> HarnessResult<TestDataRepository> {
    let pattern = FilePattern::new(suite.pattern())?;
    Ok(TestDataRepository::new(
        config.resolve(&suite.root),
        pattern,
        suite.recursive(),
    ))
}

fn exclusions(suite: &SuiteConfig) -> HarnessResult<BTreeSet<TestCaseId>> {
    suite.exclude.iter().map(|id| TestCaseId::parse(id)).collect()
}
