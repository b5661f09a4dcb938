//! Shared fixtures for harness integration tests
#![allow(dead_code)]

use gauntlet_harness::{
    ApiMode, CaseRegistry, CompileRequest, CompilerFacility, ConfigurationDescriptor, Diagnostic,
    FacilityError, FacilityOutput, FilePattern, FrontendKind, ModuleKind, SessionMode,
    SubjectAdapter, SubjectFactory, SuitePlan, TestCaseId, TestDataRepository,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// What the mock facility does on compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Echo unit texts as an artifact; lines starting with `ERROR:` become diagnostics
    Echo,
    /// Report only the descriptor's module kind
    ModuleKind,
    Fail,
    Panic,
}

pub struct MockFacility {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl CompilerFacility for MockFacility {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<FacilityOutput, FacilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Echo => Ok(echo(request)),
            Behavior::ModuleKind => Ok(FacilityOutput::default()
                .with_artifact("module-kind", request.descriptor.module_kind().name())),
            Behavior::Fail => Err(FacilityError::Failed("backend unavailable".to_string())),
            Behavior::Panic => panic!("facility blew up on {}", request.case),
        }
    }
}

fn echo(request: &CompileRequest<'_>) -> FacilityOutput {
    let mut output = FacilityOutput::default();
    let mut text = String::new();

    for unit in request.units {
        text.push_str(&format!("{}/{}:\n{}", unit.module, unit.file_name, unit.text));
        for (index, line) in unit.text.lines().enumerate() {
            if let Some(message) = line.strip_prefix("ERROR:") {
                output.diagnostics.push(
                    Diagnostic::error(message.trim()).at(unit.file_name.clone(), index as u32 + 1, 1),
                );
            }
        }
    }

    output.with_artifact("echo", text)
}

pub struct MockFactory {
    pub behavior: Behavior,
    pub stateless: bool,
    pub created: AtomicUsize,
    pub calls: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            stateless: false,
            created: AtomicUsize::new(0),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn stateless(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            stateless: true,
            created: AtomicUsize::new(0),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl SubjectFactory for MockFactory {
    fn name(&self) -> &str {
        "mock"
    }

    fn create(
        &self,
        _descriptor: &ConfigurationDescriptor,
    ) -> Result<Box<dyn CompilerFacility>, FacilityError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockFacility {
            behavior: self.behavior,
            calls: Arc::clone(&self.calls),
        }))
    }

    fn is_stateless(&self) -> bool {
        self.stateless
    }
}

pub fn adapter(factory: Arc<MockFactory>) -> SubjectAdapter {
    SubjectAdapter::new().with_subject(FrontendKind::Fir, factory)
}

pub fn fir_library_binary() -> ConfigurationDescriptor {
    ConfigurationDescriptor::new(
        FrontendKind::Fir,
        ModuleKind::LibraryBinary,
        SessionMode::Normal,
        ApiMode::Ide,
    )
}

pub fn fir_source() -> ConfigurationDescriptor {
    ConfigurationDescriptor::new(
        FrontendKind::Fir,
        ModuleKind::Source,
        SessionMode::Normal,
        ApiMode::Ide,
    )
}

pub fn id(text: &str) -> TestCaseId {
    TestCaseId::parse(text).unwrap()
}

/// Temporary fixture tree rooted at `<tmp>/data`
pub struct FixtureTree {
    pub temp: TempDir,
}

impl FixtureTree {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("data")).unwrap();
        Self { temp }
    }

    pub fn root(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn repository(&self, pattern: &str) -> TestDataRepository {
        TestDataRepository::new(self.root(), FilePattern::new(pattern).unwrap(), true)
    }

    /// Plan with the declared set taken from discovery
    pub fn plan(&self, pattern: &str, descriptors: Vec<ConfigurationDescriptor>) -> SuitePlan {
        self.plan_with(pattern, descriptors, None, BTreeSet::new())
    }

    pub fn plan_with(
        &self,
        pattern: &str,
        descriptors: Vec<ConfigurationDescriptor>,
        manifest: Option<&Path>,
        excluded: BTreeSet<TestCaseId>,
    ) -> SuitePlan {
        let repository = self.repository(pattern);
        let registry = CaseRegistry::load(&repository, manifest, excluded).unwrap();
        SuitePlan {
            name: "suite".to_string(),
            repository,
            registry,
            descriptors,
            marker_prefix: "//".to_string(),
            manifest: manifest.map(Path::to_path_buf),
        }
    }
}

/// Expected canonical text for the echo facility over a single-unit fixture
pub fn echo_expectation(file_name: &str, text: &str) -> String {
    format!("ARTIFACT echo:\nmain/{}:\n{}", file_name, text)
}
