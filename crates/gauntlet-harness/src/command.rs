//! Command subject
//!
//! Runs an external compiler-facility executable once per compile. Source
//! units are written into a scratch directory, described by `units.json`,
//! and the process reports back either a JSON `FacilityOutput` or raw text.

use crate::axis::{FrontendKind, ModuleKind};
use crate::descriptor::ConfigurationDescriptor;
use crate::error::HarnessResult;
use crate::subject::{
    CompileRequest, CompilerFacility, FacilityError, FacilityOutput, SubjectAdapter,
    SubjectFactory,
};
use gauntlet_config::{ConfigError, ProjectConfig, ProtocolConfig, SubjectConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Placeholder for the scratch directory in facility output
pub const WORKDIR_PLACEHOLDER: &str = "$WORKDIR";

/// Name of the unit description written into the scratch directory
pub const UNITS_FILE: &str = "units.json";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
struct CommandSpec {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    protocol: ProtocolConfig,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

/// Subject factory backed by an external executable
#[derive(Debug, Clone)]
pub struct CommandSubjectFactory {
    spec: Arc<CommandSpec>,
    module_kinds: Option<BTreeSet<ModuleKind>>,
    stateless: bool,
}

impl CommandSubjectFactory {
    /// Build from a `[subject.<frontend>]` section.
    ///
    /// A relative program path containing a separator is resolved against
    /// the project root; a bare name is looked up on `PATH`.
    pub fn from_config(
        frontend: FrontendKind,
        config: &SubjectConfig,
        project_root: Option<&Path>,
    ) -> HarnessResult<Self> {
        config.validate(frontend.name())?;

        let Some((program, args)) = config.command.split_first() else {
            return Err(ConfigError::invalid_value(
                format!("subject.{}.command", frontend),
                "command cannot be empty",
            )
            .into());
        };
        let name = format!("{} ({})", frontend, program);
        let program = resolve_program(program, project_root);

        let module_kinds = if config.module_kinds.is_empty() {
            None
        } else {
            Some(
                config
                    .module_kinds
                    .iter()
                    .map(|kind| kind.parse::<ModuleKind>())
                    .collect::<HarnessResult<BTreeSet<_>>>()?,
            )
        };

        Ok(Self {
            spec: Arc::new(CommandSpec {
                name,
                program,
                args: args.to_vec(),
                protocol: config.protocol(),
                env: config.env.clone(),
                timeout: config.timeout(),
            }),
            module_kinds,
            stateless: config.stateless.unwrap_or(false),
        })
    }
}

fn resolve_program(program: &str, project_root: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(program);
    match project_root {
        Some(root) if path.is_relative() && path.components().count() > 1 => root.join(path),
        _ => path,
    }
}

impl SubjectFactory for CommandSubjectFactory {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn check(&self, descriptor: &ConfigurationDescriptor) -> Result<(), String> {
        match &self.module_kinds {
            Some(kinds) if !kinds.contains(&descriptor.module_kind()) => Err(format!(
                "module kind {} is not in the subject's module-kinds",
                descriptor.module_kind()
            )),
            _ => Ok(()),
        }
    }

    fn create(
        &self,
        _descriptor: &ConfigurationDescriptor,
    ) -> Result<Box<dyn CompilerFacility>, FacilityError> {
        Ok(Box::new(CommandFacility {
            spec: Arc::clone(&self.spec),
        }))
    }

    fn is_stateless(&self) -> bool {
        self.stateless
    }
}

/// Register a command subject for every `[subject.<frontend>]` section
pub fn adapter_from_config(
    project: &ProjectConfig,
    project_root: Option<&Path>,
) -> HarnessResult<SubjectAdapter> {
    let mut adapter = SubjectAdapter::new();
    for (frontend, config) in &project.subjects {
        let frontend: FrontendKind = frontend.parse()?;
        let factory = CommandSubjectFactory::from_config(frontend, config, project_root)?;
        adapter.register(frontend, Arc::new(factory));
    }
    Ok(adapter)
}

/// One live command facility
pub struct CommandFacility {
    spec: Arc<CommandSpec>,
}

#[derive(Serialize)]
struct UnitsManifest<'a> {
    case: &'a str,
    descriptor: ConfigurationDescriptor,
    modules: Vec<ModuleEntry<'a>>,
}

#[derive(Serialize)]
struct ModuleEntry<'a> {
    name: &'a str,
    dependencies: &'a [String],
    files: Vec<String>,
}

impl CompilerFacility for CommandFacility {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<FacilityOutput, FacilityError> {
        let workdir = tempfile::Builder::new()
            .prefix("gauntlet-")
            .tempdir()
            .map_err(|e| FacilityError::io(std::env::temp_dir(), e))?;

        let units_path = write_units(workdir.path(), request)?;

        let mut command = Command::new(&self.spec.program);
        command
            .args(&self.spec.args)
            .current_dir(workdir.path())
            .envs(&self.spec.env)
            .env("GAUNTLET_FRONTEND", request.descriptor.frontend().name())
            .env("GAUNTLET_MODULE_KIND", request.descriptor.module_kind().name())
            .env("GAUNTLET_SESSION_MODE", request.descriptor.session_mode().name())
            .env("GAUNTLET_API_MODE", request.descriptor.api_mode().name())
            .env("GAUNTLET_WORKDIR", workdir.path())
            .env("GAUNTLET_UNITS", &units_path)
            .env("GAUNTLET_CASE", request.case.as_str())
            .stdin(Stdio::null());
        let output = self.execute(command)?;

        let mut result = match self.spec.protocol {
            ProtocolConfig::Json => parse_json_output(&output)?,
            ProtocolConfig::Text => text_output(&output)?,
        };

        if let Ok(canonical) = workdir.path().canonicalize() {
            replace_in_output(&mut result, &canonical.display().to_string(), WORKDIR_PLACEHOLDER);
        }
        replace_in_output(&mut result, &workdir.path().display().to_string(), WORKDIR_PLACEHOLDER);

        Ok(result)
    }
}

impl CommandFacility {
    fn program(&self) -> String {
        self.spec.program.display().to_string()
    }

    /// Run to completion, or kill the process once the timeout expires.
    /// Stdout and stderr are captured in anonymous files while polling.
    fn execute(&self, mut command: Command) -> Result<Output, FacilityError> {
        let temp = std::env::temp_dir();
        let mut stdout = tempfile::tempfile().map_err(|e| FacilityError::io(&temp, e))?;
        let mut stderr = tempfile::tempfile().map_err(|e| FacilityError::io(&temp, e))?;
        command
            .stdout(stdout.try_clone().map_err(|e| FacilityError::io(&temp, e))?)
            .stderr(stderr.try_clone().map_err(|e| FacilityError::io(&temp, e))?);

        let mut child = command.spawn().map_err(|error| FacilityError::Spawn {
            program: self.program(),
            error,
        })?;

        let status = match self.spec.timeout {
            Some(timeout) => self.wait_with_timeout(&mut child, timeout)?,
            None => child.wait().map_err(|e| FacilityError::io(&self.spec.program, e))?,
        };

        Ok(Output {
            status,
            stdout: read_back(&mut stdout, &temp)?,
            stderr: read_back(&mut stderr, &temp)?,
        })
    }

    fn wait_with_timeout(&self, child: &mut Child, timeout: Duration) -> Result<ExitStatus, FacilityError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(FacilityError::TimedOut {
                        program: self.program(),
                        timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(FacilityError::io(&self.spec.program, e)),
            }
        }
    }
}

fn read_back(file: &mut File, temp: &Path) -> Result<Vec<u8>, FacilityError> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| FacilityError::io(temp, e))?;
    Ok(bytes)
}

fn write_units(workdir: &Path, request: &CompileRequest<'_>) -> Result<PathBuf, FacilityError> {
    let mut modules: Vec<ModuleEntry<'_>> = Vec::new();

    for unit in request.units {
        let relative = Path::new(&unit.module).join(&unit.file_name);
        let path = workdir.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FacilityError::io(parent, e))?;
        }
        fs::write(&path, &unit.text).map_err(|e| FacilityError::io(&path, e))?;

        let file = relative.to_string_lossy().replace('\\', "/");
        match modules.iter_mut().find(|m| m.name == unit.module) {
            Some(module) => module.files.push(file),
            None => modules.push(ModuleEntry {
                name: &unit.module,
                dependencies: &unit.dependencies,
                files: vec![file],
            }),
        }
    }

    let manifest = UnitsManifest {
        case: request.case.as_str(),
        descriptor: request.descriptor,
        modules,
    };
    let units_path = workdir.join(UNITS_FILE);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| FacilityError::Failed(format!("failed to encode {}: {}", UNITS_FILE, e)))?;
    fs::write(&units_path, json).map_err(|e| FacilityError::io(&units_path, e))?;

    Ok(units_path)
}

fn parse_json_output(output: &Output) -> Result<FacilityOutput, FacilityError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        return Err(FacilityError::Exited {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    serde_json::from_str(stdout.trim()).map_err(|e| FacilityError::Protocol(e.to_string()))
}

fn text_output(output: &Output) -> Result<FacilityOutput, FacilityError> {
    let Some(code) = output.status.code() else {
        return Err(FacilityError::Exited {
            code: None,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    };

    let mut result = FacilityOutput::default()
        .with_artifact("stdout", String::from_utf8_lossy(&output.stdout))
        .with_artifact("exit", code.to_string());
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        result = result.with_artifact("stderr", stderr);
    }
    Ok(result)
}

fn replace_in_output(output: &mut FacilityOutput, from: &str, to: &str) {
    if from.is_empty() {
        return;
    }
    for diagnostic in &mut output.diagnostics {
        diagnostic.message = diagnostic.message.replace(from, to);
        if let Some(unit) = &mut diagnostic.unit {
            *unit = unit.replace(from, to);
        }
    }
    for content in output.artifacts.values_mut() {
        *content = content.replace(from, to);
    }
}
