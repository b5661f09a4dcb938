//! Splitting fixtures into source units
//!
//! A fixture may hold several modules and files, introduced by marker
//! comments:
//!
//! ```text
//! // MODULE: dependency
//! // FILE: MySealedInterface.kt
//! sealed interface MySealedInterface
//!
//! // MODULE: main(dependency)
//! // FILE: main.kt
//! fun box() = "OK"
//! ```
//!
//! Without markers the whole fixture is one unit of module `main`.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the module that holds unmarked text
pub const DEFAULT_MODULE: &str = "main";

/// One logical source file of a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUnit {
    pub module: String,
    pub dependencies: Vec<String>,
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("line {line}: malformed marker '{text}': {reason}")]
    MalformedMarker {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("line {line}: module '{module}' declared twice")]
    DuplicateModule { line: usize, module: String },

    #[error("line {line}: file '{file}' declared twice in module '{module}'")]
    DuplicateFile {
        line: usize,
        module: String,
        file: String,
    },

    #[error("module '{module}' depends on undeclared module '{dependency}'")]
    UnknownDependency { module: String, dependency: String },
}

struct ModuleDraft {
    name: String,
    dependencies: Vec<String>,
    files: Vec<FileDraft>,
}

struct FileDraft {
    name: String,
    lines: Vec<String>,
}

enum Marker {
    Module {
        name: String,
        dependencies: Vec<String>,
    },
    File(String),
}

/// Splits fixture text at MODULE/FILE markers
#[derive(Debug, Clone)]
pub struct UnitSplitter {
    prefix: String,
}

impl UnitSplitter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn split(&self, fixture_name: &str, text: &str) -> Result<Vec<SourceUnit>, UnitError> {
        let extension = Path::new(fixture_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        let markers = text
            .lines()
            .enumerate()
            .map(|(index, raw)| self.parse_marker(index + 1, raw))
            .collect::<Result<Vec<_>, _>>()?;

        // Unmarked: one unit holding the fixture text verbatim
        if markers.iter().all(Option::is_none) {
            return Ok(vec![SourceUnit {
                module: DEFAULT_MODULE.to_string(),
                dependencies: Vec::new(),
                file_name: fixture_name.to_string(),
                text: text.to_string(),
            }]);
        }

        let mut modules: Vec<ModuleDraft> = Vec::new();
        let mut has_open_file = false;

        for ((index, raw), marker) in text.lines().enumerate().zip(markers) {
            let line = index + 1;

            match marker {
                Some(Marker::Module { name, dependencies }) => {
                    if modules.iter().any(|m| m.name == name) {
                        return Err(UnitError::DuplicateModule { line, module: name });
                    }
                    modules.push(ModuleDraft {
                        name,
                        dependencies,
                        files: Vec::new(),
                    });
                    has_open_file = false;
                }
                Some(Marker::File(name)) => {
                    let module = current_module(&mut modules);
                    open_file(module, name, line)?;
                    has_open_file = true;
                }
                None => {
                    if !has_open_file {
                        if raw.trim().is_empty() {
                            continue;
                        }
                        let implicit = modules.is_empty();
                        let module = current_module(&mut modules);
                        let name = if implicit && module.files.is_empty() {
                            fixture_name.to_string()
                        } else {
                            default_file_name(&module.name, extension.as_deref())
                        };
                        open_file(module, name, line)?;
                        has_open_file = true;
                    }
                    if let Some(file) = modules.last_mut().and_then(|m| m.files.last_mut()) {
                        file.lines.push(raw.to_string());
                    }
                }
            }
        }

        let declared: HashSet<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        for module in &modules {
            for dependency in &module.dependencies {
                if !declared.contains(dependency.as_str()) || dependency == &module.name {
                    return Err(UnitError::UnknownDependency {
                        module: module.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let mut units = Vec::new();
        for module in modules {
            if module.files.is_empty() {
                units.push(SourceUnit {
                    file_name: default_file_name(&module.name, extension.as_deref()),
                    module: module.name,
                    dependencies: module.dependencies,
                    text: String::new(),
                });
                continue;
            }
            for file in module.files {
                units.push(SourceUnit {
                    module: module.name.clone(),
                    dependencies: module.dependencies.clone(),
                    file_name: file.name,
                    text: join_lines(&file.lines),
                });
            }
        }

        Ok(units)
    }

    fn parse_marker(&self, line: usize, raw: &str) -> Result<Option<Marker>, UnitError> {
        let Some(rest) = raw.trim_start().strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };
        let rest = rest.trim();

        let malformed = |reason: &str| UnitError::MalformedMarker {
            line,
            text: raw.trim().to_string(),
            reason: reason.to_string(),
        };

        if let Some(body) = rest.strip_prefix("MODULE:") {
            let body = body.trim();
            let (name, dependencies) = match body.find('(') {
                Some(open) => {
                    let inner = body[open + 1..]
                        .strip_suffix(')')
                        .ok_or_else(|| malformed("unbalanced parentheses"))?;
                    if inner.contains(['(', ')']) {
                        return Err(malformed("unbalanced parentheses"));
                    }
                    let dependencies: Vec<String> = inner
                        .split(',')
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string)
                        .collect();
                    (body[..open].trim(), dependencies)
                }
                None if body.contains(')') => return Err(malformed("unbalanced parentheses")),
                None => (body, Vec::new()),
            };
            if !is_module_name(name) {
                return Err(malformed("module name must be a single word"));
            }
            if !dependencies.iter().all(|d| is_module_name(d)) {
                return Err(malformed("dependency must be a module name"));
            }
            return Ok(Some(Marker::Module {
                name: name.to_string(),
                dependencies,
            }));
        }

        if let Some(body) = rest.strip_prefix("FILE:") {
            let name = body.trim();
            if name.is_empty() {
                return Err(malformed("file name cannot be empty"));
            }
            if !is_relative_file_name(name) {
                return Err(malformed("file name must be a relative path"));
            }
            return Ok(Some(Marker::File(name.to_string())));
        }

        Ok(None)
    }
}

impl Default for UnitSplitter {
    fn default() -> Self {
        Self::new("//")
    }
}

fn current_module(modules: &mut Vec<ModuleDraft>) -> &mut ModuleDraft {
    if modules.is_empty() {
        modules.push(ModuleDraft {
            name: DEFAULT_MODULE.to_string(),
            dependencies: Vec::new(),
            files: Vec::new(),
        });
    }
    let last = modules.len() - 1;
    &mut modules[last]
}

fn open_file(module: &mut ModuleDraft, name: String, line: usize) -> Result<(), UnitError> {
    if module.files.iter().any(|f| f.name == name) {
        return Err(UnitError::DuplicateFile {
            line,
            module: module.name.clone(),
            file: name,
        });
    }
    module.files.push(FileDraft {
        name,
        lines: Vec::new(),
    });
    Ok(())
}

fn default_file_name(module: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", module, ext),
        None => module.to_string(),
    }
}

/// One plain path component, so `<workdir>/<module>` stays inside the workdir
fn is_module_name(name: &str) -> bool {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

fn is_relative_file_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn join_lines(lines: &[String]) -> String {
    let mut text = lines.join("\n");
    if !lines.is_empty() {
        text.push('\n');
    }
    text
}
