// src/diagnostics.rs
//! Structured diagnostics shared by every check.
//!
//! A diagnostic is either located (file + line) or global, carries a
//! severity, and a details payload whose `Display` impl is the
//! human-readable message. The same records serialize to a stable JSON
//! form for tooling.

use std::fmt::Display;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::RuleSetting;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

impl TryFrom<&RuleSetting> for Severity {
    type Error = ();

    fn try_from(setting: &RuleSetting) -> Result<Self, ()> {
        match setting {
            RuleSetting::Error => Ok(Self::Error),
            RuleSetting::Warn => Ok(Self::Warning),
            RuleSetting::Off => Err(()),
        }
    }
}

/// Broad classification used in output and JSON.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum DiagnosticKind {
    Configuration,
    Dependency,
    Interface,
    Deprecated,
    Unused,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum CodeDiagnostic {
    #[error("Cannot import '{dependency}'. Module '{usage_module}' cannot depend on '{definition_module}'.")]
    UndeclaredDependency {
        dependency: String,
        usage_module: String,
        definition_module: String,
    },

    #[error("Cannot import '{dependency}'. Module '{usage_module}' cannot depend on '{definition_module}'.")]
    ForbiddenDependency {
        dependency: String,
        usage_module: String,
        definition_module: String,
    },

    #[error("Import '{dependency}' is deprecated. Module '{usage_module}' should not depend on '{definition_module}'.")]
    DeprecatedDependency {
        dependency: String,
        usage_module: String,
        definition_module: String,
    },

    #[error("Cannot import '{dependency}'. Module '{usage_module}' is not permitted to see '{definition_module}'.")]
    InvisibleDependency {
        dependency: String,
        usage_module: String,
        definition_module: String,
    },

    #[error("Cannot import '{dependency}'. Layer '{usage_layer}' ('{usage_module}') is lower than layer '{definition_layer}' ('{definition_module}').")]
    LayerViolation {
        dependency: String,
        usage_module: String,
        usage_layer: String,
        definition_module: String,
        definition_layer: String,
    },

    #[error("The path '{dependency}' is not part of the public interface for '{definition_module}'.")]
    PrivateImport {
        dependency: String,
        usage_module: String,
        definition_module: String,
    },

    #[error("The import '{dependency}' matches an interface of '{definition_module}' but is not a '{expected}' data type.")]
    InvalidDataTypeExport {
        dependency: String,
        definition_module: String,
        expected: String,
    },

    #[error("Circular dependency detected: {cycle}.")]
    CircularDependency { cycle: String },

    #[error("Module '{usage_module}' declares a dependency on '{definition_module}' which is never imported.")]
    UnusedDependency {
        usage_module: String,
        definition_module: String,
    },

    #[error("Ignore directive is unused.")]
    UnusedIgnoreDirective(),

    #[error("Module '{usage_module}' does not declare a dependency on external package '{dependency}'.")]
    UndeclaredExternal {
        dependency: String,
        usage_module: String,
    },

    #[error("Module '{usage_module}' cannot depend on external package '{dependency}'.")]
    ForbiddenExternal {
        dependency: String,
        usage_module: String,
    },

    #[error("External package '{dependency}' is not declared in the project's dependencies.")]
    UndeclaredProjectExternal { dependency: String },

    #[error("External package '{package}' is declared but never imported.")]
    UnusedProjectExternal { package: String },
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ConfigurationDiagnostic {
    #[error("Module '{module_path}' not found. It will be ignored.")]
    ModuleNotFound { module_path: String },

    #[error("Module containing '{file_module_path}' not found in project.")]
    FileModuleNotFound { file_module_path: String },

    #[error("Layer '{layer}' is not defined in the project.")]
    UnknownLayer { layer: String },

    #[error("Unknown key '{key}' in fence.toml. It will be ignored.")]
    UnknownConfigKey { key: String },

    #[error("Relative import goes beyond the top-level package.")]
    UnresolvableRelativeImport(),

    #[error("Syntax error encountered while scanning imports.")]
    SyntaxError(),

    #[error("Skipped '{file_path}' due to an I/O error.")]
    SkippedFileIoError { file_path: String },

    #[error("No first-party imports were found. Verify the source roots in fence.toml.")]
    NoFirstPartyImportsFound(),

    #[error("Ignore directive is missing a reason.")]
    MissingIgnoreDirectiveReason(),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagnosticDetails {
    Code(CodeDiagnostic),
    Configuration(ConfigurationDiagnostic),
}

impl Display for DiagnosticDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticDetails::Code(code) => write!(f, "{code}"),
            DiagnosticDetails::Configuration(config) => write!(f, "{config}"),
        }
    }
}

impl DiagnosticDetails {
    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            DiagnosticDetails::Configuration(_) => DiagnosticKind::Configuration,
            DiagnosticDetails::Code(code) => match code {
                CodeDiagnostic::DeprecatedDependency { .. } => DiagnosticKind::Deprecated,
                CodeDiagnostic::PrivateImport { .. }
                | CodeDiagnostic::InvalidDataTypeExport { .. } => DiagnosticKind::Interface,
                CodeDiagnostic::UnusedDependency { .. }
                | CodeDiagnostic::UnusedIgnoreDirective()
                | CodeDiagnostic::UnusedProjectExternal { .. } => DiagnosticKind::Unused,
                _ => DiagnosticKind::Dependency,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub details: DiagnosticDetails,
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
}

impl Diagnostic {
    #[must_use]
    pub fn located(
        severity: Severity,
        details: DiagnosticDetails,
        file_path: PathBuf,
        line_number: usize,
    ) -> Self {
        Self {
            severity,
            details,
            file_path: Some(file_path),
            line_number: Some(line_number),
        }
    }

    #[must_use]
    pub fn located_error(details: DiagnosticDetails, file_path: PathBuf, line: usize) -> Self {
        Self::located(Severity::Error, details, file_path, line)
    }

    #[must_use]
    pub fn located_warning(details: DiagnosticDetails, file_path: PathBuf, line: usize) -> Self {
        Self::located(Severity::Warning, details, file_path, line)
    }

    #[must_use]
    pub fn global(severity: Severity, details: DiagnosticDetails) -> Self {
        Self {
            severity,
            details,
            file_path: None,
            line_number: None,
        }
    }

    #[must_use]
    pub fn global_error(details: DiagnosticDetails) -> Self {
        Self::global(Severity::Error, details)
    }

    #[must_use]
    pub fn global_warning(details: DiagnosticDetails) -> Self {
        Self::global(Severity::Warning, details)
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.details.to_string()
    }

    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        self.details.kind()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// The import path the diagnostic is about, when it is about one.
    #[must_use]
    pub fn dependency(&self) -> Option<&str> {
        match &self.details {
            DiagnosticDetails::Code(code) => match code {
                CodeDiagnostic::UndeclaredDependency { dependency, .. }
                | CodeDiagnostic::ForbiddenDependency { dependency, .. }
                | CodeDiagnostic::DeprecatedDependency { dependency, .. }
                | CodeDiagnostic::InvisibleDependency { dependency, .. }
                | CodeDiagnostic::LayerViolation { dependency, .. }
                | CodeDiagnostic::PrivateImport { dependency, .. }
                | CodeDiagnostic::InvalidDataTypeExport { dependency, .. }
                | CodeDiagnostic::UndeclaredExternal { dependency, .. }
                | CodeDiagnostic::ForbiddenExternal { dependency, .. }
                | CodeDiagnostic::UndeclaredProjectExternal { dependency } => Some(dependency),
                _ => None,
            },
            DiagnosticDetails::Configuration(_) => None,
        }
    }

    /// The module doing the importing, for diagnostics that record one.
    #[must_use]
    pub fn usage_module(&self) -> Option<&str> {
        match &self.details {
            DiagnosticDetails::Code(code) => match code {
                CodeDiagnostic::UndeclaredDependency { usage_module, .. }
                | CodeDiagnostic::ForbiddenDependency { usage_module, .. }
                | CodeDiagnostic::DeprecatedDependency { usage_module, .. }
                | CodeDiagnostic::InvisibleDependency { usage_module, .. }
                | CodeDiagnostic::LayerViolation { usage_module, .. }
                | CodeDiagnostic::PrivateImport { usage_module, .. }
                | CodeDiagnostic::UnusedDependency { usage_module, .. }
                | CodeDiagnostic::UndeclaredExternal { usage_module, .. }
                | CodeDiagnostic::ForbiddenExternal { usage_module, .. } => Some(usage_module),
                _ => None,
            },
            DiagnosticDetails::Configuration(_) => None,
        }
    }

    /// The module being imported, for diagnostics that record one.
    #[must_use]
    pub fn definition_module(&self) -> Option<&str> {
        match &self.details {
            DiagnosticDetails::Code(code) => match code {
                CodeDiagnostic::UndeclaredDependency {
                    definition_module, ..
                }
                | CodeDiagnostic::ForbiddenDependency {
                    definition_module, ..
                }
                | CodeDiagnostic::DeprecatedDependency {
                    definition_module, ..
                }
                | CodeDiagnostic::InvisibleDependency {
                    definition_module, ..
                }
                | CodeDiagnostic::LayerViolation {
                    definition_module, ..
                }
                | CodeDiagnostic::PrivateImport {
                    definition_module, ..
                }
                | CodeDiagnostic::UnusedDependency {
                    definition_module, ..
                } => Some(definition_module),
                _ => None,
            },
            DiagnosticDetails::Configuration(_) => None,
        }
    }

    fn sort_key(&self) -> (Option<&PathBuf>, usize, &str, Severity) {
        (
            self.file_path.as_ref(),
            self.line_number.unwrap_or(0),
            self.dependency().unwrap_or(""),
            self.severity,
        )
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "severity": self.severity,
            "kind": self.kind(),
            "file": self.file_path.as_ref().map(|p| p.to_string_lossy()),
            "line": self.line_number,
            "message": self.message(),
        })
    }
}

/// Orders diagnostics by (file, line, import path, severity) and removes
/// exact duplicates, so output is byte-identical across runs.
#[must_use]
pub fn sort_and_dedup(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    diagnostics.dedup();
    diagnostics
}

/// Serializes diagnostics to the stable JSON form.
#[must_use]
pub fn to_json_string(diagnostics: &[Diagnostic]) -> String {
    let values: Vec<serde_json::Value> = diagnostics.iter().map(Diagnostic::to_json).collect();
    serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
}
