// src/config/io.rs
//! Reading and writing `fence.toml`.
//!
//! Unknown keys are reported as warnings, never errors, so configs written
//! by newer versions still load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml::Value;

use crate::diagnostics::{ConfigurationDiagnostic, Diagnostic, DiagnosticDetails};

use super::types::ProjectConfig;

pub const CONFIG_FILE: &str = "fence.toml";

const PROJECT_KEYS: [&str; 17] = [
    "modules",
    "interfaces",
    "layers",
    "source_roots",
    "exclude",
    "use_default_excludes",
    "respect_gitignore",
    "ignore_type_checking_imports",
    "include_string_imports",
    "forbid_circular_dependencies",
    "exact",
    "root_module_treatment",
    "rules",
    "cache",
    "external",
    "commands",
    "version",
];

const MODULE_KEYS: [&str; 10] = [
    "path",
    "depends_on",
    "cannot_depend_on",
    "depends_on_external",
    "cannot_depend_on_external",
    "visibility",
    "layer",
    "strict",
    "utility",
    "unchecked",
];

const INTERFACE_KEYS: [&str; 5] = ["expose", "from", "visibility", "data_types", "exclusive"];

/// Walks upward from `start` until a directory containing `fence.toml` is
/// found.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(CONFIG_FILE).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Loads and parses the project configuration. Parse failures are hard
/// errors (exit code 2 at the boundary); unknown keys come back as
/// warning diagnostics.
pub fn load(project_root: &Path) -> Result<(ProjectConfig, Vec<Diagnostic>)> {
    let path = project_root.join(CONFIG_FILE);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse(&content).with_context(|| format!("Could not parse {}", path.display()))
}

pub fn parse(content: &str) -> Result<(ProjectConfig, Vec<Diagnostic>)> {
    let value: Value = toml::from_str(content)?;
    let warnings = unknown_key_warnings(&value);
    let config: ProjectConfig = toml::from_str(content)?;
    Ok((config, warnings))
}

/// Writes the configuration back, used by `sync`.
pub fn save(project_root: &Path, config: &ProjectConfig) -> Result<()> {
    let path = project_root.join(CONFIG_FILE);
    let serialized = toml::to_string_pretty(config).context("Could not serialize fence.toml")?;
    fs::write(&path, serialized)
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(())
}

fn unknown_key_warnings(value: &Value) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    let Some(table) = value.as_table() else {
        return warnings;
    };

    for key in table.keys() {
        if !PROJECT_KEYS.contains(&key.as_str()) {
            warnings.push(unknown_key(key));
        }
    }

    warn_entry_keys(table.get("modules"), &MODULE_KEYS, &mut warnings);
    warn_entry_keys(table.get("interfaces"), &INTERFACE_KEYS, &mut warnings);

    warnings
}

fn warn_entry_keys(entries: Option<&Value>, known: &[&str], warnings: &mut Vec<Diagnostic>) {
    let Some(entries) = entries.and_then(Value::as_array) else {
        return;
    };
    for entry in entries.iter().filter_map(Value::as_table) {
        for key in entry.keys() {
            if !known.contains(&key.as_str()) {
                warnings.push(unknown_key(key));
            }
        }
    }
}

fn unknown_key(key: &str) -> Diagnostic {
    Diagnostic::global_warning(DiagnosticDetails::Configuration(
        ConfigurationDiagnostic::UnknownConfigKey {
            key: key.to_string(),
        },
    ))
}
