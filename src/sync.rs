// src/sync.rs
//! The `sync` command: make `fence.toml` match the imports that actually
//! exist.
//!
//! Detection runs the dependency checker with every `depends_on` emptied,
//! so each real cross-module import surfaces as an undeclared-dependency
//! diagnostic. Missing edges are added; with pruning, stale edges and
//! modules that no longer exist on disk are dropped. Running sync twice
//! produces no second-round diff.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;

use crate::checker::{self, CheckOptions};
use crate::config::{
    self, DependencyConfig, ProjectConfig, RootModuleTreatment, ROOT_MODULE_SENTINEL,
};
use crate::diagnostics::{CodeDiagnostic, Diagnostic, DiagnosticDetails};
use crate::modules;

/// Applies detected dependencies to a copy of the config, writes it back,
/// and returns it.
pub fn sync_project(
    project_root: &Path,
    config: &ProjectConfig,
    add_only: bool,
) -> Result<ProjectConfig> {
    let updated = synced_config(project_root, config, add_only)?;
    config::save(project_root, &updated)?;
    Ok(updated)
}

/// Computes the synced configuration without writing it.
pub fn synced_config(
    project_root: &Path,
    config: &ProjectConfig,
    add_only: bool,
) -> Result<ProjectConfig> {
    let cleared = config.with_dependencies_cleared();
    let diagnostics = checker::run(
        project_root,
        &cleared,
        &CheckOptions {
            dependencies: true,
            interfaces: false,
            ..Default::default()
        },
    )?;
    let detected = detect_dependencies(&diagnostics, config.root_module_treatment);

    let mut updated = config.clone();
    let module_paths: Vec<String> = updated.module_paths().map(ToString::to_string).collect();

    for module_path in &module_paths {
        let detected_deps = detected.get(module_path.as_str()).cloned().unwrap_or_default();
        let current_deps: BTreeSet<String> = updated
            .dependencies_for_module(module_path)
            .map(|deps| deps.iter().map(|d| d.path.clone()).collect())
            .unwrap_or_default();

        for dependency in detected_deps.difference(&current_deps) {
            updated.add_dependency(module_path, DependencyConfig::from_path(dependency.clone()));
        }

        if !add_only {
            for dependency in current_deps.difference(&detected_deps) {
                updated.remove_dependency(module_path, dependency);
            }
        }
    }

    if !add_only {
        let source_roots = updated.absolute_source_roots(project_root);
        let missing: BTreeSet<String> = modules::missing_modules(&source_roots, &updated.modules)
            .into_iter()
            .map(|m| m.path.clone())
            .collect();
        updated.modules.retain(|m| !missing.contains(&m.path));
    }

    Ok(updated)
}

/// Gathers `(usage_module, definition_module)` pairs from
/// undeclared-dependency diagnostics. Root edges are kept only when the
/// root policy actually allows declaring them.
fn detect_dependencies(
    diagnostics: &[Diagnostic],
    root_treatment: RootModuleTreatment,
) -> HashMap<String, BTreeSet<String>> {
    let mut detected: HashMap<String, BTreeSet<String>> = HashMap::new();

    for diagnostic in diagnostics {
        let DiagnosticDetails::Code(CodeDiagnostic::UndeclaredDependency {
            usage_module,
            definition_module,
            ..
        }) = &diagnostic.details
        else {
            continue;
        };

        let involves_root =
            usage_module == ROOT_MODULE_SENTINEL || definition_module == ROOT_MODULE_SENTINEL;
        if involves_root && root_treatment != RootModuleTreatment::Allow {
            continue;
        }

        detected
            .entry(usage_module.clone())
            .or_default()
            .insert(definition_module.clone());
    }

    detected
}
