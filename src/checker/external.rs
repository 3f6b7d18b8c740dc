// src/checker/external.rs
//! External package rules.
//!
//! Per-module lists (`depends_on_external` / `cannot_depend_on_external`)
//! run during `check`; `check-external` compares the whole project's
//! external imports against the declared manifests.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use crate::config::{ModuleConfig, ProjectConfig};
use crate::diagnostics::{CodeDiagnostic, Diagnostic, DiagnosticDetails, Severity};
use crate::manifest::{self, DeclaredDependencies};
use crate::modules::ModuleTree;
use crate::resolver::{Resolution, Resolver};
use crate::scanner::{self, Import, ScanContext};
use crate::{discovery, paths, pattern};

/// Per-module external rules for one import. `stdlib` packages are always
/// allowed; when a module declares neither list, the project-wide
/// `external.exclude` allowlist is the only gate and plain `check` leaves
/// the rest to `check-external`.
#[must_use]
pub fn check_import(
    importer: &ModuleConfig,
    package: &str,
    stdlib: bool,
    import: &Import,
    project_excludes: &HashSet<String>,
) -> Option<(Severity, DiagnosticDetails)> {
    if stdlib {
        return None;
    }

    if importer
        .cannot_depend_on_external
        .iter()
        .flatten()
        .any(|p| manifest::normalize_name(p) == package)
    {
        return Some((
            Severity::Error,
            DiagnosticDetails::Code(CodeDiagnostic::ForbiddenExternal {
                dependency: import.module_path.clone(),
                usage_module: importer.path.clone(),
            }),
        ));
    }

    let Some(allowed) = &importer.depends_on_external else {
        return None;
    };

    if allowed
        .iter()
        .any(|p| manifest::normalize_name(p) == package)
        || project_excludes.contains(package)
    {
        return None;
    }

    Some((
        Severity::Error,
        DiagnosticDetails::Code(CodeDiagnostic::UndeclaredExternal {
            dependency: import.module_path.clone(),
            usage_module: importer.path.clone(),
        }),
    ))
}

/// The `check-external` command: every external import must be declared in
/// a manifest, and every declared package must be imported somewhere.
pub fn run_check_external(
    project_root: &Path,
    config: &ProjectConfig,
) -> Result<Vec<Diagnostic>> {
    let source_roots = config.absolute_source_roots(project_root);
    let tree = ModuleTree::build(config)?;
    let declared = manifest::load(project_root);
    let resolver = Resolver::new(&tree, &source_roots, &declared, &config.external);
    let matcher = pattern::PathMatcher::new(
        project_root,
        &config.exclude,
        config.use_default_excludes,
        config.respect_gitignore,
    )?;

    let excludes: HashSet<String> = config
        .external
        .exclude
        .iter()
        .map(|p| manifest::normalize_name(p))
        .collect();

    let mut diagnostics = Vec::new();
    let mut used_packages: HashSet<String> = HashSet::new();

    for source_root in &source_roots {
        for file in discovery::source_files(project_root, source_root, &matcher) {
            let Ok(source) = std::fs::read_to_string(&file) else {
                continue;
            };
            let relative = file
                .strip_prefix(project_root)
                .unwrap_or(&file)
                .to_path_buf();
            let module_path = paths::file_to_module_path(&source_roots, &file);

            let scan = scanner::scan(
                &source,
                &ScanContext {
                    file_module_path: module_path.as_deref(),
                    is_package: paths::is_package_init(&file),
                    ignore_type_checking_imports: config.ignore_type_checking_imports,
                    include_string_imports: config.include_string_imports,
                },
            );

            for import in &scan.imports {
                let (package, stdlib) = match resolver.resolve(&import.module_path) {
                    Resolution::External { package, stdlib } => (package, stdlib),
                    Resolution::Unknown => {
                        (manifest::normalize_name(import.top_level()), false)
                    }
                    Resolution::Internal { .. } | Resolution::Root => continue,
                };
                if stdlib || excludes.contains(&package) {
                    continue;
                }

                if declared.contains(&package) {
                    used_packages.insert(package);
                    continue;
                }

                let suppressed = scan
                    .directives
                    .get(import.line_number)
                    .is_some_and(|d| d.matches_import(import));
                if suppressed {
                    continue;
                }

                diagnostics.push(Diagnostic::located_error(
                    DiagnosticDetails::Code(CodeDiagnostic::UndeclaredProjectExternal {
                        dependency: import.module_path.clone(),
                    }),
                    relative.clone(),
                    import.line_number,
                ));
            }
        }
    }

    diagnostics.extend(unused_declared_packages(
        config,
        &declared,
        &used_packages,
        &excludes,
    ));

    Ok(crate::diagnostics::sort_and_dedup(diagnostics))
}

fn unused_declared_packages(
    config: &ProjectConfig,
    declared: &DeclaredDependencies,
    used: &HashSet<String>,
    excludes: &HashSet<String>,
) -> Vec<Diagnostic> {
    let Ok(severity) = Severity::try_from(&config.rules.unused_external_dependencies) else {
        return Vec::new();
    };

    declared
        .packages
        .iter()
        .filter(|package| !used.contains(*package) && !excludes.contains(*package))
        .map(|package| {
            Diagnostic::global(
                severity,
                DiagnosticDetails::Code(CodeDiagnostic::UnusedProjectExternal {
                    package: package.clone(),
                }),
            )
        })
        .collect()
}
