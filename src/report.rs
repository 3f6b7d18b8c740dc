// src/report.rs
//! The `report` command: what a path depends on and who uses it.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::config::ProjectConfig;
use crate::manifest;
use crate::modules::ModuleTree;
use crate::pattern::PathMatcher;
use crate::resolver::{Resolution, Resolver};
use crate::scanner::{self, ScanContext};
use crate::{discovery, paths};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub skip_dependencies: bool,
    pub skip_usages: bool,
}

/// Builds the textual report for `target`, a file or directory inside a
/// source root.
pub fn generate(
    project_root: &Path,
    config: &ProjectConfig,
    target: &Path,
    options: ReportOptions,
) -> Result<String> {
    let source_roots = config.absolute_source_roots(project_root);
    let absolute_target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        project_root.join(target)
    };
    if !absolute_target.exists() {
        bail!("Path '{}' does not exist.", target.display());
    }

    let target_module = target_module_path(&source_roots, &absolute_target)?;

    let tree = ModuleTree::build(config)?;
    let declared = manifest::load(project_root);
    let resolver = Resolver::new(&tree, &source_roots, &declared, &config.external);
    let matcher = PathMatcher::new(
        project_root,
        &config.exclude,
        config.use_default_excludes,
        config.respect_gitignore,
    )?;

    let mut dependencies: BTreeSet<String> = BTreeSet::new();
    let mut externals: BTreeSet<String> = BTreeSet::new();
    let mut usages: Vec<String> = Vec::new();

    for source_root in &source_roots {
        for file in discovery::source_files(project_root, source_root, &matcher) {
            let Ok(source) = std::fs::read_to_string(&file) else {
                continue;
            };
            let module_path =
                paths::file_to_module_path(&source_roots, &file).unwrap_or_default();
            let in_target = in_module(&module_path, &target_module);

            let scan = scanner::scan(
                &source,
                &ScanContext {
                    file_module_path: Some(&module_path),
                    is_package: paths::is_package_init(&file),
                    ignore_type_checking_imports: config.ignore_type_checking_imports,
                    include_string_imports: config.include_string_imports,
                },
            );

            let relative = file.strip_prefix(project_root).unwrap_or(&file);
            for import in &scan.imports {
                if in_target && !options.skip_dependencies {
                    match resolver.resolve(&import.module_path) {
                        Resolution::Internal { module, .. }
                            if !in_module(&module.path, &target_module) =>
                        {
                            dependencies.insert(module.path.clone());
                        }
                        Resolution::External { package, stdlib } if !stdlib => {
                            externals.insert(package);
                        }
                        _ => {}
                    }
                }
                if !in_target
                    && !options.skip_usages
                    && in_module(&import.module_path, &target_module)
                {
                    usages.push(format!(
                        "{}:{} imports '{}'",
                        relative.display(),
                        import.line_number,
                        import.module_path
                    ));
                }
            }
        }
    }

    usages.sort();
    Ok(format_report(
        &target_module,
        &dependencies,
        &externals,
        &usages,
        options,
    ))
}

/// The dotted path of a report target: a source file's module path, or a
/// directory's package path.
fn target_module_path(source_roots: &[PathBuf], absolute_target: &Path) -> Result<String> {
    if absolute_target.is_file() {
        return paths::file_to_module_path(source_roots, absolute_target)
            .ok_or_else(|| anyhow::anyhow!("Path is not under any configured source root."));
    }

    let relative = source_roots
        .iter()
        .find_map(|root| absolute_target.strip_prefix(root).ok())
        .ok_or_else(|| anyhow::anyhow!("Path is not under any configured source root."))?;

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(segments.join("."))
}

fn in_module(path: &str, module: &str) -> bool {
    if module.is_empty() {
        return true;
    }
    path == module || path.starts_with(&format!("{module}."))
}

fn format_report(
    target_module: &str,
    dependencies: &BTreeSet<String>,
    externals: &BTreeSet<String>,
    usages: &[String],
    options: ReportOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Report for '{target_module}'");

    if !options.skip_dependencies {
        let _ = writeln!(out, "\n[Dependencies]");
        if dependencies.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for dependency in dependencies {
            let _ = writeln!(out, "  '{dependency}'");
        }

        let _ = writeln!(out, "\n[External packages]");
        if externals.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for package in externals {
            let _ = writeln!(out, "  '{package}'");
        }
    }

    if !options.skip_usages {
        let _ = writeln!(out, "\n[Usages]");
        if usages.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for usage in usages {
            let _ = writeln!(out, "  {usage}");
        }
    }

    out
}
