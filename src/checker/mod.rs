// src/checker/mod.rs
//! The boundary checker.
//!
//! Builds the module tree and resolver once, discovers files, then scans
//! and checks each file on the worker pool. Per-file diagnostics merge at
//! the end, followed by project-wide passes (cycles, unused
//! dependencies), then a deterministic sort.

pub mod cycles;
pub mod dependency;
pub mod external;
pub mod interface;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;

use crate::config::{
    ModuleConfig, ProjectConfig, RootModuleTreatment, ROOT_MODULE_SENTINEL,
};
use crate::diagnostics::{
    self, CodeDiagnostic, ConfigurationDiagnostic, Diagnostic, DiagnosticDetails, Severity,
};
use crate::manifest;
use crate::modules::{self, ModuleTree};
use crate::pattern::PathMatcher;
use crate::resolver::{Resolution, Resolver};
use crate::scanner::{self, Import, ScanContext, ScanResult};
use crate::{discovery, interrupt, paths};

use dependency::VisibilityIndex;
use interface::{CompiledInterfaces, TypeCheckCache};

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub dependencies: bool,
    pub interfaces: bool,
    pub exact: bool,
    pub extra_excludes: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            dependencies: true,
            interfaces: true,
            exact: false,
            extra_excludes: Vec::new(),
        }
    }
}

/// Runs the full check and returns the sorted, deduplicated diagnostics.
/// Configuration problems (invalid patterns, duplicate modules, root
/// policy violations) are hard errors.
pub fn run(
    project_root: &Path,
    config: &ProjectConfig,
    options: &CheckOptions,
) -> Result<Vec<Diagnostic>> {
    if !options.dependencies && !options.interfaces {
        bail!("No checks enabled.");
    }
    if !project_root.is_dir() {
        bail!("'{}' is not a valid directory.", project_root.display());
    }

    let source_roots = config.absolute_source_roots(project_root);
    let tree = ModuleTree::build(config)?;
    let compiled_interfaces = CompiledInterfaces::build(&config.interfaces)?;
    let type_cache = TypeCheckCache::build(&compiled_interfaces, &config.modules, &source_roots);
    let visibility = VisibilityIndex::build(&config.modules)?;

    let mut excludes = config.exclude.clone();
    excludes.extend(options.extra_excludes.iter().cloned());
    let matcher = PathMatcher::new(
        project_root,
        &excludes,
        config.use_default_excludes,
        config.respect_gitignore,
    )?;

    let declared = manifest::load(project_root);
    let resolver = Resolver::new(&tree, &source_roots, &declared, &config.external);
    let external_excludes: HashSet<String> = config
        .external
        .exclude
        .iter()
        .map(|p| manifest::normalize_name(p))
        .collect();

    let mut diagnostics: Vec<Diagnostic> =
        modules::missing_modules(&source_roots, &config.modules)
            .into_iter()
            .map(|module| {
                Diagnostic::global_warning(DiagnosticDetails::Configuration(
                    ConfigurationDiagnostic::ModuleNotFound {
                        module_path: module.path.clone(),
                    },
                ))
            })
            .collect();

    let files: Vec<PathBuf> = source_roots
        .iter()
        .flat_map(|root| discovery::source_files(project_root, root, &matcher))
        .collect();

    let checker = FileChecker {
        project_root,
        source_roots: &source_roots,
        config,
        tree: &tree,
        resolver: &resolver,
        interfaces: &compiled_interfaces,
        type_cache: &type_cache,
        visibility: &visibility,
        options,
        external_excludes: &external_excludes,
    };

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|file| {
            if interrupt::interrupted() {
                return FileOutcome::default();
            }
            checker.check_file(file)
        })
        .collect();

    let mut used_edges: HashSet<(String, String)> = HashSet::new();
    let mut found_first_party = false;
    let mut saw_type_checking_imports = false;
    for outcome in outcomes {
        found_first_party |= outcome.found_first_party;
        saw_type_checking_imports |= outcome.skipped_type_checking;
        diagnostics.extend(outcome.diagnostics);
        used_edges.extend(outcome.used_edges);
    }

    if options.dependencies && config.forbid_circular_dependencies {
        for cycle in cycles::find_cycles(&config.modules, &used_edges) {
            diagnostics.push(Diagnostic::global_error(DiagnosticDetails::Code(
                CodeDiagnostic::CircularDependency {
                    cycle: cycles::format_cycle(&cycle),
                },
            )));
        }
    }

    if options.dependencies && (options.exact || config.exact) {
        diagnostics.extend(unused_dependencies(config, &used_edges));
    }

    if !found_first_party && !saw_type_checking_imports && !files.is_empty() {
        diagnostics.push(Diagnostic::global_warning(DiagnosticDetails::Configuration(
            ConfigurationDiagnostic::NoFirstPartyImportsFound(),
        )));
    }

    Ok(diagnostics::sort_and_dedup(diagnostics))
}

#[derive(Debug, Default)]
struct FileOutcome {
    diagnostics: Vec<Diagnostic>,
    used_edges: Vec<(String, String)>,
    found_first_party: bool,
    skipped_type_checking: bool,
}

struct FileChecker<'a> {
    project_root: &'a Path,
    source_roots: &'a [PathBuf],
    config: &'a ProjectConfig,
    tree: &'a ModuleTree,
    resolver: &'a Resolver<'a>,
    interfaces: &'a CompiledInterfaces,
    type_cache: &'a TypeCheckCache,
    visibility: &'a VisibilityIndex,
    options: &'a CheckOptions,
    external_excludes: &'a HashSet<String>,
}

impl<'a> FileChecker<'a> {
    fn check_file(&self, file: &Path) -> FileOutcome {
        let mut outcome = FileOutcome::default();
        let relative = file
            .strip_prefix(self.project_root)
            .unwrap_or(file)
            .to_path_buf();

        let Ok(source) = std::fs::read_to_string(file) else {
            outcome
                .diagnostics
                .push(Diagnostic::global_warning(DiagnosticDetails::Configuration(
                    ConfigurationDiagnostic::SkippedFileIoError {
                        file_path: relative.display().to_string(),
                    },
                )));
            return outcome;
        };

        let module_path =
            paths::file_to_module_path(self.source_roots, file).unwrap_or_default();
        let scan = scanner::scan(
            &source,
            &ScanContext {
                file_module_path: Some(&module_path),
                is_package: paths::is_package_init(file),
                ignore_type_checking_imports: self.config.ignore_type_checking_imports,
                include_string_imports: self.config.include_string_imports,
            },
        );
        outcome.skipped_type_checking = scan.skipped_type_checking > 0;

        let importer = self
            .tree
            .find_nearest(&module_path)
            .or_else(|| self.tree.root_module());
        let Some(importer) = importer else {
            // Unowned code with the root module forbidden.
            if !scan.imports.is_empty() {
                outcome
                    .diagnostics
                    .push(Diagnostic::global_error(DiagnosticDetails::Configuration(
                        ConfigurationDiagnostic::FileModuleNotFound {
                            file_module_path: module_path,
                        },
                    )));
            }
            return outcome;
        };

        if importer.unchecked {
            self.record_usage_only(importer, &scan, &mut outcome);
            return outcome;
        }

        for scan_diagnostic in &scan.diagnostics {
            let severity = match scan_diagnostic.details {
                ConfigurationDiagnostic::SyntaxError() => Severity::Warning,
                _ => Severity::Error,
            };
            outcome.diagnostics.push(Diagnostic::located(
                severity,
                DiagnosticDetails::Configuration(scan_diagnostic.details.clone()),
                relative.clone(),
                scan_diagnostic.line_number,
            ));
        }

        let mut used_directive_lines: HashSet<usize> = HashSet::new();
        for import in &scan.imports {
            let Some((severity, details)) = self.check_import(importer, import, &mut outcome)
            else {
                continue;
            };

            if let Some(directive) = scan.directives.get(import.line_number) {
                if directive.matches_import(import) {
                    used_directive_lines.insert(directive.applies_to_line);
                    continue;
                }
            }

            outcome.diagnostics.push(Diagnostic::located(
                severity,
                details,
                relative.clone(),
                import.line_number,
            ));
        }

        self.post_process_directives(
            &scan,
            &used_directive_lines,
            &relative,
            &mut outcome.diagnostics,
        );
        outcome
    }

    /// Unchecked modules produce no diagnostics, but their imports still
    /// count as usage for cycle and `--exact` bookkeeping.
    fn record_usage_only(
        &self,
        importer: &ModuleConfig,
        scan: &ScanResult,
        outcome: &mut FileOutcome,
    ) {
        for import in &scan.imports {
            match self.resolver.resolve(&import.module_path) {
                Resolution::Internal { module: target, .. } => {
                    outcome.found_first_party = true;
                    if target.path != importer.path {
                        outcome
                            .used_edges
                            .push((importer.path.clone(), target.path.clone()));
                    }
                }
                Resolution::Root => outcome.found_first_party = true,
                Resolution::External { .. } | Resolution::Unknown => {}
            }
        }
    }

    fn check_import(
        &self,
        importer: &ModuleConfig,
        import: &Import,
        outcome: &mut FileOutcome,
    ) -> Option<(Severity, DiagnosticDetails)> {
        match self.resolver.resolve(&import.module_path) {
            Resolution::Internal {
                module: target,
                exact,
            } => {
                outcome.found_first_party = true;
                if target.path != importer.path {
                    outcome
                        .used_edges
                        .push((importer.path.clone(), target.path.clone()));
                }

                if self.options.dependencies {
                    if let Some(verdict) = dependency::check_import(
                        importer,
                        target,
                        import,
                        &self.config.layers,
                        self.visibility,
                    ) {
                        return Some(verdict);
                    }
                }
                if self.options.interfaces {
                    if let Some(code) = interface::check_import(
                        self.interfaces,
                        self.type_cache,
                        importer,
                        target,
                        import,
                        exact,
                    ) {
                        return Some((Severity::Error, DiagnosticDetails::Code(code)));
                    }
                }
                None
            }
            Resolution::Root => {
                outcome.found_first_party = true;
                if !self.options.dependencies {
                    return None;
                }
                self.check_root_target(importer, import, outcome)
            }
            Resolution::External { package, stdlib } => {
                if !self.options.dependencies {
                    return None;
                }
                external::check_import(importer, &package, stdlib, import, self.external_excludes)
            }
            Resolution::Unknown => {
                if !self.options.dependencies {
                    return None;
                }
                let package = manifest::normalize_name(import.top_level());
                external::check_import(importer, &package, false, import, self.external_excludes)
            }
        }
    }

    fn check_root_target(
        &self,
        importer: &ModuleConfig,
        import: &Import,
        outcome: &mut FileOutcome,
    ) -> Option<(Severity, DiagnosticDetails)> {
        match self.config.root_module_treatment {
            RootModuleTreatment::Ignore | RootModuleTreatment::DependenciesOnly => None,
            RootModuleTreatment::Forbid => Some((
                Severity::Error,
                DiagnosticDetails::Code(CodeDiagnostic::UndeclaredDependency {
                    dependency: import.module_path.clone(),
                    usage_module: importer.path.clone(),
                    definition_module: ROOT_MODULE_SENTINEL.to_string(),
                }),
            )),
            RootModuleTreatment::Allow => {
                let root = self.tree.root_module()?;
                if importer.path != root.path {
                    outcome
                        .used_edges
                        .push((importer.path.clone(), ROOT_MODULE_SENTINEL.to_string()));
                }
                dependency::check_import(
                    importer,
                    root,
                    import,
                    &self.config.layers,
                    self.visibility,
                )
            }
        }
    }

    fn post_process_directives(
        &self,
        scan: &ScanResult,
        used_directive_lines: &HashSet<usize>,
        relative: &Path,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if scan.directives.is_empty() {
            return;
        }
        let rules = &self.config.rules;

        for directive in scan.directives.sorted() {
            if directive.reason.is_empty() {
                if let Ok(severity) = Severity::try_from(&rules.require_ignore_directive_reasons)
                {
                    diagnostics.push(Diagnostic::located(
                        severity,
                        DiagnosticDetails::Configuration(
                            ConfigurationDiagnostic::MissingIgnoreDirectiveReason(),
                        ),
                        relative.to_path_buf(),
                        directive.line_no,
                    ));
                }
            }

            if !used_directive_lines.contains(&directive.applies_to_line) {
                if let Ok(severity) = Severity::try_from(&rules.unused_ignore_directives) {
                    diagnostics.push(Diagnostic::located(
                        severity,
                        DiagnosticDetails::Code(CodeDiagnostic::UnusedIgnoreDirective()),
                        relative.to_path_buf(),
                        directive.line_no,
                    ));
                }
            }
        }

        for directive in scan.directives.redundant() {
            if let Ok(severity) = Severity::try_from(&rules.unused_ignore_directives) {
                diagnostics.push(Diagnostic::located(
                    severity,
                    DiagnosticDetails::Code(CodeDiagnostic::UnusedIgnoreDirective()),
                    relative.to_path_buf(),
                    directive.line_no,
                ));
            }
        }
    }
}

/// Declared `depends_on` edges never exercised by an import (`--exact`).
fn unused_dependencies(
    config: &ProjectConfig,
    used_edges: &HashSet<(String, String)>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for module in &config.modules {
        if module.unchecked {
            continue;
        }
        for dependency in module.dependencies_iter() {
            let edge = (module.path.clone(), dependency.path.clone());
            if !used_edges.contains(&edge) {
                diagnostics.push(Diagnostic::global_error(DiagnosticDetails::Code(
                    CodeDiagnostic::UnusedDependency {
                        usage_module: module.path.clone(),
                        definition_module: dependency.path.clone(),
                    },
                )));
            }
        }
    }
    diagnostics
}
