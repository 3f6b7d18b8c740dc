// tests/check_test.rs - End-to-end boundary checks over throwaway projects.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use fence::checker::{self, CheckOptions};
use fence::config::{
    DependencyConfig, InterfaceConfig, ModuleConfig, ProjectConfig, RootModuleTreatment,
    RuleSetting,
};
use fence::diagnostics::{Diagnostic, DiagnosticKind};

struct Project {
    dir: TempDir,
    config: ProjectConfig,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            config: ProjectConfig::default(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, path: &str, content: &str) -> &Self {
        let full = self.dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
        self
    }

    fn module(&mut self, path: &str, depends_on: Option<&[&str]>) -> &mut Self {
        self.config.modules.push(ModuleConfig {
            depends_on: depends_on
                .map(|deps| deps.iter().map(|d| DependencyConfig::from_path(*d)).collect()),
            ..ModuleConfig::new(path)
        });
        self
    }

    fn check(&self) -> Vec<Diagnostic> {
        checker::run(self.root(), &self.config, &CheckOptions::default()).unwrap()
    }

    fn check_with(&self, options: &CheckOptions) -> Vec<Diagnostic> {
        checker::run(self.root(), &self.config, options).unwrap()
    }
}

fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics.iter().filter(|d| d.is_error()).collect()
}

#[test]
fn test_simple_violation() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "import b\n")
        .write("b/__init__.py", "");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].kind(), DiagnosticKind::Dependency);
    assert_eq!(errs[0].line_number, Some(1));
    assert_eq!(errs[0].file_path.as_deref(), Some(Path::new("a/x.py")));
    assert_eq!(
        errs[0].message(),
        "Cannot import 'b'. Module 'a' cannot depend on 'b'."
    );
}

#[test]
fn test_declared_dependency_is_allowed() {
    let mut project = Project::new();
    project.module("a", Some(&["b"])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "import b\n")
        .write("b/__init__.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_deprecated_edge_warns_without_failing() {
    let mut project = Project::new();
    project.module("b", Some(&[]));
    project.config.modules.push(ModuleConfig {
        depends_on: Some(vec![DependencyConfig::deprecated("b")]),
        ..ModuleConfig::new("a")
    });
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "import b\n")
        .write("b/__init__.py", "");

    let diagnostics = project.check();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_warning());
    assert_eq!(diagnostics[0].kind(), DiagnosticKind::Deprecated);
}

#[test]
fn test_strict_interface_rejects_private_member() {
    let mut project = Project::new();
    project.module("a", Some(&["b"]));
    project.config.modules.push(ModuleConfig {
        strict: true,
        ..ModuleConfig::new("b")
    });
    project.config.interfaces.push(InterfaceConfig {
        expose: vec!["API".to_string()],
        from_modules: Some(vec!["b".to_string()]),
        ..Default::default()
    });
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "from b import Internal\n")
        .write("b/__init__.py", "API = 1\nInternal = 2\n");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].kind(), DiagnosticKind::Interface);
    assert!(errs[0].message().contains("b.Internal"));

    // The exposed member passes.
    project.write("a/x.py", "from b import API\n");
    assert!(project.check().is_empty());
}

#[test]
fn test_type_checking_imports_are_ignored() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project.write("a/__init__.py", "").write(
        "a/x.py",
        "from typing import TYPE_CHECKING\n\nif TYPE_CHECKING:\n    import b\n",
    );
    project.write("b/__init__.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_circular_dependency_detected() {
    let mut project = Project::new();
    project.config.forbid_circular_dependencies = true;
    project.module("a", Some(&["b"])).module("b", Some(&["a"]));
    project
        .write("a/__init__.py", "import b\n")
        .write("b/__init__.py", "import a\n");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].message(),
        "Circular dependency detected: 'a' -> 'b' -> 'a'."
    );
}

#[test]
fn test_ignore_directive_suppresses_violation() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "# fence-ignore migration cleanup\nimport b\n")
        .write("b/__init__.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_missing_ignore_reason_is_flagged_when_required() {
    let mut project = Project::new();
    project.config.rules.require_ignore_directive_reasons = RuleSetting::Error;
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "# fence-ignore\nimport b\n")
        .write("b/__init__.py", "");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].kind(), DiagnosticKind::Configuration);
    assert_eq!(errs[0].message(), "Ignore directive is missing a reason.");
}

#[test]
fn test_unused_ignore_directive_warns() {
    let mut project = Project::new();
    project.module("a", Some(&["b"])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "# fence-ignore allowed anyway\nimport b\n")
        .write("b/__init__.py", "");

    let diagnostics = project.check();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_warning());
    assert_eq!(diagnostics[0].message(), "Ignore directive is unused.");
}

#[test]
fn test_visibility_blocks_unlisted_importers() {
    let mut project = Project::new();
    project.module("web", None);
    project.config.modules.push(ModuleConfig {
        visibility: Some(vec!["api.**".to_string()]),
        ..ModuleConfig::new("internal")
    });
    project
        .write("web/__init__.py", "import internal\n")
        .write("internal/__init__.py", "");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].message(),
        "Cannot import 'internal'. Module 'web' is not permitted to see 'internal'."
    );
}

#[test]
fn test_layer_violation() {
    let mut project = Project::new();
    project.config.layers = vec!["ui".to_string(), "data".to_string()];
    project.config.modules.push(ModuleConfig {
        layer: Some("ui".to_string()),
        ..ModuleConfig::new("ui_pkg")
    });
    project.config.modules.push(ModuleConfig {
        layer: Some("data".to_string()),
        ..ModuleConfig::new("data_pkg")
    });
    project
        .write("ui_pkg/__init__.py", "import data_pkg\n")
        .write("data_pkg/__init__.py", "import ui_pkg\n");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    // Downward import is free; upward import violates the layering.
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].file_path.as_deref(), Some(Path::new("data_pkg/__init__.py")));
    assert!(errs[0].message().contains("'data' ('data_pkg') is lower than layer 'ui'"));
}

#[test]
fn test_utility_module_needs_no_declaration() {
    let mut project = Project::new();
    project.module("a", Some(&[]));
    project.config.modules.push(ModuleConfig {
        utility: true,
        ..ModuleConfig::new("logging_utils")
    });
    project
        .write("a/__init__.py", "import logging_utils\n")
        .write("logging_utils/__init__.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_unchecked_module_is_skipped() {
    let mut project = Project::new();
    project.module("b", Some(&[]));
    project.config.modules.push(ModuleConfig {
        unchecked: true,
        depends_on: Some(vec![]),
        ..ModuleConfig::new("legacy")
    });
    project
        .write("legacy/__init__.py", "import b\n")
        .write("b/__init__.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_exact_flags_unused_dependencies() {
    let mut project = Project::new();
    project.module("a", Some(&["b", "c"])).module("b", Some(&[]));
    project.module("c", Some(&[]));
    project
        .write("a/__init__.py", "import b\n")
        .write("b/__init__.py", "")
        .write("c/__init__.py", "");

    let options = CheckOptions {
        exact: true,
        ..Default::default()
    };
    let diagnostics = project.check_with(&options);
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].message(),
        "Module 'a' declares a dependency on 'c' which is never imported."
    );
}

#[test]
fn test_root_module_treatment_forbid_errors() {
    let mut project = Project::new();
    project.config.root_module_treatment = RootModuleTreatment::Forbid;
    project.module("a", None);
    project
        .write("a/__init__.py", "import loose\n")
        .write("loose.py", "");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message().contains("'<root>'"));
}

#[test]
fn test_root_module_treatment_ignore_allows() {
    let mut project = Project::new();
    project.module("a", Some(&[]));
    project
        .write("a/__init__.py", "import loose\n")
        .write("loose.py", "");

    assert!(project.check().is_empty());
}

#[test]
fn test_root_module_treatment_allow_requires_declaration() {
    let mut project = Project::new();
    project.config.root_module_treatment = RootModuleTreatment::Allow;
    project.module("a", Some(&[]));
    project
        .write("a/__init__.py", "import loose\n")
        .write("loose.py", "");

    let diagnostics = project.check();
    assert_eq!(errors(&diagnostics).len(), 1);

    // Declaring '<root>' fixes it.
    project.config.modules[0].depends_on =
        Some(vec![DependencyConfig::from_path("<root>")]);
    assert!(project.check().is_empty());
}

#[test]
fn test_relative_imports_resolve_across_modules() {
    let mut project = Project::new();
    project.module("pkg.a", Some(&[])).module("pkg.b", Some(&[]));
    project
        .write("pkg/__init__.py", "")
        .write("pkg/a/__init__.py", "from ..b import thing\n")
        .write("pkg/b/__init__.py", "thing = 1\n");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message().contains("'pkg.b.thing'"));
}

#[test]
fn test_stdlib_and_unknown_imports_are_quiet_by_default() {
    let mut project = Project::new();
    project.module("a", Some(&[]));
    project.write("a/__init__.py", "import os\nimport sys\nimport numpy\n");

    // numpy is unknown here, but module 'a' declares no external lists.
    assert!(errors(&project.check()).is_empty());
}

#[test]
fn test_module_external_allowlist() {
    let mut project = Project::new();
    project.config.modules.push(ModuleConfig {
        depends_on_external: Some(vec!["requests".to_string()]),
        ..ModuleConfig::new("a")
    });
    project.write(
        "a/__init__.py",
        "import os\nimport requests\nimport numpy\n",
    );
    project.write("requirements.txt", "requests==2.31.0\nnumpy==1.26.0\n");

    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].message(),
        "Module 'a' does not declare a dependency on external package 'numpy'."
    );
}

#[test]
fn test_missing_module_warns_and_is_ignored() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("ghost", Some(&[]));
    project.write("a/__init__.py", "import os\n");

    let diagnostics = project.check();
    assert!(diagnostics.iter().all(Diagnostic::is_warning));
    assert!(diagnostics
        .iter()
        .any(|d| d.message() == "Module 'ghost' not found. It will be ignored."));
}

#[test]
fn test_duplicate_modules_are_a_configuration_error() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("a", Some(&[]));
    project.write("a/__init__.py", "");

    assert!(checker::run(project.root(), &project.config, &CheckOptions::default()).is_err());
}

#[test]
fn test_string_imports_opt_in() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write(
            "a/x.py",
            "import importlib\nmod = importlib.import_module(\"b.plugin\")\n",
        )
        .write("b/__init__.py", "")
        .write("b/plugin.py", "");

    assert!(errors(&project.check()).is_empty());

    project.config.include_string_imports = true;
    let diagnostics = project.check();
    let errs = errors(&diagnostics);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message().contains("'b.plugin'"));
    assert_eq!(errs[0].line_number, Some(2));
}

#[test]
fn test_diagnostics_are_deterministic() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/x.py", "import b\nfrom b import two\n")
        .write("a/y.py", "import b\n")
        .write("b/__init__.py", "two = 2\n");

    let first = project.check();
    let second = project.check();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);

    // Sorted by file, then line.
    assert_eq!(first[0].file_path.as_deref(), Some(Path::new("a/x.py")));
    assert_eq!(first[0].line_number, Some(1));
    assert_eq!(first[1].line_number, Some(2));
    assert_eq!(first[2].file_path.as_deref(), Some(Path::new("a/y.py")));
}

#[test]
fn test_syntax_error_does_not_abort_other_files() {
    let mut project = Project::new();
    project.module("a", Some(&[])).module("b", Some(&[]));
    project
        .write("a/__init__.py", "")
        .write("a/broken.py", "def oops(:\n")
        .write("a/x.py", "import b\n")
        .write("b/__init__.py", "");

    let diagnostics = project.check();
    // The violation in the healthy file is still reported.
    assert!(errors(&diagnostics)
        .iter()
        .any(|d| d.file_path.as_deref() == Some(Path::new("a/x.py"))));
}
