// tests/check_external_test.rs - Project-wide external dependency checks.

use std::fs;
use std::path::Path;

use fence::checker::external;
use fence::config::{ExternalConfig, ProjectConfig, RuleSetting};
use fence::diagnostics::Diagnostic;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

#[test]
fn test_undeclared_and_unused_externals() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app/__init__.py",
        "import os\nimport requests\nimport numpy\n",
    );
    write(dir.path(), "requirements.txt", "requests==2.31.0\npandas==2.2.0\n");

    let config = ProjectConfig::default();
    let diagnostics = external::run_check_external(dir.path(), &config).unwrap();

    let messages: Vec<String> = diagnostics.iter().map(Diagnostic::message).collect();
    assert!(messages
        .contains(&"External package 'numpy' is not declared in the project's dependencies.".to_string()));
    assert!(messages
        .contains(&"External package 'pandas' is declared but never imported.".to_string()));
    // Declared and used: no complaint about requests, none about stdlib.
    assert!(!messages.iter().any(|m| m.contains("'requests'")));
    assert!(!messages.iter().any(|m| m.contains("'os'")));
}

#[test]
fn test_external_exclude_silences_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/__init__.py", "import devtool\n");
    write(dir.path(), "requirements.txt", "unusedlib==1.0\n");

    let config = ProjectConfig {
        external: ExternalConfig {
            exclude: vec!["devtool".to_string(), "unusedlib".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let diagnostics = external::run_check_external(dir.path(), &config).unwrap();
    assert!(diagnostics.is_empty());
}

#[test]
fn test_rename_maps_import_names() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/__init__.py", "import PIL\n");
    write(dir.path(), "requirements.txt", "pillow==10.0\n");

    let config = ProjectConfig {
        external: ExternalConfig {
            rename: vec!["pillow:PIL".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let diagnostics = external::run_check_external(dir.path(), &config).unwrap();
    assert!(diagnostics.is_empty());
}

#[test]
fn test_unused_rule_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/__init__.py", "import os\n");
    write(dir.path(), "requirements.txt", "unusedlib==1.0\n");

    let mut config = ProjectConfig::default();
    config.rules.unused_external_dependencies = RuleSetting::Off;

    let diagnostics = external::run_check_external(dir.path(), &config).unwrap();
    assert!(diagnostics.is_empty());
}
