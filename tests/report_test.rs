// tests/report_test.rs - The report command lists dependencies and usages.

use std::fs;
use std::path::Path;

use fence::config::{ModuleConfig, ProjectConfig};
use fence::report::{self, ReportOptions};

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn fixture() -> (tempfile::TempDir, ProjectConfig) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "billing/__init__.py", "import core\nimport requests\n");
    write(dir.path(), "core/__init__.py", "");
    write(dir.path(), "web/__init__.py", "from billing import charge\n");
    write(dir.path(), "requirements.txt", "requests==2.31.0\n");

    let config = ProjectConfig {
        modules: vec![
            ModuleConfig::new("billing"),
            ModuleConfig::new("core"),
            ModuleConfig::new("web"),
        ],
        ..Default::default()
    };
    (dir, config)
}

#[test]
fn test_report_lists_dependencies_and_usages() {
    let (dir, config) = fixture();
    let text = report::generate(
        dir.path(),
        &config,
        Path::new("billing"),
        ReportOptions::default(),
    )
    .unwrap();

    assert!(text.contains("Report for 'billing'"));
    assert!(text.contains("'core'"));
    assert!(text.contains("'requests'"));
    assert!(text.contains("web/__init__.py:1 imports 'billing.charge'"));
}

#[test]
fn test_report_sections_can_be_skipped() {
    let (dir, config) = fixture();

    let no_deps = report::generate(
        dir.path(),
        &config,
        Path::new("billing"),
        ReportOptions {
            skip_dependencies: true,
            skip_usages: false,
        },
    )
    .unwrap();
    assert!(!no_deps.contains("[Dependencies]"));
    assert!(no_deps.contains("[Usages]"));

    let no_usages = report::generate(
        dir.path(),
        &config,
        Path::new("billing"),
        ReportOptions {
            skip_dependencies: false,
            skip_usages: true,
        },
    )
    .unwrap();
    assert!(no_usages.contains("[Dependencies]"));
    assert!(!no_usages.contains("[Usages]"));
}

#[test]
fn test_report_for_missing_path_is_an_error() {
    let (dir, config) = fixture();
    let result = report::generate(
        dir.path(),
        &config,
        Path::new("nonexistent"),
        ReportOptions::default(),
    );
    assert!(result.is_err());
}
