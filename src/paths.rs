// src/paths.rs
//! Conversions between file paths and dotted module paths.
//!
//! A file's import path is derived by stripping the first matching source
//! root and the source suffix, joining the remaining components with `.`,
//! and collapsing a trailing package-init segment.

use std::path::{Path, PathBuf};

pub const SOURCE_SUFFIXES: [&str; 2] = ["py", "pyi"];
const PACKAGE_INIT: &str = "__init__";

#[must_use]
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_SUFFIXES.contains(&ext))
}

#[must_use]
pub fn is_package_init(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem == PACKAGE_INIT)
}

/// Derives the dotted module path of a source file. The source roots are
/// ordered; the first root containing the file wins. Returns `None` when
/// the file lies outside every source root.
#[must_use]
pub fn file_to_module_path(source_roots: &[PathBuf], file: &Path) -> Option<String> {
    let relative = source_roots
        .iter()
        .find_map(|root| file.strip_prefix(root).ok())?;

    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.last().is_some_and(|s| s == PACKAGE_INIT) {
        segments.pop();
    }

    Some(segments.join("."))
}

/// True when a dotted path corresponds to a file or package under any
/// source root. This is what distinguishes unowned project code (`Root`)
/// from external imports.
#[must_use]
pub fn module_exists(source_roots: &[PathBuf], module_path: &str) -> bool {
    if module_path.is_empty() {
        return false;
    }
    let relative: PathBuf = module_path.split('.').collect();

    source_roots.iter().any(|root| {
        let base = root.join(&relative);
        SOURCE_SUFFIXES
            .iter()
            .any(|suffix| base.with_extension(suffix).is_file())
            || base.join("__init__.py").is_file()
            || base.is_dir()
    })
}

/// Resolves a dotted path to the file providing it, preferring a module
/// file over a package init.
#[must_use]
pub fn module_to_file_path(source_roots: &[PathBuf], module_path: &str) -> Option<PathBuf> {
    let relative: PathBuf = module_path.split('.').collect();

    source_roots.iter().find_map(|root| {
        let base = root.join(&relative);
        SOURCE_SUFFIXES
            .iter()
            .map(|suffix| base.with_extension(suffix))
            .find(|candidate| candidate.is_file())
            .or_else(|| {
                let init = base.join("__init__.py");
                init.is_file().then_some(init)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_file_to_module_path() {
        let roots = vec![PathBuf::from("src")];
        assert_eq!(
            file_to_module_path(&roots, Path::new("src/pkg/mod.py")),
            Some("pkg.mod".to_string())
        );
        assert_eq!(
            file_to_module_path(&roots, Path::new("src/pkg/__init__.py")),
            Some("pkg".to_string())
        );
        assert_eq!(file_to_module_path(&roots, Path::new("other/mod.py")), None);
    }

    #[test]
    fn test_first_matching_root_wins() {
        let roots = vec![PathBuf::from("a"), PathBuf::from("a/b")];
        assert_eq!(
            file_to_module_path(&roots, Path::new("a/b/c.py")),
            Some("b.c".to_string())
        );
    }

    #[test]
    fn test_root_init_maps_to_empty_path() {
        let roots = vec![PathBuf::from("src")];
        assert_eq!(
            file_to_module_path(&roots, Path::new("src/__init__.py")),
            Some(String::new())
        );
    }

    #[test]
    fn test_module_exists() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/mod.py"), "").unwrap();

        let roots = vec![root];
        assert!(module_exists(&roots, "pkg"));
        assert!(module_exists(&roots, "pkg.mod"));
        assert!(!module_exists(&roots, "pkg.missing"));
        assert!(!module_exists(&roots, "numpy"));
    }
}
