// src/discovery.rs
//! Source file discovery.
//!
//! Walks each source root depth-first, pruning excluded directories
//! before descending into them, and yields source files in lexicographic
//! order so diagnostic ordering is stable across runs.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::paths;
use crate::pattern::PathMatcher;

/// All source files under one source root, as absolute paths. Symlinks
/// are followed; walkdir's ancestor check guards against cycles.
#[must_use]
pub fn source_files(
    project_root: &Path,
    source_root: &Path,
    matcher: &PathMatcher,
) -> Vec<PathBuf> {
    WalkDir::new(source_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let relative = entry
                .path()
                .strip_prefix(project_root)
                .unwrap_or_else(|_| entry.path());
            !matcher.is_excluded(relative, true)
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| paths::is_source_file(path))
        .filter(|path| {
            let relative = path.strip_prefix(project_root).unwrap_or(path);
            !matcher.is_excluded(relative, false)
        })
        .collect()
}
