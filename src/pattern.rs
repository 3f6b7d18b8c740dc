// src/pattern.rs
//! Exclude-pattern matching over project-relative paths.
//!
//! Patterns are glob-style: `*` matches within one path segment, `**`
//! crosses segment boundaries. Paths are normalized to forward slashes
//! before matching so results are identical across host OSes.

use std::path::Path;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Directories that never contain first-party source.
pub const DEFAULT_EXCLUDES: [&str; 8] = [
    "**/__pycache__",
    "**/*.egg-info",
    "**/build",
    "**/dist",
    "**/.venv",
    "**/venv",
    "**/node_modules",
    "**/.git",
];

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub struct PathMatcher {
    patterns: Vec<Pattern>,
    gitignore: Option<Gitignore>,
}

impl PathMatcher {
    /// Compiles exclude patterns, appending the default excludes unless
    /// opted out, and optionally the project root's gitignore rules.
    ///
    /// # Errors
    /// Returns an error if any pattern fails to compile.
    pub fn new(
        project_root: &Path,
        excludes: &[String],
        use_defaults: bool,
        respect_gitignore: bool,
    ) -> Result<Self> {
        let mut raw: Vec<&str> = excludes.iter().map(String::as_str).collect();
        if use_defaults {
            raw.extend(DEFAULT_EXCLUDES);
        }
        // `**/x` also applies at the top of the tree.
        let rootless: Vec<&str> = raw
            .iter()
            .filter_map(|p| p.strip_prefix("**/"))
            .collect();
        raw.extend(rootless);

        let patterns = raw
            .iter()
            .map(|p| {
                Pattern::new(p).with_context(|| format!("Invalid exclude pattern '{p}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        let gitignore = if respect_gitignore {
            build_gitignore(project_root)
        } else {
            None
        };

        Ok(Self {
            patterns,
            gitignore,
        })
    }

    /// Tests a project-relative path. A path is excluded when any pattern
    /// matches the whole path or one of its directory prefixes.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        let normalized = normalize(relative);
        if normalized.is_empty() {
            return false;
        }

        for prefix in segment_prefixes(&normalized) {
            if self
                .patterns
                .iter()
                .any(|p| p.matches_with(prefix, GLOB_OPTIONS))
            {
                return true;
            }
        }

        self.gitignore.as_ref().is_some_and(|gi| {
            gi.matched_path_or_any_parents(relative, is_dir).is_ignore()
        })
    }
}

fn build_gitignore(project_root: &Path) -> Option<Gitignore> {
    let file = project_root.join(".gitignore");
    if !file.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(project_root);
    builder.add(file);
    builder.build().ok()
}

fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Yields `a`, `a/b`, `a/b/c` for the path `a/b/c`.
fn segment_prefixes(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .char_indices()
        .filter_map(|(i, c)| (c == '/').then_some(&normalized[..i]))
        .chain(std::iter::once(normalized))
}
