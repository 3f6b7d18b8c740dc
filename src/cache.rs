// src/cache.rs
//! Content-addressed computation cache.
//!
//! Entries are keyed by a SHA-256 fingerprint over everything that could
//! change a task's output: interpreter version, source file contents,
//! dependency pins, extra file and env dependencies, and the action
//! label. Entries live at `<root>/<first-two-hex>/<fingerprint>` and are
//! written via temp-file-then-rename so readers always see a complete
//! envelope.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::discovery;
use crate::pattern::PathMatcher;

pub const CACHE_DIR_ENV: &str = "FENCE_CACHE_DIR";
pub const DEFAULT_CACHE_DIR: &str = ".fence";

/// Bumped when the envelope layout changes; readers treat unknown
/// versions as misses.
const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub struct ComputationCache {
    root: PathBuf,
}

impl ComputationCache {
    /// Opens the cache for a project, honoring `FENCE_CACHE_DIR`.
    #[must_use]
    pub fn open(project_root: &Path) -> Self {
        let root = std::env::var_os(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| project_root.join(DEFAULT_CACHE_DIR));
        Self { root }
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        let shard = fingerprint.get(..2).unwrap_or("00");
        self.root.join(shard).join(fingerprint)
    }

    /// A hit returns the stored entry; torn, missing, or unknown-version
    /// envelopes are misses.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        let bytes = fs::read(self.entry_path(fingerprint)).ok()?;
        let (&version, body) = bytes.split_first()?;
        if version != ENVELOPE_VERSION {
            return None;
        }
        serde_json::from_slice(body).ok()
    }

    /// Atomic write: concurrent writers race safely, last writer wins.
    pub fn put(&self, fingerprint: &str, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(fingerprint);
        let dir = path
            .parent()
            .context("Cache entry path has no parent directory")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create cache directory {}", dir.display()))?;

        let mut body = vec![ENVELOPE_VERSION];
        body.extend(serde_json::to_vec(entry)?);

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&body)?;
        temp.persist(&path)
            .with_context(|| format!("Could not persist cache entry {}", path.display()))?;
        Ok(())
    }

    /// Removes the whole cache directory.
    pub fn clean(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("Could not remove {}", self.root.display()))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Everything that feeds the fingerprint, in hashing order.
pub struct FingerprintInputs<'a> {
    pub interpreter_version: &'a str,
    pub source_roots: &'a [PathBuf],
    pub dependency_pins: &'a [String],
    pub cache_config: &'a CacheConfig,
    pub action: &'a str,
}

/// Computes the 256-bit fingerprint. Any change to a source file, a
/// dependency pin, a listed file or env dependency, the interpreter, or
/// the action label changes the result; nothing else does.
pub fn compute_fingerprint(
    project_root: &Path,
    matcher: &PathMatcher,
    inputs: &FingerprintInputs,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hash_field(&mut hasher, inputs.interpreter_version.as_bytes());

    let mut files: Vec<PathBuf> = inputs
        .source_roots
        .iter()
        .flat_map(|root| discovery::source_files(project_root, root, matcher))
        .collect();
    files.sort();
    files.dedup();
    for file in &files {
        let bytes = fs::read(file)
            .with_context(|| format!("Could not read {}", file.display()))?;
        hash_field(&mut hasher, &Sha256::digest(&bytes));
    }

    for pin in inputs.dependency_pins {
        hash_field(&mut hasher, pin.as_bytes());
    }

    for pattern in &inputs.cache_config.file_dependencies {
        for file in resolve_glob(project_root, pattern)? {
            let bytes = fs::read(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            hash_field(&mut hasher, &Sha256::digest(&bytes));
        }
    }

    for variable in &inputs.cache_config.env_dependencies {
        let value = std::env::var(variable).unwrap_or_default();
        hash_field(&mut hasher, value.as_bytes());
    }

    hash_field(&mut hasher, inputs.action.as_bytes());

    Ok(hex_digest(&hasher.finalize()))
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn resolve_glob(project_root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let absolute = project_root.join(pattern);
    let pattern_str = absolute.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern_str)
        .with_context(|| format!("Invalid cache file dependency glob '{pattern}'"))?
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn hex_digest(digest: &[u8]) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_in(dir: &Path) -> ComputationCache {
        ComputationCache {
            root: dir.join(DEFAULT_CACHE_DIR),
        }
    }

    fn entry() -> CacheEntry {
        CacheEntry {
            stdout: "ok\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let fingerprint = "ab".to_string() + &"0".repeat(62);

        assert!(cache.get(&fingerprint).is_none());
        cache.put(&fingerprint, &entry()).unwrap();
        assert_eq!(cache.get(&fingerprint), Some(entry()));

        // Sharded layout: first two hex chars name the directory.
        assert!(dir
            .path()
            .join(DEFAULT_CACHE_DIR)
            .join("ab")
            .join(&fingerprint)
            .is_file());
    }

    #[test]
    fn test_unknown_envelope_version_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let fingerprint = "cd".to_string() + &"0".repeat(62);

        cache.put(&fingerprint, &entry()).unwrap();
        let path = cache.entry_path(&fingerprint);
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = 99;
        fs::write(&path, bytes).unwrap();

        assert!(cache.get(&fingerprint).is_none());
    }

    #[test]
    fn test_clean_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let fingerprint = "ef".to_string() + &"0".repeat(62);

        cache.put(&fingerprint, &entry()).unwrap();
        cache.clean().unwrap();
        assert!(!cache.root().exists());
        assert!(cache.get(&fingerprint).is_none());
    }

    #[test]
    fn test_fingerprint_sensitivity() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("app.py"), "import os\n").unwrap();
        let roots = vec![root.to_path_buf()];
        let matcher = PathMatcher::new(root, &[], true, false).unwrap();
        let cache_config = CacheConfig::default();

        let fingerprint = |pins: &[String], action: &str| {
            compute_fingerprint(
                root,
                &matcher,
                &FingerprintInputs {
                    interpreter_version: "Python 3.12.1",
                    source_roots: &roots,
                    dependency_pins: pins,
                    cache_config: &cache_config,
                    action,
                },
            )
            .unwrap()
        };

        let base = fingerprint(&[], "test");
        assert_eq!(base, fingerprint(&[], "test"));
        assert_ne!(base, fingerprint(&[], "lint"));
        assert_ne!(base, fingerprint(&["requests==2.31.0".to_string()], "test"));

        std::fs::write(root.join("app.py"), "import sys\n").unwrap();
        assert_ne!(base, fingerprint(&[], "test"));
    }

    #[test]
    fn test_env_dependency_changes_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("app.py"), "").unwrap();
        let roots = vec![root.to_path_buf()];
        let matcher = PathMatcher::new(root, &[], true, false).unwrap();
        let cache_config = CacheConfig {
            env_dependencies: vec!["FENCE_TEST_MARKER_VAR".to_string()],
            ..Default::default()
        };

        let fingerprint = || {
            compute_fingerprint(
                root,
                &matcher,
                &FingerprintInputs {
                    interpreter_version: "",
                    source_roots: &roots,
                    dependency_pins: &[],
                    cache_config: &cache_config,
                    action: "test",
                },
            )
            .unwrap()
        };

        std::env::remove_var("FENCE_TEST_MARKER_VAR");
        let unset = fingerprint();
        std::env::set_var("FENCE_TEST_MARKER_VAR", "1");
        let set = fingerprint();
        std::env::remove_var("FENCE_TEST_MARKER_VAR");

        assert_ne!(unset, set);
    }
}
