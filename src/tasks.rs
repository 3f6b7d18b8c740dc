// src/tasks.rs
//! The `test` command: runs a configured action under the computation
//! cache. A hit replays the stored stdout and stderr verbatim inside a
//! banner and exits with the stored code; a miss runs the command,
//! captures its output, and stores it atomically.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::cache::{self, CacheEntry, ComputationCache, FingerprintInputs};
use crate::config::ProjectConfig;
use crate::manifest;
use crate::pattern::PathMatcher;

/// Runs `action` from the `[commands]` table, memoized. Returns the exit
/// code of the underlying command (cached or fresh).
pub fn run(project_root: &Path, config: &ProjectConfig, action: &str) -> Result<i32> {
    let Some(entry) = config.commands.get(action) else {
        bail!("No command named '{action}' is configured under [commands] in fence.toml.");
    };
    let command_lines = entry.clone().into_vec();

    let matcher = PathMatcher::new(
        project_root,
        &config.exclude,
        config.use_default_excludes,
        config.respect_gitignore,
    )?;
    let source_roots = config.absolute_source_roots(project_root);
    let declared = manifest::load(project_root);
    let interpreter_version = interpreter_version();

    let fingerprint = cache::compute_fingerprint(
        project_root,
        &matcher,
        &FingerprintInputs {
            interpreter_version: &interpreter_version,
            source_roots: &source_roots,
            dependency_pins: &declared.pins,
            cache_config: &config.cache,
            action,
        },
    )?;

    let cache = ComputationCache::open(project_root);
    if let Some(entry) = cache.get(&fingerprint) {
        replay(action, &entry);
        return Ok(entry.exit_code);
    }

    let entry = run_commands(project_root, &command_lines)?;
    print!("{}", entry.stdout);
    eprint!("{}", entry.stderr);
    std::io::stdout().flush().ok();

    cache.put(&fingerprint, &entry)?;
    Ok(entry.exit_code)
}

fn replay(action: &str, entry: &CacheEntry) {
    let banner = format!("============ Cached results ('{action}') ============");
    println!("{}", banner.cyan().bold());
    print!("{}", entry.stdout);
    eprint!("{}", entry.stderr);
    println!("{}", "=".repeat(banner.len()).cyan().bold());
}

/// Runs each command line through the shell, stopping at the first
/// failure. If any command cannot be spawned, nothing is cached.
fn run_commands(project_root: &Path, command_lines: &[String]) -> Result<CacheEntry> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    for line in command_lines {
        let output = Command::new("sh")
            .arg("-c")
            .arg(line)
            .current_dir(project_root)
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to run '{line}': {e}"))?;

        stdout.push_str(&String::from_utf8_lossy(&output.stdout));
        stderr.push_str(&String::from_utf8_lossy(&output.stderr));
        exit_code = output.status.code().unwrap_or(1);
        if exit_code != 0 {
            break;
        }
    }

    Ok(CacheEntry {
        stdout,
        stderr,
        exit_code,
    })
}

/// The caller-supplied interpreter identity for the fingerprint; an
/// unavailable interpreter hashes as the empty string.
#[must_use]
pub fn interpreter_version() -> String {
    Command::new("python3")
        .arg("--version")
        .output()
        .ok()
        .map(|output| {
            String::from_utf8_lossy(&output.stdout)
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandEntry;

    #[test]
    fn test_unknown_action_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::default();
        assert!(run(dir.path(), &config, "missing").is_err());
    }

    #[test]
    fn test_miss_then_hit_replays_same_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();

        let mut config = ProjectConfig::default();
        config.commands.insert(
            "echo".to_string(),
            CommandEntry::Single("echo hello".to_string()),
        );

        let first = run(dir.path(), &config, "echo").unwrap();
        assert_eq!(first, 0);

        // Second run must be served from the cache with the same code.
        let second = run(dir.path(), &config, "echo").unwrap();
        assert_eq!(second, 0);
        assert!(dir.path().join(cache::DEFAULT_CACHE_DIR).is_dir());
    }

    #[test]
    fn test_failing_command_code_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();

        let mut config = ProjectConfig::default();
        config.commands.insert(
            "fail".to_string(),
            CommandEntry::List(vec!["exit 3".to_string(), "echo never".to_string()]),
        );

        assert_eq!(run(dir.path(), &config, "fail").unwrap(), 3);
        assert_eq!(run(dir.path(), &config, "fail").unwrap(), 3);
    }
}
