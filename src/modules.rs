// src/modules.rs
//! The module tree: a trie over dotted-path segments.
//!
//! Lookup returns the nearest ancestor carrying a module config, which is
//! how every import is mapped to the module that owns it. The tree is
//! strictly top-down; nodes own their children.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Result};
use regex::Regex;

use crate::config::{
    ModuleConfig, ProjectConfig, RootModuleTreatment, ROOT_MODULE_SENTINEL,
};
use crate::paths;

#[derive(Debug, Default)]
struct ModuleNode {
    config: Option<ModuleConfig>,
    children: HashMap<String, ModuleNode>,
}

#[derive(Debug)]
pub struct ModuleTree {
    root: ModuleNode,
    root_module: Option<ModuleConfig>,
}

impl ModuleTree {
    /// Builds the tree from the project configuration, validating module
    /// uniqueness and the root-module policy. Configuration violations
    /// are hard errors.
    pub fn build(config: &ProjectConfig) -> Result<Self> {
        validate_unique_paths(&config.modules)?;
        validate_root_treatment(config)?;

        let mut root = ModuleNode::default();
        for module in &config.modules {
            if module.is_root() {
                continue;
            }
            insert(&mut root, module.clone());
        }

        let declared_root = config.modules.iter().find(|m| m.is_root()).cloned();
        let root_module = match config.root_module_treatment {
            RootModuleTreatment::Forbid => None,
            _ => Some(declared_root.unwrap_or_else(ModuleConfig::new_root)),
        };

        Ok(Self { root, root_module })
    }

    /// The nearest ancestor module owning `path`, if any.
    #[must_use]
    pub fn find_nearest(&self, path: &str) -> Option<&ModuleConfig> {
        if path.is_empty() {
            return None;
        }
        let mut node = &self.root;
        let mut nearest = None;
        for segment in path.split('.') {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    if let Some(config) = &node.config {
                        nearest = Some(config);
                    }
                }
                None => break,
            }
        }
        nearest
    }

    /// The exact module declared at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ModuleConfig> {
        if path == ROOT_MODULE_SENTINEL {
            return self.root_module.as_ref();
        }
        let mut node = &self.root;
        for segment in path.split('.') {
            node = node.children.get(segment)?;
        }
        node.config.as_ref()
    }

    /// The catch-all module for code under no declared module. `None`
    /// when the root-module policy forbids it.
    #[must_use]
    pub fn root_module(&self) -> Option<&ModuleConfig> {
        self.root_module.as_ref()
    }
}

fn insert(root: &mut ModuleNode, module: ModuleConfig) {
    let mut node = root;
    for segment in module.path.split('.') {
        node = node.children.entry(segment.to_string()).or_default();
    }
    node.config = Some(module);
}

fn validate_unique_paths(modules: &[ModuleConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for module in modules {
        if !seen.insert(module.path.as_str()) {
            bail!("Module '{}' is declared more than once.", module.path);
        }
    }
    Ok(())
}

fn validate_root_treatment(config: &ProjectConfig) -> Result<()> {
    let depends_on_root = |module: &ModuleConfig| {
        module
            .dependencies_iter()
            .any(|dep| dep.path == ROOT_MODULE_SENTINEL)
    };

    match config.root_module_treatment {
        RootModuleTreatment::Allow | RootModuleTreatment::Ignore => Ok(()),
        RootModuleTreatment::Forbid => {
            for module in &config.modules {
                if module.is_root() || depends_on_root(module) {
                    bail!(
                        "The root module ('{ROOT_MODULE_SENTINEL}') is forbidden, but module '{}' references it.",
                        module.path
                    );
                }
            }
            Ok(())
        }
        RootModuleTreatment::DependenciesOnly => {
            for module in &config.modules {
                if depends_on_root(module) {
                    bail!(
                        "No module may depend on the root module, but '{}' does.",
                        module.path
                    );
                }
            }
            Ok(())
        }
    }
}

/// Declared modules with no corresponding file or package on disk.
#[must_use]
pub fn missing_modules<'a>(
    source_roots: &[PathBuf],
    modules: &'a [ModuleConfig],
) -> Vec<&'a ModuleConfig> {
    modules
        .iter()
        .filter(|m| !m.is_root() && !paths::module_exists(source_roots, &m.path))
        .collect()
}

/// A glob over dotted module paths: `*` matches one segment, `**` any run
/// of segments. Used by visibility lists.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let mut translated = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        translated.push_str(".*");
                    } else {
                        translated.push_str("[^.]*");
                    }
                }
                '.' => translated.push_str("\\."),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');

        let regex = Regex::new(&translated)
            .map_err(|e| anyhow::anyhow!("Invalid path pattern '{pattern}': {e}"))?;
        Ok(Self { regex })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}
