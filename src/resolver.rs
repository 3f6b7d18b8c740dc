// src/resolver.rs
//! Maps every dotted import path to its owner.
//!
//! Resolution order: a declared module (nearest ancestor), then unowned
//! project code, then a known external package (manifest or stdlib),
//! otherwise unknown. Immutable after construction and shared across the
//! worker pool.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{ExternalConfig, ModuleConfig};
use crate::manifest::{self, DeclaredDependencies};
use crate::modules::ModuleTree;
use crate::{paths, stdlib};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Owned by a declared module. `exact` is true when the import
    /// targets the module itself rather than a descendant.
    Internal {
        module: &'a ModuleConfig,
        exact: bool,
    },
    /// Provided by a third-party or stdlib package. The name is the
    /// normalized distribution name after renames.
    External { package: String, stdlib: bool },
    /// Inside the project but under no declared module.
    Root,
    /// Neither internal nor external.
    Unknown,
}

pub struct Resolver<'a> {
    tree: &'a ModuleTree,
    source_roots: &'a [PathBuf],
    declared: &'a DeclaredDependencies,
    /// Normalized import name -> normalized distribution name.
    renames: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(
        tree: &'a ModuleTree,
        source_roots: &'a [PathBuf],
        declared: &'a DeclaredDependencies,
        external: &ExternalConfig,
    ) -> Self {
        let renames = external
            .rename
            .iter()
            .filter_map(|entry| {
                entry.split_once(':').map(|(dist, import)| {
                    (
                        manifest::normalize_name(import),
                        manifest::normalize_name(dist),
                    )
                })
            })
            .collect();

        Self {
            tree,
            source_roots,
            declared,
            renames,
        }
    }

    #[must_use]
    pub fn resolve(&self, module_path: &str) -> Resolution<'a> {
        if let Some(module) = self.tree.find_nearest(module_path) {
            return Resolution::Internal {
                module,
                exact: module_path == module.path,
            };
        }

        if self.is_project_path(module_path) {
            return Resolution::Root;
        }

        let top_level = module_path.split('.').next().unwrap_or_default();
        if top_level.is_empty() {
            return Resolution::Unknown;
        }

        let normalized = manifest::normalize_name(top_level);
        let package = self
            .renames
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized);

        if self.declared.contains(&package) {
            return Resolution::External {
                package,
                stdlib: false,
            };
        }
        if stdlib::is_stdlib(top_level) {
            return Resolution::External {
                package,
                stdlib: true,
            };
        }

        Resolution::Unknown
    }

    /// A path is project code when it, or the module that would contain
    /// it as a member, exists under a source root.
    fn is_project_path(&self, module_path: &str) -> bool {
        if paths::module_exists(self.source_roots, module_path) {
            return true;
        }
        module_path
            .rsplit_once('.')
            .is_some_and(|(parent, _)| paths::module_exists(self.source_roots, parent))
    }
}
