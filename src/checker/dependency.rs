// src/checker/dependency.rs
//! Internal dependency rules: utility bypass, same-module, visibility,
//! layers, forbidden and declared dependency lists.
//!
//! Rules apply in order; the first violation wins. The layer check takes
//! precedence over the declared-dependency list, and a same-layer edge is
//! only allowed when explicitly declared.

use std::collections::HashMap;

use anyhow::Result;

use crate::config::{DependencyConfig, ModuleConfig};
use crate::diagnostics::{
    CodeDiagnostic, ConfigurationDiagnostic, DiagnosticDetails, Severity,
};
use crate::modules::PathPattern;
use crate::scanner::Import;

/// Precompiled visibility patterns per module path.
pub struct VisibilityIndex {
    patterns: HashMap<String, Vec<PathPattern>>,
}

impl VisibilityIndex {
    pub fn build(modules: &[ModuleConfig]) -> Result<Self> {
        let mut patterns = HashMap::new();
        for module in modules {
            if let Some(visibility) = &module.visibility {
                let compiled = visibility
                    .iter()
                    .map(|p| PathPattern::new(p))
                    .collect::<Result<Vec<_>>>()?;
                patterns.insert(module.path.clone(), compiled);
            }
        }
        Ok(Self { patterns })
    }

    /// True when `usage_module` may see `definition_module`. Modules
    /// without a visibility list are visible to everyone.
    #[must_use]
    pub fn is_visible(&self, definition_module: &str, usage_module: &str) -> bool {
        self.patterns
            .get(definition_module)
            .is_none_or(|patterns| patterns.iter().any(|p| p.matches(usage_module)))
    }
}

enum LayerCheck {
    Allowed,
    NeedsDeclaration,
    Violation,
    Unknown(String),
}

fn check_layers(
    layers: &[String],
    importer: &ModuleConfig,
    target: &ModuleConfig,
) -> LayerCheck {
    let (Some(importer_layer), Some(target_layer)) = (&importer.layer, &target.layer) else {
        return LayerCheck::NeedsDeclaration;
    };

    let importer_index = layers.iter().position(|l| l == importer_layer);
    let target_index = layers.iter().position(|l| l == target_layer);

    match (importer_index, target_index) {
        (Some(importer_index), Some(target_index)) => {
            if importer_index == target_index {
                LayerCheck::NeedsDeclaration
            } else if importer_index < target_index {
                // Importer sits higher in the ordering; lower layers are
                // freely importable.
                LayerCheck::Allowed
            } else {
                LayerCheck::Violation
            }
        }
        (None, _) => LayerCheck::Unknown(importer_layer.clone()),
        (_, None) => LayerCheck::Unknown(target_layer.clone()),
    }
}

/// Applies the dependency rules for one internal import. Returns at most
/// one diagnostic payload.
#[must_use]
pub fn check_import(
    importer: &ModuleConfig,
    target: &ModuleConfig,
    import: &Import,
    layers: &[String],
    visibility: &VisibilityIndex,
) -> Option<(Severity, DiagnosticDetails)> {
    if target.utility {
        return None;
    }
    if importer.path == target.path {
        return None;
    }

    if !visibility.is_visible(&target.path, &importer.path) {
        return Some((
            Severity::Error,
            DiagnosticDetails::Code(CodeDiagnostic::InvisibleDependency {
                dependency: import.module_path.clone(),
                usage_module: importer.path.clone(),
                definition_module: target.path.clone(),
            }),
        ));
    }

    match check_layers(layers, importer, target) {
        LayerCheck::Allowed => return None,
        LayerCheck::Violation => {
            return Some((
                Severity::Error,
                DiagnosticDetails::Code(CodeDiagnostic::LayerViolation {
                    dependency: import.module_path.clone(),
                    usage_module: importer.path.clone(),
                    usage_layer: importer.layer.clone().unwrap_or_default(),
                    definition_module: target.path.clone(),
                    definition_layer: target.layer.clone().unwrap_or_default(),
                }),
            ));
        }
        LayerCheck::Unknown(layer) => {
            return Some((
                Severity::Error,
                DiagnosticDetails::Configuration(ConfigurationDiagnostic::UnknownLayer { layer }),
            ));
        }
        LayerCheck::NeedsDeclaration => {}
    }

    if importer
        .forbidden_iter()
        .any(|dep| dep.path == target.path)
    {
        return Some((
            Severity::Error,
            DiagnosticDetails::Code(CodeDiagnostic::ForbiddenDependency {
                dependency: import.module_path.clone(),
                usage_module: importer.path.clone(),
                definition_module: target.path.clone(),
            }),
        ));
    }

    let Some(declared) = &importer.depends_on else {
        return None;
    };

    match declared.iter().find(|dep| dep.path == target.path) {
        Some(DependencyConfig {
            deprecated: true, ..
        }) => Some((
            Severity::Warning,
            DiagnosticDetails::Code(CodeDiagnostic::DeprecatedDependency {
                dependency: import.module_path.clone(),
                usage_module: importer.path.clone(),
                definition_module: target.path.clone(),
            }),
        )),
        Some(_) => None,
        None => Some((
            Severity::Error,
            DiagnosticDetails::Code(CodeDiagnostic::UndeclaredDependency {
                dependency: import.module_path.clone(),
                usage_module: importer.path.clone(),
                definition_module: target.path.clone(),
            }),
        )),
    }
}
