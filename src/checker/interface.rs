// src/checker/interface.rs
//! Interface strictness.
//!
//! A strict module only exposes the members matched by an interface that
//! names it. Star imports are opaque and always pass; aliased imports are
//! matched by their original name, not the alias.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;
use tree_sitter::{Language, Node, Parser};

use crate::config::{InterfaceConfig, InterfaceDataTypes, ModuleConfig};
use crate::diagnostics::CodeDiagnostic;
use crate::paths;
use crate::scanner::Import;

pub struct CompiledInterface {
    from_modules: Option<Vec<String>>,
    expose: Vec<Regex>,
    visibility: Option<Vec<String>>,
    pub data_types: InterfaceDataTypes,
    exclusive: bool,
}

impl CompiledInterface {
    fn applies_to(&self, module_path: &str) -> bool {
        self.from_modules
            .as_ref()
            .is_none_or(|modules| modules.iter().any(|m| m == module_path))
    }

    fn is_visible_to(&self, module_path: &str) -> bool {
        self.visibility
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|v| v == module_path))
    }

    fn exposes(&self, member: &str) -> bool {
        self.expose.iter().any(|re| re.is_match(member))
    }
}

pub struct CompiledInterfaces {
    interfaces: Vec<CompiledInterface>,
}

impl CompiledInterfaces {
    /// Compiles every `expose` pattern. Invalid patterns are
    /// configuration errors.
    pub fn build(interfaces: &[InterfaceConfig]) -> Result<Self> {
        let compiled = interfaces
            .iter()
            .map(|interface| {
                let expose = interface
                    .expose
                    .iter()
                    .map(|pattern| {
                        Regex::new(&format!("^{pattern}$"))
                            .with_context(|| format!("Invalid expose pattern '{pattern}'"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledInterface {
                    from_modules: interface.from_modules.clone(),
                    expose,
                    visibility: interface.visibility.clone(),
                    data_types: interface.data_types,
                    exclusive: interface.exclusive,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            interfaces: compiled,
        })
    }

    /// Interfaces applying to `definition_module` and visible from
    /// `usage_module`. An exclusive interface suppresses all others.
    fn visible_interfaces(
        &self,
        definition_module: &str,
        usage_module: &str,
    ) -> Vec<&CompiledInterface> {
        let mut matching = Vec::new();
        for interface in self
            .interfaces
            .iter()
            .filter(|i| i.applies_to(definition_module) && i.is_visible_to(usage_module))
        {
            if interface.exclusive {
                return vec![interface];
            }
            matching.push(interface);
        }
        matching
    }

    /// Module paths that have at least one `primitive` interface and
    /// therefore need their members type-checked.
    pub fn primitive_modules<'a>(&self, modules: &'a [ModuleConfig]) -> Vec<&'a str> {
        modules
            .iter()
            .filter(|m| {
                self.interfaces
                    .iter()
                    .any(|i| i.data_types == InterfaceDataTypes::Primitive && i.applies_to(&m.path))
            })
            .map(|m| m.path.as_str())
            .collect()
    }
}

/// Checks one cross-module import against a strict target. Returns the
/// violation, if any.
#[must_use]
pub fn check_import(
    interfaces: &CompiledInterfaces,
    type_cache: &TypeCheckCache,
    importer: &ModuleConfig,
    target: &ModuleConfig,
    import: &Import,
    exact: bool,
) -> Option<CodeDiagnostic> {
    if !target.strict || exact || import.wildcard {
        return None;
    }

    let member = import
        .module_path
        .strip_prefix(&target.path)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or_default();
    if member.is_empty() {
        return None;
    }

    let visible = interfaces.visible_interfaces(&target.path, &importer.path);
    let exposed = visible.iter().find(|interface| interface.exposes(member));

    let Some(exposed) = exposed else {
        return Some(CodeDiagnostic::PrivateImport {
            dependency: import.module_path.clone(),
            usage_module: importer.path.clone(),
            definition_module: target.path.clone(),
        });
    };

    if exposed.data_types == InterfaceDataTypes::Primitive {
        let leaf = member.split('.').next().unwrap_or(member);
        if type_cache.is_primitive(&target.path, leaf) == Some(false) {
            return Some(CodeDiagnostic::InvalidDataTypeExport {
                dependency: import.module_path.clone(),
                definition_module: target.path.clone(),
                expected: InterfaceDataTypes::Primitive.to_string(),
            });
        }
    }

    None
}

/// Best-effort annotation index for modules behind a `primitive`
/// interface. Members without a discoverable module-level annotation are
/// skipped, never flagged.
#[derive(Debug, Default)]
pub struct TypeCheckCache {
    annotations: HashMap<(String, String), bool>,
}

const PRIMITIVE_TYPE_NAMES: [&str; 14] = [
    "int", "float", "str", "bool", "bytes", "complex", "None", "Optional", "Final", "list",
    "dict", "set", "tuple", "frozenset",
];

impl TypeCheckCache {
    /// Parses each module that a `primitive` interface covers and records
    /// whether its module-level annotated members are primitive.
    #[must_use]
    pub fn build(
        interfaces: &CompiledInterfaces,
        modules: &[ModuleConfig],
        source_roots: &[PathBuf],
    ) -> Self {
        let mut cache = Self::default();
        for module_path in interfaces.primitive_modules(modules) {
            let Some(file) = paths::module_to_file_path(source_roots, module_path) else {
                continue;
            };
            let Ok(source) = std::fs::read_to_string(&file) else {
                continue;
            };
            cache.index_module(module_path, &source);
        }
        cache
    }

    /// `Some(false)` when the member is annotated with a non-primitive
    /// type; `None` when nothing is known about it.
    #[must_use]
    pub fn is_primitive(&self, module_path: &str, member: &str) -> Option<bool> {
        self.annotations
            .get(&(module_path.to_string(), member.to_string()))
            .copied()
    }

    fn index_module(&mut self, module_path: &str, source: &str) {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        if parser.set_language(&language).is_err() {
            return;
        }
        let Some(tree) = parser.parse(source, None) else {
            return;
        };

        let root = tree.root_node();
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "expression_statement" {
                continue;
            }
            let Some(assignment) = statement.named_child(0).filter(|n| n.kind() == "assignment")
            else {
                continue;
            };
            self.index_assignment(module_path, assignment, source.as_bytes());
        }
    }

    fn index_assignment(&mut self, module_path: &str, assignment: Node, source: &[u8]) {
        let Some(left) = assignment
            .child_by_field_name("left")
            .filter(|n| n.kind() == "identifier")
        else {
            return;
        };
        let Some(annotation) = assignment.child_by_field_name("type") else {
            return;
        };

        let name = left.utf8_text(source).unwrap_or_default().to_string();
        let annotation_text = annotation.utf8_text(source).unwrap_or_default();
        self.annotations
            .insert((module_path.to_string(), name), is_primitive_annotation(annotation_text));
    }
}

fn is_primitive_annotation(annotation: &str) -> bool {
    annotation
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|token| !token.is_empty())
        .all(|token| PRIMITIVE_TYPE_NAMES.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ImportKind;

    fn import(path: &str) -> Import {
        Import {
            module_path: path.to_string(),
            line_number: 1,
            kind: ImportKind::Runtime,
            alias: None,
            wildcard: false,
        }
    }

    fn strict_module(path: &str) -> ModuleConfig {
        ModuleConfig {
            strict: true,
            ..ModuleConfig::new(path)
        }
    }

    fn interfaces(expose: &[&str], from: &str) -> CompiledInterfaces {
        CompiledInterfaces::build(&[InterfaceConfig {
            expose: expose.iter().map(ToString::to_string).collect(),
            from_modules: Some(vec![from.to_string()]),
            ..Default::default()
        }])
        .unwrap()
    }

    #[test]
    fn test_exposed_member_passes() {
        let compiled = interfaces(&["api", "get_.*"], "core");
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = strict_module("core");

        assert!(check_import(&compiled, &cache, &importer, &target, &import("core.api"), false)
            .is_none());
        assert!(check_import(
            &compiled,
            &cache,
            &importer,
            &target,
            &import("core.get_user"),
            false
        )
        .is_none());
    }

    #[test]
    fn test_private_member_is_flagged() {
        let compiled = interfaces(&["api"], "core");
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = strict_module("core");

        let diagnostic = check_import(
            &compiled,
            &cache,
            &importer,
            &target,
            &import("core.internal"),
            false,
        )
        .unwrap();
        assert!(matches!(diagnostic, CodeDiagnostic::PrivateImport { .. }));
    }

    #[test]
    fn test_module_itself_is_always_importable() {
        let compiled = interfaces(&["api"], "core");
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = strict_module("core");

        assert!(
            check_import(&compiled, &cache, &importer, &target, &import("core"), true).is_none()
        );
    }

    #[test]
    fn test_star_import_is_opaque() {
        let compiled = interfaces(&["api"], "core");
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = strict_module("core");
        let star = Import {
            wildcard: true,
            ..import("core")
        };

        assert!(check_import(&compiled, &cache, &importer, &target, &star, false).is_none());
    }

    #[test]
    fn test_non_strict_module_is_open() {
        let compiled = interfaces(&["api"], "core");
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = ModuleConfig::new("core");

        assert!(check_import(
            &compiled,
            &cache,
            &importer,
            &target,
            &import("core.internal"),
            false
        )
        .is_none());
    }

    #[test]
    fn test_exclusive_interface_shadows_others() {
        let compiled = CompiledInterfaces::build(&[
            InterfaceConfig {
                expose: vec!["wide_.*".to_string()],
                from_modules: Some(vec!["core".to_string()]),
                ..Default::default()
            },
            InterfaceConfig {
                expose: vec!["narrow".to_string()],
                from_modules: Some(vec!["core".to_string()]),
                exclusive: true,
                ..Default::default()
            },
        ])
        .unwrap();
        let cache = TypeCheckCache::default();
        let importer = ModuleConfig::new("web");
        let target = strict_module("core");

        assert!(check_import(
            &compiled,
            &cache,
            &importer,
            &target,
            &import("core.narrow"),
            false
        )
        .is_none());
        assert!(check_import(
            &compiled,
            &cache,
            &importer,
            &target,
            &import("core.wide_open"),
            false
        )
        .is_some());
    }

    #[test]
    fn test_primitive_annotation_classification() {
        assert!(is_primitive_annotation("int"));
        assert!(is_primitive_annotation("dict[str, int]"));
        assert!(is_primitive_annotation("Optional[str]"));
        assert!(!is_primitive_annotation("DataFrame"));
        assert!(!is_primitive_annotation("list[Model]"));
    }

    #[test]
    fn test_type_cache_indexing() {
        let mut cache = TypeCheckCache::default();
        cache.index_module("core", "LIMIT: int = 10\nclient: Session = make()\nbare = 1\n");

        assert_eq!(cache.is_primitive("core", "LIMIT"), Some(true));
        assert_eq!(cache.is_primitive("core", "client"), Some(false));
        assert_eq!(cache.is_primitive("core", "bare"), None);
    }
}
