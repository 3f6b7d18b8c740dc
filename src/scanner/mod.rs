// src/scanner/mod.rs
//! Import extraction for one Python source file.
//!
//! Walks the tree-sitter parse tree and emits one record per import
//! reference, in source order, with line numbers and a flag for imports
//! guarded by `TYPE_CHECKING`. No semantic analysis, no evaluation.

pub mod directives;

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Language, Node, Parser};

use crate::diagnostics::ConfigurationDiagnostic;

pub use directives::{IgnoreDirective, IgnoreDirectives};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Runtime,
    TypeChecking,
    String,
}

/// One qualified import reference as the interpreter would perform it.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module_path: String,
    pub line_number: usize,
    pub kind: ImportKind,
    /// Name the import binds locally; `None` for string imports.
    pub alias: Option<String>,
    /// True for `from x import *`, which is deliberately opaque.
    pub wildcard: bool,
}

impl Import {
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.module_path.split('.').next().unwrap_or_default()
    }
}

/// A problem found while scanning, pinned to a line. The caller attaches
/// the file path.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDiagnostic {
    pub line_number: usize,
    pub details: ConfigurationDiagnostic,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// The file's own dotted path; `None` when outside every source root.
    pub file_module_path: Option<&'a str>,
    /// True for `__init__.py` / `__init__.pyi`.
    pub is_package: bool,
    pub ignore_type_checking_imports: bool,
    pub include_string_imports: bool,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub imports: Vec<Import>,
    pub directives: IgnoreDirectives,
    pub diagnostics: Vec<ScanDiagnostic>,
    /// Imports omitted because they sit in a `TYPE_CHECKING` block while
    /// `ignore_type_checking_imports` is set.
    pub skipped_type_checking: usize,
}

static DOTTED_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").unwrap());

const TYPE_CHECKING_SENTINEL: &str = "TYPE_CHECKING";
const STRING_IMPORT_FUNCTION: &str = "import_module";

/// Scans one file. Failure-tolerant: a syntax error yields one
/// `Configuration` diagnostic at the first broken node and the imports
/// recovered around it are still returned.
#[must_use]
pub fn scan(source: &str, ctx: &ScanContext) -> ScanResult {
    let mut result = ScanResult {
        directives: directives::parse(source),
        ..Default::default()
    };

    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    if parser.set_language(&language).is_err() {
        return result;
    }
    let Some(tree) = parser.parse(source, None) else {
        return result;
    };

    let root = tree.root_node();
    if root.has_error() {
        if let Some(line) = first_error_line(root) {
            result.diagnostics.push(ScanDiagnostic {
                line_number: line,
                details: ConfigurationDiagnostic::SyntaxError(),
            });
        }
    }

    let mut walker = Walker {
        source: source.as_bytes(),
        ctx,
        imports: Vec::new(),
        diagnostics: Vec::new(),
        skipped_type_checking: 0,
    };
    walker.visit(root, false);

    result.imports = walker.imports;
    result.diagnostics.extend(walker.diagnostics);
    result.skipped_type_checking = walker.skipped_type_checking;
    result
}

struct Walker<'a> {
    source: &'a [u8],
    ctx: &'a ScanContext<'a>,
    imports: Vec<Import>,
    diagnostics: Vec<ScanDiagnostic>,
    skipped_type_checking: usize,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node, type_checking: bool) {
        match node.kind() {
            "import_statement" => self.absolute_import(node, type_checking),
            "import_from_statement" => self.from_import(node, type_checking),
            "if_statement" => self.if_statement(node, type_checking),
            "call" if self.ctx.include_string_imports => {
                self.string_import(node);
                self.recurse(node, type_checking);
            }
            _ => self.recurse(node, type_checking),
        }
    }

    fn recurse(&mut self, node: Node, type_checking: bool) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, type_checking);
        }
    }

    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn line(node: Node) -> usize {
        node.start_position().row + 1
    }

    fn emit(&mut self, mut import: Import, type_checking: bool) {
        if type_checking {
            if self.ctx.ignore_type_checking_imports {
                self.skipped_type_checking += 1;
                return;
            }
            import.kind = ImportKind::TypeChecking;
        }
        self.imports.push(import);
    }

    /// `import a.b.c [as x]` binds either the alias or the first segment.
    fn absolute_import(&mut self, node: Node, type_checking: bool) {
        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            let (path_node, alias) = match name_node.kind() {
                "dotted_name" => (name_node, None),
                "aliased_import" => {
                    let Some(inner) = name_node.child_by_field_name("name") else {
                        continue;
                    };
                    let alias = name_node
                        .child_by_field_name("alias")
                        .map(|a| self.text(a).to_string());
                    (inner, alias)
                }
                _ => continue,
            };

            let module_path = self.text(path_node).to_string();
            let alias = alias
                .or_else(|| module_path.split('.').next().map(ToString::to_string));

            self.emit(
                Import {
                    module_path,
                    line_number: Self::line(name_node),
                    kind: ImportKind::Runtime,
                    alias,
                    wildcard: false,
                },
                type_checking,
            );
        }
    }

    fn from_import(&mut self, node: Node, type_checking: bool) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let base = match module_node.kind() {
            "dotted_name" => Some(self.text(module_node).to_string()),
            "relative_import" => self.resolve_relative(module_node),
            _ => None,
        };
        let Some(base) = base else {
            return;
        };

        if let Some(star) = named_child_of_kind(node, "wildcard_import") {
            self.emit(
                Import {
                    module_path: base,
                    line_number: Self::line(star),
                    kind: ImportKind::Runtime,
                    alias: None,
                    wildcard: true,
                },
                type_checking,
            );
            return;
        }

        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            let (leaf_node, alias) = match name_node.kind() {
                "dotted_name" | "identifier" => (name_node, None),
                "aliased_import" => {
                    let Some(inner) = name_node.child_by_field_name("name") else {
                        continue;
                    };
                    let alias = name_node
                        .child_by_field_name("alias")
                        .map(|a| self.text(a).to_string());
                    (inner, alias)
                }
                _ => continue,
            };

            let leaf = self.text(leaf_node).to_string();
            let module_path = if base.is_empty() {
                leaf.clone()
            } else {
                format!("{base}.{leaf}")
            };

            self.emit(
                Import {
                    module_path,
                    line_number: Self::line(leaf_node),
                    kind: ImportKind::Runtime,
                    alias: alias.or(Some(leaf)),
                    wildcard: false,
                },
                type_checking,
            );
        }
    }

    /// Resolves `.`/`..` prefixes against the file's own dotted path.
    /// Returns the base package path, or `None` after emitting a
    /// diagnostic for an unresolvable import.
    fn resolve_relative(&mut self, module_node: Node) -> Option<String> {
        let line = Self::line(module_node);

        let level = named_child_of_kind(module_node, "import_prefix")
            .map_or(0, |prefix| self.text(prefix).matches('.').count());
        let submodule = named_child_of_kind(module_node, "dotted_name")
            .map(|n| self.text(n).to_string());

        let Some(file_module_path) = self.ctx.file_module_path else {
            self.unresolvable(line);
            return None;
        };

        // The package the file belongs to: itself for a package init,
        // its parent otherwise.
        let mut package: Vec<&str> = if file_module_path.is_empty() {
            Vec::new()
        } else {
            file_module_path.split('.').collect()
        };
        if !self.ctx.is_package {
            package.pop();
        }

        let ascend = level.saturating_sub(1);
        if ascend > package.len() {
            self.unresolvable(line);
            return None;
        }
        package.truncate(package.len() - ascend);

        match submodule {
            Some(sub) if package.is_empty() => Some(sub),
            Some(sub) => Some(format!("{}.{sub}", package.join("."))),
            None => {
                if package.is_empty() && !(self.ctx.is_package && file_module_path.is_empty()) {
                    self.unresolvable(line);
                    return None;
                }
                Some(package.join("."))
            }
        }
    }

    fn unresolvable(&mut self, line: usize) {
        self.diagnostics.push(ScanDiagnostic {
            line_number: line,
            details: ConfigurationDiagnostic::UnresolvableRelativeImport(),
        });
    }

    fn if_statement(&mut self, node: Node, type_checking: bool) {
        let guarded = node
            .child_by_field_name("condition")
            .is_some_and(|c| self.is_type_checking_condition(c));

        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.visit(consequence, type_checking || guarded);
        }

        let mut cursor = node.walk();
        for clause in node.children_by_field_name("alternative", &mut cursor) {
            match clause.kind() {
                "elif_clause" => {
                    let elif_guarded = clause
                        .child_by_field_name("condition")
                        .is_some_and(|c| self.is_type_checking_condition(c));
                    if let Some(consequence) = clause.child_by_field_name("consequence") {
                        self.visit(consequence, type_checking || elif_guarded);
                    }
                }
                "else_clause" => {
                    if let Some(body) = clause.child_by_field_name("body") {
                        self.visit(body, type_checking);
                    }
                }
                _ => {}
            }
        }
    }

    /// `if TYPE_CHECKING:` and `if typing.TYPE_CHECKING:` (any qualifier)
    /// both count.
    fn is_type_checking_condition(&self, condition: Node) -> bool {
        match condition.kind() {
            "identifier" => self.text(condition) == TYPE_CHECKING_SENTINEL,
            "attribute" => condition
                .child_by_field_name("attribute")
                .is_some_and(|attr| self.text(attr) == TYPE_CHECKING_SENTINEL),
            _ => false,
        }
    }

    /// A dotted-path string literal passed to `import_module(...)`.
    fn string_import(&mut self, call: Node) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        let callee = match function.kind() {
            "identifier" => self.text(function),
            "attribute" => function
                .child_by_field_name("attribute")
                .map(|attr| self.text(attr))
                .unwrap_or_default(),
            _ => return,
        };
        if callee != STRING_IMPORT_FUNCTION {
            return;
        }

        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        let Some(string) = named_child_of_kind(arguments, "string") else {
            return;
        };
        let Some(content) = named_child_of_kind(string, "string_content") else {
            return;
        };

        let value = self.text(content).to_string();
        if !DOTTED_PATH_REGEX.is_match(&value) {
            return;
        }

        self.imports.push(Import {
            module_path: value,
            line_number: Self::line(string),
            kind: ImportKind::String,
            alias: None,
            wildcard: false,
        });
    }
}

fn named_child_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_line)
}
