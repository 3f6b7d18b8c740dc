// src/scanner/directives.rs
//! Inline `# fence-ignore` directives.
//!
//! A directive on its own line applies to the next line; a trailing
//! directive applies to its own line. An optional parenthesized reason and
//! an optional symbol list narrow what it suppresses.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::Import;

static DIRECTIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\s*fence-ignore(?:\(([^)]*)\))?((?:[ \t]+[\w.,]+)*)\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct IgnoreDirective {
    /// Symbol names the directive applies to; empty is a blanket ignore.
    pub names: Vec<String>,
    pub reason: String,
    /// Line the directive is written on.
    pub line_no: usize,
    /// Line whose imports the directive suppresses.
    pub applies_to_line: usize,
}

impl IgnoreDirective {
    /// Whether this directive suppresses diagnostics for the given import.
    /// Names match the alias, the full module path, or a trailing dotted
    /// suffix of it.
    #[must_use]
    pub fn matches_import(&self, import: &Import) -> bool {
        if self.names.is_empty() {
            return true;
        }
        self.names.iter().any(|name| {
            import.alias.as_deref() == Some(name.as_str())
                || import.module_path == *name
                || import.module_path.ends_with(&format!(".{name}"))
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct IgnoreDirectives {
    directives: HashMap<usize, IgnoreDirective>,
    redundant: Vec<IgnoreDirective>,
}

impl IgnoreDirectives {
    #[must_use]
    pub fn get(&self, line_no: usize) -> Option<&IgnoreDirective> {
        self.directives.get(&line_no)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.redundant.is_empty()
    }

    /// Directives in applies-to-line order, for deterministic reporting.
    pub fn sorted(&self) -> impl Iterator<Item = &IgnoreDirective> {
        let mut directives: Vec<_> = self.directives.values().collect();
        directives.sort_by_key(|d| d.applies_to_line);
        directives.into_iter()
    }

    /// Directives shadowed by another directive on the same target line.
    pub fn redundant(&self) -> impl Iterator<Item = &IgnoreDirective> {
        self.redundant.iter()
    }

    fn add(&mut self, directive: IgnoreDirective) {
        match self.directives.entry(directive.applies_to_line) {
            Entry::Occupied(_) => self.redundant.push(directive),
            Entry::Vacant(entry) => {
                entry.insert(directive);
            }
        }
    }
}

/// Extracts every directive in the file. Cheap when the marker never
/// appears.
#[must_use]
pub fn parse(file_content: &str) -> IgnoreDirectives {
    let mut directives = IgnoreDirectives::default();
    if !file_content.contains("fence-ignore") {
        return directives;
    }

    for (index, line) in file_content.lines().enumerate() {
        if !line.contains("fence-ignore") {
            continue;
        }
        let line_no = index + 1;
        let Some(captures) = DIRECTIVE_REGEX.captures(line) else {
            continue;
        };

        let paren_reason = captures.get(1).map(|m| m.as_str().trim().to_string());
        let trailer = captures.get(2).map_or("", |m| m.as_str());
        let (names, bare_reason) = parse_trailer(trailer, paren_reason.is_some());

        // A directive alone on its line applies to the next line.
        let applies_to_line = if line.trim_start().starts_with('#') {
            line_no + 1
        } else {
            line_no
        };

        directives.add(IgnoreDirective {
            names,
            reason: paren_reason.or(bare_reason).unwrap_or_default(),
            line_no,
            applies_to_line,
        });
    }

    directives
}

/// Splits the text after the keyword into symbol names or a bare reason.
/// Comma-separated tokens are always names; several bare words without a
/// parenthesized reason read as the reason.
fn parse_trailer(trailer: &str, has_paren_reason: bool) -> (Vec<String>, Option<String>) {
    let trailer = trailer.trim();
    if trailer.is_empty() {
        return (Vec::new(), None);
    }

    if trailer.contains(',') {
        let names = trailer
            .split(',')
            .flat_map(str::split_whitespace)
            .map(ToString::to_string)
            .collect();
        return (names, None);
    }

    let tokens: Vec<&str> = trailer.split_whitespace().collect();
    if tokens.len() > 1 && !has_paren_reason {
        return (Vec::new(), Some(trailer.to_string()));
    }

    (tokens.iter().map(ToString::to_string).collect(), None)
}
