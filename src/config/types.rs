// src/config/types.rs
//! Serde types for `fence.toml`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel path for the implicit catch-all module.
pub const ROOT_MODULE_SENTINEL: &str = "<root>";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetting {
    Error,
    Warn,
    Off,
}

impl RuleSetting {
    fn warn() -> Self {
        Self::Warn
    }

    fn is_warn(&self) -> bool {
        *self == Self::Warn
    }

    fn error() -> Self {
        Self::Error
    }

    fn is_error(&self) -> bool {
        *self == Self::Error
    }

    fn off() -> Self {
        Self::Off
    }

    pub fn is_off(&self) -> bool {
        *self == Self::Off
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RootModuleTreatment {
    Allow,
    Forbid,
    #[default]
    Ignore,
    DependenciesOnly,
}

impl RootModuleTreatment {
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// One entry of a module's `depends_on` list. Written as a bare string
/// when not deprecated, as `{ path = "...", deprecated = true }` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DependencyConfig {
    pub path: String,
    pub deprecated: bool,
}

impl DependencyConfig {
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deprecated: false,
        }
    }

    #[must_use]
    pub fn deprecated(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deprecated: true,
        }
    }
}

impl Serialize for DependencyConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.deprecated {
            let mut state = serializer.serialize_struct("DependencyConfig", 2)?;
            state.serialize_field("path", &self.path)?;
            state.serialize_field("deprecated", &self.deprecated)?;
            state.end()
        } else {
            serializer.serialize_str(&self.path)
        }
    }
}

impl<'de> Deserialize<'de> for DependencyConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Path(String),
            Full {
                path: String,
                #[serde(default)]
                deprecated: bool,
            },
        }

        Ok(match Entry::deserialize(deserializer)? {
            Entry::Path(path) => DependencyConfig::from_path(path),
            Entry::Full { path, deprecated } => DependencyConfig { path, deprecated },
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModuleConfig {
    pub path: String,
    /// `None` leaves the module's dependencies unchecked; an empty list
    /// allows nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<DependencyConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cannot_depend_on: Option<Vec<DependencyConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on_external: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cannot_depend_on_external: Option<Vec<String>>,
    /// Glob patterns over dotted paths naming who may import this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub utility: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unchecked: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            depends_on: Some(vec![]),
            cannot_depend_on: None,
            depends_on_external: None,
            cannot_depend_on_external: None,
            visibility: None,
            layer: None,
            strict: false,
            utility: false,
            unchecked: false,
        }
    }
}

impl ModuleConfig {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn new_root() -> Self {
        Self {
            path: ROOT_MODULE_SENTINEL.to_string(),
            depends_on: None,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path == ROOT_MODULE_SENTINEL
    }

    pub fn dependencies_iter(&self) -> impl Iterator<Item = &DependencyConfig> {
        self.depends_on.iter().flatten()
    }

    pub fn forbidden_iter(&self) -> impl Iterator<Item = &DependencyConfig> {
        self.cannot_depend_on.iter().flatten()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceDataTypes {
    #[default]
    All,
    Primitive,
}

impl fmt::Display for InterfaceDataTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Primitive => write!(f, "primitive"),
        }
    }
}

impl InterfaceDataTypes {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct InterfaceConfig {
    /// Regex patterns over member names exposed by the interface.
    pub expose: Vec<String>,
    /// Dotted paths of the modules the interface applies to. Absent means
    /// every module.
    #[serde(rename = "from", default, skip_serializing_if = "Option::is_none")]
    pub from_modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "InterfaceDataTypes::is_default")]
    pub data_types: InterfaceDataTypes,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive: bool,
}

impl InterfaceConfig {
    #[must_use]
    pub fn applies_to(&self, module_path: &str) -> bool {
        self.from_modules
            .as_ref()
            .is_none_or(|modules| modules.iter().any(|m| m == module_path))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RulesConfig {
    #[serde(
        default = "RuleSetting::warn",
        skip_serializing_if = "RuleSetting::is_warn"
    )]
    pub unused_ignore_directives: RuleSetting,
    #[serde(
        default = "RuleSetting::off",
        skip_serializing_if = "RuleSetting::is_off"
    )]
    pub require_ignore_directive_reasons: RuleSetting,
    #[serde(
        default = "RuleSetting::error",
        skip_serializing_if = "RuleSetting::is_error"
    )]
    pub unused_external_dependencies: RuleSetting,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            unused_ignore_directives: RuleSetting::Warn,
            require_ignore_directive_reasons: RuleSetting::Off,
            unused_external_dependencies: RuleSetting::Error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Disk,
}

impl CacheBackend {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default, skip_serializing_if = "CacheBackend::is_default")]
    pub backend: CacheBackend,
    /// Globs whose matching file contents feed the fingerprint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_dependencies: Vec<String>,
    /// Environment variables whose values feed the fingerprint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_dependencies: Vec<String>,
}

impl CacheConfig {
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ExternalConfig {
    /// Packages exempt from external dependency checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// `"distribution:import"` pairs for packages whose import name
    /// differs from their distribution name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename: Vec<String>,
}

impl ExternalConfig {
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CommandEntry {
    Single(String),
    List(Vec<String>),
}

impl CommandEntry {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::List(l) => l,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProjectConfig {
    // Scalar keys first so TOML serialization stays well-formed with the
    // table sections below.
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Ordered highest-to-lowest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub use_default_excludes: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub respect_gitignore: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub ignore_type_checking_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_string_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub forbid_circular_dependencies: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exact: bool,
    #[serde(
        default,
        skip_serializing_if = "RootModuleTreatment::is_default"
    )]
    pub root_module_treatment: RootModuleTreatment,
    #[serde(default, skip_serializing_if = "is_default_rules")]
    pub rules: RulesConfig,
    #[serde(default, skip_serializing_if = "CacheConfig::is_default")]
    pub cache: CacheConfig,
    #[serde(default, skip_serializing_if = "ExternalConfig::is_default")]
    pub external: ExternalConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, CommandEntry>,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            interfaces: Vec::new(),
            layers: Vec::new(),
            source_roots: default_source_roots(),
            exclude: Vec::new(),
            use_default_excludes: true,
            respect_gitignore: false,
            ignore_type_checking_imports: true,
            include_string_imports: false,
            forbid_circular_dependencies: false,
            exact: false,
            root_module_treatment: RootModuleTreatment::default(),
            rules: RulesConfig::default(),
            cache: CacheConfig::default(),
            external: ExternalConfig::default(),
            commands: BTreeMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Source roots resolved against the project root. A root of `.` maps
    /// to the project root itself.
    #[must_use]
    pub fn absolute_source_roots(&self, project_root: &Path) -> Vec<PathBuf> {
        self.source_roots
            .iter()
            .map(|root| {
                if root == Path::new(".") {
                    project_root.to_path_buf()
                } else {
                    project_root.join(root)
                }
            })
            .collect()
    }

    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.path.as_str())
    }

    #[must_use]
    pub fn module(&self, path: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.path == path)
    }

    #[must_use]
    pub fn dependencies_for_module(&self, path: &str) -> Option<&Vec<DependencyConfig>> {
        self.module(path)?.depends_on.as_ref()
    }

    /// Returns a copy with every module's `depends_on` emptied, so that a
    /// dependency check reports every cross-module import.
    #[must_use]
    pub fn with_dependencies_cleared(&self) -> Self {
        let mut cleared = self.clone();
        for module in &mut cleared.modules {
            module.depends_on = Some(vec![]);
        }
        cleared.exact = false;
        cleared.forbid_circular_dependencies = false;
        cleared
    }

    pub fn add_dependency(&mut self, module_path: &str, dependency: DependencyConfig) {
        if let Some(module) = self.modules.iter_mut().find(|m| m.path == module_path) {
            match &mut module.depends_on {
                Some(deps) => {
                    if !deps.iter().any(|d| d.path == dependency.path) {
                        deps.push(dependency);
                    }
                }
                None => module.depends_on = Some(vec![dependency]),
            }
        } else {
            self.modules.push(ModuleConfig {
                path: module_path.to_string(),
                depends_on: Some(vec![dependency]),
                ..Default::default()
            });
        }
    }

    pub fn remove_dependency(&mut self, module_path: &str, dependency_path: &str) {
        if let Some(module) = self.modules.iter_mut().find(|m| m.path == module_path) {
            if let Some(deps) = &mut module.depends_on {
                deps.retain(|d| d.path != dependency_path);
            }
        }
    }
}

pub fn default_source_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

const fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default_rules(rules: &RulesConfig) -> bool {
    *rules == RulesConfig::default()
}
