// src/config/mod.rs
pub mod io;
pub mod types;

pub use io::{find_project_root, load, parse, save, CONFIG_FILE};
pub use types::{
    CacheBackend, CacheConfig, CommandEntry, DependencyConfig, ExternalConfig, InterfaceConfig,
    InterfaceDataTypes, ModuleConfig, ProjectConfig, RootModuleTreatment, RuleSetting,
    RulesConfig, ROOT_MODULE_SENTINEL,
};
