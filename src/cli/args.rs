// src/cli/args.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "fence", version, about = "Enforce module boundaries and interfaces in Python projects")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to the nearest ancestor with a fence.toml)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check imports against the declared module boundaries
    Check {
        /// Run only the dependency rules
        #[arg(long)]
        dependencies: bool,
        /// Run only the interface rules
        #[arg(long)]
        interfaces: bool,
        /// Also flag declared dependencies that are never imported
        #[arg(long)]
        exact: bool,
        /// Additional exclude patterns
        #[arg(long, value_delimiter = ',', value_name = "PATH")]
        exclude: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Check external package imports against the dependency manifests
    CheckExternal {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Show what a path depends on and who imports it
    Report {
        /// File or directory inside a source root
        path: PathBuf,
        /// Skip the dependency section
        #[arg(long)]
        no_deps: bool,
        /// Skip the usage section
        #[arg(long)]
        no_usages: bool,
    },
    /// Rewrite fence.toml so declared dependencies match real imports
    Sync {
        /// Only add missing dependencies, never remove
        #[arg(long)]
        add: bool,
    },
    /// Run a configured command through the computation cache
    Test {
        /// Name of the entry under [commands] in fence.toml
        #[arg(default_value = "test")]
        action: String,
    },
    /// Remove the computation cache directory
    Clean,
}
