// src/cli/dispatch.rs
//! Maps parsed commands onto the library and exit codes.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::args::{Cli, Commands};
use crate::cache::ComputationCache;
use crate::checker::{self, external, CheckOptions};
use crate::diagnostics::Diagnostic;
use crate::exit::FenceExit;
use crate::output::{self, OutputFormat};
use crate::report::{self, ReportOptions};
use crate::{config, sync, tasks};

pub fn execute(cli: Cli) -> Result<FenceExit> {
    let project_root = resolve_project_root(cli.project_root)?;
    let (project_config, config_warnings) = config::load(&project_root)?;

    match cli.command {
        Commands::Check {
            dependencies,
            interfaces,
            exact,
            exclude,
            output,
        } => {
            // With no explicit selection, run everything.
            let (dependencies, interfaces) = if !dependencies && !interfaces {
                (true, true)
            } else {
                (dependencies, interfaces)
            };
            let options = CheckOptions {
                dependencies,
                interfaces,
                exact,
                extra_excludes: exclude,
            };

            let diagnostics = checker::run(&project_root, &project_config, &options)?;
            finish(config_warnings, diagnostics, output)
        }
        Commands::CheckExternal { output } => {
            let diagnostics = external::run_check_external(&project_root, &project_config)?;
            finish(config_warnings, diagnostics, output)
        }
        Commands::Report {
            path,
            no_deps,
            no_usages,
        } => {
            let text = report::generate(
                &project_root,
                &project_config,
                &path,
                ReportOptions {
                    skip_dependencies: no_deps,
                    skip_usages: no_usages,
                },
            )?;
            print!("{text}");
            Ok(FenceExit::Success)
        }
        Commands::Sync { add } => {
            sync::sync_project(&project_root, &project_config, add)?;
            println!("Synced fence.toml with project imports.");
            Ok(FenceExit::Success)
        }
        Commands::Test { action } => {
            let code = tasks::run(&project_root, &project_config, &action)?;
            // The contract is to exit with the underlying command's code.
            std::process::exit(code);
        }
        Commands::Clean => {
            ComputationCache::open(&project_root).clean()?;
            println!("Removed the computation cache.");
            Ok(FenceExit::Success)
        }
    }
}

fn resolve_project_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    let cwd = std::env::current_dir().context("Could not determine the working directory")?;
    config::find_project_root(&cwd).with_context(|| {
        format!(
            "No {} found in '{}' or any parent directory.",
            config::CONFIG_FILE,
            cwd.display()
        )
    })
}

fn finish(
    config_warnings: Vec<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
    format: OutputFormat,
) -> Result<FenceExit> {
    let mut all = config_warnings;
    all.extend(diagnostics);

    let has_errors = all.iter().any(Diagnostic::is_error);
    output::print_diagnostics(&all, format);

    if has_errors {
        Ok(FenceExit::CheckFailed)
    } else {
        Ok(FenceExit::Success)
    }
}
