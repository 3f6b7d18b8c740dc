// src/output.rs
//! Console rendering of diagnostics.

use clap::ValueEnum;
use colored::Colorize;

use crate::diagnostics::{self, Diagnostic, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Prints diagnostics one per line as `<severity> <file>:<line>: <message>`
/// with a trailing summary, or as stable JSON.
pub fn print_diagnostics(diagnostics: &[Diagnostic], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", diagnostics::to_json_string(diagnostics)),
        OutputFormat::Text => print_text(diagnostics),
    }
}

fn print_text(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        println!("{}", render(diagnostic));
    }
    print_summary(diagnostics);
}

fn render(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "Error".red().bold().to_string(),
        Severity::Warning => "Warning".yellow().to_string(),
    };

    match (&diagnostic.file_path, diagnostic.line_number) {
        (Some(file), Some(line)) => {
            format!("{severity} {}:{line}: {}", file.display(), diagnostic.message())
        }
        _ => format!("{severity}: {}", diagnostic.message()),
    }
}

fn print_summary(diagnostics: &[Diagnostic]) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.iter().filter(|d| d.is_warning()).count();

    if errors == 0 && warnings == 0 {
        println!("{} All module boundaries are intact.", "OK".green().bold());
        return;
    }

    let mut parts = Vec::new();
    if errors > 0 {
        parts.push(format!("{errors} {}", pluralize("error", errors)));
    }
    if warnings > 0 {
        parts.push(format!("{warnings} {}", pluralize("warning", warnings)));
    }
    let summary = format!("Found {}.", parts.join(", "));

    if errors > 0 {
        println!("{}", summary.red().bold());
    } else {
        println!("{}", summary.yellow());
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
