//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! This module defines the command-line interface for Bound-Sentinel using
//! the `clap` derive macros for declarative argument parsing.
//!
//! ## Commands
//!
//! - `scan` - Analyze C sources for buffer overflows
//! - `list` - Display the available checks
//! - `version` - Show version information

use crate::config::AnalyzerConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bound-Sentinel command-line interface.
///
/// A symbolic buffer-overflow analyzer for C that proposes corrected code
/// for every out-of-bounds access it can prove or cannot rule out.
#[derive(Parser, Debug)]
#[command(name = "bound-sentinel")]
#[command(author = "RamprasadGoud")]
#[command(version)]
#[command(about = "Symbolic buffer-overflow analyzer for C with suggested corrections")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the Bound-Sentinel CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan C source files for out-of-bounds writes and unsafe copies.
    ///
    /// Every function is analyzed in isolation; parameters are treated as
    /// values of unknown range.
    Scan(ScanArgs),

    /// List all available checks.
    ///
    /// Displays the ID, name, severity, CWE and description of each check.
    List,

    /// Print version information.
    Version,
}

/// Output format for the scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colorized console output.
    Terminal,

    /// Machine-readable JSON.
    Json,

    /// Human-readable Markdown report.
    Markdown,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path to the file or directory to scan.
    ///
    /// If a directory is specified, all `.c` files within it will be analyzed.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Scan directories recursively.
    #[arg(short, long)]
    pub recursive: bool,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Write the JSON or Markdown report to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Minimum severity level to include in results.
    ///
    /// Valid values: critical, high, medium, low, info
    #[arg(short, long)]
    pub severity: Option<String>,

    /// Exclude specific checks from the results.
    ///
    /// Comma-separated list of check IDs to skip.
    /// Example: --exclude B004,B005
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Include only specific checks in the results.
    ///
    /// Comma-separated list of check IDs to keep.
    /// Example: --only B001,B002,B003
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip files whose path (relative to PATH) matches this glob.
    ///
    /// May be given several times. Example: --ignore 'vendor/**'
    #[arg(short, long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Do not report indices that are used without a bound check.
    #[arg(long)]
    pub no_unchecked_indices: bool,

    /// Deepest expression nesting the evaluator folds.
    #[arg(long, default_value_t = 64)]
    pub max_depth: usize,

    /// Print analyzer notes and warnings in terminal output.
    #[arg(short, long)]
    pub diagnostics: bool,
}

impl ScanArgs {
    /// Analyzer settings selected by the flags.
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            report_unchecked_indices: !self.no_unchecked_indices,
            max_evaluation_depth: self.max_depth,
        }
    }
}
