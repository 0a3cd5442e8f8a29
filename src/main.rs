//! # Bound-Sentinel CLI Entry Point
//!
//! @title Bound-Sentinel CLI
//! @author Ramprasad
//!
//! This module provides the main entry point for the Bound-Sentinel
//! command-line buffer-overflow analyzer.

use anyhow::{Context, Result};
use bound_sentinel::cli::{Commands, OutputFormat, ScanArgs};
use bound_sentinel::report::FileReport;
use bound_sentinel::{analyze_unit, parse_file, AnalyzerConfig, CheckKind, CheckerRegistry};
use bound_sentinel::{Cli, Report, Severity};
use clap::Parser;
use colored::*;
use glob::Pattern;
use std::path::{Path, PathBuf};

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
  ____                        _    ____            _   _            _
 | __ )  ___  _   _ _ __   __| |  / ___|  ___ _ __ | |_(_)_ __   ___| |
 |  _ \ / _ \| | | | '_ \ / _` |  \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
 | |_) | (_) | |_| | | | | (_| |   ___) |  __/ | | | |_| | | | |  __/ |
 |____/ \___/ \__,_|_| |_|\__,_|  |____/ \___|_| |_|\__|_|_| |_|\___|_|

           Symbolic Buffer-Overflow Analyzer for C (CWE-787)
"#;

/// Application entry point.
///
/// Initializes the logging system, parses command-line arguments, and
/// dispatches to the appropriate command handler. The banner is skipped
/// when a machine-readable report goes to stdout.
///
/// # Returns
///
/// Returns `Ok(())` on successful execution, or an error if any operation fails.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            if writes_to_console(&args) {
                println!("{}", BANNER.cyan().bold());
            }
            run_scan(args)?;
        }
        Commands::List => {
            println!("{}", BANNER.cyan().bold());
            list_checks();
        }
        Commands::Version => {
            println!("bound-sentinel v{}", env!("CARGO_PKG_VERSION"));
            println!("Symbolic buffer-overflow analyzer for C");
        }
    }

    Ok(())
}

/// Whether progress and status lines may be printed to stdout.
fn writes_to_console(args: &ScanArgs) -> bool {
    args.format == OutputFormat::Terminal || args.output.is_some()
}

/// Executes the scan command.
///
/// Analyzes the target path, filters the suggestions, and emits the report
/// in the requested format.
///
/// # Arguments
///
/// * `args` - Parsed `scan` arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if scanning or report output fails.
fn run_scan(args: ScanArgs) -> Result<()> {
    let console = writes_to_console(&args);
    if console {
        println!("{} {}", "[*] Scanning:".green().bold(), args.path.display());
    }

    let ignore = args
        .ignore
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).with_context(|| format!("Invalid ignore pattern '{}'", pattern))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = args.analyzer_config();
    let mut files = perform_scan(&args.path, args.recursive, &ignore, &config, console)?;

    warn_unknown_ids(&args.exclude);
    warn_unknown_ids(&args.only);

    let min_severity = args.severity.as_deref().map(Severity::from_str);
    for file in &mut files {
        file.suggestions.retain(|suggestion| {
            if let Some(min) = min_severity {
                if suggestion.severity < min {
                    return false;
                }
            }
            if matches_any(&args.exclude, &suggestion.check_id) {
                return false;
            }
            args.only.is_empty() || matches_any(&args.only, &suggestion.check_id)
        });
    }

    let report = Report::new(files, args.path.clone());

    match args.format {
        OutputFormat::Json => emit(report.to_json()?, args.output.as_deref())?,
        OutputFormat::Markdown => emit(report.to_markdown()?, args.output.as_deref())?,
        OutputFormat::Terminal => report.print_terminal(args.diagnostics),
    }

    if console {
        println!("\n{}", "=".repeat(60).cyan());
        report.print_summary();
    }

    Ok(())
}

/// Case-insensitive membership test for check IDs.
fn matches_any(ids: &[String], check_id: &str) -> bool {
    ids.iter().any(|id| id.eq_ignore_ascii_case(check_id))
}

fn warn_unknown_ids(ids: &[String]) {
    for id in ids {
        if CheckKind::from_id(id).is_none() {
            log::warn!("Unknown check ID '{}', see `bound-sentinel list`", id);
        }
    }
}

/// Writes a rendered report to a file or to stdout.
fn emit(rendered: String, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} {}",
                "[+] Report written to:".green().bold(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Performs the analysis over every C file under a path.
///
/// Files that fail to read or parse are kept in the result with their
/// error so the rest of the scan continues.
///
/// # Arguments
///
/// * `path` - File or directory to scan
/// * `recursive` - Descend into subdirectories
/// * `ignore` - Globs matched against paths relative to `path`
/// * `config` - Analyzer settings
/// * `show_progress` - Draw the progress bar
///
/// # Returns
///
/// One [`FileReport`] per analyzed file.
fn perform_scan(
    path: &Path,
    recursive: bool,
    ignore: &[Pattern],
    config: &AnalyzerConfig,
    show_progress: bool,
) -> Result<Vec<FileReport>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        collect_c_files(path, recursive, ignore)
    };

    log::info!("Found {} C file(s) to analyze", files.len());

    let pb = if show_progress {
        indicatif::ProgressBar::new(files.len() as u64)
    } else {
        indicatif::ProgressBar::hidden()
    };
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut reports = Vec::with_capacity(files.len());

    for file in &files {
        let display = display_path(path, file);
        pb.set_message(format!("Analyzing {}", display));

        let report = match parse_file(file) {
            Ok(mut unit) => FileReport::analyzed(display, analyze_unit(&mut unit, config)),
            Err(e) => {
                log::warn!("Failed to parse {}: {:#}", display, e);
                FileReport::failed(display, format!("{:#}", e))
            }
        };
        reports.push(report);

        pb.inc(1);
    }

    pb.finish_and_clear();

    Ok(reports)
}

/// Collects `.c` files under a directory in a stable order.
fn collect_c_files(dir: &Path, recursive: bool, ignore: &[Pattern]) -> Vec<PathBuf> {
    let mut walker = walkdir::WalkDir::new(dir).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "c"))
        .filter(|e| {
            let relative = pathdiff::diff_paths(e.path(), dir).unwrap_or_else(|| e.path().into());
            let skipped = ignore.iter().any(|pattern| pattern.matches_path(&relative));
            if skipped {
                log::debug!("Ignoring {}", relative.display());
            }
            !skipped
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Path shown in reports: relative to the scan root for directories.
fn display_path(root: &Path, file: &Path) -> String {
    if root.is_file() {
        return file.display().to_string();
    }
    pathdiff::diff_paths(file, root)
        .unwrap_or_else(|| file.to_path_buf())
        .display()
        .to_string()
}

/// Lists all available checks grouped by checker.
fn list_checks() {
    println!("{}", "[*] Available Buffer-Overflow Checks:".green().bold());

    let registry = CheckerRegistry::new();
    for checker in registry.checkers() {
        println!("\n  {}", checker.name().white().bold());
        for check in checker.checks() {
            println!(
                "    {} - {} ({}, {})",
                check.id().cyan().bold(),
                check.name(),
                check.severity().to_string().yellow(),
                check.cwe().blue()
            );
            println!("          {}", check.description().dimmed());
        }
    }

    println!("\n  {} check(s) available", CheckKind::ALL.len());
}
