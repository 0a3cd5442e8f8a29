//! # Suggestion and Severity Definitions
//!
//! @title Correction Data Structures
//! @author Ramprasad
//!
//! Defines the proposed corrections produced by the analyzer and their
//! severity classification.

use colored::*;
use serde::{Deserialize, Serialize};

/// Severity level classification for findings.
///
/// Ordered from lowest to highest severity. Checks only produce `Medium` and
/// `High`; the other levels are thresholds accepted by `--severity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Threshold only: keeps every suggestion.
    Info = 0,

    /// Threshold only.
    Low = 1,

    /// Index that is not (fully) checked before use.
    Medium = 2,

    /// Write or read that provably leaves the buffer.
    High = 3,

    /// Threshold only: drops every suggestion.
    Critical = 4,
}

impl Severity {
    /// Parses a severity level from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of severity
    ///
    /// # Returns
    ///
    /// The corresponding `Severity` variant, defaulting to `Info` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }

    /// Returns a colored label for terminal output.
    pub fn colored_label(&self) -> ColoredString {
        match self {
            Severity::Critical => "CRITICAL".white().on_red().bold(),
            Severity::High => "HIGH".black().on_yellow().bold(),
            Severity::Medium => "MEDIUM".white().on_bright_blue().bold(),
            Severity::Low => "LOW".black().on_white().bold(),
            Severity::Info => "INFO".black().on_bright_white(),
        }
    }

    /// Returns a text indicator for the severity.
    pub fn indicator(&self) -> &'static str {
        match self {
            Severity::Critical => "[!!]",
            Severity::High => "[!]",
            Severity::Medium => "[~]",
            Severity::Low => "[-]",
            Severity::Info => "[i]",
        }
    }

    /// Returns a Markdown badge for the severity.
    pub fn markdown_badge(&self) -> &'static str {
        match self {
            Severity::Critical => {
                "![Critical](https://img.shields.io/badge/severity-CRITICAL-red)"
            }
            Severity::High => "![High](https://img.shields.io/badge/severity-HIGH-orange)",
            Severity::Medium => "![Medium](https://img.shields.io/badge/severity-MEDIUM-yellow)",
            Severity::Low => "![Low](https://img.shields.io/badge/severity-LOW-blue)",
            Severity::Info => "![Info](https://img.shields.io/badge/severity-INFO-lightgrey)",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
            Severity::Info => write!(f, "Info"),
        }
    }
}

/// A proposed correction for one finding.
///
/// The patched source is the whole enclosing function with the edit applied;
/// the live tree is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// ID of the check that produced this suggestion (e.g., "B002").
    pub check_id: String,

    pub title: String,

    pub severity: Severity,

    /// CWE (Common Weakness Enumeration) identifier if applicable.
    pub cwe: Option<String>,

    pub function_name: String,

    /// What to change and why.
    pub description: String,

    /// The function rendered with the correction applied.
    #[serde(rename = "code")]
    pub patched_source: String,

    /// Line of the finding counted from the function head (which is line 1).
    #[serde(rename = "line")]
    pub relative_line: u32,

    /// Line of the finding in the file.
    pub source_line: u32,
}

impl Suggestion {
    /// Prints the suggestion to terminal with color formatting.
    ///
    /// # Arguments
    ///
    /// * `index` - The suggestion number for display.
    /// * `file_path` - File the suggestion belongs to.
    pub fn print_terminal(&self, index: usize, file_path: &str) {
        println!();
        println!(
            "{} {} [{}] {}",
            format!("#{}", index).cyan().bold(),
            self.severity.colored_label(),
            self.check_id.yellow(),
            self.title.white().bold()
        );

        println!(
            "   {} {}(), line {} ({}:{})",
            "In function".dimmed(),
            self.function_name.blue(),
            self.relative_line.to_string().cyan(),
            file_path.blue(),
            self.source_line
        );

        for line in self.description.lines() {
            println!("   {}", line.dimmed());
        }

        println!("\n   {}", "Example code with correction:".green());
        for line in self.patched_source.lines() {
            println!("   {}", line.bright_white());
        }

        if let Some(ref cwe) = self.cwe {
            println!("   {} {}", "Reference:".dimmed(), cwe.blue());
        }

        println!("{}", "-".repeat(60).dimmed());
    }
}
