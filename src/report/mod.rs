//! # Report Generation Module
//!
//! @title Scan Report Generator
//! @author Ramprasad
//!
//! Generates scan reports in terminal, JSON and Markdown formats.
//!
//! ## Key Types
//!
//! - [`Report`] - Complete scan report over one or more files
//! - [`FileReport`] - Suggestions, diagnostics or the parse error of one file
//! - [`Suggestion`] - Individual proposed correction
//! - [`Severity`] - Severity classification for suggestions

mod diagnostic;
mod finding;
mod formatter;

pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use finding::{Severity, Suggestion};

use crate::analysis::Analysis;
use anyhow::Result;
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete scan report.
///
/// Contains metadata about the scan, per-file results, and summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,

    /// Results in the order files were scanned.
    pub files: Vec<FileReport>,

    /// Summary statistics by severity.
    pub summary: ReportSummary,
}

/// Result of analyzing one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the scan root.
    pub file_path: String,

    pub suggestions: Vec<Suggestion>,

    pub diagnostics: Vec<Diagnostic>,

    /// Set when the file could not be read or parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn analyzed(file_path: String, analysis: Analysis) -> Self {
        Self {
            file_path,
            suggestions: analysis.suggestions,
            diagnostics: analysis.diagnostics,
            error: None,
        }
    }

    pub fn failed(file_path: String, error: String) -> Self {
        Self {
            file_path,
            suggestions: Vec::new(),
            diagnostics: Vec::new(),
            error: Some(error),
        }
    }
}

/// Metadata about the scan operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Tool version used for the scan.
    pub version: String,

    /// Timestamp when the scan was performed.
    pub timestamp: String,

    /// Path that was scanned.
    pub scanned_path: String,

    pub files_analyzed: usize,

    /// Files that could not be parsed.
    pub files_failed: usize,
}

/// Summary of suggestions by severity level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,

    /// Total count of all suggestions.
    pub total: usize,
}

impl Report {
    /// Creates a new report from per-file results.
    ///
    /// Automatically calculates summary statistics.
    ///
    /// # Arguments
    ///
    /// * `files` - Results of every scanned file
    /// * `scanned_path` - Path that was analyzed
    ///
    /// # Returns
    ///
    /// A fully populated `Report` instance.
    pub fn new(files: Vec<FileReport>, scanned_path: PathBuf) -> Self {
        let summary = ReportSummary::from_suggestions(
            files.iter().flat_map(|file| file.suggestions.iter()),
        );

        let metadata = ReportMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: unix_timestamp(),
            scanned_path: scanned_path.display().to_string(),
            files_analyzed: files.len(),
            files_failed: files.iter().filter(|file| file.error.is_some()).count(),
        };

        Self {
            metadata,
            files,
            summary,
        }
    }

    /// All suggestions with the file they belong to.
    pub fn suggestions(&self) -> impl Iterator<Item = (&str, &Suggestion)> {
        self.files.iter().flat_map(|file| {
            file.suggestions
                .iter()
                .map(move |suggestion| (file.file_path.as_str(), suggestion))
        })
    }

    /// Prints colorized output to the terminal.
    ///
    /// # Arguments
    ///
    /// * `show_diagnostics` - Also print analyzer notes and warnings
    pub fn print_terminal(&self, show_diagnostics: bool) {
        for file in &self.files {
            if let Some(ref error) = file.error {
                println!(
                    "\n{} {}: {}",
                    "[x]".red().bold(),
                    file.file_path.blue(),
                    error.red()
                );
            }
        }

        if show_diagnostics {
            let mut printed_header = false;
            for file in &self.files {
                for diagnostic in &file.diagnostics {
                    if !printed_header {
                        println!("\n{}", "[*] Analyzer Diagnostics:".cyan().bold());
                        printed_header = true;
                    }
                    diagnostic.print_terminal(&file.file_path);
                }
            }
        }

        if self.summary.total == 0 {
            println!("\n{}", "[+] No buffer overflows found.".green().bold());
            return;
        }

        println!("\n{}", "[!] Suggested Corrections:".red().bold());
        println!("{}", "=".repeat(60).cyan());

        for (i, (file_path, suggestion)) in self.suggestions().enumerate() {
            suggestion.print_terminal(i + 1, file_path);
        }
    }

    /// Prints summary statistics to the terminal.
    pub fn print_summary(&self) {
        println!(
            "{}",
            format!(
                "[*] Summary: {} Critical | {} High | {} Medium | {} Low | {} Info",
                self.summary.critical,
                self.summary.high,
                self.summary.medium,
                self.summary.low,
                self.summary.info
            )
            .bold()
        );

        if self.metadata.files_failed > 0 {
            println!(
                "{}",
                format!(
                    "[x] {} of {} file(s) could not be parsed",
                    self.metadata.files_failed, self.metadata.files_analyzed
                )
                .red()
            );
        }

        if self.summary.total == 0 {
            println!("{}", "[+] No issues found.".green().bold());
        } else {
            let message = format!("[!] Total: {} issue(s) found", self.summary.total);
            if self.summary.critical > 0 {
                println!("{}", message.red().bold());
            } else if self.summary.high > 0 {
                println!("{}", message.yellow().bold());
            } else {
                println!("{}", message.blue().bold());
            }
        }
    }

    /// Converts the report to Markdown format.
    pub fn to_markdown(&self) -> Result<String> {
        formatter::to_markdown(self)
    }

    /// Converts the report to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ReportSummary {
    fn from_suggestions<'a>(suggestions: impl Iterator<Item = &'a Suggestion>) -> Self {
        let mut summary = ReportSummary::default();

        for suggestion in suggestions {
            summary.total += 1;
            match suggestion.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }
}

/// Seconds since the Unix epoch, as text.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn suggestion(check_id: &str, severity: Severity) -> Suggestion {
        Suggestion {
            check_id: check_id.to_string(),
            title: "Test Suggestion".to_string(),
            severity,
            cwe: Some("CWE-787".to_string()),
            function_name: "copy".to_string(),
            description: "Increase size of array `buf`".to_string(),
            patched_source: "void copy(void)\n{\n    char buf[11];\n}\n".to_string(),
            relative_line: 3,
            source_line: 7,
        }
    }

    #[test]
    fn test_report_creation() {
        let files = vec![
            FileReport {
                file_path: "a.c".to_string(),
                suggestions: vec![
                    suggestion("B001", Severity::High),
                    suggestion("B004", Severity::Medium),
                ],
                diagnostics: Vec::new(),
                error: None,
            },
            FileReport::failed("b.c".to_string(), "syntax error at line 2, column 5".to_string()),
        ];

        let report = Report::new(files, PathBuf::from("./src"));

        assert_eq!(report.summary.high, 1);
        assert_eq!(report.summary.medium, 1);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.metadata.files_analyzed, 2);
        assert_eq!(report.metadata.files_failed, 1);
        assert_eq!(report.suggestions().count(), 2);
    }

    #[test]
    fn test_json_omits_missing_error() {
        let report = Report::new(
            vec![FileReport::analyzed("a.c".to_string(), Analysis::default())],
            PathBuf::from("a.c"),
        );
        let json = report.to_json().unwrap();
        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"files_analyzed\": 1"));
    }
}
