//! # Diagnostics
//!
//! @title Structured Analysis Notes
//! @author Ramprasad
//!
//! Leveled records describing what the analyzer could not reason about
//! (unmapped `sizeof` types, unsupported conditions, reused loop variables).
//! They are returned next to the suggestions instead of being printed while
//! the traversal runs.

use colored::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Conservative fallback taken, analysis continued.
    Note,

    /// A construct was skipped; findings may be missing.
    Warning,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Note => write!(f, "note"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,

    /// Source line (1-indexed) of the construct.
    pub line: u32,

    /// Enclosing function, when known.
    pub function: Option<String>,

    pub message: String,
}

impl Diagnostic {
    pub fn note(line: u32, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Note,
            line,
            function: None,
            message: message.into(),
        }
    }

    pub fn warning(line: u32, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            line,
            function: None,
            message: message.into(),
        }
    }

    /// Attaches the enclosing function name if none is set yet.
    pub fn in_function(mut self, function: &str) -> Self {
        self.function.get_or_insert_with(|| function.to_string());
        self
    }

    pub fn print_terminal(&self, file_path: &str) {
        let label = match self.level {
            DiagnosticLevel::Note => "NOTE".cyan().bold(),
            DiagnosticLevel::Warning => "WARN".yellow().bold(),
        };
        let location = match &self.function {
            Some(function) => format!("{}:{} in {}()", file_path, self.line, function),
            None => format!("{}:{}", file_path, self.line),
        };
        println!("   {} {} {}", label, location.dimmed(), self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_function_keeps_existing_name() {
        let diagnostic = Diagnostic::note(3, "sizeof(struct x) defaults to 1").in_function("f");
        assert_eq!(diagnostic.function.as_deref(), Some("f"));
        let diagnostic = diagnostic.in_function("g");
        assert_eq!(diagnostic.function.as_deref(), Some("f"));
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&Diagnostic::warning(1, "skipped")).unwrap();
        assert!(json.contains("\"level\":\"warning\""));
    }
}
