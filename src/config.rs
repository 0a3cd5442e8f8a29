//! Analyzer settings threaded from the command line.

use serde::{Deserialize, Serialize};

/// Knobs that change what the analyzer reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Report indices with no known value and no (or a partial) bound check.
    pub report_unchecked_indices: bool,

    /// Deepest expression nesting the evaluator folds before giving up.
    pub max_evaluation_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            report_unchecked_indices: true,
            max_evaluation_depth: 64,
        }
    }
}
