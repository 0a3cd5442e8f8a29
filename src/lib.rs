//! # Bound-Sentinel Library
//!
//! @title Bound-Sentinel - Symbolic Buffer-Overflow Analyzer
//! @author Ramprasad
//!
//! A static analysis library that finds out-of-bounds writes and unsafe
//! memory copies in C (CWE-787 and relatives) and proposes corrected code.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and argument parsing
//! - [`parser`] - C front end, syntax tree arena and printer
//! - [`analysis`] - Symbolic evaluation, scope tracking and the analyzer
//! - [`detectors`] - Access checks run at subscripts and calls
//! - [`report`] - Report generation in multiple formats
//! - [`config`] - Analyzer settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use bound_sentinel::{analyze_unit, parse_source, AnalyzerConfig};
//!
//! let mut unit = parse_source("demo.c", source)?;
//! let analysis = analyze_unit(&mut unit, &AnalyzerConfig::default());
//! for suggestion in &analysis.suggestions {
//!     println!("{}(): {}", suggestion.function_name, suggestion.description);
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detectors;
pub mod parser;
pub mod report;

pub use analysis::{analyze_unit, Analysis, BufferOverflowAnalyzer};
pub use cli::Cli;
pub use config::AnalyzerConfig;
pub use detectors::{CheckKind, CheckerRegistry};
pub use parser::{parse_file, parse_source, ParseError, SourceUnit};
pub use report::{Diagnostic, Report, Severity, Suggestion};
