//! # Analysis Module
//!
//! @title Symbolic Buffer-Bounds Engine
//! @author Ramprasad
//!
//! This module contains the symbolic analysis that tracks buffer sizes,
//! index ranges and constraints through each function and proposes fixes.
//!
//! ## Components
//!
//! - **Sizeof Table**: byte widths of primitive C types
//! - **Evaluator**: folds expressions to integers or `Unknown`
//! - **Allocation Extractor**: size node and multiplier of each buffer
//! - **Scope Tracker**: frames for functions, loops, branches and blocks
//! - **Suggestion Generator**: mutate, render, revert
//! - **Analyzer**: the tree walk tying it all together

pub mod allocation;
pub mod analyzer;
pub mod evaluator;
pub mod scope;
pub mod sizeof;
pub mod suggestion;

pub use allocation::{Allocation, SizeRef};
pub use analyzer::{Analysis, BufferOverflowAnalyzer};
pub use evaluator::{Evaluator, Value};
pub use scope::ScopeStack;

use crate::config::AnalyzerConfig;
use crate::parser::SourceUnit;

/// Analyzes a parsed source file.
///
/// # Arguments
///
/// * `unit` - The parsed file; its tree is left as it was parsed
/// * `config` - Analyzer knobs
///
/// # Returns
///
/// Suggestions and diagnostics in source order.
pub fn analyze_unit(unit: &mut SourceUnit, config: &AnalyzerConfig) -> Analysis {
    log::debug!("Analyzing {}", unit.file_path);
    BufferOverflowAnalyzer::new(config.clone()).analyze(&mut unit.tree)
}
