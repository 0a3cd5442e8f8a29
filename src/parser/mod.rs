//! # Parser Module
//!
//! @title C Source Parser
//! @author Ramprasad
//!
//! This module turns C source text into the arena-backed syntax tree consumed
//! by the analyzer, and renders subtrees back to source text.
//!
//! ## Submodules
//!
//! - [`syntax`] - Node kinds, the [`SyntaxTree`] arena and the [`Patch`] edit guard
//! - [`printer`] - Renders any subtree back to compilable C
//! - `lowering` - tree-sitter front end producing [`SyntaxTree`]
//!
//! ## Key Types
//!
//! - [`SourceUnit`] - A parsed translation unit together with its source text
//! - [`ParseError`] - Pre-analysis failure reported before the core runs

mod lowering;
pub mod printer;
pub mod syntax;

pub use syntax::*;

use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;

/// Errors raised at the parse boundary.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bundled C grammar could not be loaded.
    #[error("failed to load the C grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// tree-sitter returned no tree.
    #[error("the parser was aborted before producing a tree")]
    Aborted,

    /// The source contains a syntax error.
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: u32, column: u32 },
}

/// A parsed C translation unit.
///
/// # Example
///
/// ```rust,ignore
/// let unit = parse_source("overflow.c", source_code)?;
/// println!("{} nodes", unit.tree.len());
/// ```
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path identifier for the source file.
    pub file_path: String,

    /// Raw source code content.
    pub source: String,

    /// Lowered syntax tree.
    pub tree: SyntaxTree,
}

impl SourceUnit {
    /// Retrieves a specific line from the source code.
    ///
    /// # Arguments
    ///
    /// * `line` - Line number (1-indexed)
    ///
    /// # Returns
    ///
    /// The content of the specified line, or `None` if out of bounds.
    pub fn source_line(&self, line: usize) -> Option<&str> {
        self.source.lines().nth(line.checked_sub(1)?)
    }
}

/// Parses C source code into a [`SourceUnit`].
///
/// # Arguments
///
/// * `file_path` - Path identifier for the source file
/// * `source` - Raw C source code
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] if the source does not parse cleanly.
pub fn parse_source(file_path: &str, source: String) -> Result<SourceUnit, ParseError> {
    let tree = lowering::parse_c(&source)?;
    log::debug!("Lowered {} into {} nodes", file_path, tree.len());

    Ok(SourceUnit {
        file_path: file_path.to_string(),
        source,
        tree,
    })
}

/// Reads and parses a C file from disk.
///
/// # Arguments
///
/// * `path` - Path to the C source file
///
/// # Returns
///
/// Returns a [`SourceUnit`] on success, or an error if the file cannot be
/// read or parsed.
pub fn parse_file(path: &Path) -> Result<SourceUnit> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_source(&path.to_string_lossy(), source)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_keeps_text() {
        let unit = parse_source("a.c", "int main(void)\n{\n    return 0;\n}\n".to_string()).unwrap();
        assert_eq!(unit.file_path, "a.c");
        assert_eq!(unit.source_line(3), Some("    return 0;"));
        assert_eq!(unit.source_line(0), None);
        assert!(unit.tree.root().is_some());
    }

    #[test]
    fn test_parse_error_message() {
        let err = parse_source("bad.c", "int main( {".to_string()).unwrap_err();
        assert!(err.to_string().starts_with("syntax error at line 1"));
    }
}
