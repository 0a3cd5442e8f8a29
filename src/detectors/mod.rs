//! # Access Checker Module
//!
//! @title Buffer Access Checks
//! @author Ramprasad
//!
//! This module provides the checks run at every array subscript and call site
//! the analyzer visits. Checks never raise: a buffer of unknown size, an index
//! that cannot be resolved or an unsupported shape simply produces no finding.
//!
//! ## Architecture
//!
//! All checkers implement the [`AccessChecker`] trait and are run by the
//! [`CheckerRegistry`]. A checker returns [`Proposal`]s; the analyzer turns
//! each proposal into a rendered suggestion.
//!
//! ## Available Checks
//!
//! | ID | Name | Severity |
//! |----|------|----------|
//! | B001 | Constant Index Out of Bounds | High |
//! | B002 | Loop Index Out of Bounds | High |
//! | B003 | Variable Index Out of Bounds | High |
//! | B004 | Unchecked Index | Medium |
//! | B005 | Possibly Negative Index | Medium |
//! | B006 | Possibly Unbounded Index | Medium |
//! | B007 | Copy Length Exceeds Destination | High |
//! | B008 | Copy Source Exceeds Destination | High |
//! | B009 | Unbounded Format Width | High |
//! | B010 | Unbounded Line Read | High |

mod array_access;
mod input_width;
mod memory_copy;

pub use array_access::ArrayAccessChecker;
pub use input_width::InputWidthChecker;
pub use memory_copy::MemoryCopyChecker;

use crate::analysis::scope::{ArrayBinding, ScopeStack};
use crate::analysis::suggestion::Edit;
use crate::analysis::{Evaluator, SizeRef, Value};
use crate::config::AnalyzerConfig;
use crate::parser::{NodeId, SyntaxTree};
use crate::report::{Diagnostic, Severity};

/// Catalog of every finding the checkers can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    ConstantIndex,
    LoopIndex,
    VariableIndex,
    UncheckedIndex,
    NegativeIndex,
    UnboundedIndex,
    CopyLength,
    CopySource,
    FormatWidth,
    UnboundedRead,
}

impl CheckKind {
    pub const ALL: [CheckKind; 10] = [
        CheckKind::ConstantIndex,
        CheckKind::LoopIndex,
        CheckKind::VariableIndex,
        CheckKind::UncheckedIndex,
        CheckKind::NegativeIndex,
        CheckKind::UnboundedIndex,
        CheckKind::CopyLength,
        CheckKind::CopySource,
        CheckKind::FormatWidth,
        CheckKind::UnboundedRead,
    ];

    /// Stable identifier (`B001`..`B010`).
    pub fn id(self) -> &'static str {
        match self {
            CheckKind::ConstantIndex => "B001",
            CheckKind::LoopIndex => "B002",
            CheckKind::VariableIndex => "B003",
            CheckKind::UncheckedIndex => "B004",
            CheckKind::NegativeIndex => "B005",
            CheckKind::UnboundedIndex => "B006",
            CheckKind::CopyLength => "B007",
            CheckKind::CopySource => "B008",
            CheckKind::FormatWidth => "B009",
            CheckKind::UnboundedRead => "B010",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::ConstantIndex => "Constant Index Out of Bounds",
            CheckKind::LoopIndex => "Loop Index Out of Bounds",
            CheckKind::VariableIndex => "Variable Index Out of Bounds",
            CheckKind::UncheckedIndex => "Unchecked Index",
            CheckKind::NegativeIndex => "Possibly Negative Index",
            CheckKind::UnboundedIndex => "Possibly Unbounded Index",
            CheckKind::CopyLength => "Copy Length Exceeds Destination",
            CheckKind::CopySource => "Copy Source Exceeds Destination",
            CheckKind::FormatWidth => "Unbounded Format Width",
            CheckKind::UnboundedRead => "Unbounded Line Read",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CheckKind::ConstantIndex => {
                "A subscript that folds to a constant lies outside the array."
            }
            CheckKind::LoopIndex => {
                "A loop induction variable indexes past the end of the array."
            }
            CheckKind::VariableIndex => {
                "A variable with a known value indexes outside the array."
            }
            CheckKind::UncheckedIndex => {
                "An externally influenced index is used without any bound check."
            }
            CheckKind::NegativeIndex => "An index is only bounded from above and may be negative.",
            CheckKind::UnboundedIndex => {
                "An index is not bounded below the array capacity by its guard."
            }
            CheckKind::CopyLength => {
                "A memory or string copy writes more bytes than the destination holds."
            }
            CheckKind::CopySource => {
                "A string copy source is larger than its destination buffer."
            }
            CheckKind::FormatWidth => {
                "A scanf-family %s or %[ conversion has no width or one that overflows the buffer."
            }
            CheckKind::UnboundedRead => "gets() reads a line without any length limit.",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            CheckKind::UncheckedIndex | CheckKind::NegativeIndex | CheckKind::UnboundedIndex => {
                Severity::Medium
            }
            _ => Severity::High,
        }
    }

    /// CWE reference for the check.
    pub fn cwe(self) -> &'static str {
        match self {
            CheckKind::ConstantIndex | CheckKind::LoopIndex | CheckKind::VariableIndex => {
                "CWE-787"
            }
            CheckKind::UncheckedIndex | CheckKind::NegativeIndex | CheckKind::UnboundedIndex => {
                "CWE-129"
            }
            CheckKind::CopyLength
            | CheckKind::CopySource
            | CheckKind::FormatWidth
            | CheckKind::UnboundedRead => "CWE-120",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id))
    }
}

/// A finding waiting to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub check: CheckKind,
    pub description: String,

    /// Node whose line the suggestion is reported at.
    pub anchor: NodeId,

    /// Edits applied to the rendered copy of the function.
    pub edits: Vec<Edit>,
}

/// Where a checker is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// An `a[i]` expression.
    Subscript(NodeId),

    /// A direct call `f(...)`.
    Call(NodeId),
}

/// Read-only view of the environment at a check site.
pub struct CheckContext<'a> {
    pub tree: &'a SyntaxTree,
    pub scopes: &'a ScopeStack,
    pub config: &'a AnalyzerConfig,

    /// Innermost statement containing the site.
    pub statement: Option<NodeId>,

    notes: Vec<Diagnostic>,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        scopes: &'a ScopeStack,
        config: &'a AnalyzerConfig,
        statement: Option<NodeId>,
    ) -> Self {
        Self {
            tree,
            scopes,
            config,
            statement,
            notes: Vec::new(),
        }
    }

    fn with_evaluator<T>(&mut self, run: impl FnOnce(&mut Evaluator<'a>) -> T) -> T {
        let mut evaluator = Evaluator::new(self.tree, self.scopes, self.config.max_evaluation_depth);
        let result = run(&mut evaluator);
        self.notes.extend(evaluator.into_notes());
        result
    }

    pub fn evaluate(&mut self, id: NodeId) -> Value {
        self.with_evaluator(|evaluator| evaluator.evaluate(id))
    }

    pub fn array_bytes(&mut self, binding: &ArrayBinding) -> Value {
        self.with_evaluator(|evaluator| evaluator.array_bytes(binding))
    }

    pub fn array_elements(&mut self, binding: &ArrayBinding) -> Value {
        self.with_evaluator(|evaluator| evaluator.array_elements(binding))
    }

    /// Tracked buffer named by `id` whose size is known.
    pub fn tracked_array(&self, id: NodeId) -> Option<&'a ArrayBinding> {
        let name = self.tree.ident_name(id)?;
        let scopes: &'a ScopeStack = self.scopes;
        scopes
            .array(name)
            .filter(|binding| binding.size != SizeRef::Unknown)
    }

    pub fn warn(&mut self, id: NodeId, message: String) {
        log::debug!("line {}: {}", self.tree.span(id).line, message);
        self.notes
            .push(Diagnostic::warning(self.tree.span(id).line, message));
    }

    pub fn into_notes(self) -> Vec<Diagnostic> {
        self.notes
    }
}

/// Edit that grows a buffer so it holds at least `needed_bytes`.
///
/// Returns the edit and the node the suggestion is anchored at, or `None`
/// when the size is unknown or the new size does not fit in an `i64`.
pub fn grow_edit(binding: &ArrayBinding, needed_bytes: i64) -> Option<(Edit, NodeId)> {
    let multiplier = binding.multiplier.max(1);
    let value = needed_bytes.checked_add(multiplier - 1)? / multiplier;
    match binding.size {
        SizeRef::Node(size) => Some((
            Edit::Literal {
                target: size,
                value,
            },
            size,
        )),
        SizeRef::Implicit { decl, .. } => Some((Edit::Dimension { decl, value }, decl)),
        SizeRef::Unknown => None,
    }
}

/// Trait for the checks run at subscript and call sites.
///
/// # Example Implementation
///
/// ```rust,ignore
/// pub struct MyChecker;
///
/// impl AccessChecker for MyChecker {
///     fn name(&self) -> &'static str { "My Checker" }
///     fn checks(&self) -> &'static [CheckKind] { &[CheckKind::ConstantIndex] }
///     fn check(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal> {
///         Vec::new()
///     }
/// }
/// ```
pub trait AccessChecker: Send + Sync {
    /// Human-readable name of the checker.
    fn name(&self) -> &'static str;

    /// Checks this checker may report.
    fn checks(&self) -> &'static [CheckKind];

    /// Inspects one site.
    ///
    /// # Arguments
    ///
    /// * `site` - The subscript or call being visited
    /// * `context` - Environment at the site
    ///
    /// # Returns
    ///
    /// Proposals in the order they should be reported.
    fn check(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal>;
}

/// Registry containing all access checkers.
pub struct CheckerRegistry {
    checkers: Vec<Box<dyn AccessChecker>>,
}

impl CheckerRegistry {
    /// Creates a registry with every built-in checker.
    pub fn new() -> Self {
        let checkers: Vec<Box<dyn AccessChecker>> = vec![
            Box::new(ArrayAccessChecker),
            Box::new(MemoryCopyChecker),
            Box::new(InputWidthChecker),
        ];

        Self { checkers }
    }

    pub fn checkers(&self) -> &[Box<dyn AccessChecker>] {
        &self.checkers
    }

    /// Runs every checker against a site, in registration order.
    pub fn run(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal> {
        self.checkers
            .iter()
            .flat_map(|checker| checker.check(site, context))
            .collect()
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ids_unique() {
        let mut ids: Vec<_> = CheckKind::ALL.iter().map(|kind| kind.id()).collect();
        let len_before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len_before, "Check IDs must be unique");
    }

    #[test]
    fn test_every_check_is_covered_by_a_checker() {
        let registry = CheckerRegistry::new();
        for kind in CheckKind::ALL {
            assert!(
                registry
                    .checkers()
                    .iter()
                    .any(|checker| checker.checks().contains(&kind)),
                "{} has no checker",
                kind.id()
            );
        }
    }

    #[test]
    fn test_from_id_is_case_insensitive() {
        assert_eq!(CheckKind::from_id("b004"), Some(CheckKind::UncheckedIndex));
        assert_eq!(CheckKind::from_id("V001"), None);
    }

    #[test]
    fn test_grow_edit_rounds_up_to_multiplier() {
        let mut tree = SyntaxTree::new();
        let size = tree.push(crate::parser::NodeKind::int(2), crate::parser::Span::default());
        let binding = ArrayBinding {
            name: "words".to_string(),
            size: SizeRef::Node(size),
            multiplier: 4,
            element_width: 4,
        };
        let (edit, anchor) = grow_edit(&binding, 10).unwrap();
        assert_eq!(edit, Edit::Literal { target: size, value: 3 });
        assert_eq!(anchor, size);
    }

    #[test]
    fn test_grow_edit_rejects_sizes_past_i64() {
        let mut tree = SyntaxTree::new();
        let size = tree.push(crate::parser::NodeKind::int(4), crate::parser::Span::default());
        let binding = ArrayBinding {
            name: "p".to_string(),
            size: SizeRef::Node(size),
            multiplier: 4,
            element_width: 4,
        };
        assert!(grow_edit(&binding, i64::MAX - 1).is_none());
        assert!(grow_edit(&binding, 16).is_some());
    }
}
