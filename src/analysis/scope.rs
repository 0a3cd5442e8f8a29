//! # Scope Tracker
//!
//! @title Scope Stack with Parent Links
//! @author Ramprasad
//!
//! Holds the live environment of the function being analyzed: tracked arrays,
//! scalar variables, loop ranges and conditional constraints. Frames are
//! pushed when the traversal enters a function, loop, branch or block and
//! popped when it leaves, so nothing bound inside a frame outlives it.
//!
//! ## Lookup Rules
//!
//! - Bindings resolve innermost frame first; a frame that binds a name as a
//!   scalar hides an outer array of the same name and vice versa.
//! - Constraints resolve per bound: the innermost lower bound and the
//!   innermost upper bound may come from different frames.
//! - Object-like `#define` constants live outside the frames and survive
//!   [`ScopeStack::enter_function`]; any binding of the same name hides them.

use super::allocation::SizeRef;
use crate::parser::{BinaryOp, NodeId};
use std::collections::HashMap;

/// Last value assigned to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarValue {
    /// The expression most recently assigned.
    Expr(NodeId),

    /// Not statically known (parameters, unmodeled writes).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub value: VarValue,

    /// Byte width of the declared type, when known.
    pub width: Option<i64>,
}

/// A tracked buffer: stack array, heap block or alias of either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBinding {
    pub name: String,

    /// Where the element count lives in the tree.
    pub size: SizeRef,

    /// Bytes contributed by each unit counted by `size`.
    pub multiplier: i64,

    /// Byte width of one element as the program indexes it.
    pub element_width: i64,
}

/// How a loop bound is rewritten when a suggestion shrinks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundRewrite {
    /// Replace the whole comparison with `var < N` (or its mirror).
    Comparison { condition: NodeId, var_on_left: bool },

    /// Replace the bound expression itself with a literal.
    Value,
}

/// Range of an induction variable while inside its loop body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopRange {
    pub induction_var: String,
    pub start: Option<NodeId>,

    /// Expression giving the largest (or one past the largest) index reached.
    pub end: NodeId,

    /// `end` itself is reached (`<=`, `>=`, descending start).
    pub upper_inclusive: bool,

    pub rewrite: BoundRewrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEntry {
    Range(LoopRange),

    /// The name is reused by a nested loop; range checks are disabled.
    Unsupported,
}

/// Inclusive bounds derived from an enclosing `if` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableConstraint {
    pub name: String,
    pub lower: Option<i64>,
    pub upper: Option<i64>,
}

impl VariableConstraint {
    /// Bounds implied by `name <op> value` holding.
    pub fn from_comparison(name: &str, op: BinaryOp, value: i64) -> Option<Self> {
        let (lower, upper) = match op {
            BinaryOp::Lt => (None, Some(value.checked_sub(1)?)),
            BinaryOp::Le => (None, Some(value)),
            BinaryOp::Gt => (Some(value.checked_add(1)?), None),
            BinaryOp::Ge => (Some(value), None),
            BinaryOp::Eq => (Some(value), Some(value)),
            _ => return None,
        };
        Some(Self {
            name: name.to_string(),
            lower,
            upper,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Function,
    Loop,
    Branch,
    Block,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    parent: Option<usize>,
    arrays: HashMap<String, ArrayBinding>,
    variables: HashMap<String, VariableBinding>,
    loops: HashMap<String, LoopEntry>,
    constraints: HashMap<String, VariableConstraint>,
}

impl Frame {
    fn new(kind: FrameKind, parent: Option<usize>) -> Self {
        Self {
            kind,
            parent,
            arrays: HashMap::new(),
            variables: HashMap::new(),
            loops: HashMap::new(),
            constraints: HashMap::new(),
        }
    }

    fn binds(&self, name: &str) -> bool {
        self.arrays.contains_key(name) || self.variables.contains_key(name)
    }
}

/// Arena of frames linked to their parents.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    current: Option<usize>,
    constants: HashMap<String, i64>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every frame and opens a fresh function frame.
    pub fn enter_function(&mut self) {
        self.frames.clear();
        self.frames.push(Frame::new(FrameKind::Function, None));
        self.current = Some(0);
    }

    /// Records a file-level `#define NAME value`.
    pub fn define_constant(&mut self, name: &str, value: i64) {
        self.constants.insert(name.to_string(), value);
    }

    /// Value of a `#define` constant not hidden by a binding.
    pub fn constant(&self, name: &str) -> Option<i64> {
        if self.is_bound(name) {
            return None;
        }
        self.constants.get(name).copied()
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame::new(kind, self.current));
        self.current = Some(self.frames.len() - 1);
    }

    /// Closes the innermost frame.
    pub fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.current = frame.parent;
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_kind(&self) -> Option<FrameKind> {
        self.current.map(|index| self.frames[index].kind)
    }

    /// Frames from the innermost outwards.
    fn chain(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.current.map(|index| &self.frames[index]), |frame| {
            frame.parent.map(|index| &self.frames[index])
        })
    }

    fn current_frame(&mut self) -> Option<&mut Frame> {
        let index = self.current?;
        self.frames.get_mut(index)
    }

    /// Index of the innermost frame binding `name`, else the function frame.
    fn owner_of(&self, name: &str) -> Option<usize> {
        let mut cursor = self.current;
        while let Some(index) = cursor {
            if self.frames[index].binds(name) {
                return Some(index);
            }
            cursor = self.frames[index].parent;
        }
        (!self.frames.is_empty()).then_some(0)
    }

    pub fn declare_array(&mut self, binding: ArrayBinding) {
        if let Some(frame) = self.current_frame() {
            frame.arrays.insert(binding.name.clone(), binding);
        }
    }

    pub fn declare_variable(&mut self, name: &str, value: VarValue, width: Option<i64>) {
        if let Some(frame) = self.current_frame() {
            frame.variables.insert(
                name.to_string(),
                VariableBinding {
                    name: name.to_string(),
                    value,
                    width,
                },
            );
        }
    }

    /// Rebinds an array in the frame that owns the name.
    pub fn assign_array(&mut self, binding: ArrayBinding) {
        if let Some(index) = self.owner_of(&binding.name) {
            self.frames[index].arrays.insert(binding.name.clone(), binding);
        }
    }

    /// Records a new value for a scalar in the frame that owns the name.
    pub fn assign_variable(&mut self, name: &str, value: VarValue) {
        if let Some(index) = self.owner_of(name) {
            let frame = &mut self.frames[index];
            let width = frame.variables.get(name).and_then(|binding| binding.width);
            frame.variables.insert(
                name.to_string(),
                VariableBinding {
                    name: name.to_string(),
                    value,
                    width,
                },
            );
        }
    }

    pub fn array(&self, name: &str) -> Option<&ArrayBinding> {
        self.chain()
            .find(|frame| frame.binds(name))
            .and_then(|frame| frame.arrays.get(name))
    }

    pub fn variable(&self, name: &str) -> Option<&VariableBinding> {
        self.chain()
            .find(|frame| frame.binds(name))
            .and_then(|frame| frame.variables.get(name))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.chain().any(|frame| frame.binds(name))
    }

    pub fn set_loop(&mut self, name: &str, entry: LoopEntry) {
        if let Some(frame) = self.current_frame() {
            frame.loops.insert(name.to_string(), entry);
        }
    }

    pub fn loop_entry(&self, name: &str) -> Option<&LoopEntry> {
        self.chain().find_map(|frame| frame.loops.get(name))
    }

    /// Narrows the constraint on a name in the innermost frame.
    pub fn constrain(&mut self, constraint: VariableConstraint) {
        let Some(frame) = self.current_frame() else {
            return;
        };
        let entry = frame
            .constraints
            .entry(constraint.name.clone())
            .or_insert_with(|| VariableConstraint {
                name: constraint.name.clone(),
                lower: None,
                upper: None,
            });
        if constraint.lower.is_some() {
            entry.lower = constraint.lower;
        }
        if constraint.upper.is_some() {
            entry.upper = constraint.upper;
        }
    }

    /// Effective constraint on a name, or `None` when no frame constrains it.
    pub fn constraint(&self, name: &str) -> Option<VariableConstraint> {
        let mut found = false;
        let mut lower = None;
        let mut upper = None;
        for frame in self.chain() {
            if let Some(constraint) = frame.constraints.get(name) {
                found = true;
                lower = lower.or(constraint.lower);
                upper = upper.or(constraint.upper);
            }
        }
        found.then(|| VariableConstraint {
            name: name.to_string(),
            lower,
            upper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{NodeKind, Span, SyntaxTree};

    fn node() -> NodeId {
        let mut tree = SyntaxTree::new();
        tree.push(NodeKind::int(10), Span::default())
    }

    fn array(name: &str, size: NodeId) -> ArrayBinding {
        ArrayBinding {
            name: name.to_string(),
            size: SizeRef::Node(size),
            multiplier: 1,
            element_width: 1,
        }
    }

    #[test]
    fn test_inner_bindings_disappear_on_pop() {
        let size = node();
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.push(FrameKind::Block);
        scopes.declare_array(array("tmp", size));
        assert!(scopes.array("tmp").is_some());
        scopes.pop();
        assert!(scopes.array("tmp").is_none());
        assert_eq!(scopes.current_kind(), Some(FrameKind::Function));
    }

    #[test]
    fn test_assignment_updates_owning_frame() {
        let value = node();
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare_variable("n", VarValue::Unknown, Some(4));
        scopes.push(FrameKind::Branch);
        scopes.assign_variable("n", VarValue::Expr(value));
        scopes.pop();
        let binding = scopes.variable("n").unwrap();
        assert_eq!(binding.value, VarValue::Expr(value));
        assert_eq!(binding.width, Some(4));
    }

    #[test]
    fn test_scalar_shadows_outer_array() {
        let size = node();
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare_array(array("buf", size));
        scopes.push(FrameKind::Block);
        scopes.declare_variable("buf", VarValue::Unknown, None);
        assert!(scopes.array("buf").is_none());
        scopes.pop();
        assert!(scopes.array("buf").is_some());
    }

    #[test]
    fn test_constraints_resolve_per_bound() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.push(FrameKind::Branch);
        scopes.constrain(VariableConstraint::from_comparison("i", BinaryOp::Ge, 0).unwrap());
        scopes.push(FrameKind::Branch);
        scopes.constrain(VariableConstraint::from_comparison("i", BinaryOp::Lt, 10).unwrap());
        let constraint = scopes.constraint("i").unwrap();
        assert_eq!(constraint.lower, Some(0));
        assert_eq!(constraint.upper, Some(9));
        scopes.pop();
        assert_eq!(scopes.constraint("i").unwrap().upper, None);
        scopes.pop();
        assert!(scopes.constraint("i").is_none());
    }

    #[test]
    fn test_enter_function_clears_state() {
        let size = node();
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare_array(array("buf", size));
        scopes.enter_function();
        assert!(scopes.array("buf").is_none());
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn test_constants_survive_functions_and_yield_to_bindings() {
        let mut scopes = ScopeStack::new();
        scopes.define_constant("SIZE", 16);
        scopes.enter_function();
        assert_eq!(scopes.constant("SIZE"), Some(16));
        scopes.declare_variable("SIZE", VarValue::Unknown, Some(4));
        assert_eq!(scopes.constant("SIZE"), None);
        scopes.enter_function();
        assert_eq!(scopes.constant("SIZE"), Some(16));
    }
}
