//! # Array Access Checker
//!
//! @title Subscript Bounds
//! @author Ramprasad
//!
//! Classifies the index of every `buf[index]` on a tracked buffer:
//!
//! - **Loop**: the induction variable of an enclosing loop; its range is
//!   compared with the capacity.
//! - **Variable**: a scalar whose last assignment folds to a constant.
//! - **Unconstrained**: a scalar with no known value (parameters, input).
//!   Findings depend on any `if` constraints in scope.
//! - **Constant**: any other expression that folds.
//!
//! Buffers of unknown size and indices that mention a loop variable inside a
//! larger expression are skipped.

use super::{grow_edit, AccessChecker, CheckContext, CheckKind, Proposal, Site};
use crate::analysis::scope::{ArrayBinding, BoundRewrite, LoopEntry, LoopRange, VarValue};
use crate::analysis::suggestion::Edit;
use crate::analysis::Value;
use crate::parser::{BinaryOp, NodeId, NodeKind, SyntaxTree};

pub struct ArrayAccessChecker;

impl AccessChecker for ArrayAccessChecker {
    fn name(&self) -> &'static str {
        "Array Access Checker"
    }

    fn checks(&self) -> &'static [CheckKind] {
        &[
            CheckKind::ConstantIndex,
            CheckKind::LoopIndex,
            CheckKind::VariableIndex,
            CheckKind::UncheckedIndex,
            CheckKind::NegativeIndex,
            CheckKind::UnboundedIndex,
        ]
    }

    fn check(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal> {
        let Site::Subscript(access) = site else {
            return Vec::new();
        };
        let tree = context.tree;
        let scopes = context.scopes;
        let NodeKind::Subscript { array, index } = tree.kind(access) else {
            return Vec::new();
        };
        let Some(binding) = context.tracked_array(*array) else {
            return Vec::new();
        };
        let Value::Known(capacity) = context.array_elements(binding) else {
            return Vec::new();
        };

        let index = tree.strip_parens(*index);
        if let NodeKind::Ident { name } = tree.kind(index) {
            match scopes.loop_entry(name) {
                Some(LoopEntry::Range(range)) => {
                    return loop_access(context, binding, capacity, range)
                }
                Some(LoopEntry::Unsupported) => return Vec::new(),
                None => {}
            }

            if scopes.is_bound(name) || scopes.constant(name).is_none() {
                let value = match scopes.variable(name).map(|binding| binding.value) {
                    Some(VarValue::Expr(expr)) => Some((expr, context.evaluate(expr))),
                    _ => None,
                };
                return match value {
                    Some((expr, Value::Known(value))) => {
                        variable_access(binding, capacity, name, expr, value, context)
                    }
                    _ => unconstrained_access(context, binding, capacity, name, index, access),
                };
            }
        }

        if mentions_loop_variable(tree, context, index) {
            return Vec::new();
        }
        match context.evaluate(index) {
            Value::Known(value) => constant_access(binding, capacity, index, value),
            Value::Unknown => Vec::new(),
        }
    }
}

fn mentions_loop_variable(tree: &SyntaxTree, context: &CheckContext<'_>, id: NodeId) -> bool {
    let mut pending = vec![id];
    while let Some(id) = pending.pop() {
        match tree.kind(id) {
            NodeKind::Ident { name } => {
                if context.scopes.loop_entry(name).is_some() {
                    return true;
                }
            }
            NodeKind::Binary { left, right, .. } | NodeKind::Comma { left, right } => {
                pending.push(*left);
                pending.push(*right);
            }
            NodeKind::Unary { operand, .. } | NodeKind::Cast { operand, .. } => {
                pending.push(*operand)
            }
            NodeKind::Paren { inner } => pending.push(*inner),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => pending.extend([*cond, *then, *otherwise]),
            _ => {}
        }
    }
    false
}

fn loop_access(
    context: &mut CheckContext<'_>,
    binding: &ArrayBinding,
    capacity: i64,
    range: &LoopRange,
) -> Vec<Proposal> {
    let Value::Known(end) = context.evaluate(range.end) else {
        return Vec::new();
    };
    let highest = if range.upper_inclusive {
        Some(end)
    } else {
        end.checked_sub(1)
    };
    let Some(highest) = highest else {
        return Vec::new();
    };
    if highest < capacity {
        return Vec::new();
    }

    let mut proposals = Vec::new();
    let needed = highest.checked_add(1);
    let grow = needed.and_then(|needed| grow_to_elements(binding, needed));
    if let (Some(needed), Some((edit, anchor))) = (needed, grow) {
        proposals.push(Proposal {
            check: CheckKind::LoopIndex,
            description: format!(
                "Increase size of array `{}` ({}) to account for loop access (at least {})",
                binding.name, capacity, needed
            ),
            anchor,
            edits: vec![edit],
        });
    }

    // An empty array has no bound to shrink the loop to.
    if capacity <= 0 {
        return proposals;
    }
    let (edit, anchor) = match range.rewrite {
        BoundRewrite::Comparison {
            condition,
            var_on_left,
        } => (
            Edit::Comparison {
                condition,
                op: BinaryOp::Lt,
                value: capacity,
                var_on_left,
            },
            condition,
        ),
        BoundRewrite::Value => (
            Edit::Literal {
                target: range.end,
                value: capacity - 1,
            },
            range.end,
        ),
    };
    proposals.push(Proposal {
        check: CheckKind::LoopIndex,
        description: format!(
            "Decrease loop upper bound of `{}` ({}) to stay within the bounds of array `{}` (less than {})",
            range.induction_var, highest, binding.name, capacity
        ),
        anchor,
        edits: vec![edit],
    });
    proposals
}

fn variable_access(
    binding: &ArrayBinding,
    capacity: i64,
    name: &str,
    expr: NodeId,
    value: i64,
    context: &CheckContext<'_>,
) -> Vec<Proposal> {
    if (0..capacity).contains(&value) {
        return Vec::new();
    }
    log::debug!(
        "`{}` = {} indexes `{}` at line {}",
        name,
        value,
        binding.name,
        context.tree.span(expr).line
    );

    let mut proposals = Vec::new();
    if capacity > 0 {
        let valid = if value < 0 { 0 } else { capacity - 1 };
        proposals.push(Proposal {
            check: CheckKind::VariableIndex,
            description: format!(
                "Change variable `{}` ({}) to a valid index of `{}` (between 0 and {}) e.g. {}",
                name,
                value,
                binding.name,
                capacity - 1,
                valid
            ),
            anchor: expr,
            edits: vec![Edit::Literal {
                target: expr,
                value: valid,
            }],
        });
    }

    let needed = value.checked_add(1).filter(|_| value >= 0);
    if let Some(needed) = needed {
        if let Some((edit, anchor)) = grow_to_elements(binding, needed) {
            proposals.push(Proposal {
                check: CheckKind::VariableIndex,
                description: format!(
                    "Increase size of array `{}` ({}) to account for index `{}` (at least {})",
                    binding.name, capacity, name, needed
                ),
                anchor,
                edits: vec![edit],
            });
        }
    }
    proposals
}

fn unconstrained_access(
    context: &CheckContext<'_>,
    binding: &ArrayBinding,
    capacity: i64,
    name: &str,
    index: NodeId,
    access: NodeId,
) -> Vec<Proposal> {
    // Zero-length arrays are trailing storage of unknown extent.
    if !context.config.report_unchecked_indices || capacity <= 0 {
        return Vec::new();
    }
    let statement = context.statement.unwrap_or(access);
    let guard = |lower: bool, upper: Option<i64>| Edit::Guard {
        statement,
        index,
        lower,
        upper,
    };

    let Some(constraint) = context.scopes.constraint(name) else {
        return vec![Proposal {
            check: CheckKind::UncheckedIndex,
            description: format!(
                "No bound check performed on index `{}` before accessing `{}` (valid indices 0 to {})",
                name,
                binding.name,
                capacity - 1
            ),
            anchor: access,
            edits: vec![guard(true, Some(capacity))],
        }];
    };

    let mut proposals = Vec::new();
    if constraint.lower.map_or(true, |lower| lower < 0) {
        proposals.push(Proposal {
            check: CheckKind::NegativeIndex,
            description: format!(
                "Index `{}` may be negative when accessing `{}`, check that it is at least 0",
                name, binding.name
            ),
            anchor: access,
            edits: vec![guard(true, None)],
        });
    }
    if constraint.upper.map_or(true, |upper| upper >= capacity) {
        let bound = match constraint.upper {
            Some(upper) => format!("may reach {}", upper),
            None => "has no upper bound".to_string(),
        };
        proposals.push(Proposal {
            check: CheckKind::UnboundedIndex,
            description: format!(
                "Index `{}` {} but `{}` holds {} elements, check that it is less than {}",
                name, bound, binding.name, capacity, capacity
            ),
            anchor: access,
            edits: vec![guard(false, Some(capacity))],
        });
    }
    proposals
}

fn constant_access(
    binding: &ArrayBinding,
    capacity: i64,
    index: NodeId,
    value: i64,
) -> Vec<Proposal> {
    if (0..capacity).contains(&value) {
        return Vec::new();
    }
    if capacity <= 0 {
        return value
            .checked_add(1)
            .filter(|_| value >= 0)
            .and_then(|needed| {
                let (edit, anchor) = grow_to_elements(binding, needed)?;
                Some(Proposal {
                    check: CheckKind::ConstantIndex,
                    description: format!(
                        "Increase size of array `{}` ({}) to account for index {} (at least {})",
                        binding.name, capacity, value, needed
                    ),
                    anchor,
                    edits: vec![edit],
                })
            })
            .into_iter()
            .collect();
    }

    let valid = if value < 0 { 0 } else { capacity - 1 };
    vec![Proposal {
        check: CheckKind::ConstantIndex,
        description: format!(
            "Change index {} of `{}` to a valid index (between 0 and {}) e.g. {}",
            value,
            binding.name,
            capacity - 1,
            valid
        ),
        anchor: index,
        edits: vec![Edit::Literal {
            target: index,
            value: valid,
        }],
    }]
}

/// Growth edit holding `elements` entries, `None` when the size overflows.
fn grow_to_elements(binding: &ArrayBinding, elements: i64) -> Option<(Edit, NodeId)> {
    elements
        .checked_mul(binding.element_width)
        .and_then(|bytes| grow_edit(binding, bytes))
}
