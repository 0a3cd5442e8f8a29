//! # Memory Copy Checker
//!
//! @title Copy Length vs. Destination Capacity
//! @author Ramprasad
//!
//! Checks calls from a fixed set of copy and fill functions. With an explicit
//! length the byte count is compared with the destination capacity; without
//! one (`strcpy`, `wcscpy`) the source's size is compared instead.

use super::{grow_edit, AccessChecker, CheckContext, CheckKind, Proposal, Site};
use crate::analysis::evaluator::string_literal_length;
use crate::analysis::scope::VarValue;
use crate::analysis::sizeof::WCHAR_WIDTH;
use crate::analysis::suggestion::Edit;
use crate::analysis::Value;
use crate::parser::{BinaryOp, LiteralKind, NodeId, NodeKind};

/// Copy and fill functions checked against their destination.
pub const COPY_FUNCTIONS: &[&str] = &[
    "memcpy", "memmove", "memset", "wmemset", "wmemcpy", "strcpy", "wcscpy", "strncpy", "wcsncpy",
];

/// Byte width of the unit the length argument counts.
fn unit_width(function: &str) -> i64 {
    if function.starts_with('w') {
        WCHAR_WIDTH
    } else {
        1
    }
}

pub struct MemoryCopyChecker;

impl AccessChecker for MemoryCopyChecker {
    fn name(&self) -> &'static str {
        "Memory Copy Checker"
    }

    fn checks(&self) -> &'static [CheckKind] {
        &[CheckKind::CopyLength, CheckKind::CopySource]
    }

    fn check(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal> {
        let Site::Call(call) = site else {
            return Vec::new();
        };
        let tree = context.tree;
        let Some((function, args)) = tree.call_parts(call) else {
            return Vec::new();
        };
        if !COPY_FUNCTIONS.contains(&function) || args.len() < 2 {
            return Vec::new();
        }
        let Some(destination) = context.tracked_array(args[0]) else {
            return Vec::new();
        };
        let Value::Known(capacity) = context.array_bytes(destination) else {
            return Vec::new();
        };
        let unit = unit_width(function);

        match args {
            [_, _, length, ..] => {
                let Value::Known(count) = context.evaluate(*length) else {
                    return Vec::new();
                };
                let Some(bytes) = count.checked_mul(unit) else {
                    return Vec::new();
                };
                if bytes <= capacity {
                    return Vec::new();
                }

                let (count_node, per_count) = split_length(context, *length);
                let fitted = capacity / unit.saturating_mul(per_count).max(1);
                let mut proposals = vec![Proposal {
                    check: CheckKind::CopyLength,
                    description: format!(
                        "Reduce the number of bytes copied by {} ({}) to fit the destination buffer `{}` ({} bytes)",
                        function, bytes, destination.name, capacity
                    ),
                    anchor: call,
                    edits: vec![Edit::Literal {
                        target: count_node,
                        value: fitted,
                    }],
                }];
                if let Some((edit, anchor)) = grow_edit(destination, bytes) {
                    proposals.push(Proposal {
                        check: CheckKind::CopyLength,
                        description: format!(
                            "Increase the size of the destination buffer `{}` ({} bytes) to hold the {} bytes copied by {}",
                            destination.name, capacity, bytes, function
                        ),
                        anchor,
                        edits: vec![edit],
                    });
                }
                proposals
            }
            [_, source] => {
                let Some(source_bytes) = source_bytes(context, *source, unit) else {
                    return Vec::new();
                };
                if source_bytes <= capacity {
                    return Vec::new();
                }
                grow_edit(destination, source_bytes)
                    .map(|(edit, anchor)| Proposal {
                        check: CheckKind::CopySource,
                        description: format!(
                            "Increase the size of the destination buffer `{}` from {} bytes to at least {} bytes to hold the source copied by {}",
                            destination.name, capacity, source_bytes, function
                        ),
                        anchor,
                        edits: vec![edit],
                    })
                    .into_iter()
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Splits `N * sizeof(T)` into the node holding `N` and the width of `T`.
fn split_length(context: &mut CheckContext<'_>, length: NodeId) -> (NodeId, i64) {
    let tree = context.tree;
    let stripped = tree.strip_parens(length);
    if let NodeKind::Binary {
        op: BinaryOp::Mul,
        left,
        right,
    } = tree.kind(stripped)
    {
        let is_sizeof = |id: NodeId| {
            matches!(
                tree.kind(tree.strip_parens(id)),
                NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. }
            )
        };
        let split = if is_sizeof(*right) {
            Some((*left, *right))
        } else if is_sizeof(*left) {
            Some((*right, *left))
        } else {
            None
        };
        if let Some((count, width)) = split {
            if let Value::Known(width) = context.evaluate(width) {
                if width > 0 {
                    return (count, width);
                }
            }
        }
    }
    (length, 1)
}

/// Size in bytes of a copy source, terminator included.
fn source_bytes(context: &mut CheckContext<'_>, source: NodeId, unit: i64) -> Option<i64> {
    let tree = context.tree;
    let scopes = context.scopes;
    let source = tree.strip(source);
    let literal_bytes = |text: &str| {
        string_literal_length(text)
            .and_then(|length| length.checked_add(1))
            .and_then(|length| length.checked_mul(unit))
    };

    match tree.kind(source) {
        NodeKind::Literal {
            kind: LiteralKind::String,
            text,
        } => literal_bytes(text),
        NodeKind::Ident { name } => {
            if let Some(binding) = context.tracked_array(source) {
                return context.array_bytes(binding).known();
            }
            match scopes.variable(name).map(|binding| binding.value) {
                Some(VarValue::Expr(expr)) => match tree.kind(tree.strip(expr)) {
                    NodeKind::Literal {
                        kind: LiteralKind::String,
                        text,
                    } => literal_bytes(text),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_functions_count_wchar_units() {
        assert_eq!(unit_width("wmemset"), WCHAR_WIDTH);
        assert_eq!(unit_width("wcsncpy"), WCHAR_WIDTH);
        assert_eq!(unit_width("memcpy"), 1);
    }
}
