//! # Suggestion Generator
//!
//! @title Mutate, Render, Revert
//! @author Ramprasad
//!
//! Applies a proposal's edits to the live tree through a [`Patch`] guard,
//! renders the enclosing function, and lets the guard restore the tree.
//! The tree seen by later checks is always the original program.

use crate::detectors::Proposal;
use crate::parser::printer::render;
use crate::parser::{BinaryOp, LiteralKind, NodeId, NodeKind, Patch, SyntaxTree};
use crate::report::Suggestion;

/// The function currently being analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFrame {
    pub id: NodeId,
    pub name: String,

    /// Line of the function head.
    pub line: u32,
}

/// A single reversible change to the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Overwrite a node with an integer literal.
    Literal { target: NodeId, value: i64 },

    /// Give a declaration without a dimension an explicit one (`char s[] = ..`).
    Dimension { decl: NodeId, value: i64 },

    /// Rewrite a loop condition to `var <op> value`, keeping the variable's side.
    Comparison {
        condition: NodeId,
        op: BinaryOp,
        value: i64,
        var_on_left: bool,
    },

    /// Wrap a statement in `if (index >= 0 && index < upper) { ... }`.
    Guard {
        statement: NodeId,
        index: NodeId,
        lower: bool,
        upper: Option<i64>,
    },

    /// Replace a string literal's text (quotes included).
    Text { target: NodeId, text: String },

    /// Call a different function with extra trailing arguments.
    RetargetCall {
        call: NodeId,
        callee: String,
        append: Vec<NodeKind>,
    },
}

fn apply(patch: &mut Patch<'_>, edit: &Edit) {
    match edit {
        Edit::Literal { target, value } => patch.replace(*target, NodeKind::int(*value)),
        Edit::Dimension { decl, value } => {
            let span = patch.tree().span(*decl);
            if let NodeKind::Decl {
                ty,
                name,
                mut dims,
                init,
            } = patch.tree().kind(*decl).clone()
            {
                let literal = patch.insert(NodeKind::int(*value), span);
                match dims.first_mut() {
                    Some(first) => *first = Some(literal),
                    None => dims.push(Some(literal)),
                }
                patch.replace(*decl, NodeKind::Decl { ty, name, dims, init });
            }
        }
        Edit::Comparison {
            condition,
            op,
            value,
            var_on_left,
        } => {
            let span = patch.tree().span(*condition);
            if let NodeKind::Binary { left, right, .. } = patch.tree().kind(*condition).clone() {
                let literal = patch.insert(NodeKind::int(*value), span);
                let rewritten = if *var_on_left {
                    NodeKind::Binary {
                        op: *op,
                        left,
                        right: literal,
                    }
                } else {
                    NodeKind::Binary {
                        op: op.flipped(),
                        left: literal,
                        right,
                    }
                };
                patch.replace(*condition, rewritten);
            }
        }
        Edit::Guard {
            statement,
            index,
            lower,
            upper,
        } => {
            let span = patch.tree().span(*statement);
            let mut checks = Vec::new();
            if *lower {
                let zero = patch.insert(NodeKind::int(0), span);
                checks.push(patch.insert(
                    NodeKind::Binary {
                        op: BinaryOp::Ge,
                        left: *index,
                        right: zero,
                    },
                    span,
                ));
            }
            if let Some(upper) = upper {
                let limit = patch.insert(NodeKind::int(*upper), span);
                checks.push(patch.insert(
                    NodeKind::Binary {
                        op: BinaryOp::Lt,
                        left: *index,
                        right: limit,
                    },
                    span,
                ));
            }
            let Some(mut cond) = checks.first().copied() else {
                return;
            };
            for check in &checks[1..] {
                cond = patch.insert(
                    NodeKind::Binary {
                        op: BinaryOp::And,
                        left: cond,
                        right: *check,
                    },
                    span,
                );
            }

            let original = patch.tree().kind(*statement).clone();
            let moved = patch.insert(original, span);
            let then = patch.insert(NodeKind::Compound { items: vec![moved] }, span);
            patch.replace(
                *statement,
                NodeKind::If {
                    cond,
                    then,
                    otherwise: None,
                },
            );
        }
        Edit::Text { target, text } => patch.replace(
            *target,
            NodeKind::Literal {
                kind: LiteralKind::String,
                text: text.clone(),
            },
        ),
        Edit::RetargetCall {
            call,
            callee,
            append,
        } => {
            let span = patch.tree().span(*call);
            if let NodeKind::Call { mut args, .. } = patch.tree().kind(*call).clone() {
                let callee = patch.insert(NodeKind::ident(callee), span);
                for kind in append {
                    args.push(patch.insert(kind.clone(), span));
                }
                patch.replace(*call, NodeKind::Call { callee, args });
            }
        }
    }
}

/// Renders `function` with the proposal's edits applied and records it.
///
/// # Arguments
///
/// * `tree` - The live tree; it is restored before this returns
/// * `function` - The enclosing function to render
/// * `proposal` - Edits, description and anchor node of the finding
///
/// # Returns
///
/// The recorded [`Suggestion`], with its line relative to the function head.
pub fn emit(tree: &mut SyntaxTree, function: &FunctionFrame, proposal: &Proposal) -> Suggestion {
    let line = tree.span(proposal.anchor).line;
    let patched_source = {
        let mut patch = tree.patch();
        for edit in &proposal.edits {
            apply(&mut patch, edit);
        }
        let rendered = render(patch.tree(), function.id);
        rendered
    };

    log::debug!(
        "[{}] {}() line {}: {}",
        proposal.check.id(),
        function.name,
        line,
        proposal.description
    );

    Suggestion {
        check_id: proposal.check.id().to_string(),
        title: proposal.check.name().to_string(),
        severity: proposal.check.severity(),
        cwe: Some(proposal.check.cwe().to_string()),
        function_name: function.name.clone(),
        description: proposal.description.clone(),
        patched_source,
        relative_line: line.saturating_sub(function.line) + 1,
        source_line: line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::CheckKind;
    use crate::parser::parse_source;

    fn function(tree: &SyntaxTree) -> FunctionFrame {
        let NodeKind::TranslationUnit { items } = tree.kind(tree.root().unwrap()) else {
            panic!("expected translation unit");
        };
        let id = items[0];
        let NodeKind::FunctionDef { name, .. } = tree.kind(id) else {
            panic!("expected function");
        };
        FunctionFrame {
            id,
            name: name.clone(),
            line: tree.span(id).line,
        }
    }

    /// Finds the `nth` node matching `predicate`.
    fn find_nth(tree: &SyntaxTree, nth: usize, predicate: impl Fn(&NodeKind) -> bool) -> NodeId {
        tree.ids().filter(|id| predicate(tree.kind(*id))).nth(nth).unwrap()
    }

    fn find(tree: &SyntaxTree, predicate: impl Fn(&NodeKind) -> bool) -> NodeId {
        find_nth(tree, 0, predicate)
    }

    #[test]
    fn test_emit_renders_edit_and_restores_tree() {
        let source = "void f(void)\n{\n    char buf[10];\n    buf[10] = 'x';\n}\n";
        let mut unit = parse_source("t.c", source.to_string()).unwrap();
        let frame = function(&unit.tree);
        let index = find_nth(&unit.tree, 1, |kind| {
            matches!(kind, NodeKind::Literal { text, .. } if text == "10")
        });
        let before = render(&unit.tree, unit.tree.root().unwrap());
        let nodes_before = unit.tree.len();

        let proposal = Proposal {
            check: CheckKind::ConstantIndex,
            description: "Change the index".to_string(),
            anchor: index,
            edits: vec![Edit::Literal {
                target: index,
                value: 9,
            }],
        };
        let suggestion = emit(&mut unit.tree, &frame, &proposal);

        assert!(suggestion.patched_source.contains("buf[9] = 'x';"));
        assert!(suggestion.patched_source.contains("char buf[10];"));
        assert_eq!(suggestion.relative_line, 4);
        assert_eq!(render(&unit.tree, unit.tree.root().unwrap()), before);
        assert_eq!(unit.tree.len(), nodes_before);
    }

    #[test]
    fn test_guard_wraps_statement() {
        let source = "void f(int idx)\n{\n    char buf[10];\n    buf[idx] = 1;\n}\n";
        let mut unit = parse_source("t.c", source.to_string()).unwrap();
        let frame = function(&unit.tree);
        let statement = find(&unit.tree, |kind| matches!(kind, NodeKind::ExprStmt { .. }));
        let index = find(&unit.tree, |kind| matches!(kind, NodeKind::Ident { name } if name == "idx"));

        let proposal = Proposal {
            check: CheckKind::UncheckedIndex,
            description: "Add a bound check".to_string(),
            anchor: statement,
            edits: vec![Edit::Guard {
                statement,
                index,
                lower: true,
                upper: Some(10),
            }],
        };
        let suggestion = emit(&mut unit.tree, &frame, &proposal);
        assert!(suggestion
            .patched_source
            .contains("    if (idx >= 0 && idx < 10) {\n        buf[idx] = 1;\n    }\n"));
    }
}
