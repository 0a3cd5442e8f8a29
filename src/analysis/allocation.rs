//! # Allocation Extractor
//!
//! @title Buffer Size Extraction
//! @author Ramprasad
//!
//! Given a declaration or an initializer, finds the node that holds a
//! buffer's element count together with the byte multiplier applied to it.
//!
//! ## Recognized Shapes
//!
//! | Source | Size node | Multiplier |
//! |--------|-----------|------------|
//! | `T buf[N]` | `N` | width of `T` |
//! | `char s[] = "abc"` | implicit (4) | 1 |
//! | `malloc(N * sizeof(T))` | `N` | width of `T` |
//! | `calloc(N, sizeof(T))` | `N` | width of `T` |
//! | `malloc(strlen(src) + 1)` | size node of `src` | multiplier of `src` |
//! | `p = buf` | size node of `buf` | multiplier of `buf` |
//!
//! Anything else yields [`SizeRef::Unknown`], never a zero size.

use super::evaluator::{string_literal_length, Evaluator, Value};
use super::sizeof::type_width;
use crate::parser::{BinaryOp, LiteralKind, NodeId, NodeKind};

/// Functions whose return value is a fresh heap or stack block.
pub const ALLOCATORS: &[&str] = &["malloc", "calloc", "alloca"];

/// Where a buffer's element count lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRef {
    /// A node in the tree; editing it resizes every alias.
    Node(NodeId),

    /// Count implied by an initializer on a declaration without a dimension.
    Implicit { decl: NodeId, count: i64 },

    /// Size not statically known.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub size: SizeRef,
    pub multiplier: i64,
}

impl Allocation {
    pub const UNKNOWN: Allocation = Allocation {
        size: SizeRef::Unknown,
        multiplier: 1,
    };
}

/// Returns `true` if `id` is a call to one of [`ALLOCATORS`].
pub fn is_allocation(evaluator: &Evaluator<'_>, id: NodeId) -> bool {
    evaluator
        .tree()
        .call_parts(id)
        .map_or(false, |(name, _)| ALLOCATORS.contains(&name))
}

/// Extracts the buffer described by a declaration.
///
/// # Returns
///
/// `None` for scalars and multi-dimensional arrays, which are not tracked.
pub fn from_declaration(evaluator: &mut Evaluator<'_>, decl: NodeId) -> Option<Allocation> {
    let tree = evaluator.tree();
    let NodeKind::Decl { ty, dims, init, .. } = tree.kind(decl) else {
        return None;
    };

    match dims.as_slice() {
        [] if ty.pointer > 0 => Some(match init {
            Some(init) => from_initializer(evaluator, *init),
            None => Allocation::UNKNOWN,
        }),
        [] => None,
        [dim] => {
            let multiplier = type_width(ty).unwrap_or(1);
            let size = match (dim, init.map(|init| tree.kind(tree.strip_parens(init)))) {
                (Some(dim), _) => SizeRef::Node(*dim),
                (
                    None,
                    Some(NodeKind::Literal {
                        kind: LiteralKind::String,
                        text,
                    }),
                ) => match string_literal_length(text) {
                    Some(length) => SizeRef::Implicit {
                        decl,
                        count: length + 1,
                    },
                    None => SizeRef::Unknown,
                },
                (None, Some(NodeKind::InitList { items })) => SizeRef::Implicit {
                    decl,
                    count: items.len() as i64,
                },
                (None, _) => SizeRef::Unknown,
            };
            Some(Allocation { size, multiplier })
        }
        _ => {
            log::debug!("Skipping multi-dimensional array at line {}", tree.span(decl).line);
            None
        }
    }
}

/// Extracts the buffer an initializer or assigned value points to.
pub fn from_initializer(evaluator: &mut Evaluator<'_>, init: NodeId) -> Allocation {
    let tree = evaluator.tree();
    let value = tree.strip(init);

    if let Some((name, args)) = tree.call_parts(value) {
        return match (name, args) {
            ("malloc" | "alloca", [size]) => size_expression(evaluator, *size),
            ("calloc", [count, width]) => {
                let count = size_expression(evaluator, *count);
                match evaluator.evaluate(*width) {
                    Value::Known(width) => match count.multiplier.checked_mul(width) {
                        Some(multiplier) => Allocation {
                            size: count.size,
                            multiplier,
                        },
                        None => Allocation::UNKNOWN,
                    },
                    Value::Unknown => Allocation::UNKNOWN,
                }
            }
            _ => Allocation::UNKNOWN,
        };
    }

    if let NodeKind::Ident { name } = tree.kind(value) {
        if let Some(binding) = evaluator.scopes().array(name) {
            return Allocation {
                size: binding.size,
                multiplier: binding.multiplier,
            };
        }
    }

    Allocation::UNKNOWN
}

fn is_sizeof(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. })
}

/// Splits an allocation size into count node and multiplier.
fn size_expression(evaluator: &mut Evaluator<'_>, size: NodeId) -> Allocation {
    let tree = evaluator.tree();
    let stripped = tree.strip_parens(size);

    match tree.kind(stripped) {
        NodeKind::Binary {
            op: BinaryOp::Mul,
            left,
            right,
        } => {
            let (count, width) = if is_sizeof(tree.kind(tree.strip_parens(*right))) {
                (*left, *right)
            } else if is_sizeof(tree.kind(tree.strip_parens(*left))) {
                (*right, *left)
            } else {
                return Allocation {
                    size: SizeRef::Node(size),
                    multiplier: 1,
                };
            };
            match evaluator.evaluate(width) {
                Value::Known(multiplier) if multiplier > 0 => Allocation {
                    size: SizeRef::Node(count),
                    multiplier,
                },
                _ => Allocation::UNKNOWN,
            }
        }
        NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. } => Allocation {
            size: SizeRef::Node(size),
            multiplier: 1,
        },
        NodeKind::Binary {
            op: BinaryOp::Add,
            left,
            ..
        } if strlen_source(evaluator, *left).is_some() => {
            strlen_source(evaluator, *left).unwrap_or(Allocation::UNKNOWN)
        }
        NodeKind::Call { .. } => {
            strlen_source(evaluator, stripped).unwrap_or(Allocation {
                size: SizeRef::Node(size),
                multiplier: 1,
            })
        }
        _ => Allocation {
            size: SizeRef::Node(size),
            multiplier: 1,
        },
    }
}

/// For `strlen(x)`, the allocation of the tracked buffer `x`.
fn strlen_source(evaluator: &Evaluator<'_>, id: NodeId) -> Option<Allocation> {
    let tree = evaluator.tree();
    let (name, args) = tree.call_parts(id)?;
    if !matches!(name, "strlen" | "wcslen") || args.len() != 1 {
        return None;
    }
    let source = tree.ident_name(args[0])?;
    let binding = evaluator.scopes().array(source)?;
    (binding.size != SizeRef::Unknown).then_some(Allocation {
        size: binding.size,
        multiplier: binding.multiplier,
    })
}
