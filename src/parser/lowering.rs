//! # C Front End
//!
//! @title tree-sitter Lowering
//! @author Ramprasad
//!
//! Parses C with `tree-sitter-c` and lowers the concrete syntax tree into the
//! closed [`NodeKind`] sum type. Constructs the analyzer never inspects are
//! preserved verbatim as [`NodeKind::Opaque`] so the printer can reproduce them.
//!
//! Preprocessor conditionals are flattened: the items of every branch are
//! lowered in source order.

use super::syntax::{
    AssignOp, BinaryOp, LiteralKind, NodeId, NodeKind, Span, SyntaxTree, TypeName, UnaryOp,
};
use super::ParseError;
use tree_sitter::{Node as TsNode, Parser};

const PREPROC_CONDITIONALS: &[&str] = &[
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
];

/// Parses C source text into a lowered [`SyntaxTree`].
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] with the position of the first error node
/// when the source does not parse cleanly.
pub fn parse_c(source: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_c::LANGUAGE.into())?;

    let parsed = parser.parse(source, None).ok_or(ParseError::Aborted)?;
    let root = parsed.root_node();

    if root.has_error() {
        let span = first_error(root).map(span_of).unwrap_or_default();
        return Err(ParseError::Syntax {
            line: span.line,
            column: span.column,
        });
    }

    let mut lowerer = Lowerer {
        source,
        tree: SyntaxTree::new(),
    };
    let unit = lowerer.translation_unit(root);
    lowerer.tree.set_root(unit);

    Ok(lowerer.tree)
}

fn first_error(node: TsNode<'_>) -> Option<TsNode<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

fn span_of(node: TsNode<'_>) -> Span {
    let point = node.start_position();
    Span::new(point.row as u32 + 1, point.column as u32 + 1)
}

/// Named children without comments.
fn named(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name, pointer depth and array dimensions of a declarator.
struct DeclaratorParts {
    name: String,
    pointer: u8,
    dims: Vec<Option<NodeId>>,
}

struct Lowerer<'s> {
    source: &'s str,
    tree: SyntaxTree,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: TsNode<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn push(&mut self, kind: NodeKind, node: TsNode<'_>) -> NodeId {
        self.tree.push(kind, span_of(node))
    }

    fn opaque(&mut self, node: TsNode<'_>) -> NodeId {
        let text = self.text(node).trim_end().to_string();
        self.push(NodeKind::Opaque { text }, node)
    }

    fn translation_unit(&mut self, node: TsNode<'_>) -> NodeId {
        let mut items = Vec::new();
        self.top_level_items(node, &mut items);
        self.push(NodeKind::TranslationUnit { items }, node)
    }

    fn top_level_items(&mut self, node: TsNode<'_>, items: &mut Vec<NodeId>) {
        let skipped = [
            node.child_by_field_name("condition"),
            node.child_by_field_name("name"),
        ];

        for child in named(node) {
            if skipped.contains(&Some(child)) {
                continue;
            }
            match child.kind() {
                "function_definition" => items.push(self.function_definition(child)),
                "declaration" => items.push(self.declaration(child)),
                kind if PREPROC_CONDITIONALS.contains(&kind) => self.top_level_items(child, items),
                _ => items.push(self.opaque(child)),
            }
        }
    }

    fn function_definition(&mut self, node: TsNode<'_>) -> NodeId {
        let (Some(body), Some(declarator)) = (
            node.child_by_field_name("body"),
            node.child_by_field_name("declarator"),
        ) else {
            return self.opaque(node);
        };

        let mut pointer = 0u8;
        let mut current = declarator;
        while current.kind() == "pointer_declarator" {
            pointer += 1;
            match current.child_by_field_name("declarator") {
                Some(inner) => current = inner,
                None => return self.opaque(node),
            }
        }

        if current.kind() != "function_declarator" {
            return self.opaque(node);
        }
        let name = match current.child_by_field_name("declarator") {
            Some(ident) if ident.kind() == "identifier" => self.text(ident).to_string(),
            _ => return self.opaque(node),
        };

        let Some(mut ret) = self.type_name(node) else {
            return self.opaque(node);
        };
        ret.pointer = pointer;

        let mut params = Vec::new();
        let mut variadic = false;
        if let Some(list) = current.child_by_field_name("parameters") {
            for param in named(list) {
                match param.kind() {
                    "parameter_declaration" => params.push(self.parameter(param)),
                    "variadic_parameter" => variadic = true,
                    _ => params.push(self.opaque(param)),
                }
            }
        }

        let body = self.statement(body);
        self.push(
            NodeKind::FunctionDef {
                ret,
                name,
                params,
                variadic,
                body,
            },
            node,
        )
    }

    fn parameter(&mut self, node: TsNode<'_>) -> NodeId {
        let Some(ty) = self.type_name(node) else {
            return self.opaque(node);
        };
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return self.opaque(node);
        };
        match self.declarator_parts(declarator) {
            Some(parts) => self.push(
                NodeKind::Decl {
                    ty: TypeName {
                        pointer: parts.pointer,
                        ..ty
                    },
                    name: parts.name,
                    dims: parts.dims,
                    init: None,
                },
                node,
            ),
            None => self.opaque(node),
        }
    }

    /// Qualifiers and base type of a declaration-like node.
    ///
    /// Returns `None` for inline struct/union/enum bodies, which stay opaque.
    fn type_name(&self, node: TsNode<'_>) -> Option<TypeName> {
        let ty = node.child_by_field_name("type")?;
        if ty.child_by_field_name("body").is_some() {
            return None;
        }

        let qualifiers = named(node)
            .into_iter()
            .filter(|child| {
                matches!(child.kind(), "storage_class_specifier" | "type_qualifier")
            })
            .map(|child| normalize(self.text(child)))
            .collect();

        Some(TypeName {
            qualifiers,
            base: normalize(self.text(ty)),
            pointer: 0,
        })
    }

    /// Type of a cast or `sizeof` operand (`char *`, `struct node`).
    fn type_descriptor(&self, node: TsNode<'_>) -> Option<TypeName> {
        let mut ty = self.type_name(node)?;
        let mut current = node.child_by_field_name("declarator");
        while let Some(declarator) = current {
            if declarator.kind() != "abstract_pointer_declarator" {
                return None;
            }
            ty.pointer += 1;
            current = declarator.child_by_field_name("declarator");
        }
        Some(ty)
    }

    fn declarator_parts(&mut self, node: TsNode<'_>) -> Option<DeclaratorParts> {
        let mut pointer = 0u8;
        let mut dims = Vec::new();
        let mut current = node;

        loop {
            match current.kind() {
                "identifier" => break,
                "pointer_declarator" => {
                    pointer += 1;
                    current = current.child_by_field_name("declarator")?;
                }
                "array_declarator" => {
                    let size = current.child_by_field_name("size");
                    dims.push(size.map(|size| self.expression(size)));
                    current = current.child_by_field_name("declarator")?;
                }
                _ => return None,
            }
        }

        dims.reverse();
        Some(DeclaratorParts {
            name: self.text(current).to_string(),
            pointer,
            dims,
        })
    }

    fn declaration(&mut self, node: TsNode<'_>) -> NodeId {
        let Some(ty) = self.type_name(node) else {
            return self.opaque(node);
        };

        let declarators: Vec<_> = {
            let mut cursor = node.walk();
            node.children_by_field_name("declarator", &mut cursor)
                .collect()
        };
        if declarators.is_empty() {
            return self.opaque(node);
        }

        let mut decls = Vec::new();
        for declarator in declarators {
            let (target, value) = if declarator.kind() == "init_declarator" {
                match declarator.child_by_field_name("declarator") {
                    Some(target) => (target, declarator.child_by_field_name("value")),
                    None => return self.opaque(node),
                }
            } else {
                (declarator, None)
            };

            let Some(parts) = self.declarator_parts(target) else {
                return self.opaque(node);
            };
            let init = value.map(|value| self.expression(value));

            decls.push(self.push(
                NodeKind::Decl {
                    ty: TypeName {
                        pointer: parts.pointer,
                        ..ty.clone()
                    },
                    name: parts.name,
                    dims: parts.dims,
                    init,
                },
                declarator,
            ));
        }

        if decls.len() == 1 {
            decls[0]
        } else {
            self.push(NodeKind::DeclGroup { decls }, node)
        }
    }

    fn block_items(&mut self, node: TsNode<'_>, items: &mut Vec<NodeId>) {
        let skipped = [
            node.child_by_field_name("condition"),
            node.child_by_field_name("name"),
        ];

        for child in named(node) {
            if skipped.contains(&Some(child)) {
                continue;
            }
            if PREPROC_CONDITIONALS.contains(&child.kind()) {
                self.block_items(child, items);
            } else {
                items.push(self.statement(child));
            }
        }
    }

    /// Lowers the expression inside a `( ... )` statement header.
    fn header(&mut self, node: Option<TsNode<'_>>, parent: TsNode<'_>) -> NodeId {
        match node {
            Some(cond) if cond.kind() == "parenthesized_expression" => match named(cond).first() {
                Some(inner) => self.expression(*inner),
                None => self.opaque(cond),
            },
            Some(cond) => self.expression(cond),
            None => self.opaque(parent),
        }
    }

    fn statement(&mut self, node: TsNode<'_>) -> NodeId {
        match node.kind() {
            "compound_statement" => {
                let mut items = Vec::new();
                self.block_items(node, &mut items);
                self.push(NodeKind::Compound { items }, node)
            }
            "declaration" => self.declaration(node),
            "expression_statement" => {
                let expr = named(node).first().map(|expr| self.expression(*expr));
                self.push(NodeKind::ExprStmt { expr }, node)
            }
            "if_statement" => {
                let cond = self.header(node.child_by_field_name("condition"), node);
                let Some(consequence) = node.child_by_field_name("consequence") else {
                    return self.opaque(node);
                };
                let then = self.statement(consequence);
                let otherwise = node.child_by_field_name("alternative").and_then(|alt| {
                    if alt.kind() == "else_clause" {
                        named(alt).first().map(|stmt| self.statement(*stmt))
                    } else {
                        Some(self.statement(alt))
                    }
                });
                self.push(NodeKind::If { cond, then, otherwise }, node)
            }
            "for_statement" => {
                let Some(body) = node.child_by_field_name("body") else {
                    return self.opaque(node);
                };
                let init = node.child_by_field_name("initializer").map(|init| {
                    if init.kind() == "declaration" {
                        self.declaration(init)
                    } else {
                        self.expression(init)
                    }
                });
                let cond = node
                    .child_by_field_name("condition")
                    .map(|cond| self.expression(cond));
                let step = node
                    .child_by_field_name("update")
                    .map(|step| self.expression(step));
                let body = self.statement(body);
                self.push(NodeKind::For { init, cond, step, body }, node)
            }
            "while_statement" => {
                let cond = self.header(node.child_by_field_name("condition"), node);
                let Some(body) = node.child_by_field_name("body") else {
                    return self.opaque(node);
                };
                let body = self.statement(body);
                self.push(NodeKind::While { cond, body }, node)
            }
            "do_statement" => {
                let Some(body) = node.child_by_field_name("body") else {
                    return self.opaque(node);
                };
                let body = self.statement(body);
                let cond = self.header(node.child_by_field_name("condition"), node);
                self.push(NodeKind::DoWhile { body, cond }, node)
            }
            "switch_statement" => {
                let cond = self.header(node.child_by_field_name("condition"), node);
                let Some(body) = node.child_by_field_name("body") else {
                    return self.opaque(node);
                };
                let body = self.statement(body);
                self.push(NodeKind::Switch { cond, body }, node)
            }
            "case_statement" => {
                let value_node = node.child_by_field_name("value");
                let value = value_node.map(|value| self.expression(value));
                let body = named(node)
                    .into_iter()
                    .filter(|child| Some(*child) != value_node)
                    .map(|child| self.statement(child))
                    .collect();
                self.push(NodeKind::Case { value, body }, node)
            }
            "return_statement" => {
                let value = named(node).first().map(|value| self.expression(*value));
                self.push(NodeKind::Return { value }, node)
            }
            "break_statement" => self.push(NodeKind::Break, node),
            "continue_statement" => self.push(NodeKind::Continue, node),
            "goto_statement" => match node.child_by_field_name("label") {
                Some(label) => {
                    let label = self.text(label).to_string();
                    self.push(NodeKind::Goto { label }, node)
                }
                None => self.opaque(node),
            },
            "labeled_statement" => {
                let label_node = node.child_by_field_name("label");
                let statement = named(node)
                    .into_iter()
                    .find(|child| Some(*child) != label_node);
                match (label_node, statement) {
                    (Some(label), Some(statement)) => {
                        let label = self.text(label).to_string();
                        let body = self.statement(statement);
                        self.push(NodeKind::Labeled { label, body }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            _ => self.opaque(node),
        }
    }

    fn field_expression(&mut self, node: TsNode<'_>, field: &str) -> Option<NodeId> {
        node.child_by_field_name(field)
            .map(|child| self.expression(child))
    }

    fn operator(&self, node: TsNode<'_>) -> &'s str {
        node.child_by_field_name("operator")
            .map(|op| self.text(op))
            .unwrap_or("")
    }

    fn expression(&mut self, node: TsNode<'_>) -> NodeId {
        match node.kind() {
            "identifier" | "true" | "false" | "null" => {
                let name = self.text(node).to_string();
                self.push(NodeKind::Ident { name }, node)
            }
            "number_literal" => {
                let text = self.text(node).to_string();
                let is_hex = text.starts_with("0x") || text.starts_with("0X");
                let is_float = text.contains('.')
                    || (!is_hex && (text.contains('e') || text.contains('E')))
                    || (is_hex && (text.contains('p') || text.contains('P')));
                let kind = if is_float {
                    LiteralKind::Float
                } else {
                    LiteralKind::Int
                };
                self.push(NodeKind::Literal { kind, text }, node)
            }
            "char_literal" => {
                let text = self.text(node).to_string();
                self.push(
                    NodeKind::Literal {
                        kind: LiteralKind::Char,
                        text,
                    },
                    node,
                )
            }
            "string_literal" | "concatenated_string" => {
                let text = normalize_string(self.text(node));
                self.push(
                    NodeKind::Literal {
                        kind: LiteralKind::String,
                        text,
                    },
                    node,
                )
            }
            "parenthesized_expression" => match named(node).first() {
                Some(inner) => {
                    let inner = self.expression(*inner);
                    self.push(NodeKind::Paren { inner }, node)
                }
                None => self.opaque(node),
            },
            "binary_expression" => {
                let op = BinaryOp::from_token(self.operator(node));
                let left = self.field_expression(node, "left");
                let right = self.field_expression(node, "right");
                match (op, left, right) {
                    (Some(op), Some(left), Some(right)) => {
                        self.push(NodeKind::Binary { op, left, right }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "unary_expression" | "pointer_expression" => {
                let op = match self.operator(node) {
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Plus,
                    "!" => UnaryOp::Not,
                    "~" => UnaryOp::BitNot,
                    "*" => UnaryOp::Deref,
                    "&" => UnaryOp::AddrOf,
                    _ => return self.opaque(node),
                };
                match self.field_expression(node, "argument") {
                    Some(operand) => self.push(NodeKind::Unary { op, operand }, node),
                    None => self.opaque(node),
                }
            }
            "update_expression" => {
                let Some(argument) = node.child_by_field_name("argument") else {
                    return self.opaque(node);
                };
                let prefix = node.start_byte() < argument.start_byte();
                let op = match (self.operator(node), prefix) {
                    ("++", true) => UnaryOp::PreInc,
                    ("--", true) => UnaryOp::PreDec,
                    ("++", false) => UnaryOp::PostInc,
                    ("--", false) => UnaryOp::PostDec,
                    _ => return self.opaque(node),
                };
                let operand = self.expression(argument);
                self.push(NodeKind::Unary { op, operand }, node)
            }
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .and_then(|ty| self.type_descriptor(ty));
                match (ty, node.child_by_field_name("value")) {
                    (Some(ty), Some(value)) => {
                        let operand = self.expression(value);
                        self.push(NodeKind::Cast { ty, operand }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "sizeof_expression" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    return match self.type_descriptor(ty) {
                        Some(ty) => self.push(NodeKind::SizeofType { ty }, node),
                        None => self.opaque(node),
                    };
                }
                match self.field_expression(node, "value") {
                    Some(operand) => self.push(NodeKind::SizeofExpr { operand }, node),
                    None => self.opaque(node),
                }
            }
            "call_expression" => {
                let Some(callee) = self.field_expression(node, "function") else {
                    return self.opaque(node);
                };
                let args = node
                    .child_by_field_name("arguments")
                    .map(|list| {
                        named(list)
                            .into_iter()
                            .map(|arg| self.expression(arg))
                            .collect()
                    })
                    .unwrap_or_default();
                self.push(NodeKind::Call { callee, args }, node)
            }
            "subscript_expression" => {
                let array = node.child_by_field_name("argument");
                let index = node
                    .child_by_field_name("index")
                    .or_else(|| named(node).get(1).copied());
                match (array, index) {
                    (Some(array), Some(index)) => {
                        let array = self.expression(array);
                        let index = self.expression(index);
                        self.push(NodeKind::Subscript { array, index }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "field_expression" => {
                let field = node
                    .child_by_field_name("field")
                    .map(|field| self.text(field).to_string());
                let arrow = self.operator(node) == "->";
                match (self.field_expression(node, "argument"), field) {
                    (Some(object), Some(field)) => {
                        self.push(NodeKind::Member { object, field, arrow }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "assignment_expression" => {
                let op = AssignOp::from_token(self.operator(node));
                let target = self.field_expression(node, "left");
                let value = self.field_expression(node, "right");
                match (op, target, value) {
                    (Some(op), Some(target), Some(value)) => {
                        self.push(NodeKind::Assign { op, target, value }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "conditional_expression" => {
                let cond = self.field_expression(node, "condition");
                let then = self.field_expression(node, "consequence");
                let otherwise = self.field_expression(node, "alternative");
                match (cond, then, otherwise) {
                    (Some(cond), Some(then), Some(otherwise)) => {
                        self.push(NodeKind::Conditional { cond, then, otherwise }, node)
                    }
                    _ => self.opaque(node),
                }
            }
            "comma_expression" => {
                let left = self.field_expression(node, "left");
                let right = self.field_expression(node, "right");
                match (left, right) {
                    (Some(left), Some(right)) => self.push(NodeKind::Comma { left, right }, node),
                    _ => self.opaque(node),
                }
            }
            "initializer_list" => {
                let items = named(node)
                    .into_iter()
                    .map(|item| self.expression(item))
                    .collect();
                self.push(NodeKind::InitList { items }, node)
            }
            _ => self.opaque(node),
        }
    }
}

/// Joins the pieces of a concatenated string onto one line.
fn normalize_string(text: &str) -> String {
    if text.contains('\n') {
        text.lines().map(str::trim).collect::<Vec<_>>().join(" ")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_body(tree: &SyntaxTree) -> Vec<NodeId> {
        let root = tree.root().unwrap();
        let NodeKind::TranslationUnit { items } = tree.kind(root) else {
            panic!("expected translation unit");
        };
        let function = items
            .iter()
            .find(|id| matches!(tree.kind(**id), NodeKind::FunctionDef { .. }))
            .unwrap();
        let NodeKind::FunctionDef { body, .. } = tree.kind(*function) else {
            unreachable!();
        };
        let NodeKind::Compound { items } = tree.kind(*body) else {
            panic!("expected compound body");
        };
        items.clone()
    }

    #[test]
    fn test_lowers_array_declaration() {
        let tree = parse_c("void f(void) { char buf[10]; }").unwrap();
        let body = function_body(&tree);
        match tree.kind(body[0]) {
            NodeKind::Decl { ty, name, dims, init } => {
                assert_eq!(ty.base, "char");
                assert_eq!(name, "buf");
                assert_eq!(dims.len(), 1);
                assert!(init.is_none());
                let dim = dims[0].unwrap();
                assert_eq!(
                    tree.kind(dim),
                    &NodeKind::Literal {
                        kind: LiteralKind::Int,
                        text: "10".to_string()
                    }
                );
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_lowers_pointer_with_cast_malloc() {
        let tree = parse_c("void f(void) { char *p = (char *)malloc(16); }").unwrap();
        let body = function_body(&tree);
        let NodeKind::Decl { ty, init, .. } = tree.kind(body[0]) else {
            panic!("expected declaration");
        };
        assert_eq!(ty.pointer, 1);
        let (name, args) = tree.call_parts(init.unwrap()).unwrap();
        assert_eq!(name, "malloc");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_lowers_for_loop_header() {
        let tree = parse_c("void f(void) { char b[4]; for (int i = 0; i <= 3; i++) b[i] = 0; }")
            .unwrap();
        let body = function_body(&tree);
        let NodeKind::For { init, cond, step, .. } = tree.kind(body[1]) else {
            panic!("expected for loop");
        };
        assert!(matches!(tree.kind(init.unwrap()), NodeKind::Decl { .. }));
        assert!(matches!(
            tree.kind(cond.unwrap()),
            NodeKind::Binary { op: BinaryOp::Le, .. }
        ));
        assert!(matches!(
            tree.kind(step.unwrap()),
            NodeKind::Unary { op: UnaryOp::PostInc, .. }
        ));
    }

    #[test]
    fn test_flattens_preprocessor_conditionals() {
        let source = "#ifndef OMITBAD\nvoid bad(void) { }\n#endif\nvoid good(void) { }\n";
        let tree = parse_c(source).unwrap();
        let NodeKind::TranslationUnit { items } = tree.kind(tree.root().unwrap()) else {
            panic!("expected translation unit");
        };
        let functions: Vec<_> = items
            .iter()
            .filter_map(|id| match tree.kind(*id) {
                NodeKind::FunctionDef { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(functions, vec!["bad", "good"]);
    }

    #[test]
    fn test_rejects_syntax_errors() {
        let err = parse_c("void f( { int x = ; }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_records_line_numbers() {
        let tree = parse_c("void f(void)\n{\n    int x = 1;\n}\n").unwrap();
        let body = function_body(&tree);
        assert_eq!(tree.span(body[0]).line, 3);
    }
}
