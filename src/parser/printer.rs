//! # Printer
//!
//! @title C Source Printer
//! @author Ramprasad
//!
//! Renders any subtree of a [`SyntaxTree`] back to compilable C with 4-space
//! indentation and K&R braces. Parentheses are explicit nodes in the tree, so
//! expressions print operator by operator without precedence inference.

use super::syntax::{NodeId, NodeKind, SyntaxTree, TypeName, UnaryOp};

const INDENT: &str = "    ";

/// Renders the subtree rooted at `id` as C source text.
///
/// # Arguments
///
/// * `tree` - The tree holding the node
/// * `id` - Root of the subtree to render
///
/// # Returns
///
/// Source text ending with a newline for statements and definitions, or a
/// bare expression for expression nodes.
pub fn render(tree: &SyntaxTree, id: NodeId) -> String {
    let mut printer = Printer::new(tree);
    if is_statement(tree.kind(id)) {
        printer.item(id);
        printer.out
    } else {
        printer.expression(id)
    }
}

fn is_statement(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::TranslationUnit { .. }
            | NodeKind::FunctionDef { .. }
            | NodeKind::Decl { .. }
            | NodeKind::DeclGroup { .. }
            | NodeKind::Compound { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::If { .. }
            | NodeKind::For { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Case { .. }
            | NodeKind::Return { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Goto { .. }
            | NodeKind::Labeled { .. }
    )
}

/// `const char` for a type, without pointer stars.
fn base_text(ty: &TypeName) -> String {
    let mut parts: Vec<&str> = ty.qualifiers.iter().map(String::as_str).collect();
    parts.push(&ty.base);
    parts.join(" ")
}

/// A type as written in casts and `sizeof`: `char *`, `struct node`.
pub fn type_text(ty: &TypeName) -> String {
    if ty.pointer == 0 {
        base_text(ty)
    } else {
        format!("{} {}", base_text(ty), "*".repeat(ty.pointer as usize))
    }
}

struct Printer<'t> {
    tree: &'t SyntaxTree,
    out: String,
    indent: usize,
    /// Set when the next line continues the current one (`} else ...`).
    continued: bool,
}

impl<'t> Printer<'t> {
    fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            out: String::new(),
            indent: 0,
            continued: false,
        }
    }

    fn write_line(&mut self, text: &str) {
        if !std::mem::take(&mut self.continued) {
            self.out.push_str(&INDENT.repeat(self.indent));
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn item(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::TranslationUnit { items } => {
                for (position, item) in items.iter().enumerate() {
                    let is_function = matches!(tree.kind(*item), NodeKind::FunctionDef { .. });
                    if is_function && position > 0 {
                        self.out.push('\n');
                    }
                    self.item(*item);
                }
            }
            NodeKind::FunctionDef {
                ret,
                name,
                params,
                variadic,
                body,
            } => {
                let mut params: Vec<String> =
                    params.iter().map(|param| self.declaration(*param)).collect();
                if *variadic {
                    params.push("...".to_string());
                }
                let head = format!("{}({})", declarator_text(ret, name), params.join(", "));
                self.write_line(&head);
                match tree.kind(*body) {
                    NodeKind::Compound { items } => {
                        self.write_line("{");
                        self.block(items);
                        self.write_line("}");
                    }
                    _ => self.statement(*body),
                }
            }
            _ => self.statement(id),
        }
    }

    fn block(&mut self, items: &[NodeId]) {
        self.indent += 1;
        for item in items {
            self.statement(*item);
        }
        self.indent -= 1;
    }

    /// Writes `head` followed by `body`; returns true when the body was a
    /// braced block, so the caller can continue on the closing brace line.
    fn clause(&mut self, head: &str, body: NodeId) -> bool {
        let tree = self.tree;
        match tree.kind(body) {
            NodeKind::Compound { items } => {
                self.write_line(&format!("{} {{", head));
                self.block(items);
                self.write_line("}");
                true
            }
            _ => {
                self.write_line(head);
                self.indent += 1;
                self.statement(body);
                self.indent -= 1;
                false
            }
        }
    }

    fn statement(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Compound { items } => {
                self.write_line("{");
                self.block(items);
                self.write_line("}");
            }
            NodeKind::Decl { .. } | NodeKind::DeclGroup { .. } => {
                let text = format!("{};", self.declaration(id));
                self.write_line(&text);
            }
            NodeKind::ExprStmt { expr } => {
                let text = match expr {
                    Some(expr) => format!("{};", self.expression(*expr)),
                    None => ";".to_string(),
                };
                self.write_line(&text);
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                let head = format!("if ({})", self.expression(*cond));
                let closed = self.clause(&head, *then);
                if let Some(otherwise) = otherwise {
                    self.else_clause(closed, *otherwise);
                }
            }
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let part = |printer: &Self, id: &Option<NodeId>| {
                    id.map(|id| printer.expression(id)).unwrap_or_default()
                };
                let init = part(self, init);
                let cond = part(self, cond);
                let step = part(self, step);
                let head = format!("for ({}; {}; {})", init, cond, step)
                    .replace("( ;", "(;")
                    .replace("; ;", ";;")
                    .replace("; )", ";)");
                self.clause(&head, *body);
            }
            NodeKind::While { cond, body } => {
                let head = format!("while ({})", self.expression(*cond));
                self.clause(&head, *body);
            }
            NodeKind::DoWhile { body, cond } => {
                let tail = format!("while ({});", self.expression(*cond));
                if self.clause("do", *body) {
                    self.reopen_closing_brace();
                }
                self.write_line(&tail);
            }
            NodeKind::Switch { cond, body } => {
                let head = format!("switch ({})", self.expression(*cond));
                self.clause(&head, *body);
            }
            NodeKind::Case { value, body } => {
                let label = match value {
                    Some(value) => format!("case {}:", self.expression(*value)),
                    None => "default:".to_string(),
                };
                self.write_line(&label);
                self.block(body);
            }
            NodeKind::Return { value } => {
                let text = match value {
                    Some(value) => format!("return {};", self.expression(*value)),
                    None => "return;".to_string(),
                };
                self.write_line(&text);
            }
            NodeKind::Break => self.write_line("break;"),
            NodeKind::Continue => self.write_line("continue;"),
            NodeKind::Goto { label } => self.write_line(&format!("goto {};", label)),
            NodeKind::Labeled { label, body } => {
                self.write_line(&format!("{}:", label));
                self.statement(*body);
            }
            NodeKind::FunctionDef { .. } | NodeKind::TranslationUnit { .. } => self.item(id),
            NodeKind::Opaque { text } => self.write_line(text),
            _ => {
                let text = format!("{};", self.expression(id));
                self.write_line(&text);
            }
        }
    }

    /// Replaces the trailing `}` line with a continuation point on it.
    fn reopen_closing_brace(&mut self) {
        if self.out.ends_with("}\n") {
            self.out.truncate(self.out.len() - 1);
            self.out.push(' ');
            self.continued = true;
        }
    }

    fn else_clause(&mut self, closed: bool, otherwise: NodeId) {
        if closed {
            self.reopen_closing_brace();
        }
        let tree = self.tree;
        match tree.kind(otherwise) {
            NodeKind::If { .. } => {
                if self.continued {
                    self.out.push_str("else ");
                } else {
                    self.out.push_str(&INDENT.repeat(self.indent));
                    self.out.push_str("else ");
                    self.continued = true;
                }
                self.statement(otherwise);
            }
            _ => {
                self.clause("else", otherwise);
            }
        }
    }

    fn declaration(&self, id: NodeId) -> String {
        match self.tree.kind(id) {
            NodeKind::Decl {
                ty,
                name,
                dims,
                init,
            } => {
                let mut text = declarator_text(ty, name);
                text.push_str(&self.dims_text(dims));
                if let Some(init) = init {
                    text.push_str(" = ");
                    text.push_str(&self.expression(*init));
                }
                text
            }
            NodeKind::DeclGroup { decls } => {
                let mut parts = Vec::new();
                for (position, decl) in decls.iter().enumerate() {
                    if position == 0 {
                        parts.push(self.declaration(*decl));
                        continue;
                    }
                    if let NodeKind::Decl {
                        ty,
                        name,
                        dims,
                        init,
                    } = self.tree.kind(*decl)
                    {
                        let mut text = format!("{}{}", "*".repeat(ty.pointer as usize), name);
                        text.push_str(&self.dims_text(dims));
                        if let Some(init) = init {
                            text.push_str(" = ");
                            text.push_str(&self.expression(*init));
                        }
                        parts.push(text);
                    }
                }
                parts.join(", ")
            }
            _ => self.expression(id),
        }
    }

    fn dims_text(&self, dims: &[Option<NodeId>]) -> String {
        dims.iter()
            .map(|dim| match dim {
                Some(dim) => format!("[{}]", self.expression(*dim)),
                None => "[]".to_string(),
            })
            .collect()
    }

    fn list(&self, items: &[NodeId]) -> String {
        items
            .iter()
            .map(|item| self.expression(*item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn expression(&self, id: NodeId) -> String {
        match self.tree.kind(id) {
            NodeKind::Literal { text, .. } => text.clone(),
            NodeKind::Ident { name } => name.clone(),
            NodeKind::Binary { op, left, right } => format!(
                "{} {} {}",
                self.expression(*left),
                op.as_str(),
                self.expression(*right)
            ),
            NodeKind::Unary { op, operand } => {
                let operand = self.expression(*operand);
                if op.is_postfix() {
                    format!("{}{}", operand, op.as_str())
                } else if matches!(op, UnaryOp::Neg | UnaryOp::Plus | UnaryOp::PreInc | UnaryOp::PreDec)
                    && operand.starts_with(&op.as_str()[..1])
                {
                    format!("{} {}", op.as_str(), operand)
                } else {
                    format!("{}{}", op.as_str(), operand)
                }
            }
            NodeKind::SizeofType { ty } => format!("sizeof({})", type_text(ty)),
            NodeKind::SizeofExpr { operand } => match self.tree.kind(*operand) {
                NodeKind::Paren { .. } => format!("sizeof{}", self.expression(*operand)),
                _ => format!("sizeof {}", self.expression(*operand)),
            },
            NodeKind::Cast { ty, operand } => {
                format!("({}){}", type_text(ty), self.expression(*operand))
            }
            NodeKind::Call { callee, args } => {
                format!("{}({})", self.expression(*callee), self.list(args))
            }
            NodeKind::Subscript { array, index } => {
                format!("{}[{}]", self.expression(*array), self.expression(*index))
            }
            NodeKind::Member {
                object,
                field,
                arrow,
            } => {
                let access = if *arrow { "->" } else { "." };
                format!("{}{}{}", self.expression(*object), access, field)
            }
            NodeKind::Assign { op, target, value } => format!(
                "{} {} {}",
                self.expression(*target),
                op.as_str(),
                self.expression(*value)
            ),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                self.expression(*cond),
                self.expression(*then),
                self.expression(*otherwise)
            ),
            NodeKind::Comma { left, right } => {
                format!("{}, {}", self.expression(*left), self.expression(*right))
            }
            NodeKind::Paren { inner } => format!("({})", self.expression(*inner)),
            NodeKind::InitList { items } => format!("{{{}}}", self.list(items)),
            NodeKind::Opaque { text } => text.clone(),
            NodeKind::Decl { .. } | NodeKind::DeclGroup { .. } => self.declaration(id),
            _ => {
                let mut nested = Printer::new(self.tree);
                nested.statement(id);
                nested.out.trim_end().to_string()
            }
        }
    }
}

/// `char *name` for a declaration or function head.
fn declarator_text(ty: &TypeName, name: &str) -> String {
    format!(
        "{} {}{}",
        base_text(ty),
        "*".repeat(ty.pointer as usize),
        name
    )
}
