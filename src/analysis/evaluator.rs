//! # Expression Evaluator
//!
//! @title Symbolic Constant Folding
//! @author Ramprasad
//!
//! Reduces an expression node to an integer under the current scope
//! environment. Anything that cannot be resolved (parameters, unmodeled
//! calls, cyclic bindings, overflow) folds to [`Value::Unknown`], which
//! propagates through every operator instead of aborting the traversal.

use super::allocation::SizeRef;
use super::scope::{ArrayBinding, ScopeStack, VarValue};
use super::sizeof::{type_width, width_of};
use crate::parser::{BinaryOp, LiteralKind, NodeId, NodeKind, SyntaxTree, UnaryOp};
use crate::report::Diagnostic;

/// Result of folding an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Known(i64),
    Unknown,
}

impl Value {
    pub fn known(self) -> Option<i64> {
        match self {
            Value::Known(value) => Some(value),
            Value::Unknown => None,
        }
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Value::Unknown, Value::Known)
    }
}

/// Folds expressions against a [`ScopeStack`].
///
/// Notes raised while folding (unmapped `sizeof` types, division by zero,
/// cyclic bindings) are collected and handed back by [`Evaluator::into_notes`].
pub struct Evaluator<'a> {
    tree: &'a SyntaxTree,
    scopes: &'a ScopeStack,
    max_depth: usize,
    depth: usize,
    resolving: Vec<String>,
    notes: Vec<Diagnostic>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tree: &'a SyntaxTree, scopes: &'a ScopeStack, max_depth: usize) -> Self {
        Self {
            tree,
            scopes,
            max_depth,
            depth: 0,
            resolving: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    pub fn scopes(&self) -> &'a ScopeStack {
        self.scopes
    }

    pub fn into_notes(self) -> Vec<Diagnostic> {
        self.notes
    }

    fn note(&mut self, id: NodeId, message: String) {
        log::debug!("line {}: {}", self.tree.span(id).line, message);
        self.notes
            .push(Diagnostic::note(self.tree.span(id).line, message));
    }

    /// Capacity of a tracked buffer in bytes.
    pub fn array_bytes(&mut self, binding: &ArrayBinding) -> Value {
        let units = match binding.size {
            SizeRef::Node(size) => self.evaluate(size),
            SizeRef::Implicit { count, .. } => Value::Known(count),
            SizeRef::Unknown => Value::Unknown,
        };
        match units {
            Value::Known(units) => units.checked_mul(binding.multiplier).into(),
            Value::Unknown => Value::Unknown,
        }
    }

    /// Capacity of a tracked buffer in elements.
    pub fn array_elements(&mut self, binding: &ArrayBinding) -> Value {
        match self.array_bytes(binding) {
            Value::Known(bytes) if binding.element_width > 0 => {
                Value::Known(bytes / binding.element_width)
            }
            _ => Value::Unknown,
        }
    }

    /// Folds `id` to an integer.
    pub fn evaluate(&mut self, id: NodeId) -> Value {
        if self.depth >= self.max_depth {
            self.note(id, "Expression nesting exceeds the evaluation limit".to_string());
            return Value::Unknown;
        }
        self.depth += 1;
        let value = self.evaluate_kind(id);
        self.depth -= 1;
        value
    }

    fn evaluate_kind(&mut self, id: NodeId) -> Value {
        let tree = self.tree;
        let scopes = self.scopes;
        match tree.kind(id) {
            NodeKind::Literal {
                kind: LiteralKind::Int,
                text,
            } => parse_int_literal(text).into(),
            NodeKind::Literal {
                kind: LiteralKind::Char,
                text,
            } => parse_char_literal(text).into(),
            NodeKind::Literal { .. } => Value::Unknown,
            NodeKind::Ident { name } => self.identifier(name),
            NodeKind::Paren { inner } => self.evaluate(*inner),
            NodeKind::Cast { operand, .. } => self.evaluate(*operand),
            NodeKind::Unary { op, operand } => {
                let value = self.evaluate(*operand);
                let Value::Known(value) = value else {
                    return Value::Unknown;
                };
                match op {
                    UnaryOp::Neg => value.checked_neg().into(),
                    UnaryOp::Plus | UnaryOp::AddrOf => Value::Known(value),
                    UnaryOp::BitNot => Value::Known(!value),
                    UnaryOp::Not => Value::Known((value == 0) as i64),
                    _ => Value::Unknown,
                }
            }
            NodeKind::SizeofType { ty } => {
                if ty.pointer == 0 && ty.qualifiers.is_empty() {
                    if let Some(binding) = scopes.array(&ty.base) {
                        return self.array_bytes(binding);
                    }
                }
                match type_width(ty) {
                    Some(width) => Value::Known(width),
                    None => self.sizeof_fallback(id, &ty.base),
                }
            }
            NodeKind::SizeofExpr { operand } => self.sizeof_expression(id, *operand),
            NodeKind::Call { .. } => self.call(id),
            NodeKind::Binary { op, left, right } => {
                let left = self.evaluate(*left);
                let right = self.evaluate(*right);
                self.binary(id, *op, left, right)
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => match self.evaluate(*cond) {
                Value::Known(0) => self.evaluate(*otherwise),
                Value::Known(_) => self.evaluate(*then),
                Value::Unknown => Value::Unknown,
            },
            NodeKind::Comma { right, .. } => self.evaluate(*right),
            _ => Value::Unknown,
        }
    }

    fn identifier(&mut self, name: &str) -> Value {
        let Some(binding) = self.scopes.variable(name) else {
            return self.scopes.constant(name).into();
        };
        let VarValue::Expr(expr) = binding.value else {
            return Value::Unknown;
        };
        if self.resolving.iter().any(|pending| pending == name) {
            self.note(
                expr,
                format!("Value of `{}` depends on itself, treating it as unknown", name),
            );
            return Value::Unknown;
        }
        self.resolving.push(name.to_string());
        let value = self.evaluate(expr);
        self.resolving.pop();
        value
    }

    fn sizeof_fallback(&mut self, id: NodeId, type_name: &str) -> Value {
        log::info!("sizeof({}) not implemented, defaulting to 1", type_name);
        self.note(
            id,
            format!("sizeof({}) not implemented, defaulting to 1", type_name),
        );
        Value::Known(1)
    }

    fn sizeof_expression(&mut self, id: NodeId, operand: NodeId) -> Value {
        let tree = self.tree;
        let scopes = self.scopes;
        let inner = tree.strip_parens(operand);
        match tree.kind(inner) {
            NodeKind::Literal {
                kind: LiteralKind::String,
                text,
            } => string_literal_length(text)
                .and_then(|length| length.checked_add(1))
                .into(),
            NodeKind::Ident { name } => {
                if let Some(binding) = scopes.array(name) {
                    return self.array_bytes(binding);
                }
                if scopes.is_bound(name) {
                    return scopes
                        .variable(name)
                        .and_then(|binding| binding.width)
                        .into();
                }
                // `sizeof(T)` with a typedef name parses as an expression.
                match width_of(name) {
                    Some(width) => Value::Known(width),
                    None => self.sizeof_fallback(id, name),
                }
            }
            _ => Value::Unknown,
        }
    }

    fn call(&mut self, id: NodeId) -> Value {
        let tree = self.tree;
        let Some((callee, args)) = tree.call_parts(id) else {
            return Value::Unknown;
        };
        if !matches!(callee, "strlen" | "wcslen") || args.len() != 1 {
            return Value::Unknown;
        }
        let argument = tree.strip(args[0]);
        match tree.kind(argument) {
            NodeKind::Literal {
                kind: LiteralKind::String,
                text,
            } => string_literal_length(text).into(),
            NodeKind::Ident { name } => {
                let literal = self
                    .scopes
                    .variable(name)
                    .and_then(|binding| match binding.value {
                        VarValue::Expr(expr) => Some(tree.strip(expr)),
                        VarValue::Unknown => None,
                    })
                    .and_then(|expr| match tree.kind(expr) {
                        NodeKind::Literal {
                            kind: LiteralKind::String,
                            text,
                        } => string_literal_length(text),
                        _ => None,
                    });
                match literal {
                    Some(length) => Value::Known(length),
                    None if self.scopes.is_bound(name) => Value::Known(0),
                    None => Value::Unknown,
                }
            }
            _ => Value::Unknown,
        }
    }

    fn binary(&mut self, id: NodeId, op: BinaryOp, left: Value, right: Value) -> Value {
        let (Value::Known(left), Value::Known(right)) = (left, right) else {
            return Value::Unknown;
        };
        let result = match op {
            BinaryOp::Add => left.checked_add(right),
            BinaryOp::Sub => left.checked_sub(right),
            BinaryOp::Mul => left.checked_mul(right),
            BinaryOp::Div | BinaryOp::Rem if right == 0 => {
                self.note(id, "Division by zero in constant expression".to_string());
                return Value::Unknown;
            }
            BinaryOp::Div => left.checked_div(right),
            BinaryOp::Rem => left.checked_rem(right),
            BinaryOp::Shl => u32::try_from(right).ok().and_then(|shift| left.checked_shl(shift)),
            BinaryOp::Shr => u32::try_from(right).ok().and_then(|shift| left.checked_shr(shift)),
            BinaryOp::Lt => Some((left < right) as i64),
            BinaryOp::Le => Some((left <= right) as i64),
            BinaryOp::Gt => Some((left > right) as i64),
            BinaryOp::Ge => Some((left >= right) as i64),
            BinaryOp::Eq => Some((left == right) as i64),
            BinaryOp::Ne => Some((left != right) as i64),
            BinaryOp::BitAnd => Some(left & right),
            BinaryOp::BitOr => Some(left | right),
            BinaryOp::BitXor => Some(left ^ right),
            BinaryOp::And => Some((left != 0 && right != 0) as i64),
            BinaryOp::Or => Some((left != 0 || right != 0) as i64),
        };
        if result.is_none() {
            self.note(id, "Arithmetic overflow in constant expression".to_string());
        }
        result.into()
    }
}

/// Parses a C integer literal: decimal, hex, octal or binary with `u`/`l` suffixes.
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let digits = text
        .trim_end_matches(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L'))
        .replace('\'', "");
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(binary) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        i64::from_str_radix(binary, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

/// Reads one escape sequence after a backslash, returning its code point.
fn read_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<i64> {
    let escaped = chars.next()?;
    let value = match escaped {
        'n' => 10,
        't' => 9,
        'r' => 13,
        'a' => 7,
        'b' => 8,
        'f' => 12,
        'v' => 11,
        'x' => {
            let mut value = 0i64;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(16)) {
                value = value.checked_mul(16)?.checked_add(digit as i64)?;
                chars.next();
            }
            value
        }
        '0'..='7' => {
            let mut value = escaped.to_digit(8)? as i64;
            for _ in 0..2 {
                match chars.peek().and_then(|c| c.to_digit(8)) {
                    Some(digit) => {
                        value = value * 8 + digit as i64;
                        chars.next();
                    }
                    None => break,
                }
            }
            value
        }
        other => other as i64,
    };
    Some(value)
}

/// Code point of a character literal such as `'a'` or `'\n'`.
pub fn parse_char_literal(text: &str) -> Option<i64> {
    let start = text.find('\'')?;
    let mut chars = text[start + 1..].chars().peekable();
    match chars.next()? {
        '\\' => read_escape(&mut chars),
        '\'' => None,
        c => Some(c as i64),
    }
}

/// Number of characters in a string literal, excluding the terminator.
///
/// Adjacent literals (`"ab" "cd"`) are counted together.
pub fn string_literal_length(text: &str) -> Option<i64> {
    let mut chars = text.chars().peekable();
    let mut inside = false;
    let mut length = 0i64;
    let mut segments = 0;

    while let Some(c) = chars.next() {
        match (inside, c) {
            (false, '"') => {
                inside = true;
                segments += 1;
            }
            (false, _) => {}
            (true, '"') => inside = false,
            (true, '\\') => {
                read_escape(&mut chars)?;
                length += 1;
            }
            (true, _) => length += 1,
        }
    }

    (segments > 0 && !inside).then_some(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, NodeKind, SyntaxTree};

    #[test]
    fn test_int_literal_forms() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("0"), Some(0));
        assert_eq!(parse_int_literal("100UL"), Some(100));
        assert_eq!(parse_int_literal("1.5"), None);
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(parse_char_literal("'a'"), Some(97));
        assert_eq!(parse_char_literal("'\\n'"), Some(10));
        assert_eq!(parse_char_literal("'\\0'"), Some(0));
        assert_eq!(parse_char_literal("L'A'"), Some(65));
    }

    #[test]
    fn test_string_lengths() {
        assert_eq!(string_literal_length("\"hello\""), Some(5));
        assert_eq!(string_literal_length("\"a\\nb\""), Some(3));
        assert_eq!(string_literal_length("\"ab\" \"cd\""), Some(4));
        assert_eq!(string_literal_length("L\"wide\""), Some(4));
        assert_eq!(string_literal_length("\"\""), Some(0));
    }

    /// Returns the initializer of the `n`-th declaration in the first function.
    fn initializer(tree: &SyntaxTree, n: usize) -> NodeId {
        let root = tree.root().unwrap();
        let NodeKind::TranslationUnit { items } = tree.kind(root) else {
            panic!("expected translation unit");
        };
        let NodeKind::FunctionDef { body, .. } = tree.kind(items[0]) else {
            panic!("expected function");
        };
        let NodeKind::Compound { items } = tree.kind(*body) else {
            panic!("expected body");
        };
        match tree.kind(items[n]) {
            NodeKind::Decl { init: Some(init), .. } => *init,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn fold(source: &str, n: usize, bind: &[(&str, usize)]) -> (Value, Vec<Diagnostic>) {
        let unit = parse_source("t.c", source.to_string()).unwrap();
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        for (name, index) in bind {
            let value = VarValue::Expr(initializer(&unit.tree, *index));
            scopes.declare_variable(name, value, Some(4));
        }
        let target = initializer(&unit.tree, n);
        let mut evaluator = Evaluator::new(&unit.tree, &scopes, 64);
        let value = evaluator.evaluate(target);
        (value, evaluator.into_notes())
    }

    #[test]
    fn test_folds_arithmetic_through_variables() {
        let source = "void f(void) { int n = 4; int m = (n + 2) * 3 - 10 / 5; }";
        let (value, notes) = fold(source, 1, &[("n", 0)]);
        assert_eq!(value, Value::Known(16));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_unbound_identifier_is_unknown() {
        let source = "void f(void) { int m = len * 2; }";
        assert_eq!(fold(source, 0, &[]).0, Value::Unknown);
    }

    #[test]
    fn test_division_by_zero_is_unknown_with_note() {
        let source = "void f(void) { int m = 10 / 0; }";
        let (value, notes) = fold(source, 0, &[]);
        assert_eq!(value, Value::Unknown);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("Division by zero"));
    }

    #[test]
    fn test_sizeof_fallback_for_unmapped_type() {
        let source = "void f(void) { int m = sizeof(struct record) * 3; }";
        let (value, notes) = fold(source, 0, &[]);
        assert_eq!(value, Value::Known(3));
        assert!(notes[0].message.contains("defaulting to 1"));
    }

    #[test]
    fn test_define_constant_resolves() {
        let unit = parse_source("t.c", "void f(void) { int m = SIZE - 1; }".to_string()).unwrap();
        let mut scopes = ScopeStack::new();
        scopes.define_constant("SIZE", 32);
        scopes.enter_function();
        let target = initializer(&unit.tree, 0);
        let mut evaluator = Evaluator::new(&unit.tree, &scopes, 64);
        assert_eq!(evaluator.evaluate(target), Value::Known(31));
    }

    #[test]
    fn test_strlen_of_literal_variable() {
        let source = "void f(void) { char *s = \"hello\"; int m = strlen(s) + 1; }";
        assert_eq!(fold(source, 1, &[("s", 0)]).0, Value::Known(6));
    }

    #[test]
    fn test_cyclic_binding_is_unknown() {
        let source = "void f(void) { int i = i + 1; int m = i; }";
        let (value, notes) = fold(source, 1, &[("i", 0)]);
        assert_eq!(value, Value::Unknown);
        assert!(notes[0].message.contains("depends on itself"));
    }
}
