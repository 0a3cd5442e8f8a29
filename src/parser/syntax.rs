//! # Syntax Tree
//!
//! @title Arena-Backed C Syntax Tree
//! @author Ramprasad
//!
//! The lowered C syntax tree used by the analyzer. Every node lives in a single
//! arena owned by [`SyntaxTree`] and is addressed by a copyable [`NodeId`], so
//! analyzer state can hold references to nodes without copying them.
//!
//! ## Editing
//!
//! Suggestions are rendered by temporarily editing the tree through a
//! [`Patch`] guard. Dropping the guard restores every replaced node and
//! discards every node allocated while it was alive.

/// Handle to a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source coordinates of a node (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A type as written in a declaration, cast or `sizeof`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeName {
    /// Storage classes and qualifiers written before the type (`static`, `const`).
    pub qualifiers: Vec<String>,

    /// Base type with normalized whitespace (`unsigned int`, `struct node`).
    pub base: String,

    /// Number of pointer levels applied to the base type.
    pub pointer: u8,
}

impl TypeName {
    pub fn named(base: &str) -> Self {
        Self {
            qualifiers: Vec::new(),
            base: base.to_string(),
            pointer: 0,
        }
    }

    /// The type one pointer level down (`char *` -> `char`).
    pub fn pointee(&self) -> Self {
        Self {
            qualifiers: Vec::new(),
            base: self.base.clone(),
            pointer: self.pointer.saturating_sub(1),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// The comparison obtained by swapping operands (`a < b` is `b > a`).
    pub fn flipped(self) -> Self {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Ge => BinaryOp::Le,
            other => other,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

/// Unary operators, prefix and postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

/// Simple and compound assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOp {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Rem,
            "<<=" => AssignOp::Shl,
            ">>=" => AssignOp::Shr,
            "&=" => AssignOp::BitAnd,
            "|=" => AssignOp::BitOr,
            "^=" => AssignOp::BitXor,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    Char,
    String,
}

/// Every construct the lowered tree can hold.
///
/// Anything the analyzer never inspects (typedefs, struct definitions,
/// prototypes, preprocessor lines) is kept verbatim as [`NodeKind::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    TranslationUnit {
        items: Vec<NodeId>,
    },
    FunctionDef {
        ret: TypeName,
        name: String,
        params: Vec<NodeId>,
        variadic: bool,
        body: NodeId,
    },
    /// A single declarator: `char *p = malloc(10)`, `int buf[N]`.
    Decl {
        ty: TypeName,
        name: String,
        dims: Vec<Option<NodeId>>,
        init: Option<NodeId>,
    },
    /// Several declarators sharing one base type: `int i = 0, j = 0`.
    DeclGroup {
        decls: Vec<NodeId>,
    },
    Compound {
        items: Vec<NodeId>,
    },
    ExprStmt {
        expr: Option<NodeId>,
    },
    If {
        cond: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        cond: NodeId,
    },
    Switch {
        cond: NodeId,
        body: NodeId,
    },
    /// `case value:` or `default:` (no value) followed by its statements.
    Case {
        value: Option<NodeId>,
        body: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
    Goto {
        label: String,
    },
    Labeled {
        label: String,
        body: NodeId,
    },
    Literal {
        kind: LiteralKind,
        text: String,
    },
    Ident {
        name: String,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    SizeofType {
        ty: TypeName,
    },
    SizeofExpr {
        operand: NodeId,
    },
    Cast {
        ty: TypeName,
        operand: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Subscript {
        array: NodeId,
        index: NodeId,
    },
    Member {
        object: NodeId,
        field: String,
        arrow: bool,
    },
    Assign {
        op: AssignOp,
        target: NodeId,
        value: NodeId,
    },
    Conditional {
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    Comma {
        left: NodeId,
        right: NodeId,
    },
    Paren {
        inner: NodeId,
    },
    InitList {
        items: Vec<NodeId>,
    },
    Opaque {
        text: String,
    },
}

impl NodeKind {
    /// An integer literal node kind.
    pub fn int(value: i64) -> Self {
        NodeKind::Literal {
            kind: LiteralKind::Int,
            text: value.to_string(),
        }
    }

    pub fn ident(name: &str) -> Self {
        NodeKind::Ident {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// Arena holding one lowered translation unit.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its handle.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles of every node, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Skips parentheses and casts: `(char *)(malloc(10))` -> `malloc(10)`.
    pub fn strip(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.kind(id) {
                NodeKind::Paren { inner } => id = *inner,
                NodeKind::Cast { operand, .. } => id = *operand,
                _ => return id,
            }
        }
    }

    /// Skips parentheses only.
    pub fn strip_parens(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Paren { inner } = self.kind(id) {
            id = *inner;
        }
        id
    }

    /// Name of an identifier node, looking through parentheses and casts.
    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(self.strip(id)) {
            NodeKind::Ident { name } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Callee name and arguments of a direct call such as `memcpy(a, b, n)`.
    pub fn call_parts(&self, id: NodeId) -> Option<(&str, &[NodeId])> {
        match self.kind(self.strip(id)) {
            NodeKind::Call { callee, args } => {
                self.ident_name(*callee).map(|name| (name, args.as_slice()))
            }
            _ => None,
        }
    }

    /// Starts a reversible edit session; see [`Patch`].
    pub fn patch(&mut self) -> Patch<'_> {
        let watermark = self.nodes.len();
        Patch {
            tree: self,
            saved: Vec::new(),
            watermark,
        }
    }
}

/// Scoped edit session over a [`SyntaxTree`].
///
/// Replacements and temporary nodes are undone when the guard is dropped,
/// on every exit path.
pub struct Patch<'t> {
    tree: &'t mut SyntaxTree,
    saved: Vec<(NodeId, NodeKind)>,
    watermark: usize,
}

impl<'t> Patch<'t> {
    pub fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    /// Overwrites the kind of an existing node until the patch is dropped.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        let previous = std::mem::replace(&mut self.tree.nodes[id.index()].kind, kind);
        self.saved.push((id, previous));
    }

    /// Allocates a temporary node that disappears with the patch.
    pub fn insert(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.tree.push(kind, span)
    }
}

impl Drop for Patch<'_> {
    fn drop(&mut self) {
        while let Some((id, kind)) = self.saved.pop() {
            self.tree.nodes[id.index()].kind = kind;
        }
        self.tree.nodes.truncate(self.watermark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_tree() -> (SyntaxTree, NodeId) {
        let mut tree = SyntaxTree::new();
        let lit = tree.push(NodeKind::int(10), Span::new(1, 1));
        (tree, lit)
    }

    #[test]
    fn test_patch_restores_on_drop() {
        let (mut tree, lit) = literal_tree();
        {
            let mut patch = tree.patch();
            patch.replace(lit, NodeKind::int(11));
            let extra = patch.insert(NodeKind::ident("stdin"), Span::default());
            assert_eq!(patch.tree().kind(lit), &NodeKind::int(11));
            assert_eq!(patch.tree().len(), 2);
            assert_eq!(extra.index(), 1);
        }
        assert_eq!(tree.kind(lit), &NodeKind::int(10));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_repeated_replacement_restores_original() {
        let (mut tree, lit) = literal_tree();
        {
            let mut patch = tree.patch();
            patch.replace(lit, NodeKind::int(1));
            patch.replace(lit, NodeKind::int(2));
        }
        assert_eq!(tree.kind(lit), &NodeKind::int(10));
    }

    #[test]
    fn test_strip_skips_parens_and_casts() {
        let mut tree = SyntaxTree::new();
        let call = tree.push(NodeKind::ident("buf"), Span::default());
        let cast = tree.push(
            NodeKind::Cast {
                ty: TypeName::named("char"),
                operand: call,
            },
            Span::default(),
        );
        let paren = tree.push(NodeKind::Paren { inner: cast }, Span::default());
        assert_eq!(tree.strip(paren), call);
        assert_eq!(tree.strip_parens(paren), cast);
        assert_eq!(tree.ident_name(paren), Some("buf"));
    }

    #[test]
    fn test_comparison_flip() {
        assert_eq!(BinaryOp::Lt.flipped(), BinaryOp::Gt);
        assert_eq!(BinaryOp::Ge.flipped(), BinaryOp::Le);
        assert_eq!(BinaryOp::Add.flipped(), BinaryOp::Add);
        assert_eq!(BinaryOp::from_token("<="), Some(BinaryOp::Le));
        assert_eq!(AssignOp::from_token("+="), Some(AssignOp::Add));
    }
}
