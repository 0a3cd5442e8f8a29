//! # Buffer-Overflow Analyzer
//!
//! @title Scope-Aware Tree Walk
//! @author Ramprasad
//!
//! Walks a lowered translation unit once, depth-first and in source order.
//! Declarations, assignments, loops and conditionals update the
//! [`ScopeStack`]; every subscript and call is handed to the
//! [`CheckerRegistry`], and each resulting proposal is rendered by the
//! suggestion generator.
//!
//! ## Algorithm
//!
//! 1. Collect object-like `#define`s and file-level `const` scalars.
//! 2. For each function: reset the scopes, seed parameters as unknown.
//! 3. Statements push frames (block, loop, branch) and pop them on exit.
//! 4. Loop headers register an induction-variable range for the body.
//! 5. `if` conditions register per-variable bounds for the `then` branch.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut unit = parse_source("demo.c", source)?;
//! let analysis = BufferOverflowAnalyzer::new(AnalyzerConfig::default()).analyze(&mut unit.tree);
//! for suggestion in &analysis.suggestions {
//!     println!("{}", suggestion.description);
//! }
//! ```

use super::allocation::{from_declaration, from_initializer, is_allocation, Allocation};
use super::evaluator::{parse_int_literal, Evaluator, Value};
use super::scope::{
    ArrayBinding, BoundRewrite, FrameKind, LoopEntry, LoopRange, ScopeStack, VarValue,
    VariableConstraint,
};
use super::sizeof::type_width;
use super::suggestion::{emit, FunctionFrame};
use super::SizeRef;
use crate::config::AnalyzerConfig;
use crate::detectors::{CheckContext, CheckerRegistry, Site};
use crate::parser::{AssignOp, BinaryOp, NodeId, NodeKind, SyntaxTree, TypeName, UnaryOp};
use crate::report::{Diagnostic, Suggestion};
use regex::Regex;
use std::sync::OnceLock;

/// Output of one analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Suggestions in traversal (source) order.
    pub suggestions: Vec<Suggestion>,
    pub diagnostics: Vec<Diagnostic>,
}

fn define_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#\s*define\s+([A-Za-z_]\w*)\s+\(*\s*([0-9][0-9A-Za-z']*)\s*\)*\s*$")
            .expect("define pattern is valid")
    })
}

/// Induction variable, start value and comparison taken from a loop header.
struct Header {
    var: String,
    start: Option<NodeId>,
    condition: NodeId,
    op: BinaryOp,
    bound: NodeId,
    var_on_left: bool,
}

/// Tree visitor that drives scope tracking and checks.
pub struct BufferOverflowAnalyzer {
    config: AnalyzerConfig,
    registry: CheckerRegistry,
    scopes: ScopeStack,
    function: Option<FunctionFrame>,
    statement: Option<NodeId>,
    analysis: Analysis,
}

impl BufferOverflowAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            registry: CheckerRegistry::new(),
            scopes: ScopeStack::new(),
            function: None,
            statement: None,
            analysis: Analysis::default(),
        }
    }

    /// Analyzes every function of a translation unit.
    ///
    /// # Arguments
    ///
    /// * `tree` - The lowered unit; edits made while rendering suggestions
    ///   are reverted before this returns
    ///
    /// # Returns
    ///
    /// Suggestions in source order plus the diagnostics raised on the way.
    pub fn analyze(mut self, tree: &mut SyntaxTree) -> Analysis {
        let Some(root) = tree.root() else {
            return self.analysis;
        };
        self.collect_constants(tree);

        let items = match tree.kind(root) {
            NodeKind::TranslationUnit { items } => items.clone(),
            _ => vec![root],
        };
        for item in items {
            if matches!(tree.kind(item), NodeKind::FunctionDef { .. }) {
                self.visit_function(tree, item);
            }
        }

        log::debug!(
            "Analysis produced {} suggestion(s) and {} diagnostic(s)",
            self.analysis.suggestions.len(),
            self.analysis.diagnostics.len()
        );
        self.analysis
    }

    fn record(&mut self, notes: Vec<Diagnostic>) {
        for note in notes {
            let note = match &self.function {
                Some(function) => note.in_function(&function.name),
                None => note,
            };
            if !self.analysis.diagnostics.contains(&note) {
                self.analysis.diagnostics.push(note);
            }
        }
    }

    fn note(&mut self, tree: &SyntaxTree, id: NodeId, message: String) {
        log::debug!("line {}: {}", tree.span(id).line, message);
        self.record(vec![Diagnostic::note(tree.span(id).line, message)]);
    }

    fn warn(&mut self, tree: &SyntaxTree, id: NodeId, message: String) {
        log::debug!("line {}: {}", tree.span(id).line, message);
        self.record(vec![Diagnostic::warning(tree.span(id).line, message)]);
    }

    fn with_evaluator<T>(
        &mut self,
        tree: &SyntaxTree,
        run: impl FnOnce(&mut Evaluator<'_>) -> T,
    ) -> T {
        let mut evaluator = Evaluator::new(tree, &self.scopes, self.config.max_evaluation_depth);
        let result = run(&mut evaluator);
        let notes = evaluator.into_notes();
        self.record(notes);
        result
    }

    fn evaluate(&mut self, tree: &SyntaxTree, id: NodeId) -> Value {
        self.with_evaluator(tree, |evaluator| evaluator.evaluate(id))
    }

    /// Object-like integer `#define`s and file-level `const` scalars.
    fn collect_constants(&mut self, tree: &SyntaxTree) {
        for id in tree.ids() {
            let NodeKind::Opaque { text } = tree.kind(id) else {
                continue;
            };
            let Some(captures) = define_pattern().captures(text.trim()) else {
                continue;
            };
            if let Some(value) = parse_int_literal(&captures[2]) {
                log::debug!("#define {} = {}", &captures[1], value);
                self.scopes.define_constant(&captures[1], value);
            }
        }

        let Some(NodeKind::TranslationUnit { items }) = tree.root().map(|root| tree.kind(root))
        else {
            return;
        };
        for item in items {
            if let NodeKind::Decl {
                ty,
                name,
                dims,
                init: Some(init),
            } = tree.kind(*item)
            {
                if ty.pointer == 0 && dims.is_empty() && ty.qualifiers.iter().any(|q| q == "const")
                {
                    if let Value::Known(value) = self.evaluate(tree, *init) {
                        self.scopes.define_constant(name, value);
                    }
                }
            }
        }
    }

    fn visit_function(&mut self, tree: &mut SyntaxTree, id: NodeId) {
        let NodeKind::FunctionDef {
            name, params, body, ..
        } = tree.kind(id).clone()
        else {
            return;
        };
        log::debug!("Analyzing function {}()", name);

        self.scopes.enter_function();
        self.function = Some(FunctionFrame {
            id,
            name,
            line: tree.span(id).line,
        });

        for param in params {
            if let NodeKind::Decl { ty, name, dims, .. } = tree.kind(param) {
                if ty.pointer > 0 || !dims.is_empty() {
                    self.scopes.declare_array(ArrayBinding {
                        name: name.clone(),
                        size: SizeRef::Unknown,
                        multiplier: 1,
                        element_width: element_width(ty, dims.is_empty()),
                    });
                }
                self.scopes
                    .declare_variable(name, VarValue::Unknown, type_width(ty));
            }
        }

        self.visit_statement(tree, body);
        self.function = None;
        self.statement = None;
    }

    fn visit_statement(&mut self, tree: &mut SyntaxTree, id: NodeId) {
        match tree.kind(id).clone() {
            NodeKind::Compound { items } => {
                self.scopes.push(FrameKind::Block);
                for item in items {
                    self.visit_statement(tree, item);
                }
                self.scopes.pop();
            }
            NodeKind::Decl { .. } => self.visit_declaration(tree, id),
            NodeKind::DeclGroup { decls } => {
                for decl in decls {
                    self.visit_declaration(tree, decl);
                }
            }
            NodeKind::ExprStmt { expr: Some(expr) } | NodeKind::Return { value: Some(expr) } => {
                self.statement = Some(id);
                self.visit_expression(tree, expr);
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.statement = Some(id);
                self.visit_expression(tree, cond);

                self.scopes.push(FrameKind::Branch);
                self.apply_condition(tree, cond);
                self.visit_statement(tree, then);
                self.scopes.pop();

                if let Some(otherwise) = otherwise {
                    self.scopes.push(FrameKind::Branch);
                    self.visit_statement(tree, otherwise);
                    self.scopes.pop();
                }
            }
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.scopes.push(FrameKind::Loop);
                self.statement = Some(id);
                if let Some(init) = init {
                    if matches!(
                        tree.kind(init),
                        NodeKind::Decl { .. } | NodeKind::DeclGroup { .. }
                    ) {
                        self.visit_statement(tree, init);
                    } else {
                        self.visit_expression(tree, init);
                    }
                }
                if let Some(cond) = cond {
                    if let Some(header) = for_header(tree, init, cond) {
                        self.register_loop(tree, header);
                    }
                    self.statement = Some(id);
                    self.visit_expression(tree, cond);
                }
                if let Some(step) = step {
                    self.statement = Some(id);
                    self.visit_expression(tree, step);
                }
                self.visit_statement(tree, body);
                self.scopes.pop();
            }
            NodeKind::While { cond, body } => {
                self.statement = Some(id);
                self.visit_expression(tree, cond);
                self.scopes.push(FrameKind::Loop);
                if let Some(header) = self.while_header(tree, cond) {
                    self.register_loop(tree, header);
                }
                self.visit_statement(tree, body);
                self.scopes.pop();
            }
            NodeKind::DoWhile { body, cond } => {
                self.scopes.push(FrameKind::Loop);
                if let Some(header) = self.while_header(tree, cond) {
                    self.register_loop(tree, header);
                }
                self.visit_statement(tree, body);
                self.statement = Some(id);
                self.visit_expression(tree, cond);
                self.scopes.pop();
            }
            NodeKind::Switch { cond, body } => {
                self.statement = Some(id);
                self.visit_expression(tree, cond);
                self.scopes.push(FrameKind::Branch);
                self.visit_statement(tree, body);
                self.scopes.pop();
            }
            NodeKind::Case { body, .. } => {
                for item in body {
                    self.visit_statement(tree, item);
                }
            }
            NodeKind::Labeled { body, .. } => self.visit_statement(tree, body),
            _ => {}
        }
    }

    fn visit_declaration(&mut self, tree: &mut SyntaxTree, decl: NodeId) {
        let NodeKind::Decl {
            ty,
            name,
            dims,
            init,
        } = tree.kind(decl).clone()
        else {
            return;
        };
        self.statement = Some(decl);
        for dim in dims.iter().flatten() {
            self.visit_expression(tree, *dim);
        }
        if let Some(init) = init {
            self.visit_expression(tree, init);
        }

        let allocation = self.with_evaluator(tree, |evaluator| from_declaration(evaluator, decl));
        match allocation {
            Some(allocation) => {
                self.scopes.declare_array(ArrayBinding {
                    name: name.clone(),
                    size: allocation.size,
                    multiplier: allocation.multiplier,
                    element_width: element_width(&ty, dims.is_empty()),
                });
                let value = match (dims.is_empty(), init) {
                    (true, Some(init)) => VarValue::Expr(init),
                    _ => VarValue::Unknown,
                };
                self.scopes.declare_variable(&name, value, type_width(&ty));
            }
            None if dims.is_empty() => {
                let value = init.map_or(VarValue::Unknown, VarValue::Expr);
                self.scopes.declare_variable(&name, value, type_width(&ty));
            }
            None => self.scopes.declare_variable(&name, VarValue::Unknown, None),
        }
    }

    fn visit_expression(&mut self, tree: &mut SyntaxTree, id: NodeId) {
        match tree.kind(id).clone() {
            NodeKind::Subscript { array, index } => {
                self.visit_expression(tree, array);
                self.visit_expression(tree, index);
                self.check(tree, Site::Subscript(id));
            }
            NodeKind::Call { args, .. } => {
                for arg in args {
                    self.visit_expression(tree, arg);
                }
                self.check(tree, Site::Call(id));
            }
            NodeKind::Assign { op, target, value } => {
                self.visit_expression(tree, value);
                self.visit_expression(tree, target);
                self.assign(tree, op, target, value);
            }
            NodeKind::Unary { op, operand } => {
                self.visit_expression(tree, operand);
                if matches!(
                    op,
                    UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
                ) {
                    self.invalidate(tree, operand);
                }
            }
            NodeKind::Binary { left, right, .. } | NodeKind::Comma { left, right } => {
                self.visit_expression(tree, left);
                self.visit_expression(tree, right);
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.visit_expression(tree, cond);
                self.visit_expression(tree, then);
                self.visit_expression(tree, otherwise);
            }
            NodeKind::Cast { operand, .. } => self.visit_expression(tree, operand),
            NodeKind::Paren { inner } => self.visit_expression(tree, inner),
            NodeKind::Member { object, .. } => self.visit_expression(tree, object),
            NodeKind::InitList { items } => {
                for item in items {
                    self.visit_expression(tree, item);
                }
            }
            _ => {}
        }
    }

    /// Runs the checkers at one site and renders their proposals.
    fn check(&mut self, tree: &mut SyntaxTree, site: Site) {
        let Some(function) = self.function.clone() else {
            return;
        };
        let (proposals, notes) = {
            let mut context = CheckContext::new(tree, &self.scopes, &self.config, self.statement);
            let proposals = self.registry.run(site, &mut context);
            (proposals, context.into_notes())
        };
        self.record(notes);

        for proposal in proposals {
            let suggestion = emit(tree, &function, &proposal);
            self.analysis.suggestions.push(suggestion);
        }
    }

    fn assign(&mut self, tree: &SyntaxTree, op: AssignOp, target: NodeId, value: NodeId) {
        let Some(name) = tree.ident_name(target).map(str::to_string) else {
            return;
        };
        if op != AssignOp::Assign {
            self.invalidate(tree, target);
            return;
        }

        let tracked = self.scopes.array(&name).cloned();
        let reseats = tracked.is_some()
            || self.with_evaluator(tree, |evaluator| is_allocation(evaluator, value))
            || tree
                .ident_name(value)
                .map_or(false, |source| self.scopes.array(source).is_some());
        if reseats {
            let Allocation { size, multiplier } =
                self.with_evaluator(tree, |evaluator| from_initializer(evaluator, value));
            let element_width = tracked
                .map(|binding| binding.element_width)
                .or_else(|| {
                    tree.ident_name(value)
                        .and_then(|source| self.scopes.array(source))
                        .map(|binding| binding.element_width)
                })
                .unwrap_or(1);
            log::debug!("`{}` now refers to a buffer of {:?}", name, size);
            self.scopes.assign_array(ArrayBinding {
                name: name.clone(),
                size,
                multiplier,
                element_width,
            });
        }
        self.scopes.assign_variable(&name, VarValue::Expr(value));
    }

    /// Forgets what is known about a name after `++`, `--` or `op=`.
    fn invalidate(&mut self, tree: &SyntaxTree, target: NodeId) {
        let Some(name) = tree.ident_name(target) else {
            return;
        };
        if let Some(binding) = self.scopes.array(name).cloned() {
            // Pointer arithmetic moves the base, so the capacity is lost.
            self.scopes.assign_array(ArrayBinding {
                size: SizeRef::Unknown,
                ..binding
            });
        }
        if self.scopes.is_bound(name) {
            self.scopes.assign_variable(name, VarValue::Unknown);
        }
    }

    /// Records bounds implied by an `if` condition in the current frame.
    fn apply_condition(&mut self, tree: &SyntaxTree, cond: NodeId) {
        let cond = tree.strip_parens(cond);
        let NodeKind::Binary { op, left, right } = tree.kind(cond) else {
            return;
        };
        match op {
            BinaryOp::And => {
                self.apply_condition(tree, *left);
                self.apply_condition(tree, *right);
            }
            BinaryOp::Or => self.note(
                tree,
                cond,
                "Disjunctive condition is not converted to index constraints".to_string(),
            ),
            op if op.is_comparison() => {
                let (name, op, other) = match (tree.ident_name(*left), tree.ident_name(*right)) {
                    (Some(name), _) if self.scopes.constant(name).is_none() => (name, *op, *right),
                    (_, Some(name)) => (name, op.flipped(), *left),
                    _ => return,
                };
                if let Value::Known(value) = self.evaluate(tree, other) {
                    if let Some(constraint) = VariableConstraint::from_comparison(name, op, value) {
                        log::debug!("Constraint on `{}`: {:?}", name, constraint);
                        self.scopes.constrain(constraint);
                    }
                }
            }
            _ => {}
        }
    }

    /// Header of a `while`/`do` loop: the start value is the variable's
    /// current binding.
    fn while_header(&self, tree: &SyntaxTree, cond: NodeId) -> Option<Header> {
        let scopes = &self.scopes;
        let mut header = comparison_header(tree, cond, &|name: &str| {
            scopes.variable(name).is_some() && scopes.array(name).is_none()
        })?;
        header.start = match self.scopes.variable(&header.var)?.value {
            VarValue::Expr(expr) => Some(expr),
            VarValue::Unknown => None,
        };
        Some(header)
    }

    fn register_loop(&mut self, tree: &SyntaxTree, header: Header) {
        // Only a live entry conflicts. A finished loop's range left with its
        // frame, so sequential loops over the same name each get their own.
        if self.scopes.loop_entry(&header.var).is_some() {
            self.warn(
                tree,
                header.condition,
                format!(
                    "Nested loop reuses induction variable `{}`, range checks disabled for it",
                    header.var
                ),
            );
            self.scopes.set_loop(&header.var, LoopEntry::Unsupported);
            return;
        }

        let range = match header.op {
            BinaryOp::Lt | BinaryOp::Ne => Some(LoopRange {
                induction_var: header.var.clone(),
                start: header.start,
                end: header.bound,
                upper_inclusive: false,
                rewrite: BoundRewrite::Comparison {
                    condition: header.condition,
                    var_on_left: header.var_on_left,
                },
            }),
            BinaryOp::Le => Some(LoopRange {
                induction_var: header.var.clone(),
                start: header.start,
                end: header.bound,
                upper_inclusive: true,
                rewrite: BoundRewrite::Comparison {
                    condition: header.condition,
                    var_on_left: header.var_on_left,
                },
            }),
            // Counting down: the start value is the highest index reached.
            BinaryOp::Gt | BinaryOp::Ge => header.start.map(|start| LoopRange {
                induction_var: header.var.clone(),
                start: Some(start),
                end: start,
                upper_inclusive: true,
                rewrite: BoundRewrite::Value,
            }),
            _ => None,
        };

        match range {
            Some(range) => {
                log::debug!("Loop over `{}` registered", header.var);
                self.scopes.set_loop(&header.var, LoopEntry::Range(range));
            }
            None => log::debug!("Loop header over `{}` not recognized", header.var),
        }
    }
}

/// Byte width of one element of a declared array or pointee.
fn element_width(ty: &TypeName, pointer: bool) -> i64 {
    let element = if pointer { ty.pointee() } else { ty.clone() };
    type_width(&element).unwrap_or(1)
}

/// Induction variable and start value of a `for` initializer.
fn for_init(tree: &SyntaxTree, init: NodeId) -> Option<(String, Option<NodeId>)> {
    match tree.kind(init) {
        NodeKind::Decl { name, init, .. } => Some((name.clone(), *init)),
        NodeKind::DeclGroup { decls } => for_init(tree, *decls.first()?),
        NodeKind::Assign {
            op: AssignOp::Assign,
            target,
            value,
        } => Some((tree.ident_name(*target)?.to_string(), Some(*value))),
        NodeKind::Comma { left, .. } => for_init(tree, *left),
        NodeKind::Paren { inner } => for_init(tree, *inner),
        _ => None,
    }
}

fn for_header(tree: &SyntaxTree, init: Option<NodeId>, cond: NodeId) -> Option<Header> {
    let start = init.and_then(|init| for_init(tree, init));
    let var = start.as_ref().map(|(var, _)| var.as_str());
    let mut header = comparison_header(tree, cond, &|name: &str| var.map_or(true, |var| var == name))?;
    header.start = start.and_then(|(_, start)| start);
    Some(header)
}

/// Normalizes `var <op> bound` or `bound <op> var` to the variable's side.
fn comparison_header(
    tree: &SyntaxTree,
    cond: NodeId,
    accept: &dyn Fn(&str) -> bool,
) -> Option<Header> {
    let condition = tree.strip_parens(cond);
    let NodeKind::Binary { op, left, right } = tree.kind(condition) else {
        return None;
    };
    if !op.is_comparison() {
        return None;
    }
    let matches = |id: NodeId| {
        tree.ident_name(id)
            .filter(|name| accept(name))
            .map(str::to_string)
    };
    let (var, op, bound, var_on_left) = match (matches(*left), matches(*right)) {
        (Some(var), _) => (var, *op, *right, true),
        (None, Some(var)) => (var, op.flipped(), *left, false),
        (None, None) => return None,
    };
    Some(Header {
        var,
        start: None,
        condition,
        op,
        bound,
        var_on_left,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::parser::printer::render;

    fn run(source: &str) -> Analysis {
        let mut unit = parse_source("t.c", source.to_string()).unwrap();
        BufferOverflowAnalyzer::new(AnalyzerConfig::default()).analyze(&mut unit.tree)
    }

    #[test]
    fn test_constant_index_past_end() {
        let analysis = run("void f(void)\n{\n    char buf[10];\n    buf[10] = 'x';\n}\n");
        assert_eq!(analysis.suggestions.len(), 1);
        assert!(analysis.suggestions[0].patched_source.contains("buf[9] = 'x';"));
        assert_eq!(analysis.suggestions[0].relative_line, 4);
    }

    #[test]
    fn test_in_bounds_accesses_are_silent() {
        let analysis = run(
            "void f(void)\n{\n    int v[4];\n    int i;\n    for (i = 0; i < 4; i++) {\n        v[i] = i;\n    }\n    v[3] = 0;\n}\n",
        );
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_define_constants_size_arrays() {
        let analysis = run(
            "#define SIZE 8\nvoid f(void)\n{\n    char buf[SIZE];\n    for (int i = 0; i <= SIZE; i++)\n        buf[i] = 0;\n}\n",
        );
        assert_eq!(analysis.suggestions.len(), 2);
        assert!(analysis.suggestions[0].patched_source.contains("char buf[9];"));
        assert!(analysis.suggestions[1].patched_source.contains("i < 8"));
    }

    #[test]
    fn test_descending_loop_uses_start_as_upper_bound() {
        let analysis = run(
            "void f(void)\n{\n    int v[5];\n    for (int i = 5; i >= 0; i--)\n        v[i] = 0;\n}\n",
        );
        assert_eq!(analysis.suggestions.len(), 2);
        assert!(analysis.suggestions[0].patched_source.contains("int v[6];"));
        assert!(analysis.suggestions[1].patched_source.contains("int i = 4;"));
    }

    #[test]
    fn test_while_loop_range() {
        let analysis = run(
            "void f(void)\n{\n    char buf[4];\n    int n = 0;\n    while (n < 6) {\n        buf[n] = 0;\n        n++;\n    }\n}\n",
        );
        assert_eq!(analysis.suggestions.len(), 2);
        assert!(analysis.suggestions[1].patched_source.contains("while (n < 4)"));
    }

    #[test]
    fn test_variable_index_offers_clamp_and_grow() {
        let analysis = run(
            "void f(void)\n{\n    int v[4];\n    int k = 6;\n    v[k] = 1;\n}\n",
        );
        assert_eq!(analysis.suggestions.len(), 2);
        assert!(analysis.suggestions[0].patched_source.contains("int k = 3;"));
        assert!(analysis.suggestions[1].patched_source.contains("int v[7];"));
    }

    #[test]
    fn test_nested_reuse_of_induction_variable_is_reported() {
        let analysis = run(
            "void f(void)\n{\n    int i;\n    char buf[4];\n    for (i = 0; i < 4; i++)\n        for (i = 0; i < 8; i++)\n            buf[i] = 0;\n}\n",
        );
        assert!(analysis.suggestions.is_empty());
        assert!(analysis
            .diagnostics
            .iter()
            .any(|diagnostic| diagnostic.message.contains("reuses induction variable `i`")));
    }

    #[test]
    fn test_sequential_loops_may_share_induction_variable() {
        let analysis = run(
            "void f(void)\n{\n    int i;\n    char buf[4];\n    for (i = 0; i < 4; i++)\n        buf[i] = 0;\n    for (i = 0; i <= 4; i++)\n        buf[i] = 1;\n}\n",
        );
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.suggestions.len(), 2);
        assert_eq!(analysis.suggestions[1].relative_line, 7);
        assert!(!analysis.suggestions[1].patched_source.contains("i <= 4"));
    }

    #[test]
    fn test_disjunction_is_noted_not_merged() {
        let analysis = run(
            "void f(int idx)\n{\n    char buf[4];\n    if (idx < 0 || idx > 3)\n        return;\n    buf[idx] = 0;\n}\n",
        );
        assert!(analysis
            .diagnostics
            .iter()
            .any(|diagnostic| diagnostic.message.starts_with("Disjunctive condition")));
        assert_eq!(analysis.suggestions.len(), 1);
    }

    #[test]
    fn test_unknown_heap_size_is_skipped() {
        let analysis = run(
            "void f(int n)\n{\n    char *p = malloc(n);\n    p[100] = 0;\n    memset(p, 0, 500);\n}\n",
        );
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_tree_unchanged_after_analysis() {
        let source = "void f(int idx)\n{\n    char buf[10];\n    for (int i = 0; i <= 10; i++)\n        buf[i] = 0;\n    buf[idx] = 1;\n}\n";
        let mut unit = parse_source("t.c", source.to_string()).unwrap();
        let root = unit.tree.root().unwrap();
        let before = render(&unit.tree, root);
        let analysis =
            BufferOverflowAnalyzer::new(AnalyzerConfig::default()).analyze(&mut unit.tree);
        assert_eq!(analysis.suggestions.len(), 3);
        assert_eq!(render(&unit.tree, root), before);
    }

    #[test]
    fn test_unchecked_indices_can_be_disabled() {
        let mut unit = parse_source(
            "t.c",
            "void f(int idx)\n{\n    char buf[10];\n    buf[idx] = 1;\n}\n".to_string(),
        )
        .unwrap();
        let config = AnalyzerConfig {
            report_unchecked_indices: false,
            ..AnalyzerConfig::default()
        };
        let analysis = BufferOverflowAnalyzer::new(config).analyze(&mut unit.tree);
        assert!(analysis.suggestions.is_empty());
    }
}
