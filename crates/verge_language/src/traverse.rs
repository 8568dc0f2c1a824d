//! Traversal over the AST.
//!
//! Three facilities, all built on one child-expansion function per node
//! kind ([`NodeRef::children`]):
//!
//! - [`Visitor`]: a trait with one method per node category and a single
//!   [`dispatch`](Visitor::dispatch) entry point. Default methods descend,
//!   so an implementation overrides only the categories it cares about.
//! - [`preorder`]/[`postorder`]: iterators over a subtree.
//! - Focused helpers [`for_each_expr`], [`for_each_stmt`],
//!   [`for_each_type`]: walk an entire subtree but call back only on nodes
//!   of one category, descending through the scaffolding of every other
//!   kind.

use crate::ast::{
    Decl, Expr, ExprKind, Function, Model, Property, PutArg, Quantifier, QuantifierKind, Rule,
    Stmt, StmtKind, TypeExpr, TypeExprKind,
};

/// A borrowed reference to any AST node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Model(&'a Model),
    Decl(&'a Decl),
    Function(&'a Function),
    TypeExpr(&'a TypeExpr),
    Expr(&'a Expr),
    Stmt(&'a Stmt),
    Rule(&'a Rule),
    Quantifier(&'a Quantifier),
    Property(&'a Property),
}

impl<'a> NodeRef<'a> {
    /// The node's children, in source order. This is the single place child
    /// expansion is defined; every traversal below goes through it.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match self {
            NodeRef::Model(m) => {
                out.extend(m.decls.iter().map(NodeRef::Decl));
                out.extend(m.functions.iter().map(NodeRef::Function));
                out.extend(m.rules.iter().map(NodeRef::Rule));
            }
            NodeRef::Decl(d) => match d {
                Decl::Const(c) => out.push(NodeRef::Expr(&c.value)),
                Decl::Type(t) => out.push(NodeRef::TypeExpr(&t.value)),
                Decl::Var(v) => out.push(NodeRef::TypeExpr(&v.ty)),
                Decl::Alias(a) => out.push(NodeRef::Expr(&a.value)),
            },
            NodeRef::Function(f) => {
                out.extend(f.parameters.iter().map(|p| NodeRef::TypeExpr(&p.ty)));
                if let Some(ret) = &f.return_type {
                    out.push(NodeRef::TypeExpr(ret));
                }
                out.extend(f.decls.iter().map(NodeRef::Decl));
                out.extend(f.body.iter().map(NodeRef::Stmt));
            }
            NodeRef::TypeExpr(t) => match &t.kind {
                TypeExprKind::Range { min, max } => {
                    out.push(NodeRef::Expr(min));
                    out.push(NodeRef::Expr(max));
                }
                TypeExprKind::Scalarset { bound } => out.push(NodeRef::Expr(bound)),
                TypeExprKind::Array { index, element } => {
                    out.push(NodeRef::TypeExpr(index));
                    out.push(NodeRef::TypeExpr(element));
                }
                TypeExprKind::Record { fields } => {
                    out.extend(fields.iter().map(|f| NodeRef::TypeExpr(&f.ty)));
                }
                TypeExprKind::Enum { .. } | TypeExprKind::Named(_) => {}
            },
            NodeRef::Expr(e) => match &e.kind {
                ExprKind::Ternary { cond, lhs, rhs } => {
                    out.push(NodeRef::Expr(cond));
                    out.push(NodeRef::Expr(lhs));
                    out.push(NodeRef::Expr(rhs));
                }
                ExprKind::Binary { lhs, rhs, .. } => {
                    out.push(NodeRef::Expr(lhs));
                    out.push(NodeRef::Expr(rhs));
                }
                ExprKind::Unary { rhs, .. } => out.push(NodeRef::Expr(rhs)),
                ExprKind::Forall { quantifier, expr } | ExprKind::Exists { quantifier, expr } => {
                    out.push(NodeRef::Quantifier(quantifier));
                    out.push(NodeRef::Expr(expr));
                }
                ExprKind::Field { record, .. } => out.push(NodeRef::Expr(record)),
                ExprKind::Element { array, index } => {
                    out.push(NodeRef::Expr(array));
                    out.push(NodeRef::Expr(index));
                }
                ExprKind::Call { arguments, .. } => {
                    out.extend(arguments.iter().map(NodeRef::Expr));
                }
                ExprKind::IsUndefined(inner) => out.push(NodeRef::Expr(inner)),
                ExprKind::Id(_) | ExprKind::Number(_) => {}
            },
            NodeRef::Stmt(s) => match &s.kind {
                StmtKind::Assignment { lhs, rhs } => {
                    out.push(NodeRef::Expr(lhs));
                    out.push(NodeRef::Expr(rhs));
                }
                StmtKind::Clear(e) | StmtKind::Undefine(e) => out.push(NodeRef::Expr(e)),
                StmtKind::If { clauses } => {
                    for c in clauses {
                        if let Some(cond) = &c.condition {
                            out.push(NodeRef::Expr(cond));
                        }
                        out.extend(c.body.iter().map(NodeRef::Stmt));
                    }
                }
                StmtKind::Switch { expr, cases } => {
                    out.push(NodeRef::Expr(expr));
                    for c in cases {
                        out.extend(c.matches.iter().map(NodeRef::Expr));
                        out.extend(c.body.iter().map(NodeRef::Stmt));
                    }
                }
                StmtKind::For { quantifier, body } => {
                    out.push(NodeRef::Quantifier(quantifier));
                    out.extend(body.iter().map(NodeRef::Stmt));
                }
                StmtKind::While { condition, body } => {
                    out.push(NodeRef::Expr(condition));
                    out.extend(body.iter().map(NodeRef::Stmt));
                }
                StmtKind::Return(e) => {
                    if let Some(e) = e {
                        out.push(NodeRef::Expr(e));
                    }
                }
                StmtKind::ProcedureCall { arguments, .. } => {
                    out.extend(arguments.iter().map(NodeRef::Expr));
                }
                StmtKind::Property { property, .. } => out.push(NodeRef::Property(property)),
                StmtKind::Alias { aliases, body } => {
                    for a in aliases {
                        out.push(NodeRef::Expr(&a.value));
                    }
                    out.extend(body.iter().map(NodeRef::Stmt));
                }
                StmtKind::Put(PutArg::Value(e)) => out.push(NodeRef::Expr(e)),
                StmtKind::Put(PutArg::Literal(_)) | StmtKind::Error(_) => {}
            },
            NodeRef::Rule(r) => match r {
                Rule::Start(s) => {
                    out.extend(s.quantifiers.iter().map(NodeRef::Quantifier));
                    for a in &s.aliases {
                        out.push(NodeRef::Expr(&a.value));
                    }
                    out.extend(s.decls.iter().map(NodeRef::Decl));
                    out.extend(s.body.iter().map(NodeRef::Stmt));
                }
                Rule::Simple(s) => {
                    out.extend(s.quantifiers.iter().map(NodeRef::Quantifier));
                    for a in &s.aliases {
                        out.push(NodeRef::Expr(&a.value));
                    }
                    if let Some(g) = &s.guard {
                        out.push(NodeRef::Expr(g));
                    }
                    out.extend(s.decls.iter().map(NodeRef::Decl));
                    out.extend(s.body.iter().map(NodeRef::Stmt));
                }
                Rule::Property(p) => {
                    out.extend(p.quantifiers.iter().map(NodeRef::Quantifier));
                    for a in &p.aliases {
                        out.push(NodeRef::Expr(&a.value));
                    }
                    out.push(NodeRef::Property(&p.property));
                }
                Rule::Ruleset(rs) => {
                    out.extend(rs.quantifiers.iter().map(NodeRef::Quantifier));
                    out.extend(rs.rules.iter().map(NodeRef::Rule));
                }
                Rule::Alias(ar) => {
                    for a in &ar.aliases {
                        out.push(NodeRef::Expr(&a.value));
                    }
                    out.extend(ar.rules.iter().map(NodeRef::Rule));
                }
            },
            NodeRef::Quantifier(q) => match &q.kind {
                QuantifierKind::Typed(t) => out.push(NodeRef::TypeExpr(t)),
                QuantifierKind::Bounded { from, to, step } => {
                    out.push(NodeRef::Expr(from));
                    out.push(NodeRef::Expr(to));
                    if let Some(step) = step {
                        out.push(NodeRef::Expr(step));
                    }
                }
            },
            NodeRef::Property(p) => out.push(NodeRef::Expr(&p.expr)),
        }
        out
    }
}

/// A visitor with one method per node category. Defaults descend into
/// children; override only what you need and enter through
/// [`dispatch`](Visitor::dispatch).
pub trait Visitor {
    fn dispatch(&mut self, node: NodeRef<'_>)
    where
        Self: Sized,
    {
        match node {
            NodeRef::Model(n) => self.visit_model(n),
            NodeRef::Decl(n) => self.visit_decl(n),
            NodeRef::Function(n) => self.visit_function(n),
            NodeRef::TypeExpr(n) => self.visit_type_expr(n),
            NodeRef::Expr(n) => self.visit_expr(n),
            NodeRef::Stmt(n) => self.visit_stmt(n),
            NodeRef::Rule(n) => self.visit_rule(n),
            NodeRef::Quantifier(n) => self.visit_quantifier(n),
            NodeRef::Property(n) => self.visit_property(n),
        }
    }

    fn visit_model(&mut self, n: &Model)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Model(n));
    }

    fn visit_decl(&mut self, n: &Decl)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Decl(n));
    }

    fn visit_function(&mut self, n: &Function)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Function(n));
    }

    fn visit_type_expr(&mut self, n: &TypeExpr)
    where
        Self: Sized,
    {
        walk(self, NodeRef::TypeExpr(n));
    }

    fn visit_expr(&mut self, n: &Expr)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Expr(n));
    }

    fn visit_stmt(&mut self, n: &Stmt)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Stmt(n));
    }

    fn visit_rule(&mut self, n: &Rule)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Rule(n));
    }

    fn visit_quantifier(&mut self, n: &Quantifier)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Quantifier(n));
    }

    fn visit_property(&mut self, n: &Property)
    where
        Self: Sized,
    {
        walk(self, NodeRef::Property(n));
    }
}

/// Dispatches `visitor` over every child of `node`.
pub fn walk<V: Visitor>(visitor: &mut V, node: NodeRef<'_>) {
    for child in node.children() {
        visitor.dispatch(child);
    }
}

/// Iterator over a subtree in pre-order (parents before children).
pub fn preorder(root: NodeRef<'_>) -> Preorder<'_> {
    Preorder { stack: vec![root] }
}

pub struct Preorder<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let node = self.stack.pop()?;
        let mut children = node.children();
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}

/// Iterator over a subtree in post-order (children before parents).
pub fn postorder(root: NodeRef<'_>) -> Postorder<'_> {
    Postorder {
        stack: vec![(root, false)],
    }
}

pub struct Postorder<'a> {
    stack: Vec<(NodeRef<'a>, bool)>,
}

impl<'a> Iterator for Postorder<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        loop {
            let (node, expanded) = self.stack.pop()?;
            if expanded {
                return Some(node);
            }
            self.stack.push((node, true));
            let mut children = node.children();
            children.reverse();
            self.stack.extend(children.into_iter().map(|c| (c, false)));
        }
    }
}

/// Calls `f` on every expression in the subtree, including expressions
/// nested inside statements, types and rules.
pub fn for_each_expr<'a>(root: NodeRef<'a>, f: &mut dyn FnMut(&'a Expr)) {
    for node in preorder(root) {
        if let NodeRef::Expr(e) = node {
            f(e);
        }
    }
}

/// Calls `f` on every statement in the subtree.
pub fn for_each_stmt<'a>(root: NodeRef<'a>, f: &mut dyn FnMut(&'a Stmt)) {
    for node in preorder(root) {
        if let NodeRef::Stmt(s) = node {
            f(s);
        }
    }
}

/// Calls `f` on every type expression in the subtree.
pub fn for_each_type<'a>(root: NodeRef<'a>, f: &mut dyn FnMut(&'a TypeExpr)) {
    for node in preorder(root) {
        if let NodeRef::TypeExpr(t) = node {
            f(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind};
    use num_bigint::BigInt;
    use verge_base::Location;

    fn num(v: i64) -> Expr {
        Expr::new(ExprKind::Number(BigInt::from(v)), Location::default())
    }

    fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Location::default(),
        )
    }

    #[test]
    fn preorder_visits_parents_first() {
        let tree = add(num(1), add(num(2), num(3)));
        let kinds: Vec<bool> = preorder(NodeRef::Expr(&tree))
            .map(|n| matches!(n, NodeRef::Expr(e) if matches!(e.kind, ExprKind::Binary { .. })))
            .collect();
        // root add, 1, inner add, 2, 3
        assert_eq!(kinds, vec![true, false, true, false, false]);
    }

    #[test]
    fn postorder_visits_children_first() {
        let tree = add(num(1), num(2));
        let order: Vec<bool> = postorder(NodeRef::Expr(&tree))
            .map(|n| matches!(n, NodeRef::Expr(e) if matches!(e.kind, ExprKind::Binary { .. })))
            .collect();
        // 1, 2, root add
        assert_eq!(order, vec![false, false, true]);
    }

    #[test]
    fn for_each_expr_counts_all_subexpressions() {
        let tree = add(num(1), add(num(2), num(3)));
        let mut count = 0;
        for_each_expr(NodeRef::Expr(&tree), &mut |_| count += 1);
        assert_eq!(count, 5);
    }

    #[test]
    fn visitor_defaults_descend() {
        struct CountNumbers(usize);
        impl Visitor for CountNumbers {
            fn visit_expr(&mut self, e: &Expr) {
                if matches!(e.kind, ExprKind::Number(_)) {
                    self.0 += 1;
                }
                walk(self, NodeRef::Expr(e));
            }
        }

        let tree = add(num(1), add(num(2), num(3)));
        let mut v = CountNumbers(0);
        v.dispatch(NodeRef::Expr(&tree));
        assert_eq!(v.0, 3);
    }
}
