//! Abstract syntax tree for the model language.
//!
//! The tree is a pure ownership hierarchy: parents own their children by
//! value, `Clone` is a deep copy, and cross-references produced by symbol
//! resolution live in a side table (see [`crate::analysis::Bindings`]), not
//! in the tree. The categories are:
//!
//! - [`decl`]: constant, type, variable and alias declarations
//! - [`types`]: type expressions (ranges, enums, scalarsets, arrays,
//!   records, named references)
//! - [`expr`]: expressions, including quantified and lvalue-chain forms
//! - [`stmt`]: statements
//! - [`rule`]: start states, guarded rules, properties, and the ruleset /
//!   alias-rule grouping forms
//! - [`model`]: the top-level model
//!
//! Every node embeds a [`NodeMeta`] carrying its source [`Location`] and a
//! process-unique [`NodeId`]. Ids are assigned by [`reindex`], which walks
//! the tree in a deterministic pre-order; they key the resolver's side
//! tables and name solver symbols, so any tree handed to later phases must
//! be re-indexed first (and again after cloning subtrees into new
//! positions).

pub mod decl;
pub mod expr;
pub mod model;
pub mod rule;
pub mod stmt;
pub mod types;

pub use decl::{AliasDecl, ConstDecl, Decl, Function, TypeDecl, VarDecl};
pub use expr::{BinaryOp, Expr, ExprKind, Quantifier, QuantifierKind, UnaryOp};
pub use model::Model;
pub use rule::{
    AliasRule, Property, PropertyCategory, PropertyRule, Rule, Ruleset, SimpleRule, StartState,
};
pub use stmt::{IfClause, PutArg, Stmt, StmtKind, SwitchCase};
pub use types::{TypeExpr, TypeExprKind};

use verge_base::Location;

/// A process-unique node identifier assigned by [`reindex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id of nodes that have not been through [`reindex`] yet.
    pub const UNASSIGNED: NodeId = NodeId(0);
}

/// Location and identity shared by every AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMeta {
    pub id: NodeId,
    pub loc: Location,
}

impl NodeMeta {
    pub fn new(loc: Location) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            loc,
        }
    }
}

/// Assigns fresh unique ids to every node of the model, in deterministic
/// pre-order, starting from 1.
///
/// Cloning preserves ids, which is what lets rule flattening reuse the
/// resolver's side tables; re-run this (and resolution) whenever new nodes
/// are grafted into an already-indexed tree.
pub fn reindex(model: &mut Model) {
    let mut next = Indexer { next: 1 };
    next.model(model);
}

struct Indexer {
    next: u32,
}

impl Indexer {
    fn assign(&mut self, meta: &mut NodeMeta) {
        meta.id = NodeId(self.next);
        self.next += 1;
    }

    fn model(&mut self, m: &mut Model) {
        self.assign(&mut m.meta);
        for d in &mut m.decls {
            self.decl(d);
        }
        for f in &mut m.functions {
            self.function(f);
        }
        for r in &mut m.rules {
            self.rule(r);
        }
    }

    fn decl(&mut self, d: &mut Decl) {
        match d {
            Decl::Const(c) => {
                self.assign(&mut c.meta);
                self.expr(&mut c.value);
            }
            Decl::Type(t) => {
                self.assign(&mut t.meta);
                self.type_expr(&mut t.value);
            }
            Decl::Var(v) => self.var_decl(v),
            Decl::Alias(a) => self.alias_decl(a),
        }
    }

    fn var_decl(&mut self, v: &mut VarDecl) {
        self.assign(&mut v.meta);
        self.type_expr(&mut v.ty);
    }

    fn alias_decl(&mut self, a: &mut AliasDecl) {
        self.assign(&mut a.meta);
        self.expr(&mut a.value);
    }

    fn function(&mut self, f: &mut Function) {
        self.assign(&mut f.meta);
        for p in &mut f.parameters {
            self.var_decl(p);
        }
        if let Some(ret) = &mut f.return_type {
            self.type_expr(ret);
        }
        for d in &mut f.decls {
            self.decl(d);
        }
        for s in &mut f.body {
            self.stmt(s);
        }
    }

    fn type_expr(&mut self, t: &mut TypeExpr) {
        self.assign(&mut t.meta);
        match &mut t.kind {
            TypeExprKind::Range { min, max } => {
                self.expr(min);
                self.expr(max);
            }
            TypeExprKind::Scalarset { bound } => self.expr(bound),
            TypeExprKind::Array { index, element } => {
                self.type_expr(index);
                self.type_expr(element);
            }
            TypeExprKind::Record { fields } => {
                for f in fields {
                    self.var_decl(f);
                }
            }
            TypeExprKind::Enum { .. } | TypeExprKind::Named(_) => {}
        }
    }

    fn quantifier(&mut self, q: &mut Quantifier) {
        self.assign(&mut q.meta);
        match &mut q.kind {
            QuantifierKind::Typed(t) => self.type_expr(t),
            QuantifierKind::Bounded { from, to, step } => {
                self.expr(from);
                self.expr(to);
                if let Some(step) = step {
                    self.expr(step);
                }
            }
        }
    }

    fn expr(&mut self, e: &mut Expr) {
        self.assign(&mut e.meta);
        match &mut e.kind {
            ExprKind::Ternary { cond, lhs, rhs } => {
                self.expr(cond);
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Unary { rhs, .. } => self.expr(rhs),
            ExprKind::Forall { quantifier, expr } | ExprKind::Exists { quantifier, expr } => {
                self.quantifier(quantifier);
                self.expr(expr);
            }
            ExprKind::Field { record, .. } => self.expr(record),
            ExprKind::Element { array, index } => {
                self.expr(array);
                self.expr(index);
            }
            ExprKind::Call { arguments, .. } => {
                for a in arguments {
                    self.expr(a);
                }
            }
            ExprKind::IsUndefined(inner) => self.expr(inner),
            ExprKind::Id(_) | ExprKind::Number(_) => {}
        }
    }

    fn stmt(&mut self, s: &mut Stmt) {
        self.assign(&mut s.meta);
        match &mut s.kind {
            StmtKind::Assignment { lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            StmtKind::Clear(e) | StmtKind::Undefine(e) => self.expr(e),
            StmtKind::If { clauses } => {
                for c in clauses {
                    self.assign(&mut c.meta);
                    if let Some(cond) = &mut c.condition {
                        self.expr(cond);
                    }
                    for s in &mut c.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::Switch { expr, cases } => {
                self.expr(expr);
                for c in cases {
                    self.assign(&mut c.meta);
                    for m in &mut c.matches {
                        self.expr(m);
                    }
                    for s in &mut c.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::For { quantifier, body } => {
                self.quantifier(quantifier);
                for s in body {
                    self.stmt(s);
                }
            }
            StmtKind::While { condition, body } => {
                self.expr(condition);
                for s in body {
                    self.stmt(s);
                }
            }
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    self.expr(e);
                }
            }
            StmtKind::ProcedureCall { arguments, .. } => {
                for a in arguments {
                    self.expr(a);
                }
            }
            StmtKind::Property { property, .. } => self.property(property),
            StmtKind::Alias { aliases, body } => {
                for a in aliases {
                    self.alias_decl(a);
                }
                for s in body {
                    self.stmt(s);
                }
            }
            StmtKind::Put(PutArg::Value(e)) => self.expr(e),
            StmtKind::Put(PutArg::Literal(_)) | StmtKind::Error(_) => {}
        }
    }

    fn property(&mut self, p: &mut Property) {
        self.assign(&mut p.meta);
        self.expr(&mut p.expr);
    }

    fn rule(&mut self, r: &mut Rule) {
        match r {
            Rule::Start(s) => {
                self.assign(&mut s.meta);
                for q in &mut s.quantifiers {
                    self.quantifier(q);
                }
                for a in &mut s.aliases {
                    self.alias_decl(a);
                }
                for d in &mut s.decls {
                    self.decl(d);
                }
                for st in &mut s.body {
                    self.stmt(st);
                }
            }
            Rule::Simple(s) => {
                self.assign(&mut s.meta);
                for q in &mut s.quantifiers {
                    self.quantifier(q);
                }
                for a in &mut s.aliases {
                    self.alias_decl(a);
                }
                if let Some(g) = &mut s.guard {
                    self.expr(g);
                }
                for d in &mut s.decls {
                    self.decl(d);
                }
                for st in &mut s.body {
                    self.stmt(st);
                }
            }
            Rule::Property(p) => {
                self.assign(&mut p.meta);
                for q in &mut p.quantifiers {
                    self.quantifier(q);
                }
                for a in &mut p.aliases {
                    self.alias_decl(a);
                }
                self.property(&mut p.property);
            }
            Rule::Ruleset(rs) => {
                self.assign(&mut rs.meta);
                for q in &mut rs.quantifiers {
                    self.quantifier(q);
                }
                for inner in &mut rs.rules {
                    self.rule(inner);
                }
            }
            Rule::Alias(ar) => {
                self.assign(&mut ar.meta);
                for a in &mut ar.aliases {
                    self.alias_decl(a);
                }
                for inner in &mut ar.rules {
                    self.rule(inner);
                }
            }
        }
    }
}
