//! The simplification pass.
//!
//! Walks the model opening and closing solver scopes at exactly the
//! points the symbol resolver opens and closes lexical scopes, so solver
//! symbols shadow the same way source identifiers do. Every boolean
//! subexpression is queried bottom-up — *always true?* then *always
//! false?* — and conclusive answers substitute the matching boolean
//! literal. Two kinds of expression are deliberately left alone even when
//! provable: property expressions and `put` arguments, both of which are
//! shown to the user during checking and would confuse if they differed
//! from the source.
//!
//! After this pass the tree contains fresh literal nodes with no binding
//! entries; callers re-run `reindex`/`resolve`/`validate` before handing
//! the model to code generation.
//!
//! We only replace tautologies and contradictions rather than pruning
//! unreachable code; the Rust compiler building the generated checker is
//! clever enough to do the latter itself.

use crate::declare::{declare_const, declare_var, define_record};
use crate::error::VerifyError;
use crate::logic::Logic;
use crate::solver::Solver;
use crate::translate::{mangle, translate};
use verge_language::analysis::Bindings;
use verge_language::ast::*;

/// What the pass did, for `--verbose` reporting.
#[derive(Debug, Default)]
pub struct SimplifyStats {
    /// Solver queries issued.
    pub queries: u64,
    /// Subexpressions replaced by a literal.
    pub simplified: u64,
    /// Expressions skipped for having no SMT translation.
    pub unsupported: u64,
    /// Human-readable notes about each substitution and skip.
    pub notes: Vec<String>,
}

/// Runs the pass over `model` in place.
pub fn simplify(
    model: &mut Model,
    bindings: &Bindings,
    solver: &mut Solver,
    logic: &Logic,
) -> SimplifyStats {
    let mut pass = Simplifier {
        bindings,
        solver,
        logic,
        stats: SimplifyStats::default(),
        exhausted: false,
        defined_records: Vec::new(),
    };
    pass.model(model);
    pass.stats
}

struct Simplifier<'a> {
    bindings: &'a Bindings,
    solver: &'a mut Solver,
    logic: &'a Logic,
    stats: SimplifyStats,
    /// Set once the budget runs out; no further queries are issued.
    exhausted: bool,
    defined_records: Vec<NodeId>,
}

impl<'a> Simplifier<'a> {
    // ------------------------------------------------------------------
    // Substitution
    // ------------------------------------------------------------------

    fn replace(e: &mut Expr, literal: &str) -> Expr {
        let loc = e.meta.loc.clone();
        std::mem::replace(e, Expr::new(ExprKind::Id(literal.to_string()), loc))
    }

    /// Queries one boolean subexpression and substitutes on a conclusive
    /// answer.
    fn try_simplify(&mut self, e: &mut Expr) {
        if self.exhausted || !self.bindings.is_boolean(e) {
            return;
        }
        // no point proving a literal equal to itself
        if let ExprKind::Id(name) = &e.kind {
            if name == "true" || name == "false" {
                return;
            }
        }

        let claim = match translate(e, self.bindings, self.logic) {
            Ok(claim) => claim,
            Err(VerifyError::Unsupported { what }) => {
                self.stats.unsupported += 1;
                self.stats.notes.push(format!(
                    "skipping SMT simplification of unsupported expression \"{}\"",
                    what
                ));
                return;
            }
            Err(_) => return,
        };

        self.stats.queries += 1;
        match self.solver.is_true(&claim) {
            Ok(true) => {
                let old = Self::replace(e, "true");
                self.stats.simplified += 1;
                self.stats
                    .notes
                    .push(format!("simplifying \"{}\" to true", old));
                return;
            }
            Ok(false) => {}
            Err(VerifyError::BudgetExhausted) => {
                self.exhausted = true;
                return;
            }
            Err(_) => return, // inconclusive; leave the expression alone
        }

        self.stats.queries += 1;
        match self.solver.is_false(&claim) {
            Ok(true) => {
                let old = Self::replace(e, "false");
                self.stats.simplified += 1;
                self.stats
                    .notes
                    .push(format!("simplifying \"{}\" to false", old));
            }
            Ok(false) => {}
            Err(VerifyError::BudgetExhausted) => self.exhausted = true,
            Err(_) => {}
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn declare_decl(&mut self, d: &Decl) {
        match d {
            Decl::Const(c) => {
                if self.bindings.is_constant(&c.value) {
                    if let Ok(value) = self.bindings.constant_fold(&c.value) {
                        declare_const(self.solver, c.meta.id, &value, self.logic);
                    }
                }
            }
            Decl::Type(t) => {
                let _ = define_record(
                    self.solver,
                    &t.value,
                    self.bindings,
                    self.logic,
                    &mut self.defined_records,
                );
            }
            Decl::Var(v) => {
                let _ = define_record(
                    self.solver,
                    &v.ty,
                    self.bindings,
                    self.logic,
                    &mut self.defined_records,
                );
                declare_var(self.solver, v.meta.id, &v.ty, self.bindings, self.logic);
            }
            // alias references are inlined during translation
            Decl::Alias(_) => {}
        }
    }

    fn declare_quantifier(&mut self, q: &Quantifier) {
        match &q.kind {
            QuantifierKind::Typed(ty) => {
                declare_var(self.solver, q.meta.id, ty, self.bindings, self.logic);
            }
            QuantifierKind::Bounded { from, to, .. } => {
                let name = mangle(q.meta.id);
                self.solver.write(&format!(
                    "(declare-fun {} () {})\n",
                    name,
                    self.logic.integer_type()
                ));
                if self.bindings.is_constant(from) {
                    if let Ok(lb) = self.bindings.constant_fold(from) {
                        self.solver.write(&format!(
                            "(assert ({} {} {}))\n",
                            self.logic.geq(),
                            name,
                            self.logic.numeric_literal(&lb)
                        ));
                    }
                }
                if self.bindings.is_constant(to) {
                    if let Ok(ub) = self.bindings.constant_fold(to) {
                        self.solver.write(&format!(
                            "(assert ({} {} {}))\n",
                            self.logic.leq(),
                            name,
                            self.logic.numeric_literal(&ub)
                        ));
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // The walk
    // ------------------------------------------------------------------

    fn model(&mut self, m: &mut Model) {
        self.solver.open_scope();
        for d in &mut m.decls {
            self.decl(d);
        }
        for f in &mut m.functions {
            self.function(f);
        }
        for r in &mut m.rules {
            self.rule(r);
        }
        self.solver.close_scope();
    }

    fn decl(&mut self, d: &mut Decl) {
        match d {
            Decl::Const(c) => self.expr(&mut c.value),
            Decl::Type(t) => self.type_expr(&mut t.value),
            Decl::Var(v) => self.type_expr(&mut v.ty),
            Decl::Alias(a) => self.expr(&mut a.value),
        }
        self.declare_decl(d);
    }

    fn type_expr(&mut self, t: &mut TypeExpr) {
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
                    self.type_expr(&mut f.ty);
                }
            }
            TypeExprKind::Enum { .. } | TypeExprKind::Named(_) => {}
        }
    }

    fn function(&mut self, f: &mut Function) {
        self.solver.open_scope();
        for p in &mut f.parameters {
            self.type_expr(&mut p.ty);
            let _ = define_record(
                self.solver,
                &p.ty,
                self.bindings,
                self.logic,
                &mut self.defined_records,
            );
            declare_var(self.solver, p.meta.id, &p.ty, self.bindings, self.logic);
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
        self.solver.close_scope();
    }

    fn rule(&mut self, r: &mut Rule) {
        match r {
            Rule::Start(s) => {
                self.solver.open_scope();
                for q in &mut s.quantifiers {
                    self.quantifier(q);
                }
                for a in &mut s.aliases {
                    self.expr(&mut a.value);
                }
                for d in &mut s.decls {
                    self.decl(d);
                }
                for st in &mut s.body {
                    self.stmt(st);
                }
                self.solver.close_scope();
            }
            Rule::Simple(s) => {
                self.solver.open_scope();
                for q in &mut s.quantifiers {
                    self.quantifier(q);
                }
                for a in &mut s.aliases {
                    self.expr(&mut a.value);
                }
                if let Some(g) = &mut s.guard {
                    self.expr(g);
                    self.try_simplify(g);
                }
                for d in &mut s.decls {
                    self.decl(d);
                }
                for st in &mut s.body {
                    self.stmt(st);
                }
                self.solver.close_scope();
            }
            /* properties are printed to the user during checking, so
             * their expressions stay exactly as written
             */
            Rule::Property(_) => {}
            Rule::Ruleset(rs) => {
                self.solver.open_scope();
                for q in &mut rs.quantifiers {
                    self.quantifier(q);
                }
                for inner in &mut rs.rules {
                    self.rule(inner);
                }
                self.solver.close_scope();
            }
            Rule::Alias(ar) => {
                self.solver.open_scope();
                for a in &mut ar.aliases {
                    self.expr(&mut a.value);
                }
                for inner in &mut ar.rules {
                    self.rule(inner);
                }
                self.solver.close_scope();
            }
        }
    }

    fn quantifier(&mut self, q: &mut Quantifier) {
        match &mut q.kind {
            QuantifierKind::Typed(ty) => self.type_expr(ty),
            QuantifierKind::Bounded { from, to, step } => {
                self.expr(from);
                self.expr(to);
                if let Some(step) = step {
                    self.expr(step);
                }
            }
        }
        self.declare_quantifier(q);
    }

    fn stmt(&mut self, s: &mut Stmt) {
        match &mut s.kind {
            StmtKind::Assignment { lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
                self.try_simplify(rhs);
            }
            StmtKind::Clear(e) | StmtKind::Undefine(e) => self.expr(e),
            StmtKind::If { clauses } => {
                for c in clauses {
                    if let Some(cond) = &mut c.condition {
                        self.expr(cond);
                        self.try_simplify(cond);
                    }
                    for s in &mut c.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::Switch { expr, cases } => {
                self.expr(expr);
                self.try_simplify(expr);
                for c in cases {
                    for m in &mut c.matches {
                        self.expr(m);
                        self.try_simplify(m);
                    }
                    for s in &mut c.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::For { quantifier, body } => {
                self.solver.open_scope();
                self.quantifier(quantifier);
                for s in body {
                    self.stmt(s);
                }
                self.solver.close_scope();
            }
            StmtKind::While { condition, body } => {
                self.expr(condition);
                self.try_simplify(condition);
                for s in body {
                    self.stmt(s);
                }
            }
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    self.expr(e);
                    self.try_simplify(e);
                }
            }
            StmtKind::ProcedureCall { arguments, .. } => {
                for a in arguments {
                    self.expr(a);
                    self.try_simplify(a);
                }
            }
            // displayed to the user; leave as written
            StmtKind::Property { .. } | StmtKind::Put(_) | StmtKind::Error(_) => {}
            StmtKind::Alias { aliases, body } => {
                self.solver.open_scope();
                for a in aliases {
                    self.expr(&mut a.value);
                }
                for s in body {
                    self.stmt(s);
                }
                self.solver.close_scope();
            }
        }
    }

    /// Walks an expression, simplifying boolean children bottom-up.
    fn expr(&mut self, e: &mut Expr) {
        match &mut e.kind {
            ExprKind::Ternary { cond, lhs, rhs } => {
                self.expr(cond);
                self.expr(lhs);
                self.expr(rhs);
                self.try_simplify(cond);
                self.try_simplify(lhs);
                self.try_simplify(rhs);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
                self.try_simplify(lhs);
                self.try_simplify(rhs);
            }
            ExprKind::Unary { rhs, .. } => {
                self.expr(rhs);
                self.try_simplify(rhs);
            }
            ExprKind::Forall { quantifier, expr } | ExprKind::Exists { quantifier, expr } => {
                self.solver.open_scope();
                self.quantifier(quantifier);
                self.expr(expr);
                self.try_simplify(expr);
                self.solver.close_scope();
            }
            ExprKind::Field { record, .. } => self.expr(record),
            ExprKind::Element { array, index } => {
                self.expr(array);
                self.expr(index);
            }
            ExprKind::Call { arguments, .. } => {
                for a in arguments {
                    self.expr(a);
                    self.try_simplify(a);
                }
            }
            ExprKind::IsUndefined(inner) => self.expr(inner),
            ExprKind::Id(_) | ExprKind::Number(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicMode;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use verge_language::analysis::resolve;
    use verge_language::parser::parse;

    fn fake_solver(answer: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.sh");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\ncat > /dev/null\necho {}", answer).unwrap();
        drop(f);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    fn simplified_with(answer: &str, src: &str) -> (Model, SimplifyStats) {
        let mut model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        let (_dir, path) = fake_solver(answer);
        let mut solver = Solver::new(path, vec![], 60_000);
        let logic = Logic::new(LogicMode::Integer);
        let stats = simplify(&mut model, &bindings, &mut solver, &logic);
        (model, stats)
    }

    fn guard_of(model: &Model) -> &Expr {
        match &model.rules[0] {
            Rule::Simple(r) => r.guard.as_ref().unwrap(),
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[test]
    fn tautological_guard_becomes_true() {
        // an always-unsat solver proves every claim valid
        let (model, stats) = simplified_with(
            "unsat",
            "var x: 0..5;\n\
             rule x >= 0 ==> begin x := 0; end;",
        );
        assert!(matches!(
            &guard_of(&model).kind,
            ExprKind::Id(name) if name == "true"
        ));
        assert!(stats.simplified >= 1);
        assert!(stats.queries >= 1);
    }

    #[test]
    fn unknown_answers_change_nothing() {
        let src = "var x: 0..5;\n\
                   rule x >= 0 ==> begin x := 0; end;";
        let (model, stats) = simplified_with("unknown", src);
        assert!(matches!(
            &guard_of(&model).kind,
            ExprKind::Binary { op: BinaryOp::Geq, .. }
        ));
        assert_eq!(stats.simplified, 0);
    }

    #[test]
    fn properties_are_never_rewritten() {
        let (model, _) = simplified_with(
            "unsat",
            "var x: 0..5;\n\
             invariant \"shown to the user\" x >= 0;",
        );
        match &model.rules[0] {
            Rule::Property(p) => {
                assert!(matches!(p.property.expr.kind, ExprKind::Binary { .. }));
            }
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[test]
    fn unsupported_expressions_are_skipped() {
        let (model, stats) = simplified_with(
            "unsat",
            "var x: 0..5;\n\
             function f(): boolean; begin return true; end;\n\
             rule f() ==> begin x := 0; end;",
        );
        // the call has no translation and must survive
        assert!(matches!(guard_of(&model).kind, ExprKind::Call { .. }));
        assert!(stats.unsupported >= 1);
    }

    #[test]
    fn exhausted_budget_stops_querying() {
        let (model, stats) = simplified_with_budget(
            "unsat",
            0,
            "var x: 0..5;\n\
             rule x >= 0 ==> begin x := 0; end;",
        );
        assert!(matches!(guard_of(&model).kind, ExprKind::Binary { .. }));
        assert_eq!(stats.simplified, 0);
    }

    fn simplified_with_budget(
        answer: &str,
        budget_ms: u64,
        src: &str,
    ) -> (Model, SimplifyStats) {
        let mut model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        let (_dir, path) = fake_solver(answer);
        let mut solver = Solver::new(path, vec![], budget_ms);
        let logic = Logic::new(LogicMode::Integer);
        let stats = simplify(&mut model, &bindings, &mut solver, &logic);
        (model, stats)
    }
}
