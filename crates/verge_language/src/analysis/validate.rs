//! Type checking and shape validation.
//!
//! Runs after resolution. Checks the rules of the language that the parser
//! is too local to see: type compatibility of comparisons and assignments,
//! writability of assignment targets, constant-foldability of type bounds
//! and rule-level quantifier domains, index-type restrictions on arrays,
//! and the simple-return restriction on functions.
//!
//! Comparisons between two complex (non-simple) values of the same type
//! are accepted; their expression ids are recorded in
//! [`Validated::complex_eq`] so the code generator knows to emit a raw
//! byte comparison for them.

use super::{compatible_simple, Binding, Bindings};
use crate::ast::*;
use num_traits::Signed;
use rustc_hash::FxHashSet;
use verge_base::{LocatedError, Location, Result};

/// Facts the validator passes on to code generation.
#[derive(Debug, Default)]
pub struct Validated {
    /// Ids of `=`/`!=` expressions whose operands are complex values and
    /// must be compared byte-wise.
    pub complex_eq: FxHashSet<NodeId>,
}

/// Validates the model. Returns codegen-relevant facts on success.
pub fn validate(model: &Model, bindings: &Bindings) -> Result<Validated> {
    let mut v = Validator {
        bindings,
        out: Validated::default(),
        return_type: None,
    };
    v.model(model)?;
    Ok(v.out)
}

struct Validator<'a> {
    bindings: &'a Bindings,
    out: Validated,
    /// Return type of the function currently being checked.
    return_type: Option<Option<TypeExpr>>,
}

impl<'a> Validator<'a> {
    fn err<T>(&self, msg: impl Into<String>, loc: &Location) -> Result<T> {
        Err(LocatedError::new(msg, loc.clone()))
    }

    fn model(&mut self, m: &Model) -> Result<()> {
        for d in &m.decls {
            self.decl(d)?;
        }
        for f in &m.functions {
            self.function(f)?;
        }
        for r in &m.rules {
            self.rule(r)?;
        }
        Ok(())
    }

    fn decl(&mut self, d: &Decl) -> Result<()> {
        match d {
            Decl::Const(c) => {
                if !self.bindings.is_constant(&c.value) {
                    return self.err(
                        format!("value of constant \"{}\" is not a compile-time constant", c.name),
                        &c.meta.loc,
                    );
                }
                self.bindings.constant_fold(&c.value)?;
                Ok(())
            }
            Decl::Type(t) => self.type_expr(&t.value),
            Decl::Var(v) => self.type_expr(&v.ty),
            Decl::Alias(a) => self.expr(&a.value),
        }
    }

    fn type_expr(&mut self, t: &TypeExpr) -> Result<()> {
        match &t.kind {
            TypeExprKind::Range { min, max } => {
                self.expr(min)?;
                self.expr(max)?;
                let lo = self.bindings.constant_fold(min)?;
                let hi = self.bindings.constant_fold(max)?;
                if lo > hi {
                    return self.err("range lower bound exceeds upper bound", &t.meta.loc);
                }
                Ok(())
            }
            TypeExprKind::Scalarset { bound } => {
                self.expr(bound)?;
                let b = self.bindings.constant_fold(bound)?;
                if !b.is_positive() {
                    return self.err("scalarset bound must be positive", &t.meta.loc);
                }
                Ok(())
            }
            TypeExprKind::Array { index, element } => {
                self.type_expr(index)?;
                self.type_expr(element)?;
                if !self.bindings.is_simple(index) {
                    return self.err(
                        "array index type must be a range, enum or scalarset",
                        &index.meta.loc,
                    );
                }
                Ok(())
            }
            TypeExprKind::Record { fields } => {
                let mut seen = FxHashSet::default();
                for f in fields {
                    if !seen.insert(f.name.as_str()) {
                        return self.err(
                            format!("duplicate record field \"{}\"", f.name),
                            &f.meta.loc,
                        );
                    }
                    self.type_expr(&f.ty)?;
                }
                Ok(())
            }
            TypeExprKind::Enum { members } => {
                let mut seen = FxHashSet::default();
                for (name, loc) in members {
                    if !seen.insert(name.as_str()) {
                        return Err(LocatedError::new(
                            format!("duplicate enum member \"{}\"", name),
                            loc.clone(),
                        ));
                    }
                }
                Ok(())
            }
            TypeExprKind::Named(_) => Ok(()),
        }
    }

    fn function(&mut self, f: &Function) -> Result<()> {
        for p in &f.parameters {
            self.type_expr(&p.ty)?;
        }
        if let Some(ret) = &f.return_type {
            self.type_expr(ret)?;
            if !self.bindings.is_simple(ret) {
                return self.err(
                    "functions may only return simple types",
                    &ret.meta.loc,
                );
            }
        }
        for d in &f.decls {
            self.decl(d)?;
        }
        self.return_type = Some(f.return_type.clone());
        for s in &f.body {
            self.stmt(s)?;
        }
        self.return_type = None;
        Ok(())
    }

    fn rule(&mut self, r: &Rule) -> Result<()> {
        match r {
            Rule::Start(s) => {
                for q in &s.quantifiers {
                    self.rule_quantifier(q)?;
                }
                for d in &s.decls {
                    self.decl(d)?;
                }
                for st in &s.body {
                    self.stmt(st)?;
                }
                Ok(())
            }
            Rule::Simple(s) => {
                for q in &s.quantifiers {
                    self.rule_quantifier(q)?;
                }
                if let Some(g) = &s.guard {
                    self.expr(g)?;
                    self.require_boolean(g, "rule guard")?;
                }
                for d in &s.decls {
                    self.decl(d)?;
                }
                for st in &s.body {
                    self.stmt(st)?;
                }
                Ok(())
            }
            Rule::Property(p) => {
                for q in &p.quantifiers {
                    self.rule_quantifier(q)?;
                }
                self.expr(&p.property.expr)?;
                self.require_boolean(&p.property.expr, "property")
            }
            Rule::Ruleset(rs) => {
                for q in &rs.quantifiers {
                    self.rule_quantifier(q)?;
                }
                for inner in &rs.rules {
                    self.rule(inner)?;
                }
                Ok(())
            }
            Rule::Alias(ar) => {
                for a in &ar.aliases {
                    self.expr(&a.value)?;
                }
                for inner in &ar.rules {
                    self.rule(inner)?;
                }
                Ok(())
            }
        }
    }

    /// A rule-level quantifier must have a compile-time-constant domain,
    /// since it multiplies out into flattened rule instances.
    fn rule_quantifier(&mut self, q: &Quantifier) -> Result<()> {
        self.quantifier_shape(q)?;
        self.bindings.quantifier_count(q)?;
        Ok(())
    }

    fn quantifier_shape(&mut self, q: &Quantifier) -> Result<()> {
        match &q.kind {
            QuantifierKind::Typed(ty) => {
                self.type_expr(ty)?;
                if !self.bindings.is_simple(ty) {
                    return self.err("quantifier type must be simple", &q.meta.loc);
                }
                Ok(())
            }
            QuantifierKind::Bounded { from, to, step } => {
                self.expr(from)?;
                self.expr(to)?;
                self.require_numeric(from, "quantifier bound")?;
                self.require_numeric(to, "quantifier bound")?;
                if let Some(step) = step {
                    self.expr(step)?;
                    self.require_numeric(step, "quantifier step")?;
                }
                Ok(())
            }
        }
    }

    fn stmt(&mut self, s: &Stmt) -> Result<()> {
        match &s.kind {
            StmtKind::Assignment { lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.require_writable(lhs)?;
                let lhs_ty = self.designator_type(lhs)?;
                if self.bindings.is_simple(&lhs_ty) {
                    self.require_assignable(&lhs_ty, rhs)
                } else {
                    match self.bindings.type_of(rhs)? {
                        Some(rhs_ty) if self.same_type(&lhs_ty, &rhs_ty) => Ok(()),
                        _ => self.err(
                            "assignment of incompatible complex value",
                            &s.meta.loc,
                        ),
                    }
                }
            }
            StmtKind::Clear(e) | StmtKind::Undefine(e) => {
                self.expr(e)?;
                self.require_writable(e)
            }
            StmtKind::If { clauses } => {
                for c in clauses {
                    if let Some(cond) = &c.condition {
                        self.expr(cond)?;
                        self.require_boolean(cond, "if condition")?;
                    }
                    for s in &c.body {
                        self.stmt(s)?;
                    }
                }
                Ok(())
            }
            StmtKind::Switch { expr, cases } => {
                self.expr(expr)?;
                let scrutinee_ty = self.bindings.type_of(expr)?;
                for c in cases {
                    for m in &c.matches {
                        self.expr(m)?;
                        let m_ty = self.bindings.type_of(m)?;
                        if !self.values_comparable(&scrutinee_ty, &m_ty) {
                            return self.err(
                                "switch case type is incompatible with the switch expression",
                                &m.meta.loc,
                            );
                        }
                    }
                    for s in &c.body {
                        self.stmt(s)?;
                    }
                }
                Ok(())
            }
            StmtKind::For { quantifier, body } => {
                self.quantifier_shape(quantifier)?;
                for s in body {
                    self.stmt(s)?;
                }
                Ok(())
            }
            StmtKind::While { condition, body } => {
                self.expr(condition)?;
                self.require_boolean(condition, "while condition")?;
                for s in body {
                    self.stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Return(e) => {
                let Some(expected) = self.return_type.clone() else {
                    return self.err("return outside of a function", &s.meta.loc);
                };
                match (expected, e) {
                    (None, None) => Ok(()),
                    (None, Some(_)) => {
                        self.err("procedures cannot return a value", &s.meta.loc)
                    }
                    (Some(_), None) => {
                        self.err("function return requires a value", &s.meta.loc)
                    }
                    (Some(rt), Some(e)) => {
                        self.expr(e)?;
                        self.require_assignable(&rt, e)
                    }
                }
            }
            StmtKind::ProcedureCall { arguments, .. } => {
                self.call(s.meta.id, arguments, &s.meta.loc, false)?;
                Ok(())
            }
            StmtKind::Property { property, .. } => {
                self.expr(&property.expr)?;
                self.require_boolean(&property.expr, "property")
            }
            StmtKind::Error(_) => Ok(()),
            StmtKind::Alias { aliases, body } => {
                for a in aliases {
                    self.expr(&a.value)?;
                }
                for s in body {
                    self.stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Put(PutArg::Value(e)) => self.expr(e),
            StmtKind::Put(PutArg::Literal(_)) => Ok(()),
        }
    }

    fn expr(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Ternary { cond, lhs, rhs } => {
                self.expr(cond)?;
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.require_boolean(cond, "ternary condition")
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                if op.is_arithmetic() || op.is_comparison() {
                    self.require_numeric(lhs, "operand")?;
                    self.require_numeric(rhs, "operand")?;
                    Ok(())
                } else if op.is_logical() {
                    self.require_boolean(lhs, "operand")?;
                    self.require_boolean(rhs, "operand")
                } else {
                    // equality
                    self.equality(e, lhs, rhs)
                }
            }
            ExprKind::Unary { op, rhs } => {
                self.expr(rhs)?;
                match op {
                    UnaryOp::Negative => self.require_numeric(rhs, "operand"),
                    UnaryOp::Not => self.require_boolean(rhs, "operand"),
                }
            }
            ExprKind::Forall { quantifier, expr } | ExprKind::Exists { quantifier, expr } => {
                self.quantifier_shape(quantifier)?;
                self.expr(expr)?;
                self.require_boolean(expr, "quantified expression")
            }
            ExprKind::Id(_) | ExprKind::Number(_) => Ok(()),
            ExprKind::Field { .. } | ExprKind::Element { .. } => {
                // field existence and index/array shape are enforced by
                // type_of
                self.bindings.type_of(e)?;
                if let ExprKind::Element { array, index } = &e.kind {
                    self.expr(array)?;
                    self.expr(index)?;
                    let array_ty = self.designator_type(array)?;
                    let resolved = self.bindings.resolve_type(&array_ty);
                    if let TypeExprKind::Array { index: idx_ty, .. } = &resolved.kind {
                        let index_ty = self.bindings.type_of(index)?;
                        if !self.values_comparable(&Some((**idx_ty).clone()), &index_ty) {
                            return self.err(
                                "index type is incompatible with the array's index type",
                                &index.meta.loc,
                            );
                        }
                    }
                }
                if let ExprKind::Field { record, .. } = &e.kind {
                    self.expr(record)?;
                }
                Ok(())
            }
            ExprKind::Call { arguments, .. } => {
                let returns = self.call(e.meta.id, arguments, &e.meta.loc, true)?;
                if !returns {
                    return self.err(
                        "call to a procedure cannot be used as a value",
                        &e.meta.loc,
                    );
                }
                Ok(())
            }
            ExprKind::IsUndefined(inner) => {
                self.expr(inner)?;
                if !inner.is_lvalue_shape() {
                    return self.err(
                        "isundefined requires a variable designator",
                        &inner.meta.loc,
                    );
                }
                let ty = self.designator_type(inner)?;
                if !self.bindings.is_simple(&ty) {
                    return self.err(
                        "isundefined requires a simple-typed value",
                        &inner.meta.loc,
                    );
                }
                Ok(())
            }
        }
    }

    /// Checks a function/procedure call's arguments. Returns whether the
    /// callee has a return type.
    fn call(
        &mut self,
        site: NodeId,
        arguments: &[Expr],
        loc: &Location,
        _as_value: bool,
    ) -> Result<bool> {
        let Some(Binding::Function {
            parameters,
            return_type,
            ..
        }) = self.bindings.of(site).cloned()
        else {
            return self.err("unresolved call", loc);
        };
        if parameters.len() != arguments.len() {
            return self.err(
                format!(
                    "call supplies {} argument(s) but the target takes {}",
                    arguments.len(),
                    parameters.len()
                ),
                loc,
            );
        }
        for ((readonly, ty), arg) in parameters.iter().zip(arguments) {
            self.expr(arg)?;
            if !readonly {
                self.require_writable(arg)?;
                let arg_ty = self.designator_type(arg)?;
                if !self.same_type(ty, &arg_ty) {
                    return self.err(
                        "var argument type differs from the parameter type",
                        &arg.meta.loc,
                    );
                }
            } else if self.bindings.is_simple(ty) {
                self.require_assignable(ty, arg)?;
            } else {
                match self.bindings.type_of(arg)? {
                    Some(arg_ty) if self.same_type(ty, &arg_ty) => {}
                    _ => {
                        return self.err(
                            "argument type differs from the parameter type",
                            &arg.meta.loc,
                        )
                    }
                }
            }
        }
        Ok(return_type.is_some())
    }

    fn equality(&mut self, e: &Expr, lhs: &Expr, rhs: &Expr) -> Result<()> {
        let lhs_ty = self.bindings.type_of(lhs)?;
        let rhs_ty = self.bindings.type_of(rhs)?;
        let lhs_simple = lhs_ty
            .as_ref()
            .map_or(true, |t| self.bindings.is_simple(t));
        let rhs_simple = rhs_ty
            .as_ref()
            .map_or(true, |t| self.bindings.is_simple(t));
        match (lhs_simple, rhs_simple) {
            (true, true) => {
                if self.values_comparable(&lhs_ty, &rhs_ty) {
                    Ok(())
                } else {
                    self.err("comparison of incompatible types", &e.meta.loc)
                }
            }
            (false, false) => {
                let (Some(a), Some(b)) = (&lhs_ty, &rhs_ty) else {
                    return self.err("comparison of incompatible types", &e.meta.loc);
                };
                if self.same_type(a, b) {
                    // accepted, but codegen must compare packed bytes
                    self.out.complex_eq.insert(e.meta.id);
                    Ok(())
                } else {
                    self.err("comparison of incompatible complex types", &e.meta.loc)
                }
            }
            _ => self.err("comparison of incompatible types", &e.meta.loc),
        }
    }

    // ------------------------------------------------------------------
    // Shared checks
    // ------------------------------------------------------------------

    fn require_boolean(&self, e: &Expr, what: &str) -> Result<()> {
        if self.bindings.is_boolean(e) {
            Ok(())
        } else {
            self.err(format!("{} must be boolean", what), &e.meta.loc)
        }
    }

    /// Numeric means a literal/arithmetic result or a range-typed value.
    fn require_numeric(&self, e: &Expr, what: &str) -> Result<()> {
        match self.bindings.type_of(e)? {
            None => Ok(()),
            Some(ty) => {
                let resolved = self.bindings.resolve_type(&ty);
                if matches!(resolved.kind, TypeExprKind::Range { .. }) {
                    Ok(())
                } else {
                    self.err(format!("{} must be numeric", what), &e.meta.loc)
                }
            }
        }
    }

    /// Whether a value of `rhs`'s type may be stored in a simple `lhs_ty`.
    fn require_assignable(&self, lhs_ty: &TypeExpr, rhs: &Expr) -> Result<()> {
        let resolved = self.bindings.resolve_type(lhs_ty);
        match self.bindings.type_of(rhs)? {
            None => {
                if matches!(resolved.kind, TypeExprKind::Range { .. }) {
                    Ok(())
                } else {
                    self.err(
                        "numeric value assigned to a non-range type",
                        &rhs.meta.loc,
                    )
                }
            }
            Some(rhs_ty) => {
                if !self.bindings.is_simple(&rhs_ty) {
                    return self.err(
                        "complex value assigned to a simple-typed target",
                        &rhs.meta.loc,
                    );
                }
                if compatible_simple(self.bindings, resolved, &rhs_ty) {
                    Ok(())
                } else {
                    self.err("assignment of incompatible type", &rhs.meta.loc)
                }
            }
        }
    }

    /// Whether two (optional) simple value types can be compared.
    fn values_comparable(&self, a: &Option<TypeExpr>, b: &Option<TypeExpr>) -> bool {
        match (a, b) {
            (None, None) => true,
            (None, Some(t)) | (Some(t), None) => {
                let resolved = self.bindings.resolve_type(t);
                matches!(resolved.kind, TypeExprKind::Range { .. })
            }
            (Some(a), Some(b)) => compatible_simple(self.bindings, a, b),
        }
    }

    /// Deep structural identity of two types (same declaration, or
    /// structurally equal component by component).
    fn same_type(&self, a: &TypeExpr, b: &TypeExpr) -> bool {
        let a = self.bindings.resolve_type(a);
        let b = self.bindings.resolve_type(b);
        if a.meta.id == b.meta.id {
            return true;
        }
        match (&a.kind, &b.kind) {
            (TypeExprKind::Array { index: ia, element: ea }, TypeExprKind::Array { index: ib, element: eb }) => {
                self.same_type(ia, ib) && self.same_type(ea, eb)
            }
            (TypeExprKind::Record { fields: fa }, TypeExprKind::Record { fields: fb }) => {
                fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb.iter())
                        .all(|(x, y)| x.name == y.name && self.same_type(&x.ty, &y.ty))
            }
            (TypeExprKind::Range { .. }, TypeExprKind::Range { .. }) => {
                match (self.bindings.bounds(a), self.bindings.bounds(b)) {
                    (Ok(ba), Ok(bb)) => ba == bb,
                    _ => false,
                }
            }
            _ => compatible_simple(self.bindings, a, b),
        }
    }

    /// The type of a designator used as an assignment or var-argument
    /// target.
    fn designator_type(&self, e: &Expr) -> Result<TypeExpr> {
        match self.bindings.type_of(e)? {
            Some(ty) => Ok(ty),
            None => Err(LocatedError::new(
                "expression has no storage type",
                e.meta.loc.clone(),
            )),
        }
    }

    /// Rejects writes through constants, readonly parameters, quantifier
    /// variables, and non-lvalue expressions.
    fn require_writable(&self, e: &Expr) -> Result<()> {
        if !e.is_lvalue_shape() {
            return self.err("assignment target is not a variable designator", &e.meta.loc);
        }
        let mut root = e;
        loop {
            match &root.kind {
                ExprKind::Field { record, .. } => root = record,
                ExprKind::Element { array, .. } => root = array,
                _ => break,
            }
        }
        match self.bindings.of(root.meta.id) {
            Some(Binding::Var { readonly: false, .. }) => Ok(()),
            Some(Binding::Var { readonly: true, .. }) => {
                self.err("cannot modify a readonly parameter", &root.meta.loc)
            }
            Some(Binding::Alias { value, .. }) => self.require_writable(value),
            Some(Binding::Quantifier { .. }) => {
                self.err("cannot modify a quantifier variable", &root.meta.loc)
            }
            Some(Binding::Const { .. }) | Some(Binding::EnumMember { .. }) => {
                self.err("cannot modify a constant", &root.meta.loc)
            }
            _ => self.err("assignment target is not a variable", &root.meta.loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolve;
    use crate::parser::parse;

    fn check(src: &str) -> Result<Validated> {
        let model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model)?;
        validate(&model, &bindings)
    }

    #[test]
    fn accepts_a_well_typed_model() {
        assert!(check(
            "const N: 2;\n\
             type pid: scalarset(N);\n\
             var turn: pid; flags: array [pid] of boolean;\n\
             startstate begin undefine turn; for p: pid do flags[p] := false; endfor; end;\n\
             ruleset p: pid do rule \"claim\" !flags[p] ==> begin flags[p] := true; end; end;\n\
             invariant \"exclusive\" forall p: pid do forall q: pid do\n\
               (flags[p] & flags[q]) -> p = q end end;"
        )
        .is_ok());
    }

    #[test]
    fn rejects_incompatible_comparison() {
        let err = check(
            "type color: enum { red, green };\n\
             var c: color; var x: 0..3;\n\
             invariant c = x;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("incompatible"));
    }

    #[test]
    fn rejects_assignment_type_mismatch() {
        let err = check(
            "type color: enum { red, green };\n\
             var c: color;\n\
             startstate begin c := 1; end;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-range"));
    }

    #[test]
    fn rejects_write_to_constant() {
        let err = check("const N: 3; startstate begin N := 1; end;").unwrap_err();
        assert!(err.to_string().contains("constant"));
    }

    #[test]
    fn rejects_non_index_array_index() {
        let err = check("var a: array [record f: 0..1; end] of boolean;").unwrap_err();
        assert!(err.to_string().contains("index type"));
    }

    #[test]
    fn rejects_bad_range_bounds() {
        let err = check("var x: 3..1;").unwrap_err();
        assert!(err.to_string().contains("lower bound exceeds"));
    }

    #[test]
    fn rejects_complex_function_returns() {
        let err = check(
            "type r: record f: 0..1; end;\n\
             var x: r;\n\
             function get(): r; begin return x; end;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("simple types"));
    }

    #[test]
    fn rejects_return_type_mismatch() {
        let err = check(
            "type color: enum { red, green };\n\
             var c: color;\n\
             function f(): 0..3; begin return c; end;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("incompatible"));
    }

    #[test]
    fn flags_complex_equality_for_codegen() {
        let validated = check(
            "type r: record f: 0..1; g: boolean; end;\n\
             var a: r; b: r;\n\
             invariant a = b;",
        )
        .unwrap();
        assert_eq!(validated.complex_eq.len(), 1);
    }

    #[test]
    fn rejects_ordering_comparison_of_records() {
        let err = check(
            "type r: record f: 0..1; end;\n\
             var a: r; b: r;\n\
             invariant a < b;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn rejects_guard_that_is_not_boolean() {
        let err = check("var x: 0..3; rule x + 1 ==> begin x := 0; end;").unwrap_err();
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn rejects_var_argument_mismatch() {
        let err = check(
            "var x: boolean;\n\
             procedure bump(var n: 0..3); begin n := n + 1; end;\n\
             rule begin bump(x); end;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("var argument"));
    }

    #[test]
    fn accepts_isundefined_and_undefine() {
        assert!(check(
            "var x: 0..3;\n\
             startstate begin undefine x; end;\n\
             rule isundefined(x) ==> begin x := 0; end;"
        )
        .is_ok());
    }
}
