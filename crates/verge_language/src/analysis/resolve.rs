//! Symbol resolution.
//!
//! Walks the model with a lexical scope stack (model scope ⊃ rule/function
//! scope ⊃ block/quantifier scope) and binds every name use to the nearest
//! declaration, recording the result in a [`Bindings`] side table keyed by
//! node id. The tree is not mutated.
//!
//! The global scope is pre-seeded with the builtin `boolean` type and its
//! members `false` and `true`. Members of every enum type enter the scope
//! the enum is written in, so `enum { red, green }` makes `red` and
//! `green` usable wherever the type is visible.
//!
//! The SMT simplifier replays exactly this scope discipline when declaring
//! symbols to the solver, so shadowing behaves identically there.

use super::{boolean_type, Binding, Bindings};
use crate::ast::*;
use rustc_hash::FxHashMap;
use verge_base::{LocatedError, Location, Result};

/// Resolves all names in the model, producing the bindings table.
pub fn resolve(model: &Model) -> Result<Bindings> {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        bindings: Bindings::new(),
    };
    resolver.model(model)?;
    Ok(resolver.bindings)
}

struct Resolver {
    scopes: Vec<FxHashMap<String, Binding>>,
    bindings: Bindings,
}

impl Resolver {
    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declares a name in the innermost scope. Shadowing an outer scope is
    /// allowed; redeclaring within the same scope is not.
    fn declare(&mut self, name: &str, loc: &Location, binding: Binding) -> Result<()> {
        let scope = self.scopes.last_mut().expect("no open scope");
        if scope.contains_key(name) {
            return Err(LocatedError::new(
                format!("duplicate declaration of \"{}\"", name),
                loc.clone(),
            ));
        }
        scope.insert(name.to_string(), binding);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn model(&mut self, m: &Model) -> Result<()> {
        self.push_scope();

        // builtin boolean and its members
        let boolean = boolean_type();
        self.declare(
            "boolean",
            &Location::default(),
            Binding::Type {
                decl: NodeId::UNASSIGNED,
                ty: boolean.clone(),
            },
        )?;
        for (index, member) in ["false", "true"].iter().enumerate() {
            self.declare(
                member,
                &Location::default(),
                Binding::EnumMember {
                    ty: boolean.clone(),
                    index: index as u64,
                },
            )?;
        }

        for d in &m.decls {
            self.decl(d)?;
        }
        for f in &m.functions {
            self.function(f)?;
        }
        for r in &m.rules {
            self.rule(r)?;
        }

        self.pop_scope();
        Ok(())
    }

    fn decl(&mut self, d: &Decl) -> Result<()> {
        match d {
            Decl::Const(c) => {
                self.expr(&c.value)?;
                self.declare(
                    &c.name,
                    &c.meta.loc,
                    Binding::Const {
                        decl: c.meta.id,
                        value: c.value.clone(),
                    },
                )
            }
            Decl::Type(t) => {
                self.type_expr(&t.value)?;
                self.declare(
                    &t.name,
                    &t.meta.loc,
                    Binding::Type {
                        decl: t.meta.id,
                        ty: t.value.clone(),
                    },
                )
            }
            Decl::Var(v) => {
                self.type_expr(&v.ty)?;
                self.declare(
                    &v.name,
                    &v.meta.loc,
                    Binding::Var {
                        decl: v.meta.id,
                        ty: v.ty.clone(),
                        readonly: v.readonly,
                    },
                )
            }
            Decl::Alias(a) => {
                self.expr(&a.value)?;
                self.declare(
                    &a.name,
                    &a.meta.loc,
                    Binding::Alias {
                        decl: a.meta.id,
                        value: a.value.clone(),
                    },
                )
            }
        }
    }

    fn function(&mut self, f: &Function) -> Result<()> {
        self.push_scope();
        let mut parameters = Vec::new();
        for p in &f.parameters {
            self.type_expr(&p.ty)?;
            parameters.push((p.readonly, p.ty.clone()));
            self.declare(
                &p.name,
                &p.meta.loc,
                Binding::Var {
                    decl: p.meta.id,
                    ty: p.ty.clone(),
                    readonly: p.readonly,
                },
            )?;
        }
        if let Some(ret) = &f.return_type {
            self.type_expr(ret)?;
        }
        for d in &f.decls {
            self.decl(d)?;
        }
        for s in &f.body {
            self.stmt(s)?;
        }
        self.pop_scope();

        self.declare(
            &f.name,
            &f.meta.loc,
            Binding::Function {
                decl: f.meta.id,
                parameters,
                return_type: f.return_type.clone(),
            },
        )
    }

    fn type_expr(&mut self, t: &TypeExpr) -> Result<()> {
        match &t.kind {
            TypeExprKind::Range { min, max } => {
                self.expr(min)?;
                self.expr(max)
            }
            TypeExprKind::Scalarset { bound } => self.expr(bound),
            TypeExprKind::Array { index, element } => {
                self.type_expr(index)?;
                self.type_expr(element)
            }
            TypeExprKind::Record { fields } => {
                for f in fields {
                    self.type_expr(&f.ty)?;
                }
                Ok(())
            }
            TypeExprKind::Enum { members } => {
                for (index, (name, loc)) in members.iter().enumerate() {
                    self.declare(
                        name,
                        loc,
                        Binding::EnumMember {
                            ty: t.clone(),
                            index: index as u64,
                        },
                    )?;
                }
                Ok(())
            }
            TypeExprKind::Named(name) => match self.lookup(name) {
                Some(binding @ Binding::Type { .. }) => {
                    let binding = binding.clone();
                    self.bindings.insert(t.meta.id, binding);
                    Ok(())
                }
                Some(_) => Err(LocatedError::new(
                    format!("\"{}\" is not a type", name),
                    t.meta.loc.clone(),
                )),
                None => Err(LocatedError::new(
                    format!("unresolved type \"{}\"", name),
                    t.meta.loc.clone(),
                )),
            },
        }
    }

    fn quantifier(&mut self, q: &Quantifier) -> Result<()> {
        let ty = match &q.kind {
            QuantifierKind::Typed(t) => {
                self.type_expr(t)?;
                t.clone()
            }
            QuantifierKind::Bounded { from, to, step } => {
                self.expr(from)?;
                self.expr(to)?;
                if let Some(step) = step {
                    self.expr(step)?;
                }
                // the iteration variable behaves as a range value
                TypeExpr {
                    meta: NodeMeta::new(q.meta.loc.clone()),
                    kind: TypeExprKind::Range {
                        min: from.clone(),
                        max: to.clone(),
                    },
                }
            }
        };
        self.declare(
            &q.name,
            &q.meta.loc,
            Binding::Quantifier {
                decl: q.meta.id,
                ty,
            },
        )
    }

    fn alias_decls(&mut self, aliases: &[AliasDecl]) -> Result<()> {
        for a in aliases {
            self.expr(&a.value)?;
            self.declare(
                &a.name,
                &a.meta.loc,
                Binding::Alias {
                    decl: a.meta.id,
                    value: a.value.clone(),
                },
            )?;
        }
        Ok(())
    }

    fn rule(&mut self, r: &Rule) -> Result<()> {
        match r {
            Rule::Start(s) => {
                self.push_scope();
                for q in &s.quantifiers {
                    self.quantifier(q)?;
                }
                self.alias_decls(&s.aliases)?;
                for d in &s.decls {
                    self.decl(d)?;
                }
                for st in &s.body {
                    self.stmt(st)?;
                }
                self.pop_scope();
                Ok(())
            }
            Rule::Simple(s) => {
                self.push_scope();
                for q in &s.quantifiers {
                    self.quantifier(q)?;
                }
                self.alias_decls(&s.aliases)?;
                if let Some(g) = &s.guard {
                    self.expr(g)?;
                }
                for d in &s.decls {
                    self.decl(d)?;
                }
                for st in &s.body {
                    self.stmt(st)?;
                }
                self.pop_scope();
                Ok(())
            }
            Rule::Property(p) => {
                self.push_scope();
                for q in &p.quantifiers {
                    self.quantifier(q)?;
                }
                self.alias_decls(&p.aliases)?;
                self.expr(&p.property.expr)?;
                self.pop_scope();
                Ok(())
            }
            Rule::Ruleset(rs) => {
                self.push_scope();
                for q in &rs.quantifiers {
                    self.quantifier(q)?;
                }
                for inner in &rs.rules {
                    self.rule(inner)?;
                }
                self.pop_scope();
                Ok(())
            }
            Rule::Alias(ar) => {
                self.push_scope();
                self.alias_decls(&ar.aliases)?;
                for inner in &ar.rules {
                    self.rule(inner)?;
                }
                self.pop_scope();
                Ok(())
            }
        }
    }

    fn stmt(&mut self, s: &Stmt) -> Result<()> {
        match &s.kind {
            StmtKind::Assignment { lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)
            }
            StmtKind::Clear(e) | StmtKind::Undefine(e) => self.expr(e),
            StmtKind::If { clauses } => {
                for c in clauses {
                    if let Some(cond) = &c.condition {
                        self.expr(cond)?;
                    }
                    for s in &c.body {
                        self.stmt(s)?;
                    }
                }
                Ok(())
            }
            StmtKind::Switch { expr, cases } => {
                self.expr(expr)?;
                for c in cases {
                    for m in &c.matches {
                        self.expr(m)?;
                    }
                    for s in &c.body {
                        self.stmt(s)?;
                    }
                }
                Ok(())
            }
            StmtKind::For { quantifier, body } => {
                self.push_scope();
                self.quantifier(quantifier)?;
                for s in body {
                    self.stmt(s)?;
                }
                self.pop_scope();
                Ok(())
            }
            StmtKind::While { condition, body } => {
                self.expr(condition)?;
                for s in body {
                    self.stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Return(e) => match e {
                Some(e) => self.expr(e),
                None => Ok(()),
            },
            StmtKind::ProcedureCall { name, arguments } => {
                for a in arguments {
                    self.expr(a)?;
                }
                match self.lookup(name) {
                    Some(binding @ Binding::Function { .. }) => {
                        let binding = binding.clone();
                        self.bindings.insert(s.meta.id, binding);
                        Ok(())
                    }
                    Some(_) => Err(LocatedError::new(
                        format!("\"{}\" is not a procedure", name),
                        s.meta.loc.clone(),
                    )),
                    None => Err(LocatedError::new(
                        format!("unresolved procedure \"{}\"", name),
                        s.meta.loc.clone(),
                    )),
                }
            }
            StmtKind::Property { property, .. } => self.expr(&property.expr),
            StmtKind::Error(_) => Ok(()),
            StmtKind::Alias { aliases, body } => {
                self.push_scope();
                self.alias_decls(aliases)?;
                for s in body {
                    self.stmt(s)?;
                }
                self.pop_scope();
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
                self.expr(rhs)
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)
            }
            ExprKind::Unary { rhs, .. } => self.expr(rhs),
            ExprKind::Forall { quantifier, expr } | ExprKind::Exists { quantifier, expr } => {
                self.push_scope();
                self.quantifier(quantifier)?;
                self.expr(expr)?;
                self.pop_scope();
                Ok(())
            }
            ExprKind::Id(name) => match self.lookup(name) {
                Some(binding) => {
                    let binding = binding.clone();
                    self.bindings.insert(e.meta.id, binding);
                    Ok(())
                }
                None => Err(LocatedError::new(
                    format!("unresolved symbol \"{}\"", name),
                    e.meta.loc.clone(),
                )),
            },
            ExprKind::Field { record, .. } => self.expr(record),
            ExprKind::Element { array, index } => {
                self.expr(array)?;
                self.expr(index)
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                for a in arguments {
                    self.expr(a)?;
                }
                match self.lookup(function) {
                    Some(binding @ Binding::Function { .. }) => {
                        let binding = binding.clone();
                        self.bindings.insert(e.meta.id, binding);
                        Ok(())
                    }
                    Some(_) => Err(LocatedError::new(
                        format!("\"{}\" is not a function", function),
                        e.meta.loc.clone(),
                    )),
                    None => Err(LocatedError::new(
                        format!("unresolved function \"{}\"", function),
                        e.meta.loc.clone(),
                    )),
                }
            }
            ExprKind::Number(_) => Ok(()),
            ExprKind::IsUndefined(inner) => self.expr(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve_src(src: &str) -> Result<Bindings> {
        let model = parse(src, None).expect("parse failed");
        resolve(&model)
    }

    #[test]
    fn resolves_builtin_boolean() {
        assert!(resolve_src("var v: boolean; startstate begin v := false; end;").is_ok());
    }

    #[test]
    fn unresolved_symbol_is_an_error() {
        let err = resolve_src("startstate begin nonexistent := 1; end;").unwrap_err();
        assert!(err.to_string().contains("unresolved symbol \"nonexistent\""));
    }

    #[test]
    fn unresolved_type_is_an_error() {
        let err = resolve_src("var x: missing;").unwrap_err();
        assert!(err.to_string().contains("unresolved type \"missing\""));
    }

    #[test]
    fn duplicate_declaration_is_an_error() {
        let err = resolve_src("var x: boolean; var x: boolean;").unwrap_err();
        assert!(err.to_string().contains("duplicate declaration"));
    }

    #[test]
    fn enum_members_enter_scope() {
        assert!(resolve_src(
            "type color: enum { red, green };\n\
             var c: color;\n\
             startstate begin c := red; end;"
        )
        .is_ok());
    }

    #[test]
    fn quantifiers_shadow_outer_names() {
        assert!(resolve_src(
            "var x: 0..3;\n\
             invariant forall x: 0..2 do x <= 2 end;"
        )
        .is_ok());
    }

    #[test]
    fn aliases_resolve_in_order() {
        assert!(resolve_src(
            "var x: 0..3;\n\
             rule begin alias a: x; b: a do b := 1; end; end;"
        )
        .is_ok());
    }

    #[test]
    fn inner_scopes_end() {
        // the for variable is not visible after the loop
        let err = resolve_src(
            "var x: 0..3;\n\
             rule begin for i: 0..2 do x := i; endfor; x := i; end;",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unresolved symbol \"i\""));
    }

    #[test]
    fn calls_bind_to_functions() {
        let bindings = resolve_src(
            "var x: 0..3;\n\
             function next(n: 0..3): 0..3; begin return n; end;\n\
             rule begin x := next(x); end;",
        )
        .unwrap();
        // at least one call node must carry a function binding
        let has_fn = (1..10_000).any(|i| {
            matches!(
                bindings.of(NodeId(i)),
                Some(Binding::Function { .. })
            )
        });
        assert!(has_fn);
    }
}
