//! Declarations to the solver: sorts, variables, constants, records.
//!
//! Each visible declaration becomes a solver constant named after its
//! declaration id, with assertions pinning constants to their folded
//! values and constraining simple-typed variables to their bounds. Record
//! types are defined as SMT datatypes so field reads translate to
//! accessor applications.

use crate::error::VerifyResult;
use crate::logic::Logic;
use crate::solver::Solver;
use crate::translate::mangle;
use num_bigint::BigInt;
use verge_language::analysis::Bindings;
use verge_language::ast::{NodeId, TypeExpr, TypeExprKind};

/// The SMT sort a type expression maps to, or `None` for types without a
/// translation.
pub fn sort_of(ty: &TypeExpr, bindings: &Bindings, logic: &Logic) -> Option<String> {
    let resolved = bindings.resolve_type(ty);
    match &resolved.kind {
        TypeExprKind::Range { .. }
        | TypeExprKind::Enum { .. }
        | TypeExprKind::Scalarset { .. } => Some(logic.integer_type().to_string()),
        TypeExprKind::Array { index, element } => {
            let index_sort = sort_of(index, bindings, logic)?;
            let element_sort = sort_of(element, bindings, logic)?;
            Some(format!("(Array {} {})", index_sort, element_sort))
        }
        TypeExprKind::Record { .. } => Some(mangle(resolved.meta.id)),
        TypeExprKind::Named(_) => None,
    }
}

/// Defines a record type as a datatype, including (recursively) any
/// record types among its fields. Already-defined ids are skipped.
pub fn define_record(
    solver: &mut Solver,
    ty: &TypeExpr,
    bindings: &Bindings,
    logic: &Logic,
    defined: &mut Vec<NodeId>,
) -> VerifyResult<()> {
    let resolved = bindings.resolve_type(ty);
    let TypeExprKind::Record { fields } = &resolved.kind else {
        return Ok(());
    };
    if defined.contains(&resolved.meta.id) {
        return Ok(());
    }

    // inner records first, so their sorts exist when referenced
    for field in fields {
        define_record(solver, &field.ty, bindings, logic, defined)?;
    }

    let sort = mangle(resolved.meta.id);
    let mut text = format!("(declare-datatypes () (({} (mk_{}", sort, sort);
    for field in fields {
        let Some(field_sort) = sort_of(&field.ty, bindings, logic) else {
            return Ok(()); // leave the record undefined; uses will skip
        };
        text.push_str(&format!(" ({}_{} {})", sort, field.name, field_sort));
    }
    text.push_str("))))\n");
    solver.write(&text);
    defined.push(resolved.meta.id);
    Ok(())
}

/// Declares a variable (or parameter, or quantified variable) with its
/// type's bound constraints.
pub fn declare_var(
    solver: &mut Solver,
    decl: NodeId,
    ty: &TypeExpr,
    bindings: &Bindings,
    logic: &Logic,
) {
    let Some(sort) = sort_of(ty, bindings, logic) else {
        return;
    };
    let name = mangle(decl);
    solver.write(&format!("(declare-fun {} () {})\n", name, sort));

    // range constraints only make sense for simple-typed symbols
    if bindings.is_simple(ty) {
        if let Ok((lb, ub)) = bindings.bounds(ty) {
            solver.write(&format!(
                "(assert ({} {} {}))\n(assert ({} {} {}))\n",
                logic.geq(),
                name,
                logic.numeric_literal(&lb),
                logic.leq(),
                name,
                logic.numeric_literal(&ub)
            ));
        }
    }
}

/// Declares an integer constant pinned to its folded value.
pub fn declare_const(
    solver: &mut Solver,
    decl: NodeId,
    value: &BigInt,
    logic: &Logic,
) {
    let name = mangle(decl);
    solver.write(&format!(
        "(declare-fun {} () {})\n(assert (= {} {}))\n",
        name,
        logic.integer_type(),
        name,
        logic.numeric_literal(value)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicMode;
    use verge_language::analysis::resolve;
    use verge_language::ast::Decl;
    use verge_language::parser::parse;

    #[test]
    fn sorts_for_simple_and_composite_types() {
        let model = parse(
            "type r: record f: 0..3; end;\n\
             var x: 0..3; a: array [0..2] of boolean; rec: r;",
            None,
        )
        .unwrap();
        let bindings = resolve(&model).unwrap();
        let logic = Logic::new(LogicMode::Integer);

        let types: Vec<_> = model
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Var(v) => Some(&v.ty),
                _ => None,
            })
            .collect();

        assert_eq!(sort_of(types[0], &bindings, &logic).unwrap(), "Int");
        assert_eq!(
            sort_of(types[1], &bindings, &logic).unwrap(),
            "(Array Int Int)"
        );
        assert!(sort_of(types[2], &bindings, &logic)
            .unwrap()
            .starts_with('s'));
    }

    #[test]
    fn variable_declarations_carry_bounds() {
        let model = parse("var x: 2..7;", None).unwrap();
        let bindings = resolve(&model).unwrap();
        let logic = Logic::new(LogicMode::Integer);
        let mut solver = Solver::new("true", vec![], 1000);
        solver.open_scope();

        let Decl::Var(v) = &model.decls[0] else {
            panic!()
        };
        declare_var(&mut solver, v.meta.id, &v.ty, &bindings, &logic);

        let text = solver_text(&mut solver);
        assert!(text.contains("declare-fun"));
        assert!(text.contains("(>= "));
        assert!(text.contains(" 2)"));
        assert!(text.contains("(<= "));
        assert!(text.contains(" 7)"));
    }

    #[test]
    fn record_datatypes_define_field_accessors() {
        let model = parse("type r: record f: 0..3; g: boolean; end; var v: r;", None).unwrap();
        let bindings = resolve(&model).unwrap();
        let logic = Logic::new(LogicMode::Integer);
        let mut solver = Solver::new("true", vec![], 1000);
        solver.open_scope();

        let Decl::Type(t) = &model.decls[0] else {
            panic!()
        };
        let mut defined = Vec::new();
        define_record(&mut solver, &t.value, &bindings, &logic, &mut defined).unwrap();

        let text = solver_text(&mut solver);
        assert!(text.contains("declare-datatypes"));
        assert!(text.contains("_f Int"));
        assert!(text.contains("_g Int"));
        assert_eq!(defined.len(), 1);
    }

    /// The accumulated prelude of every open scope.
    fn solver_text(solver: &mut Solver) -> String {
        solver.prelude_for_tests().concat()
    }
}
