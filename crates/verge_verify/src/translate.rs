//! Expression translation to SMT-LIB.
//!
//! Symbols are named by the unique id of the *declaration* they resolve
//! to (`s<id>`), so every use site of a variable maps to one solver
//! constant, and shadowing falls out of the resolver's scoping that the
//! simplification pass replays. Enum members become numeric literals;
//! aliases are inlined. Function calls, `isundefined`, and existential
//! quantifiers have no translation and raise [`VerifyError::Unsupported`],
//! which the caller treats as "leave this expression alone".

use crate::error::{VerifyError, VerifyResult};
use crate::logic::Logic;
use num_bigint::BigInt;
use verge_language::analysis::{Binding, Bindings};
use verge_language::ast::{
    BinaryOp, Expr, ExprKind, NodeId, Quantifier, QuantifierKind, TypeExprKind, UnaryOp,
};

/// The solver-side name of the declaration with the given id.
pub fn mangle(id: NodeId) -> String {
    format!("s{}", id.0)
}

/// Translates a (resolved) expression into an SMT-LIB term.
pub fn translate(e: &Expr, bindings: &Bindings, logic: &Logic) -> VerifyResult<String> {
    match &e.kind {
        ExprKind::Number(n) => Ok(logic.numeric_literal(n)),

        ExprKind::Ternary { cond, lhs, rhs } => Ok(format!(
            "(ite {} {} {})",
            translate(cond, bindings, logic)?,
            translate(lhs, bindings, logic)?,
            translate(rhs, bindings, logic)?
        )),

        ExprKind::Binary { op, lhs, rhs } => {
            let l = translate(lhs, bindings, logic)?;
            let r = translate(rhs, bindings, logic)?;
            let term = match op {
                BinaryOp::Add => format!("({} {} {})", logic.add(), l, r),
                BinaryOp::Sub => format!("({} {} {})", logic.sub(), l, r),
                BinaryOp::Mul => format!("({} {} {})", logic.mul(), l, r),
                BinaryOp::Div => format!("({} {} {})", logic.div(), l, r),
                BinaryOp::Mod => format!("({} {} {})", logic.modulo(), l, r),
                BinaryOp::Lt => format!("({} {} {})", logic.lt(), l, r),
                BinaryOp::Leq => format!("({} {} {})", logic.leq(), l, r),
                BinaryOp::Gt => format!("({} {} {})", logic.gt(), l, r),
                BinaryOp::Geq => format!("({} {} {})", logic.geq(), l, r),
                BinaryOp::Eq => format!("(= {} {})", l, r),
                BinaryOp::Neq => format!("(not (= {} {}))", l, r),
                BinaryOp::And => format!("(and {} {})", l, r),
                BinaryOp::Or => format!("(or {} {})", l, r),
                BinaryOp::Implication => format!("(=> {} {})", l, r),
            };
            Ok(term)
        }

        ExprKind::Unary { op, rhs } => {
            let r = translate(rhs, bindings, logic)?;
            Ok(match op {
                UnaryOp::Not => format!("(not {})", r),
                UnaryOp::Negative => format!("({} {})", logic.neg(), r),
            })
        }

        // literals substituted by an earlier simplification round have no
        // binding entry; recognize them by name
        ExprKind::Id(name) if bindings.of(e.meta.id).is_none() => match name.as_str() {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            _ => Err(VerifyError::unsupported(e)),
        },

        ExprKind::Id(_) => match bindings.of(e.meta.id) {
            Some(Binding::Var { decl, .. }) | Some(Binding::Const { decl, .. }) => {
                Ok(mangle(*decl))
            }
            Some(Binding::Quantifier { decl, .. }) => Ok(mangle(*decl)),
            Some(Binding::EnumMember { ty, index }) => {
                // booleans are native; other members are their ordinal
                if verge_language::analysis::is_boolean_type(ty) {
                    Ok(if *index == 0 { "false" } else { "true" }.to_string())
                } else {
                    Ok(logic.numeric_literal(&BigInt::from(*index)))
                }
            }
            Some(Binding::Alias { value, .. }) => translate(value, bindings, logic),
            _ => Err(VerifyError::unsupported(e)),
        },

        ExprKind::Field { record, field } => {
            /* the record's type was previously defined as a datatype; its
             * accessors are named <sort>_<field>
             */
            let record_ty = bindings
                .type_of(record)
                .ok()
                .flatten()
                .ok_or_else(|| VerifyError::unsupported(e))?;
            let resolved = bindings.resolve_type(&record_ty);
            if !matches!(resolved.kind, TypeExprKind::Record { .. }) {
                return Err(VerifyError::unsupported(e));
            }
            let root = mangle(resolved.meta.id);
            Ok(format!(
                "({}_{} {})",
                root,
                field,
                translate(record, bindings, logic)?
            ))
        }

        ExprKind::Element { array, index } => Ok(format!(
            "(select {} {})",
            translate(array, bindings, logic)?,
            translate(index, bindings, logic)?
        )),

        ExprKind::Forall { quantifier, expr } => {
            translate_forall(quantifier, expr, bindings, logic)
        }

        // existential quantification, calls and undefined tests are left
        // to the checker
        ExprKind::Exists { .. } | ExprKind::Call { .. } | ExprKind::IsUndefined(_) => {
            Err(VerifyError::unsupported(e))
        }
    }
}

fn translate_forall(
    q: &Quantifier,
    body: &Expr,
    bindings: &Bindings,
    logic: &Logic,
) -> VerifyResult<String> {
    let name = mangle(q.meta.id);
    let sort = logic.integer_type();

    // the body holds vacuously outside the quantifier's bounds
    let (lower, upper): (String, String) = match &q.kind {
        QuantifierKind::Typed(ty) => {
            let resolved = bindings.resolve_type(ty);
            match &resolved.kind {
                TypeExprKind::Range { min, max } => (
                    translate(min, bindings, logic)?,
                    translate(max, bindings, logic)?,
                ),
                TypeExprKind::Enum { members } => (
                    logic.numeric_literal(&BigInt::from(0)),
                    logic.numeric_literal(&BigInt::from(members.len() as i64 - 1)),
                ),
                TypeExprKind::Scalarset { bound } => {
                    let b = bindings
                        .constant_fold(bound)
                        .map_err(|_| VerifyError::unsupported(body))?;
                    (
                        logic.numeric_literal(&BigInt::from(0)),
                        logic.numeric_literal(&(b - 1)),
                    )
                }
                _ => return Err(VerifyError::unsupported(body)),
            }
        }
        QuantifierKind::Bounded { from, to, .. } => (
            translate(from, bindings, logic)?,
            translate(to, bindings, logic)?,
        ),
    };

    Ok(format!(
        "(forall (({} {})) (or ({} {} {}) ({} {} {}) {}))",
        name,
        sort,
        logic.lt(),
        name,
        lower,
        logic.gt(),
        name,
        upper,
        translate(body, bindings, logic)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicMode;
    use verge_language::analysis::resolve;
    use verge_language::parser::parse;
    use verge_language::traverse::{for_each_expr, NodeRef};

    /// Translates the guard of the single rule in `src`.
    fn translate_guard(src: &str) -> VerifyResult<String> {
        let model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        let logic = Logic::new(LogicMode::Integer);
        let guard = match &model.rules[0] {
            verge_language::ast::Rule::Simple(r) => r.guard.clone().unwrap(),
            other => panic!("unexpected rule {:?}", other),
        };
        translate(&guard, &bindings, &logic)
    }

    #[test]
    fn arithmetic_and_comparisons() {
        let term = translate_guard(
            "var x: 0..5;\n\
             rule x + 1 <= 4 ==> begin x := 0; end;",
        )
        .unwrap();
        // x mangles to its VarDecl's id
        assert!(term.starts_with("(<= (+ s"));
        assert!(term.ends_with(" 1) 4)"));
    }

    #[test]
    fn same_variable_shares_one_symbol() {
        let term = translate_guard(
            "var x: 0..5;\n\
             rule x = x ==> begin x := 0; end;",
        )
        .unwrap();
        // "(= sN sN)" with matching names
        let inner = term
            .strip_prefix("(= ")
            .and_then(|t| t.strip_suffix(')'))
            .unwrap();
        let mut parts = inner.split(' ');
        assert_eq!(parts.next(), parts.next());
    }

    #[test]
    fn boolean_literals_are_native() {
        let term = translate_guard(
            "var b: boolean;\n\
             rule b = true ==> begin b := false; end;",
        )
        .unwrap();
        assert!(term.contains("true"));
    }

    #[test]
    fn calls_are_unsupported() {
        let model = parse(
            "var x: 0..5;\n\
             function f(): 0..5; begin return 1; end;\n\
             rule f() = 1 ==> begin x := 0; end;",
            None,
        )
        .unwrap();
        let bindings = resolve(&model).unwrap();
        let logic = Logic::new(LogicMode::Integer);
        let mut saw_unsupported = false;
        for_each_expr(NodeRef::Model(&model), &mut |e| {
            if matches!(e.kind, ExprKind::Call { .. }) {
                saw_unsupported = translate(e, &bindings, &logic).is_err();
            }
        });
        assert!(saw_unsupported);
    }

    #[test]
    fn forall_carries_bound_constraints() {
        let term = translate_guard(
            "var a: array [0..2] of boolean;\n\
             rule forall i: 0..2 do a[i] end ==> begin a[0] := false; end;",
        )
        .unwrap();
        assert!(term.starts_with("(forall (("));
        assert!(term.contains("(< s"));
        assert!(term.contains("(> s"));
        assert!(term.contains("select"));
    }
}
