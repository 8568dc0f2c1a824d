//! Statement emission.

use super::expr::{lvalue, rvalue, FnEnv};
use super::types::{emit_clear, emit_put_value, emit_undefine, simple_bounds};
use super::EmitCtx;
use std::fmt::Write;
use verge_base::Result;
use verge_language::ast::{Expr, PropertyCategory, PutArg, Stmt, StmtKind};

pub(crate) fn emit_stmts(
    out: &mut String,
    indent: usize,
    stmts: &[Stmt],
    cx: &EmitCtx,
    env: &FnEnv,
) -> Result<()> {
    for s in stmts {
        emit_stmt(out, indent, s, cx, env)?;
    }
    Ok(())
}

pub(crate) fn emit_stmt(
    out: &mut String,
    indent: usize,
    s: &Stmt,
    cx: &EmitCtx,
    env: &FnEnv,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    match &s.kind {
        StmtKind::Assignment { lhs, rhs } => {
            let lhs_ty = cx
                .bindings
                .type_of(lhs)?
                .expect("assignment target without a type");
            if cx.bindings.is_simple(&lhs_ty) {
                let (lb, ub) = simple_bounds(&lhs_ty, cx)?;
                writeln!(
                    out,
                    "{}ctx.write({}, {}, {}, {})?;",
                    pad,
                    lvalue(lhs, cx, env)?,
                    lb,
                    ub,
                    rvalue(rhs, cx, env)?
                )
                .unwrap();
            } else {
                // complex assignment copies packed bytes
                writeln!(
                    out,
                    "{}ctx.copy({}, {})?;",
                    pad,
                    lvalue(lhs, cx, env)?,
                    lvalue(rhs, cx, env)?
                )
                .unwrap();
            }
        }

        StmtKind::Clear(target) => {
            let ty = cx
                .bindings
                .type_of(target)?
                .expect("clear target without a type");
            let handle = lvalue(target, cx, env)?;
            // bind the chain once; the expansion reuses it per leaf
            writeln!(out, "{}{{", pad).unwrap();
            writeln!(out, "{}    let cl: Handle = {};", pad, handle).unwrap();
            emit_clear(out, indent + 1, "cl", &ty, cx, 0)?;
            writeln!(out, "{}}}", pad).unwrap();
        }

        StmtKind::Undefine(target) => emit_undefine(out, indent, target, cx, env)?,

        StmtKind::If { clauses } => {
            for (i, clause) in clauses.iter().enumerate() {
                match (&clause.condition, i) {
                    (Some(cond), 0) => {
                        writeln!(out, "{}if {} != 0 {{", pad, rvalue(cond, cx, env)?).unwrap()
                    }
                    (Some(cond), _) => {
                        writeln!(out, "{}}} else if {} != 0 {{", pad, rvalue(cond, cx, env)?)
                            .unwrap()
                    }
                    (None, _) => writeln!(out, "{}}} else {{", pad).unwrap(),
                }
                emit_stmts(out, indent + 1, &clause.body, cx, env)?;
            }
            writeln!(out, "{}}}", pad).unwrap();
        }

        StmtKind::Switch { expr, cases } => {
            writeln!(out, "{}{{", pad).unwrap();
            writeln!(
                out,
                "{}    let switch_on: Value = {};",
                pad,
                rvalue(expr, cx, env)?
            )
            .unwrap();
            let mut first = true;
            for case in cases {
                if case.matches.is_empty() {
                    if first {
                        // a switch consisting only of an else arm
                        writeln!(out, "{}    if true {{", pad).unwrap();
                    } else {
                        writeln!(out, "{}    }} else {{", pad).unwrap();
                    }
                } else {
                    let alternatives = case
                        .matches
                        .iter()
                        .map(|m| rvalue(m, cx, env).map(|r| format!("switch_on == {}", r)))
                        .collect::<Result<Vec<_>>>()?
                        .join(" || ");
                    if first {
                        writeln!(out, "{}    if {} {{", pad, alternatives).unwrap();
                    } else {
                        writeln!(out, "{}    }} else if {} {{", pad, alternatives).unwrap();
                    }
                }
                first = false;
                emit_stmts(out, indent + 2, &case.body, cx, env)?;
            }
            if !cases.is_empty() {
                writeln!(out, "{}    }}", pad).unwrap();
            }
            writeln!(out, "{}}}", pad).unwrap();
        }

        StmtKind::For { quantifier, body } => {
            let (lo, hi, step) = cx.quantifier_header(quantifier, env)?;
            let var = format!("ru_{}", quantifier.name);
            writeln!(
                out,
                "{}for {} in rt::QuantRange::new({}, {}, {}) {{",
                pad, var, lo, hi, step
            )
            .unwrap();
            writeln!(out, "{}    let _ = {};", pad, var).unwrap();
            let mut inner = FnEnv {
                quant: env.quant.clone(),
                vars: env.vars.clone(),
            };
            inner.quant.insert(quantifier.meta.id, var);
            emit_stmts(out, indent + 1, body, cx, &inner)?;
            writeln!(out, "{}}}", pad).unwrap();
        }

        StmtKind::While { condition, body } => {
            writeln!(out, "{}while {} != 0 {{", pad, rvalue(condition, cx, env)?).unwrap();
            emit_stmts(out, indent + 1, body, cx, env)?;
            writeln!(out, "{}}}", pad).unwrap();
        }

        StmtKind::Return(value) => match value {
            Some(e) => writeln!(out, "{}return Ok({});", pad, rvalue(e, cx, env)?).unwrap(),
            None => writeln!(out, "{}return Ok(());", pad).unwrap(),
        },

        StmtKind::ProcedureCall { name, arguments } => {
            let call = emit_call_args(name, arguments, s, cx, env)?;
            writeln!(out, "{}{};", pad, call).unwrap();
        }

        StmtKind::Property { property, message } => {
            let rendered = rvalue(&property.expr, cx, env)?;
            match property.category {
                PropertyCategory::Assertion => {
                    let text = message.clone().unwrap_or_else(|| {
                        format!("assertion {} failed", property.expr)
                    });
                    writeln!(out, "{}if ({}) == 0 {{", pad, rendered).unwrap();
                    writeln!(
                        out,
                        "{}    return Err(Trap::new(TrapKind::FailedInvariant, \"{}\"));",
                        pad,
                        escape_str(&text)
                    )
                    .unwrap();
                    writeln!(out, "{}}}", pad).unwrap();
                }
                PropertyCategory::Assumption => {
                    writeln!(out, "{}if ({}) == 0 {{", pad, rendered).unwrap();
                    writeln!(out, "{}    return Err(Trap::assumption());", pad).unwrap();
                    writeln!(out, "{}}}", pad).unwrap();
                }
                // cover/liveness have no statement form
                _ => unreachable!("unexpected property category in statement position"),
            }
        }

        StmtKind::Error(message) => {
            writeln!(
                out,
                "{}return Err(Trap::new(TrapKind::ErrorStatement, \"{}\"));",
                pad,
                escape_str(message)
            )
            .unwrap();
        }

        StmtKind::Alias { body, .. } => {
            // alias references are inlined at their use sites
            emit_stmts(out, indent, body, cx, env)?;
        }

        StmtKind::Put(PutArg::Literal(text)) => {
            writeln!(out, "{}ctx.put_str(\"{}\");", pad, escape_str(text)).unwrap();
        }
        StmtKind::Put(PutArg::Value(e)) => emit_put_value(out, indent, e, cx, env)?,
    }
    Ok(())
}

/// Renders a statement-position call (to a procedure or an ignored-result
/// function).
fn emit_call_args(
    name: &str,
    arguments: &[Expr],
    site: &Stmt,
    cx: &EmitCtx,
    env: &FnEnv,
) -> Result<String> {
    use verge_language::analysis::Binding;
    let Some(Binding::Function {
        parameters,
        return_type,
        ..
    }) = cx.bindings.of(site.meta.id).cloned()
    else {
        return Err(verge_base::LocatedError::new(
            format!("unresolved procedure \"{}\"", name),
            site.meta.loc.clone(),
        ));
    };
    let mut call = format!("fn_{}(ctx", name);
    for ((readonly, ty), arg) in parameters.iter().zip(arguments) {
        call.push_str(", ");
        if *readonly && cx.bindings.is_simple(ty) {
            call.push_str(&rvalue(arg, cx, env)?);
        } else {
            call.push_str(&lvalue(arg, cx, env)?);
        }
    }
    call.push_str(")?");
    if return_type.is_some() {
        // discard the unused function result
        Ok(format!("let _ = {}", call))
    } else {
        Ok(call)
    }
}

/// Escapes text for inclusion in a Rust string literal.
pub(crate) fn escape_str(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => "\\\"".chars().collect::<Vec<_>>(),
            '\\' => "\\\\".chars().collect(),
            '\n' => "\\n".chars().collect(),
            '\t' => "\\t".chars().collect(),
            other => vec![other],
        })
        .collect()
}
