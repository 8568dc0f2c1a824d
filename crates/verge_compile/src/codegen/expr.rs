//! Expression emission.
//!
//! Emission is bimodal, mirroring the lvalue/rvalue split of the
//! evaluation model: [`lvalue`] renders a designator as a handle chain
//! (`Handle::state(..)` roots narrowed by record fields and indexed by
//! array elements), while [`rvalue`] renders any expression as Rust code
//! computing a runtime `Value`, wrapping simple-typed designators in
//! `ctx.read(..)`. Booleans are values 0/1; the logical operators
//! preserve short-circuit evaluation.
//!
//! Quantified variables resolve through the per-function [`FnEnv`]:
//! rule-level quantifiers arrive as `args[i]`, statement- and
//! expression-level quantifiers as Rust loop variables. Aliases are
//! inlined at their use sites.

use super::types::{simple_bounds, type_width};
use super::EmitCtx;
use num_traits::ToPrimitive;
use rustc_hash::FxHashMap;
use verge_language::analysis::Binding;
use verge_language::ast::{BinaryOp, Expr, ExprKind, NodeId, TypeExprKind, UnaryOp};
use verge_base::{LocatedError, Result};

/// Where a non-state variable lives in the generated function.
#[derive(Debug, Clone)]
pub(crate) enum VarPlace {
    /// A rule- or function-local buffer: the name of its `Handle` binding.
    LocalHandle(String),
    /// A readonly simple parameter passed by value.
    ParamValue(String),
    /// A `var` (or complex) parameter passed as a handle.
    ParamHandle(String),
}

/// Per-function emission environment.
#[derive(Debug, Default)]
pub(crate) struct FnEnv {
    /// Quantifier declaration id to the Rust expression for its value.
    pub quant: FxHashMap<NodeId, String>,
    /// Local/parameter declaration id to its place.
    pub vars: FxHashMap<NodeId, VarPlace>,
}

/// Renders a designator as a handle-chain expression.
pub(crate) fn lvalue(e: &Expr, cx: &EmitCtx, env: &FnEnv) -> Result<String> {
    match &e.kind {
        ExprKind::Id(name) => match cx.bindings.of(e.meta.id) {
            Some(Binding::Var { decl, ty, .. }) => {
                if let Some(offset) = cx.state_offsets.get(decl) {
                    let width = type_width(ty, cx)?;
                    Ok(format!("Handle::state({}, {})", offset, width))
                } else {
                    match env.vars.get(decl) {
                        Some(VarPlace::LocalHandle(h)) | Some(VarPlace::ParamHandle(h)) => {
                            Ok(h.clone())
                        }
                        _ => Err(LocatedError::new(
                            format!("\"{}\" has no storage to address", name),
                            e.meta.loc.clone(),
                        )),
                    }
                }
            }
            Some(Binding::Alias { value, .. }) => lvalue(value, cx, env),
            _ => Err(LocatedError::new(
                format!("\"{}\" is not an addressable variable", name),
                e.meta.loc.clone(),
            )),
        },

        ExprKind::Field { record, field } => {
            let base = lvalue(record, cx, env)?;
            let record_ty = cx
                .bindings
                .type_of(record)?
                .expect("field access on untyped value");
            let resolved = cx.bindings.resolve_type(&record_ty);
            let TypeExprKind::Record { fields } = &resolved.kind else {
                return Err(LocatedError::new(
                    "field access on a non-record value",
                    e.meta.loc.clone(),
                ));
            };
            let mut offset = 0u64;
            for f in fields {
                if &f.name == field {
                    let width = type_width(&f.ty, cx)?;
                    return Ok(format!("{}.narrow({}, {})", base, offset, width));
                }
                offset += type_width(&f.ty, cx)?;
            }
            Err(LocatedError::new(
                format!("record has no field \"{}\"", field),
                e.meta.loc.clone(),
            ))
        }

        ExprKind::Element { array, index } => {
            let base = lvalue(array, cx, env)?;
            let array_ty = cx
                .bindings
                .type_of(array)?
                .expect("indexing an untyped value");
            let resolved = cx.bindings.resolve_type(&array_ty);
            let TypeExprKind::Array {
                index: index_ty,
                element,
            } = &resolved.kind
            else {
                return Err(LocatedError::new(
                    "indexing into a non-array value",
                    e.meta.loc.clone(),
                ));
            };
            let element_width = type_width(element, cx)?;
            let (min, max) = simple_bounds(index_ty, cx)?;
            Ok(format!(
                "{}.index({}, {}, {}, {})?",
                base,
                element_width,
                min,
                max,
                rvalue(index, cx, env)?
            ))
        }

        _ => Err(LocatedError::new(
            "expression is not an lvalue",
            e.meta.loc.clone(),
        )),
    }
}

/// Renders an expression as Rust code computing a `Value`.
pub(crate) fn rvalue(e: &Expr, cx: &EmitCtx, env: &FnEnv) -> Result<String> {
    match &e.kind {
        ExprKind::Number(n) => {
            let v = n.to_i64().ok_or_else(|| {
                LocatedError::new(
                    format!("literal {} does not fit the runtime value type", n),
                    e.meta.loc.clone(),
                )
            })?;
            Ok(format!("{}i64", v))
        }

        ExprKind::Ternary { cond, lhs, rhs } => Ok(format!(
            "(if {} != 0 {{ {} }} else {{ {} }})",
            rvalue(cond, cx, env)?,
            rvalue(lhs, cx, env)?,
            rvalue(rhs, cx, env)?
        )),

        ExprKind::Binary { op, lhs, rhs } => {
            // complex comparisons flagged by the validator become raw
            // byte comparisons over the packed representations
            if cx.validated.complex_eq.contains(&e.meta.id) {
                let l = lvalue(lhs, cx, env)?;
                let r = lvalue(rhs, cx, env)?;
                return Ok(match op {
                    BinaryOp::Eq => format!("(ctx.eq({}, {}) as Value)", l, r),
                    BinaryOp::Neq => format!("((!ctx.eq({}, {})) as Value)", l, r),
                    _ => unreachable!("non-equality complex comparison"),
                });
            }

            let l = rvalue(lhs, cx, env)?;
            let r = rvalue(rhs, cx, env)?;
            Ok(match op {
                BinaryOp::Add => format!("rt::value::add({}, {})?", l, r),
                BinaryOp::Sub => format!("rt::value::sub({}, {})?", l, r),
                BinaryOp::Mul => format!("rt::value::mul({}, {})?", l, r),
                BinaryOp::Div => format!("rt::value::div({}, {})?", l, r),
                BinaryOp::Mod => format!("rt::value::modulo({}, {})?", l, r),
                BinaryOp::Lt => format!("((({}) < ({})) as Value)", l, r),
                BinaryOp::Leq => format!("((({}) <= ({})) as Value)", l, r),
                BinaryOp::Gt => format!("((({}) > ({})) as Value)", l, r),
                BinaryOp::Geq => format!("((({}) >= ({})) as Value)", l, r),
                BinaryOp::Eq => format!("((({}) == ({})) as Value)", l, r),
                BinaryOp::Neq => format!("((({}) != ({})) as Value)", l, r),
                BinaryOp::And => format!("((({}) != 0 && ({}) != 0) as Value)", l, r),
                BinaryOp::Or => format!("((({}) != 0 || ({}) != 0) as Value)", l, r),
                BinaryOp::Implication => {
                    format!("((({}) == 0 || ({}) != 0) as Value)", l, r)
                }
            })
        }

        ExprKind::Unary { op, rhs } => {
            let r = rvalue(rhs, cx, env)?;
            Ok(match op {
                UnaryOp::Not => format!("((({}) == 0) as Value)", r),
                UnaryOp::Negative => format!("rt::value::negate({})?", r),
            })
        }

        ExprKind::Forall { quantifier, expr } => {
            let (lo, hi, step) = cx.quantifier_header(quantifier, env)?;
            let var = format!("ru_{}", quantifier.name);
            let inner_env = env_with(env, quantifier.meta.id, var.clone());
            let body = rvalue(expr, cx, &inner_env)?;
            Ok(format!(
                "{{ let mut result: Value = 1; for {} in rt::QuantRange::new({}, {}, {}) {{ let _ = {}; if ({}) == 0 {{ result = 0; break; }} }} result }}",
                var, lo, hi, step, var, body
            ))
        }

        ExprKind::Exists { quantifier, expr } => {
            let (lo, hi, step) = cx.quantifier_header(quantifier, env)?;
            let var = format!("ru_{}", quantifier.name);
            let inner_env = env_with(env, quantifier.meta.id, var.clone());
            let body = rvalue(expr, cx, &inner_env)?;
            Ok(format!(
                "{{ let mut result: Value = 0; for {} in rt::QuantRange::new({}, {}, {}) {{ let _ = {}; if ({}) != 0 {{ result = 1; break; }} }} result }}",
                var, lo, hi, step, var, body
            ))
        }

        ExprKind::Id(name) => match cx.bindings.of(e.meta.id) {
            Some(Binding::Const { value, .. }) => {
                let v = cx.bindings.fold_i64(value)?;
                Ok(format!("{}i64", v))
            }
            Some(Binding::EnumMember { index, .. }) => Ok(format!("{}i64", index)),
            Some(Binding::Quantifier { decl, .. }) => {
                env.quant.get(decl).cloned().ok_or_else(|| {
                    LocatedError::new(
                        format!("quantifier \"{}\" is not in scope here", name),
                        e.meta.loc.clone(),
                    )
                })
            }
            Some(Binding::Var { decl, ty, .. }) => {
                if let Some(VarPlace::ParamValue(p)) = env.vars.get(decl) {
                    return Ok(p.clone());
                }
                let handle = lvalue(e, cx, env)?;
                let (lb, ub) = simple_bounds(ty, cx)?;
                Ok(format!("ctx.read({}, {}, {})?", handle, lb, ub))
            }
            Some(Binding::Alias { value, .. }) => rvalue(value, cx, env),
            _ => Err(LocatedError::new(
                format!("unresolved symbol \"{}\"", name),
                e.meta.loc.clone(),
            )),
        },

        ExprKind::Field { .. } | ExprKind::Element { .. } => {
            let ty = cx
                .bindings
                .type_of(e)?
                .expect("designator without a type");
            if cx.bindings.is_simple(&ty) {
                let handle = lvalue(e, cx, env)?;
                let (lb, ub) = simple_bounds(&ty, cx)?;
                Ok(format!("ctx.read({}, {}, {})?", handle, lb, ub))
            } else {
                // a complex value in rvalue position reads as its handle
                // (consumed by copy/compare emission)
                lvalue(e, cx, env)
            }
        }

        ExprKind::Call {
            function,
            arguments,
        } => {
            let Some(Binding::Function {
                decl: _,
                parameters,
                ..
            }) = cx.bindings.of(e.meta.id).cloned()
            else {
                return Err(LocatedError::new(
                    format!("unresolved function \"{}\"", function),
                    e.meta.loc.clone(),
                ));
            };
            let mut rendered = Vec::with_capacity(arguments.len());
            for ((readonly, ty), arg) in parameters.iter().zip(arguments) {
                if *readonly && cx.bindings.is_simple(ty) {
                    rendered.push(rvalue(arg, cx, env)?);
                } else {
                    rendered.push(lvalue(arg, cx, env)?);
                }
            }
            let mut call = format!("fn_{}(ctx", function);
            for r in rendered {
                call.push_str(", ");
                call.push_str(&r);
            }
            call.push_str(")?");
            Ok(call)
        }

        ExprKind::IsUndefined(inner) => Ok(format!(
            "(ctx.is_undefined({}) as Value)",
            lvalue(inner, cx, env)?
        )),
    }
}

/// A child environment with one extra quantifier binding.
fn env_with(env: &FnEnv, id: NodeId, value: String) -> FnEnv {
    let mut child = FnEnv {
        quant: env.quant.clone(),
        vars: env.vars.clone(),
    };
    child.quant.insert(id, value);
    child
}
