//! Type-directed emission helpers: widths and bounds as literals,
//! recursive `clear` expansion, and the state pretty-printer.

use super::expr::{lvalue, rvalue, FnEnv};
use super::EmitCtx;
use num_traits::ToPrimitive;
use std::fmt::Write;
use verge_base::{LocatedError, Result};
use verge_language::ast::{Expr, TypeExpr, TypeExprKind};

/// The bit width of a type as a `usize` literal value.
pub(crate) fn type_width(ty: &TypeExpr, cx: &EmitCtx) -> Result<u64> {
    let width = cx.bindings.width(ty)?;
    width.to_u64().ok_or_else(|| {
        LocatedError::new("type is too wide for the runtime", ty.meta.loc.clone())
    })
}

/// The inclusive `(lower, upper)` bounds of a simple type as `i64`s.
pub(crate) fn simple_bounds(ty: &TypeExpr, cx: &EmitCtx) -> Result<(i64, i64)> {
    let (lb, ub) = cx.bindings.bounds(ty)?;
    let lb = lb.to_i64().ok_or_else(|| {
        LocatedError::new("type bound overflows the runtime value", ty.meta.loc.clone())
    })?;
    let ub = ub.to_i64().ok_or_else(|| {
        LocatedError::new("type bound overflows the runtime value", ty.meta.loc.clone())
    })?;
    Ok((lb, ub))
}

/// Number of elements of an array's index type.
pub(crate) fn index_count(index_ty: &TypeExpr, cx: &EmitCtx) -> Result<u64> {
    let count = cx.bindings.count(index_ty)?;
    (count - 1u32).to_u64().ok_or_else(|| {
        LocatedError::new("index type is too large", index_ty.meta.loc.clone())
    })
}

/// Emits `clear target`: every simple leaf is set to its lowest value.
///
/// `handle` is an expression of type `Handle` addressing the target; the
/// recursion narrows and indexes it per component.
pub(crate) fn emit_clear(
    out: &mut String,
    indent: usize,
    handle: &str,
    ty: &TypeExpr,
    cx: &EmitCtx,
    depth: usize,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    let resolved = cx.bindings.resolve_type(ty);
    match &resolved.kind {
        TypeExprKind::Range { .. } | TypeExprKind::Enum { .. } | TypeExprKind::Scalarset { .. } => {
            let (lb, ub) = simple_bounds(resolved, cx)?;
            writeln!(out, "{}ctx.write({}, {}, {}, {})?;", pad, handle, lb, ub, lb).unwrap();
        }
        TypeExprKind::Array { index, element } => {
            let (min, max) = simple_bounds(index, cx)?;
            let element_width = type_width(element, cx)?;
            let var = format!("cc{}", depth);
            writeln!(out, "{}for {} in {}i64..={}i64 {{", pad, var, min, max).unwrap();
            let elem = format!(
                "{}.index({}, {}, {}, {})?",
                handle, element_width, min, max, var
            );
            emit_clear(out, indent + 1, &elem, element, cx, depth + 1)?;
            writeln!(out, "{}}}", pad).unwrap();
        }
        TypeExprKind::Record { fields } => {
            let mut offset = 0u64;
            for f in fields {
                let width = type_width(&f.ty, cx)?;
                let narrowed = format!("{}.narrow({}, {})", handle, offset, width);
                emit_clear(out, indent, &narrowed, &f.ty, cx, depth)?;
                offset += width;
            }
        }
        TypeExprKind::Named(_) => unreachable!("resolve_type returned a named type"),
    }
    Ok(())
}

/// Emits the value-rendering expression of a `put` argument: enum-typed
/// values print their member name, everything else its numeral.
pub(crate) fn emit_put_value(
    out: &mut String,
    indent: usize,
    e: &Expr,
    cx: &EmitCtx,
    env: &FnEnv,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    let value = rvalue(e, cx, env)?;
    let ty = cx.bindings.type_of(e)?;
    let resolved = ty.as_ref().map(|t| cx.bindings.resolve_type(t));
    if let Some(TypeExpr {
        kind: TypeExprKind::Enum { members },
        ..
    }) = resolved
    {
        writeln!(out, "{}match {} {{", pad, value).unwrap();
        for (i, (name, _)) in members.iter().enumerate() {
            writeln!(out, "{}    {} => ctx.put_str(\"{}\"),", pad, i, name).unwrap();
        }
        writeln!(out, "{}    other => ctx.put_value(other),", pad).unwrap();
        writeln!(out, "{}}}", pad).unwrap();
    } else {
        writeln!(out, "{}ctx.put_value({});", pad, value).unwrap();
    }
    Ok(())
}

/// Emits the generated `print_state` function: one labelled line per
/// simple leaf of the state, skipping unchanged leaves in diff mode.
pub(crate) fn emit_print_state(out: &mut String, cx: &EmitCtx) -> Result<()> {
    writeln!(
        out,
        "fn print_state(out: &mut String, prev: Option<&[u8]>, data: &[u8]) {{"
    )
    .unwrap();
    for var in cx.model.state_vars() {
        let offset = var.offset.expect("state variable without an offset");
        emit_print_leaves(
            out,
            1,
            &format!("\"{}\".to_string()", var.name),
            &offset.to_string(),
            &var.ty,
            cx,
            0,
        )?;
    }
    writeln!(out, "}}").unwrap();
    Ok(())
}

fn emit_print_leaves(
    out: &mut String,
    indent: usize,
    path: &str,
    offset: &str,
    ty: &TypeExpr,
    cx: &EmitCtx,
    depth: usize,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    let resolved = cx.bindings.resolve_type(ty);
    match &resolved.kind {
        TypeExprKind::Range { .. } | TypeExprKind::Enum { .. } | TypeExprKind::Scalarset { .. } => {
            let width = type_width(resolved, cx)?;
            let (lb, _ub) = simple_bounds(resolved, cx)?;
            writeln!(out, "{}{{", pad).unwrap();
            writeln!(
                out,
                "{}    let raw = rt::handle::read_raw(data, {}, {});",
                pad, offset, width
            )
            .unwrap();
            writeln!(
                out,
                "{}    if prev.map_or(true, |p| rt::handle::read_raw(p, {}, {}) != raw) {{",
                pad, offset, width
            )
            .unwrap();
            writeln!(out, "{}        out.push_str(&{});", pad, path).unwrap();
            writeln!(out, "{}        out.push(':');", pad).unwrap();
            writeln!(out, "{}        match raw {{", pad).unwrap();
            writeln!(
                out,
                "{}            0 => out.push_str(\"undefined\"),",
                pad
            )
            .unwrap();
            if let TypeExprKind::Enum { members } = &resolved.kind {
                for (i, (name, _)) in members.iter().enumerate() {
                    writeln!(
                        out,
                        "{}            {} => out.push_str(\"{}\"),",
                        pad,
                        i + 1,
                        name
                    )
                    .unwrap();
                }
                writeln!(
                    out,
                    "{}            other => out.push_str(&other.to_string()),",
                    pad
                )
                .unwrap();
            } else {
                writeln!(
                    out,
                    "{}            v => out.push_str(&(({}i64) + (v as i64) - 1).to_string()),",
                    pad, lb
                )
                .unwrap();
            }
            writeln!(out, "{}        }}", pad).unwrap();
            writeln!(out, "{}        out.push('\\n');", pad).unwrap();
            writeln!(out, "{}    }}", pad).unwrap();
            writeln!(out, "{}}}", pad).unwrap();
        }
        TypeExprKind::Array { index, element } => {
            let (min, max) = simple_bounds(index, cx)?;
            let element_width = type_width(element, cx)?;
            let var = format!("pc{}", depth);
            writeln!(out, "{}for {} in {}i64..={}i64 {{", pad, var, min, max).unwrap();
            let child_path = format!("format!(\"{{}}[{{}}]\", {}, {})", path, var);
            let child_offset = format!(
                "({}) + ((({}) - ({})) as usize) * {}",
                offset, var, min, element_width
            );
            emit_print_leaves(out, indent + 1, &child_path, &child_offset, element, cx, depth + 1)?;
            writeln!(out, "{}}}", pad).unwrap();
        }
        TypeExprKind::Record { fields } => {
            let mut field_offset = 0u64;
            for f in fields {
                let width = type_width(&f.ty, cx)?;
                let child_path = format!("format!(\"{{}}.{}\", {})", f.name, path);
                let child_offset = format!("({}) + {}", offset, field_offset);
                emit_print_leaves(out, indent, &child_path, &child_offset, &f.ty, cx, depth)?;
                field_offset += width;
            }
        }
        TypeExprKind::Named(_) => unreachable!("resolve_type returned a named type"),
    }
    Ok(())
}

/// Emits `undefine target` over a designator.
pub(crate) fn emit_undefine(
    out: &mut String,
    indent: usize,
    target: &Expr,
    cx: &EmitCtx,
    env: &FnEnv,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    writeln!(out, "{}ctx.zero({})?;", pad, lvalue(target, cx, env)?).unwrap();
    Ok(())
}
