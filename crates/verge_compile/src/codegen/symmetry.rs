//! Per-scalarset swap-function emission.
//!
//! For each named scalarset `S`, the checker gets a `swap_S(data, x, y)`
//! that exchanges the roles of scalarset values `x` and `y` throughout the
//! packed state: array slices indexed by `S` swap their `x`th and `y`th
//! elements, and stored values of type `S` equal to `x` or `y` are
//! remapped to the other. The runtime's canonicalization enumerates
//! permutations by composing these swaps (Heap's algorithm).
//!
//! All offsets are emitted as `usize` expressions built by static
//! recursion over each state variable's type, with loop variables for
//! array strides.

use super::types::{index_count, type_width};
use super::EmitCtx;
use std::fmt::Write;
use verge_base::Result;
use verge_language::ast::{NodeId, TypeExpr, TypeExprKind};

/// Emits one `swap_<name>` function for the scalarset whose (resolved)
/// type node is `pivot`.
pub(crate) fn emit_swap_fn(
    out: &mut String,
    fn_name: &str,
    pivot: NodeId,
    cx: &EmitCtx,
) -> Result<()> {
    writeln!(
        out,
        "fn {}(data: &mut [u8], x: Value, y: Value) {{",
        fn_name
    )
    .unwrap();
    writeln!(out, "    let _ = (&data, x, y);").unwrap();
    for var in cx.model.state_vars() {
        let offset = var.offset.expect("state variable without an offset");
        emit_swap_chunk(out, 1, &var.ty, &offset.to_string(), pivot, cx, 0)?;
    }
    writeln!(out, "}}").unwrap();
    Ok(())
}

/// Swaps the components at `offset_a`/`offset_b` (two images of the same
/// type under the x/y exchange).
fn emit_apply_swap(
    out: &mut String,
    indent: usize,
    ty: &TypeExpr,
    offset_a: &str,
    offset_b: &str,
    cx: &EmitCtx,
    depth: usize,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    let resolved = cx.bindings.resolve_type(ty);

    if resolved.is_structurally_simple() {
        let width = type_width(resolved, cx)?;
        writeln!(out, "{}if ({}) != ({}) {{", pad, offset_a, offset_b).unwrap();
        writeln!(
            out,
            "{}    let a = rt::handle::read_raw(data, {}, {});",
            pad, offset_a, width
        )
        .unwrap();
        writeln!(
            out,
            "{}    let b = rt::handle::read_raw(data, {}, {});",
            pad, offset_b, width
        )
        .unwrap();
        writeln!(
            out,
            "{}    rt::handle::write_raw(data, {}, {}, a);",
            pad, offset_b, width
        )
        .unwrap();
        writeln!(
            out,
            "{}    rt::handle::write_raw(data, {}, {}, b);",
            pad, offset_a, width
        )
        .unwrap();
        writeln!(out, "{}}}", pad).unwrap();
        return Ok(());
    }

    match &resolved.kind {
        TypeExprKind::Array { index, element } => {
            let len = index_count(index, cx)?;
            let width = type_width(element, cx)?;
            let var = format!("sw{}", depth);
            writeln!(out, "{}for {} in 0usize..{} {{", pad, var, len).unwrap();
            let elem_a = format!("({}) + {} * {}", offset_a, var, width);
            let elem_b = format!("({}) + {} * {}", offset_b, var, width);
            emit_apply_swap(out, indent + 1, element, &elem_a, &elem_b, cx, depth + 1)?;
            writeln!(out, "{}}}", pad).unwrap();
        }
        TypeExprKind::Record { fields } => {
            let mut field_offset = 0u64;
            for f in fields {
                let fa = format!("({}) + {}", offset_a, field_offset);
                let fb = format!("({}) + {}", offset_b, field_offset);
                emit_apply_swap(out, indent, &f.ty, &fa, &fb, cx, depth)?;
                field_offset += type_width(&f.ty, cx)?;
            }
        }
        _ => unreachable!("missed case in swap application"),
    }
    Ok(())
}

/// Walks one state component, swapping array slices indexed by the pivot
/// and remapping stored pivot-typed values.
fn emit_swap_chunk(
    out: &mut String,
    indent: usize,
    ty: &TypeExpr,
    offset: &str,
    pivot: NodeId,
    cx: &EmitCtx,
    depth: usize,
) -> Result<()> {
    let pad = "    ".repeat(indent);
    let resolved = cx.bindings.resolve_type(ty);

    if resolved.is_structurally_simple() {
        /* A stored value of the pivot type exchanges x and y; any other
         * simple component is unaffected.
         */
        if resolved.meta.id == pivot {
            let width = type_width(resolved, cx)?;
            writeln!(out, "{}if x != y {{", pad).unwrap();
            writeln!(
                out,
                "{}    let v = rt::handle::read_raw(data, {}, {});",
                pad, offset, width
            )
            .unwrap();
            writeln!(out, "{}    if v != 0 {{", pad).unwrap();
            writeln!(out, "{}        if v - 1 == x as u64 {{", pad).unwrap();
            writeln!(
                out,
                "{}            rt::handle::write_raw(data, {}, {}, y as u64 + 1);",
                pad, offset, width
            )
            .unwrap();
            writeln!(out, "{}        }} else if v - 1 == y as u64 {{", pad).unwrap();
            writeln!(
                out,
                "{}            rt::handle::write_raw(data, {}, {}, x as u64 + 1);",
                pad, offset, width
            )
            .unwrap();
            writeln!(out, "{}        }}", pad).unwrap();
            writeln!(out, "{}    }}", pad).unwrap();
            writeln!(out, "{}}}", pad).unwrap();
        }
        return Ok(());
    }

    match &resolved.kind {
        TypeExprKind::Array { index, element } => {
            let element_width = type_width(element, cx)?;

            // an array indexed by the pivot swaps its x-th and y-th slices
            if cx.bindings.resolve_type(index).meta.id == pivot {
                let off_x = format!("({}) + (x as usize) * {}", offset, element_width);
                let off_y = format!("({}) + (y as usize) * {}", offset, element_width);
                emit_apply_swap(out, indent, element, &off_x, &off_y, cx, depth)?;
            }

            // descend into the elements for further remapping
            let len = index_count(index, cx)?;
            let var = format!("si{}", depth);
            writeln!(out, "{}for {} in 0usize..{} {{", pad, var, len).unwrap();
            let elem = format!("({}) + {} * {}", offset, var, element_width);
            emit_swap_chunk(out, indent + 1, element, &elem, pivot, cx, depth + 1)?;
            writeln!(out, "{}}}", pad).unwrap();
        }
        TypeExprKind::Record { fields } => {
            let mut field_offset = 0u64;
            for f in fields {
                let child = format!("({}) + {}", offset, field_offset);
                emit_swap_chunk(out, indent, &f.ty, &child, pivot, cx, depth)?;
                field_offset += type_width(&f.ty, cx)?;
            }
        }
        _ => unreachable!("missed case in swap chunk emission"),
    }
    Ok(())
}
