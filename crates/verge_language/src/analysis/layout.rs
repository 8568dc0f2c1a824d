//! State layout: bit-offset assignment for model-level variables.
//!
//! Each state variable is placed at the sum of the widths of the variables
//! declared before it; the variables tile the state bit-space with no
//! alignment or padding. Rule-local and parameter variables are not laid
//! out here; they get separately allocated buffers at evaluation time.

use super::Bindings;
use crate::ast::{Decl, Model};
use num_traits::ToPrimitive;
use verge_base::{LocatedError, Result};

/// Summary of the packed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    /// Total width of all state variables in bits.
    pub state_size_bits: u64,
    /// `(name, offset in bits, width in bits)` per state variable, in
    /// declaration order.
    pub vars: Vec<(String, u64, u64)>,
}

/// Upper bound on the state size; states beyond this are certainly a
/// mistake (128 MiB of packed data per state).
const MAX_STATE_BITS: u64 = 1 << 30;

/// Assigns offsets to the model's state variables (recorded in each
/// `VarDecl`) and returns the layout summary.
pub fn layout(model: &mut Model, bindings: &Bindings) -> Result<StateLayout> {
    let mut offset = 0u64;
    let mut vars = Vec::new();
    for d in &mut model.decls {
        if let Decl::Var(v) = d {
            let width = bindings.width(&v.ty)?;
            let width = width.to_u64().ok_or_else(|| {
                LocatedError::new(
                    format!("state variable \"{}\" is too wide", v.name),
                    v.meta.loc.clone(),
                )
            })?;
            v.offset = Some(offset);
            vars.push((v.name.clone(), offset, width));
            offset = offset.checked_add(width).ok_or_else(|| {
                LocatedError::new("state size overflows", v.meta.loc.clone())
            })?;
            if offset > MAX_STATE_BITS {
                return Err(LocatedError::new(
                    "state size exceeds the supported maximum",
                    v.meta.loc.clone(),
                ));
            }
        }
    }
    Ok(StateLayout {
        state_size_bits: offset,
        vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolve;
    use crate::parser::parse;

    fn laid_out(src: &str) -> (Model, StateLayout) {
        let mut model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        let layout = layout(&mut model, &bindings).expect("layout failed");
        (model, layout)
    }

    #[test]
    fn offsets_tile_the_state() {
        let (model, layout) = laid_out(
            "var a: boolean;\n\
             var b: 0..6;\n\
             var c: array [0..1] of boolean;",
        );
        // boolean: 2 bits, 0..6: 3 bits, array: 2 x 2 bits
        assert_eq!(layout.state_size_bits, 2 + 3 + 4);
        let offsets: Vec<_> = model.state_vars().map(|v| v.offset.unwrap()).collect();
        assert_eq!(offsets, vec![0, 2, 5]);
        assert_eq!(
            layout.vars,
            vec![
                ("a".to_string(), 0, 2),
                ("b".to_string(), 2, 3),
                ("c".to_string(), 5, 4),
            ]
        );
    }

    #[test]
    fn empty_model_has_zero_width() {
        let (_, layout) = laid_out("const N: 1;");
        assert_eq!(layout.state_size_bits, 0);
        assert!(layout.vars.is_empty());
    }
}
