//! The model description a generated checker registers.
//!
//! Code generation turns every start state, rule and property of the
//! source model into a Rust function taking an evaluation context and the
//! values of its quantifier bindings. Those functions, their binding
//! descriptors (whose counts drive the linearized `rule_taken` numbering
//! and its division/modulo inverse), and the per-scalarset swap functions
//! are collected into a [`Model`] and handed to [`run`](crate::driver::run).
//!
//! [`EvalCtx`] is the only window those functions get onto a state: typed
//! reads and writes through [`Handle`]s, rule-local buffer allocation, and
//! `put` output. Guards and properties evaluate against read-only state;
//! start states and rule bodies against the candidate state the driver
//! owns exclusively.

use crate::config::trace;
use crate::error::{RtResult, Trap, TrapKind};
use crate::handle::{self, Handle, Root};
use crate::output::Output;
use crate::value::Value;

pub type StartFn = Box<dyn Fn(&mut EvalCtx, &[Value]) -> RtResult<()> + Send + Sync>;
pub type GuardFn = Box<dyn Fn(&mut EvalCtx, &[Value]) -> RtResult<bool> + Send + Sync>;
pub type BodyFn = Box<dyn Fn(&mut EvalCtx, &[Value]) -> RtResult<()> + Send + Sync>;
pub type PropFn = Box<dyn Fn(&mut EvalCtx, &[Value]) -> RtResult<bool> + Send + Sync>;
/// Swaps the scalarset values `x` and `y` throughout a state's data.
pub type SwapFn = Box<dyn Fn(&mut [u8], Value, Value) + Send + Sync>;
/// Renders a state (or its diff against `prev`) into `out`.
pub type PrintFn = Box<dyn Fn(&mut String, Option<&[u8]>, &[u8]) + Send + Sync>;

/// One quantifier of a flattened rule: the domain it ranges over and, for
/// enum-typed quantifiers, the member names used when printing transitions.
#[derive(Debug, Clone)]
pub struct QuantBinding {
    pub name: String,
    pub lower: Value,
    pub upper: Value,
    pub step: Value,
    /// Member names for enum-typed quantifiers; `None` prints the value
    /// numerically.
    pub member_names: Option<Vec<String>>,
}

impl QuantBinding {
    pub fn range(name: impl Into<String>, lower: Value, upper: Value) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            step: 1,
            member_names: None,
        }
    }

    /// The number of values this binding enumerates.
    pub fn count(&self) -> u64 {
        if self.step > 0 {
            if self.lower > self.upper {
                0
            } else {
                (self.upper - self.lower) as u64 / self.step as u64 + 1
            }
        } else if self.lower < self.upper {
            0
        } else {
            (self.lower - self.upper) as u64 / self.step.unsigned_abs() + 1
        }
    }
}

/// Total combinations of a binding list.
pub fn binding_combinations(bindings: &[QuantBinding]) -> u64 {
    bindings.iter().map(QuantBinding::count).product()
}

/// Iterates every combination of binding values, outermost binding
/// slowest, matching the linearized `rule_taken` numbering.
pub fn for_each_binding(
    bindings: &[QuantBinding],
    mut f: impl FnMut(&[Value]) -> std::ops::ControlFlow<()>,
) {
    let mut values: Vec<Value> = bindings.iter().map(|b| b.lower).collect();
    let total = binding_combinations(bindings);
    for index in 0..total {
        let mut rest = index;
        for (i, b) in bindings.iter().enumerate().rev() {
            let count = b.count();
            let pos = rest % count;
            rest /= count;
            values[i] = b.lower + b.step * pos as Value;
        }
        if f(&values).is_break() {
            return;
        }
    }
}

/// Recovers the binding values of a linearized index (0-based within the
/// rule's combinations), by division and modulo over binding counts.
pub fn binding_values(bindings: &[QuantBinding], index: u64) -> Vec<Value> {
    let mut values: Vec<Value> = bindings.iter().map(|b| b.lower).collect();
    let mut rest = index;
    for (i, b) in bindings.iter().enumerate().rev() {
        let count = b.count();
        let pos = rest % count;
        rest /= count;
        values[i] = b.lower + b.step * pos as Value;
    }
    values
}

pub struct StartStateDesc {
    pub name: String,
    pub bindings: Vec<QuantBinding>,
    pub apply: StartFn,
}

pub struct RuleDesc {
    pub name: String,
    pub bindings: Vec<QuantBinding>,
    /// `None` means the rule is always enabled.
    pub guard: Option<GuardFn>,
    pub body: BodyFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Invariant,
    Assumption,
    Cover,
    Liveness,
}

pub struct PropertyDesc {
    pub name: String,
    pub kind: PropertyKind,
    pub bindings: Vec<QuantBinding>,
    pub check: PropFn,
}

pub struct ScalarsetDesc {
    pub name: String,
    pub bound: u64,
    pub swap: SwapFn,
}

/// A complete checkable model.
pub struct Model {
    /// Width of the packed state data in bits.
    pub state_bits: usize,
    pub start_states: Vec<StartStateDesc>,
    pub rules: Vec<RuleDesc>,
    pub properties: Vec<PropertyDesc>,
    pub scalarsets: Vec<ScalarsetDesc>,
    /// Pretty-printer for states in counterexamples; raw bytes are printed
    /// when absent.
    pub print_state: Option<PrintFn>,
}

impl Model {
    pub fn liveness_count(&self) -> usize {
        self.properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Liveness)
            .map(|p| binding_combinations(&p.bindings) as usize)
            .sum()
    }

    pub fn cover_count(&self) -> usize {
        self.properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Cover)
            .count()
    }

    /// Upper bound (inclusive) of the 1-based `rule_taken` numbering:
    /// start states and rules occupy separate spaces, so the field must
    /// hold the larger.
    pub fn rule_id_bound(&self) -> u64 {
        let starts: u64 = self
            .start_states
            .iter()
            .map(|s| binding_combinations(&s.bindings))
            .sum();
        let rules: u64 = self
            .rules
            .iter()
            .map(|r| binding_combinations(&r.bindings))
            .sum();
        starts.max(rules)
    }
}

// ----------------------------------------------------------------------
// Evaluation context
// ----------------------------------------------------------------------

enum DataRef<'a> {
    Ro(&'a [u8]),
    Rw(&'a mut [u8]),
}

/// The window a generated function gets onto the state it evaluates
/// against.
pub struct EvalCtx<'a> {
    data: DataRef<'a>,
    locals: Vec<Box<[u8]>>,
    out: &'a Output,
}

impl<'a> EvalCtx<'a> {
    /// A context for guards and property checks: the state is read-only.
    pub fn read_only(data: &'a [u8], out: &'a Output) -> Self {
        Self {
            data: DataRef::Ro(data),
            locals: Vec::new(),
            out,
        }
    }

    /// A context for start states and rule bodies over a candidate state
    /// the caller owns exclusively.
    pub fn read_write(data: &'a mut [u8], out: &'a Output) -> Self {
        Self {
            data: DataRef::Rw(data),
            locals: Vec::new(),
            out,
        }
    }

    fn buffer(&self, root: Root) -> &[u8] {
        match root {
            Root::State => match &self.data {
                DataRef::Ro(d) => d,
                DataRef::Rw(d) => &**d,
            },
            Root::Local(slot) => &self.locals[slot as usize],
        }
    }

    fn buffer_mut(&mut self, root: Root) -> RtResult<&mut [u8]> {
        match root {
            Root::State => match &mut self.data {
                DataRef::Rw(d) => Ok(&mut **d),
                DataRef::Ro(_) => Err(Trap::new(
                    TrapKind::ErrorStatement,
                    "illegal write to the state in a read-only context",
                )),
            },
            Root::Local(slot) => Ok(&mut self.locals[slot as usize]),
        }
    }

    /// Allocates a zeroed rule-local buffer of `width` bits; its contents
    /// start undefined.
    pub fn alloc_local(&mut self, width: usize) -> Handle {
        let slot = self.locals.len() as u16;
        self.locals.push(vec![0u8; width.div_ceil(8)].into());
        Handle::local(slot, width)
    }

    /// Reads and decodes the simple value a handle refers to.
    pub fn read(&self, h: Handle, lb: Value, ub: Value) -> RtResult<Value> {
        let raw = handle::read_raw(self.buffer(h.root), h.offset, h.width);
        let v = handle::decode(lb, ub, raw)?;
        if self.out.tracing(trace::HANDLE_READS) {
            self.out.trace(
                trace::HANDLE_READS,
                &format!("read value {} from offset {} width {}", v, h.offset, h.width),
            );
        }
        Ok(v)
    }

    /// Encodes and stores a simple value through a handle.
    pub fn write(&mut self, h: Handle, lb: Value, ub: Value, v: Value) -> RtResult<()> {
        let raw = handle::encode(lb, ub, v)?;
        handle::write_raw(self.buffer_mut(h.root)?, h.offset, h.width, raw);
        if self.out.tracing(trace::HANDLE_WRITES) {
            self.out.trace(
                trace::HANDLE_WRITES,
                &format!("wrote value {} to offset {} width {}", v, h.offset, h.width),
            );
        }
        Ok(())
    }

    /// Whether the simple value a handle refers to is undefined.
    pub fn is_undefined(&self, h: Handle) -> bool {
        handle::read_raw(self.buffer(h.root), h.offset, h.width) == 0
    }

    /// Resets a region of any width to the undefined encoding.
    pub fn zero(&mut self, h: Handle) -> RtResult<()> {
        handle::zero(self.buffer_mut(h.root)?, h.offset, h.width);
        Ok(())
    }

    /// Copies a complex value between handles of equal width. Staged
    /// through a temporary: the regions may belong to the same buffer.
    pub fn copy(&mut self, dst: Handle, src: Handle) -> RtResult<()> {
        debug_assert_eq!(dst.width, src.width, "copy between mismatched widths");
        let mut staged = vec![0u8; src.width.div_ceil(8)];
        handle::copy_bits(&mut staged, 0, self.buffer(src.root), src.offset, src.width);
        handle::copy_bits(
            self.buffer_mut(dst.root)?,
            dst.offset,
            &staged,
            0,
            dst.width,
        );
        Ok(())
    }

    /// Byte-compares two complex values of equal width.
    pub fn eq(&self, a: Handle, b: Handle) -> bool {
        debug_assert_eq!(a.width, b.width, "comparison between mismatched widths");
        handle::eq_bits(
            self.buffer(a.root),
            a.offset,
            self.buffer(b.root),
            b.offset,
            a.width,
        )
    }

    /// `put` of a string literal.
    pub fn put_str(&self, text: &str) {
        let _guard = self.out.lock();
        self.out.put(text);
        self.out.flush();
    }

    /// `put` of a computed value.
    pub fn put_value(&self, v: Value) {
        self.put_str(&v.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_output() -> Output {
        Output::new(&Config {
            color: crate::config::Tristate::Off,
            ..Config::default()
        })
    }

    #[test]
    fn binding_counts_multiply() {
        let bindings = vec![
            QuantBinding::range("p", 0, 2),
            QuantBinding::range("q", 1, 2),
        ];
        assert_eq!(binding_combinations(&bindings), 6);
        assert_eq!(binding_combinations(&[]), 1);
    }

    #[test]
    fn binding_enumeration_matches_recovery() {
        let bindings = vec![
            QuantBinding::range("p", 0, 1),
            QuantBinding::range("q", 5, 7),
        ];
        let mut seen = Vec::new();
        for_each_binding(&bindings, |vals| {
            seen.push(vals.to_vec());
            std::ops::ControlFlow::Continue(())
        });
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], vec![0, 5]);
        assert_eq!(seen[1], vec![0, 6]);
        assert_eq!(seen[5], vec![1, 7]);
        for (i, expected) in seen.iter().enumerate() {
            assert_eq!(&binding_values(&bindings, i as u64), expected);
        }
    }

    #[test]
    fn stepped_bindings_enumerate_sparsely() {
        let b = QuantBinding {
            name: "i".into(),
            lower: 0,
            upper: 10,
            step: 5,
            member_names: None,
        };
        assert_eq!(b.count(), 3);
        assert_eq!(binding_values(&[b], 2), vec![10]);
    }

    #[test]
    fn ctx_read_write_roundtrip() {
        let out = test_output();
        let mut data = vec![0u8; 4];
        let mut ctx = EvalCtx::read_write(&mut data, &out);
        let h = Handle::state(3, 4);
        ctx.write(h, 0, 9, 7).unwrap();
        assert_eq!(ctx.read(h, 0, 9).unwrap(), 7);
        assert!(!ctx.is_undefined(h));
        ctx.zero(h).unwrap();
        assert!(ctx.is_undefined(h));
    }

    #[test]
    fn read_only_ctx_rejects_state_writes() {
        let out = test_output();
        let data = vec![0u8; 4];
        let mut ctx = EvalCtx::read_only(&data, &out);
        let err = ctx.write(Handle::state(0, 4), 0, 9, 1).unwrap_err();
        assert!(err.message.contains("read-only"));
        // locals are still writable
        let local = ctx.alloc_local(8);
        ctx.write(local, 0, 200, 55).unwrap();
        assert_eq!(ctx.read(local, 0, 200).unwrap(), 55);
    }

    #[test]
    fn copy_and_eq_over_complex_regions() {
        let out = test_output();
        let mut data = vec![0u8; 8];
        let mut ctx = EvalCtx::read_write(&mut data, &out);
        let a = Handle::state(0, 20);
        let b = Handle::state(20, 20);
        ctx.write(a.narrow(0, 10), 0, 500, 321).unwrap();
        ctx.copy(b, a).unwrap();
        assert!(ctx.eq(a, b));
        ctx.write(b.narrow(10, 10), 0, 500, 9).unwrap();
        assert!(!ctx.eq(a, b));
    }
}
