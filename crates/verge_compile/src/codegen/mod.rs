//! Checker source emission.
//!
//! [`generate_checker`] turns a resolved, validated, laid-out model into
//! one Rust source file with these sections, in order:
//!
//! 1. a header comment and the constants derived from the options and the
//!    state layout,
//! 2. one function per model-level function/procedure,
//! 3. one function per flattened start state, property, rule guard and
//!    rule body, each taking the evaluation context and the values of its
//!    quantifier bindings,
//! 4. per-scalarset swap functions for symmetry reduction,
//! 5. the generated state pretty-printer,
//! 6. a `model()` constructor registering everything with the runtime,
//!    and a `main` that builds the `Config` and runs the driver.
//!
//! Rulesets were flattened before emission, so a rule's quantifiers are
//! exactly its binding parameters; the runtime enumerates the bindings
//! and numbers transitions in the same order the descriptors are
//! registered.

pub(crate) mod expr;
pub(crate) mod stmt;
pub(crate) mod symmetry;
pub(crate) mod types;

use crate::options::{
    CheckerOptions, CounterexampleTrace, DeadlockDetection, SymmetryReduction, Tristate,
};
use expr::{FnEnv, VarPlace};
use rustc_hash::FxHashMap;
use std::fmt::Write;
use stmt::{emit_stmts, escape_str};
use types::{emit_print_state, simple_bounds, type_width};
use verge_base::Result;
use verge_language::analysis::{Bindings, StateLayout, Validated};
use verge_language::ast::{
    Decl, Function, Model, NodeId, PropertyCategory, PropertyRule, Quantifier, QuantifierKind,
    Rule, SimpleRule, StartState, TypeExprKind,
};

/// Everything expression and statement emission needs to see.
pub(crate) struct EmitCtx<'a> {
    pub model: &'a Model,
    pub bindings: &'a Bindings,
    pub validated: &'a Validated,
    /// State variable declaration id to its bit offset.
    pub state_offsets: FxHashMap<NodeId, u64>,
}

impl<'a> EmitCtx<'a> {
    /// The `(lower, upper, step)` iteration header of a quantifier, as
    /// Rust expressions (runtime-evaluated for non-constant `for` bounds).
    pub(crate) fn quantifier_header(
        &self,
        q: &Quantifier,
        env: &FnEnv,
    ) -> Result<(String, String, String)> {
        match &q.kind {
            QuantifierKind::Typed(ty) => {
                let (lo, hi) = simple_bounds(ty, self)?;
                Ok((format!("{}i64", lo), format!("{}i64", hi), "1i64".into()))
            }
            QuantifierKind::Bounded { from, to, step } => Ok((
                expr::rvalue(from, self, env)?,
                expr::rvalue(to, self, env)?,
                match step {
                    Some(s) => expr::rvalue(s, self, env)?,
                    None => "1i64".into(),
                },
            )),
        }
    }

    /// Renders a `QuantBinding` literal for the model constructor.
    fn binding_desc(&self, q: &Quantifier) -> Result<String> {
        let (lo, hi, step) = self.bindings.quantifier_domain(q)?;
        let member_names = match &q.kind {
            QuantifierKind::Typed(ty) => {
                let resolved = self.bindings.resolve_type(ty);
                match &resolved.kind {
                    TypeExprKind::Enum { members } => {
                        let names: Vec<String> = members
                            .iter()
                            .map(|(n, _)| format!("\"{}\".into()", escape_str(n)))
                            .collect();
                        format!("Some(vec![{}])", names.join(", "))
                    }
                    _ => "None".to_string(),
                }
            }
            QuantifierKind::Bounded { .. } => "None".to_string(),
        };
        Ok(format!(
            "QuantBinding {{ name: \"{}\".into(), lower: {}, upper: {}, step: {}, member_names: {} }}",
            escape_str(&q.name),
            lo,
            hi,
            step,
            member_names
        ))
    }

    fn binding_list(&self, quantifiers: &[Quantifier]) -> Result<String> {
        let descs: Vec<String> = quantifiers
            .iter()
            .map(|q| self.binding_desc(q))
            .collect::<Result<_>>()?;
        Ok(format!("vec![{}]", descs.join(", ")))
    }
}

/// Sets up the environment of a rule-shaped function: quantifiers map to
/// `args[i]`, and local variable declarations allocate buffers.
fn rule_env(
    out: &mut String,
    quantifiers: &[Quantifier],
    decls: &[Decl],
    cx: &EmitCtx,
) -> Result<FnEnv> {
    let mut env = FnEnv::default();
    for (i, q) in quantifiers.iter().enumerate() {
        env.quant.insert(q.meta.id, format!("args[{}]", i));
    }
    for d in decls {
        if let Decl::Var(v) = d {
            let width = type_width(&v.ty, cx)?;
            let name = format!("l_{}", v.name);
            writeln!(
                out,
                "    let {}: Handle = ctx.alloc_local({});",
                name, width
            )
            .unwrap();
            env.vars.insert(v.meta.id, VarPlace::LocalHandle(name));
        }
    }
    Ok(env)
}

fn emit_function(out: &mut String, f: &Function, cx: &EmitCtx) -> Result<()> {
    let returns = f.return_type.is_some();
    let ret = if returns { "Value" } else { "()" };

    let mut signature = format!("fn fn_{}(ctx: &mut EvalCtx", f.name);
    let mut env = FnEnv::default();
    for p in &f.parameters {
        if p.readonly && cx.bindings.is_simple(&p.ty) {
            signature.push_str(&format!(", p_{}: Value", p.name));
            env.vars
                .insert(p.meta.id, VarPlace::ParamValue(format!("p_{}", p.name)));
        } else {
            signature.push_str(&format!(", p_{}: Handle", p.name));
            env.vars
                .insert(p.meta.id, VarPlace::ParamHandle(format!("p_{}", p.name)));
        }
    }
    writeln!(out, "{}) -> RtResult<{}> {{", signature, ret).unwrap();

    for d in &f.decls {
        if let Decl::Var(v) = d {
            let width = type_width(&v.ty, cx)?;
            let name = format!("l_{}", v.name);
            writeln!(out, "    let {}: Handle = ctx.alloc_local({});", name, width).unwrap();
            env.vars.insert(v.meta.id, VarPlace::LocalHandle(name));
        }
    }

    emit_stmts(out, 1, &f.body, cx, &env)?;

    if returns {
        writeln!(
            out,
            "    Err(Trap::new(TrapKind::ErrorStatement, \"function \\\"{}\\\" reached its end without returning\"))",
            escape_str(&f.name)
        )
        .unwrap();
    } else {
        writeln!(out, "    Ok(())").unwrap();
    }
    writeln!(out, "}}\n").unwrap();
    Ok(())
}

fn emit_startstate(out: &mut String, index: usize, s: &StartState, cx: &EmitCtx) -> Result<()> {
    writeln!(
        out,
        "fn startstate{}(ctx: &mut EvalCtx, args: &[Value]) -> RtResult<()> {{",
        index
    )
    .unwrap();
    writeln!(out, "    let _ = (&ctx, args);").unwrap();
    let env = rule_env(out, &s.quantifiers, &s.decls, cx)?;
    emit_stmts(out, 1, &s.body, cx, &env)?;
    writeln!(out, "    Ok(())").unwrap();
    writeln!(out, "}}\n").unwrap();
    Ok(())
}

fn emit_simple_rule(out: &mut String, index: usize, r: &SimpleRule, cx: &EmitCtx) -> Result<()> {
    if let Some(guard) = &r.guard {
        writeln!(
            out,
            "fn guard{}(ctx: &mut EvalCtx, args: &[Value]) -> RtResult<bool> {{",
            index
        )
        .unwrap();
        writeln!(out, "    let _ = (&ctx, args);").unwrap();
        let mut env = FnEnv::default();
        for (i, q) in r.quantifiers.iter().enumerate() {
            env.quant.insert(q.meta.id, format!("args[{}]", i));
        }
        writeln!(out, "    Ok(({}) != 0)", expr::rvalue(guard, cx, &env)?).unwrap();
        writeln!(out, "}}\n").unwrap();
    }

    writeln!(
        out,
        "fn rule{}(ctx: &mut EvalCtx, args: &[Value]) -> RtResult<()> {{",
        index
    )
    .unwrap();
    writeln!(out, "    let _ = (&ctx, args);").unwrap();
    let env = rule_env(out, &r.quantifiers, &r.decls, cx)?;
    emit_stmts(out, 1, &r.body, cx, &env)?;
    writeln!(out, "    Ok(())").unwrap();
    writeln!(out, "}}\n").unwrap();
    Ok(())
}

fn emit_property(out: &mut String, index: usize, p: &PropertyRule, cx: &EmitCtx) -> Result<()> {
    writeln!(
        out,
        "fn property{}(ctx: &mut EvalCtx, args: &[Value]) -> RtResult<bool> {{",
        index
    )
    .unwrap();
    writeln!(out, "    let _ = (&ctx, args);").unwrap();
    let mut env = FnEnv::default();
    for (i, q) in p.quantifiers.iter().enumerate() {
        env.quant.insert(q.meta.id, format!("args[{}]", i));
    }
    writeln!(
        out,
        "    Ok(({}) != 0)",
        expr::rvalue(&p.property.expr, cx, &env)?
    )
    .unwrap();
    writeln!(out, "}}\n").unwrap();
    Ok(())
}

/// The named scalarsets of the model: `(name, bound, pivot type node)`.
fn scalarsets(cx: &EmitCtx) -> Result<Vec<(String, u64, NodeId)>> {
    let mut out = Vec::new();
    for d in &cx.model.decls {
        if let Decl::Type(t) = d {
            let resolved = cx.bindings.resolve_type(&t.value);
            if let TypeExprKind::Scalarset { bound } = &resolved.kind {
                let b = cx.bindings.fold_i64(bound)?;
                out.push((t.name.clone(), b as u64, resolved.meta.id));
            }
        }
    }
    Ok(out)
}

/// Emits the complete checker source for the model.
pub fn generate_checker(
    model: &Model,
    bindings: &Bindings,
    validated: &Validated,
    layout: &StateLayout,
    options: &CheckerOptions,
    source_name: &str,
) -> Result<String> {
    let cx = EmitCtx {
        model,
        bindings,
        validated,
        state_offsets: model
            .state_vars()
            .map(|v| (v.meta.id, v.offset.expect("layout has not run")))
            .collect(),
    };

    let flat = model.flat_rules();
    let starts: Vec<&StartState> = flat
        .iter()
        .filter_map(|r| match r {
            Rule::Start(s) => Some(s),
            _ => None,
        })
        .collect();
    let simples: Vec<&SimpleRule> = flat
        .iter()
        .filter_map(|r| match r {
            Rule::Simple(s) => Some(s),
            _ => None,
        })
        .collect();
    let properties: Vec<&PropertyRule> = flat
        .iter()
        .filter_map(|r| match r {
            Rule::Property(p) => Some(p),
            _ => None,
        })
        .collect();

    let mut out = String::new();

    // ------------------------------------------------------------------
    // header
    // ------------------------------------------------------------------
    writeln!(
        out,
        "//! Checker generated by verge from \"{}\". Do not edit.\n\
         //!\n\
         //! Build against the verge-runtime crate this verge was built from:\n\
         //!     rustc --edition 2021 -O checker.rs --extern verge_runtime=libverge_runtime.rlib\n",
        escape_str(source_name)
    )
    .unwrap();
    writeln!(
        out,
        "#![allow(dead_code, unused_variables, unused_mut, unused_parens, unreachable_code, non_snake_case, clippy::all)]\n"
    )
    .unwrap();
    writeln!(
        out,
        "use verge_runtime as rt;\n\
         use rt::error::RtResult;\n\
         use rt::{{Config, EvalCtx, Handle, Model, PropertyDesc, PropertyKind, QuantBinding, RuleDesc, ScalarsetDesc, StartStateDesc, Trap, TrapKind, Value}};\n"
    )
    .unwrap();

    // ------------------------------------------------------------------
    // constants
    // ------------------------------------------------------------------
    let liveness_count: u64 = properties
        .iter()
        .filter(|p| p.property.category == PropertyCategory::Liveness)
        .map(|p| {
            p.quantifiers
                .iter()
                .map(|q| cx.bindings.quantifier_count(q).unwrap_or(0))
                .product::<u64>()
        })
        .sum();
    let rule_count: u64 = simples
        .iter()
        .map(|r| {
            r.quantifiers
                .iter()
                .map(|q| cx.bindings.quantifier_count(q).unwrap_or(0))
                .product::<u64>()
        })
        .sum();

    writeln!(out, "pub const THREADS: usize = {};", options.effective_threads()).unwrap();
    writeln!(out, "pub const BOUND: u64 = {};", options.bound).unwrap();
    writeln!(out, "pub const SET_CAPACITY: usize = {};", options.set_capacity).unwrap();
    writeln!(
        out,
        "pub const SET_EXPAND_THRESHOLD: usize = {};",
        options.set_expand_threshold
    )
    .unwrap();
    writeln!(out, "pub const MAX_ERRORS: u64 = {};", options.max_errors).unwrap();
    writeln!(
        out,
        "pub const STATE_SIZE_BITS: usize = {};",
        layout.state_size_bits
    )
    .unwrap();
    writeln!(
        out,
        "pub const STATE_SIZE_BYTES: usize = {};",
        layout.state_size_bits.div_ceil(8)
    )
    .unwrap();
    writeln!(out, "pub const LIVENESS_COUNT: u64 = {};", liveness_count).unwrap();
    writeln!(out, "pub const RULE_COUNT: u64 = {};", rule_count).unwrap();
    writeln!(
        out,
        "pub const TRACES_ENABLED: u64 = {:#x};",
        options.traces.bits()
    )
    .unwrap();
    writeln!(out).unwrap();

    // ------------------------------------------------------------------
    // functions, rules, properties
    // ------------------------------------------------------------------
    for f in &model.functions {
        emit_function(&mut out, f, &cx)?;
    }
    for (i, s) in starts.iter().enumerate() {
        emit_startstate(&mut out, i, s, &cx)?;
    }
    for (i, p) in properties.iter().enumerate() {
        emit_property(&mut out, i, p, &cx)?;
    }
    for (i, r) in simples.iter().enumerate() {
        emit_simple_rule(&mut out, i, r, &cx)?;
    }

    // ------------------------------------------------------------------
    // symmetry and printing
    // ------------------------------------------------------------------
    let sets = scalarsets(&cx)?;
    for (name, _, pivot) in &sets {
        symmetry::emit_swap_fn(&mut out, &format!("swap_{}", name), *pivot, &cx)?;
        writeln!(out).unwrap();
    }
    emit_print_state(&mut out, &cx)?;
    writeln!(out).unwrap();

    // ------------------------------------------------------------------
    // the model constructor
    // ------------------------------------------------------------------
    writeln!(out, "pub fn model() -> Model {{").unwrap();
    writeln!(out, "    Model {{").unwrap();
    writeln!(out, "        state_bits: STATE_SIZE_BITS,").unwrap();

    writeln!(out, "        start_states: vec![").unwrap();
    for (i, s) in starts.iter().enumerate() {
        let name = s
            .name
            .clone()
            .unwrap_or_else(|| format!("startstate {}", i));
        writeln!(
            out,
            "            StartStateDesc {{ name: \"{}\".into(), bindings: {}, apply: Box::new(startstate{}) }},",
            escape_str(&name),
            cx.binding_list(&s.quantifiers)?,
            i
        )
        .unwrap();
    }
    writeln!(out, "        ],").unwrap();

    writeln!(out, "        rules: vec![").unwrap();
    for (i, r) in simples.iter().enumerate() {
        let name = r.name.clone().unwrap_or_else(|| format!("rule {}", i));
        let guard = if r.guard.is_some() {
            format!("Some(Box::new(guard{}))", i)
        } else {
            "None".to_string()
        };
        writeln!(
            out,
            "            RuleDesc {{ name: \"{}\".into(), bindings: {}, guard: {}, body: Box::new(rule{}) }},",
            escape_str(&name),
            cx.binding_list(&r.quantifiers)?,
            guard,
            i
        )
        .unwrap();
    }
    writeln!(out, "        ],").unwrap();

    writeln!(out, "        properties: vec![").unwrap();
    for (i, p) in properties.iter().enumerate() {
        let name = p.name.clone().unwrap_or_else(|| format!("property {}", i));
        let kind = match p.property.category {
            PropertyCategory::Assertion => "PropertyKind::Invariant",
            PropertyCategory::Assumption => "PropertyKind::Assumption",
            PropertyCategory::Cover => "PropertyKind::Cover",
            PropertyCategory::Liveness => "PropertyKind::Liveness",
        };
        writeln!(
            out,
            "            PropertyDesc {{ name: \"{}\".into(), kind: {}, bindings: {}, check: Box::new(property{}) }},",
            escape_str(&name),
            kind,
            cx.binding_list(&p.quantifiers)?,
            i
        )
        .unwrap();
    }
    writeln!(out, "        ],").unwrap();

    writeln!(out, "        scalarsets: vec![").unwrap();
    for (name, bound, _) in &sets {
        writeln!(
            out,
            "            ScalarsetDesc {{ name: \"{}\".into(), bound: {}, swap: Box::new(swap_{}) }},",
            escape_str(name),
            bound,
            name
        )
        .unwrap();
    }
    writeln!(out, "        ],").unwrap();
    writeln!(out, "        print_state: Some(Box::new(print_state)),").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    // ------------------------------------------------------------------
    // main
    // ------------------------------------------------------------------
    let deadlock = match options.deadlock_detection {
        DeadlockDetection::Off => "rt::DeadlockDetection::Off",
        DeadlockDetection::Stuck => "rt::DeadlockDetection::Stuck",
        DeadlockDetection::Stuttering => "rt::DeadlockDetection::Stuttering",
    };
    let symmetry_mode = match options.symmetry_reduction {
        SymmetryReduction::Off => "rt::SymmetryReduction::Off",
        SymmetryReduction::Heuristic => "rt::SymmetryReduction::Heuristic",
        SymmetryReduction::Exhaustive => "rt::SymmetryReduction::Exhaustive",
    };
    let cex = match options.counterexample_trace {
        CounterexampleTrace::Off => "rt::CounterexampleTrace::Off",
        CounterexampleTrace::Diff => "rt::CounterexampleTrace::Diff",
        CounterexampleTrace::Full => "rt::CounterexampleTrace::Full",
    };
    let color = match options.color {
        Tristate::Off => "rt::Tristate::Off",
        Tristate::On => "rt::Tristate::On",
        Tristate::Auto => "rt::Tristate::Auto",
    };

    writeln!(out, "fn main() {{").unwrap();
    writeln!(out, "    // the checker reads nothing from stdin").unwrap();
    writeln!(out, "    rt::output::close_stdin();").unwrap();
    writeln!(out, "    let config = Config {{").unwrap();
    writeln!(out, "        threads: THREADS,").unwrap();
    writeln!(out, "        bound: BOUND,").unwrap();
    writeln!(out, "        set_capacity: SET_CAPACITY,").unwrap();
    writeln!(out, "        set_expand_threshold: SET_EXPAND_THRESHOLD,").unwrap();
    writeln!(out, "        max_errors: MAX_ERRORS,").unwrap();
    writeln!(out, "        deadlock_detection: {},", deadlock).unwrap();
    writeln!(out, "        symmetry_reduction: {},", symmetry_mode).unwrap();
    writeln!(out, "        counterexample_trace: {},", cex).unwrap();
    writeln!(out, "        color: {},", color).unwrap();
    writeln!(out, "        traces: TRACES_ENABLED,").unwrap();
    writeln!(
        out,
        "        machine_readable: {},",
        options.machine_readable
    )
    .unwrap();
    writeln!(out, "        pack_state: {},", options.pack_state).unwrap();
    writeln!(out, "        sandbox: {},", options.sandbox).unwrap();
    writeln!(out, "    }};").unwrap();
    writeln!(out, "    std::process::exit(rt::run(model(), config));").unwrap();
    writeln!(out, "}}").unwrap();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verge_language::analysis::{layout, resolve, validate};
    use verge_language::parser::parse;

    fn generate(src: &str, options: &CheckerOptions) -> String {
        let mut model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        let validated = validate(&model, &bindings).expect("validate failed");
        let state = layout(&mut model, &bindings).expect("layout failed");
        generate_checker(&model, &bindings, &validated, &state, options, "test.m")
            .expect("codegen failed")
    }

    const MUTEX: &str = "\
        const N: 2;\n\
        type pid: scalarset(N);\n\
        var flags: array [pid] of boolean;\n\
        startstate \"init\" begin for p: pid do flags[p] := false; endfor; end;\n\
        ruleset p: pid do\n\
          rule \"claim\" !flags[p] ==> begin flags[p] := true; end;\n\
        end;\n\
        invariant \"sane\" forall p: pid do flags[p] | !flags[p] end;\n";

    #[test]
    fn emits_all_sections() {
        let source = generate(MUTEX, &CheckerOptions::default());
        for needle in [
            "fn startstate0(",
            "fn guard0(",
            "fn rule0(",
            "fn property0(",
            "fn swap_pid(",
            "fn print_state(",
            "pub fn model() -> Model {",
            "fn main() {",
            "pub const STATE_SIZE_BITS: usize = 4;",
            "rt::run(model(), config)",
        ] {
            assert!(source.contains(needle), "missing {:?} in:\n{}", needle, source);
        }
    }

    #[test]
    fn constants_reflect_options() {
        let options = CheckerOptions {
            threads: 7,
            bound: 42,
            max_errors: 5,
            pack_state: true,
            ..CheckerOptions::default()
        };
        let source = generate(MUTEX, &options);
        assert!(source.contains("pub const THREADS: usize = 7;"));
        assert!(source.contains("pub const BOUND: u64 = 42;"));
        assert!(source.contains("pub const MAX_ERRORS: u64 = 5;"));
        assert!(source.contains("pack_state: true,"));
    }

    #[test]
    fn ruleset_flattening_parameterizes_rules() {
        let source = generate(MUTEX, &CheckerOptions::default());
        // one emitted rule, with a binding over the scalarset domain
        assert!(source.contains("pub const RULE_COUNT: u64 = 2;"));
        assert!(source.contains("lower: 0, upper: 1, step: 1"));
        assert!(!source.contains("fn rule1("));
    }

    #[test]
    fn guards_read_and_bodies_write() {
        let source = generate(MUTEX, &CheckerOptions::default());
        assert!(source.contains("ctx.read(Handle::state(0, 4).index(2, 0, 1, args[0])?, 0, 1)?"));
        assert!(source.contains("ctx.write(Handle::state(0, 4).index(2, 0, 1,"));
    }

    #[test]
    fn enum_quantifiers_carry_member_names() {
        let source = generate(
            "type color: enum { red, green };\n\
             var c: color;\n\
             startstate begin c := red; end;\n\
             ruleset x: color do rule \"go\" begin c := x; end; end;",
            &CheckerOptions::default(),
        );
        assert!(source.contains("member_names: Some(vec![\"red\".into(), \"green\".into()])"));
    }

    #[test]
    fn complex_equality_compares_bytes() {
        let source = generate(
            "type r: record a: 0..3; b: 0..3; end;\n\
             var x: r; var y: r;\n\
             startstate begin clear x; clear y; end;\n\
             invariant \"same\" x = y;",
            &CheckerOptions::default(),
        );
        assert!(source.contains("ctx.eq("));
        // clear expands to per-leaf lowest-value writes
        assert!(source.contains("ctx.write(cl.narrow(0, 3), 0, 3, 0)?;"));
    }

    #[test]
    fn functions_become_callable_helpers() {
        let source = generate(
            "var x: 0..5;\n\
             function bump(n: 0..5): 0..5; begin return n + 1; end;\n\
             procedure reset(var target: 0..5); begin target := 0; end;\n\
             rule \"step\" x < 5 ==> begin x := bump(x); reset(x); end;",
            &CheckerOptions::default(),
        );
        assert!(source.contains("fn fn_bump(ctx: &mut EvalCtx, p_n: Value) -> RtResult<Value>"));
        assert!(source.contains("fn fn_reset(ctx: &mut EvalCtx, p_target: Handle) -> RtResult<()>"));
        assert!(source.contains("fn_bump(ctx, ctx.read(Handle::state(0, 3), 0, 5)?)?"));
    }

    #[test]
    fn undefine_and_isundefined_round_trip() {
        let source = generate(
            "var x: 0..5;\n\
             startstate begin undefine x; end;\n\
             rule \"define\" isundefined(x) ==> begin x := 0; end;",
            &CheckerOptions::default(),
        );
        assert!(source.contains("ctx.zero(Handle::state(0, 3))?;"));
        assert!(source.contains("ctx.is_undefined(Handle::state(0, 3))"));
    }
}
