//! End-to-end checking scenarios over hand-built models.
//!
//! These mirror the models the code generator emits: state variables at
//! fixed bit offsets, rules as functions over an evaluation context, and
//! quantifier bindings passed as values.

use verge_runtime::config::{Config, DeadlockDetection, SymmetryReduction, Tristate};
use verge_runtime::handle::{read_raw, write_raw};
use verge_runtime::model::{
    Model, PropertyDesc, PropertyKind, QuantBinding, RuleDesc, ScalarsetDesc, StartStateDesc,
};
use verge_runtime::{run_report, Handle, Value};

fn quiet_config() -> Config {
    Config {
        color: Tristate::Off,
        deadlock_detection: DeadlockDetection::Off,
        symmetry_reduction: SymmetryReduction::Off,
        ..Config::default()
    }
}

/// One boolean `v` at offset 0: start `v := false`, rule `!v ==> v := true`.
fn smoke_model() -> Model {
    const V: Handle = Handle::state(0, 2);
    Model {
        state_bits: 2,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(V, 0, 1, 0)),
        }],
        rules: vec![RuleDesc {
            name: "flip".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 0))),
            body: Box::new(|ctx, _| ctx.write(V, 0, 1, 1)),
        }],
        properties: vec![],
        scalarsets: vec![],
        print_state: None,
    }
}

#[test]
fn s1_smoke_two_states_one_firing() {
    let report = run_report(smoke_model(), quiet_config());
    assert_eq!(report.status, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(report.states, 2);
    assert_eq!(report.rules_fired, 1);
}

#[test]
fn s2_invariant_violation_is_reported() {
    // x in 0..2, start x := 0, rule x := x + 1, invariant x <= 1
    const X: Handle = Handle::state(0, 2);
    let model = Model {
        state_bits: 2,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 2, 0)),
        }],
        rules: vec![RuleDesc {
            name: "increment".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(X, 0, 2)? < 2))),
            body: Box::new(|ctx, _| {
                let x = ctx.read(X, 0, 2)?;
                ctx.write(X, 0, 2, x + 1)
            }),
        }],
        properties: vec![PropertyDesc {
            name: "bounded".into(),
            kind: PropertyKind::Invariant,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(X, 0, 2)? <= 1)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.status, 1);
    assert_eq!(report.errors, 1);
    // x = 0 and x = 1 were seen; the violating x = 2 was rejected
    assert_eq!(report.states, 2);
}

#[test]
fn s3_stuck_state_is_a_deadlock() {
    // x in 0..0, start x := 0, rule never enabled
    const X: Handle = Handle::state(0, 1);
    let model = Model {
        state_bits: 1,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 0, 0)),
        }],
        rules: vec![RuleDesc {
            name: "never".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(X, 0, 0)? != 0))),
            body: Box::new(|_, _| Ok(())),
        }],
        properties: vec![],
        scalarsets: vec![],
        print_state: None,
    };

    let cfg = Config {
        deadlock_detection: DeadlockDetection::Stuck,
        ..quiet_config()
    };
    let report = run_report(model, cfg);
    assert_eq!(report.status, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.rules_fired, 0);
}

/// Scalarset `T` of bound 3 and `a: array [T] of boolean`; one start
/// state per `i: T` setting `a[i] := true`.
fn symmetry_model() -> Model {
    const A: Handle = Handle::state(0, 6);
    Model {
        state_bits: 6,
        start_states: vec![StartStateDesc {
            name: "mark one".into(),
            bindings: vec![QuantBinding::range("i", 0, 2)],
            apply: Box::new(|ctx, args| {
                for j in 0..3 {
                    let cell = A.index(2, 0, 2, j)?;
                    ctx.write(cell, 0, 1, 0)?;
                }
                let cell = A.index(2, 0, 2, args[0])?;
                ctx.write(cell, 0, 1, 1)
            }),
        }],
        rules: vec![],
        properties: vec![],
        scalarsets: vec![ScalarsetDesc {
            name: "T".into(),
            bound: 3,
            swap: Box::new(|data: &mut [u8], x: Value, y: Value| {
                if x != y {
                    let a = read_raw(data, 2 * x as usize, 2);
                    let b = read_raw(data, 2 * y as usize, 2);
                    write_raw(data, 2 * y as usize, 2, a);
                    write_raw(data, 2 * x as usize, 2, b);
                }
            }),
        }],
        print_state: None,
    }
}

#[test]
fn s4_symmetry_reduction_collapses_permuted_states() {
    let with_reduction = run_report(
        symmetry_model(),
        Config {
            symmetry_reduction: SymmetryReduction::Exhaustive,
            ..quiet_config()
        },
    );
    assert_eq!(with_reduction.errors, 0);
    assert_eq!(with_reduction.states, 1);

    let without = run_report(symmetry_model(), quiet_config());
    assert_eq!(without.errors, 0);
    assert_eq!(without.states, 3);
}

#[test]
fn s5_cover_properties_are_counted() {
    // x in 0..10, rule increments, cover "x = 5"
    const X: Handle = Handle::state(0, 4);
    let model = Model {
        state_bits: 4,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 10, 0)),
        }],
        rules: vec![RuleDesc {
            name: "increment".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? < 10))),
            body: Box::new(|ctx, _| {
                let x = ctx.read(X, 0, 10)?;
                ctx.write(X, 0, 10, x + 1)
            }),
        }],
        properties: vec![PropertyDesc {
            name: "reaches five".into(),
            kind: PropertyKind::Cover,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? == 5)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    // a cover that was hit is not an error
    assert_eq!(report.status, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(report.states, 11);
}

#[test]
fn s5b_missed_cover_is_an_error() {
    const X: Handle = Handle::state(0, 4);
    let model = Model {
        state_bits: 4,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 10, 0)),
        }],
        rules: vec![],
        properties: vec![PropertyDesc {
            name: "unreachable".into(),
            kind: PropertyKind::Cover,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? == 7)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.status, 1);
    assert_eq!(report.errors, 1);
}

#[test]
fn s6_oscillating_liveness_holds() {
    // v oscillates; liveness "eventually v" holds on every path
    const V: Handle = Handle::state(0, 2);
    let model = Model {
        state_bits: 2,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(V, 0, 1, 0)),
        }],
        rules: vec![
            RuleDesc {
                name: "rise".into(),
                bindings: vec![],
                guard: Some(Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 0))),
                body: Box::new(|ctx, _| ctx.write(V, 0, 1, 1)),
            },
            RuleDesc {
                name: "fall".into(),
                bindings: vec![],
                guard: Some(Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 1))),
                body: Box::new(|ctx, _| ctx.write(V, 0, 1, 0)),
            },
        ],
        properties: vec![PropertyDesc {
            name: "eventually up".into(),
            kind: PropertyKind::Liveness,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 1)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let cfg = Config {
        deadlock_detection: DeadlockDetection::Stuck,
        ..quiet_config()
    };
    let report = run_report(model, cfg);
    assert_eq!(report.status, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(report.states, 2);
}

#[test]
fn s6b_unsatisfiable_liveness_is_violated() {
    const V: Handle = Handle::state(0, 2);
    let model = Model {
        state_bits: 2,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(V, 0, 1, 0)),
        }],
        rules: vec![RuleDesc {
            name: "stay down".into(),
            bindings: vec![],
            guard: None,
            body: Box::new(|ctx, _| ctx.write(V, 0, 1, 0)),
        }],
        properties: vec![PropertyDesc {
            name: "eventually up".into(),
            kind: PropertyKind::Liveness,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 1)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.status, 1);
    assert_eq!(report.errors, 1);
}

/// A three-counter grid model, wide enough for the queue to trigger the
/// multi-threaded RUN phase.
fn grid_model() -> Model {
    const W: usize = 3; // bits per counter (0..5 -> 7 encodings)
    fn var(i: usize) -> Handle {
        Handle::state(i * W, W)
    }
    let mk_rule = |i: usize| RuleDesc {
        name: format!("bump {}", i),
        bindings: vec![],
        guard: Some(Box::new(move |ctx, _| Ok(ctx.read(var(i), 0, 5)? < 5))),
        body: Box::new(move |ctx, _| {
            let v = ctx.read(var(i), 0, 5)?;
            ctx.write(var(i), 0, 5, v + 1)
        }),
    };
    Model {
        state_bits: 3 * W,
        start_states: vec![StartStateDesc {
            name: "origin".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| {
                for i in 0..3 {
                    ctx.write(var(i), 0, 5, 0)?;
                }
                Ok(())
            }),
        }],
        rules: vec![mk_rule(0), mk_rule(1), mk_rule(2)],
        properties: vec![],
        scalarsets: vec![],
        print_state: None,
    }
}

#[test]
fn state_count_is_independent_of_thread_count() {
    let single = run_report(grid_model(), quiet_config());
    assert_eq!(single.errors, 0);
    assert_eq!(single.states, 6 * 6 * 6);

    let multi = run_report(
        grid_model(),
        Config {
            threads: 4,
            ..quiet_config()
        },
    );
    assert_eq!(multi.errors, 0);
    assert_eq!(multi.states, single.states);
}

#[test]
fn depth_bound_limits_exploration() {
    let bounded = run_report(
        grid_model(),
        Config {
            bound: 2,
            ..quiet_config()
        },
    );
    assert_eq!(bounded.errors, 0);
    // states at Manhattan distance <= 2 from the origin
    assert_eq!(bounded.states, 1 + 3 + 6);
}

#[test]
fn max_errors_allows_continuing_past_failures() {
    // three rules from the start state, each reaching a violating value
    const X: Handle = Handle::state(0, 4);
    let mk_rule = |target: Value| RuleDesc {
        name: format!("jump to {}", target),
        bindings: vec![],
        guard: None,
        body: Box::new(move |ctx, _| ctx.write(X, 0, 10, target)),
    };
    let model = Model {
        state_bits: 4,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 10, 0)),
        }],
        rules: vec![mk_rule(1), mk_rule(2), mk_rule(3)],
        properties: vec![PropertyDesc {
            name: "zero only".into(),
            kind: PropertyKind::Invariant,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? == 0)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(
        model,
        Config {
            max_errors: 3,
            counterexample_trace: verge_runtime::CounterexampleTrace::Off,
            ..quiet_config()
        },
    );
    assert_eq!(report.status, 1);
    assert_eq!(report.errors, 3);
}

#[test]
fn assumptions_prune_instead_of_failing() {
    // the assumption discards states with x > 2
    const X: Handle = Handle::state(0, 4);
    let model = Model {
        state_bits: 4,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| ctx.write(X, 0, 10, 0)),
        }],
        rules: vec![RuleDesc {
            name: "increment".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? < 10))),
            body: Box::new(|ctx, _| {
                let x = ctx.read(X, 0, 10)?;
                ctx.write(X, 0, 10, x + 1)
            }),
        }],
        properties: vec![PropertyDesc {
            name: "small".into(),
            kind: PropertyKind::Assumption,
            bindings: vec![],
            check: Box::new(|ctx, _| Ok(ctx.read(X, 0, 10)? <= 2)),
        }],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.status, 0);
    assert_eq!(report.errors, 0);
    // x in {0, 1, 2}; x = 3 was pruned by the assumption
    assert_eq!(report.states, 3);
}

#[test]
fn undefined_read_is_an_error() {
    const V: Handle = Handle::state(0, 2);
    let model = Model {
        state_bits: 2,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            // v is left undefined
            bindings: vec![],
            apply: Box::new(|_, _| Ok(())),
        }],
        rules: vec![RuleDesc {
            name: "observe".into(),
            bindings: vec![],
            guard: Some(Box::new(|ctx, _| Ok(ctx.read(V, 0, 1)? == 0))),
            body: Box::new(|_, _| Ok(())),
        }],
        properties: vec![],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.status, 1);
    assert!(report.errors >= 1);
}

#[test]
fn ruleset_bindings_expand_into_distinct_transitions() {
    // one rule parameterized over p in 0..2, writing cell p
    const A: Handle = Handle::state(0, 6);
    let model = Model {
        state_bits: 6,
        start_states: vec![StartStateDesc {
            name: "init".into(),
            bindings: vec![],
            apply: Box::new(|ctx, _| {
                for j in 0..3 {
                    ctx.write(A.index(2, 0, 2, j)?, 0, 1, 0)?;
                }
                Ok(())
            }),
        }],
        rules: vec![RuleDesc {
            name: "set".into(),
            bindings: vec![QuantBinding::range("p", 0, 2)],
            guard: Some(Box::new(|ctx, args| {
                Ok(ctx.read(A.index(2, 0, 2, args[0])?, 0, 1)? == 0)
            })),
            body: Box::new(|ctx, args| {
                ctx.write(A.index(2, 0, 2, args[0])?, 0, 1, 1)
            }),
        }],
        properties: vec![],
        scalarsets: vec![],
        print_state: None,
    };

    let report = run_report(model, quiet_config());
    assert_eq!(report.errors, 0);
    // all subsets of three booleans
    assert_eq!(report.states, 8);
}
