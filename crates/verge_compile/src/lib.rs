//! # verge-compile
//!
//! Code generation: turns a resolved, validated, laid-out model into the
//! source of its checker.
//!
//! The generated artifact is a single Rust file. Every start state, rule
//! guard, rule body and property of the (flattened) model becomes a
//! function over `verge_runtime`'s evaluation context; scalarsets get
//! generated swap functions; and a `main` assembles the runtime `Model`
//! and `Config` from constants baked in from [`CheckerOptions`] and calls
//! the runtime driver. Compile the output against the same
//! `verge-runtime` this compiler was built with.

pub mod codegen;
pub mod options;

pub use codegen::generate_checker;
pub use options::{
    CheckerOptions, CounterexampleTrace, DeadlockDetection, SymmetryReduction, TraceCategory,
    Tristate,
};
