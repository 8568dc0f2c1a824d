//! # verge-runtime
//!
//! The exploration runtime that verge-generated checkers link against.
//!
//! A generated checker is a single Rust source file: it defines one
//! function per start state, rule guard, rule body and property, registers
//! them in a [`Model`], builds a [`Config`] from its baked-in options, and
//! calls [`run`]. Everything else — the bit-packed state representation,
//! the lock-free pending queue and seen set, symmetry reduction, liveness
//! propagation, the multi-threaded breadth-first driver, and error/trace
//! reporting — lives here.
//!
//! The crate is deliberately self-contained: its only dependencies are an
//! arena allocator and the libc bindings used for sandboxing. It performs
//! no I/O other than writing the checking report to stdout/stderr.
//!
//! # Module map
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Model description registered by generated code |
//! | [`config`] | Runtime options baked in at generation time |
//! | [`handle`] | Bit-granular reads/writes over packed buffers |
//! | [`value`] | Checked arithmetic on runtime values |
//! | [`state`] | State block layout and accessors |
//! | [`arena`] | Per-thread state allocation |
//! | [`queue`] | Hazard-pointer block FIFO of pending states |
//! | [`set`] | Lock-free expanding seen set |
//! | [`symmetry`] | Canonicalization over scalarset permutations |
//! | [`liveness`] | Liveness bit marking and propagation |
//! | [`rendezvous`] | Leader-electing thread barrier |
//! | [`driver`] | Init, warmup, exploration loop, reporting |
//! | [`output`] | Print lock, colors, XML, tracing |
//! | [`sandbox`] | Optional privilege dropping at startup |

pub mod arena;
pub mod config;
pub mod driver;
pub mod dword;
pub mod error;
pub mod handle;
pub mod hash;
pub mod liveness;
pub mod model;
pub mod output;
pub mod queue;
pub mod rendezvous;
pub mod sandbox;
pub mod set;
pub mod state;
pub mod symmetry;
pub mod value;

pub use config::{Config, CounterexampleTrace, DeadlockDetection, SymmetryReduction, Tristate};
pub use driver::{run, run_report, Report};
pub use error::{Trap, TrapKind};
pub use handle::Handle;
pub use model::{
    EvalCtx, Model, PropertyDesc, PropertyKind, QuantBinding, RuleDesc, ScalarsetDesc,
    StartStateDesc,
};
pub use value::{QuantRange, RawValue, Value};
