//! # verge-verify
//!
//! SMT-assisted simplification of model expressions.
//!
//! This optional pass runs between validation and code generation. It
//! walks the model opening and closing scopes exactly as symbol
//! resolution does, declaring each visible variable and constant to an
//! external SMT solver with its type's bound constraints, and asks two
//! questions of every boolean subexpression: *is this always true* and
//! *is this always false*. Only a conclusive answer substitutes the
//! corresponding boolean literal back into the tree; everything else is
//! left exactly as written.
//!
//! The solver is an external binary spoken to in SMT-LIB 2, one fresh
//! process per query ([`process`]): scoping is implemented by a stack of
//! prelude buffers rather than solver-level `push`/`pop`, because some
//! solvers only support those in incremental mode. A millisecond budget
//! bounds the total solver time; once spent, the pass stops issuing
//! queries. Unsupported expressions (function calls, `isundefined`,
//! quantified existentials) and inconclusive or failed queries simply
//! leave the expression untouched — this pass cannot fail a compile.

pub mod declare;
pub mod error;
pub mod logic;
pub mod process;
pub mod simplify;
pub mod solver;
pub mod translate;

pub use error::{VerifyError, VerifyResult};
pub use logic::{Logic, LogicMode};
pub use simplify::{simplify, SimplifyStats};
pub use solver::{SatResult, Solver};
