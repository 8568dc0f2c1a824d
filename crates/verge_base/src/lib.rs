//! # verge-base
//!
//! Structural atoms for the verge model checker.
//!
//! This crate provides the foundational types used throughout verge:
//!
//! - [`Position`]/[`Location`] — Source position tracking (file, line, column)
//! - [`LocatedError`]/[`Result`] — Errors with source positions
//!
//! # Design Principles
//!
//! This crate has **no knowledge of the modelling language or I/O**. It
//! provides only generic, reusable infrastructure that higher-level crates
//! build upon.
//!
//! # Example
//!
//! ```
//! use verge_base::{Location, Position};
//!
//! let loc = Location::new(Position::new(3, 1), Position::new(3, 14));
//! assert_eq!(loc.begin.line, 3);
//! ```

pub mod error;
pub mod location;

pub use error::{LocatedError, Result};
pub use location::{Location, Position};
