//! Error types with source location tracking.
//!
//! All front-end errors in verge carry a [`Location`] indicating where in
//! the model source the error occurred. The compiler surfaces the first
//! error to the user and stops.
//!
//! # Example
//!
//! ```
//! use verge_base::{LocatedError, Location, Position, Result};
//!
//! fn reject() -> Result<()> {
//!     Err(LocatedError::new(
//!         "duplicate declaration of \"x\"",
//!         Location::new(Position::new(4, 1), Position::new(4, 2)),
//!     ))
//! }
//!
//! let err = reject().unwrap_err();
//! assert!(err.to_string().contains("duplicate declaration"));
//! ```

use crate::location::Location;
use std::fmt;

/// An error annotated with its source location.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display format
/// is `{location}: {message}`.
#[derive(Debug, Clone)]
pub struct LocatedError {
    /// Human-readable error description.
    pub message: String,
    /// Location in source where the error occurred.
    pub location: Location,
}

impl LocatedError {
    /// Creates an error with the given message and source location.
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for LocatedError {}

/// Alias for `std::result::Result<T, LocatedError>`.
pub type Result<T> = std::result::Result<T, LocatedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn located_error_display() {
        let err = LocatedError::new(
            "unresolved symbol \"y\"",
            Location::new(Position::new(7, 5), Position::new(7, 6)),
        );
        let display = format!("{}", err);
        assert!(display.contains("unresolved symbol"));
        assert!(display.contains("7.5"));
    }
}
