//! Source location tracking for error reporting.
//!
//! A [`Location`] represents a region of a model source file as a pair of
//! line/column [`Position`]s. Every token, AST node, and error in verge
//! carries a location, enabling precise error messages that point to the
//! exact place a problem originates.
//!
//! # Line and Column Numbering
//!
//! Lines and columns are 1-based, matching what editors display. The `end`
//! position is exclusive: a token spanning columns 5–8 has `begin.column == 5`
//! and `end.column == 9`.
//!
//! # Example
//!
//! ```
//! use verge_base::{Location, Position};
//!
//! let a = Location::new(Position::new(2, 3), Position::new(2, 7));
//! let b = Location::new(Position::new(2, 9), Position::new(4, 1));
//! let merged = a.merge(&b);
//!
//! assert_eq!(merged.begin, Position::new(2, 3));
//! assert_eq!(merged.end, Position::new(4, 1));
//! ```

use std::fmt;
use std::sync::Arc;

/// A 1-based line/column pair within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.column)
    }
}

/// A contiguous region of source text.
///
/// Locations are cheap to clone; the file name is shared. Use
/// [`Location::merge`] to combine locations when building compound
/// expressions: the location of `a + b` is `a.loc.merge(&b.loc)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// Name of the file this region lies within, when known.
    pub file: Option<Arc<str>>,
    /// Position of the first character (inclusive).
    pub begin: Position,
    /// Position one past the last character (exclusive).
    pub end: Position,
}

impl Location {
    /// Creates a location with no file name.
    pub fn new(begin: Position, end: Position) -> Self {
        Self {
            file: None,
            begin,
            end,
        }
    }

    /// Creates a location within a named file.
    pub fn in_file(file: Arc<str>, begin: Position, end: Position) -> Self {
        Self {
            file: Some(file),
            begin,
            end,
        }
    }

    /// Covers from the start of `self` to the end of `other`.
    ///
    /// The file name is taken from `self` when present, `other` otherwise.
    pub fn merge(&self, other: &Location) -> Location {
        Location {
            file: self.file.clone().or_else(|| other.file.clone()),
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(f, "{}-{}", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_orders_by_line_then_column() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(3, 4) < Position::new(3, 5));
    }

    #[test]
    fn location_merge_covers_both() {
        let a = Location::new(Position::new(2, 3), Position::new(2, 7));
        let b = Location::new(Position::new(2, 9), Position::new(4, 1));
        let merged = a.merge(&b);
        assert_eq!(merged.begin, Position::new(2, 3));
        assert_eq!(merged.end, Position::new(4, 1));
    }

    #[test]
    fn location_merge_keeps_file() {
        let file: Arc<str> = Arc::from("model.m");
        let a = Location::in_file(file.clone(), Position::new(1, 1), Position::new(1, 2));
        let b = Location::new(Position::new(1, 3), Position::new(1, 4));
        assert_eq!(a.merge(&b).file.as_deref(), Some("model.m"));
        assert_eq!(b.merge(&a).file.as_deref(), Some("model.m"));
    }

    #[test]
    fn location_display_includes_positions() {
        let loc = Location::new(Position::new(2, 3), Position::new(2, 7));
        assert_eq!(format!("{}", loc), "2.3-2.7");
    }
}
