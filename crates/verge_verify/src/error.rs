//! Simplifier error types.
//!
//! None of these abort a compile: [`Unsupported`] and [`Inconclusive`]
//! skip a single expression, and [`BudgetExhausted`] stops the pass from
//! issuing further queries while keeping everything simplified so far.
//!
//! [`Unsupported`]: VerifyError::Unsupported
//! [`Inconclusive`]: VerifyError::Inconclusive
//! [`BudgetExhausted`]: VerifyError::BudgetExhausted

use std::fmt;

#[derive(Debug, Clone)]
pub enum VerifyError {
    /// The expression uses a construct with no SMT translation.
    Unsupported {
        /// Rendering of the offending expression.
        what: String,
    },
    /// The solver time budget has been spent.
    BudgetExhausted,
    /// The solver produced neither `sat` nor `unsat`.
    Inconclusive { detail: String },
    /// Spawning or speaking to the solver process failed.
    Io { message: String },
}

impl VerifyError {
    pub fn unsupported(what: impl fmt::Display) -> Self {
        Self::Unsupported {
            what: what.to_string(),
        }
    }

    pub fn inconclusive(detail: impl Into<String>) -> Self {
        Self::Inconclusive {
            detail: detail.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Unsupported { what } => {
                write!(f, "no SMT translation for expression \"{}\"", what)
            }
            VerifyError::BudgetExhausted => write!(f, "SMT solver time budget exhausted"),
            VerifyError::Inconclusive { detail } => {
                write!(f, "inconclusive result from SMT solver: {}", detail)
            }
            VerifyError::Io { message } => write!(f, "SMT solver error: {}", message),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Alias for simplifier results.
pub type VerifyResult<T> = std::result::Result<T, VerifyError>;
