//! Token types for the model language lexer.
//!
//! Tokens are the atomic syntactic units produced by the [`Lexer`] and
//! consumed by the parser. The token set is deliberately coarse: keywords
//! are ordinary [`Id`] tokens (the parser matches on their text), and both
//! `(`/`[` and `)`/`]` collapse into one paren kind each, which the parser
//! disambiguates by context.
//!
//! Comments and blank-line [`Break`] tokens are preserved in the stream so a
//! reformatter can reconstruct the source layout; the parser simply skips
//! them.
//!
//! [`Lexer`]: crate::lexer::Lexer
//! [`Id`]: TokenKind::Id
//! [`Break`]: TokenKind::Break

use verge_base::Location;

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// An identifier or keyword.
    Id,
    /// A decimal numeric literal.
    Number,
    /// A string literal, including its quotes.
    Str,
    /// An operator, matched greedy-longest from the operator table.
    Operator,
    /// `(` or `[`.
    OpenParen,
    /// `)` or `]`.
    CloseParen,
    /// `{`.
    OpenBrace,
    /// `.` (when not part of `..`).
    Dot,
    /// `,`.
    Comma,
    /// `;`.
    Semi,
    /// A `--` comment on the same line as preceding content.
    LineComment,
    /// A `--` comment on its own line.
    NlComment,
    /// A `/* ... */` comment.
    MultilineComment,
    /// Two or more consecutive newlines.
    Break,
    /// A byte sequence the lexer could not categorize.
    Unknown,
    /// Verbatim text between `-- murphi-format: off` and `-- murphi-format:
    /// on` markers.
    Raw,
}

/// A single lexed token with its text and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the token.
    pub text: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
        }
    }

    /// Whether this token is layout trivia the parser should skip.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LineComment
                | TokenKind::NlComment
                | TokenKind::MultilineComment
                | TokenKind::Break
                | TokenKind::Raw
        )
    }
}
