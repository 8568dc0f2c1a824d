//! Standalone comment extraction.
//!
//! Re-reads a source buffer and returns its comments in order, with
//! delimiters stripped. Callers interleave the result with the AST by
//! location (the AST itself carries no comments).

use crate::lexer::Lexer;
use crate::token::TokenKind;
use verge_base::Location;

/// A single source comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub location: Location,
    /// True for `/* ... */` comments, false for `--` comments.
    pub multiline: bool,
    /// Comment text without the `--` or `/*`/`*/` delimiters.
    pub content: String,
}

/// Scans `src` and returns all its comments in source order.
pub fn scan_comments(src: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    for token in Lexer::new(src).tokenize() {
        match token.kind {
            TokenKind::LineComment | TokenKind::NlComment => {
                let content = token.text.trim_start_matches("--").to_string();
                comments.push(Comment {
                    location: token.location,
                    multiline: false,
                    content,
                });
            }
            TokenKind::MultilineComment => {
                let inner = token
                    .text
                    .strip_prefix("/*")
                    .and_then(|t| t.strip_suffix("*/"))
                    .unwrap_or(&token.text);
                comments.push(Comment {
                    location: token.location,
                    multiline: true,
                    content: inner.to_string(),
                });
            }
            _ => {}
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_comments_in_order() {
        let src = "var x: boolean; -- state\n/* multi\nline */\n-- tail";
        let comments = scan_comments(src);
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].content, " state");
        assert!(!comments[0].multiline);
        assert_eq!(comments[1].content, " multi\nline ");
        assert!(comments[1].multiline);
        assert_eq!(comments[2].content, " tail");
    }

    #[test]
    fn empty_source_has_no_comments() {
        assert!(scan_comments("var x: boolean;").is_empty());
    }
}
