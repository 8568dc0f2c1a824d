//! A never-failing tokenizer for the model language.
//!
//! The lexer turns source text into a finite [`Token`] stream. It has three
//! properties the rest of the front end relies on:
//!
//! - **It cannot fail.** Bytes that fit no token category become
//!   [`TokenKind::Unknown`] tokens; rejecting them is the parser's job.
//! - **It is layout-preserving.** Comments are kept in the stream
//!   (distinguishing same-line from own-line placement) and two or more
//!   consecutive newlines produce a [`TokenKind::Break`], so downstream
//!   tools can reconstruct the source layout.
//! - **It is Unicode-tolerant.** The operator table carries both ASCII and
//!   Unicode spellings (`:=`/`≔`, `>=`/`≥`, `==>`/`⇒`, ...) and string
//!   literals accept both `"..."` and `“...”` quoting.
//!
//! The magic comment pair `-- murphi-format: off` / `-- murphi-format: on`
//! switches the lexer into raw mode: everything between the markers
//! (inclusive) is emitted as a single verbatim [`TokenKind::Raw`] token.

use crate::token::{Token, TokenKind};
use std::sync::Arc;
use verge_base::{Location, Position};

/// Operators recognized by the lexer, arranged longest-first so a linear
/// scan implements greedy-longest matching.
const OPERATORS: &[&str] = &[
    // three bytes
    "==>", "≔", "≥", "≤", "≠", "⇒", "→", "¬", "∧", "∨", "÷", "−", "∕", "×",
    // two bytes
    ":=", "..", ">=", ">>", "->", "<=", "<<", "!=", "==", "&&", "||",
    // one byte
    "=", "+", "-", "*", "/", "%", "&", "|", "^", "!", "?", "<", ">", ":",
];

const FORMAT_OFF: &str = "-- murphi-format: off";
const FORMAT_ON: &str = "-- murphi-format: on";

/// Tokenizer over a single source buffer.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    file: Option<Arc<str>>,
    /// Byte position of the cursor.
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            file: None,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Attaches a file name to every produced location.
    pub fn with_file(src: &'a str, file: impl Into<Arc<str>>) -> Self {
        let mut lexer = Self::new(src);
        lexer.file = Some(file.into());
        lexer
    }

    /// Lexes the entire input, including the trailing EOF token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn location(&self, begin: Position) -> Location {
        Location {
            file: self.file.clone(),
            begin,
            end: self.position(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Advances the cursor over `len` bytes, maintaining line/column.
    fn advance(&mut self, len: usize) {
        for c in self.src[self.pos..self.pos + len].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += len;
    }

    /// Swallows spaces, tabs, carriage returns and newlines, returning the
    /// number of newlines crossed.
    fn skip_whitespace(&mut self) -> usize {
        let mut newlines = 0;
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\x0c' | b'\r' => self.advance(1),
                b'\n' => {
                    newlines += 1;
                    self.advance(1);
                }
                _ => break,
            }
        }
        newlines
    }

    /// Produces the next token. After EOF has been returned, keeps
    /// returning EOF.
    pub fn next_token(&mut self) -> Token {
        let ws_begin = self.position();
        let newlines = self.skip_whitespace();

        if newlines >= 2 {
            return Token::new(TokenKind::Break, "", self.location(ws_begin));
        }

        let begin = self.position();

        if self.pos >= self.bytes.len() {
            return Token::new(TokenKind::Eof, "", self.location(begin));
        }

        let b = self.bytes[self.pos];

        // comments before operators: '-' and '/' are both operator prefixes
        if self.rest().starts_with("--") {
            return self.lex_line_comment(begin, newlines > 0);
        }
        if self.rest().starts_with("/*") {
            return self.lex_multiline_comment(begin);
        }

        match b {
            b'0'..=b'9' => self.lex_number(begin),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_id(begin),
            b'"' => self.lex_string(begin, "\"", "\""),
            b';' => self.lex_single(begin, TokenKind::Semi),
            b'(' | b'[' => self.lex_single(begin, TokenKind::OpenParen),
            b')' | b']' => self.lex_single(begin, TokenKind::CloseParen),
            b'{' => self.lex_single(begin, TokenKind::OpenBrace),
            b',' => self.lex_single(begin, TokenKind::Comma),
            b'.' if !self.rest().starts_with("..") => self.lex_single(begin, TokenKind::Dot),
            _ => {
                if self.rest().starts_with('“') {
                    return self.lex_string(begin, "“", "”");
                }
                for op in OPERATORS {
                    if self.rest().starts_with(op) {
                        self.advance(op.len());
                        return Token::new(TokenKind::Operator, *op, self.location(begin));
                    }
                }
                // something we cannot categorize; take one whole character
                let len = self.rest().chars().next().map_or(1, char::len_utf8);
                let text = self.src[self.pos..self.pos + len].to_string();
                self.advance(len);
                Token::new(TokenKind::Unknown, text, self.location(begin))
            }
        }
    }

    fn lex_single(&mut self, begin: Position, kind: TokenKind) -> Token {
        let text = &self.src[self.pos..self.pos + 1];
        let token_text = text.to_string();
        self.advance(1);
        Token::new(kind, token_text, self.location(begin))
    }

    fn lex_number(&mut self, begin: Position) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance(1);
        }
        Token::new(
            TokenKind::Number,
            &self.src[start..self.pos],
            self.location(begin),
        )
    }

    fn lex_id(&mut self, begin: Position) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_')) {
            self.advance(1);
        }
        Token::new(
            TokenKind::Id,
            &self.src[start..self.pos],
            self.location(begin),
        )
    }

    fn lex_string(&mut self, begin: Position, open: &str, close: &str) -> Token {
        let start = self.pos;
        self.advance(open.len());
        let mut escaping = false;
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if !escaping && rest.starts_with(close) {
                self.advance(close.len());
                break;
            }
            let c = rest.chars().next().unwrap();
            escaping = c == '\\' && !escaping;
            self.advance(c.len_utf8());
        }
        Token::new(
            TokenKind::Str,
            &self.src[start..self.pos],
            self.location(begin),
        )
    }

    /// Lexes a `--` comment, entering raw mode on the format-off marker.
    fn lex_line_comment(&mut self, begin: Position, own_line: bool) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b'\n') {
            self.advance(1);
        }
        let text = &self.src[start..self.pos];

        if text.trim_end() == FORMAT_OFF {
            return self.lex_raw(begin, start);
        }

        let kind = if own_line {
            TokenKind::NlComment
        } else {
            TokenKind::LineComment
        };
        Token::new(kind, text, self.location(begin))
    }

    /// Consumes verbatim text through the format-on marker (or EOF).
    fn lex_raw(&mut self, begin: Position, start: usize) -> Token {
        loop {
            if self.pos >= self.bytes.len() {
                break;
            }
            // consume the newline ending the previous line
            self.advance(1);
            let line_start = self.pos;
            while self.peek().is_some_and(|b| b != b'\n') {
                self.advance(1);
            }
            if self.src[line_start..self.pos].trim_end() == FORMAT_ON {
                break;
            }
        }
        Token::new(TokenKind::Raw, &self.src[start..self.pos], self.location(begin))
    }

    fn lex_multiline_comment(&mut self, begin: Position) -> Token {
        let start = self.pos;
        self.advance(2);
        let mut saw_star = false;
        while let Some(b) = self.peek() {
            self.advance(1);
            if saw_star && b == b'/' {
                break;
            }
            saw_star = b == b'*';
        }
        Token::new(
            TokenKind::MultilineComment,
            &self.src[start..self.pos],
            self.location(begin),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().iter().map(|t| t.kind).collect()
    }

    fn texts(src: &str) -> Vec<String> {
        Lexer::new(src)
            .tokenize()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn lexes_ids_and_numbers() {
        assert_eq!(
            kinds("x := 42"),
            vec![
                TokenKind::Id,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn operators_match_greedy_longest() {
        assert_eq!(texts("==> == ="), vec!["==>", "==", "=", ""]);
        assert_eq!(texts(":= :"), vec![":=", ":", ""]);
        assert_eq!(texts("0..2"), vec!["0", "..", "2", ""]);
    }

    #[test]
    fn unicode_operators_are_recognized() {
        let tokens = Lexer::new("a ≔ b ⇒ c ≥ 1").tokenize();
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["≔", "⇒", "≥"]);
    }

    #[test]
    fn dot_vs_dotdot() {
        assert_eq!(
            kinds("r.f"),
            vec![TokenKind::Id, TokenKind::Dot, TokenKind::Id, TokenKind::Eof]
        );
        assert_eq!(
            kinds("1..2"),
            vec![
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn never_fails_on_garbage() {
        let tokens = Lexer::new("x \u{1}\u{2} y").tokenize();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Id,
                TokenKind::Unknown,
                TokenKind::Unknown,
                TokenKind::Id,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_are_retained() {
        let tokens = Lexer::new("x -- trailing\n-- own line\ny").tokenize();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Id,
                TokenKind::LineComment,
                TokenKind::NlComment,
                TokenKind::Id,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn multiline_comment() {
        let tokens = Lexer::new("a /* b\nc */ d").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::MultilineComment);
        assert_eq!(tokens[1].text, "/* b\nc */");
    }

    #[test]
    fn blank_lines_produce_break() {
        assert_eq!(
            kinds("a\n\n\nb"),
            vec![TokenKind::Id, TokenKind::Break, TokenKind::Id, TokenKind::Eof]
        );
        // a single newline is not a break
        assert_eq!(kinds("a\nb"), vec![TokenKind::Id, TokenKind::Id, TokenKind::Eof]);
    }

    #[test]
    fn smart_quoted_strings() {
        let tokens = Lexer::new("“hello” \"world\"").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "“hello”");
        assert_eq!(tokens[1].kind, TokenKind::Str);
        assert_eq!(tokens[1].text, "\"world\"");
    }

    #[test]
    fn string_escapes_do_not_terminate() {
        let tokens = Lexer::new(r#""a \" b" x"#).tokenize();
        assert_eq!(tokens[0].text, r#""a \" b""#);
        assert_eq!(tokens[1].kind, TokenKind::Id);
    }

    #[test]
    fn format_markers_yield_raw() {
        let src = "a\n-- murphi-format: off\nkeep   me\n-- murphi-format: on\nb";
        let tokens = Lexer::new(src).tokenize();
        let raw = tokens.iter().find(|t| t.kind == TokenKind::Raw).unwrap();
        assert!(raw.text.contains("keep   me"));
        assert!(raw.text.starts_with("-- murphi-format: off"));
        assert!(raw.text.ends_with("-- murphi-format: on"));
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let tokens = Lexer::new("ab\n  cd").tokenize();
        assert_eq!(tokens[0].location.begin, Position::new(1, 1));
        assert_eq!(tokens[1].location.begin, Position::new(2, 3));
        assert_eq!(tokens[1].location.end, Position::new(2, 5));
    }
}
