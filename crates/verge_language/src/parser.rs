//! Recursive-descent parser for the model language.
//!
//! The parser consumes the [`Lexer`](crate::lexer::Lexer)'s token stream
//! (trivia filtered out) and produces a raw [`Model`]. It performs no name
//! resolution or type checking; those are separate passes in
//! [`crate::analysis`]. Keywords are ordinary identifier tokens matched by
//! text, and the Unicode operator spellings are mapped to the same AST
//! operators as their ASCII equivalents.
//!
//! Parse failures are [`LocatedError`]s pointing at the offending token;
//! the first error aborts the parse.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use num_bigint::BigInt;
use verge_base::{LocatedError, Location, Result};

/// Parses a complete model from source text.
pub fn parse(src: &str, file: Option<&str>) -> Result<Model> {
    let tokens = match file {
        Some(name) => Lexer::with_file(src, name).tokenize(),
        None => Lexer::new(src).tokenize(),
    };
    let mut model = Parser::new(tokens).model()?;
    reindex(&mut model);
    Ok(model)
}

/// Section-opening and block-terminating keywords, used to decide where
/// declaration lists and statement lists stop.
const SECTION_KEYWORDS: &[&str] = &[
    "const",
    "type",
    "var",
    "function",
    "procedure",
    "startstate",
    "rule",
    "ruleset",
    "alias",
    "invariant",
    "assume",
    "cover",
    "liveness",
    "begin",
    "end",
];

const END_KEYWORDS: &[&str] = &[
    "end",
    "endif",
    "endswitch",
    "endfor",
    "endwhile",
    "endalias",
    "endrule",
    "endstartstate",
    "endruleset",
    "endfunction",
    "endprocedure",
    "else",
    "elsif",
    "case",
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens.into_iter().filter(|t| !t.is_trivia()).collect();
        Self { tokens, pos: 0 }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek2(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn loc(&self) -> Location {
        self.peek().location.clone()
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(LocatedError::new(message, self.loc()))
    }

    fn is_keyword(&self, kw: &str) -> bool {
        self.peek().kind == TokenKind::Id && self.peek().text == kw
    }

    fn is_any_keyword(&self, kws: &[&str]) -> bool {
        self.peek().kind == TokenKind::Id && kws.iter().any(|k| self.peek().text == *k)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<Token> {
        if self.is_keyword(kw) {
            Ok(self.advance())
        } else {
            self.error(format!("expected \"{}\", found \"{}\"", kw, self.peek().text))
        }
    }

    fn is_operator(&self, op: &str) -> bool {
        self.peek().kind == TokenKind::Operator && self.peek().text == op
    }

    fn is_any_operator(&self, ops: &[&str]) -> bool {
        self.peek().kind == TokenKind::Operator && ops.iter().any(|o| self.peek().text == *o)
    }

    fn eat_operator(&mut self, ops: &[&str]) -> bool {
        if self.is_any_operator(ops) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, ops: &[&str]) -> Result<Token> {
        if self.is_any_operator(ops) {
            Ok(self.advance())
        } else {
            self.error(format!(
                "expected \"{}\", found \"{}\"",
                ops[0],
                self.peek().text
            ))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            self.error(format!("expected {}, found \"{}\"", what, self.peek().text))
        }
    }

    fn expect_id(&mut self) -> Result<Token> {
        if self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            Ok(self.advance())
        } else {
            self.error(format!("expected identifier, found \"{}\"", self.peek().text))
        }
    }

    fn eat_semis(&mut self) {
        while self.peek().kind == TokenKind::Semi {
            self.advance();
        }
    }

    /// Strips quotes from a string token and processes backslash escapes.
    fn string_value(token: &Token) -> String {
        let inner = token
            .text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .or_else(|| {
                token
                    .text
                    .strip_prefix('“')
                    .and_then(|t| t.strip_suffix('”'))
            })
            .unwrap_or(&token.text);
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(next) => out.push(next),
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    /// An optional rule/property name: a string literal.
    fn optional_name(&mut self) -> Option<String> {
        if self.peek().kind == TokenKind::Str {
            let token = self.advance();
            Some(Self::string_value(&token))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Model structure
    // ------------------------------------------------------------------

    fn model(&mut self) -> Result<Model> {
        let mut model = Model::new(self.loc());
        loop {
            self.eat_semis();
            if self.at_eof() {
                break;
            }
            if self.eat_keyword("const") {
                self.const_section(&mut model.decls)?;
            } else if self.eat_keyword("type") {
                self.type_section(&mut model.decls)?;
            } else if self.eat_keyword("var") {
                self.var_section(&mut model.decls)?;
            } else if self.is_keyword("function") || self.is_keyword("procedure") {
                let f = self.function()?;
                model.functions.push(f);
            } else {
                let r = self.rule()?;
                model.rules.push(r);
            }
        }
        Ok(model)
    }

    fn const_section(&mut self, out: &mut Vec<Decl>) -> Result<()> {
        while self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            let name = self.expect_id()?;
            self.expect_operator(&[":"])?;
            let value = self.expr()?;
            let loc = name.location.merge(value.loc());
            self.expect_kind(TokenKind::Semi, "\";\"")?;
            out.push(Decl::Const(ConstDecl {
                meta: NodeMeta::new(loc),
                name: name.text,
                value,
            }));
        }
        Ok(())
    }

    fn type_section(&mut self, out: &mut Vec<Decl>) -> Result<()> {
        while self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            let name = self.expect_id()?;
            self.expect_operator(&[":"])?;
            let value = self.type_expr()?;
            let loc = name.location.merge(&value.meta.loc);
            self.expect_kind(TokenKind::Semi, "\";\"")?;
            out.push(Decl::Type(TypeDecl {
                meta: NodeMeta::new(loc),
                name: name.text,
                value,
            }));
        }
        Ok(())
    }

    fn var_section(&mut self, out: &mut Vec<Decl>) -> Result<()> {
        while self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            let mut names = vec![self.expect_id()?];
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                names.push(self.expect_id()?);
            }
            self.expect_operator(&[":"])?;
            let ty = self.type_expr()?;
            self.expect_kind(TokenKind::Semi, "\";\"")?;
            for name in names {
                let loc = name.location.merge(&ty.meta.loc);
                out.push(Decl::Var(VarDecl::new(name.text, ty.clone(), loc)));
            }
        }
        Ok(())
    }

    /// Declarations between a rule/function header and its `begin`.
    fn inner_decls(&mut self) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            if self.eat_keyword("const") {
                self.const_section(&mut decls)?;
            } else if self.eat_keyword("type") {
                self.type_section(&mut decls)?;
            } else if self.eat_keyword("var") {
                self.var_section(&mut decls)?;
            } else {
                break;
            }
        }
        Ok(decls)
    }

    fn function(&mut self) -> Result<Function> {
        let is_function = self.is_keyword("function");
        let start = self.advance(); // function | procedure
        let name = self.expect_id()?;

        let mut parameters = Vec::new();
        if self.peek().kind == TokenKind::OpenParen {
            self.advance();
            while self.peek().kind != TokenKind::CloseParen {
                let by_ref = self.eat_keyword("var");
                let mut names = vec![self.expect_id()?];
                while self.peek().kind == TokenKind::Comma {
                    self.advance();
                    names.push(self.expect_id()?);
                }
                self.expect_operator(&[":"])?;
                let ty = self.type_expr()?;
                for n in names {
                    let loc = n.location.merge(&ty.meta.loc);
                    let mut param = VarDecl::new(n.text, ty.clone(), loc);
                    param.readonly = !by_ref;
                    parameters.push(param);
                }
                if self.peek().kind == TokenKind::Semi {
                    self.advance();
                }
            }
            self.expect_kind(TokenKind::CloseParen, "\")\"")?;
        }

        let return_type = if is_function {
            self.expect_operator(&[":"])?;
            Some(self.type_expr()?)
        } else {
            None
        };
        self.eat_semis();

        let decls = self.inner_decls()?;
        let body = if self.eat_keyword("begin") {
            self.stmts()?
        } else {
            Vec::new()
        };
        let end = self.end_of_block(&["endfunction", "endprocedure"])?;
        self.eat_semis();

        Ok(Function {
            meta: NodeMeta::new(start.location.merge(&end.location)),
            name: name.text,
            parameters,
            return_type,
            decls,
            body,
        })
    }

    /// `end` or one of its long spellings.
    fn end_of_block(&mut self, extra: &[&str]) -> Result<Token> {
        if self.is_keyword("end") {
            return Ok(self.advance());
        }
        for kw in extra {
            if self.is_keyword(kw) {
                return Ok(self.advance());
            }
        }
        self.error(format!("expected \"end\", found \"{}\"", self.peek().text))
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    fn rule(&mut self) -> Result<Rule> {
        if self.is_keyword("startstate") {
            self.startstate().map(Rule::Start)
        } else if self.is_keyword("rule") {
            self.simple_rule().map(Rule::Simple)
        } else if self.is_keyword("ruleset") {
            self.ruleset().map(Rule::Ruleset)
        } else if self.is_keyword("alias") {
            self.alias_rule().map(Rule::Alias)
        } else if self.is_any_keyword(&["invariant", "assume", "cover", "liveness"]) {
            self.property_rule().map(Rule::Property)
        } else {
            self.error(format!("expected a rule, found \"{}\"", self.peek().text))
        }
    }

    fn startstate(&mut self) -> Result<StartState> {
        let start = self.expect_keyword("startstate")?;
        let name = self.optional_name();
        let decls = self.inner_decls()?;
        let body = if self.eat_keyword("begin") {
            self.stmts()?
        } else if !self.is_any_keyword(&["end", "endstartstate"]) {
            self.stmts()?
        } else {
            Vec::new()
        };
        let end = self.end_of_block(&["endstartstate"])?;
        Ok(StartState {
            meta: NodeMeta::new(start.location.merge(&end.location)),
            name,
            quantifiers: Vec::new(),
            aliases: Vec::new(),
            decls,
            body,
        })
    }

    fn simple_rule(&mut self) -> Result<SimpleRule> {
        let start = self.expect_keyword("rule")?;
        let name = self.optional_name();

        // a guard is an expression followed by the rule arrow
        let mut guard = None;
        if !self.is_any_keyword(&["const", "type", "var", "begin", "end", "endrule"]) {
            let saved = self.pos;
            match self.expr() {
                Ok(e) if self.eat_operator(&["==>", "⇒"]) => guard = Some(e),
                _ => self.pos = saved,
            }
        }

        let decls = self.inner_decls()?;
        let body = if self.eat_keyword("begin") {
            self.stmts()?
        } else if !self.is_any_keyword(&["end", "endrule"]) {
            self.stmts()?
        } else {
            Vec::new()
        };
        let end = self.end_of_block(&["endrule"])?;
        Ok(SimpleRule {
            meta: NodeMeta::new(start.location.merge(&end.location)),
            name,
            quantifiers: Vec::new(),
            aliases: Vec::new(),
            guard,
            decls,
            body,
        })
    }

    fn ruleset(&mut self) -> Result<Ruleset> {
        let start = self.expect_keyword("ruleset")?;
        let mut quantifiers = vec![self.quantifier()?];
        while self.peek().kind == TokenKind::Semi && !self.is_keyword("do") {
            self.advance();
            if self.is_keyword("do") {
                break;
            }
            quantifiers.push(self.quantifier()?);
        }
        self.expect_keyword("do")?;
        let rules = self.rule_list()?;
        let end = self.end_of_block(&["endruleset"])?;
        Ok(Ruleset {
            meta: NodeMeta::new(start.location.merge(&end.location)),
            quantifiers,
            rules,
        })
    }

    fn alias_rule(&mut self) -> Result<AliasRule> {
        let start = self.expect_keyword("alias")?;
        let aliases = self.alias_decls()?;
        self.expect_keyword("do")?;
        let rules = self.rule_list()?;
        let end = self.end_of_block(&["endalias"])?;
        Ok(AliasRule {
            meta: NodeMeta::new(start.location.merge(&end.location)),
            aliases,
            rules,
        })
    }

    fn rule_list(&mut self) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        loop {
            self.eat_semis();
            if self.is_any_keyword(END_KEYWORDS) || self.at_eof() {
                break;
            }
            rules.push(self.rule()?);
        }
        Ok(rules)
    }

    fn property_rule(&mut self) -> Result<PropertyRule> {
        let keyword = self.advance();
        let category = match keyword.text.as_str() {
            "invariant" => PropertyCategory::Assertion,
            "assume" => PropertyCategory::Assumption,
            "cover" => PropertyCategory::Cover,
            "liveness" => PropertyCategory::Liveness,
            other => return self.error(format!("unexpected property keyword \"{}\"", other)),
        };
        let name = self.optional_name();
        let expr = self.expr()?;
        let loc = keyword.location.merge(expr.loc());
        let property = Property::new(category, expr, loc.clone());
        Ok(PropertyRule {
            meta: NodeMeta::new(loc),
            name,
            quantifiers: Vec::new(),
            aliases: Vec::new(),
            property,
        })
    }

    fn quantifier(&mut self) -> Result<Quantifier> {
        let name = self.expect_id()?;
        if self.eat_operator(&[":=", "≔"]) {
            let from = self.expr()?;
            self.expect_keyword("to")?;
            let to = self.expr()?;
            let step = if self.eat_keyword("by") {
                Some(Box::new(self.expr()?))
            } else {
                None
            };
            let loc = name.location.merge(to.loc());
            Ok(Quantifier::new(
                name.text,
                QuantifierKind::Bounded {
                    from: Box::new(from),
                    to: Box::new(to),
                    step,
                },
                loc,
            ))
        } else {
            self.expect_operator(&[":"])?;
            let ty = self.type_expr()?;
            let loc = name.location.merge(&ty.meta.loc);
            Ok(Quantifier::new(name.text, QuantifierKind::Typed(ty), loc))
        }
    }

    fn alias_decls(&mut self) -> Result<Vec<AliasDecl>> {
        let mut aliases = Vec::new();
        loop {
            let name = self.expect_id()?;
            self.expect_operator(&[":"])?;
            let value = self.expr()?;
            let loc = name.location.merge(value.loc());
            aliases.push(AliasDecl::new(name.text, value, loc));
            if self.peek().kind == TokenKind::Semi && !self.is_keyword("do") {
                self.advance();
                if self.is_keyword("do") {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(aliases)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_expr(&mut self) -> Result<TypeExpr> {
        let loc = self.loc();

        if self.eat_keyword("enum") {
            self.expect_kind(TokenKind::OpenBrace, "\"{\"")?;
            let mut members = Vec::new();
            loop {
                let m = self.expect_id()?;
                members.push((m.text, m.location));
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            // '}' is lexed as Unknown; accept it here
            let close = self.advance();
            if close.text != "}" {
                return Err(LocatedError::new(
                    format!("expected \"}}\", found \"{}\"", close.text),
                    close.location,
                ));
            }
            let loc = loc.merge(&close.location);
            return Ok(TypeExpr::new(TypeExprKind::Enum { members }, loc));
        }

        if self.eat_keyword("scalarset") {
            self.expect_kind(TokenKind::OpenParen, "\"(\"")?;
            let bound = self.expr()?;
            let close = self.expect_kind(TokenKind::CloseParen, "\")\"")?;
            return Ok(TypeExpr::new(
                TypeExprKind::Scalarset {
                    bound: Box::new(bound),
                },
                loc.merge(&close.location),
            ));
        }

        if self.eat_keyword("array") {
            self.expect_kind(TokenKind::OpenParen, "\"[\"")?;
            let index = self.type_expr()?;
            self.expect_kind(TokenKind::CloseParen, "\"]\"")?;
            self.expect_keyword("of")?;
            let element = self.type_expr()?;
            let loc = loc.merge(&element.meta.loc);
            return Ok(TypeExpr::new(
                TypeExprKind::Array {
                    index: Box::new(index),
                    element: Box::new(element),
                },
                loc,
            ));
        }

        if self.eat_keyword("record") {
            let mut fields = Vec::new();
            while !self.is_keyword("end") && !self.is_keyword("endrecord") {
                let mut names = vec![self.expect_id()?];
                while self.peek().kind == TokenKind::Comma {
                    self.advance();
                    names.push(self.expect_id()?);
                }
                self.expect_operator(&[":"])?;
                let ty = self.type_expr()?;
                for n in names {
                    let floc = n.location.merge(&ty.meta.loc);
                    fields.push(VarDecl::new(n.text, ty.clone(), floc));
                }
                self.eat_semis();
            }
            let end = self.end_of_block(&["endrecord"])?;
            return Ok(TypeExpr::new(
                TypeExprKind::Record { fields },
                loc.merge(&end.location),
            ));
        }

        // either a bare type name or the start of a range expression
        let saved = self.pos;
        if self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            let name = self.advance();
            if !self.is_operator("..") {
                return Ok(TypeExpr::new(
                    TypeExprKind::Named(name.text.clone()),
                    name.location,
                ));
            }
            self.pos = saved;
        }

        let min = self.expr()?;
        self.expect_operator(&[".."])?;
        let max = self.expr()?;
        let loc = min.loc().merge(max.loc());
        Ok(TypeExpr::new(
            TypeExprKind::Range {
                min: Box::new(min),
                max: Box::new(max),
            },
            loc,
        ))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn stmts(&mut self) -> Result<Vec<Stmt>> {
        let mut out = Vec::new();
        loop {
            self.eat_semis();
            if self.at_eof() || self.is_any_keyword(END_KEYWORDS) {
                break;
            }
            out.push(self.stmt()?);
            if self.peek().kind == TokenKind::Semi {
                continue;
            }
            break;
        }
        self.eat_semis();
        Ok(out)
    }

    fn stmt(&mut self) -> Result<Stmt> {
        let loc = self.loc();

        if self.eat_keyword("if") {
            let mut clauses = Vec::new();
            let condition = self.expr()?;
            self.expect_keyword("then")?;
            let body = self.stmts()?;
            clauses.push(IfClause {
                meta: NodeMeta::new(loc.clone()),
                condition: Some(condition),
                body,
            });
            while self.is_keyword("elsif") {
                let arm_loc = self.loc();
                self.advance();
                let condition = self.expr()?;
                self.expect_keyword("then")?;
                let body = self.stmts()?;
                clauses.push(IfClause {
                    meta: NodeMeta::new(arm_loc),
                    condition: Some(condition),
                    body,
                });
            }
            if self.is_keyword("else") {
                let arm_loc = self.loc();
                self.advance();
                let body = self.stmts()?;
                clauses.push(IfClause {
                    meta: NodeMeta::new(arm_loc),
                    condition: None,
                    body,
                });
            }
            let end = self.end_of_block(&["endif"])?;
            return Ok(Stmt::new(
                StmtKind::If { clauses },
                loc.merge(&end.location),
            ));
        }

        if self.eat_keyword("switch") {
            let expr = self.expr()?;
            let mut cases = Vec::new();
            while self.is_keyword("case") {
                let case_loc = self.loc();
                self.advance();
                let mut matches = vec![self.expr()?];
                while self.peek().kind == TokenKind::Comma {
                    self.advance();
                    matches.push(self.expr()?);
                }
                self.expect_operator(&[":"])?;
                let body = self.stmts()?;
                cases.push(SwitchCase {
                    meta: NodeMeta::new(case_loc),
                    matches,
                    body,
                });
            }
            if self.is_keyword("else") {
                let case_loc = self.loc();
                self.advance();
                let body = self.stmts()?;
                cases.push(SwitchCase {
                    meta: NodeMeta::new(case_loc),
                    matches: Vec::new(),
                    body,
                });
            }
            let end = self.end_of_block(&["endswitch"])?;
            return Ok(Stmt::new(
                StmtKind::Switch { expr, cases },
                loc.merge(&end.location),
            ));
        }

        if self.eat_keyword("for") {
            let quantifier = self.quantifier()?;
            self.expect_keyword("do")?;
            let body = self.stmts()?;
            let end = self.end_of_block(&["endfor"])?;
            return Ok(Stmt::new(
                StmtKind::For { quantifier, body },
                loc.merge(&end.location),
            ));
        }

        if self.eat_keyword("while") {
            let condition = self.expr()?;
            self.expect_keyword("do")?;
            let body = self.stmts()?;
            let end = self.end_of_block(&["endwhile"])?;
            return Ok(Stmt::new(
                StmtKind::While { condition, body },
                loc.merge(&end.location),
            ));
        }

        if self.eat_keyword("alias") {
            let aliases = self.alias_decls()?;
            self.expect_keyword("do")?;
            let body = self.stmts()?;
            let end = self.end_of_block(&["endalias"])?;
            return Ok(Stmt::new(
                StmtKind::Alias { aliases, body },
                loc.merge(&end.location),
            ));
        }

        if self.eat_keyword("clear") {
            let target = self.designator()?;
            let loc = loc.merge(target.loc());
            return Ok(Stmt::new(StmtKind::Clear(target), loc));
        }

        if self.eat_keyword("undefine") {
            let target = self.designator()?;
            let loc = loc.merge(target.loc());
            return Ok(Stmt::new(StmtKind::Undefine(target), loc));
        }

        if self.eat_keyword("error") {
            let msg = self.expect_kind(TokenKind::Str, "a string literal")?;
            let loc = loc.merge(&msg.location);
            return Ok(Stmt::new(StmtKind::Error(Self::string_value(&msg)), loc));
        }

        if self.is_keyword("assert") || self.is_keyword("assume") {
            let keyword = self.advance();
            let category = if keyword.text == "assert" {
                PropertyCategory::Assertion
            } else {
                PropertyCategory::Assumption
            };
            let expr = self.expr()?;
            let message = self.optional_name();
            let loc = loc.merge(expr.loc());
            let property = Property::new(category, expr, loc.clone());
            return Ok(Stmt::new(StmtKind::Property { property, message }, loc));
        }

        if self.eat_keyword("put") {
            if self.peek().kind == TokenKind::Str {
                let s = self.advance();
                let loc = loc.merge(&s.location);
                return Ok(Stmt::new(
                    StmtKind::Put(PutArg::Literal(Self::string_value(&s))),
                    loc,
                ));
            }
            let e = self.expr()?;
            let loc = loc.merge(e.loc());
            return Ok(Stmt::new(StmtKind::Put(PutArg::Value(e)), loc));
        }

        if self.eat_keyword("return") {
            if self.peek().kind == TokenKind::Semi || self.is_any_keyword(END_KEYWORDS) {
                return Ok(Stmt::new(StmtKind::Return(None), loc));
            }
            let e = self.expr()?;
            let loc = loc.merge(e.loc());
            return Ok(Stmt::new(StmtKind::Return(Some(e)), loc));
        }

        // assignment or procedure call
        if self.peek().kind == TokenKind::Id
            && self.peek2().kind == TokenKind::OpenParen
            && self.peek2().text == "("
        {
            let name = self.advance();
            self.advance(); // (
            let mut arguments = Vec::new();
            while self.peek().kind != TokenKind::CloseParen {
                arguments.push(self.expr()?);
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                }
            }
            let close = self.expect_kind(TokenKind::CloseParen, "\")\"")?;
            return Ok(Stmt::new(
                StmtKind::ProcedureCall {
                    name: name.text,
                    arguments,
                },
                loc.merge(&close.location),
            ));
        }

        let lhs = self.designator()?;
        self.expect_operator(&[":=", "≔"])?;
        let rhs = self.expr()?;
        let loc = lhs.loc().merge(rhs.loc());
        Ok(Stmt::new(StmtKind::Assignment { lhs, rhs }, loc))
    }

    /// An lvalue chain: identifier followed by field and index selectors.
    fn designator(&mut self) -> Result<Expr> {
        let name = self.expect_id()?;
        let mut expr = Expr::new(ExprKind::Id(name.text), name.location);
        loop {
            if self.peek().kind == TokenKind::Dot {
                self.advance();
                let field = self.expect_id()?;
                let loc = expr.loc().merge(&field.location);
                expr = Expr::new(
                    ExprKind::Field {
                        record: Box::new(expr),
                        field: field.text,
                    },
                    loc,
                );
            } else if self.peek().kind == TokenKind::OpenParen && self.peek().text == "[" {
                self.advance();
                let index = self.expr()?;
                let close = self.expect_kind(TokenKind::CloseParen, "\"]\"")?;
                let loc = expr.loc().merge(&close.location);
                expr = Expr::new(
                    ExprKind::Element {
                        array: Box::new(expr),
                        index: Box::new(index),
                    },
                    loc,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.implication()?;
        if self.eat_operator(&["?"]) {
            let lhs = self.ternary()?;
            self.expect_operator(&[":"])?;
            let rhs = self.ternary()?;
            let loc = cond.loc().merge(rhs.loc());
            return Ok(Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(cond),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        Ok(cond)
    }

    fn implication(&mut self) -> Result<Expr> {
        let lhs = self.or()?;
        if self.eat_operator(&["->", "→"]) {
            let rhs = self.implication()?;
            let loc = lhs.loc().merge(rhs.loc());
            return Ok(Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Implication,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.eat_operator(&["|", "||", "∨"]) {
            let rhs = self.and()?;
            let loc = lhs.loc().merge(rhs.loc());
            lhs = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.eat_operator(&["&", "&&", "∧"]) {
            let rhs = self.not()?;
            let loc = lhs.loc().merge(rhs.loc());
            lhs = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.is_any_operator(&["!", "¬"]) {
            let op = self.advance();
            let rhs = self.not()?;
            let loc = op.location.merge(rhs.loc());
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.add_sub()?;
        let op = if self.is_operator("<=") || self.is_operator("≤") {
            Some(BinaryOp::Leq)
        } else if self.is_operator(">=") || self.is_operator("≥") {
            Some(BinaryOp::Geq)
        } else if self.is_operator("<") {
            Some(BinaryOp::Lt)
        } else if self.is_operator(">") {
            Some(BinaryOp::Gt)
        } else if self.is_operator("=") || self.is_operator("==") {
            Some(BinaryOp::Eq)
        } else if self.is_operator("!=") || self.is_operator("≠") {
            Some(BinaryOp::Neq)
        } else {
            None
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.add_sub()?;
            let loc = lhs.loc().merge(rhs.loc());
            return Ok(Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        Ok(lhs)
    }

    fn add_sub(&mut self) -> Result<Expr> {
        let mut lhs = self.mul_div()?;
        loop {
            let op = if self.is_operator("+") {
                BinaryOp::Add
            } else if self.is_operator("-") || self.is_operator("−") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.mul_div()?;
            let loc = lhs.loc().merge(rhs.loc());
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(lhs)
    }

    fn mul_div(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.is_operator("*") || self.is_operator("×") {
                BinaryOp::Mul
            } else if self.is_operator("/") || self.is_operator("÷") || self.is_operator("∕") {
                BinaryOp::Div
            } else if self.is_operator("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            self.advance();
            let rhs = self.unary()?;
            let loc = lhs.loc().merge(rhs.loc());
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.is_operator("-") || self.is_operator("−") {
            let op = self.advance();
            let rhs = self.unary()?;
            let loc = op.location.merge(rhs.loc());
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Negative,
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.peek().kind == TokenKind::Dot {
                self.advance();
                let field = self.expect_id()?;
                let loc = expr.loc().merge(&field.location);
                expr = Expr::new(
                    ExprKind::Field {
                        record: Box::new(expr),
                        field: field.text,
                    },
                    loc,
                );
            } else if self.peek().kind == TokenKind::OpenParen && self.peek().text == "[" {
                self.advance();
                let index = self.expr()?;
                let close = self.expect_kind(TokenKind::CloseParen, "\"]\"")?;
                let loc = expr.loc().merge(&close.location);
                expr = Expr::new(
                    ExprKind::Element {
                        array: Box::new(expr),
                        index: Box::new(index),
                    },
                    loc,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let loc = self.loc();

        if self.peek().kind == TokenKind::Number {
            let token = self.advance();
            let value: BigInt = token
                .text
                .parse()
                .map_err(|_| LocatedError::new("malformed numeric literal", token.location.clone()))?;
            return Ok(Expr::new(ExprKind::Number(value), token.location));
        }

        if self.peek().kind == TokenKind::OpenParen && self.peek().text == "(" {
            self.advance();
            let inner = self.expr()?;
            self.expect_kind(TokenKind::CloseParen, "\")\"")?;
            return Ok(inner);
        }

        if self.is_keyword("forall") || self.is_keyword("exists") {
            let keyword = self.advance();
            let quantifier = self.quantifier()?;
            self.expect_keyword("do")?;
            let body = self.expr()?;
            let end = self.end_of_block(&["endforall", "endexists"])?;
            let loc = keyword.location.merge(&end.location);
            let kind = if keyword.text == "forall" {
                ExprKind::Forall {
                    quantifier: Box::new(quantifier),
                    expr: Box::new(body),
                }
            } else {
                ExprKind::Exists {
                    quantifier: Box::new(quantifier),
                    expr: Box::new(body),
                }
            };
            return Ok(Expr::new(kind, loc));
        }

        if self.eat_keyword("isundefined") {
            self.expect_kind(TokenKind::OpenParen, "\"(\"")?;
            let inner = self.expr()?;
            let close = self.expect_kind(TokenKind::CloseParen, "\")\"")?;
            return Ok(Expr::new(
                ExprKind::IsUndefined(Box::new(inner)),
                loc.merge(&close.location),
            ));
        }

        if self.peek().kind == TokenKind::Id && !self.is_any_keyword(SECTION_KEYWORDS) {
            let name = self.advance();
            if self.peek().kind == TokenKind::OpenParen && self.peek().text == "(" {
                self.advance();
                let mut arguments = Vec::new();
                while self.peek().kind != TokenKind::CloseParen {
                    arguments.push(self.expr()?);
                    if self.peek().kind == TokenKind::Comma {
                        self.advance();
                    }
                }
                let close = self.expect_kind(TokenKind::CloseParen, "\")\"")?;
                return Ok(Expr::new(
                    ExprKind::Call {
                        function: name.text,
                        arguments,
                    },
                    name.location.merge(&close.location),
                ));
            }
            return Ok(Expr::new(ExprKind::Id(name.text), name.location));
        }

        self.error(format!(
            "expected an expression, found \"{}\"",
            self.peek().text
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Model {
        parse(src, None).expect("parse failed")
    }

    #[test]
    fn parses_const_type_var_sections() {
        let m = parse_ok(
            "const N: 3;\n\
             type t: 0..N; color: enum { red, green };\n\
             var x: t; a: array [t] of boolean;",
        );
        assert_eq!(m.decls.len(), 5);
        assert_eq!(m.decls[0].name(), "N");
        assert!(matches!(m.decls[1], Decl::Type(_)));
        assert_eq!(m.state_vars().count(), 2);
    }

    #[test]
    fn parses_startstate_and_rule() {
        let m = parse_ok(
            "var v: boolean;\n\
             startstate begin v := false; end;\n\
             rule \"flip\" !v ==> begin v := true; end;",
        );
        assert_eq!(m.rules.len(), 2);
        match &m.rules[1] {
            Rule::Simple(r) => {
                assert_eq!(r.name.as_deref(), Some("flip"));
                assert!(r.guard.is_some());
                assert_eq!(r.body.len(), 1);
            }
            other => panic!("expected simple rule, got {:?}", other),
        }
    }

    #[test]
    fn parses_ruleset_with_quantifier() {
        let m = parse_ok(
            "type pid: scalarset(3);\n\
             var a: array [pid] of boolean;\n\
             ruleset p: pid do\n\
               rule \"set\" begin a[p] := true; end;\n\
             end;",
        );
        match &m.rules[0] {
            Rule::Ruleset(rs) => {
                assert_eq!(rs.quantifiers.len(), 1);
                assert_eq!(rs.quantifiers[0].name, "p");
                assert_eq!(rs.rules.len(), 1);
            }
            other => panic!("expected ruleset, got {:?}", other),
        }
    }

    #[test]
    fn parses_properties() {
        let m = parse_ok(
            "var x: 0..2;\n\
             invariant \"bounded\" x <= 1;\n\
             cover \"reaches one\" x = 1;\n\
             liveness \"eventually one\" x = 1;\n\
             assume \"small\" x < 2;",
        );
        let categories: Vec<_> = m
            .rules
            .iter()
            .map(|r| match r {
                Rule::Property(p) => p.property.category,
                other => panic!("expected property rule, got {:?}", other),
            })
            .collect();
        assert_eq!(
            categories,
            vec![
                PropertyCategory::Assertion,
                PropertyCategory::Cover,
                PropertyCategory::Liveness,
                PropertyCategory::Assumption,
            ]
        );
    }

    #[test]
    fn parses_expression_precedence() {
        let m = parse_ok("invariant x + 1 * 2 <= 3 & !y;");
        let prop = match &m.rules[0] {
            Rule::Property(p) => &p.property.expr,
            other => panic!("unexpected {:?}", other),
        };
        // top node is the '&'
        match &prop.kind {
            ExprKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::And),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn parses_implication_right_associative() {
        let m = parse_ok("invariant a -> b -> c;");
        let prop = match &m.rules[0] {
            Rule::Property(p) => &p.property.expr,
            other => panic!("unexpected {:?}", other),
        };
        match &prop.kind {
            ExprKind::Binary { op, rhs, .. } => {
                assert_eq!(*op, BinaryOp::Implication);
                assert!(matches!(
                    rhs.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Implication,
                        ..
                    }
                ));
            }
            other => panic!("expected implication, got {:?}", other),
        }
    }

    #[test]
    fn parses_designator_chains() {
        let m = parse_ok(
            "var net: array [0..2] of record src: 0..3; dst: 0..3; end;\n\
             startstate begin net[0].src := 1; end;",
        );
        match &m.rules[0] {
            Rule::Start(s) => match &s.body[0].kind {
                StmtKind::Assignment { lhs, .. } => {
                    assert!(matches!(lhs.kind, ExprKind::Field { .. }));
                }
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected startstate, got {:?}", other),
        }
    }

    #[test]
    fn parses_control_flow_statements() {
        let m = parse_ok(
            "var x: 0..10;\n\
             rule begin\n\
               if x = 0 then x := 1; elsif x = 1 then x := 2; else x := 0; endif;\n\
               for i: 0..2 do x := i; endfor;\n\
               while x > 0 do x := x - 1; endwhile;\n\
               switch x case 0, 1: x := 2; else x := 0; endswitch;\n\
             end;",
        );
        match &m.rules[0] {
            Rule::Simple(r) => assert_eq!(r.body.len(), 4),
            other => panic!("expected simple rule, got {:?}", other),
        }
    }

    #[test]
    fn parses_functions_and_calls() {
        let m = parse_ok(
            "var x: 0..10;\n\
             function inc(n: 0..10): 0..10; begin return n + 1; end;\n\
             procedure reset(var target: 0..10); begin target := 0; end;\n\
             rule begin x := inc(x); reset(x); end;",
        );
        assert_eq!(m.functions.len(), 2);
        assert!(m.functions[0].return_type.is_some());
        assert!(m.functions[1].return_type.is_none());
        assert!(!m.functions[1].parameters[0].readonly);
    }

    #[test]
    fn parses_forall_exists_and_isundefined() {
        let m = parse_ok(
            "var a: array [0..2] of boolean;\n\
             invariant forall i: 0..2 do a[i] end;\n\
             invariant exists i: 0..2 do a[i] end;\n\
             invariant !isundefined(a[0]);",
        );
        assert_eq!(m.rules.len(), 3);
    }

    #[test]
    fn parses_alias_statement_and_rule() {
        let m = parse_ok(
            "var x: 0..5;\n\
             alias y: x do\n\
               rule begin y := 1; end;\n\
             end;\n\
             rule begin alias z: x do z := 2; end; end;",
        );
        assert!(matches!(m.rules[0], Rule::Alias(_)));
    }

    #[test]
    fn parse_error_carries_location() {
        let err = parse("var x: ;", None).unwrap_err();
        assert!(err.location.begin.line >= 1);
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn nodes_get_unique_ids() {
        let m = parse_ok("var x: boolean; rule begin x := true; end;");
        use crate::traverse::{preorder, NodeRef};
        let mut seen = std::collections::HashSet::new();
        for node in preorder(NodeRef::Model(&m)) {
            let id = match node {
                NodeRef::Model(n) => n.meta.id,
                NodeRef::Decl(n) => n.meta().id,
                NodeRef::Function(n) => n.meta.id,
                NodeRef::TypeExpr(n) => n.meta.id,
                NodeRef::Expr(n) => n.meta.id,
                NodeRef::Stmt(n) => n.meta.id,
                NodeRef::Rule(n) => n.meta().id,
                NodeRef::Quantifier(n) => n.meta.id,
                NodeRef::Property(n) => n.meta.id,
            };
            assert_ne!(id, NodeId::UNASSIGNED);
            assert!(seen.insert(id), "duplicate node id {:?}", id);
        }
    }
}
