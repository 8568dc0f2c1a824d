//! Statements.

use super::decl::AliasDecl;
use super::expr::{Expr, Quantifier};
use super::rule::Property;
use super::NodeMeta;
use verge_base::Location;

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub meta: NodeMeta,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `lhs := rhs`
    Assignment { lhs: Expr, rhs: Expr },
    /// `clear designator` — reset every simple component to its lowest
    /// value.
    Clear(Expr),
    /// `undefine designator` — reset every simple component to undefined.
    Undefine(Expr),
    /// `if ... then ... elsif ... else ... endif`; an `else` arm is a
    /// clause with no condition.
    If { clauses: Vec<IfClause> },
    /// `switch expr case ... else ... endswitch`; the `else` arm is a case
    /// with no match expressions.
    Switch { expr: Expr, cases: Vec<SwitchCase> },
    /// `for quantifier do ... endfor`
    For {
        quantifier: Quantifier,
        body: Vec<Stmt>,
    },
    /// `while cond do ... endwhile`
    While { condition: Expr, body: Vec<Stmt> },
    /// `return [expr]`
    Return(Option<Expr>),
    /// A call in statement position.
    ProcedureCall {
        name: String,
        arguments: Vec<Expr>,
    },
    /// An embedded `assert`/`assume` statement.
    Property {
        property: Property,
        message: Option<String>,
    },
    /// `error "message"` — unconditional failure.
    Error(String),
    /// `alias a : e; ... do ... end`
    Alias {
        aliases: Vec<AliasDecl>,
        body: Vec<Stmt>,
    },
    /// `put expr` or `put "text"`
    Put(PutArg),
}

/// Argument of a `put` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum PutArg {
    /// A string literal, printed verbatim.
    Literal(String),
    /// An expression, printed as its value.
    Value(Expr),
}

/// One arm of an `if` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub meta: NodeMeta,
    /// `None` for the final `else` arm.
    pub condition: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// One arm of a `switch` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub meta: NodeMeta,
    /// Empty for the `else` arm.
    pub matches: Vec<Expr>,
    pub body: Vec<Stmt>,
}
