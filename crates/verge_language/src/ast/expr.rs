//! Expressions.
//!
//! Binary and unary operators collapse the per-operator node classes of a
//! traditional class hierarchy into [`BinaryOp`]/[`UnaryOp`] tags; the
//! lvalue chain (`Id`, `Field`, `Element`) is what assignment targets and
//! `var` arguments are made of. Numeric literals are arbitrary-precision;
//! they are range-checked against the runtime value width during code
//! generation, not here.
//!
//! Semantic queries (is-constant, static type, constant folding) need the
//! resolver's bindings and therefore live on
//! [`crate::analysis::Bindings`]; this module only defines the shape.

use super::types::TypeExpr;
use super::NodeMeta;
use num_bigint::BigInt;
use std::fmt;
use verge_base::Location;

/// Binary operators, in increasing precedence groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `->` / `→`
    Implication,
    /// `|` / `∨`
    Or,
    /// `&` / `∧`
    And,
    /// `<`
    Lt,
    /// `<=` / `≤`
    Leq,
    /// `>`
    Gt,
    /// `>=` / `≥`
    Geq,
    /// `=` / `==`
    Eq,
    /// `!=` / `≠`
    Neq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Neq)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Implication)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Implication => "->",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        f.write_str(text)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!` / `¬`
    Not,
    /// unary `-`
    Negative,
}

/// A quantified variable binding, used by `forall`/`exists`, `for` loops
/// and rulesets.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantifier {
    pub meta: NodeMeta,
    pub name: String,
    pub kind: QuantifierKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantifierKind {
    /// `x : T` — iterate over the values of a simple type.
    Typed(TypeExpr),
    /// `x := from to to [by step]` — iterate over an explicit range.
    Bounded {
        from: Box<Expr>,
        to: Box<Expr>,
        step: Option<Box<Expr>>,
    },
}

impl Quantifier {
    pub fn new(name: impl Into<String>, kind: QuantifierKind, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            name: name.into(),
            kind,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub meta: NodeMeta,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `cond ? lhs : rhs`
    Ternary {
        cond: Box<Expr>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, rhs: Box<Expr> },
    Forall {
        quantifier: Box<Quantifier>,
        expr: Box<Expr>,
    },
    Exists {
        quantifier: Box<Quantifier>,
        expr: Box<Expr>,
    },
    /// A name reference, bound to a declaration during resolution.
    Id(String),
    /// `record.field`
    Field { record: Box<Expr>, field: String },
    /// `array[index]`
    Element { array: Box<Expr>, index: Box<Expr> },
    /// `f(a, b, ...)`
    Call {
        function: String,
        arguments: Vec<Expr>,
    },
    /// A numeric literal.
    Number(BigInt),
    /// `isundefined(designator)`
    IsUndefined(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            kind,
        }
    }

    pub fn loc(&self) -> &Location {
        &self.meta.loc
    }

    /// Whether this expression has lvalue shape (a designator chain).
    ///
    /// Whether the chain is *writable* additionally depends on what its root
    /// resolves to (a constant or a readonly parameter is not writable).
    pub fn is_lvalue_shape(&self) -> bool {
        match &self.kind {
            ExprKind::Id(_) => true,
            ExprKind::Field { record, .. } => record.is_lvalue_shape(),
            ExprKind::Element { array, .. } => array.is_lvalue_shape(),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    /// Renders the expression in source-like syntax, for error messages and
    /// solver logging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ternary { cond, lhs, rhs } => write!(f, "{} ? {} : {}", cond, lhs, rhs),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            ExprKind::Unary { op, rhs } => match op {
                UnaryOp::Not => write!(f, "!{}", rhs),
                UnaryOp::Negative => write!(f, "-{}", rhs),
            },
            ExprKind::Forall { quantifier, expr } => {
                write!(f, "forall {} do {} end", quantifier.name, expr)
            }
            ExprKind::Exists { quantifier, expr } => {
                write!(f, "exists {} do {} end", quantifier.name, expr)
            }
            ExprKind::Id(name) => f.write_str(name),
            ExprKind::Field { record, field } => write!(f, "{}.{}", record, field),
            ExprKind::Element { array, index } => write!(f, "{}[{}]", array, index),
            ExprKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            ExprKind::Number(n) => write!(f, "{}", n),
            ExprKind::IsUndefined(inner) => write!(f, "isundefined({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Expr {
        Expr::new(ExprKind::Id(name.into()), Location::default())
    }

    #[test]
    fn lvalue_shape_follows_designator_chains() {
        let field = Expr::new(
            ExprKind::Field {
                record: Box::new(id("r")),
                field: "f".into(),
            },
            Location::default(),
        );
        assert!(field.is_lvalue_shape());

        let call = Expr::new(
            ExprKind::Call {
                function: "f".into(),
                arguments: vec![],
            },
            Location::default(),
        );
        assert!(!call.is_lvalue_shape());
    }

    #[test]
    fn display_renders_source_like_syntax() {
        let e = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Leq,
                lhs: Box::new(id("x")),
                rhs: Box::new(Expr::new(
                    ExprKind::Number(BigInt::from(1)),
                    Location::default(),
                )),
            },
            Location::default(),
        );
        assert_eq!(format!("{}", e), "(x <= 1)");
    }
}
