//! Type expressions.
//!
//! Simple types (ranges, enums, scalarsets) encode to bit-packed values in
//! the state with `0` reserved as the undefined marker; composite types
//! (arrays, records) tile their components. Named references
//! ([`TypeExprKind::Named`]) are bound to their [`TypeDecl`] by symbol
//! resolution; structural queries that must see through them (width, count,
//! simplicity) live on [`crate::analysis::Bindings`], which owns that
//! binding information.
//!
//! [`TypeDecl`]: crate::ast::decl::TypeDecl

use super::decl::VarDecl;
use super::expr::Expr;
use super::NodeMeta;
use verge_base::Location;

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub meta: NodeMeta,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `lo .. hi`, both bounds inclusive and constant-foldable.
    Range { min: Box<Expr>, max: Box<Expr> },
    /// `enum { a, b, c }`; members are ordered.
    Enum { members: Vec<(String, Location)> },
    /// `scalarset(bound)`: an index type whose values are interchangeable.
    Scalarset { bound: Box<Expr> },
    /// `array [index] of element`.
    Array {
        index: Box<TypeExpr>,
        element: Box<TypeExpr>,
    },
    /// `record f1: t1; f2: t2; ... end`; fields are ordered.
    Record { fields: Vec<VarDecl> },
    /// A reference to a named type declaration.
    Named(String),
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            kind,
        }
    }

    /// Whether this type is structurally simple without needing resolution.
    ///
    /// `Named` types may refer to simple types; use
    /// [`Bindings::is_simple`](crate::analysis::Bindings::is_simple) when a
    /// definitive answer is needed.
    pub fn is_structurally_simple(&self) -> bool {
        matches!(
            self.kind,
            TypeExprKind::Range { .. } | TypeExprKind::Enum { .. } | TypeExprKind::Scalarset { .. }
        )
    }
}
