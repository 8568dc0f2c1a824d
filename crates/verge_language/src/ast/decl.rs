//! Declarations: constants, types, variables, aliases, and functions.

use super::expr::Expr;
use super::stmt::Stmt;
use super::types::TypeExpr;
use super::NodeMeta;
use verge_base::Location;

/// A declaration binding a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Const(ConstDecl),
    Type(TypeDecl),
    Var(VarDecl),
    Alias(AliasDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Const(c) => &c.name,
            Decl::Type(t) => &t.name,
            Decl::Var(v) => &v.name,
            Decl::Alias(a) => &a.name,
        }
    }

    pub fn meta(&self) -> &NodeMeta {
        match self {
            Decl::Const(c) => &c.meta,
            Decl::Type(t) => &t.meta,
            Decl::Var(v) => &v.meta,
            Decl::Alias(a) => &a.meta,
        }
    }

    pub fn loc(&self) -> &Location {
        &self.meta().loc
    }
}

/// `const name : expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub value: Expr,
}

/// `type name : typeexpr`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub value: TypeExpr,
}

/// A variable: a model-level state variable, a rule- or function-local, a
/// record field, or a function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub ty: TypeExpr,
    /// Bit offset into the state, assigned by the layout pass. Only
    /// model-level state variables receive offsets; everything else gets a
    /// separately allocated buffer at evaluation time.
    pub offset: Option<u64>,
    /// True for non-`var` function parameters, which may not be assigned.
    pub readonly: bool,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            name: name.into(),
            ty,
            offset: None,
            readonly: false,
        }
    }
}

/// `alias name : expr`, binding a name to an expression (commonly an
/// lvalue) for the duration of a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub value: Expr,
}

impl AliasDecl {
    pub fn new(name: impl Into<String>, value: Expr, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            name: name.into(),
            value,
        }
    }
}

/// A function (with a return type) or procedure (without).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub meta: NodeMeta,
    pub name: String,
    pub parameters: Vec<VarDecl>,
    pub return_type: Option<TypeExpr>,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}
