//! Semantic analysis: symbol resolution, validation, and state layout.
//!
//! The passes run in order:
//!
//! 1. [`resolve`] walks the tree with a lexical scope stack and produces a
//!    [`Bindings`] side table mapping every use site (`Id` expressions,
//!    named types, calls) to what it binds to. The tree itself is never
//!    mutated; cross-references live only in the table, keyed by
//!    [`NodeId`]. Cloned subtrees keep their ids, so bindings remain valid
//!    for clones (rule flattening relies on this).
//! 2. [`validate`] type-checks the model against the bindings and
//!    constant-folds type bounds, recording which equality comparisons are
//!    over complex (non-simple) values for the code generator.
//! 3. [`layout`] assigns each state variable its bit offset and computes
//!    the total state width.
//!
//! [`Bindings`] also hosts the semantic queries the later phases share:
//! type resolution through named references, bit widths and value counts,
//! static expression types, and constant folding.

pub mod layout;
pub mod resolve;
pub mod validate;

pub use layout::{layout, StateLayout};
pub use resolve::resolve;
pub use validate::{validate, Validated};

use crate::ast::{
    BinaryOp, Expr, ExprKind, NodeId, NodeMeta, Quantifier, QuantifierKind, TypeExpr, TypeExprKind,
    UnaryOp,
};
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use verge_base::{LocatedError, Location, Result};

/// What a name use resolves to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A constant declaration; `value` is a clone of its (resolved) value
    /// expression.
    Const { decl: NodeId, value: Expr },
    /// A variable: state variable, local, or function parameter.
    Var {
        decl: NodeId,
        ty: TypeExpr,
        readonly: bool,
    },
    /// A type declaration; `ty` is a clone of its definition.
    Type { decl: NodeId, ty: TypeExpr },
    /// An alias; `value` is a clone of the aliased expression.
    Alias { decl: NodeId, value: Expr },
    /// A quantified variable; `ty` is the iteration type (synthesized as a
    /// range for `x := lo to hi` quantifiers).
    Quantifier { decl: NodeId, ty: TypeExpr },
    /// A function or procedure.
    Function {
        decl: NodeId,
        /// `(readonly, type)` per parameter, in order.
        parameters: Vec<(bool, TypeExpr)>,
        return_type: Option<TypeExpr>,
    },
    /// A member of an enum type; `index` is its zero-based position.
    EnumMember { ty: TypeExpr, index: u64 },
}

/// The resolver's side table: use-site [`NodeId`] to [`Binding`].
#[derive(Debug, Default)]
pub struct Bindings {
    map: FxHashMap<NodeId, Binding>,
}

/// The synthesized builtin `boolean` type: an enum of `false`, `true`.
pub fn boolean_type() -> TypeExpr {
    TypeExpr {
        meta: NodeMeta::new(Location::default()),
        kind: TypeExprKind::Enum {
            members: vec![
                ("false".to_string(), Location::default()),
                ("true".to_string(), Location::default()),
            ],
        },
    }
}

/// Whether a resolved type is the two-valued boolean enum.
pub fn is_boolean_type(ty: &TypeExpr) -> bool {
    match &ty.kind {
        TypeExprKind::Enum { members } => {
            members.len() == 2 && members[0].0 == "false" && members[1].0 == "true"
        }
        _ => false,
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, binding: Binding) {
        self.map.insert(id, binding);
    }

    pub fn of(&self, id: NodeId) -> Option<&Binding> {
        self.map.get(&id)
    }

    /// Peels `Named` references until a structural type is reached.
    pub fn resolve_type<'a>(&'a self, ty: &'a TypeExpr) -> &'a TypeExpr {
        let mut current = ty;
        loop {
            match &current.kind {
                TypeExprKind::Named(_) => match self.of(current.meta.id) {
                    Some(Binding::Type { ty, .. }) => current = ty,
                    _ => return current,
                },
                _ => return current,
            }
        }
    }

    /// Whether the type resolves to a simple (range, enum, scalarset) type.
    pub fn is_simple(&self, ty: &TypeExpr) -> bool {
        self.resolve_type(ty).is_structurally_simple()
    }

    /// The number of encoded values of the type, including the reserved
    /// undefined encoding for simple types. For an array this is its
    /// element count; arrays and records have no undefined encoding of
    /// their own.
    pub fn count(&self, ty: &TypeExpr) -> Result<BigInt> {
        let resolved = self.resolve_type(ty);
        match &resolved.kind {
            TypeExprKind::Range { min, max } => {
                let lo = self.constant_fold(min)?;
                let hi = self.constant_fold(max)?;
                Ok(hi - lo + 2)
            }
            TypeExprKind::Enum { members } => Ok(BigInt::from(members.len() + 1)),
            TypeExprKind::Scalarset { bound } => Ok(self.constant_fold(bound)? + 1),
            TypeExprKind::Array { index, .. } => self.count(index).map(|c| c - 1),
            TypeExprKind::Record { .. } => Err(LocatedError::new(
                "a record type has no value count",
                resolved.meta.loc.clone(),
            )),
            TypeExprKind::Named(name) => Err(LocatedError::new(
                format!("unresolved type \"{}\"", name),
                resolved.meta.loc.clone(),
            )),
        }
    }

    /// The width of the type in state bits.
    pub fn width(&self, ty: &TypeExpr) -> Result<BigInt> {
        let resolved = self.resolve_type(ty);
        match &resolved.kind {
            TypeExprKind::Range { .. }
            | TypeExprKind::Enum { .. }
            | TypeExprKind::Scalarset { .. } => {
                let count = self.count(resolved)?;
                Ok(BigInt::from(bits_for(&count)))
            }
            TypeExprKind::Array { index, element } => {
                let elements = self.count(index)? - 1;
                Ok(elements * self.width(element)?)
            }
            TypeExprKind::Record { fields } => {
                let mut total = BigInt::zero();
                for f in fields {
                    total += self.width(&f.ty)?;
                }
                Ok(total)
            }
            TypeExprKind::Named(name) => Err(LocatedError::new(
                format!("unresolved type \"{}\"", name),
                resolved.meta.loc.clone(),
            )),
        }
    }

    /// The inclusive value bounds of a simple type.
    pub fn bounds(&self, ty: &TypeExpr) -> Result<(BigInt, BigInt)> {
        let resolved = self.resolve_type(ty);
        match &resolved.kind {
            TypeExprKind::Range { min, max } => {
                Ok((self.constant_fold(min)?, self.constant_fold(max)?))
            }
            TypeExprKind::Enum { members } => {
                Ok((BigInt::zero(), BigInt::from(members.len() as i64 - 1)))
            }
            TypeExprKind::Scalarset { bound } => {
                Ok((BigInt::zero(), self.constant_fold(bound)? - 1))
            }
            _ => Err(LocatedError::new(
                "bounds requested of a non-simple type",
                resolved.meta.loc.clone(),
            )),
        }
    }

    /// The static type of an expression. `None` means "numeric": the type
    /// of a literal or arithmetic result, compatible with any range.
    pub fn type_of(&self, e: &Expr) -> Result<Option<TypeExpr>> {
        match &e.kind {
            ExprKind::Number(_) => Ok(None),
            ExprKind::Ternary { lhs, .. } => self.type_of(lhs),
            ExprKind::Binary { op, .. } => {
                if op.is_arithmetic() {
                    Ok(None)
                } else {
                    Ok(Some(boolean_type()))
                }
            }
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::Negative => Ok(None),
                UnaryOp::Not => Ok(Some(boolean_type())),
            },
            ExprKind::Forall { .. } | ExprKind::Exists { .. } | ExprKind::IsUndefined(_) => {
                Ok(Some(boolean_type()))
            }
            ExprKind::Id(name) => match self.of(e.meta.id) {
                Some(Binding::Const { value, .. }) => self.type_of(value),
                Some(Binding::Var { ty, .. }) | Some(Binding::Quantifier { ty, .. }) => {
                    Ok(Some(ty.clone()))
                }
                Some(Binding::Alias { value, .. }) => self.type_of(value),
                Some(Binding::EnumMember { ty, .. }) => Ok(Some(ty.clone())),
                _ => Err(LocatedError::new(
                    format!("unresolved symbol \"{}\"", name),
                    e.meta.loc.clone(),
                )),
            },
            ExprKind::Field { record, field } => {
                let record_ty = self.type_of(record)?.ok_or_else(|| {
                    LocatedError::new("field access on a non-record value", e.meta.loc.clone())
                })?;
                let resolved = self.resolve_type(&record_ty);
                match &resolved.kind {
                    TypeExprKind::Record { fields } => fields
                        .iter()
                        .find(|f| &f.name == field)
                        .map(|f| Some(f.ty.clone()))
                        .ok_or_else(|| {
                            LocatedError::new(
                                format!("record has no field \"{}\"", field),
                                e.meta.loc.clone(),
                            )
                        }),
                    _ => Err(LocatedError::new(
                        "field access on a non-record value",
                        e.meta.loc.clone(),
                    )),
                }
            }
            ExprKind::Element { array, .. } => {
                let array_ty = self.type_of(array)?.ok_or_else(|| {
                    LocatedError::new("indexing into a non-array value", e.meta.loc.clone())
                })?;
                let resolved = self.resolve_type(&array_ty);
                match &resolved.kind {
                    TypeExprKind::Array { element, .. } => Ok(Some((**element).clone())),
                    _ => Err(LocatedError::new(
                        "indexing into a non-array value",
                        e.meta.loc.clone(),
                    )),
                }
            }
            ExprKind::Call { function, .. } => match self.of(e.meta.id) {
                Some(Binding::Function { return_type, .. }) => Ok(return_type.clone()),
                _ => Err(LocatedError::new(
                    format!("unresolved function \"{}\"", function),
                    e.meta.loc.clone(),
                )),
            },
        }
    }

    /// Whether the expression's type resolves to boolean.
    pub fn is_boolean(&self, e: &Expr) -> bool {
        match self.type_of(e) {
            Ok(Some(ty)) => is_boolean_type(self.resolve_type(&ty)),
            _ => false,
        }
    }

    /// Whether the expression is a compile-time constant.
    pub fn is_constant(&self, e: &Expr) -> bool {
        match &e.kind {
            ExprKind::Number(_) => true,
            ExprKind::Ternary { cond, lhs, rhs } => {
                self.is_constant(cond) && self.is_constant(lhs) && self.is_constant(rhs)
            }
            ExprKind::Binary { lhs, rhs, .. } => self.is_constant(lhs) && self.is_constant(rhs),
            ExprKind::Unary { rhs, .. } => self.is_constant(rhs),
            ExprKind::Id(_) => match self.of(e.meta.id) {
                Some(Binding::Const { .. }) | Some(Binding::EnumMember { .. }) => true,
                Some(Binding::Alias { value, .. }) => self.is_constant(value),
                _ => false,
            },
            _ => false,
        }
    }

    /// Evaluates a compile-time constant. Booleans fold to 0/1.
    pub fn constant_fold(&self, e: &Expr) -> Result<BigInt> {
        let fail = |msg: &str| Err(LocatedError::new(msg.to_string(), e.meta.loc.clone()));
        match &e.kind {
            ExprKind::Number(n) => Ok(n.clone()),
            ExprKind::Ternary { cond, lhs, rhs } => {
                if !self.constant_fold(cond)?.is_zero() {
                    self.constant_fold(lhs)
                } else {
                    self.constant_fold(rhs)
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.constant_fold(lhs)?;
                let r = self.constant_fold(rhs)?;
                let bool_result = |b: bool| if b { BigInt::one() } else { BigInt::zero() };
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => Ok(l * r),
                    BinaryOp::Div => {
                        if r.is_zero() {
                            fail("division by zero in constant expression")
                        } else {
                            Ok(l / r)
                        }
                    }
                    BinaryOp::Mod => {
                        if r.is_zero() {
                            fail("modulo by zero in constant expression")
                        } else {
                            Ok(l % r)
                        }
                    }
                    BinaryOp::Lt => Ok(bool_result(l < r)),
                    BinaryOp::Leq => Ok(bool_result(l <= r)),
                    BinaryOp::Gt => Ok(bool_result(l > r)),
                    BinaryOp::Geq => Ok(bool_result(l >= r)),
                    BinaryOp::Eq => Ok(bool_result(l == r)),
                    BinaryOp::Neq => Ok(bool_result(l != r)),
                    BinaryOp::And => Ok(bool_result(!l.is_zero() && !r.is_zero())),
                    BinaryOp::Or => Ok(bool_result(!l.is_zero() || !r.is_zero())),
                    BinaryOp::Implication => Ok(bool_result(l.is_zero() || !r.is_zero())),
                }
            }
            ExprKind::Unary { op, rhs } => {
                let v = self.constant_fold(rhs)?;
                match op {
                    UnaryOp::Negative => Ok(-v),
                    UnaryOp::Not => Ok(if v.is_zero() { BigInt::one() } else { BigInt::zero() }),
                }
            }
            ExprKind::Id(name) => match self.of(e.meta.id) {
                Some(Binding::Const { value, .. }) => self.constant_fold(value),
                Some(Binding::EnumMember { index, .. }) => Ok(BigInt::from(*index)),
                Some(Binding::Alias { value, .. }) => self.constant_fold(value),
                _ => fail(&format!("\"{}\" is not a compile-time constant", name)),
            },
            _ => fail("expression is not a compile-time constant"),
        }
    }

    /// Folds to an `i64`, the runtime value width.
    pub fn fold_i64(&self, e: &Expr) -> Result<i64> {
        let v = self.constant_fold(e)?;
        v.to_i64().ok_or_else(|| {
            LocatedError::new(
                format!("constant {} does not fit the runtime value type", v),
                e.meta.loc.clone(),
            )
        })
    }

    /// The iteration domain of a quantifier: `(lower, upper, step)` where
    /// bounds are compile-time constants. Used for rule flattening counts;
    /// `for` statements may additionally use non-constant bounds, which
    /// this rejects.
    pub fn quantifier_domain(&self, q: &Quantifier) -> Result<(i64, i64, i64)> {
        match &q.kind {
            QuantifierKind::Typed(ty) => {
                let (lo, hi) = self.bounds(ty)?;
                let lo = lo.to_i64().ok_or_else(|| {
                    LocatedError::new("quantifier bound overflows", q.meta.loc.clone())
                })?;
                let hi = hi.to_i64().ok_or_else(|| {
                    LocatedError::new("quantifier bound overflows", q.meta.loc.clone())
                })?;
                Ok((lo, hi, 1))
            }
            QuantifierKind::Bounded { from, to, step } => {
                let lo = self.fold_i64(from)?;
                let hi = self.fold_i64(to)?;
                let step = match step {
                    Some(s) => self.fold_i64(s)?,
                    None => 1,
                };
                if step == 0 {
                    return Err(LocatedError::new(
                        "quantifier step must be non-zero",
                        q.meta.loc.clone(),
                    ));
                }
                Ok((lo, hi, step))
            }
        }
    }

    /// The number of bindings a quantifier enumerates.
    pub fn quantifier_count(&self, q: &Quantifier) -> Result<u64> {
        let (lo, hi, step) = self.quantifier_domain(q)?;
        Ok(domain_size(lo, hi, step))
    }
}

/// The number of values enumerated by `lo`, `lo + step`, ... while within
/// `[lo, hi]` (or `[hi, lo]` for a negative step).
pub fn domain_size(lo: i64, hi: i64, step: i64) -> u64 {
    if step > 0 {
        if lo > hi {
            0
        } else {
            (hi - lo) as u64 / step as u64 + 1
        }
    } else if lo < hi {
        0
    } else {
        (lo - hi) as u64 / step.unsigned_abs() + 1
    }
}

/// Minimum bits to encode `count` distinct values.
pub fn bits_for(count: &BigInt) -> u64 {
    if count <= &BigInt::one() {
        return 0;
    }
    let mut bits = 0u64;
    let mut capacity = BigInt::one();
    let two = BigInt::from(2);
    while &capacity < count {
        capacity = capacity * &two;
        bits += 1;
    }
    bits
}

/// Structural compatibility of two simple types, used by the validator.
///
/// Ranges are compatible with ranges and numeric results regardless of
/// bounds; enums are compatible when they are the same declaration or have
/// identical member lists; scalarsets only when they are the same
/// declaration (clones keep node ids, so identity is id equality).
pub fn compatible_simple(bindings: &Bindings, a: &TypeExpr, b: &TypeExpr) -> bool {
    let a = bindings.resolve_type(a);
    let b = bindings.resolve_type(b);
    match (&a.kind, &b.kind) {
        (TypeExprKind::Range { .. }, TypeExprKind::Range { .. }) => true,
        (TypeExprKind::Enum { members: ma }, TypeExprKind::Enum { members: mb }) => {
            a.meta.id == b.meta.id
                || (ma.len() == mb.len()
                    && ma.iter().zip(mb.iter()).all(|(x, y)| x.0 == y.0))
        }
        (TypeExprKind::Scalarset { .. }, TypeExprKind::Scalarset { .. }) => a.meta.id == b.meta.id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn analyzed(src: &str) -> (crate::ast::Model, Bindings) {
        let model = parse(src, None).expect("parse failed");
        let bindings = resolve(&model).expect("resolve failed");
        (model, bindings)
    }

    #[test]
    fn bits_for_counts() {
        assert_eq!(bits_for(&BigInt::from(1)), 0);
        assert_eq!(bits_for(&BigInt::from(2)), 1);
        assert_eq!(bits_for(&BigInt::from(3)), 2);
        assert_eq!(bits_for(&BigInt::from(4)), 2);
        assert_eq!(bits_for(&BigInt::from(5)), 3);
        assert_eq!(bits_for(&BigInt::from(256)), 8);
        assert_eq!(bits_for(&BigInt::from(257)), 9);
    }

    #[test]
    fn domain_size_handles_steps() {
        assert_eq!(domain_size(0, 2, 1), 3);
        assert_eq!(domain_size(0, 5, 2), 3);
        assert_eq!(domain_size(5, 0, -2), 3);
        assert_eq!(domain_size(3, 1, 1), 0);
    }

    #[test]
    fn widths_follow_the_encoding() {
        // boolean: 2 values + undefined = 3 encodings -> 2 bits
        let (model, bindings) = analyzed("var v: boolean;");
        let var = model.state_vars().next().unwrap();
        assert_eq!(bindings.width(&var.ty).unwrap(), BigInt::from(2));

        // 0..2: 3 values + undefined -> 2 bits
        let (model, bindings) = analyzed("var x: 0..2;");
        let var = model.state_vars().next().unwrap();
        assert_eq!(bindings.width(&var.ty).unwrap(), BigInt::from(2));

        // array [0..2] of boolean: 3 elements x 2 bits
        let (model, bindings) = analyzed("var a: array [0..2] of boolean;");
        let var = model.state_vars().next().unwrap();
        assert_eq!(bindings.width(&var.ty).unwrap(), BigInt::from(6));
    }

    #[test]
    fn record_width_is_field_sum() {
        let (model, bindings) = analyzed("var r: record a: 0..2; b: boolean; end;");
        let var = model.state_vars().next().unwrap();
        assert_eq!(bindings.width(&var.ty).unwrap(), BigInt::from(4));
    }

    #[test]
    fn constant_folding_through_consts() {
        let (model, bindings) = analyzed("const N: 2 + 1; var x: 0..N * 2;");
        let var = model.state_vars().next().unwrap();
        let (lo, hi) = bindings.bounds(&var.ty).unwrap();
        assert_eq!(lo, BigInt::zero());
        assert_eq!(hi, BigInt::from(6));
    }

    #[test]
    fn type_of_sees_through_aliases_and_fields() {
        let (model, bindings) = analyzed(
            "var r: record f: 0..3; end;\n\
             rule begin alias x: r.f do x := 1; end; end;",
        );
        // find the assignment lhs inside the alias body
        use crate::traverse::{preorder, NodeRef};
        let mut checked = false;
        for node in preorder(NodeRef::Model(&model)) {
            if let NodeRef::Stmt(s) = node {
                if let crate::ast::StmtKind::Assignment { lhs, .. } = &s.kind {
                    let ty = bindings.type_of(lhs).unwrap().unwrap();
                    assert!(matches!(
                        bindings.resolve_type(&ty).kind,
                        TypeExprKind::Range { .. }
                    ));
                    checked = true;
                }
            }
        }
        assert!(checked);
    }
}
