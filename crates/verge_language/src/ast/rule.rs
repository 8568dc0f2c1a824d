//! Rules: start states, guarded transition rules, property claims, and the
//! grouping forms (rulesets, alias rules) that [`Rule::flatten`] expands
//! away.

use super::decl::{AliasDecl, Decl};
use super::expr::{Expr, Quantifier};
use super::stmt::Stmt;
use super::NodeMeta;
use verge_base::Location;

/// How a property participates in checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyCategory {
    /// Must hold in every reachable state; violation is an error.
    Assertion,
    /// Prunes exploration: a violating rule iteration is discarded.
    Assumption,
    /// Must be satisfied by at least one reachable state.
    Cover,
    /// Must eventually hold on every path.
    Liveness,
}

/// A boolean claim with its checking category.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub meta: NodeMeta,
    pub category: PropertyCategory,
    pub expr: Expr,
}

impl Property {
    pub fn new(category: PropertyCategory, expr: Expr, loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            category,
            expr,
        }
    }
}

/// A top-level rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Start(StartState),
    Simple(SimpleRule),
    Property(PropertyRule),
    Ruleset(Ruleset),
    Alias(AliasRule),
}

/// `startstate [name] ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct StartState {
    pub meta: NodeMeta,
    pub name: Option<String>,
    pub quantifiers: Vec<Quantifier>,
    pub aliases: Vec<AliasDecl>,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}

/// `rule [name] [guard ==>] ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleRule {
    pub meta: NodeMeta,
    pub name: Option<String>,
    pub quantifiers: Vec<Quantifier>,
    pub aliases: Vec<AliasDecl>,
    /// `None` means the rule is always enabled.
    pub guard: Option<Expr>,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}

/// `invariant`/`assume`/`cover`/`liveness` at rule position.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRule {
    pub meta: NodeMeta,
    pub name: Option<String>,
    pub quantifiers: Vec<Quantifier>,
    pub aliases: Vec<AliasDecl>,
    pub property: Property,
}

/// `ruleset quantifiers do rules end`
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub meta: NodeMeta,
    pub quantifiers: Vec<Quantifier>,
    pub rules: Vec<Rule>,
}

/// `alias decls do rules end`
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRule {
    pub meta: NodeMeta,
    pub aliases: Vec<AliasDecl>,
    pub rules: Vec<Rule>,
}

impl Rule {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            Rule::Start(r) => &r.meta,
            Rule::Simple(r) => &r.meta,
            Rule::Property(r) => &r.meta,
            Rule::Ruleset(r) => &r.meta,
            Rule::Alias(r) => &r.meta,
        }
    }

    /// Expands rulesets and alias rules into a flat list of start states,
    /// simple rules, and properties. Each grouping form's quantifiers and
    /// alias declarations are hoisted onto the cloned inner rules, outermost
    /// first, so the inner rules see them in the same order a scope stack
    /// would.
    pub fn flatten(&self) -> Vec<Rule> {
        match self {
            Rule::Start(_) | Rule::Simple(_) | Rule::Property(_) => vec![self.clone()],
            Rule::Ruleset(rs) => {
                let mut out = Vec::new();
                for inner in &rs.rules {
                    for flat in inner.flatten() {
                        out.push(prepend(flat, &rs.quantifiers, &[]));
                    }
                }
                out
            }
            Rule::Alias(ar) => {
                let mut out = Vec::new();
                for inner in &ar.rules {
                    for flat in inner.flatten() {
                        out.push(prepend(flat, &[], &ar.aliases));
                    }
                }
                out
            }
        }
    }
}

fn prepend(rule: Rule, quantifiers: &[Quantifier], aliases: &[AliasDecl]) -> Rule {
    fn splice<T: Clone>(outer: &[T], inner: &mut Vec<T>) {
        let mut combined = outer.to_vec();
        combined.append(inner);
        *inner = combined;
    }

    match rule {
        Rule::Start(mut r) => {
            splice(quantifiers, &mut r.quantifiers);
            splice(aliases, &mut r.aliases);
            Rule::Start(r)
        }
        Rule::Simple(mut r) => {
            splice(quantifiers, &mut r.quantifiers);
            splice(aliases, &mut r.aliases);
            Rule::Simple(r)
        }
        Rule::Property(mut r) => {
            splice(quantifiers, &mut r.quantifiers);
            splice(aliases, &mut r.aliases);
            Rule::Property(r)
        }
        // flatten() only returns the three leaf forms
        grouped => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::{ExprKind, QuantifierKind};
    use crate::ast::types::{TypeExpr, TypeExprKind};

    fn quantifier(name: &str) -> Quantifier {
        Quantifier::new(
            name,
            QuantifierKind::Typed(TypeExpr::new(
                TypeExprKind::Named("T".into()),
                Location::default(),
            )),
            Location::default(),
        )
    }

    fn simple_rule(name: &str) -> Rule {
        Rule::Simple(SimpleRule {
            meta: NodeMeta::new(Location::default()),
            name: Some(name.into()),
            quantifiers: vec![quantifier("inner")],
            aliases: vec![],
            guard: None,
            decls: vec![],
            body: vec![],
        })
    }

    #[test]
    fn flatten_hoists_ruleset_quantifiers_outermost_first() {
        let ruleset = Rule::Ruleset(Ruleset {
            meta: NodeMeta::new(Location::default()),
            quantifiers: vec![quantifier("outer")],
            rules: vec![simple_rule("r")],
        });

        let flat = ruleset.flatten();
        assert_eq!(flat.len(), 1);
        match &flat[0] {
            Rule::Simple(r) => {
                let names: Vec<_> = r.quantifiers.iter().map(|q| q.name.as_str()).collect();
                assert_eq!(names, vec!["outer", "inner"]);
            }
            other => panic!("expected simple rule, got {:?}", other),
        }
    }

    #[test]
    fn flatten_expands_nested_groupings() {
        let nested = Rule::Ruleset(Ruleset {
            meta: NodeMeta::new(Location::default()),
            quantifiers: vec![quantifier("a")],
            rules: vec![Rule::Ruleset(Ruleset {
                meta: NodeMeta::new(Location::default()),
                quantifiers: vec![quantifier("b")],
                rules: vec![simple_rule("x"), simple_rule("y")],
            })],
        });

        let flat = nested.flatten();
        assert_eq!(flat.len(), 2);
        for rule in &flat {
            match rule {
                Rule::Simple(r) => {
                    let names: Vec<_> = r.quantifiers.iter().map(|q| q.name.as_str()).collect();
                    assert_eq!(names, vec!["a", "b", "inner"]);
                }
                other => panic!("expected simple rule, got {:?}", other),
            }
        }
    }

    #[test]
    fn flatten_hoists_alias_decls() {
        let alias = AliasDecl::new(
            "sh",
            crate::ast::Expr::new(ExprKind::Id("x".into()), Location::default()),
            Location::default(),
        );
        let rule = Rule::Alias(AliasRule {
            meta: NodeMeta::new(Location::default()),
            aliases: vec![alias],
            rules: vec![simple_rule("r")],
        });

        let flat = rule.flatten();
        match &flat[0] {
            Rule::Simple(r) => assert_eq!(r.aliases[0].name, "sh"),
            other => panic!("expected simple rule, got {:?}", other),
        }
    }
}
