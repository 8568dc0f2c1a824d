//! The top-level model node.

use super::decl::{Decl, Function, VarDecl};
use super::rule::Rule;
use super::NodeMeta;
use verge_base::Location;

/// A complete parsed model: declarations, functions and rules in source
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub meta: NodeMeta,
    pub decls: Vec<Decl>,
    pub functions: Vec<Function>,
    pub rules: Vec<Rule>,
}

impl Model {
    pub fn new(loc: Location) -> Self {
        Self {
            meta: NodeMeta::new(loc),
            decls: Vec::new(),
            functions: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// The model-level state variables, in declaration order. Their widths
    /// tile the packed state.
    pub fn state_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Var(v) => Some(v),
            _ => None,
        })
    }

    /// All rules with rulesets and alias rules expanded away.
    pub fn flat_rules(&self) -> Vec<Rule> {
        self.rules.iter().flat_map(Rule::flatten).collect()
    }
}
