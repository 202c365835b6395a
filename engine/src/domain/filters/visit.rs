//! Traversal contract shared by every filter backend
//!
//! Both the in-memory evaluator and the SQL compiler implement
//! [`FilterVisitor`], so a new operator or node shape has to be handled in
//! each backend before the crate compiles again.

use super::types::{Combinator, FilterConfig, FilterLeaf, FilterNode};

pub trait FilterVisitor {
    type Output;
    type Error;

    fn visit_leaf(&self, leaf: &FilterLeaf) -> Result<Self::Output, Self::Error>;

    /// Visit a group. Implementations recurse through [`FilterNode::accept`]
    /// and decide themselves whether to short-circuit.
    fn visit_group(
        &self,
        combinator: Combinator,
        children: &[FilterNode],
    ) -> Result<Self::Output, Self::Error>;
}

impl FilterNode {
    pub fn accept<V: FilterVisitor>(&self, visitor: &V) -> Result<V::Output, V::Error> {
        match self {
            FilterNode::Leaf(leaf) => visitor.visit_leaf(leaf),
            FilterNode::Group(group) => visitor.visit_group(group.combinator, &group.children),
        }
    }
}

impl FilterConfig {
    pub fn accept<V: FilterVisitor>(&self, visitor: &V) -> Result<V::Output, V::Error> {
        visitor.visit_group(self.combinator, &self.children)
    }
}
