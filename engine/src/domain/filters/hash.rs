//! Canonical hashing of filter trees
//!
//! Ids are dropped; everything else, including child order and the query
//! parameters, feeds a SHA-256 digest. Parameters are hashed in their
//! effective form, so page 0 and page 1 share a hash. Field order is fixed by
//! the struct definitions below.

use serde::Serialize;

use super::types::{Combinator, FilterConfig, FilterLeaf, FilterNode, FilterValue, Operator, Scalar};
use crate::domain::query::QueryParams;
use crate::utils::crypto::sha256_hex;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum CanonicalNode<'a> {
    Group {
        combinator: Combinator,
        children: Vec<CanonicalNode<'a>>,
    },
    Leaf {
        column: &'a str,
        operator: Operator,
        value: Option<&'a FilterValue>,
        value2: Option<&'a Scalar>,
    },
}

impl<'a> CanonicalNode<'a> {
    fn group(combinator: Combinator, children: &'a [FilterNode]) -> Self {
        CanonicalNode::Group {
            combinator,
            children: children.iter().map(Self::node).collect(),
        }
    }

    fn node(node: &'a FilterNode) -> Self {
        match node {
            FilterNode::Leaf(leaf) => Self::leaf(leaf),
            FilterNode::Group(group) => Self::group(group.combinator, &group.children),
        }
    }

    fn leaf(leaf: &'a FilterLeaf) -> Self {
        CanonicalNode::Leaf {
            column: &leaf.column,
            operator: leaf.operator,
            value: leaf.value.as_ref(),
            value2: leaf.value2.as_ref(),
        }
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    filter: CanonicalNode<'a>,
    params: QueryParams,
}

/// Canonical JSON form of a tree and its parameters
pub fn canonical_json(config: &FilterConfig, params: &QueryParams, max_page_size: u32) -> String {
    let request = CanonicalRequest {
        filter: CanonicalNode::group(config.combinator, &config.children),
        params: params.normalized(max_page_size),
    };
    // Plain structs of strings, numbers and enums always serialize
    serde_json::to_string(&request).unwrap_or_default()
}

/// SHA-256 hex digest of [`canonical_json`]
pub fn canonical_hash(config: &FilterConfig, params: &QueryParams, max_page_size: u32) -> String {
    sha256_hex(&canonical_json(config, params, max_page_size))
}
