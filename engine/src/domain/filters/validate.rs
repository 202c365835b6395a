//! Structural validation of filter trees
//!
//! Runs before either backend. The evaluator and compiler assume a tree that
//! passed here; feeding them an unvalidated tree is unsupported.

use super::error::FilterError;
use super::types::{FilterConfig, FilterLeaf, FilterNode, FilterValue};
use crate::core::constants::{MAX_FILTER_DEPTH, MAX_FILTER_LEAVES};

/// Path reported for errors on the root itself
pub const ROOT_PATH: &str = "root";

/// Path of child `index` under `parent` (`""` for the root)
pub fn child_path(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("children[{index}]")
    } else {
        format!("{parent}.children[{index}]")
    }
}

/// Check every leaf against its operator contract, plus depth and size limits
pub fn validate(config: &FilterConfig) -> Result<(), FilterError> {
    let mut leaves = 0usize;
    validate_children(&config.children, "", 0, &mut leaves)?;
    if leaves > MAX_FILTER_LEAVES {
        return Err(FilterError::validation(
            ROOT_PATH,
            format!("Maximum {MAX_FILTER_LEAVES} filters allowed, got {leaves}"),
        ));
    }
    Ok(())
}

fn validate_children(
    children: &[FilterNode],
    parent: &str,
    depth: usize,
    leaves: &mut usize,
) -> Result<(), FilterError> {
    for (i, child) in children.iter().enumerate() {
        let path = child_path(parent, i);
        match child {
            FilterNode::Leaf(leaf) => {
                *leaves += 1;
                validate_leaf(leaf, &path)?;
            }
            FilterNode::Group(group) => {
                if depth + 1 > MAX_FILTER_DEPTH {
                    return Err(FilterError::validation(
                        path,
                        format!("groups nest deeper than {MAX_FILTER_DEPTH} levels"),
                    ));
                }
                validate_children(&group.children, &path, depth + 1, leaves)?;
            }
        }
    }
    Ok(())
}

fn validate_leaf(leaf: &FilterLeaf, path: &str) -> Result<(), FilterError> {
    let op = leaf.operator;

    if leaf.column.trim().is_empty() {
        return Err(FilterError::validation(path, "leaf is missing a column"));
    }

    if op.requires_list() {
        return match &leaf.value {
            Some(FilterValue::List(items)) if !items.is_empty() => Ok(()),
            _ => Err(FilterError::validation(
                path,
                format!("{op} requires a non-empty list value"),
            )),
        };
    }

    if matches!(leaf.value, Some(FilterValue::List(_))) {
        return Err(FilterError::validation(
            path,
            format!("{op} does not accept a list value"),
        ));
    }

    if op.requires_value() && leaf.value.is_none() {
        return Err(FilterError::validation(path, format!("{op} requires a value")));
    }

    if op.requires_value2() && leaf.value2.is_none() {
        return Err(FilterError::validation(path, format!("{op} requires value2")));
    }

    Ok(())
}
