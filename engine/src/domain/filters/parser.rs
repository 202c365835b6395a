//! Filter parsing
//!
//! Parses the JSON wire form into a typed tree, then validates it. Paths in
//! errors point at the offending node (`children[1].children[0]`).

use serde::Deserialize;
use serde_json::Value;

use super::error::FilterError;
use super::types::{Combinator, FilterConfig, FilterGroup, FilterLeaf, FilterNode, FilterValue, Scalar};
use super::validate::{ROOT_PATH, child_path, validate};
use crate::core::constants::MAX_FILTER_JSON_SIZE;

/// Leaf as it appears on the wire; every field is checked after decoding
#[derive(Debug, Deserialize)]
struct WireLeaf {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    value2: Value,
}

/// Parse and validate a filter tree from JSON text
///
/// Checks size, decodes the tree, and runs the validator.
pub fn parse_filter_config(json_str: &str) -> Result<FilterConfig, FilterError> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterError::TooLarge {
            max_bytes: MAX_FILTER_JSON_SIZE,
        });
    }

    let value: Value =
        serde_json::from_str(json_str).map_err(|e| FilterError::InvalidJson(e.to_string()))?;
    filter_config_from_value(&value)
}

/// Build and validate a tree from an already decoded JSON value
pub fn filter_config_from_value(value: &Value) -> Result<FilterConfig, FilterError> {
    let Value::Object(root) = value else {
        return Err(FilterError::validation(ROOT_PATH, "filter must be an object"));
    };

    let combinator = parse_combinator(root.get("combinator"), ROOT_PATH)?;
    let children = match root.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(children) => parse_children(children, "")?,
    };

    let config = FilterConfig::new(combinator, children);
    validate(&config)?;
    Ok(config)
}

fn parse_combinator(value: Option<&Value>, path: &str) -> Result<Combinator, FilterError> {
    match value {
        None | Some(Value::Null) => Ok(Combinator::And),
        Some(v) => Combinator::deserialize(v).map_err(|_| {
            FilterError::validation(path, format!("invalid combinator {v}, expected AND or OR"))
        }),
    }
}

fn parse_children(value: &Value, parent: &str) -> Result<Vec<FilterNode>, FilterError> {
    let Value::Array(items) = value else {
        return Err(FilterError::validation(
            display_path(parent),
            "children must be an array",
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_node(item, &child_path(parent, i)))
        .collect()
}

fn parse_node(value: &Value, path: &str) -> Result<FilterNode, FilterError> {
    let Value::Object(map) = value else {
        return Err(FilterError::validation(path, "node must be an object"));
    };

    if let Some(children) = map.get("children") {
        let mut group = FilterGroup::new(
            parse_combinator(map.get("combinator"), path)?,
            parse_children(children, path)?,
        );
        group.id = map.get("id").and_then(id_text);
        return Ok(group.into());
    }

    let wire = WireLeaf::deserialize(value)
        .map_err(|e| FilterError::validation(path, e.to_string()))?;
    parse_leaf(wire, path).map(FilterNode::Leaf)
}

fn parse_leaf(wire: WireLeaf, path: &str) -> Result<FilterLeaf, FilterError> {
    let Some(operator) = wire.operator else {
        return Err(FilterError::validation(path, "leaf is missing an operator"));
    };
    let operator = operator.parse()?;

    let mut leaf = FilterLeaf::new(wire.column.unwrap_or_default(), operator);
    leaf.id = wire.id.as_ref().and_then(id_text);
    leaf.value = parse_value(wire.value, path)?;
    leaf.value2 = match wire.value2 {
        Value::Array(_) => {
            return Err(FilterError::validation(path, "value2 must be a single value"));
        }
        other => parse_scalar(other, path)?,
    };
    Ok(leaf)
}

fn parse_value(value: Value, path: &str) -> Result<Option<FilterValue>, FilterError> {
    match value {
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match parse_scalar(item, path)? {
                    Some(scalar) => list.push(scalar),
                    None => {
                        return Err(FilterError::validation(path, "value list contains null"));
                    }
                }
            }
            Ok(Some(FilterValue::List(list)))
        }
        other => Ok(parse_scalar(other, path)?.map(FilterValue::Scalar)),
    }
}

fn parse_scalar(value: Value, path: &str) -> Result<Option<Scalar>, FilterError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(Scalar::Bool(b))),
        Value::Number(n) => n
            .as_f64()
            .map(|n| Some(Scalar::Number(n)))
            .ok_or_else(|| FilterError::validation(path, "number out of range")),
        Value::String(s) => Ok(Some(Scalar::Text(s))),
        Value::Array(_) => Err(FilterError::validation(path, "nested lists are not allowed")),
        Value::Object(_) => Err(FilterError::validation(path, "objects are not valid values")),
    }
}

/// Ids are opaque; numeric ids are kept as their text
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { ROOT_PATH } else { path }
}
