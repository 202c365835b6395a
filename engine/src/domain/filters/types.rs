//! Filter tree definitions
//!
//! The recursive leaf/group model shared by the in-memory evaluator and the
//! SQL compiler. Trees are built once from the wire form (see `parser`) and
//! are never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FilterError;

/// A materialized dataset row. Missing keys read as `null`.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Boolean operator joining the children of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Leaf predicate operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Regex,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::Between,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::Regex,
    ];

    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThan => "lessThan",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::Regex => "regex",
        }
    }

    /// Whether `value` must be present
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Whether `value2` must be present
    pub fn requires_value2(&self) -> bool {
        matches!(self, Operator::Between)
    }

    /// Whether `value` must be a non-empty list
    pub fn requires_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| FilterError::UnknownOperator {
                operator: s.to_string(),
            })
    }
}

/// A single comparison value
///
/// Wire strings always arrive as `Text`; `Date` is only built in code and
/// serializes as an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Number(f64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::Date(value)
    }
}

/// Leaf value: one scalar, or a list for `in`/`notIn`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

macro_rules! scalar_filter_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_filter_value!(&str, String, f64, i64, i32, bool, DateTime<Utc>);

impl From<Vec<Scalar>> for FilterValue {
    fn from(values: Vec<Scalar>) -> Self {
        FilterValue::List(values)
    }
}

/// A single column/operator/value predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    pub id: Option<String>,
    pub column: String,
    pub operator: Operator,
    pub value: Option<FilterValue>,
    pub value2: Option<Scalar>,
}

impl FilterLeaf {
    pub fn new(column: impl Into<String>, operator: Operator) -> Self {
        Self {
            id: None,
            column: column.into(),
            operator,
            value: None,
            value2: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<FilterValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_value2(mut self, value2: impl Into<Scalar>) -> Self {
        self.value2 = Some(value2.into());
        self
    }

    pub fn with_list<T: Into<Scalar>>(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.value = Some(FilterValue::List(
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// The single comparison value, if `value` is a scalar
    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.value {
            Some(FilterValue::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    /// The membership list, empty unless `value` is a list
    pub fn list(&self) -> &[Scalar] {
        match &self.value {
            Some(FilterValue::List(items)) => items,
            _ => &[],
        }
    }
}

/// A combinator over an ordered list of leaves and nested groups
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub id: Option<String>,
    pub combinator: Combinator,
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn new(combinator: Combinator, children: Vec<FilterNode>) -> Self {
        Self {
            id: None,
            combinator,
            children,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(FilterLeaf),
    Group(FilterGroup),
}

impl From<FilterLeaf> for FilterNode {
    fn from(leaf: FilterLeaf) -> Self {
        FilterNode::Leaf(leaf)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

impl FilterNode {
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Group(FilterGroup::new(Combinator::And, children))
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Group(FilterGroup::new(Combinator::Or, children))
    }
}

/// Root of a filter tree; evaluated like a group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    pub combinator: Combinator,
    pub children: Vec<FilterNode>,
}

impl FilterConfig {
    pub fn new(combinator: Combinator, children: Vec<FilterNode>) -> Self {
        Self {
            combinator,
            children,
        }
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        Self::new(Combinator::And, children)
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        Self::new(Combinator::Or, children)
    }

    /// All leaves in depth-first order
    pub fn leaves(&self) -> Vec<&FilterLeaf> {
        fn collect<'a>(nodes: &'a [FilterNode], out: &mut Vec<&'a FilterLeaf>) {
            for node in nodes {
                match node {
                    FilterNode::Leaf(leaf) => out.push(leaf),
                    FilterNode::Group(group) => collect(&group.children, out),
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.children, &mut out);
        out
    }

    pub fn uses_operator(&self, operator: Operator) -> bool {
        self.leaves().iter().any(|leaf| leaf.operator == operator)
    }
}
