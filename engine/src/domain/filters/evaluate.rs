//! In-memory filter evaluation
//!
//! Evaluates a validated tree against one JSON row. Coercion failures never
//! raise: a cell that does not parse, or a pattern that does not compile,
//! makes the predicate false.

use std::convert::Infallible;

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::coerce::{cell_number, cell_text};
use super::types::{Combinator, FilterConfig, FilterLeaf, FilterNode, Operator, Row, Scalar};
use super::visit::FilterVisitor;

/// Compiled program size limit for user-supplied patterns (1 MiB)
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

static NULL: Value = Value::Null;

/// Compile a filter pattern with case-insensitive search semantics.
///
/// Returns `None` for patterns that do not compile.
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .ok()
}

/// Regex patterns of a tree, compiled once up front
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: FxHashMap<String, Option<Regex>>,
}

impl PatternCache {
    pub fn for_config(config: &FilterConfig) -> Self {
        let mut cache = Self::default();
        cache.extend(config.accept(&PatternCollector).unwrap_or_default());
        cache
    }

    pub fn for_node(node: &FilterNode) -> Self {
        let mut cache = Self::default();
        cache.extend(node.accept(&PatternCollector).unwrap_or_default());
        cache
    }

    fn extend(&mut self, patterns: Vec<String>) {
        for pattern in patterns {
            self.patterns
                .entry(pattern)
                .or_insert_with_key(|p| compile_pattern(p));
        }
    }

    /// The compiled pattern, or `None` when it is invalid or unknown
    pub fn get(&self, pattern: &str) -> Option<&Regex> {
        self.patterns.get(pattern).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Collects the pattern text of every `regex` leaf
struct PatternCollector;

impl FilterVisitor for PatternCollector {
    type Output = Vec<String>;
    type Error = Infallible;

    fn visit_leaf(&self, leaf: &FilterLeaf) -> Result<Vec<String>, Infallible> {
        Ok(match (leaf.operator, leaf.scalar()) {
            (Operator::Regex, Some(pattern)) => vec![pattern.as_text().into_owned()],
            _ => Vec::new(),
        })
    }

    fn visit_group(
        &self,
        _combinator: Combinator,
        children: &[FilterNode],
    ) -> Result<Vec<String>, Infallible> {
        let mut out = Vec::new();
        for child in children {
            out.extend(child.accept(self)?);
        }
        Ok(out)
    }
}

/// Evaluates a tree against a single row
pub struct RowEvaluator<'a> {
    row: &'a Row,
    patterns: &'a PatternCache,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(row: &'a Row, patterns: &'a PatternCache) -> Self {
        Self { row, patterns }
    }

    fn cell(&self, column: &str) -> &'a Value {
        self.row.get(column).unwrap_or(&NULL)
    }
}

impl FilterVisitor for RowEvaluator<'_> {
    type Output = bool;
    type Error = Infallible;

    fn visit_leaf(&self, leaf: &FilterLeaf) -> Result<bool, Infallible> {
        Ok(evaluate_leaf(self.cell(&leaf.column), leaf, self.patterns))
    }

    fn visit_group(&self, combinator: Combinator, children: &[FilterNode]) -> Result<bool, Infallible> {
        for child in children {
            let matched = child.accept(self)?;
            match combinator {
                Combinator::And if !matched => return Ok(false),
                Combinator::Or if matched => return Ok(true),
                _ => {}
            }
        }
        // Empty groups match
        Ok(combinator == Combinator::And || children.is_empty())
    }
}

fn evaluate_leaf(cell: &Value, leaf: &FilterLeaf, patterns: &PatternCache) -> bool {
    let value = leaf.scalar();
    match leaf.operator {
        Operator::Equals => value.is_some_and(|v| cell_equals(cell, v)),
        Operator::NotEquals => !value.is_some_and(|v| cell_equals(cell, v)),
        Operator::Contains => text_test(cell, value, |c, v| c.contains(v)),
        Operator::NotContains => !text_test(cell, value, |c, v| c.contains(v)),
        Operator::StartsWith => text_test(cell, value, |c, v| c.starts_with(v)),
        Operator::EndsWith => text_test(cell, value, |c, v| c.ends_with(v)),
        Operator::GreaterThan => number_test(cell, value, |c, v| c > v),
        Operator::GreaterThanOrEqual => number_test(cell, value, |c, v| c >= v),
        Operator::LessThan => number_test(cell, value, |c, v| c < v),
        Operator::LessThanOrEqual => number_test(cell, value, |c, v| c <= v),
        Operator::Between => {
            let lo = value.and_then(Scalar::as_number);
            let hi = leaf.value2.as_ref().and_then(Scalar::as_number);
            match (cell_number(cell), lo, hi) {
                (Some(n), Some(lo), Some(hi)) => lo <= n && n <= hi,
                _ => false,
            }
        }
        Operator::In => leaf.list().iter().any(|v| cell_equals(cell, v)),
        Operator::NotIn => !leaf.list().iter().any(|v| cell_equals(cell, v)),
        Operator::IsNull => is_blank(cell),
        Operator::IsNotNull => !is_blank(cell),
        Operator::Regex => match (cell_text(cell), value) {
            (Some(text), Some(pattern)) => patterns
                .get(&pattern.as_text())
                .is_some_and(|re| re.is_match(&text)),
            _ => false,
        },
    }
}

/// Equality under the shared coercion rules
pub(crate) fn cell_equals(cell: &Value, value: &Scalar) -> bool {
    match cell {
        Value::Null => false,
        Value::Number(_) => match (cell_number(cell), value.as_number()) {
            (Some(c), Some(v)) => c == v,
            _ => false,
        },
        _ => cell_text(cell).is_some_and(|text| text == value.as_text()),
    }
}

fn text_test(cell: &Value, value: Option<&Scalar>, test: impl Fn(&str, &str) -> bool) -> bool {
    match (cell_text(cell), value) {
        (Some(text), Some(v)) => test(&text.to_lowercase(), &v.as_text().to_lowercase()),
        _ => false,
    }
}

fn number_test(cell: &Value, value: Option<&Scalar>, test: impl Fn(f64, f64) -> bool) -> bool {
    match (cell_number(cell), value.and_then(Scalar::as_number)) {
        (Some(c), Some(v)) => test(c, v),
        _ => false,
    }
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// A tree paired with its compiled patterns, ready to evaluate many rows
pub struct PreparedFilter<'a> {
    config: &'a FilterConfig,
    patterns: PatternCache,
}

impl<'a> PreparedFilter<'a> {
    pub fn new(config: &'a FilterConfig) -> Self {
        Self {
            config,
            patterns: PatternCache::for_config(config),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let evaluator = RowEvaluator::new(row, &self.patterns);
        match self.config.accept(&evaluator) {
            Ok(matched) => matched,
            Err(never) => match never {},
        }
    }
}

/// Evaluate a single node against a row.
///
/// Compiles the node's patterns on every call; use [`PreparedFilter`] when
/// evaluating many rows.
pub fn evaluate(row: &Row, node: &FilterNode) -> bool {
    let patterns = PatternCache::for_node(node);
    let evaluator = RowEvaluator::new(row, &patterns);
    match node.accept(&evaluator) {
        Ok(matched) => matched,
        Err(never) => match never {},
    }
}

#[cfg(test)]
#[path = "evaluate_tests.rs"]
mod tests;
