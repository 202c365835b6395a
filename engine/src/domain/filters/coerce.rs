//! Value coercion rules
//!
//! One definition of "the text of a value" and "the number of a value",
//! used by the in-memory evaluator on cells and by the SQL compiler on the
//! filter side, so both backends agree on what a predicate means.

use std::borrow::Cow;

use chrono::SecondsFormat;
use serde_json::Value;

use super::types::Scalar;

/// Integral values below this magnitude print without a fractional part
const INTEGER_PRINT_LIMIT: f64 = 1e15;

/// Parse text as a finite number, ignoring surrounding whitespace
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Canonical text form of a number: `18` rather than `18.0`
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < INTEGER_PRINT_LIMIT {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Text form of a cell. `None` for null.
pub fn cell_text(cell: &Value) -> Option<Cow<'_, str>> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Cow::Owned(cell.to_string())),
    }
}

/// Numeric coercion of a cell: numbers as-is, booleans as 1/0, text parsed
pub fn cell_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_number(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl Scalar {
    /// Text form used for string comparison and LIKE patterns
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Text(s) => Cow::Borrowed(s.as_str()),
            Scalar::Number(n) => Cow::Owned(format_number(*n)),
            Scalar::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Scalar::Date(d) => Cow::Owned(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }

    /// Numeric coercion, same rules as [`cell_number`]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => parse_number(s),
            Scalar::Date(_) => None,
        }
    }
}
