//! Filter error types

use thiserror::Error;

use super::types::Operator;

/// Errors raised while parsing, validating or compiling a filter tree.
///
/// Coercion failures during evaluation are never errors: a cell that does
/// not parse as a number, or a pattern that does not compile, makes that
/// predicate false.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter at {path}: {message}")]
    Validation { path: String, message: String },

    #[error("Unknown filter operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("Operator {operator} is not supported by the {backend} backend")]
    UnsupportedOperatorForBackend {
        operator: Operator,
        backend: &'static str,
    },

    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("Column {column} is not numeric")]
    NonNumericColumn { column: String },

    #[error("Invalid filter JSON: {0}")]
    InvalidJson(String),

    #[error("Filter JSON exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },
}

impl FilterError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "INVALID_FILTER",
            Self::UnknownOperator { .. } => "UNKNOWN_FILTER_OPERATOR",
            Self::UnsupportedOperatorForBackend { .. } => "UNSUPPORTED_FILTER_OPERATOR",
            Self::UnknownColumn { .. } => "INVALID_FILTER_COLUMN",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::InvalidJson(_) => "INVALID_FILTER_JSON",
            Self::TooLarge { .. } => "FILTER_JSON_TOO_LARGE",
        }
    }

    /// HTTP status the API layer should answer with.
    ///
    /// Every filter error is a client error; engine I/O failures surface as
    /// `DuckdbError` instead.
    pub fn status_code(&self) -> u16 {
        400
    }
}
