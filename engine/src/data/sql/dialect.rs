//! SQL dialect trait for multi-engine support
//!
//! This trait defines the interface for generating engine-specific SQL syntax.

use crate::domain::filters::format_number;

/// Per-column aggregate of a statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Avg,
    Median,
    Stddev,
    Sum,
    Count,
}

impl Aggregate {
    pub const ALL: [Aggregate; 7] = [
        Aggregate::Min,
        Aggregate::Max,
        Aggregate::Avg,
        Aggregate::Median,
        Aggregate::Stddev,
        Aggregate::Sum,
        Aggregate::Count,
    ];

    /// Suffix of the result column alias (`<col>__min`)
    pub fn suffix(&self) -> &'static str {
        match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Avg => "avg",
            Aggregate::Median => "median",
            Aggregate::Stddev => "stddev",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
        }
    }
}

/// SQL dialect trait for generating engine-specific SQL
///
/// Different engines have different syntax for:
/// - Identifier and string quoting
/// - Type casting and lenient numeric parsing
/// - Case folding, LIKE escaping and regex matching
/// - Reading a snapshot file
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Quote an identifier
    ///
    /// - DuckDB: `"col"` with `""` doubling
    /// - ClickHouse: `` `col` `` with backslash escapes
    fn quote_identifier(&self, name: &str) -> String;

    /// Quote a string literal
    ///
    /// - DuckDB: `'x'` with `''` doubling
    /// - ClickHouse: `'x'` with backslash escapes
    fn quote_string(&self, s: &str) -> String;

    /// Render a finite number literal
    fn number_literal(&self, n: f64) -> String {
        format_number(n)
    }

    /// Render a boolean literal
    fn bool_literal(&self, b: bool) -> &'static str {
        if b { "TRUE" } else { "FALSE" }
    }

    /// Cast an expression to string type
    ///
    /// - DuckDB: `expr::VARCHAR`
    /// - ClickHouse: `toString(expr)`
    fn cast_to_string(&self, expr: &str) -> String;

    /// Cast a boolean expression to 1/0
    ///
    /// - DuckDB: `expr::INTEGER`
    /// - ClickHouse: `toUInt8(expr)`
    fn cast_bool_to_number(&self, expr: &str) -> String;

    /// Parse a string expression as a finite double, NULL when it does not
    /// parse or is NaN/infinite
    fn try_cast_number(&self, expr: &str) -> String;

    /// Unicode lowercase
    fn lower(&self, expr: &str) -> String;

    /// `expr [NOT] LIKE pattern` where `pattern` escapes metacharacters
    /// with backslash
    fn like(&self, expr: &str, pattern: &str, negated: bool) -> String;

    /// Case-insensitive regex search, or `None` when the engine has no
    /// regex function
    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String>;

    /// Table expression reading a Parquet snapshot
    ///
    /// - DuckDB: `read_parquet('path', file_row_number = true)`
    /// - ClickHouse: `file('path', 'Parquet')`
    fn snapshot_source(&self, path: &str) -> String;

    /// Column of the snapshot source holding each row's position in the
    /// file, used as the final ordering term
    fn row_order_column(&self) -> Option<&'static str> {
        None
    }

    /// Select list for every snapshot column, leaving out the row order
    /// column
    fn all_columns(&self) -> String {
        "*".to_string()
    }

    /// Aggregate function call over a numeric expression
    fn aggregate(&self, aggregate: Aggregate, expr: &str) -> String;

    /// Generate LIMIT/OFFSET clause
    fn limit_offset(&self, limit: u32, offset: u64) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }

    /// Generate ORDER BY term with NULL handling
    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String {
        let dir = if desc { "DESC" } else { "ASC" };
        let nulls = if nulls_last {
            "NULLS LAST"
        } else {
            "NULLS FIRST"
        };
        format!("{} {} {}", col, dir, nulls)
    }
}
