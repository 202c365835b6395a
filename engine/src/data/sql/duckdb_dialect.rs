//! DuckDB SQL dialect implementation

use super::dialect::Aggregate;
use super::SqlDialect;
use crate::domain::filters::format_number;
use crate::utils::sql::quote_doubling;

/// Integral literals at or above this magnitude are written as doubles
const INTEGER_LITERAL_LIMIT: f64 = 1e15;

/// Virtual column `read_parquet` adds with `file_row_number = true`
const FILE_ROW_NUMBER: &str = "file_row_number";

/// DuckDB SQL dialect
pub struct DuckdbDialect;

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_doubling(name, '"')
    }

    fn quote_string(&self, s: &str) -> String {
        quote_doubling(s, '\'')
    }

    fn number_literal(&self, n: f64) -> String {
        // Bare decimals parse as DECIMAL; keep comparisons in DOUBLE
        if n.fract() == 0.0 && n.abs() < INTEGER_LITERAL_LIMIT {
            format_number(n)
        } else {
            format!("{}::DOUBLE", n)
        }
    }

    fn cast_to_string(&self, expr: &str) -> String {
        format!("{}::VARCHAR", expr)
    }

    fn cast_bool_to_number(&self, expr: &str) -> String {
        format!("{}::INTEGER", expr)
    }

    fn try_cast_number(&self, expr: &str) -> String {
        // TRY_CAST accepts `1_000`; digit separators are not numbers here
        format!(
            "CASE WHEN NOT contains({e}, '_') AND isfinite(TRY_CAST({e} AS DOUBLE)) \
             THEN TRY_CAST({e} AS DOUBLE) END",
            e = expr
        )
    }

    fn lower(&self, expr: &str) -> String {
        format!("LOWER({})", expr)
    }

    fn like(&self, expr: &str, pattern: &str, negated: bool) -> String {
        let not = if negated { "NOT " } else { "" };
        format!(
            "{} {}LIKE {} ESCAPE '\\'",
            expr,
            not,
            self.quote_string(pattern)
        )
    }

    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String> {
        Some(format!(
            "regexp_matches({}, {}, 'i')",
            expr,
            self.quote_string(pattern)
        ))
    }

    fn snapshot_source(&self, path: &str) -> String {
        format!(
            "read_parquet({}, {} = true)",
            self.quote_string(path),
            FILE_ROW_NUMBER
        )
    }

    fn row_order_column(&self) -> Option<&'static str> {
        Some(FILE_ROW_NUMBER)
    }

    fn all_columns(&self) -> String {
        format!("* EXCLUDE ({})", FILE_ROW_NUMBER)
    }

    fn aggregate(&self, aggregate: Aggregate, expr: &str) -> String {
        let func = match aggregate {
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
            Aggregate::Median => "MEDIAN",
            Aggregate::Stddev => "STDDEV_SAMP",
            Aggregate::Sum => "SUM",
            Aggregate::Count => "COUNT",
        };
        format!("{}({})", func, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let dialect = DuckdbDialect;
        assert_eq!(dialect.quote_identifier("my \"col\""), "\"my \"\"col\"\"\"");
        assert_eq!(dialect.quote_string("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_number_literal() {
        let dialect = DuckdbDialect;
        assert_eq!(dialect.number_literal(18.0), "18");
        assert_eq!(dialect.number_literal(-3.0), "-3");
        assert_eq!(dialect.number_literal(7.5), "7.5::DOUBLE");
    }

    #[test]
    fn test_try_cast_number() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.try_cast_number("\"code\""),
            "CASE WHEN NOT contains(\"code\", '_') AND isfinite(TRY_CAST(\"code\" AS DOUBLE)) \
             THEN TRY_CAST(\"code\" AS DOUBLE) END"
        );
    }

    #[test]
    fn test_like() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.like("LOWER(\"name\")", "%ali%", false),
            "LOWER(\"name\") LIKE '%ali%' ESCAPE '\\'"
        );
        assert_eq!(
            dialect.like("x", "a%", true),
            "x NOT LIKE 'a%' ESCAPE '\\'"
        );
    }

    #[test]
    fn test_regex_match() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.regex_match("\"name\"", "^a'b").as_deref(),
            Some("regexp_matches(\"name\", '^a''b', 'i')")
        );
    }

    #[test]
    fn test_snapshot_source_and_aggregates() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.snapshot_source("/data/it's.parquet"),
            "read_parquet('/data/it''s.parquet', file_row_number = true)"
        );
        assert_eq!(dialect.row_order_column(), Some("file_row_number"));
        assert_eq!(dialect.all_columns(), "* EXCLUDE (file_row_number)");
        assert_eq!(dialect.aggregate(Aggregate::Stddev, "\"age\""), "STDDEV_SAMP(\"age\")");
    }

    #[test]
    fn test_order_by_with_nulls() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.order_by_with_nulls("\"age\"", true, true),
            "\"age\" DESC NULLS LAST"
        );
        assert_eq!(
            dialect.order_by_with_nulls("\"name\"", false, false),
            "\"name\" ASC NULLS FIRST"
        );
    }
}
