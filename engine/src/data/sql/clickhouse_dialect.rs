//! ClickHouse SQL dialect implementation

use super::dialect::Aggregate;
use super::SqlDialect;
use crate::utils::sql::quote_backslash;

/// ClickHouse SQL dialect
pub struct ClickhouseDialect;

impl SqlDialect for ClickhouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_backslash(name, '`')
    }

    fn quote_string(&self, s: &str) -> String {
        quote_backslash(s, '\'')
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b { "true" } else { "false" }
    }

    fn cast_to_string(&self, expr: &str) -> String {
        format!("toString({})", expr)
    }

    fn cast_bool_to_number(&self, expr: &str) -> String {
        format!("toUInt8({})", expr)
    }

    fn try_cast_number(&self, expr: &str) -> String {
        format!(
            "if(isFinite(toFloat64OrNull({e})), toFloat64OrNull({e}), NULL)",
            e = expr
        )
    }

    fn lower(&self, expr: &str) -> String {
        format!("lowerUTF8({})", expr)
    }

    fn like(&self, expr: &str, pattern: &str, negated: bool) -> String {
        // Backslash is ClickHouse's built-in LIKE escape
        let not = if negated { "NOT " } else { "" };
        format!("{} {}LIKE {}", expr, not, self.quote_string(pattern))
    }

    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String> {
        Some(format!(
            "match({}, {})",
            expr,
            self.quote_string(&format!("(?i){}", pattern))
        ))
    }

    fn snapshot_source(&self, path: &str) -> String {
        format!("file({}, 'Parquet')", self.quote_string(path))
    }

    fn aggregate(&self, aggregate: Aggregate, expr: &str) -> String {
        let func = match aggregate {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Avg => "avg",
            Aggregate::Median => "median",
            Aggregate::Stddev => "stddevSamp",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
        };
        format!("{}({})", func, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let dialect = ClickhouseDialect;
        assert_eq!(dialect.quote_identifier("a`b"), "`a\\`b`");
        assert_eq!(dialect.quote_string("O'Brien"), "'O\\'Brien'");
    }

    #[test]
    fn test_like_keeps_backslash_escapes() {
        let dialect = ClickhouseDialect;
        assert_eq!(
            dialect.like("lowerUTF8(`code`)", "%100\\%%", false),
            "lowerUTF8(`code`) LIKE '%100\\\\%%'"
        );
    }

    #[test]
    fn test_try_cast_number() {
        let dialect = ClickhouseDialect;
        assert_eq!(
            dialect.try_cast_number("`code`"),
            "if(isFinite(toFloat64OrNull(`code`)), toFloat64OrNull(`code`), NULL)"
        );
    }

    #[test]
    fn test_regex_match_is_case_insensitive() {
        let dialect = ClickhouseDialect;
        assert_eq!(
            dialect.regex_match("`name`", "^al").as_deref(),
            Some("match(`name`, '(?i)^al')")
        );
    }

    #[test]
    fn test_literals_and_source() {
        let dialect = ClickhouseDialect;
        assert_eq!(dialect.bool_literal(true), "true");
        assert_eq!(dialect.number_literal(7.5), "7.5");
        assert_eq!(
            dialect.snapshot_source("/tmp/s.parquet"),
            "file('/tmp/s.parquet', 'Parquet')"
        );
        assert_eq!(dialect.aggregate(Aggregate::Stddev, "`age`"), "stddevSamp(`age`)");
        assert_eq!(dialect.row_order_column(), None);
        assert_eq!(dialect.all_columns(), "*");
    }
}
