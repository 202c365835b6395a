//! Filter tree to SQL compilation
//!
//! Produces a boolean expression with every value inlined as a quoted
//! literal, so identical trees always compile to identical text. Column
//! kinds from the schema pick the comparison expression; the coercion rules
//! match the in-memory evaluator, including NULL cells satisfying negated
//! operators.

use super::RegexMode;
use super::dialect::SqlDialect;
use crate::domain::filters::{
    Combinator, FilterConfig, FilterError, FilterLeaf, FilterNode, FilterVisitor, Operator,
    Scalar, compile_pattern,
};
use crate::domain::schema::{ColumnKind, ColumnSchema};
use crate::utils::sql::escape_like_pattern;

const SQL_TRUE: &str = "TRUE";
const SQL_FALSE: &str = "FALSE";

/// Compiles validated filter trees for one dialect and schema
pub struct SqlCompiler<'a> {
    dialect: &'a dyn SqlDialect,
    schema: &'a ColumnSchema,
    regex_mode: RegexMode,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, schema: &'a ColumnSchema, regex_mode: RegexMode) -> Self {
        Self {
            dialect,
            schema,
            regex_mode,
        }
    }

    pub fn dialect(&self) -> &'a dyn SqlDialect {
        self.dialect
    }

    pub fn schema(&self) -> &'a ColumnSchema {
        self.schema
    }

    /// Compile the root of a tree
    pub fn compile(&self, config: &FilterConfig) -> Result<String, FilterError> {
        config.accept(self)
    }

    pub fn compile_node(&self, node: &FilterNode) -> Result<String, FilterError> {
        node.accept(self)
    }

    /// Quoted identifier and kind of a schema column
    pub fn column(&self, name: &str) -> Result<(String, ColumnKind), FilterError> {
        let kind = self
            .schema
            .kind(name)
            .ok_or_else(|| FilterError::UnknownColumn {
                column: name.to_string(),
            })?;
        Ok((self.dialect.quote_identifier(name), kind))
    }

    /// The column as a string expression
    pub fn text_expr(&self, column: &str, kind: ColumnKind) -> String {
        match kind {
            ColumnKind::Text => column.to_string(),
            _ => self.dialect.cast_to_string(column),
        }
    }

    /// The column as a numeric expression, NULL where it does not coerce
    pub fn numeric_expr(&self, column: &str, kind: ColumnKind) -> String {
        match kind {
            ColumnKind::Number => column.to_string(),
            ColumnKind::Boolean => self.dialect.cast_bool_to_number(column),
            _ => self
                .dialect
                .try_cast_number(&self.text_expr(column, kind)),
        }
    }

    /// Case-insensitive substring test, as used by global search
    pub fn contains_expr(&self, column: &str, kind: ColumnKind, needle: &str) -> String {
        let pattern = format!("%{}%", escape_like_pattern(&needle.to_lowercase()));
        self.lowered_like(column, kind, &pattern, false)
    }

    /// Lowercase LIKE with the value between `before` and `after` wildcards
    fn text_match(
        &self,
        column: &str,
        kind: ColumnKind,
        value: Option<&Scalar>,
        before: &str,
        after: &str,
        negated: bool,
    ) -> Option<String> {
        value.map(|v| {
            let escaped = escape_like_pattern(&v.as_text().to_lowercase());
            let pattern = format!("{}{}{}", before, escaped, after);
            self.lowered_like(column, kind, &pattern, negated)
        })
    }

    fn lowered_like(&self, column: &str, kind: ColumnKind, pattern: &str, negated: bool) -> String {
        let lowered = self.dialect.lower(&self.text_expr(column, kind));
        self.dialect.like(&lowered, pattern, negated)
    }

    fn number(&self, value: Option<&Scalar>) -> Option<String> {
        value
            .and_then(Scalar::as_number)
            .map(|n| self.dialect.number_literal(n))
    }

    fn text(&self, value: &Scalar) -> String {
        self.dialect.quote_string(&value.as_text())
    }

    /// `x = v`, or its negation when `negated`, or `None` when the value
    /// cannot match any cell
    fn equality(&self, column: &str, kind: ColumnKind, value: Option<&Scalar>, negated: bool) -> Option<String> {
        let op = if negated { "<>" } else { "=" };
        match kind {
            ColumnKind::Number => self
                .number(value)
                .map(|n| format!("{} {} {}", column, op, n)),
            _ => value.map(|v| format!("{} {} {}", self.text_expr(column, kind), op, self.text(v))),
        }
    }

    fn membership(&self, column: &str, kind: ColumnKind, values: &[Scalar], negated: bool) -> Option<String> {
        let (expr, literals): (String, Vec<String>) = match kind {
            ColumnKind::Number => (
                column.to_string(),
                values.iter().filter_map(|v| self.number(Some(v))).collect(),
            ),
            _ => (
                self.text_expr(column, kind),
                values.iter().map(|v| self.text(v)).collect(),
            ),
        };
        if literals.is_empty() {
            return None;
        }
        let op = if negated { "NOT IN" } else { "IN" };
        Some(format!("{} {} ({})", expr, op, literals.join(", ")))
    }

    fn range(&self, column: &str, kind: ColumnKind, value: Option<&Scalar>, op: &str) -> Option<String> {
        self.number(value)
            .map(|n| format!("{} {} {}", self.numeric_expr(column, kind), op, n))
    }

    fn regex(&self, leaf: &FilterLeaf, column: &str, kind: ColumnKind) -> Result<String, FilterError> {
        let unsupported = || FilterError::UnsupportedOperatorForBackend {
            operator: Operator::Regex,
            backend: self.dialect.name(),
        };
        if self.regex_mode == RegexMode::InMemoryOnly {
            return Err(unsupported());
        }
        let Some(pattern) = leaf.scalar().map(Scalar::as_text) else {
            return Ok(SQL_FALSE.to_string());
        };
        if compile_pattern(&pattern).is_none() {
            return Ok(SQL_FALSE.to_string());
        }
        self.dialect
            .regex_match(&self.text_expr(column, kind), &pattern)
            .ok_or_else(unsupported)
    }
}

/// Positive predicate, FALSE when it can never hold
fn positive(expr: Option<String>) -> String {
    expr.unwrap_or_else(|| SQL_FALSE.to_string())
}

/// Negated predicate; NULL cells satisfy it
fn negated(expr: Option<String>) -> String {
    match expr {
        Some(e) => format!("COALESCE({}, {})", e, SQL_TRUE),
        None => SQL_TRUE.to_string(),
    }
}

impl FilterVisitor for SqlCompiler<'_> {
    type Output = String;
    type Error = FilterError;

    fn visit_leaf(&self, leaf: &FilterLeaf) -> Result<String, FilterError> {
        let (col, kind) = self.column(&leaf.column)?;
        let value = leaf.scalar();
        let sql = match leaf.operator {
            Operator::Equals => positive(self.equality(&col, kind, value, false)),
            Operator::NotEquals => negated(self.equality(&col, kind, value, true)),
            Operator::Contains => positive(self.text_match(&col, kind, value, "%", "%", false)),
            Operator::NotContains => negated(self.text_match(&col, kind, value, "%", "%", true)),
            Operator::StartsWith => positive(self.text_match(&col, kind, value, "", "%", false)),
            Operator::EndsWith => positive(self.text_match(&col, kind, value, "%", "", false)),
            Operator::GreaterThan => positive(self.range(&col, kind, value, ">")),
            Operator::GreaterThanOrEqual => positive(self.range(&col, kind, value, ">=")),
            Operator::LessThan => positive(self.range(&col, kind, value, "<")),
            Operator::LessThanOrEqual => positive(self.range(&col, kind, value, "<=")),
            Operator::Between => {
                let bounds = self.number(value).zip(self.number(leaf.value2.as_ref()));
                positive(bounds.map(|(lo, hi)| {
                    format!("{} BETWEEN {} AND {}", self.numeric_expr(&col, kind), lo, hi)
                }))
            }
            Operator::In => positive(self.membership(&col, kind, leaf.list(), false)),
            Operator::NotIn => negated(self.membership(&col, kind, leaf.list(), true)),
            Operator::IsNull => match kind {
                ColumnKind::Text => format!("({c} IS NULL OR {c} = '')", c = col),
                _ => format!("{} IS NULL", col),
            },
            Operator::IsNotNull => match kind {
                ColumnKind::Text => format!("({c} IS NOT NULL AND {c} <> '')", c = col),
                _ => format!("{} IS NOT NULL", col),
            },
            Operator::Regex => self.regex(leaf, &col, kind)?,
        };
        Ok(sql)
    }

    fn visit_group(&self, combinator: Combinator, children: &[FilterNode]) -> Result<String, FilterError> {
        if children.is_empty() {
            return Ok(SQL_TRUE.to_string());
        }
        let parts = children
            .iter()
            .map(|child| child.accept(self))
            .collect::<Result<Vec<_>, _>>()?;
        let joiner = format!(" {} ", combinator.as_str());
        Ok(format!("({})", parts.join(&joiner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::{ClickhouseDialect, DuckdbDialect};
    use crate::domain::schema::ColumnMeta;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec![
            ColumnMeta::new("name", ColumnKind::Text),
            ColumnMeta::new("age", ColumnKind::Number),
            ColumnMeta::new("active", ColumnKind::Boolean),
            ColumnMeta::new("joined", ColumnKind::Temporal),
        ])
    }

    fn compile_leaf(leaf: FilterLeaf) -> Result<String, FilterError> {
        let schema = schema();
        let compiler = SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native);
        compiler.compile_node(&leaf.into())
    }

    fn sql(leaf: FilterLeaf) -> String {
        compile_leaf(leaf).unwrap()
    }

    #[test]
    fn equals_by_kind() {
        assert_eq!(sql(FilterLeaf::new("age", Operator::Equals).with_value("18")), "\"age\" = 18");
        assert_eq!(sql(FilterLeaf::new("age", Operator::Equals).with_value("x")), "FALSE");
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::Equals).with_value("O'Brien")),
            "\"name\" = 'O''Brien'"
        );
        assert_eq!(
            sql(FilterLeaf::new("active", Operator::Equals).with_value(true)),
            "\"active\"::VARCHAR = 'true'"
        );
    }

    #[test]
    fn negations_coalesce_to_true() {
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::NotEquals).with_value(18)),
            "COALESCE(\"age\" <> 18, TRUE)"
        );
        assert_eq!(sql(FilterLeaf::new("age", Operator::NotEquals).with_value("x")), "TRUE");
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::NotContains).with_value("Al")),
            "COALESCE(LOWER(\"name\") NOT LIKE '%al%' ESCAPE '\\', TRUE)"
        );
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::NotIn).with_list(["a", "b"])),
            "COALESCE(\"name\" NOT IN ('a', 'b'), TRUE)"
        );
    }

    #[test]
    fn like_operators_escape_metacharacters() {
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::Contains).with_value("100%")),
            "LOWER(\"name\") LIKE '%100\\%%' ESCAPE '\\'"
        );
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::StartsWith).with_value("B_")),
            "LOWER(\"name\") LIKE 'b\\_%' ESCAPE '\\'"
        );
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::EndsWith).with_value(5)),
            "LOWER(\"age\"::VARCHAR) LIKE '%5' ESCAPE '\\'"
        );
    }

    #[test]
    fn ranges_use_numeric_expressions() {
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::GreaterThanOrEqual).with_value(18)),
            "\"age\" >= 18"
        );
        assert_eq!(
            sql(FilterLeaf::new("active", Operator::LessThan).with_value(1)),
            "\"active\"::INTEGER < 1"
        );
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::GreaterThan).with_value(2.5)),
            concat!(
                "CASE WHEN NOT contains(\"name\", '_') AND isfinite(TRY_CAST(\"name\" AS DOUBLE)) ",
                "THEN TRY_CAST(\"name\" AS DOUBLE) END > 2.5::DOUBLE"
            )
        );
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::Between).with_value(10).with_value2("20")),
            "\"age\" BETWEEN 10 AND 20"
        );
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::Between).with_value(10).with_value2("x")),
            "FALSE"
        );
    }

    #[test]
    fn in_lists_by_kind() {
        assert_eq!(
            sql(FilterLeaf::new("age", Operator::In).with_list([
                Scalar::from(1),
                Scalar::from("2"),
                Scalar::from("x"),
            ])),
            "\"age\" IN (1, 2)"
        );
        assert_eq!(sql(FilterLeaf::new("age", Operator::In).with_list(["x"])), "FALSE");
        assert_eq!(sql(FilterLeaf::new("age", Operator::NotIn).with_list(["x"])), "TRUE");
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::In).with_list([Scalar::from("a"), Scalar::from(3)])),
            "\"name\" IN ('a', '3')"
        );
    }

    #[test]
    fn null_predicates_by_kind() {
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::IsNull)),
            "(\"name\" IS NULL OR \"name\" = '')"
        );
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::IsNotNull).with_value("ignored")),
            "(\"name\" IS NOT NULL AND \"name\" <> '')"
        );
        assert_eq!(sql(FilterLeaf::new("age", Operator::IsNull)), "\"age\" IS NULL");
        assert_eq!(sql(FilterLeaf::new("joined", Operator::IsNotNull)), "\"joined\" IS NOT NULL");
    }

    #[test]
    fn regex_native_and_invalid() {
        assert_eq!(
            sql(FilterLeaf::new("name", Operator::Regex).with_value("^a")),
            "regexp_matches(\"name\", '^a', 'i')"
        );
        assert_eq!(sql(FilterLeaf::new("name", Operator::Regex).with_value("(")), "FALSE");
    }

    #[test]
    fn regex_in_memory_only_is_unsupported() {
        let schema = schema();
        let compiler = SqlCompiler::new(&ClickhouseDialect, &schema, RegexMode::InMemoryOnly);
        let leaf: FilterNode = FilterLeaf::new("name", Operator::Regex).with_value("^a").into();
        assert_eq!(
            compiler.compile_node(&leaf).unwrap_err(),
            FilterError::UnsupportedOperatorForBackend {
                operator: Operator::Regex,
                backend: "clickhouse",
            }
        );
    }

    #[test]
    fn unknown_column_is_an_error() {
        assert_eq!(
            compile_leaf(FilterLeaf::new("salary", Operator::IsNull)).unwrap_err(),
            FilterError::UnknownColumn {
                column: "salary".to_string()
            }
        );
    }

    #[test]
    fn nested_groups_keep_order_and_shape() {
        let schema = schema();
        let compiler = SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native);
        let config = FilterConfig::and(vec![
            FilterLeaf::new("age", Operator::GreaterThanOrEqual).with_value(18).into(),
            FilterNode::or(vec![
                FilterLeaf::new("name", Operator::Equals).with_value("active").into(),
                FilterLeaf::new("name", Operator::IsNull).into(),
                FilterNode::and(vec![]),
            ]),
        ]);
        let expected = "(\"age\" >= 18 AND (\"name\" = 'active' OR (\"name\" IS NULL OR \"name\" = '') OR TRUE))";
        assert_eq!(compiler.compile(&config).unwrap(), expected);
        assert_eq!(compiler.compile(&config).unwrap(), expected);
        assert_eq!(compiler.compile(&FilterConfig::default()).unwrap(), "TRUE");
    }

    #[test]
    fn clickhouse_output() {
        let schema = schema();
        let compiler = SqlCompiler::new(&ClickhouseDialect, &schema, RegexMode::Native);
        let config = FilterConfig::or(vec![
            FilterLeaf::new("name", Operator::Contains).with_value("it's").into(),
            FilterLeaf::new("active", Operator::Equals).with_value(false).into(),
        ]);
        assert_eq!(
            compiler.compile(&config).unwrap(),
            "(lowerUTF8(`name`) LIKE '%it\\'s%' OR toString(`active`) = 'false')"
        );
    }
}
