//! Statement assembly over a snapshot
//!
//! Wraps a compiled filter into the select, count and statistics statements
//! run against a snapshot file.

use super::compiler::SqlCompiler;
use super::dialect::Aggregate;
use crate::core::constants::DEFAULT_MAX_PAGE_SIZE;
use crate::domain::filters::{FilterConfig, FilterError};
use crate::domain::query::{QueryParams, Scope, SortDirection};

/// A filtered, paged query
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub filter: &'a FilterConfig,
    pub params: &'a QueryParams,
}

impl<'a> QueryRequest<'a> {
    pub fn new(filter: &'a FilterConfig, params: &'a QueryParams) -> Self {
        Self { filter, params }
    }
}

/// Per-column statistics, filtered only by scope
#[derive(Debug, Clone, Default)]
pub struct StatsRequest {
    pub columns: Vec<String>,
    pub scope: Option<Scope>,
}

pub struct QueryAssembler<'a> {
    compiler: SqlCompiler<'a>,
    source: String,
    max_page_size: u32,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(compiler: SqlCompiler<'a>, snapshot_path: &str) -> Self {
        let source = compiler.dialect().snapshot_source(snapshot_path);
        Self {
            compiler,
            source,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Read from `source` instead of the bare snapshot file
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn compiler(&self) -> &SqlCompiler<'a> {
        &self.compiler
    }

    /// `SELECT ... WHERE ... [ORDER BY ...] LIMIT n OFFSET m`
    ///
    /// Ties in the sort column, and unsorted pages, keep file order when the
    /// dialect exposes a row order column.
    pub fn select(&self, request: &QueryRequest<'_>) -> Result<String, FilterError> {
        let params = request.params;
        let dialect = self.compiler.dialect();

        let projection = match &params.projection {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|c| self.compiler.column(c).map(|(quoted, _)| quoted))
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            _ => dialect.all_columns(),
        };

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            projection,
            self.source,
            self.predicate(request)?
        );

        let mut order = Vec::with_capacity(2);
        if let Some(sort) = &params.sort {
            let (column, _) = self.compiler.column(&sort.column)?;
            let desc = sort.direction == SortDirection::Desc;
            order.push(dialect.order_by_with_nulls(&column, desc, true));
        }
        if let Some(row_order) = dialect.row_order_column() {
            order.push(row_order.to_string());
        }
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        sql.push(' ');
        sql.push_str(&dialect.limit_offset(
            params.effective_page_size(self.max_page_size),
            params.offset(self.max_page_size),
        ));

        tracing::debug!(sql = %sql, "Assembled select statement");
        Ok(sql)
    }

    /// Total matching rows, ignoring order and pagination
    pub fn count(&self, request: &QueryRequest<'_>) -> Result<String, FilterError> {
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT * FROM {} WHERE {}) AS filtered",
            self.source,
            self.predicate(request)?
        );
        tracing::debug!(sql = %sql, "Assembled count statement");
        Ok(sql)
    }

    /// MIN/MAX/AVG/MEDIAN/STDDEV/SUM/COUNT per numeric column
    pub fn stats(&self, request: &StatsRequest) -> Result<String, FilterError> {
        if request.columns.is_empty() {
            return Err(FilterError::validation(
                "columns",
                "at least one column is required",
            ));
        }

        let dialect = self.compiler.dialect();
        let mut selects = Vec::with_capacity(request.columns.len() * Aggregate::ALL.len());
        for name in &request.columns {
            let (column, kind) = self.compiler.column(name)?;
            if !kind.is_numeric() {
                return Err(FilterError::NonNumericColumn {
                    column: name.clone(),
                });
            }
            for aggregate in Aggregate::ALL {
                let alias = dialect.quote_identifier(&format!("{}__{}", name, aggregate.suffix()));
                selects.push(format!("{} AS {}", dialect.aggregate(aggregate, &column), alias));
            }
        }

        let mut sql = format!("SELECT {} FROM {}", selects.join(", "), self.source);
        if let Some(scope) = &request.scope {
            sql.push_str(" WHERE ");
            sql.push_str(&self.scope_predicate(scope)?);
        }
        tracing::debug!(sql = %sql, "Assembled stats statement");
        Ok(sql)
    }

    /// Scope, search and filter joined with AND
    fn predicate(&self, request: &QueryRequest<'_>) -> Result<String, FilterError> {
        let mut parts = Vec::with_capacity(3);
        if let Some(scope) = &request.params.scope {
            parts.push(self.scope_predicate(scope)?);
        }
        if let Some(search) = request.params.search_text() {
            parts.push(self.search_predicate(search));
        }
        parts.push(self.compiler.compile(request.filter)?);
        Ok(parts.join(" AND "))
    }

    fn scope_predicate(&self, scope: &Scope) -> Result<String, FilterError> {
        let (column, _) = self.compiler.column(&scope.column)?;
        Ok(format!(
            "{} = {}",
            column,
            self.compiler.dialect().quote_string(&scope.value)
        ))
    }

    /// Case-insensitive substring match over every schema column
    fn search_predicate(&self, search: &str) -> String {
        let dialect = self.compiler.dialect();
        let terms: Vec<String> = self
            .compiler
            .schema()
            .columns()
            .iter()
            .map(|meta| {
                let column = dialect.quote_identifier(&meta.name);
                self.compiler.contains_expr(&column, meta.kind, search)
            })
            .collect();
        if terms.is_empty() {
            return dialect.bool_literal(false).to_string();
        }
        format!("({})", terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::{ClickhouseDialect, DuckdbDialect, RegexMode};
    use crate::domain::filters::{FilterLeaf, Operator};
    use crate::domain::query::SortSpec;
    use crate::domain::schema::{ColumnKind, ColumnMeta, ColumnSchema};

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec![
            ColumnMeta::new("name", ColumnKind::Text),
            ColumnMeta::new("age", ColumnKind::Number),
            ColumnMeta::new("_sheet", ColumnKind::Text),
        ])
    }

    fn adults() -> FilterConfig {
        FilterConfig::and(vec![
            FilterLeaf::new("age", Operator::GreaterThanOrEqual).with_value(18).into(),
        ])
    }

    #[test]
    fn select_with_defaults() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "/data/snap.parquet",
        );
        let filter = adults();
        let params = QueryParams::default();
        assert_eq!(
            assembler.select(&QueryRequest::new(&filter, &params)).unwrap(),
            concat!(
                "SELECT * EXCLUDE (file_row_number) ",
                "FROM read_parquet('/data/snap.parquet', file_row_number = true) ",
                "WHERE (\"age\" >= 18) ORDER BY file_row_number LIMIT 50 OFFSET 0"
            )
        );
    }

    #[test]
    fn select_with_everything() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        )
        .with_max_page_size(100);
        let filter = adults();
        let params = QueryParams {
            sort: Some(SortSpec::parse("age:desc").unwrap()),
            page: 3,
            page_size: 1000,
            search: Some(" Al ".to_string()),
            scope: Some(Scope::new("_sheet", "Sheet1")),
            projection: Some(vec!["name".to_string(), "age".to_string()]),
        };
        let expected = concat!(
            "SELECT \"name\", \"age\" FROM read_parquet('s.parquet', file_row_number = true) ",
            "WHERE \"_sheet\" = 'Sheet1' ",
            "AND (LOWER(\"name\") LIKE '%al%' ESCAPE '\\' ",
            "OR LOWER(\"age\"::VARCHAR) LIKE '%al%' ESCAPE '\\' ",
            "OR LOWER(\"_sheet\") LIKE '%al%' ESCAPE '\\') ",
            "AND (\"age\" >= 18) ",
            "ORDER BY \"age\" DESC NULLS LAST, file_row_number LIMIT 100 OFFSET 200"
        );
        assert_eq!(
            assembler.select(&QueryRequest::new(&filter, &params)).unwrap(),
            expected
        );
    }

    #[test]
    fn select_rejects_unknown_sort_and_projection() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        );
        let filter = FilterConfig::default();
        let sort = QueryParams {
            sort: Some(SortSpec::parse("salary").unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            assembler.select(&QueryRequest::new(&filter, &sort)),
            Err(FilterError::UnknownColumn { .. })
        ));
        let projection = QueryParams {
            projection: Some(vec!["salary".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            assembler.select(&QueryRequest::new(&filter, &projection)),
            Err(FilterError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn count_ignores_order_and_paging() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        );
        let filter = adults();
        let params = QueryParams {
            sort: Some(SortSpec::parse("age").unwrap()),
            page: 4,
            ..Default::default()
        };
        assert_eq!(
            assembler.count(&QueryRequest::new(&filter, &params)).unwrap(),
            concat!(
                "SELECT COUNT(*) FROM (SELECT * FROM read_parquet('s.parquet', file_row_number = true) ",
                "WHERE (\"age\" >= 18)) AS filtered"
            )
        );
    }

    #[test]
    fn select_over_custom_source() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        )
        .with_source("(SELECT * FROM read_parquet('s.parquet', file_row_number = true)) AS snapshot");
        let filter = FilterConfig::default();
        let params = QueryParams {
            sort: Some(SortSpec::parse("name").unwrap()),
            ..Default::default()
        };
        assert_eq!(
            assembler.select(&QueryRequest::new(&filter, &params)).unwrap(),
            concat!(
                "SELECT * EXCLUDE (file_row_number) ",
                "FROM (SELECT * FROM read_parquet('s.parquet', file_row_number = true)) AS snapshot ",
                "WHERE TRUE ORDER BY \"name\" ASC NULLS LAST, file_row_number LIMIT 50 OFFSET 0"
            )
        );
    }

    #[test]
    fn clickhouse_select_has_no_row_order() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&ClickhouseDialect, &schema, RegexMode::Native),
            "s.parquet",
        );
        let filter = adults();
        let params = QueryParams {
            sort: Some(SortSpec::parse("age").unwrap()),
            ..Default::default()
        };
        let sql = assembler.select(&QueryRequest::new(&filter, &params)).unwrap();
        assert!(sql.starts_with("SELECT * FROM file('s.parquet', 'Parquet') WHERE"));
        assert!(sql.ends_with("ORDER BY `age` ASC NULLS LAST LIMIT 50 OFFSET 0"));
    }

    #[test]
    fn stats_for_numeric_columns() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        );
        let request = StatsRequest {
            columns: vec!["age".to_string()],
            scope: Some(Scope::new("_sheet", "S1")),
        };
        let expected = concat!(
            "SELECT MIN(\"age\") AS \"age__min\", MAX(\"age\") AS \"age__max\", ",
            "AVG(\"age\") AS \"age__avg\", MEDIAN(\"age\") AS \"age__median\", ",
            "STDDEV_SAMP(\"age\") AS \"age__stddev\", SUM(\"age\") AS \"age__sum\", ",
            "COUNT(\"age\") AS \"age__count\" ",
            "FROM read_parquet('s.parquet', file_row_number = true) WHERE \"_sheet\" = 'S1'"
        );
        assert_eq!(assembler.stats(&request).unwrap(), expected);
    }

    #[test]
    fn stats_rejects_non_numeric_and_empty() {
        let schema = schema();
        let assembler = QueryAssembler::new(
            SqlCompiler::new(&DuckdbDialect, &schema, RegexMode::Native),
            "s.parquet",
        );
        let request = StatsRequest {
            columns: vec!["name".to_string()],
            scope: None,
        };
        assert_eq!(
            assembler.stats(&request).unwrap_err(),
            FilterError::NonNumericColumn {
                column: "name".to_string()
            }
        );
        assert!(assembler.stats(&StatsRequest::default()).is_err());
    }
}
