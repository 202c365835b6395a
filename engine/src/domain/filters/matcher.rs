//! Row matching over materialized datasets
//!
//! Applies global search and a filter tree to a row array, and provides the
//! in-memory sort and pagination used when a paged query is served without
//! SQL.

use std::cmp::Ordering;

use serde_json::Value;

use super::coerce::{cell_number, cell_text};
use super::evaluate::PreparedFilter;
use super::types::{FilterConfig, Row};
use crate::domain::query::{QueryParams, Scope, SortDirection, SortSpec};

/// Scope, search and filter over rows, preserving input order
pub struct RowMatcher<'a> {
    filter: PreparedFilter<'a>,
    search: Option<String>,
    columns: Option<&'a [String]>,
    scope: Option<&'a Scope>,
}

impl<'a> RowMatcher<'a> {
    pub fn new(config: &'a FilterConfig) -> Self {
        Self {
            filter: PreparedFilter::new(config),
            search: None,
            columns: None,
            scope: None,
        }
    }

    /// Keep only rows whose scope column equals the scope value exactly
    pub fn with_scope(mut self, scope: Option<&'a Scope>) -> Self {
        self.scope = scope;
        self
    }

    /// Case-insensitive substring search; blank input disables it
    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        self
    }

    /// Restrict global search to these columns instead of every row key
    pub fn with_columns(mut self, columns: &'a [String]) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.matches_scope(row) && self.matches_search(row) && self.filter.matches(row)
    }

    pub fn filter<'r>(&self, rows: &'r [Row]) -> Vec<&'r Row> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }

    fn matches_scope(&self, row: &Row) -> bool {
        let Some(scope) = self.scope else {
            return true;
        };
        row.get(&scope.column)
            .and_then(cell_text)
            .is_some_and(|text| text == scope.value.as_str())
    }

    fn matches_search(&self, row: &Row) -> bool {
        let Some(needle) = self.search.as_deref() else {
            return true;
        };
        let hit = |cell: &Value| {
            cell_text(cell).is_some_and(|text| text.to_lowercase().contains(needle))
        };
        match self.columns {
            Some(columns) => columns
                .iter()
                .filter_map(|c| row.get(c))
                .any(hit),
            None => row.values().any(hit),
        }
    }
}

/// Filter rows with optional global search over every column
pub fn match_rows<'r>(rows: &'r [Row], config: &FilterConfig, search: Option<&str>) -> Vec<&'r Row> {
    RowMatcher::new(config).with_search(search).filter(rows)
}

/// One page of matched rows plus the total match count
#[derive(Debug)]
pub struct RowPage<'r> {
    pub rows: Vec<&'r Row>,
    pub total: usize,
}

/// Serve a paged query from memory: scope, search, filter, sort, then page
pub fn query_rows<'r>(
    rows: &'r [Row],
    config: &FilterConfig,
    params: &QueryParams,
    max_page_size: u32,
) -> RowPage<'r> {
    let mut matched = RowMatcher::new(config)
        .with_scope(params.scope.as_ref())
        .with_search(params.search_text())
        .filter(rows);
    if let Some(sort) = &params.sort {
        sort_rows(&mut matched, sort);
    }
    let total = matched.len();
    let rows = paginate(
        matched,
        params.effective_page(),
        params.effective_page_size(max_page_size),
    );
    RowPage { rows, total }
}

/// Stable sort by one column, nulls last in either direction
pub fn sort_rows(rows: &mut [&Row], sort: &SortSpec) {
    rows.sort_by(|a, b| {
        let left = a.get(&sort.column).unwrap_or(&Value::Null);
        let right = b.get(&sort.column).unwrap_or(&Value::Null);
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare_cells(left, right);
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        }
    });
}

/// Numbers and booleans order by value before text, text orders bytewise
fn compare_cells(left: &Value, right: &Value) -> Ordering {
    let numeric = |v: &Value| match v {
        Value::Number(_) | Value::Bool(_) => cell_number(v),
        _ => None,
    };
    match (numeric(left), numeric(right)) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => cell_text(left).cmp(&cell_text(right)),
    }
}

/// One 1-based page of `items`; page 0 reads as page 1
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Vec<T> {
    let size = page_size.max(1) as usize;
    let offset = (page.max(1) as usize - 1).saturating_mul(size);
    items.into_iter().skip(offset).take(size).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::filters::types::{FilterLeaf, Operator};

    fn rows() -> Vec<Row> {
        json!([
            {"name": "Alice", "age": 30, "city": "Paris"},
            {"name": "Bob", "age": 17, "city": "Berlin"},
            {"name": "Carol", "age": null, "city": "Lisbon"},
        ])
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    fn names(rows: &[&Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn empty_search_is_noop() {
        let data = rows();
        let config = FilterConfig::default();
        assert_eq!(match_rows(&data, &config, None).len(), 3);
        assert_eq!(match_rows(&data, &config, Some("")).len(), 3);
        assert_eq!(match_rows(&data, &config, Some("   ")).len(), 3);
    }

    #[test]
    fn search_hits_any_column_case_insensitively() {
        let data = rows();
        let config = FilterConfig::default();
        assert_eq!(names(&match_rows(&data, &config, Some("BER"))), vec!["Bob"]);
        assert_eq!(names(&match_rows(&data, &config, Some("17"))), vec!["Bob"]);
        assert_eq!(
            names(&match_rows(&data, &config, Some("a"))),
            vec!["Alice", "Carol"]
        );
    }

    #[test]
    fn search_is_anded_with_filter() {
        let data = rows();
        let config = FilterConfig::and(vec![
            FilterLeaf::new("age", Operator::IsNotNull).into(),
        ]);
        assert_eq!(names(&match_rows(&data, &config, Some("a"))), vec!["Alice"]);
    }

    #[test]
    fn search_restricted_to_columns() {
        let data = rows();
        let config = FilterConfig::default();
        let columns = vec!["name".to_string()];
        let matcher = RowMatcher::new(&config)
            .with_search(Some("paris"))
            .with_columns(&columns);
        assert!(matcher.filter(&data).is_empty());
    }

    #[test]
    fn sort_puts_nulls_last_both_ways() {
        let data = rows();
        let mut refs: Vec<&Row> = data.iter().collect();

        sort_rows(&mut refs, &SortSpec::new("age", SortDirection::Asc));
        assert_eq!(names(&refs), vec!["Bob", "Alice", "Carol"]);

        sort_rows(&mut refs, &SortSpec::new("age", SortDirection::Desc));
        assert_eq!(names(&refs), vec!["Alice", "Bob", "Carol"]);

        sort_rows(&mut refs, &SortSpec::new("city", SortDirection::Asc));
        assert_eq!(names(&refs), vec!["Bob", "Carol", "Alice"]);
    }

    #[test]
    fn sort_is_stable() {
        let data: Vec<Row> = (0..4)
            .map(|i| json!({"k": i % 2, "name": i.to_string()}).as_object().unwrap().clone())
            .collect();
        let mut refs: Vec<&Row> = data.iter().collect();
        sort_rows(&mut refs, &SortSpec::new("k", SortDirection::Asc));
        assert_eq!(names(&refs), vec!["0", "2", "1", "3"]);
    }

    #[test]
    fn scope_requires_exact_text() {
        let data = rows();
        let config = FilterConfig::default();
        let scope = Scope::new("city", "Paris");
        let matcher = RowMatcher::new(&config).with_scope(Some(&scope));
        assert_eq!(names(&matcher.filter(&data)), vec!["Alice"]);

        let scope = Scope::new("city", "paris");
        let matcher = RowMatcher::new(&config).with_scope(Some(&scope));
        assert!(matcher.filter(&data).is_empty());
    }

    #[test]
    fn query_rows_sorts_then_pages() {
        let data = rows();
        let config = FilterConfig::default();
        let params = QueryParams {
            sort: Some(SortSpec::new("name", SortDirection::Desc)),
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let page = query_rows(&data, &config, &params, 500);
        assert_eq!(page.total, 3);
        assert_eq!(names(&page.rows), vec!["Alice"]);
    }

    #[test]
    fn query_rows_clamps_page_size() {
        let data = rows();
        let config = FilterConfig::default();
        let params = QueryParams {
            page_size: 10,
            search: Some("  a ".to_string()),
            ..Default::default()
        };
        let page = query_rows(&data, &config, &params, 1);
        assert_eq!(page.total, 2);
        assert_eq!(names(&page.rows), vec!["Alice"]);
    }

    #[test]
    fn paginate_pages() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(items.clone(), 1, 3), vec![1, 2, 3]);
        assert_eq!(paginate(items.clone(), 0, 3), vec![1, 2, 3]);
        assert_eq!(paginate(items.clone(), 3, 3), vec![7]);
        assert!(paginate(items, 4, 3).is_empty());
    }
}
