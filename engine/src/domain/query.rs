//! Request parameters that travel alongside a filter tree

use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::domain::filters::FilterError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Single-column ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Parse `column`, `column:asc` or `column:desc`.
    ///
    /// A trailing segment that is not a direction is kept as part of the
    /// column name, so `a:b` sorts by the column `a:b`.
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        let (column, direction) = match s.rsplit_once(':') {
            Some((col, "asc")) => (col, SortDirection::Asc),
            Some((col, "desc")) => (col, SortDirection::Desc),
            _ => (s, SortDirection::Asc),
        };
        if column.trim().is_empty() {
            return Err(FilterError::validation(
                "sort",
                "Invalid sort format. Use 'column' or 'column:asc' or 'column:desc'",
            ));
        }
        Ok(Self::new(column, direction))
    }
}

/// Restricts a query to rows whose `column` equals `value`, e.g. one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub column: String,
    pub value: String,
}

impl Scope {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Sort, pagination, search, scope and projection of a filtered query.
///
/// Field order is part of the canonical hash and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub projection: Option<Vec<String>>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            sort: None,
            page: default_page(),
            page_size: default_page_size(),
            search: None,
            scope: None,
            projection: None,
        }
    }
}

impl QueryParams {
    /// 1-based page; page 0 reads as page 1
    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to `[1, max_page_size]`
    pub fn effective_page_size(&self, max_page_size: u32) -> u32 {
        self.page_size.clamp(1, max_page_size.max(1))
    }

    pub fn offset(&self, max_page_size: u32) -> u64 {
        u64::from(self.effective_page() - 1) * u64::from(self.effective_page_size(max_page_size))
    }

    /// Trimmed search text, `None` when blank
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
    /// The parameters with page, page size and search replaced by the values
    /// a query actually runs with
    pub fn normalized(&self, max_page_size: u32) -> Self {
        Self {
            sort: self.sort.clone(),
            page: self.effective_page(),
            page_size: self.effective_page_size(max_page_size),
            search: self.search_text().map(str::to_string),
            scope: self.scope.clone(),
            projection: self.projection.clone(),
        }
    }
}
