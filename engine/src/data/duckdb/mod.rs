//! DuckDB snapshot engine
//!
//! Runs assembled statements against Parquet snapshots on an in-memory
//! DuckDB connection. Results come back as JSON rows so both backends hand
//! callers the same shape.
//!
//! Snapshots are read through [`snapshot_relation`], which casts decimal
//! columns to DOUBLE and every column without a native JSON form to VARCHAR.
//! In-memory rows and compiled SQL then see the same cell text.

pub mod error;

pub use error::DuckdbError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use duckdb::Connection;
use duckdb::types::{TimeUnit, Value as DuckValue};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::EngineConfig;
use crate::data::sql::{DuckdbDialect, SqlDialect};
use crate::domain::filters::Row;
use crate::domain::schema::{ColumnKind, ColumnMeta, ColumnSchema};

/// Rows returned by a snapshot query
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// Columnar engine that executes SQL over snapshot files
#[async_trait]
pub trait SnapshotEngine: Send + Sync {
    /// Run one statement and collect every row
    async fn execute(&self, sql: &str) -> Result<QueryResult, DuckdbError>;

    /// Column names and kinds of a snapshot
    async fn describe(&self, path: &str) -> Result<ColumnSchema, DuckdbError>;

    /// Total rows in a snapshot
    async fn count_rows(&self, path: &str) -> Result<u64, DuckdbError>;

    /// Every row of a snapshot, in file order
    async fn read_rows(&self, path: &str) -> Result<QueryResult, DuckdbError>;

    /// Table expression over a snapshot that compiled statements read from
    async fn relation(&self, path: &str) -> Result<String, DuckdbError>;
}

/// DuckDB-backed snapshot engine
///
/// Uses a single in-memory connection protected by a mutex. Every statement
/// runs on the blocking pool under the configured timeout.
pub struct DuckdbEngine {
    conn: Arc<Mutex<Connection>>,
    timeout_secs: u64,
}

impl DuckdbEngine {
    /// Open an in-memory connection and apply engine settings
    pub async fn open(config: &EngineConfig) -> Result<Self, DuckdbError> {
        let setup = setup_sql(config);
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(&setup)?;
            Ok::<_, duckdb::Error>(conn)
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            threads = ?config.threads,
            memory_limit = ?config.memory_limit,
            "DuckdbEngine initialized"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout_secs: config.query_timeout_secs,
        })
    }

    /// Run statements that return no rows (setup, fixtures)
    pub async fn execute_batch(&self, sql: &str) -> Result<(), DuckdbError> {
        let sql = sql.to_string();
        self.run_query(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }

    /// Column names and DuckDB type names of a snapshot
    async fn column_types(&self, path: &str) -> Result<Vec<(String, String)>, DuckdbError> {
        let sql = format!(
            "DESCRIBE SELECT {} FROM {}",
            DuckdbDialect.all_columns(),
            DuckdbDialect.snapshot_source(path)
        );
        self.run_query(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(columns)
        })
        .await
    }

    /// Run a blocking DuckDB query with timeout
    async fn run_query<T, F>(&self, f: F) -> Result<T, DuckdbError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DuckdbError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let timeout_secs = self.timeout_secs;
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock();
                f(&guard)
            }),
        )
        .await
        .map_err(|_| {
            tracing::warn!("DuckDB query timed out after {}s", timeout_secs);
            DuckdbError::Timeout { timeout_secs }
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "DuckDB query task failed");
            DuckdbError::Io(std::io::Error::other(format!(
                "Query execution failed: {}",
                e
            )))
        })?
    }
}

#[async_trait]
impl SnapshotEngine for DuckdbEngine {
    async fn execute(&self, sql: &str) -> Result<QueryResult, DuckdbError> {
        let sql = sql.to_string();
        self.run_query(move |conn| {
            let started = Instant::now();
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let columns: Vec<String> = rows
                .as_ref()
                .map(|s| s.column_names())
                .unwrap_or_default();

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Row::new();
                for (i, name) in columns.iter().enumerate() {
                    let value: DuckValue = row.get(i)?;
                    record.insert(name.clone(), to_json(value));
                }
                out.push(record);
            }

            let execution_time_ms = started.elapsed().as_millis() as u64;
            tracing::trace!(rows = out.len(), execution_time_ms, sql = %sql, "Snapshot query finished");
            Ok(QueryResult {
                row_count: out.len(),
                rows: out,
                columns,
                execution_time_ms,
            })
        })
        .await
    }

    async fn describe(&self, path: &str) -> Result<ColumnSchema, DuckdbError> {
        let columns = self
            .column_types(path)
            .await?
            .into_iter()
            .map(|(name, ty)| ColumnMeta::new(name, column_kind(&ty)))
            .collect();
        Ok(ColumnSchema::new(columns))
    }

    async fn count_rows(&self, path: &str) -> Result<u64, DuckdbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", DuckdbDialect.snapshot_source(path));
        self.run_query(move |conn| {
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn read_rows(&self, path: &str) -> Result<QueryResult, DuckdbError> {
        let relation = self.relation(path).await?;
        let mut sql = format!("SELECT {} FROM {}", DuckdbDialect.all_columns(), relation);
        if let Some(row_order) = DuckdbDialect.row_order_column() {
            sql.push_str(" ORDER BY ");
            sql.push_str(row_order);
        }
        self.execute(&sql).await
    }

    async fn relation(&self, path: &str) -> Result<String, DuckdbError> {
        let columns = self.column_types(path).await?;
        Ok(snapshot_relation(path, &columns))
    }
}

fn setup_sql(config: &EngineConfig) -> String {
    let mut sql = String::from(
        "SET autoinstall_known_extensions = false;
         SET autoload_known_extensions = false;
         SET extension_directory = '';",
    );
    if let Some(threads) = config.threads {
        sql.push_str(&format!(" SET threads = {};", threads.max(1)));
    }
    if let Some(limit) = &config.memory_limit {
        sql.push_str(&format!(
            " SET memory_limit = {};",
            DuckdbDialect.quote_string(limit)
        ));
    }
    sql.push_str(" LOAD parquet;");
    sql
}

/// Map a DuckDB type name from DESCRIBE to a column kind
pub fn column_kind(type_name: &str) -> ColumnKind {
    let upper = type_name.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();
    match base {
        "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT" | "USMALLINT"
        | "UINTEGER" | "UBIGINT" | "UHUGEINT" | "FLOAT" | "REAL" | "DOUBLE" | "DECIMAL" => {
            ColumnKind::Number
        }
        "BOOLEAN" => ColumnKind::Boolean,
        "DATE" | "TIME" | "TIMESTAMP" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ"
        | "TIMESTAMP_S" | "TIMESTAMP_MS" | "TIMESTAMP_NS" => ColumnKind::Temporal,
        _ => ColumnKind::Text,
    }
}

/// Cast that brings a stored column to the form both backends compare.
///
/// Decimals become DOUBLE so their text matches the JSON number. Integers,
/// floats, booleans and VARCHAR stay as stored; everything else becomes its
/// VARCHAR text.
fn normalising_cast(type_name: &str) -> Option<&'static str> {
    let upper = type_name.trim().to_ascii_uppercase();
    if upper.ends_with(']') {
        return Some("VARCHAR");
    }
    if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
        return Some("DOUBLE");
    }
    match column_kind(&upper) {
        ColumnKind::Number | ColumnKind::Boolean => None,
        _ if upper == "VARCHAR" => None,
        _ => Some("VARCHAR"),
    }
}

/// Snapshot table expression with every cell in the form rows are compared in
///
/// Returns the bare source when no column needs a cast.
pub fn snapshot_relation(path: &str, columns: &[(String, String)]) -> String {
    let source = DuckdbDialect.snapshot_source(path);
    let casts: Vec<String> = columns
        .iter()
        .filter_map(|(name, ty)| {
            normalising_cast(ty).map(|target| {
                let column = DuckdbDialect.quote_identifier(name);
                format!("CAST({} AS {}) AS {}", column, target, column)
            })
        })
        .collect();
    if casts.is_empty() {
        return source;
    }
    format!(
        "(SELECT * REPLACE ({}) FROM {}) AS snapshot",
        casts.join(", "),
        source
    )
}

fn micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn float(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Convert a DuckDB value to JSON
///
/// Integers stay integers where they fit, temporal values become ISO-8601
/// text, and types without a natural JSON form fall back to their debug text.
fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::from(n),
        DuckValue::SmallInt(n) => Value::from(n),
        DuckValue::Int(n) => Value::from(n),
        DuckValue::BigInt(n) => Value::from(n),
        DuckValue::HugeInt(n) => i64::try_from(n)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(n.to_string())),
        DuckValue::UTinyInt(n) => Value::from(n),
        DuckValue::USmallInt(n) => Value::from(n),
        DuckValue::UInt(n) => Value::from(n),
        DuckValue::UBigInt(n) => Value::from(n),
        DuckValue::Float(n) => float(f64::from(n)),
        DuckValue::Double(n) => float(n),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(float)
            .unwrap_or(Value::Null),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Enum(s) => Value::String(s),
        DuckValue::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        DuckValue::Timestamp(unit, value) => DateTime::from_timestamp_micros(micros(unit, value))
            .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or(Value::Null),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}
