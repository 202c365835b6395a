//! SQL generation for filtered snapshot queries
//!
//! This module provides the dialect abstraction, the filter compiler and the
//! statement assembler. Only DuckDB executes in-process; ClickHouse SQL is
//! generated for external engines.

mod assembler;
mod clickhouse_dialect;
mod compiler;
mod dialect;
mod duckdb_dialect;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use assembler::{QueryAssembler, QueryRequest, StatsRequest};
pub use clickhouse_dialect::ClickhouseDialect;
pub use compiler::SqlCompiler;
pub use dialect::{Aggregate, SqlDialect};
pub use duckdb_dialect::DuckdbDialect;

/// SQL engine identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Duckdb,
    Clickhouse,
}

impl Backend {
    /// Get the SQL dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Backend::Duckdb => &DuckdbDialect,
            Backend::Clickhouse => &ClickhouseDialect,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Duckdb => "duckdb",
            Backend::Clickhouse => "clickhouse",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckdb" => Ok(Backend::Duckdb),
            "clickhouse" => Ok(Backend::Clickhouse),
            other => Err(format!("unknown SQL dialect '{other}' (expected duckdb or clickhouse)")),
        }
    }
}

/// How `regex` leaves reach the SQL backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexMode {
    /// Translate to the dialect's case-insensitive regex function
    #[default]
    Native,
    /// Refuse to compile regex; trees using it are evaluated in memory
    InMemoryOnly,
}

impl RegexMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegexMode::Native => "native",
            RegexMode::InMemoryOnly => "in_memory_only",
        }
    }
}

impl fmt::Display for RegexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "native" => Ok(RegexMode::Native),
            "in_memory_only" | "in_memory" => Ok(RegexMode::InMemoryOnly),
            other => Err(format!(
                "unknown regex mode '{other}' (expected native or in_memory_only)"
            )),
        }
    }
}
