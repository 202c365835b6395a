//! Backend selection for a filtered query

use std::fmt;

use serde::Serialize;

use crate::core::config::EngineConfig;
use crate::data::sql::RegexMode;
use crate::domain::filters::{FilterConfig, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Evaluate over materialized rows
    InMemory,
    /// Compile to SQL and run against the snapshot
    Sql,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::InMemory => "in_memory",
            Strategy::Sql => "sql",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Small datasets stay in memory; so do regex trees when the SQL side
/// is configured not to translate regex.
pub fn choose_strategy(config: &FilterConfig, row_count: usize, engine: &EngineConfig) -> Strategy {
    let strategy = if row_count <= engine.in_memory_row_limit {
        Strategy::InMemory
    } else if engine.regex_mode == RegexMode::InMemoryOnly && config.uses_operator(Operator::Regex) {
        Strategy::InMemory
    } else {
        Strategy::Sql
    };
    tracing::debug!(
        row_count,
        limit = engine.in_memory_row_limit,
        regex_mode = %engine.regex_mode,
        %strategy,
        "Chose filter strategy"
    );
    strategy
}
