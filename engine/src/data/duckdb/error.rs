//! DuckDB error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuckdbError {
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB query timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl DuckdbError {
    /// HTTP status the API layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Timeout { .. } => 504,
            Self::Database(_) | Self::Io(_) => 500,
        }
    }
}
