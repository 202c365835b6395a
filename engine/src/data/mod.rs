//! Data layer: SQL generation, snapshot execution and cache keys

pub mod cache;
pub mod duckdb;
pub mod sql;
