//! Domain logic for dataset filtering
//!
//! - `filters` - Filter tree model, evaluation, validation and hashing
//! - `query` - Sort, pagination, search and scope parameters
//! - `schema` - Column metadata
//! - `strategy` - In-memory vs SQL backend selection

pub mod filters;
pub mod query;
pub mod schema;
pub mod strategy;

pub use query::{QueryParams, Scope, SortDirection, SortSpec};
pub use schema::{ColumnKind, ColumnMeta, ColumnSchema};
pub use strategy::{Strategy, choose_strategy};
