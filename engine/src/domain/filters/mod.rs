//! Filter expression engine
//!
//! One recursive tree type, evaluated in memory by [`evaluate`] and compiled
//! to SQL by `data::sql::SqlCompiler`. Both walk the tree through
//! [`FilterVisitor`].

mod coerce;
mod error;
mod evaluate;
mod hash;
mod matcher;
mod parser;
mod types;
mod validate;
mod visit;

pub use coerce::{cell_number, cell_text, format_number, parse_number};
pub use error::FilterError;
pub use evaluate::{PatternCache, PreparedFilter, RowEvaluator, compile_pattern, evaluate};
pub use hash::{canonical_hash, canonical_json};
pub use matcher::{RowMatcher, RowPage, match_rows, paginate, query_rows, sort_rows};
pub use parser::{filter_config_from_value, parse_filter_config};
pub use types::{
    Combinator, FilterConfig, FilterGroup, FilterLeaf, FilterNode, FilterValue, Operator, Row,
    Scalar,
};
pub use validate::validate;
pub use visit::FilterVisitor;
