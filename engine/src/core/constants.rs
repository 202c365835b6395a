// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Gridscope";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "gridscope";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".gridscope";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "gridscope.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "GRIDSCOPE_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "GRIDSCOPE_LOG";

/// Default log filter when neither GRIDSCOPE_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,gridscope=info";

// =============================================================================
// Environment Variables - Engine
// =============================================================================

/// Environment variable for the in-memory row limit
pub const ENV_IN_MEMORY_ROW_LIMIT: &str = "GRIDSCOPE_IN_MEMORY_ROW_LIMIT";

/// Environment variable for regex handling (`native` or `in_memory_only`)
pub const ENV_REGEX_MODE: &str = "GRIDSCOPE_REGEX_MODE";

/// Environment variable for the SQL dialect (`duckdb` or `clickhouse`)
pub const ENV_DIALECT: &str = "GRIDSCOPE_DIALECT";

/// Environment variable for the query timeout in seconds
pub const ENV_QUERY_TIMEOUT: &str = "GRIDSCOPE_QUERY_TIMEOUT";

/// Environment variable for DuckDB worker threads
pub const ENV_THREADS: &str = "GRIDSCOPE_THREADS";

/// Environment variable for the DuckDB memory limit (e.g. `2GB`)
pub const ENV_MEMORY_LIMIT: &str = "GRIDSCOPE_MEMORY_LIMIT";

// =============================================================================
// Engine Defaults
// =============================================================================

/// Datasets at or below this many rows are filtered in memory
pub const DEFAULT_IN_MEMORY_ROW_LIMIT: usize = 10_000;

/// Rows per page when the request does not say
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound for a requested page size
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 500;

/// Snapshot query timeout
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Column holding the sheet name in multi-sheet snapshots
pub const DEFAULT_SHEET_COLUMN: &str = "_sheet";

// =============================================================================
// Filter Limits
// =============================================================================

/// Maximum size of filter JSON in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum group nesting below the root
pub const MAX_FILTER_DEPTH: usize = 16;

/// Maximum number of leaves in one tree
pub const MAX_FILTER_LEAVES: usize = 200;

// =============================================================================
// Cache
// =============================================================================

/// Prefix of filtered-result cache keys
pub const CACHE_KEY_FILTER_PREFIX: &str = "filter";
