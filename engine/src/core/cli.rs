use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use super::config::EngineConfig;
use super::constants::{
    ENV_CONFIG, ENV_DIALECT, ENV_IN_MEMORY_ROW_LIMIT, ENV_MEMORY_LIMIT, ENV_QUERY_TIMEOUT,
    ENV_REGEX_MODE, ENV_THREADS,
};
use crate::data::sql::{Backend, RegexMode};
use crate::domain::query::{QueryParams, Scope, SortSpec};

#[derive(Parser)]
#[command(name = "gridscope")]
#[command(version, about = "Filter engine for tabular snapshots", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Datasets with at most this many rows are filtered in memory
    #[arg(long, global = true, env = ENV_IN_MEMORY_ROW_LIMIT)]
    pub in_memory_row_limit: Option<usize>,

    /// Regex handling for SQL (native or in_memory_only)
    #[arg(long, global = true, env = ENV_REGEX_MODE, value_parser = parse_regex_mode)]
    pub regex_mode: Option<RegexMode>,

    /// SQL dialect for generated statements (duckdb or clickhouse)
    #[arg(long, global = true, env = ENV_DIALECT, value_parser = parse_dialect)]
    pub dialect: Option<Backend>,

    /// Snapshot query timeout in seconds
    #[arg(long, global = true, env = ENV_QUERY_TIMEOUT)]
    pub query_timeout: Option<u64>,

    /// DuckDB worker threads
    #[arg(long, global = true, env = ENV_THREADS)]
    pub threads: Option<u32>,

    /// DuckDB memory limit (e.g. 2GB)
    #[arg(long, global = true, env = ENV_MEMORY_LIMIT)]
    pub memory_limit: Option<String>,
}

/// Parse regex mode from CLI/env string
fn parse_regex_mode(s: &str) -> Result<RegexMode, String> {
    s.parse()
}

/// Parse SQL dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<Backend, String> {
    s.parse()
}

/// Parse `column[:asc|:desc]`
fn parse_sort(s: &str) -> Result<SortSpec, String> {
    SortSpec::parse(s).map_err(|e| e.to_string())
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Filter a JSON row array in memory
    Eval(EvalArgs),
    /// Print the SQL compiled for a filter
    Sql(SqlArgs),
    /// Run a filter against a Parquet snapshot
    Query(QueryArgs),
    /// Print the canonical hash and cache key of a request
    Hash(HashArgs),
}

/// Paging, sorting and search shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct PageArgs {
    /// 1-based page number
    #[arg(long)]
    pub page: Option<u32>,

    /// Rows per page (defaults to engine.default_page_size)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Sort column with optional direction, e.g. `age:desc`
    #[arg(long, value_parser = parse_sort)]
    pub sort: Option<SortSpec>,

    /// Case-insensitive search across every column
    #[arg(long)]
    pub search: Option<String>,

    /// Restrict to one sheet of a multi-sheet snapshot
    #[arg(long)]
    pub sheet: Option<String>,

    /// Columns to return (repeatable)
    #[arg(long = "column")]
    pub columns: Vec<String>,
}

impl PageArgs {
    /// Build query parameters, filling gaps from engine config
    pub fn to_params(&self, engine: &EngineConfig) -> QueryParams {
        QueryParams {
            sort: self.sort.clone(),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(engine.default_page_size),
            search: self.search.clone(),
            scope: self
                .sheet
                .as_ref()
                .map(|sheet| Scope::new(engine.sheet_column.clone(), sheet.clone())),
            projection: (!self.columns.is_empty()).then(|| self.columns.clone()),
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct EvalArgs {
    /// JSON file holding an array of row objects
    #[arg(long)]
    pub rows: PathBuf,

    /// JSON file holding the filter tree
    #[arg(long)]
    pub filter: PathBuf,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Clone, Debug)]
pub struct SqlArgs {
    /// JSON file holding the filter tree
    #[arg(long)]
    pub filter: PathBuf,

    /// JSON column schema (`[{"name": ..., "kind": ...}]`)
    #[arg(long, conflicts_with = "rows")]
    pub schema: Option<PathBuf>,

    /// JSON row array to infer the column schema from
    #[arg(long)]
    pub rows: Option<PathBuf>,

    /// Snapshot path used in the FROM clause
    #[arg(long, default_value = "snapshot.parquet")]
    pub snapshot: String,

    /// Numeric columns to build a statistics statement for (repeatable)
    #[arg(long = "stats")]
    pub stats: Vec<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Parquet snapshot file
    #[arg(long)]
    pub snapshot: PathBuf,

    /// JSON file holding the filter tree
    #[arg(long)]
    pub filter: PathBuf,

    /// Dataset id for the cache key (defaults to the snapshot file stem)
    #[arg(long)]
    pub dataset: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Clone, Debug)]
pub struct HashArgs {
    /// JSON file holding the filter tree
    #[arg(long)]
    pub filter: PathBuf,

    /// Dataset id for the cache key
    #[arg(long)]
    pub dataset: String,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub in_memory_row_limit: Option<usize>,
    pub regex_mode: Option<RegexMode>,
    pub dialect: Option<Backend>,
    pub query_timeout_secs: Option<u64>,
    pub threads: Option<u32>,
    pub memory_limit: Option<String>,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            in_memory_row_limit: cli.in_memory_row_limit,
            regex_mode: cli.regex_mode,
            dialect: cli.dialect,
            query_timeout_secs: cli.query_timeout,
            threads: cli.threads,
            memory_limit: cli.memory_limit.clone(),
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig::from(&cli);
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::SortDirection;

    fn parse_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gridscope").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_eval_command() {
        let cli = parse_from(&["eval", "--rows", "rows.json", "--filter", "f.json", "--search", "x"]);
        match cli.command {
            Commands::Eval(args) => {
                assert_eq!(args.rows, PathBuf::from("rows.json"));
                assert_eq!(args.filter, PathBuf::from("f.json"));
                assert_eq!(args.page.search.as_deref(), Some("x"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse_from(&[
            "hash",
            "--filter",
            "f.json",
            "--dataset",
            "ds1",
            "--regex-mode",
            "in-memory-only",
            "--dialect",
            "clickhouse",
            "--threads",
            "2",
        ]);
        let config = CliConfig::from(&cli);
        assert_eq!(config.regex_mode, Some(RegexMode::InMemoryOnly));
        assert_eq!(config.dialect, Some(Backend::Clickhouse));
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_dialect = ["gridscope", "hash", "--filter", "f", "--dataset", "d", "--dialect", "sqlite"];
        assert!(Cli::try_parse_from(bad_dialect).is_err());

        let bad_sort = ["gridscope", "hash", "--filter", "f", "--dataset", "d", "--sort", ":asc"];
        assert!(Cli::try_parse_from(bad_sort).is_err());
    }

    #[test]
    fn test_schema_conflicts_with_rows() {
        let args = ["gridscope", "sql", "--filter", "f", "--schema", "s.json", "--rows", "r.json"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_page_args_to_params() {
        let cli = parse_from(&[
            "sql",
            "--filter",
            "f.json",
            "--page",
            "3",
            "--sort",
            "age:desc",
            "--sheet",
            "Q1",
            "--column",
            "name",
            "--column",
            "age",
            "--stats",
            "age",
        ]);
        let Commands::Sql(args) = cli.command else {
            panic!("expected sql command");
        };
        assert_eq!(args.snapshot, "snapshot.parquet");
        assert_eq!(args.stats, vec!["age".to_string()]);

        let engine = EngineConfig::default();
        let params = args.page.to_params(&engine);
        assert_eq!(params.page, 3);
        assert_eq!(params.page_size, engine.default_page_size);
        assert_eq!(params.sort, Some(SortSpec::new("age", SortDirection::Desc)));
        assert_eq!(params.scope, Some(Scope::new("_sheet", "Q1")));
        assert_eq!(
            params.projection,
            Some(vec!["name".to_string(), "age".to_string()])
        );
    }

    #[test]
    fn test_empty_page_args() {
        let params = PageArgs::default().to_params(&EngineConfig::default());
        assert_eq!(params, QueryParams::default());
    }
}
