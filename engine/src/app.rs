//! Core application

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::cli::{self, CliConfig, Commands, EvalArgs, HashArgs, QueryArgs, SqlArgs};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::data::cache::CacheKey;
use crate::data::duckdb::{DuckdbEngine, QueryResult, SnapshotEngine};
use crate::data::sql::{Backend, QueryAssembler, QueryRequest, SqlCompiler, StatsRequest};
use crate::domain::filters::{
    FilterConfig, Row, canonical_hash, canonical_json, cell_number, parse_filter_config, query_rows,
};
use crate::domain::schema::ColumnSchema;
use crate::domain::strategy::{Strategy, choose_strategy};

/// One page of filtered rows
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub rows: Vec<Row>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

/// Statements compiled for one request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlOutput {
    pub dialect: &'static str,
    #[serde(rename = "where")]
    pub where_clause: String,
    pub select: String,
    pub count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,
}

/// Canonical identity of a request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOutput {
    pub hash: String,
    pub cache_key: String,
    pub dataset_prefix: String,
    pub canonical: String,
}

pub struct CoreApp {
    pub config: AppConfig,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config)?;
        match command {
            Commands::Eval(args) => print_json(&app.eval(&args)?),
            Commands::Sql(args) => print_json(&app.sql(&args)?),
            Commands::Query(args) => print_json(&app.query(&args).await?),
            Commands::Hash(args) => print_json(&app.hash(&args)?),
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Ok(Self { config })
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Filter a row file in memory
    pub fn eval(&self, args: &EvalArgs) -> Result<QueryOutput> {
        let rows = read_rows(&args.rows)?;
        let filter = read_filter(&args.filter)?;
        let engine = &self.config.engine;
        let params = args.page.to_params(engine);

        let page = query_rows(&rows, &filter, &params, engine.max_page_size);
        tracing::debug!(
            rows = rows.len(),
            matched = page.total,
            "Evaluated filter in memory"
        );

        Ok(QueryOutput {
            rows: project(&page.rows, params.projection.as_deref()),
            total: page.total as u64,
            page: params.effective_page(),
            page_size: params.effective_page_size(engine.max_page_size),
            strategy: Some(Strategy::InMemory),
            cache_key: None,
            execution_time_ms: None,
        })
    }

    /// Compile a filter to the configured dialect
    pub fn sql(&self, args: &SqlArgs) -> Result<SqlOutput> {
        let filter = read_filter(&args.filter)?;
        let schema = match (&args.schema, &args.rows) {
            (Some(path), _) => read_schema(path)?,
            (None, Some(path)) => ColumnSchema::infer(&read_rows(path)?),
            (None, None) => anyhow::bail!("Either --schema or --rows is required to compile SQL"),
        };
        let engine = &self.config.engine;
        let params = args.page.to_params(engine);

        let compiler = SqlCompiler::new(engine.dialect.dialect(), &schema, engine.regex_mode);
        let where_clause = compiler.compile(&filter)?;
        let assembler =
            QueryAssembler::new(compiler, &args.snapshot).with_max_page_size(engine.max_page_size);

        let request = QueryRequest::new(&filter, &params);
        let stats = if args.stats.is_empty() {
            None
        } else {
            Some(assembler.stats(&StatsRequest {
                columns: args.stats.clone(),
                scope: params.scope.clone(),
            })?)
        };

        Ok(SqlOutput {
            dialect: engine.dialect.name(),
            where_clause,
            select: assembler.select(&request)?,
            count: assembler.count(&request)?,
            stats,
        })
    }

    /// Run a filter against a snapshot, in memory or in SQL by dataset size
    pub async fn query(&self, args: &QueryArgs) -> Result<QueryOutput> {
        let filter = read_filter(&args.filter)?;
        let engine_config = &self.config.engine;
        let params = args.page.to_params(engine_config);
        let snapshot = args.snapshot.to_string_lossy().into_owned();

        if !args.snapshot.exists() {
            anyhow::bail!("Snapshot not found: {}", args.snapshot.display());
        }
        if engine_config.dialect != Backend::Duckdb {
            tracing::warn!(
                dialect = %engine_config.dialect,
                "Snapshots are queried with DuckDB; the dialect setting only affects `sql` output"
            );
        }

        let engine = DuckdbEngine::open(engine_config).await?;
        let schema = engine.describe(&snapshot).await?;
        let row_count = engine.count_rows(&snapshot).await?;
        let strategy = choose_strategy(
            &filter,
            usize::try_from(row_count).unwrap_or(usize::MAX),
            engine_config,
        );

        let dataset = args
            .dataset
            .clone()
            .or_else(|| {
                args.snapshot
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| snapshot.clone());
        let max_page_size = engine_config.max_page_size;
        let cache_key = CacheKey::filter(
            &dataset,
            &canonical_hash(&filter, &params, max_page_size),
            params.effective_page(),
        );
        let (rows, total, execution_time_ms) = match strategy {
            Strategy::InMemory => {
                let all = engine.read_rows(&snapshot).await?;
                let page = query_rows(&all.rows, &filter, &params, max_page_size);
                (
                    project(&page.rows, params.projection.as_deref()),
                    page.total as u64,
                    all.execution_time_ms,
                )
            }
            Strategy::Sql => {
                let compiler =
                    SqlCompiler::new(Backend::Duckdb.dialect(), &schema, engine_config.regex_mode);
                let assembler = QueryAssembler::new(compiler, &snapshot)
                    .with_source(engine.relation(&snapshot).await?)
                    .with_max_page_size(max_page_size);
                let request = QueryRequest::new(&filter, &params);
                let page = engine.execute(&assembler.select(&request)?).await?;
                let count = engine.execute(&assembler.count(&request)?).await?;
                (
                    page.rows,
                    first_count(&count),
                    page.execution_time_ms + count.execution_time_ms,
                )
            }
        };

        tracing::debug!(
            %strategy,
            row_count,
            matched = total,
            execution_time_ms,
            cache_key = %cache_key,
            "Snapshot query finished"
        );

        Ok(QueryOutput {
            rows,
            total,
            page: params.effective_page(),
            page_size: params.effective_page_size(max_page_size),
            strategy: Some(strategy),
            cache_key: Some(cache_key),
            execution_time_ms: Some(execution_time_ms),
        })
    }

    /// Canonical hash and cache key for a request
    pub fn hash(&self, args: &HashArgs) -> Result<HashOutput> {
        let filter = read_filter(&args.filter)?;
        let params = args.page.to_params(&self.config.engine);
        let max_page_size = self.config.engine.max_page_size;
        let hash = canonical_hash(&filter, &params, max_page_size);

        Ok(HashOutput {
            cache_key: CacheKey::filter(&args.dataset, &hash, params.effective_page()),
            dataset_prefix: CacheKey::filter_dataset_prefix(&args.dataset),
            canonical: canonical_json(&filter, &params, max_page_size),
            hash,
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn read_filter(path: &Path) -> Result<FilterConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter file: {}", path.display()))?;
    let filter = parse_filter_config(&content)
        .with_context(|| format!("Invalid filter in {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        leaves = filter.leaves().len(),
        "Filter loaded"
    );
    Ok(filter)
}

fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Rows file must hold an array of objects: {}", path.display()))
}

fn read_schema(path: &Path) -> Result<ColumnSchema> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
    ColumnSchema::from_json(&content)
        .with_context(|| format!("Invalid column schema in {}", path.display()))
}

/// Copy rows, keeping only `columns` when given
fn project(rows: &[&Row], columns: Option<&[String]>) -> Vec<Row> {
    match columns {
        Some(columns) => rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect(),
        None => rows.iter().map(|row| (*row).clone()).collect(),
    }
}

/// First cell of a single-value result, as a count
fn first_count(result: &QueryResult) -> u64 {
    result
        .rows
        .first()
        .and_then(|row| row.values().next())
        .and_then(cell_number)
        .map(|n| n.max(0.0) as u64)
        .unwrap_or(0)
}
