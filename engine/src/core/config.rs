use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_IN_MEMORY_ROW_LIMIT, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_PAGE_SIZE, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_SHEET_COLUMN,
};
use crate::data::sql::{Backend, RegexMode};
use crate::utils::file::expand_path;

/// Filter engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Datasets with at most this many rows are filtered in memory
    pub in_memory_row_limit: usize,
    pub regex_mode: RegexMode,
    pub dialect: Backend,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub query_timeout_secs: u64,
    /// DuckDB worker threads (engine default when unset)
    pub threads: Option<u32>,
    /// DuckDB memory limit such as `2GB` (engine default when unset)
    pub memory_limit: Option<String>,
    /// Column holding the sheet name in multi-sheet snapshots
    pub sheet_column: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            in_memory_row_limit: DEFAULT_IN_MEMORY_ROW_LIMIT,
            regex_mode: RegexMode::default(),
            dialect: Backend::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            threads: None,
            memory_limit: None,
            sheet_column: DEFAULT_SHEET_COLUMN.to_string(),
        }
    }
}

/// Engine configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EngineFileConfig {
    pub in_memory_row_limit: Option<usize>,
    pub regex_mode: Option<RegexMode>,
    pub dialect: Option<Backend>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub query_timeout_secs: Option<u64>,
    pub threads: Option<u32>,
    pub memory_limit: Option<String>,
    pub sheet_column: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub engine: Option<EngineFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        let Some(engine) = other.engine else {
            return;
        };
        let current = self.engine.get_or_insert_with(EngineFileConfig::default);
        if engine.in_memory_row_limit.is_some() {
            tracing::trace!(in_memory_row_limit = ?engine.in_memory_row_limit, "Merging engine.in_memory_row_limit");
            current.in_memory_row_limit = engine.in_memory_row_limit;
        }
        if engine.regex_mode.is_some() {
            tracing::trace!(regex_mode = ?engine.regex_mode, "Merging engine.regex_mode");
            current.regex_mode = engine.regex_mode;
        }
        if engine.dialect.is_some() {
            tracing::trace!(dialect = ?engine.dialect, "Merging engine.dialect");
            current.dialect = engine.dialect;
        }
        if engine.default_page_size.is_some() {
            current.default_page_size = engine.default_page_size;
        }
        if engine.max_page_size.is_some() {
            current.max_page_size = engine.max_page_size;
        }
        if engine.query_timeout_secs.is_some() {
            tracing::trace!(query_timeout_secs = ?engine.query_timeout_secs, "Merging engine.query_timeout_secs");
            current.query_timeout_secs = engine.query_timeout_secs;
        }
        if engine.threads.is_some() {
            current.threads = engine.threads;
        }
        if engine.memory_limit.is_some() {
            current.memory_limit = engine.memory_limit;
        }
        if engine.sheet_column.is_some() {
            current.sheet_column = engine.sheet_column;
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.gridscope/gridscope.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::layer(file_config, cli);
        config.validate()?;

        tracing::debug!(
            in_memory_row_limit = config.engine.in_memory_row_limit,
            regex_mode = %config.engine.regex_mode,
            dialect = %config.engine.dialect,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer defaults, merged file config and CLI/env overrides
    fn layer(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file = file_config.engine.unwrap_or_default();
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            in_memory_row_limit: cli
                .in_memory_row_limit
                .or(file.in_memory_row_limit)
                .unwrap_or(defaults.in_memory_row_limit),
            regex_mode: cli
                .regex_mode
                .or(file.regex_mode)
                .unwrap_or(defaults.regex_mode),
            dialect: cli.dialect.or(file.dialect).unwrap_or(defaults.dialect),
            default_page_size: file
                .default_page_size
                .unwrap_or(defaults.default_page_size),
            max_page_size: file.max_page_size.unwrap_or(defaults.max_page_size),
            query_timeout_secs: cli
                .query_timeout_secs
                .or(file.query_timeout_secs)
                .unwrap_or(defaults.query_timeout_secs),
            threads: cli.threads.or(file.threads),
            memory_limit: cli.memory_limit.clone().or(file.memory_limit),
            sheet_column: file.sheet_column.unwrap_or(defaults.sheet_column),
        };

        Self { engine }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        let engine = &self.engine;

        if engine.default_page_size == 0 {
            anyhow::bail!("Configuration error: engine.default_page_size must be greater than 0");
        }
        if engine.max_page_size == 0 {
            anyhow::bail!("Configuration error: engine.max_page_size must be greater than 0");
        }
        if engine.default_page_size > engine.max_page_size {
            anyhow::bail!(
                "Configuration error: engine.default_page_size ({}) exceeds engine.max_page_size ({})",
                engine.default_page_size,
                engine.max_page_size
            );
        }
        if engine.query_timeout_secs == 0 {
            anyhow::bail!("Configuration error: engine.query_timeout_secs must be greater than 0");
        }
        if engine.threads == Some(0) {
            anyhow::bail!("Configuration error: engine.threads must be greater than 0");
        }
        if engine.memory_limit.as_deref().is_some_and(|m| m.trim().is_empty()) {
            anyhow::bail!("Configuration error: engine.memory_limit must not be empty");
        }
        if engine.sheet_column.trim().is_empty() {
            anyhow::bail!("Configuration error: engine.sheet_column must not be empty");
        }

        if engine.in_memory_row_limit == 0 {
            tracing::warn!(
                "engine.in_memory_row_limit is 0, every filter with rows will be compiled to SQL"
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.gridscope/gridscope.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
