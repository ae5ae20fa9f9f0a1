use crate::error::{DuckAskError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DATABASE_FILE: &str = "duckask.duckdb";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

/// settings for the completion service client
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CompletionConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DuckAskError::Config("OPENAI_API_KEY is not set".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    /// `None` opens an in-memory database
    pub database_path: Option<PathBuf>,
    pub sample_rows: usize,
    pub completion: CompletionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_path: None,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            completion: CompletionConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| DuckAskError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}

impl EngineConfig {
    /// resolve settings from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = non_empty_var("DUCKASK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let database_path = non_empty_var("DUCKASK_DATABASE").map(PathBuf::from);

        let sample_rows = parsed_var::<usize>("DUCKASK_SAMPLE_ROWS")?.unwrap_or(defaults.sample_rows);

        let timeout = parsed_var::<u64>("DUCKASK_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.completion.timeout);

        let completion = CompletionConfig {
            api_key: non_empty_var("OPENAI_API_KEY"),
            base_url: non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.completion.base_url),
            model: non_empty_var("DUCKASK_MODEL").unwrap_or(defaults.completion.model),
            timeout,
            ..defaults.completion
        };

        Ok(Self {
            data_dir,
            database_path,
            sample_rows,
            completion,
        })
    }

    /// database file used by the cli when none is given explicitly
    pub fn default_database_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DATABASE_FILE)
    }
}
