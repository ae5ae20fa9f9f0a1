use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuckAskError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("no tables are loaded; load data before asking questions")]
    NoSchemaLoaded,

    #[error("schema description contains no tables")]
    EmptySchema,

    #[error("source file for table '{table}' not found or unreadable: {}", path.display())]
    SourceNotFound { table: String, path: PathBuf },

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("failed to load table '{table}': {message}")]
    LoadFailed { table: String, message: String },

    #[error("database engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("sql generation failed: {0}")]
    GenerationFailed(String),

    #[error("no sql statement found in model output: {0}")]
    NoSqlFound(String),

    #[error("statement not allowed: {0}")]
    DisallowedStatement(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl DuckAskError {
    /// stable tag reported to callers alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            DuckAskError::EmptyQuestion => "empty_question",
            DuckAskError::NoSchemaLoaded => "no_schema_loaded",
            DuckAskError::EmptySchema => "empty_schema",
            DuckAskError::SourceNotFound { .. } => "source_not_found",
            DuckAskError::InvalidTableName(_) => "invalid_table_name",
            DuckAskError::LoadFailed { .. } => "load_failed",
            DuckAskError::EngineUnavailable(_) => "engine_unavailable",
            DuckAskError::GenerationFailed(_) => "generation_failed",
            DuckAskError::NoSqlFound(_) => "no_sql_found",
            DuckAskError::DisallowedStatement(_) => "disallowed_statement",
            DuckAskError::QueryError(_) => "query_error",
            DuckAskError::Config(_) => "config",
            DuckAskError::Io(_) => "io",
            DuckAskError::Json(_) => "json",
            DuckAskError::Tracing(_) => "tracing",
        }
    }

    /// table a load error refers to, if any
    pub fn failed_table(&self) -> Option<&str> {
        match self {
            DuckAskError::SourceNotFound { table, .. } | DuckAskError::LoadFailed { table, .. } => {
                Some(table)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DuckAskError>;
