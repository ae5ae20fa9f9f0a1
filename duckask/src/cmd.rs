use crate::render::{render_answer, OutputFormat};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::config::EngineConfig;
use common::llm::OpenAiClient;
use common::query::{EngineOptions, QueryEngine};
use common::{Database, DuckAskError, QueryAnswer};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "duckask")]
#[command(about = "ask natural language questions about csv data in duckdb", long_about = None)]
pub struct Cli {
    /// DuckDB database file (default: <data-dir>/duckask.duckdb)
    #[arg(long, global = true, env = "DUCKASK_DATABASE")]
    database: Option<PathBuf>,

    /// Directory scanned for loadable files
    #[arg(long, global = true, env = "DUCKASK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loadable files in the data directory
    Files,

    /// Load delimited files into tables
    Load {
        /// Sources as <table>=<path>; relative paths resolve against the data directory
        #[arg(required = true, value_parser = parse_source)]
        sources: Vec<(String, PathBuf)>,
    },

    /// Write and load the sample employees/departments data
    LoadSample,

    /// Print the current schema as json
    Schema,

    /// Answer one question
    Ask {
        /// Natural language question
        question: String,

        #[command(flatten)]
        model: ModelArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Interactive question loop
    Shell {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Completion model identifier
    #[arg(long, env = "DUCKASK_MODEL")]
    model: Option<String>,

    /// Completion request timeout in seconds
    #[arg(long, env = "DUCKASK_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Sample rows per table sent with the prompt (0 disables)
    #[arg(long, env = "DUCKASK_SAMPLE_ROWS")]
    sample_rows: Option<usize>,
}

fn parse_source(raw: &str) -> std::result::Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((table, path)) if !table.is_empty() && !path.is_empty() => {
            Ok((table.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected <table>=<path>, got '{}'", raw)),
    }
}

impl Cli {
    fn config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::from_env()?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config.database_path = Some(
            self.database
                .clone()
                .unwrap_or_else(|| config.default_database_path()),
        );
        Ok(config)
    }

    pub async fn execute(self) -> Result<()> {
        let _guard = common::tracing::init_tracing("duckask")?;
        let mut config = self.config()?;

        match self.command {
            Commands::Files => list_files(&open_engine(&config)?),
            Commands::Load { sources } => {
                let schema = open_engine(&config)?.load_files(sources).await?;
                print_json(&schema)
            }
            Commands::LoadSample => {
                let schema = open_engine(&config)?.load_sample_data().await?;
                tracing::info!("sample data loaded successfully");
                print_json(&schema)
            }
            Commands::Schema => print_json(&open_engine(&config)?.schema().await?),
            Commands::Ask {
                question,
                model,
                format,
            } => {
                model.apply(&mut config);
                ask(&config, &question, format).await
            }
            Commands::Shell { model } => {
                model.apply(&mut config);
                let engine = build_engine(&config)?;
                crate::shell::run(engine).await
            }
        }
    }
}

impl ModelArgs {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(model) = self.model {
            config.completion.model = model;
        }
        if let Some(secs) = self.timeout_secs {
            config.completion.timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(rows) = self.sample_rows {
            config.sample_rows = rows;
        }
    }
}

fn open_database(config: &EngineConfig) -> Result<Arc<Database>> {
    let db = Database::open_or_in_memory(config.database_path.as_deref())
        .context("failed to open database")?;
    Ok(Arc::new(db))
}

/// engine for commands that never reach the completion service
fn open_engine(config: &EngineConfig) -> Result<QueryEngine> {
    let db = open_database(config)?;
    Ok(QueryEngine::without_client(db, EngineOptions::from(config)))
}

fn build_engine(config: &EngineConfig) -> Result<QueryEngine> {
    let db = open_database(config)?;
    let client = OpenAiClient::new(config.completion.clone())?;
    Ok(QueryEngine::new(db, Arc::new(client), EngineOptions::from(config)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list_files(engine: &QueryEngine) -> Result<()> {
    let files = engine.list_loadable_files()?;
    if files.is_empty() {
        tracing::info!("no loadable files found");
    }
    for file in files {
        println!("{}", file);
    }
    Ok(())
}

/// answer `question`, checking it before any database or client setup
async fn answer_question(config: &EngineConfig, question: &str) -> Result<QueryAnswer> {
    if question.trim().is_empty() {
        return Err(DuckAskError::EmptyQuestion.into());
    }

    let engine = build_engine(config)?;
    Ok(engine.answer(question).await?)
}

async fn ask(config: &EngineConfig, question: &str, format: OutputFormat) -> Result<()> {
    match answer_question(config, question).await {
        Ok(answer) => {
            println!("{}", render_answer(&answer, format)?);
            Ok(())
        }
        Err(e) => {
            if format == OutputFormat::Json {
                let kind = e.downcast_ref::<DuckAskError>().map(DuckAskError::kind);
                let payload = serde_json::json!({
                    "success": false,
                    "kind": kind.unwrap_or("internal"),
                    "error": format!("{:#}", e),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse_source("employees=data/employees.csv").unwrap(),
            ("employees".to_string(), PathBuf::from("data/employees.csv"))
        );
        assert!(parse_source("employees").is_err());
        assert!(parse_source("=x.csv").is_err());
        assert!(parse_source("t=").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["duckask", "load", "a=a.csv", "b=b.csv"]).unwrap();
        match cli.command {
            Commands::Load { sources } => assert_eq!(sources.len(), 2),
            _ => panic!("expected load"),
        }

        let cli = Cli::try_parse_from(["duckask", "ask", "how many?", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Ask { question, format, .. } => {
                assert_eq!(question, "how many?");
                assert!(format == OutputFormat::Json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[tokio::test]
    async fn test_empty_question_checked_before_setup() {
        let mut config = EngineConfig::default();
        config.completion.api_key = None;

        let err = answer_question(&config, "   ").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DuckAskError>(),
            Some(DuckAskError::EmptyQuestion)
        ));

        let err = answer_question(&config, "how many rows?").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DuckAskError>(),
            Some(DuckAskError::Config(_))
        ));
    }
}
