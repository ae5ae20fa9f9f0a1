use crate::agent::{build_prompt_with_samples, generate_sql};
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{DuckAskError, Result};
use crate::llm::CompletionClient;
use crate::loader;
use crate::query::executor::execute;
use crate::query::result::QueryAnswer;
use crate::schema::{extract_schema, sample_tables, SchemaDescription, TableSamples};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// rows per table included in the prompt; 0 disables sampling
    pub sample_rows: usize,
    /// directory scanned for loadable files and used to resolve relative paths
    pub data_dir: PathBuf,
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rows: config.sample_rows,
            data_dir: config.data_dir.clone(),
        }
    }
}

/// Answers natural language questions against the loaded tables.
///
/// Owns the database handle and the completion client. Every failure ends
/// only the current request; the engine stays usable afterwards.
pub struct QueryEngine {
    db: Arc<Database>,
    client: Option<Arc<dyn CompletionClient>>,
    options: EngineOptions,
}

impl QueryEngine {
    pub fn new(db: Arc<Database>, client: Arc<dyn CompletionClient>, options: EngineOptions) -> Self {
        Self {
            db,
            client: Some(client),
            options,
        }
    }

    /// Engine for loading and inspecting data only.
    ///
    /// [`QueryEngine::answer`] reports a `Config` error at the generation
    /// step.
    pub fn without_client(db: Arc<Database>, options: EngineOptions) -> Self {
        Self {
            db,
            client: None,
            options,
        }
    }

    fn client(&self) -> Result<&dyn CompletionClient> {
        self.client
            .as_deref()
            .ok_or_else(|| DuckAskError::Config("no completion client configured".to_string()))
    }

    /// run blocking database work off the async runtime
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DuckAskError::EngineUnavailable(format!("task join error: {}", e)))?
    }

    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DuckAskError::EmptyQuestion);
        }

        let sample_limit = self.options.sample_rows;
        let (schema, samples) = self
            .with_db(move |db| {
                let schema = extract_schema(db)?;
                if schema.is_empty() {
                    return Ok((schema, TableSamples::new()));
                }
                let samples = sample_tables(db, &schema, sample_limit)?;
                Ok((schema, samples))
            })
            .await?;

        if schema.is_empty() {
            return Err(DuckAskError::NoSchemaLoaded);
        }

        tracing::info!(tables = schema.table_count(), "answering question");

        let prompt = build_prompt_with_samples(&schema, &samples, question)?;
        let sql = generate_sql(self.client()?, &prompt).await?;

        let statement = sql.clone();
        let result = self.with_db(move |db| execute(db, &statement)).await?;

        let answer = QueryAnswer::new(sql, result);
        tracing::info!("{}", answer.message);
        Ok(answer)
    }

    pub async fn schema(&self) -> Result<SchemaDescription> {
        self.with_db(extract_schema).await
    }

    /// load `(table, path)` pairs; relative paths resolve against the data dir
    pub async fn load_files(&self, sources: Vec<(String, PathBuf)>) -> Result<SchemaDescription> {
        let data_dir = self.options.data_dir.clone();
        let resolved: Vec<(String, PathBuf)> = sources
            .into_iter()
            .map(|(table, path)| {
                let path = loader::resolve_source(&data_dir, &path);
                (table, path)
            })
            .collect();

        self.with_db(move |db| loader::load_files(db, &resolved)).await
    }

    pub async fn load_sample_data(&self) -> Result<SchemaDescription> {
        let data_dir = self.options.data_dir.clone();
        self.with_db(move |db| loader::load_sample_data(db, &data_dir))
            .await
    }

    pub fn list_loadable_files(&self) -> Result<BTreeSet<String>> {
        loader::list_loadable_files(&self.options.data_dir)
    }
}
