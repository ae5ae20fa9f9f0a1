use async_trait::async_trait;
use common::db::ScalarValue;
use common::llm::{CompletionClient, Message};
use common::query::{EngineOptions, QueryEngine};
use common::{Database, DuckAskError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// deterministic completion client: maps the user prompt to a fixed reply
struct StubClient {
    respond: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn new(respond: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(sql: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(sql.to_string()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    fn model(&self) -> &str {
        "stub"
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());
        (self.respond)(&prompt)
    }
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn engine_with(client: Arc<StubClient>, data_dir: &Path, sample_rows: usize) -> QueryEngine {
    let db = Arc::new(Database::open_in_memory().unwrap());
    QueryEngine::new(
        db,
        client,
        EngineOptions {
            sample_rows,
            data_dir: data_dir.to_path_buf(),
        },
    )
}

const EMPLOYEES: &str = "id,department,salary\n1,Engineering,120000.5\n2,Sales,80000\n3,Engineering,95000\n";

#[tokio::test]
async fn answers_count_question_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::new(|prompt| {
        if prompt.contains("How many employees work in Engineering?") {
            Ok("```sql\nSELECT COUNT(*) AS count FROM employees WHERE department = 'Engineering';\n```"
                .to_string())
        } else {
            Ok("SELECT 0".to_string())
        }
    });
    let engine = engine_with(client.clone(), dir.path(), 0);

    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    let answer = engine
        .answer("How many employees work in Engineering?")
        .await
        .unwrap();

    assert!(answer.sql.contains("employees"));
    assert!(answer.sql.contains("department"));
    assert_eq!(answer.columns, vec!["count"]);
    assert_eq!(answer.rows.len(), 1);
    assert_eq!(answer.rows[0].get("count"), Some(&ScalarValue::Integer(2)));
    assert_eq!(answer.message, "Query executed successfully. Returned 1 row.");
    assert_eq!(client.calls(), 1);

    let prompt = client.last_prompt().unwrap();
    assert!(prompt.contains("employees(id:BIGINT, department:VARCHAR, salary:DOUBLE)"));
}

/// a database whose connection lock is poisoned: every access fails
fn poisoned_database() -> Arc<Database> {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let handle = Arc::clone(&db);
    let joined = std::thread::spawn(move || {
        let _: Result<()> = handle.with_connection(|_| panic!("poison the connection lock"));
    })
    .join();
    assert!(joined.is_err());
    db
}

#[tokio::test]
async fn empty_question_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let client = StubClient::replying("SELECT 1");
    let engine = QueryEngine::new(
        poisoned_database(),
        client.clone(),
        EngineOptions {
            sample_rows: 3,
            data_dir: dir.path().to_path_buf(),
        },
    );

    for question in ["", "   ", "\n\t"] {
        let err = engine.answer(question).await.unwrap_err();
        assert!(matches!(err, DuckAskError::EmptyQuestion));
    }
    assert_eq!(client.calls(), 0);

    // any question that reaches the database fails on the poisoned lock
    let err = engine.answer("how many rows?").await.unwrap_err();
    assert!(matches!(err, DuckAskError::EngineUnavailable(_)));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn question_before_load_reports_no_schema() {
    let dir = tempfile::tempdir().unwrap();
    let client = StubClient::replying("SELECT 1");
    let engine = engine_with(client.clone(), dir.path(), 3);

    let err = engine.answer("How many employees are there?").await.unwrap_err();
    assert!(matches!(err, DuckAskError::NoSchemaLoaded));
    assert_eq!(err.kind(), "no_schema_loaded");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn partial_load_keeps_first_table_queryable() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::replying("SELECT count(*) AS n FROM employees");
    let engine = engine_with(client, dir.path(), 0);

    let err = engine
        .load_files(vec![
            ("employees".to_string(), PathBuf::from("employees.csv")),
            ("orders".to_string(), PathBuf::from("orders.csv")),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, DuckAskError::SourceNotFound { .. }));
    assert_eq!(err.failed_table(), Some("orders"));

    let schema = engine.schema().await.unwrap();
    assert!(schema.contains_table("employees"));
    assert!(!schema.contains_table("orders"));

    let answer = engine.answer("how many employees?").await.unwrap();
    assert_eq!(answer.rows[0].get("n"), Some(&ScalarValue::Integer(3)));
}

#[tokio::test]
async fn write_statement_from_model_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::replying("drop table employees;");
    let engine = engine_with(client, dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    let err = engine.answer("remove everything").await.unwrap_err();
    assert!(matches!(err, DuckAskError::DisallowedStatement(_)));
    assert!(engine.schema().await.unwrap().contains_table("employees"));
}

#[tokio::test]
async fn model_cannot_smuggle_writes() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::new(|prompt| {
        if prompt.contains("explain") {
            Ok("EXPLAIN ANALYZE DELETE FROM employees".to_string())
        } else if prompt.contains("count") {
            Ok("SELECT count(*) AS n FROM employees".to_string())
        } else {
            Ok("SELECT $$'$$; DROP TABLE employees; SELECT $$'$$".to_string())
        }
    });
    let engine = engine_with(client.clone(), dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    // only the first statement survives extraction
    let answer = engine.answer("quote me").await.unwrap();
    assert_eq!(answer.sql, "SELECT $$'$$");
    assert_eq!(answer.rows[0].values(), &[ScalarValue::Text("'".to_string())]);

    let err = engine.answer("explain the plan").await.unwrap_err();
    assert!(matches!(err, DuckAskError::DisallowedStatement(_)));

    let answer = engine.answer("count them").await.unwrap();
    assert_eq!(answer.rows[0].get("n"), Some(&ScalarValue::Integer(3)));
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn engine_without_client_loads_but_cannot_answer() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let engine = QueryEngine::without_client(
        Arc::new(Database::open_in_memory().unwrap()),
        EngineOptions {
            sample_rows: 0,
            data_dir: dir.path().to_path_buf(),
        },
    );

    let err = engine.answer("anything").await.unwrap_err();
    assert!(matches!(err, DuckAskError::NoSchemaLoaded));

    let schema = engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();
    assert!(schema.contains_table("employees"));
    assert!(engine.list_loadable_files().unwrap().contains("employees.csv"));

    assert!(matches!(engine.answer("  ").await, Err(DuckAskError::EmptyQuestion)));
    assert!(matches!(engine.answer("anything").await, Err(DuckAskError::Config(_))));
}

#[tokio::test]
async fn engine_error_is_surfaced_and_engine_stays_usable() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::new(|prompt| {
        if prompt.contains("broken") {
            Ok("SELECT bonus FROM employees".to_string())
        } else {
            Ok("SELECT id FROM employees ORDER BY id".to_string())
        }
    });
    let engine = engine_with(client.clone(), dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    match engine.answer("a broken question").await.unwrap_err() {
        DuckAskError::QueryError(msg) => assert!(msg.contains("bonus"), "message: {msg}"),
        other => panic!("unexpected error: {other}"),
    }

    let answer = engine.answer("list ids").await.unwrap();
    assert_eq!(answer.rows.len(), 3);
    assert_eq!(answer.message, "Query executed successfully. Returned 3 rows.");
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn generation_failures_are_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::new(|_| {
        Err(DuckAskError::GenerationFailed("rate limited".to_string()))
    });
    let engine = engine_with(client.clone(), dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    let err = engine.answer("anything").await.unwrap_err();
    assert!(matches!(err, DuckAskError::GenerationFailed(_)));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn prose_reply_reports_no_sql() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::replying("I don't know which table holds that.");
    let engine = engine_with(client, dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    let err = engine.answer("who is the ceo?").await.unwrap_err();
    assert!(matches!(err, DuckAskError::NoSqlFound(_)));
}

#[tokio::test]
async fn sample_rows_reach_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let client = StubClient::replying("SELECT name FROM departments ORDER BY budget DESC LIMIT 1");
    let engine = engine_with(client.clone(), dir.path(), 2);

    let schema = engine.load_sample_data().await.unwrap();
    assert!(schema.contains_table("employees"));
    assert!(schema.contains_table("departments"));

    let files = engine.list_loadable_files().unwrap();
    assert!(files.contains("employees.csv"));
    assert!(files.contains("departments.csv"));

    let answer = engine.answer("which department has the largest budget?").await.unwrap();
    assert_eq!(
        answer.rows[0].get("name"),
        Some(&ScalarValue::Text("Engineering".to_string()))
    );

    let prompt = client.last_prompt().unwrap();
    assert!(prompt.contains("sample rows:"));
    assert!(prompt.contains("John Smith"));
    // only the first two employees are sampled
    assert!(!prompt.contains("Bob Johnson"));
}

#[tokio::test]
async fn answer_serializes_for_callers() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "employees.csv", EMPLOYEES);

    let client = StubClient::replying("SELECT id, department FROM employees WHERE id = 2");
    let engine = engine_with(client, dir.path(), 0);
    engine
        .load_files(vec![("employees".to_string(), PathBuf::from("employees.csv"))])
        .await
        .unwrap();

    let answer = engine.answer("who is employee 2?").await.unwrap();
    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "sql": "SELECT id, department FROM employees WHERE id = 2",
            "columns": ["id", "department"],
            "rows": [{"id": 2, "department": "Sales"}],
            "message": "Query executed successfully. Returned 1 row.",
        })
    );
}
