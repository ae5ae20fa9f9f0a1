use crate::db::{Database, ScalarValue};
use crate::error::{DuckAskError, Result};
use crate::query::lexer::{is_single_statement, skip_trivia};
use crate::query::result::{QueryResult, Row};
use duckdb::types::Value;
use duckdb::Connection;
use std::sync::Arc;

/// leading verbs that write, change schema, control transactions or touch
/// session state
const DISALLOWED_VERBS: &[&str] = &[
    "ABORT",
    "ALTER",
    "ATTACH",
    "BEGIN",
    "CALL",
    "CHECKPOINT",
    "COMMIT",
    "COPY",
    "CREATE",
    "DELETE",
    "DETACH",
    "DROP",
    "EXPORT",
    "GRANT",
    "IMPORT",
    "INSERT",
    "INSTALL",
    "LOAD",
    "MERGE",
    "REPLACE",
    "RESET",
    "REVOKE",
    "ROLLBACK",
    "SET",
    "START",
    "TRUNCATE",
    "UPDATE",
    "UPSERT",
    "USE",
    "VACUUM",
];

/// pragmas that only report state
const READ_PRAGMAS: &[&str] = &[
    "COLLATIONS",
    "DATABASE_LIST",
    "DATABASE_SIZE",
    "FUNCTIONS",
    "METADATA_INFO",
    "PLATFORM",
    "SHOW",
    "SHOW_DATABASES",
    "SHOW_TABLES",
    "SHOW_TABLES_EXPANDED",
    "STORAGE_INFO",
    "TABLE_INFO",
    "USER_AGENT",
    "VERSION",
];

/// words that may open a parenthesized query rather than an option list
const QUERY_OPENERS: &[&str] = &["FROM", "SELECT", "TABLE", "VALUES", "WITH"];

/// next word in `text` and the text after it, skipping whitespace, comments
/// and open parens
fn next_word(text: &str) -> Option<(String, &str)> {
    let mut rest = text;
    loop {
        rest = skip_trivia(rest);
        match rest.strip_prefix('(') {
            Some(after) => rest = after,
            None => break,
        }
    }

    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());

    if len == 0 {
        None
    } else {
        Some((rest[..len].to_ascii_uppercase(), &rest[len..]))
    }
}

/// first keyword of `sql`, skipping whitespace, comments and open parens
pub fn leading_keyword(sql: &str) -> Option<String> {
    next_word(sql).map(|(word, _)| word)
}

/// text after an `(option, ...)` list, when `text` opens with one
fn skip_option_list(text: &str) -> Option<&str> {
    let inner = skip_trivia(text).strip_prefix('(')?;
    match next_word(inner) {
        Some((word, _)) if QUERY_OPENERS.contains(&word.as_str()) => None,
        _ => inner.split_once(')').map(|(_, tail)| tail),
    }
}

/// the statement `EXPLAIN [ANALYZE] [(options)]` wraps
fn explained_statement(mut rest: &str) -> &str {
    loop {
        if let Some(after) = skip_option_list(rest) {
            rest = after;
            continue;
        }
        match next_word(rest) {
            Some((word, after)) if word == "ANALYZE" || word == "ANALYSE" => rest = after,
            _ => return rest,
        }
    }
}

fn disallowed(what: &str) -> DuckAskError {
    DuckAskError::DisallowedStatement(format!(
        "{} statements are not allowed; only read-only queries run",
        what
    ))
}

fn ensure_read_pragma(rest: &str) -> Result<()> {
    let name = next_word(rest).map(|(word, after)| (word, skip_trivia(after)));
    match name {
        Some((name, after)) if READ_PRAGMAS.contains(&name.as_str()) && !after.starts_with('=') => {
            Ok(())
        }
        Some((name, _)) => Err(disallowed(&format!("PRAGMA {}", name))),
        None => Err(disallowed("PRAGMA")),
    }
}

/// Reject anything but a single read-only statement.
///
/// Checks the leading verb against the write, ddl, transaction and session
/// verbs, looks through `EXPLAIN [ANALYZE]` at the wrapped statement, allows
/// only reporting pragmas, and refuses input holding more than one statement.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    if !is_single_statement(sql) {
        return Err(DuckAskError::DisallowedStatement(
            "multiple statements are not allowed; only one read-only query runs".to_string(),
        ));
    }

    let Some((verb, rest)) = next_word(sql) else {
        return Ok(());
    };

    match verb.as_str() {
        "EXPLAIN" => match leading_keyword(explained_statement(rest)) {
            Some(inner) if DISALLOWED_VERBS.contains(&inner.as_str()) => {
                Err(disallowed(&format!("EXPLAIN {}", inner)))
            }
            Some(inner) if inner == "PRAGMA" => Err(disallowed("EXPLAIN PRAGMA")),
            _ => Ok(()),
        },
        "PRAGMA" => ensure_read_pragma(rest),
        v if DISALLOWED_VERBS.contains(&v) => Err(disallowed(v)),
        _ => Ok(()),
    }
}

fn query_error(e: duckdb::Error) -> DuckAskError {
    DuckAskError::QueryError(e.to_string())
}

/// run `sql` on an already acquired connection and materialize every row
pub(crate) fn run_statement(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let mut rows = stmt.query([]).map_err(query_error)?;

    let columns: Arc<[String]> = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default()
        .into();
    let width = columns.len();

    let mut materialized = Vec::new();
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let value: Value = row.get(i).map_err(query_error)?;
            values.push(ScalarValue::from(value));
        }
        materialized.push(Row::new(Arc::clone(&columns), values));
    }

    Ok(QueryResult {
        columns: columns.to_vec(),
        rows: materialized,
    })
}

/// run one read-only statement, exactly once
///
/// Rejected statements never reach the connection.
#[tracing::instrument(skip(db, sql), fields(sql_len = sql.len()))]
pub fn execute(db: &Database, sql: &str) -> Result<QueryResult> {
    ensure_read_only(sql)?;

    let result = db.with_connection(|conn| run_statement(conn, sql));

    match &result {
        Ok(r) => tracing::info!(rows = r.row_count(), columns = r.columns.len(), "query executed"),
        Err(e) => tracing::warn!("query failed: {}", e),
    }

    result
}
