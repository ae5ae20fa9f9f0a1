pub mod value;

pub use value::ScalarValue;

use crate::error::{DuckAskError, Result};
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Owned handle to the embedded duckdb database.
///
/// All statements go through [`Database::with_connection`], which holds the
/// connection lock for exactly one closure. Concurrent callers are serialized.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DuckAskError::EngineUnavailable(e.to_string()))?;

        tracing::info!("opened in-memory duckdb database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            DuckAskError::EngineUnavailable(format!("failed to open {}: {}", path.display(), e))
        })?;

        tracing::info!("opened duckdb database at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// open `path` when given, otherwise an in-memory database
    pub fn open_or_in_memory(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::open(p),
            None => Self::open_in_memory(),
        }
    }

    /// run `f` with exclusive access to the connection
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| DuckAskError::EngineUnavailable("connection lock poisoned".to_string()))?;

        f(&guard)
    }
}

/// double-quote an identifier for interpolation into sql text
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// single-quote a string literal for interpolation into sql text
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
