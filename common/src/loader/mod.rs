pub mod sample;

pub use sample::load_sample_data;

use crate::db::{quote_identifier, quote_literal, Database};
use crate::error::{DuckAskError, Result};
use crate::schema::{extract_schema, SchemaDescription};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

static TABLE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const LOADABLE_EXTENSIONS: &[&str] = &["csv", "tsv"];

pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(DuckAskError::InvalidTableName(name.to_string()))
    }
}

/// resolve a relative source path against the data directory
pub fn resolve_source(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

fn ensure_readable(table: &str, path: &Path) -> Result<()> {
    let readable = path.is_file() && File::open(path).is_ok();
    if readable {
        Ok(())
    } else {
        Err(DuckAskError::SourceNotFound {
            table: table.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// create or replace `table` from the delimited file at `path`
#[tracing::instrument(skip(db, path), fields(path = %path.display()))]
pub fn load_file(db: &Database, table: &str, path: &Path) -> Result<()> {
    validate_table_name(table)?;
    ensure_readable(table, path)?;

    let sql = format!(
        "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto({})",
        quote_identifier(table),
        quote_literal(&path.to_string_lossy())
    );

    db.with_connection(|conn| {
        conn.execute_batch(&sql).map_err(|e| DuckAskError::LoadFailed {
            table: table.to_string(),
            message: e.to_string(),
        })
    })
    .inspect_err(|e| tracing::error!("error loading {}: {}", path.display(), e))?;

    tracing::info!("loaded {} into table {}", path.display(), table);
    Ok(())
}

/// Load each `(table, path)` pair in order and return the refreshed schema.
///
/// Stops at the first failure. Tables loaded earlier in the same call stay
/// loaded; the error names the table that failed.
pub fn load_files<T, P>(db: &Database, sources: &[(T, P)]) -> Result<SchemaDescription>
where
    T: AsRef<str>,
    P: AsRef<Path>,
{
    for (table, path) in sources {
        load_file(db, table.as_ref(), path.as_ref())?;
    }

    tracing::info!("loaded {} tables", sources.len());
    extract_schema(db)
}

/// names of the delimited files found in `data_dir`
pub fn list_loadable_files(data_dir: &Path) -> Result<BTreeSet<String>> {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let loadable = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| LOADABLE_EXTENSIONS.iter().any(|l| e.eq_ignore_ascii_case(l)))
            .unwrap_or(false);

        if let (true, Some(name)) = (loadable, path.file_name().and_then(|n| n.to_str())) {
            files.insert(name.to_string());
        }
    }

    Ok(files)
}
