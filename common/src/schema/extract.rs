use crate::db::{quote_identifier, Database};
use crate::error::{DuckAskError, Result};
use crate::query::executor::run_statement;
use crate::query::result::Row;
use crate::schema::description::{Column, SchemaDescription, TableSamples};

const SCHEMA_QUERY: &str = "\
    SELECT table_name, column_name, data_type \
    FROM information_schema.columns \
    WHERE table_schema = 'main' AND table_catalog = current_database() \
    ORDER BY table_name, ordinal_position";

/// describe every user table currently in the database
#[tracing::instrument(skip(db))]
pub fn extract_schema(db: &Database) -> Result<SchemaDescription> {
    let schema = db.with_connection(|conn| {
        let mut stmt = conn
            .prepare(SCHEMA_QUERY)
            .map_err(|e| DuckAskError::EngineUnavailable(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| DuckAskError::EngineUnavailable(e.to_string()))?;

        let mut schema = SchemaDescription::new();
        for row in rows {
            let (table, column, data_type) =
                row.map_err(|e| DuckAskError::EngineUnavailable(e.to_string()))?;
            schema.push_column(table, Column::new(column, data_type));
        }

        Ok(schema)
    })?;

    tracing::debug!(tables = schema.table_count(), "extracted schema");
    Ok(schema)
}

/// first `limit` rows of `table`
pub fn sample_rows(db: &Database, table: &str, limit: usize) -> Result<Vec<Row>> {
    let sql = format!("SELECT * FROM {} LIMIT {}", quote_identifier(table), limit);
    let result = db.with_connection(|conn| run_statement(conn, &sql))?;
    Ok(result.rows)
}

/// sample rows for every table in `schema`
#[tracing::instrument(skip(db, schema), fields(tables = schema.table_count()))]
pub fn sample_tables(db: &Database, schema: &SchemaDescription, limit: usize) -> Result<TableSamples> {
    let mut samples = TableSamples::new();
    if limit == 0 {
        return Ok(samples);
    }

    for table in schema.table_names() {
        samples.insert(table.to_string(), sample_rows(db, table, limit)?);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with(sql: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| DuckAskError::QueryError(e.to_string()))
        })
        .unwrap();
        db
    }

    #[test]
    fn test_extract_schema_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let schema = extract_schema(&db).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_extract_schema_declaration_order() {
        let db = db_with(
            "CREATE TABLE people (zeta VARCHAR, alpha INTEGER, mid DOUBLE);
             CREATE TABLE cities (name VARCHAR);",
        );

        let schema = extract_schema(&db).unwrap();
        assert_eq!(schema.table_count(), 2);

        let cols = schema.columns("people").unwrap();
        assert_eq!(
            cols,
            &[
                Column::new("zeta", "VARCHAR"),
                Column::new("alpha", "INTEGER"),
                Column::new("mid", "DOUBLE"),
            ]
        );
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["cities", "people"]);
    }

    #[test]
    fn test_extract_schema_is_a_snapshot() {
        let db = db_with("CREATE TABLE a (x INTEGER);");
        let before = extract_schema(&db).unwrap();

        db.with_connection(|conn| {
            conn.execute_batch("CREATE TABLE b (y INTEGER);")
                .map_err(|e| DuckAskError::QueryError(e.to_string()))
        })
        .unwrap();

        assert!(!before.contains_table("b"));
        assert!(extract_schema(&db).unwrap().contains_table("b"));
    }

    #[test]
    fn test_sample_rows_limit() {
        let db = db_with(
            "CREATE TABLE n AS SELECT range AS v FROM range(10);",
        );

        let rows = sample_rows(&db, "n", 3).unwrap();
        assert_eq!(rows.len(), 3);

        let schema = extract_schema(&db).unwrap();
        assert!(sample_tables(&db, &schema, 0).unwrap().is_empty());
        assert_eq!(sample_tables(&db, &schema, 2).unwrap()["n"].len(), 2);
    }
}
