use crate::db::ScalarValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// One result row: column name to value, in statement column order.
///
/// Duplicate column names (e.g. from a join) are kept; lookups by name
/// return the first match.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<ScalarValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<ScalarValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Successful answer to one natural language question.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryAnswer {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub message: String,
}

impl QueryAnswer {
    pub fn new(sql: String, result: QueryResult) -> Self {
        let message = summarize(result.row_count());
        Self {
            sql,
            columns: result.columns,
            rows: result.rows,
            message,
        }
    }
}

/// one-line row count summary shown next to results
pub fn summarize(row_count: usize) -> String {
    let noun = if row_count == 1 { "row" } else { "rows" };
    format!("Query executed successfully. Returned {} {}.", row_count, noun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, ScalarValue)]) -> Row {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        Row::new(columns, pairs.iter().map(|(_, v)| v.clone()).collect())
    }

    #[test]
    fn test_row_lookup_first_match() {
        let r = row(&[
            ("id", ScalarValue::Integer(1)),
            ("id", ScalarValue::Integer(2)),
        ]);
        assert_eq!(r.get("id"), Some(&ScalarValue::Integer(1)));
        assert_eq!(r.get("missing"), None);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let r = row(&[
            ("zeta", ScalarValue::Text("z".into())),
            ("alpha", ScalarValue::Null),
        ]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":null}"#);
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(0), "Query executed successfully. Returned 0 rows.");
        assert_eq!(summarize(1), "Query executed successfully. Returned 1 row.");
        assert_eq!(summarize(5), "Query executed successfully. Returned 5 rows.");
    }
}
