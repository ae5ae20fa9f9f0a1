use crate::query::result::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// engine-native type name, e.g. `BIGINT` or `VARCHAR`
    #[serde(rename = "type")]
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Snapshot of the loaded tables: table name to columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescription {
    tables: BTreeMap<String, Vec<Column>>,
}

/// sample rows per table, used only as prompt context
pub type TableSamples = BTreeMap<String, Vec<Row>>;

impl SchemaDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn columns(&self, table: &str) -> Option<&[Column]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn push_column(&mut self, table: impl Into<String>, column: Column) {
        self.tables.entry(table.into()).or_default().push(column);
    }

    pub fn insert_table(&mut self, table: impl Into<String>, columns: Vec<Column>) {
        self.tables.insert(table.into(), columns);
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// tables in name order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Column])> {
        self.tables
            .iter()
            .map(|(name, cols)| (name.as_str(), cols.as_slice()))
    }
}
