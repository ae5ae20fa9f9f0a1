pub mod description;
pub mod extract;

pub use description::{Column, SchemaDescription, TableSamples};
pub use extract::{extract_schema, sample_rows, sample_tables};
