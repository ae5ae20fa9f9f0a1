pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod loader;
pub mod query;
pub mod schema;
pub mod tracing;

pub use config::EngineConfig;
pub use db::Database;
pub use error::{DuckAskError, Result};
pub use query::{QueryAnswer, QueryEngine};
