pub mod engine;
pub mod executor;
pub(crate) mod lexer;
pub mod result;

pub use engine::{EngineOptions, QueryEngine};
pub use executor::{ensure_read_only, execute, leading_keyword};
pub use result::{summarize, QueryAnswer, QueryResult, Row};
