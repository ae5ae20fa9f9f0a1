pub mod generator;
pub mod parser;
pub mod prompt;

pub use generator::generate_sql;
pub use parser::extract_sql;
pub use prompt::{build_prompt, build_prompt_with_samples, render_schema, SQL_SYSTEM_PROMPT};
