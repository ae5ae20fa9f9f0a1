use crate::error::{DuckAskError, Result};
use crate::schema::{SchemaDescription, TableSamples};

pub const SQL_SYSTEM_PROMPT: &str =
    "You are a SQL expert that converts natural language questions into DuckDB SQL queries. \
     Only respond with a single read-only SQL query and nothing else.";

const TASK_RULES: &str = "\
- respond with exactly one syntactically valid DuckDB SQL statement.
- the statement must be read-only: SELECT (optionally with WITH). \
no INSERT, UPDATE, DELETE, CREATE, DROP, ALTER or any other DDL/DML.
- use only the tables and columns listed above.
- return only the SQL, without explanation or markdown formatting.";

/// render the schema as one `table(col:type, ...)` line per table
pub fn render_schema(schema: &SchemaDescription) -> String {
    schema
        .tables()
        .map(|(table, columns)| {
            let cols: Vec<String> = columns
                .iter()
                .map(|c| format!("{}:{}", c.name, c.data_type))
                .collect();
            format!("{}({})", table, cols.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_samples(samples: &TableSamples) -> Result<Option<String>> {
    let mut blocks = Vec::new();
    for (table, rows) in samples.iter().filter(|(_, rows)| !rows.is_empty()) {
        let lines = rows
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        blocks.push(format!("{}:\n{}", table, lines.join("\n")));
    }

    if blocks.is_empty() {
        Ok(None)
    } else {
        Ok(Some(blocks.join("\n\n")))
    }
}

/// build the translation prompt for `question` against `schema`
pub fn build_prompt(schema: &SchemaDescription, question: &str) -> Result<String> {
    build_prompt_with_samples(schema, &TableSamples::new(), question)
}

/// like [`build_prompt`], adding sample rows per table when present
pub fn build_prompt_with_samples(
    schema: &SchemaDescription,
    samples: &TableSamples,
    question: &str,
) -> Result<String> {
    if schema.is_empty() {
        return Err(DuckAskError::EmptySchema);
    }

    let mut prompt = format!(
        "Given the following DuckDB database schema:\n\n{}\n",
        render_schema(schema)
    );

    if let Some(sample_text) = render_samples(samples)? {
        prompt.push_str(&format!("\nsample rows:\n{}\n", sample_text));
    }

    prompt.push_str(&format!(
        "\nConvert this question into a DuckDB SQL query:\n\"{}\"\n\nrules:\n{}",
        question, TASK_RULES
    ));

    Ok(prompt)
}
