use anyhow::Result;
use common::QueryAnswer;

/// Maximum column width before truncation
const MAX_COLUMN_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn truncate_value(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else {
        let take = max_width.saturating_sub(3);
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}

/// render rows as an ascii table followed by the summary message
pub fn render_table(answer: &QueryAnswer) -> String {
    let mut widths: Vec<usize> = answer.columns.iter().map(|c| c.chars().count()).collect();

    let cells: Vec<Vec<String>> = answer
        .rows
        .iter()
        .map(|row| {
            row.values()
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let text = truncate_value(&value.to_string(), MAX_COLUMN_WIDTH);
                    if let Some(w) = widths.get_mut(i) {
                        *w = (*w).max(text.chars().count());
                    }
                    text
                })
                .collect()
        })
        .collect();

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let line = |values: &[String]| {
        let inner: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {} ", pad(v, *w)))
            .collect();
        format!("|{}|", inner.join("|"))
    };

    let mut out = Vec::new();
    out.push(format!("sql: {}", answer.sql));
    if !answer.columns.is_empty() {
        out.push(border.clone());
        out.push(line(&answer.columns));
        out.push(border.clone());
        for row in &cells {
            out.push(line(row));
        }
        out.push(border);
    }
    out.push(answer.message.clone());
    out.join("\n")
}

pub fn render_answer(answer: &QueryAnswer, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(answer)),
        OutputFormat::Json => {
            let mut payload = serde_json::to_value(answer)?;
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("success".to_string(), serde_json::Value::Bool(true));
            }
            Ok(serde_json::to_string_pretty(&payload)?)
        }
    }
}
