use crate::agent::parser::extract_sql;
use crate::agent::prompt::SQL_SYSTEM_PROMPT;
use crate::error::{DuckAskError, Result};
use crate::llm::model::{CompletionClient, Message};

/// send `prompt` to the completion service and extract one sql statement
#[tracing::instrument(skip(client, prompt), fields(llm.model = %client.model(), prompt_len = prompt.len()))]
pub async fn generate_sql(client: &dyn CompletionClient, prompt: &str) -> Result<String> {
    let messages = vec![Message::system(SQL_SYSTEM_PROMPT), Message::user(prompt)];

    let output = client.complete(messages).await?;

    if output.trim().is_empty() {
        return Err(DuckAskError::GenerationFailed(
            "completion service returned an empty response".to_string(),
        ));
    }

    let sql = extract_sql(&output)?;
    tracing::info!("generated sql: {}", sql);
    Ok(sql)
}
