use crate::config::CompletionConfig;
use crate::error::{DuckAskError, Result};
use crate::llm::model::{CompletionClient, Message};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    config: CompletionConfig,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DuckAskError::Config(format!("failed to build http client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        tracing::info!(model = %config.model, endpoint = %endpoint, "completion client ready");

        Ok(Self {
            http,
            endpoint,
            api_key,
            config,
        })
    }
}

/// pull the first choice's text out of a chat completion body
pub(crate) fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        DuckAskError::GenerationFailed(format!("unreadable completion response: {}", e))
    })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(DuckAskError::GenerationFailed(
            "completion service returned an empty response".to_string(),
        ));
    }

    Ok(content)
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[tracing::instrument(skip(self, messages), fields(llm.model = %self.config.model, message_count = messages.len()))]
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DuckAskError::GenerationFailed(format!(
                        "completion request timed out after {:?}",
                        self.config.timeout
                    ))
                } else {
                    DuckAskError::GenerationFailed(format!("completion request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            DuckAskError::GenerationFailed(format!("failed to read completion body: {}", e))
        })?;

        if !status.is_success() {
            tracing::warn!(%status, "completion service returned an error");
            return Err(DuckAskError::GenerationFailed(format!(
                "completion service returned {}: {}",
                status,
                body.trim()
            )));
        }

        let content = parse_completion(&body)?;
        tracing::debug!("completion returned {} chars", content.len());
        Ok(content)
    }
}
