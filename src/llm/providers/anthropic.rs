use crate::config::LlmConfig;
use crate::llm::providers::{http_client, status_error};
use crate::llm::{CompletionClient, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API backend.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LlmError::ConfigError(format!(
                    "Anthropic API key is required. Set llm.api_key or the {} environment variable.",
                    config.api_key_env
                ))
            })?;

        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            client: http_client(config)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicProvider {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.api_url);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: question,
            }],
        };

        info!("Sending request to Anthropic with model: {}", self.model);
        debug!("API URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Anthropic API responded with status code: {}", status);
            return Err(status_error("Anthropic API", status, &body));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to parse Anthropic response: {}", e)))?;

        body.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LlmError::ResponseError("No text content in Anthropic response".to_string()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
