use crate::config::LlmConfig;
use crate::llm::providers::{http_client, status_error};
use crate::llm::{CompletionClient, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";

/// Local Ollama backend, no credential needed.
pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            client: http_client(config)?,
            api_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for OllamaProvider {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let request = OllamaRequest {
            model: &self.model,
            system: system_prompt,
            prompt: question,
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Ollama API responded with status code: {}", status);
            return Err(status_error("Ollama API", status, &body));
        }

        // Get the raw text response first for diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        let ollama_response: OllamaResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
            LlmError::ResponseError(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, response_text
            ))
        })?;

        Ok(ollama_response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::fake_endpoint;
    use axum::http::StatusCode;
    use serde_json::json;

    fn config_for(url: String) -> LlmConfig {
        LlmConfig {
            backend: "ollama".to_string(),
            model: "sqlcoder".to_string(),
            api_key: None,
            api_url: Some(url),
            max_tokens: 512,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_prompt() {
        let reply = json!({"model": "sqlcoder", "response": "SELECT 42", "done": true});
        let (url, captured) = fake_endpoint::spawn(StatusCode::OK, reply).await;
        let provider = OllamaProvider::new(&config_for(url)).unwrap();

        assert_eq!(provider.complete("rules", "answer?").await.unwrap(), "SELECT 42");

        let (_, body) = captured.single();
        assert_eq!(body["system"], "rules");
        assert_eq!(body["prompt"], "answer?");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 512);
    }

    #[tokio::test]
    async fn test_malformed_body_is_response_error() {
        let (url, _) = fake_endpoint::spawn(StatusCode::OK, json!({"unexpected": 1})).await;
        let provider = OllamaProvider::new(&config_for(url)).unwrap();
        assert!(matches!(
            provider.complete("s", "q").await,
            Err(LlmError::ResponseError(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let (url, _) = fake_endpoint::spawn(StatusCode::INTERNAL_SERVER_ERROR, json!("model not loaded")).await;
        let provider = OllamaProvider::new(&config_for(url)).unwrap();
        let err = provider.complete("s", "q").await.unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }
}
