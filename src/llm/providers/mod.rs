pub mod anthropic;
pub mod ollama;
pub mod remote;

use crate::config::LlmConfig;
use crate::llm::{CompletionClient, LlmError};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

/// Creates the completion backend selected by `llm.backend`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn CompletionClient>, LlmError> {
    let client: Arc<dyn CompletionClient> = match config.backend.as_str() {
        "anthropic" => Arc::new(anthropic::AnthropicProvider::new(config)?),
        "remote" => Arc::new(remote::RemoteLlmProvider::new(config)?),
        "ollama" => Arc::new(ollama::OllamaProvider::new(config)?),
        _ => {
            return Err(LlmError::ConfigError(format!(
                "Unsupported LLM backend: {}",
                config.backend
            )));
        }
    };

    Ok(client)
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| LlmError::ConnectionError(e.to_string()))
}

/// Maps a non-success HTTP status and its body to the matching error class.
pub(crate) fn status_error(service: &str, status: StatusCode, body: &str) -> LlmError {
    let detail = if body.is_empty() {
        format!("{} responded with status code: {}", service, status)
    } else {
        format!("{} responded with status code: {} - Response body: {}", service, status, body)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthError(detail),
        _ => LlmError::ResponseError(detail),
    }
}
