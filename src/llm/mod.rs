pub mod extract;
pub mod generator;
pub mod locale;
pub mod models;
pub mod prompt;
pub mod providers;

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

pub use generator::SqlGenerationEngine;
pub use models::{GenerationRequest, GenerationResult};

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    AuthError(String),
    ResponseError(String),
    ConfigError(String),
    PromptError(String),
}

impl LlmError {
    /// Variant name, used to tag error sentinel queries.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::ConnectionError(_) => "ConnectionError",
            LlmError::AuthError(_) => "AuthError",
            LlmError::ResponseError(_) => "ResponseError",
            LlmError::ConfigError(_) => "ConfigError",
            LlmError::PromptError(_) => "PromptError",
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::AuthError(msg) => write!(f, "LLM authentication error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
            LlmError::PromptError(msg) => write!(f, "LLM prompt error: {}", msg),
        }
    }
}

impl Error for LlmError {}

impl From<minijinja::Error> for LlmError {
    fn from(e: minijinja::Error) -> Self {
        LlmError::PromptError(e.to_string())
    }
}

/// A language-model completion backend.
///
/// Implementations send the grounding instruction as the system turn and the
/// question verbatim as the user turn, and return the raw completion text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, LlmError>;

    /// Backend name for logs and status output.
    fn name(&self) -> &str;
}
