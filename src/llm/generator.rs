use crate::config::LlmConfig;
use crate::llm::extract::parse_response;
use crate::llm::locale::Language;
use crate::llm::models::{GenerationRequest, GenerationResult};
use crate::llm::prompt::PromptBuilder;
use crate::llm::{CompletionClient, LlmError, providers};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Turns a question plus schema document into `{sql, description}`.
///
/// [`generate`](Self::generate) never fails: blank inputs, completion errors
/// and unparsable responses all come back as a [`GenerationResult`].
pub struct SqlGenerationEngine {
    client: Arc<dyn CompletionClient>,
    prompt: PromptBuilder,
}

impl SqlGenerationEngine {
    pub fn new(client: Arc<dyn CompletionClient>, prompt: PromptBuilder) -> Self {
        Self { client, prompt }
    }

    /// Builds the completion backend named in the config. Fails if that
    /// backend needs credentials the config does not carry.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = providers::create_client(config)?;
        let prompt = PromptBuilder::new(&config.dialect, config.language)?;
        info!(
            "SQL generation engine ready (backend: {}, model: {}, dialect: {})",
            client.name(),
            config.model,
            config.dialect
        );
        Ok(Self::new(client, prompt))
    }

    pub fn language(&self) -> Language {
        self.prompt.language()
    }

    pub fn dialect(&self) -> &str {
        self.prompt.dialect()
    }

    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    pub async fn generate(&self, question: &str, schema_text: &str) -> GenerationResult {
        let language = self.language();
        let request = GenerationRequest::new(question, schema_text);

        if let Some(missing) = request.missing_input() {
            info!("Skipping SQL generation, missing input: {:?}", missing);
            return GenerationResult::missing_input(missing, language);
        }

        match self.try_generate(&request).await {
            Ok(result) => result,
            Err(e) => {
                error!("SQL generation failed: {}", e);
                GenerationResult::from_error(&e, language)
            }
        }
    }

    async fn try_generate(&self, request: &GenerationRequest) -> Result<GenerationResult, LlmError> {
        let system_prompt = self.prompt.build(&request.schema_text)?;

        info!("Sending question to {}", self.client.name());
        debug!("Question: {}", request.question);

        let content = self.client.complete(&system_prompt, &request.question).await?;
        debug!("Raw completion: {}", content);

        Ok(parse_response(&content, self.language()))
    }
}
