use crate::llm::LlmError;
use crate::llm::locale::Language;
use minijinja::{Environment, context};
use tracing::debug;

const TEMPLATE_NAME: &str = "system_prompt.txt";

const SYSTEM_TEMPLATE: &str = r#"You are an expert SQL developer for {{ dialect }}. Convert natural language to SQL.

Database Schema:
{{ schema }}

Rules:
1. Generate only valid {{ dialect }} SQL
2. Use appropriate JOINs when needed, prefer them over subqueries where natural
3. Include proper WHERE clauses whenever the question implies filtering
4. Use meaningful aliases
5. Return description in {{ language }} language
6. Be careful of column data types
7. Use proper {{ dialect }} date functions for date columns
8. Handle NULL values appropriately

IMPORTANT: Return ONLY the JSON format below, nothing else:
{
    "sql": "YOUR_SQL_QUERY_HERE",
    "description": "{{ description_hint }}"
}

Do not include any additional text, explanations, or markdown formatting. Just the JSON."#;

/// Renders the grounding instruction sent as the system turn.
///
/// The output depends only on the schema text and the dialect/language fixed at
/// construction; the user's question is never interpolated.
pub struct PromptBuilder {
    env: Environment<'static>,
    dialect: String,
    language: Language,
}

impl PromptBuilder {
    pub fn new(dialect: &str, language: Language) -> Result<Self, LlmError> {
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, SYSTEM_TEMPLATE)?;

        Ok(Self {
            env,
            dialect: dialect.to_string(),
            language,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn build(&self, schema_text: &str) -> Result<String, LlmError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        let prompt = template.render(context! {
            dialect => self.dialect.as_str(),
            schema => schema_text,
            language => self.language.name(),
            description_hint => self.language.description_hint(),
        })?;

        debug!("Prepared system prompt ({} chars)", prompt.len());
        Ok(prompt)
    }
}
