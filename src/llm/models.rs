use crate::llm::LlmError;
use crate::llm::locale::Language;
use serde::{Deserialize, Serialize};

pub const NO_QUERY_SQL: &str = "SELECT 1 AS no_query";
pub const NO_SCHEMA_SQL: &str = "SELECT 1 AS no_schema";
pub const NO_SQL_GENERATED: &str = "SELECT 1 AS no_sql_generated";

// Input data for SQL generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub question: String,
    pub schema_text: String,
}

/// Which required input of a request was blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Question,
    Schema,
}

impl GenerationRequest {
    pub fn new(question: &str, schema_text: &str) -> Self {
        Self {
            question: question.to_string(),
            schema_text: schema_text.to_string(),
        }
    }

    pub fn missing_input(&self) -> Option<MissingInput> {
        if self.question.trim().is_empty() {
            Some(MissingInput::Question)
        } else if self.schema_text.trim().is_empty() {
            Some(MissingInput::Schema)
        } else {
            None
        }
    }
}

// Output from SQL generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub sql: String,
    pub description: String,
}

impl GenerationResult {
    pub fn new(sql: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            description: description.into(),
        }
    }

    /// Sentinel returned before any completion call when an input is blank.
    pub fn missing_input(missing: MissingInput, language: Language) -> Self {
        match missing {
            MissingInput::Question => Self::new(NO_QUERY_SQL, language.no_question()),
            MissingInput::Schema => Self::new(NO_SCHEMA_SQL, language.no_schema()),
        }
    }

    /// Sentinel carrying an error-classified marker query and the error text.
    pub fn from_error(err: &LlmError, language: Language) -> Self {
        Self::new(
            format!("SELECT 1 AS error_{}", err.kind()),
            format!("{}{}", language.generation_error_prefix(), err),
        )
    }

    /// True for any of the placeholder queries produced instead of real SQL.
    pub fn is_sentinel(&self) -> bool {
        self.sql == NO_QUERY_SQL
            || self.sql == NO_SCHEMA_SQL
            || self.sql == NO_SQL_GENERATED
            || self.sql.starts_with("SELECT 1 AS error_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_detection() {
        assert_eq!(
            GenerationRequest::new("  ", "Table: t").missing_input(),
            Some(MissingInput::Question)
        );
        assert_eq!(
            GenerationRequest::new("how many?", "\n\t").missing_input(),
            Some(MissingInput::Schema)
        );
        assert_eq!(GenerationRequest::new("how many?", "Table: t").missing_input(), None);
    }

    #[test]
    fn test_error_sentinel_carries_kind_and_message() {
        let err = LlmError::ConnectionError("connection refused".to_string());
        let result = GenerationResult::from_error(&err, Language::English);
        assert_eq!(result.sql, "SELECT 1 AS error_ConnectionError");
        assert!(result.description.contains("connection refused"));
        assert!(result.is_sentinel());
    }

    #[test]
    fn test_regular_result_is_not_sentinel() {
        assert!(!GenerationResult::new("SELECT * FROM t", "all rows").is_sentinel());
    }
}
