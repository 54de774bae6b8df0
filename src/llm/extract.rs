//! Recovery of `{sql, description}` from raw completion text.
//!
//! Two tiers: [`extract_structured`] decodes the outermost JSON object in the
//! text, and [`extract_heuristic`] scans lines when that fails. Together they
//! always produce a [`GenerationResult`] with non-empty SQL.

use crate::llm::locale::Language;
use crate::llm::models::{GenerationResult, NO_SQL_GENERATED};
use serde_json::Value;
use tracing::debug;

/// Upper-case substrings that mark a line as SQL.
pub const SQL_KEYWORDS: [&str; 8] = [
    "SELECT", "FROM", "WHERE", "JOIN", "GROUP BY", "ORDER BY", "HAVING", "LIMIT",
];

const CODE_FENCE: &str = "```";
const SQL_FIELD_MARKER: &str = "\"sql\":";
const DESCRIPTION_FIELD_MARKER: &str = "\"description\":";

/// Parse a completion: structured first, heuristic fallback second.
pub fn parse_response(content: &str, language: Language) -> GenerationResult {
    match extract_structured(content, language) {
        Some(result) => result,
        None => {
            debug!("Structured extraction failed, using fallback extraction");
            extract_heuristic(content, language)
        }
    }
}

/// Strips one layer of surrounding double quotes and un-escapes `\"`.
pub fn clean_sql_fragment(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unquoted.replace("\\\"", "\"").trim().to_string()
}

/// Decodes the span from the first `{` to the last `}` as a JSON object.
///
/// Returns `None` when there is no such span, it does not decode, or it lacks
/// a non-blank string `sql` field.
pub fn extract_structured(content: &str, language: Language) -> Option<GenerationResult> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }

    let candidate = &content[start..=end];
    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            debug!("JSON decode error: {}", e);
            return None;
        }
    };

    let sql = value
        .get("sql")
        .and_then(Value::as_str)
        .map(clean_sql_fragment)
        .filter(|sql| !sql.is_empty())?;

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(language.no_description())
        .to_string();

    debug!("Extracted SQL from JSON: {}", sql);
    Some(GenerationResult { sql, description })
}

/// Line-based recovery for responses that are not a usable JSON object.
pub fn extract_heuristic(content: &str, language: Language) -> GenerationResult {
    let lines = content.lines().map(str::trim).filter(|line| !line.is_empty());
    let (sql, description) = scan_lines(lines);

    let sql = sql.unwrap_or_else(|| NO_SQL_GENERATED.to_string());
    let description = description.unwrap_or_else(|| language.generated_from_question().to_string());

    debug!("Fallback extracted SQL: {}", sql);
    GenerationResult { sql, description }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    BeforeContent,
    InSql,
    InDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Sql,
    Fence,
    WrapperArtifact,
    /// `"description": ...` with the raw text after the marker.
    DescriptionField(&'a str),
    Text,
}

fn classify(line: &str) -> LineKind<'_> {
    // Before the keyword test: description text never reaches the SQL
    if let Some(rest) = line.strip_prefix(DESCRIPTION_FIELD_MARKER) {
        return LineKind::DescriptionField(rest);
    }

    let upper = line.to_uppercase();
    if SQL_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        LineKind::Sql
    } else if line.starts_with(CODE_FENCE) {
        LineKind::Fence
    } else if is_wrapper_artifact(line) {
        LineKind::WrapperArtifact
    } else {
        LineKind::Text
    }
}

fn is_wrapper_artifact(line: &str) -> bool {
    line.contains(SQL_FIELD_MARKER)
        || line.contains(DESCRIPTION_FIELD_MARKER)
        || (!line.is_empty() && line.chars().all(|c| matches!(c, '{' | '}' | ',')))
}

/// Value of a half-written `"description": "...",` line, unquoted.
fn clean_description_value(raw: &str) -> String {
    clean_sql_fragment(raw.trim().trim_end_matches(','))
}

/// Cleans a line destined for the SQL accumulator, including the remnants of
/// a half-written JSON field (`"sql": "SELECT ...",`).
fn clean_sql_line(line: &str) -> String {
    let mut text = line.trim();
    if let Some(rest) = text.strip_prefix(SQL_FIELD_MARKER) {
        text = rest.trim_start();
        if !text.ends_with('"') {
            text = text.strip_prefix('"').unwrap_or(text);
        }
    }
    if let Some(rest) = text.strip_suffix("\",") {
        text = if rest.starts_with('"') { &text[..text.len() - 1] } else { rest };
    }
    clean_sql_fragment(text)
}

/// The fallback state machine: a pure function from trimmed, non-empty lines
/// to the joined SQL and description, `None` where nothing accumulated.
fn scan_lines<'a>(lines: impl Iterator<Item = &'a str>) -> (Option<String>, Option<String>) {
    let mut state = ScanState::BeforeContent;
    let mut sql_lines: Vec<String> = Vec::new();
    let mut description_lines: Vec<String> = Vec::new();

    for line in lines {
        match (classify(line), state) {
            (LineKind::DescriptionField(raw), _) => {
                state = ScanState::InDescription;
                let value = clean_description_value(raw);
                if !value.is_empty() {
                    description_lines.push(value);
                }
            }
            (LineKind::Sql, _) | (LineKind::Text, ScanState::InSql) => {
                state = ScanState::InSql;
                let cleaned = clean_sql_line(line);
                if !cleaned.is_empty() {
                    sql_lines.push(cleaned);
                }
            }
            (LineKind::Fence | LineKind::WrapperArtifact, ScanState::InSql) => {
                state = ScanState::InDescription;
            }
            (LineKind::Fence | LineKind::WrapperArtifact, _) => {}
            (LineKind::Text, _) => description_lines.push(line.to_string()),
        }
    }

    let join = |parts: Vec<String>| (!parts.is_empty()).then(|| parts.join(" "));
    (
        join(sql_lines),
        join(description_lines),
    )
}
