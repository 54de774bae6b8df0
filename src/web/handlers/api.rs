use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::chart::{ChartSpec, select_chart};
use crate::db::{DbError, QueryResult, schema};
use crate::llm::GenerationResult;
use crate::llm::locale::Language;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize, Clone)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
}

// Response types

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub question: String,
    pub sql: String,
    pub description: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub result: QueryResult,
    pub chart: ChartSpec,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub generation: GenerationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub backend: String,
    pub model: String,
    pub dialect: String,
    pub language: Language,
    pub database_ok: bool,
}

fn db_error_status(e: &DbError) -> StatusCode {
    match e {
        DbError::Pool(_) | DbError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

// A failed introspection leaves the schema blank, which the engine answers with its sentinel
async fn schema_for_prompt(state: &AppState) -> String {
    match schema::describe(&state.db_pool).await {
        Ok(schema_text) => schema_text,
        Err(e) => {
            error!("Failed to describe database schema: {}", e);
            String::new()
        }
    }
}

async fn run_with_chart(state: &AppState, sql: &str) -> Result<(QueryResult, ChartSpec), DbError> {
    let result = state.executor.execute(sql).await?;
    let chart = select_chart(&result.columns, &result.rows);
    debug!("Selected {:?} chart for {} columns", chart.kind, result.columns.len());
    Ok((result, chart))
}

// API Implementations

// Natural language to SQL, without execution
pub async fn generate_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Json<GenerateResponse> {
    info!("Generating SQL for question: {}", payload.question);

    let schema_text = schema_for_prompt(&state).await;
    let generation = state.engine.generate(&payload.question, &schema_text).await;

    Json(GenerateResponse {
        question: payload.question,
        sql: generation.sql,
        description: generation.description,
        generated_at: chrono::Utc::now(),
    })
}

// Query execution
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let (result, chart) = run_with_chart(&state, &payload.sql)
        .await
        .map_err(|e| (db_error_status(&e), format!("SQL error: {}", e)))?;

    Ok(Json(QueryResponse { result, chart }))
}

// Generate, then execute whatever came back
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Json<AskResponse> {
    let schema_text = schema_for_prompt(&state).await;
    let generation = state.engine.generate(&payload.question, &schema_text).await;

    if generation.is_sentinel() {
        warn!("Question produced a placeholder query: {}", generation.sql);
    }

    let response = match run_with_chart(&state, &generation.sql).await {
        Ok((result, chart)) => AskResponse {
            generation,
            result: Some(result),
            chart: Some(chart),
            error: None,
        },
        Err(e) => AskResponse {
            generation,
            result: None,
            chart: None,
            error: Some(e.to_string()),
        },
    };

    Json(response)
}

// Schema document, as sent to the model
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Result<Response, (StatusCode, String)> {
    let schema_text = schema::describe(&state.db_pool).await.map_err(|e| {
        error!("Failed to describe database schema: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {}", e))
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], schema_text).into_response())
}

// Data export
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SqlRequest>,
) -> Result<Response, (StatusCode, String)> {
    let result = state
        .executor
        .execute(&payload.sql)
        .await
        .map_err(|e| (db_error_status(&e), format!("SQL error: {}", e)))?;

    let body = result.to_csv().map_err(|e| {
        error!("Failed to write CSV: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Export failed: {}", e))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"query_results.csv\""),
        ],
        body,
    )
        .into_response())
}

// System status
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        backend: state.engine.backend_name().to_string(),
        model: state.config.llm.model.clone(),
        dialect: state.engine.dialect().to_string(),
        language: state.engine.language(),
        database_ok: state.executor.test_connection().await,
    })
}
