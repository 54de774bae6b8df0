use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod chart;
mod config;
mod db;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::{DbPool, build_pool, schema};
use crate::llm::SqlGenerationEngine;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up credentials from a local .env before reading configuration
    dotenv::dotenv().ok();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing DuckDB connection pool");
    let pool = build_pool(&config.database).inspect_err(|e| error!("Failed to open database: {}", e))?;

    info!(
        "Initializing SQL generation with backend: {} ({})",
        config.llm.backend, config.llm.model
    );
    let engine = SqlGenerationEngine::from_config(&config.llm)
        .inspect_err(|e| error!("Failed to initialize LLM backend: {}", e))?;

    if let Some(question) = args.ask.as_deref() {
        return ask_once(&pool, &engine, question).await;
    }

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, pool, engine));

    // Start the web server
    info!("Starting text2sql server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

async fn ask_once(
    pool: &DbPool,
    engine: &SqlGenerationEngine,
    question: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema_text = match schema::describe(pool).await {
        Ok(schema_text) => schema_text,
        Err(e) => {
            error!("Failed to describe database schema: {}", e);
            String::new()
        }
    };

    let generation = engine.generate(question, &schema_text).await;
    println!("{}", serde_json::to_string_pretty(&generation)?);
    Ok(())
}
