use crate::config::AppConfig;
use crate::db::{DbPool, QueryExecutor};
use crate::llm::SqlGenerationEngine;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<SqlGenerationEngine>,
    pub executor: QueryExecutor,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool, engine: SqlGenerationEngine) -> Self {
        let executor = QueryExecutor::new(db_pool.clone(), &config.database);

        Self {
            config,
            db_pool,
            engine: Arc::new(engine),
            executor,
            startup_time: chrono::Utc::now(),
        }
    }
}
