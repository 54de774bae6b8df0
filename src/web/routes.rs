use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - web interface
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/static/{*path}", get(static_handler))
}

// API Routes - REST API for programmatic access
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Generation and execution
            .route("/generate", post(handlers::api::generate_sql))
            .route("/query", post(handlers::api::execute_query))
            .route("/ask", post(handlers::api::ask))
            // Schema
            .route("/schema", get(handlers::api::get_schema))
            // Data export
            .route("/export/csv", post(handlers::api::export_csv))
            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
