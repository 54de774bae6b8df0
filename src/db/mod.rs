pub mod db_pool;
pub mod executor;
pub mod schema;

use std::error::Error;
use std::fmt;

pub use db_pool::{DbPool, build_pool};
pub use executor::{QueryExecutor, QueryResult};

#[derive(Debug)]
pub enum DbError {
    Database(duckdb::Error),
    Pool(String),
    Arrow(String),
    Serialization(String),
    Task(String),
    WriteRejected(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Database(e) => write!(f, "Database error: {}", e),
            DbError::Pool(msg) => write!(f, "Connection pool error: {}", msg),
            DbError::Arrow(msg) => write!(f, "Arrow conversion error: {}", msg),
            DbError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            DbError::Task(msg) => write!(f, "Database task execution failed: {}", msg),
            DbError::WriteRejected(kw) => write!(
                f,
                "Only read queries are allowed, refusing to run a {} statement",
                kw
            ),
        }
    }
}

impl Error for DbError {}

impl From<duckdb::Error> for DbError {
    fn from(e: duckdb::Error) -> Self {
        DbError::Database(e)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(e: r2d2::Error) -> Self {
        DbError::Pool(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for DbError {
    fn from(e: arrow::error::ArrowError) -> Self {
        DbError::Arrow(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for DbError {
    fn from(e: csv::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DbError {
    fn from(e: tokio::task::JoinError) -> Self {
        DbError::Task(e.to_string())
    }
}
