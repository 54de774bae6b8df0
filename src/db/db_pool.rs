use crate::config::DatabaseConfig;
use crate::db::DbError;
use duckdb::{AccessMode, Config, Connection};
use r2d2::{ManageConnection, Pool};
use std::sync::{Mutex, PoisonError};
use tracing::info;

pub type DbPool = Pool<DuckDBConnectionManager>;

const IN_MEMORY: &str = ":memory:";

/// Opens the database once and hands out clones of that connection, so every
/// pooled connection shares one database instance (in-memory ones included).
pub struct DuckDBConnectionManager {
    database: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn open(connection_string: &str, read_only: bool) -> Result<Self, duckdb::Error> {
        let mode = if read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        let config = Config::default().access_mode(mode)?;

        let conn = if connection_string == IN_MEMORY {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(connection_string, config)?
        };

        Ok(Self {
            database: Mutex::new(conn),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.database
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub fn build_pool(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    info!(
        "Opening DuckDB database {} (read_only: {}, pool size: {})",
        config.connection_string, config.read_only, config.pool_size
    );

    let manager = DuckDBConnectionManager::open(&config.connection_string, config.read_only)?;
    let pool = Pool::builder()
        .max_size(config.pool_size.max(1) as u32)
        .build(manager)?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) fn memory_pool() -> DbPool {
    build_pool(&DatabaseConfig {
        connection_string: IN_MEMORY.to_string(),
        pool_size: 2,
        ..DatabaseConfig::default()
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooled_connections_share_database() {
        let pool = memory_pool();
        let writer = pool.get().unwrap();
        writer
            .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (2);")
            .unwrap();

        let reader = pool.get().unwrap();
        let count: i64 = reader
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_read_only_requires_existing_file() {
        let path = std::env::temp_dir().join(format!("text2sql-missing-{}.duckdb", std::process::id()));
        let config = DatabaseConfig {
            connection_string: path.to_string_lossy().to_string(),
            read_only: true,
            ..DatabaseConfig::default()
        };
        assert!(build_pool(&config).is_err());
    }
}
