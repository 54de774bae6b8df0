use crate::config::DatabaseConfig;
use crate::db::{DbError, DbPool};
use arrow::datatypes::DataType;
use arrow::json::WriterBuilder;
use arrow::json::writer::JsonArray;
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, error, info, warn};

// Anything the pattern does not match (or a pattern that failed to compile) counts as a write.
static READ_STATEMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s(]*(SELECT|WITH|SHOW|DESCRIBE|EXPLAIN|PRAGMA|VALUES|FROM|SUMMARIZE)\b").ok()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

// EXPLAIN ANALYZE runs the statement it wraps
static EXPLAIN_ANALYZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^[\s(]*EXPLAIN\s+(\(\s*)?ANALY[SZ]E\b\s*\)?").ok());

pub fn classify_statement(sql: &str) -> StatementKind {
    if let Some(wrapped) = EXPLAIN_ANALYZE
        .as_ref()
        .and_then(|re| re.find(sql))
        .map(|m| &sql[m.end()..])
    {
        return classify_statement(wrapped);
    }

    if READ_STATEMENT.as_ref().is_some_and(|re| re.is_match(sql)) {
        StatementKind::Read
    } else {
        StatementKind::Write
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or("empty")
        .to_uppercase()
}

/// Coarse column classification that drives chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
    Other,
}

impl ColumnKind {
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => ColumnKind::Numeric,
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => ColumnKind::Temporal,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnKind::Categorical,
            DataType::Dictionary(_, values) => ColumnKind::from_arrow(values),
            _ => ColumnKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<usize>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Renders the returned rows as CSV with a header line.
    pub fn to_csv(&self) -> Result<String, DbError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;

        for row in &self.rows {
            let record = self.columns.iter().map(|c| match row.get(&c.name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            });
            writer.write_record(record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DbError::Serialization(e.to_string()))
    }
}

/// Runs generated SQL against the pooled database.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: DbPool,
    allow_writes: bool,
    max_rows: usize,
}

impl QueryExecutor {
    pub fn new(pool: DbPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            allow_writes: config.allow_writes,
            max_rows: config.max_rows,
        }
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryResult, DbError> {
        let sql = sql.trim().to_string();
        let kind = classify_statement(&sql);

        if kind == StatementKind::Write && !self.allow_writes {
            warn!("Rejected non-read statement: {}", sql);
            return Err(DbError::WriteRejected(leading_keyword(&sql)));
        }

        info!("Executing SQL query: {}", sql);
        let pool = self.pool.clone();
        let max_rows = self.max_rows;

        // Execute the query in a blocking task
        let result = tokio::task::spawn_blocking(move || -> Result<QueryResult, DbError> {
            let conn = pool.get()?;
            match kind {
                StatementKind::Read => run_query(&conn, &sql, max_rows),
                StatementKind::Write => run_statement(&conn, &sql),
            }
        })
        .await?;

        match &result {
            Ok(r) => info!(
                "Query executed successfully. Row count: {}, Execution time: {}ms",
                r.row_count, r.execution_time_ms
            ),
            Err(e) => error!("Database query error: {}", e),
        }
        result
    }

    /// Runs `SELECT 1` on a pooled connection.
    pub async fn test_connection(&self) -> bool {
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || -> Result<(), DbError> {
            let conn = pool.get()?;
            conn.query_row("SELECT 1 AS test", [], |row| row.get::<_, i32>(0))?;
            Ok(())
        })
        .await;

        matches!(outcome, Ok(Ok(())))
    }
}

fn run_query(conn: &Connection, sql: &str, max_rows: usize) -> Result<QueryResult, DbError> {
    let start_time = Instant::now();

    let mut stmt = conn.prepare(sql)?;
    let arrow_batch = stmt.query_arrow([])?;
    let schema = arrow_batch.get_schema();
    let record_batches: Vec<RecordBatch> = arrow_batch.collect();

    let columns = schema
        .fields()
        .iter()
        .map(|field| ColumnInfo {
            name: field.name().clone(),
            data_type: field.data_type().to_string(),
            kind: ColumnKind::from_arrow(field.data_type()),
        })
        .collect::<Vec<_>>();

    let row_count: usize = record_batches.iter().map(|batch| batch.num_rows()).sum();
    let rows = batches_to_rows(&record_batches, max_rows)?;
    debug!("Converted {} of {} rows to JSON", rows.len(), row_count);

    Ok(QueryResult {
        columns,
        rows,
        row_count,
        truncated: row_count > max_rows,
        rows_affected: None,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

fn run_statement(conn: &Connection, sql: &str) -> Result<QueryResult, DbError> {
    let start_time = Instant::now();
    let affected = conn.execute(sql, [])?;

    Ok(QueryResult {
        columns: Vec::new(),
        rows: Vec::new(),
        row_count: 0,
        truncated: false,
        rows_affected: Some(affected),
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

/// Serializes at most `limit` rows to JSON objects keyed by column name.
fn batches_to_rows(batches: &[RecordBatch], limit: usize) -> Result<Vec<Map<String, Value>>, DbError> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, JsonArray>(&mut buffer);

        let mut remaining = limit;
        for batch in batches {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            writer.write(&batch.slice(0, take))?;
            remaining -= take;
        }
        writer.finish()?;
    }

    if buffer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::db_pool::memory_pool;

    fn executor_with(setup: &str, config: DatabaseConfig) -> QueryExecutor {
        let pool = memory_pool();
        pool.get().unwrap().execute_batch(setup).unwrap();
        QueryExecutor::new(pool, &config)
    }

    const SALES: &str = "CREATE TABLE sales (region VARCHAR, amount INTEGER, sold_on DATE);
        INSERT INTO sales VALUES ('north', 10, DATE '2024-01-01'), ('south', 20, DATE '2024-01-02'), (NULL, 5, NULL);";

    #[test]
    fn test_classify_statement() {
        assert_eq!(classify_statement("SELECT 1"), StatementKind::Read);
        assert_eq!(classify_statement("  with x as (select 1) select * from x"), StatementKind::Read);
        assert_eq!(classify_statement("(SELECT 1) UNION (SELECT 2)"), StatementKind::Read);
        assert_eq!(classify_statement("DESCRIBE sales"), StatementKind::Read);
        assert_eq!(classify_statement("DELETE FROM sales"), StatementKind::Write);
        assert_eq!(classify_statement("DROP TABLE sales"), StatementKind::Write);
        assert_eq!(classify_statement("SELECTED_ROWS"), StatementKind::Write);
    }

    #[test]
    fn test_column_kind_mapping() {
        assert_eq!(ColumnKind::from_arrow(&DataType::Int64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_arrow(&DataType::Decimal128(38, 0)), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_arrow(&DataType::Date32), ColumnKind::Temporal);
        assert_eq!(ColumnKind::from_arrow(&DataType::Utf8), ColumnKind::Categorical);
        assert_eq!(
            ColumnKind::from_arrow(&DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))),
            ColumnKind::Categorical
        );
        assert_eq!(ColumnKind::from_arrow(&DataType::Boolean), ColumnKind::Other);
    }

    #[tokio::test]
    async fn test_execute_select_returns_rows_and_kinds() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let result = executor
            .execute("SELECT region, amount, sold_on FROM sales ORDER BY amount DESC")
            .await
            .unwrap();

        assert_eq!(result.row_count, 3);
        assert!(!result.truncated);
        let kinds: Vec<ColumnKind> = result.columns.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ColumnKind::Categorical, ColumnKind::Numeric, ColumnKind::Temporal]);
        assert_eq!(result.rows[0]["region"], "south");
        assert_eq!(result.rows[0]["amount"], 20);
        assert_eq!(result.rows[2]["region"], Value::Null);
    }

    #[tokio::test]
    async fn test_rows_truncated_at_limit() {
        let config = DatabaseConfig {
            max_rows: 2,
            ..DatabaseConfig::default()
        };
        let executor = executor_with(SALES, config);
        let result = executor.execute("SELECT * FROM sales").await.unwrap();
        assert_eq!(result.row_count, 3);
        assert_eq!(result.rows.len(), 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_writes_rejected_by_default() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let err = executor.execute("DELETE FROM sales").await.unwrap_err();
        assert!(matches!(err, DbError::WriteRejected(ref kw) if kw == "DELETE"));

        let count = executor.execute("SELECT count(*) AS n FROM sales").await.unwrap();
        assert_eq!(count.rows[0]["n"], 3);
    }

    #[test]
    fn test_explain_analyze_takes_the_wrapped_statement_kind() {
        assert_eq!(classify_statement("EXPLAIN SELECT 1"), StatementKind::Read);
        assert_eq!(classify_statement("EXPLAIN ANALYZE SELECT 1"), StatementKind::Read);
        assert_eq!(classify_statement("explain analyze delete from sales"), StatementKind::Write);
        assert_eq!(classify_statement("EXPLAIN (ANALYZE) UPDATE sales SET amount = 0"), StatementKind::Write);
        assert_eq!(classify_statement("EXPLAIN ANALYSE DROP TABLE sales"), StatementKind::Write);
    }

    #[tokio::test]
    async fn test_explain_analyze_of_write_rejected_by_default() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let err = executor.execute("EXPLAIN ANALYZE DELETE FROM sales").await.unwrap_err();
        assert!(matches!(err, DbError::WriteRejected(_)));

        let count = executor.execute("SELECT count(*) AS n FROM sales").await.unwrap();
        assert_eq!(count.rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn test_writes_allowed_when_configured() {
        let config = DatabaseConfig {
            allow_writes: true,
            ..DatabaseConfig::default()
        };
        let executor = executor_with(SALES, config);
        let result = executor.execute("DELETE FROM sales WHERE amount > 6").await.unwrap();
        assert_eq!(result.rows_affected, Some(2));
    }

    #[tokio::test]
    async fn test_invalid_sql_is_database_error() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let err = executor.execute("SELECT nope FROM missing_table").await.unwrap_err();
        assert!(matches!(err, DbError::Database(_)));
    }

    #[tokio::test]
    async fn test_sentinel_queries_execute() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let result = executor.execute("SELECT 1 AS no_query").await.unwrap();
        assert_eq!(result.columns[0].name, "no_query");
        assert_eq!(result.rows[0]["no_query"], 1);
    }

    #[tokio::test]
    async fn test_connection_check() {
        let executor = executor_with("SELECT 1", DatabaseConfig::default());
        assert!(executor.test_connection().await);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let executor = executor_with(SALES, DatabaseConfig::default());
        let result = executor
            .execute("SELECT region, amount FROM sales ORDER BY amount")
            .await
            .unwrap();
        assert_eq!(result.to_csv().unwrap(), "region,amount\n,5\nnorth,10\nsouth,20\n");
    }
}
