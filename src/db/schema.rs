use crate::db::{DbError, DbPool};
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnSchema {
    /// `  - <column>: <type>[ (NOT NULL)][ (PRIMARY KEY)]`
    pub fn to_schema_line(&self) -> String {
        let mut line = format!("  - {}: {}", self.name, self.data_type);
        if !self.nullable {
            line.push_str(" (NOT NULL)");
        }
        if self.primary_key {
            line.push_str(" (PRIMARY KEY)");
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Renders tables as the plain-text schema document used to ground prompts.
pub fn render_schema(tables: &[TableSchema]) -> String {
    let mut schema_info = String::from("Database Schema:\n");
    for table in tables {
        // Writing to a String cannot fail
        let _ = writeln!(schema_info, "\nTable: {}", table.name);
        for column in &table.columns {
            schema_info.push_str(&column.to_schema_line());
            schema_info.push('\n');
        }
    }
    schema_info
}

/// Reads every table and view of the current schema with its columns.
pub fn introspect(conn: &Connection) -> Result<Vec<TableSchema>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = current_schema() ORDER BY table_name",
    )?;
    let table_names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;

    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in table_names {
        let mut col_stmt = conn.prepare(&format!(
            "PRAGMA table_info(\"{}\")",
            table_name.replace('"', "\"\"")
        ))?;
        let columns: Vec<ColumnSchema> = col_stmt
            .query_map([], |row| {
                Ok(ColumnSchema {
                    name: row.get(1)?,
                    data_type: row.get(2)?,
                    nullable: !row.get::<_, bool>(3)?,
                    primary_key: row.get(5)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        debug!("Table {} has {} columns", table_name, columns.len());
        tables.push(TableSchema {
            name: table_name,
            columns,
        });
    }

    Ok(tables)
}

/// Produces the schema document for the pooled database.
pub async fn describe(pool: &DbPool) -> Result<String, DbError> {
    let pool = pool.clone();

    // Use a blocking task to avoid thread-safety issues with DuckDB
    let tables = tokio::task::spawn_blocking(move || -> Result<Vec<TableSchema>, DbError> {
        let conn = pool.get()?;
        introspect(&conn)
    })
    .await??;

    info!("Described {} tables for prompt grounding", tables.len());
    Ok(render_schema(&tables))
}
