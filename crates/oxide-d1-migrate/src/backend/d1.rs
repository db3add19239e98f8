//! Remote D1 backend.

use std::sync::Arc;

use async_trait::async_trait;
use oxide_d1_client::connection::Connection;
use oxide_d1_core::ddl::quote_identifier;
use oxide_d1_core::plan::{DependentObject, RecreateStatement};
use oxide_d1_core::value::{SqlValue, TypedScalar};
use tracing::debug;

use super::{inline_args, SchemaBackend, DEPENDENTS_SQL, SCHEMA_SQL};
use crate::error::{MigrateError, Result};

/// Recreates tables in a D1 database over the HTTP API.
///
/// Every statement is its own request, so nothing spans statements:
/// [`supports_transactional_ddl`](SchemaBackend::supports_transactional_ddl)
/// is false and [`execute_atomic`](SchemaBackend::execute_atomic) refuses.
/// Like SQLite, D1 does not bind parameters in DDL, so statement arguments
/// are written inline and the request carries no params.
#[derive(Debug, Clone)]
pub struct D1Backend {
    conn: Arc<Connection>,
}

impl D1Backend {
    /// Creates a backend on an open connection.
    #[must_use]
    pub const fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl SchemaBackend for D1Backend {
    fn name(&self) -> &'static str {
        "d1"
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    async fn schema_text(&self, table: &str) -> Result<Option<String>> {
        let rows = self
            .conn
            .query(SCHEMA_SQL, &[SqlValue::Text(table.to_string())])
            .await?;
        Ok(rows
            .get(0, "sql")
            .and_then(TypedScalar::as_str)
            .map(str::to_string))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.schema_text(table).await?.is_some())
    }

    async fn dependents(&self, table: &str) -> Result<Vec<DependentObject>> {
        let rows = self
            .conn
            .query(DEPENDENTS_SQL, &[SqlValue::Text(table.to_string())])
            .await?;
        let text = |row: usize, column: &str| {
            rows.get(row, column)
                .and_then(TypedScalar::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        Ok((0..rows.len())
            .map(|row| DependentObject {
                kind: text(row, "type"),
                name: text(row, "name"),
                sql: text(row, "sql"),
            })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", quote_identifier(table));
        let rows = self.conn.query(&sql, &[]).await?;
        let count = rows.get(0, "n").and_then(TypedScalar::as_i64).unwrap_or_default();
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<()> {
        let sql = inline_args(sql, args)?;
        debug!(conn = %self.conn.id(), sql = %sql, "Executing SQL");
        self.conn.execute(&sql, &[]).await?;
        Ok(())
    }

    async fn execute_atomic(&self, _table: &str, _statements: &[RecreateStatement]) -> Result<()> {
        Err(MigrateError::NonTransactionalBackend(self.name()))
    }
}
