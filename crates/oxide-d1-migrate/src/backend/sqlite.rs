//! Local SQLite backend.

use async_trait::async_trait;
use oxide_d1_core::ddl::quote_identifier;
use oxide_d1_core::plan::{DependentObject, RecreateStatement, RecreateStep};
use oxide_d1_core::value::SqlValue;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Connection;
use tracing::{debug, warn};

use super::{inline_args, SchemaBackend, DEPENDENTS_SQL, SCHEMA_SQL};
use crate::error::{MigrateError, Result};

/// Recreates tables in a SQLite database through a sqlx pool.
///
/// SQLite runs DDL inside transactions, so the whole protocol is atomic.
/// Foreign key enforcement is switched off on the connection for the
/// duration of the swap, since dropping the original table would otherwise
/// fire `ON DELETE` actions in referencing tables. When it was on, the
/// recreated table and the tables referencing it are checked with
/// `foreign_key_check` before commit.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Creates a backend on `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Rows of `foreign_key_check` that involve `table` as child or parent.
const FOREIGN_KEY_CHECK_SQL: &str = "SELECT COUNT(*) FROM pragma_foreign_key_check \
     WHERE \"table\" = ? COLLATE NOCASE OR parent = ? COLLATE NOCASE";

async fn foreign_key_violations(conn: &mut SqliteConnection, table: &str) -> Result<u64> {
    let (count,): (i64,) = sqlx::query_as(FOREIGN_KEY_CHECK_SQL)
        .bind(table)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
    Ok(u64::try_from(count).unwrap_or_default())
}

async fn run_in_transaction(
    conn: &mut SqliteConnection,
    table: &str,
    statements: &[RecreateStatement],
    check_foreign_keys: bool,
) -> Result<()> {
    let mut tx = conn.begin().await?;
    for statement in statements {
        let sql = inline_args(&statement.sql, &statement.args)
            .map_err(|e| MigrateError::aborted(statement.step, e))?;
        debug!(step = %statement.step, sql = %sql, "Executing SQL");
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrateError::aborted(statement.step, e))?;

        if check_foreign_keys && statement.step == RecreateStep::RenameTemp {
            let violations = foreign_key_violations(&mut tx, table)
                .await
                .map_err(|e| MigrateError::aborted(statement.step, e))?;
            if violations > 0 {
                warn!(table = %table, violations, "Foreign key check failed");
                return Err(MigrateError::aborted(
                    statement.step,
                    MigrateError::ForeignKeyViolation {
                        table: table.to_string(),
                        violations,
                    },
                ));
            }
        }
    }
    tx.commit().await?;
    Ok(())
}

#[async_trait]
impl SchemaBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    async fn schema_text(&self, table: &str) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(SCHEMA_SQL)
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(sql,)| sql))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn dependents(&self, table: &str) -> Result<Vec<DependentObject>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(DEPENDENTS_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(kind, name, sql)| DependentObject { kind, name, sql })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<()> {
        let sql = inline_args(sql, args)?;
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn execute_atomic(&self, table: &str, statements: &[RecreateStatement]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&mut *conn)
            .await?;
        if foreign_keys != 0 {
            sqlx::query("PRAGMA foreign_keys = OFF")
                .execute(&mut *conn)
                .await?;
        }

        let result = run_in_transaction(&mut conn, table, statements, foreign_keys != 0).await;

        if foreign_keys != 0 {
            sqlx::query("PRAGMA foreign_keys = ON")
                .execute(&mut *conn)
                .await?;
        }
        result
    }
}
