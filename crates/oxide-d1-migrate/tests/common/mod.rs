#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use oxide_d1_core::plan::{DependentObject, RecreateStatement};
use oxide_d1_core::value::SqlValue;
use oxide_d1_migrate::backend::{SchemaBackend, SqliteBackend};
use oxide_d1_migrate::error::{MigrateError, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Creates an in-memory SQLite pool for testing.
pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Creates `t (id INTEGER, name TEXT)` holding three rows.
pub async fn seeded_pool() -> SqlitePool {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE t (id INTEGER, name TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, NULL)")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

/// Names of all tables, sorted.
pub async fn table_names(pool: &SqlitePool) -> Vec<String> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap();
    rows.into_iter().map(|(name,)| name).collect()
}

/// Column names of `table`, in order.
pub async fn column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .unwrap();
    rows.into_iter().map(|(name,)| name).collect()
}

/// A SQLite backend that can pretend to lack transactional DDL and fail on
/// demand.
pub struct FlakyBackend {
    inner: SqliteBackend,
    transactional: bool,
    fail_on: Mutex<Option<String>>,
    extra_rows: Mutex<Option<(String, u64)>>,
}

impl FlakyBackend {
    pub fn new(pool: SqlitePool, transactional: bool) -> Self {
        Self {
            inner: SqliteBackend::new(pool),
            transactional,
            fail_on: Mutex::new(None),
            extra_rows: Mutex::new(None),
        }
    }

    /// Fails the next statement starting with `prefix`, once.
    pub fn fail_once(&self, prefix: &str) {
        *self.fail_on.lock().unwrap() = Some(prefix.to_string());
    }

    /// Reports `extra` more rows than `table` holds.
    pub fn inflate_count(&self, table: &str, extra: u64) {
        *self.extra_rows.lock().unwrap() = Some((table.to_string(), extra));
    }

    pub fn pool(&self) -> &SqlitePool {
        self.inner.pool()
    }

    fn injected_failure(&self, sql: &str) -> Result<()> {
        let mut fail_on = self.fail_on.lock().unwrap();
        if fail_on.as_deref().is_some_and(|prefix| sql.starts_with(prefix)) {
            *fail_on = None;
            return Err(MigrateError::Database(sqlx::Error::Protocol(format!(
                "injected failure: {sql}"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn supports_transactional_ddl(&self) -> bool {
        self.transactional
    }

    async fn schema_text(&self, table: &str) -> Result<Option<String>> {
        self.inner.schema_text(table).await
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table).await
    }

    async fn dependents(&self, table: &str) -> Result<Vec<DependentObject>> {
        self.inner.dependents(table).await
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let count = self.inner.row_count(table).await?;
        let extra = self
            .extra_rows
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(name, _)| name == table)
            .map_or(0, |(_, extra)| *extra);
        Ok(count + extra)
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<()> {
        self.injected_failure(sql)?;
        self.inner.execute(sql, args).await
    }

    async fn execute_atomic(&self, table: &str, statements: &[RecreateStatement]) -> Result<()> {
        self.inner.execute_atomic(table, statements).await
    }
}
