//! Storage backends a table can be recreated on.

mod d1;
mod sqlite;

pub use d1::D1Backend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use oxide_d1_core::ddl::inline_placeholders;
use oxide_d1_core::plan::{DependentObject, RecreateStatement};
use oxide_d1_core::value::SqlValue;

use crate::error::Result;

/// Catalog and statement access the recreate executor needs.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Short backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Whether DDL statements can be rolled back as part of a transaction.
    fn supports_transactional_ddl(&self) -> bool;

    /// Returns the `CREATE TABLE` text of `table`, or `None` if it doesn't
    /// exist.
    async fn schema_text(&self, table: &str) -> Result<Option<String>>;

    /// Returns true if `table` exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Returns the indexes and triggers defined on `table`, in catalog order.
    /// Implicit indexes backing `UNIQUE` and `PRIMARY KEY` are left out.
    async fn dependents(&self, table: &str) -> Result<Vec<DependentObject>>;

    /// Counts the rows of `table`.
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Executes one statement on its own.
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<()>;

    /// Executes the statements recreating `table` in one transaction:
    /// either all take effect or none does.
    ///
    /// A failing statement is reported as
    /// [`MigrateError::TransactionAborted`](crate::error::MigrateError::TransactionAborted)
    /// carrying its step.
    async fn execute_atomic(&self, table: &str, statements: &[RecreateStatement]) -> Result<()>;
}

/// SQL that reads a table's definition from the catalog. Table names are
/// case-insensitive in SQLite.
pub(crate) const SCHEMA_SQL: &str =
    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE";

/// SQL that lists the explicit indexes and triggers of a table.
pub(crate) const DEPENDENTS_SQL: &str = "SELECT type, name, sql FROM sqlite_master \
     WHERE type IN ('index', 'trigger') AND tbl_name = ? COLLATE NOCASE AND sql IS NOT NULL \
     ORDER BY rowid";

/// SQLite doesn't bind parameters in DDL, so arguments are written inline.
pub(crate) fn inline_args(sql: &str, args: &[SqlValue]) -> Result<String> {
    if args.is_empty() {
        Ok(sql.to_string())
    } else {
        Ok(inline_placeholders(sql, args)?)
    }
}
