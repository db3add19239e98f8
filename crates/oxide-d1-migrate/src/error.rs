//! Error types for table recreation.

use oxide_d1_core::plan::RecreateStep;

/// Errors that can occur while recreating a table.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Schema parsing, planning or value handling failed.
    #[error(transparent)]
    Core(#[from] oxide_d1_core::Error),

    /// The D1 client failed.
    #[error("D1 error: {0}")]
    Client(#[from] oxide_d1_client::ClientError),

    /// Database error from a local SQLite backend.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The table to edit doesn't exist.
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// The temporary table name is already taken, probably by an earlier
    /// recreate that didn't finish.
    #[error("Temporary table '{0}' already exists")]
    TempTableExists(String),

    /// Another migration of the same table is running on this executor.
    #[error("A migration of table '{0}' is already in flight")]
    MigrationInFlight(String),

    /// The backend can't run DDL in a transaction and the compensating
    /// strategy wasn't enabled.
    #[error(
        "Backend '{0}' does not support transactional DDL; enable the compensating strategy to proceed"
    )]
    NonTransactionalBackend(&'static str),

    /// A step of the recreate protocol failed. The original table is intact.
    #[error("Recreate aborted at {step}: {source}")]
    TransactionAborted {
        /// Step that failed.
        step: RecreateStep,
        /// What went wrong.
        #[source]
        source: Box<MigrateError>,
    },

    /// Copying rows into the temporary table lost or gained rows.
    #[error("Row count mismatch copying '{table}': expected {expected}, found {found}")]
    RowCountMismatch {
        /// Table being recreated.
        table: String,
        /// Rows in the original table.
        expected: u64,
        /// Rows in the temporary table.
        found: u64,
    },

    /// Rows of the recreated table, or rows referencing it, break a
    /// foreign key.
    #[error("Foreign key check failed for '{table}': {violations} violating row(s)")]
    ForeignKeyViolation {
        /// Table being recreated.
        table: String,
        /// Number of rows reported by `foreign_key_check`.
        violations: u64,
    },

    /// The original table was dropped but the temporary table could not be
    /// renamed. The data is in `temp_table`.
    #[error("Recreate of '{table}' incomplete: data is in '{temp_table}' ({source})")]
    IncompleteRecreate {
        /// Table being recreated.
        table: String,
        /// Table holding the data.
        temp_table: String,
        /// What went wrong.
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Wraps an error as a failure of `step`.
    pub fn aborted(step: RecreateStep, source: impl Into<Self>) -> Self {
        Self::TransactionAborted {
            step,
            source: Box::new(source.into()),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
