//! Table-recreating schema migrations for Cloudflare D1 and SQLite.
//!
//! SQLite's `ALTER TABLE` can rename tables and append columns, little else.
//! Every other change (dropping a column, changing its type, editing a
//! constraint) is made by recreating the table:
//!
//! 1. `CREATE_TEMP`: create `<table>__temp` with the edited schema
//! 2. `COPY_ROWS`: copy the preserved columns across
//! 3. `DROP_ORIGINAL`: drop the original table
//! 4. `RENAME_TEMP`: rename the temporary table to the original name
//!
//! [`RecreateExecutor`](executor::RecreateExecutor) runs the protocol against
//! a [`SchemaBackend`](backend::SchemaBackend). Backends with transactional
//! DDL run it atomically; others need the compensating strategy enabled
//! explicitly.
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_d1_migrate::prelude::*;
//!
//! let executor = RecreateExecutor::new(SqliteBackend::new(pool));
//! executor.drop_column("users", "legacy_flag").await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! oxide-d1-migrate describe --table users
//! oxide-d1-migrate drop-column --table users --column legacy_flag
//! oxide-d1-migrate --dry-run alter-column -t users -c age -d "INTEGER NOT NULL DEFAULT 0"
//! ```

pub mod backend;
pub mod error;
pub mod executor;

pub use error::{MigrateError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{D1Backend, SchemaBackend, SqliteBackend};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::RecreateExecutor;
    pub use oxide_d1_core::prelude::*;
}
