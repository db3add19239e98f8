//! Recreate executor.
//!
//! Loads a table's schema from the backend, plans an edit and runs the
//! recreate protocol. Indexes and triggers of the table are re-created
//! after the swap; those mentioning a dropped column are dropped with it and
//! logged. On backends with transactional DDL every statement runs in one
//! transaction. Without it, the executor can fall back to a compensating
//! strategy: statements run one by one, the copy is verified by row count,
//! and a failure before the original is dropped removes the temporary table
//! again.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use oxide_d1_core::ddl::{ColumnDef, ConstraintDef, DdlDocument};
use oxide_d1_core::plan::{
    ColumnEdit, ConstraintEdit, MigrationPlan, MigrationPlanner, RecreateStatement, RecreateStep,
    SchemaEdit,
};
use oxide_d1_core::value::SqlValue;
use tracing::{debug, info, warn};

use crate::backend::SchemaBackend;
use crate::error::{MigrateError, Result};

/// Marks a table as being migrated until dropped.
struct InFlightGuard<'a> {
    tables: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(tables: &'a Mutex<HashSet<String>>, table: &str) -> Result<Self> {
        let key = table.to_ascii_lowercase();
        let mut set = tables.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key.clone()) {
            return Err(MigrateError::MigrationInFlight(table.to_string()));
        }
        Ok(Self { tables, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Applies schema edits by recreating tables.
pub struct RecreateExecutor<B: SchemaBackend> {
    backend: B,
    planner: MigrationPlanner,
    dry_run: bool,
    allow_compensating: bool,
    in_flight: Mutex<HashSet<String>>,
}

impl<B: SchemaBackend> RecreateExecutor<B> {
    /// Creates a new executor on `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            planner: MigrationPlanner::new(),
            dry_run: false,
            allow_compensating: false,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Allows the compensating strategy on backends without transactional
    /// DDL. Without it such backends are refused.
    #[must_use]
    pub const fn allow_compensating(mut self, enabled: bool) -> Self {
        self.allow_compensating = enabled;
        self
    }

    /// Returns the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads and parses the current schema of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::TableNotFound`] if the table doesn't exist,
    /// or a parse error for schema text that isn't a plain `CREATE TABLE`.
    pub async fn describe(&self, table: &str) -> Result<DdlDocument> {
        let text = self
            .backend
            .schema_text(table)
            .await?
            .ok_or_else(|| MigrateError::TableNotFound(table.to_string()))?;
        debug!(table = %table, schema = %text, "Loaded schema");
        Ok(DdlDocument::parse(&text)?)
    }

    /// Plans an edit against the current schema without executing it.
    ///
    /// # Errors
    ///
    /// See [`describe`](Self::describe); planning errors such as a missing
    /// column are returned as [`MigrateError::Core`].
    pub async fn plan(&self, table: &str, edit: &SchemaEdit) -> Result<MigrationPlan> {
        let document = self.describe(table).await?;
        Ok(self.planner.plan(&document, edit)?)
    }

    /// Applies an edit to `table` and returns the executed plan.
    ///
    /// # Errors
    ///
    /// Fails with [`MigrateError::MigrationInFlight`] if the table is
    /// already being migrated by this executor,
    /// [`MigrateError::TempTableExists`] if a previous recreate left its
    /// temporary table behind, [`MigrateError::NonTransactionalBackend`]
    /// for a non-transactional backend without the compensating strategy,
    /// and [`MigrateError::TransactionAborted`] if a step fails.
    pub async fn apply(&self, table: &str, edit: &SchemaEdit) -> Result<MigrationPlan> {
        let _guard = InFlightGuard::acquire(&self.in_flight, table)?;

        info!(table = %table, edit = ?edit, "Recreating table");

        let mut plan = self.plan(table, edit).await?;
        let dependents = self.backend.dependents(&plan.source_table).await?;
        for object in plan.restore_dependents(dependents)? {
            warn!(
                table = %plan.source_table,
                kind = %object.kind,
                name = %object.name,
                "Dropping dependent object that mentions a dropped column"
            );
        }
        let statements = plan.statements();

        if self.dry_run {
            for statement in &statements {
                debug!(step = %statement.step, args = ?statement.args, "Dry run");
                println!("{};", statement.sql);
            }
            return Ok(plan);
        }

        if self.backend.table_exists(&plan.temp_table).await? {
            return Err(MigrateError::TempTableExists(plan.temp_table));
        }

        if self.backend.supports_transactional_ddl() {
            self.backend
                .execute_atomic(&plan.source_table, &statements)
                .await?;
        } else if self.allow_compensating {
            warn!(
                backend = self.backend.name(),
                table = %table,
                "Backend has no transactional DDL, using compensating strategy"
            );
            self.run_compensating(&plan, &statements).await?;
        } else {
            return Err(MigrateError::NonTransactionalBackend(self.backend.name()));
        }

        info!(
            table = %table,
            preserved = plan.preserved_columns.len(),
            restored = plan.dependents().len(),
            "Table recreated successfully"
        );
        Ok(plan)
    }

    async fn run_compensating(
        &self,
        plan: &MigrationPlan,
        statements: &[RecreateStatement],
    ) -> Result<()> {
        let expected = self.backend.row_count(&plan.source_table).await?;

        for statement in statements {
            debug!(step = %statement.step, sql = %statement.sql, "Executing step");
            let outcome = self.backend.execute(&statement.sql, &statement.args).await;

            match (statement.step, outcome) {
                (RecreateStep::RenameTemp, Err(e)) => {
                    warn!(
                        table = %plan.source_table,
                        temp_table = %plan.temp_table,
                        "Rename failed after the original table was dropped"
                    );
                    return Err(MigrateError::IncompleteRecreate {
                        table: plan.source_table.clone(),
                        temp_table: plan.temp_table.clone(),
                        source: Box::new(e),
                    });
                }
                (RecreateStep::RestoreDependents, Err(e)) => {
                    warn!(
                        table = %plan.source_table,
                        sql = %statement.sql,
                        "Table recreated but a dependent object could not be restored"
                    );
                    return Err(MigrateError::aborted(RecreateStep::RestoreDependents, e));
                }
                (step, Err(e)) => {
                    self.discard_temp(plan).await;
                    return Err(MigrateError::aborted(step, e));
                }
                (RecreateStep::CopyRows, Ok(())) => {
                    let found = self.backend.row_count(&plan.temp_table).await?;
                    if found != expected {
                        self.discard_temp(plan).await;
                        return Err(MigrateError::RowCountMismatch {
                            table: plan.source_table.clone(),
                            expected,
                            found,
                        });
                    }
                }
                (_, Ok(())) => {}
            }
        }
        Ok(())
    }

    async fn discard_temp(&self, plan: &MigrationPlan) {
        let sql = format!(
            "DROP TABLE IF EXISTS {}",
            oxide_d1_core::ddl::render_identifier(&plan.temp_table)
        );
        if let Err(e) = self.backend.execute(&sql, &[]).await {
            warn!(
                temp_table = %plan.temp_table,
                error = %e,
                "Failed to drop temporary table"
            );
        }
    }

    /// Drops a column.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn drop_column(&self, table: &str, column: &str) -> Result<MigrationPlan> {
        self.apply(table, &ColumnEdit::Drop(column.to_string()).into())
            .await
    }

    /// Adds a column.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn add_column(&self, table: &str, column: ColumnDef) -> Result<MigrationPlan> {
        self.apply(table, &ColumnEdit::Add(column).into()).await
    }

    /// Changes a column's type clause, keeping its data.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn alter_column(
        &self,
        table: &str,
        column: &str,
        type_clause: &str,
        args: Vec<SqlValue>,
    ) -> Result<MigrationPlan> {
        let edit = ColumnEdit::Alter {
            name: column.to_string(),
            type_clause: type_clause.to_string(),
            args,
        };
        self.apply(table, &edit.into()).await
    }

    /// Adds a table constraint.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn add_constraint(
        &self,
        table: &str,
        constraint: ConstraintDef,
    ) -> Result<MigrationPlan> {
        self.apply(table, &ConstraintEdit::Add(constraint).into())
            .await
    }

    /// Drops a named constraint.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn drop_constraint(&self, table: &str, name: &str) -> Result<MigrationPlan> {
        self.apply(table, &ConstraintEdit::Drop(name.to_string()).into())
            .await
    }

    /// Replaces a named constraint's clause.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn alter_constraint(
        &self,
        table: &str,
        name: &str,
        clause: &str,
        args: Vec<SqlValue>,
    ) -> Result<MigrationPlan> {
        let edit = ConstraintEdit::Alter {
            name: name.to_string(),
            clause: clause.to_string(),
            args,
        };
        self.apply(table, &edit.into()).await
    }

    /// Renames a named constraint.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn rename_constraint(
        &self,
        table: &str,
        from: &str,
        to: &str,
    ) -> Result<MigrationPlan> {
        let edit = ConstraintEdit::Rename {
            from: from.to_string(),
            to: to.to_string(),
        };
        self.apply(table, &edit.into()).await
    }
}
