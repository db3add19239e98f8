//! Planning table recreations.
//!
//! An edit is applied to a clone of the current document. The resulting
//! [`MigrationPlan`] knows the new schema, which columns carry over and the
//! temporary table the swap goes through, and renders the statements of
//! the recreate protocol:
//!
//! ```text
//! CREATE_TEMP -> COPY_ROWS -> DROP_ORIGINAL -> RENAME_TEMP [-> RESTORE_DEPENDENTS]
//! ```
//!
//! Dropping the original table drops its indexes and triggers with it. Those
//! handed to [`MigrationPlan::restore_dependents`] are re-created after the
//! rename, unless they mention a column the edit removed.

use std::fmt;

use crate::ddl::{mentions_identifier, render_identifier, ColumnDef, ConstraintDef, DdlDocument};
use crate::error::{Error, Result};
use crate::value::SqlValue;

/// Suffix appended to a table name to form its temporary twin.
pub const TEMP_SUFFIX: &str = "__temp";

/// Returns the temporary table name used while recreating `table`.
#[must_use]
pub fn temp_table_name(table: &str) -> String {
    format!("{table}{TEMP_SUFFIX}")
}

/// A change to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEdit {
    /// Append a column. Existing rows get its default.
    Add(ColumnDef),
    /// Remove a column and its data.
    Drop(String),
    /// Replace a column's type clause, keeping its name, position and data.
    Alter {
        /// Column to alter.
        name: String,
        /// New type clause.
        type_clause: String,
        /// Arguments bound to placeholders in the new clause.
        args: Vec<SqlValue>,
    },
}

/// A change to one table constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintEdit {
    /// Append a constraint.
    Add(ConstraintDef),
    /// Remove a named constraint.
    Drop(String),
    /// Replace a named constraint's clause.
    Alter {
        /// Constraint to alter.
        name: String,
        /// New clause.
        clause: String,
        /// Arguments bound to placeholders in the new clause.
        args: Vec<SqlValue>,
    },
    /// Rename a constraint.
    Rename {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
}

/// Any edit the planner accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEdit {
    /// A column edit.
    Column(ColumnEdit),
    /// A constraint edit.
    Constraint(ConstraintEdit),
}

impl From<ColumnEdit> for SchemaEdit {
    fn from(edit: ColumnEdit) -> Self {
        Self::Column(edit)
    }
}

impl From<ConstraintEdit> for SchemaEdit {
    fn from(edit: ConstraintEdit) -> Self {
        Self::Constraint(edit)
    }
}

/// One step of the recreate protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecreateStep {
    /// Create the temporary table with the new schema.
    CreateTemp,
    /// Copy preserved columns from the original table.
    CopyRows,
    /// Drop the original table.
    DropOriginal,
    /// Rename the temporary table to the original name.
    RenameTemp,
    /// Re-create the indexes and triggers dropped with the original table.
    RestoreDependents,
}

impl RecreateStep {
    /// All steps, in execution order.
    pub const ALL: [Self; 5] = [
        Self::CreateTemp,
        Self::CopyRows,
        Self::DropOriginal,
        Self::RenameTemp,
        Self::RestoreDependents,
    ];

    /// Returns the step that follows this one, or `None` after the last.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::CreateTemp => Some(Self::CopyRows),
            Self::CopyRows => Some(Self::DropOriginal),
            Self::DropOriginal => Some(Self::RenameTemp),
            Self::RenameTemp => Some(Self::RestoreDependents),
            Self::RestoreDependents => None,
        }
    }

    /// Returns the step's name, e.g. `CREATE_TEMP`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTemp => "CREATE_TEMP",
            Self::CopyRows => "COPY_ROWS",
            Self::DropOriginal => "DROP_ORIGINAL",
            Self::RenameTemp => "RENAME_TEMP",
            Self::RestoreDependents => "RESTORE_DEPENDENTS",
        }
    }
}

impl fmt::Display for RecreateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statement of the recreate protocol with its bound arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RecreateStatement {
    /// The protocol step this statement performs.
    pub step: RecreateStep,
    /// SQL text.
    pub sql: String,
    /// Arguments for `?` placeholders in `sql`.
    pub args: Vec<SqlValue>,
}

/// An index or trigger defined on a table, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentObject {
    /// `index` or `trigger`.
    pub kind: String,
    /// Object name.
    pub name: String,
    /// The statement that creates it.
    pub sql: String,
}

/// The outcome of planning one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    /// The table after the edit, under its original name.
    pub target: DdlDocument,
    /// Columns copied from the old table, in old-schema order.
    pub preserved_columns: Vec<String>,
    /// Name of the temporary table.
    pub temp_table: String,
    /// Name of the table being recreated.
    pub source_table: String,
    /// Columns the edit removes, in old-schema order.
    pub dropped_columns: Vec<String>,
    temp_schema: String,
    temp_args: Vec<SqlValue>,
    dependents: Vec<DependentObject>,
}

impl MigrationPlan {
    /// Registers indexes and triggers of the source table for re-creation
    /// after the rename.
    ///
    /// Objects that mention a dropped column can't be re-created against the
    /// new schema; they are returned instead of registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSchema`] if an object's SQL has an
    /// unterminated quote.
    pub fn restore_dependents(
        &mut self,
        objects: impl IntoIterator<Item = DependentObject>,
    ) -> Result<Vec<DependentObject>> {
        let mut skipped = Vec::new();
        for object in objects {
            let mut stale = false;
            for column in &self.dropped_columns {
                if mentions_identifier(&object.sql, column)? {
                    stale = true;
                    break;
                }
            }
            if stale {
                skipped.push(object);
            } else {
                self.dependents.push(object);
            }
        }
        Ok(skipped)
    }

    /// Returns the indexes and triggers that will be re-created.
    #[must_use]
    pub fn dependents(&self) -> &[DependentObject] {
        &self.dependents
    }

    /// Renders the protocol statements in execution order: the four swap
    /// statements, then one `RESTORE_DEPENDENTS` statement per registered
    /// index or trigger.
    ///
    /// Only the create step carries bound arguments.
    #[must_use]
    pub fn statements(&self) -> Vec<RecreateStatement> {
        let temp = render_identifier(&self.temp_table);
        let source = render_identifier(&self.source_table);
        let columns = self
            .preserved_columns
            .iter()
            .map(|c| render_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            RecreateStatement {
                step: RecreateStep::CreateTemp,
                sql: self.temp_schema.clone(),
                args: self.temp_args.clone(),
            },
            RecreateStatement {
                step: RecreateStep::CopyRows,
                sql: format!("INSERT INTO {temp} ({columns}) SELECT {columns} FROM {source}"),
                args: Vec::new(),
            },
            RecreateStatement {
                step: RecreateStep::DropOriginal,
                sql: format!("DROP TABLE {source}"),
                args: Vec::new(),
            },
            RecreateStatement {
                step: RecreateStep::RenameTemp,
                sql: format!("ALTER TABLE {temp} RENAME TO {source}"),
                args: Vec::new(),
            },
        ]
        .into_iter()
        .chain(self.dependents.iter().map(|object| RecreateStatement {
            step: RecreateStep::RestoreDependents,
            sql: object.sql.clone(),
            args: Vec::new(),
        }))
        .collect()
    }
}

/// Turns edits into recreate plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Creates a planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans any supported edit.
    ///
    /// # Errors
    ///
    /// See [`Self::plan_column_edit`] and [`Self::plan_constraint_edit`].
    pub fn plan(&self, document: &DdlDocument, edit: &SchemaEdit) -> Result<MigrationPlan> {
        match edit {
            SchemaEdit::Column(edit) => self.plan_column_edit(document, edit),
            SchemaEdit::Constraint(edit) => self.plan_constraint_edit(document, edit),
        }
    }

    /// Plans a column edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the column doesn't exist,
    /// [`Error::DuplicateField`] when adding an existing column,
    /// [`Error::EmptyTable`] when dropping the last column, and
    /// [`Error::ArgumentCount`] for mismatched bound arguments.
    pub fn plan_column_edit(
        &self,
        document: &DdlDocument,
        edit: &ColumnEdit,
    ) -> Result<MigrationPlan> {
        let mut target = document.clone();
        match edit {
            ColumnEdit::Add(column) => target.add_column_def(column.clone())?,
            ColumnEdit::Drop(name) => {
                target.drop_column(name)?;
            }
            ColumnEdit::Alter {
                name,
                type_clause,
                args,
            } => target.alter_column(name, type_clause.clone(), args.clone())?,
        }
        self.finish(document, target)
    }

    /// Plans a constraint edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the named constraint doesn't
    /// exist, [`Error::DuplicateField`] on a name clash, and
    /// [`Error::ArgumentCount`] for mismatched bound arguments.
    pub fn plan_constraint_edit(
        &self,
        document: &DdlDocument,
        edit: &ConstraintEdit,
    ) -> Result<MigrationPlan> {
        let mut target = document.clone();
        match edit {
            ConstraintEdit::Add(constraint) => target.add_constraint_def(constraint.clone())?,
            ConstraintEdit::Drop(name) => {
                target
                    .remove_constraint(name)
                    .ok_or_else(|| Error::constraint_not_found(name.as_str()))?;
            }
            ConstraintEdit::Alter { name, clause, args } => {
                target.alter_constraint(name, clause.clone(), args.clone())?;
            }
            ConstraintEdit::Rename { from, to } => target.rename_constraint(from, to.clone())?,
        }
        self.finish(document, target)
    }

    #[allow(clippy::unused_self)]
    fn finish(&self, document: &DdlDocument, target: DdlDocument) -> Result<MigrationPlan> {
        if target.column_defs().is_empty() {
            return Err(Error::EmptyTable(document.table_name().to_string()));
        }

        let (preserved_columns, dropped_columns): (Vec<String>, Vec<String>) = document
            .columns()
            .into_iter()
            .partition(|name| target.has_column(name));

        let source_table = document.table_name().to_string();
        let temp_table = temp_table_name(&source_table);

        let mut temp = target.clone();
        temp.rename_table(temp_table.clone())?;
        let (temp_schema, temp_args) = temp.compile();

        Ok(MigrationPlan {
            target,
            preserved_columns,
            temp_table,
            source_table,
            dropped_columns,
            temp_schema,
            temp_args,
            dependents: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DdlDocument {
        DdlDocument::parse(text).unwrap()
    }

    #[test]
    fn test_drop_column_plan() {
        let planner = MigrationPlanner::new();
        let plan = planner
            .plan_column_edit(
                &doc("CREATE TABLE t (id INTEGER, name TEXT)"),
                &ColumnEdit::Drop("name".to_string()),
            )
            .unwrap();

        assert_eq!(plan.preserved_columns, vec!["id"]);
        assert_eq!(plan.temp_table, "t__temp");
        assert_eq!(plan.source_table, "t");
        assert_eq!(plan.target.compile().0, "CREATE TABLE t (id INTEGER)");

        let sql: Vec<_> = plan.statements().into_iter().map(|s| s.sql).collect();
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE t__temp (id INTEGER)",
                "INSERT INTO t__temp (id) SELECT id FROM t",
                "DROP TABLE t",
                "ALTER TABLE t__temp RENAME TO t",
            ]
        );
    }

    #[test]
    fn test_alter_keeps_position() {
        let plan = MigrationPlanner::new()
            .plan_column_edit(
                &doc("CREATE TABLE t (a INT, b INT, c INT)"),
                &ColumnEdit::Alter {
                    name: "b".to_string(),
                    type_clause: "TEXT".to_string(),
                    args: vec![],
                },
            )
            .unwrap();
        assert_eq!(plan.preserved_columns, vec!["a", "b", "c"]);
        assert_eq!(plan.target.compile().0, "CREATE TABLE t (a INT, b TEXT, c INT)");
    }

    #[test]
    fn test_add_column_copies_existing_only() {
        let plan = MigrationPlanner::new()
            .plan_column_edit(
                &doc("CREATE TABLE t (a INT)"),
                &ColumnEdit::Add(
                    ColumnDef::new("flag", "INTEGER NOT NULL DEFAULT ?")
                        .bind(vec![SqlValue::Int(0)]),
                ),
            )
            .unwrap();
        assert_eq!(plan.preserved_columns, vec!["a"]);

        let statements = plan.statements();
        assert_eq!(
            statements[0].sql,
            "CREATE TABLE t__temp (a INT, flag INTEGER NOT NULL DEFAULT ?)"
        );
        assert_eq!(statements[0].args, vec![SqlValue::Int(0)]);
        assert!(statements[1..].iter().all(|s| s.args.is_empty()));
    }

    #[test]
    fn test_missing_fields() {
        let planner = MigrationPlanner::new();
        let document = doc("CREATE TABLE t (a INT, b INT)");
        assert_eq!(
            planner.plan_column_edit(&document, &ColumnEdit::Drop("zz".into())),
            Err(Error::column_not_found("zz"))
        );
        assert_eq!(
            planner.plan_constraint_edit(&document, &ConstraintEdit::Drop("ck".into())),
            Err(Error::constraint_not_found("ck"))
        );
    }

    #[test]
    fn test_dropping_last_column_fails() {
        assert_eq!(
            MigrationPlanner::new().plan(
                &doc("CREATE TABLE t (a INT)"),
                &ColumnEdit::Drop("a".into()).into(),
            ),
            Err(Error::EmptyTable("t".to_string()))
        );
    }

    #[test]
    fn test_constraint_plans_preserve_every_column() {
        let planner = MigrationPlanner::new();
        let document = doc("CREATE TABLE t (a INT, b INT, CONSTRAINT ck CHECK (a > 0))");

        let plan = planner
            .plan(
                &document,
                &ConstraintEdit::Rename {
                    from: "ck".into(),
                    to: "positive_a".into(),
                }
                .into(),
            )
            .unwrap();
        assert_eq!(plan.preserved_columns, vec!["a", "b"]);
        assert!(plan.target.has_constraint("positive_a"));
        assert!(document.has_constraint("ck"));

        let plan = planner
            .plan(
                &document,
                &ConstraintEdit::Add(ConstraintDef::named("uq_b", "UNIQUE (b)")).into(),
            )
            .unwrap();
        assert_eq!(
            plan.statements()[0].sql,
            "CREATE TABLE t__temp (a INT, b INT, CONSTRAINT ck CHECK (a > 0), CONSTRAINT uq_b UNIQUE (b))"
        );
    }

    #[test]
    fn test_quoted_names_in_statements() {
        let plan = MigrationPlanner::new()
            .plan_column_edit(
                &doc("CREATE TABLE \"my table\" (\"first name\" TEXT, \"order\" INT)"),
                &ColumnEdit::Drop("order".into()),
            )
            .unwrap();
        let sql: Vec<_> = plan.statements().into_iter().map(|s| s.sql).collect();
        assert_eq!(sql[0], "CREATE TABLE \"my table__temp\" (\"first name\" TEXT)");
        assert_eq!(
            sql[1],
            "INSERT INTO \"my table__temp\" (\"first name\") SELECT \"first name\" FROM \"my table\""
        );
        assert_eq!(sql[3], "ALTER TABLE \"my table__temp\" RENAME TO \"my table\"");
    }

    #[test]
    fn test_dependents_on_dropped_columns_are_skipped() {
        let mut plan = MigrationPlanner::new()
            .plan_column_edit(
                &doc("CREATE TABLE t (id INTEGER, name TEXT, note TEXT)"),
                &ColumnEdit::Drop("name".into()),
            )
            .unwrap();
        assert_eq!(plan.dropped_columns, vec!["name"]);

        let object = |kind: &str, name: &str, sql: &str| DependentObject {
            kind: kind.to_string(),
            name: name.to_string(),
            sql: sql.to_string(),
        };
        let skipped = plan
            .restore_dependents([
                object("index", "idx_id", "CREATE INDEX idx_id ON t (id)"),
                object("index", "idx_name", "CREATE INDEX idx_name ON t (\"name\", note)"),
                object("index", "idx_note", "CREATE INDEX idx_note ON t (note) WHERE note <> 'name'"),
            ])
            .unwrap();

        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "idx_name");
        assert_eq!(plan.dependents().len(), 2);

        let statements = plan.statements();
        assert_eq!(statements.len(), 6);
        assert_eq!(statements[4].step, RecreateStep::RestoreDependents);
        assert_eq!(statements[4].sql, "CREATE INDEX idx_id ON t (id)");
        assert_eq!(statements[5].sql, "CREATE INDEX idx_note ON t (note) WHERE note <> 'name'");
    }

    #[test]
    fn test_step_order() {
        let mut step = Some(RecreateStep::CreateTemp);
        let mut seen = Vec::new();
        while let Some(current) = step {
            seen.push(current);
            step = current.next();
        }
        assert_eq!(seen, RecreateStep::ALL);
        assert_eq!(RecreateStep::CopyRows.to_string(), "COPY_ROWS");
    }
}
